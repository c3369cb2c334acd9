//! Unified workbook over the `.xls` and `.xlsx` readers.

use std::path::Path;

use bytes::Bytes;

use super::traits::Worksheet;
use crate::common::cell::CellValue;
use crate::common::detection::{FileFormat, detect_format};
use crate::common::error::{Error, Result};
use crate::config::ReaderOptions;

/// A workbook in either supported format.
///
/// The format is detected from the leading bytes, never from the file
/// extension.
///
/// # Examples
///
/// ```rust,no_run
/// use longan::{ReaderOptions, Workbook};
///
/// let workbook = Workbook::open("data.xls", &ReaderOptions::default())?;
/// for name in workbook.sheet_names() {
///     for row in workbook.rows(name)? {
///         println!("{:?}", row);
///     }
/// }
/// # Ok::<(), longan::Error>(())
/// ```
#[derive(Debug, Clone)]
pub enum Workbook {
    /// BIFF2-BIFF8 workbook
    #[cfg(feature = "ole")]
    Xls(crate::ole::xls::XlsWorkbook),
    /// Office Open XML workbook
    #[cfg(feature = "ooxml")]
    Xlsx(crate::ooxml::xlsx::XlsxWorkbook),
}

impl Workbook {
    /// Open a workbook from a file path.
    pub fn open<P: AsRef<Path>>(path: P, options: &ReaderOptions) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes, options)
    }

    /// Read a workbook held in memory.
    pub fn from_bytes<B: Into<Bytes>>(bytes: B, options: &ReaderOptions) -> Result<Self> {
        let bytes: Bytes = bytes.into();
        match detect_format(&bytes) {
            #[cfg(feature = "ole")]
            Some(FileFormat::Xls | FileFormat::Biff) => {
                Ok(Workbook::Xls(crate::ole::xls::XlsWorkbook::from_bytes(bytes, options)?))
            },
            #[cfg(feature = "ooxml")]
            Some(FileFormat::Xlsx) => {
                let reader = std::io::Cursor::new(bytes);
                Ok(Workbook::Xlsx(crate::ooxml::xlsx::XlsxWorkbook::from_reader(reader, options)?))
            },
            #[cfg(not(feature = "ole"))]
            Some(FileFormat::Xls | FileFormat::Biff) => Err(Error::FeatureDisabled("ole")),
            #[cfg(not(feature = "ooxml"))]
            Some(FileFormat::Xlsx) => Err(Error::FeatureDisabled("ooxml")),
            None => Err(Error::UnknownFormat),
        }
    }

    /// Container format the workbook was read from.
    pub fn format(&self) -> FileFormat {
        match self {
            #[cfg(feature = "ole")]
            Workbook::Xls(_) => FileFormat::Xls,
            #[cfg(feature = "ooxml")]
            Workbook::Xlsx(_) => FileFormat::Xlsx,
        }
    }

    /// Every readable sheet, in workbook order.
    pub fn worksheets(&self) -> Vec<&dyn Worksheet> {
        match self {
            #[cfg(feature = "ole")]
            Workbook::Xls(wb) => wb.worksheets().iter().map(|s| s as &dyn Worksheet).collect(),
            #[cfg(feature = "ooxml")]
            Workbook::Xlsx(wb) => wb.worksheets().iter().map(|s| s as &dyn Worksheet).collect(),
        }
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        match self {
            #[cfg(feature = "ole")]
            Workbook::Xls(wb) => wb.worksheet_names(),
            #[cfg(feature = "ooxml")]
            Workbook::Xlsx(wb) => wb.worksheet_names(),
        }
    }

    pub fn sheet_count(&self) -> usize {
        match self {
            #[cfg(feature = "ole")]
            Workbook::Xls(wb) => wb.worksheet_count(),
            #[cfg(feature = "ooxml")]
            Workbook::Xlsx(wb) => wb.worksheet_count(),
        }
    }

    pub fn sheet_by_name(&self, name: &str) -> Result<&dyn Worksheet> {
        self.worksheets()
            .into_iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| Error::WorksheetNotFound(name.to_string()))
    }

    pub fn sheet_by_index(&self, index: usize) -> Result<&dyn Worksheet> {
        self.worksheets()
            .into_iter()
            .nth(index)
            .ok_or_else(|| Error::WorksheetNotFound(format!("index {index}")))
    }

    /// Dense rows of the named sheet.
    pub fn rows(&self, sheet: &str) -> Result<Vec<Vec<CellValue>>> {
        Ok(self.sheet_by_name(sheet)?.rows())
    }

    /// Position of the selected tab among [`worksheets`](Self::worksheets).
    pub fn active_sheet_index(&self) -> usize {
        match self {
            #[cfg(feature = "ole")]
            Workbook::Xls(wb) => wb.active_sheet_index(),
            #[cfg(feature = "ooxml")]
            Workbook::Xlsx(wb) => wb.active_sheet_index(),
        }
    }

    /// Whether serial dates count from 1904.
    pub fn is_1904(&self) -> bool {
        match self {
            #[cfg(feature = "ole")]
            Workbook::Xls(wb) => wb.is_1904(),
            #[cfg(feature = "ooxml")]
            Workbook::Xlsx(wb) => wb.is_1904(),
        }
    }
}
