//! Workbook implementation for XLS files

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use bytes::Bytes;

use crate::common::detection::{self, FileFormat};
use crate::config::ReaderOptions;
use crate::ole::{OleError, OleFile, is_ole_file};
use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::globals::{SheetInfo, WorkbookGlobals};
use crate::ole::xls::record::RecordIter;
use crate::ole::xls::records::{self, SheetType, SheetVisibility};
use crate::ole::xls::worksheet::XlsWorksheet;

/// Stream names holding the BIFF data, BIFF8 first.
const WORKBOOK_STREAMS: [&str; 2] = ["Workbook", "Book"];

/// Sheet name given to single-sheet BIFF2-BIFF4 files.
const SINGLE_SHEET_NAME: &str = "Sheet1";

/// XLS workbook implementation
#[derive(Debug, Clone)]
pub struct XlsWorkbook {
    stream: Bytes,
    globals: WorkbookGlobals,
    worksheets: Vec<XlsWorksheet>,
}

impl XlsWorkbook {
    /// Open a `.xls` file (compound file or bare BIFF stream).
    pub fn open<P: AsRef<Path>>(path: P, options: &ReaderOptions) -> XlsResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes, options)
    }

    /// Read a workbook held in memory.
    pub fn from_bytes<B: Into<Bytes>>(bytes: B, options: &ReaderOptions) -> XlsResult<Self> {
        let bytes: Bytes = bytes.into();
        if is_ole_file(&bytes) {
            return Self::from_reader(Cursor::new(bytes), options);
        }
        match detection::detect_format(&bytes) {
            Some(FileFormat::Biff) => Self::from_stream(bytes, options),
            _ => Err(XlsError::Cfb(OleError::NotOleFile)),
        }
    }

    /// Open an XLS workbook from a compound file reader.
    pub fn from_reader<R: Read + Seek>(reader: R, options: &ReaderOptions) -> XlsResult<Self> {
        let mut ole = OleFile::open(reader)?;
        let stream = Self::workbook_stream(&mut ole)?;
        Self::from_stream(stream, options)
    }

    /// Read the `Workbook` (BIFF8) or `Book` (BIFF5) stream.
    fn workbook_stream<R: Read + Seek>(ole: &mut OleFile<R>) -> XlsResult<Vec<u8>> {
        for name in WORKBOOK_STREAMS {
            match ole.open_stream(&[name]) {
                Ok(stream) => return Ok(stream),
                Err(OleError::StreamNotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(XlsError::MissingWorkbookStream)
    }

    /// Parse a raw BIFF stream.
    pub fn from_stream<B: Into<Bytes>>(stream: B, options: &ReaderOptions) -> XlsResult<Self> {
        let stream: Bytes = stream.into();
        let (globals, globals_end) = WorkbookGlobals::parse(&stream, options)?;

        if globals_end == 0 {
            return Self::single_sheet(stream, globals, options);
        }

        let mut worksheets = Vec::with_capacity(globals.sheets().len());
        for (index, info) in globals.sheets().iter().enumerate() {
            if !Self::wanted(info, options) {
                continue;
            }
            match XlsWorksheet::parse(&stream, info, index, &globals, options) {
                Ok(sheet) => worksheets.push(sheet),
                Err(e) => log::warn!("skipping sheet '{}': {}", info.name, e),
            }
        }

        Ok(XlsWorkbook {
            stream,
            globals,
            worksheets,
        })
    }

    /// BIFF2-BIFF4 files hold one sheet with interleaved globals records.
    fn single_sheet(
        stream: Bytes,
        mut globals: WorkbookGlobals,
        options: &ReaderOptions,
    ) -> XlsResult<Self> {
        for record in RecordIter::new(&stream).skip(1) {
            let record = record?;
            if records::is_eof(&record) {
                break;
            }
            globals.apply(&record)?;
        }

        let info = SheetInfo {
            name: SINGLE_SHEET_NAME.to_string(),
            offset: 0,
            visibility: SheetVisibility::Visible,
            sheet_type: SheetType::Worksheet,
        };
        let sheet = XlsWorksheet::parse(&stream, &info, 0, &globals, options)?;
        Ok(XlsWorkbook {
            stream,
            globals,
            worksheets: vec![sheet],
        })
    }

    fn wanted(info: &SheetInfo, options: &ReaderOptions) -> bool {
        if !matches!(info.sheet_type, SheetType::Worksheet | SheetType::MacroSheet) {
            log::debug!("skipping sheet '{}' of type {:?}", info.name, info.sheet_type);
            return false;
        }
        info.visibility == SheetVisibility::Visible || options.include_hidden_sheets
    }

    #[inline]
    pub fn globals(&self) -> &WorkbookGlobals {
        &self.globals
    }

    /// Forward scan over every record of the BIFF stream.
    pub fn records(&self) -> RecordIter<'_> {
        RecordIter::new(&self.stream)
    }

    /// Raw BIFF stream.
    #[inline]
    pub fn stream(&self) -> &[u8] {
        &self.stream
    }

    pub fn worksheet_names(&self) -> Vec<&str> {
        self.worksheets.iter().map(XlsWorksheet::name).collect()
    }

    #[inline]
    pub fn worksheets(&self) -> &[XlsWorksheet] {
        &self.worksheets
    }

    #[inline]
    pub fn worksheet_count(&self) -> usize {
        self.worksheets.len()
    }

    pub fn worksheet_by_name(&self, name: &str) -> XlsResult<&XlsWorksheet> {
        self.worksheets
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| XlsError::WorksheetNotFound(name.to_string()))
    }

    pub fn worksheet_by_index(&self, index: usize) -> XlsResult<&XlsWorksheet> {
        self.worksheets
            .get(index)
            .ok_or_else(|| XlsError::WorksheetNotFound(format!("index {index}")))
    }

    /// Index into [`worksheets`](Self::worksheets) of the selected tab,
    /// 0 when the selected sheet was skipped.
    pub fn active_sheet_index(&self) -> usize {
        let tab = self.globals.active_tab() as usize;
        self.worksheets
            .iter()
            .position(|s| s.index() == tab)
            .unwrap_or(0)
    }

    /// Whether the stream contains any record with this id.
    pub fn contains_record(&self, id: u16) -> bool {
        self.records().flatten().any(|r| r.id() == id)
    }

    /// Whether the workbook declares a 1904 date system.
    #[inline]
    pub fn is_1904(&self) -> bool {
        self.globals.is_1904()
    }
}
