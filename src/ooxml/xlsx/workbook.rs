//! Workbook for `.xlsx` files.
//!
//! [`WorkbookPart`] reads `xl/workbook.xml` and its relationships;
//! [`XlsxWorkbook`] extracts the package and reads every part eagerly, so
//! the temporary directory is gone by the time a workbook is returned.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read, Seek};
use std::path::Path;

use log::{debug, warn};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::shared_strings::SharedStringTable;
use super::styles::XlsxStyles;
use super::worksheet::{SheetContext, XlsxWorksheet};
use super::{bool_attr, string_attr, u32_attr};
use crate::common::SheetVisibility;
use crate::config::ReaderOptions;
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::zip_worker::ZipWorker;

/// Contents of `xl/workbook.xml`.
#[derive(Debug, Clone, Default)]
pub struct WorkbookPart {
    pub sheets: Vec<XlsxWorksheet>,
    pub date1904: bool,
    /// Index into `sheets` of the selected tab
    pub active_tab: usize,
}

impl WorkbookPart {
    pub fn parse<R: BufRead>(input: R) -> Result<Self> {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);

        let mut part = WorkbookPart::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) | Event::Empty(ref e) => part.read_element(e)?,
                Event::Eof => break,
                _ => {},
            }
            buf.clear();
        }

        part.active_tab = part.active_tab.min(part.sheets.len().saturating_sub(1));
        Ok(part)
    }

    fn read_element(&mut self, e: &BytesStart<'_>) -> Result<()> {
        match e.local_name().as_ref() {
            b"sheet" => {
                let Some(name) = string_attr(e, b"name")? else {
                    warn!("sheet entry without a name skipped");
                    return Ok(());
                };
                let id = u32_attr(e, b"sheetId")?.unwrap_or(self.sheets.len() as u32 + 1);
                let visibility = string_attr(e, b"state")?
                    .map_or(SheetVisibility::Visible, |s| SheetVisibility::from_state(&s));
                self.sheets.push(XlsxWorksheet::new(name, id, relationship_id(e)?, visibility));
            },
            b"workbookPr" => self.date1904 = bool_attr(e, b"date1904")?,
            b"workbookView" => {
                if let Some(tab) = u32_attr(e, b"activeTab")? {
                    self.active_tab = tab as usize;
                }
            },
            _ => {},
        }
        Ok(())
    }

    /// Fill each sheet's part path from the workbook relationships.
    pub fn resolve_paths(&mut self, relationships: &HashMap<String, String>) {
        for sheet in &mut self.sheets {
            if let Some(target) = sheet.rid().and_then(|rid| relationships.get(rid)) {
                sheet.set_path(target.clone());
            }
        }
    }
}

/// `r:id`, whatever prefix the relationships namespace is bound to.
fn relationship_id(e: &BytesStart<'_>) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id" {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Parse a relationships part into `Id -> Target`.
pub fn parse_relationships<R: BufRead>(input: R) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut relationships = HashMap::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let id = string_attr(e, b"Id")?;
                let target = string_attr(e, b"Target")?;
                if let (Some(id), Some(target)) = (id, target) {
                    relationships.insert(id, target);
                }
            },
            Event::Eof => break,
            _ => {},
        }
        buf.clear();
    }

    Ok(relationships)
}

/// A decoded `.xlsx` workbook.
#[derive(Debug, Clone)]
pub struct XlsxWorkbook {
    worksheets: Vec<XlsxWorksheet>,
    styles: XlsxStyles,
    shared_strings: SharedStringTable,
    date1904: bool,
    active_tab: usize,
}

impl XlsxWorkbook {
    pub fn open<P: AsRef<Path>>(path: P, options: &ReaderOptions) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), options)
    }

    pub fn from_bytes(bytes: &[u8], options: &ReaderOptions) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes), options)
    }

    /// Extract the package behind `reader` and read every sheet.
    pub fn from_reader<R: Read + Seek>(reader: R, options: &ReaderOptions) -> Result<Self> {
        let mut worker = ZipWorker::new(options);
        worker.extract(reader)?;

        let workbook_part = worker
            .workbook_stream()
            .ok_or_else(|| OoxmlError::PartNotFound("xl/workbook.xml".to_string()))?;
        let mut part = WorkbookPart::parse(BufReader::new(workbook_part))?;

        match worker.workbook_rels_stream() {
            Some(rels) => part.resolve_paths(&parse_relationships(BufReader::new(rels))?),
            None => debug!("no workbook relationships, using default sheet paths"),
        }

        let styles = match worker.styles_stream() {
            Some(file) => XlsxStyles::parse(BufReader::new(file))?,
            None => XlsxStyles::default(),
        };
        let shared_strings = match worker.shared_strings_stream() {
            Some(file) => SharedStringTable::parse(BufReader::new(file))?,
            None => SharedStringTable::new(),
        };

        let ctx = SheetContext {
            shared_strings: &shared_strings,
            styles: &styles,
            date1904: part.date1904,
            convert_dates: options.convert_dates,
        };

        let active_sheet = part.active_tab;
        let mut worksheets = Vec::with_capacity(part.sheets.len());
        let mut active_tab = 0;
        for (index, mut sheet) in part.sheets.into_iter().enumerate() {
            if !sheet.visibility().is_visible() && !options.include_hidden_sheets {
                debug!("skipping hidden sheet '{}'", sheet.name());
                continue;
            }
            let stream = match sheet.path() {
                Some(path) => worker.worksheet_stream_by_path(path),
                None => worker.worksheet_stream(sheet.id()),
            };
            let Some(stream) = stream else {
                warn!("skipping sheet '{}': part not found", sheet.name());
                continue;
            };
            if let Err(e) = sheet.load(BufReader::new(stream), &ctx) {
                warn!("skipping sheet '{}': {}", sheet.name(), e);
                continue;
            }
            if index == active_sheet {
                active_tab = worksheets.len();
            }
            worksheets.push(sheet);
        }

        Ok(XlsxWorkbook {
            worksheets,
            styles,
            shared_strings,
            date1904: part.date1904,
            active_tab,
        })
    }

    pub fn worksheet_names(&self) -> Vec<&str> {
        self.worksheets.iter().map(XlsxWorksheet::name).collect()
    }

    #[inline]
    pub fn worksheets(&self) -> &[XlsxWorksheet] {
        &self.worksheets
    }

    #[inline]
    pub fn worksheet_count(&self) -> usize {
        self.worksheets.len()
    }

    pub fn worksheet_by_name(&self, name: &str) -> Result<&XlsxWorksheet> {
        self.worksheets
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| OoxmlError::WorksheetNotFound(name.to_string()))
    }

    pub fn worksheet_by_index(&self, index: usize) -> Result<&XlsxWorksheet> {
        self.worksheets
            .get(index)
            .ok_or_else(|| OoxmlError::WorksheetNotFound(format!("index {index}")))
    }

    /// Index into [`worksheets`](Self::worksheets) of the selected tab,
    /// 0 when the selected sheet was skipped.
    #[inline]
    pub fn active_sheet_index(&self) -> usize {
        self.active_tab
    }

    #[inline]
    pub fn is_1904(&self) -> bool {
        self.date1904
    }

    #[inline]
    pub fn styles(&self) -> &XlsxStyles {
        &self.styles
    }

    #[inline]
    pub fn shared_strings(&self) -> &SharedStringTable {
        &self.shared_strings
    }
}
