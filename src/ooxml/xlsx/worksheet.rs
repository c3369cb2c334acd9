//! Worksheet parts (`xl/worksheets/sheetN.xml`).

use std::collections::BTreeMap;
use std::io::BufRead;

use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, warn};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::shared_strings::SharedStringTable;
use super::styles::XlsxStyles;
use super::{push_reference, push_text, raw_attr, string_attr, u32_attr};
use crate::common::cell::{self, CellError, CellRange, CellValue};
use crate::common::SheetVisibility;
use crate::ooxml::error::Result;

/// Workbook-level state a sheet needs to turn raw values into cells.
#[derive(Debug, Clone, Copy)]
pub struct SheetContext<'a> {
    pub shared_strings: &'a SharedStringTable,
    pub styles: &'a XlsxStyles,
    pub date1904: bool,
    pub convert_dates: bool,
}

/// One sheet of an `.xlsx` workbook.
#[derive(Debug, Clone)]
pub struct XlsxWorksheet {
    name: String,
    id: u32,
    rid: Option<String>,
    path: Option<String>,
    visibility: SheetVisibility,
    dimension: Option<CellRange>,
    merged_cells: Vec<CellRange>,
    cells: BTreeMap<(u32, u32), CellValue>,
}

impl XlsxWorksheet {
    /// A sheet as listed in `workbook.xml`, before its part is read.
    pub fn new(
        name: impl Into<String>,
        id: u32,
        rid: Option<String>,
        visibility: SheetVisibility,
    ) -> Self {
        XlsxWorksheet {
            name: name.into(),
            id,
            rid,
            path: None,
            visibility,
            dimension: None,
            merged_cells: Vec::new(),
            cells: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `sheetId` from `workbook.xml`
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Relationship id pointing at the sheet part
    pub fn rid(&self) -> Option<&str> {
        self.rid.as_deref()
    }

    /// Part path from the workbook relationships
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub(crate) fn set_path(&mut self, path: String) {
        self.path = Some(path);
    }

    #[inline]
    pub fn visibility(&self) -> SheetVisibility {
        self.visibility
    }

    /// Range declared by `<dimension ref>`, if present.
    #[inline]
    pub fn dimension(&self) -> Option<CellRange> {
        self.dimension
    }

    pub fn merged_cells(&self) -> &[CellRange] {
        &self.merged_cells
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    /// Stored cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = ((u32, u32), &CellValue)> {
        self.cells.iter().map(|(&pos, value)| (pos, value))
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Range covered by non-empty cells.
    pub fn used_range(&self) -> Option<CellRange> {
        let mut range: Option<CellRange> = None;
        for (&(row, col), value) in &self.cells {
            if value.is_empty() {
                continue;
            }
            let r = range.get_or_insert(CellRange {
                first_row: row,
                first_col: col,
                last_row: row,
                last_col: col,
            });
            r.first_row = r.first_row.min(row);
            r.first_col = r.first_col.min(col);
            r.last_row = r.last_row.max(row);
            r.last_col = r.last_col.max(col);
        }
        range
    }

    /// Read the sheet part, replacing any cells read before.
    pub fn load<R: BufRead>(&mut self, input: R, ctx: &SheetContext<'_>) -> Result<()> {
        let mut reader = Reader::from_reader(input);
        let mut scanner = CellScanner::new(ctx);
        let mut buf = Vec::new();

        self.cells.clear();
        self.merged_cells.clear();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => match e.local_name().as_ref() {
                    b"row" => scanner.start_row(e)?,
                    b"c" => scanner.start_cell(e)?,
                    b"v" => scanner.text = Some(TextTarget::Value),
                    b"is" => scanner.in_inline = true,
                    b"rPh" => scanner.phonetic_depth += 1,
                    b"t" if scanner.in_inline && scanner.phonetic_depth == 0 => {
                        scanner.text = Some(TextTarget::Inline)
                    },
                    _ => {},
                },
                Event::Empty(ref e) => match e.local_name().as_ref() {
                    b"dimension" => {
                        self.dimension = string_attr(e, b"ref")?.and_then(|r| cell::parse_range(&r));
                    },
                    b"mergeCell" => {
                        if let Some(range) = string_attr(e, b"ref")?.and_then(|r| cell::parse_range(&r)) {
                            self.merged_cells.push(range);
                        }
                    },
                    b"row" => scanner.start_row(e)?,
                    // A cell with only a style
                    b"c" => {
                        scanner.start_cell(e)?;
                        scanner.finish_cell(&mut self.cells);
                    },
                    _ => {},
                },
                Event::Text(ref e) => match scanner.text {
                    Some(TextTarget::Value) => push_text(&mut scanner.value, e)?,
                    Some(TextTarget::Inline) => push_text(&mut scanner.inline, e)?,
                    None => {},
                },
                Event::GeneralRef(ref e) => match scanner.text {
                    Some(TextTarget::Value) => push_reference(&mut scanner.value, e)?,
                    Some(TextTarget::Inline) => push_reference(&mut scanner.inline, e)?,
                    None => {},
                },
                Event::End(ref e) => match e.local_name().as_ref() {
                    b"v" | b"t" => scanner.text = None,
                    b"is" => scanner.in_inline = false,
                    b"rPh" => scanner.phonetic_depth = scanner.phonetic_depth.saturating_sub(1),
                    b"c" => scanner.finish_cell(&mut self.cells),
                    _ => {},
                },
                Event::Eof => break,
                _ => {},
            }
            buf.clear();
        }

        debug!("sheet '{}': {} cells", self.name, self.cells.len());
        Ok(())
    }
}

impl crate::sheet::Worksheet for XlsxWorksheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> Option<CellRange> {
        self.used_range()
    }

    fn cell_value(&self, row: u32, column: u32) -> Option<&CellValue> {
        self.cell(row, column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextTarget {
    Value,
    Inline,
}

/// Per-cell state while walking `<sheetData>`.
struct CellScanner<'c> {
    ctx: &'c SheetContext<'c>,
    row: u32,
    next_row: u32,
    col: u32,
    next_col: u32,
    cell_type: Option<String>,
    style: usize,
    value: String,
    inline: String,
    text: Option<TextTarget>,
    in_inline: bool,
    phonetic_depth: usize,
}

impl<'c> CellScanner<'c> {
    fn new(ctx: &'c SheetContext<'c>) -> Self {
        CellScanner {
            ctx,
            row: 0,
            next_row: 0,
            col: 0,
            next_col: 0,
            cell_type: None,
            style: 0,
            value: String::new(),
            inline: String::new(),
            text: None,
            in_inline: false,
            phonetic_depth: 0,
        }
    }

    /// Rows without `r` follow the previous one.
    fn start_row(&mut self, e: &BytesStart<'_>) -> Result<()> {
        self.row = match u32_attr(e, b"r")? {
            Some(r) if r > 0 => r - 1,
            _ => self.next_row,
        };
        self.next_row = self.row.saturating_add(1);
        self.next_col = 0;
        Ok(())
    }

    /// Cells without `r` follow the previous one in the row.
    fn start_cell(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let position = raw_attr(e, b"r")?.and_then(|attr| {
            std::str::from_utf8(&attr.value)
                .ok()
                .and_then(cell::parse_cell_reference)
        });
        match position {
            Some((row, col)) => {
                self.row = row;
                self.next_row = row.saturating_add(1);
                self.col = col;
            },
            None => self.col = self.next_col,
        }
        self.next_col = self.col.saturating_add(1);
        self.cell_type = string_attr(e, b"t")?;
        self.style = u32_attr(e, b"s")?.unwrap_or(0) as usize;
        self.value.clear();
        self.inline.clear();
        self.text = None;
        self.in_inline = false;
        self.phonetic_depth = 0;
        Ok(())
    }

    fn finish_cell(&mut self, cells: &mut BTreeMap<(u32, u32), CellValue>) {
        let value = self.convert();
        if !value.is_empty() {
            cells.insert((self.row, self.col), value);
        }
    }

    fn convert(&self) -> CellValue {
        let raw = self.value.as_str();
        match self.cell_type.as_deref() {
            Some("inlineStr") => {
                if self.inline.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::String(self.inline.clone())
                }
            },
            _ if raw.is_empty() => CellValue::Empty,
            Some("s") => {
                let index = atoi_simd::parse::<u32, false, false>(raw.trim().as_bytes()).ok();
                match index.and_then(|i| self.ctx.shared_strings.get(i as usize)) {
                    Some(text) => CellValue::String(text.to_string()),
                    None => {
                        warn!("{}: shared string index {raw} out of range", self.reference());
                        CellValue::Empty
                    },
                }
            },
            Some("str") => CellValue::String(raw.to_string()),
            Some("b") => CellValue::Bool(matches!(raw.trim(), "1" | "true")),
            Some("e") => CellError::parse(raw.trim())
                .map(CellValue::Error)
                .unwrap_or_else(|| CellValue::String(raw.to_string())),
            Some("d") => match parse_iso_datetime(raw.trim()) {
                Some(dt) => CellValue::DateTime(dt),
                None => CellValue::String(raw.to_string()),
            },
            _ => self.convert_number(raw),
        }
    }

    fn convert_number(&self, raw: &str) -> CellValue {
        let Ok(number) = fast_float2::parse::<f64, _>(raw.trim()) else {
            debug!("{}: non-numeric value {raw:?} kept as text", self.reference());
            return CellValue::String(raw.to_string());
        };
        if self.ctx.convert_dates
            && self.ctx.styles.is_date_style(self.style)
            && let Some(dt) = cell::excel_date_to_datetime(number, self.ctx.date1904)
        {
            return CellValue::DateTime(dt);
        }
        CellValue::Number(number)
    }

    fn reference(&self) -> String {
        cell::cell_reference(self.row, self.col)
    }
}

/// `t="d"` cells hold ISO 8601 text.
fn parse_iso_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::xlsx::styles::XlsxXf;

    fn styles_with_date_xf() -> XlsxStyles {
        XlsxStyles {
            num_fmts: Vec::new(),
            cell_xfs: vec![
                XlsxXf::default(),
                XlsxXf {
                    id: 1,
                    num_fmt_id: 14,
                    apply_number_format: true,
                },
            ],
        }
    }

    fn load(xml: &str, convert_dates: bool) -> XlsxWorksheet {
        let sst = SharedStringTable::parse(r#"<sst><si><t>shared</t></si></sst>"#.as_bytes()).unwrap();
        let styles = styles_with_date_xf();
        let ctx = SheetContext {
            shared_strings: &sst,
            styles: &styles,
            date1904: false,
            convert_dates,
        };
        let mut sheet = XlsxWorksheet::new("Data", 1, Some("rId1".into()), SheetVisibility::Visible);
        sheet.load(xml.as_bytes(), &ctx).unwrap();
        sheet
    }

    const SHEET_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <dimension ref="A1:D3"/>
  <sheetData>
    <row r="1">
      <c r="A1" t="s"><v>0</v></c>
      <c r="B1"><v>42.5</v></c>
      <c r="C1" t="b"><v>1</v></c>
      <c r="D1" t="e"><v>#DIV/0!</v></c>
    </row>
    <row r="2">
      <c r="A2" t="inlineStr"><is><t>inline &lt;text&gt;</t></is></c>
      <c r="B2" s="1"><v>45292</v></c>
      <c r="C2" t="str"><f>CONCAT("a","b")</f><v>ab</v></c>
      <c r="D2" s="1"/>
    </row>
    <row r="3">
      <c r="A3" t="d"><v>2024-01-01T12:30:00</v></c>
      <c r="C3" t="s"><v>7</v></c>
    </row>
  </sheetData>
  <mergeCells count="1"><mergeCell ref="A3:B3"/></mergeCells>
</worksheet>"#;

    #[test]
    fn test_cell_types() {
        let sheet = load(SHEET_XML, true);
        assert_eq!(sheet.dimension(), cell::parse_range("A1:D3"));
        assert_eq!(sheet.cell(0, 0), Some(&CellValue::String("shared".into())));
        assert_eq!(sheet.cell(0, 1), Some(&CellValue::Number(42.5)));
        assert_eq!(sheet.cell(0, 2), Some(&CellValue::Bool(true)));
        assert_eq!(sheet.cell(0, 3), Some(&CellValue::Error(CellError::Div0)));
        assert_eq!(sheet.cell(1, 0), Some(&CellValue::String("inline <text>".into())));
        assert_eq!(sheet.cell(1, 2), Some(&CellValue::String("ab".into())));
        assert_eq!(sheet.cell(1, 3), None);
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(12, 30, 0).unwrap();
        assert_eq!(sheet.cell(2, 0), Some(&CellValue::DateTime(expected)));
        // Out-of-range shared string index
        assert_eq!(sheet.cell(2, 2), None);
        assert_eq!(sheet.merged_cells(), &[cell::parse_range("A3:B3").unwrap()]);
    }

    #[test]
    fn test_date_styles() {
        let sheet = load(SHEET_XML, true);
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(sheet.cell(1, 1), Some(&CellValue::DateTime(expected)));

        let raw = load(SHEET_XML, false);
        assert_eq!(raw.cell(1, 1), Some(&CellValue::Number(45292.0)));
    }

    #[test]
    fn test_missing_references_follow_previous_cell() {
        let xml = r#"<worksheet><sheetData>
            <row><c><v>1</v></c><c><v>2</v></c></row>
            <row><c r="C5"><v>3</v></c><c><v>4</v></c></row>
        </sheetData></worksheet>"#;
        let sheet = load(xml, true);
        assert_eq!(sheet.cell(0, 0), Some(&CellValue::Number(1.0)));
        assert_eq!(sheet.cell(0, 1), Some(&CellValue::Number(2.0)));
        assert_eq!(sheet.cell(4, 2), Some(&CellValue::Number(3.0)));
        assert_eq!(sheet.cell(4, 3), Some(&CellValue::Number(4.0)));
    }

    #[test]
    fn test_positions_saturate_at_last_row() {
        let xml = r#"<worksheet><sheetData>
            <row r="4294967295"><c><v>1</v></c></row>
            <row><c><v>2</v></c><c><v>3</v></c></row>
        </sheetData></worksheet>"#;
        let sheet = load(xml, true);
        assert_eq!(sheet.cell(u32::MAX - 1, 0), Some(&CellValue::Number(1.0)));
        assert_eq!(sheet.cell(u32::MAX, 0), Some(&CellValue::Number(2.0)));
        assert_eq!(sheet.cell(u32::MAX, 1), Some(&CellValue::Number(3.0)));
    }

    #[test]
    fn test_used_range_and_dense_rows() {
        use crate::sheet::Worksheet;

        let sheet = load(SHEET_XML, true);
        let used = sheet.used_range().unwrap();
        assert_eq!((used.first_row, used.first_col, used.last_row, used.last_col), (0, 0, 2, 3));
        let rows = sheet.rows();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.len() == 4));
        assert_eq!(rows[2][1], CellValue::Empty);
    }

    #[test]
    fn test_phonetic_text_excluded_from_inline_string() {
        let xml = r#"<worksheet><sheetData><row r="1">
            <c r="A1" t="inlineStr"><is><t>漢字</t><rPh sb="0" eb="2"><t>かんじ</t></rPh></is></c>
        </row></sheetData></worksheet>"#;
        let sheet = load(xml, true);
        assert_eq!(sheet.cell(0, 0), Some(&CellValue::String("漢字".into())));
    }

    #[test]
    fn test_parse_iso_datetime() {
        assert!(parse_iso_datetime("2024-02-29").is_some());
        assert!(parse_iso_datetime("2024-02-29T08:00:00.250Z").is_some());
        assert!(parse_iso_datetime("yesterday").is_none());
    }
}
