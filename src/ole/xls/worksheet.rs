//! Worksheet implementation for XLS files

use std::collections::BTreeMap;

use crate::common::cell::{CellRange, CellValue, excel_date_to_datetime};
use crate::config::ReaderOptions;
use crate::ole::xls::cell::XlsCell;
use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::globals::{SheetInfo, WorkbookGlobals};
use crate::ole::xls::record::{BiffRecord, BiffVersion, RecordIter, ids, is_bof};
use crate::ole::xls::records::{
    BiffCell, Bof, CalcMode, CellRecord, Dimensions, FormulaResult, FormulaString, RefMode, Row,
    RowFlags, SheetType, SheetVisibility, sheet,
};
use crate::sheet::Worksheet;

/// Calculation settings of a sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalcSettings {
    pub mode: CalcMode,
    /// Maximum number of iterations
    pub count: u16,
    pub ref_mode: RefMode,
    pub iteration: bool,
    /// Maximum change between iterations
    pub delta: f64,
}

impl Default for CalcSettings {
    fn default() -> Self {
        CalcSettings {
            mode: CalcMode::Automatic,
            count: 100,
            ref_mode: RefMode::A1,
            iteration: false,
            delta: 0.001,
        }
    }
}

/// Row attributes from a ROW record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowInfo {
    pub index: u32,
    pub first_column: u16,
    /// Exclusive
    pub last_column: u16,
    /// Height in twips
    pub height: u16,
    pub flags: RowFlags,
    /// Default XF of the row when it has one
    pub xf_index: Option<u16>,
}

impl RowInfo {
    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.flags.contains(RowFlags::ZERO_HEIGHT)
    }
}

/// XLS worksheet implementation
#[derive(Debug, Clone)]
pub struct XlsWorksheet {
    name: String,
    index: usize,
    offset: u32,
    visibility: SheetVisibility,
    sheet_type: SheetType,
    calc: CalcSettings,
    dimensions: Option<CellRange>,
    rows: BTreeMap<u32, RowInfo>,
    merged: Vec<CellRange>,
    cells: BTreeMap<(u32, u32), XlsCell>,
}

impl XlsWorksheet {
    /// Create an empty worksheet
    pub fn new(name: String, index: usize) -> Self {
        XlsWorksheet {
            name,
            index,
            offset: 0,
            visibility: SheetVisibility::Visible,
            sheet_type: SheetType::Worksheet,
            calc: CalcSettings::default(),
            dimensions: None,
            rows: BTreeMap::new(),
            merged: Vec::new(),
            cells: BTreeMap::new(),
        }
    }

    /// Read the sheet substream that starts at `info.offset`.
    pub fn parse(
        stream: &[u8],
        info: &SheetInfo,
        index: usize,
        globals: &WorkbookGlobals,
        options: &ReaderOptions,
    ) -> XlsResult<Self> {
        let offset = info.offset as usize;
        if offset >= stream.len() {
            return Err(XlsError::SheetOffsetOutOfRange {
                name: info.name.clone(),
                offset: info.offset,
                len: stream.len(),
            });
        }

        let mut sheet = XlsWorksheet::new(info.name.clone(), index);
        sheet.offset = info.offset;
        sheet.visibility = info.visibility;
        sheet.sheet_type = info.sheet_type;

        let mut iter = RecordIter::starting_at(stream, offset);
        match iter.next() {
            Some(record) => {
                Bof::new(record?)?;
            },
            None => {
                return Err(XlsError::SheetOffsetOutOfRange {
                    name: info.name.clone(),
                    offset: info.offset,
                    len: stream.len(),
                });
            },
        }

        SheetScanner::new(&mut sheet, globals, options).scan(&mut iter)?;
        Ok(sheet)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position among the workbook's sheets.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Stream offset of the sheet's BOF.
    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    #[inline]
    pub fn visibility(&self) -> SheetVisibility {
        self.visibility
    }

    #[inline]
    pub fn sheet_type(&self) -> SheetType {
        self.sheet_type
    }

    #[inline]
    pub fn calc_settings(&self) -> &CalcSettings {
        &self.calc
    }

    /// Range declared by the DIMENSIONS record.
    #[inline]
    pub fn declared_dimensions(&self) -> Option<CellRange> {
        self.dimensions
    }

    #[inline]
    pub fn row_info(&self, row: u32) -> Option<&RowInfo> {
        self.rows.get(&row)
    }

    pub fn row_infos(&self) -> impl Iterator<Item = &RowInfo> {
        self.rows.values()
    }

    #[inline]
    pub fn merged_cells(&self) -> &[CellRange] {
        &self.merged
    }

    /// Get cell at position
    #[inline]
    pub fn cell(&self, row: u32, col: u32) -> Option<&XlsCell> {
        self.cells.get(&(row, col))
    }

    /// All stored cells in row-major order, formatted blanks included.
    pub fn cells(&self) -> impl Iterator<Item = &XlsCell> {
        self.cells.values()
    }

    /// Range spanned by cells holding a value.
    pub fn used_range(&self) -> Option<CellRange> {
        let mut values = self.cells.values().filter(|c| !c.value().is_empty());
        let first = values.next()?;
        let mut range = CellRange {
            first_row: first.row(),
            first_col: first.column(),
            last_row: first.row(),
            last_col: first.column(),
        };
        for cell in values {
            range.first_col = range.first_col.min(cell.column());
            range.last_col = range.last_col.max(cell.column());
            range.last_row = range.last_row.max(cell.row());
        }
        Some(range)
    }

    /// Add a cell to the worksheet
    pub fn add_cell(&mut self, cell: XlsCell) {
        self.cells.insert((cell.row(), cell.column()), cell);
    }
}

impl Worksheet for XlsWorksheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> Option<CellRange> {
        self.used_range()
    }

    fn cell_value(&self, row: u32, column: u32) -> Option<&CellValue> {
        self.cells.get(&(row, column)).map(XlsCell::value)
    }
}

/// Walks the records of one sheet substream.
struct SheetScanner<'s, 'g> {
    sheet: &'s mut XlsWorksheet,
    globals: &'g WorkbookGlobals,
    biff: BiffVersion,
    convert_dates: bool,
    /// Cell awaiting the STRING record with its formula text
    pending_string: Option<(u32, u32)>,
}

impl<'s, 'g> SheetScanner<'s, 'g> {
    fn new(sheet: &'s mut XlsWorksheet, globals: &'g WorkbookGlobals, options: &ReaderOptions) -> Self {
        SheetScanner {
            sheet,
            globals,
            biff: globals.biff_version(),
            convert_dates: options.convert_dates,
            pending_string: None,
        }
    }

    fn scan(&mut self, iter: &mut RecordIter<'_>) -> XlsResult<()> {
        // Charts embedded in a sheet nest their own BOF/EOF pair
        let mut depth = 1usize;
        for record in iter {
            let record = record?;
            if is_bof(record.id()) {
                depth += 1;
                continue;
            }
            if record.id() == ids::EOF {
                depth -= 1;
                if depth == 0 {
                    break;
                }
                continue;
            }
            if depth == 1 {
                self.handle(&record);
            }
        }
        Ok(())
    }

    fn handle(&mut self, record: &BiffRecord<'_>) {
        match record.id() {
            ids::DIMENSIONS | ids::DIMENSIONS_BIFF2 => {
                self.sheet.dimensions = Dimensions::new(*record, self.biff).range();
            },
            ids::ROW | ids::ROW_BIFF2 => {
                let row = Row::new(*record, self.biff);
                let info = RowInfo {
                    index: row.row_index() as u32,
                    first_column: row.first_defined_column(),
                    last_column: row.last_defined_column(),
                    height: row.row_height(),
                    flags: row.flags(),
                    xf_index: row.uses_xf().then(|| row.xf_index()),
                };
                self.sheet.rows.insert(info.index, info);
            },
            ids::CALCMODE => self.sheet.calc.mode = sheet::calc_mode(record),
            ids::CALCCOUNT => self.sheet.calc.count = sheet::calc_count(record),
            ids::REFMODE => self.sheet.calc.ref_mode = sheet::ref_mode(record),
            ids::ITERATION => self.sheet.calc.iteration = sheet::iteration(record),
            ids::DELTA => self.sheet.calc.delta = sheet::delta(record),
            ids::MERGECELLS => self.sheet.merged.extend(sheet::merged_ranges(record)),
            ids::STRING | ids::STRING_BIFF2 => {
                if let Some(pos) = self.pending_string.take() {
                    let text = FormulaString::new(*record, self.biff).text(self.globals.encoding());
                    if let Some(cell) = self.sheet.cells.get_mut(&pos) {
                        *cell.value_mut() = CellValue::String(text);
                    }
                }
            },
            _ => {
                if let Some(cell) = CellRecord::from_record(*record, self.biff) {
                    self.pending_string = None;
                    self.handle_cell(cell);
                }
            },
        }
    }

    fn handle_cell(&mut self, record: CellRecord<'_>) {
        match record {
            CellRecord::Blank(c) => self.push(&c, CellValue::Empty),
            CellRecord::Integer(c) => {
                let value = self.numeric(c.value() as f64, c.xf_index(), true);
                self.push(&c, value);
            },
            CellRecord::Number(c) => {
                let value = self.numeric(c.value(), c.xf_index(), false);
                self.push(&c, value);
            },
            CellRecord::Rk(c) => {
                let value = self.numeric(c.value(), c.xf_index(), false);
                self.push(&c, value);
            },
            CellRecord::BoolErr(c) => self.push(&c, c.value()),
            CellRecord::Label(c) => {
                let text = c.text(self.globals.encoding());
                self.push(&c, CellValue::String(text));
            },
            CellRecord::LabelSst(c) => {
                let value = match c.text(self.globals.shared_strings()) {
                    Some(text) => CellValue::String(text.to_owned()),
                    None => {
                        log::warn!(
                            "sheet '{}': shared string index {} out of range ({} strings)",
                            self.sheet.name,
                            c.sst_index(),
                            self.globals.shared_strings().len()
                        );
                        CellValue::Empty
                    },
                };
                self.push(&c, value);
            },
            CellRecord::Formula(c) => {
                let value = match c.result() {
                    FormulaResult::Number(n) => self.numeric(n, c.xf_index(), false),
                    FormulaResult::Bool(b) => CellValue::Bool(b),
                    FormulaResult::Error(e) => CellValue::Error(e),
                    FormulaResult::Empty => CellValue::String(String::new()),
                    FormulaResult::String => {
                        self.pending_string = Some((c.row_index() as u32, c.column_index() as u32));
                        CellValue::String(String::new())
                    },
                };
                let (row, col) = (c.row_index() as u32, c.column_index() as u32);
                self.check_row_bounds(row, col);
                self.sheet.add_cell(XlsCell::formula(row, col, c.xf_index(), value));
            },
            CellRecord::MulBlank(m) => {
                let row = m.row_index() as u32;
                let (first, last) = (m.first_column(), m.last_column());
                self.check_run_trailer("MULBLANK", row, first, last, m.entry_count());
                for col in m.columns() {
                    self.check_row_bounds(row, col as u32);
                    self.sheet
                        .add_cell(XlsCell::new(row, col as u32, m.xf_at(col), CellValue::Empty));
                }
            },
            CellRecord::MulRk(m) => {
                let row = m.row_index() as u32;
                let (first, last) = (m.first_column(), m.last_column());
                self.check_run_trailer("MULRK", row, first, last, m.entry_count());
                for col in m.columns() {
                    let xf = m.xf_at(col);
                    let value = self.numeric(m.value_at(col), xf, false);
                    self.check_row_bounds(row, col as u32);
                    self.sheet.add_cell(XlsCell::new(row, col as u32, xf, value));
                }
            },
        }
    }

    fn push<'a, C: BiffCell<'a>>(&mut self, cell: &C, value: CellValue) {
        let (row, col) = (cell.row_index() as u32, cell.column_index() as u32);
        self.check_row_bounds(row, col);
        self.sheet.add_cell(XlsCell::new(row, col, cell.xf_index(), value));
    }

    /// Numbers formatted as dates become timestamps when requested.
    fn numeric(&self, value: f64, xf_index: u16, integer: bool) -> CellValue {
        if self.convert_dates && self.globals.is_date_xf(xf_index) {
            if let Some(dt) = excel_date_to_datetime(value, self.globals.is_1904()) {
                return CellValue::DateTime(dt);
            }
        }
        if integer {
            CellValue::Int(value as i64)
        } else {
            CellValue::Number(value)
        }
    }

    fn check_run_trailer(&self, kind: &str, row: u32, first: u16, last: u16, entries: usize) {
        let declared = (last as usize + 1).saturating_sub(first as usize);
        if declared != entries {
            log::warn!(
                "sheet '{}': {} in row {} declares columns {}..={} but holds {} entries",
                self.sheet.name,
                kind,
                row,
                first,
                last,
                entries
            );
        }
    }

    fn check_row_bounds(&self, row: u32, col: u32) {
        if let Some(info) = self.sheet.rows.get(&row) {
            let col = col as u16;
            if col < info.first_column || col >= info.last_column {
                log::warn!(
                    "sheet '{}': cell ({}, {}) outside row range {}..{}",
                    self.sheet.name,
                    row,
                    col,
                    info.first_column,
                    info.last_column
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::xls::globals::tests::{bof_payload, xf_biff8};
    use crate::ole::xls::record::tests::record_bytes;

    fn cell(id: u16, row: u16, col: u16, xf: u16, value: &[u8]) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&row.to_le_bytes());
        payload.extend_from_slice(&col.to_le_bytes());
        payload.extend_from_slice(&xf.to_le_bytes());
        payload.extend_from_slice(value);
        record_bytes(id, &payload)
    }

    fn globals_with_xfs(formats: &[u16]) -> WorkbookGlobals {
        let options = ReaderOptions::default();
        let mut globals = WorkbookGlobals::new(BiffVersion::Biff8, &options);
        for &fmt in formats {
            let bytes = xf_biff8(fmt);
            globals.apply(&BiffRecord::at(&bytes, 0).unwrap()).unwrap();
        }
        globals
    }

    fn sheet_stream(body: &[Vec<u8>]) -> Vec<u8> {
        let mut stream = record_bytes(ids::BOF, &bof_payload(0x0600, 0x0010));
        for record in body {
            stream.extend_from_slice(record);
        }
        stream.extend(record_bytes(ids::EOF, &[]));
        stream
    }

    fn info(offset: u32) -> SheetInfo {
        SheetInfo {
            name: "Sheet1".into(),
            offset,
            visibility: SheetVisibility::Visible,
            sheet_type: SheetType::Worksheet,
        }
    }

    #[test]
    fn test_cells_and_dates() {
        let globals = globals_with_xfs(&[0, 14]);
        let mut formula = 0u64.to_le_bytes().to_vec();
        formula[0] = 0x00;
        formula[6] = 0xFF;
        formula[7] = 0xFF;
        formula.extend_from_slice(&[0u8; 6]);
        let mut text = 3u16.to_le_bytes().to_vec();
        text.push(0);
        text.extend_from_slice(b"abc");

        let stream = sheet_stream(&[
            cell(ids::NUMBER, 0, 0, 0, &3.5f64.to_le_bytes()),
            cell(ids::NUMBER, 0, 1, 1, &45000.0f64.to_le_bytes()),
            cell(ids::RK, 1, 0, 0, &((7u32 << 2) | 0x02).to_le_bytes()),
            cell(ids::BOOLERR, 1, 1, 0, &[1, 0]),
            cell(ids::FORMULA, 2, 0, 0, &formula),
            record_bytes(ids::STRING, &text),
        ]);
        let sheet = XlsWorksheet::parse(&stream, &info(0), 0, &globals, &ReaderOptions::default())
            .unwrap();

        assert_eq!(sheet.cell_value(0, 0), Some(&CellValue::Number(3.5)));
        assert!(matches!(sheet.cell_value(0, 1), Some(CellValue::DateTime(_))));
        assert_eq!(sheet.cell_value(1, 0), Some(&CellValue::Number(7.0)));
        assert_eq!(sheet.cell_value(1, 1), Some(&CellValue::Bool(true)));
        assert_eq!(sheet.cell_value(2, 0), Some(&CellValue::String("abc".into())));
        assert!(sheet.cell(2, 0).unwrap().is_formula());
        assert_eq!(
            sheet.used_range(),
            Some(CellRange { first_row: 0, first_col: 0, last_row: 2, last_col: 1 })
        );
    }

    #[test]
    fn test_dates_left_numeric_when_disabled() {
        let globals = globals_with_xfs(&[14]);
        let stream = sheet_stream(&[cell(ids::NUMBER, 0, 0, 0, &1.0f64.to_le_bytes())]);
        let options = ReaderOptions::default().with_convert_dates(false);
        let sheet = XlsWorksheet::parse(&stream, &info(0), 0, &globals, &options).unwrap();
        assert_eq!(sheet.cell_value(0, 0), Some(&CellValue::Number(1.0)));
    }

    #[test]
    fn test_rows_merges_and_calc() {
        let globals = globals_with_xfs(&[0]);
        let mut row = Vec::new();
        for v in [0u16, 0, 2, 0x8000 | 255, 0, 0, 0x0080, 0] {
            row.extend_from_slice(&v.to_le_bytes());
        }
        let mut merge = 1u16.to_le_bytes().to_vec();
        for v in [0u16, 1, 0, 1] {
            merge.extend_from_slice(&v.to_le_bytes());
        }
        let mut mulblank = Vec::new();
        for v in [0u16, 2, 0, 0, 3] {
            mulblank.extend_from_slice(&v.to_le_bytes());
        }
        let stream = sheet_stream(&[
            record_bytes(ids::CALCMODE, &0i16.to_le_bytes()),
            record_bytes(ids::CALCCOUNT, &50u16.to_le_bytes()),
            record_bytes(ids::ITERATION, &1u16.to_le_bytes()),
            record_bytes(ids::ROW, &row),
            cell(ids::NUMBER, 0, 0, 0, &1.0f64.to_le_bytes()),
            // outside the declared row range, kept anyway
            cell(ids::NUMBER, 0, 5, 0, &2.0f64.to_le_bytes()),
            record_bytes(ids::MULBLANK, &mulblank),
            record_bytes(ids::MERGECELLS, &merge),
        ]);
        let sheet = XlsWorksheet::parse(&stream, &info(0), 0, &globals, &ReaderOptions::default())
            .unwrap();
        let calc = sheet.calc_settings();
        assert_eq!(calc.mode, CalcMode::Manual);
        assert_eq!(calc.count, 50);
        assert!(calc.iteration);
        let row = sheet.row_info(0).unwrap();
        assert_eq!(row.height, 255);
        assert_eq!(row.xf_index, Some(0));
        assert_eq!(sheet.cell_value(0, 5), Some(&CellValue::Number(2.0)));
        assert_eq!(sheet.cell_value(0, 3), Some(&CellValue::Empty));
        assert_eq!(sheet.merged_cells().len(), 1);
        assert_eq!(sheet.row_count(), 1);
        assert_eq!(sheet.column_count(), 6);
    }

    #[test]
    fn test_overstated_mulrk_run_adds_only_present_cells() {
        let globals = globals_with_xfs(&[0]);
        let mut mulrk = Vec::new();
        mulrk.extend_from_slice(&0u16.to_le_bytes());
        mulrk.extend_from_slice(&0u16.to_le_bytes());
        mulrk.extend_from_slice(&0u16.to_le_bytes());
        mulrk.extend_from_slice(&((4u32 << 2) | 0x02).to_le_bytes());
        mulrk.extend_from_slice(&500u16.to_le_bytes());
        let stream = sheet_stream(&[record_bytes(ids::MULRK, &mulrk)]);
        let sheet = XlsWorksheet::parse(&stream, &info(0), 0, &globals, &ReaderOptions::default())
            .unwrap();
        assert_eq!(sheet.cells().count(), 1);
        assert_eq!(sheet.cell_value(0, 0), Some(&CellValue::Number(4.0)));
        assert!(sheet.cell(0, 300).is_none());
    }

    #[test]
    fn test_embedded_chart_substream_is_skipped() {
        let globals = globals_with_xfs(&[0]);
        let stream = sheet_stream(&[
            cell(ids::NUMBER, 0, 0, 0, &1.0f64.to_le_bytes()),
            record_bytes(ids::BOF, &bof_payload(0x0600, 0x0020)),
            cell(ids::NUMBER, 9, 9, 0, &9.0f64.to_le_bytes()),
            record_bytes(ids::EOF, &[]),
            cell(ids::NUMBER, 1, 0, 0, &2.0f64.to_le_bytes()),
        ]);
        let sheet = XlsWorksheet::parse(&stream, &info(0), 0, &globals, &ReaderOptions::default())
            .unwrap();
        assert!(sheet.cell(9, 9).is_none());
        assert_eq!(sheet.cell_value(1, 0), Some(&CellValue::Number(2.0)));
    }

    #[test]
    fn test_offset_out_of_range() {
        let globals = globals_with_xfs(&[]);
        let stream = sheet_stream(&[]);
        assert!(matches!(
            XlsWorksheet::parse(&stream, &info(4096), 0, &globals, &ReaderOptions::default()),
            Err(XlsError::SheetOffsetOutOfRange { offset: 4096, .. })
        ));
    }
}
