//! Sheet-level records: BOUNDSHEET, ROW, DIMENSIONS, calculation settings
//! and merged ranges.

use bitflags::bitflags;

use crate::common::cell::CellRange;
use crate::ole::xls::record::{BiffRecord, BiffVersion};
use crate::ole::xls::string::{self, XlsEncoding};

pub use crate::common::SheetVisibility;

impl From<u8> for SheetVisibility {
    fn from(value: u8) -> Self {
        match value & 0x03 {
            0x00 => SheetVisibility::Visible,
            0x01 => SheetVisibility::Hidden,
            _ => SheetVisibility::VeryHidden,
        }
    }
}

/// Sheet types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetType {
    #[default]
    Worksheet,
    MacroSheet,
    Chart,
    VbModule,
    Unknown(u8),
}

impl From<u8> for SheetType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => SheetType::Worksheet,
            0x01 => SheetType::MacroSheet,
            0x02 => SheetType::Chart,
            0x06 => SheetType::VbModule,
            other => SheetType::Unknown(other),
        }
    }
}

/// BOUNDSHEET record view (0x0085).
#[derive(Debug, Clone, Copy)]
pub struct BoundSheet<'a>(BiffRecord<'a>);

impl<'a> BoundSheet<'a> {
    pub fn new(record: BiffRecord<'a>) -> Self {
        BoundSheet(record)
    }

    /// Stream offset of the sheet's BOF record.
    #[inline]
    pub fn start_offset(&self) -> u32 {
        self.0.read_u32(0)
    }

    #[inline]
    pub fn visibility(&self) -> SheetVisibility {
        SheetVisibility::from(self.0.read_u8(4))
    }

    #[inline]
    pub fn sheet_type(&self) -> SheetType {
        SheetType::from(self.0.read_u8(5))
    }

    pub fn name(&self, biff: BiffVersion, encoding: &XlsEncoding) -> String {
        string::read_short_string(&self.0, 6, biff, encoding).0
    }
}

bitflags! {
    /// ROW option flags (BIFF3+).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RowFlags: u16 {
        /// Outline level mask
        const OUTLINE_LEVEL = 0x0007;
        const COLLAPSED = 0x0010;
        const ZERO_HEIGHT = 0x0020;
        /// Height was set by the user and differs from the font height
        const UNSYNCED = 0x0040;
        /// The XF index at offset 14 applies to the whole row
        const USES_XF = 0x0080;
    }
}

/// ROW record view (0x0208, BIFF2 0x0008).
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    record: BiffRecord<'a>,
    biff: BiffVersion,
}

impl<'a> Row<'a> {
    pub fn new(record: BiffRecord<'a>, biff: BiffVersion) -> Self {
        Row { record, biff }
    }

    #[inline]
    pub fn row_index(&self) -> u16 {
        self.record.read_u16(0)
    }

    #[inline]
    pub fn first_defined_column(&self) -> u16 {
        self.record.read_u16(2)
    }

    /// One past the last column holding a cell.
    #[inline]
    pub fn last_defined_column(&self) -> u16 {
        self.record.read_u16(4)
    }

    /// Height in twips; bit 15 (default height) is masked off.
    #[inline]
    pub fn row_height(&self) -> u16 {
        self.record.read_u16(6) & 0x7FFF
    }

    pub fn flags(&self) -> RowFlags {
        if self.biff == BiffVersion::Biff2 {
            RowFlags::empty()
        } else {
            RowFlags::from_bits_truncate(self.record.read_u16(12))
        }
    }

    #[inline]
    pub fn outline_level(&self) -> u8 {
        (self.flags() & RowFlags::OUTLINE_LEVEL).bits() as u8
    }

    /// Whether the row carries a default XF.
    pub fn uses_xf(&self) -> bool {
        if self.biff == BiffVersion::Biff2 {
            self.record.size() >= 18
        } else {
            self.flags().contains(RowFlags::USES_XF)
        }
    }

    pub fn xf_index(&self) -> u16 {
        if self.biff == BiffVersion::Biff2 {
            self.record.read_u16(16)
        } else {
            self.record.read_u16(14) & 0x0FFF
        }
    }

    /// Whether `column` lies in `[first_defined_column, last_defined_column)`.
    #[inline]
    pub fn contains_column(&self, column: u16) -> bool {
        (self.first_defined_column()..self.last_defined_column()).contains(&column)
    }
}

/// DIMENSIONS record view (0x0200, BIFF2 0x0000).
///
/// Last row and column are exclusive.
#[derive(Debug, Clone, Copy)]
pub struct Dimensions<'a> {
    record: BiffRecord<'a>,
    biff: BiffVersion,
}

impl<'a> Dimensions<'a> {
    pub fn new(record: BiffRecord<'a>, biff: BiffVersion) -> Self {
        Dimensions { record, biff }
    }

    #[inline]
    fn wide_rows(&self) -> bool {
        self.biff == BiffVersion::Biff8
    }

    pub fn first_row(&self) -> u32 {
        if self.wide_rows() {
            self.record.read_u32(0)
        } else {
            self.record.read_u16(0) as u32
        }
    }

    pub fn last_row(&self) -> u32 {
        if self.wide_rows() {
            self.record.read_u32(4)
        } else {
            self.record.read_u16(2) as u32
        }
    }

    pub fn first_column(&self) -> u16 {
        self.record.read_u16(if self.wide_rows() { 8 } else { 4 })
    }

    pub fn last_column(&self) -> u16 {
        self.record.read_u16(if self.wide_rows() { 10 } else { 6 })
    }

    /// Inclusive used range, `None` for an empty sheet.
    pub fn range(&self) -> Option<CellRange> {
        if self.last_row() <= self.first_row() || self.last_column() <= self.first_column() {
            return None;
        }
        Some(CellRange {
            first_row: self.first_row(),
            first_col: self.first_column() as u32,
            last_row: self.last_row() - 1,
            last_col: self.last_column() as u32 - 1,
        })
    }
}

/// CALCMODE values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalcMode {
    Manual,
    #[default]
    Automatic,
    AutomaticExceptTables,
}

impl From<i16> for CalcMode {
    fn from(value: i16) -> Self {
        match value {
            0 => CalcMode::Manual,
            -1 => CalcMode::AutomaticExceptTables,
            _ => CalcMode::Automatic,
        }
    }
}

/// REFMODE values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefMode {
    #[default]
    A1,
    R1C1,
}

#[inline]
pub fn calc_mode(record: &BiffRecord<'_>) -> CalcMode {
    CalcMode::from(record.read_i16(0))
}

/// CALCCOUNT: iteration limit.
#[inline]
pub fn calc_count(record: &BiffRecord<'_>) -> u16 {
    record.read_u16(0)
}

#[inline]
pub fn ref_mode(record: &BiffRecord<'_>) -> RefMode {
    if record.read_u16(0) == 0 {
        RefMode::R1C1
    } else {
        RefMode::A1
    }
}

/// ITERATION: whether iterative calculation is enabled.
#[inline]
pub fn iteration(record: &BiffRecord<'_>) -> bool {
    record.read_u16(0) != 0
}

/// DELTA: maximum change for iterative calculation.
#[inline]
pub fn delta(record: &BiffRecord<'_>) -> f64 {
    record.read_f64(0)
}

/// MERGECELLS: inclusive ranges (row first, row last, col first, col last).
pub fn merged_ranges(record: &BiffRecord<'_>) -> Vec<CellRange> {
    let count = record.read_u16(0) as usize;
    let fit = record.size().saturating_sub(2) / 8;
    (0..count.min(fit))
        .map(|i| {
            let at = 2 + i * 8;
            CellRange {
                first_row: record.read_u16(at) as u32,
                last_row: record.read_u16(at + 2) as u32,
                first_col: record.read_u16(at + 4) as u32,
                last_col: record.read_u16(at + 6) as u32,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::xls::record::ids;
    use crate::ole::xls::record::tests::record_bytes;

    #[test]
    fn test_boundsheet_biff8() {
        let mut payload = 0x1234u32.to_le_bytes().to_vec();
        payload.extend_from_slice(&[0x01, 0x00, 6, 0]);
        payload.extend_from_slice(b"Sheet1");
        let bytes = record_bytes(ids::BOUNDSHEET, &payload);
        let sheet = BoundSheet::new(BiffRecord::at(&bytes, 0).unwrap());
        assert_eq!(sheet.start_offset(), 0x1234);
        assert_eq!(sheet.visibility(), SheetVisibility::Hidden);
        assert_eq!(sheet.sheet_type(), SheetType::Worksheet);
        let enc = XlsEncoding::from_codepage(1200, 1252);
        assert_eq!(sheet.name(BiffVersion::Biff8, &enc), "Sheet1");
    }

    #[test]
    fn test_boundsheet_biff5_codepage_name() {
        let mut payload = 0u32.to_le_bytes().to_vec();
        payload.extend_from_slice(&[0x02, 0x02, 4]);
        payload.extend_from_slice(b"\xC4\xE0\xED\xED");
        let bytes = record_bytes(ids::BOUNDSHEET, &payload);
        let sheet = BoundSheet::new(BiffRecord::at(&bytes, 0).unwrap());
        let enc = XlsEncoding::from_codepage(1251, 1252);
        assert_eq!(sheet.visibility(), SheetVisibility::VeryHidden);
        assert_eq!(sheet.sheet_type(), SheetType::Chart);
        assert_eq!(sheet.name(BiffVersion::Biff5, &enc), "Данн");
    }

    #[test]
    fn test_row_biff8() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&5u16.to_le_bytes());
        payload.extend_from_slice(&1u16.to_le_bytes());
        payload.extend_from_slice(&4u16.to_le_bytes());
        payload.extend_from_slice(&(0x8000u16 | 300).to_le_bytes());
        payload.extend_from_slice(&[0u8; 4]);
        payload.extend_from_slice(&(0x0080u16 | 0x0020 | 0x0002).to_le_bytes());
        payload.extend_from_slice(&(0xF000u16 | 17).to_le_bytes());
        let bytes = record_bytes(ids::ROW, &payload);
        let row = Row::new(BiffRecord::at(&bytes, 0).unwrap(), BiffVersion::Biff8);
        assert_eq!(row.row_index(), 5);
        assert_eq!(row.row_height(), 300);
        assert!(row.uses_xf());
        assert!(row.flags().contains(RowFlags::ZERO_HEIGHT));
        assert_eq!(row.outline_level(), 2);
        assert_eq!(row.xf_index(), 17);
        assert!(row.contains_column(1));
        assert!(row.contains_column(3));
        assert!(!row.contains_column(4));
        assert!(!row.contains_column(0));
    }

    #[test]
    fn test_row_biff2_xf_only_when_present() {
        let bytes = record_bytes(ids::ROW_BIFF2, &[0u8; 13]);
        let row = Row::new(BiffRecord::at(&bytes, 0).unwrap(), BiffVersion::Biff2);
        assert!(!row.uses_xf());
        assert_eq!(row.xf_index(), 0);

        let mut payload = vec![0u8; 16];
        payload.extend_from_slice(&9u16.to_le_bytes());
        let bytes = record_bytes(ids::ROW_BIFF2, &payload);
        let row = Row::new(BiffRecord::at(&bytes, 0).unwrap(), BiffVersion::Biff2);
        assert!(row.uses_xf());
        assert_eq!(row.xf_index(), 9);
    }

    #[test]
    fn test_dimensions() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.extend_from_slice(&70000u32.to_le_bytes());
        payload.extend_from_slice(&1u16.to_le_bytes());
        payload.extend_from_slice(&3u16.to_le_bytes());
        payload.extend_from_slice(&0u16.to_le_bytes());
        let bytes = record_bytes(ids::DIMENSIONS, &payload);
        let dim = Dimensions::new(BiffRecord::at(&bytes, 0).unwrap(), BiffVersion::Biff8);
        assert_eq!(dim.last_row(), 70000);
        assert_eq!(
            dim.range(),
            Some(CellRange { first_row: 0, first_col: 1, last_row: 69999, last_col: 2 })
        );

        let bytes = record_bytes(ids::DIMENSIONS_BIFF2, &[0, 0, 0, 0, 0, 0, 0, 0]);
        let dim = Dimensions::new(BiffRecord::at(&bytes, 0).unwrap(), BiffVersion::Biff2);
        assert_eq!(dim.range(), None);
    }

    #[test]
    fn test_calc_settings() {
        let bytes = record_bytes(ids::CALCMODE, &(-1i16).to_le_bytes());
        assert_eq!(calc_mode(&BiffRecord::at(&bytes, 0).unwrap()), CalcMode::AutomaticExceptTables);
        let bytes = record_bytes(ids::REFMODE, &0u16.to_le_bytes());
        assert_eq!(ref_mode(&BiffRecord::at(&bytes, 0).unwrap()), RefMode::R1C1);
        let bytes = record_bytes(ids::DELTA, &0.001f64.to_le_bytes());
        assert_eq!(delta(&BiffRecord::at(&bytes, 0).unwrap()), 0.001);
        let bytes = record_bytes(ids::CALCCOUNT, &100u16.to_le_bytes());
        assert_eq!(calc_count(&BiffRecord::at(&bytes, 0).unwrap()), 100);
    }

    #[test]
    fn test_merged_ranges_clamped_to_payload() {
        let mut payload = 3u16.to_le_bytes().to_vec();
        for v in [0u16, 1, 0, 2] {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        let bytes = record_bytes(ids::MERGECELLS, &payload);
        let ranges = merged_ranges(&BiffRecord::at(&bytes, 0).unwrap());
        assert_eq!(
            ranges,
            vec![CellRange { first_row: 0, first_col: 0, last_row: 1, last_col: 2 }]
        );
    }
}
