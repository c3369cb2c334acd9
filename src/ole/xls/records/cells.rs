//! Cell records.
//!
//! Every cell record starts with the row and column. From BIFF3 on, the XF
//! index follows as a `u16` and the value starts at offset 6; BIFF2 cells
//! instead carry a 3-byte attribute block (XF index in the low six bits of
//! the first byte) and the value starts at offset 7.

use crate::common::cell::{CellError, CellValue};
use crate::ole::xls::record::{BiffRecord, BiffVersion, ids};
use crate::ole::xls::records::sst::SharedStrings;
use crate::ole::xls::string::{self, XlsEncoding};

/// Decode an RK number.
///
/// Bit 0 divides the value by 100, bit 1 marks a 30-bit signed integer in
/// the upper bits; otherwise the upper 30 bits are the high bits of an
/// IEEE double.
///
/// ```
/// use longan::ole::xls::records::rk_to_f64;
///
/// assert_eq!(rk_to_f64((123 << 2) | 0x02), 123.0);
/// assert_eq!(rk_to_f64((12345 << 2) | 0x03), 123.45);
/// assert_eq!(rk_to_f64(0x3FF0_0000), 1.0);
/// ```
pub fn rk_to_f64(rk: u32) -> f64 {
    let value = if rk & 0x02 != 0 {
        ((rk as i32) >> 2) as f64
    } else {
        f64::from_bits(((rk & 0xFFFF_FFFC) as u64) << 32)
    };
    if rk & 0x01 != 0 { value / 100.0 } else { value }
}

/// Accessors shared by all single-cell records.
pub trait BiffCell<'a> {
    fn record(&self) -> &BiffRecord<'a>;
    fn biff(&self) -> BiffVersion;

    #[inline]
    fn row_index(&self) -> u16 {
        self.record().read_u16(0)
    }

    #[inline]
    fn column_index(&self) -> u16 {
        self.record().read_u16(2)
    }

    #[inline]
    fn xf_index(&self) -> u16 {
        if self.biff() == BiffVersion::Biff2 {
            (self.record().read_u8(4) & 0x3F) as u16
        } else {
            self.record().read_u16(4)
        }
    }

    /// Offset of the value, past the row, column and XF/attributes.
    #[inline]
    fn value_offset(&self) -> usize {
        if self.biff() == BiffVersion::Biff2 { 7 } else { 6 }
    }
}

macro_rules! cell_record {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name<'a> {
            record: BiffRecord<'a>,
            biff: BiffVersion,
        }

        impl<'a> $name<'a> {
            pub fn new(record: BiffRecord<'a>, biff: BiffVersion) -> Self {
                $name { record, biff }
            }
        }

        impl<'a> BiffCell<'a> for $name<'a> {
            #[inline]
            fn record(&self) -> &BiffRecord<'a> {
                &self.record
            }

            #[inline]
            fn biff(&self) -> BiffVersion {
                self.biff
            }
        }
    };
}

cell_record!(
    /// BLANK: a formatted cell with no value.
    Blank
);
cell_record!(
    /// INTEGER (BIFF2 only): unsigned 16-bit value.
    Integer
);
cell_record!(
    /// NUMBER: IEEE double.
    Number
);
cell_record!(
    /// RK: compressed number.
    Rk
);
cell_record!(
    /// BOOLERR: boolean or error literal.
    BoolErr
);
cell_record!(
    /// LABEL and RSTRING: inline text.
    Label
);
cell_record!(
    /// LABELSST: index into the shared string table.
    LabelSst
);
cell_record!(
    /// FORMULA: cached result of a formula.
    Formula
);

impl Integer<'_> {
    #[inline]
    pub fn value(&self) -> u16 {
        self.record.read_u16(7)
    }
}

impl Number<'_> {
    #[inline]
    pub fn value(&self) -> f64 {
        self.record.read_f64(self.value_offset())
    }
}

impl Rk<'_> {
    #[inline]
    pub fn raw(&self) -> u32 {
        self.record.read_u32(6)
    }

    #[inline]
    pub fn value(&self) -> f64 {
        rk_to_f64(self.raw())
    }
}

impl BoolErr<'_> {
    #[inline]
    pub fn is_error(&self) -> bool {
        self.record.read_u8(self.value_offset() + 1) != 0
    }

    pub fn value(&self) -> CellValue {
        let raw = self.record.read_u8(self.value_offset());
        if self.is_error() {
            CellValue::Error(CellError::from_biff(raw))
        } else {
            CellValue::Bool(raw != 0)
        }
    }
}

impl Label<'_> {
    pub fn text(&self, encoding: &XlsEncoding) -> String {
        string::read_label(&self.record, self.biff, encoding)
    }
}

impl LabelSst<'_> {
    #[inline]
    pub fn sst_index(&self) -> u32 {
        self.record.read_u32(6)
    }

    /// Resolve the text through a borrowed shared string table.
    pub fn text<'s>(&self, sst: &'s SharedStrings) -> Option<&'s str> {
        sst.get(self.sst_index() as usize)
    }
}

/// Cached result of a FORMULA record.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaResult {
    Number(f64),
    /// Text is stored in the STRING record that follows
    String,
    Bool(bool),
    Error(CellError),
    /// Empty string result
    Empty,
}

impl Formula<'_> {
    /// Decode the 8-byte result field.
    ///
    /// When its last two bytes are 0xFFFF the first byte is a type tag and
    /// the field is not a double.
    pub fn result(&self) -> FormulaResult {
        let at = self.value_offset();
        if self.record.read_u16(at + 6) != 0xFFFF {
            return FormulaResult::Number(self.record.read_f64(at));
        }
        match self.record.read_u8(at) {
            0x00 => FormulaResult::String,
            0x01 => FormulaResult::Bool(self.record.read_u8(at + 2) != 0),
            0x02 => FormulaResult::Error(CellError::from_biff(self.record.read_u8(at + 2))),
            0x03 => FormulaResult::Empty,
            _ => FormulaResult::Number(self.record.read_f64(at)),
        }
    }

    /// Option flags (BIFF3+).
    #[inline]
    pub fn flags(&self) -> u16 {
        if self.biff == BiffVersion::Biff2 {
            0
        } else {
            self.record.read_u16(14)
        }
    }
}

/// STRING: text result of the preceding FORMULA.
#[derive(Debug, Clone, Copy)]
pub struct FormulaString<'a> {
    record: BiffRecord<'a>,
    biff: BiffVersion,
}

impl<'a> FormulaString<'a> {
    pub fn new(record: BiffRecord<'a>, biff: BiffVersion) -> Self {
        FormulaString { record, biff }
    }

    pub fn text(&self, encoding: &XlsEncoding) -> String {
        if self.biff == BiffVersion::Biff2 {
            string::read_short_string(&self.record, 0, self.biff, encoding).0
        } else {
            string::read_unicode_string(&self.record, 0, self.biff, encoding).0
        }
    }
}

fn run_columns(first: u16, last: u16, entries: usize) -> impl Iterator<Item = u16> {
    let declared = (last as u32 + 1).saturating_sub(first as u32);
    let count = declared.min(entries.min(u16::MAX as usize + 1) as u32);
    (0..count).map(move |i| first + i as u16)
}

/// MULBLANK: a run of blank cells in one row.
#[derive(Debug, Clone, Copy)]
pub struct MulBlank<'a>(BiffRecord<'a>);

impl<'a> MulBlank<'a> {
    pub fn new(record: BiffRecord<'a>) -> Self {
        MulBlank(record)
    }

    #[inline]
    pub fn row_index(&self) -> u16 {
        self.0.read_u16(0)
    }

    #[inline]
    pub fn first_column(&self) -> u16 {
        self.0.read_u16(2)
    }

    /// Last column, stored in the final two bytes.
    #[inline]
    pub fn last_column(&self) -> u16 {
        match self.0.size().checked_sub(2) {
            Some(at) => self.0.read_u16(at),
            None => 0,
        }
    }

    /// XF entries physically present between the header and the trailer.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.0.size().saturating_sub(6) / 2
    }

    /// Columns backed by an entry, capped when the trailer overstates the run.
    pub fn columns(&self) -> impl Iterator<Item = u16> {
        run_columns(self.first_column(), self.last_column(), self.entry_count())
    }

    /// XF index of `column`, or 0 outside `[first_column, last_column]`.
    pub fn xf_at(&self, column: u16) -> u16 {
        let first = self.first_column();
        if column < first || column > self.last_column() {
            return 0;
        }
        let entry = (column - first) as usize;
        if entry >= self.entry_count() {
            return 0;
        }
        self.0.read_u16(4 + 2 * entry)
    }
}

/// MULRK: a run of RK numbers in one row.
#[derive(Debug, Clone, Copy)]
pub struct MulRk<'a>(BiffRecord<'a>);

impl<'a> MulRk<'a> {
    pub fn new(record: BiffRecord<'a>) -> Self {
        MulRk(record)
    }

    #[inline]
    pub fn row_index(&self) -> u16 {
        self.0.read_u16(0)
    }

    #[inline]
    pub fn first_column(&self) -> u16 {
        self.0.read_u16(2)
    }

    #[inline]
    pub fn last_column(&self) -> u16 {
        match self.0.size().checked_sub(2) {
            Some(at) => self.0.read_u16(at),
            None => 0,
        }
    }

    /// (XF, RK) pairs physically present between the header and the trailer.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.0.size().saturating_sub(6) / 6
    }

    /// Columns backed by a pair, capped when the trailer overstates the run.
    pub fn columns(&self) -> impl Iterator<Item = u16> {
        run_columns(self.first_column(), self.last_column(), self.entry_count())
    }

    /// Byte offset of the 6-byte (XF, RK) pair for `column`.
    fn pair_offset(&self, column: u16) -> Option<usize> {
        let first = self.first_column();
        if column < first || column > self.last_column() {
            return None;
        }
        let entry = (column - first) as usize;
        (entry < self.entry_count()).then_some(4 + 6 * entry)
    }

    /// XF index of `column`, or 0 outside `[first_column, last_column]`.
    pub fn xf_at(&self, column: u16) -> u16 {
        self.pair_offset(column)
            .map_or(0, |at| self.0.read_u16(at))
    }

    /// Raw RK value of `column`, or 0 outside `[first_column, last_column]`.
    pub fn rk_at(&self, column: u16) -> u32 {
        self.pair_offset(column)
            .map_or(0, |at| self.0.read_u32(at + 2))
    }

    /// Decoded value of `column`, or 0.0 outside `[first_column, last_column]`.
    pub fn value_at(&self, column: u16) -> f64 {
        rk_to_f64(self.rk_at(column))
    }
}

/// Any record that defines cells.
#[derive(Debug, Clone, Copy)]
pub enum CellRecord<'a> {
    Blank(Blank<'a>),
    Integer(Integer<'a>),
    Number(Number<'a>),
    Rk(Rk<'a>),
    BoolErr(BoolErr<'a>),
    Label(Label<'a>),
    LabelSst(LabelSst<'a>),
    Formula(Formula<'a>),
    MulBlank(MulBlank<'a>),
    MulRk(MulRk<'a>),
}

impl<'a> CellRecord<'a> {
    /// Classify `record`; `None` for records that are not cells.
    pub fn from_record(record: BiffRecord<'a>, biff: BiffVersion) -> Option<Self> {
        Some(match record.id() {
            ids::BLANK | ids::BLANK_BIFF2 => CellRecord::Blank(Blank::new(record, biff)),
            ids::INTEGER_BIFF2 => CellRecord::Integer(Integer::new(record, biff)),
            ids::NUMBER | ids::NUMBER_BIFF2 => CellRecord::Number(Number::new(record, biff)),
            ids::RK | ids::RK_BIFF3 => CellRecord::Rk(Rk::new(record, biff)),
            ids::BOOLERR | ids::BOOLERR_BIFF2 => CellRecord::BoolErr(BoolErr::new(record, biff)),
            ids::LABEL | ids::LABEL_BIFF2 | ids::RSTRING => {
                CellRecord::Label(Label::new(record, biff))
            },
            ids::LABELSST => CellRecord::LabelSst(LabelSst::new(record, biff)),
            ids::FORMULA | ids::FORMULA_BIFF3 | ids::FORMULA_BIFF4 => {
                CellRecord::Formula(Formula::new(record, biff))
            },
            ids::MULBLANK => CellRecord::MulBlank(MulBlank::new(record)),
            ids::MULRK => CellRecord::MulRk(MulRk::new(record)),
            _ => return None,
        })
    }

    /// Row of the cell (or of the run).
    pub fn row_index(&self) -> u16 {
        match self {
            CellRecord::Blank(c) => c.row_index(),
            CellRecord::Integer(c) => c.row_index(),
            CellRecord::Number(c) => c.row_index(),
            CellRecord::Rk(c) => c.row_index(),
            CellRecord::BoolErr(c) => c.row_index(),
            CellRecord::Label(c) => c.row_index(),
            CellRecord::LabelSst(c) => c.row_index(),
            CellRecord::Formula(c) => c.row_index(),
            CellRecord::MulBlank(c) => c.row_index(),
            CellRecord::MulRk(c) => c.row_index(),
        }
    }
}
