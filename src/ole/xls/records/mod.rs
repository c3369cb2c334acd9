//! Typed views over BIFF records.
//!
//! Each view wraps a [`BiffRecord`](crate::ole::xls::record::BiffRecord)
//! and only exposes accessors; nothing is copied out of the stream until a
//! caller asks for it.

pub mod bof;
pub mod cells;
pub mod globals;
pub mod sheet;
pub mod sst;

pub use bof::{Bof, BofType};
pub use cells::{
    BiffCell, Blank, BoolErr, CellRecord, Formula, FormulaResult, FormulaString, Integer, Label,
    LabelSst, MulBlank, MulRk, Number, Rk, rk_to_f64,
};
pub use globals::{FontFlags, FontRecord, FormatRecord, StyleRecord, XfRecord};
pub use sheet::{
    BoundSheet, CalcMode, Dimensions, RefMode, Row, RowFlags, SheetType, SheetVisibility,
};
pub use sst::SharedStrings;

use crate::ole::xls::record::{BiffRecord, ids};

/// Whether `record` closes the current substream.
#[inline]
pub fn is_eof(record: &BiffRecord<'_>) -> bool {
    record.id() == ids::EOF
}
