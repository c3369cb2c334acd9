//! Types and helpers shared by the `.xls` and `.xlsx` readers.

pub mod binary;
pub mod cell;
pub mod detection;
pub mod error;
pub mod number_format;
pub mod visibility;

pub use cell::{CellError, CellRange, CellValue};
pub use detection::{FileFormat, detect_format};
pub use error::{Error, Result};
pub use visibility::SheetVisibility;
