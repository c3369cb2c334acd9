//! Legacy Excel (.xls) file format reader
//!
//! BIFF2 through BIFF8 workbooks. BIFF5 and BIFF8 live in the `Book` or
//! `Workbook` stream of a compound file; BIFF2-BIFF4 files are usually a
//! bare record stream holding a single sheet.
//!
//! The layers build on each other:
//! - [`record`]: borrowed record views and a forward iterator
//! - [`records`]: typed views per record kind
//! - [`string`]: codepage and UTF-16 string decoding
//! - [`globals`], [`worksheet`], [`workbook`]: the decoded model
//!
//! ```no_run
//! use longan::ReaderOptions;
//! use longan::ole::xls::XlsWorkbook;
//!
//! let workbook = XlsWorkbook::open("book.xls", &ReaderOptions::default())?;
//! for sheet in workbook.worksheets() {
//!     for cell in sheet.cells() {
//!         println!("{} = {}", cell.coordinate(), cell.value());
//!     }
//! }
//! # Ok::<(), longan::ole::xls::XlsError>(())
//! ```

/// Cell value parsing and representation
pub mod cell;

/// Error types for XLS parsing
mod error;

/// Workbook globals section
pub mod globals;

/// Record header view and iterator
pub mod record;

/// Typed record views
pub mod records;

/// String decoding
pub mod string;

/// Workbook parsing implementation
pub mod workbook;

/// Worksheet parsing implementation
pub mod worksheet;

pub use cell::XlsCell;
pub use error::{XlsError, XlsResult};
pub use globals::{SheetInfo, WorkbookGlobals, XlsFont, XlsFormat, XlsStyle, XlsXf};
pub use record::{BiffRecord, BiffVersion, RecordIter};
pub use string::XlsEncoding;
pub use workbook::XlsWorkbook;
pub use worksheet::{CalcSettings, RowInfo, XlsWorksheet};
