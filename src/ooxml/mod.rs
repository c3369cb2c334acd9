//! Office Open XML (OOXML) spreadsheet support.
//!
//! An `.xlsx` file is a zip package of XML parts. The module is organized
//! into two layers:
//!
//! 1. **Package layer** ([`zip_worker`]): extraction to a scoped temporary
//!    directory and lookup of the well-known parts
//! 2. **Spreadsheet layer** ([`xlsx`]): parsers for the workbook, styles,
//!    shared strings and worksheet parts
//!
//! # Example
//!
//! ```rust,no_run
//! use longan::ReaderOptions;
//! use longan::ooxml::xlsx::XlsxWorkbook;
//!
//! let workbook = XlsxWorkbook::open("book.xlsx", &ReaderOptions::default())?;
//! for sheet in workbook.worksheets() {
//!     println!("{}: {} cells", sheet.name(), sheet.cell_count());
//! }
//! # Ok::<(), longan::ooxml::OoxmlError>(())
//! ```

mod error;
pub mod xlsx;
pub mod zip_worker;

pub use error::{OoxmlError, Result};
pub use zip_worker::ZipWorker;
