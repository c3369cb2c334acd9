//! Longan - a read-only reader for Excel workbooks
//!
//! This library reads the legacy binary BIFF format (`.xls`, BIFF2 through
//! BIFF8) and the zip-packaged Office Open XML format (`.xlsx`) into one
//! cell model.
//!
//! # Features
//!
//! - **BIFF record reader**: borrowed views over records with tolerant field access
//! - **Compound file parser**: sector chains, mini streams and the directory tree
//! - **String decoding**: codepage runs and UTF-16, including SST strings split across CONTINUE records
//! - **OOXML extraction**: scoped temporary extraction of `.xlsx` packages
//!
//! Both readers are feature-gated (`ole`, `ooxml`) and enabled by default.
//!
//! # Example - Reading any workbook
//!
//! ```no_run
//! use longan::{CellValue, ReaderOptions, Workbook};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ReaderOptions::default().with_hidden_sheets(false);
//! let workbook = Workbook::open("report.xls", &options)?;
//!
//! for name in workbook.sheet_names() {
//!     let rows = workbook.rows(name)?;
//!     let numbers = rows.iter().flatten().filter(|v| matches!(v, CellValue::Number(_))).count();
//!     println!("{name}: {} rows, {numbers} numbers", rows.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Low-level record access
//!
//! ```no_run
//! use longan::ReaderOptions;
//! use longan::ole::xls::XlsWorkbook;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let workbook = XlsWorkbook::open("legacy.xls", &ReaderOptions::default())?;
//! for record in workbook.records() {
//!     let record = record?;
//!     println!("0x{:04X} ({} bytes)", record.id(), record.size());
//! }
//! # Ok(())
//! # }
//! ```

/// Types shared by both readers: cell values, references, number formats,
/// format detection and the unified error type
pub mod common;

/// Reader options
pub mod config;

/// OLE2 compound file parser and the BIFF (`.xls`) reader
#[cfg(feature = "ole")]
pub mod ole;

/// OOXML (`.xlsx`) package extraction and part parsers
#[cfg(feature = "ooxml")]
pub mod ooxml;

/// Format-independent workbook facade
pub mod sheet;

pub use common::{CellError, CellRange, CellValue, Error, FileFormat, Result, SheetVisibility};
pub use config::ReaderOptions;
pub use sheet::{Workbook, Worksheet};
