//! Unified spreadsheet API for `.xls` and `.xlsx` files.
//!
//! # Supported Formats
//!
//! - `.xls` - BIFF2-BIFF8, in a compound file or as a bare record stream
//! - `.xlsx` - Microsoft Excel 2007+ (Office Open XML)
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use longan::{ReaderOptions, Workbook};
//!
//! // Open either format - auto-detected
//! let workbook = Workbook::open("data.xlsx", &ReaderOptions::default())?;
//!
//! let sheet = workbook.sheet_by_index(0)?;
//! println!("{} has {} rows", sheet.name(), sheet.row_count());
//! # Ok::<(), longan::Error>(())
//! ```
//!
//! # Architecture
//!
//! The module provides both:
//! - **Unified API**: the [`Workbook`] enum for high-level operations
//! - **Trait-based API**: the [`Worksheet`] trait, implemented by the sheet
//!   types of both readers

pub mod traits;
mod workbook;

pub use traits::Worksheet;
pub use workbook::Workbook;
