/// Codepage decoding for 8-bit text
pub mod codepage;

/// Constants for OLE file format
pub mod consts;

/// Directory entries and the SID-indexed tree
pub mod directory;

mod error;

/// Main OLE file parsing implementation
mod file;

/// Compound file header
pub mod header;

/// Legacy Excel workbook (.xls) reader
///
/// BIFF2 through BIFF8 record views, the workbook globals and worksheet
/// models, and the reader that walks a `Workbook`/`Book` stream.
pub mod xls;

// Re-export public types for convenient access
pub use directory::{DirectoryEntry, DirectoryTree, EntryType, NodeColor};
pub use error::{OleError, OleResult};
pub use file::{OleFile, is_ole_file};
pub use header::CompoundHeader;
