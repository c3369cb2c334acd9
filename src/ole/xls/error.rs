//! Error types for XLS file parsing

use thiserror::Error;

use crate::common::binary::BinaryError;
use crate::ole::OleError;

/// Result type alias for XLS operations
pub type XlsResult<T> = Result<T, XlsError>;

/// Errors that can occur during XLS file parsing
#[derive(Debug, Error)]
pub enum XlsError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CFB (Compound File Binary) error
    #[error("CFB error: {0}")]
    Cfb(#[from] OleError),

    /// Record bytes shorter than the record needs
    #[error("Record 0x{record_type:04X} too short: expected {expected} bytes, found {found}")]
    RecordTooShort {
        record_type: u16,
        expected: usize,
        found: usize,
    },

    /// Invalid BIFF record
    #[error("Invalid record 0x{record_type:04X}: {message}")]
    InvalidRecord { record_type: u16, message: String },

    /// Unsupported BIFF version
    #[error("Unsupported BIFF version: 0x{0:04X}")]
    UnsupportedBiffVersion(u16),

    /// Workbook is encrypted (FILEPASS record present)
    #[error("Workbook is password protected")]
    PasswordProtected,

    /// Unexpected record type
    #[error("Unexpected record type: expected 0x{expected:04X}, found 0x{found:04X}")]
    UnexpectedRecordType { expected: u16, found: u16 },

    /// Neither `Workbook` nor `Book` stream exists
    #[error("No workbook stream in compound file")]
    MissingWorkbookStream,

    /// Worksheet not found
    #[error("Worksheet '{0}' not found")]
    WorksheetNotFound(String),

    /// Sheet offset points outside the workbook stream
    #[error("Sheet '{name}' offset {offset} outside stream of {len} bytes")]
    SheetOffsetOutOfRange { name: String, offset: u32, len: usize },

    /// Low-level read failure
    #[error("Invalid data: {0}")]
    InvalidData(#[from] BinaryError),
}
