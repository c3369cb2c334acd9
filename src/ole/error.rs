//! Error types for compound file parsing.

use std::io;

use thiserror::Error;

use crate::common::binary::BinaryError;

/// Result type for compound file operations.
pub type OleResult<T> = Result<T, OleError>;

/// Error types for OLE file parsing
#[derive(Debug, Error)]
pub enum OleError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Header or structure violates the compound file format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Field could not be read
    #[error("Invalid data: {0}")]
    InvalidData(#[from] BinaryError),

    /// Signature does not match
    #[error("Not an OLE file")]
    NotOleFile,

    /// Sector chain or directory is damaged
    #[error("Corrupted file: {0}")]
    CorruptedFile(String),

    /// No entry with the requested path
    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    /// Entry exists but has the wrong type for the operation
    #[error("'{name}' is not a {expected}")]
    WrongEntryType {
        name: String,
        expected: &'static str,
    },
}
