//! Unified error type.
//!
//! Each layer has its own error enum; this one wraps them so the facade in
//! the crate root can hand callers a single type.

use thiserror::Error;

/// Main error type for longan operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Compound file error
    #[cfg(feature = "ole")]
    #[error(transparent)]
    Ole(#[from] crate::ole::OleError),

    /// BIFF parsing error
    #[cfg(feature = "ole")]
    #[error(transparent)]
    Xls(#[from] crate::ole::xls::XlsError),

    /// OOXML package or part error
    #[cfg(feature = "ooxml")]
    #[error(transparent)]
    Ooxml(#[from] crate::ooxml::OoxmlError),

    /// Low-level read failure
    #[error(transparent)]
    Binary(#[from] crate::common::binary::BinaryError),

    /// Options could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input is neither a BIFF nor an OOXML workbook
    #[error("Not a recognized spreadsheet format")]
    UnknownFormat,

    /// Format recognized but its reader was compiled out
    #[error("Feature '{0}' is disabled. Enable it with --features {0}")]
    FeatureDisabled(&'static str),

    /// Sheet lookup failed
    #[error("Worksheet '{0}' not found")]
    WorksheetNotFound(String),
}

/// Result type for longan operations.
pub type Result<T> = std::result::Result<T, Error>;
