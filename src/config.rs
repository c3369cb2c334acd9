//! Reader options.
//!
//! Options are plain values handed to each reader; nothing in the crate keeps
//! process-wide settings. They can be built in code or loaded from YAML:
//!
//! ```
//! use longan::ReaderOptions;
//!
//! let options = ReaderOptions::from_yaml_str("codepage: 1251\nconvert_dates: false\n").unwrap();
//! assert_eq!(options.codepage, 1251);
//! assert!(!options.convert_dates);
//! assert!(options.include_hidden_sheets);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::common::error::{Error, Result};

/// Default codepage for 8-bit strings when a workbook does not say otherwise.
pub const DEFAULT_CODEPAGE: u16 = 1252;

/// Default cap on the number of shared strings pre-allocated from a declared count.
pub const DEFAULT_MAX_SST_STRINGS: usize = 1 << 20;

/// Options controlling how workbooks are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Codepage for single-byte runs when the file has no CODEPAGE record,
    /// and for BIFF8 "compressed" runs (whose CODEPAGE is always 1200).
    pub codepage: u16,
    /// Turn numeric cells with a date number format into `CellValue::DateTime`.
    pub convert_dates: bool,
    /// Keep hidden and very hidden sheets.
    pub include_hidden_sheets: bool,
    /// Base directory for extracted `.xlsx` packages; the system temp dir if unset.
    pub temp_dir: Option<PathBuf>,
    /// Upper bound for pre-allocating shared strings from a declared count.
    pub max_sst_strings: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            codepage: DEFAULT_CODEPAGE,
            convert_dates: true,
            include_hidden_sheets: true,
            temp_dir: None,
            max_sst_strings: DEFAULT_MAX_SST_STRINGS,
        }
    }
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a YAML document; missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_saphyr::from_str(yaml).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load options from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_saphyr::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn with_codepage(mut self, codepage: u16) -> Self {
        self.codepage = codepage;
        self
    }

    pub fn with_convert_dates(mut self, convert_dates: bool) -> Self {
        self.convert_dates = convert_dates;
        self
    }

    pub fn with_hidden_sheets(mut self, include: bool) -> Self {
        self.include_hidden_sheets = include;
        self
    }

    pub fn with_temp_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }
}
