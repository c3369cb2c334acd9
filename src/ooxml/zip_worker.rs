//! Extraction of zip-packaged workbooks to a scoped temporary directory.
//!
//! [`ZipWorker`] unpacks every entry of an OOXML package into a fresh
//! directory and hands out [`File`] handles for the well-known parts by
//! their fixed relative paths. The directory lives as long as the worker;
//! dropping the worker (or calling [`ZipWorker::cleanup`]) removes it.
//!
//! Extraction fails closed: if any entry cannot be written, or the
//! resulting tree lacks the parts every workbook has, the directory is
//! removed before the error is returned and the worker reports
//! `is_valid() == false` with the reason in `exception_message()`.
//!
//! ```no_run
//! use std::fs::File;
//! use longan::ReaderOptions;
//! use longan::ooxml::ZipWorker;
//!
//! let mut worker = ZipWorker::new(&ReaderOptions::default());
//! worker.extract(File::open("book.xlsx")?)?;
//! let workbook_xml = worker.workbook_stream();
//! assert!(workbook_xml.is_some());
//! # Ok::<(), longan::ooxml::OoxmlError>(())
//! ```

use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::{Component, Path, PathBuf};

use log::{debug, warn};
use tempfile::TempDir;
use zip::ZipArchive;

use crate::config::ReaderOptions;
use crate::ooxml::error::{OoxmlError, Result};

const XL_FOLDER: &str = "xl";
const WORKSHEETS_FOLDER: &str = "worksheets";
const WORKBOOK_PART: &str = "workbook.xml";
const STYLES_PART: &str = "styles.xml";
const SHARED_STRINGS_PART: &str = "sharedStrings.xml";
const WORKBOOK_RELS_PART: &str = "_rels/workbook.xml.rels";
const TEMP_PREFIX: &str = "longan-";

/// Extracts an OOXML package and serves its parts from disk.
#[derive(Debug)]
pub struct ZipWorker {
    temp_base: Option<PathBuf>,
    dir: Option<TempDir>,
    is_valid: bool,
    exception_message: Option<String>,
}

impl ZipWorker {
    /// Create a worker; nothing touches the filesystem until [`extract`](Self::extract).
    pub fn new(options: &ReaderOptions) -> Self {
        ZipWorker {
            temp_base: options.temp_dir.clone(),
            dir: None,
            is_valid: false,
            exception_message: None,
        }
    }

    /// Extract `reader` into a new temporary directory.
    ///
    /// A previous extraction is removed first. On failure the new directory
    /// is removed as well and the error is both returned and recorded.
    pub fn extract<R: Read + Seek>(&mut self, reader: R) -> Result<()> {
        self.cleanup();
        self.exception_message = None;

        let dir = match self.create_temp_dir() {
            Ok(dir) => dir,
            Err(e) => return Err(self.fail(e)),
        };

        let extracted =
            Self::extract_into(reader, dir.path()).and_then(|()| Self::check_folder_tree(dir.path()));
        match extracted {
            Ok(()) => {
                debug!("extracted package to {}", dir.path().display());
                self.dir = Some(dir);
                self.is_valid = true;
                Ok(())
            },
            Err(e) => {
                if let Err(close_err) = dir.close() {
                    warn!("failed to remove extraction directory: {close_err}");
                }
                Err(self.fail(e))
            },
        }
    }

    fn create_temp_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX);
        let dir = match &self.temp_base {
            Some(base) => builder.tempdir_in(base)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    fn fail(&mut self, error: OoxmlError) -> OoxmlError {
        self.is_valid = false;
        self.exception_message = Some(error.to_string());
        error
    }

    fn extract_into<R: Read + Seek>(reader: R, root: &Path) -> Result<()> {
        let mut archive = ZipArchive::new(reader)?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let Some(relative) = entry.enclosed_name() else {
                return Err(OoxmlError::InvalidPackage(format!(
                    "entry escapes the package root: {}",
                    entry.name()
                )));
            };
            let target = root.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&target)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
        }

        Ok(())
    }

    /// Every workbook package has these folders and parts.
    fn check_folder_tree(root: &Path) -> Result<()> {
        let xl = root.join(XL_FOLDER);
        if !xl.is_dir() {
            return Err(OoxmlError::InvalidPackage(format!("missing folder {XL_FOLDER}/")));
        }
        if !xl.join(WORKSHEETS_FOLDER).is_dir() {
            return Err(OoxmlError::InvalidPackage(format!(
                "missing folder {XL_FOLDER}/{WORKSHEETS_FOLDER}/"
            )));
        }
        for part in [WORKBOOK_PART, STYLES_PART] {
            if !xl.join(part).is_file() {
                return Err(OoxmlError::InvalidPackage(format!("missing part {XL_FOLDER}/{part}")));
            }
        }
        Ok(())
    }

    /// Whether the last extraction succeeded and the directory is still present.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Why the last extraction failed.
    #[inline]
    pub fn exception_message(&self) -> Option<&str> {
        self.exception_message.as_deref()
    }

    /// Root of the extracted package.
    pub fn temp_path(&self) -> Option<&Path> {
        self.dir.as_ref().map(TempDir::path)
    }

    /// Remove the extracted files.
    pub fn cleanup(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!("failed to remove {}: {e}", path.display());
            }
        }
        self.is_valid = false;
    }

    /// `xl/workbook.xml`
    pub fn workbook_stream(&self) -> Option<File> {
        self.xl_part(WORKBOOK_PART)
    }

    /// `xl/styles.xml`
    pub fn styles_stream(&self) -> Option<File> {
        self.xl_part(STYLES_PART)
    }

    /// `xl/sharedStrings.xml`
    pub fn shared_strings_stream(&self) -> Option<File> {
        self.xl_part(SHARED_STRINGS_PART)
    }

    /// `xl/_rels/workbook.xml.rels`
    pub fn workbook_rels_stream(&self) -> Option<File> {
        self.xl_part(WORKBOOK_RELS_PART)
    }

    /// `xl/worksheets/sheet{sheet_id}.xml`
    pub fn worksheet_stream(&self, sheet_id: u32) -> Option<File> {
        self.xl_part(&format!("{WORKSHEETS_FOLDER}/sheet{sheet_id}.xml"))
    }

    /// Open a sheet by the target of its workbook relationship.
    ///
    /// Accepts package-absolute targets (`/xl/worksheets/sheet1.xml`),
    /// root-relative ones (`xl/worksheets/sheet1.xml`) and the usual
    /// workbook-relative form (`worksheets/sheet1.xml`).
    pub fn worksheet_stream_by_path(&self, path: &str) -> Option<File> {
        self.xl_part(normalize_part_path(path)?)
    }

    fn xl_part(&self, relative: &str) -> Option<File> {
        let root = self.temp_path()?.join(XL_FOLDER);
        let path = resolve_relative(&root, relative)?;
        File::open(path).ok()
    }
}

/// Strip the package root prefix from a part path, leaving it relative to `xl/`.
fn normalize_part_path(path: &str) -> Option<&str> {
    let path = path.trim_start_matches('/');
    let path = path.strip_prefix("xl/").unwrap_or(path);
    (!path.is_empty()).then_some(path)
}

/// Join `relative` under `root`, matching each component case-insensitively
/// when the exact name is absent. Part names in a package are
/// case-insensitive, and producers disagree on casing.
fn resolve_relative(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut current = root.to_path_buf();
    for component in Path::new(relative).components() {
        let Component::Normal(name) = component else {
            return None;
        };
        let exact = current.join(name);
        if exact.exists() {
            current = exact;
            continue;
        }
        let wanted = name.to_str()?;
        let found = fs::read_dir(&current).ok()?.flatten().find(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|n| n.eq_ignore_ascii_case(wanted))
        })?;
        current = found.path();
    }
    Some(current)
}
