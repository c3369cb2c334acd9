//! Excel (.xlsx) spreadsheet support.
//!
//! The package is extracted by [`ZipWorker`](crate::ooxml::ZipWorker) and
//! each part is parsed with a streaming `quick-xml` reader:
//!
//! - [`workbook`]: sheet list, 1904 flag, active tab and relationships
//! - [`styles`]: number formats and cell formats, for date detection
//! - [`shared_strings`]: the shared string table
//! - [`worksheet`]: cells of one sheet
//!
//! Values come out as the same [`CellValue`](crate::common::CellValue)
//! model the `.xls` reader produces.

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesRef, BytesStart, BytesText};

use crate::ooxml::error::{OoxmlError, Result};

/// Shared string table
pub mod shared_strings;

/// Number and cell formats
pub mod styles;

/// Workbook part and package orchestration
pub mod workbook;

/// Worksheet parts
pub mod worksheet;

pub use shared_strings::SharedStringTable;
pub use styles::{XlsxNumFmt, XlsxStyles, XlsxXf};
pub use workbook::{WorkbookPart, XlsxWorkbook};
pub use worksheet::XlsxWorksheet;

/// Raw value of attribute `name`.
fn raw_attr<'a>(e: &'a BytesStart<'_>, name: &[u8]) -> Result<Option<Attribute<'a>>> {
    Ok(e.try_get_attribute(name)?)
}

/// Unescaped string value of attribute `name`.
fn string_attr(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    match raw_attr(e, name)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// Integer attribute; unparsable values read as absent.
fn u32_attr(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<u32>> {
    Ok(raw_attr(e, name)?.and_then(|attr| atoi_simd::parse::<u32, false, false>(&attr.value).ok()))
}

/// `1`/`true` boolean attribute.
fn bool_attr(e: &BytesStart<'_>, name: &[u8]) -> Result<bool> {
    Ok(raw_attr(e, name)?.is_some_and(|attr| matches!(attr.value.as_ref(), b"1" | b"true")))
}

fn push_text(buf: &mut String, text: &BytesText<'_>) -> Result<()> {
    let text = std::str::from_utf8(text.as_ref())
        .map_err(|e| OoxmlError::Xml(format!("Invalid UTF-8 in text content: {}", e)))?;
    buf.push_str(text);
    Ok(())
}

/// Append the expansion of an entity or character reference.
fn push_reference(buf: &mut String, reference: &BytesRef<'_>) -> Result<()> {
    if let Some(ch) = reference.resolve_char_ref()? {
        buf.push(ch);
        return Ok(());
    }
    let name = std::str::from_utf8(reference.as_ref())
        .map_err(|e| OoxmlError::Xml(format!("Invalid UTF-8 in entity name: {}", e)))?;
    match quick_xml::escape::resolve_predefined_entity(name) {
        Some(expansion) => buf.push_str(expansion),
        None => return Err(OoxmlError::Xml(format!("Unknown entity: &{};", name))),
    }
    Ok(())
}
