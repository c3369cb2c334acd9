//! Shared strings table for Excel files.
//!
//! Each `<si>` is either a plain `<t>` or a sequence of rich-text runs
//! `<r><t>…</t></r>`; runs are concatenated. Phonetic guides (`<rPh>`)
//! carry their own `<t>` elements and are not part of the cell text.

use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::events::Event;

use super::{push_reference, push_text, u32_attr};
use crate::ooxml::error::Result;

/// Upper bound for pre-allocating from the declared `uniqueCount`.
const MAX_PREALLOCATED_STRINGS: usize = 1 << 16;

/// Shared strings table for efficient string storage.
#[derive(Debug, Clone, Default)]
pub struct SharedStringTable {
    strings: Vec<String>,
}

impl SharedStringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `xl/sharedStrings.xml`.
    pub fn parse<R: BufRead>(input: R) -> Result<Self> {
        // Whitespace inside <t xml:space="preserve"> is significant
        let mut reader = Reader::from_reader(input);

        let mut strings = Vec::new();
        let mut current: Option<String> = None;
        let mut in_text = false;
        let mut phonetic_depth = 0usize;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => match e.local_name().as_ref() {
                    b"sst" => {
                        if let Some(count) = u32_attr(e, b"uniqueCount")? {
                            strings.reserve((count as usize).min(MAX_PREALLOCATED_STRINGS));
                        }
                    },
                    b"si" => current = Some(String::new()),
                    b"rPh" => phonetic_depth += 1,
                    b"t" => in_text = current.is_some() && phonetic_depth == 0,
                    _ => {},
                },
                Event::Empty(ref e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
                Event::Text(ref e) if in_text => {
                    if let Some(text) = current.as_mut() {
                        push_text(text, e)?;
                    }
                },
                Event::GeneralRef(ref e) if in_text => {
                    if let Some(text) = current.as_mut() {
                        push_reference(text, e)?;
                    }
                },
                Event::End(ref e) => match e.local_name().as_ref() {
                    b"t" => in_text = false,
                    b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                    b"si" => {
                        if let Some(text) = current.take() {
                            strings.push(text);
                        }
                    },
                    _ => {},
                },
                Event::Eof => break,
                _ => {},
            }
            buf.clear();
        }

        Ok(SharedStringTable { strings })
    }

    /// Get a string by its index.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_rich_strings() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="3">
  <si><t>Hello</t></si>
  <si><r><rPr><b/></rPr><t>Bold</t></r><r><t xml:space="preserve"> and plain</t></r></si>
  <si><t>Fish &amp; Chips &#169;</t></si>
</sst>"#;
        let sst = SharedStringTable::parse(xml.as_bytes()).unwrap();
        assert_eq!(sst.len(), 3);
        assert_eq!(sst.get(0), Some("Hello"));
        assert_eq!(sst.get(1), Some("Bold and plain"));
        assert_eq!(sst.get(2), Some("Fish & Chips \u{a9}"));
        assert_eq!(sst.get(3), None);
    }

    #[test]
    fn test_phonetic_runs_are_ignored() {
        let xml = r#"<sst><si><t>東京</t><rPh sb="0" eb="2"><t>トウキョウ</t></rPh><phoneticPr fontId="1"/></si></sst>"#;
        let sst = SharedStringTable::parse(xml.as_bytes()).unwrap();
        assert_eq!(sst.get(0), Some("東京"));
    }

    #[test]
    fn test_empty_entries_keep_their_index() {
        let xml = r#"<sst><si/><si><t/></si><si><t>third</t></si></sst>"#;
        let sst = SharedStringTable::parse(xml.as_bytes()).unwrap();
        assert_eq!(sst.strings(), &["", "", "third"]);
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        assert!(SharedStringTable::parse("<sst><si><t>x</si></sst>".as_bytes()).is_err());
    }
}
