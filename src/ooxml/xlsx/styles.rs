//! Parser for `xl/styles.xml`.
//!
//! Only the parts needed to interpret cell values are kept: custom number
//! formats and the `cellXfs` table that cells point into with `s="…"`.

use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{bool_attr, string_attr, u32_attr};
use crate::common::number_format;
use crate::ooxml::error::Result;

/// A custom `<numFmt>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XlsxNumFmt {
    pub id: u32,
    pub format_code: String,
}

/// One `<xf>` of the `cellXfs` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct XlsxXf {
    /// Position in `cellXfs`
    pub id: usize,
    pub num_fmt_id: u32,
    pub apply_number_format: bool,
}

/// Number formats and cell formats of a workbook.
#[derive(Debug, Clone, Default)]
pub struct XlsxStyles {
    pub num_fmts: Vec<XlsxNumFmt>,
    pub cell_xfs: Vec<XlsxXf>,
}

impl XlsxStyles {
    pub fn parse<R: BufRead>(input: R) -> Result<Self> {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);

        let mut styles = XlsxStyles::default();
        let mut in_cell_xfs = false;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = true,
                Event::Start(ref e) | Event::Empty(ref e) => styles.read_element(e, in_cell_xfs)?,
                Event::End(ref e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
                Event::Eof => break,
                _ => {},
            }
            buf.clear();
        }

        Ok(styles)
    }

    fn read_element(&mut self, e: &BytesStart<'_>, in_cell_xfs: bool) -> Result<()> {
        match e.local_name().as_ref() {
            b"numFmt" => {
                if let Some(id) = u32_attr(e, b"numFmtId")? {
                    let format_code = string_attr(e, b"formatCode")?.unwrap_or_default();
                    self.num_fmts.push(XlsxNumFmt { id, format_code });
                }
            },
            // cellStyleXfs holds the same element name
            b"xf" if in_cell_xfs => {
                self.cell_xfs.push(XlsxXf {
                    id: self.cell_xfs.len(),
                    num_fmt_id: u32_attr(e, b"numFmtId")?.unwrap_or(0),
                    apply_number_format: bool_attr(e, b"applyNumberFormat")?,
                });
            },
            _ => {},
        }
        Ok(())
    }

    /// Format code for `num_fmt_id`, custom formats first, then built-ins.
    pub fn format_code(&self, num_fmt_id: u32) -> Option<&str> {
        self.custom_format(num_fmt_id)
            .or_else(|| number_format::builtin_format_code(num_fmt_id))
    }

    /// Whether cells using cell format `xf` hold dates.
    pub fn is_date_style(&self, xf: usize) -> bool {
        match self.cell_xfs.get(xf) {
            Some(xf) => {
                number_format::is_date_format(xf.num_fmt_id, self.custom_format(xf.num_fmt_id))
            },
            None => false,
        }
    }

    fn custom_format(&self, num_fmt_id: u32) -> Option<&str> {
        self.num_fmts
            .iter()
            .find(|f| f.id == num_fmt_id)
            .map(|f| f.format_code.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="2">
    <numFmt numFmtId="164" formatCode="yyyy\-mm\-dd"/>
    <numFmt numFmtId="165" formatCode="&quot;$&quot;#,##0.00"/>
  </numFmts>
  <cellStyleXfs count="1">
    <xf numFmtId="0" fontId="0"/>
  </cellStyleXfs>
  <cellXfs count="4">
    <xf numFmtId="0" fontId="0" xfId="0"/>
    <xf numFmtId="164" fontId="0" xfId="0" applyNumberFormat="1"/>
    <xf numFmtId="165" fontId="0" xfId="0" applyNumberFormat="1">
      <alignment horizontal="left"/>
    </xf>
    <xf numFmtId="14" fontId="0" xfId="0" applyNumberFormat="true"/>
  </cellXfs>
</styleSheet>"#;

    #[test]
    fn test_parse_styles() {
        let styles = XlsxStyles::parse(STYLES_XML.as_bytes()).unwrap();
        assert_eq!(styles.num_fmts.len(), 2);
        assert_eq!(styles.num_fmts[1].format_code, "\"$\"#,##0.00");
        assert_eq!(styles.cell_xfs.len(), 4);
        assert_eq!(styles.cell_xfs[2].id, 2);
        assert_eq!(styles.cell_xfs[2].num_fmt_id, 165);
        assert!(styles.cell_xfs[3].apply_number_format);
        assert!(!styles.cell_xfs[0].apply_number_format);
    }

    #[test]
    fn test_is_date_style() {
        let styles = XlsxStyles::parse(STYLES_XML.as_bytes()).unwrap();
        assert!(!styles.is_date_style(0));
        assert!(styles.is_date_style(1));
        assert!(!styles.is_date_style(2));
        assert!(styles.is_date_style(3));
        assert!(!styles.is_date_style(99));
    }

    #[test]
    fn test_format_code_falls_back_to_builtin() {
        let styles = XlsxStyles::parse(STYLES_XML.as_bytes()).unwrap();
        assert_eq!(styles.format_code(164), Some("yyyy\\-mm\\-dd"));
        assert_eq!(styles.format_code(0), Some("General"));
        assert_eq!(styles.format_code(300), None);
    }

    #[test]
    fn test_empty_cell_xfs() {
        let xml = r#"<styleSheet><cellXfs count="0"/><xf numFmtId="14"/></styleSheet>"#;
        let styles = XlsxStyles::parse(xml.as_bytes()).unwrap();
        assert!(styles.cell_xfs.is_empty());
    }
}
