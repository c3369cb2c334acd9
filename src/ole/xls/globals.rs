//! Workbook globals: everything the globals substream declares before the
//! first sheet, built once and read-only afterwards.

use std::collections::BTreeMap;

use crate::common::number_format;
use crate::config::ReaderOptions;
use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::record::{BiffRecord, BiffVersion, RecordIter, ids};
use crate::ole::xls::records::{
    self, Bof, BofType, BoundSheet, FontFlags, FontRecord, FormatRecord, SharedStrings, SheetType,
    SheetVisibility, StyleRecord, XfRecord, globals,
};
use crate::ole::xls::string::XlsEncoding;

/// Font declared by a FONT record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XlsFont {
    /// Height in twentieths of a point
    pub height: u16,
    pub flags: FontFlags,
    pub weight: u16,
    pub underline: u8,
    pub color_index: u16,
    pub charset: u8,
    pub name: String,
}

/// Number format declared by a FORMAT record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XlsFormat {
    pub index: u16,
    pub code: String,
}

/// Extended format (cell or style XF).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XlsXf {
    pub font_index: u16,
    pub format_index: u16,
    pub parent_index: u16,
    pub is_style: bool,
}

/// Named cell style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XlsStyle {
    pub xf_index: u16,
    /// Identifier of a built-in style, `None` for user-defined ones
    pub builtin_id: Option<u8>,
    pub outline_level: u8,
    pub name: Option<String>,
}

/// Sheet entry from a BOUNDSHEET record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetInfo {
    pub name: String,
    /// Stream offset of the sheet's BOF
    pub offset: u32,
    pub visibility: SheetVisibility,
    pub sheet_type: SheetType,
}

/// Workbook-wide settings and tables.
#[derive(Debug, Clone)]
pub struct WorkbookGlobals {
    biff: BiffVersion,
    encoding: XlsEncoding,
    fallback_codepage: u16,
    is_1904: bool,
    active_tab: u16,
    fonts: Vec<XlsFont>,
    formats: BTreeMap<u16, XlsFormat>,
    /// Count of BIFF2-3 FORMAT records, which are indexed by position
    implicit_formats: u16,
    xfs: Vec<XlsXf>,
    styles: Vec<XlsStyle>,
    sheets: Vec<SheetInfo>,
    sst: SharedStrings,
    max_sst_strings: usize,
}

impl WorkbookGlobals {
    /// Empty globals for a stream of the given version.
    pub fn new(biff: BiffVersion, options: &ReaderOptions) -> Self {
        let encoding = if biff == BiffVersion::Biff8 {
            XlsEncoding::from_codepage(crate::ole::codepage::CODEPAGE_UTF16LE, options.codepage)
        } else {
            XlsEncoding::from_codepage(options.codepage, options.codepage)
        };
        WorkbookGlobals {
            biff,
            encoding,
            fallback_codepage: options.codepage,
            is_1904: false,
            active_tab: 0,
            fonts: Vec::new(),
            formats: BTreeMap::new(),
            implicit_formats: 0,
            xfs: Vec::new(),
            styles: Vec::new(),
            sheets: Vec::new(),
            sst: SharedStrings::default(),
            max_sst_strings: options.max_sst_strings,
        }
    }

    /// Scan the globals substream at the start of `stream`.
    ///
    /// Returns the globals and the offset just past the globals EOF. For a
    /// BIFF2-4 stream (whose first BOF is a worksheet) nothing is consumed
    /// and the offset is 0; such streams interleave globals records with
    /// cells and feed them through [`WorkbookGlobals::apply`] while the
    /// sheet is read.
    pub fn parse(stream: &[u8], options: &ReaderOptions) -> XlsResult<(Self, usize)> {
        let mut iter = RecordIter::new(stream);
        let first = match iter.next() {
            Some(record) => record?,
            None => return Err(XlsError::MissingWorkbookStream),
        };
        let bof = Bof::new(first)?;
        let biff = bof.biff_version()?;
        let mut globals = WorkbookGlobals::new(biff, options);

        if !biff.has_globals() || bof.kind() != BofType::WorkbookGlobals {
            return Ok((globals, 0));
        }

        while let Some(record) = iter.next() {
            let record = record?;
            if records::is_eof(&record) {
                break;
            }
            if record.id() == ids::SST {
                let mut continues = Vec::new();
                while let Some(next) = iter.peek() {
                    if next.id() != ids::CONTINUE {
                        break;
                    }
                    continues.push(next);
                    iter.next();
                }
                globals.sst = SharedStrings::parse(
                    &record,
                    &continues,
                    &globals.encoding,
                    globals.max_sst_strings,
                );
                continue;
            }
            globals.apply(&record)?;
        }

        log::debug!(
            "workbook globals: {:?}, codepage {}, {} sheets, {} shared strings",
            biff,
            globals.encoding.codepage(),
            globals.sheets.len(),
            globals.sst.len()
        );
        Ok((globals, iter.position()))
    }

    /// Fold one globals record into the model.
    ///
    /// Returns `true` when the record was a globals record. FILEPASS fails
    /// with [`XlsError::PasswordProtected`].
    pub fn apply(&mut self, record: &BiffRecord<'_>) -> XlsResult<bool> {
        match record.id() {
            ids::FILEPASS => return Err(XlsError::PasswordProtected),
            ids::CODEPAGE => {
                let codepage = globals::codepage(record);
                // BIFF8 strings carry their own width flag
                if self.biff != BiffVersion::Biff8 {
                    self.encoding = XlsEncoding::from_codepage(codepage, self.fallback_codepage);
                }
            },
            ids::DATE1904 => self.is_1904 = globals::is_date1904(record),
            ids::WINDOW1 => self.active_tab = globals::active_tab(record),
            ids::FONT | ids::FONT_BIFF3 => {
                let font = FontRecord::new(*record, self.biff);
                self.fonts.push(XlsFont {
                    height: font.height(),
                    flags: font.flags(),
                    weight: font.weight(),
                    underline: font.underline(),
                    color_index: font.color_index(),
                    charset: font.charset(),
                    name: font.name(&self.encoding),
                });
            },
            ids::FORMAT | ids::FORMAT_BIFF2 => {
                let format = FormatRecord::new(*record, self.biff);
                let index = match format.index() {
                    Some(index) => index,
                    None => {
                        self.implicit_formats += 1;
                        self.implicit_formats - 1
                    },
                };
                let code = format.format_code(&self.encoding);
                self.formats.insert(index, XlsFormat { index, code });
            },
            ids::XF | ids::XF_BIFF2 | ids::XF_BIFF3 | ids::XF_BIFF4 => {
                let xf = XfRecord::new(*record, self.biff);
                self.xfs.push(XlsXf {
                    font_index: xf.font_index(),
                    format_index: xf.format_index(),
                    parent_index: xf.parent_index(),
                    is_style: xf.is_style(),
                });
            },
            ids::STYLE => {
                let style = StyleRecord::new(*record, self.biff);
                self.styles.push(XlsStyle {
                    xf_index: style.xf_index(),
                    builtin_id: style.is_builtin().then(|| style.builtin_id()),
                    outline_level: if style.is_builtin() { style.outline_level() } else { 0 },
                    name: style.name(&self.encoding),
                });
            },
            ids::BOUNDSHEET => {
                let sheet = BoundSheet::new(*record);
                self.sheets.push(SheetInfo {
                    name: sheet.name(self.biff, &self.encoding),
                    offset: sheet.start_offset(),
                    visibility: sheet.visibility(),
                    sheet_type: sheet.sheet_type(),
                });
            },
            _ => return Ok(false),
        }
        Ok(true)
    }

    #[inline]
    pub fn biff_version(&self) -> BiffVersion {
        self.biff
    }

    #[inline]
    pub fn encoding(&self) -> &XlsEncoding {
        &self.encoding
    }

    #[inline]
    pub fn codepage(&self) -> u16 {
        self.encoding.codepage()
    }

    #[inline]
    pub fn is_1904(&self) -> bool {
        self.is_1904
    }

    /// Index of the selected sheet tab.
    #[inline]
    pub fn active_tab(&self) -> u16 {
        self.active_tab
    }

    #[inline]
    pub fn fonts(&self) -> &[XlsFont] {
        &self.fonts
    }

    /// Explicit FORMAT records by index.
    #[inline]
    pub fn formats(&self) -> &BTreeMap<u16, XlsFormat> {
        &self.formats
    }

    #[inline]
    pub fn xfs(&self) -> &[XlsXf] {
        &self.xfs
    }

    #[inline]
    pub fn styles(&self) -> &[XlsStyle] {
        &self.styles
    }

    #[inline]
    pub fn sheets(&self) -> &[SheetInfo] {
        &self.sheets
    }

    #[inline]
    pub fn shared_strings(&self) -> &SharedStrings {
        &self.sst
    }

    /// Number format code of a format index, falling back to built-ins.
    pub fn format_code(&self, format_index: u16) -> Option<&str> {
        self.formats
            .get(&format_index)
            .map(|f| f.code.as_str())
            .or_else(|| number_format::builtin_format_code(format_index as u32))
    }

    /// Whether the XF renders its numbers as dates or times.
    pub fn is_date_xf(&self, xf_index: u16) -> bool {
        let Some(xf) = self.xfs.get(xf_index as usize) else {
            return false;
        };
        let custom = self.formats.get(&xf.format_index).map(|f| f.code.as_str());
        number_format::is_date_format(xf.format_index as u32, custom)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ole::xls::record::tests::record_bytes;

    pub(crate) fn bof_payload(version: u16, kind: u16) -> Vec<u8> {
        let mut payload = version.to_le_bytes().to_vec();
        payload.extend_from_slice(&kind.to_le_bytes());
        payload.extend_from_slice(&[0u8; 12]);
        payload
    }

    pub(crate) fn xf_biff8(format_index: u16) -> Vec<u8> {
        let mut payload = 0u16.to_le_bytes().to_vec();
        payload.extend_from_slice(&format_index.to_le_bytes());
        payload.extend_from_slice(&[0u8; 16]);
        record_bytes(ids::XF, &payload)
    }

    #[test]
    fn test_parse_globals_biff8() {
        let mut stream = record_bytes(ids::BOF, &bof_payload(0x0600, 0x0005));
        stream.extend(record_bytes(ids::CODEPAGE, &1200u16.to_le_bytes()));
        stream.extend(record_bytes(ids::DATE1904, &1u16.to_le_bytes()));
        let mut fmt = 164u16.to_le_bytes().to_vec();
        fmt.extend_from_slice(&[8, 0, 0]);
        fmt.extend_from_slice(b"dd/mm/yy");
        stream.extend(record_bytes(ids::FORMAT, &fmt));
        stream.extend(xf_biff8(0));
        stream.extend(xf_biff8(164));
        stream.extend(xf_biff8(14));
        let mut sheet = 0x100u32.to_le_bytes().to_vec();
        sheet.extend_from_slice(&[0, 0, 4, 0]);
        sheet.extend_from_slice(b"Data");
        stream.extend(record_bytes(ids::BOUNDSHEET, &sheet));
        let mut sst = 1u32.to_le_bytes().to_vec();
        sst.extend_from_slice(&1u32.to_le_bytes());
        sst.extend_from_slice(&[2, 0, 0]);
        sst.extend_from_slice(b"hi");
        stream.extend(record_bytes(ids::SST, &sst));
        stream.extend(record_bytes(ids::EOF, &[]));
        let end = stream.len();
        stream.extend(record_bytes(ids::BOF, &bof_payload(0x0600, 0x0010)));

        let (globals, offset) = WorkbookGlobals::parse(&stream, &ReaderOptions::default()).unwrap();
        assert_eq!(offset, end);
        assert_eq!(globals.biff_version(), BiffVersion::Biff8);
        assert_eq!(globals.codepage(), 1200);
        assert!(globals.is_1904());
        assert_eq!(globals.sheets().len(), 1);
        assert_eq!(globals.sheets()[0].name, "Data");
        assert_eq!(globals.sheets()[0].offset, 0x100);
        assert_eq!(globals.shared_strings().get(0), Some("hi"));
        assert!(!globals.is_date_xf(0));
        assert!(globals.is_date_xf(1));
        assert!(globals.is_date_xf(2));
        assert!(!globals.is_date_xf(99));
        assert_eq!(globals.format_code(164), Some("dd/mm/yy"));
        assert_eq!(globals.format_code(0), Some("General"));
    }

    #[test]
    fn test_filepass_is_rejected() {
        let mut stream = record_bytes(ids::BOF, &bof_payload(0x0600, 0x0005));
        stream.extend(record_bytes(ids::FILEPASS, &[0u8; 6]));
        stream.extend(record_bytes(ids::EOF, &[]));
        assert!(matches!(
            WorkbookGlobals::parse(&stream, &ReaderOptions::default()),
            Err(XlsError::PasswordProtected)
        ));
    }

    #[test]
    fn test_biff5_codepage_switches_encoding() {
        let mut stream = record_bytes(ids::BOF, &bof_payload(0x0500, 0x0005));
        stream.extend(record_bytes(ids::CODEPAGE, &1251u16.to_le_bytes()));
        let mut sheet = 0u32.to_le_bytes().to_vec();
        sheet.extend_from_slice(&[0, 0, 2]);
        sheet.extend_from_slice(b"\xC0\xC1");
        stream.extend(record_bytes(ids::BOUNDSHEET, &sheet));
        stream.extend(record_bytes(ids::EOF, &[]));
        let (globals, _) = WorkbookGlobals::parse(&stream, &ReaderOptions::default()).unwrap();
        assert_eq!(globals.codepage(), 1251);
        assert_eq!(globals.sheets()[0].name, "АБ");
    }

    #[test]
    fn test_biff2_stream_has_no_globals_section() {
        let stream = record_bytes(ids::BOF_BIFF2, &[0x02, 0x00, 0x10, 0x00]);
        let (globals, offset) = WorkbookGlobals::parse(&stream, &ReaderOptions::default()).unwrap();
        assert_eq!(offset, 0);
        assert_eq!(globals.biff_version(), BiffVersion::Biff2);
        assert!(globals.sheets().is_empty());
    }

    #[test]
    fn test_implicit_biff2_format_indices() {
        let options = ReaderOptions::default();
        let mut globals = WorkbookGlobals::new(BiffVersion::Biff2, &options);
        for code in ["General", "0.00", "d/m/yy"] {
            let mut payload = vec![code.len() as u8];
            payload.extend_from_slice(code.as_bytes());
            let bytes = record_bytes(ids::FORMAT_BIFF2, &payload);
            assert!(globals.apply(&BiffRecord::at(&bytes, 0).unwrap()).unwrap());
        }
        let bytes = record_bytes(ids::XF_BIFF2, &[0, 0, 0x02, 0]);
        globals.apply(&BiffRecord::at(&bytes, 0).unwrap()).unwrap();
        assert_eq!(globals.format_code(2), Some("d/m/yy"));
        assert!(globals.is_date_xf(0));
    }

    #[test]
    fn test_implicit_biff4_format_indices() {
        let options = ReaderOptions::default();
        let mut globals = WorkbookGlobals::new(BiffVersion::Biff4, &options);
        for code in ["General", "yyyy-mm-dd"] {
            let mut payload = vec![0, 0, code.len() as u8];
            payload.extend_from_slice(code.as_bytes());
            let bytes = record_bytes(ids::FORMAT, &payload);
            assert!(globals.apply(&BiffRecord::at(&bytes, 0).unwrap()).unwrap());
        }
        let bytes = record_bytes(ids::XF_BIFF4, &[0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        globals.apply(&BiffRecord::at(&bytes, 0).unwrap()).unwrap();
        assert_eq!(globals.format_code(0), Some("General"));
        assert_eq!(globals.format_code(1), Some("yyyy-mm-dd"));
        assert!(globals.is_date_xf(0));
    }
}
