//! Records found only in the workbook globals substream.

use bitflags::bitflags;

use crate::ole::xls::record::{BiffRecord, BiffVersion, ids};
use crate::ole::xls::string::{self, XlsEncoding};

/// CODEPAGE: codepage of 8-bit text.
#[inline]
pub fn codepage(record: &BiffRecord<'_>) -> u16 {
    record.read_u16(0)
}

/// DATE1904: whether serial dates count from 1904-01-01.
#[inline]
pub fn is_date1904(record: &BiffRecord<'_>) -> bool {
    record.read_u16(0) == 1
}

/// WINDOW1: index of the selected sheet tab (BIFF5+).
#[inline]
pub fn active_tab(record: &BiffRecord<'_>) -> u16 {
    record.read_u16(10)
}

bitflags! {
    /// FONT option flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FontFlags: u16 {
        const BOLD = 0x0001;
        const ITALIC = 0x0002;
        const UNDERLINE = 0x0004;
        const STRIKEOUT = 0x0008;
        const OUTLINE = 0x0010;
        const SHADOW = 0x0020;
        const CONDENSE = 0x0040;
        const EXTEND = 0x0080;
    }
}

/// FONT record view (0x0031, 0x0231).
#[derive(Debug, Clone, Copy)]
pub struct FontRecord<'a> {
    record: BiffRecord<'a>,
    biff: BiffVersion,
}

impl<'a> FontRecord<'a> {
    pub fn new(record: BiffRecord<'a>, biff: BiffVersion) -> Self {
        FontRecord { record, biff }
    }

    /// Height in twentieths of a point.
    #[inline]
    pub fn height(&self) -> u16 {
        self.record.read_u16(0)
    }

    #[inline]
    pub fn flags(&self) -> FontFlags {
        FontFlags::from_bits_truncate(self.record.read_u16(2))
    }

    /// Colour palette index (BIFF3+).
    #[inline]
    pub fn color_index(&self) -> u16 {
        if self.biff == BiffVersion::Biff2 {
            0x7FFF
        } else {
            self.record.read_u16(4)
        }
    }

    /// Weight, 400 normal and 700 bold. Derived from the flags before BIFF5.
    pub fn weight(&self) -> u16 {
        if self.biff >= BiffVersion::Biff5 {
            self.record.read_u16(6)
        } else if self.flags().contains(FontFlags::BOLD) {
            700
        } else {
            400
        }
    }

    #[inline]
    pub fn escapement(&self) -> u16 {
        if self.biff >= BiffVersion::Biff5 {
            self.record.read_u16(8)
        } else {
            0
        }
    }

    /// Underline style (BIFF5+); earlier versions only have the flag.
    pub fn underline(&self) -> u8 {
        if self.biff >= BiffVersion::Biff5 {
            self.record.read_u8(10)
        } else {
            self.flags().contains(FontFlags::UNDERLINE) as u8
        }
    }

    #[inline]
    pub fn family(&self) -> u8 {
        if self.biff >= BiffVersion::Biff5 {
            self.record.read_u8(11)
        } else {
            0
        }
    }

    #[inline]
    pub fn charset(&self) -> u8 {
        if self.biff >= BiffVersion::Biff5 {
            self.record.read_u8(12)
        } else {
            0
        }
    }

    pub fn name(&self, encoding: &XlsEncoding) -> String {
        let at = match self.biff {
            BiffVersion::Biff2 => 4,
            BiffVersion::Biff3 | BiffVersion::Biff4 => 6,
            BiffVersion::Biff5 | BiffVersion::Biff8 => 14,
        };
        string::read_short_string(&self.record, at, self.biff, encoding).0
    }
}

/// FORMAT record view (0x041E, BIFF2-3 0x001E).
#[derive(Debug, Clone, Copy)]
pub struct FormatRecord<'a> {
    record: BiffRecord<'a>,
    biff: BiffVersion,
}

impl<'a> FormatRecord<'a> {
    pub fn new(record: BiffRecord<'a>, biff: BiffVersion) -> Self {
        FormatRecord { record, biff }
    }

    /// Explicit format index. BIFF2-4 records have none; their index is
    /// their position among FORMAT records.
    pub fn index(&self) -> Option<u16> {
        if self.record.id() == ids::FORMAT_BIFF2 || self.biff <= BiffVersion::Biff4 {
            None
        } else {
            Some(self.record.read_u16(0))
        }
    }

    pub fn format_code(&self, encoding: &XlsEncoding) -> String {
        match (self.record.id(), self.biff) {
            (ids::FORMAT_BIFF2, _) => string::read_short_string(&self.record, 0, self.biff, encoding).0,
            (_, BiffVersion::Biff8) => string::read_unicode_string(&self.record, 2, self.biff, encoding).0,
            _ => string::read_short_string(&self.record, 2, self.biff, encoding).0,
        }
    }
}

/// XF record view (0x00E0, BIFF4 0x0443, BIFF3 0x0243, BIFF2 0x0043).
#[derive(Debug, Clone, Copy)]
pub struct XfRecord<'a> {
    record: BiffRecord<'a>,
    biff: BiffVersion,
}

impl<'a> XfRecord<'a> {
    pub fn new(record: BiffRecord<'a>, biff: BiffVersion) -> Self {
        XfRecord { record, biff }
    }

    pub fn font_index(&self) -> u16 {
        match self.biff {
            BiffVersion::Biff5 | BiffVersion::Biff8 => self.record.read_u16(0),
            _ => self.record.read_u8(0) as u16,
        }
    }

    pub fn format_index(&self) -> u16 {
        match self.biff {
            BiffVersion::Biff5 | BiffVersion::Biff8 => self.record.read_u16(2),
            BiffVersion::Biff3 | BiffVersion::Biff4 => self.record.read_u8(1) as u16,
            BiffVersion::Biff2 => (self.record.read_u8(2) & 0x3F) as u16,
        }
    }

    /// Type and protection bits; bit 2 marks a style XF.
    fn type_prot(&self) -> u16 {
        match self.biff {
            BiffVersion::Biff5 | BiffVersion::Biff8 => self.record.read_u16(4),
            BiffVersion::Biff4 => self.record.read_u16(2),
            BiffVersion::Biff3 => self.record.read_u8(2) as u16,
            BiffVersion::Biff2 => 0,
        }
    }

    #[inline]
    pub fn is_style(&self) -> bool {
        self.type_prot() & 0x0004 != 0
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.type_prot() & 0x0001 != 0
    }

    /// Parent style XF (0xFFF for style XFs).
    pub fn parent_index(&self) -> u16 {
        match self.biff {
            BiffVersion::Biff5 | BiffVersion::Biff8 | BiffVersion::Biff4 => self.type_prot() >> 4,
            BiffVersion::Biff3 => self.record.read_u16(4) >> 4,
            BiffVersion::Biff2 => 0,
        }
    }
}

/// STYLE record view (0x0293).
#[derive(Debug, Clone, Copy)]
pub struct StyleRecord<'a> {
    record: BiffRecord<'a>,
    biff: BiffVersion,
}

impl<'a> StyleRecord<'a> {
    pub fn new(record: BiffRecord<'a>, biff: BiffVersion) -> Self {
        StyleRecord { record, biff }
    }

    #[inline]
    pub fn xf_index(&self) -> u16 {
        self.record.read_u16(0) & 0x0FFF
    }

    #[inline]
    pub fn is_builtin(&self) -> bool {
        self.record.read_u16(0) & 0x8000 != 0
    }

    /// Identifier of a built-in style (0 = Normal).
    #[inline]
    pub fn builtin_id(&self) -> u8 {
        self.record.read_u8(2)
    }

    /// Outline level of RowLevel/ColLevel built-in styles.
    #[inline]
    pub fn outline_level(&self) -> u8 {
        self.record.read_u8(3)
    }

    /// Name of a user-defined style; `None` for built-ins.
    pub fn name(&self, encoding: &XlsEncoding) -> Option<String> {
        if self.is_builtin() {
            return None;
        }
        let name = if self.biff == BiffVersion::Biff8 {
            string::read_unicode_string(&self.record, 2, self.biff, encoding).0
        } else {
            string::read_short_string(&self.record, 2, self.biff, encoding).0
        };
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::xls::record::tests::record_bytes;

    #[test]
    fn test_font_biff8() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&200u16.to_le_bytes());
        payload.extend_from_slice(&0x0002u16.to_le_bytes());
        payload.extend_from_slice(&0x7FFFu16.to_le_bytes());
        payload.extend_from_slice(&700u16.to_le_bytes());
        payload.extend_from_slice(&0u16.to_le_bytes());
        payload.extend_from_slice(&[1, 2, 0, 0]);
        payload.extend_from_slice(&[5, 0]);
        payload.extend_from_slice(b"Arial");
        let bytes = record_bytes(ids::FONT, &payload);
        let font = FontRecord::new(BiffRecord::at(&bytes, 0).unwrap(), BiffVersion::Biff8);
        let enc = XlsEncoding::from_codepage(1200, 1252);
        assert_eq!(font.height(), 200);
        assert!(font.flags().contains(FontFlags::ITALIC));
        assert_eq!(font.weight(), 700);
        assert_eq!(font.underline(), 1);
        assert_eq!(font.family(), 2);
        assert_eq!(font.name(&enc), "Arial");
    }

    #[test]
    fn test_font_biff2_weight_from_flags() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&240u16.to_le_bytes());
        payload.extend_from_slice(&0x0001u16.to_le_bytes());
        payload.push(4);
        payload.extend_from_slice(b"Helv");
        let bytes = record_bytes(ids::FONT, &payload);
        let font = FontRecord::new(BiffRecord::at(&bytes, 0).unwrap(), BiffVersion::Biff2);
        assert_eq!(font.weight(), 700);
        assert_eq!(font.name(&XlsEncoding::default()), "Helv");
    }

    #[test]
    fn test_format_versions() {
        let enc = XlsEncoding::from_codepage(1200, 1252);
        let mut payload = 164u16.to_le_bytes().to_vec();
        payload.extend_from_slice(&[10, 0, 0]);
        payload.extend_from_slice(b"yyyy-mm-dd");
        let bytes = record_bytes(ids::FORMAT, &payload);
        let fmt = FormatRecord::new(BiffRecord::at(&bytes, 0).unwrap(), BiffVersion::Biff8);
        assert_eq!(fmt.index(), Some(164));
        assert_eq!(fmt.format_code(&enc), "yyyy-mm-dd");

        let mut payload = 164u16.to_le_bytes().to_vec();
        payload.push(4);
        payload.extend_from_slice(b"0.00");
        let bytes = record_bytes(ids::FORMAT, &payload);
        let fmt = FormatRecord::new(BiffRecord::at(&bytes, 0).unwrap(), BiffVersion::Biff5);
        assert_eq!(fmt.format_code(&XlsEncoding::default()), "0.00");

        let mut payload = vec![7];
        payload.extend_from_slice(b"General");
        let bytes = record_bytes(ids::FORMAT_BIFF2, &payload);
        let fmt = FormatRecord::new(BiffRecord::at(&bytes, 0).unwrap(), BiffVersion::Biff2);
        assert_eq!(fmt.index(), None);
        assert_eq!(fmt.format_code(&XlsEncoding::default()), "General");

        // BIFF4 keeps two unused bytes where later versions store the index
        let mut payload = vec![0xAB, 0xCD, 10];
        payload.extend_from_slice(b"yyyy-mm-dd");
        let bytes = record_bytes(ids::FORMAT, &payload);
        let fmt = FormatRecord::new(BiffRecord::at(&bytes, 0).unwrap(), BiffVersion::Biff4);
        assert_eq!(fmt.index(), None);
        assert_eq!(fmt.format_code(&XlsEncoding::default()), "yyyy-mm-dd");
    }

    #[test]
    fn test_xf_biff8_and_biff2() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&3u16.to_le_bytes());
        payload.extend_from_slice(&14u16.to_le_bytes());
        payload.extend_from_slice(&0x0001u16.to_le_bytes());
        payload.extend_from_slice(&[0u8; 14]);
        let bytes = record_bytes(ids::XF, &payload);
        let xf = XfRecord::new(BiffRecord::at(&bytes, 0).unwrap(), BiffVersion::Biff8);
        assert_eq!(xf.font_index(), 3);
        assert_eq!(xf.format_index(), 14);
        assert!(!xf.is_style());
        assert!(xf.is_locked());
        assert_eq!(xf.parent_index(), 0);

        let bytes = record_bytes(ids::XF_BIFF2, &[1, 0, 0x4F, 0]);
        let xf = XfRecord::new(BiffRecord::at(&bytes, 0).unwrap(), BiffVersion::Biff2);
        assert_eq!(xf.font_index(), 1);
        assert_eq!(xf.format_index(), 0x0F);
    }

    #[test]
    fn test_style() {
        let bytes = record_bytes(ids::STYLE, &[0x00, 0x80, 0x00, 0xFF]);
        let style = StyleRecord::new(BiffRecord::at(&bytes, 0).unwrap(), BiffVersion::Biff8);
        assert!(style.is_builtin());
        assert_eq!(style.xf_index(), 0);
        assert_eq!(style.builtin_id(), 0);
        assert_eq!(style.name(&XlsEncoding::default()), None);

        let mut payload = vec![0x10, 0x00, 3, 0, 0];
        payload.extend_from_slice(b"Foo");
        let bytes = record_bytes(ids::STYLE, &payload);
        let style = StyleRecord::new(BiffRecord::at(&bytes, 0).unwrap(), BiffVersion::Biff8);
        assert_eq!(style.xf_index(), 0x10);
        assert_eq!(style.name(&XlsEncoding::default()).as_deref(), Some("Foo"));
    }

    #[test]
    fn test_simple_globals_records() {
        let bytes = record_bytes(ids::CODEPAGE, &1251u16.to_le_bytes());
        assert_eq!(codepage(&BiffRecord::at(&bytes, 0).unwrap()), 1251);
        let bytes = record_bytes(ids::DATE1904, &1u16.to_le_bytes());
        assert!(is_date1904(&BiffRecord::at(&bytes, 0).unwrap()));
        let mut payload = vec![0u8; 18];
        payload[10] = 2;
        let bytes = record_bytes(ids::WINDOW1, &payload);
        assert_eq!(active_tab(&BiffRecord::at(&bytes, 0).unwrap()), 2);
    }
}
