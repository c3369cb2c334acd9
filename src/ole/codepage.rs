//! Codepage mapping for 8-bit BIFF text.
//!
//! BIFF2–BIFF5 store every string in the workbook's ANSI codepage (announced
//! by the CODEPAGE record); BIFF8 uses it only for "compressed" runs whose
//! high bytes were dropped. Decoding goes through `encoding_rs`, which always
//! produces valid UTF-8.

use encoding_rs::Encoding;

/// Codepage 1200 marks a workbook whose 8-bit runs are really UTF-16LE.
pub const CODEPAGE_UTF16LE: u16 = 1200;

/// Default ANSI codepage when a workbook does not declare one.
pub const CODEPAGE_WINDOWS_1252: u16 = 1252;

/// Map a Windows codepage identifier to an `encoding_rs` encoding.
///
/// Returns `None` for codepages `encoding_rs` has no table for.
///
/// ```
/// use longan::ole::codepage::codepage_to_encoding;
///
/// assert!(codepage_to_encoding(1252).is_some());
/// assert!(codepage_to_encoding(99999).is_none());
/// ```
#[inline]
pub fn codepage_to_encoding(codepage: u16) -> Option<&'static Encoding> {
    match codepage {
        // DOS codepages; 437 and 850 have no exact table, IBM866 is the closest
        437 | 850 => Some(encoding_rs::IBM866),
        866 => Some(encoding_rs::IBM866),

        // Windows codepages (Western scripts)
        874 => Some(encoding_rs::WINDOWS_874),
        1250 => Some(encoding_rs::WINDOWS_1250),
        1251 => Some(encoding_rs::WINDOWS_1251),
        // BIFF2-4 files written by Excel for Mac/DOS frequently report 32769
        1252 | 32769 => Some(encoding_rs::WINDOWS_1252),
        1253 => Some(encoding_rs::WINDOWS_1253),
        1254 => Some(encoding_rs::WINDOWS_1254),
        1255 => Some(encoding_rs::WINDOWS_1255),
        1256 => Some(encoding_rs::WINDOWS_1256),
        1257 => Some(encoding_rs::WINDOWS_1257),
        1258 => Some(encoding_rs::WINDOWS_1258),

        // East Asian codepages
        932 => Some(encoding_rs::SHIFT_JIS),
        936 => Some(encoding_rs::GBK),
        949 => Some(encoding_rs::EUC_KR),
        950 => Some(encoding_rs::BIG5),
        20932 => Some(encoding_rs::EUC_JP),
        54936 => Some(encoding_rs::GB18030),

        // ISO 8859 series
        28592 => Some(encoding_rs::ISO_8859_2),
        28593 => Some(encoding_rs::ISO_8859_3),
        28594 => Some(encoding_rs::ISO_8859_4),
        28595 => Some(encoding_rs::ISO_8859_5),
        28596 => Some(encoding_rs::ISO_8859_6),
        28597 => Some(encoding_rs::ISO_8859_7),
        28598 => Some(encoding_rs::ISO_8859_8),
        28605 => Some(encoding_rs::ISO_8859_15),

        // Macintosh (Excel for Mac writes 10000 / 32768)
        10000 | 32768 => Some(encoding_rs::MACINTOSH),

        // Unicode
        1200 => Some(encoding_rs::UTF_16LE),
        1201 => Some(encoding_rs::UTF_16BE),
        65001 => Some(encoding_rs::UTF_8),

        _ => None,
    }
}

/// Decode `bytes` with the given encoding.
#[inline]
pub fn decode_with(bytes: &[u8], encoding: &'static Encoding) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    encoding.decode_without_bom_handling(bytes).0.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ascii() {
        let encoding = codepage_to_encoding(1252).unwrap();
        assert_eq!(decode_with(b"Hello, World!", encoding), "Hello, World!");
    }

    #[test]
    fn test_decode_windows_1252_high_bytes() {
        let encoding = codepage_to_encoding(1252).unwrap();
        assert_eq!(decode_with(b"\x80 5", encoding), "\u{20AC} 5");
    }

    #[test]
    fn test_decode_cyrillic() {
        let encoding = codepage_to_encoding(1251).unwrap();
        assert_eq!(decode_with(b"\xCF\xF0\xE8", encoding), "\u{41F}\u{440}\u{438}");
    }

    #[test]
    fn test_codepage_to_encoding_common() {
        assert!(codepage_to_encoding(1252).is_some());
        assert!(codepage_to_encoding(932).is_some());
        assert!(codepage_to_encoding(65001).is_some());
        assert!(codepage_to_encoding(32769).is_some());
    }

    #[test]
    fn test_codepage_to_encoding_unsupported() {
        assert!(codepage_to_encoding(12345).is_none());
    }
}
