//! BIFF string decoding.
//!
//! BIFF2-BIFF5 store strings as plain bytes in the workbook codepage. BIFF8
//! stores an option byte in front of the characters: bit 0 set means the run
//! is UTF-16LE ("high byte"), clear means each character was compressed to
//! a single byte. Bit 3 announces rich-text formatting runs and bit 2 an
//! extended (phonetic) block; both precede or follow the characters and are
//! skipped here.
//!
//! Every reader here works on a [`BiffRecord`] view and clamps to the
//! record's declared size, so a truncated string yields what is present.

use encoding_rs::Encoding;

use crate::ole::codepage::{self, CODEPAGE_UTF16LE, CODEPAGE_WINDOWS_1252};
use crate::ole::xls::record::{BiffRecord, BiffVersion};

/// Option flag: characters are stored as UTF-16LE.
pub const FLAG_HIGH_BYTE: u8 = 0x01;
/// Option flag: an extended (phonetic) block follows the characters.
pub const FLAG_EXT_STRING: u8 = 0x04;
/// Option flag: rich-text formatting runs follow the characters.
pub const FLAG_RICH_STRING: u8 = 0x08;

/// Character encoding of a workbook's 8-bit text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XlsEncoding {
    /// ANSI codepage and its identifier
    Codepage(&'static Encoding, u16),
    /// BIFF8: strings carry their own width flag; compressed runs are
    /// decoded with the carried 8-bit encoding
    Utf16Le(&'static Encoding),
}

impl Default for XlsEncoding {
    fn default() -> Self {
        XlsEncoding::Codepage(encoding_rs::WINDOWS_1252, CODEPAGE_WINDOWS_1252)
    }
}

impl XlsEncoding {
    /// Resolve a CODEPAGE record value.
    ///
    /// Unknown codepages fall back to `fallback` (itself falling back to
    /// Windows-1252) and log a warning.
    pub fn from_codepage(codepage: u16, fallback: u16) -> Self {
        let fallback_encoding =
            codepage::codepage_to_encoding(fallback).unwrap_or(encoding_rs::WINDOWS_1252);
        if codepage == CODEPAGE_UTF16LE {
            return XlsEncoding::Utf16Le(single_byte(fallback_encoding));
        }
        match codepage::codepage_to_encoding(codepage) {
            Some(encoding) => XlsEncoding::Codepage(single_byte(encoding), codepage),
            None => {
                log::warn!(
                    "unknown codepage {}, decoding 8-bit text as codepage {}",
                    codepage,
                    fallback
                );
                XlsEncoding::Codepage(single_byte(fallback_encoding), fallback)
            },
        }
    }

    /// Codepage identifier, 1200 for UTF-16 workbooks.
    pub fn codepage(&self) -> u16 {
        match self {
            XlsEncoding::Codepage(_, cp) => *cp,
            XlsEncoding::Utf16Le(_) => CODEPAGE_UTF16LE,
        }
    }

    /// Encoding used for single-byte runs.
    #[inline]
    pub fn byte_encoding(&self) -> &'static Encoding {
        match self {
            XlsEncoding::Codepage(encoding, _) | XlsEncoding::Utf16Le(encoding) => encoding,
        }
    }
}

/// A UTF-16 encoding cannot decode byte-per-character runs.
fn single_byte(encoding: &'static Encoding) -> &'static Encoding {
    if encoding == encoding_rs::UTF_16LE || encoding == encoding_rs::UTF_16BE {
        encoding_rs::WINDOWS_1252
    } else {
        encoding
    }
}

/// Number of bytes `cch` characters occupy.
#[inline]
pub fn run_len(cch: usize, high_byte: bool) -> usize {
    if high_byte { cch * 2 } else { cch }
}

/// Decode one run of characters.
///
/// `bytes` must already be limited to `cch × (1|2)` bytes; an odd trailing
/// byte of a UTF-16 run is replaced rather than rejected.
pub fn decode_run(bytes: &[u8], high_byte: bool, encoding: &XlsEncoding) -> String {
    if high_byte {
        codepage::decode_with(bytes, encoding_rs::UTF_16LE)
    } else {
        codepage::decode_with(bytes, encoding.byte_encoding())
    }
}

/// Decode a string whose length prefix is a `u16` (XLUnicodeString in
/// BIFF8, a plain byte string before).
///
/// Returns the text and the number of payload bytes consumed, including
/// any rich-text and phonetic blocks.
pub fn read_unicode_string(
    record: &BiffRecord<'_>,
    offset: usize,
    biff: BiffVersion,
    encoding: &XlsEncoding,
) -> (String, usize) {
    let cch = record.read_u16(offset) as usize;
    if biff.supports_unicode() {
        read_flagged_chars(record, offset + 2, cch, encoding, 2)
    } else {
        let bytes = record.read_array_clamped(offset + 2, cch);
        (decode_run(bytes, false, encoding), 2 + cch)
    }
}

/// Decode a string whose length prefix is a single byte (ShortXLUnicodeString
/// in BIFF8, a plain byte string before).
pub fn read_short_string(
    record: &BiffRecord<'_>,
    offset: usize,
    biff: BiffVersion,
    encoding: &XlsEncoding,
) -> (String, usize) {
    let cch = record.read_u8(offset) as usize;
    if biff.supports_unicode() {
        read_flagged_chars(record, offset + 1, cch, encoding, 1)
    } else {
        let bytes = record.read_array_clamped(offset + 1, cch);
        (decode_run(bytes, false, encoding), 1 + cch)
    }
}

/// Characters preceded by a BIFF8 option byte at `flags_at`.
fn read_flagged_chars(
    record: &BiffRecord<'_>,
    flags_at: usize,
    cch: usize,
    encoding: &XlsEncoding,
    prefix: usize,
) -> (String, usize) {
    let flags = record.read_u8(flags_at);
    let high_byte = flags & FLAG_HIGH_BYTE != 0;
    let mut pos = flags_at + 1;

    let mut runs = 0usize;
    if flags & FLAG_RICH_STRING != 0 {
        runs = record.read_u16(pos) as usize;
        pos += 2;
    }
    let mut ext = 0usize;
    if flags & FLAG_EXT_STRING != 0 {
        ext = record.read_u32(pos) as usize;
        pos += 4;
    }

    let len = run_len(cch, high_byte);
    let text = decode_run(record.read_array_clamped(pos, len), high_byte, encoding);
    let consumed = (pos - flags_at) + len + runs * 4 + ext + prefix;
    (text, consumed)
}

/// Decode the text of a LABEL (or RSTRING) cell record.
///
/// BIFF8: `cch:u16` at 6, option byte at 8, characters from 9.
/// BIFF3-BIFF5: `cch:u16` at 6, bytes from 8.
/// BIFF2: `cch:u8` at 7, bytes from 8.
pub fn read_label(record: &BiffRecord<'_>, biff: BiffVersion, encoding: &XlsEncoding) -> String {
    match biff {
        BiffVersion::Biff2 => read_short_string(record, 7, biff, encoding).0,
        _ => read_unicode_string(record, 6, biff, encoding).0,
    }
}
