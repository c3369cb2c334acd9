//! Spreadsheet format detection from leading bytes.
//!
//! Detection only looks at signatures; it never parses the container. A
//! positive answer means "worth handing to that reader", not "valid".

/// ZIP local file header signature
pub const ZIP_SIGNATURE: &[u8; 4] = b"PK\x03\x04";

/// OLE2 compound file signature
pub const OLE_SIGNATURE: &[u8; 8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// Spreadsheet container formats this crate reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// BIFF5/BIFF8 workbook inside an OLE2 compound file (.xls)
    Xls,
    /// Bare BIFF2-BIFF4 stream without a compound file wrapper
    Biff,
    /// Zip-packaged Office Open XML workbook (.xlsx, .xlsm)
    Xlsx,
}

/// Detect the container format of `bytes`.
///
/// ```
/// use longan::common::{FileFormat, detect_format};
///
/// let bof = [0x09, 0x04, 0x06, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00];
/// assert_eq!(detect_format(&bof), Some(FileFormat::Biff));
/// assert_eq!(detect_format(b"plain text"), None);
/// ```
pub fn detect_format(bytes: &[u8]) -> Option<FileFormat> {
    if bytes.len() >= 8 && &bytes[..8] == OLE_SIGNATURE {
        return Some(FileFormat::Xls);
    }
    if bytes.len() >= 4 && &bytes[..4] == ZIP_SIGNATURE {
        // Part names are stored uncompressed in local and central headers
        return memchr::memmem::find(bytes, b"xl/workbook").map(|_| FileFormat::Xlsx);
    }
    if is_bare_biff(bytes) {
        return Some(FileFormat::Biff);
    }
    None
}

/// A bare BIFF stream starts directly with a BOF record.
fn is_bare_biff(bytes: &[u8]) -> bool {
    if bytes.len() < 8 {
        return false;
    }
    let id = u16::from_le_bytes([bytes[0], bytes[1]]);
    let len = u16::from_le_bytes([bytes[2], bytes[3]]);
    if !matches!(id, 0x0009 | 0x0209 | 0x0409 | 0x0809) || !(4..=20).contains(&len) {
        return false;
    }
    let kind = u16::from_le_bytes([bytes[6], bytes[7]]);
    matches!(kind, 0x0005 | 0x0006 | 0x0010 | 0x0020 | 0x0040 | 0x0100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_ole() {
        let mut bytes = OLE_SIGNATURE.to_vec();
        bytes.resize(512, 0);
        assert_eq!(detect_format(&bytes), Some(FileFormat::Xls));
    }

    #[test]
    fn test_detect_zip_requires_workbook_part() {
        let mut bytes = ZIP_SIGNATURE.to_vec();
        bytes.extend_from_slice(b"....xl/workbook.xml....");
        assert_eq!(detect_format(&bytes), Some(FileFormat::Xlsx));

        let mut other = ZIP_SIGNATURE.to_vec();
        other.extend_from_slice(b"....word/document.xml....");
        assert_eq!(detect_format(&other), None);
    }

    #[test]
    fn test_detect_bare_biff() {
        // BIFF2 BOF: id 0x0009, len 4, version 2, type worksheet
        let biff2 = [0x09, 0x00, 0x04, 0x00, 0x02, 0x00, 0x10, 0x00];
        assert_eq!(detect_format(&biff2), Some(FileFormat::Biff));
        let junk = [0x09, 0x00, 0x04, 0x00, 0x02, 0x00, 0x77, 0x00];
        assert_eq!(detect_format(&junk), None);
    }
}
