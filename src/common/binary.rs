//! Checked little-endian readers shared by the compound-file and BIFF layers.
//!
//! Every reader validates the requested range against the slice before
//! touching it and reports [`BinaryError::InsufficientData`] instead of
//! panicking. Callers that treat a missing field as zero use the lenient
//! accessors on [`crate::ole::xls::BiffRecord`] instead.

use thiserror::Error;
use zerocopy::{F64, FromBytes, I16, I32, LE, U16, U32, U64};

/// Binary parsing error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BinaryError {
    /// Not enough data to read the requested type
    #[error("Insufficient data: expected {expected}, got {available}")]
    InsufficientData { expected: usize, available: usize },
    /// Failed to parse the data
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Result type for binary operations
pub type BinaryResult<T> = Result<T, BinaryError>;

#[inline]
fn window(data: &[u8], offset: usize, len: usize) -> BinaryResult<&[u8]> {
    let end = offset.checked_add(len).ok_or(BinaryError::InsufficientData {
        expected: usize::MAX,
        available: data.len(),
    })?;
    data.get(offset..end).ok_or(BinaryError::InsufficientData {
        expected: end,
        available: data.len(),
    })
}

/// Read a single byte at the given offset.
#[inline]
pub fn read_u8(data: &[u8], offset: usize) -> BinaryResult<u8> {
    data.get(offset)
        .copied()
        .ok_or(BinaryError::InsufficientData {
            expected: offset + 1,
            available: data.len(),
        })
}

/// Read a little-endian u16 from a byte slice at the given offset.
///
/// # Examples
///
/// ```
/// use longan::common::binary::read_u16_le;
/// let data = [0x34, 0x12, 0x78, 0x56];
/// assert_eq!(read_u16_le(&data, 0).unwrap(), 0x1234);
/// assert_eq!(read_u16_le(&data, 2).unwrap(), 0x5678);
/// ```
#[inline]
pub fn read_u16_le(data: &[u8], offset: usize) -> BinaryResult<u16> {
    U16::<LE>::read_from_bytes(window(data, offset, 2)?)
        .map(|v| v.get())
        .map_err(|_| BinaryError::ParseError("Failed to read u16".to_string()))
}

/// Read a little-endian i16 from a byte slice at the given offset.
#[inline]
pub fn read_i16_le(data: &[u8], offset: usize) -> BinaryResult<i16> {
    I16::<LE>::read_from_bytes(window(data, offset, 2)?)
        .map(|v| v.get())
        .map_err(|_| BinaryError::ParseError("Failed to read i16".to_string()))
}

/// Read a little-endian u32 from a byte slice at the given offset.
///
/// # Examples
///
/// ```
/// use longan::common::binary::read_u32_le;
/// let data = [0x78, 0x56, 0x34, 0x12];
/// assert_eq!(read_u32_le(&data, 0).unwrap(), 0x12345678);
/// ```
#[inline]
pub fn read_u32_le(data: &[u8], offset: usize) -> BinaryResult<u32> {
    U32::<LE>::read_from_bytes(window(data, offset, 4)?)
        .map(|v| v.get())
        .map_err(|_| BinaryError::ParseError("Failed to read u32".to_string()))
}

/// Read a little-endian i32 from a byte slice at the given offset.
#[inline]
pub fn read_i32_le(data: &[u8], offset: usize) -> BinaryResult<i32> {
    I32::<LE>::read_from_bytes(window(data, offset, 4)?)
        .map(|v| v.get())
        .map_err(|_| BinaryError::ParseError("Failed to read i32".to_string()))
}

/// Read a little-endian u64 from a byte slice at the given offset.
#[inline]
pub fn read_u64_le(data: &[u8], offset: usize) -> BinaryResult<u64> {
    U64::<LE>::read_from_bytes(window(data, offset, 8)?)
        .map(|v| v.get())
        .map_err(|_| BinaryError::ParseError("Failed to read u64".to_string()))
}

/// Read a little-endian IEEE-754 f64 from a byte slice at the given offset.
///
/// # Examples
///
/// ```
/// use longan::common::binary::read_f64_le;
/// let data = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xF0, 0x3F];
/// assert!((read_f64_le(&data, 0).unwrap() - 1.0).abs() < f64::EPSILON);
/// ```
#[inline]
pub fn read_f64_le(data: &[u8], offset: usize) -> BinaryResult<f64> {
    F64::<LE>::read_from_bytes(window(data, offset, 8)?)
        .map(|v| v.get())
        .map_err(|_| BinaryError::ParseError("Failed to read f64".to_string()))
}

/// Decode UTF-16LE code units, replacing unpaired surrogates.
///
/// A trailing odd byte is ignored. Trailing NULs are trimmed, which is what
/// both compound-file entry names and BIFF strings expect.
///
/// ```
/// use longan::common::binary::decode_utf16le;
/// let data = [0x48, 0x00, 0x69, 0x00, 0x00, 0x00];
/// assert_eq!(decode_utf16le(&data), "Hi");
/// ```
pub fn decode_utf16le(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();
    let mut text = String::from_utf16_lossy(&units);
    let trimmed = text.trim_end_matches('\0').len();
    text.truncate(trimmed);
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u16_le() {
        let data = [0x34, 0x12, 0x78, 0x56];
        assert!(read_u16_le(&data, 0).is_ok_and(|v| v == 0x1234));
        assert!(read_u16_le(&data, 2).is_ok_and(|v| v == 0x5678));
        assert!(read_u16_le(&data, 3).is_err());
    }

    #[test]
    fn test_read_u32_le() {
        let data = [0x78, 0x56, 0x34, 0x12];
        assert!(read_u32_le(&data, 0).is_ok_and(|v| v == 0x12345678));
        assert!(read_u32_le(&data, 1).is_err());
    }

    #[test]
    fn test_offset_overflow_is_an_error() {
        let data = [0u8; 4];
        assert!(matches!(
            read_u32_le(&data, usize::MAX),
            Err(BinaryError::InsufficientData { .. })
        ));
        assert!(read_u8(&data, 4).is_err());
    }

    #[test]
    fn test_read_f64_and_i32() {
        let mut data = 2.5f64.to_le_bytes().to_vec();
        data.extend_from_slice(&(-7i32).to_le_bytes());
        assert_eq!(read_f64_le(&data, 0).ok(), Some(2.5));
        assert_eq!(read_i32_le(&data, 8).ok(), Some(-7));
        assert!(read_u64_le(&data, 8).is_err());
    }

    #[test]
    fn test_decode_utf16le_trims_nul() {
        let data = [0x41, 0x00, 0x42, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(decode_utf16le(&data), "AB");
    }
}
