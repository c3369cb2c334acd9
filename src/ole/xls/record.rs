//! Generic BIFF record access.
//!
//! A BIFF stream is a flat sequence of records, each a 4-byte header
//! (`u16` id, `u16` payload length) followed by the payload. [`BiffRecord`]
//! is a borrowed view of one record; its typed readers take offsets relative
//! to the start of the payload and return zero for any field that would end
//! past the declared payload length. Older BIFF versions simply omit trailing
//! fields, so "missing" reads as zero rather than failing.

use crate::common::binary;
use crate::ole::xls::error::{XlsError, XlsResult};

/// Record identifiers.
pub mod ids {
    pub const DIMENSIONS_BIFF2: u16 = 0x0000;
    pub const BLANK_BIFF2: u16 = 0x0001;
    pub const INTEGER_BIFF2: u16 = 0x0002;
    pub const NUMBER_BIFF2: u16 = 0x0003;
    pub const LABEL_BIFF2: u16 = 0x0004;
    pub const BOOLERR_BIFF2: u16 = 0x0005;
    pub const FORMULA: u16 = 0x0006;
    pub const STRING_BIFF2: u16 = 0x0007;
    pub const ROW_BIFF2: u16 = 0x0008;
    pub const BOF_BIFF2: u16 = 0x0009;
    pub const EOF: u16 = 0x000A;
    pub const CALCCOUNT: u16 = 0x000C;
    pub const CALCMODE: u16 = 0x000D;
    pub const REFMODE: u16 = 0x000F;
    pub const DELTA: u16 = 0x0010;
    pub const ITERATION: u16 = 0x0011;
    pub const FORMAT_BIFF2: u16 = 0x001E;
    pub const DATE1904: u16 = 0x0022;
    pub const FILEPASS: u16 = 0x002F;
    pub const FONT: u16 = 0x0031;
    pub const CONTINUE: u16 = 0x003C;
    pub const WINDOW1: u16 = 0x003D;
    pub const CODEPAGE: u16 = 0x0042;
    pub const XF_BIFF2: u16 = 0x0043;
    pub const RK_BIFF3: u16 = 0x007E;
    pub const BOUNDSHEET: u16 = 0x0085;
    pub const MULRK: u16 = 0x00BD;
    pub const MULBLANK: u16 = 0x00BE;
    pub const RSTRING: u16 = 0x00D6;
    pub const XF: u16 = 0x00E0;
    pub const MERGECELLS: u16 = 0x00E5;
    pub const SST: u16 = 0x00FC;
    pub const LABELSST: u16 = 0x00FD;
    pub const EXTSST: u16 = 0x00FF;
    pub const DIMENSIONS: u16 = 0x0200;
    pub const BLANK: u16 = 0x0201;
    pub const NUMBER: u16 = 0x0203;
    pub const LABEL: u16 = 0x0204;
    pub const BOOLERR: u16 = 0x0205;
    pub const FORMULA_BIFF3: u16 = 0x0206;
    pub const STRING: u16 = 0x0207;
    pub const ROW: u16 = 0x0208;
    pub const BOF_BIFF3: u16 = 0x0209;
    pub const FONT_BIFF3: u16 = 0x0231;
    pub const XF_BIFF3: u16 = 0x0243;
    pub const RK: u16 = 0x027E;
    pub const STYLE: u16 = 0x0293;
    pub const FORMULA_BIFF4: u16 = 0x0406;
    pub const BOF_BIFF4: u16 = 0x0409;
    pub const FORMAT: u16 = 0x041E;
    pub const XF_BIFF4: u16 = 0x0443;
    pub const BOF: u16 = 0x0809;
}

/// BIFF versions supported
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BiffVersion {
    Biff2,
    Biff3,
    Biff4,
    Biff5,
    Biff8,
}

impl BiffVersion {
    /// Derive the version from a BOF record id and its version field.
    pub fn from_bof(record_id: u16, version: u16) -> Option<Self> {
        match record_id {
            ids::BOF_BIFF2 => Some(BiffVersion::Biff2),
            ids::BOF_BIFF3 => Some(BiffVersion::Biff3),
            ids::BOF_BIFF4 => Some(BiffVersion::Biff4),
            ids::BOF => match version {
                0x0600 => Some(BiffVersion::Biff8),
                0x0500 => Some(BiffVersion::Biff5),
                0x0400 => Some(BiffVersion::Biff4),
                0x0300 => Some(BiffVersion::Biff3),
                0x0200 | 0x0002 | 0x0007 => Some(BiffVersion::Biff2),
                _ => None,
            },
            _ => None,
        }
    }

    /// Whether strings carry a per-string unicode flag byte.
    #[inline]
    pub fn supports_unicode(&self) -> bool {
        matches!(self, BiffVersion::Biff8)
    }

    /// Whether the file is a workbook with a globals section and BOUNDSHEETs.
    #[inline]
    pub fn has_globals(&self) -> bool {
        *self >= BiffVersion::Biff5
    }
}

/// Whether `id` is one of the BOF record identifiers.
#[inline]
pub fn is_bof(id: u16) -> bool {
    matches!(id, ids::BOF | ids::BOF_BIFF4 | ids::BOF_BIFF3 | ids::BOF_BIFF2)
}

/// A borrowed view of one BIFF record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BiffRecord<'a> {
    buf: &'a [u8],
    /// Offset of the record header in `buf`
    offset: usize,
    size: usize,
}

impl<'a> BiffRecord<'a> {
    /// View the record whose header starts at `offset`.
    ///
    /// Fails with [`XlsError::RecordTooShort`] when the header or the
    /// declared payload does not fit in the buffer.
    pub fn at(buf: &'a [u8], offset: usize) -> XlsResult<Self> {
        let available = buf.len().saturating_sub(offset);
        if available < 4 {
            let record_type = if available >= 2 {
                binary::read_u16_le(buf, offset)?
            } else {
                0
            };
            return Err(XlsError::RecordTooShort {
                record_type,
                expected: 4,
                found: available,
            });
        }
        let record_type = binary::read_u16_le(buf, offset)?;
        let size = binary::read_u16_le(buf, offset + 2)? as usize;
        if available < 4 + size {
            return Err(XlsError::RecordTooShort {
                record_type,
                expected: 4 + size,
                found: available,
            });
        }
        Ok(BiffRecord { buf, offset, size })
    }

    /// Record identifier.
    #[inline]
    pub fn id(&self) -> u16 {
        u16::from_le_bytes([self.buf[self.offset], self.buf[self.offset + 1]])
    }

    /// Declared payload length.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Header plus payload length.
    #[inline]
    pub fn total_size(&self) -> usize {
        4 + self.size
    }

    /// Offset of the record header within the stream.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Offset of the record that follows this one.
    #[inline]
    pub fn next_offset(&self) -> usize {
        self.offset + self.total_size()
    }

    #[inline]
    pub fn payload(&self) -> &'a [u8] {
        &self.buf[self.offset + 4..self.offset + 4 + self.size]
    }

    /// Fail unless the payload holds at least `min` bytes.
    pub fn require(&self, min: usize) -> XlsResult<()> {
        if self.size < min {
            return Err(XlsError::RecordTooShort {
                record_type: self.id(),
                expected: min,
                found: self.size,
            });
        }
        Ok(())
    }

    #[inline]
    fn fits(&self, offset: usize, len: usize) -> bool {
        offset.checked_add(len).is_some_and(|end| end <= self.size)
    }

    #[inline]
    pub fn read_u8(&self, offset: usize) -> u8 {
        if self.fits(offset, 1) {
            self.payload()[offset]
        } else {
            0
        }
    }

    #[inline]
    pub fn read_u16(&self, offset: usize) -> u16 {
        if self.fits(offset, 2) {
            binary::read_u16_le(self.payload(), offset).unwrap_or(0)
        } else {
            0
        }
    }

    #[inline]
    pub fn read_i16(&self, offset: usize) -> i16 {
        if self.fits(offset, 2) {
            binary::read_i16_le(self.payload(), offset).unwrap_or(0)
        } else {
            0
        }
    }

    #[inline]
    pub fn read_u32(&self, offset: usize) -> u32 {
        if self.fits(offset, 4) {
            binary::read_u32_le(self.payload(), offset).unwrap_or(0)
        } else {
            0
        }
    }

    #[inline]
    pub fn read_i32(&self, offset: usize) -> i32 {
        if self.fits(offset, 4) {
            binary::read_i32_le(self.payload(), offset).unwrap_or(0)
        } else {
            0
        }
    }

    #[inline]
    pub fn read_f64(&self, offset: usize) -> f64 {
        if self.fits(offset, 8) {
            binary::read_f64_le(self.payload(), offset).unwrap_or(0.0)
        } else {
            0.0
        }
    }

    /// Exactly `len` payload bytes at `offset`, or an empty slice.
    #[inline]
    pub fn read_array(&self, offset: usize, len: usize) -> &'a [u8] {
        if self.fits(offset, len) {
            &self.payload()[offset..offset + len]
        } else {
            &[]
        }
    }

    /// Up to `len` payload bytes at `offset`, clamped to the payload end.
    #[inline]
    pub fn read_array_clamped(&self, offset: usize, len: usize) -> &'a [u8] {
        let payload = self.payload();
        if offset >= payload.len() {
            return &[];
        }
        let end = offset.saturating_add(len).min(payload.len());
        &payload[offset..end]
    }
}

/// Forward iterator over the records of a stream.
///
/// Iteration stops at the end of the buffer; a truncated record yields one
/// error and then ends.
#[derive(Debug, Clone)]
pub struct RecordIter<'a> {
    buf: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> RecordIter<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        RecordIter {
            buf,
            pos: 0,
            failed: false,
        }
    }

    /// Iterate from `pos` (for instance a BOUNDSHEET offset).
    pub fn starting_at(buf: &'a [u8], pos: usize) -> Self {
        RecordIter {
            buf,
            pos,
            failed: false,
        }
    }

    /// Seek to a specific position in the stream
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
        self.failed = false;
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Look at the next record without consuming it.
    pub fn peek(&self) -> Option<BiffRecord<'a>> {
        BiffRecord::at(self.buf, self.pos).ok()
    }
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = XlsResult<BiffRecord<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.buf.len() {
            return None;
        }
        match BiffRecord::at(self.buf, self.pos) {
            Ok(record) => {
                self.pos = record.next_offset();
                Some(Ok(record))
            },
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode one record (header + payload).
    pub(crate) fn record_bytes(id: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + payload.len());
        out.extend_from_slice(&id.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_reads_past_declared_size_return_zero() {
        let bytes = record_bytes(0x1234, &[0x01, 0x02, 0x03]);
        let rec = BiffRecord::at(&bytes, 0).unwrap();
        assert_eq!(rec.id(), 0x1234);
        assert_eq!(rec.size(), 3);
        assert_eq!(rec.read_u16(0), 0x0201);
        assert_eq!(rec.read_u16(2), 0);
        assert_eq!(rec.read_u32(0), 0);
        assert_eq!(rec.read_f64(0), 0.0);
        assert_eq!(rec.read_u8(3), 0);
        assert_eq!(rec.read_u8(usize::MAX), 0);
        assert!(rec.read_array(1, 5).is_empty());
        assert_eq!(rec.read_array_clamped(1, 5), &[0x02, 0x03]);
    }

    #[test]
    fn test_reads_do_not_leak_into_next_record() {
        let mut bytes = record_bytes(0x0001, &[0xAA]);
        bytes.extend(record_bytes(0x0002, &[0xBB, 0xCC]));
        let rec = BiffRecord::at(&bytes, 0).unwrap();
        assert_eq!(rec.read_u16(0), 0);
        assert_eq!(rec.next_offset(), 5);
    }

    #[test]
    fn test_truncated_record_is_structural_error() {
        let mut bytes = record_bytes(0x0203, &[0u8; 14]);
        bytes.truncate(10);
        assert!(matches!(
            BiffRecord::at(&bytes, 0),
            Err(XlsError::RecordTooShort {
                record_type: 0x0203,
                expected: 18,
                found: 10
            })
        ));
        assert!(matches!(
            BiffRecord::at(&bytes[..3], 0),
            Err(XlsError::RecordTooShort { expected: 4, .. })
        ));
    }

    #[test]
    fn test_require() {
        let bytes = record_bytes(0x0201, &[0u8; 4]);
        let rec = BiffRecord::at(&bytes, 0).unwrap();
        assert!(rec.require(4).is_ok());
        assert!(matches!(
            rec.require(6),
            Err(XlsError::RecordTooShort { expected: 6, found: 4, .. })
        ));
    }

    #[test]
    fn test_iterator_yields_in_order() {
        let mut bytes = record_bytes(ids::BOF, &[0u8; 16]);
        bytes.extend(record_bytes(ids::CODEPAGE, &1200u16.to_le_bytes()));
        bytes.extend(record_bytes(ids::EOF, &[]));
        let ids: Vec<u16> = RecordIter::new(&bytes).map(|r| r.unwrap().id()).collect();
        assert_eq!(ids, vec![ids::BOF, ids::CODEPAGE, ids::EOF]);

        let mut iter = RecordIter::new(&bytes);
        iter.seek(20);
        assert_eq!(iter.peek().map(|r| r.id()), Some(ids::CODEPAGE));
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let mut bytes = record_bytes(ids::EOF, &[]);
        bytes.extend_from_slice(&[0x01, 0x02, 0xFF]);
        let results: Vec<_> = RecordIter::new(&bytes).collect();
        assert_eq!(results.len(), 2);
        assert!(results[1].is_err());
    }

    #[test]
    fn test_biff_version_from_bof() {
        assert_eq!(BiffVersion::from_bof(ids::BOF, 0x0600), Some(BiffVersion::Biff8));
        assert_eq!(BiffVersion::from_bof(ids::BOF, 0x0500), Some(BiffVersion::Biff5));
        assert_eq!(BiffVersion::from_bof(ids::BOF_BIFF2, 0), Some(BiffVersion::Biff2));
        assert_eq!(BiffVersion::from_bof(ids::BOF, 0x1234), None);
        assert!(BiffVersion::Biff5.has_globals());
        assert!(!BiffVersion::Biff4.has_globals());
    }
}
