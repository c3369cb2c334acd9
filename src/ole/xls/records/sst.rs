//! Shared string table (SST) and its CONTINUE records.
//!
//! A record payload is limited to 8224 bytes, so large tables spill into
//! CONTINUE records. A string header never straddles a boundary, but the
//! characters of a string may: the continuation then begins with a fresh
//! option byte whose high-byte bit applies to the remaining characters.

use smallvec::SmallVec;

use crate::ole::xls::record::{BiffRecord, ids};
use crate::ole::xls::string::{self, FLAG_EXT_STRING, FLAG_HIGH_BYTE, FLAG_RICH_STRING, XlsEncoding};

/// Decoded shared strings, indexed by LABELSST records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedStrings {
    strings: Vec<String>,
    total_count: u32,
}

impl SharedStrings {
    pub fn from_strings(strings: Vec<String>) -> Self {
        SharedStrings {
            total_count: strings.len() as u32,
            strings,
        }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Number of LABELSST references in the workbook, as declared.
    #[inline]
    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }

    /// Decode an SST record and the CONTINUE records that follow it.
    ///
    /// `max_prealloc` caps the capacity reserved from the declared unique
    /// count. A table holding fewer strings than declared is logged and
    /// kept as far as it goes.
    pub fn parse(
        sst: &BiffRecord<'_>,
        continues: &[BiffRecord<'_>],
        encoding: &XlsEncoding,
        max_prealloc: usize,
    ) -> Self {
        let total_count = sst.read_u32(0);
        let unique_count = sst.read_u32(4) as usize;

        let mut segments: SmallVec<[&[u8]; 8]> = SmallVec::new();
        segments.push(sst.read_array_clamped(8, usize::MAX));
        segments.extend(
            continues
                .iter()
                .filter(|r| r.id() == ids::CONTINUE)
                .map(|r| r.payload()),
        );
        let mut reader = SegmentReader::new(segments);

        let mut strings = Vec::with_capacity(unique_count.min(max_prealloc));
        while strings.len() < unique_count && !reader.at_end() {
            match reader.read_string(encoding) {
                Some(text) => strings.push(text),
                None => break,
            }
        }

        if strings.len() < unique_count {
            log::warn!(
                "shared string table declares {} strings but holds {}",
                unique_count,
                strings.len()
            );
        }

        SharedStrings {
            strings,
            total_count,
        }
    }
}

/// Sequential reader over the payloads of an SST and its CONTINUE records.
struct SegmentReader<'a> {
    segments: SmallVec<[&'a [u8]; 8]>,
    index: usize,
    pos: usize,
}

impl<'a> SegmentReader<'a> {
    fn new(segments: SmallVec<[&'a [u8]; 8]>) -> Self {
        SegmentReader {
            segments,
            index: 0,
            pos: 0,
        }
    }

    fn current(&self) -> &'a [u8] {
        self.segments.get(self.index).copied().unwrap_or(&[])
    }

    fn at_end(&mut self) -> bool {
        while self.index < self.segments.len() && self.pos >= self.current().len() {
            self.index += 1;
            self.pos = 0;
        }
        self.index >= self.segments.len()
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.at_end() {
            return None;
        }
        let byte = self.current()[self.pos];
        self.pos += 1;
        Some(byte)
    }

    fn read_u16(&mut self) -> Option<u16> {
        Some(u16::from_le_bytes([self.read_u8()?, self.read_u8()?]))
    }

    fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes([
            self.read_u8()?,
            self.read_u8()?,
            self.read_u8()?,
            self.read_u8()?,
        ]))
    }

    /// Skip `count` bytes across segment boundaries.
    fn skip(&mut self, mut count: usize) {
        while count > 0 && !self.at_end() {
            let step = count.min(self.current().len() - self.pos);
            self.pos += step;
            count -= step;
        }
    }

    /// Characters of one string, switching width at each continuation.
    fn read_chars(&mut self, mut cch: usize, mut high_byte: bool, encoding: &XlsEncoding) -> String {
        let mut text = String::new();
        loop {
            let segment = self.current();
            let available = segment.len().saturating_sub(self.pos);
            let width = if high_byte { 2 } else { 1 };
            let take = (available / width).min(cch);
            let bytes = &segment[self.pos..self.pos + take * width];
            text.push_str(&string::decode_run(bytes, high_byte, encoding));
            self.pos += take * width;
            cch -= take;
            if cch == 0 {
                break;
            }
            // Characters resume in the next CONTINUE, behind a new option byte
            self.index += 1;
            self.pos = 0;
            if self.index >= self.segments.len() {
                break;
            }
            match self.read_u8() {
                Some(flags) => high_byte = flags & FLAG_HIGH_BYTE != 0,
                None => break,
            }
        }
        text
    }

    fn read_string(&mut self, encoding: &XlsEncoding) -> Option<String> {
        let cch = self.read_u16()? as usize;
        let flags = self.read_u8()?;
        let runs = if flags & FLAG_RICH_STRING != 0 {
            self.read_u16()? as usize
        } else {
            0
        };
        let ext = if flags & FLAG_EXT_STRING != 0 {
            self.read_u32()? as usize
        } else {
            0
        };
        let text = self.read_chars(cch, flags & FLAG_HIGH_BYTE != 0, encoding);
        self.skip(runs * 4);
        self.skip(ext);
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::xls::record::tests::record_bytes;

    fn sst_header(total: u32, unique: u32) -> Vec<u8> {
        let mut payload = total.to_le_bytes().to_vec();
        payload.extend_from_slice(&unique.to_le_bytes());
        payload
    }

    fn compressed(text: &str) -> Vec<u8> {
        let mut out = (text.len() as u16).to_le_bytes().to_vec();
        out.push(0);
        out.extend_from_slice(text.as_bytes());
        out
    }

    fn parse(records: &[Vec<u8>]) -> SharedStrings {
        let bytes: Vec<u8> = records.concat();
        let mut views = Vec::new();
        let mut offset = 0;
        while offset < bytes.len() {
            let rec = BiffRecord::at(&bytes, offset).unwrap();
            offset = rec.next_offset();
            views.push(rec);
        }
        let encoding = XlsEncoding::from_codepage(1200, 1252);
        SharedStrings::parse(&views[0], &views[1..], &encoding, 1024)
    }

    #[test]
    fn test_simple_table() {
        let mut payload = sst_header(3, 2);
        payload.extend(compressed("alpha"));
        // wide string "β"
        payload.extend_from_slice(&[1, 0, FLAG_HIGH_BYTE, 0xB2, 0x03]);
        let sst = parse(&[record_bytes(ids::SST, &payload)]);
        assert_eq!(sst.total_count(), 3);
        assert_eq!(sst.len(), 2);
        assert_eq!(sst.get(0), Some("alpha"));
        assert_eq!(sst.get(1), Some("β"));
        assert_eq!(sst.get(2), None);
    }

    #[test]
    fn test_rich_and_phonetic_blocks_are_skipped() {
        let mut payload = sst_header(2, 2);
        // cch=3, rich + ext, cRun=2, cbExtRst=5
        payload.extend_from_slice(&[3, 0, FLAG_RICH_STRING | FLAG_EXT_STRING, 2, 0, 5, 0, 0, 0]);
        payload.extend_from_slice(b"abc");
        payload.extend_from_slice(&[0xAA; 8]);
        payload.extend_from_slice(&[0xBB; 5]);
        payload.extend(compressed("next"));
        let sst = parse(&[record_bytes(ids::SST, &payload)]);
        assert_eq!(sst.iter().collect::<Vec<_>>(), vec!["abc", "next"]);
    }

    #[test]
    fn test_string_split_across_continue_changes_width() {
        let mut payload = sst_header(2, 2);
        // "Hello World": 5 compressed chars in SST, the rest wide in CONTINUE
        payload.extend_from_slice(&[11, 0, 0]);
        payload.extend_from_slice(b"Hello");
        let mut cont = vec![FLAG_HIGH_BYTE];
        for unit in " World".encode_utf16() {
            cont.extend_from_slice(&unit.to_le_bytes());
        }
        cont.extend(compressed("tail"));
        let sst = parse(&[record_bytes(ids::SST, &payload), record_bytes(ids::CONTINUE, &cont)]);
        assert_eq!(sst.get(0), Some("Hello World"));
        assert_eq!(sst.get(1), Some("tail"));
    }

    #[test]
    fn test_continue_at_string_boundary() {
        let mut payload = sst_header(2, 2);
        payload.extend(compressed("first"));
        let cont = compressed("second");
        let sst = parse(&[record_bytes(ids::SST, &payload), record_bytes(ids::CONTINUE, &cont)]);
        assert_eq!(sst.get(1), Some("second"));
    }

    #[test]
    fn test_fewer_strings_than_declared() {
        let mut payload = sst_header(10, 10);
        payload.extend(compressed("only"));
        let sst = parse(&[record_bytes(ids::SST, &payload)]);
        assert_eq!(sst.len(), 1);
        assert_eq!(sst.get(0), Some("only"));
    }
}
