//! Compound file header (the first 512 bytes of every `.xls`).

use zerocopy::{FromBytes, LE, U16, U32};
use zerocopy_derive::FromBytes as DeriveFromBytes;

use super::consts::*;
use super::error::{OleError, OleResult};

/// Raw on-disk header layout (512 bytes).
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawHeader {
    signature: [u8; 8],
    clsid: [u8; 16],
    minor_version: U16<LE>,
    major_version: U16<LE>,
    byte_order: U16<LE>,
    sector_shift: U16<LE>,
    mini_sector_shift: U16<LE>,
    reserved: [u8; 6],
    num_dir_sectors: U32<LE>,
    num_fat_sectors: U32<LE>,
    first_dir_sector: U32<LE>,
    transaction_signature: U32<LE>,
    mini_stream_cutoff: U32<LE>,
    first_minifat_sector: U32<LE>,
    num_minifat_sectors: U32<LE>,
    first_difat_sector: U32<LE>,
    num_difat_sectors: U32<LE>,
    difat: [U32<LE>; HEADER_DIFAT_SLOTS],
}

/// Decoded compound file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundHeader {
    pub minor_version: u16,
    pub major_version: u16,
    /// log2 of the sector size (9 for v3, 12 for v4)
    pub sector_shift: u16,
    /// log2 of the mini sector size (always 6)
    pub mini_sector_shift: u16,
    pub num_dir_sectors: u32,
    pub num_fat_sectors: u32,
    pub first_dir_sector: u32,
    pub transaction_signature: u32,
    /// Streams strictly smaller than this live in the mini stream
    pub mini_stream_cutoff: u32,
    pub first_minifat_sector: u32,
    pub num_minifat_sectors: u32,
    pub first_difat_sector: u32,
    pub num_difat_sectors: u32,
    /// The DIFAT slots stored in the header, up to the first free slot
    pub difat_head: Vec<u32>,
}

impl CompoundHeader {
    /// Parse and validate the 512-byte header block.
    pub fn parse(data: &[u8]) -> OleResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(OleError::NotOleFile);
        }
        let raw = RawHeader::read_from_bytes(&data[..HEADER_SIZE])
            .map_err(|_| OleError::InvalidFormat("Failed to parse header".to_string()))?;

        if &raw.signature != MAGIC {
            return Err(OleError::NotOleFile);
        }
        if raw.byte_order.get() != BYTE_ORDER_LE {
            return Err(OleError::InvalidFormat(format!(
                "Invalid byte order 0x{:04X}",
                raw.byte_order.get()
            )));
        }

        let major_version = raw.major_version.get();
        let sector_shift = raw.sector_shift.get();
        match (major_version, sector_shift) {
            (3, 9) | (4, 12) => {},
            // Some writers emit a v3 header with 4096-byte sectors; tolerate any sane shift
            (_, 7..=16) => {
                log::warn!(
                    "compound file major version {major_version} with sector shift {sector_shift}"
                );
            },
            _ => {
                return Err(OleError::InvalidFormat(format!(
                    "Sector size mismatch: version {major_version}, shift {sector_shift}"
                )));
            },
        }

        let mini_sector_shift = raw.mini_sector_shift.get();
        if mini_sector_shift >= sector_shift {
            return Err(OleError::InvalidFormat(format!(
                "Mini sector shift {mini_sector_shift} not smaller than sector shift {sector_shift}"
            )));
        }

        let difat_head = raw
            .difat
            .iter()
            .map(|v| v.get())
            .take_while(|&s| s != FREESECT && s != ENDOFCHAIN)
            .collect();

        Ok(CompoundHeader {
            minor_version: raw.minor_version.get(),
            major_version,
            sector_shift,
            mini_sector_shift,
            num_dir_sectors: raw.num_dir_sectors.get(),
            num_fat_sectors: raw.num_fat_sectors.get(),
            first_dir_sector: raw.first_dir_sector.get(),
            transaction_signature: raw.transaction_signature.get(),
            mini_stream_cutoff: raw.mini_stream_cutoff.get(),
            first_minifat_sector: raw.first_minifat_sector.get(),
            num_minifat_sectors: raw.num_minifat_sectors.get(),
            first_difat_sector: raw.first_difat_sector.get(),
            num_difat_sectors: raw.num_difat_sectors.get(),
            difat_head,
        })
    }

    #[inline]
    pub fn sector_size(&self) -> usize {
        1usize << self.sector_shift
    }

    #[inline]
    pub fn mini_sector_size(&self) -> usize {
        1usize << self.mini_sector_shift
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a minimal v3 header with the given fields set.
    pub(crate) fn header_bytes(first_dir: u32, fat_sectors: &[u32], cutoff: u32) -> Vec<u8> {
        let mut h = vec![0u8; HEADER_SIZE];
        h[0..8].copy_from_slice(MAGIC);
        h[0x18..0x1A].copy_from_slice(&0x3Eu16.to_le_bytes());
        h[0x1A..0x1C].copy_from_slice(&3u16.to_le_bytes());
        h[0x1C..0x1E].copy_from_slice(&BYTE_ORDER_LE.to_le_bytes());
        h[0x1E..0x20].copy_from_slice(&9u16.to_le_bytes());
        h[0x20..0x22].copy_from_slice(&6u16.to_le_bytes());
        h[0x2C..0x30].copy_from_slice(&(fat_sectors.len() as u32).to_le_bytes());
        h[0x30..0x34].copy_from_slice(&first_dir.to_le_bytes());
        h[0x38..0x3C].copy_from_slice(&cutoff.to_le_bytes());
        h[0x3C..0x40].copy_from_slice(&ENDOFCHAIN.to_le_bytes());
        h[0x44..0x48].copy_from_slice(&ENDOFCHAIN.to_le_bytes());
        for slot in 0..HEADER_DIFAT_SLOTS {
            let value = fat_sectors.get(slot).copied().unwrap_or(FREESECT);
            let at = 0x4C + slot * 4;
            h[at..at + 4].copy_from_slice(&value.to_le_bytes());
        }
        h
    }

    #[test]
    fn test_parse_minimal_header() {
        let bytes = header_bytes(1, &[0], DEFAULT_MINI_STREAM_CUTOFF);
        let header = CompoundHeader::parse(&bytes).unwrap();
        assert_eq!(header.sector_size(), SECTOR_SIZE_V3);
        assert_eq!(header.mini_sector_size(), 64);
        assert_eq!(header.mini_stream_cutoff, 4096);
        assert_eq!(header.first_dir_sector, 1);
        assert_eq!(header.difat_head, vec![0]);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = header_bytes(1, &[0], DEFAULT_MINI_STREAM_CUTOFF);
        bytes[0] = 0;
        assert!(matches!(
            CompoundHeader::parse(&bytes),
            Err(OleError::NotOleFile)
        ));
    }

    #[test]
    fn test_rejects_big_endian_marker() {
        let mut bytes = header_bytes(1, &[0], DEFAULT_MINI_STREAM_CUTOFF);
        bytes[0x1C..0x1E].copy_from_slice(&0xFEFFu16.to_le_bytes());
        assert!(matches!(
            CompoundHeader::parse(&bytes),
            Err(OleError::InvalidFormat(_))
        ));
    }
}
