use std::io::{Read, Seek, SeekFrom};

use fixedbitset::FixedBitSet;

use super::consts::*;
use super::directory::{DirectoryEntry, DirectoryTree};
use super::error::{OleError, OleResult};
use super::header::CompoundHeader;
use crate::common::binary::read_u32_le;

/// Main OLE file parser structure
///
/// Holds the allocation tables and the directory of an OLE2 structured
/// storage file and reads streams out of it on demand.
#[derive(Debug)]
pub struct OleFile<R: Read + Seek> {
    reader: R,
    file_size: u64,
    header: CompoundHeader,
    /// File Allocation Table - maps sector to next sector in chain
    fat: Vec<u32>,
    /// Mini FAT - for streams smaller than cutoff size
    minifat: Vec<u32>,
    directory: DirectoryTree,
    /// Mini stream data (loaded on demand)
    ministream: Option<Vec<u8>>,
}

impl<R: Read + Seek> OleFile<R> {
    /// Open and parse an OLE file from a reader
    pub fn open(mut reader: R) -> OleResult<Self> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        if file_size < MINIMAL_OLEFILE_SIZE as u64 {
            return Err(OleError::NotOleFile);
        }

        let mut header_block = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header_block)?;
        let header = CompoundHeader::parse(&header_block)?;

        let mut ole = OleFile {
            reader,
            file_size,
            header,
            fat: Vec::new(),
            minifat: Vec::new(),
            directory: DirectoryTree::default(),
            ministream: None,
        };

        ole.load_fat()?;

        let dir_data = ole.read_chain(ole.header.first_dir_sector)?;
        ole.directory = DirectoryTree::parse(&dir_data, ole.header.major_version)?;
        log::debug!(
            "compound file: {} bytes, {} FAT entries, {} directory entries",
            ole.file_size,
            ole.fat.len(),
            ole.directory.len()
        );

        if ole.header.num_minifat_sectors > 0 && ole.header.first_minifat_sector <= MAXREGSECT {
            let minifat_data = ole.read_chain(ole.header.first_minifat_sector)?;
            ole.minifat = minifat_data
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect();
        }

        Ok(ole)
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn header(&self) -> &CompoundHeader {
        &self.header
    }

    pub fn directory(&self) -> &DirectoryTree {
        &self.directory
    }

    /// Load the File Allocation Table (FAT)
    ///
    /// The first 109 FAT sector indexes are stored in the header, the rest in
    /// a chain of DIFAT sectors whose last slot links to the next one.
    fn load_fat(&mut self) -> OleResult<()> {
        let mut fat_sectors = self.header.difat_head.clone();

        let mut difat_sector = self.header.first_difat_sector;
        let slots_per_sector = self.header.sector_size() / 4 - 1;
        for _ in 0..self.header.num_difat_sectors {
            if difat_sector > MAXREGSECT {
                break;
            }
            let sector_data = self.read_sector(difat_sector)?;
            for i in 0..slots_per_sector {
                let sector = read_u32_le(&sector_data, i * 4)?;
                if sector == FREESECT || sector == ENDOFCHAIN {
                    break;
                }
                fat_sectors.push(sector);
            }
            difat_sector = read_u32_le(&sector_data, slots_per_sector * 4)?;
        }

        let entries_per_sector = self.header.sector_size() / 4;
        self.fat.reserve(fat_sectors.len() * entries_per_sector);
        for sector_id in fat_sectors {
            let sector_data = self.read_sector(sector_id)?;
            self.fat.extend(
                sector_data
                    .chunks_exact(4)
                    .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])),
            );
        }

        if self.fat.is_empty() {
            return Err(OleError::CorruptedFile("Empty FAT".to_string()));
        }
        Ok(())
    }

    /// Read a single sector from the file
    fn read_sector(&mut self, sector_id: u32) -> OleResult<Vec<u8>> {
        let sector_size = self.header.sector_size() as u64;
        // Sector 0 starts right after the header block, which is one sector long
        let position = (u64::from(sector_id) + 1) * sector_size;
        if position >= self.file_size {
            return Err(OleError::CorruptedFile(format!(
                "Sector {sector_id} beyond end of file"
            )));
        }
        self.reader.seek(SeekFrom::Start(position))?;

        // A truncated last sector is zero-padded
        let mut buffer = vec![0u8; sector_size as usize];
        let available = (self.file_size - position).min(sector_size) as usize;
        self.reader.read_exact(&mut buffer[..available])?;
        Ok(buffer)
    }

    /// Read a chain of regular sectors by following the FAT.
    fn read_chain(&mut self, start_sector: u32) -> OleResult<Vec<u8>> {
        let chain = walk_chain(&self.fat, start_sector, "FAT")?;
        let mut data = Vec::with_capacity(chain.len() * self.header.sector_size());
        for sector in chain {
            data.extend_from_slice(&self.read_sector(sector)?);
        }
        Ok(data)
    }

    /// Read a chain of mini sectors by following the mini FAT.
    fn read_mini_chain(&mut self, start_sector: u32, size: u64) -> OleResult<Vec<u8>> {
        if self.ministream.is_none() {
            let root_start = self
                .directory
                .root()
                .map(|r| r.start_sector)
                .ok_or_else(|| OleError::CorruptedFile("No root entry".to_string()))?;
            self.ministream = Some(self.read_chain(root_start)?);
        }
        let ministream = self.ministream.as_deref().unwrap_or_default();

        let mini_size = self.header.mini_sector_size();
        let chain = walk_chain(&self.minifat, start_sector, "MiniFAT")?;
        let mut data = Vec::with_capacity(chain.len() * mini_size);
        for sector in chain {
            let position = sector as usize * mini_size;
            let slice = ministream
                .get(position..position + mini_size)
                .ok_or_else(|| OleError::CorruptedFile("Mini sector out of bounds".to_string()))?;
            data.extend_from_slice(slice);
        }
        data.truncate(size as usize);
        Ok(data)
    }

    /// Look up an entry by path.
    pub fn entry(&self, path: &[&str]) -> OleResult<&DirectoryEntry> {
        self.directory
            .find_path(path)
            .and_then(|sid| self.directory.get(sid))
            .ok_or_else(|| OleError::StreamNotFound(path.join("/")))
    }

    /// Open a stream by path and return its contents
    pub fn open_stream(&mut self, path: &[&str]) -> OleResult<Vec<u8>> {
        let entry = self.entry(path)?;
        if !entry.is_stream() {
            return Err(OleError::WrongEntryType {
                name: entry.name.clone(),
                expected: "stream",
            });
        }
        let (start, size) = (entry.start_sector, entry.stream_size);

        if entry.is_entry_mini_stream(self.header.mini_stream_cutoff) {
            self.read_mini_chain(start, size)
        } else {
            let mut data = self.read_chain(start)?;
            if (data.len() as u64) < size {
                log::warn!(
                    "stream '{}' declares {} bytes but its chain holds {}",
                    path.join("/"),
                    size,
                    data.len()
                );
            }
            data.truncate(size as usize);
            Ok(data)
        }
    }

    /// List all streams in the OLE file as paths of storage/stream names
    pub fn list_streams(&self) -> Vec<Vec<String>> {
        self.directory
            .streams()
            .into_iter()
            .map(|(path, _)| path)
            .collect()
    }

    /// Check if a stream or storage exists
    pub fn exists(&self, path: &[&str]) -> bool {
        self.directory.find_path(path).is_some()
    }
}

/// Follow a sector chain, refusing to revisit a sector.
fn walk_chain(table: &[u32], start: u32, table_name: &str) -> OleResult<Vec<u32>> {
    let mut chain = Vec::new();
    let mut visited = FixedBitSet::with_capacity(table.len());
    let mut sector = start;

    while sector != ENDOFCHAIN && sector != FREESECT {
        let idx = sector as usize;
        if idx >= table.len() {
            return Err(OleError::CorruptedFile(format!(
                "Invalid sector index {sector} in {table_name}"
            )));
        }
        if visited.contains(idx) {
            return Err(OleError::CorruptedFile(format!(
                "Cycle in {table_name} chain at sector {sector}"
            )));
        }
        visited.insert(idx);
        chain.push(sector);
        sector = table[idx];
    }

    Ok(chain)
}

/// Check if a file/data is an OLE file by checking magic bytes
pub fn is_ole_file(data: &[u8]) -> bool {
    data.len() >= MINIMAL_OLEFILE_SIZE && &data[0..8] == MAGIC
}
