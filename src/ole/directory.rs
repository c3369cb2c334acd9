//! Compound file directory: entries and the arena that links them.
//!
//! Directory entries reference their left/right siblings and first child by
//! directory index (SID). The entries are parsed into a flat arena first and
//! the links are resolved into plain indices in a second pass, so nothing is
//! ever partially constructed while the tree is being wired up.

use chrono::{DateTime, Utc};
use fixedbitset::FixedBitSet;
use smallvec::SmallVec;
use zerocopy::{FromBytes, LE, U16, U32, U64};
use zerocopy_derive::FromBytes as DeriveFromBytes;

use super::consts::*;
use super::error::{OleError, OleResult};
use crate::common::binary::decode_utf16le;

/// Raw OLE directory entry structure (128 bytes)
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawDirectoryEntry {
    /// Entry name in UTF-16LE (64 bytes, null-padded)
    name: [u8; 64],
    /// Length of name in bytes (including null terminator)
    name_len: U16<LE>,
    entry_type: u8,
    node_color: u8,
    sid_left: U32<LE>,
    sid_right: U32<LE>,
    sid_child: U32<LE>,
    clsid: [u8; 16],
    state_bits: U32<LE>,
    /// FILETIME
    creation_time: U64<LE>,
    /// FILETIME
    modified_time: U64<LE>,
    start_sector: U32<LE>,
    stream_size: U64<LE>,
}

/// Object type stored in a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    Empty,
    Storage,
    Stream,
    LockBytes,
    Property,
    Root,
    Unknown(u8),
}

impl From<u8> for EntryType {
    fn from(value: u8) -> Self {
        match value {
            STGTY_EMPTY => EntryType::Empty,
            STGTY_STORAGE => EntryType::Storage,
            STGTY_STREAM => EntryType::Stream,
            STGTY_LOCKBYTES => EntryType::LockBytes,
            STGTY_PROPERTY => EntryType::Property,
            STGTY_ROOT => EntryType::Root,
            other => EntryType::Unknown(other),
        }
    }
}

/// Red-black tree node color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeColor {
    Red,
    Black,
}

impl From<u8> for NodeColor {
    fn from(value: u8) -> Self {
        if value == DE_RED {
            NodeColor::Red
        } else {
            NodeColor::Black
        }
    }
}

/// Represents an OLE directory entry (stream or storage)
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryEntry {
    /// Storage ID (index in directory)
    pub sid: usize,
    /// Entry name (UTF-16 decoded to UTF-8)
    pub name: String,
    pub entry_type: EntryType,
    pub color: NodeColor,
    /// Raw SID of the left sibling
    pub left_sibling_id: u32,
    /// Raw SID of the right sibling
    pub right_sibling_id: u32,
    /// Raw SID of the first child
    pub child_id: u32,
    pub clsid: String,
    pub state_bits: u32,
    pub creation_time: u64,
    pub modified_time: u64,
    /// First sector of the stream
    pub start_sector: u32,
    /// Size of the stream in bytes
    pub stream_size: u64,
}

impl DirectoryEntry {
    /// Parse a single entry from its 128-byte slot.
    ///
    /// Version 3 files only define the low 32 bits of the stream size.
    pub fn parse(data: &[u8], sid: usize, major_version: u16) -> OleResult<Self> {
        let raw = RawDirectoryEntry::read_from_bytes(data)
            .map_err(|_| OleError::InvalidFormat("Failed to parse directory entry".to_string()))?;

        let name_len = (raw.name_len.get() as usize).min(64);
        let name = decode_utf16le(&raw.name[..name_len.saturating_sub(2)]);

        let stream_size = if major_version == 3 {
            raw.stream_size.get() & 0xFFFF_FFFF
        } else {
            raw.stream_size.get()
        };

        Ok(DirectoryEntry {
            sid,
            name,
            entry_type: EntryType::from(raw.entry_type),
            color: NodeColor::from(raw.node_color),
            left_sibling_id: raw.sid_left.get(),
            right_sibling_id: raw.sid_right.get(),
            child_id: raw.sid_child.get(),
            clsid: format_clsid(&raw.clsid),
            state_bits: raw.state_bits.get(),
            creation_time: raw.creation_time.get(),
            modified_time: raw.modified_time.get(),
            start_sector: raw.start_sector.get(),
            stream_size,
        })
    }

    /// Whether this entry's data lives in the mini stream.
    ///
    /// True exactly when the declared size is below the header's cutoff;
    /// reads of such entries follow the mini FAT instead of the FAT.
    #[inline]
    pub fn is_entry_mini_stream(&self, mini_stream_cutoff: u32) -> bool {
        self.stream_size < u64::from(mini_stream_cutoff)
    }

    #[inline]
    pub fn is_stream(&self) -> bool {
        self.entry_type == EntryType::Stream
    }

    #[inline]
    pub fn is_storage(&self) -> bool {
        matches!(self.entry_type, EntryType::Storage | EntryType::Root)
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        filetime_to_datetime(self.creation_time)
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        filetime_to_datetime(self.modified_time)
    }
}

/// Resolved tree links for one entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Links {
    left: Option<usize>,
    right: Option<usize>,
    child: Option<usize>,
}

/// All directory entries of a compound file, indexed by SID.
#[derive(Debug, Clone, Default)]
pub struct DirectoryTree {
    entries: Vec<DirectoryEntry>,
    links: Vec<Links>,
}

impl DirectoryTree {
    /// Parse the whole directory stream and resolve sibling/child links.
    pub fn parse(dir_data: &[u8], major_version: u16) -> OleResult<Self> {
        let entries = dir_data
            .chunks_exact(DIRENTRY_SIZE)
            .enumerate()
            .map(|(sid, chunk)| DirectoryEntry::parse(chunk, sid, major_version))
            .collect::<OleResult<Vec<_>>>()?;

        match entries.first() {
            Some(root) if root.entry_type == EntryType::Root => {},
            Some(_) => {
                return Err(OleError::CorruptedFile(
                    "First directory entry is not the root".to_string(),
                ));
            },
            None => return Err(OleError::CorruptedFile("Empty directory".to_string())),
        }

        Ok(Self::from_entries(entries))
    }

    /// Build a tree from already parsed entries.
    pub fn from_entries(entries: Vec<DirectoryEntry>) -> Self {
        let count = entries.len();
        let resolve = |id: u32| -> Option<usize> {
            if id == NOSTREAM || id > MAXREGSID {
                return None;
            }
            let idx = id as usize;
            if idx >= count {
                log::warn!("directory link {id} points past {count} entries");
                return None;
            }
            Some(idx)
        };

        let links = entries
            .iter()
            .map(|e| Links {
                left: resolve(e.left_sibling_id),
                right: resolve(e.right_sibling_id),
                child: resolve(e.child_id),
            })
            .collect();

        DirectoryTree { entries, links }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn root(&self) -> Option<&DirectoryEntry> {
        self.entries.first()
    }

    #[inline]
    pub fn get(&self, sid: usize) -> Option<&DirectoryEntry> {
        self.entries.get(sid)
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn left(&self, sid: usize) -> Option<usize> {
        self.links.get(sid).and_then(|l| l.left)
    }

    pub fn right(&self, sid: usize) -> Option<usize> {
        self.links.get(sid).and_then(|l| l.right)
    }

    pub fn child(&self, sid: usize) -> Option<usize> {
        self.links.get(sid).and_then(|l| l.child)
    }

    /// Direct children of a storage, in tree (in-order) order.
    ///
    /// Each node is visited at most once, so a malformed file with a cycle
    /// in its sibling links still terminates.
    pub fn children(&self, sid: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let Some(first) = self.child(sid) else {
            return out;
        };

        let mut visited = FixedBitSet::with_capacity(self.entries.len());
        let mut stack: SmallVec<[usize; 16]> = SmallVec::new();
        let mut current = Some(first);

        loop {
            while let Some(node) = current {
                if visited.contains(node) {
                    log::warn!("cycle in directory sibling links at SID {node}");
                    break;
                }
                visited.insert(node);
                stack.push(node);
                current = self.left(node);
            }
            let Some(node) = stack.pop() else {
                break;
            };
            out.push(node);
            current = self.right(node);
        }

        out
    }

    /// Find a direct child by name (case-insensitive).
    pub fn find_child(&self, sid: usize, name: &str) -> Option<usize> {
        let wanted = name.to_lowercase();
        self.children(sid)
            .into_iter()
            .find(|&c| self.entries[c].name.to_lowercase() == wanted)
    }

    /// Resolve a storage/stream path starting at the root.
    pub fn find_path(&self, path: &[&str]) -> Option<usize> {
        let mut sid = 0;
        if self.entries.is_empty() {
            return None;
        }
        for part in path {
            sid = self.find_child(sid, part)?;
        }
        Some(sid)
    }

    /// Every stream in the file with its full path.
    pub fn streams(&self) -> Vec<(Vec<String>, usize)> {
        let mut out = Vec::new();
        if self.entries.is_empty() {
            return out;
        }
        let mut visited = FixedBitSet::with_capacity(self.entries.len());
        visited.insert(0);
        self.collect_streams(0, &mut Vec::new(), &mut visited, &mut out);
        out
    }

    fn collect_streams(
        &self,
        storage: usize,
        path: &mut Vec<String>,
        visited: &mut FixedBitSet,
        out: &mut Vec<(Vec<String>, usize)>,
    ) {
        for child in self.children(storage) {
            if visited.contains(child) {
                continue;
            }
            visited.insert(child);
            let entry = &self.entries[child];
            path.push(entry.name.clone());
            if entry.is_stream() {
                out.push((path.clone(), child));
            } else if entry.is_storage() {
                self.collect_streams(child, path, visited, out);
            }
            path.pop();
        }
    }
}

/// Format CLSID as a human-readable string
fn format_clsid(bytes: &[u8; 16]) -> String {
    if bytes.iter().all(|&b| b == 0) {
        return String::new();
    }

    let d1 = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let d2 = u16::from_le_bytes([bytes[4], bytes[5]]);
    let d3 = u16::from_le_bytes([bytes[6], bytes[7]]);
    format!(
        "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
        d1,
        d2,
        d3,
        bytes[8],
        bytes[9],
        bytes[10],
        bytes[11],
        bytes[12],
        bytes[13],
        bytes[14],
        bytes[15],
    )
}

/// FILETIME (100ns ticks since 1601-01-01) to UTC; zero means "not set".
fn filetime_to_datetime(filetime: u64) -> Option<DateTime<Utc>> {
    const EPOCH_DIFF_SECS: i64 = 11_644_473_600;
    if filetime == 0 {
        return None;
    }
    let secs = (filetime / 10_000_000) as i64 - EPOCH_DIFF_SECS;
    let nanos = ((filetime % 10_000_000) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}
