//! BOF (beginning of file) record.

use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::record::{self, BiffRecord, BiffVersion, ids};

/// Substream kind announced by a BOF record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BofType {
    WorkbookGlobals,
    VbModule,
    Worksheet,
    Chart,
    MacroSheet,
    Workspace,
    Unknown(u16),
}

impl From<u16> for BofType {
    fn from(value: u16) -> Self {
        match value {
            0x0005 => BofType::WorkbookGlobals,
            0x0006 => BofType::VbModule,
            0x0010 => BofType::Worksheet,
            0x0020 => BofType::Chart,
            0x0040 => BofType::MacroSheet,
            0x0100 => BofType::Workspace,
            other => BofType::Unknown(other),
        }
    }
}

/// BOF record view.
///
/// Only the version and substream type are mandatory. BIFF2-BIFF4 BOFs stop
/// after them, BIFF5 adds the build id and year, BIFF8 the history flags and
/// lowest version able to open the file. Absent fields read as 0.
#[derive(Debug, Clone, Copy)]
pub struct Bof<'a>(BiffRecord<'a>);

impl<'a> Bof<'a> {
    pub fn new(record: BiffRecord<'a>) -> XlsResult<Self> {
        if !record::is_bof(record.id()) {
            return Err(XlsError::UnexpectedRecordType {
                expected: ids::BOF,
                found: record.id(),
            });
        }
        record.require(4)?;
        Ok(Bof(record))
    }

    /// Raw version field (0x0600 for BIFF8).
    #[inline]
    pub fn version(&self) -> u16 {
        self.0.read_u16(0)
    }

    #[inline]
    pub fn kind_raw(&self) -> u16 {
        self.0.read_u16(2)
    }

    #[inline]
    pub fn kind(&self) -> BofType {
        BofType::from(self.kind_raw())
    }

    /// Build identifier of the writing application.
    #[inline]
    pub fn creation_id(&self) -> u16 {
        self.0.read_u16(4)
    }

    #[inline]
    pub fn creation_year(&self) -> u16 {
        self.0.read_u16(6)
    }

    #[inline]
    pub fn history_flag(&self) -> u32 {
        self.0.read_u32(8)
    }

    #[inline]
    pub fn min_version_to_open(&self) -> u32 {
        self.0.read_u32(12)
    }

    /// BIFF version implied by the record id and version field.
    pub fn biff_version(&self) -> XlsResult<BiffVersion> {
        BiffVersion::from_bof(self.0.id(), self.version())
            .ok_or(XlsError::UnsupportedBiffVersion(self.version()))
    }

    #[inline]
    pub fn record(&self) -> &BiffRecord<'a> {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::xls::record::tests::record_bytes;

    #[test]
    fn test_four_byte_bof_reads_only_mandatory_fields() {
        let bytes = record_bytes(ids::BOF, &[0x00, 0x06, 0x10, 0x00]);
        let bof = Bof::new(BiffRecord::at(&bytes, 0).unwrap()).unwrap();
        assert_eq!(bof.version(), 0x0600);
        assert_eq!(bof.kind(), BofType::Worksheet);
        assert_eq!(bof.creation_id(), 0);
        assert_eq!(bof.creation_year(), 0);
        assert_eq!(bof.history_flag(), 0);
        assert_eq!(bof.min_version_to_open(), 0);
        assert_eq!(bof.biff_version().unwrap(), BiffVersion::Biff8);
    }

    #[test]
    fn test_full_biff8_bof() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&0x0600u16.to_le_bytes());
        payload.extend_from_slice(&0x0005u16.to_le_bytes());
        payload.extend_from_slice(&0x2775u16.to_le_bytes());
        payload.extend_from_slice(&1997u16.to_le_bytes());
        payload.extend_from_slice(&0x0000_40C1u32.to_le_bytes());
        payload.extend_from_slice(&0x0000_0106u32.to_le_bytes());
        let bytes = record_bytes(ids::BOF, &payload);
        let bof = Bof::new(BiffRecord::at(&bytes, 0).unwrap()).unwrap();
        assert_eq!(bof.kind(), BofType::WorkbookGlobals);
        assert_eq!(bof.creation_id(), 0x2775);
        assert_eq!(bof.creation_year(), 1997);
        assert_eq!(bof.history_flag(), 0x40C1);
        assert_eq!(bof.min_version_to_open(), 0x0106);
    }

    #[test]
    fn test_rejects_non_bof_and_short_bof() {
        let bytes = record_bytes(ids::EOF, &[]);
        assert!(matches!(
            Bof::new(BiffRecord::at(&bytes, 0).unwrap()),
            Err(XlsError::UnexpectedRecordType { found: ids::EOF, .. })
        ));
        let bytes = record_bytes(ids::BOF, &[0x00, 0x06]);
        assert!(matches!(
            Bof::new(BiffRecord::at(&bytes, 0).unwrap()),
            Err(XlsError::RecordTooShort { .. })
        ));
    }

    #[test]
    fn test_unknown_version() {
        let bytes = record_bytes(ids::BOF, &[0x34, 0x12, 0x10, 0x00]);
        let bof = Bof::new(BiffRecord::at(&bytes, 0).unwrap()).unwrap();
        assert!(matches!(
            bof.biff_version(),
            Err(XlsError::UnsupportedBiffVersion(0x1234))
        ));
    }
}
