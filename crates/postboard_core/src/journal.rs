//! Commit journal.
//!
//! Every commit is one frame on an append-only storage backend:
//!
//! ```text
//! | magic (4) | version (2) | len (4) | CBOR record (len) | checksum (4) |
//! ```
//!
//! All integers are little-endian. The checksum is the first four bytes
//! of the SHA-256 digest of everything before it in the frame.
//!
//! On open the journal is replayed. A frame cut short by a crash during
//! append is discarded and the file truncated back to the last whole
//! frame. Damage anywhere else is reported as
//! [`CoreError::JournalCorruption`].

use crate::entity::EntityId;
use crate::error::{CoreError, CoreResult};
use crate::types::{SequenceNumber, TransactionId};
use parking_lot::Mutex;
use postboard_storage::StorageBackend;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Frame magic.
pub const JOURNAL_MAGIC: [u8; 4] = *b"PBJL";
/// Current frame format version.
pub const JOURNAL_VERSION: u16 = 1;

const HEADER_SIZE: usize = 4 + 2 + 4;
const CHECKSUM_SIZE: usize = 4;

/// Operation on one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    /// Row written with this payload.
    Put(Vec<u8>),
    /// Row removed.
    Delete,
}

/// A row operation inside a commit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalOp {
    /// Table name.
    pub table: String,
    /// Row id.
    pub id: EntityId,
    /// What happened to the row.
    pub kind: OpKind,
}

/// Everything one transaction wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Committing transaction.
    pub txid: u64,
    /// Commit sequence number.
    pub sequence: u64,
    /// Row operations in write order.
    pub ops: Vec<JournalOp>,
}

impl CommitRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new(txid: TransactionId, sequence: SequenceNumber) -> Self {
        Self {
            txid: txid.as_u64(),
            sequence: sequence.as_u64(),
            ops: Vec::new(),
        }
    }
}

/// The append-only commit log.
pub struct Journal {
    backend: Mutex<Box<dyn StorageBackend>>,
    sync_on_commit: bool,
}

impl Journal {
    /// Creates a journal on a backend.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> Self {
        Self {
            backend: Mutex::new(backend),
            sync_on_commit,
        }
    }

    /// Appends one commit record. Returns the frame's offset.
    pub fn append(&self, record: &CommitRecord) -> CoreResult<u64> {
        let frame = encode_frame(record)?;
        let mut backend = self.backend.lock();
        let offset = backend.append(&frame)?;
        if self.sync_on_commit {
            backend.flush()?;
        }
        Ok(offset)
    }

    /// Reads every intact commit record, truncating a torn tail.
    pub fn recover(&self) -> CoreResult<Vec<CommitRecord>> {
        let mut backend = self.backend.lock();
        let bytes = backend.read_all()?;
        let (records, valid_len) = decode_frames(&bytes)?;

        if valid_len < bytes.len() {
            tracing::warn!(
                valid_len,
                discarded = bytes.len() - valid_len,
                "truncating torn journal tail"
            );
            backend.truncate(valid_len as u64)?;
            backend.flush()?;
        }
        Ok(records)
    }

    /// Returns the journal size in bytes.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.lock().size()?)
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("sync_on_commit", &self.sync_on_commit)
            .finish_non_exhaustive()
    }
}

fn checksum(data: &[u8]) -> [u8; CHECKSUM_SIZE] {
    let digest = Sha256::digest(data);
    [digest[0], digest[1], digest[2], digest[3]]
}

fn encode_frame(record: &CommitRecord) -> CoreResult<Vec<u8>> {
    let mut payload = Vec::new();
    ciborium::into_writer(record, &mut payload).map_err(|e| CoreError::codec(e.to_string()))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| CoreError::invalid_operation("commit record too large"))?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
    frame.extend_from_slice(&JOURNAL_MAGIC);
    frame.extend_from_slice(&JOURNAL_VERSION.to_le_bytes());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    let sum = checksum(&frame);
    frame.extend_from_slice(&sum);
    Ok(frame)
}

/// Decodes consecutive frames. Returns the records and the length of the
/// intact prefix.
fn decode_frames(bytes: &[u8]) -> CoreResult<(Vec<CommitRecord>, usize)> {
    let mut records: Vec<CommitRecord> = Vec::new();
    let mut offset = 0usize;

    while offset < bytes.len() {
        let rest = &bytes[offset..];
        if rest.len() < HEADER_SIZE {
            break;
        }
        if rest[..4] != JOURNAL_MAGIC {
            return Err(CoreError::journal_corruption(offset as u64, "bad frame magic"));
        }
        let version = u16::from_le_bytes([rest[4], rest[5]]);
        if version != JOURNAL_VERSION {
            return Err(CoreError::journal_corruption(
                offset as u64,
                format!("unsupported frame version {version}"),
            ));
        }
        let len = u32::from_le_bytes([rest[6], rest[7], rest[8], rest[9]]) as usize;
        let frame_len = HEADER_SIZE + len + CHECKSUM_SIZE;
        if rest.len() < frame_len {
            break;
        }

        let body = &rest[..HEADER_SIZE + len];
        let stored = &rest[HEADER_SIZE + len..frame_len];
        if checksum(body) != stored {
            if offset + frame_len == bytes.len() {
                // last frame, written partially
                break;
            }
            return Err(CoreError::journal_corruption(offset as u64, "checksum mismatch"));
        }

        let record: CommitRecord = ciborium::from_reader(&body[HEADER_SIZE..])
            .map_err(|e| CoreError::journal_corruption(offset as u64, e.to_string()))?;
        if let Some(prev) = records.last() {
            if record.sequence <= prev.sequence {
                return Err(CoreError::journal_corruption(
                    offset as u64,
                    format!(
                        "sequence {} does not follow {}",
                        record.sequence, prev.sequence
                    ),
                ));
            }
        }
        records.push(record);
        offset += frame_len;
    }

    Ok((records, offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use postboard_storage::InMemoryBackend;

    fn record(seq: u64) -> CommitRecord {
        let mut record = CommitRecord::new(TransactionId::new(seq), SequenceNumber::new(seq));
        record.ops.push(JournalOp {
            table: "posts".into(),
            id: EntityId::new(seq as i64),
            kind: OpKind::Put(vec![seq as u8; 8]),
        });
        record.ops.push(JournalOp {
            table: "posts".into(),
            id: EntityId::new(100),
            kind: OpKind::Delete,
        });
        record
    }

    fn journal_with(data: Vec<u8>) -> Journal {
        Journal::new(Box::new(InMemoryBackend::with_data(data)), true)
    }

    fn encoded(records: &[CommitRecord]) -> Vec<u8> {
        records
            .iter()
            .flat_map(|r| encode_frame(r).unwrap())
            .collect()
    }

    #[test]
    fn append_and_recover() {
        let journal = journal_with(Vec::new());
        journal.append(&record(1)).unwrap();
        journal.append(&record(2)).unwrap();

        let records = journal.recover().unwrap();
        assert_eq!(records, vec![record(1), record(2)]);
    }

    #[test]
    fn empty_journal_recovers_nothing() {
        assert!(journal_with(Vec::new()).recover().unwrap().is_empty());
    }

    #[test]
    fn frame_layout() {
        let frame = encode_frame(&record(1)).unwrap();
        assert_eq!(&frame[..4], b"PBJL");
        assert_eq!(u16::from_le_bytes([frame[4], frame[5]]), JOURNAL_VERSION);
        let len = u32::from_le_bytes([frame[6], frame[7], frame[8], frame[9]]) as usize;
        assert_eq!(frame.len(), HEADER_SIZE + len + CHECKSUM_SIZE);
    }

    #[test]
    fn torn_tail_is_truncated() {
        let mut data = encoded(&[record(1), record(2)]);
        let intact = data.len();
        let third = encode_frame(&record(3)).unwrap();
        data.extend_from_slice(&third[..third.len() / 2]);

        let journal = journal_with(data);
        let records = journal.recover().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(journal.size().unwrap(), intact as u64);
    }

    #[test]
    fn short_header_tail_is_truncated() {
        let mut data = encoded(&[record(1)]);
        data.extend_from_slice(b"PB");
        let journal = journal_with(data);
        assert_eq!(journal.recover().unwrap().len(), 1);
    }

    #[test]
    fn bad_checksum_on_last_frame_is_torn() {
        let mut data = encoded(&[record(1), record(2)]);
        let last = data.len() - 1;
        data[last] ^= 0xFF;

        let records = journal_with(data).recover().unwrap();
        assert_eq!(records, vec![record(1)]);
    }

    #[test]
    fn bad_checksum_mid_file_is_corruption() {
        let mut data = encoded(&[record(1), record(2)]);
        // flip a payload byte of the first frame
        data[HEADER_SIZE + 1] ^= 0xFF;

        let result = journal_with(data).recover();
        assert!(matches!(
            result,
            Err(CoreError::JournalCorruption { offset: 0, .. })
        ));
    }

    #[test]
    fn bad_magic_is_corruption() {
        let mut data = encoded(&[record(1)]);
        data[0] = b'X';
        assert!(journal_with(data).recover().is_err());
    }

    #[test]
    fn out_of_order_sequence_is_corruption() {
        let data = encoded(&[record(2), record(1)]);
        assert!(matches!(
            journal_with(data).recover(),
            Err(CoreError::JournalCorruption { .. })
        ));
    }

    proptest! {
        #[test]
        fn any_cut_recovers_a_prefix(
            count in 1u64..6,
            cut in any::<prop::sample::Index>(),
        ) {
            let records: Vec<_> = (1..=count).map(record).collect();
            let data = encoded(&records);
            let cut = cut.index(data.len() + 1);

            let recovered = journal_with(data[..cut].to_vec()).recover().unwrap();
            prop_assert!(recovered.len() <= records.len());
            prop_assert_eq!(&records[..recovered.len()], &recovered[..]);
        }
    }
}
