//! The record trait and payload codec.

use crate::entity::EntityId;
use crate::error::{CoreError, CoreResult};
use crate::search::IndexDocument;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A type stored as rows of one table.
///
/// The id is not part of the payload: the store keeps it as the row key
/// and hands it back through [`set_id`](Self::set_id) on load. Payloads
/// are CBOR.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize)]
/// struct Team {
///     #[serde(skip)]
///     id: Option<EntityId>,
///     name: String,
/// }
///
/// impl Record for Team {
///     const TABLE: &'static str = "teams";
///     fn id(&self) -> Option<EntityId> { self.id }
///     fn set_id(&mut self, id: EntityId) { self.id = Some(id); }
/// }
/// ```
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    /// Table name, also used as the search index name.
    const TABLE: &'static str;

    /// Returns the id, or `None` before the first insert.
    fn id(&self) -> Option<EntityId>;

    /// Assigns the id.
    fn set_id(&mut self, id: EntityId);

    /// Returns the indexable fields of this row.
    ///
    /// `None` means the row carries no search capability and the index
    /// synchronizer skips it.
    fn index_document(&self) -> Option<IndexDocument> {
        None
    }
}

/// Encodes a record payload as CBOR.
pub fn encode_record<T: Serialize>(record: &T) -> CoreResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(record, &mut buf).map_err(|e| CoreError::codec(e.to_string()))?;
    Ok(buf)
}

/// Decodes a record payload and assigns its id.
pub fn decode_record<T: Record>(id: EntityId, bytes: &[u8]) -> CoreResult<T> {
    let mut record: T = ciborium::from_reader(bytes).map_err(|e| {
        CoreError::codec(format!("{} row {id}: {e}", T::TABLE))
    })?;
    record.set_id(id);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        #[serde(skip)]
        id: Option<EntityId>,
        body: String,
        pinned: bool,
    }

    impl Record for Note {
        const TABLE: &'static str = "notes";

        fn id(&self) -> Option<EntityId> {
            self.id
        }

        fn set_id(&mut self, id: EntityId) {
            self.id = Some(id);
        }
    }

    #[test]
    fn decode_assigns_row_key() {
        let note = Note {
            id: None,
            body: "remember the milk".into(),
            pinned: true,
        };
        let bytes = encode_record(&note).unwrap();
        let decoded: Note = decode_record(EntityId::new(4), &bytes).unwrap();

        assert_eq!(decoded.id, Some(EntityId::new(4)));
        assert_eq!(decoded.body, "remember the milk");
        assert!(decoded.pinned);
    }

    #[test]
    fn id_is_not_encoded() {
        let with_id = Note {
            id: Some(EntityId::new(99)),
            body: "x".into(),
            pinned: false,
        };
        let without_id = Note { id: None, ..with_id.clone() };
        assert_eq!(
            encode_record(&with_id).unwrap(),
            encode_record(&without_id).unwrap()
        );
    }

    #[test]
    fn garbage_payload_is_codec_error() {
        let result: CoreResult<Note> = decode_record(EntityId::new(1), &[0xff, 0x00]);
        assert!(matches!(result, Err(CoreError::Codec { .. })));
    }

    #[test]
    fn records_default_to_unsearchable() {
        let note = Note {
            id: Some(EntityId::new(1)),
            body: "b".into(),
            pinned: false,
        };
        assert!(note.index_document().is_none());
    }
}
