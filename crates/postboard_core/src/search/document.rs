//! Denormalized copy of a row's indexable fields.

use crate::entity::EntityId;

/// The text of one row as the search index sees it.
///
/// Built by [`Searchable::to_index_document`](crate::Searchable::to_index_document)
/// from the fields the record type declares indexable. Carried on each
/// pending write as the row's search capability tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDocument {
    id: EntityId,
    fields: Vec<(String, String)>,
}

impl IndexDocument {
    /// Creates a document with no fields.
    #[must_use]
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            fields: Vec::new(),
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.fields.push((name.into(), text.into()));
        self
    }

    /// Returns the row id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Returns `(field, text)` pairs in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Returns the text of one field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, text)| text.as_str())
    }
}
