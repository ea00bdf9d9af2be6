//! Ergonomic construction of entries.

use std::collections::HashMap;

use crate::proto::entry::Entry;
use crate::value::Value;

/// Builder for an [`Entry`] about to be submitted.
///
/// Leaving the id at zero asks the server to allocate one. `created_at` is
/// never set here; the server stamps it at ingestion and overwrites anything
/// a client supplies.
///
/// ```
/// use registadb::EntryBuilder;
///
/// let entry = EntryBuilder::new()
///     .metadata("source", "scout-feed")
///     .data("deep-lying playmaker")
///     .build();
/// assert_eq!(entry.id, 0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct EntryBuilder {
    id: u64,
    metadata: HashMap<String, String>,
    data: Option<Value>,
}

impl EntryBuilder {
    /// Starts an empty builder with an unassigned id.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an explicit id. Zero keeps the id server-assigned.
    #[must_use]
    pub fn id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    /// Adds one metadata annotation, replacing any previous value under the
    /// same key.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _previous = self.metadata.insert(key.into(), value.into());
        self
    }

    /// Sets the payload.
    #[must_use]
    pub fn data(mut self, value: impl Into<Value>) -> Self {
        self.data = Some(value.into());
        self
    }

    /// Finishes the entry.
    #[must_use]
    pub fn build(self) -> Entry {
        Entry {
            id: self.id,
            metadata: self.metadata,
            data: self.data.map(Value::into_wire),
            created_at: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use prost::Message as _;

    #[test]
    fn defaults_leave_every_field_unset() {
        let entry = EntryBuilder::new().build();
        assert_eq!(entry.id, 0);
        assert!(entry.metadata.is_empty());
        assert!(entry.data.is_none());
        assert!(entry.created_at.is_none());
    }

    #[test]
    fn omitted_metadata_adds_nothing_to_the_wire() {
        let bare = EntryBuilder::new().id(5).data("payload").build();
        let annotated = EntryBuilder::new()
            .id(5)
            .data("payload")
            .metadata("k", "v")
            .build();
        assert!(bare.encode_to_vec().len() < annotated.encode_to_vec().len());

        // An entry with no metadata decodes back with an empty map; there is
        // no "present but empty" state on the wire.
        let decoded = Entry::decode(bare.encode_to_vec().as_slice()).expect("valid bytes");
        assert!(decoded.metadata.is_empty());
    }

    #[test]
    fn metadata_replaces_on_duplicate_key() {
        let entry = EntryBuilder::new()
            .metadata("position", "8")
            .metadata("position", "6")
            .build();
        assert_eq!(entry.metadata.get("position").map(String::as_str), Some("6"));
        assert_eq!(entry.metadata.len(), 1);
    }

    #[test]
    fn data_accepts_anything_convertible() {
        let entry = EntryBuilder::new().data(vec![1.0_f64, 2.0]).build();
        assert_eq!(
            crate::value::Value::from_wire(entry.data),
            Some(crate::value::Value::DoubleList(vec![1.0, 2.0]))
        );
    }
}
