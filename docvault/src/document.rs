use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// Fixed record id under which the snapshot metadata singleton is stored.
///
/// Exactly one metadata record exists per store instance.
pub const META_RECORD_ID: &str = "docvault-meta";

/// Opaque key/value payload of a remote document.
///
/// Remote collections share no fixed schema, so payloads are kept as raw JSON
/// maps and never interpreted by the replication engine.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// A single document copied from (or restored to) a remote collection.
///
/// The `id` is unique within `collection_name` inside one store instance. The
/// payload is carried verbatim; backup and restore never add or strip fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub collection_name: String,
    pub payload: Payload,
}

impl Document {
    /// Creates a document tagging a remote payload with its origin collection.
    pub fn new(id: impl Into<String>, collection_name: impl Into<String>, payload: Payload) -> Self {
        Document {
            id: id.into(),
            collection_name: collection_name.into(),
            payload,
        }
    }
}

/// Snapshot metadata describing a completed backup.
///
/// Written exactly once, after every selected collection has been copied.
/// `collection_names` equals the collections actually written, in the order
/// they were processed. A store without valid metadata is an incomplete
/// backup and is rejected by restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub collection_names: Vec<String>,
    pub created_at_epoch_ms: i64,
}

impl SnapshotMetadata {
    pub fn new(collection_names: Vec<String>, created_at_epoch_ms: i64) -> Self {
        SnapshotMetadata {
            collection_names,
            created_at_epoch_ms,
        }
    }

    /// Extracts metadata from a raw JSON value, returning `None` when the
    /// shape does not match.
    ///
    /// `collection_names` must be an array of strings and
    /// `created_at_epoch_ms` must be numeric. A malformed value reads as
    /// absent rather than as a deserialization fault, so restore fails with
    /// a clear "no metadata" condition instead.
    pub fn from_json(value: &serde_json::Value) -> Option<SnapshotMetadata> {
        let names = value.get("collection_names")?.as_array()?;
        if !names.iter().all(|n| n.is_string()) {
            return None;
        }
        let created_at = value.get("created_at_epoch_ms")?.as_i64()?;

        let collection_names = names
            .iter()
            .filter_map(|n| n.as_str())
            .map(str::to_string)
            .collect();
        Some(SnapshotMetadata::new(collection_names, created_at))
    }
}

/// An opaque revision token assigned by the store on every write.
///
/// Revisions are monotonic per id and never reused. A write must supply the
/// revision it last observed for an id, or it is treated as a fresh insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision(u64);

impl Revision {
    /// Revision assigned to a freshly inserted record.
    pub fn initial() -> Revision {
        Revision(1)
    }

    /// The revision assigned to the next write of the same record.
    pub fn next(&self) -> Revision {
        Revision(self.0 + 1)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for Revision {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Value stored under a record id: either a copied document or the metadata
/// singleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreValue {
    Document(Document),
    Metadata(SnapshotMetadata),
}

impl StoreValue {
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            StoreValue::Document(doc) => Some(doc),
            StoreValue::Metadata(_) => None,
        }
    }

    pub fn as_metadata(&self) -> Option<&SnapshotMetadata> {
        match self {
            StoreValue::Metadata(meta) => Some(meta),
            StoreValue::Document(_) => None,
        }
    }
}

impl From<Document> for StoreValue {
    fn from(doc: Document) -> Self {
        StoreValue::Document(doc)
    }
}

impl From<SnapshotMetadata> for StoreValue {
    fn from(meta: SnapshotMetadata) -> Self {
        StoreValue::Metadata(meta)
    }
}

/// One persisted record: id, store-assigned revision, and the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: String,
    pub revision: Revision,
    pub value: StoreValue,
}

impl StoreRecord {
    pub fn new(id: impl Into<String>, revision: Revision, value: StoreValue) -> Self {
        StoreRecord {
            id: id.into(),
            revision,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(pairs: &[(&str, &str)]) -> Payload {
        let mut map = Payload::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), json!(v));
        }
        map
    }

    #[test]
    fn document_carries_payload_verbatim() {
        let doc = Document::new("d1", "users", payload(&[("name", "alice")]));
        assert_eq!(doc.id, "d1");
        assert_eq!(doc.collection_name, "users");
        assert_eq!(doc.payload.get("name"), Some(&json!("alice")));
    }

    #[test]
    fn document_json_round_trip() {
        let doc = Document::new("d1", "users", payload(&[("name", "alice")]));
        let encoded = serde_json::to_string(&doc).unwrap();
        let decoded: Document = serde_json::from_str(&encoded).unwrap();
        assert_eq!(doc, decoded);
    }

    #[test]
    fn revision_starts_at_one_and_increments() {
        let rev = Revision::initial();
        assert_eq!(rev.as_u64(), 1);
        assert_eq!(rev.next().as_u64(), 2);
        assert!(rev < rev.next());
    }

    #[test]
    fn metadata_from_json_accepts_valid_shape() {
        let value = json!({
            "collection_names": ["users", "orders"],
            "created_at_epoch_ms": 1735689600000i64
        });
        let meta = SnapshotMetadata::from_json(&value).unwrap();
        assert_eq!(meta.collection_names, vec!["users", "orders"]);
        assert_eq!(meta.created_at_epoch_ms, 1735689600000);
    }

    #[test]
    fn metadata_from_json_rejects_non_string_names() {
        let value = json!({
            "collection_names": ["users", 42],
            "created_at_epoch_ms": 1000
        });
        assert!(SnapshotMetadata::from_json(&value).is_none());
    }

    #[test]
    fn metadata_from_json_rejects_non_numeric_timestamp() {
        let value = json!({
            "collection_names": ["users"],
            "created_at_epoch_ms": "yesterday"
        });
        assert!(SnapshotMetadata::from_json(&value).is_none());
    }

    #[test]
    fn metadata_from_json_rejects_missing_fields() {
        assert!(SnapshotMetadata::from_json(&json!({})).is_none());
        assert!(SnapshotMetadata::from_json(&json!({"collection_names": []})).is_none());
    }

    #[test]
    fn store_value_accessors_discriminate_variants() {
        let doc_value: StoreValue = Document::new("d1", "users", Payload::new()).into();
        assert!(doc_value.as_document().is_some());
        assert!(doc_value.as_metadata().is_none());

        let meta_value: StoreValue = SnapshotMetadata::new(vec![], 0).into();
        assert!(meta_value.as_metadata().is_some());
        assert!(meta_value.as_document().is_none());
    }
}
