use crate::codec::{decode_key, decode_record, encode_record, to_docvault_error};
use crate::config::FjallStoreConfig;
use docvault::document::{Document, Revision, StoreRecord, StoreValue};
use docvault::errors::{DocvaultError, DocvaultResult, ErrorKind};
use docvault::store::{
    DocumentStore, DocumentStoreProvider, StoreOpener, TEARDOWN_YIELD,
};
use fjall::{Keyspace, PartitionHandle, PersistMode};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

/// Partition holding one record per id.
const RECORDS_PARTITION: &str = "records";
/// Partition holding the secondary index over the origin collection name.
const INDEX_PARTITION: &str = "collection_index";

/// Separator between collection name and id in index keys. Ids and collection
/// names are UTF-8 and never contain NUL, so the prefix scan for one
/// collection can never bleed into another.
const INDEX_SEPARATOR: u8 = 0;

#[derive(Clone)]
/// Fjall-based document store implementation.
///
/// A persistent, thread-safe store backend using the Fjall LSM engine. Uses
/// PIMPL pattern with `Arc<FjallStoreInner>` for efficient cloning and shared
/// ownership, and implements `DocumentStoreProvider` for integration with the
/// backup and restore orchestrators.
///
/// Purpose: Provides a durable snapshot store with two isolated partitions in
/// a single Keyspace: one keyed by record id, one acting as the secondary
/// index over the origin collection name.
///
/// Characteristics:
/// - Thread-safe (Arc-based, cloneable across threads)
/// - Persistent (backed by Fjall LSM engine on disk)
/// - Revisioned (optimistic per-id revisions stored with each record)
/// - Indexed (bounded collection pages without full scans)
pub struct FjallDocumentStore {
    inner: Arc<FjallStoreInner>,
}

impl FjallDocumentStore {
    /// Opens (or creates) the store at `location`.
    pub fn open(location: &Path, config: FjallStoreConfig) -> DocvaultResult<FjallDocumentStore> {
        let state = FjallState::open(location, &config)?;
        Ok(FjallDocumentStore {
            inner: Arc::new(FjallStoreInner {
                location: location.to_path_buf(),
                config,
                state: RwLock::new(Some(state)),
            }),
        })
    }

    fn index_key(collection_name: &str, id: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(collection_name.len() + 1 + id.len());
        key.extend_from_slice(collection_name.as_bytes());
        key.push(INDEX_SEPARATOR);
        key.extend_from_slice(id.as_bytes());
        key
    }

    fn index_prefix(collection_name: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(collection_name.len() + 1);
        prefix.extend_from_slice(collection_name.as_bytes());
        prefix.push(INDEX_SEPARATOR);
        prefix
    }
}

struct FjallStoreInner {
    location: PathBuf,
    config: FjallStoreConfig,
    // None once the store is closed or destroyed
    state: RwLock<Option<FjallState>>,
}

struct FjallState {
    keyspace: Keyspace,
    records: PartitionHandle,
    index: PartitionHandle,
}

impl FjallState {
    fn open(location: &Path, config: &FjallStoreConfig) -> DocvaultResult<FjallState> {
        let keyspace =
            Keyspace::open(config.keyspace_config(location)).map_err(to_docvault_error)?;
        let records = keyspace
            .open_partition(RECORDS_PARTITION, config.partition_config())
            .map_err(to_docvault_error)?;
        let index = keyspace
            .open_partition(INDEX_PARTITION, config.partition_config())
            .map_err(to_docvault_error)?;
        Ok(FjallState {
            keyspace,
            records,
            index,
        })
    }

    fn get_record(&self, id: &str) -> DocvaultResult<Option<StoreRecord>> {
        let bytes = self.records.get(id).map_err(to_docvault_error)?;
        match bytes {
            Some(bytes) => Ok(Some(decode_record(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Writes one record, bumping past `existing` when given, and keeps the
    /// collection index consistent with the stored value.
    fn write_record(
        &self,
        id: &str,
        value: StoreValue,
        existing: Option<&StoreRecord>,
    ) -> DocvaultResult<Revision> {
        let revision = match existing {
            Some(record) => record.revision.next(),
            None => Revision::initial(),
        };

        // drop the stale index entry when the record leaves its collection
        if let Some(old_doc) = existing.and_then(|r| r.value.as_document()) {
            let keep = value
                .as_document()
                .is_some_and(|new_doc| new_doc.collection_name == old_doc.collection_name);
            if !keep {
                self.index
                    .remove(FjallDocumentStore::index_key(
                        &old_doc.collection_name,
                        id,
                    ))
                    .map_err(to_docvault_error)?;
            }
        }

        if let Some(doc) = value.as_document() {
            self.index
                .insert(
                    FjallDocumentStore::index_key(&doc.collection_name, id),
                    b"",
                )
                .map_err(to_docvault_error)?;
        }

        let record = StoreRecord::new(id, revision, value);
        let bytes = encode_record(&record)?;
        self.records.insert(id, bytes).map_err(to_docvault_error)?;
        Ok(revision)
    }
}

impl FjallStoreInner {
    fn with_state<R>(&self, f: impl FnOnce(&FjallState) -> DocvaultResult<R>) -> DocvaultResult<R> {
        let state = self.state.read();
        match state.as_ref() {
            Some(state) => f(state),
            None => Err(DocvaultError::new(
                &format!("store at {} is closed", self.location.display()),
                ErrorKind::StoreAlreadyClosed,
            )),
        }
    }
}

impl DocumentStoreProvider for FjallDocumentStore {
    fn location(&self) -> &Path {
        &self.inner.location
    }

    fn get(&self, id: &str) -> DocvaultResult<Option<StoreValue>> {
        Ok(self.get_record(id)?.map(|record| record.value))
    }

    fn get_record(&self, id: &str) -> DocvaultResult<Option<StoreRecord>> {
        self.inner.with_state(|state| state.get_record(id))
    }

    fn put(&self, id: &str, value: StoreValue) -> DocvaultResult<Revision> {
        self.inner.with_state(|state| {
            let existing = state.get_record(id)?;
            state.write_record(id, value, existing.as_ref())
        })
    }

    fn bulk_put(&self, ids: &[String], values: Vec<StoreValue>) -> DocvaultResult<()> {
        if ids.len() != values.len() {
            return Err(DocvaultError::new(
                &format!(
                    "bulk write got {} ids but {} values",
                    ids.len(),
                    values.len()
                ),
                ErrorKind::ArgumentError,
            ));
        }
        if ids.is_empty() {
            return Ok(());
        }

        self.inner.with_state(|state| {
            // one pass over the partition resolves every requested revision
            let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
            let mut existing: HashMap<String, StoreRecord> = HashMap::new();
            for item in state.records.iter() {
                let (key, value) = item.map_err(to_docvault_error)?;
                let id = decode_key(&key)?;
                if wanted.contains(id.as_str()) {
                    existing.insert(id, decode_record(&value)?);
                }
            }

            for (id, value) in ids.iter().zip(values) {
                state.write_record(id, value, existing.get(id))?;
            }
            Ok(())
        })
    }

    fn all(&self) -> DocvaultResult<Vec<StoreValue>> {
        Ok(self.all_with_ids()?.1)
    }

    fn all_with_ids(&self) -> DocvaultResult<(Vec<String>, Vec<StoreValue>)> {
        self.inner.with_state(|state| {
            let mut ids = Vec::new();
            let mut values = Vec::new();
            for item in state.records.iter() {
                let (key, value) = item.map_err(to_docvault_error)?;
                ids.push(decode_key(&key)?);
                values.push(decode_record(&value)?.value);
            }
            Ok((ids, values))
        })
    }

    fn collection_page(
        &self,
        collection_name: &str,
        limit: usize,
        offset: usize,
    ) -> DocvaultResult<Vec<Document>> {
        self.inner.with_state(|state| {
            let prefix = FjallDocumentStore::index_prefix(collection_name);
            let mut documents = Vec::new();

            for item in state.index.prefix(&prefix).skip(offset).take(limit) {
                let (key, _) = item.map_err(to_docvault_error)?;
                let id = decode_key(&key[prefix.len()..])?;
                match state.get_record(&id)? {
                    Some(record) => {
                        if let Some(doc) = record.value.as_document() {
                            documents.push(doc.clone());
                        }
                    }
                    None => {
                        log::warn!(
                            "index entry for '{}' in collection '{}' has no record",
                            id,
                            collection_name
                        );
                    }
                }
            }
            Ok(documents)
        })
    }

    fn destroy(&self) -> DocvaultResult<()> {
        let mut guard = self.inner.state.write();
        if let Some(state) = guard.take() {
            // the engine defers partition deletion, so a partition reopened
            // under the same name could still surface the old records;
            // clearing key by key leaves nothing to resurface
            for partition in [&state.records, &state.index] {
                let mut keys = Vec::new();
                for item in partition.iter() {
                    let (key, _) = item.map_err(to_docvault_error)?;
                    keys.push(key);
                }
                for key in keys {
                    partition.remove(key).map_err(to_docvault_error)?;
                }
            }
            state
                .keyspace
                .persist(PersistMode::SyncAll)
                .map_err(to_docvault_error)?;
        }
        Ok(())
    }

    fn recreate(&self) -> DocvaultResult<()> {
        self.destroy()?;
        // the engine may still be tearing partitions down
        thread::sleep(TEARDOWN_YIELD);
        let state = FjallState::open(&self.inner.location, &self.inner.config)?;
        *self.inner.state.write() = Some(state);
        Ok(())
    }

    fn close(&self) -> DocvaultResult<()> {
        let mut guard = self.inner.state.write();
        if let Some(state) = guard.take() {
            state
                .keyspace
                .persist(PersistMode::SyncAll)
                .map_err(to_docvault_error)?;
        }
        Ok(())
    }

    fn is_closed(&self) -> DocvaultResult<bool> {
        Ok(self.inner.state.read().is_none())
    }
}

/// Opens persistent Fjall-backed stores.
///
/// All stores opened through one opener share the same tuning configuration;
/// each location gets its own keyspace.
#[derive(Clone, Default)]
pub struct FjallStoreOpener {
    config: FjallStoreConfig,
}

impl FjallStoreOpener {
    pub fn new() -> FjallStoreOpener {
        FjallStoreOpener {
            config: FjallStoreConfig::new(),
        }
    }

    pub fn with_config(config: FjallStoreConfig) -> FjallStoreOpener {
        FjallStoreOpener { config }
    }
}

impl StoreOpener for FjallStoreOpener {
    fn open(&self, location: &Path) -> DocvaultResult<DocumentStore> {
        let store = FjallDocumentStore::open(location, self.config.clone())?;
        Ok(DocumentStore::new(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docvault::document::{Payload, SnapshotMetadata};
    use tempfile::TempDir;

    fn create_store(dir: &TempDir) -> FjallDocumentStore {
        FjallDocumentStore::open(dir.path(), FjallStoreConfig::new()).unwrap()
    }

    fn doc(id: &str, collection: &str, n: i64) -> StoreValue {
        let mut payload = Payload::new();
        payload.insert("n".to_string(), serde_json::json!(n));
        StoreValue::Document(Document::new(id, collection, payload))
    }

    #[test]
    fn put_assigns_initial_then_incremented_revisions() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);

        let first = store.put("d1", doc("d1", "users", 1)).unwrap();
        assert_eq!(first, Revision::initial());

        let second = store.put("d1", doc("d1", "users", 2)).unwrap();
        assert_eq!(second, first.next());

        let record = store.get_record("d1").unwrap().unwrap();
        assert_eq!(record.revision, second);
    }

    #[test]
    fn get_missing_id_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);
        assert!(store.get("ghost").unwrap().is_none());
    }

    #[test]
    fn bulk_put_rejects_length_mismatch() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);

        let err = store
            .bulk_put(&["a".to_string()], vec![])
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ArgumentError);
    }

    #[test]
    fn bulk_put_empty_input_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);
        store.bulk_put(&[], vec![]).unwrap();
        assert!(store.all().unwrap().is_empty());
    }

    #[test]
    fn bulk_put_resolves_revisions_for_existing_records() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);
        store.put("a", doc("a", "users", 1)).unwrap();

        let ids = vec!["a".to_string(), "b".to_string()];
        store
            .bulk_put(&ids, vec![doc("a", "users", 2), doc("b", "users", 1)])
            .unwrap();

        assert_eq!(
            store.get_record("a").unwrap().unwrap().revision,
            Revision::initial().next()
        );
        assert_eq!(
            store.get_record("b").unwrap().unwrap().revision,
            Revision::initial()
        );
    }

    #[test]
    fn collection_page_scans_only_requested_collection() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);
        store.put("u1", doc("u1", "users", 1)).unwrap();
        store.put("u2", doc("u2", "users", 2)).unwrap();
        store.put("o1", doc("o1", "orders", 3)).unwrap();

        let page = store.collection_page("users", 10, 0).unwrap();
        let ids: Vec<&str> = page.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2"]);

        let page = store.collection_page("users", 1, 1).unwrap();
        assert_eq!(page[0].id, "u2");
    }

    #[test]
    fn collection_index_follows_record_between_collections() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);
        store.put("d1", doc("d1", "users", 1)).unwrap();
        store.put("d1", doc("d1", "orders", 1)).unwrap();

        assert!(store.collection_page("users", 10, 0).unwrap().is_empty());
        assert_eq!(store.collection_page("orders", 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn metadata_record_never_appears_in_collection_pages() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);
        store.put("u1", doc("u1", "users", 1)).unwrap();
        store
            .put(
                "meta",
                StoreValue::Metadata(SnapshotMetadata::new(vec!["users".to_string()], 1)),
            )
            .unwrap();

        assert_eq!(store.collection_page("users", 10, 0).unwrap().len(), 1);
        assert_eq!(store.all().unwrap().len(), 2);
    }

    #[test]
    fn closed_store_rejects_reads_and_writes() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);
        store.close().unwrap();

        assert!(store.is_closed().unwrap());
        let err = store.put("d1", doc("d1", "users", 1)).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::StoreAlreadyClosed);
        let err = store.get("d1").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::StoreAlreadyClosed);
    }

    #[test]
    fn close_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);
        store.close().unwrap();
        store.close().unwrap();
        assert!(store.is_closed().unwrap());
    }

    #[test]
    fn data_survives_close_and_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = create_store(&dir);
            store.put("u1", doc("u1", "users", 7)).unwrap();
            store.close().unwrap();
        }

        let store = create_store(&dir);
        let value = store.get("u1").unwrap().unwrap();
        let document = value.as_document().unwrap();
        assert_eq!(document.payload.get("n"), Some(&serde_json::json!(7)));
        assert_eq!(store.collection_page("users", 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn recreate_wipes_all_records() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);
        store.put("u1", doc("u1", "users", 1)).unwrap();
        store.put("u2", doc("u2", "users", 2)).unwrap();

        store.recreate().unwrap();

        assert!(!store.is_closed().unwrap());
        assert!(store.all().unwrap().is_empty());
        assert!(store.collection_page("users", 10, 0).unwrap().is_empty());
    }

    #[test]
    fn recreated_store_starts_empty_after_close_and_reopen() {
        // re-using a location must never surface records from the snapshot
        // that lived there before
        let dir = TempDir::new().unwrap();
        {
            let store = create_store(&dir);
            store.put("u1", doc("u1", "users", 1)).unwrap();
            store.put("u2", doc("u2", "users", 2)).unwrap();
            store.put("u3", doc("u3", "users", 3)).unwrap();
            store.recreate().unwrap();
            store.put("u9", doc("u9", "users", 9)).unwrap();
            store.close().unwrap();
        }

        let store = create_store(&dir);
        assert_eq!(store.all().unwrap().len(), 1);
        let page = store.collection_page("users", 10, 0).unwrap();
        let ids: Vec<&str> = page.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["u9"]);
    }

    #[test]
    fn destroy_clears_and_closes() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);
        store.put("u1", doc("u1", "users", 1)).unwrap();

        store.destroy().unwrap();
        assert!(store.is_closed().unwrap());
    }

    #[test]
    fn all_with_ids_pairs_in_stable_id_order() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);
        store.put("b", doc("b", "users", 2)).unwrap();
        store.put("a", doc("a", "users", 1)).unwrap();

        let (ids, values) = store.all_with_ids().unwrap();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn opener_opens_store_at_location() {
        let dir = TempDir::new().unwrap();
        let opener = FjallStoreOpener::new();
        let store = opener.open(dir.path()).unwrap();
        store.put("d1", doc("d1", "users", 1)).unwrap();
        store.close().unwrap();

        let reopened = opener.open(dir.path()).unwrap();
        assert!(reopened.get("d1").unwrap().is_some());
    }
}
