//! Restore orchestration: secondary-index scan → batched remote writes.
//!
//! The orchestrator walks `OpenStore → ResolveCollections →
//! PerCollectionRestore → Closed`. Collection selection is gated by the
//! snapshot metadata: a store without valid metadata is an incomplete backup
//! and is rejected unless an explicit collection list is given. Restore only
//! touches ids present in the snapshot; it never deletes remote documents
//! absent from it.

use crate::backup::DEFAULT_BATCH_SIZE;
use crate::errors::{DocvaultError, DocvaultResult, ErrorKind};
use crate::remote::RemoteSink;
use crate::store::DocumentStore;
use std::sync::Arc;
use std::time::Instant;

/// Collection selection and batching parameters for a restore run.
#[derive(Clone)]
pub struct RestoreOptions {
    /// Explicit collections to restore; when `None`, the snapshot metadata's
    /// collection list is used.
    pub collection_names: Option<Vec<String>>,
    /// Collections dropped after resolution.
    pub collection_names_exclude: Vec<String>,
    /// Maximum documents per index page and per remote batch write.
    pub batch_size: usize,
}

impl RestoreOptions {
    pub fn new() -> RestoreOptions {
        RestoreOptions {
            collection_names: None,
            collection_names_exclude: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_collections(mut self, names: Vec<String>) -> Self {
        self.collection_names = Some(names);
        self
    }

    pub fn with_excluded(mut self, names: Vec<String>) -> Self {
        self.collection_names_exclude = names;
        self
    }

    /// Sets the batch size; zero falls back to [`DEFAULT_BATCH_SIZE`].
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = if batch_size == 0 {
            DEFAULT_BATCH_SIZE
        } else {
            batch_size
        };
        self
    }
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a completed restore.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreSummary {
    /// Collections restored, post include/exclude filtering, in processing
    /// order.
    pub collection_names: Vec<String>,
    /// Total documents written to the remote target.
    pub document_count: u64,
    pub elapsed_ms: i64,
}

/// Drives one full restore: the local secondary index streams each selected
/// collection page by page, and every page becomes one atomic remote batch
/// write.
pub struct RestoreOrchestrator {
    sink: Arc<dyn RemoteSink>,
    store: DocumentStore,
    options: RestoreOptions,
}

impl RestoreOrchestrator {
    pub fn new(
        sink: Arc<dyn RemoteSink>,
        store: DocumentStore,
        options: RestoreOptions,
    ) -> RestoreOrchestrator {
        RestoreOrchestrator {
            sink,
            store,
            options,
        }
    }

    /// Runs the restore to completion.
    ///
    /// A batch failure aborts the whole restore; there is no partial retry of
    /// a page. The store is closed before returning on success.
    pub fn run(&self) -> DocvaultResult<RestoreSummary> {
        let started = Instant::now();

        let collection_names = self.resolve_collections()?;
        log::info!(
            "restore({}): collections in snapshot {:?}",
            self.store.location().display(),
            collection_names
        );

        let mut document_count: u64 = 0;
        for name in &collection_names {
            document_count += self.restore_collection(name)?;
        }

        self.store.close()?;

        let elapsed_ms = started.elapsed().as_millis() as i64;
        log::info!(
            "restore({}): finished {} documents in {} ms",
            self.store.location().display(),
            document_count,
            elapsed_ms
        );

        Ok(RestoreSummary {
            collection_names,
            document_count,
            elapsed_ms,
        })
    }

    /// Explicit include list when given; otherwise the metadata's collection
    /// list. Absent metadata with no explicit list is fatal: the snapshot is
    /// incomplete. Excludes apply after resolution.
    fn resolve_collections(&self) -> DocvaultResult<Vec<String>> {
        let mut names = match &self.options.collection_names {
            Some(explicit) => explicit.clone(),
            None => match self.store.metadata()? {
                Some(meta) => meta.collection_names,
                None => {
                    return Err(DocvaultError::new(
                        "cannot restore because the store has no snapshot metadata",
                        ErrorKind::NotFound,
                    ));
                }
            },
        };
        names.retain(|name| !self.options.collection_names_exclude.contains(name));
        Ok(names)
    }

    /// Streams one collection out of the secondary index; each bounded page
    /// becomes a single atomic batch write against the remote target.
    fn restore_collection(&self, collection_name: &str) -> DocvaultResult<u64> {
        log::info!("{} restore starting...", collection_name);
        let started = Instant::now();

        let result = self.store.for_each_collection_page(
            collection_name,
            self.options.batch_size,
            |documents| self.sink.write_batch(collection_name, documents),
        );

        let elapsed_ms = started.elapsed().as_millis();
        match result {
            Ok(count) => {
                log::info!(
                    "{} restored {} documents in {} ms",
                    collection_name,
                    count,
                    elapsed_ms
                );
                Ok(count)
            }
            Err(err) => {
                log::error!(
                    "{} restore failed after {} ms: {}",
                    collection_name,
                    elapsed_ms,
                    err
                );
                Err(DocvaultError::new_with_cause(
                    &format!(
                        "restore of collection '{}' failed after {} ms",
                        collection_name, elapsed_ms
                    ),
                    err.kind().clone(),
                    err,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::{BackupOptions, BackupOrchestrator};
    use crate::document::{Document, Payload};
    use crate::remote::InMemoryRemote;
    use crate::store::{InMemoryStoreOpener, StoreOpener};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::path::Path;

    fn payload(n: i64) -> Payload {
        let mut map = Payload::new();
        map.insert("n".to_string(), json!(n));
        map
    }

    /// Sink that counts every write without storing anything.
    #[derive(Default)]
    struct CountingSink {
        batches: Mutex<Vec<(String, usize)>>,
    }

    impl RemoteSink for CountingSink {
        fn write_batch(
            &self,
            collection_name: &str,
            documents: &[Document],
        ) -> DocvaultResult<()> {
            self.batches
                .lock()
                .push((collection_name.to_string(), documents.len()));
            Ok(())
        }
    }

    /// Sink that fails on the nth batch.
    struct FailingSink {
        fail_at: usize,
        seen: Mutex<usize>,
    }

    impl RemoteSink for FailingSink {
        fn write_batch(&self, _collection_name: &str, _documents: &[Document]) -> DocvaultResult<()> {
            let mut seen = self.seen.lock();
            *seen += 1;
            if *seen >= self.fail_at {
                return Err(DocvaultError::new(
                    "batch commit rejected",
                    ErrorKind::RemoteError,
                ));
            }
            Ok(())
        }
    }

    fn backed_up_store(opener: &InMemoryStoreOpener, location: &str) -> DocumentStore {
        let remote = InMemoryRemote::new();
        remote.insert("users", "u1", payload(1));
        remote.insert("users", "u2", payload(2));
        remote.insert("users", "u3", payload(3));
        remote.insert("orders", "o1", payload(10));

        let store = opener.open(Path::new(location)).unwrap();
        BackupOrchestrator::new(Arc::new(remote), store, BackupOptions::new())
            .run()
            .unwrap();
        opener.open(Path::new(location)).unwrap()
    }

    #[test]
    fn restore_without_metadata_or_explicit_list_fails_with_not_found() {
        let store = DocumentStore::new(crate::store::InMemoryStore::new("empty"));
        let sink = Arc::new(CountingSink::default());

        let result =
            RestoreOrchestrator::new(sink.clone(), store, RestoreOptions::new()).run();
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::NotFound);
        // zero remote writes performed
        assert!(sink.batches.lock().is_empty());
    }

    #[test]
    fn restore_round_trip_reproduces_document_set() {
        let opener = InMemoryStoreOpener::new();
        let store = backed_up_store(&opener, "roundtrip");

        let target = Arc::new(InMemoryRemote::new());
        let summary = RestoreOrchestrator::new(target.clone(), store, RestoreOptions::new())
            .run()
            .unwrap();

        assert_eq!(summary.document_count, 4);
        assert_eq!(target.documents_in("users").len(), 3);
        assert_eq!(target.documents_in("orders").len(), 1);

        // payloads carry no marker field and match the source exactly
        let (id, restored) = &target.documents_in("users")[0];
        assert_eq!(id, "u1");
        assert_eq!(restored, &payload(1));
    }

    #[test]
    fn zero_batch_size_falls_back_to_default() {
        let options = RestoreOptions::new().with_batch_size(0);
        assert_eq!(options.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn restore_uses_bounded_batches() {
        let opener = InMemoryStoreOpener::new();
        let store = backed_up_store(&opener, "batched");
        let sink = Arc::new(CountingSink::default());

        RestoreOrchestrator::new(
            sink.clone(),
            store,
            RestoreOptions::new().with_batch_size(2),
        )
        .run()
        .unwrap();

        let batches = sink.batches.lock().clone();
        assert_eq!(
            batches,
            vec![
                ("orders".to_string(), 1),
                ("users".to_string(), 2),
                ("users".to_string(), 1),
            ]
        );
    }

    #[test]
    fn restore_applies_exclude_after_metadata_resolution() {
        let opener = InMemoryStoreOpener::new();
        let store = backed_up_store(&opener, "excluded");
        let target = Arc::new(InMemoryRemote::new());

        let summary = RestoreOrchestrator::new(
            target.clone(),
            store,
            RestoreOptions::new().with_excluded(vec!["users".to_string()]),
        )
        .run()
        .unwrap();

        assert_eq!(summary.collection_names, vec!["orders"]);
        assert!(target.documents_in("users").is_empty());
    }

    #[test]
    fn restore_never_deletes_unrelated_remote_documents() {
        let opener = InMemoryStoreOpener::new();
        let store = backed_up_store(&opener, "preserve");

        let target = Arc::new(InMemoryRemote::new());
        target.insert("users", "zz-preexisting", payload(99));
        target.insert("audit", "a1", payload(7));

        RestoreOrchestrator::new(target.clone(), store, RestoreOptions::new())
            .run()
            .unwrap();

        assert_eq!(target.documents_in("users").len(), 4);
        assert_eq!(target.documents_in("audit").len(), 1);
    }

    #[test]
    fn restore_batch_failure_aborts_whole_restore() {
        let opener = InMemoryStoreOpener::new();
        let store = backed_up_store(&opener, "abort");
        let sink = Arc::new(FailingSink {
            fail_at: 2,
            seen: Mutex::new(0),
        });

        let result = RestoreOrchestrator::new(
            sink,
            store,
            RestoreOptions::new().with_batch_size(2),
        )
        .run();

        let err = result.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::RemoteError);
        assert!(err.cause().is_some());
    }

    #[test]
    fn restore_with_explicit_list_skips_metadata_gate() {
        let store = DocumentStore::new(crate::store::InMemoryStore::new("explicit"));
        store
            .put(
                "u1",
                crate::document::StoreValue::Document(Document::new("u1", "users", payload(1))),
            )
            .unwrap();

        let target = Arc::new(InMemoryRemote::new());
        let summary = RestoreOrchestrator::new(
            target.clone(),
            store,
            RestoreOptions::new().with_collections(vec!["users".to_string()]),
        )
        .run()
        .unwrap();

        assert_eq!(summary.document_count, 1);
        assert_eq!(target.documents_in("users").len(), 1);
    }
}
