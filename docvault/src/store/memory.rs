use crate::document::{Document, Revision, StoreRecord, StoreValue};
use crate::errors::{DocvaultError, DocvaultResult, ErrorKind};
use crate::store::{DocumentStore, DocumentStoreProvider, StoreOpener, TEARDOWN_YIELD};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// In-memory implementation of a document store.
///
/// # Purpose
/// `InMemoryStore` provides a complete store implementation suitable for
/// testing and temporary snapshots where persistence is not required. Records
/// live in a `BTreeMap` for stable id ordering, behind a `RwLock` for
/// thread-safe access.
///
/// # Characteristics
/// - **Thread-Safe**: fully shareable across threads
/// - **Stable Ordering**: scans and index pages are ordered by id
/// - **Revisioned**: same optimistic-concurrency contract as the persistent
///   variant
/// - **No Persistence**: all data is lost when the process exits
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<InMemoryStoreInner>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store named after `location`.
    pub fn new(location: impl Into<PathBuf>) -> InMemoryStore {
        InMemoryStore {
            inner: Arc::new(InMemoryStoreInner::new(location.into())),
        }
    }

    /// Clears the closed flag so a previously closed store can be used again.
    ///
    /// The in-memory engine has no file handles to reacquire; reopening is
    /// just lifting the write guard. Used by [`InMemoryStoreOpener`] when the
    /// same location is opened across operations.
    pub fn reopen(&self) {
        self.inner.closed.store(false, Ordering::Relaxed);
    }
}

impl DocumentStoreProvider for InMemoryStore {
    fn location(&self) -> &Path {
        &self.inner.location
    }

    fn get(&self, id: &str) -> DocvaultResult<Option<StoreValue>> {
        self.inner.ensure_open()?;
        let records = self.inner.records.read();
        Ok(records.get(id).map(|r| r.value.clone()))
    }

    fn get_record(&self, id: &str) -> DocvaultResult<Option<StoreRecord>> {
        self.inner.ensure_open()?;
        let records = self.inner.records.read();
        Ok(records.get(id).cloned())
    }

    fn put(&self, id: &str, value: StoreValue) -> DocvaultResult<Revision> {
        self.inner.ensure_open()?;
        let mut records = self.inner.records.write();
        let revision = match records.get(id) {
            Some(existing) => existing.revision.next(),
            None => Revision::initial(),
        };
        records.insert(id.to_string(), StoreRecord::new(id, revision, value));
        Ok(revision)
    }

    fn bulk_put(&self, ids: &[String], values: Vec<StoreValue>) -> DocvaultResult<()> {
        self.inner.ensure_open()?;
        if ids.len() != values.len() {
            return Err(DocvaultError::new(
                &format!(
                    "bulk_put called with mismatching number of ids ({}) and values ({})",
                    ids.len(),
                    values.len()
                ),
                ErrorKind::ArgumentError,
            ));
        }
        if ids.is_empty() {
            return Ok(());
        }

        let mut records = self.inner.records.write();

        // Single up-front revision listing, not a per-id lookup loop. Keys
        // are owned so the listing outlives the inserts below.
        let revisions: BTreeMap<String, Revision> = records
            .iter()
            .map(|(id, record)| (id.clone(), record.revision))
            .collect();

        for (id, value) in ids.iter().zip(values) {
            let revision = revisions
                .get(id.as_str())
                .map(|r| r.next())
                .unwrap_or_else(Revision::initial);
            records.insert(id.clone(), StoreRecord::new(id.clone(), revision, value));
        }
        Ok(())
    }

    fn all(&self) -> DocvaultResult<Vec<StoreValue>> {
        self.inner.ensure_open()?;
        let records = self.inner.records.read();
        Ok(records.values().map(|r| r.value.clone()).collect())
    }

    fn all_with_ids(&self) -> DocvaultResult<(Vec<String>, Vec<StoreValue>)> {
        self.inner.ensure_open()?;
        let records = self.inner.records.read();
        let ids = records.keys().cloned().collect();
        let values = records.values().map(|r| r.value.clone()).collect();
        Ok((ids, values))
    }

    fn collection_page(
        &self,
        collection_name: &str,
        limit: usize,
        offset: usize,
    ) -> DocvaultResult<Vec<Document>> {
        self.inner.ensure_open()?;
        let records = self.inner.records.read();
        Ok(records
            .values()
            .filter_map(|r| r.value.as_document())
            .filter(|doc| doc.collection_name == collection_name)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn destroy(&self) -> DocvaultResult<()> {
        self.inner.records.write().clear();
        self.inner.closed.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn recreate(&self) -> DocvaultResult<()> {
        self.destroy()?;
        // The backing engine's teardown may complete asynchronously;
        // reopening immediately risks racing it.
        thread::sleep(TEARDOWN_YIELD);
        self.inner.closed.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn close(&self) -> DocvaultResult<()> {
        self.inner.closed.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn is_closed(&self) -> DocvaultResult<bool> {
        Ok(self.inner.closed.load(Ordering::Relaxed))
    }
}

struct InMemoryStoreInner {
    location: PathBuf,
    records: RwLock<BTreeMap<String, StoreRecord>>,
    closed: AtomicBool,
}

impl InMemoryStoreInner {
    fn new(location: PathBuf) -> InMemoryStoreInner {
        InMemoryStoreInner {
            location,
            records: RwLock::new(BTreeMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> DocvaultResult<()> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(DocvaultError::new(
                "store has already been closed",
                ErrorKind::StoreAlreadyClosed,
            ));
        }
        Ok(())
    }
}

/// Opens in-memory stores by location, keeping an instance-owned registry so
/// that reopening the same location sees the same data.
///
/// The registry belongs to the opener instance; there is no process-wide
/// state. Two openers never share data.
#[derive(Default)]
pub struct InMemoryStoreOpener {
    registry: DashMap<String, InMemoryStore>,
}

impl InMemoryStoreOpener {
    pub fn new() -> InMemoryStoreOpener {
        InMemoryStoreOpener {
            registry: DashMap::new(),
        }
    }
}

impl StoreOpener for InMemoryStoreOpener {
    fn open(&self, location: &Path) -> DocvaultResult<DocumentStore> {
        let key = location.to_string_lossy().to_string();
        let store = self
            .registry
            .entry(key)
            .or_insert_with(|| InMemoryStore::new(location))
            .clone();
        store.reopen();
        Ok(DocumentStore::new(store))
    }
}
