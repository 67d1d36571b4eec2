//! Local revisioned document store abstraction.
//!
//! A store holds one record per `(collection_name, id)` plus a singleton
//! metadata record, and maintains a secondary index over the origin
//! collection name so restore can stream one collection at a time.
//!
//! Two variants implement the capability set: [`memory::InMemoryStore`] in
//! this crate, and the persistent fjall-backed store in the
//! `docvault-fjall-adapter` crate.

mod memory;

pub use memory::{InMemoryStore, InMemoryStoreOpener};

use crate::document::{Document, SnapshotMetadata, StoreRecord, StoreValue, META_RECORD_ID};
use crate::errors::DocvaultResult;
use std::collections::HashMap;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Minimal scheduling yield between a store's teardown and its reopen.
///
/// Backing engines may complete teardown asynchronously; reopening
/// immediately risks racing it. Implementations of `recreate()` must block
/// the caller across this yield.
pub const TEARDOWN_YIELD: Duration = Duration::from_millis(1);

/// Low-level interface for a local revisioned document store.
///
/// # Purpose
/// Defines the contract that all store implementations must follow: bulk
/// upsert under optimistic concurrency, full scan, a secondary index over the
/// origin collection name, and lifecycle control.
///
/// # Key Responsibilities
/// - **Revisioned Writes**: Every write resolves the record's current
///   revision up front; existing records update in place, new ones insert at
///   the initial revision. Revisions are monotonic per id and never reused.
/// - **Bulk Upsert**: `bulk_put` resolves revisions with a single up-front
///   listing, not per id. Bulk writes are best-effort per id, not atomic
///   across ids.
/// - **Secondary Index**: "all documents with `collection_name = X`, bounded
///   page of size N starting at offset M" with stable id ordering.
/// - **Lifecycle**: destroy, recreate (teardown yield included), close.
///
/// # Implementations
/// - `InMemoryStore`: in-memory variant for tests and temporary snapshots
/// - `FjallDocumentStore`: persistent variant (docvault-fjall-adapter)
///
/// # Thread Safety
/// Implementers must be `Send + Sync`. One logical operation owns its store
/// exclusively for the operation's lifetime.
pub trait DocumentStoreProvider: Send + Sync {
    /// Returns the location this store was opened at.
    fn location(&self) -> &Path;

    /// Retrieves the value stored under `id`, or `None` if absent.
    fn get(&self, id: &str) -> DocvaultResult<Option<StoreValue>>;

    /// Retrieves the full record (including its revision) stored under `id`.
    fn get_record(&self, id: &str) -> DocvaultResult<Option<StoreRecord>>;

    /// Writes `value` under `id`, resolving the current revision first.
    ///
    /// An existing record is updated in place and its revision bumped; a new
    /// record is inserted at the initial revision.
    ///
    /// # Returns
    /// The revision assigned to the written record.
    fn put(&self, id: &str, value: StoreValue) -> DocvaultResult<crate::document::Revision>;

    /// Writes each `values[i]` under `ids[i]`.
    ///
    /// Revisions for all ids are resolved with a single up-front listing. The
    /// write is best-effort per id: a partial failure may leave some ids
    /// updated and others not.
    ///
    /// # Errors
    /// `ArgumentError` when `ids.len() != values.len()`. Empty input is a
    /// no-op.
    fn bulk_put(&self, ids: &[String], values: Vec<StoreValue>) -> DocvaultResult<()>;

    /// Returns every stored value, in stable id order.
    fn all(&self) -> DocvaultResult<Vec<StoreValue>>;

    /// Returns every stored id and value, paired by position, in stable id
    /// order.
    fn all_with_ids(&self) -> DocvaultResult<(Vec<String>, Vec<StoreValue>)>;

    /// Returns a page of documents whose `collection_name` equals
    /// `collection_name`, in stable id order.
    ///
    /// # Arguments
    /// * `collection_name` - origin collection to select
    /// * `limit` - maximum number of documents in the page
    /// * `offset` - number of matching documents to skip
    fn collection_page(
        &self,
        collection_name: &str,
        limit: usize,
        offset: usize,
    ) -> DocvaultResult<Vec<Document>>;

    /// Destroys the store's contents.
    fn destroy(&self) -> DocvaultResult<()>;

    /// Destroys the store, yields for [`TEARDOWN_YIELD`], and reopens it at
    /// the same location.
    ///
    /// Blocks the caller across the yield; the backing engine's teardown may
    /// complete asynchronously.
    fn recreate(&self) -> DocvaultResult<()>;

    /// Flushes and closes the store. Further writes fail with
    /// `StoreAlreadyClosed`.
    fn close(&self) -> DocvaultResult<()>;

    /// Checks whether the store has been closed.
    fn is_closed(&self) -> DocvaultResult<bool>;
}

/// High-level wrapper for accessing a local document store.
///
/// # Purpose
/// `DocumentStore` provides the public API for interacting with a store. It
/// wraps a concrete [`DocumentStoreProvider`] using `Arc` for efficient,
/// thread-safe sharing, and adds the metadata facade and the collection-page
/// fold used by restore.
///
/// # Characteristics
/// - **Thread-Safe**: can be safely cloned and shared across threads
/// - **Provider-Agnostic**: works with any `DocumentStoreProvider`
/// - **Ergonomic**: implements `Deref` for seamless access to provider methods
/// - **Lightweight**: cloning only increments the reference count
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<dyn DocumentStoreProvider>,
}

impl DocumentStore {
    /// Creates a new `DocumentStore` wrapping a provider implementation.
    pub fn new<T: DocumentStoreProvider + 'static>(inner: T) -> Self {
        DocumentStore {
            inner: Arc::new(inner),
        }
    }

    /// Writes the snapshot metadata singleton under its fixed id.
    pub fn set_metadata(&self, meta: SnapshotMetadata) -> DocvaultResult<()> {
        self.inner.put(META_RECORD_ID, StoreValue::Metadata(meta))?;
        Ok(())
    }

    /// Reads the snapshot metadata singleton.
    ///
    /// Returns `None` when the record is missing or does not hold metadata.
    /// A malformed value reads as absent, never as an error, so restore fails
    /// with a clear "no metadata" condition instead of a deserialization
    /// fault.
    pub fn metadata(&self) -> DocvaultResult<Option<SnapshotMetadata>> {
        let value = self.inner.get(META_RECORD_ID)?;
        Ok(value.and_then(|v| v.as_metadata().cloned()))
    }

    /// Returns every stored value keyed by id.
    pub fn all_mapped_to_id(&self) -> DocvaultResult<HashMap<String, StoreValue>> {
        let (ids, values) = self.inner.all_with_ids()?;
        Ok(ids.into_iter().zip(values).collect())
    }

    /// Drives the secondary index over `collection_name` to completion,
    /// feeding each bounded page to `per_page` and returning the total
    /// document count.
    ///
    /// Pages are fetched at offsets `0, limit, 2*limit, ...` until a fetch
    /// yields fewer than `limit` documents. Memory use is bounded by `limit`,
    /// not by collection size. The first error from a fetch or from
    /// `per_page` stops the fold and propagates.
    pub fn for_each_collection_page<F>(
        &self,
        collection_name: &str,
        limit: usize,
        mut per_page: F,
    ) -> DocvaultResult<u64>
    where
        F: FnMut(&[Document]) -> DocvaultResult<()>,
    {
        let mut count: u64 = 0;
        let mut offset = 0usize;

        loop {
            let page = self.inner.collection_page(collection_name, limit, offset)?;
            if page.is_empty() {
                break;
            }

            count += page.len() as u64;
            offset += page.len();
            per_page(&page)?;

            if page.len() < limit {
                break;
            }
        }

        Ok(count)
    }
}

impl Deref for DocumentStore {
    type Target = Arc<dyn DocumentStoreProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Opens a document store at a given location.
///
/// Store construction is explicit configuration supplied to the orchestrators
/// at build time; there is no process-wide engine registration. The in-memory
/// opener keeps an instance-owned registry so reopening a location sees the
/// same data; the fjall opener opens the on-disk keyspace.
pub trait StoreOpener: Send + Sync {
    /// Opens (or creates) the store at `location`.
    fn open(&self, location: &Path) -> DocvaultResult<DocumentStore>;
}
