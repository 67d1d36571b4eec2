//! Remote collection pagination and batch-write contracts.
//!
//! The remote source must support "order by unique id, optionally start after
//! a given id". Pagination is stateless: each fetch returns an explicit
//! opaque continuation token instead of capturing the last-seen id in a
//! closure, so a page sequence is finite, lazy, and restartable.

use crate::document::{Document, Payload};
use crate::errors::DocvaultResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

/// One remote record: its unique id within the collection and the opaque
/// payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub id: String,
    pub payload: Payload,
}

impl RemoteDocument {
    pub fn new(id: impl Into<String>, payload: Payload) -> Self {
        RemoteDocument {
            id: id.into(),
            payload,
        }
    }
}

/// A bounded page of remote documents, ordered ascending by id.
///
/// An empty page carries no continuation and signals exhaustion.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<RemoteDocument>,
    pub continuation: Option<String>,
}

impl Page {
    /// The terminal page: no items, no continuation.
    pub fn exhausted() -> Page {
        Page {
            items: Vec::new(),
            continuation: None,
        }
    }
}

/// Read side of the remote collection API.
///
/// # Contract
/// - `fetch_page` returns at most `batch_size` documents ordered ascending by
///   id, starting strictly after `after_id` when given.
/// - The continuation token is opaque; callers pass it back unchanged as the
///   next `after_id`.
/// - Fetch errors propagate unrecovered; there is no internal retry.
pub trait RemoteSource: Send + Sync {
    /// Enumerates all collection names on the remote.
    fn collection_names(&self) -> DocvaultResult<Vec<String>>;

    /// Fetches one id-ordered page of `collection_name`.
    fn fetch_page(
        &self,
        collection_name: &str,
        batch_size: usize,
        after_id: Option<&str>,
    ) -> DocvaultResult<Page>;
}

/// Write side of the remote collection API.
///
/// One call covers all documents of a single page and is atomic: either every
/// document in the batch is written or none is.
pub trait RemoteSink: Send + Sync {
    fn write_batch(&self, collection_name: &str, documents: &[Document]) -> DocvaultResult<()>;
}

/// Drives the cursor over `collection_name` to completion.
///
/// Every fetched page is fed to `per_page`, including the final empty
/// terminating page, and the total document count is returned. Memory use is
/// bounded by `batch_size`, not collection size: at most one page is in
/// flight. The first error from a fetch or from `per_page` stops the loop and
/// propagates.
pub fn for_each_page<F>(
    source: &dyn RemoteSource,
    collection_name: &str,
    batch_size: usize,
    mut per_page: F,
) -> DocvaultResult<u64>
where
    F: FnMut(&[RemoteDocument]) -> DocvaultResult<()>,
{
    let mut count: u64 = 0;
    let mut after_id: Option<String> = None;

    loop {
        let page = source.fetch_page(collection_name, batch_size, after_id.as_deref())?;
        count += page.items.len() as u64;
        per_page(&page.items)?;

        match page.continuation {
            Some(token) => after_id = Some(token),
            None => return Ok(count),
        }
    }
}

/// In-memory reference implementation of both remote traits.
///
/// Keeps every collection as an id-ordered map. Serves as the remote double
/// in unit and integration tests, and documents the pagination contract a
/// real remote adapter must honor.
#[derive(Default)]
pub struct InMemoryRemote {
    collections: RwLock<BTreeMap<String, BTreeMap<String, Payload>>>,
}

impl InMemoryRemote {
    pub fn new() -> InMemoryRemote {
        InMemoryRemote {
            collections: RwLock::new(BTreeMap::new()),
        }
    }

    /// Seeds one document into a collection, creating the collection if
    /// needed.
    pub fn insert(&self, collection_name: &str, id: &str, payload: Payload) {
        let mut collections = self.collections.write();
        collections
            .entry(collection_name.to_string())
            .or_default()
            .insert(id.to_string(), payload);
    }

    /// Creates an empty collection if it does not exist yet.
    pub fn create_collection(&self, collection_name: &str) {
        self.collections
            .write()
            .entry(collection_name.to_string())
            .or_default();
    }

    /// Returns all documents of a collection in id order.
    pub fn documents_in(&self, collection_name: &str) -> Vec<(String, Payload)> {
        let collections = self.collections.read();
        collections
            .get(collection_name)
            .map(|docs| docs.iter().map(|(id, p)| (id.clone(), p.clone())).collect())
            .unwrap_or_default()
    }

    /// Total number of documents across all collections.
    pub fn document_count(&self) -> usize {
        self.collections.read().values().map(|c| c.len()).sum()
    }
}

impl RemoteSource for InMemoryRemote {
    fn collection_names(&self) -> DocvaultResult<Vec<String>> {
        Ok(self.collections.read().keys().cloned().collect())
    }

    fn fetch_page(
        &self,
        collection_name: &str,
        batch_size: usize,
        after_id: Option<&str>,
    ) -> DocvaultResult<Page> {
        let collections = self.collections.read();
        let Some(docs) = collections.get(collection_name) else {
            return Ok(Page::exhausted());
        };

        let range = match after_id {
            Some(after) => docs.range::<str, _>((Excluded(after), Unbounded)),
            None => docs.range::<str, _>(..),
        };

        let items: Vec<RemoteDocument> = range
            .take(batch_size)
            .map(|(id, payload)| RemoteDocument::new(id.clone(), payload.clone()))
            .collect();

        if items.is_empty() {
            return Ok(Page::exhausted());
        }

        let continuation = items.last().map(|d| d.id.clone());
        Ok(Page {
            items,
            continuation,
        })
    }
}

impl RemoteSink for InMemoryRemote {
    fn write_batch(&self, collection_name: &str, documents: &[Document]) -> DocvaultResult<()> {
        let mut collections = self.collections.write();
        let target = collections
            .entry(collection_name.to_string())
            .or_default();
        for doc in documents {
            target.insert(doc.id.clone(), doc.payload.clone());
        }
        Ok(())
    }
}
