//! Backup orchestration: remote cursor → bulk store writes → metadata.
//!
//! The orchestrator walks `Idle → ResolveCollections → PerCollectionSync →
//! WriteMetadata → Closed`. Collections are processed strictly sequentially,
//! not in parallel, to bound simultaneous load on the remote source and keep
//! log and write ordering deterministic. Any fetch or write error aborts
//! immediately; metadata is never written on failure.

use crate::document::{Document, SnapshotMetadata, StoreValue};
use crate::errors::{DocvaultError, DocvaultResult};
use crate::remote::{for_each_page, RemoteSource};
use crate::store::DocumentStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

/// Default number of documents fetched or written per round-trip.
pub const DEFAULT_BATCH_SIZE: usize = 250;

/// Collection selection and batching parameters for a backup run.
#[derive(Clone)]
pub struct BackupOptions {
    /// Explicit collections to back up; when `None`, all remote collections
    /// are enumerated.
    pub collection_names: Option<Vec<String>>,
    /// Collections dropped after resolution, whether listed explicitly or
    /// enumerated.
    pub collection_names_exclude: Vec<String>,
    /// Maximum items per fetch and per bulk write.
    pub batch_size: usize,
}

impl BackupOptions {
    pub fn new() -> BackupOptions {
        BackupOptions {
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

impl Default for BackupOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a completed backup.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupSummary {
    /// Collections actually written, post include/exclude filtering, in
    /// processing order. Equals the persisted metadata's collection list.
    pub collection_names: Vec<String>,
    /// Total documents copied across all collections.
    pub document_count: u64,
    pub elapsed_ms: i64,
}

/// Drives one full backup: cursor pagination into bulk store writes for each
/// selected collection, then the metadata record, then store close.
pub struct BackupOrchestrator {
    source: Arc<dyn RemoteSource>,
    store: DocumentStore,
    options: BackupOptions,
}

impl BackupOrchestrator {
    pub fn new(
        source: Arc<dyn RemoteSource>,
        store: DocumentStore,
        options: BackupOptions,
    ) -> BackupOrchestrator {
        BackupOrchestrator {
            source,
            store,
            options,
        }
    }

    /// Runs the backup to completion.
    ///
    /// Metadata is written once, after every collection succeeds, carrying
    /// the resolved collection list and the operation's start time; the store
    /// is closed before returning. On failure the error propagates
    /// immediately and no metadata is committed.
    pub fn run(&self) -> DocvaultResult<BackupSummary> {
        let started = Instant::now();
        let created_at_epoch_ms = Utc::now().timestamp_millis();

        let collection_names = self.resolve_collections()?;
        log::info!(
            "backup({}): selected collections {:?}",
            self.store.location().display(),
            collection_names
        );

        let mut document_count: u64 = 0;
        for name in &collection_names {
            document_count += self.sync_collection(name)?;
        }

        self.store.set_metadata(SnapshotMetadata::new(
            collection_names.clone(),
            created_at_epoch_ms,
        ))?;
        self.store.close()?;

        let elapsed_ms = started.elapsed().as_millis() as i64;
        log::info!(
            "backup({}): finished {} documents in {} ms",
            self.store.location().display(),
            document_count,
            elapsed_ms
        );

        Ok(BackupSummary {
            collection_names,
            document_count,
            elapsed_ms,
        })
    }

    /// Explicit include list when given, otherwise every remote collection;
    /// excluded names are dropped afterwards. Deterministic for fixed remote
    /// state and parameters.
    fn resolve_collections(&self) -> DocvaultResult<Vec<String>> {
        let mut names = match &self.options.collection_names {
            Some(explicit) => explicit.clone(),
            None => self.source.collection_names()?,
        };
        names.retain(|name| !self.options.collection_names_exclude.contains(name));
        Ok(names)
    }

    /// Copies one collection: each fetched page maps to tagged documents and
    /// goes through a single bulk write.
    fn sync_collection(&self, collection_name: &str) -> DocvaultResult<u64> {
        log::info!("{} backup starting...", collection_name);
        let started = Instant::now();

        let result = for_each_page(
            self.source.as_ref(),
            collection_name,
            self.options.batch_size,
            |items| {
                let ids: Vec<String> = items.iter().map(|item| item.id.clone()).collect();
                let values: Vec<StoreValue> = items
                    .iter()
                    .map(|item| {
                        StoreValue::Document(Document::new(
                            item.id.clone(),
                            collection_name,
                            item.payload.clone(),
                        ))
                    })
                    .collect();
                self.store.bulk_put(&ids, values)
            },
        );

        let elapsed_ms = started.elapsed().as_millis();
        match result {
            Ok(count) => {
                log::info!(
                    "{} backup finished with {} documents in {} ms",
                    collection_name,
                    count,
                    elapsed_ms
                );
                Ok(count)
            }
            Err(err) => {
                log::error!(
                    "{} backup failed after {} ms: {}",
                    collection_name,
                    elapsed_ms,
                    err
                );
                Err(DocvaultError::new_with_cause(
                    &format!(
                        "backup of collection '{}' failed after {} ms",
                        collection_name, elapsed_ms
                    ),
                    err.kind().clone(),
                    err,
                ))
            }
        }
    }
}
