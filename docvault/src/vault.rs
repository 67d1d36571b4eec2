//! Top-level facade tying stores, remotes, archives and blob transport
//! together.
//!
//! A `Docvault` is assembled once from explicit components and then drives
//! whole operations: back up a remote into a local store, round-trip that
//! store through an archive or a blob store, and restore it back into a
//! remote target.

use crate::archive::{ArchivePackager, TarGzPackager};
use crate::backup::{BackupOptions, BackupOrchestrator, BackupSummary};
use crate::errors::{DocvaultError, DocvaultResult, ErrorKind};
use crate::export;
use crate::remote::{RemoteSink, RemoteSource};
use crate::restore::{RestoreOptions, RestoreOrchestrator, RestoreSummary};
use crate::store::{DocumentStore, StoreOpener};
use crate::transport::BlobTransport;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

/// Builder for assembling a [`Docvault`] from its components.
///
/// Construction is explicit configuration: components are supplied here, at
/// build time, and nothing is registered process-wide. Only the store opener
/// is mandatory; operations that need an absent component fail with
/// `ConfigurationError` when invoked.
#[derive(Default)]
pub struct DocvaultBuilder {
    source: Option<Arc<dyn RemoteSource>>,
    sink: Option<Arc<dyn RemoteSink>>,
    opener: Option<Arc<dyn StoreOpener>>,
    packager: Option<Arc<dyn ArchivePackager>>,
    transport: Option<Arc<dyn BlobTransport>>,
    base_dir: Option<PathBuf>,
}

impl DocvaultBuilder {
    pub fn new() -> DocvaultBuilder {
        DocvaultBuilder::default()
    }

    /// Sets the remote read side used by backups.
    pub fn source(mut self, source: Arc<dyn RemoteSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the remote write side used by restores.
    pub fn sink(mut self, sink: Arc<dyn RemoteSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the store opener backing local snapshots.
    pub fn opener(mut self, opener: Arc<dyn StoreOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    /// Overrides the archive packager. Defaults to gzip-compressed tar.
    pub fn packager(mut self, packager: Arc<dyn ArchivePackager>) -> Self {
        self.packager = Some(packager);
        self
    }

    /// Sets the blob transport used by the blob round-trip operations.
    pub fn transport(mut self, transport: Arc<dyn BlobTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the directory under which relative and generated store paths
    /// resolve. Defaults to the process working directory.
    pub fn base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    pub fn build(self) -> DocvaultResult<Docvault> {
        let opener = self.opener.ok_or_else(|| {
            DocvaultError::new(
                "cannot build a vault without a store opener",
                ErrorKind::ConfigurationError,
            )
        })?;
        Ok(Docvault {
            source: self.source,
            sink: self.sink,
            opener,
            packager: self
                .packager
                .unwrap_or_else(|| Arc::new(TarGzPackager::new())),
            transport: self.transport,
            base_dir: self.base_dir.unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

/// Report of a completed backup: where the snapshot landed and what it holds.
#[derive(Debug, Clone)]
pub struct BackupReport {
    pub store_path: PathBuf,
    pub summary: BackupSummary,
}

/// Report of a backup packed into an archive file.
#[derive(Debug, Clone)]
pub struct ArchiveReport {
    pub archive_path: PathBuf,
    pub summary: BackupSummary,
}

/// Assembled replication facade.
pub struct Docvault {
    source: Option<Arc<dyn RemoteSource>>,
    sink: Option<Arc<dyn RemoteSink>>,
    opener: Arc<dyn StoreOpener>,
    packager: Arc<dyn ArchivePackager>,
    transport: Option<Arc<dyn BlobTransport>>,
    base_dir: PathBuf,
}

impl Docvault {
    pub fn builder() -> DocvaultBuilder {
        DocvaultBuilder::new()
    }

    /// Resolves a store location.
    ///
    /// An explicit name is taken as-is when absolute, otherwise joined under
    /// the base directory. Without a name a fresh collision-free location is
    /// generated from the current timestamp and a random suffix, e.g.
    /// `2026-08-29T10_15_30Z---6f9a...`; colons are replaced so the name
    /// stays valid on every filesystem.
    pub fn resolve_store_path(&self, store_name: Option<&str>) -> PathBuf {
        match store_name {
            Some(name) => {
                let path = Path::new(name);
                if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    self.base_dir.join(name)
                }
            }
            None => {
                let timestamp = Utc::now()
                    .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
                    .replace(':', "_");
                self.base_dir
                    .join(format!("{}---{}", timestamp, Uuid::new_v4()))
            }
        }
    }

    /// Backs the remote source up into a local store.
    ///
    /// The store at the resolved location is recreated first, so a stale
    /// snapshot at the same name never leaks records into the new one.
    pub fn create_backup(
        &self,
        store_name: Option<&str>,
        options: BackupOptions,
    ) -> DocvaultResult<BackupReport> {
        let store_path = self.resolve_store_path(store_name);
        let store = self.open_clean_store(&store_path)?;
        let summary =
            BackupOrchestrator::new(self.require_source()?, store, options).run()?;
        Ok(BackupReport {
            store_path,
            summary,
        })
    }

    /// Backs the remote source up into a temporary store and packs it into a
    /// single archive file at `archive_path`.
    pub fn create_backup_to_archive(
        &self,
        archive_path: &Path,
        options: BackupOptions,
    ) -> DocvaultResult<ArchiveReport> {
        let staging = TempDir::new()?;
        let store_dir = staging.path().join("store");
        std::fs::create_dir_all(&store_dir)?;

        let store = self.open_clean_store(&store_dir)?;
        let summary =
            BackupOrchestrator::new(self.require_source()?, store, options).run()?;

        self.packager.pack(&store_dir, archive_path)?;
        Ok(ArchiveReport {
            archive_path: archive_path.to_path_buf(),
            summary,
        })
    }

    /// Backs the remote source up, packs the snapshot, and uploads it to blob
    /// storage under `key`.
    pub fn create_backup_to_blob(
        &self,
        key: &str,
        options: BackupOptions,
    ) -> DocvaultResult<BackupSummary> {
        let transport = self.require_transport()?;
        let staging = TempDir::new()?;
        let archive_path = staging
            .path()
            .join(format!("snapshot.{}", self.packager.extension()));

        let report = self.create_backup_to_archive(&archive_path, options)?;
        transport.upload(key, &archive_path)?;
        Ok(report.summary)
    }

    /// Restores a local store into the remote sink.
    pub fn restore_backup(
        &self,
        store_name: &str,
        options: RestoreOptions,
    ) -> DocvaultResult<RestoreSummary> {
        let store_path = self.resolve_store_path(Some(store_name));
        let store = self.opener.open(&store_path)?;
        RestoreOrchestrator::new(self.require_sink()?, store, options).run()
    }

    /// Unpacks an archive into a temporary directory and restores the store
    /// it contains into the remote sink.
    pub fn restore_from_archive(
        &self,
        archive_path: &Path,
        options: RestoreOptions,
    ) -> DocvaultResult<RestoreSummary> {
        let extracted = self.packager.unpack(archive_path)?;
        let store = self.opener.open(extracted.path())?;
        RestoreOrchestrator::new(self.require_sink()?, store, options).run()
    }

    /// Downloads the blob stored under `key` and restores the archived store
    /// it contains into the remote sink.
    pub fn restore_from_blob(
        &self,
        key: &str,
        options: RestoreOptions,
    ) -> DocvaultResult<RestoreSummary> {
        let transport = self.require_transport()?;
        let staging = TempDir::new()?;
        let archive_path = staging
            .path()
            .join(format!("snapshot.{}", self.packager.extension()));

        transport.download(key, &archive_path)?;
        self.restore_from_archive(&archive_path, options)
    }

    /// Dumps the full contents of a local store as pretty-printed JSON.
    pub fn dump_to_json(&self, store_name: &str, dest: &Path) -> DocvaultResult<()> {
        let store_path = self.resolve_store_path(Some(store_name));
        let store = self.opener.open(&store_path)?;
        export::dump_to_json(&store, dest)?;
        store.close()
    }

    /// Opens the store at `path` and wipes any previous contents.
    fn open_clean_store(&self, path: &Path) -> DocvaultResult<DocumentStore> {
        let store = self.opener.open(path)?;
        store.recreate()?;
        Ok(store)
    }

    fn require_source(&self) -> DocvaultResult<Arc<dyn RemoteSource>> {
        self.source.clone().ok_or_else(|| {
            DocvaultError::new(
                "no remote source configured for backup",
                ErrorKind::ConfigurationError,
            )
        })
    }

    fn require_sink(&self) -> DocvaultResult<Arc<dyn RemoteSink>> {
        self.sink.clone().ok_or_else(|| {
            DocvaultError::new(
                "no remote sink configured for restore",
                ErrorKind::ConfigurationError,
            )
        })
    }

    fn require_transport(&self) -> DocvaultResult<Arc<dyn BlobTransport>> {
        self.transport.clone().ok_or_else(|| {
            DocvaultError::new(
                "no blob transport configured",
                ErrorKind::ConfigurationError,
            )
        })
    }
}
