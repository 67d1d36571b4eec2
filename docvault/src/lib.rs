//! # Docvault - Collection Backup and Restore
//!
//! Docvault copies paginated remote document collections into a local
//! revisioned document store and restores them back. Snapshots can be packed
//! into a single compressed archive and round-tripped through blob storage.
//!
//! ## Key Features
//!
//! - **Cursor Pagination**: Remote collections stream in bounded, id-ordered
//!   pages with explicit continuation tokens
//! - **Revisioned Store**: One record per document, optimistic revisions, a
//!   secondary index over the origin collection name
//! - **Snapshot Metadata**: A self-describing record written only after a
//!   fully successful backup; restore refuses stores without it
//! - **Archive Round-Trip**: Snapshots pack into gzip-compressed tar files
//!   and travel through pluggable blob transports
//! - **Pluggable Backends**: In-memory store for tests and staging, a
//!   persistent fjall-backed store in the `docvault-fjall-adapter` crate
//! - **Clean API**: PIMPL pattern provides a stable, encapsulated interface
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docvault::vault::Docvault;
//! use docvault::backup::BackupOptions;
//! use docvault::restore::RestoreOptions;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let vault = Docvault::builder()
//!     .source(remote.clone())
//!     .sink(remote)
//!     .opener(Arc::new(FjallStoreOpener::new()))
//!     .build()?;
//!
//! // Copy every remote collection into a timestamped local store
//! let report = vault.create_backup(None, BackupOptions::new())?;
//!
//! // Write it all back
//! let path = report.store_path.to_string_lossy();
//! vault.restore_backup(&path, RestoreOptions::new())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`archive`] - Store directory to single-file archive packaging
//! - [`backup`] - Backup orchestration from a remote source into a store
//! - [`document`] - Documents, snapshot metadata, revisions, store records
//! - [`errors`] - Error types and result definitions
//! - [`export`] - Diagnostic JSON dump of a store's contents
//! - [`remote`] - Remote pagination and batch-write contracts
//! - [`restore`] - Restore orchestration from a store into a remote sink
//! - [`store`] - Local revisioned document store abstraction
//! - [`transport`] - Blob upload and download of archives
//! - [`vault`] - Top-level facade and builder

pub mod archive;
pub mod backup;
pub mod document;
pub mod errors;
pub mod export;
pub mod remote;
pub mod restore;
pub mod store;
pub mod transport;
pub mod vault;

pub use document::{Document, Payload, Revision, SnapshotMetadata, StoreRecord, StoreValue};
pub use errors::{DocvaultError, DocvaultResult, ErrorKind};
pub use store::{DocumentStore, DocumentStoreProvider, StoreOpener};
pub use vault::{Docvault, DocvaultBuilder};
