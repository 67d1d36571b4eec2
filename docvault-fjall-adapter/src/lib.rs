//! Persistent Fjall-backed store for Docvault snapshots.
//!
//! Provides [`FjallDocumentStore`], a durable `DocumentStoreProvider` backed
//! by the Fjall LSM engine, and [`FjallStoreOpener`] for plugging it into a
//! `Docvault`. Records live in one partition keyed by id; a second partition
//! indexes records by their origin collection so restore can stream one
//! collection at a time without a full scan.

mod codec;
mod config;
mod store;

pub use codec::{FjallCodecError, FjallCodecResult};
pub use config::FjallStoreConfig;
pub use store::{FjallDocumentStore, FjallStoreOpener};
