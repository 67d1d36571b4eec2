use fjall::{Config, KvSeparationOptions, PartitionCreateOptions};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Clone)]
/// Fjall store configuration wrapper.
///
/// A cloneable, thread-safe configuration holder for Fjall tuning parameters.
/// Uses PIMPL pattern with `Arc<FjallStoreConfigInner>` so clones share the
/// same underlying settings; each parameter uses atomic types for wait-free
/// concurrent access.
///
/// Usage: Create via `FjallStoreConfig::new()`, tune via setter methods, then
/// hand to `FjallStoreOpener`.
pub struct FjallStoreConfig {
    inner: Arc<FjallStoreConfigInner>,
}

impl FjallStoreConfig {
    /// Creates a new configuration with defaults suited to snapshot
    /// workloads: 32 MB cache, 64 MB write buffer, fsync disabled (the store
    /// syncs explicitly on close), key-value separation off.
    #[inline]
    pub fn new() -> FjallStoreConfig {
        FjallStoreConfig {
            inner: Arc::new(FjallStoreConfigInner::new()),
        }
    }

    /// Builds a Fjall Keyspace configuration rooted at `path`.
    #[inline]
    pub(crate) fn keyspace_config(&self, path: &Path) -> Config {
        let mut config = Config::new(path);
        config = config
            .cache_size(self.inner.cache_size.load(Ordering::Relaxed))
            .max_write_buffer_size(self.inner.max_write_buffer_size.load(Ordering::Relaxed));

        let fsync_ms = self.inner.fsync_ms.load(Ordering::Relaxed);
        if fsync_ms > 0 {
            config = config.fsync_ms(Some(fsync_ms));
        }
        config
    }

    /// Builds the partition-level configuration shared by the record and
    /// index partitions.
    #[inline]
    pub(crate) fn partition_config(&self) -> PartitionCreateOptions {
        let config = PartitionCreateOptions::default();
        if self.inner.kv_separated.load(Ordering::Relaxed) {
            config.with_kv_separation(KvSeparationOptions::default())
        } else {
            config
        }
    }

    /// Returns the block cache capacity in bytes.
    #[inline]
    pub fn cache_size(&self) -> u64 {
        self.inner.cache_size.load(Ordering::Relaxed)
    }

    /// Sets the block cache capacity in bytes.
    #[inline]
    pub fn set_cache_size(&self, bytes: u64) {
        self.inner.cache_size.store(bytes, Ordering::Relaxed)
    }

    /// Returns the maximum write buffer size in bytes.
    #[inline]
    pub fn max_write_buffer_size(&self) -> u64 {
        self.inner.max_write_buffer_size.load(Ordering::Relaxed)
    }

    /// Sets the maximum write buffer size in bytes.
    #[inline]
    pub fn set_max_write_buffer_size(&self, bytes: u64) {
        self.inner
            .max_write_buffer_size
            .store(bytes, Ordering::Relaxed)
    }

    /// Returns the periodic fsync interval in milliseconds; 0 disables it.
    #[inline]
    pub fn fsync_ms(&self) -> u16 {
        self.inner.fsync_ms.load(Ordering::Relaxed)
    }

    /// Sets the periodic fsync interval in milliseconds; 0 disables it.
    #[inline]
    pub fn set_fsync_ms(&self, ms: u16) {
        self.inner.fsync_ms.store(ms, Ordering::Relaxed)
    }

    /// Returns whether key-value separation is enabled.
    #[inline]
    pub fn kv_separated(&self) -> bool {
        self.inner.kv_separated.load(Ordering::Relaxed)
    }

    /// Enables key-value separation for large payloads.
    #[inline]
    pub fn set_kv_separated(&self, enabled: bool) {
        self.inner.kv_separated.store(enabled, Ordering::Relaxed)
    }
}

impl Default for FjallStoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

struct FjallStoreConfigInner {
    cache_size: AtomicU64,
    max_write_buffer_size: AtomicU64,
    fsync_ms: AtomicU16,
    kv_separated: AtomicBool,
}

impl FjallStoreConfigInner {
    fn new() -> FjallStoreConfigInner {
        FjallStoreConfigInner {
            cache_size: AtomicU64::new(32 * 1024 * 1024),
            max_write_buffer_size: AtomicU64::new(64 * 1024 * 1024),
            fsync_ms: AtomicU16::new(0),
            kv_separated: AtomicBool::new(false),
        }
    }
}
