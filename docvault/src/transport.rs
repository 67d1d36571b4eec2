//! Moving archives to and from remote blob storage.
//!
//! The transport only sees opaque files keyed by name; what the file contains
//! is the packager's business. Implement [`BlobTransport`] to target S3,
//! GCS or any other object store; [`LocalBlobStore`] covers the filesystem
//! case and doubles as the test backend.

use crate::errors::{DocvaultError, DocvaultResult, ErrorKind};
use std::path::{Path, PathBuf};

/// Uploads and downloads single archive files keyed by name.
pub trait BlobTransport: Send + Sync {
    /// Uploads the file at `path` under `key`, replacing any existing blob.
    fn upload(&self, key: &str, path: &Path) -> DocvaultResult<()>;

    /// Downloads the blob stored under `key` to `dest`.
    ///
    /// # Errors
    /// `NotFound` when no blob exists under `key`.
    fn download(&self, key: &str, dest: &Path) -> DocvaultResult<()>;
}

/// Filesystem-backed transport: blobs are files under a base directory.
pub struct LocalBlobStore {
    base_dir: PathBuf,
}

impl LocalBlobStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> LocalBlobStore {
        LocalBlobStore {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl BlobTransport for LocalBlobStore {
    fn upload(&self, key: &str, path: &Path) -> DocvaultResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        let dest = self.base_dir.join(key);
        log::debug!("uploading {} as blob '{}'", path.display(), key);
        std::fs::copy(path, &dest)?;
        Ok(())
    }

    fn download(&self, key: &str, dest: &Path) -> DocvaultResult<()> {
        let src = self.base_dir.join(key);
        if !src.is_file() {
            return Err(DocvaultError::new(
                &format!("no blob stored under key '{}'", key),
                ErrorKind::NotFound,
            ));
        }
        log::debug!("downloading blob '{}' to {}", key, dest.display());
        std::fs::copy(&src, dest)?;
        Ok(())
    }
}
