//! Store directory ↔ single-file archive packaging.
//!
//! A packager turns a store directory into one portable archive file and back
//! into a directory tree. The only shipped implementation is gzip-compressed
//! tar; alternative formats plug in through [`ArchivePackager`].

use crate::errors::{DocvaultError, DocvaultResult, ErrorKind};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Default gzip compression level.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Packs a directory tree into a single archive file and unpacks it again.
///
/// # Contract
/// - `pack` writes one archive file at `dest` holding the full tree rooted at
///   `dir`, with paths stored relative to that root.
/// - `unpack` extracts an archive into a fresh temporary directory and hands
///   ownership of it to the caller; the directory is removed when the guard
///   drops.
/// - `dest` must not live inside `dir`: archiving a directory into itself
///   would feed the growing archive back into its own input.
pub trait ArchivePackager: Send + Sync {
    fn pack(&self, dir: &Path, dest: &Path) -> DocvaultResult<()>;

    fn unpack(&self, archive: &Path) -> DocvaultResult<TempDir>;

    /// Conventional file extension for archives this packager produces,
    /// without a leading dot.
    fn extension(&self) -> &str;
}

/// Gzip-compressed tar packager.
pub struct TarGzPackager {
    compression_level: u32,
}

impl TarGzPackager {
    pub fn new() -> TarGzPackager {
        TarGzPackager {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// Sets the gzip compression level (0-9).
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    fn guard_dest_outside_source(dir: &Path, dest: &Path) -> DocvaultResult<()> {
        let dir = canonical_or_self(dir);
        let dest_parent = dest
            .parent()
            .map(canonical_or_self)
            .unwrap_or_else(|| PathBuf::from("."));
        if dest_parent.starts_with(&dir) {
            return Err(DocvaultError::new(
                &format!(
                    "archive destination {} lies inside the directory being packed {}",
                    dest.display(),
                    dir.display()
                ),
                ErrorKind::ArgumentError,
            ));
        }
        Ok(())
    }
}

impl Default for TarGzPackager {
    fn default() -> Self {
        Self::new()
    }
}

fn canonical_or_self(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

impl ArchivePackager for TarGzPackager {
    fn pack(&self, dir: &Path, dest: &Path) -> DocvaultResult<()> {
        if !dir.is_dir() {
            return Err(DocvaultError::new(
                &format!("{} is not a directory", dir.display()),
                ErrorKind::ArgumentError,
            ));
        }
        Self::guard_dest_outside_source(dir, dest)?;

        log::debug!("packing {} into {}", dir.display(), dest.display());
        let output = File::create(dest)?;
        let encoder = GzEncoder::new(output, Compression::new(self.compression_level));
        let mut builder = tar::Builder::new(encoder);
        builder.append_dir_all(".", dir)?;
        let encoder = builder.into_inner()?;
        encoder.finish()?;
        Ok(())
    }

    fn unpack(&self, archive: &Path) -> DocvaultResult<TempDir> {
        let input = File::open(archive)?;
        let temp_dir = TempDir::new()?;
        log::debug!(
            "unpacking {} into {}",
            archive.display(),
            temp_dir.path().display()
        );
        let mut reader = tar::Archive::new(GzDecoder::new(input));
        reader.unpack(temp_dir.path())?;
        Ok(temp_dir)
    }

    fn extension(&self) -> &str {
        "tar.gz"
    }
}
