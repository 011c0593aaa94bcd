//! Content-addressed blob storage for filedepot.
//!
//! This module provides physical file storage functionality:
//! - SHA-256 content hashing
//! - Directory sharding by first 2 characters of the hash
//! - Write, read, and delete operations keyed by storage location

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::{DepotError, Result};

/// Content-addressed blob store.
///
/// Blobs are stored in a sharded directory structure keyed by content hash:
/// ```text
/// {base_path}/
/// ├── ab/
/// │   ├── ab12cd...ef
/// │   └── ab12cd...ef.thumb.png
/// ├── cd/
/// │   └── cd90ab...12
/// └── ...
/// ```
///
/// Writes are idempotent by construction: the same bytes always land at the
/// same location, so re-writing after an interrupted upload simply replaces
/// the partial blob.
#[derive(Debug, Clone)]
pub struct ContentStore {
    /// Base directory for blob storage.
    base_path: PathBuf,
}

impl ContentStore {
    /// Create a new ContentStore with the given base path.
    ///
    /// The base directory will be created if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Compute the lowercase hex SHA-256 digest of the given bytes.
    pub fn hash_bytes(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Storage location for a content hash: `{shard}/{hash}`.
    pub fn location_for(hash: &str) -> String {
        format!("{}/{}", Self::shard(hash), hash)
    }

    /// Thumbnail location for a content hash: `{shard}/{hash}.thumb.png`.
    pub fn thumbnail_location_for(hash: &str) -> String {
        format!("{}/{}.thumb.png", Self::shard(hash), hash)
    }

    /// Write content to its content-addressed location.
    ///
    /// Returns the storage location. An existing blob at the same location
    /// is overwritten; since locations are derived from content, the bytes
    /// are identical (or the previous write was partial).
    pub fn write(&self, hash: &str, content: &[u8]) -> Result<String> {
        let location = Self::location_for(hash);
        self.write_at(&location, content)?;
        Ok(location)
    }

    /// Write content at a specific location.
    pub fn write_at(&self, location: &str, content: &[u8]) -> Result<()> {
        let file_path = self.resolve(location);

        // Create the shard directory if it doesn't exist
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| DepotError::Storage(format!("create shard dir: {e}")))?;
        }

        fs::write(&file_path, content)
            .map_err(|e| DepotError::Storage(format!("write blob {location}: {e}")))?;

        Ok(())
    }

    /// Read content from storage.
    pub fn read(&self, location: &str) -> Result<Vec<u8>> {
        let file_path = self.resolve(location);

        match fs::read(&file_path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(DepotError::NotFound(format!("blob {location}")))
            }
            Err(e) => Err(DepotError::Storage(format!("read blob {location}: {e}"))),
        }
    }

    /// Delete a blob from storage.
    ///
    /// Returns `true` if the blob was deleted, `false` if it didn't exist.
    /// Deleting an absent blob is not an error.
    pub fn delete(&self, location: &str) -> Result<bool> {
        let file_path = self.resolve(location);

        match fs::remove_file(&file_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DepotError::Storage(format!("delete blob {location}: {e}"))),
        }
    }

    /// Check if a blob exists in storage.
    pub fn exists(&self, location: &str) -> bool {
        self.resolve(location).exists()
    }

    /// Get the size of a stored blob.
    pub fn blob_size(&self, location: &str) -> Result<u64> {
        let file_path = self.resolve(location);

        match fs::metadata(&file_path) {
            Ok(m) => Ok(m.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(DepotError::NotFound(format!("blob {location}")))
            }
            Err(e) => Err(DepotError::Storage(format!("stat blob {location}: {e}"))),
        }
    }

    /// Resolve a storage location to a filesystem path.
    fn resolve(&self, location: &str) -> PathBuf {
        self.base_path.join(location)
    }

    /// Get the shard directory name for a hash.
    ///
    /// Returns the first 2 characters of the hash.
    fn shard(hash: &str) -> &str {
        if hash.len() >= 2 {
            &hash[..2]
        } else {
            hash
        }
    }

    /// Clean up empty shard directories.
    pub fn cleanup_empty_dirs(&self) -> Result<usize> {
        let mut removed = 0;

        if let Ok(entries) = fs::read_dir(&self.base_path) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    if let Ok(dir_entries) = fs::read_dir(&path) {
                        if dir_entries.count() == 0 && fs::remove_dir(&path).is_ok() {
                            removed += 1;
                        }
                    }
                }
            }
        }

        Ok(removed)
    }
}
