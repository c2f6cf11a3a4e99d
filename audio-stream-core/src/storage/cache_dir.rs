use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::models::error::StreamError;
use crate::traits::ephemeral_storage::EphemeralStorage;

/// Segment storage in a private subdirectory of a cache directory.
///
/// Every instance gets its own `stream-<uuid>` namespace so two schedulers
/// never share a key. Keys map to `<key>.wav` files.
#[derive(Debug)]
pub struct CacheDirStorage {
    root: PathBuf,
}

impl CacheDirStorage {
    pub fn new(cache_directory: &Path) -> Result<Self, StreamError> {
        let root = cache_directory.join(format!("stream-{}", Uuid::new_v4()));
        fs::create_dir_all(&root)
            .map_err(|e| StreamError::StorageWriteFailure(format!("failed to create {}: {}", root.display(), e)))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.wav", key))
    }

    /// Remove the namespace directory and anything left in it.
    pub fn purge(&self) -> Result<(), StreamError> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StreamError::StorageWriteFailure(format!(
                "failed to remove {}: {}",
                self.root.display(),
                e
            ))),
        }
    }
}

impl EphemeralStorage for CacheDirStorage {
    fn write(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, StreamError> {
        let path = self.path_for(key);
        fs::write(&path, bytes)
            .map_err(|e| StreamError::StorageWriteFailure(format!("write {} failed: {}", path.display(), e)))?;
        Ok(path)
    }

    fn delete(&self, key: &str) -> Result<(), StreamError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StreamError::StorageWriteFailure(format!(
                "delete {} failed: {}",
                path.display(),
                e
            ))),
        }
    }
}

impl Drop for CacheDirStorage {
    fn drop(&mut self) {
        if let Err(e) = self.purge() {
            log::warn!("Failed to purge segment cache: {}", e);
        }
    }
}
