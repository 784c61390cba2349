//! File-backed [`DurableStore`].
//!
//! Each key is one file named after the key string inside a single
//! directory. Writes replace the file atomically; a missing file reads as
//! an absent key.

use std::io;
use std::path::{Path, PathBuf};

use cap_std::ambient_authority;
use cap_std::fs::Dir;
use tracing::debug;

use super::atomic_io::write_atomic;
use crate::domain::ports::{DurableStore, DurableStoreError, StorageKey};

/// Durable store rooted at one directory.
#[derive(Debug)]
pub struct FileDurableStore {
    dir: Dir,
    root: PathBuf,
}

impl FileDurableStore {
    /// Open `root`, creating it when missing.
    ///
    /// # Errors
    /// Returns the I/O error when the directory cannot be created or opened.
    pub fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref();
        Dir::create_ambient_dir_all(root, ambient_authority())?;
        let dir = Dir::open_ambient_dir(root, ambient_authority())?;
        debug!(root = %root.display(), "opened durable session directory");
        Ok(Self {
            dir,
            root: root.to_path_buf(),
        })
    }

    /// Directory holding the session files.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DurableStore for FileDurableStore {
    fn get(&self, key: StorageKey) -> Result<Option<String>, DurableStoreError> {
        match self.dir.read_to_string(key.as_str()) {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(DurableStoreError::read(key.as_str(), error.to_string())),
        }
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<(), DurableStoreError> {
        write_atomic(&self.dir, key.as_str(), value)
            .map_err(|error| DurableStoreError::write(key.as_str(), error.to_string()))
    }

    fn remove(&self, key: StorageKey) -> Result<(), DurableStoreError> {
        match self.dir.remove_file(key.as_str()) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(DurableStoreError::write(key.as_str(), error.to_string())),
        }
    }
}
