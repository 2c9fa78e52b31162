//! Temporary store files for filesystem-backed tests.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use autolock_store::{FileStore, StoreResult};
use tempfile::TempDir;

/// File name used for the store document inside a [`TempStore`].
pub const STORE_FILE_NAME: &str = "settings.json";

/// Scratch directory holding one store document; removed on drop.
pub struct TempStore {
    dir: TempDir,
    path: PathBuf,
}

impl TempStore {
    /// Create an empty scratch directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the temporary directory cannot be created.
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(STORE_FILE_NAME);
        Ok(Self { dir, path })
    }

    /// Location of the store document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scratch directory root.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Replace the document with raw text, bypassing any store handle.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be written.
    pub fn write_raw(&self, contents: &str) -> io::Result<()> {
        fs::write(&self.path, contents)
    }

    /// Open a [`FileStore`] over the document.
    ///
    /// # Errors
    ///
    /// Propagates [`FileStore::open`] failures.
    pub async fn open(&self) -> StoreResult<FileStore> {
        FileStore::open(&self.path).await
    }
}
