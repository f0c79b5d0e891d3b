//! Filesystem storage backend
//!
//! One file per key; the file name is the key. The directory is created on
//! open and discovered contents survive across handles.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::ByteStorage;
use crate::error::Result;

/// Directory-backed byte storage
pub struct DirectoryStorage {
    dir: PathBuf,
}

impl DirectoryStorage {
    /// Open or create storage in the given directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The backing directory path
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl ByteStorage for DirectoryStorage {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        fs::write(self.file_path(key), bytes)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.file_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().is_file() {
                // Keys are hex hashes or well-known names, always UTF-8;
                // skip anything else that wandered into the directory.
                if let Ok(name) = entry.file_name().into_string() {
                    keys.push(name);
                }
            }
        }
        Ok(keys)
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.file_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
