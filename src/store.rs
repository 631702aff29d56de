//! # Fragment Storage Access
//!
//! The loader reads target fragments through the `ContentStore` trait rather
//! than calling the filesystem directly. `DiskStore` is the implementation used
//! by the library and the CLI; tests substitute stores that count reads or
//! serve documents from memory, which is how at-most-once loading is checked
//! without touching timing or filesystem internals.

use std::path::{Path, PathBuf};

use log::warn;

use crate::error::{Error, Result};

/// Read access to stored fragment files
pub trait ContentStore: Send + Sync {
    /// Whether a fragment file exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Read a fragment file as UTF-8 text
    fn read_to_string(&self, path: &Path) -> Result<String>;
}

/// `ContentStore` backed by the host filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskStore;

impl ContentStore for DiskStore {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| Error::Filesystem {
            message: format!("Failed to read '{}': {}", path.display(), e),
        })
    }
}

/// Fragment files matching a glob pattern, in glob order.
///
/// Directories are skipped; unreadable entries are logged and skipped.
pub fn glob_fragments(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in glob::glob(pattern)? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(err) => warn!("Skipping unreadable path: {}", err),
        }
    }
    Ok(files)
}
