use std::{fs, path::Path};

use crate::error::{OwnersError, Result};

/// Boundary between the owners database and the world.
///
/// The database only ever needs existence/kind checks, whole-file reads and a
/// glob-style listing, so that is all the trait carries. Production code uses
/// [`OsFileSystem`]; tests substitute an in-memory tree.
pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Read a whole file as UTF-8 text.
    fn read_file(&self, path: &Path) -> Result<String>;

    /// Expand a glob pattern into the matching paths.
    fn glob(&self, pattern: &str) -> Vec<String>;
}

/// [`FileSystem`] backed by `std::fs` and the `glob` crate.
#[derive(Debug, Clone, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_file(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|source| OwnersError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn glob(&self, pattern: &str) -> Vec<String> {
        glob::glob(pattern)
            .map(|paths| {
                paths
                    .filter_map(std::result::Result::ok)
                    .map(|path| path.to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }
}
