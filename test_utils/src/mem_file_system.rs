use std::{
    collections::BTreeMap,
    io,
    path::Path,
};

use owners::{FileSystem, OwnersError, Result};

/// In-memory [`FileSystem`] for tests: a flat map of absolute path to file
/// contents, with directories implied by the stored paths.
#[derive(Debug, Clone, Default)]
pub struct MemFileSystem {
    files: BTreeMap<String, String>,
}

impl MemFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into());
    }

    fn contains_dir(&self, path: &str) -> bool {
        let prefix = if path.ends_with('/') {
            path.to_string()
        } else {
            format!("{path}/")
        };
        self.files.keys().any(|key| key.starts_with(&prefix))
    }
}

impl FileSystem for MemFileSystem {
    fn exists(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.files.contains_key(path.as_ref()) || self.contains_dir(&path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.contains_dir(&path.to_string_lossy())
    }

    fn read_file(&self, path: &Path) -> Result<String> {
        let key = path.to_string_lossy();
        self.files
            .get(key.as_ref())
            .cloned()
            .ok_or_else(|| OwnersError::Io {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
            })
    }

    fn glob(&self, pattern: &str) -> Vec<String> {
        let options = glob::MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        match glob::Pattern::new(pattern) {
            Ok(pattern) => self
                .files
                .keys()
                .filter(|path| pattern.matches_with(path, options))
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemFileSystem {
        let mut fs = MemFileSystem::new();
        fs.add_file("/OWNERS", "ken@example.com\n");
        fs.add_file("/chrome/OWNERS", "ben@example.com\n");
        fs.add_file("/chrome/app.cc", "");
        fs
    }

    #[test]
    fn exists_sees_files_and_implied_directories() {
        let fs = sample();
        assert!(fs.exists(Path::new("/OWNERS")));
        assert!(fs.exists(Path::new("/chrome")));
        assert!(!fs.exists(Path::new("/chrome/missing.cc")));
    }

    #[test]
    fn is_dir_only_matches_directories() {
        let fs = sample();
        assert!(fs.is_dir(Path::new("/chrome")));
        assert!(!fs.is_dir(Path::new("/chrome/app.cc")));
    }

    #[test]
    fn glob_respects_path_separators() {
        let fs = sample();
        assert_eq!(fs.glob("/*/OWNERS"), vec![String::from("/chrome/OWNERS")]);
        assert_eq!(fs.glob("/chrome/*.cc"), vec![String::from("/chrome/app.cc")]);
        assert!(fs.glob("/*.cc").is_empty());
    }
}
