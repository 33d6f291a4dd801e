use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    rc::Rc,
};

use indexmap::{IndexMap, IndexSet};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::{
    error::{OwnersError, Result},
    file_system::FileSystem,
};

/// Wildcard owner: anyone may approve.
pub const EVERYONE: &str = "*";

const OWNERS_FILE_NAME: &str = "OWNERS";

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[\w\-\+\%\.]+@[\w\-\+\%\.]+$").unwrap();
}

/// A comment attached to an owner, remembered with the directory whose
/// OWNERS file declared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerComment {
    pub directory: String,
    pub text: String,
}

/// One parsed OWNERS file.
#[derive(Debug, Default)]
struct DirEntry {
    owners: IndexSet<String>,
    noparent: bool,
    per_file: Vec<PerFileRule>,
}

/// An owner grant scoped to files matching a glob within one directory.
#[derive(Debug)]
struct PerFileRule {
    owners: IndexSet<String>,
    /// Root-relative paths the glob expanded to at parse time.
    matched: IndexSet<String>,
}

/// Inheritance-aware mapping from file path to eligible owners.
///
/// OWNERS files are parsed lazily, one directory at a time, and both the
/// parsed entry and the resolved (inheritance-unioned) owner set are
/// memoized per directory. The memo is write-once and the database is
/// single-threaded, so interior mutability is enough.
///
/// All file and directory arguments are `/`-separated paths relative to the
/// root; the empty string names the root directory itself.
#[derive(Debug)]
pub struct OwnersDatabase<F: FileSystem> {
    fs: F,
    root: PathBuf,
    dirs: RefCell<IndexMap<String, Rc<DirEntry>>>,
    resolved: RefCell<IndexMap<String, Rc<IndexMap<String, usize>>>>,
    comments: RefCell<IndexMap<String, Vec<OwnerComment>>>,
}

fn parent_of(path: &str) -> Option<&str> {
    match path {
        "" => None,
        _ => Some(path.rsplit_once('/').map_or("", |(parent, _)| parent)),
    }
}

impl<F: FileSystem> OwnersDatabase<F> {
    pub fn new(fs: F, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
            dirs: RefCell::default(),
            resolved: RefCell::default(),
            comments: RefCell::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_exists(&self, file: &str) -> bool {
        self.fs.exists(&self.join(file))
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.fs.is_dir(&self.join(path))
    }

    /// Parse the OWNERS files along every directory chain covering `files`.
    ///
    /// This is the only bulk-loading entry point; nothing outside the
    /// ancestor chains of the given files is ever read.
    pub fn load_data_needed_for<'a, I>(&self, files: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for file in files {
            let mut dir = parent_of(file).unwrap_or("");
            loop {
                self.dir_entry(dir)?;
                match parent_of(dir) {
                    Some(parent) => dir = parent,
                    None => break,
                }
            }
        }
        Ok(())
    }

    /// Eligible owners of `file` with their distance from it: owners
    /// declared in the file's own directory (or granted by a matching
    /// per-file rule there) have distance 1, each step up the tree adds 1.
    ///
    /// The walk stops after the first `set noparent` directory. Insertion
    /// order is nearest-directory-first, declaration order within a
    /// directory.
    pub fn possible_owners(&self, file: &str) -> Result<IndexMap<String, usize>> {
        let dir = parent_of(file).unwrap_or("");
        let entry = self.dir_entry(dir)?;

        let mut result = IndexMap::new();
        for rule in &entry.per_file {
            if rule.matched.contains(file) {
                for owner in &rule.owners {
                    result.entry(owner.clone()).or_insert(1);
                }
            }
        }
        for (owner, depth) in self.resolved(dir)?.iter() {
            result.entry(owner.clone()).or_insert(depth + 1);
        }
        Ok(result)
    }

    /// The set of owner identifiers permitted to approve `file`. Empty is
    /// legal: the file is unowned.
    pub fn owners_for(&self, file: &str) -> Result<IndexSet<String>> {
        Ok(self.possible_owners(file)?.into_keys().collect())
    }

    /// Every owner identifier seen in any parsed OWNERS file, wildcard
    /// excluded.
    pub fn all_owners(&self) -> IndexSet<String> {
        let mut result = IndexSet::new();
        for entry in self.dirs.borrow().values() {
            result.extend(entry.owners.iter().cloned());
            for rule in &entry.per_file {
                result.extend(rule.owners.iter().cloned());
            }
        }
        result.shift_remove(EVERYONE);
        result
    }

    /// Comments attached to `owner`, in declaration order.
    pub fn comments_for(&self, owner: &str) -> Vec<OwnerComment> {
        self.comments
            .borrow()
            .get(owner)
            .cloned()
            .unwrap_or_default()
    }

    fn join(&self, relative: &str) -> PathBuf {
        if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }

    fn relative(&self, path: &str) -> Option<String> {
        Path::new(path)
            .strip_prefix(&self.root)
            .ok()
            .map(|rel| rel.to_string_lossy().replace('\\', "/"))
    }

    fn dir_entry(&self, dir: &str) -> Result<Rc<DirEntry>> {
        if let Some(entry) = self.dirs.borrow().get(dir) {
            return Ok(Rc::clone(entry));
        }

        let path = self.join(dir).join(OWNERS_FILE_NAME);
        let entry = if self.fs.exists(&path) {
            debug!(directory = dir, "parsing OWNERS file");
            let text = self.fs.read_file(&path)?;
            self.parse(dir, &path, &text)?
        } else {
            DirEntry::default()
        };

        let entry = Rc::new(entry);
        self.dirs
            .borrow_mut()
            .insert(dir.to_string(), Rc::clone(&entry));
        Ok(entry)
    }

    /// Resolved owner set of a directory: its own owners at depth 0 unioned
    /// with the parent's resolved set one level further out, unless the
    /// directory declared `set noparent`. Memoized per directory.
    fn resolved(&self, dir: &str) -> Result<Rc<IndexMap<String, usize>>> {
        if let Some(map) = self.resolved.borrow().get(dir) {
            return Ok(Rc::clone(map));
        }

        let entry = self.dir_entry(dir)?;
        let mut map: IndexMap<String, usize> =
            entry.owners.iter().map(|owner| (owner.clone(), 0)).collect();
        if !entry.noparent {
            if let Some(parent) = parent_of(dir) {
                for (owner, depth) in self.resolved(parent)?.iter() {
                    map.entry(owner.clone()).or_insert(depth + 1);
                }
            }
        }

        let map = Rc::new(map);
        self.resolved
            .borrow_mut()
            .insert(dir.to_string(), Rc::clone(&map));
        Ok(map)
    }

    fn parse(&self, dir: &str, path: &Path, text: &str) -> Result<DirEntry> {
        let mut entry = DirEntry::default();
        let mut current_comment: Option<String> = None;

        for (index, raw) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(comment) = line.strip_prefix('#') {
                current_comment = Some(comment.trim().to_string());
                continue;
            }
            if line == "set noparent" {
                entry.noparent = true;
                continue;
            }
            if let Some(rest) = line.strip_prefix("per-file ") {
                let rule = self.parse_per_file(dir, path, line_number, rest)?;
                if let Some(text) = &current_comment {
                    for owner in &rule.owners {
                        self.record_comment(owner, dir, text.clone());
                    }
                }
                entry.per_file.push(rule);
                continue;
            }

            let (owner_part, inline_comment) = match line.split_once('#') {
                Some((owner, comment)) => (owner.trim(), Some(comment.trim().to_string())),
                None => (line, None),
            };
            let owner = self.validate_owner(owner_part, path, line_number)?;
            if owner != EVERYONE {
                if let Some(text) = inline_comment.or_else(|| current_comment.clone()) {
                    self.record_comment(&owner, dir, text);
                }
            }
            entry.owners.insert(owner);
        }

        Ok(entry)
    }

    fn parse_per_file(
        &self,
        dir: &str,
        path: &Path,
        line_number: usize,
        rest: &str,
    ) -> Result<PerFileRule> {
        let (glob_part, owners_part) = rest.split_once(':').ok_or_else(|| OwnersError::Syntax {
            path: path.to_path_buf(),
            line: line_number,
            message: String::from("malformed per-file line, expected 'per-file <glob>: <owners>'"),
        })?;
        let glob_part = glob_part.trim();

        if glob_part.is_empty() || glob_part.contains('/') {
            return Err(OwnersError::Config(format!(
                "invalid per-file scope '{glob_part}' in {}: the glob must name direct children",
                path.display()
            )));
        }
        glob::Pattern::new(glob_part).map_err(|error| {
            OwnersError::Config(format!(
                "invalid per-file glob '{glob_part}' in {}: {error}",
                path.display()
            ))
        })?;

        let mut owners = IndexSet::new();
        for owner in owners_part.split(',') {
            owners.insert(self.validate_owner(owner.trim(), path, line_number)?);
        }

        let pattern = self.join(dir).join(glob_part);
        let matched = self
            .fs
            .glob(&pattern.to_string_lossy())
            .iter()
            .filter_map(|matched| self.relative(matched))
            .collect();

        Ok(PerFileRule { owners, matched })
    }

    fn validate_owner(&self, owner: &str, path: &Path, line_number: usize) -> Result<String> {
        if owner == EVERYONE || EMAIL.is_match(owner) {
            Ok(owner.to_string())
        } else {
            Err(OwnersError::Syntax {
                path: path.to_path_buf(),
                line: line_number,
                message: format!("'{owner}' is neither an email address nor the wildcard"),
            })
        }
    }

    fn record_comment(&self, owner: &str, dir: &str, text: String) {
        self.comments
            .borrow_mut()
            .entry(owner.to_string())
            .or_default()
            .push(OwnerComment {
                directory: dir.to_string(),
                text,
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use crate::{fixture, MemFileSystem};

    fn database(fs: MemFileSystem) -> OwnersDatabase<MemFileSystem> {
        OwnersDatabase::new(fs, "/")
    }

    fn owner_set(owners: &[&str]) -> IndexSet<String> {
        owners.iter().map(|owner| owner.to_string()).collect()
    }

    #[test]
    fn owners_union_up_the_tree() {
        let db = database(fixture::test_repo());

        assert_eq!(
            db.owners_for("chrome/browser/defaults.h").unwrap(),
            owner_set(&[
                fixture::BRETT,
                fixture::BEN,
                fixture::KEN,
                fixture::PETER,
                fixture::TOM
            ])
        );
        assert_eq!(
            db.owners_for("base/vlog.h").unwrap(),
            owner_set(&[fixture::KEN, fixture::PETER, fixture::TOM])
        );
    }

    #[test]
    fn noparent_stops_inheritance() {
        let db = database(fixture::test_repo());

        assert_eq!(
            db.owners_for("content/content.gyp").unwrap(),
            owner_set(&[fixture::JOHN, fixture::DARIN])
        );
        assert_eq!(
            db.owners_for("content/baz/ugly.cc").unwrap(),
            owner_set(&[fixture::BRETT, fixture::JOHN, fixture::DARIN])
        );
    }

    #[test]
    fn wildcard_is_an_owner_like_any_other() {
        let db = database(fixture::test_repo());

        let owners = db.owners_for("content/views/pie.h").unwrap();
        assert!(owners.contains(EVERYONE));
        assert!(owners.contains(fixture::BEN));
        assert!(owners.contains(fixture::JOHN));
        assert_eq!(owners.len(), 3);
    }

    #[test]
    fn distances_count_steps_from_the_file() {
        let db = database(fixture::test_repo());

        let possible = db.possible_owners("chrome/gpu/gpu_channel.h").unwrap();
        assert_eq!(possible[fixture::KEN], 1);
        assert_eq!(possible[fixture::BEN], 2);
        assert_eq!(possible[fixture::BRETT], 2);
        assert_eq!(possible[fixture::PETER], 3);
    }

    #[test]
    fn resolution_is_stable_across_repeated_calls() {
        let db = database(fixture::test_repo());

        let first = db.owners_for("chrome/renderer/gpu/gpu_channel_host.h").unwrap();
        let second = db.owners_for("chrome/renderer/gpu/gpu_channel_host.h").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unowned_file_resolves_to_the_empty_set() {
        let mut fs = MemFileSystem::new();
        fs.add_file("/orphan/lost.cc", "");
        let db = database(fs);

        assert_eq!(db.owners_for("orphan/lost.cc").unwrap(), IndexSet::new());
    }

    #[test]
    fn per_file_rule_scopes_owners_to_matching_files() {
        let mut fs = MemFileSystem::new();
        fs.add_file("/OWNERS", "ken@example.com\n");
        fs.add_file(
            "/lib/OWNERS",
            "per-file *.h: header@example.com\nbrett@example.com\n",
        );
        fs.add_file("/lib/api.h", "");
        fs.add_file("/lib/impl.cc", "");
        let db = database(fs);

        assert_eq!(
            db.owners_for("lib/api.h").unwrap(),
            owner_set(&["header@example.com", "brett@example.com", "ken@example.com"])
        );
        assert_eq!(
            db.owners_for("lib/impl.cc").unwrap(),
            owner_set(&["brett@example.com", "ken@example.com"])
        );
    }

    #[test]
    fn per_file_rule_accepts_a_comma_separated_owner_list() {
        let mut fs = MemFileSystem::new();
        fs.add_file(
            "/gpu/OWNERS",
            "per-file *.mojom: alice@example.com, bob@example.com\n",
        );
        fs.add_file("/gpu/channel.mojom", "");
        let db = database(fs);

        assert_eq!(
            db.owners_for("gpu/channel.mojom").unwrap(),
            owner_set(&["alice@example.com", "bob@example.com"])
        );
    }

    #[test]
    fn malformed_per_file_glob_is_a_config_error() {
        let mut fs = MemFileSystem::new();
        fs.add_file("/OWNERS", "per-file [: ken@example.com\n");
        fs.add_file("/x.cc", "");
        let db = database(fs);

        assert_matches!(db.owners_for("x.cc"), Err(OwnersError::Config(_)));
    }

    #[test]
    fn per_file_scope_may_not_cross_directories() {
        let mut fs = MemFileSystem::new();
        fs.add_file("/OWNERS", "per-file sub/*.h: ken@example.com\n");
        fs.add_file("/sub/x.h", "");
        let db = database(fs);

        assert_matches!(db.owners_for("sub/x.h"), Err(OwnersError::Config(_)));
    }

    #[test]
    fn malformed_owner_line_reports_file_and_line() {
        let mut fs = MemFileSystem::new();
        fs.add_file("/OWNERS", "ken@example.com\nnot an email\n");
        fs.add_file("/x.cc", "");
        let db = database(fs);

        let error = db.owners_for("x.cc").unwrap_err();
        assert_matches!(
            error,
            OwnersError::Syntax { line: 2, ref path, .. } if path.to_str() == Some("/OWNERS")
        );
    }

    #[test]
    fn file_comment_attaches_to_owners_declared_below_it() {
        let db = database(fixture::test_repo());
        db.load_data_needed_for(["content/content.gyp"]).unwrap();

        assert_eq!(
            db.comments_for(fixture::DARIN),
            vec![OwnerComment {
                directory: String::from("content"),
                text: String::from("foo"),
            }]
        );
        assert_eq!(
            db.comments_for(fixture::JOHN),
            vec![OwnerComment {
                directory: String::from("content"),
                text: String::from("foo"),
            }]
        );
    }

    #[test]
    fn inline_comment_attaches_to_its_owner_alone() {
        let mut fs = MemFileSystem::new();
        fs.add_file(
            "/OWNERS",
            "# team lead\nken@example.com # graphics only\npeter@example.com\n",
        );
        fs.add_file("/x.cc", "");
        let db = database(fs);
        db.load_data_needed_for(["x.cc"]).unwrap();

        assert_eq!(
            db.comments_for("ken@example.com"),
            vec![OwnerComment {
                directory: String::new(),
                text: String::from("graphics only"),
            }]
        );
        assert_eq!(
            db.comments_for("peter@example.com"),
            vec![OwnerComment {
                directory: String::new(),
                text: String::from("team lead"),
            }]
        );
    }

    #[test]
    fn all_owners_covers_every_parsed_directory() {
        let db = database(fixture::test_repo());
        db.load_data_needed_for(fixture::DEFAULT_FILES.iter().copied())
            .unwrap();

        let all = db.all_owners();
        for owner in [
            fixture::BEN,
            fixture::BRETT,
            fixture::DARIN,
            fixture::JOHN,
            fixture::KEN,
            fixture::PETER,
            fixture::TOM,
        ] {
            assert!(all.contains(owner), "missing {owner}");
        }
        assert!(!all.contains(EVERYONE));
    }
}
