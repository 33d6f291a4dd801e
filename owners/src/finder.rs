use std::path::PathBuf;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::{
    database::{OwnersDatabase, EVERYONE},
    error::{OwnersError, Result},
    file_system::FileSystem,
};

/// One structured output emission: either a flat line or a header with an
/// indented block. The presentation layer renders color and indentation;
/// it never reorders or rewrites events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    Line(String),
    Block { header: String, lines: Vec<String> },
}

impl OutputEvent {
    fn line(text: impl Into<String>) -> Self {
        OutputEvent::Line(text.into())
    }
}

/// Interactive reviewer-selection engine.
///
/// Owns an [`OwnersDatabase`] plus the working set of files of interest and
/// walks a caller through picking a covering set of owners. All session
/// mutation happens inside [`select_owner`](Self::select_owner),
/// [`deselect_owner`](Self::deselect_owner) and [`reset`](Self::reset).
///
/// Candidate owners are kept in a queue ordered by proximity: for every
/// working file, owners declared in the file's own directory count distance
/// 1 and each directory further up adds 1; an owner approving `n` files at
/// total distance `d` scores `d / n^1.75`, lower first. Ties keep discovery
/// order (files in input order, nearest directory first), which makes the
/// queue deterministic. The queue is never re-scored after construction;
/// selection and deselection only remove entries.
#[derive(Debug)]
pub struct OwnersFinder<F: FileSystem> {
    db: OwnersDatabase<F>,
    files: Vec<String>,
    unowned_files: Vec<String>,
    all_owners: IndexSet<String>,
    owners_to_files: IndexMap<String, IndexSet<String>>,
    files_to_owners: IndexMap<String, IndexSet<String>>,
    initial_queue: Vec<String>,
    owners_queue: Vec<String>,
    unreviewed_files: IndexSet<String>,
    selected_owners: IndexSet<String>,
    deselected_owners: IndexSet<String>,
    reviewed_by: IndexMap<String, String>,
    output: Vec<OutputEvent>,
}

impl<F: FileSystem> OwnersFinder<F> {
    /// Build a database over `fs` rooted at `root` and construct a finder
    /// for `files` (paths relative to the root).
    ///
    /// `author`, when given, bootstraps self-approval exclusion: files the
    /// author may approve need no further reviewer and are dropped from the
    /// working set.
    pub fn new(
        fs: F,
        root: impl Into<PathBuf>,
        files: Vec<String>,
        author: Option<&str>,
    ) -> Result<Self> {
        Self::with_database(OwnersDatabase::new(fs, root), files, author)
    }

    pub fn with_database(
        db: OwnersDatabase<F>,
        files: Vec<String>,
        author: Option<&str>,
    ) -> Result<Self> {
        for file in &files {
            if !db.file_exists(file) {
                return Err(OwnersError::Config(format!(
                    "file of interest not found under {}: {file}",
                    db.root().display()
                )));
            }
            if db.is_dir(file) {
                return Err(OwnersError::Config(format!(
                    "expected a file, got a directory: {file}"
                )));
            }
        }
        db.load_data_needed_for(files.iter().map(String::as_str))?;

        let mut working = Vec::new();
        let mut unowned_files = Vec::new();
        let mut owners_to_files: IndexMap<String, IndexSet<String>> = IndexMap::new();
        let mut files_to_owners: IndexMap<String, IndexSet<String>> = IndexMap::new();
        let mut distances: IndexMap<String, Vec<usize>> = IndexMap::new();

        for file in &files {
            let possible = db.possible_owners(file)?;
            if possible.is_empty() {
                unowned_files.push(file.clone());
                continue;
            }
            if possible.contains_key(EVERYONE) {
                // Anyone may approve; no reviewer needs to be found.
                continue;
            }
            if author.is_some_and(|author| possible.contains_key(author)) {
                continue;
            }
            for (owner, distance) in &possible {
                owners_to_files
                    .entry(owner.clone())
                    .or_default()
                    .insert(file.clone());
                distances.entry(owner.clone()).or_default().push(*distance);
            }
            files_to_owners.insert(file.clone(), possible.into_keys().collect());
            working.push(file.clone());
        }

        let scores: IndexMap<String, f64> = distances
            .iter()
            .map(|(owner, distances)| {
                let total: usize = distances.iter().sum();
                let count = distances.len() as f64;
                (owner.clone(), total as f64 / count.powf(1.75))
            })
            .collect();
        let mut queue: Vec<String> = owners_to_files.keys().cloned().collect();
        queue.sort_by(|a, b| scores[a.as_str()].total_cmp(&scores[b.as_str()]));
        debug!(candidates = queue.len(), files = working.len(), "owners queue built");

        let mut finder = Self {
            all_owners: db.all_owners(),
            db,
            files: working,
            unowned_files,
            owners_to_files,
            files_to_owners,
            initial_queue: queue.clone(),
            owners_queue: queue,
            unreviewed_files: IndexSet::new(),
            selected_owners: IndexSet::new(),
            deselected_owners: IndexSet::new(),
            reviewed_by: IndexMap::new(),
            output: Vec::new(),
        };
        finder.reset();
        Ok(finder)
    }

    /// Restore the session to its post-construction state. Does not touch
    /// the file system or the output buffer.
    pub fn reset(&mut self) {
        self.owners_queue = self.initial_queue.clone();
        self.unreviewed_files = self.files.iter().cloned().collect();
        self.selected_owners.clear();
        self.deselected_owners.clear();
        self.reviewed_by.clear();
    }

    /// Accept `owner` as a reviewer.
    ///
    /// Covers every unreviewed file the owner may approve, recomputes the
    /// credit map, then auto-deselects queued owners whose entire remaining
    /// coverage is now redundant. Rejected whole (state untouched) if the
    /// owner is unknown or already decided.
    pub fn select_owner(&mut self, owner: &str) -> Result<()> {
        self.ensure_undecided(owner)?;
        self.apply_select(owner);
        Ok(())
    }

    /// Reject `owner` as a reviewer.
    ///
    /// Files already covered by other selected owners stay covered. Any
    /// still-unreviewed file left with exactly one undecided candidate
    /// forces that candidate to be selected, cascading with the full
    /// selection semantics.
    pub fn deselect_owner(&mut self, owner: &str) -> Result<()> {
        self.ensure_undecided(owner)?;
        self.apply_deselect(owner);
        Ok(())
    }

    /// Emit `"<path> [<owner-count>]"` for a single file.
    pub fn print_file_info(&mut self, file: &str) -> Result<()> {
        let owners = self.db.owners_for(file)?;
        self.output
            .push(OutputEvent::line(format!("{file} [{}]", owners.len())));
        Ok(())
    }

    /// Emit the file path followed by an indented, lexicographically sorted
    /// list of every eligible owner.
    pub fn print_file_info_detailed(&mut self, file: &str) -> Result<()> {
        let mut owners: Vec<String> = self.db.owners_for(file)?.into_iter().collect();
        owners.sort();
        self.output.push(OutputEvent::Block {
            header: file.to_string(),
            lines: owners,
        });
        Ok(())
    }

    /// Emit every comment attached to `owner`, in declaration order.
    pub fn print_comments(&mut self, owner: &str) {
        let comments = self.db.comments_for(owner);
        if comments.is_empty() {
            self.output
                .push(OutputEvent::line(format!("{owner} has no comments")));
        } else {
            self.output.push(OutputEvent::Block {
                header: format!("{owner} is commented as:"),
                lines: comments
                    .iter()
                    .map(|comment| {
                        let directory = if comment.directory.is_empty() {
                            "<root>"
                        } else {
                            &comment.directory
                        };
                        format!("{} (at {})", comment.text, directory)
                    })
                    .collect(),
            });
        }
    }

    /// Review is complete once nothing is unreviewed or no queued owner can
    /// still contribute.
    pub fn is_complete(&self) -> bool {
        self.unreviewed_files.is_empty()
            || self
                .owners_queue
                .iter()
                .all(|owner| self.remaining_coverage(owner) == 0)
    }

    /// Unreviewed files `owner` could still approve.
    pub fn remaining_coverage(&self, owner: &str) -> usize {
        self.owners_to_files
            .get(owner)
            .map(|files| files.intersection(&self.unreviewed_files).count())
            .unwrap_or(0)
    }

    pub fn owners_queue(&self) -> &[String] {
        &self.owners_queue
    }

    pub fn unreviewed_files(&self) -> &IndexSet<String> {
        &self.unreviewed_files
    }

    pub fn selected_owners(&self) -> &IndexSet<String> {
        &self.selected_owners
    }

    pub fn deselected_owners(&self) -> &IndexSet<String> {
        &self.deselected_owners
    }

    pub fn reviewed_by(&self) -> &IndexMap<String, String> {
        &self.reviewed_by
    }

    /// Eligible owners per working file.
    pub fn files_to_owners(&self) -> &IndexMap<String, IndexSet<String>> {
        &self.files_to_owners
    }

    /// Files of interest that have no eligible owner at all.
    pub fn unowned_files(&self) -> &[String] {
        &self.unowned_files
    }

    pub fn all_owners(&self) -> &IndexSet<String> {
        &self.all_owners
    }

    pub fn output(&self) -> &[OutputEvent] {
        &self.output
    }

    /// Drain the buffered output events.
    pub fn take_output(&mut self) -> Vec<OutputEvent> {
        std::mem::take(&mut self.output)
    }

    fn ensure_undecided(&self, owner: &str) -> Result<()> {
        if !self.all_owners.contains(owner) {
            return Err(OwnersError::Precondition(format!("unknown owner: {owner}")));
        }
        if self.selected_owners.contains(owner) {
            return Err(OwnersError::Precondition(format!(
                "owner already selected: {owner}"
            )));
        }
        if self.deselected_owners.contains(owner) {
            return Err(OwnersError::Precondition(format!(
                "owner already deselected: {owner}"
            )));
        }
        Ok(())
    }

    fn apply_select(&mut self, owner: &str) {
        self.owners_queue.retain(|queued| queued != owner);
        self.selected_owners.insert(owner.to_string());
        self.output
            .push(OutputEvent::line(format!("Selected: {owner}")));

        if let Some(files) = self.owners_to_files.get(owner) {
            for file in files {
                self.unreviewed_files.shift_remove(file);
            }
        }
        self.recompute_reviewed_by();

        // Implied redundancy: selecting a superset owner auto-rejects
        // queued owners with nothing left to contribute, in queue order.
        let redundant: Vec<String> = self
            .owners_queue
            .iter()
            .filter(|&queued| self.remaining_coverage(queued) == 0)
            .cloned()
            .collect();
        for other in redundant {
            self.owners_queue.retain(|queued| queued != &other);
            self.deselected_owners.insert(other.clone());
            self.output
                .push(OutputEvent::line(format!("Deselected: {other}")));
        }
    }

    fn apply_deselect(&mut self, owner: &str) {
        self.owners_queue.retain(|queued| queued != owner);
        self.deselected_owners.insert(owner.to_string());
        self.output
            .push(OutputEvent::line(format!("Deselected: {owner}")));

        // A file down to a single undecided candidate makes that candidate
        // mandatory. Each forced selection shrinks the undecided set, so
        // the loop terminates.
        loop {
            let forced = self.unreviewed_files.iter().find_map(|file| {
                let mut candidates = self.files_to_owners[file.as_str()]
                    .iter()
                    .filter(|candidate| {
                        !self.selected_owners.contains(*candidate)
                            && !self.deselected_owners.contains(*candidate)
                    });
                match (candidates.next(), candidates.next()) {
                    (Some(only), None) => Some(only.clone()),
                    _ => None,
                }
            });
            match forced {
                Some(mandatory) => self.apply_select(&mandatory),
                None => break,
            }
        }
    }

    /// Deterministic credit assignment, recomputed from scratch: each
    /// covered file is credited to the earliest owner in the initial queue
    /// order among all selected owners able to approve it. A pure function
    /// of the selected set, so the answer is independent of the order in
    /// which selections were made.
    fn recompute_reviewed_by(&mut self) {
        self.reviewed_by.clear();
        for file in &self.files {
            let eligible = &self.files_to_owners[file.as_str()];
            if let Some(credited) = self
                .initial_queue
                .iter()
                .find(|owner| self.selected_owners.contains(*owner) && eligible.contains(*owner))
            {
                self.reviewed_by.insert(file.clone(), credited.clone());
            }
        }
    }
}
