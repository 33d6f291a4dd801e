//! OWNERS-file parsing and reviewer selection.
//!
//! [`OwnersDatabase`] lazily parses the OWNERS files of a repository tree
//! and answers ownership queries; [`OwnersFinder`] drives an interactive
//! session that narrows a set of changed files down to a covering set of
//! reviewers. File access goes through the [`FileSystem`] trait so tests
//! can run against an in-memory tree.

mod database;
mod error;
mod file_system;
mod finder;

// The shared test helpers live in the `test_utils` crate, which depends on
// this crate. Depending on `test_utils` back from here would make cargo build
// `owners` twice and split `FileSystem` into two distinct traits, so the
// helper sources are compiled directly into the test build instead.
#[cfg(test)]
extern crate self as owners;

#[cfg(test)]
#[path = "../../test_utils/src/mem_file_system.rs"]
mod mem_file_system;

#[cfg(test)]
#[path = "../../test_utils/src/fixture.rs"]
pub mod fixture;

#[cfg(test)]
pub use mem_file_system::MemFileSystem;

pub use database::{OwnerComment, OwnersDatabase, EVERYONE};
pub use error::{OwnersError, Result};
pub use file_system::{FileSystem, OsFileSystem};
pub use finder::{OutputEvent, OwnersFinder};
