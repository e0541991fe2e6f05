//! Git repository access.
//!
//! Revisions and diffs are read by shelling out to the `git` binary.

pub mod commit;

pub use commit::{commit_diff, head_revision};
