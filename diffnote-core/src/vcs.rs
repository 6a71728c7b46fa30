//! Interface to the version-control collaborator that produces diff text.
//!
//! This crate never computes diffs itself. An implementation (see the
//! `diffnote-git` crate) hands over unified-diff text, and everything else
//! in the crate works from that text.

use std::path::Path;

use crate::diff::PatchEntry;
use crate::error::Result;
use crate::hash::content_hash;

/// The full combined diff of a working tree at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSnapshot {
    pub content: String,
    pub hash: String,
}

impl DiffSnapshot {
    pub fn new(content: String) -> Self {
        let hash = content_hash(&content);
        Self { content, hash }
    }
}

pub trait ChangeSource {
    /// Root of the working tree.
    fn repo_root(&self) -> &Path;

    /// Commit the working tree is based on, or `None` for an unborn branch.
    fn current_commit(&self) -> Option<String>;

    /// The combined diff of all changed files.
    fn combined_diff(&self) -> Result<DiffSnapshot>;

    /// Changed files, each with its own slice of the diff text.
    fn changed_files(&self) -> Result<Vec<PatchEntry>> {
        let snapshot = self.combined_diff()?;
        Ok(crate::diff::parse_patch_entries(&snapshot.content))
    }
}
