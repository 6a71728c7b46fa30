//! Hunk-mode selections: file path → set of selected hunk indices.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

type FileMap = BTreeMap<String, Arc<BTreeSet<usize>>>;

/// Immutable mapping from file path to the hunk indices selected in that file.
///
/// A file never maps to an empty set; the key is removed instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HunkSelections {
    files: Arc<FileMap>,
}

impl HunkSelections {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when both values are the same instance (no mutation happened between them).
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.files, &other.files)
    }

    pub fn is_selected(&self, file: &str, idx: usize) -> bool {
        self.files.get(file).is_some_and(|set| set.contains(&idx))
    }

    /// Flips membership of `idx` in `file`'s selection.
    pub fn toggle(&self, file: &str, idx: usize) -> Self {
        if self.is_selected(file, idx) {
            self.remove(file, idx)
        } else {
            self.add(file, idx)
        }
    }

    /// Selects `idx`. Returns the same instance if it was already selected.
    pub fn add(&self, file: &str, idx: usize) -> Self {
        if self.is_selected(file, idx) {
            return self.clone();
        }
        let mut set = self.files.get(file).map(|s| (**s).clone()).unwrap_or_default();
        set.insert(idx);
        self.with_file(file, set)
    }

    /// Deselects `idx`. Returns the same instance if it was not selected.
    pub fn remove(&self, file: &str, idx: usize) -> Self {
        let Some(current) = self.files.get(file) else {
            return self.clone();
        };
        if !current.contains(&idx) {
            return self.clone();
        }
        let mut set = (**current).clone();
        set.remove(&idx);
        self.with_file(file, set)
    }

    /// Drops every selection in `file`. Returns the same instance if there were none.
    pub fn clear(&self, file: &str) -> Self {
        if !self.files.contains_key(file) {
            return self.clone();
        }
        self.with_file(file, BTreeSet::new())
    }

    /// Total selected hunks across all files.
    pub fn count(&self) -> usize {
        self.files.values().map(|s| s.len()).sum()
    }

    pub fn count_for_file(&self, file: &str) -> usize {
        self.files.get(file).map_or(0, |s| s.len())
    }

    pub fn selected_indices(&self, file: &str) -> BTreeSet<usize> {
        self.files.get(file).map(|s| (**s).clone()).unwrap_or_default()
    }

    pub fn has_any(&self, file: &str) -> bool {
        self.files.contains_key(file)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Files with at least one selected hunk, in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<usize>)> {
        self.files.iter().map(|(k, v)| (k.as_str(), &**v))
    }

    fn with_file(&self, file: &str, set: BTreeSet<usize>) -> Self {
        let mut files = (*self.files).clone();
        if set.is_empty() {
            files.remove(file);
        } else {
            files.insert(file.to_owned(), Arc::new(set));
        }
        Self { files: Arc::new(files) }
    }
}
