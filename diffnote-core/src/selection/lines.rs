//! Line-mode selections: file path → ranges of 0-based rendered lines.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Inclusive range of 0-based rendered lines. Serialized as `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(usize, usize)", into = "(usize, usize)")]
pub struct LineRange {
    pub start_line: usize,
    pub end_line: usize,
}

impl LineRange {
    /// Builds a range, swapping the bounds if they arrive reversed.
    pub fn new(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line: start_line.min(end_line),
            end_line: start_line.max(end_line),
        }
    }

    pub fn contains(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    /// True when this range shares at least one line with `[start, end]`.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start_line <= end && start <= self.end_line
    }
}

impl From<(usize, usize)> for LineRange {
    fn from((start, end): (usize, usize)) -> Self {
        Self::new(start, end)
    }
}

impl From<LineRange> for (usize, usize) {
    fn from(r: LineRange) -> Self {
        (r.start_line, r.end_line)
    }
}

type FileMap = BTreeMap<String, Arc<Vec<LineRange>>>;

/// Immutable mapping from file path to the line ranges selected in that file.
///
/// Ranges keep insertion order and are never merged or deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineSelections {
    files: Arc<FileMap>,
}

impl LineSelections {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when both values are the same instance (no mutation happened between them).
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.files, &other.files)
    }

    /// Appends a range to `file`. Always produces a new value.
    pub fn add(&self, file: &str, start_line: usize, end_line: usize) -> Self {
        let mut ranges = self.files.get(file).map(|r| (**r).clone()).unwrap_or_default();
        ranges.push(LineRange::new(start_line, end_line));
        let mut files = (*self.files).clone();
        files.insert(file.to_owned(), Arc::new(ranges));
        Self { files: Arc::new(files) }
    }

    /// Drops all ranges in `file`. Returns the same instance if there were none.
    pub fn clear(&self, file: &str) -> Self {
        if !self.files.contains_key(file) {
            return self.clone();
        }
        let mut files = (*self.files).clone();
        files.remove(file);
        Self { files: Arc::new(files) }
    }

    /// Drops every range in every file. Returns the same instance if already empty.
    pub fn clear_all(&self) -> Self {
        if self.files.is_empty() {
            return self.clone();
        }
        Self::default()
    }

    /// Total ranges across all files.
    pub fn count(&self) -> usize {
        self.files.values().map(|r| r.len()).sum()
    }

    pub fn count_for_file(&self, file: &str) -> usize {
        self.files.get(file).map_or(0, |r| r.len())
    }

    /// Ranges for `file` in insertion order.
    pub fn selections_for_file(&self, file: &str) -> &[LineRange] {
        self.files.get(file).map(|r| r.as_slice()).unwrap_or(&[])
    }

    pub fn has_any(&self, file: &str) -> bool {
        self.files.contains_key(file)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[LineRange])> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}
