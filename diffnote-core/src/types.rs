use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::diff::DiffFileModel;
use crate::selection::{HunkSelections, LineRange, LineSelections};

/// A working-tree root. Unique on `path`; created on first reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repo {
    pub id: i64,
    pub path: String,
}

/// "Reviewing repo X at commit Y". Unique on `(repo_id, commit_sha)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub id: i64,
    pub repo_id: i64,
    pub commit_sha: String,
    pub name: Option<String>,
    pub created_at: i64,      // Unix timestamp seconds
}

/// A content-addressed snapshot of a review's full diff.
///
/// `seq` starts at 0 per review and increases with each distinct `content`;
/// identical content always maps back to the same row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub id: i64,
    pub review_id: i64,
    pub seq: i64,
    pub hash: String,
    pub content: String,
    pub created_at: i64,
}

/// Links an externally stored note to a patch version and an optional selection.
///
/// `note_id` points into a different store and is not checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewComment {
    pub id: i64,
    pub review_id: i64,
    pub patch_id: Option<i64>,
    pub note_id: i64,
    pub selections: Option<SelectionPayload>,
    pub created_at: i64,
}

/// Selection stored with a comment: hunk indices and/or line ranges per file.
///
/// Either side may be absent. Serialized as
/// `{"hunks": {"<file>": [0, 2]}, "lines": {"<file>": [[4, 9]]}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hunks: Option<BTreeMap<String, Vec<usize>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<BTreeMap<String, Vec<LineRange>>>,
}

impl SelectionPayload {
    /// Snapshots both stores. An empty store leaves its side `None`.
    pub fn from_stores(hunks: &HunkSelections, lines: &LineSelections) -> Self {
        let hunks: Option<BTreeMap<String, Vec<usize>>> = (!hunks.is_empty()).then(|| {
            hunks
                .iter()
                .map(|(file, set)| (file.to_owned(), set.iter().copied().collect()))
                .collect()
        });
        let lines: Option<BTreeMap<String, Vec<LineRange>>> = (!lines.is_empty()).then(|| {
            lines
                .iter()
                .map(|(file, ranges)| (file.to_owned(), ranges.to_vec()))
                .collect()
        });
        Self { hunks, lines }
    }

    /// Rebuilds in-memory stores, e.g. to edit the selection of an existing comment.
    pub fn to_stores(&self) -> (HunkSelections, LineSelections) {
        let mut hunk_store = HunkSelections::new();
        for (file, indices) in self.hunks.iter().flatten() {
            for &idx in indices {
                hunk_store = hunk_store.add(file, idx);
            }
        }
        let mut line_store = LineSelections::new();
        for (file, ranges) in self.lines.iter().flatten() {
            for r in ranges {
                line_store = line_store.add(file, r.start_line, r.end_line);
            }
        }
        (hunk_store, line_store)
    }

    pub fn is_empty(&self) -> bool {
        self.hunks.as_ref().is_none_or(BTreeMap::is_empty)
            && self.lines.as_ref().is_none_or(BTreeMap::is_empty)
    }

    /// Whether this selection touches rows `[start_row, end_row]` of `file`.
    ///
    /// Hunk indices are resolved through `model`; line ranges are 0-based
    /// rendered lines, so line `n` is row `n + 1`.
    pub fn overlaps_rows(
        &self,
        file: &str,
        model: &DiffFileModel,
        start_row: usize,
        end_row: usize,
    ) -> bool {
        let hunk_hit = self
            .hunks
            .as_ref()
            .and_then(|m| m.get(file))
            .is_some_and(|indices| {
                indices.iter().any(|&idx| {
                    model
                        .hunk_row_range(idx)
                        .is_some_and(|(s, e)| s <= end_row && start_row <= e)
                })
            });
        let line_hit = self
            .lines
            .as_ref()
            .and_then(|m| m.get(file))
            .is_some_and(|ranges| {
                ranges.iter().any(|r| {
                    r.overlaps(start_row.saturating_sub(1), end_row.saturating_sub(1))
                })
            });
        hunk_hit || line_hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_sides_are_omitted_from_json() {
        let payload = SelectionPayload::from_stores(
            &HunkSelections::new().add("a.rs", 2).add("a.rs", 0),
            &LineSelections::new(),
        );
        assert!(payload.lines.is_none());
        assert_eq!(serde_json::to_string(&payload).unwrap(), r#"{"hunks":{"a.rs":[0,2]}}"#);

        let parsed: SelectionPayload = serde_json::from_str("{}").unwrap();
        assert!(parsed.is_empty());
        assert_eq!(parsed, SelectionPayload::default());
    }

    #[test]
    fn overlap_ignores_other_files_and_missing_hunks() {
        let model = crate::diff::parse_file_diff("@@ -1 +1 @@\n-a\n+b\n", "a.rs");
        let payload = SelectionPayload::from_stores(
            &HunkSelections::new().add("a.rs", 5),
            &LineSelections::new().add("b.rs", 0, 0),
        );
        assert!(!payload.overlaps_rows("a.rs", &model, 1, 2));
        assert!(payload.overlaps_rows("b.rs", &model, 1, 1));
    }
}
