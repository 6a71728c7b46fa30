//! Unified diff parsing with contiguous row addressing.
//!
//! A file's diff is turned into a [`DiffFileModel`]: an ordered list of hunks
//! where every rendered line (context, addition, deletion) owns exactly one
//! 1-based row. Rows are contiguous across hunks, so `start_row` / `end_row` can
//! be used directly as cursor coordinates and as lookup keys for comments.
//!
//! Parsing never fails from the caller's point of view: empty or malformed text
//! degrades to an empty model.

use std::sync::LazyLock;

use regex::Regex;

/// One `@@` block of a single file's diff, with its row range in the file model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    /// Old-side lines elided between the previous hunk and this one. Informational.
    pub skip_before: u32,
    /// Rendered lines in this hunk (context + added + removed).
    pub line_count: usize,
    /// First row of this hunk, 1-based.
    pub start_row: usize,
    /// Last row of this hunk, inclusive. `start_row - 1` for a hunk with no lines.
    pub end_row: usize,
    /// Self-contained hunk text with a synthetic file header, re-renderable alone.
    pub diff_string: String,
}

/// Parsed, row-addressed view of one file's diff. Rebuilt whenever the text changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffFileModel {
    pub hunks: Vec<DiffHunk>,
    pub total_rows: usize,
}

impl DiffFileModel {
    /// Returns the index of the hunk whose row range contains `row`.
    pub fn hunk_index_for_row(&self, row: usize) -> Option<usize> {
        self.hunks
            .iter()
            .position(|h| h.line_count > 0 && row >= h.start_row && row <= h.end_row)
    }

    /// Returns `(start_row, end_row)` of the hunk at `index`.
    pub fn hunk_row_range(&self, index: usize) -> Option<(usize, usize)> {
        self.hunks.get(index).map(|h| (h.start_row, h.end_row))
    }
}

/// A hunk as read from the text, before row numbers are assigned.
#[derive(Debug)]
struct RawHunk<'a> {
    old_start: u32,
    old_lines: u32,
    new_start: u32,
    new_lines: u32,
    lines: Vec<&'a str>,
}

#[derive(Debug)]
struct MalformedHeader(String);

/// Parses the diff text of exactly one file into a row-addressed model.
///
/// `file` is only used for the synthetic header of each hunk's `diff_string`.
pub fn parse_file_diff(content: &str, file: &str) -> DiffFileModel {
    if content.is_empty() {
        return DiffFileModel::default();
    }

    let parsed = match parse_hunks(content) {
        Ok(hunks) if hunks.is_empty() && !content.ends_with('\n') => {
            log::debug!("no hunks in {file}, retrying with trailing newline");
            let padded = format!("{content}\n");
            parse_hunks(&padded).map(|hunks| build_model(&hunks, file))
        }
        Ok(hunks) => Ok(build_model(&hunks, file)),
        Err(e) => Err(e),
    };

    match parsed {
        Ok(model) => model,
        Err(MalformedHeader(line)) => {
            log::debug!("malformed hunk header in {file}: {line:?}");
            DiffFileModel::default()
        }
    }
}

/// Parses `content` and returns the index of the hunk containing `row`.
pub fn get_hunk_index_for_row(content: &str, file: &str, row: usize) -> Option<usize> {
    parse_file_diff(content, file).hunk_index_for_row(row)
}

/// Parses `content` and returns the row range of hunk `hunk_index`.
pub fn get_hunk_row_range(
    content: &str,
    file: &str,
    hunk_index: usize,
) -> Option<(usize, usize)> {
    parse_file_diff(content, file).hunk_row_range(hunk_index)
}

/// Reads the hunk list.
///
/// An unterminated trailing header is kept only if it parses and an earlier
/// hunk was already read. A header that fails to parse there may have been cut
/// off mid-line and is dropped. The first hunk's header must be
/// newline-terminated; [`parse_file_diff`] retries with a newline appended.
fn parse_hunks(content: &str) -> Result<Vec<RawHunk<'_>>, MalformedHeader> {
    let mut hunks: Vec<RawHunk<'_>> = Vec::new();
    let mut current: Option<RawHunk<'_>> = None;

    for raw in content.split_inclusive('\n') {
        let terminated = raw.ends_with('\n');
        let line = raw.trim_end_matches('\n').trim_end_matches('\r');

        if line.starts_with("@@") {
            let (old_start, old_lines, new_start, new_lines) = match parse_hunk_header(line) {
                Some(header) if terminated || current.is_some() || !hunks.is_empty() => header,
                None if terminated => return Err(MalformedHeader(line.to_owned())),
                _ => break,
            };
            if let Some(h) = current.take() {
                hunks.push(h);
            }
            current = Some(RawHunk {
                old_start,
                old_lines,
                new_start,
                new_lines,
                lines: Vec::new(),
            });
        } else if line.starts_with("diff ") {
            if let Some(h) = current.take() {
                hunks.push(h);
            }
        } else if let Some(h) = current.as_mut() {
            h.lines.push(line);
        }
    }
    if let Some(h) = current.take() {
        hunks.push(h);
    }

    Ok(hunks)
}

fn build_model(raw: &[RawHunk<'_>], file: &str) -> DiffFileModel {
    let mut hunks = Vec::with_capacity(raw.len());
    let mut row = 1usize;
    let mut prev_old_end: Option<u32> = None;

    for h in raw {
        let skip_before = match prev_old_end {
            None => h.old_start.saturating_sub(1),
            Some(end) => h.old_start.saturating_sub(end),
        };
        prev_old_end = Some(h.old_start.saturating_add(h.old_lines));

        let line_count = h.lines.iter().filter(|l| is_rendered_line(l)).count();
        let start_row = row;
        row += line_count;

        hunks.push(DiffHunk {
            old_start: h.old_start,
            old_lines: h.old_lines,
            new_start: h.new_start,
            new_lines: h.new_lines,
            skip_before,
            line_count,
            start_row,
            end_row: row - 1,
            diff_string: hunk_diff_string(h, file),
        });
    }

    DiffFileModel {
        hunks,
        total_rows: row - 1,
    }
}

fn is_rendered_line(line: &str) -> bool {
    matches!(line.as_bytes().first(), Some(b' ' | b'+' | b'-'))
}

fn hunk_diff_string(h: &RawHunk<'_>, file: &str) -> String {
    let mut out = format!(
        "diff --git a/{file} b/{file}\n--- a/{file}\n+++ b/{file}\n@@ -{},{} +{},{} @@\n",
        h.old_start, h.old_lines, h.new_start, h.new_lines
    );
    for line in &h.lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Parses `@@ -old_start[,old_lines] +new_start[,new_lines] @@ [section]`.
///
/// An omitted count means one line.
pub fn parse_hunk_header(line: &str) -> Option<(u32, u32, u32, u32)> {
    let rest = line.strip_prefix("@@ ")?;
    let (ranges, _section) = rest.split_once(" @@")?;
    let (old, new) = ranges.split_once(' ')?;
    let (old_start, old_lines) = parse_range(old.strip_prefix('-')?)?;
    let (new_start, new_lines) = parse_range(new.strip_prefix('+')?)?;
    Some((old_start, old_lines, new_start, new_lines))
}

fn parse_range(range: &str) -> Option<(u32, u32)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

/// Change classification of a file entry in a multi-file diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Deleted,
    Modified,
}

/// One file's slice of a multi-file diff blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchEntry {
    /// Repository-relative path with `a/` / `b/` prefixes stripped.
    pub path: String,
    /// The file's diff text, starting at its `diff --git` header.
    pub content: String,
    pub is_new: bool,
    pub is_deleted: bool,
}

impl PatchEntry {
    pub fn status(&self) -> FileStatus {
        if self.is_new {
            FileStatus::Added
        } else if self.is_deleted {
            FileStatus::Deleted
        } else {
            FileStatus::Modified
        }
    }
}

static GIT_HEADER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^diff --git a/(.+?) b/(.+)$").ok());

const DEV_NULL: &str = "/dev/null";

/// Splits a multi-file diff on `diff --git` boundaries into per-file entries.
///
/// Entries whose path cannot be resolved are dropped. Text without any
/// `diff --git` header is treated as a single plain unified diff.
pub fn parse_patch_entries(content: &str) -> Vec<PatchEntry> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    for raw in content.split_inclusive('\n') {
        if raw.starts_with("diff --git ") {
            if let Some(chunk) = current.take() {
                chunks.push(chunk);
            }
            current = Some(String::new());
        }
        if let Some(chunk) = current.as_mut() {
            chunk.push_str(raw);
        }
    }
    if let Some(chunk) = current.take() {
        chunks.push(chunk);
    }
    if chunks.is_empty() && !content.trim().is_empty() {
        chunks.push(content.to_owned());
    }

    chunks.into_iter().filter_map(entry_from_chunk).collect()
}

fn entry_from_chunk(chunk: String) -> Option<PatchEntry> {
    let mut old_name: Option<&str> = None;
    let mut new_name: Option<&str> = None;
    let mut new_mode = false;
    let mut deleted_mode = false;

    for line in chunk.lines() {
        if line.starts_with("@@") {
            break;
        }
        if let Some(name) = line.strip_prefix("--- ") {
            old_name = Some(strip_side_prefix(name, "a/"));
        } else if let Some(name) = line.strip_prefix("+++ ") {
            new_name = Some(strip_side_prefix(name, "b/"));
        } else if line.starts_with("new file mode") {
            new_mode = true;
        } else if line.starts_with("deleted file mode") {
            deleted_mode = true;
        }
    }

    let is_new = new_mode || old_name == Some(DEV_NULL);
    let is_deleted = deleted_mode || new_name == Some(DEV_NULL);

    let structural = new_name
        .filter(|n| *n != DEV_NULL)
        .or(old_name.filter(|n| *n != DEV_NULL))
        .map(str::to_owned);
    let path = structural.or_else(|| path_from_git_header(&chunk))?;
    if path.is_empty() {
        return None;
    }

    Some(PatchEntry {
        path,
        content: chunk,
        is_new,
        is_deleted,
    })
}

/// Strips the side prefix and any tab-separated timestamp from a `---`/`+++` name.
fn strip_side_prefix<'a>(name: &'a str, prefix: &str) -> &'a str {
    let name = name.split('\t').next().unwrap_or(name).trim_end();
    name.strip_prefix(prefix).unwrap_or(name)
}

fn path_from_git_header(chunk: &str) -> Option<String> {
    let header = chunk.lines().next()?;
    let re = GIT_HEADER.as_ref()?;
    let caps = re.captures(header)?;
    caps.get(2).map(|m| m.as_str().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_HUNKS: &str = "\
diff --git a/src/lib.rs b/src/lib.rs
index 1111111..2222222 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,2 +1,2 @@
 fn a() {}
-fn b() {}
+fn b() { todo() }
@@ -10,3 +10,3 @@ impl Foo {
 x
-y
+z
 w
";

    #[test]
    fn two_hunks_are_row_contiguous() {
        let model = parse_file_diff(TWO_HUNKS, "src/lib.rs");
        assert_eq!(model.hunks.len(), 2);
        let (a, b) = (&model.hunks[0], &model.hunks[1]);
        assert_eq!((a.start_row, a.end_row, a.line_count), (1, 3, 3));
        assert_eq!((b.start_row, b.end_row, b.line_count), (4, 7, 4));
        assert_eq!(model.total_rows, 7);
    }

    #[test]
    fn skip_before_measures_old_side_gap() {
        let model = parse_file_diff(TWO_HUNKS, "src/lib.rs");
        assert_eq!(model.hunks[0].skip_before, 0);
        // first hunk covers old lines 1..=2, second starts at 10
        assert_eq!(model.hunks[1].skip_before, 7);
    }

    #[test]
    fn diff_string_has_synthetic_header() {
        let model = parse_file_diff(TWO_HUNKS, "src/lib.rs");
        let expected = "\
diff --git a/src/lib.rs b/src/lib.rs
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -10,3 +10,3 @@
 x
-y
+z
 w
";
        assert_eq!(model.hunks[1].diff_string, expected);
    }

    #[test]
    fn empty_and_garbage_give_empty_model() {
        assert_eq!(parse_file_diff("", "f"), DiffFileModel::default());
        assert_eq!(parse_file_diff("not a diff at all\n", "f"), DiffFileModel::default());
        assert_eq!(parse_file_diff("@@ -x,1 +1 @@\n+a\n", "f"), DiffFileModel::default());
    }

    #[test]
    fn extreme_old_range_does_not_overflow() {
        let text = "@@ -4294967295,2 +1,2 @@\n-a\n+b\n@@ -4294967295,1 +9,1 @@\n x\n";
        let model = parse_file_diff(text, "f");
        assert_eq!(model.hunks.len(), 2);
        assert_eq!(model.hunks[0].skip_before, u32::MAX - 1);
        assert_eq!(model.hunks[1].skip_before, 0);
        assert_eq!(model.total_rows, 3);
    }

    #[test]
    fn unterminated_trailing_header_after_hunks_is_kept() {
        let model = parse_file_diff("@@ -1 +1 @@\n-a\n+b\n@@ -5 +5,0 @@", "f");
        assert_eq!(model.hunks.len(), 2);
        let h = &model.hunks[1];
        assert_eq!((h.old_start, h.old_lines, h.new_start, h.new_lines), (5, 1, 5, 0));
        assert_eq!(h.line_count, 0);
        assert_eq!(get_hunk_row_range("@@ -1 +1 @@\n-a\n+b\n@@ -5 +5,0 @@", "f", 1), Some((3, 2)));
    }

    #[test]
    fn cut_off_trailing_header_is_dropped() {
        let model = parse_file_diff("@@ -1 +1 @@\n-a\n+b\n@@ -5,3 +5", "f");
        assert_eq!(model.hunks.len(), 1);
        assert_eq!(model.total_rows, 2);
    }

    #[test]
    fn header_without_trailing_newline_is_retried() {
        let model = parse_file_diff("@@ -3 +3,2 @@", "f");
        assert_eq!(model.hunks.len(), 1);
        let h = &model.hunks[0];
        assert_eq!((h.old_start, h.old_lines, h.new_start, h.new_lines), (3, 1, 3, 2));
        assert_eq!(h.line_count, 0);
        assert_eq!(model.total_rows, 0);
    }

    #[test]
    fn last_line_without_newline_still_counts() {
        let model = parse_file_diff("@@ -1 +1 @@\n-a\n+b", "f");
        assert_eq!(model.total_rows, 2);
    }

    #[test]
    fn no_newline_marker_does_not_consume_a_row() {
        let text = "@@ -1 +1 @@\n-a\n\\ No newline at end of file\n+b\n";
        let model = parse_file_diff(text, "f");
        assert_eq!(model.hunks[0].line_count, 2);
        assert!(model.hunks[0].diff_string.contains("\\ No newline at end of file"));
    }

    #[test]
    fn row_lookup() {
        assert_eq!(get_hunk_index_for_row(TWO_HUNKS, "f", 1), Some(0));
        assert_eq!(get_hunk_index_for_row(TWO_HUNKS, "f", 3), Some(0));
        assert_eq!(get_hunk_index_for_row(TWO_HUNKS, "f", 4), Some(1));
        assert_eq!(get_hunk_index_for_row(TWO_HUNKS, "f", 8), None);
        assert_eq!(get_hunk_index_for_row(TWO_HUNKS, "f", 0), None);
        assert_eq!(get_hunk_row_range(TWO_HUNKS, "f", 1), Some((4, 7)));
        assert_eq!(get_hunk_row_range(TWO_HUNKS, "f", 2), None);
    }

    #[test]
    fn hunk_header_forms() {
        assert_eq!(parse_hunk_header("@@ -1,5 +1,7 @@"), Some((1, 5, 1, 7)));
        assert_eq!(parse_hunk_header("@@ -4 +4,0 @@ fn main() {"), Some((4, 1, 4, 0)));
        assert_eq!(parse_hunk_header("@@ bogus @@"), None);
    }

    const MULTI: &str = "\
diff --git a/README.md b/README.md
--- a/README.md
+++ b/README.md
@@ -1 +1 @@
-old
+new
diff --git a/src/new.rs b/src/new.rs
new file mode 100644
index 0000000..3333333
--- /dev/null
+++ b/src/new.rs
@@ -0,0 +1 @@
+fn new() {}
diff --git a/src/gone.rs b/src/gone.rs
deleted file mode 100644
--- a/src/gone.rs
+++ /dev/null
@@ -1 +0,0 @@
-fn gone() {}
diff --git a/bin/tool b/bin/tool
old mode 100644
new mode 100755
";

    #[test]
    fn patch_entries_split_and_classify() {
        let entries = parse_patch_entries(MULTI);
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["README.md", "src/new.rs", "src/gone.rs", "bin/tool"]);
        assert_eq!(entries[0].status(), FileStatus::Modified);
        assert_eq!(entries[1].status(), FileStatus::Added);
        assert_eq!(entries[2].status(), FileStatus::Deleted);
        assert_eq!(entries[3].status(), FileStatus::Modified);
        assert!(entries[1].content.starts_with("diff --git a/src/new.rs"));
        assert!(!entries[0].content.contains("src/new.rs"));
    }

    #[test]
    fn patch_entry_content_parses_as_file_diff() {
        let entries = parse_patch_entries(MULTI);
        let model = parse_file_diff(&entries[1].content, &entries[1].path);
        assert_eq!(model.total_rows, 1);
    }

    #[test]
    fn plain_unified_diff_without_git_header() {
        let text = "--- a/notes.txt\t2024-01-01\n\
                    +++ b/notes.txt\t2024-01-02\n\
                    @@ -1 +1 @@\n-a\n+b\n";
        let entries = parse_patch_entries(text);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "notes.txt");
    }

    #[test]
    fn empty_blob_has_no_entries() {
        assert!(parse_patch_entries("").is_empty());
    }
}
