//! File tree for the changed-files panel.
//!
//! A flat list of changed files is turned into a sorted directory forest
//! ([`build_file_tree`]) and then flattened into display rows
//! ([`flatten_tree`]). Runs of single-child directories are collapsed into one
//! row (`packages/cli/src`) so deep but narrow paths don't waste indentation.
//!
//! Two index spaces coexist: `entry_index` is a position in the caller's
//! original entry list, while a display index is a position in the flattened
//! rows. [`get_file_indices`] and [`find_display_index`] convert between them.

use std::cmp::Ordering;

use crate::diff::PatchEntry;

/// Anything that can be placed in the tree.
pub trait TreeEntry {
    fn path(&self) -> &str;
    fn is_new(&self) -> bool;
}

impl TreeEntry for PatchEntry {
    fn path(&self) -> &str {
        &self.path
    }

    fn is_new(&self) -> bool {
        self.is_new
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Added,
    Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Dir,
    File { status: NodeStatus, entry_index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTreeNode {
    /// Path segment of this node.
    pub name: String,
    /// Full path from the root, `/`-separated.
    pub path: String,
    pub kind: NodeKind,
    /// Always empty for files. Sorted directories-first, then by name.
    pub children: Vec<FileTreeNode>,
}

impl FileTreeNode {
    fn dir(name: &str, path: String) -> Self {
        Self {
            name: name.to_owned(),
            path,
            kind: NodeKind::Dir,
            children: Vec::new(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Dir
    }
}

/// One flattened row. A collapsed directory chain has a `/`-joined `name`
/// and the `path` of the deepest directory in the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayItem {
    pub name: String,
    pub path: String,
    pub kind: NodeKind,
    pub depth: usize,
}

impl DisplayItem {
    pub fn entry_index(&self) -> Option<usize> {
        match self.kind {
            NodeKind::File { entry_index, .. } => Some(entry_index),
            NodeKind::Dir => None,
        }
    }
}

/// Builds a sorted forest from `entries`, remembering each file's original index.
pub fn build_file_tree<E: TreeEntry>(entries: &[E]) -> Vec<FileTreeNode> {
    let mut forest: Vec<FileTreeNode> = Vec::new();

    for (entry_index, entry) in entries.iter().enumerate() {
        let segments: Vec<&str> = entry.path().split('/').filter(|s| !s.is_empty()).collect();
        let Some((file_name, dirs)) = segments.split_last() else {
            continue;
        };

        let mut level = &mut forest;
        let mut prefix = String::new();
        for seg in dirs {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(seg);
            let pos = match level.iter().position(|n| n.is_dir() && n.name == *seg) {
                Some(pos) => pos,
                None => {
                    level.push(FileTreeNode::dir(seg, prefix.clone()));
                    level.len() - 1
                }
            };
            level = &mut level[pos].children;
        }

        let status = if entry.is_new() { NodeStatus::Added } else { NodeStatus::Modified };
        let path = if prefix.is_empty() {
            (*file_name).to_owned()
        } else {
            format!("{prefix}/{file_name}")
        };
        level.push(FileTreeNode {
            name: (*file_name).to_owned(),
            path,
            kind: NodeKind::File {
                status,
                entry_index,
            },
            children: Vec::new(),
        });
    }

    sort_forest(&mut forest);
    forest
}

fn sort_forest(forest: &mut Vec<FileTreeNode>) {
    let mut pending: Vec<&mut Vec<FileTreeNode>> = vec![forest];
    while let Some(level) = pending.pop() {
        level.sort_by(compare_nodes);
        pending.extend(level.iter_mut().map(|n| &mut n.children));
    }
}

fn compare_nodes(a: &FileTreeNode, b: &FileTreeNode) -> Ordering {
    b.is_dir().cmp(&a.is_dir()).then_with(|| a.name.cmp(&b.name))
}

/// Flattens the forest in pre-order, collapsing single-child directory chains.
pub fn flatten_tree(forest: &[FileTreeNode]) -> Vec<DisplayItem> {
    let mut items = Vec::new();
    let mut stack: Vec<(&FileTreeNode, usize)> = forest.iter().rev().map(|n| (n, 0)).collect();

    while let Some((node, depth)) = stack.pop() {
        if !node.is_dir() {
            items.push(DisplayItem {
                name: node.name.clone(),
                path: node.path.clone(),
                kind: node.kind,
                depth,
            });
            continue;
        }

        let mut name = node.name.clone();
        let mut tail = node;
        while let [only] = tail.children.as_slice() {
            if !only.is_dir() {
                break;
            }
            name.push('/');
            name.push_str(&only.name);
            tail = only;
        }

        items.push(DisplayItem {
            name,
            path: tail.path.clone(),
            kind: NodeKind::Dir,
            depth,
        });
        stack.extend(tail.children.iter().rev().map(|n| (n, depth + 1)));
    }

    items
}

/// Original entry indices of the file rows, in display order.
pub fn get_file_indices(items: &[DisplayItem]) -> Vec<usize> {
    items.iter().filter_map(DisplayItem::entry_index).collect()
}

/// Display row of the file with original index `entry_index`.
pub fn find_display_index(items: &[DisplayItem], entry_index: usize) -> Option<usize> {
    items.iter().position(|item| item.entry_index() == Some(entry_index))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Entry(&'static str, bool);

    impl TreeEntry for Entry {
        fn path(&self) -> &str {
            self.0
        }
        fn is_new(&self) -> bool {
            self.1
        }
    }

    fn entries(paths: &[&'static str]) -> Vec<Entry> {
        paths.iter().map(|p| Entry(*p, false)).collect()
    }

    fn rows(items: &[DisplayItem]) -> Vec<(&str, usize)> {
        items.iter().map(|i| (i.name.as_str(), i.depth)).collect()
    }

    #[test]
    fn single_chain_collapses_fully() {
        let items = flatten_tree(&build_file_tree(&entries(&["packages/cli/src/index.ts"])));
        assert_eq!(rows(&items), [("packages/cli/src", 0), ("index.ts", 1)]);
        assert_eq!(items[0].path, "packages/cli/src");
        assert_eq!(items[0].kind, NodeKind::Dir);
        assert_eq!(items[1].path, "packages/cli/src/index.ts");
    }

    #[test]
    fn branching_directory_is_not_collapsed() {
        let forest = build_file_tree(&entries(&[
            "packages/cli/src/index.ts",
            "packages/core/src/store.ts",
        ]));
        let items = flatten_tree(&forest);
        assert_eq!(
            rows(&items),
            [
                ("packages", 0),
                ("cli/src", 1),
                ("index.ts", 2),
                ("core/src", 1),
                ("store.ts", 2),
            ]
        );
    }

    #[test]
    fn chain_stops_at_file_child() {
        let items = flatten_tree(&build_file_tree(&entries(&["a/b/c.rs", "a/b/d/e.rs"])));
        assert_eq!(rows(&items), [("a/b", 0), ("d", 1), ("e.rs", 2), ("c.rs", 1)]);
    }

    #[test]
    fn directories_sort_before_files() {
        let forest = build_file_tree(&entries(&["zeta.rs", "src/lib.rs", "alpha.rs", "docs/x.md"]));
        let names: Vec<&str> = forest.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["docs", "src", "alpha.rs", "zeta.rs"]);
    }

    #[test]
    fn file_indices_follow_display_order() {
        let list = entries(&["README.md", "src/index.ts", "src/utils.ts"]);
        let items = flatten_tree(&build_file_tree(&list));
        assert_eq!(get_file_indices(&items), [1, 2, 0]);
        assert_eq!(find_display_index(&items, 0), Some(3));
        assert_eq!(find_display_index(&items, 1), Some(1));
        assert_eq!(find_display_index(&items, 9), None);
    }

    #[test]
    fn status_reflects_new_entries() {
        let list = vec![Entry("new.rs", true), Entry("old.rs", false)];
        let forest = build_file_tree(&list);
        assert_eq!(
            forest[0].kind,
            NodeKind::File {
                status: NodeStatus::Added,
                entry_index: 0
            }
        );
        assert_eq!(
            forest[1].kind,
            NodeKind::File {
                status: NodeStatus::Modified,
                entry_index: 1
            }
        );
    }

    #[test]
    fn empty_paths_are_skipped() {
        let forest = build_file_tree(&entries(&["", "/", "a//b.rs"]));
        let items = flatten_tree(&forest);
        assert_eq!(rows(&items), [("a", 0), ("b.rs", 1)]);
        assert_eq!(items[1].path, "a/b.rs");
    }

    #[test]
    fn works_with_patch_entries() {
        let blob = "\
diff --git a/src/a.rs b/src/a.rs
--- /dev/null
+++ b/src/a.rs
@@ -0,0 +1 @@
+x
";
        let parsed = crate::diff::parse_patch_entries(blob);
        let items = flatten_tree(&build_file_tree(&parsed));
        assert_eq!(
            items[1].kind,
            NodeKind::File {
                status: NodeStatus::Added,
                entry_index: 0
            }
        );
    }
}
