//! Git implementation of [`diffnote_core::vcs::ChangeSource`].
//!
//! Diffs are computed by `git2` and rendered to unified-diff text with
//! `Diff::print`, so the rest of diffnote only ever sees plain patch text.
//! `git2::Repository` is `!Sync`; a `GitSource` should stay on the thread that
//! opened it.

use std::path::{Path, PathBuf};

use diffnote_core::config::Config;
use diffnote_core::vcs::{ChangeSource, DiffSnapshot};
use diffnote_core::{Error, Result};
use git2::{Diff, DiffFormat, DiffOptions, Repository};

/// Which comparison the working-tree diff is taken from.
///
/// The default is `Unstaged` (working directory vs index).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DiffMode {
    /// Working directory vs index (`git diff`).
    #[default]
    Unstaged,
    /// Index vs HEAD (`git diff --cached`).
    Staged,
    /// A base ref vs HEAD (`git diff <base>..HEAD`).
    Branch(String),
}

pub struct GitSource {
    repo: Repository,
    root: PathBuf,
    mode: DiffMode,
    context_lines: u32,
    include_untracked: bool,
}

impl GitSource {
    /// Opens the repository containing `path`, searching parent directories.
    ///
    /// # Errors
    ///
    /// Returns `Error::Git` if no repository is found or it is bare.
    pub fn discover(path: &Path, mode: DiffMode, config: &Config) -> Result<Self> {
        let repo = Repository::discover(path).map_err(Error::git)?;
        let root = repo
            .workdir()
            .ok_or_else(|| Error::Git("bare repositories have no working tree".to_owned()))?
            .to_path_buf();
        Ok(Self {
            repo,
            root,
            mode,
            context_lines: config.context_lines,
            include_untracked: config.include_untracked,
        })
    }

    pub fn mode(&self) -> &DiffMode {
        &self.mode
    }

    fn diff_options(&self) -> DiffOptions {
        let mut opts = DiffOptions::new();
        opts.context_lines(self.context_lines);
        if self.include_untracked && self.mode == DiffMode::Unstaged {
            opts.include_untracked(true)
                .recurse_untracked_dirs(true)
                .show_untracked_content(true);
        }
        opts
    }

    /// Obtains a git2::Diff for the configured mode.
    fn diff(&self) -> std::result::Result<Diff<'_>, git2::Error> {
        let mut opts = self.diff_options();
        match &self.mode {
            DiffMode::Unstaged => self.repo.diff_index_to_workdir(None, Some(&mut opts)),
            DiffMode::Staged => {
                let head_tree = match self.repo.head() {
                    Ok(head) => Some(head.peel_to_tree()?),
                    Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
                    Err(e) => return Err(e),
                };
                self.repo.diff_tree_to_index(head_tree.as_ref(), None, Some(&mut opts))
            }
            DiffMode::Branch(base) => {
                let base_tree = self.repo.revparse_single(base)?.peel_to_tree()?;
                let head_tree = self.repo.head()?.peel_to_tree()?;
                self.repo.diff_tree_to_tree(Some(&base_tree), Some(&head_tree), Some(&mut opts))
            }
        }
    }
}

/// Renders a git2::Diff as unified-diff text.
///
/// File and hunk header lines carry their full text in `content`; body lines
/// need their origin character put back in front.
fn diff_to_text(diff: &Diff<'_>) -> std::result::Result<String, git2::Error> {
    let mut text = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        if let origin @ ('+' | '-' | ' ') = line.origin() {
            text.push(origin);
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })?;
    Ok(text)
}

impl ChangeSource for GitSource {
    fn repo_root(&self) -> &Path {
        &self.root
    }

    fn current_commit(&self) -> Option<String> {
        let commit = self.repo.head().ok()?.peel_to_commit().ok()?;
        Some(commit.id().to_string())
    }

    fn combined_diff(&self) -> Result<DiffSnapshot> {
        let diff = self.diff().map_err(Error::git)?;
        let text = diff_to_text(&diff).map_err(Error::git)?;
        log::debug!(
            "collected {} bytes of {:?} diff from {}",
            text.len(),
            self.mode,
            self.root.display()
        );
        Ok(DiffSnapshot::new(text))
    }
}
