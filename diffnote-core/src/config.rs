//! User configuration for diffnote.
//!
//! Read from `$XDG_CONFIG_HOME/diffnote/config.toml` (or
//! `~/.config/diffnote/config.toml`). Every key is optional; a missing file
//! yields the defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Default location of the review database, relative to the repository root.
pub const DEFAULT_DATABASE: &str = ".diffnote/reviews.db";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite file. Relative paths are resolved against the repo root.
    pub database: PathBuf,
    /// Unified-diff context lines requested from the version-control collaborator.
    pub context_lines: u32,
    /// Whether untracked files show up as added entries in the working-tree diff.
    pub include_untracked: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            context_lines: 3,
            include_untracked: true,
        }
    }
}

/// Returns the path to the diffnote config file.
///
/// Prefers `$XDG_CONFIG_HOME/diffnote/config.toml`; falls back to
/// `~/.config/diffnote/config.toml` when the env var is absent.
pub fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
        .unwrap_or_else(|| PathBuf::from(".config"));
    base.join("diffnote").join("config.toml")
}

impl Config {
    /// Loads the config from [`config_path`].
    ///
    /// Never fails: a missing file gives the defaults, and a file that cannot be
    /// read or parsed is logged and ignored.
    pub fn load() -> Self {
        let path = config_path();
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("ignoring config: {e}");
                Self::default()
            }
        }
    }

    /// Loads the config from an explicit path. A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        Self::parse(&raw).map_err(|message| Error::Config {
            path: path.display().to_string(),
            message,
        })
    }

    fn parse(raw: &str) -> std::result::Result<Self, String> {
        toml::from_str(raw).map_err(|e| e.to_string())
    }

    /// Resolves the database path for a repository rooted at `repo_root`.
    pub fn database_path(&self, repo_root: &Path) -> PathBuf {
        if self.database.is_absolute() {
            self.database.clone()
        } else {
            repo_root.join(&self.database)
        }
    }
}
