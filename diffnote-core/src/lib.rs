//! Core of the diffnote review engine.
//!
//! Turns unified-diff text into an addressable hunk model, tracks which hunks or
//! line ranges a reviewer has marked, builds the collapsible file tree shown next
//! to the diff, and persists review comments against content-addressed patch
//! snapshots in a local SQLite store.
//!
//! Everything except the `db` module is pure and synchronous: the functions are
//! meant to be called from a UI event loop once per keystroke.

pub mod config;
pub mod cursor;
pub mod db;
pub mod diff;
pub mod error;
pub mod hash;
pub mod schema;
pub mod selection;
pub mod tree;
pub mod types;
pub mod vcs;

pub use error::{Error, Result};
