//! Reviewer selections, keyed by file path.
//!
//! Both stores are persistent values: every mutator takes `&self` and returns a
//! new store, leaving the input untouched. Untouched files share their entry with
//! the previous value, and a mutation that changes nothing returns a clone of the
//! same instance, so [`HunkSelections::ptr_eq`] / [`LineSelections::ptr_eq`] can
//! tell a caller whether a re-render is needed without a deep comparison.
//!
//! Selections are keyed by path, never by position in the file list: the list
//! is rebuilt on every refresh and positions shift.

pub mod hunks;
pub mod lines;

pub use hunks::HunkSelections;
pub use lines::{LineRange, LineSelections};
