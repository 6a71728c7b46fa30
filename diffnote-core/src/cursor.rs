//! Line-selection cursor for a single file.
//!
//! The cursor is a 0-based, inclusive line range over the rendered lines of one
//! file's diff. Plain moves collapse it to a single line; shift-moves extend it.
//! Extending up contracts from the bottom first, so shift-down N times followed
//! by shift-up N times lands back on the original anchor.

/// Inclusive 0-based line range. Always `start <= end`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn single(line: usize) -> Self {
        Self {
            start: line,
            end: line,
        }
    }

    pub fn line_count(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, line: usize) -> bool {
        line >= self.start && line <= self.end
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorState {
    pub selection: Selection,
    /// When false, the cursor moves between hunks and `selection` is ignored.
    pub line_mode: bool,
    pub total_lines: usize,
}

impl CursorState {
    /// Starts a cursor on line 0 of a file with `total_lines` rendered lines.
    pub fn new(total_lines: usize) -> Self {
        Self {
            selection: Selection::default(),
            line_mode: false,
            total_lines,
        }
    }

    fn last_line(&self) -> usize {
        self.total_lines.saturating_sub(1)
    }

    fn clamp(&self, line: usize) -> usize {
        line.min(self.last_line())
    }
}

pub fn toggle_line_mode(state: CursorState) -> CursorState {
    CursorState {
        line_mode: !state.line_mode,
        ..state
    }
}

/// Moves down one line, or with `extend` grows the range downward.
pub fn move_down(state: CursorState, extend: bool) -> CursorState {
    let Selection { start, end } = state.selection;
    let next = state.clamp(end + 1);
    let selection = if extend {
        Selection { start, end: next }
    } else {
        Selection::single(next)
    };
    CursorState { selection, ..state }
}

/// Moves up one line, or with `extend` contracts from the bottom until the
/// range is a single line and then grows it upward.
pub fn move_up(state: CursorState, extend: bool) -> CursorState {
    let Selection { start, end } = state.selection;
    let selection = if !extend {
        Selection::single(start.saturating_sub(1))
    } else if end > start {
        Selection {
            start,
            end: end - 1,
        }
    } else {
        Selection {
            start: start.saturating_sub(1),
            end,
        }
    };
    CursorState { selection, ..state }
}

/// Collapses the selection to `line`, clamped to the file.
pub fn reset_selection(state: CursorState, line: usize) -> CursorState {
    CursorState {
        selection: Selection::single(state.clamp(line)),
        ..state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: usize, total: usize) -> CursorState {
        CursorState {
            selection: Selection::single(line),
            line_mode: true,
            total_lines: total,
        }
    }

    #[test]
    fn extend_then_retract_returns_to_anchor() {
        let s = at(10, 50);
        let s = move_down(move_down(s, true), true);
        assert_eq!(s.selection, Selection { start: 10, end: 12 });
        let s = move_up(move_up(s, true), true);
        assert_eq!(s.selection, Selection { start: 10, end: 10 });
        let s = move_up(s, true);
        assert_eq!(s.selection, Selection { start: 9, end: 10 });
    }

    #[test]
    fn plain_moves_collapse() {
        let s = CursorState {
            selection: Selection { start: 3, end: 7 },
            line_mode: true,
            total_lines: 20,
        };
        assert_eq!(move_down(s, false).selection, Selection::single(8));
        assert_eq!(move_up(s, false).selection, Selection::single(2));
    }

    #[test]
    fn moves_clamp_to_bounds() {
        assert_eq!(move_down(at(4, 5), false).selection, Selection::single(4));
        assert_eq!(move_down(at(4, 5), true).selection, Selection::single(4));
        assert_eq!(move_up(at(0, 5), false).selection, Selection::single(0));
        assert_eq!(move_up(at(0, 5), true).selection, Selection::single(0));
    }

    #[test]
    fn empty_file_stays_on_line_zero() {
        let s = CursorState::new(0);
        assert_eq!(move_down(s, true).selection, Selection::single(0));
        assert_eq!(reset_selection(s, 9).selection, Selection::single(0));
    }

    #[test]
    fn reset_clamps() {
        let s = CursorState {
            selection: Selection { start: 1, end: 4 },
            line_mode: true,
            total_lines: 10,
        };
        assert_eq!(reset_selection(s, 6).selection, Selection::single(6));
        assert_eq!(reset_selection(s, 60).selection, Selection::single(9));
    }

    #[test]
    fn toggle_line_mode_keeps_selection() {
        let s = at(5, 10);
        let t = toggle_line_mode(s);
        assert!(!t.line_mode);
        assert_eq!(t.selection, s.selection);
        assert!(toggle_line_mode(t).line_mode);
    }

    #[test]
    fn selection_geometry() {
        let sel = Selection { start: 2, end: 4 };
        assert_eq!(sel.line_count(), 3);
        assert!(sel.contains(2) && sel.contains(4));
        assert!(!sel.contains(5));
    }
}
