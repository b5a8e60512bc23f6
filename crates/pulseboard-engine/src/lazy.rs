//! Batched rebuilds.
//!
//! Every topology edit runs inside a scope. Scopes nest through a depth
//! counter, and the arena is rebuilt when the outermost one closes, only
//! if the board was initialized and something changed inside it. At top
//! level each edit is its own scope, so it rebuilds immediately; a
//! [`BatchScope`] opened with [`RelayBoard::batch`] coalesces every edit
//! made through it into one rebuild.

use std::ops::{Deref, DerefMut};

use crate::board::RelayBoard;
use crate::error::BoardError;

/// Depth counter and dirty flag behind [`BatchScope`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LazyRebuild {
    depth: u32,
    dirty: bool,
}

impl LazyRebuild {
    /// Open a scope.
    pub fn enter(&mut self) {
        self.depth += 1;
    }

    /// Close a scope. Returns `true` when the outermost scope closed.
    pub fn exit(&mut self) -> bool {
        self.depth = self.depth.saturating_sub(1);
        self.depth == 0
    }

    /// Record a topology or callback change.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether a change is waiting for a rebuild.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Forget pending changes; a rebuild just happened.
    pub fn clear(&mut self) {
        self.dirty = false;
    }

    /// Number of open scopes.
    pub fn depth(&self) -> u32 {
        self.depth
    }
}

/// Scope guard that defers rebuilds until it closes.
///
/// Dereferences to the board, so edits are made through the guard:
///
/// ```
/// # use pulseboard_engine::{RelayBoard, BoardError};
/// # fn demo(board: &mut RelayBoard) -> Result<(), BoardError> {
/// let mut scope = board.batch();
/// // scope.connect(..), scope.disconnect(..), ...
/// scope.finish()
/// # }
/// ```
///
/// [`finish`](Self::finish) reports the rebuild result. Dropping the guard
/// instead (including during unwinding) still rebuilds and logs a failure.
#[must_use = "the rebuild runs when the scope is finished or dropped"]
pub struct BatchScope<'a> {
    board: &'a mut RelayBoard,
    closed: bool,
}

impl<'a> BatchScope<'a> {
    pub(crate) fn open(board: &'a mut RelayBoard) -> Self {
        board.lazy_mut().enter();
        Self {
            board,
            closed: false,
        }
    }

    /// Close the scope and return the rebuild result, if one ran.
    pub fn finish(mut self) -> Result<(), BoardError> {
        self.closed = true;
        self.board.close_scope()
    }
}

impl Deref for BatchScope<'_> {
    type Target = RelayBoard;

    fn deref(&self) -> &RelayBoard {
        self.board
    }
}

impl DerefMut for BatchScope<'_> {
    fn deref_mut(&mut self) -> &mut RelayBoard {
        self.board
    }
}

impl Drop for BatchScope<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(error) = self.board.close_scope() {
            tracing::error!(%error, "deferred rebuild failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_outermost_exit_reports() {
        let mut lazy = LazyRebuild::default();
        lazy.enter();
        lazy.enter();
        assert!(!lazy.exit());
        assert!(lazy.exit());
        assert_eq!(lazy.depth(), 0);
    }

    #[test]
    fn unbalanced_exit_saturates() {
        let mut lazy = LazyRebuild::default();
        assert!(lazy.exit());
        assert_eq!(lazy.depth(), 0);
    }

    #[test]
    fn dirty_flag_round_trip() {
        let mut lazy = LazyRebuild::default();
        assert!(!lazy.is_dirty());
        lazy.mark_dirty();
        assert!(lazy.is_dirty());
        lazy.clear();
        assert!(!lazy.is_dirty());
    }
}
