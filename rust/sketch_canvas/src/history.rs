//! Undo/Redo History
//!
//! Two stacks of full-canvas snapshots. The top of the undo stack always
//! mirrors what is on the canvas: committing pushes the state just drawn,
//! undo moves the top over to the redo stack, redo moves it back.

use crate::canvas::Snapshot;

/// Undo entries kept when no explicit limit is configured
pub const DEFAULT_HISTORY_LIMIT: usize = 64;

#[derive(Debug, Clone)]
pub struct History {
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
    /// Maximum undo entries, `None` for unbounded
    limit: Option<usize>,
}

impl History {
    /// `limit` of zero means unbounded
    pub fn new(limit: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            limit: (limit > 0).then_some(limit),
        }
    }

    /// Record a new state. Everything that could be redone is discarded, and
    /// the oldest entry is evicted once the limit is exceeded.
    pub fn commit(&mut self, snapshot: Snapshot) {
        self.redo.clear();
        self.undo.push(snapshot);
        if let Some(limit) = self.limit {
            if self.undo.len() > limit {
                let excess = self.undo.len() - limit;
                self.undo.drain(..excess);
                log::debug!("History limit {} reached, evicted {} oldest", limit, excess);
            }
        }
    }

    /// Step back. Returns the snapshot the canvas should now show, or `None`
    /// when there was nothing to undo.
    ///
    /// Undoing the last remaining entry moves it to the redo stack and keeps
    /// it on screen, since there is no older state to show.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        let top = self.undo.pop()?;
        self.redo.push(top);
        Some(self.undo.last().unwrap_or_else(|| &self.redo[self.redo.len() - 1]))
    }

    /// Step forward. Returns the snapshot the canvas should now show.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        let next = self.redo.pop()?;
        self.undo.push(next);
        self.undo.last()
    }

    /// Drop both stacks
    pub fn reset(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Total bytes held by both stacks
    pub fn byte_size(&self) -> usize {
        self.undo.iter().chain(&self.redo).map(Snapshot::byte_size).sum()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
