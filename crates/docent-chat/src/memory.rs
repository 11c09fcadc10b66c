//! Ordered, append-only log of conversation turns.

use docent_core::types::Turn;

/// A session's conversation log.
///
/// Append is the only mutation besides `clear`; turns are never reordered
/// or deduplicated. Both conversation contexts read from the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    turns: Vec<Turn>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a turn at the end.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// The last `min(n, len)` turns, earliest first.
    pub fn window(&self, n: usize) -> Vec<Turn> {
        let start = self.turns.len().saturating_sub(n);
        self.turns[start..].to_vec()
    }

    /// Drop every turn. Idempotent.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// The full log, earliest first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
