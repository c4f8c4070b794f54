//! Process-wide table of last committed fighter coordinates.
//!
//! Every fighter actor holds an `Arc<PositionIndex>` and writes its own
//! coordinates after each committed move. Other actors read it to decide
//! whether the cell they are moving into is held by the fighter they are
//! tracking. Entries are never removed.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

/// Key of one coordinate, displayed as `{id}_x` or `{id}_y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexKey {
    pub id: i32,
    pub axis: Axis,
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.axis {
            Axis::X => "x",
            Axis::Y => "y",
        };
        write!(f, "{}_{}", self.id, suffix)
    }
}

#[derive(Debug, Default)]
pub struct PositionIndex {
    coords: RwLock<HashMap<IndexKey, i32>>,
}

impl PositionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites one coordinate. The lock is held only for the insert.
    pub fn set(&self, id: i32, axis: Axis, value: i32) {
        let mut coords = self.coords.write().unwrap_or_else(|e| e.into_inner());
        coords.insert(IndexKey { id, axis }, value);
    }

    /// Last value written for the key, or 0 if it was never written.
    pub fn get(&self, id: i32, axis: Axis) -> i32 {
        let coords = self.coords.read().unwrap_or_else(|e| e.into_inner());
        coords.get(&IndexKey { id, axis }).copied().unwrap_or(0)
    }

    pub fn set_position(&self, id: i32, x: i32, y: i32) {
        self.set(id, Axis::X, x);
        self.set(id, Axis::Y, y);
    }

    pub fn position(&self, id: i32) -> (i32, i32) {
        (self.get(id, Axis::X), self.get(id, Axis::Y))
    }

    /// True when fighter `id` was last recorded at `(x, y)`.
    pub fn is_occupied_by(&self, id: i32, x: i32, y: i32) -> bool {
        self.position(id) == (x, y)
    }

    pub fn len(&self) -> usize {
        self.coords.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
