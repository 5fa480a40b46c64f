use glam::IVec2;
use tracing::warn;

use crate::types::*;

/// Which script query produced a record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DebugHitboxKind {
    Touch,
    Box,
    Platform,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HitboxOwner {
    Entity(EntityId),
    Player(PlayerId),
}

/// One box for the renderer to outline this frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DebugHitbox {
    pub kind: DebugHitboxKind,
    pub owner: HitboxOwner,
    /// Whole-pixel world position of the owner.
    pub position: IVec2,
    /// Box relative to `position`.
    pub rect: Rect,
    /// Sides the query resolved against.
    pub sides: CollisionSides,
}

/// Per-frame, capacity-bounded list of query boxes. Recording the same box
/// twice returns the existing slot.
#[derive(Clone, Debug)]
pub struct DebugHitboxList {
    entries: Vec<DebugHitbox>,
    capacity: usize,
    overflowed: bool,
}

impl DebugHitboxList {
    pub fn new(capacity: usize) -> Self {
        Self { entries: Vec::new(), capacity, overflowed: false }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.overflowed = false;
    }

    /// Add a record, or find the identical one already present. `None` once
    /// the list is full.
    pub fn record(&mut self, kind: DebugHitboxKind, owner: HitboxOwner, position: IVec2, rect: Rect) -> Option<usize> {
        let same = |e: &DebugHitbox| e.kind == kind && e.owner == owner && e.position == position && e.rect == rect;
        if let Some(i) = self.entries.iter().position(same) {
            return Some(i);
        }
        if self.entries.len() >= self.capacity {
            if !self.overflowed {
                warn!(capacity = self.capacity, "debug hitbox list full, dropping entries this frame");
                self.overflowed = true;
            }
            return None;
        }
        self.entries.push(DebugHitbox { kind, owner, position, rect, sides: CollisionSides::empty() });
        Some(self.entries.len() - 1)
    }

    /// Mark sides on a record returned by [`Self::record`].
    pub fn mark(&mut self, index: usize, sides: CollisionSides) {
        if let Some(e) = self.entries.get_mut(index) {
            e.sides |= sides;
        }
    }

    pub fn entries(&self) -> &[DebugHitbox] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
