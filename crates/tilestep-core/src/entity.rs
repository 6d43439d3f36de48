//! Generational handles for bodies living on a stage.
//!
//! An [`EntityId`] names one slot of the stage's body arena together with the
//! generation of that slot. Despawning bumps the slot's generation, so any
//! handle still held elsewhere (a solid-object set, a script) stops resolving
//! instead of silently pointing at whatever body reuses the slot.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A generational entity handle.
///
/// Ordering is by slot first, then generation. Stage iteration and
/// solid-object sets rely on this order being stable across runs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    slot: u32,
    generation: u32,
}

impl EntityId {
    /// Construct a handle for `slot` at `generation`.
    #[inline]
    pub fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// Arena slot this handle points at.
    #[inline]
    pub fn slot(self) -> u32 {
        self.slot
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.slot, self.generation)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.slot, self.generation)
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Hands out [`EntityId`]s and recycles the slots of despawned bodies.
///
/// Released slots wait in a FIFO queue, so a slot that was just freed is the
/// last one to be handed out again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityAllocator {
    generations: Vec<u32>,
    live: Vec<bool>,
    released: VecDeque<u32>,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot and return its handle.
    pub fn allocate(&mut self) -> EntityId {
        match self.released.pop_front() {
            Some(slot) => {
                self.live[slot as usize] = true;
                EntityId::new(slot, self.generations[slot as usize])
            }
            None => {
                let slot = self.generations.len() as u32;
                self.generations.push(0);
                self.live.push(true);
                EntityId::new(slot, 0)
            }
        }
    }

    /// Release the slot behind `id`.
    ///
    /// Returns `false` when `id` is already stale; the allocator is left
    /// untouched in that case.
    pub fn release(&mut self, id: EntityId) -> bool {
        if !self.is_live(id) {
            tracing::warn!(entity = %id, "release of stale entity id ignored");
            return false;
        }
        let slot = id.slot() as usize;
        self.live[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.released.push_back(id.slot());
        true
    }

    /// `true` when `id` names a live slot at its current generation.
    pub fn is_live(&self, id: EntityId) -> bool {
        let slot = id.slot() as usize;
        slot < self.generations.len()
            && self.live[slot]
            && self.generations[slot] == id.generation()
    }

    pub fn live_count(&self) -> usize {
        self.live.iter().filter(|&&live| live).count()
    }

    /// Number of slots ever created, live or released.
    pub fn capacity(&self) -> usize {
        self.generations.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
