//! Stage snapshot and restore with BLAKE3 hashing.
//!
//! [`StageSnapshot`] captures the spatial and movement state of every body,
//! the entity allocator and the frame counter, plus a BLAKE3 hex digest of
//! that state. Two stages that were driven identically produce the same
//! digest, which makes snapshots the tool of choice for determinism checks.
//!
//! ```
//! use tilestep_engine::prelude::*;
//!
//! let grid = TileGrid::filled(32, 32, TileKind::Hollow);
//! let mut stage = Stage::new(grid, StageConfig::default());
//! let id = stage.spawn(Rect::new(2.0, 2.0, 4.0, 4.0));
//! stage.step_frame(&mut IgnoreTiles);
//!
//! let snapshot = stage.capture_snapshot();
//! assert_eq!(snapshot.hash.len(), 64);
//!
//! stage.try_step(id, Step::Down, 5).unwrap();
//! stage.step_frame(&mut IgnoreTiles);
//! assert_ne!(stage.state_hash(), snapshot.hash);
//!
//! stage.restore_from_snapshot(&snapshot).unwrap();
//! assert_eq!(stage.state_hash(), snapshot.hash);
//! assert_eq!(stage.frame_count(), 1);
//! ```
//!
//! # What Is NOT Serialized
//!
//! - **Tile listeners** (closures). A body that exists both in the stage and
//!   in the snapshot keeps its listeners across a restore; bodies recreated
//!   from the snapshot start with none.
//! - **Occupied categories**. Rebuilt at the next frame settle.
//! - **Terrain and configuration**. Owned by the caller.
//! - **Diagnostics**.

use std::collections::BTreeMap;

use serde::Serialize;
use tilestep_core::entity::{EntityAllocator, EntityId};
use tilestep_core::geometry::{Hitbox, Rect};
use tilestep_core::grid::Terrain;
use tracing::debug;

use crate::body::Body;
use crate::facing::{Direction, FacingMode};
use crate::stage::Stage;
use crate::EngineError;

// ---------------------------------------------------------------------------
// BodyState
// ---------------------------------------------------------------------------

/// Serializable part of a [`Body`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyState {
    pub rect: Rect,
    pub prev_x: f32,
    pub prev_y: f32,
    pub move_speed: f32,
    pub frozen: bool,
    pub halted: bool,
    pub triggerable: bool,
    pub hitbox: Hitbox,
    pub facing: Direction,
    pub facing_mode: FacingMode,
    pub manual_facing: bool,
    pub flip_x: bool,
    /// Solid-object set in ascending id order.
    pub solids: Vec<EntityId>,
}

impl BodyState {
    fn capture(body: &Body) -> Self {
        Self {
            rect: body.rect,
            prev_x: body.prev_x,
            prev_y: body.prev_y,
            move_speed: body.move_speed,
            frozen: body.frozen,
            halted: body.halted,
            triggerable: body.triggerable,
            hitbox: body.hitbox,
            facing: body.facing,
            facing_mode: body.facing_mode,
            manual_facing: body.manual_facing,
            flip_x: body.flip_x,
            solids: body.solids.iter().copied().collect(),
        }
    }

    fn apply(&self, body: &mut Body) {
        body.rect = self.rect;
        body.prev_x = self.prev_x;
        body.prev_y = self.prev_y;
        body.move_speed = self.move_speed;
        body.frozen = self.frozen;
        body.halted = self.halted;
        body.triggerable = self.triggerable;
        body.hitbox = self.hitbox;
        body.facing = self.facing;
        body.facing_mode = self.facing_mode;
        body.manual_facing = self.manual_facing;
        body.flip_x = self.flip_x;
        body.solids = self.solids.iter().copied().collect();
        body.occupied.clear();
    }
}

// ---------------------------------------------------------------------------
// StageSnapshot
// ---------------------------------------------------------------------------

/// An in-memory snapshot of a stage's bodies.
#[derive(Debug, Clone, Serialize)]
pub struct StageSnapshot {
    /// Frames settled at the time of capture.
    pub frame_counter: u64,
    /// Entity slot and generation bookkeeping.
    pub allocator: EntityAllocator,
    /// Every live body, in ascending id order.
    pub bodies: Vec<(EntityId, BodyState)>,
    /// BLAKE3 hex digest (64 lowercase hex chars) of the fields above.
    pub hash: String,
}

impl StageSnapshot {
    /// Recompute the digest and compare it with the stored one.
    pub fn verify(&self) -> Result<(), EngineError> {
        let actual = compute_hash(self.frame_counter, &self.allocator, &self.bodies);
        if actual != self.hash {
            return Err(EngineError::SnapshotHashMismatch {
                expected: self.hash.clone(),
                actual,
            });
        }
        Ok(())
    }
}

fn compute_hash(frame_counter: u64, allocator: &EntityAllocator, bodies: &[(EntityId, BodyState)]) -> String {
    #[derive(Serialize)]
    struct HashableState<'a> {
        frame_counter: u64,
        allocator: &'a EntityAllocator,
        bodies: &'a [(EntityId, BodyState)],
    }

    let hashable = HashableState {
        frame_counter,
        allocator,
        bodies,
    };
    let json_bytes = serde_json::to_vec(&hashable).expect("stage state is plain data and always serializes");
    blake3::hash(&json_bytes).to_hex().to_string()
}

// ---------------------------------------------------------------------------
// Stage snapshot/restore methods
// ---------------------------------------------------------------------------

impl<T: Terrain> Stage<T> {
    pub fn capture_snapshot(&self) -> StageSnapshot {
        let bodies: Vec<_> = self
            .bodies
            .iter()
            .map(|(id, body)| (*id, BodyState::capture(body)))
            .collect();
        let hash = compute_hash(self.frame_counter, &self.allocator, &bodies);
        StageSnapshot {
            frame_counter: self.frame_counter,
            allocator: self.allocator.clone(),
            bodies,
            hash,
        }
    }

    /// Digest of the current state, equal to `capture_snapshot().hash`.
    pub fn state_hash(&self) -> String {
        self.capture_snapshot().hash
    }

    /// Roll the stage back to `snapshot`.
    ///
    /// The digest is verified first; on mismatch the stage is left
    /// untouched. Bodies absent from the snapshot are removed.
    pub fn restore_from_snapshot(&mut self, snapshot: &StageSnapshot) -> Result<(), EngineError> {
        snapshot.verify()?;

        let mut previous: BTreeMap<EntityId, Body> = std::mem::take(&mut self.bodies);
        for (id, state) in &snapshot.bodies {
            let mut body = previous.remove(id).unwrap_or_else(|| Body::new(state.rect));
            state.apply(&mut body);
            self.bodies.insert(*id, body);
        }
        self.allocator = snapshot.allocator.clone();
        self.frame_counter = snapshot.frame_counter;

        debug!(
            frame = snapshot.frame_counter,
            bodies = self.bodies.len(),
            dropped = previous.len(),
            "restored stage snapshot"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
