//! tilestep engine -- movement, collision and tile interaction for grid platformers.
//!
//! This crate builds on [`tilestep_core`] to provide the per-frame
//! simulation: [`Body`](body::Body) state, the movement checks and moves,
//! the overlap resolver used for pushing and platform riding, facing-based
//! frame selection for the renderer, and tile event dispatch. The
//! [`Stage`](stage::Stage) ties them together and settles each frame in a
//! fixed, deterministic order.
//!
//! # Quick Start
//!
//! ```
//! use tilestep_engine::prelude::*;
//!
//! let mut grid = TileGrid::filled(100, 100, TileKind::Hollow);
//! grid.fill_rect(0, 30, 100, 1, TileKind::Solid);
//! grid.set(39, 21, TileKind::Goal);
//!
//! let mut stage = Stage::new(grid, StageConfig::default());
//! let hero = stage.spawn(Rect::new(30.0, 10.0, 10.0, 10.0));
//! stage.body_mut(hero).unwrap().set_triggerable(true);
//!
//! // Fall until the floor stops us.
//! assert!(!stage.try_step(hero, Step::Down, 50).unwrap());
//! assert_eq!(stage.body(hero).unwrap().position(), (30.0, 19.0));
//!
//! let mut touched = Vec::new();
//! stage.step_frame(&mut |_id: EntityId, kind: TileKind| touched.push(kind));
//! assert!(touched.contains(&TileKind::Goal));
//! ```

#![deny(unsafe_code)]

pub mod body;
pub mod dispatch;
pub mod facing;
pub mod movement;
pub mod overlap;
pub mod snapshot;
pub mod stage;

/// Re-export the core crate for convenience.
pub use tilestep_core;

use tilestep_core::entity::EntityId;

use crate::facing::Direction;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Configuration errors. Blocked moves are not errors; they come back as
/// `false` or `None`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Double-faced and eight-way frames cannot be active together.
    #[error("cannot enable {requested} facing while {active} facing is active")]
    FacingConflict {
        requested: &'static str,
        active: &'static str,
    },

    /// The entity was despawned or never existed.
    #[error("entity {entity} is not alive")]
    StaleEntity { entity: EntityId },

    /// Double-faced layouts have no north or south frames.
    #[error("double-faced frames cannot face {facing:?}")]
    UnreachableFacing { facing: Direction },

    /// Frame sheet does not fit the facing mode.
    #[error("{frame_count} frames cannot be split into {blocks} blocks with offset {offset}")]
    FrameLayout {
        frame_count: usize,
        blocks: usize,
        offset: usize,
    },

    /// Snapshot contents do not match their digest.
    #[error("snapshot hash mismatch: expected {expected}, computed {actual}")]
    SnapshotHashMismatch { expected: String, actual: String },

    /// Stage configuration could not be parsed.
    #[error("invalid stage configuration: {details}")]
    Config { details: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use tilestep_core::prelude::*;

    pub use crate::body::{Body, ListenerId, MotionState, DEFAULT_MOVE_SPEED};
    pub use crate::dispatch::{IgnoreTiles, TileHandler};
    pub use crate::facing::{select_frame, Direction, FacingMode, FrameChoice};
    pub use crate::movement::{NoObstacles, Obstacles, Step, Surroundings};
    pub use crate::overlap::{resolve_overlap, Axis, Push};
    pub use crate::snapshot::{BodyState, StageSnapshot};
    pub use crate::stage::{FrameDiagnostics, Stage, StageConfig};
    pub use crate::EngineError;
}
