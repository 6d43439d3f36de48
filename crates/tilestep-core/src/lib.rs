//! tilestep core -- terrain, geometry and perimeter sampling for grid platformers.
//!
//! This crate holds the leaf pieces of the simulation: generational entity
//! handles, axis-aligned rectangles and hitbox shapes, the closed set of tile
//! categories, the [`TileGrid`](grid::TileGrid) with its
//! [`Terrain`](grid::Terrain) accessor, and the perimeter sampler that tells
//! which categories a bounding box touches.
//!
//! # Quick Start
//!
//! ```
//! use tilestep_core::prelude::*;
//!
//! let mut grid = TileGrid::filled(20, 20, TileKind::Hollow);
//! grid.set(5, 1, TileKind::Lethal);
//!
//! let touched = sample_perimeter(&Rect::new(0.0, 0.0, 10.0, 10.0), &grid);
//! assert!(touched.contains(&TileKind::Lethal));
//! assert!(touched.contains(&TileKind::Hollow));
//! ```

#![deny(unsafe_code)]

pub mod entity;
pub mod geometry;
pub mod grid;
pub mod sampler;
pub mod tile;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while building terrain data.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A cell byte does not name any tile category.
    #[error("unknown tile byte {byte} (valid range is 0..=13)")]
    UnknownTileByte { byte: u8 },

    /// A grid must have at least one cell.
    #[error("tile grid must be at least 1x1")]
    EmptyGrid,

    /// Row lengths differ.
    #[error("row {row} has {actual} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Flat cell list does not match the declared dimensions.
    #[error("{width}x{height} grid needs {expected} cells, got {actual}")]
    CellCountMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// A grid document could not be parsed.
    #[error("invalid tile grid document: {details}")]
    GridDocument { details: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::entity::{EntityAllocator, EntityId};
    pub use crate::geometry::{hitboxes_collide, Hitbox, Rect};
    pub use crate::grid::{Bounds, Terrain, TileGrid};
    pub use crate::sampler::{perimeter_cells, perimeter_touches, sample_perimeter, TileSet};
    pub use crate::tile::{AreaTrigger, TileKind};
    pub use crate::CoreError;
}
