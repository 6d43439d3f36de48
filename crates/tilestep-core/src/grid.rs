//! The tile grid and the terrain accessor the movement code reads through.
//!
//! A [`TileGrid`] stores one [`TileKind`] per unit cell in row-major order
//! (`cells[y * width + x]`, i.e. `[row][col]`). It is edited between frames
//! only: movement code receives it behind a shared reference through the
//! [`Terrain`] trait, so nothing can change it while a frame is in progress.

use serde::{Deserialize, Serialize};

use crate::tile::TileKind;
use crate::CoreError;

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Playable area `[0, width) x [0, height)` in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// `true` when the point lies inside the half-open playable area.
    #[inline]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.width && y < self.height
    }

    #[inline]
    pub fn is_outside(&self, x: f32, y: f32) -> bool {
        !self.contains(x, y)
    }
}

// ---------------------------------------------------------------------------
// Terrain
// ---------------------------------------------------------------------------

/// Read access to the world's terrain for one simulation session.
///
/// Implemented by [`TileGrid`]; a stage collaborator with its own storage
/// can implement it directly.
pub trait Terrain {
    /// The playable area used for out-of-bounds checks.
    fn bounds(&self) -> Bounds;

    /// Category of cell `(x, y)`. Cells outside the stored grid read as
    /// [`TileKind::Hollow`].
    fn tile_at(&self, x: i64, y: i64) -> TileKind;
}

impl<T: Terrain + ?Sized> Terrain for &T {
    fn bounds(&self) -> Bounds {
        (**self).bounds()
    }

    fn tile_at(&self, x: i64, y: i64) -> TileKind {
        (**self).tile_at(x, y)
    }
}

// ---------------------------------------------------------------------------
// TileGrid
// ---------------------------------------------------------------------------

/// A rectangular map of tile categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GridDocument", into = "GridDocument")]
pub struct TileGrid {
    width: u32,
    height: u32,
    cells: Vec<TileKind>,
}

/// Serialized form: dimensions plus a flat, row-major cell list.
#[derive(Serialize, Deserialize)]
struct GridDocument {
    width: u32,
    height: u32,
    cells: Vec<TileKind>,
}

impl TryFrom<GridDocument> for TileGrid {
    type Error = CoreError;

    fn try_from(doc: GridDocument) -> Result<Self, Self::Error> {
        Self::from_cells(doc.width, doc.height, doc.cells)
    }
}

impl From<TileGrid> for GridDocument {
    fn from(grid: TileGrid) -> Self {
        Self {
            width: grid.width,
            height: grid.height,
            cells: grid.cells,
        }
    }
}

impl TileGrid {
    /// A `width x height` grid where every cell is `kind`.
    pub fn filled(width: u32, height: u32, kind: TileKind) -> Self {
        Self {
            width,
            height,
            cells: vec![kind; width as usize * height as usize],
        }
    }

    /// Build from a flat row-major cell list.
    pub fn from_cells(width: u32, height: u32, cells: Vec<TileKind>) -> Result<Self, CoreError> {
        if width == 0 || height == 0 {
            return Err(CoreError::EmptyGrid);
        }
        let expected = width as usize * height as usize;
        if cells.len() != expected {
            return Err(CoreError::CellCountMismatch {
                width,
                height,
                expected,
                actual: cells.len(),
            });
        }
        tracing::debug!(width, height, "tile grid built");
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Build from rows (`rows[y][x]`). Every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<TileKind>>) -> Result<Self, CoreError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        let mut cells = Vec::with_capacity(width * height);
        for (y, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(CoreError::RaggedRow {
                    row: y,
                    expected: width,
                    actual: row.len(),
                });
            }
            cells.extend(row);
        }
        Self::from_cells(width as u32, height as u32, cells)
    }

    /// Decode raw level bytes (one byte per cell, row-major).
    pub fn from_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self, CoreError> {
        let cells = bytes
            .iter()
            .map(|&b| TileKind::from_byte(b))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_cells(width, height, cells)
    }

    /// Parse a grid document: `{"width": w, "height": h, "cells": [bytes…]}`.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json).map_err(|e| CoreError::GridDocument {
            details: e.to_string(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Category of cell `(x, y)`, or `None` outside the grid.
    pub fn get(&self, x: i64, y: i64) -> Option<TileKind> {
        self.index(x, y).map(|i| self.cells[i])
    }

    /// Overwrite one cell. Returns `false` (and changes nothing) outside the
    /// grid.
    pub fn set(&mut self, x: i64, y: i64, kind: TileKind) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.cells[i] = kind;
                true
            }
            None => false,
        }
    }

    /// Fill the cells `[x, x + w) x [y, y + h)`, clipped to the grid.
    pub fn fill_rect(&mut self, x: i64, y: i64, w: i64, h: i64, kind: TileKind) {
        for row in y..y + h {
            for col in x..x + w {
                self.set(col, row, kind);
            }
        }
    }

    /// Iterate rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[TileKind]> {
        self.cells.chunks(self.width as usize)
    }
}

impl Terrain for TileGrid {
    fn bounds(&self) -> Bounds {
        Bounds::new(self.width as f32, self.height as f32)
    }

    #[inline]
    fn tile_at(&self, x: i64, y: i64) -> TileKind {
        self.get(x, y).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
