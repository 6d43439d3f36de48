//! Perimeter sampling: which tile categories does a bounding box touch?
//!
//! Only the ring of cells just inside the box is inspected, never its
//! interior. The box is inset by one unit on every side (coordinates are
//! truncated toward zero first), giving `[x+1, x2] x [y+1, y2]` with
//! `x2 = trunc(x + width - 1)` and `y2 = trunc(y + height - 1)`. Then:
//!
//! - for every column in `x+1 .. x2`, rows `y+1` and `y2` are read;
//! - for every row in `y+1 .. y2`, columns `x+1` and `x2` are read.
//!
//! The far corner `(x2, y2)` is never read, and boxes narrower than two
//! units read degenerate or overlapping lines. Both are long-standing
//! behaviour that level data is built around and are kept as is.

use std::collections::BTreeSet;

use crate::geometry::Rect;
use crate::grid::Terrain;
use crate::tile::TileKind;

/// Distinct categories touched by a box. Iterates in [`TileKind`] order.
pub type TileSet = BTreeSet<TileKind>;

/// Inset bounds of `rect`: `(x, y, x2, y2)` in cell coordinates.
///
/// Casts saturate (NaN reads as zero), so non-finite boxes give empty or
/// degenerate scans instead of overflowing.
#[inline]
fn inset(rect: &Rect) -> (i64, i64, i64, i64) {
    (
        (rect.x as i64).saturating_add(1),
        (rect.y as i64).saturating_add(1),
        (rect.x + rect.width - 1.0) as i64,
        (rect.y + rect.height - 1.0) as i64,
    )
}

/// Cells read when sampling `rect`, in scan order. May repeat cells.
pub fn perimeter_cells(rect: &Rect) -> impl Iterator<Item = (i64, i64)> {
    let (x, y, x2, y2) = inset(rect);
    let horizontal = (x..x2).flat_map(move |col| [(col, y), (col, y2)]);
    let vertical = (y..y2).flat_map(move |row| [(x, row), (x2, row)]);
    horizontal.chain(vertical)
}

/// Collect the distinct categories on the perimeter of `rect`.
pub fn sample_perimeter<T: Terrain + ?Sized>(rect: &Rect, terrain: &T) -> TileSet {
    let mut out = TileSet::new();
    sample_perimeter_into(rect, terrain, &mut out);
    out
}

/// Like [`sample_perimeter`] but adds to an existing set, so per-frame
/// callers can reuse one allocation. `out` is not cleared first.
pub fn sample_perimeter_into<T: Terrain + ?Sized>(rect: &Rect, terrain: &T, out: &mut TileSet) {
    out.extend(perimeter_cells(rect).map(|(x, y)| terrain.tile_at(x, y)));
}

/// `true` as soon as one perimeter cell of `rect` holds `kind`.
pub fn perimeter_touches<T: Terrain + ?Sized>(rect: &Rect, terrain: &T, kind: TileKind) -> bool {
    perimeter_cells(rect).any(|(x, y)| terrain.tile_at(x, y) == kind)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
