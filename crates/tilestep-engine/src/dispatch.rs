//! Per-frame tile event dispatch.
//!
//! For a triggerable body the occupied-category set is rebuilt from scratch
//! by perimeter sampling, then each category is reported to the world's
//! [`TileHandler`] and to the body's own listeners. Categories are visited in
//! [`TileKind`] order; listeners in insertion order.

use tilestep_core::entity::EntityId;
use tilestep_core::geometry::Rect;
use tilestep_core::grid::Terrain;
use tilestep_core::sampler::sample_perimeter_into;
use tilestep_core::tile::TileKind;
use tracing::{trace, warn};

use crate::body::Body;

/// World-level reaction to a body touching a tile category.
pub trait TileHandler {
    fn on_tile_touch(&mut self, entity: EntityId, kind: TileKind);
}

impl<F> TileHandler for F
where
    F: FnMut(EntityId, TileKind),
{
    fn on_tile_touch(&mut self, entity: EntityId, kind: TileKind) {
        self(entity, kind)
    }
}

/// A world with no tile-driven behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreTiles;

impl TileHandler for IgnoreTiles {
    fn on_tile_touch(&mut self, _entity: EntityId, _kind: TileKind) {}
}

impl Body {
    /// Resample the occupied categories and notify the world and the local
    /// listeners once per category.
    ///
    /// Non-triggerable and halted bodies are skipped without sampling.
    /// Returns the number of categories dispatched.
    pub fn dispatch_tiles<T, H>(&mut self, entity: EntityId, terrain: &T, handler: &mut H) -> usize
    where
        T: Terrain + ?Sized,
        H: TileHandler + ?Sized,
    {
        if !self.triggerable || self.halted {
            return 0;
        }
        self.occupied.clear();
        if !is_finite(&self.rect) {
            warn!(%entity, rect = ?self.rect, "non-finite body skipped by tile sampling");
            return 0;
        }
        sample_perimeter_into(&self.rect, terrain, &mut self.occupied);

        for &kind in &self.occupied {
            trace!(%entity, %kind, "tile touch");
            handler.on_tile_touch(entity, kind);
            self.listeners.notify(kind);
        }
        self.occupied.len()
    }
}

fn is_finite(rect: &Rect) -> bool {
    rect.x.is_finite() && rect.y.is_finite() && rect.width.is_finite() && rect.height.is_finite()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
