//! The stage: owner of every body and driver of the per-frame protocol.
//!
//! A [`Stage`] holds the terrain, the bodies keyed by [`EntityId`], and the
//! configuration. Movement goes through the stage so that each check sees
//! the terrain and the other bodies without any global state. Once all
//! movement for a frame has been applied, [`Stage::step_frame`] settles it:
//!
//! 1. Halted bodies are snapped back to their previous position.
//! 2. Facing is derived from the frame's displacement.
//! 3. Triggerable, non-halted bodies sample the terrain and dispatch tile
//!    events to the world handler and their own listeners.
//! 4. Every body records its previous position.
//!
//! Bodies are visited in id order, so a frame is fully deterministic given
//! the same inputs.
//!
//! # Example
//!
//! ```
//! use tilestep_engine::prelude::*;
//!
//! let grid = TileGrid::filled(64, 64, TileKind::Hollow);
//! let mut stage = Stage::new(grid, StageConfig::default());
//! let hero = stage.spawn(Rect::new(4.0, 4.0, 8.0, 8.0));
//!
//! assert!(stage.try_step(hero, Step::Right, 3).unwrap());
//! stage.step_frame(&mut IgnoreTiles);
//!
//! let body = stage.body(hero).unwrap();
//! assert_eq!(body.position(), (7.0, 4.0));
//! assert_eq!(body.prev_position(), (7.0, 4.0));
//! assert_eq!(stage.frame_count(), 1);
//! ```

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tilestep_core::entity::{EntityAllocator, EntityId};
use tilestep_core::geometry::{hitboxes_collide, Hitbox, Rect};
use tilestep_core::grid::Terrain;
use tracing::{debug, warn};

use crate::body::{Body, DEFAULT_MOVE_SPEED};
use crate::dispatch::TileHandler;
use crate::facing::{select_frame, FrameChoice};
use crate::movement::{Obstacles, Step, Surroundings};
use crate::overlap::{resolve_overlap, Push};
use crate::EngineError;

// ---------------------------------------------------------------------------
// StageConfig
// ---------------------------------------------------------------------------

/// Stage-wide settings. Loadable from JSON; missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Move speed given to bodies created by [`Stage::spawn`].
    pub default_move_speed: f32,
    /// Undo any displacement of halted bodies when a frame settles.
    pub snap_back_halted: bool,
    /// Derive facing from movement for bodies without manual facing.
    pub auto_facing: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            default_move_speed: DEFAULT_MOVE_SPEED,
            snap_back_halted: true,
            auto_facing: true,
        }
    }
}

impl StageConfig {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json).map_err(|e| EngineError::Config {
            details: e.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// FrameDiagnostics
// ---------------------------------------------------------------------------

/// What the last [`Stage::step_frame`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameDiagnostics {
    /// Frame number this report belongs to (1 for the first frame).
    pub frame: u64,
    /// Live bodies at settle time.
    pub bodies: usize,
    /// Bodies whose perimeter was sampled.
    pub bodies_sampled: usize,
    /// Tile events dispatched, one per body per touched category.
    pub tile_events: usize,
    /// Halted bodies that had been displaced and were moved back.
    pub halted_snapped: usize,
    /// Wall-clock time for the whole settle.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// Obstacle view over the body map
// ---------------------------------------------------------------------------

struct BodyView<'a>(&'a BTreeMap<EntityId, Body>);

impl Obstacles for BodyView<'_> {
    fn obstacle(&self, id: EntityId) -> Option<(Rect, Hitbox)> {
        self.0.get(&id).map(|body| (body.rect, body.hitbox))
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Terrain plus the bodies moving over it.
pub struct Stage<T> {
    pub(crate) terrain: T,
    pub(crate) config: StageConfig,
    pub(crate) allocator: EntityAllocator,
    pub(crate) bodies: BTreeMap<EntityId, Body>,
    pub(crate) frame_counter: u64,
    last_diagnostics: FrameDiagnostics,
}

impl<T: Terrain> Stage<T> {
    pub fn new(terrain: T, config: StageConfig) -> Self {
        Self {
            terrain,
            config,
            allocator: EntityAllocator::new(),
            bodies: BTreeMap::new(),
            frame_counter: 0,
            last_diagnostics: FrameDiagnostics::default(),
        }
    }

    // -- spawn / despawn ----------------------------------------------------

    /// Create a body at `rect` with the configured default move speed.
    pub fn spawn(&mut self, rect: Rect) -> EntityId {
        let mut body = Body::new(rect);
        body.set_move_speed(self.config.default_move_speed);
        self.spawn_body(body)
    }

    /// Add a fully configured body.
    pub fn spawn_body(&mut self, body: Body) -> EntityId {
        let id = self.allocator.allocate();
        debug!(entity = %id, x = body.rect.x, y = body.rect.y, "spawned body");
        self.bodies.insert(id, body);
        id
    }

    /// Remove a body and drop it from every other body's solid-object set.
    pub fn despawn(&mut self, id: EntityId) -> Result<Body, EngineError> {
        let body = self.bodies.remove(&id).ok_or_else(|| stale(id, "despawn"))?;
        self.allocator.release(id);
        for other in self.bodies.values_mut() {
            other.solids.remove(&id);
        }
        debug!(entity = %id, "despawned body");
        Ok(body)
    }

    /// Spawn a copy of `id`'s configuration at `(x, y)`.
    pub fn duplicate(&mut self, id: EntityId, x: f32, y: f32) -> Result<EntityId, EngineError> {
        let copy = self.body(id)?.duplicate_at(x, y);
        Ok(self.spawn_body(copy))
    }

    // -- access -------------------------------------------------------------

    pub fn body(&self, id: EntityId) -> Result<&Body, EngineError> {
        self.bodies.get(&id).ok_or_else(|| stale(id, "read"))
    }

    pub fn body_mut(&mut self, id: EntityId) -> Result<&mut Body, EngineError> {
        self.bodies.get_mut(&id).ok_or_else(|| stale(id, "write"))
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.bodies.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Live ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.bodies.keys().copied()
    }

    pub fn bodies(&self) -> impl Iterator<Item = (EntityId, &Body)> + '_ {
        self.bodies.iter().map(|(id, body)| (*id, body))
    }

    pub fn terrain(&self) -> &T {
        &self.terrain
    }

    /// Mutable terrain. Only call between frames.
    pub fn terrain_mut(&mut self) -> &mut T {
        &mut self.terrain
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    pub fn last_diagnostics(&self) -> &FrameDiagnostics {
        &self.last_diagnostics
    }

    // -- movement -----------------------------------------------------------

    /// See [`Body::can_reach`].
    pub fn can_reach(&self, id: EntityId, x: f32, y: f32) -> Result<bool, EngineError> {
        let body = self.body(id)?;
        let view = BodyView(&self.bodies);
        Ok(body.can_reach(x, y, &Surroundings::new(&self.terrain, &view)))
    }

    /// See [`Body::can_step`].
    pub fn can_step(&self, id: EntityId, step: Step) -> Result<bool, EngineError> {
        let body = self.body(id)?;
        let view = BodyView(&self.bodies);
        Ok(body.can_step(step, &Surroundings::new(&self.terrain, &view)))
    }

    /// See [`Body::try_step`].
    pub fn try_step(&mut self, id: EntityId, step: Step, steps: u32) -> Result<bool, EngineError> {
        self.with_detached(id, |body, env| body.try_step(step, steps, env))
    }

    /// See [`Body::move_toward`]. `None` uses the body's own move speed.
    pub fn move_toward(
        &mut self,
        id: EntityId,
        target_x: f32,
        target_y: f32,
        speed: Option<f32>,
    ) -> Result<(), EngineError> {
        let body = self.body_mut(id)?;
        let speed = speed.unwrap_or(body.move_speed);
        body.move_toward(target_x, target_y, speed);
        Ok(())
    }

    /// Move to `(x, y)` only if the body can legally occupy it there.
    pub fn move_to_checked(&mut self, id: EntityId, x: f32, y: f32) -> Result<bool, EngineError> {
        self.with_detached(id, |body, env| {
            let ok = body.can_reach(x, y, env);
            if ok {
                body.set_position(x, y);
            }
            ok
        })
    }

    pub fn rewind(&mut self, id: EntityId) -> Result<(), EngineError> {
        self.body_mut(id)?.rewind();
        Ok(())
    }

    /// Make `rider` follow `platform`'s displacement since its last
    /// snapshot.
    ///
    /// The rider moves only if it can reach the shifted position. With
    /// `harsh` set the rider is then pushed out of the platform whatever the
    /// terrain says. Returns whether the rider followed.
    pub fn carry(&mut self, platform: EntityId, rider: EntityId, harsh: bool) -> Result<bool, EngineError> {
        let (dx, dy) = {
            let p = self.body(platform)?;
            (p.rect.x - p.prev_x, p.rect.y - p.prev_y)
        };
        let followed = self.with_detached(rider, |body, env| {
            let (x, y) = (body.rect.x + dx, body.rect.y + dy);
            let ok = body.can_reach(x, y, env);
            if ok {
                body.set_position(x, y);
            }
            ok
        })?;
        if harsh {
            self.push_apart(platform, rider)?;
        }
        Ok(followed)
    }

    /// Push `target` out of `mover` along the shallower axis.
    ///
    /// Nothing happens unless the two hitboxes collide. Terrain is ignored.
    pub fn push_apart(&mut self, mover: EntityId, target: EntityId) -> Result<Option<Push>, EngineError> {
        let (mover_rect, mover_shape) = {
            let m = self.body(mover)?;
            (m.rect, m.hitbox)
        };
        let t = self.body_mut(target)?;
        if !hitboxes_collide(&mover_rect, mover_shape, &t.rect, t.hitbox) {
            return Ok(None);
        }
        let push = resolve_overlap(&mover_rect, &t.rect);
        if let Some(push) = push {
            push.apply(&mut t.rect);
        }
        Ok(push)
    }

    /// Pick the frame to draw for `id` and remember the mirror flag.
    pub fn frame_for(
        &mut self,
        id: EntityId,
        frame_count: usize,
        offset: usize,
    ) -> Result<FrameChoice, EngineError> {
        let body = self.body_mut(id)?;
        let choice = select_frame(body.facing, body.facing_mode, frame_count, offset, body.flip_x)?;
        body.flip_x = choice.flip_x;
        Ok(choice)
    }

    /// Run `f` on a body taken out of the map, with the rest of the stage as
    /// its surroundings.
    fn with_detached<R>(
        &mut self,
        id: EntityId,
        f: impl FnOnce(&mut Body, &Surroundings<'_>) -> R,
    ) -> Result<R, EngineError> {
        let mut body = self.bodies.remove(&id).ok_or_else(|| stale(id, "move"))?;
        let result = {
            let view = BodyView(&self.bodies);
            let env = Surroundings::new(&self.terrain, &view);
            f(&mut body, &env)
        };
        self.bodies.insert(id, body);
        Ok(result)
    }

    // -- frame settle -------------------------------------------------------

    /// Settle the current frame. Call once after all movement is applied.
    pub fn step_frame<H>(&mut self, handler: &mut H) -> &FrameDiagnostics
    where
        H: TileHandler + ?Sized,
    {
        let start = Instant::now();
        let mut report = FrameDiagnostics {
            frame: self.frame_counter + 1,
            bodies: self.bodies.len(),
            ..FrameDiagnostics::default()
        };

        for (&id, body) in self.bodies.iter_mut() {
            if body.halted && self.config.snap_back_halted && body.is_moving() {
                body.rewind();
                report.halted_snapped += 1;
            }
            if self.config.auto_facing && !body.halted {
                body.face_movement();
            }
            if body.triggerable && !body.halted {
                report.bodies_sampled += 1;
                report.tile_events += body.dispatch_tiles(id, &self.terrain, &mut *handler);
            }
            body.snapshot();
        }

        self.frame_counter += 1;
        report.total_time = start.elapsed();
        debug!(
            frame = report.frame,
            bodies = report.bodies,
            sampled = report.bodies_sampled,
            events = report.tile_events,
            "frame settled"
        );
        self.last_diagnostics = report;
        &self.last_diagnostics
    }
}

fn stale(id: EntityId, op: &'static str) -> EngineError {
    warn!(entity = %id, op, "operation on stale entity");
    EngineError::StaleEntity { entity: id }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::IgnoreTiles;
    use crate::facing::{Direction, FacingMode};
    use crate::overlap::Axis;
    use tilestep_core::grid::TileGrid;
    use tilestep_core::tile::TileKind;

    fn stage() -> Stage<TileGrid> {
        Stage::new(TileGrid::filled(100, 100, TileKind::Hollow), StageConfig::default())
    }

    #[test]
    fn spawn_uses_configured_speed() {
        let config = StageConfig {
            default_move_speed: 1.25,
            ..Default::default()
        };
        let mut stage = Stage::new(TileGrid::filled(10, 10, TileKind::Hollow), config);
        let id = stage.spawn(Rect::new(0.0, 0.0, 2.0, 2.0));
        assert_eq!(stage.body(id).unwrap().move_speed(), 1.25);
    }

    #[test]
    fn despawn_purges_solid_sets_and_invalidates_id() {
        let mut stage = stage();
        let a = stage.spawn(Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = stage.spawn(Rect::new(30.0, 0.0, 10.0, 10.0));
        stage.body_mut(a).unwrap().avoid_overlapping(b);

        stage.despawn(b).unwrap();
        assert!(!stage.body(a).unwrap().avoids(b));
        assert!(matches!(stage.body(b), Err(EngineError::StaleEntity { .. })));
        assert!(stage.despawn(b).is_err());

        let c = stage.spawn(Rect::new(0.0, 0.0, 1.0, 1.0));
        assert_ne!(b, c);
    }

    #[test]
    fn other_bodies_block_through_the_stage() {
        let mut stage = stage();
        let hero = stage.spawn(Rect::new(0.0, 0.0, 10.0, 10.0));
        let wall = stage.spawn(Rect::new(12.0, 0.0, 4.0, 40.0));
        stage.body_mut(hero).unwrap().avoid_overlapping(wall);

        assert!(stage.try_step(hero, Step::Right, 2).unwrap());
        assert!(!stage.try_step(hero, Step::Right, 1).unwrap());
        assert_eq!(stage.body(hero).unwrap().position(), (2.0, 0.0));
        assert!(!stage.can_reach(hero, 10.0, 0.0).unwrap());
        assert!(stage.can_reach(hero, 16.0, 0.0).unwrap());
    }

    #[test]
    fn carry_follows_platform_displacement() {
        let mut stage = stage();
        let platform = stage.spawn(Rect::new(10.0, 50.0, 20.0, 4.0));
        let rider = stage.spawn(Rect::new(15.0, 40.0, 6.0, 10.0));

        stage.body_mut(platform).unwrap().set_position(13.0, 48.0);
        assert!(stage.carry(platform, rider, false).unwrap());
        assert_eq!(stage.body(rider).unwrap().position(), (18.0, 38.0));
    }

    #[test]
    fn harsh_carry_pushes_rider_out() {
        let mut stage = stage();
        let platform = stage.spawn(Rect::new(10.0, 50.0, 20.0, 4.0));
        let rider = stage.spawn(Rect::new(15.0, 42.0, 6.0, 10.0));

        stage.body_mut(platform).unwrap().set_position(10.0, 49.0);
        stage.carry(platform, rider, true).unwrap();
        let rect = stage.body(rider).unwrap().rect();
        assert_eq!(rect.bottom(), 49.0);
    }

    #[test]
    fn push_apart_respects_circle_hitboxes() {
        let mut stage = stage();
        let mover = stage.spawn(Rect::new(0.0, 0.0, 10.0, 10.0));
        let target = stage.spawn(Rect::new(8.5, 8.5, 10.0, 10.0));
        stage.body_mut(mover).unwrap().set_hitbox(Hitbox::Circle);
        stage.body_mut(target).unwrap().set_hitbox(Hitbox::Circle);
        assert_eq!(stage.push_apart(mover, target).unwrap(), None);

        stage.body_mut(target).unwrap().set_hitbox(Hitbox::Rectangle);
        stage.body_mut(mover).unwrap().set_hitbox(Hitbox::Rectangle);
        let push = stage.push_apart(mover, target).unwrap().unwrap();
        assert_eq!(push.axis, Axis::Y);
        assert_eq!(stage.body(target).unwrap().position(), (8.5, 10.0));
    }

    #[test]
    fn halted_bodies_snap_back_at_settle() {
        let mut stage = stage();
        let id = stage.spawn(Rect::new(20.0, 20.0, 10.0, 10.0));
        let pusher = stage.spawn(Rect::new(18.0, 20.0, 4.0, 10.0));
        stage.body_mut(id).unwrap().halt(true);

        stage.push_apart(pusher, id).unwrap();
        assert_ne!(stage.body(id).unwrap().position(), (20.0, 20.0));

        let report = stage.step_frame(&mut IgnoreTiles).clone();
        assert_eq!(report.halted_snapped, 1);
        assert_eq!(stage.body(id).unwrap().position(), (20.0, 20.0));
    }

    #[test]
    fn step_frame_derives_facing_and_snapshots() {
        let mut stage = stage();
        let id = stage.spawn(Rect::new(20.0, 20.0, 10.0, 10.0));
        stage.move_toward(id, 20.0, 0.0, None).unwrap();
        stage.step_frame(&mut IgnoreTiles);

        let body = stage.body(id).unwrap();
        assert_eq!(body.facing(), Direction::N);
        assert!(!body.is_moving());
        assert_eq!(body.prev_position(), (20.0, 17.0));
    }

    #[test]
    fn auto_facing_can_be_disabled() {
        let config = StageConfig {
            auto_facing: false,
            ..Default::default()
        };
        let mut stage = Stage::new(TileGrid::filled(50, 50, TileKind::Hollow), config);
        let id = stage.spawn(Rect::new(20.0, 20.0, 4.0, 4.0));
        stage.body_mut(id).unwrap().set_position(10.0, 20.0);
        stage.step_frame(&mut IgnoreTiles);
        assert_eq!(stage.body(id).unwrap().facing(), Direction::E);
    }

    #[test]
    fn frame_for_remembers_flip() {
        let mut stage = stage();
        let id = stage.spawn(Rect::new(20.0, 20.0, 10.0, 10.0));
        stage
            .body_mut(id)
            .unwrap()
            .set_facing_mode(FacingMode::DoubleFaced { flip: true });
        stage.body_mut(id).unwrap().set_facing(Direction::W);

        let choice = stage.frame_for(id, 6, 1).unwrap();
        assert!(choice.flip_x);
        assert!(stage.body(id).unwrap().flip_x());
    }

    #[test]
    fn config_loads_from_partial_json() {
        let config = StageConfig::from_json(r#"{ "snap_back_halted": false }"#).unwrap();
        assert!(!config.snap_back_halted);
        assert!(config.auto_facing);
        assert_eq!(config.default_move_speed, DEFAULT_MOVE_SPEED);
        assert!(StageConfig::from_json("{ nope").is_err());
    }
}
