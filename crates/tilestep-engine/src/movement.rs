//! Movement controller: legality checks and the moves built on them.
//!
//! Every check takes the body's surroundings explicitly (terrain plus a way
//! to look up other bodies) instead of reaching for a global stage. Checks
//! never touch the body: a candidate position is turned into a candidate
//! rectangle and tested as is.
//!
//! [`Body::can_reach`] is the authoritative test. The single-axis
//! [`Body::can_step`] family scans only the grid line the body would newly
//! enter and is kept for callers that move one unit along one axis at a
//! time; [`Body::try_step`] is built on it.

use tilestep_core::entity::EntityId;
use tilestep_core::geometry::{hitboxes_collide, Hitbox, Rect};
use tilestep_core::grid::Terrain;
use tilestep_core::sampler::perimeter_touches;
use tilestep_core::tile::TileKind;

use crate::body::Body;

// ---------------------------------------------------------------------------
// Obstacles / Surroundings
// ---------------------------------------------------------------------------

/// Lookup of other bodies by handle, for solid-object checks.
pub trait Obstacles {
    /// Bounding box and hitbox of `id`, or `None` if it no longer exists.
    fn obstacle(&self, id: EntityId) -> Option<(Rect, Hitbox)>;
}

impl<F> Obstacles for F
where
    F: Fn(EntityId) -> Option<(Rect, Hitbox)>,
{
    fn obstacle(&self, id: EntityId) -> Option<(Rect, Hitbox)> {
        self(id)
    }
}

/// No other bodies exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObstacles;

impl Obstacles for NoObstacles {
    fn obstacle(&self, _id: EntityId) -> Option<(Rect, Hitbox)> {
        None
    }
}

/// Everything a movement check reads besides the body itself.
#[derive(Clone, Copy)]
pub struct Surroundings<'a> {
    pub terrain: &'a dyn Terrain,
    pub obstacles: &'a dyn Obstacles,
}

impl<'a> Surroundings<'a> {
    pub fn new(terrain: &'a dyn Terrain, obstacles: &'a dyn Obstacles) -> Self {
        Self { terrain, obstacles }
    }

    /// Terrain only, no other bodies.
    pub fn terrain_only(terrain: &'a dyn Terrain) -> Self {
        Self {
            terrain,
            obstacles: &NoObstacles,
        }
    }
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// A one-unit move along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Step {
    Up,
    Down,
    Left,
    Right,
}

impl Step {
    /// Unit displacement `(dx, dy)`.
    pub fn delta(self) -> (f32, f32) {
        match self {
            Step::Up => (0.0, -1.0),
            Step::Down => (0.0, 1.0),
            Step::Left => (-1.0, 0.0),
            Step::Right => (1.0, 0.0),
        }
    }

    fn is_vertical(self) -> bool {
        matches!(self, Step::Up | Step::Down)
    }
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

impl Body {
    /// Whether the body could legally occupy its rectangle moved to `(x, y)`.
    ///
    /// Fails when the body cannot move, when either the top-left or the
    /// bottom-right corner (`x + width`, `y + height`) is outside the world,
    /// when the candidate perimeter touches a solid tile, or when the
    /// candidate overlaps a body in the solid-object set.
    pub fn can_reach(&self, x: f32, y: f32, env: &Surroundings<'_>) -> bool {
        if !self.can_move() {
            return false;
        }
        let bounds = env.terrain.bounds();
        let candidate = self.rect.at(x, y);
        if bounds.is_outside(candidate.right(), candidate.bottom()) || bounds.is_outside(x, y) {
            return false;
        }
        if perimeter_touches(&candidate, env.terrain, TileKind::Solid) {
            return false;
        }
        !self.overlaps_solids(&candidate, env)
    }

    /// Whether any body in the solid-object set overlaps `candidate`.
    /// Handles that no longer resolve are skipped.
    pub fn overlaps_solids(&self, candidate: &Rect, env: &Surroundings<'_>) -> bool {
        self.solids.iter().any(|&id| {
            env.obstacles
                .obstacle(id)
                .is_some_and(|(rect, shape)| hitboxes_collide(candidate, self.hitbox, &rect, shape))
        })
    }

    /// Single-axis check for a one-unit step from the current position.
    pub fn can_step(&self, step: Step, env: &Surroundings<'_>) -> bool {
        let (dx, dy) = step.delta();
        let target = if step.is_vertical() {
            self.rect.y + dy
        } else {
            self.rect.x + dx
        };
        self.can_step_to(step, target, env)
    }

    /// Single-axis check towards an explicit target coordinate (`y` for
    /// vertical steps, `x` for horizontal ones).
    ///
    /// Scans the one grid line the leading edge would enter, across the full
    /// perpendicular extent of the body, then checks solid objects at the
    /// target. Only the line's first cell is bounds-checked.
    ///
    /// The scanned line lies one cell past the perimeter that [`can_reach`]
    /// samples, so near a wall this refuses one step earlier than
    /// [`can_reach`] would. Use [`can_reach`] when the answer must match
    /// what sampling will see.
    ///
    /// [`can_reach`]: Self::can_reach
    pub fn can_step_to(&self, step: Step, target: f32, env: &Surroundings<'_>) -> bool {
        if !self.can_move() {
            return false;
        }
        let terrain = env.terrain;
        let bounds = terrain.bounds();
        let (x, y) = (self.rect.x as i64, self.rect.y as i64);

        let blocked = match step {
            Step::Up | Step::Down => {
                let row = match step {
                    Step::Up => target as i64,
                    _ => (target + self.rect.height) as i64,
                };
                if bounds.is_outside(x as f32, row as f32) {
                    return false;
                }
                (0..span(self.rect.width)).any(|i| terrain.tile_at(x + i, row).is_solid())
            }
            Step::Left | Step::Right => {
                let col = match step {
                    Step::Left => target as i64,
                    _ => (target + self.rect.width) as i64,
                };
                if bounds.is_outside(col as f32, y as f32) {
                    return false;
                }
                (0..span(self.rect.height)).any(|i| terrain.tile_at(col, y + i).is_solid())
            }
        };
        if blocked {
            return false;
        }

        let candidate = if step.is_vertical() {
            self.rect.at(self.rect.x, target)
        } else {
            self.rect.at(target, self.rect.y)
        };
        !self.overlaps_solids(&candidate, env)
    }

    // -----------------------------------------------------------------------
    // Moves
    // -----------------------------------------------------------------------

    /// Take up to `steps` one-unit steps, stopping at the first blocked one.
    ///
    /// Returns `true` only if every step was taken. Steps already taken stay
    /// taken.
    pub fn try_step(&mut self, step: Step, steps: u32, env: &Surroundings<'_>) -> bool {
        let (dx, dy) = step.delta();
        for _ in 0..steps {
            if !self.can_step(step, env) {
                return false;
            }
            self.rect.x += dx;
            self.rect.y += dy;
        }
        true
    }

    /// Move `speed` units along the straight line to `(target_x, target_y)`.
    ///
    /// Unchecked against terrain. Overshoots when `speed` exceeds the
    /// remaining distance. Does nothing when the body cannot move or already
    /// sits exactly on the target.
    pub fn move_toward(&mut self, target_x: f32, target_y: f32, speed: f32) {
        if !self.can_move() {
            return;
        }
        let dx = target_x - self.rect.x;
        let dy = target_y - self.rect.y;
        let distance = (f64::from(dx) * f64::from(dx) + f64::from(dy) * f64::from(dy)).sqrt();
        if distance == 0.0 {
            return;
        }
        let scale = f64::from(speed) / distance;
        self.rect.x = (f64::from(self.rect.x) + f64::from(dx) * scale) as f32;
        self.rect.y = (f64::from(self.rect.y) + f64::from(dy) * scale) as f32;
    }

    /// [`move_toward`](Self::move_toward) at the body's own move speed.
    pub fn move_toward_default(&mut self, target_x: f32, target_y: f32) {
        self.move_toward(target_x, target_y, self.move_speed);
    }

    /// Jump back to the previous-frame position, bypassing all checks.
    pub fn rewind(&mut self) {
        self.rect.x = self.prev_x;
        self.rect.y = self.prev_y;
    }

    /// Record the current position as the previous-frame position. Called
    /// once per frame after all movement has been applied.
    pub fn snapshot(&mut self) {
        self.prev_x = self.rect.x;
        self.prev_y = self.rect.y;
    }

    /// Whether the body moved since the last snapshot.
    pub fn is_moving(&self) -> bool {
        self.rect.x != self.prev_x || self.rect.y != self.prev_y
    }
}

/// Number of whole cells `i` with `0 <= i < extent`.
#[inline]
fn span(extent: f32) -> i64 {
    extent.max(0.0).ceil() as i64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
