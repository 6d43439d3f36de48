//! Per-entity state: bounding box, previous-frame position, mobility,
//! facing configuration, solid-object set and tile listeners.
//!
//! The movement operations live in [`movement`](crate::movement), tile
//! dispatch in [`dispatch`](crate::dispatch); this module only owns the data
//! and its configuration setters.

use std::collections::BTreeSet;
use std::fmt;

use tilestep_core::entity::EntityId;
use tilestep_core::geometry::{Hitbox, Rect};
use tilestep_core::sampler::TileSet;
use tilestep_core::tile::TileKind;
use tracing::warn;

use crate::facing::{Direction, FacingMode};
use crate::EngineError;

/// Speed used by [`Body::move_toward_default`] unless configured otherwise.
pub const DEFAULT_MOVE_SPEED: f32 = 3.0;

// ---------------------------------------------------------------------------
// MotionState
// ---------------------------------------------------------------------------

/// Mobility of a body as seen by the movement code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    /// Moves and triggers tile events normally.
    Free,
    /// Every move attempt fails; tile events still fire.
    Frozen,
    /// Ignored by the simulation: no movement, no tile events, and any push
    /// is undone when the frame settles. Still rendered.
    Halted,
}

// ---------------------------------------------------------------------------
// TileListeners
// ---------------------------------------------------------------------------

/// Callback run once per touched tile category per frame.
pub type TileListener = Box<dyn FnMut(TileKind)>;

/// Handle returned by [`Body::add_tile_listener`], used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered list of tile listeners. Notified in insertion order.
#[derive(Default)]
pub struct TileListeners {
    next_id: u64,
    entries: Vec<(ListenerId, TileListener)>,
}

impl TileListeners {
    pub fn add(&mut self, listener: TileListener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    /// Remove `target`, or the oldest listener when `target` is `None`.
    /// Returns whether anything was removed.
    pub fn remove(&mut self, target: Option<ListenerId>) -> bool {
        let position = match target {
            Some(id) => self.entries.iter().position(|(entry, _)| *entry == id),
            None => (!self.entries.is_empty()).then_some(0),
        };
        match position {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn notify(&mut self, kind: TileKind) {
        for (_, listener) in &mut self.entries {
            listener(kind);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for TileListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileListeners")
            .field("count", &self.entries.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

/// A movable bounding box.
#[derive(Debug)]
pub struct Body {
    pub(crate) rect: Rect,
    pub(crate) prev_x: f32,
    pub(crate) prev_y: f32,
    pub(crate) move_speed: f32,
    pub(crate) frozen: bool,
    pub(crate) halted: bool,
    pub(crate) triggerable: bool,
    pub(crate) hitbox: Hitbox,
    pub(crate) facing: Direction,
    pub(crate) facing_mode: FacingMode,
    pub(crate) manual_facing: bool,
    pub(crate) flip_x: bool,
    pub(crate) solids: BTreeSet<EntityId>,
    pub(crate) listeners: TileListeners,
    pub(crate) occupied: TileSet,
}

impl Body {
    /// A free, non-triggerable, east-facing body. The previous position
    /// starts equal to the current one.
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            prev_x: rect.x,
            prev_y: rect.y,
            move_speed: DEFAULT_MOVE_SPEED,
            frozen: false,
            halted: false,
            triggerable: false,
            hitbox: Hitbox::Rectangle,
            facing: Direction::E,
            facing_mode: FacingMode::Single,
            manual_facing: false,
            flip_x: false,
            solids: BTreeSet::new(),
            listeners: TileListeners::default(),
            occupied: TileSet::new(),
        }
    }

    /// Copy of this body's configuration placed at `(x, y)`.
    ///
    /// Tile listeners and the occupied set are not copied; the previous
    /// position is. Mobility carries over, but the copy starts running
    /// (not halted) and unmirrored.
    pub fn duplicate_at(&self, x: f32, y: f32) -> Body {
        Body {
            rect: self.rect.at(x, y),
            halted: false,
            flip_x: false,
            solids: self.solids.clone(),
            listeners: TileListeners::default(),
            occupied: TileSet::new(),
            ..*self
        }
    }

    // -- geometry ---------------------------------------------------------

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn position(&self) -> (f32, f32) {
        (self.rect.x, self.rect.y)
    }

    pub fn prev_position(&self) -> (f32, f32) {
        (self.prev_x, self.prev_y)
    }

    /// Teleport without any checks.
    pub fn set_position(&mut self, x: f32, y: f32) {
        self.rect.x = x;
        self.rect.y = y;
    }

    pub fn set_size(&mut self, width: f32, height: f32) {
        self.rect.width = width;
        self.rect.height = height;
    }

    pub fn hitbox(&self) -> Hitbox {
        self.hitbox
    }

    pub fn set_hitbox(&mut self, hitbox: Hitbox) {
        self.hitbox = hitbox;
    }

    // -- mobility ---------------------------------------------------------

    pub fn motion_state(&self) -> MotionState {
        if self.halted {
            MotionState::Halted
        } else if self.frozen {
            MotionState::Frozen
        } else {
            MotionState::Free
        }
    }

    /// Whether move attempts may succeed at all.
    #[inline]
    pub fn can_move(&self) -> bool {
        !self.frozen && !self.halted
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn unfreeze(&mut self) {
        self.frozen = false;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Suspend or resume the body. Independent of freezing: a frozen body
    /// that is halted and later resumed is still frozen.
    pub fn halt(&mut self, halted: bool) {
        self.halted = halted;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn move_speed(&self) -> f32 {
        self.move_speed
    }

    pub fn set_move_speed(&mut self, speed: f32) {
        self.move_speed = speed;
    }

    // -- tile interaction -------------------------------------------------

    pub fn is_triggerable(&self) -> bool {
        self.triggerable
    }

    pub fn set_triggerable(&mut self, triggerable: bool) {
        self.triggerable = triggerable;
    }

    /// Categories touched at the last dispatch. Empty for non-triggerable
    /// bodies.
    pub fn occupied(&self) -> &TileSet {
        &self.occupied
    }

    pub fn add_tile_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(TileKind) + 'static,
    {
        self.listeners.add(Box::new(listener))
    }

    /// Remove a listener; `None` removes the oldest one.
    pub fn remove_tile_listener(&mut self, target: Option<ListenerId>) -> bool {
        self.listeners.remove(target)
    }

    pub fn tile_listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Run every listener with `kind`, in insertion order.
    pub fn run_tile_listeners(&mut self, kind: TileKind) {
        self.listeners.notify(kind);
    }

    // -- solid objects ----------------------------------------------------

    /// Refuse to overlap `other` from now on.
    pub fn avoid_overlapping(&mut self, other: EntityId) {
        self.solids.insert(other);
    }

    pub fn avoid_overlapping_all<I>(&mut self, others: I)
    where
        I: IntoIterator<Item = EntityId>,
    {
        self.solids.extend(others);
    }

    pub fn allow_overlapping(&mut self, other: EntityId) -> bool {
        self.solids.remove(&other)
    }

    pub fn solids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.solids.iter().copied()
    }

    pub fn avoids(&self, other: EntityId) -> bool {
        self.solids.contains(&other)
    }

    // -- facing -----------------------------------------------------------

    pub fn facing(&self) -> Direction {
        self.facing
    }

    pub fn set_facing(&mut self, facing: Direction) {
        self.facing = facing;
    }

    pub fn facing_mode(&self) -> FacingMode {
        self.facing_mode
    }

    /// Replace the facing mode outright.
    pub fn set_facing_mode(&mut self, mode: FacingMode) {
        self.facing_mode = mode;
    }

    /// Turn eight-way frames on or off. Rejected while double-faced.
    pub fn set_eight_way(&mut self, enabled: bool) -> Result<(), EngineError> {
        if enabled && self.facing_mode.is_double_faced() {
            return Err(self.facing_conflict(FacingMode::EightWay));
        }
        if enabled {
            self.facing_mode = FacingMode::EightWay;
        } else if self.facing_mode == FacingMode::EightWay {
            self.facing_mode = FacingMode::Single;
        }
        Ok(())
    }

    /// Turn double-faced frames on or off. Rejected while eight-way.
    pub fn set_double_faced(&mut self, enabled: bool, flip: bool) -> Result<(), EngineError> {
        if enabled && self.facing_mode == FacingMode::EightWay {
            return Err(self.facing_conflict(FacingMode::DoubleFaced { flip }));
        }
        if enabled {
            self.facing_mode = FacingMode::DoubleFaced { flip };
        } else if self.facing_mode.is_double_faced() {
            self.facing_mode = FacingMode::Single;
        }
        Ok(())
    }

    fn facing_conflict(&self, requested: FacingMode) -> EngineError {
        warn!(
            requested = requested.label(),
            active = self.facing_mode.label(),
            "rejected facing mode change"
        );
        EngineError::FacingConflict {
            requested: requested.label(),
            active: self.facing_mode.label(),
        }
    }

    pub fn has_manual_facing(&self) -> bool {
        self.manual_facing
    }

    /// Stop the stage from deriving facing from movement.
    pub fn set_manual_facing(&mut self, manual: bool) {
        self.manual_facing = manual;
    }

    /// Mirror flag from the last frame selection.
    pub fn flip_x(&self) -> bool {
        self.flip_x
    }

    /// Derive facing from this frame's displacement.
    ///
    /// Double-faced bodies keep their facing on purely vertical movement so
    /// they never face north or south.
    pub fn face_movement(&mut self) {
        if self.manual_facing {
            return;
        }
        let dx = self.rect.x - self.prev_x;
        let dy = self.rect.y - self.prev_y;
        let Some(direction) = Direction::from_delta(dx, dy) else {
            return;
        };
        if self.facing_mode.is_double_faced()
            && !direction.is_eastward()
            && !direction.is_westward()
        {
            return;
        }
        self.facing = direction;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
