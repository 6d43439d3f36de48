//! Facing directions and frame selection for rendering.
//!
//! A body's sprite sheet is laid out according to its [`FacingMode`]:
//!
//! - [`FacingMode::Single`]: one animation, used whatever the facing.
//! - [`FacingMode::DoubleFaced`] with `flip: true`: one animation, mirrored
//!   horizontally while facing west.
//! - [`FacingMode::DoubleFaced`] with `flip: false`: two equal halves, the
//!   east-facing animation first and the west-facing one second.
//! - [`FacingMode::EightWay`]: eight equal blocks ordered N, NE, E, SE, S,
//!   SW, W, NW.
//!
//! [`select_frame`] turns a facing, a mode and the animation's current frame
//! offset into the index the renderer should draw plus the mirror flag.

use serde::{Deserialize, Serialize};

use crate::EngineError;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// One of the eight compass directions. `N` is towards row 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Direction {
    /// All directions in sprite-sheet block order.
    pub const ALL: [Direction; 8] = [
        Direction::N,
        Direction::NE,
        Direction::E,
        Direction::SE,
        Direction::S,
        Direction::SW,
        Direction::W,
        Direction::NW,
    ];

    /// Position of this direction's block in an eight-way sheet.
    pub fn block(self) -> usize {
        self as usize
    }

    pub fn is_eastward(self) -> bool {
        matches!(self, Direction::NE | Direction::E | Direction::SE)
    }

    pub fn is_westward(self) -> bool {
        matches!(self, Direction::SW | Direction::W | Direction::NW)
    }

    /// Direction of a displacement, by the signs of its components.
    ///
    /// `dy < 0` is north because rows grow downwards. Returns `None` for a
    /// zero displacement.
    pub fn from_delta(dx: f32, dy: f32) -> Option<Direction> {
        use std::cmp::Ordering::{Equal, Greater, Less};

        let sign = |v: f32| v.partial_cmp(&0.0).unwrap_or(Equal);
        match (sign(dx), sign(dy)) {
            (Equal, Less) => Some(Direction::N),
            (Greater, Less) => Some(Direction::NE),
            (Greater, Equal) => Some(Direction::E),
            (Greater, Greater) => Some(Direction::SE),
            (Equal, Greater) => Some(Direction::S),
            (Less, Greater) => Some(Direction::SW),
            (Less, Equal) => Some(Direction::W),
            (Less, Less) => Some(Direction::NW),
            (Equal, Equal) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// FacingMode
// ---------------------------------------------------------------------------

/// How a body's frames relate to its facing.
///
/// The double-faced and eight-way layouts are alternatives of one enum, so a
/// body can never be configured with both at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FacingMode {
    /// Same frame whatever the facing.
    #[default]
    Single,
    /// East/west only. `flip: true` mirrors one animation; `flip: false`
    /// splits the sheet into an east half and a west half.
    DoubleFaced { flip: bool },
    /// Eight blocks, one per [`Direction`].
    EightWay,
}

impl FacingMode {
    /// Number of equal blocks the frame sheet is split into.
    pub fn blocks(self) -> usize {
        match self {
            FacingMode::Single | FacingMode::DoubleFaced { flip: true } => 1,
            FacingMode::DoubleFaced { flip: false } => 2,
            FacingMode::EightWay => 8,
        }
    }

    /// Frames per block: the animation period the player should loop over.
    pub fn period(self, frame_count: usize) -> usize {
        frame_count / self.blocks()
    }

    pub fn is_double_faced(self) -> bool {
        matches!(self, FacingMode::DoubleFaced { .. })
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            FacingMode::Single => "single",
            FacingMode::DoubleFaced { .. } => "double-faced",
            FacingMode::EightWay => "eight-way",
        }
    }
}

// ---------------------------------------------------------------------------
// Frame selection
// ---------------------------------------------------------------------------

/// What the renderer should draw this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameChoice {
    /// Index into the full frame sheet.
    pub index: usize,
    /// Mirror the frame horizontally.
    pub flip_x: bool,
}

/// Pick the frame to draw.
///
/// `offset` is the animation's position inside one block (`0..period`).
/// `flip_x` is the current mirror flag; it is only changed by the flipping
/// double-faced mode and passed through otherwise.
///
/// Fails when `frame_count` is not a positive multiple of the mode's block
/// count, when `offset` falls outside one block, or when a double-faced
/// layout is asked for a north or south frame.
pub fn select_frame(
    facing: Direction,
    mode: FacingMode,
    frame_count: usize,
    offset: usize,
    flip_x: bool,
) -> Result<FrameChoice, EngineError> {
    let blocks = mode.blocks();
    let period = mode.period(frame_count);
    if frame_count == 0 || frame_count % blocks != 0 || offset >= period {
        return Err(EngineError::FrameLayout {
            frame_count,
            blocks,
            offset,
        });
    }

    match mode {
        FacingMode::Single => Ok(FrameChoice {
            index: offset,
            flip_x,
        }),
        FacingMode::EightWay => Ok(FrameChoice {
            index: facing.block() * period + offset,
            flip_x,
        }),
        FacingMode::DoubleFaced { flip } => {
            let west = if facing.is_westward() {
                true
            } else if facing.is_eastward() {
                false
            } else {
                return Err(EngineError::UnreachableFacing { facing });
            };
            if flip {
                Ok(FrameChoice {
                    index: offset,
                    flip_x: west,
                })
            } else {
                Ok(FrameChoice {
                    index: if west { period + offset } else { offset },
                    flip_x,
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
