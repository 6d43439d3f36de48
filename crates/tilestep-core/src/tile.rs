//! The closed set of terrain categories a grid cell can hold.
//!
//! Every cell carries exactly one [`TileKind`]. On the wire (grid files, raw
//! level data) a kind is a single byte:
//!
//! | byte | kind |
//! |------|------|
//! | 0 | [`TileKind::Hollow`] |
//! | 1 | [`TileKind::Solid`] |
//! | 2 | [`TileKind::Lethal`] |
//! | 3 | [`TileKind::Goal`] |
//! | 4..=13 | [`TileKind::AreaTrigger`] 0..=9 |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CoreError;

/// Number of numbered scripted-zone categories.
pub const AREA_TRIGGER_COUNT: u8 = 10;

const AREA_TRIGGER_BASE: u8 = 4;

// ---------------------------------------------------------------------------
// AreaTrigger
// ---------------------------------------------------------------------------

/// Index of a scripted zone, always in `0..AREA_TRIGGER_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AreaTrigger(u8);

impl AreaTrigger {
    /// Returns `None` for indices outside `0..AREA_TRIGGER_COUNT`.
    pub fn new(index: u8) -> Option<Self> {
        (index < AREA_TRIGGER_COUNT).then_some(Self(index))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    /// All ten triggers in index order.
    pub fn all() -> impl Iterator<Item = AreaTrigger> {
        (0..AREA_TRIGGER_COUNT).map(AreaTrigger)
    }
}

// ---------------------------------------------------------------------------
// TileKind
// ---------------------------------------------------------------------------

/// Terrain category of one grid cell.
///
/// The derived ordering (hollow, solid, lethal, goal, triggers by index) is the
/// order in which a sampled set of kinds is dispatched.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum TileKind {
    /// Empty space. Non-interactive.
    #[default]
    Hollow,
    /// Blocks movement.
    Solid,
    /// Kills whatever touches it; the world decides what that means.
    Lethal,
    /// Stage exit.
    Goal,
    /// One of the numbered scripted zones.
    AreaTrigger(AreaTrigger),
}

impl TileKind {
    /// Decode a raw cell byte.
    pub fn from_byte(byte: u8) -> Result<Self, CoreError> {
        match byte {
            0 => Ok(Self::Hollow),
            1 => Ok(Self::Solid),
            2 => Ok(Self::Lethal),
            3 => Ok(Self::Goal),
            b if (AREA_TRIGGER_BASE..AREA_TRIGGER_BASE + AREA_TRIGGER_COUNT).contains(&b) => {
                Ok(Self::AreaTrigger(AreaTrigger(b - AREA_TRIGGER_BASE)))
            }
            other => Err(CoreError::UnknownTileByte { byte: other }),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Self::Hollow => 0,
            Self::Solid => 1,
            Self::Lethal => 2,
            Self::Goal => 3,
            Self::AreaTrigger(trigger) => AREA_TRIGGER_BASE + trigger.0,
        }
    }

    /// Shorthand for `TileKind::AreaTrigger` with an index check.
    pub fn area_trigger(index: u8) -> Option<Self> {
        AreaTrigger::new(index).map(Self::AreaTrigger)
    }

    #[inline]
    pub fn is_solid(self) -> bool {
        self == Self::Solid
    }
}

impl TryFrom<u8> for TileKind {
    type Error = CoreError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::from_byte(byte)
    }
}

impl From<TileKind> for u8 {
    fn from(kind: TileKind) -> u8 {
        kind.to_byte()
    }
}

impl fmt::Display for TileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hollow => f.write_str("hollow"),
            Self::Solid => f.write_str("solid"),
            Self::Lethal => f.write_str("lethal"),
            Self::Goal => f.write_str("goal"),
            Self::AreaTrigger(trigger) => write!(f, "area_trigger_{}", trigger.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
