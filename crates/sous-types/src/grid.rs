//! Grid geometry: cell coordinates, movement directions, and cell types.
//!
//! Coordinates are unsigned `(x, y)` cell indices with `y` growing
//! downwards, matching the row order of level files.

use serde::{Deserialize, Serialize};

/// An `(x, y)` cell index on the kitchen grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    /// Column, counted from the left edge.
    pub x: usize,
    /// Row, counted from the top edge.
    pub y: usize,
}

impl Coordinate {
    /// Create a coordinate from its column and row.
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// The cell one step away in `direction`, or `None` when the step
    /// would leave the non-negative quadrant.
    ///
    /// No bounds check against a grid is performed here; see
    /// `Environment::move_noclip` for the grid-aware variant.
    pub fn step(self, direction: Direction) -> Option<Self> {
        let (dx, dy) = direction.delta();
        let x = self.x.checked_add_signed(dx)?;
        let y = self.y.checked_add_signed(dy)?;
        Some(Self { x, y })
    }

    /// Direction of the single step leading from `self` to `other`.
    ///
    /// Horizontal offsets are checked first. Returns [`Direction::Stay`]
    /// when the cells are not orthogonally adjacent.
    pub fn direction_to(self, other: Self) -> Direction {
        Direction::MOVES
            .into_iter()
            .find(|direction| self.step(*direction) == Some(other))
            .unwrap_or(Direction::Stay)
    }
}

impl core::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// One of the five primitive per-turn actions of an agent.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Move (or interact) towards `y - 1`.
    Up,
    /// Move (or interact) towards `x + 1`.
    Right,
    /// Move (or interact) towards `y + 1`.
    Down,
    /// Move (or interact) towards `x - 1`.
    Left,
    /// The `none` action: stay in place and interact with nothing.
    #[default]
    Stay,
}

impl Direction {
    /// Every direction in enumeration order, `Stay` last.
    pub const ALL: [Self; 5] = [Self::Up, Self::Right, Self::Down, Self::Left, Self::Stay];

    /// The four directions that move an agent.
    pub const MOVES: [Self; 4] = [Self::Right, Self::Left, Self::Down, Self::Up];

    /// Signed `(dx, dy)` offset of one step in this direction.
    pub const fn delta(self) -> (isize, isize) {
        match self {
            Self::Up => (0, -1),
            Self::Right => (1, 0),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Stay => (0, 0),
        }
    }

    /// Convert a host-supplied `(dx, dy)` delta into a direction.
    ///
    /// The horizontal component wins when both are set; anything that is
    /// not a unit step maps to [`Direction::Stay`].
    pub const fn from_delta(dx: i32, dy: i32) -> Self {
        match (dx, dy) {
            (-1, _) => Self::Left,
            (1, _) => Self::Right,
            (_, -1) => Self::Up,
            (_, 1) => Self::Down,
            _ => Self::Stay,
        }
    }

    /// Single-character glyph used in logs.
    pub const fn glyph(self) -> char {
        match self {
            Self::Up => 'u',
            Self::Right => 'r',
            Self::Down => 'd',
            Self::Left => 'l',
            Self::Stay => 'n',
        }
    }

    /// Whether this is the `none` action.
    pub const fn is_stay(self) -> bool {
        matches!(self, Self::Stay)
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

/// Static cell categories of a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    /// Any counter cell; agents cannot stand on it.
    Wall,
    /// A counter that chops raw ingredients.
    CuttingStation,
    /// A counter that accepts finished dishes.
    DeliveryStation,
}

impl CellType {
    /// Level-file glyph of this cell type.
    pub const fn glyph(self) -> char {
        match self {
            Self::Wall => '-',
            Self::CuttingStation => '/',
            Self::DeliveryStation => '*',
        }
    }
}
