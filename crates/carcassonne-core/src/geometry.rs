//! Square grid coordinate system.
//!
//! This module provides the foundational types for the sparse, unbounded board:
//! - `Direction`: The four sides of a square tile
//! - `Coord`: Identifies a cell on the board
//!
//! The y axis grows upwards: the cell on a tile's `Top` side has `y + 1`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of a square tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Upper side (towards y + 1)
    Top,
    /// Right side (towards x + 1)
    Right,
    /// Lower side (towards y - 1)
    Bottom,
    /// Left side (towards x - 1)
    Left,
}

impl Direction {
    /// All directions in clockwise order starting from Top
    pub const ALL: [Direction; 4] = [
        Direction::Top,
        Direction::Right,
        Direction::Bottom,
        Direction::Left,
    ];

    /// Position of this direction in [`Direction::ALL`]
    pub const fn index(self) -> usize {
        match self {
            Direction::Top => 0,
            Direction::Right => 1,
            Direction::Bottom => 2,
            Direction::Left => 3,
        }
    }

    /// The side facing this one on a neighboring tile
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::Top => Direction::Bottom,
            Direction::Right => Direction::Left,
            Direction::Bottom => Direction::Top,
            Direction::Left => Direction::Right,
        }
    }

    /// Turn clockwise by `steps` quarter turns
    pub const fn rotated(self, steps: u8) -> Direction {
        Direction::ALL[(self.index() + steps as usize) % 4]
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Top => "top",
            Direction::Right => "right",
            Direction::Bottom => "bottom",
            Direction::Left => "left",
        };
        f.write_str(name)
    }
}

/// Cell on the board.
///
/// The origin `(0, 0)` holds the starting tile; every other tile is placed
/// next to an occupied cell, so the board grows outwards in all directions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Coord {
    /// Column (increases going right)
    pub x: i32,
    /// Row (increases going up)
    pub y: i32,
}

impl Coord {
    /// The cell holding the starting tile
    pub const ORIGIN: Coord = Coord::new(0, 0);

    /// Create a new coordinate
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Get the neighbor in a specific direction.
    ///
    /// `None` past the edge of the `i32` grid.
    pub fn neighbor(&self, direction: Direction) -> Option<Coord> {
        let (x, y) = match direction {
            Direction::Top => (Some(self.x), self.y.checked_add(1)),
            Direction::Right => (self.x.checked_add(1), Some(self.y)),
            Direction::Bottom => (Some(self.x), self.y.checked_sub(1)),
            Direction::Left => (self.x.checked_sub(1), Some(self.y)),
        };
        Some(Coord::new(x?, y?))
    }

    /// The neighboring cells that exist, paired with the direction they lie in
    pub fn neighbors(self) -> impl Iterator<Item = (Direction, Coord)> {
        Direction::ALL
            .into_iter()
            .filter_map(move |direction| self.neighbor(direction).map(|coord| (direction, coord)))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
