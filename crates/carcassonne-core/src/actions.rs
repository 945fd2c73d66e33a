//! Game commands players can issue.
//!
//! This module defines the commands accepted by the game and the events
//! that result from those commands.

use crate::board::TileId;
use crate::geometry::{Coord, Direction};
use crate::path::PathId;
use crate::tile::{FeatureKind, Rotation};
use serde::{Deserialize, Serialize};

/// All commands a player can issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameCommand {
    /// Put the starting tile down and hand out the first tile
    StartGame,
    /// Draw a tile, replacing the one currently held
    DrawTile,
    /// Place a tile, optionally with a follower on one of its features
    PlaceTile {
        coord: Coord,
        /// Name of the tile type
        tile: String,
        rotation: Rotation,
        follower: Option<FollowerRequest>,
    },
}

/// Where a player wants to put a follower on the tile being placed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowerRequest {
    pub kind: FeatureKind,
    /// Sides of the feature, in board orientation
    pub directions: Vec<Direction>,
}

/// A tile placement recorded in the game history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardMove {
    /// `None` for the starting tile
    pub player: Option<String>,
    pub tile: String,
    pub coord: Coord,
    pub rotation: Rotation,
}

/// The tile a player holds and has to place next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawnTile {
    pub player: String,
    pub tile: String,
}

/// Events emitted after command execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// The starting tile is down and turns begin
    GameStarted {
        starting_tile: String,
        first_player: String,
    },

    /// A player drew a tile
    TileDrawn { player: String, tile: String },

    /// A tile was placed
    TilePlaced {
        /// `None` for the starting tile
        player: Option<String>,
        tile_id: TileId,
        tile: String,
        coord: Coord,
        rotation: Rotation,
        follower: Option<FeatureKind>,
    },

    /// A path has no open ends left
    PathCompleted {
        path: PathId,
        kind: FeatureKind,
        points: u32,
        owners: Vec<String>,
    },

    /// The turn passed to another player
    TurnChanged { player: String },

    /// The bag is empty and no more tiles can be played
    GameFinished,
}
