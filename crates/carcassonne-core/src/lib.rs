//! Carcassonne - a tile-laying game rules engine
//!
//! This crate provides the core game logic, including:
//! - Square grid geometry for the sparse, unbounded board
//! - Tile definitions, rotation, and the standard tile catalog
//! - Placement validation by edge matching
//! - Incremental tracking of roads and cities as tiles are placed
//! - Tile bag, players, and turn rotation
//! - A command handler that runs a room's game
//!
//! # Architecture
//!
//! The engine is synchronous and performs no I/O. Every command takes the
//! current [`RoomState`] and returns a new one plus a list of events, or an
//! error with the original state unchanged. Callers serialize commands per
//! room; rooms are independent of one another.
//!
//! # Modules
//!
//! - [`geometry`]: Directions and coordinates
//! - [`tile`]: Feature layouts, rotation, tile definitions
//! - [`catalog`]: Tile catalog loading and the standard set
//! - [`board`]: Placed tiles and neighbor queries
//! - [`placement`]: Edge-matching validator
//! - [`path`]: Paths and the path registry
//! - [`tracker`]: Folding new tiles into paths
//! - [`bag`]: Weighted tile drawing
//! - [`player`]: Players and turn order
//! - [`game`]: Command handler

pub mod actions;
pub mod bag;
pub mod board;
pub mod catalog;
pub mod game;
pub mod geometry;
pub mod path;
pub mod placement;
pub mod player;
pub mod tile;
pub mod tracker;

// Re-export commonly used types
pub use actions::{BoardMove, DrawnTile, FollowerRequest, GameCommand, GameEvent};
pub use bag::TileBag;
pub use board::{Board, BoardJson, FollowerPlacement, PlacedTile, TileId};
pub use catalog::{CatalogEntry, CatalogError, TileCatalog, STANDARD_STARTING_TILE};
pub use game::{GameError, GamePhase, Outcome, RoomState};
pub use geometry::{Coord, Direction};
pub use path::{Path, PathId, PathMember, PathRegistry};
pub use placement::{has_valid_placement, valid_placements, validate};
pub use player::{
    next_active_player, next_player, Connection, Player, PlayerColor, FOLLOWERS_PER_PLAYER,
    MAX_PLAYERS, MIN_PLAYERS,
};
pub use tile::{rotate, EdgeGroup, FeatureKind, FeatureLayout, Rotation, TileDefinition};
pub use tracker::{integrate, Integration};
