//! Player state and turn rotation.
//!
//! This module contains:
//! - Player struct with follower supply and lobby role
//! - Player colors and connection state
//! - Round-robin turn order

use crate::game::GameError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Followers each player starts with
pub const FOLLOWERS_PER_PLAYER: u8 = 6;

/// Fewest players needed to start a game
pub const MIN_PLAYERS: usize = 2;

/// Most players a room can hold
pub const MAX_PLAYERS: usize = 4;

/// Follower color, unique within a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerColor {
    Green,
    Blue,
    Yellow,
    Red,
}

impl PlayerColor {
    /// All colors in the order they are offered
    pub const ALL: [PlayerColor; 4] = [
        PlayerColor::Green,
        PlayerColor::Blue,
        PlayerColor::Yellow,
        PlayerColor::Red,
    ];
}

impl fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerColor::Green => "green",
            PlayerColor::Blue => "blue",
            PlayerColor::Yellow => "yellow",
            PlayerColor::Red => "red",
        };
        f.write_str(name)
    }
}

/// Whether the player's session is live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Connection {
    #[default]
    Connected,
    Disconnected,
}

/// A player in a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub username: String,
    pub color: PlayerColor,
    /// Followers not yet placed on the board
    pub followers: u8,
    pub is_host: bool,
    pub connection: Connection,
}

impl Player {
    pub fn new(username: impl Into<String>, color: PlayerColor, is_host: bool) -> Self {
        Self {
            username: username.into(),
            color,
            followers: FOLLOWERS_PER_PLAYER,
            is_host,
            connection: Connection::Connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection == Connection::Connected
    }

    pub fn has_followers(&self) -> bool {
        self.followers > 0
    }
}

/// The player after `current` in seating order, wrapping to the first
pub fn next_player(players: &[Player], current: &str) -> Result<String, GameError> {
    let index = players
        .iter()
        .position(|player| player.username == current)
        .ok_or_else(|| GameError::PlayerNotFound(current.to_string()))?;
    let next = &players[(index + 1) % players.len()];
    Ok(next.username.clone())
}

/// The next connected player after `current`, skipping seats that dropped.
///
/// Falls back to plain seating order when nobody else is connected.
pub fn next_active_player(players: &[Player], current: &str) -> Result<String, GameError> {
    let index = players
        .iter()
        .position(|player| player.username == current)
        .ok_or_else(|| GameError::PlayerNotFound(current.to_string()))?;
    let active = (1..=players.len())
        .map(|offset| &players[(index + offset) % players.len()])
        .find(|player| player.is_connected());
    match active {
        Some(player) => Ok(player.username.clone()),
        None => next_player(players, current),
    }
}
