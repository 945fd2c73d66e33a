//! WebSocket protocol messages for Carcassonne multiplayer.

use carcassonne_core::{FollowerRequest, GameEvent, PlayerColor, RoomState, Rotation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Create a new game room
    CreateRoom {
        player_name: String,
        /// First free color if omitted
        #[serde(default)]
        color: Option<PlayerColor>,
    },

    /// Join an existing room
    JoinRoom {
        room_id: Uuid,
        player_name: String,
        #[serde(default)]
        color: Option<PlayerColor>,
    },

    /// Leave current room
    LeaveRoom,

    /// Start the game (host only)
    StartGame,

    /// Discard the held tile and draw another
    DrawTile,

    /// Place the held tile
    PlaceTile {
        x: i32,
        y: i32,
        tile: String,
        rotation: Rotation,
        #[serde(default)]
        follower: Option<FollowerRequest>,
    },

    /// Request room list
    ListRooms,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with assigned player ID
    Welcome { player_id: Uuid },

    /// Room created successfully
    RoomCreated { room_id: Uuid },

    /// Joined room successfully
    JoinedRoom { room: RoomInfo },

    /// Left room successfully
    LeftRoom,

    /// Room state updated (player joined/left/disconnected)
    RoomUpdated { room: RoomInfo },

    /// Game started
    GameStarted { state: Box<RoomState> },

    /// Game state updated
    GameState { state: Box<RoomState> },

    /// Outcome of a command, sent to the acting player
    CommandResult {
        success: bool,
        events: Vec<GameEvent>,
        error: Option<String>,
    },

    /// Current player changed
    TurnChanged { player: String },

    /// List of available rooms
    RoomList { rooms: Vec<RoomInfo> },

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,

    /// Bag is empty; points of completed paths per owner
    GameOver { scores: BTreeMap<String, u32> },
}

/// Room information for clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: Uuid,
    pub name: String,
    pub players: Vec<PlayerInfo>,
    pub max_players: usize,
    pub host_id: Uuid,
    pub status: RoomStatus,
}

/// Player information in a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: Uuid,
    pub name: String,
    pub color: PlayerColor,
    pub is_host: bool,
    pub connected: bool,
}

/// Room status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Waiting,
    InGame,
    Finished,
}
