//! Game room management.

use carcassonne_core::{
    Connection, GameCommand, GameError, GameEvent, Player, PlayerColor, RoomState, TileCatalog,
    MIN_PLAYERS,
};
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use uuid::Uuid;

use crate::protocol::{PlayerInfo, RoomInfo, RoomStatus};

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Room is full")]
    RoomFull,

    #[error("Player not in room")]
    PlayerNotInRoom,

    #[error("Name {0} is already taken in this room")]
    NameTaken(String),

    #[error("Color {0} is already taken")]
    ColorTaken(PlayerColor),

    #[error("Not the host")]
    NotHost,

    #[error("Game already started")]
    GameAlreadyStarted,

    #[error("Not enough players")]
    NotEnoughPlayers,

    #[error("Game not started")]
    GameNotStarted,

    #[error("Not your turn")]
    NotYourTurn,

    #[error(transparent)]
    Game(#[from] GameError),
}

/// A player in a game room.
#[derive(Debug, Clone)]
pub struct RoomPlayer {
    pub id: Uuid,
    pub name: String,
    pub color: PlayerColor,
    pub connected: bool,
}

impl RoomPlayer {
    pub fn new(id: Uuid, name: String, color: PlayerColor) -> Self {
        Self {
            id,
            name,
            color,
            connected: true,
        }
    }

    pub fn to_info(&self, host_id: Uuid) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            name: self.name.clone(),
            color: self.color,
            is_host: self.id == host_id,
            connected: self.connected,
        }
    }
}

/// A game room that can hold multiple players.
pub struct GameRoom {
    pub id: Uuid,
    pub name: String,
    pub max_players: usize,
    pub host_id: Uuid,
    pub status: RoomStatus,
    pub players: HashMap<Uuid, RoomPlayer>,
    /// Order of players for turn taking
    pub player_order: Vec<Uuid>,
    /// Tiles the game will be played with
    pub catalog: TileCatalog,
    /// The game state (once started)
    pub game: Option<RoomState>,
}

impl GameRoom {
    pub fn new(
        id: Uuid,
        host_id: Uuid,
        host_name: String,
        color: Option<PlayerColor>,
        max_players: usize,
        catalog: TileCatalog,
    ) -> Self {
        let color = color.unwrap_or(PlayerColor::ALL[0]);
        let mut players = HashMap::new();
        players.insert(host_id, RoomPlayer::new(host_id, host_name.clone(), color));

        Self {
            id,
            name: format!("{}'s Game", host_name),
            max_players,
            host_id,
            status: RoomStatus::Waiting,
            players,
            player_order: vec![host_id],
            catalog,
            game: None,
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    fn color_taken(&self, color: PlayerColor) -> bool {
        self.players.values().any(|p| p.color == color)
    }

    pub fn add_player(
        &mut self,
        player_id: Uuid,
        name: String,
        color: Option<PlayerColor>,
    ) -> Result<PlayerColor, RoomError> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }
        if self.is_full() {
            return Err(RoomError::RoomFull);
        }
        if self.players.values().any(|p| p.name == name) {
            return Err(RoomError::NameTaken(name));
        }

        let color = match color {
            Some(color) if self.color_taken(color) => return Err(RoomError::ColorTaken(color)),
            Some(color) => color,
            None => PlayerColor::ALL
                .into_iter()
                .find(|c| !self.color_taken(*c))
                .ok_or(RoomError::RoomFull)?,
        };

        self.players
            .insert(player_id, RoomPlayer::new(player_id, name, color));
        self.player_order.push(player_id);
        Ok(color)
    }

    /// Take a player out of the room.
    ///
    /// In a running game the seat stays and is marked dropped, so the game
    /// can go on without it; the returned events come from handing over
    /// their turn.
    pub fn remove_player(&mut self, player_id: Uuid) -> Result<Vec<GameEvent>, RoomError> {
        if !self.players.contains_key(&player_id) {
            return Err(RoomError::PlayerNotInRoom);
        }

        let events = if self.status == RoomStatus::InGame {
            self.set_player_connected(player_id, false)
        } else {
            self.players.remove(&player_id);
            self.player_order.retain(|&id| id != player_id);
            Vec::new()
        };

        // If host left, assign new host
        if player_id == self.host_id {
            if let Some(next_host) = self
                .player_order
                .iter()
                .find(|id| self.players.get(*id).is_some_and(|p| p.connected))
            {
                self.host_id = *next_host;
            }
        }

        Ok(events)
    }

    /// No connected player is left
    pub fn is_abandoned(&self) -> bool {
        !self.players.values().any(|p| p.connected)
    }

    /// Update a player's connection, dropping their seat from a running game
    /// when they go away.
    pub fn set_player_connected(&mut self, player_id: Uuid, connected: bool) -> Vec<GameEvent> {
        let Some(player) = self.players.get_mut(&player_id) else {
            return Vec::new();
        };
        player.connected = connected;
        let name = player.name.clone();

        let Some(game) = self.game.as_mut() else {
            return Vec::new();
        };
        if connected {
            if let Some(seat) = game.players.iter_mut().find(|p| p.username == name) {
                seat.connection = Connection::Connected;
            }
            return Vec::new();
        }
        match game.drop_player(&name) {
            Ok(outcome) => {
                *game = outcome.state;
                outcome.events
            }
            Err(_) => Vec::new(),
        }
    }

    pub fn start_game(&mut self, requester_id: Uuid) -> Result<Vec<GameEvent>, RoomError> {
        self.start_game_with_rng(requester_id, &mut rand::thread_rng())
    }

    pub fn start_game_with_rng<R: Rng>(
        &mut self,
        requester_id: Uuid,
        rng: &mut R,
    ) -> Result<Vec<GameEvent>, RoomError> {
        if requester_id != self.host_id {
            return Err(RoomError::NotHost);
        }
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(RoomError::NotEnoughPlayers);
        }

        // Seats in join order
        let seats: Vec<Player> = self
            .player_order
            .iter()
            .filter_map(|id| self.players.get(id))
            .map(|p| Player::new(p.name.clone(), p.color, p.id == self.host_id))
            .collect();
        let host_name = self.player_name(self.host_id)?;

        let state = RoomState::new(seats, self.catalog.clone());
        let outcome = state.execute_with_rng(&host_name, GameCommand::StartGame, rng)?;

        self.status = if outcome.state.is_finished() {
            RoomStatus::Finished
        } else {
            RoomStatus::InGame
        };
        self.game = Some(outcome.state);
        Ok(outcome.events)
    }

    pub fn execute(
        &mut self,
        player_id: Uuid,
        command: GameCommand,
    ) -> Result<Vec<GameEvent>, RoomError> {
        self.execute_with_rng(player_id, command, &mut rand::thread_rng())
    }

    /// Run a command for a player, enforcing turn order
    pub fn execute_with_rng<R: Rng>(
        &mut self,
        player_id: Uuid,
        command: GameCommand,
        rng: &mut R,
    ) -> Result<Vec<GameEvent>, RoomError> {
        let name = self.player_name(player_id)?;
        let game = self.game.as_ref().ok_or(RoomError::GameNotStarted)?;

        if !game.is_players_turn(&name) {
            return Err(RoomError::NotYourTurn);
        }

        let outcome = game.execute_with_rng(&name, command, rng)?;
        if outcome.state.is_finished() {
            self.status = RoomStatus::Finished;
        }
        self.game = Some(outcome.state);

        Ok(outcome.events)
    }

    fn player_name(&self, player_id: Uuid) -> Result<String, RoomError> {
        self.players
            .get(&player_id)
            .map(|p| p.name.clone())
            .ok_or(RoomError::PlayerNotInRoom)
    }

    pub fn game_state(&self) -> Option<&RoomState> {
        self.game.as_ref()
    }

    pub fn current_player(&self) -> Option<String> {
        self.game.as_ref()?.current_player.clone()
    }

    /// Points of completed paths, credited in full to each owner
    pub fn scores(&self) -> BTreeMap<String, u32> {
        let mut scores: BTreeMap<String, u32> = self
            .player_order
            .iter()
            .filter_map(|id| self.players.get(id))
            .map(|p| (p.name.clone(), 0))
            .collect();

        if let Some(game) = &self.game {
            for path in game.paths.iter().filter(|path| path.completed) {
                for owner in &path.owners {
                    *scores.entry(owner.clone()).or_insert(0) += path.points;
                }
            }
        }
        scores
    }

    pub fn to_info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id,
            name: self.name.clone(),
            players: self
                .player_order
                .iter()
                .filter_map(|id| self.players.get(id).map(|p| p.to_info(self.host_id)))
                .collect(),
            max_players: self.max_players,
            host_id: self.host_id,
            status: self.status,
        }
    }
}
