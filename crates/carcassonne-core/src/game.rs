//! Core game state machine.
//!
//! This module contains the `RoomState` struct and the command handler that
//! turns a player's command into a new state plus a list of events.

use crate::actions::{BoardMove, DrawnTile, FollowerRequest, GameCommand, GameEvent};
use crate::bag::TileBag;
use crate::board::{Board, FollowerPlacement, PlacedTile};
use crate::catalog::TileCatalog;
use crate::geometry::{Coord, Direction};
use crate::path::PathRegistry;
use crate::placement::{has_valid_placement, validate};
use crate::player::{next_active_player, Connection, Player};
use crate::tile::Rotation;
use crate::tracker::integrate;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GamePhase {
    /// Players are gathering, no tile is down yet
    #[default]
    Waiting,
    /// Tiles are being drawn and placed
    InProgress,
    /// The bag ran out
    Finished,
}

/// Errors that can occur when executing commands
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Coordinate {0} is already occupied")]
    OccupiedCoordinate(Coord),

    #[error("Edge on the {direction} side does not match its neighbor")]
    EdgeMismatch { direction: Direction },

    #[error("No tiles left in the bag")]
    EmptyBag,

    #[error("Player {0} is not in this room")]
    PlayerNotFound(String),

    #[error("Game has already started")]
    GameAlreadyStarted,

    #[error("Game has not started yet")]
    GameNotStarted,

    #[error("Game is over")]
    GameOver,

    #[error("Unknown tile {0}")]
    UnknownTile(String),

    #[error("Tile {0} is not the tile held by this player")]
    NotHeldTile(String),

    #[error("Coordinate {0} does not touch any placed tile")]
    NotAdjacent(Coord),

    #[error("No followers left")]
    NoFollowersLeft,

    #[error("Tile has no such feature for a follower")]
    InvalidFollower,

    #[error("Starting tile {0} is not available")]
    MissingStartingTile(String),
}

/// Everything one room needs to run a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomState {
    /// Players in seating order
    pub players: Vec<Player>,
    pub board: Board,
    pub paths: PathRegistry,
    pub bag: TileBag,
    pub catalog: TileCatalog,
    pub phase: GamePhase,
    /// Whose turn it is
    pub current_player: Option<String>,
    /// Tile waiting to be placed
    pub drawn_tile: Option<DrawnTile>,
    /// Every placement so far, starting tile first
    pub moves: Vec<BoardMove>,
}

/// New state and the events produced by one command
#[derive(Debug, Clone)]
pub struct Outcome {
    pub state: RoomState,
    pub events: Vec<GameEvent>,
}

impl RoomState {
    /// Create a room waiting to start, with a full bag
    pub fn new(players: Vec<Player>, catalog: TileCatalog) -> Self {
        Self {
            players,
            board: Board::new(),
            paths: PathRegistry::new(),
            bag: catalog.bag(),
            catalog,
            phase: GamePhase::Waiting,
            current_player: None,
            drawn_tile: None,
            moves: Vec::new(),
        }
    }

    pub fn player(&self, username: &str) -> Option<&Player> {
        self.players.iter().find(|player| player.username == username)
    }

    fn player_mut(&mut self, username: &str) -> Result<&mut Player, GameError> {
        self.players
            .iter_mut()
            .find(|player| player.username == username)
            .ok_or_else(|| GameError::PlayerNotFound(username.to_string()))
    }

    /// Whether it is `username`'s turn.
    ///
    /// The handler does not enforce turn order; callers may.
    pub fn is_players_turn(&self, username: &str) -> bool {
        self.current_player.as_deref() == Some(username)
    }

    pub fn is_finished(&self) -> bool {
        self.phase == GamePhase::Finished
    }

    /// Execute a command with the thread-local RNG
    pub fn execute(&self, player: &str, command: GameCommand) -> Result<Outcome, GameError> {
        let mut rng = rand::thread_rng();
        self.execute_with_rng(player, command, &mut rng)
    }

    /// Execute a command.
    ///
    /// `self` is left untouched; on success the returned outcome carries the
    /// new state.
    pub fn execute_with_rng<R: Rng>(
        &self,
        player: &str,
        command: GameCommand,
        rng: &mut R,
    ) -> Result<Outcome, GameError> {
        debug!(player, ?command, "executing command");
        let mut state = self.clone();
        let events = state.apply(player, command, rng)?;
        Ok(Outcome { state, events })
    }

    fn apply<R: Rng>(
        &mut self,
        player: &str,
        command: GameCommand,
        rng: &mut R,
    ) -> Result<Vec<GameEvent>, GameError> {
        if self.player(player).is_none() {
            return Err(GameError::PlayerNotFound(player.to_string()));
        }

        let mut events = Vec::new();
        match command {
            GameCommand::StartGame => self.start_game(player, rng, &mut events)?,
            GameCommand::DrawTile => {
                self.require_in_progress()?;
                let tile = self.draw_for(player, rng)?;
                events.push(GameEvent::TileDrawn {
                    player: player.to_string(),
                    tile,
                });
                self.finish_if_stuck(&mut events);
            }
            GameCommand::PlaceTile {
                coord,
                tile,
                rotation,
                follower,
            } => {
                self.require_in_progress()?;
                self.place_tile(player, coord, &tile, rotation, follower, rng, &mut events)?;
            }
        }
        Ok(events)
    }

    fn require_in_progress(&self) -> Result<(), GameError> {
        match self.phase {
            GamePhase::Waiting => Err(GameError::GameNotStarted),
            GamePhase::InProgress => Ok(()),
            GamePhase::Finished => Err(GameError::GameOver),
        }
    }

    fn start_game<R: Rng>(
        &mut self,
        player: &str,
        rng: &mut R,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        if self.phase != GamePhase::Waiting {
            return Err(GameError::GameAlreadyStarted);
        }

        let name = self.catalog.starting_tile.clone();
        let definition = self
            .catalog
            .definition(&name)
            .cloned()
            .ok_or_else(|| GameError::MissingStartingTile(name.clone()))?;
        self.bag = self
            .bag
            .take(&name)
            .ok_or_else(|| GameError::MissingStartingTile(name.clone()))?;

        let tile = PlacedTile::new(
            self.board.next_tile_id(),
            Coord::ORIGIN,
            definition,
            Rotation::Deg0,
            None,
        );
        self.put_and_integrate(None, tile, events)?;

        self.phase = GamePhase::InProgress;
        self.current_player = Some(player.to_string());
        events.push(GameEvent::GameStarted {
            starting_tile: name,
            first_player: player.to_string(),
        });
        self.deal_or_finish(player, rng, events);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn place_tile<R: Rng>(
        &mut self,
        player: &str,
        coord: Coord,
        name: &str,
        rotation: Rotation,
        follower: Option<FollowerRequest>,
        rng: &mut R,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        let definition = self
            .catalog
            .definition(name)
            .cloned()
            .ok_or_else(|| GameError::UnknownTile(name.to_string()))?;
        let held = self
            .drawn_tile
            .as_ref()
            .is_some_and(|drawn| drawn.player == player && drawn.tile == name);
        if !held {
            return Err(GameError::NotHeldTile(name.to_string()));
        }

        let tile = PlacedTile::new(self.board.next_tile_id(), coord, definition, rotation, None);
        validate(&self.board, coord, tile.layout())?;
        if !self.board.is_empty() && !self.board.has_neighbor(coord) {
            return Err(GameError::NotAdjacent(coord));
        }

        let follower = match follower {
            Some(request) => Some(self.claim_follower(player, &tile, &request)?),
            None => None,
        };
        let tile = tile.with_follower(follower);
        self.put_and_integrate(Some(player), tile, events)?;

        let next = next_active_player(&self.players, player)?;
        self.current_player = Some(next.clone());
        self.drawn_tile = None;
        events.push(GameEvent::TurnChanged {
            player: next.clone(),
        });
        self.deal_or_finish(&next, rng, events);
        Ok(())
    }

    /// Check a follower request against the rotated tile and take one
    /// follower from the player's supply.
    fn claim_follower(
        &mut self,
        player: &str,
        tile: &PlacedTile,
        request: &FollowerRequest,
    ) -> Result<FollowerPlacement, GameError> {
        let group = tile
            .layout()
            .and_then(|layout| {
                layout
                    .groups(request.kind)
                    .iter()
                    .find(|group| group.intersects(&request.directions))
            })
            .cloned();

        let owner = self.player_mut(player)?;
        if !owner.has_followers() {
            return Err(GameError::NoFollowersLeft);
        }
        let group = group.ok_or(GameError::InvalidFollower)?;
        owner.followers -= 1;

        Ok(FollowerPlacement {
            owner: owner.username.clone(),
            color: owner.color,
            kind: request.kind,
            group,
        })
    }

    fn put_and_integrate(
        &mut self,
        player: Option<&str>,
        tile: PlacedTile,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        self.board.put(tile.clone())?;
        let integration = integrate(&self.board, &self.paths, &tile);
        self.paths = integration.registry;

        self.moves.push(BoardMove {
            player: player.map(str::to_string),
            tile: tile.name().to_string(),
            coord: tile.coord(),
            rotation: tile.rotation(),
        });
        events.push(GameEvent::TilePlaced {
            player: player.map(str::to_string),
            tile_id: tile.id(),
            tile: tile.name().to_string(),
            coord: tile.coord(),
            rotation: tile.rotation(),
            follower: tile.follower().map(|f| f.kind),
        });

        for id in integration.completed {
            if let Some(path) = self.paths.find(id) {
                events.push(GameEvent::PathCompleted {
                    path: id,
                    kind: path.kind,
                    points: path.points,
                    owners: path.owners.clone(),
                });
            }
        }
        Ok(())
    }

    /// Draw a tile for `player`, replacing any tile held
    fn draw_for<R: Rng>(&mut self, player: &str, rng: &mut R) -> Result<String, GameError> {
        let (tile, bag) = self.bag.draw(rng)?;
        self.bag = bag;
        self.drawn_tile = Some(DrawnTile {
            player: player.to_string(),
            tile: tile.clone(),
        });
        Ok(tile)
    }

    fn deal_or_finish<R: Rng>(&mut self, player: &str, rng: &mut R, events: &mut Vec<GameEvent>) {
        match self.draw_for(player, rng) {
            Ok(tile) => {
                events.push(GameEvent::TileDrawn {
                    player: player.to_string(),
                    tile,
                });
                self.finish_if_stuck(events);
            }
            Err(_) => self.finish(events),
        }
    }

    /// End the game when the bag is empty and the held tile fits nowhere
    fn finish_if_stuck(&mut self, events: &mut Vec<GameEvent>) {
        if !self.bag.is_empty() {
            return;
        }
        let placeable = self
            .drawn_tile
            .as_ref()
            .and_then(|drawn| self.catalog.definition(&drawn.tile))
            .is_some_and(|definition| has_valid_placement(&self.board, definition));
        if !placeable {
            debug!(tile = ?self.drawn_tile, "last tile fits nowhere");
            self.finish(events);
        }
    }

    fn finish(&mut self, events: &mut Vec<GameEvent>) {
        debug!(moves = self.moves.len(), "game finished");
        self.phase = GamePhase::Finished;
        self.drawn_tile = None;
        events.push(GameEvent::GameFinished);
    }

    /// Mark `username` as gone.
    ///
    /// If it was their turn, the turn and the held tile pass to the next
    /// connected player.
    pub fn drop_player(&self, username: &str) -> Result<Outcome, GameError> {
        let mut state = self.clone();
        state.player_mut(username)?.connection = Connection::Disconnected;

        let mut events = Vec::new();
        if state.phase == GamePhase::InProgress && state.is_players_turn(username) {
            let next = next_active_player(&state.players, username)?;
            debug!(from = username, to = %next, "passing turn of dropped player");
            if let Some(drawn) = state.drawn_tile.as_mut() {
                drawn.player = next.clone();
            }
            state.current_player = Some(next.clone());
            events.push(GameEvent::TurnChanged { player: next });
        }
        Ok(Outcome { state, events })
    }
}
