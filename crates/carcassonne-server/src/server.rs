//! WebSocket server and connection handling.

use crate::config::ServerConfig;
use crate::protocol::{ClientMessage, RoomInfo, RoomStatus, ServerMessage};
use crate::room::{GameRoom, RoomError};
use carcassonne_core::{Coord, GameCommand, GameEvent};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    pub config: ServerConfig,
    /// All active rooms; each entry's lock serializes that room's commands
    pub rooms: DashMap<Uuid, GameRoom>,
    /// Mapping from player ID to their room ID
    pub player_rooms: DashMap<Uuid, Uuid>,
    /// Mapping from player ID to their message sender
    pub player_senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            rooms: DashMap::new(),
            player_rooms: DashMap::new(),
            player_senders: DashMap::new(),
        }
    }

    /// Send a message to a specific player.
    pub fn send_to_player(&self, player_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.player_senders.get(&player_id) {
            let _ = sender.send(msg);
        }
    }

    /// Send an error message to a specific player.
    pub fn send_error(&self, player_id: Uuid, err: &RoomError) {
        self.send_to_player(
            player_id,
            ServerMessage::Error {
                message: err.to_string(),
            },
        );
    }

    /// Broadcast a message to all connected players in a room.
    pub fn broadcast_to_room(&self, room_id: Uuid, msg: ServerMessage) {
        if let Some(room) = self.rooms.get(&room_id) {
            for player in room.players.values().filter(|p| p.connected) {
                self.send_to_player(player.id, msg.clone());
            }
        }
    }

    /// Broadcast a message to all connected players in a room except one.
    pub fn broadcast_to_room_except(&self, room_id: Uuid, except: Uuid, msg: ServerMessage) {
        if let Some(room) = self.rooms.get(&room_id) {
            for player in room.players.values().filter(|p| p.connected && p.id != except) {
                self.send_to_player(player.id, msg.clone());
            }
        }
    }

    /// Get list of waiting rooms.
    pub fn get_waiting_rooms(&self) -> Vec<RoomInfo> {
        self.rooms
            .iter()
            .filter(|r| r.status == RoomStatus::Waiting)
            .map(|r| r.to_info())
            .collect()
    }

    fn room_of(&self, player_id: Uuid) -> Result<Uuid, RoomError> {
        self.player_rooms
            .get(&player_id)
            .map(|entry| *entry)
            .ok_or(RoomError::PlayerNotInRoom)
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Carcassonne server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Assign a player ID
    let player_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.player_senders.insert(player_id, tx);

    let welcome = ServerMessage::Welcome { player_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text)).await?;

    // Forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to encode message: {}", e),
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(player_id, client_msg, &state),
                Err(e) => warn!("Invalid message from {}: {}", player_id, e),
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", player_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                state.send_to_player(player_id, ServerMessage::Pong);
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", player_id, e);
                break;
            }
            _ => {}
        }
    }

    handle_disconnect(player_id, &state);
    state.player_senders.remove(&player_id);
    send_task.abort();

    info!("Connection closed for {}", player_id);
    Ok(())
}

/// Handle a client message.
fn handle_message(player_id: Uuid, msg: ClientMessage, state: &Arc<ServerState>) {
    match msg {
        ClientMessage::CreateRoom { player_name, color } => {
            let room_id = Uuid::new_v4();
            let room = GameRoom::new(
                room_id,
                player_id,
                player_name,
                color,
                state.config.max_players,
                state.config.catalog.clone(),
            );
            let room_info = room.to_info();

            state.rooms.insert(room_id, room);
            state.player_rooms.insert(player_id, room_id);
            info!("Room {} created by {}", room_id, player_id);

            state.send_to_player(player_id, ServerMessage::RoomCreated { room_id });
            state.send_to_player(player_id, ServerMessage::JoinedRoom { room: room_info });
        }

        ClientMessage::JoinRoom {
            room_id,
            player_name,
            color,
        } => {
            let Some(mut room) = state.rooms.get_mut(&room_id) else {
                state.send_error(player_id, &RoomError::RoomNotFound);
                return;
            };
            match room.add_player(player_id, player_name, color) {
                Ok(_) => {
                    let room_info = room.to_info();
                    state.player_rooms.insert(player_id, room_id);
                    info!("Player {} joined room {}", player_id, room_id);

                    // Release lock before broadcasting
                    drop(room);
                    state.send_to_player(
                        player_id,
                        ServerMessage::JoinedRoom {
                            room: room_info.clone(),
                        },
                    );
                    state.broadcast_to_room_except(
                        room_id,
                        player_id,
                        ServerMessage::RoomUpdated { room: room_info },
                    );
                }
                Err(e) => {
                    drop(room);
                    state.send_error(player_id, &e);
                }
            }
        }

        ClientMessage::LeaveRoom => {
            if let Some((_, room_id)) = state.player_rooms.remove(&player_id) {
                leave_room(player_id, room_id, state);
                state.send_to_player(player_id, ServerMessage::LeftRoom);
            }
        }

        ClientMessage::StartGame => handle_start(player_id, state),

        ClientMessage::DrawTile => handle_command(player_id, GameCommand::DrawTile, state),

        ClientMessage::PlaceTile {
            x,
            y,
            tile,
            rotation,
            follower,
        } => {
            let command = GameCommand::PlaceTile {
                coord: Coord::new(x, y),
                tile,
                rotation,
                follower,
            };
            handle_command(player_id, command, state);
        }

        ClientMessage::ListRooms => {
            let rooms = state.get_waiting_rooms();
            state.send_to_player(player_id, ServerMessage::RoomList { rooms });
        }

        ClientMessage::Ping => {
            state.send_to_player(player_id, ServerMessage::Pong);
        }
    }
}

/// Remove a player from a room, dropping the room once nobody connected is
/// left. Mid-game the seat stays and its turn passes on.
fn leave_room(player_id: Uuid, room_id: Uuid, state: &Arc<ServerState>) {
    let Some(mut room) = state.rooms.get_mut(&room_id) else {
        return;
    };
    let events = match room.remove_player(player_id) {
        Ok(events) => events,
        Err(e) => {
            warn!("Player {} could not leave room {}: {}", player_id, room_id, e);
            return;
        }
    };

    if room.is_abandoned() {
        drop(room);
        state.rooms.remove(&room_id);
        info!("Room {} closed", room_id);
        return;
    }

    let room_info = room.to_info();
    let game_state = room.game_state().cloned().filter(|_| !events.is_empty());
    drop(room);

    state.broadcast_to_room(room_id, ServerMessage::RoomUpdated { room: room_info });
    if let Some(game_state) = game_state {
        state.broadcast_to_room(
            room_id,
            ServerMessage::GameState {
                state: Box::new(game_state),
            },
        );
    }
    for event in events {
        if let GameEvent::TurnChanged { player } = event {
            state.broadcast_to_room(room_id, ServerMessage::TurnChanged { player });
        }
    }
}

fn handle_start(player_id: Uuid, state: &Arc<ServerState>) {
    let room_id = match state.room_of(player_id) {
        Ok(room_id) => room_id,
        Err(e) => return state.send_error(player_id, &e),
    };
    let Some(mut room) = state.rooms.get_mut(&room_id) else {
        return state.send_error(player_id, &RoomError::RoomNotFound);
    };

    match room.start_game(player_id) {
        Ok(events) => {
            let game_state = room.game_state().cloned();
            let current_player = room.current_player();
            drop(room);
            info!("Game started in room {}", room_id);

            if let Some(game_state) = game_state {
                state.broadcast_to_room(
                    room_id,
                    ServerMessage::GameStarted {
                        state: Box::new(game_state),
                    },
                );
            }
            state.send_to_player(
                player_id,
                ServerMessage::CommandResult {
                    success: true,
                    events,
                    error: None,
                },
            );
            if let Some(player) = current_player {
                state.broadcast_to_room(room_id, ServerMessage::TurnChanged { player });
            }
        }
        Err(e) => {
            drop(room);
            warn!("Start rejected in room {}: {}", room_id, e);
            state.send_error(player_id, &e);
        }
    }
}

/// Run a game command and broadcast the result.
fn handle_command(player_id: Uuid, command: GameCommand, state: &Arc<ServerState>) {
    let room_id = match state.room_of(player_id) {
        Ok(room_id) => room_id,
        Err(e) => return state.send_error(player_id, &e),
    };
    let Some(mut room) = state.rooms.get_mut(&room_id) else {
        return state.send_error(player_id, &RoomError::RoomNotFound);
    };

    match room.execute(player_id, command) {
        Ok(events) => {
            let game_state = room.game_state().cloned();
            let finished = room.status == RoomStatus::Finished;
            let scores = room.scores();
            drop(room);

            let turn_changes: Vec<String> = events
                .iter()
                .filter_map(|event| match event {
                    GameEvent::TurnChanged { player } => Some(player.clone()),
                    _ => None,
                })
                .collect();

            state.send_to_player(
                player_id,
                ServerMessage::CommandResult {
                    success: true,
                    events,
                    error: None,
                },
            );
            if let Some(game_state) = game_state {
                state.broadcast_to_room(
                    room_id,
                    ServerMessage::GameState {
                        state: Box::new(game_state),
                    },
                );
            }
            for player in turn_changes {
                state.broadcast_to_room(room_id, ServerMessage::TurnChanged { player });
            }
            if finished {
                info!("Game over in room {}", room_id);
                state.broadcast_to_room(room_id, ServerMessage::GameOver { scores });
            }
        }
        Err(e) => {
            drop(room);
            warn!("Command from {} rejected in room {}: {}", player_id, room_id, e);
            state.send_to_player(
                player_id,
                ServerMessage::CommandResult {
                    success: false,
                    events: vec![],
                    error: Some(e.to_string()),
                },
            );
        }
    }
}

/// Handle player disconnect.
fn handle_disconnect(player_id: Uuid, state: &Arc<ServerState>) {
    if let Some((_, room_id)) = state.player_rooms.remove(&player_id) {
        leave_room(player_id, room_id, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connect(state: &Arc<ServerState>) -> (Uuid, mpsc::UnboundedReceiver<ServerMessage>) {
        let player_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        state.player_senders.insert(player_id, tx);
        (player_id, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    fn create_room(state: &Arc<ServerState>, host: Uuid, name: &str) -> Uuid {
        handle_message(
            host,
            ClientMessage::CreateRoom {
                player_name: name.to_string(),
                color: None,
            },
            state,
        );
        *state.player_rooms.get(&host).expect("host is in a room")
    }

    #[test]
    fn test_create_and_join_room() {
        let state = Arc::new(ServerState::default());
        let (host, mut host_rx) = connect(&state);
        let (guest, mut guest_rx) = connect(&state);

        let room_id = create_room(&state, host, "alice");
        let host_msgs = drain(&mut host_rx);
        assert!(matches!(
            host_msgs[0],
            ServerMessage::RoomCreated { room_id: id } if id == room_id
        ));
        assert_eq!(state.get_waiting_rooms().len(), 1);

        handle_message(
            guest,
            ClientMessage::JoinRoom {
                room_id,
                player_name: "bob".to_string(),
                color: None,
            },
            &state,
        );
        let guest_msgs = drain(&mut guest_rx);
        match &guest_msgs[0] {
            ServerMessage::JoinedRoom { room } => assert_eq!(room.players.len(), 2),
            other => panic!("unexpected message {:?}", other),
        }
        assert!(drain(&mut host_rx)
            .iter()
            .any(|m| matches!(m, ServerMessage::RoomUpdated { .. })));
    }

    #[test]
    fn test_join_unknown_room() {
        let state = Arc::new(ServerState::default());
        let (player, mut rx) = connect(&state);
        handle_message(
            player,
            ClientMessage::JoinRoom {
                room_id: Uuid::new_v4(),
                player_name: "bob".to_string(),
                color: None,
            },
            &state,
        );
        assert!(matches!(drain(&mut rx)[0], ServerMessage::Error { .. }));
    }

    #[test]
    fn test_start_and_reject_out_of_turn() {
        let state = Arc::new(ServerState::default());
        let (host, mut host_rx) = connect(&state);
        let (guest, mut guest_rx) = connect(&state);
        let room_id = create_room(&state, host, "alice");
        handle_message(
            guest,
            ClientMessage::JoinRoom {
                room_id,
                player_name: "bob".to_string(),
                color: None,
            },
            &state,
        );
        drain(&mut host_rx);
        drain(&mut guest_rx);

        handle_message(host, ClientMessage::StartGame, &state);
        let guest_msgs = drain(&mut guest_rx);
        assert!(guest_msgs
            .iter()
            .any(|m| matches!(m, ServerMessage::GameStarted { .. })));
        assert!(guest_msgs.iter().any(
            |m| matches!(m, ServerMessage::TurnChanged { player } if player == "alice")
        ));
        assert!(state.get_waiting_rooms().is_empty());

        handle_message(guest, ClientMessage::DrawTile, &state);
        match &drain(&mut guest_rx)[0] {
            ServerMessage::CommandResult { success, error, .. } => {
                assert!(!success);
                assert_eq!(error.as_deref(), Some("Not your turn"));
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_disconnect_before_start_closes_room() {
        let state = Arc::new(ServerState::default());
        let (host, _rx) = connect(&state);
        let room_id = create_room(&state, host, "alice");

        handle_disconnect(host, &state);
        assert!(state.rooms.get(&room_id).is_none());
        assert!(state.player_rooms.get(&host).is_none());
    }

    #[test]
    fn test_leave_mid_game_keeps_room_playable() {
        let state = Arc::new(ServerState::default());
        let (host, mut host_rx) = connect(&state);
        let (guest, mut guest_rx) = connect(&state);
        let room_id = create_room(&state, host, "alice");
        handle_message(
            guest,
            ClientMessage::JoinRoom {
                room_id,
                player_name: "bob".to_string(),
                color: None,
            },
            &state,
        );
        handle_message(host, ClientMessage::StartGame, &state);
        drain(&mut host_rx);
        drain(&mut guest_rx);

        handle_message(host, ClientMessage::LeaveRoom, &state);
        assert!(drain(&mut host_rx)
            .iter()
            .any(|m| matches!(m, ServerMessage::LeftRoom)));
        assert!(drain(&mut guest_rx).iter().any(
            |m| matches!(m, ServerMessage::TurnChanged { player } if player == "bob")
        ));

        handle_message(guest, ClientMessage::DrawTile, &state);
        match &drain(&mut guest_rx)[0] {
            ServerMessage::CommandResult { success, .. } => assert!(success),
            other => panic!("unexpected message {:?}", other),
        }
        // The leaver no longer hears about the room.
        assert!(drain(&mut host_rx).is_empty());

        handle_disconnect(guest, &state);
        assert!(state.rooms.get(&room_id).is_none());
    }
}
