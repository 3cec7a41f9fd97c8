//! Connection lifecycle mapped onto the simulation
//!
//! The [`Lobby`] owns the connection registry, the game state and the tick
//! scheduler. It is driven from a single task: connection tasks describe what
//! happened on their socket as a [`ServerEvent`], and the owning loop applies
//! events and ticks one at a time. Nothing else touches the state.

use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::game::GameState;
use crate::scheduler::TickScheduler;
use log::{debug, error, info, warn};
use shared::{
    decode_client, decode_client_bytes, encode_server, ClientMessage, PlayerId, ProtocolError,
    ServerMessage,
};
use std::net::SocketAddr;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;

/// Events sent from connection tasks to the owning loop
#[derive(Debug)]
pub enum ServerEvent {
    /// Handshake done; `reply` receives the identity, or None if refused
    Connected {
        addr: SocketAddr,
        sender: mpsc::Sender<Message>,
        reply: oneshot::Sender<Option<PlayerId>>,
    },
    /// A text frame from a joined client
    Message { id: PlayerId, text: String },
    /// A binary frame from a joined client, expected to hold UTF-8 JSON
    Binary { id: PlayerId, bytes: Vec<u8> },
    /// Socket closed or errored
    Disconnected { id: PlayerId },
}

pub struct Lobby {
    clients: ClientManager,
    game: GameState,
    scheduler: TickScheduler,
}

impl Lobby {
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_game(config, GameState::new(config.game.clone()))
    }

    pub fn with_game(config: &ServerConfig, game: GameState) -> Self {
        Self {
            clients: ClientManager::new(config.max_clients),
            game,
            scheduler: TickScheduler::new(config.tick_interval),
        }
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut GameState {
        &mut self.game
    }

    pub fn is_ticking(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Resolves when the next tick is due; never while nobody is connected.
    pub async fn next_tick(&mut self) {
        self.scheduler.tick().await
    }

    /// Calls the handler matching the given event
    pub fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Connected {
                addr,
                sender,
                reply,
            } => {
                let id = self.on_join(addr, sender);
                if reply.send(id).is_err() {
                    // The connection task is gone before it learned its identity.
                    if let Some(id) = id {
                        self.on_close(id);
                    }
                }
            }
            ServerEvent::Message { id, text } => self.on_message(id, &text),
            ServerEvent::Binary { id, bytes } => self.on_binary(id, &bytes),
            ServerEvent::Disconnected { id } => self.on_close(id),
        }
    }

    /// Registers a connection, spawns its snake and announces it
    pub fn on_join(
        &mut self,
        addr: SocketAddr,
        sender: mpsc::Sender<Message>,
    ) -> Option<PlayerId> {
        if self.clients.is_full() {
            warn!("Refusing connection from {}: server full", addr);
            let refusal = ServerMessage::Error {
                message: "Server full".to_string(),
            };
            if let Ok(text) = encode_server(&refusal) {
                let _ = sender.try_send(Message::Text(text));
            }
            return None;
        }

        let (id, color) = self.clients.add_client(addr, sender)?;
        self.game.add_player(id, &color);

        self.send_to(id, &ServerMessage::Init {
            player_id: id,
            color,
        });
        self.broadcast(&ServerMessage::PlayerJoined { player_id: id }, Some(id));

        if self.scheduler.start() {
            info!("First player joined, tick scheduler started");
        }
        Some(id)
    }

    /// Applies one client message; malformed input is logged and dropped
    pub fn on_message(&mut self, id: PlayerId, text: &str) {
        self.apply(id, decode_client(text));
    }

    pub fn on_binary(&mut self, id: PlayerId, bytes: &[u8]) {
        self.apply(id, decode_client_bytes(bytes));
    }

    fn apply(&mut self, id: PlayerId, decoded: Result<ClientMessage, ProtocolError>) {
        if self.clients.get(id).is_none() {
            debug!("Ignoring message from unknown player {}", id);
            return;
        }

        match decoded {
            Ok(ClientMessage::Move { direction }) => {
                if !self.game.set_direction(id, direction) {
                    debug!("Player {} move {:?} rejected", id, direction);
                }
            }
            Ok(ClientMessage::Reset) => {
                self.game.reset_player(id);
            }
            Err(e) => {
                warn!("Discarding message from player {}: {}", id, e);
            }
        }
    }

    /// Forgets a connection and its snake; stops ticking when the arena empties
    pub fn on_close(&mut self, id: PlayerId) {
        if !self.clients.remove_client(id) {
            return;
        }
        self.game.remove_player(id);
        self.broadcast(&ServerMessage::PlayerLeft { player_id: id }, None);

        if self.clients.is_empty() {
            if self.scheduler.stop() {
                info!("Last player left, tick scheduler stopped");
            }
            self.game.clear_food();
        }
    }

    /// Runs one simulation step and broadcasts the result
    pub fn on_tick(&mut self) {
        let outcome = self.game.step();
        if !outcome.deaths.is_empty() || !outcome.pickups.is_empty() {
            debug!(
                "Tick {}: {} deaths, {} pickups",
                outcome.tick,
                outcome.deaths.len(),
                outcome.pickups.len()
            );
        }
        self.broadcast(&self.game.snapshot(), None);
    }

    /// Stops the simulation and closes every connection
    pub fn shutdown(&mut self) {
        self.scheduler.stop();
        let closed = self.clients.close_all();
        for id in &closed {
            self.game.remove_player(*id);
        }
        self.game.clear_food();
        info!("Closed {} connections", closed.len());
    }

    fn send_to(&self, id: PlayerId, message: &ServerMessage) {
        match encode_server(message) {
            Ok(text) => {
                self.clients.send_to(id, &text);
            }
            Err(e) => error!("Failed to encode message for player {}: {}", id, e),
        }
    }

    /// Serializes once, then fans out
    fn broadcast(&self, message: &ServerMessage, exclude: Option<PlayerId>) {
        match encode_server(message) {
            Ok(text) => {
                self.clients.broadcast(&text, exclude);
            }
            Err(e) => error!("Failed to encode broadcast: {}", e),
        }
    }
}
