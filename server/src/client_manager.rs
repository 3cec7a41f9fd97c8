//! Connection registry for the arena server
//!
//! This module tracks every joined connection and its outbound queue:
//! - Identity assignment (monotonic, never reused within a process)
//! - Display color assignment from the shared palette
//! - Capacity enforcement
//! - Targeted sends and fan-out broadcasts
//!
//! Outbound queues are bounded and written with `try_send`, so a stalled
//! client can never hold up the tick loop.

use log::{debug, info, warn};
use shared::{palette_color, PlayerId};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_tungstenite::tungstenite::Message;

/// A joined connection and the queue feeding its socket writer
#[derive(Debug)]
pub struct Client {
    /// Identity assigned at join time
    pub id: PlayerId,
    /// Peer address, for logging
    pub addr: SocketAddr,
    /// Palette color, stable for the connection's lifetime
    pub color: String,
    sender: mpsc::Sender<Message>,
}

impl Client {
    pub fn new(
        id: PlayerId,
        addr: SocketAddr,
        color: String,
        sender: mpsc::Sender<Message>,
    ) -> Self {
        Self {
            id,
            addr,
            color,
            sender,
        }
    }

    /// Queues a frame without waiting. Returns false if the frame was dropped.
    fn deliver(&self, message: Message) -> bool {
        match self.sender.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue full for player {}, dropping frame", self.id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Outbound queue closed for player {}", self.id);
                false
            }
        }
    }
}

/// Registry of live connections, iterated in join order
///
/// Identities grow monotonically, so the `BTreeMap` ordering is also the
/// join order. This is what keeps broadcasts and the simulation's iteration
/// order reproducible.
pub struct ClientManager {
    clients: BTreeMap<PlayerId, Client>,
    next_client_id: PlayerId,
    joins: usize,
    max_clients: usize,
}

impl ClientManager {
    /// Creates an empty registry. Identities start at 1.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: BTreeMap::new(),
            next_client_id: 1,
            joins: 0,
            max_clients,
        }
    }

    pub fn is_full(&self) -> bool {
        self.clients.len() >= self.max_clients
    }

    /// Registers a new connection
    ///
    /// Returns the fresh identity and the assigned color, or None (dropping
    /// `sender`) when the server is at capacity.
    pub fn add_client(
        &mut self,
        addr: SocketAddr,
        sender: mpsc::Sender<Message>,
    ) -> Option<(PlayerId, String)> {
        if self.is_full() {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;
        let color = palette_color(self.joins).to_string();
        self.joins += 1;

        info!("Client {} connected from {} ({})", client_id, addr, color);
        self.clients
            .insert(client_id, Client::new(client_id, addr, color.clone(), sender));

        Some((client_id, color))
    }

    /// Removes a connection. Returns false if it was already gone.
    pub fn remove_client(&mut self, client_id: PlayerId) -> bool {
        if let Some(client) = self.clients.remove(&client_id) {
            info!("Client {} disconnected ({})", client.id, client.addr);
            true
        } else {
            false
        }
    }

    pub fn get(&self, client_id: PlayerId) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    /// Sends a text frame to one client
    pub fn send_to(&self, client_id: PlayerId, text: &str) -> bool {
        match self.clients.get(&client_id) {
            Some(client) => client.deliver(Message::Text(text.to_owned())),
            None => false,
        }
    }

    /// Sends the same text frame to every client except `exclude`
    ///
    /// A failed delivery is logged and skipped; the remaining clients still
    /// get the frame. Returns the number of successful deliveries.
    pub fn broadcast(&self, text: &str, exclude: Option<PlayerId>) -> usize {
        self.clients
            .values()
            .filter(|client| Some(client.id) != exclude)
            .filter(|client| client.deliver(Message::Text(text.to_owned())))
            .count()
    }

    /// Queues a close frame for every client and forgets them all
    pub fn close_all(&mut self) -> Vec<PlayerId> {
        let ids: Vec<PlayerId> = self.clients.keys().copied().collect();
        for client in self.clients.values() {
            client.deliver(Message::Close(None));
        }
        self.clients.clear();
        ids
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
