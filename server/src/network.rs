//! Server network layer handling WebSocket connections and tick coordination

use crate::config::ServerConfig;
use crate::lobby::{Lobby, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{PlayerId, OUTBOUND_QUEUE_CAPACITY};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Main server coordinating connections and the simulation
///
/// A single loop owns the [`Lobby`]: connection events, ticks, accepts and
/// shutdown are taken one at a time, so simulation state is never observed
/// half-updated.
pub struct Server {
    listener: TcpListener,
    lobby: Lobby,
    shutdown_grace: Duration,
    connections: JoinSet<()>,

    // Connection tasks -> main loop
    event_tx: mpsc::UnboundedSender<ServerEvent>,
    event_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Server {
    pub async fn new(addr: &str, config: ServerConfig) -> io::Result<Self> {
        let lobby = Lobby::new(&config);
        Self::with_lobby(addr, config, lobby).await
    }

    pub async fn with_lobby(addr: &str, config: ServerConfig, lobby: Lobby) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            lobby,
            shutdown_grace: config.shutdown_grace,
            connections: JoinSet::new(),
            event_tx,
            event_rx,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Main server loop; returns once `shutdown` resolves and connections drained
    pub async fn run<F>(mut self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Server started successfully");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Server shutting down");
                    break;
                }

                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            debug!("Accepted TCP connection from {}", addr);
                            self.connections
                                .spawn(handle_connection(stream, addr, self.event_tx.clone()));
                        }
                        Err(e) => {
                            error!("Error accepting connection: {}", e);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    }
                }

                // The loop holds a sender, so this never yields None
                Some(event) = self.event_rx.recv() => {
                    self.lobby.handle_event(event);
                }

                _ = self.lobby.next_tick() => {
                    self.lobby.on_tick();
                }

                Some(finished) = self.connections.join_next(), if !self.connections.is_empty() => {
                    if let Err(e) = finished {
                        error!("Connection task failed: {}", e);
                    }
                }
            }
        }

        self.drain().await;
        Ok(())
    }

    /// Stops ticking, closes every socket and waits for writers to flush
    async fn drain(mut self) {
        self.lobby.shutdown();
        drop(self.listener);

        // Unanswered joins see their reply dropped and close right away.
        self.event_rx.close();
        while self.event_rx.try_recv().is_ok() {}

        let pending = self.connections.len();
        let finished = tokio::time::timeout(self.shutdown_grace, async {
            while self.connections.join_next().await.is_some() {}
        })
        .await;

        match finished {
            Ok(()) => info!("Drained {} connection tasks", pending),
            Err(_) => {
                warn!(
                    "{} connection tasks still open after {:?}, aborting",
                    self.connections.len(),
                    self.shutdown_grace
                );
                self.connections.shutdown().await;
            }
        }
    }
}

/// Runs one client connection from handshake to close
///
/// Inbound frames become [`ServerEvent`]s; outbound frames come from the
/// bounded queue the registry writes into. A socket error ends the
/// connection the same way a clean close does.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    events: mpsc::UnboundedSender<ServerEvent>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
    let (reply_tx, reply_rx) = oneshot::channel();

    let connected = ServerEvent::Connected {
        addr,
        sender: outbound_tx,
        reply: reply_tx,
    };
    if events.send(connected).is_err() {
        return;
    }

    let id: PlayerId = match reply_rx.await {
        Ok(Some(id)) => id,
        _ => {
            // Refused: flush the explanation, then close.
            while let Ok(message) = outbound_rx.try_recv() {
                let _ = ws_sender.send(message).await;
            }
            let _ = ws_sender.close().await;
            return;
        }
    };

    loop {
        tokio::select! {
            inbound = ws_receiver.next() => {
                let event = match inbound {
                    Some(Ok(Message::Text(text))) => ServerEvent::Message { id, text },
                    Some(Ok(Message::Binary(bytes))) => ServerEvent::Binary { id, bytes },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!("Connection error for player {}: {}", id, e);
                        break;
                    }
                };
                if events.send(event).is_err() {
                    break;
                }
            }

            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(Message::Close(frame)) => {
                        let _ = ws_sender.send(Message::Close(frame)).await;
                        break;
                    }
                    Some(message) => {
                        if let Err(e) = ws_sender.send(message).await {
                            warn!("Failed to write to player {}: {}", id, e);
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    let _ = events.send(ServerEvent::Disconnected { id });
    debug!("Connection task for player {} finished", id);
}
