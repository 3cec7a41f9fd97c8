//! # Snake Arena Server Library
//!
//! Authoritative server for the multiplayer snake arena. It owns the one true
//! copy of the grid, advances it on a fixed tick, and pushes the full state to
//! every connected client after each step.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Clients only send intents (`move`, `reset`). Movement, collisions and food
//! pickups are decided here; clients draw whatever the last `update` says.
//!
//! ### Connection Lifecycle
//! - Identity and color assignment on join
//! - Snake spawn on join, removal on leave
//! - Join/leave notifications to the other players
//! - Capacity enforcement
//!
//! ### State Broadcasting
//! After every tick the world is serialized once and queued to each client.
//! A client that cannot keep up loses frames; nobody else is slowed down.
//!
//! ## Architecture Design
//!
//! ### Single Owner, Many Connections
//! Each WebSocket runs in its own task, but those tasks never touch game
//! state. They forward what they read as [`lobby::ServerEvent`]s to the main
//! loop in [`network::Server::run`], which owns the [`lobby::Lobby`] and
//! applies events and ticks strictly one after another.
//!
//! ### Input Debouncing
//! A `move` only updates the snake's pending direction. The direction is
//! committed at the next tick, so any burst of input inside one tick window
//! produces at most one turn.
//!
//! ### Tick Scheduling
//! The [`scheduler::TickScheduler`] starts with the first player and stops
//! with the last one; an empty server does no periodic work.
//!
//! ## Module Organization
//!
//! - `client_manager`: connection registry, identities, colors, fan-out
//! - `game`: the simulation engine (movement, collisions, food)
//! - `scheduler`: start/stop wrapper around the tick timer
//! - `lobby`: event dispatch between connections and the simulation
//! - `network`: TCP accept loop, WebSocket tasks, graceful shutdown
//! - `config`: runtime settings
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::new("127.0.0.1:8080", ServerConfig::default()).await?;
//!
//!     // Runs until Ctrl+C, then closes every connection before returning.
//!     server
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod game;
pub mod lobby;
pub mod network;
pub mod scheduler;
