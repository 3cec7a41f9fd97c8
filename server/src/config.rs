use shared::{GameConfig, DEFAULT_MAX_CLIENTS, TICK_INTERVAL_MS};
use std::time::Duration;

/// Runtime settings for one server process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Time between simulation steps
    pub tick_interval: Duration,
    /// Joins beyond this are refused
    pub max_clients: usize,
    /// How long shutdown waits for connections to flush their close frames
    pub shutdown_grace: Duration,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(TICK_INTERVAL_MS),
            max_clients: DEFAULT_MAX_CLIENTS,
            shutdown_grace: Duration::from_millis(500),
            game: GameConfig::default(),
        }
    }
}
