//! Types and rules shared by the arena server and every client or test harness.
//!
//! The grid constants below must be identical on both ends of the wire: clients
//! draw a `GRID_SIZE` square board and never receive its dimensions.

pub mod entity;
pub mod protocol;

pub use entity::{CollisionKind, Direction, InvalidDirection, Point, Snake};
pub use protocol::{
    decode_client, decode_client_bytes, decode_server, encode_client, encode_server,
    ClientMessage, PlayerView, ProtocolError, ServerMessage, SnakeView,
};

/// Side length of the square grid, in cells.
pub const GRID_SIZE: i32 = 30;
/// Simulation step length in milliseconds.
pub const TICK_INTERVAL_MS: u64 = 100;
/// Number of consumables kept on the board while anyone is playing.
pub const MIN_FOOD: usize = 3;
/// Score awarded per consumable.
pub const FOOD_REWARD: u32 = 10;
/// Cells kept free between a freshly spawned head and the wall.
pub const SPAWN_MARGIN: i32 = 5;
/// Random placements tried before a consumable spawn is given up for this tick.
pub const FOOD_SPAWN_ATTEMPTS: usize = 100;
/// Player colors, handed out in join order and reused once exhausted.
pub const PALETTE: [&str; 8] = [
    "#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#42d4f4", "#f032e6", "#bfef45",
];
pub const DEFAULT_MAX_CLIENTS: usize = 32;
/// Frames buffered per connection before broadcasts to it start being dropped.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// Opaque connection identity. Never reused within a server process.
pub type PlayerId = u32;

/// Rules of the simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    pub grid_size: i32,
    pub min_food: usize,
    pub food_reward: u32,
    pub spawn_margin: i32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_size: GRID_SIZE,
            min_food: MIN_FOOD,
            food_reward: FOOD_REWARD,
            spawn_margin: SPAWN_MARGIN,
        }
    }
}

/// Color for the `join_index`-th player to join, wrapping around the palette.
pub fn palette_color(join_index: usize) -> &'static str {
    PALETTE[join_index % PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_constants() {
        let config = GameConfig::default();
        assert_eq!(config.grid_size, GRID_SIZE);
        assert_eq!(config.min_food, MIN_FOOD);
        assert_eq!(config.food_reward, FOOD_REWARD);
        assert_eq!(config.spawn_margin, SPAWN_MARGIN);
    }

    #[test]
    fn test_palette_wraps() {
        assert_eq!(palette_color(0), PALETTE[0]);
        assert_eq!(palette_color(PALETTE.len()), PALETTE[0]);
        assert_eq!(palette_color(PALETTE.len() + 3), PALETTE[3]);
    }

    #[test]
    fn test_spawn_area_fits_inside_grid() {
        assert!(GRID_SIZE > 2 * SPAWN_MARGIN);
    }
}
