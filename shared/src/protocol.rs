//! JSON message vocabulary exchanged over the WebSocket, discriminated by `type`.

use crate::entity::{Direction, Point, Snake};
use crate::PlayerId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Bad JSON, an unknown `type`, or a direction that is not a unit vector.
    #[error("malformed message: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("binary frame is not valid UTF-8")]
    NotUtf8(#[from] std::str::Utf8Error),
}

/// Messages sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Sent once, to the joining client only.
    Init {
        #[serde(rename = "playerId")]
        player_id: PlayerId,
        color: String,
    },
    PlayerJoined {
        #[serde(rename = "playerId")]
        player_id: PlayerId,
    },
    PlayerLeft {
        #[serde(rename = "playerId")]
        player_id: PlayerId,
    },
    /// Full world state, broadcast every tick.
    Update {
        players: Vec<PlayerView>,
        food: Vec<Point>,
    },
    /// Connection refused; the server closes the socket right after.
    Error { message: String },
}

/// Messages sent by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Move { direction: Direction },
    Reset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub snake: SnakeView,
    pub color: String,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnakeView {
    pub body: Vec<Point>,
    pub direction: Direction,
    pub alive: bool,
}

impl PlayerView {
    pub fn new(id: PlayerId, snake: &Snake) -> Self {
        Self {
            id,
            snake: SnakeView {
                body: snake.body().iter().copied().collect(),
                direction: snake.direction(),
                alive: snake.is_alive(),
            },
            color: snake.color().to_string(),
            score: snake.score(),
        }
    }
}

pub fn encode_server(message: &ServerMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(ProtocolError::Encode)
}

pub fn decode_client(text: &str) -> Result<ClientMessage, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Malformed)
}

/// Decodes a client message delivered in a binary frame.
pub fn decode_client_bytes(bytes: &[u8]) -> Result<ClientMessage, ProtocolError> {
    decode_client(std::str::from_utf8(bytes)?)
}

pub fn encode_client(message: &ClientMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(ProtocolError::Encode)
}

pub fn decode_server(text: &str) -> Result<ServerMessage, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn to_value(message: &ServerMessage) -> Value {
        serde_json::from_str(&encode_server(message).unwrap()).unwrap()
    }

    #[test]
    fn test_init_wire_format() {
        let message = ServerMessage::Init {
            player_id: 7,
            color: "#e6194b".to_string(),
        };
        assert_eq!(
            to_value(&message),
            json!({"type": "init", "playerId": 7, "color": "#e6194b"})
        );
    }

    #[test]
    fn test_join_and_leave_wire_format() {
        assert_eq!(
            to_value(&ServerMessage::PlayerJoined { player_id: 3 }),
            json!({"type": "playerJoined", "playerId": 3})
        );
        assert_eq!(
            to_value(&ServerMessage::PlayerLeft { player_id: 3 }),
            json!({"type": "playerLeft", "playerId": 3})
        );
    }

    #[test]
    fn test_update_wire_format() {
        let mut snake = Snake::with_body(
            [Point::new(11, 10), Point::new(10, 10)],
            Direction::Right,
            "#3cb44b",
        );
        snake.award(10);

        let message = ServerMessage::Update {
            players: vec![PlayerView::new(2, &snake)],
            food: vec![Point::new(1, 2)],
        };

        assert_eq!(
            to_value(&message),
            json!({
                "type": "update",
                "players": [{
                    "id": 2,
                    "snake": {
                        "body": [{"x": 11, "y": 10}, {"x": 10, "y": 10}],
                        "direction": {"x": 1, "y": 0},
                        "alive": true
                    },
                    "color": "#3cb44b",
                    "score": 10
                }],
                "food": [{"x": 1, "y": 2}]
            })
        );
    }

    #[test]
    fn test_decode_move() {
        let message = decode_client(r#"{"type":"move","direction":{"x":0,"y":-1}}"#).unwrap();
        assert_eq!(
            message,
            ClientMessage::Move {
                direction: Direction::Up
            }
        );
    }

    #[test]
    fn test_decode_reset() {
        assert_eq!(decode_client(r#"{"type":"reset"}"#).unwrap(), ClientMessage::Reset);
    }

    #[test]
    fn test_decode_rejects_out_of_range_direction() {
        for text in [
            r#"{"type":"move","direction":{"x":1,"y":1}}"#,
            r#"{"type":"move","direction":{"x":0,"y":0}}"#,
            r#"{"type":"move","direction":{"x":5,"y":0}}"#,
            r#"{"type":"move","direction":{"x":0.5,"y":0}}"#,
            r#"{"type":"move"}"#,
        ] {
            assert!(
                matches!(decode_client(text), Err(ProtocolError::Malformed(_))),
                "accepted {}",
                text
            );
        }
    }

    #[test]
    fn test_decode_rejects_unknown_type_and_garbage() {
        assert!(decode_client(r#"{"type":"teleport"}"#).is_err());
        assert!(decode_client(r#"{"direction":{"x":1,"y":0}}"#).is_err());
        assert!(decode_client("not json").is_err());
        assert!(decode_client("").is_err());
    }

    #[test]
    fn test_decode_binary_frame() {
        let bytes = br#"{"type":"reset"}"#;
        assert_eq!(decode_client_bytes(bytes).unwrap(), ClientMessage::Reset);
        assert!(matches!(
            decode_client_bytes(&[0xff, 0xfe]),
            Err(ProtocolError::NotUtf8(_))
        ));
    }

    #[test]
    fn test_client_encoding_is_accepted_by_decoder() {
        let message = ClientMessage::Move {
            direction: Direction::Left,
        };
        let text = encode_client(&message).unwrap();
        assert_eq!(decode_client(&text).unwrap(), message);
    }
}
