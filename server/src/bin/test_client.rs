use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use rand::seq::SliceRandom;
use shared::{decode_server, encode_client, ClientMessage, Direction, ServerMessage};
use std::time::Duration;
use tokio::time::interval;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Headless bot that joins the arena and steers at random
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket URL of the server
    #[arg(short, long, default_value = "ws://127.0.0.1:8080")]
    server: String,

    /// Milliseconds between random turns
    #[arg(short, long, default_value = "300")]
    turn_ms: u64,

    /// Exit after this many updates
    #[arg(short, long, default_value = "100")]
    updates: usize,

    /// Send a reset whenever our snake dies
    #[arg(short, long)]
    respawn: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    info!("Connecting to {}", args.server);
    let (ws_stream, _) = connect_async(args.server.as_str()).await?;
    let (mut sink, mut stream) = ws_stream.split();

    let mut my_id = None;
    let mut seen_updates = 0;
    let mut reset_sent = false;
    let mut heading = Direction::Right;
    let mut turn_timer = interval(Duration::from_millis(args.turn_ms.max(1)));

    while seen_updates < args.updates {
        tokio::select! {
            frame = stream.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Server closed the connection");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e.into()),
                };

                match decode_server(&text) {
                    Ok(ServerMessage::Init { player_id, color }) => {
                        info!("Joined as player {} ({})", player_id, color);
                        my_id = Some(player_id);
                    }
                    Ok(ServerMessage::PlayerJoined { player_id }) => info!("Player {} joined", player_id),
                    Ok(ServerMessage::PlayerLeft { player_id }) => info!("Player {} left", player_id),
                    Ok(ServerMessage::Update { players, food }) => {
                        seen_updates += 1;
                        let me = players.iter().find(|player| Some(player.id) == my_id);
                        if let Some(me) = me {
                            info!(
                                "Update {}: {} players, {} food, score {}, length {}, alive {}",
                                seen_updates,
                                players.len(),
                                food.len(),
                                me.score,
                                me.snake.body.len(),
                                me.snake.alive
                            );
                            heading = me.snake.direction;
                            if me.snake.alive {
                                reset_sent = false;
                            } else if args.respawn && !reset_sent {
                                sink.send(Message::Text(encode_client(&ClientMessage::Reset)?)).await?;
                                reset_sent = true;
                            }
                        }
                    }
                    Ok(ServerMessage::Error { message }) => {
                        warn!("Server refused us: {}", message);
                        break;
                    }
                    Err(e) => warn!("Unreadable server message: {}", e),
                }
            }

            _ = turn_timer.tick() => {
                let legal: Vec<Direction> = heading.allowed_turns().collect();
                let Some(&direction) = legal.choose(&mut rand::thread_rng()) else {
                    continue;
                };
                let turn = ClientMessage::Move { direction };
                sink.send(Message::Text(encode_client(&turn)?)).await?;
            }
        }
    }

    let _ = sink.close().await;
    info!("Test client finished after {} updates", seen_updates);
    Ok(())
}
