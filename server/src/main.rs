use clap::Parser;
use log::{info, warn};
use server::config::ServerConfig;
use server::network::Server;
use shared::{DEFAULT_MAX_CLIENTS, TICK_INTERVAL_MS};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Milliseconds between simulation ticks
    #[arg(short, long, default_value_t = TICK_INTERVAL_MS)]
    tick_ms: u64,

    /// Maximum number of connected players
    #[arg(short, long, default_value_t = DEFAULT_MAX_CLIENTS)]
    max_clients: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.tick_ms != TICK_INTERVAL_MS {
        warn!(
            "Tick interval {}ms differs from the {}ms clients expect",
            args.tick_ms, TICK_INTERVAL_MS
        );
    }

    let config = ServerConfig {
        tick_interval: Duration::from_millis(args.tick_ms.max(1)),
        max_clients: args.max_clients,
        ..ServerConfig::default()
    };

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::new(&address, config).await?;

    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C, shutting down gracefully...");
        })
        .await?;

    info!("Server stopped");
    Ok(())
}
