use clap::Parser;
use log::info;
use server::network::Server;
use shared::{DEFAULT_TICKS_BETWEEN_POSITION_UPDATES, DEFAULT_TICK_RATE};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Tick rate (simulation steps per second)
    #[arg(short, long, default_value_t = DEFAULT_TICK_RATE)]
    tick_rate: u32,

    /// Maximum number of connected clients
    #[arg(short, long, default_value = "16")]
    max_clients: usize,

    /// Server-driven entities spawned at startup
    #[arg(short, long, default_value = "8")]
    entities: usize,

    /// Ticks between position broadcasts
    #[arg(short = 'u', long, default_value_t = DEFAULT_TICKS_BETWEEN_POSITION_UPDATES)]
    ticks_between_updates: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting server...");
    info!(
        "{}Hz, position updates every {} ticks, up to {} clients",
        args.tick_rate, args.ticks_between_updates, args.max_clients
    );

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(
        &address,
        args.tick_rate,
        args.max_clients,
        args.ticks_between_updates,
    )
    .await?;
    server.spawn_wanderers(args.entities);

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    Ok(())
}
