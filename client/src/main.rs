use clap::Parser;
use client::interpolation::InterpolationConfig;
use client::network::{spawn_network_thread, Client, LatencySimulation};
use client::rendering::{Renderer, UiConfig};
use client::sync::SyncConfig;
use log::{error, info};
use macroquad::prelude::*;
use shared::{DEFAULT_MOVEMENT_THRESHOLD, DEFAULT_TICK_DIVERGENCE_TOLERANCE};
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: SocketAddr,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Random extra delay per received packet in milliseconds
    #[arg(short = 'j', long, default_value = "0")]
    jitter: u64,

    /// Tick divergence from the server tolerated before a hard correction
    #[arg(short = 't', long, default_value_t = DEFAULT_TICK_DIVERGENCE_TOLERANCE)]
    tolerance: u16,

    /// Movements shorter than this are interpolated without overshoot
    #[arg(short = 'm', long, default_value_t = DEFAULT_MOVEMENT_THRESHOLD)]
    movement_threshold: f32,

    /// Window width
    #[arg(short = 'w', long, default_value = "800")]
    width: usize,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "600")]
    height: usize,
}

fn window_conf() -> Conf {
    let args = Args::parse();
    Conf {
        window_title: "Snapshot Interpolation Client".to_string(),
        window_width: args.width as i32,
        window_height: args.height as i32,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Client error: {}", e);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    if args.fake_ping > 0 || args.jitter > 0 {
        info!(
            "Simulating {}ms latency with up to {}ms jitter",
            args.fake_ping, args.jitter
        );
    }
    info!("Press Escape to quit");

    let latency = LatencySimulation {
        fake_ping_ms: args.fake_ping,
        jitter_ms: args.jitter,
    };
    let network = spawn_network_thread(args.server, latency)?;

    let mut client = Client::new(
        network,
        SyncConfig {
            tick_divergence_tolerance: args.tolerance,
        },
        InterpolationConfig {
            movement_threshold: args.movement_threshold,
        },
    );
    let mut renderer = Renderer::new(args.width, args.height)?;

    while !is_key_pressed(KeyCode::Escape) {
        client.frame(get_frame_time());

        let ui = match client.state() {
            Some(state) => UiConfig {
                connected: true,
                client_id: Some(state.client_id),
                current_tick: state.current_tick(),
                interpolation_tick: state.interpolation_tick(),
                entity_count: state.entity_count(),
                pending_snapshots: state.pending_snapshot_count(),
                fake_ping_ms: args.fake_ping,
                jitter_ms: args.jitter,
            },
            None => UiConfig {
                connected: false,
                client_id: None,
                current_tick: 0,
                interpolation_tick: 0,
                entity_count: 0,
                pending_snapshots: 0,
                fake_ping_ms: args.fake_ping,
                jitter_ms: args.jitter,
            },
        };

        let entities = client
            .state()
            .map(|state| state.render_positions())
            .unwrap_or_default();
        renderer.render(&entities, ui);

        next_frame().await;
    }

    client.shutdown();
    Ok(())
}
