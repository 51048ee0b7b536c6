//! # Game Client Library
//!
//! Client-side half of the networked game: it keeps a local tick counter in
//! step with the server and turns the sparse stream of server position updates
//! into smooth, continuously renderable positions for every remote entity.
//!
//! ## Architecture Overview
//!
//! ### Tick Synchronization
//! The server is the authority on time. Every 250 ticks it broadcasts its
//! current tick; the client advances its own counter once per fixed step and
//! only snaps to the server's value when the two drift apart by more than a
//! small tolerance. Small drift is left alone so rendering never visibly jumps.
//!
//! ### Snapshot Interpolation
//! Position updates are stamped with the server tick they describe and may
//! arrive late, early or out of order. Each entity buffers them in tick order
//! and renders a short time behind the synchronized tick (the interpolation
//! tick), moving smoothly from its rendered position toward each update as the
//! interpolation tick reaches it. Teleport updates skip the smoothing.
//!
//! ## Module Organization
//!
//! ### Sync Module (`sync`)
//! - `TickSynchronizer`: local tick clock with drift correction
//!
//! ### Interpolation Module (`interpolation`)
//! - `SnapshotInterpolator`: per-entity ordered snapshot buffer and position curve
//!
//! ### Game Module (`game`)
//! - `ClientGameState`: per-connection context owning the synchronizer and all
//!   interpolators, with explicit message handlers and the `on_fixed_step` /
//!   `on_render_frame` scheduler entry points
//!
//! ### Network Module (`network`)
//! - Dedicated network thread with its own tokio runtime
//! - Packets moved to the render thread over a channel
//! - `Client` frame driver running fixed steps from an accumulator
//! - Optional simulated latency and jitter
//!
//! ### Rendering Module (`rendering`)
//! - macroquad drawing of entities and a tick status overlay
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::interpolation::InterpolationConfig;
//! use client::network::{spawn_network_thread, Client, LatencySimulation};
//! use client::sync::SyncConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let network = spawn_network_thread("127.0.0.1:8080".parse()?, LatencySimulation::default())?;
//! let mut client = Client::new(network, SyncConfig::default(), InterpolationConfig::default());
//!
//! // Once per rendered frame
//! client.frame(1.0 / 60.0);
//! if let Some(state) = client.state() {
//!     for (entity_id, position) in state.render_positions() {
//!         println!("{} at {:?}", entity_id, position);
//!     }
//! }
//!
//! client.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod game;
pub mod interpolation;
pub mod network;
pub mod rendering;
pub mod sync;
