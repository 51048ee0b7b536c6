//! # Game Server Library
//!
//! Authoritative server for the networked game. It owns the simulation clock,
//! moves every replicated entity and streams tick-stamped positions to all
//! connected clients, which interpolate between them.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Clock
//! The server advances its tick once per fixed step and broadcasts the current
//! tick every 250 ticks. Clients use these broadcasts to correct drift in their
//! own tick counters.
//!
//! ### Position Replication
//! Every `ticks_between_position_updates` ticks (2 by default) the position of
//! every entity is broadcast, stamped with the current tick. Updates that must
//! not be smoothed, such as spawns and wrapping across the world edge, are
//! flagged as teleports.
//!
//! ### Client Management
//! - Connection establishment and capacity limits
//! - Heartbeat tracking and timeout cleanup
//! - One wandering entity per connected client
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! All packet handling and ticking happens on one loop; receiving, sending and
//! timeout detection run as separate tasks that talk to it over channels.
//!
//! ### UDP-Based Communication
//! Packets are bincode-encoded and sent unreliably. A lost position update is
//! simply superseded by the next one; a lost sync is repeated 250 ticks later.
//!
//! ## Module Organization
//!
//! ### Client Manager Module (`client_manager`)
//! - Connection tracking, id assignment, liveness
//!
//! ### Game Module (`game`)
//! - Server tick clock and scripted entity movement
//! - Sync and position update scheduling
//!
//! ### Network Module (`network`)
//! - UDP socket tasks and the main tick loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 50Hz, at most 32 clients, positions every 2 ticks
//!     let mut server = Server::new("127.0.0.1:8080", 50, 32, 2).await?;
//!     server.spawn_wanderers(8);
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod game;
pub mod network;
