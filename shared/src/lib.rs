use serde::{Deserialize, Serialize};

pub mod snapshot;
pub mod tick;

pub use snapshot::{PositionSnapshot, Vec3};
pub use tick::{Tick, TickClock};

pub const PROTOCOL_VERSION: u32 = 1;

/// The server broadcasts its tick whenever `current_tick % SYNC_INTERVAL_TICKS == 0`
pub const SYNC_INTERVAL_TICKS: u16 = 250;
pub const DEFAULT_TICK_RATE: u32 = 50;
pub const DEFAULT_TICKS_BETWEEN_POSITION_UPDATES: u16 = 2;
pub const DEFAULT_TICK_DIVERGENCE_TOLERANCE: u16 = 1;
pub const DEFAULT_MOVEMENT_THRESHOLD: f32 = 0.05;

pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 600.0;
pub const ENTITY_RADIUS: f32 = 12.0;

pub const CLIENT_TIMEOUT_SECS: u64 = 5;
pub const HEARTBEAT_INTERVAL_MS: u64 = 1000;

/// Duration of one fixed simulation step at the given tick rate
pub fn fixed_step_duration(tick_rate: u32) -> f32 {
    1.0 / tick_rate.max(1) as f32
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    Heartbeat,
    Disconnect,

    Connected {
        client_id: u32,
        tick: Tick,
        ticks_between_position_updates: u16,
        tick_rate: u32,
    },
    Sync {
        tick: Tick,
    },
    PositionUpdate {
        entity_id: u32,
        tick: Tick,
        is_teleport: bool,
        position: Vec3,
    },
    EntityRemoved {
        entity_id: u32,
    },
    Disconnected {
        reason: String,
    },
}
