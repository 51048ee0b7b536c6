use crate::interpolation::{InterpolationConfig, SnapshotInterpolator};
use crate::sync::{SyncConfig, TickSynchronizer};
use log::{debug, info, warn};
use shared::{Packet, PositionSnapshot, Tick, TickClock, Vec3};
use std::collections::HashMap;

/// Client state for the lifetime of one connection
///
/// Built when the server accepts the connection and dropped on disconnect, so
/// nothing carries over into a later session. It owns the tick synchronizer and
/// one interpolator per remote entity, and is driven from outside through the
/// message handlers and the two scheduler entry points [`on_fixed_step`] and
/// [`on_render_frame`].
///
/// [`on_fixed_step`]: ClientGameState::on_fixed_step
/// [`on_render_frame`]: ClientGameState::on_render_frame
pub struct ClientGameState {
    pub client_id: u32,
    synchronizer: TickSynchronizer,
    interpolators: HashMap<u32, SnapshotInterpolator>,
    interpolation_config: InterpolationConfig,
    fixed_step_duration: f32,
}

impl ClientGameState {
    /// Starts a session from the values in the server's `Connected` packet
    pub fn new(
        client_id: u32,
        clock: TickClock,
        sync_config: SyncConfig,
        interpolation_config: InterpolationConfig,
        fixed_step_duration: f32,
    ) -> Self {
        Self {
            client_id,
            synchronizer: TickSynchronizer::new(clock, sync_config),
            interpolators: HashMap::new(),
            interpolation_config,
            fixed_step_duration,
        }
    }

    /// Applies a server packet to this session
    ///
    /// Connection lifecycle packets are handled by the caller, which owns the
    /// session itself.
    pub fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Sync { tick } => self.handle_sync(tick),
            Packet::PositionUpdate {
                entity_id,
                tick,
                is_teleport,
                position,
            } => self.handle_position_update(entity_id, tick, is_teleport, position),
            Packet::EntityRemoved { entity_id } => self.handle_entity_removed(entity_id),
            other => warn!("Unexpected packet for active session: {:?}", other),
        }
    }

    /// Applies a server tick broadcast to the local clock
    pub fn handle_sync(&mut self, server_tick: Tick) {
        self.synchronizer.receive_server_tick(server_tick);
    }

    /// Routes a position update to the entity's interpolator
    ///
    /// The first update seen for an entity places it directly at the reported
    /// position.
    pub fn handle_position_update(
        &mut self,
        entity_id: u32,
        tick: Tick,
        is_teleport: bool,
        position: Vec3,
    ) {
        let clock = *self.synchronizer.clock();
        let config = self.interpolation_config;

        let interpolator = self.interpolators.entry(entity_id).or_insert_with(|| {
            debug!("Tracking entity {} at tick {}", entity_id, tick);
            SnapshotInterpolator::new(&clock, position, config)
        });

        interpolator.enqueue(PositionSnapshot::new(tick, is_teleport, position), &clock);
    }

    /// Drops the entity's interpolator and any buffered updates
    pub fn handle_entity_removed(&mut self, entity_id: u32) {
        if self.interpolators.remove(&entity_id).is_some() {
            info!("Entity {} removed", entity_id);
        }
    }

    /// Fixed simulation step: advances the local tick
    pub fn on_fixed_step(&mut self) {
        self.synchronizer.advance();
    }

    /// Render frame: advances every entity's interpolation
    ///
    /// Updates are released once the local tick reaches them and interpolated
    /// from the interpolation tick.
    pub fn on_render_frame(&mut self, delta_time: f32) {
        let current_tick = self.synchronizer.current_tick();
        let interpolation_tick = self.synchronizer.interpolation_tick();

        for interpolator in self.interpolators.values_mut() {
            interpolator.advance_frame(
                current_tick,
                interpolation_tick,
                delta_time,
                self.fixed_step_duration,
            );
        }
    }

    /// Rendered position of every tracked entity, ordered by entity id
    pub fn render_positions(&self) -> Vec<(u32, Vec3)> {
        let mut positions: Vec<(u32, Vec3)> = self
            .interpolators
            .iter()
            .map(|(id, interpolator)| (*id, interpolator.position()))
            .collect();
        positions.sort_by_key(|(id, _)| *id);
        positions
    }

    /// Local estimate of the server tick
    pub fn current_tick(&self) -> Tick {
        self.synchronizer.current_tick()
    }

    /// Tick remote entities are currently interpolated from
    pub fn interpolation_tick(&self) -> Tick {
        self.synchronizer.interpolation_tick()
    }

    pub fn entity_count(&self) -> usize {
        self.interpolators.len()
    }

    /// Updates buffered across all entities and not yet applied
    pub fn pending_snapshot_count(&self) -> usize {
        self.interpolators
            .values()
            .map(|interpolator| interpolator.pending_len())
            .sum()
    }

    pub fn interpolator(&self, entity_id: u32) -> Option<&SnapshotInterpolator> {
        self.interpolators.get(&entity_id)
    }
}
