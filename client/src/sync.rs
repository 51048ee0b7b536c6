//! Client-side tick synchronization against the authoritative server clock

use log::info;
use shared::tick::{tick_diff, Tick, TickClock};
use shared::DEFAULT_TICK_DIVERGENCE_TOLERANCE;

#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    /// Largest tick divergence from the server that is left uncorrected
    pub tick_divergence_tolerance: u16,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tick_divergence_tolerance: DEFAULT_TICK_DIVERGENCE_TOLERANCE,
        }
    }
}

/// Keeps the local tick counter close to the server's
///
/// The local clock advances once per fixed step on its own. When a sync
/// message reports a server tick further away than the tolerance, the local
/// tick is hard-set to the server's value. Small divergences are ignored so
/// interpolation does not jump on every sync.
#[derive(Debug, Clone)]
pub struct TickSynchronizer {
    clock: TickClock,
    config: SyncConfig,
}

impl TickSynchronizer {
    /// Starts tracking from `clock`, usually seeded from the server's `Connected` tick
    pub fn new(clock: TickClock, config: SyncConfig) -> Self {
        Self { clock, config }
    }

    /// Called once per fixed simulation step
    pub fn advance(&mut self) {
        self.clock.advance();
    }

    /// Applies a server tick broadcast
    ///
    /// Returns true if the local tick was corrected.
    pub fn receive_server_tick(&mut self, server_tick: Tick) -> bool {
        let divergence = tick_diff(self.clock.current_tick(), server_tick).unsigned_abs();

        if divergence > u32::from(self.config.tick_divergence_tolerance) {
            info!("Client tick: {} -> {}", self.clock.current_tick(), server_tick);
            self.clock.set_current_tick(server_tick);
            true
        } else {
            false
        }
    }

    /// Changes the interpolation delay of the tracked clock
    pub fn set_ticks_between_position_updates(&mut self, ticks: u16) {
        self.clock.set_ticks_between_position_updates(ticks);
    }

    /// Local estimate of the server tick
    pub fn current_tick(&self) -> Tick {
        self.clock.current_tick()
    }

    /// Tick remote entities are interpolated from
    pub fn interpolation_tick(&self) -> Tick {
        self.clock.interpolation_tick()
    }

    /// The tracked clock, handed to interpolators when buffering updates
    pub fn clock(&self) -> &TickClock {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synchronizer_at(tick: Tick) -> TickSynchronizer {
        TickSynchronizer::new(TickClock::new(tick, 2), SyncConfig::default())
    }

    #[test]
    fn test_advance_increments_tick() {
        let mut sync = synchronizer_at(10);
        sync.advance();
        sync.advance();

        assert_eq!(sync.current_tick(), 12);
        assert_eq!(sync.interpolation_tick(), 10);
    }

    #[test]
    fn test_large_drift_is_hard_corrected() {
        let mut sync = synchronizer_at(100);

        assert!(sync.receive_server_tick(105));
        assert_eq!(sync.current_tick(), 105);
        assert_eq!(sync.interpolation_tick(), 103);
    }

    #[test]
    fn test_client_ahead_is_corrected_back() {
        let mut sync = synchronizer_at(100);

        assert!(sync.receive_server_tick(90));
        assert_eq!(sync.current_tick(), 90);
    }

    #[test]
    fn test_matching_tick_is_noop() {
        let mut sync = synchronizer_at(100);

        assert!(!sync.receive_server_tick(100));
        assert_eq!(sync.current_tick(), 100);
    }

    #[test]
    fn test_drift_within_tolerance_is_ignored() {
        let mut sync = synchronizer_at(100);

        assert!(!sync.receive_server_tick(101));
        assert!(!sync.receive_server_tick(99));
        assert_eq!(sync.current_tick(), 100);
    }

    #[test]
    fn test_custom_tolerance() {
        let mut sync = TickSynchronizer::new(
            TickClock::new(100, 2),
            SyncConfig {
                tick_divergence_tolerance: 5,
            },
        );

        assert!(!sync.receive_server_tick(105));
        assert!(sync.receive_server_tick(106));
        assert_eq!(sync.current_tick(), 106);
    }

    #[test]
    fn test_drift_across_wrap_is_small() {
        let mut sync = synchronizer_at(u16::MAX);

        // One tick apart on the ring, not 65535
        assert!(!sync.receive_server_tick(0));
        assert_eq!(sync.current_tick(), u16::MAX);

        assert!(sync.receive_server_tick(3));
        assert_eq!(sync.current_tick(), 3);
    }

    #[test]
    fn test_changing_update_spacing_moves_interpolation_tick() {
        let mut sync = synchronizer_at(50);
        sync.set_ticks_between_position_updates(4);

        assert_eq!(sync.interpolation_tick(), 46);
        assert_eq!(sync.clock().ticks_between_position_updates(), 4);
    }
}
