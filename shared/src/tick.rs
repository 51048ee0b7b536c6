//! Tick arithmetic and the tick clock shared by server and client
//!
//! Ticks are 16-bit counters that wrap every 65536 simulation steps. All
//! comparisons go through [`tick_diff`], which treats the counter as a ring and
//! interprets distances of up to half the range in either direction. This keeps
//! ordering and drift checks correct across the wrap as long as two ticks being
//! compared are less than 32768 steps apart.

/// Discrete server simulation step
pub type Tick = u16;

/// Signed distance from `b` to `a` on the tick ring (`a - b`)
pub fn tick_diff(a: Tick, b: Tick) -> i32 {
    a.wrapping_sub(b) as i16 as i32
}

/// Returns true if `a` comes strictly after `b`
pub fn is_after(a: Tick, b: Tick) -> bool {
    tick_diff(a, b) > 0
}

/// Returns true if `a` is the same tick as `b` or comes before it
pub fn is_at_or_before(a: Tick, b: Tick) -> bool {
    tick_diff(a, b) <= 0
}

/// Tracks the current simulation tick and the interpolation tick derived from it
///
/// The server owns one authoritative clock; each client owns a tracking clock
/// that the tick synchronizer nudges toward the server's. The interpolation tick
/// trails the current tick by `ticks_between_position_updates`, which is the
/// point in time for which position updates are assumed to have arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickClock {
    current_tick: Tick,
    ticks_between_position_updates: u16,
    interpolation_tick: Tick,
}

impl TickClock {
    /// Creates a clock at `start_tick`; the interpolation tick may start wrapped
    pub fn new(start_tick: Tick, ticks_between_position_updates: u16) -> Self {
        Self {
            current_tick: start_tick,
            ticks_between_position_updates,
            interpolation_tick: start_tick.wrapping_sub(ticks_between_position_updates),
        }
    }

    /// Advances one fixed simulation step
    pub fn advance(&mut self) {
        self.set_current_tick(self.current_tick.wrapping_add(1));
    }

    /// Hard-sets the current tick, moving the interpolation tick with it
    pub fn set_current_tick(&mut self, tick: Tick) {
        self.current_tick = tick;
        self.recompute_interpolation_tick();
    }

    /// Changes the update cadence, which also sets the interpolation delay
    pub fn set_ticks_between_position_updates(&mut self, ticks: u16) {
        self.ticks_between_position_updates = ticks;
        self.recompute_interpolation_tick();
    }

    /// Tick of the most recent fixed step
    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    /// Tick rendered remote entities are interpolated from
    pub fn interpolation_tick(&self) -> Tick {
        self.interpolation_tick
    }

    /// Ticks between consecutive position broadcasts
    pub fn ticks_between_position_updates(&self) -> u16 {
        self.ticks_between_position_updates
    }

    /// True on ticks where the server should broadcast its tick
    pub fn is_sync_tick(&self, interval: u16) -> bool {
        interval != 0 && self.current_tick % interval == 0
    }

    fn recompute_interpolation_tick(&mut self) {
        self.interpolation_tick = self
            .current_tick
            .wrapping_sub(self.ticks_between_position_updates);
    }
}

impl Default for TickClock {
    /// Client-side starting point: the interpolation tick begins at zero
    fn default() -> Self {
        let ticks = crate::DEFAULT_TICKS_BETWEEN_POSITION_UPDATES;
        Self::new(ticks, ticks)
    }
}
