//! Snapshot interpolation for remote entities
//!
//! Position updates arrive tagged with the server tick they were authoritative
//! at, possibly out of order. Each entity owns one [`SnapshotInterpolator`] that
//! buffers them in tick order and, once per render frame, moves a rendered
//! position from wherever it currently is toward the latest applied snapshot.
//!
//! Two interpolation modes are used depending on how far the entity is moving:
//! - Small movements (idle jitter) use clamped interpolation and never overshoot
//! - Large movements interpolate unclamped, so the rendered position keeps
//!   moving past the target if the next snapshot is late

use log::debug;
use shared::snapshot::{PositionSnapshot, Vec3};
use shared::tick::{is_after, is_at_or_before, tick_diff, Tick, TickClock};
use shared::DEFAULT_MOVEMENT_THRESHOLD;
use std::collections::VecDeque;

/// Segment duration used before the first snapshot has been applied
pub const DEFAULT_TIME_TO_REACH_TARGET: f32 = 0.05;

#[derive(Debug, Clone, Copy)]
pub struct InterpolationConfig {
    /// Movements shorter than this use clamped interpolation
    pub movement_threshold: f32,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            movement_threshold: DEFAULT_MOVEMENT_THRESHOLD,
        }
    }
}

/// Time needed to travel a segment between two ticks
///
/// Never shorter than a single fixed step, so a segment whose endpoints share
/// a tick (or are reversed) still has a positive duration.
pub fn segment_duration(from_tick: Tick, to_tick: Tick, fixed_step_duration: f32) -> f32 {
    let ticks = tick_diff(to_tick, from_tick).max(1);
    ticks as f32 * fixed_step_duration
}

/// Per-entity snapshot buffer and interpolation state
#[derive(Debug, Clone)]
pub struct SnapshotInterpolator {
    /// Snapshots waiting for the interpolation tick to reach them, oldest first
    pending: VecDeque<PositionSnapshot>,

    to: PositionSnapshot,
    from: PositionSnapshot,
    previous: PositionSnapshot,

    position: Vec3,
    elapsed_time: f32,
    target_duration: f32,
    square_movement_threshold: f32,
}

impl SnapshotInterpolator {
    /// Creates an interpolator resting at `initial_position`
    pub fn new(clock: &TickClock, initial_position: Vec3, config: InterpolationConfig) -> Self {
        let at_interpolation_tick =
            PositionSnapshot::new(clock.interpolation_tick(), false, initial_position);

        Self {
            pending: VecDeque::new(),
            to: PositionSnapshot::new(clock.current_tick(), false, initial_position),
            from: at_interpolation_tick,
            previous: at_interpolation_tick,
            position: initial_position,
            elapsed_time: 0.0,
            target_duration: DEFAULT_TIME_TO_REACH_TARGET,
            square_movement_threshold: config.movement_threshold * config.movement_threshold,
        }
    }

    /// Buffers a snapshot in tick order
    ///
    /// Non-teleport snapshots at or behind the interpolation tick are too late
    /// to be useful and are dropped. Returns false in that case. Snapshots with
    /// equal ticks keep their arrival order.
    pub fn enqueue(&mut self, snapshot: PositionSnapshot, clock: &TickClock) -> bool {
        if is_at_or_before(snapshot.tick(), clock.interpolation_tick()) && !snapshot.is_teleport() {
            debug!(
                "Discarding stale snapshot for tick {} (interpolation tick {})",
                snapshot.tick(),
                clock.interpolation_tick()
            );
            return false;
        }

        match self
            .pending
            .iter()
            .position(|queued| is_after(queued.tick(), snapshot.tick()))
        {
            Some(index) => self.pending.insert(index, snapshot),
            None => self.pending.push_back(snapshot),
        }

        true
    }

    /// Advances interpolation by one render frame and returns the new position
    ///
    /// Every buffered snapshot at or before `now_tick` is applied in tick order
    /// before the elapsed time is accumulated. Applied segments start at
    /// `now_interpolation_tick`, so a snapshot released as soon as it is due
    /// is reached over `ticks_between_position_updates` fixed steps.
    pub fn advance_frame(
        &mut self,
        now_tick: Tick,
        now_interpolation_tick: Tick,
        render_delta_time: f32,
        fixed_step_duration: f32,
    ) -> Vec3 {
        while let Some(next) = self.pending.front() {
            if !is_at_or_before(next.tick(), now_tick) {
                break;
            }

            if let Some(snapshot) = self.pending.pop_front() {
                self.apply(snapshot, now_interpolation_tick, fixed_step_duration);
            }
        }

        self.elapsed_time += render_delta_time;
        self.interpolate_position(self.lerp_amount());

        self.position
    }

    fn apply(&mut self, snapshot: PositionSnapshot, interpolation_tick: Tick, fixed_step_duration: f32) {
        if snapshot.is_teleport() {
            self.to = snapshot;
            self.from = snapshot;
            self.previous = snapshot;
            self.position = snapshot.position();
        } else {
            self.previous = self.to;
            self.to = snapshot;
            // Restart from the rendered position so replacing a segment midway
            // does not snap the entity back. A snapshot released late never
            // gets a segment that starts after it.
            let from_tick = if is_after(interpolation_tick, snapshot.tick()) {
                snapshot.tick()
            } else {
                interpolation_tick
            };
            self.from = PositionSnapshot::new(from_tick, false, self.position);
        }

        self.elapsed_time = 0.0;
        self.target_duration = segment_duration(self.from.tick(), self.to.tick(), fixed_step_duration);
    }

    fn interpolate_position(&mut self, lerp_amount: f32) {
        let movement = self.to.position().sub(&self.previous.position());

        if movement.length_squared() < self.square_movement_threshold {
            if self.to.position() != self.from.position() {
                self.position = self.from.position().lerp(&self.to.position(), lerp_amount);
            }
            return;
        }

        self.position = self
            .from
            .position()
            .lerp_unclamped(&self.to.position(), lerp_amount);
    }

    /// Progress through the current segment; exceeds 1.0 when the next snapshot is late
    pub fn lerp_amount(&self) -> f32 {
        self.elapsed_time / self.target_duration
    }

    /// Rendered position after the last frame
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Snapshot the current segment moves toward
    pub fn to(&self) -> &PositionSnapshot {
        &self.to
    }

    /// Start of the current segment: the rendered position when it was applied
    pub fn from(&self) -> &PositionSnapshot {
        &self.from
    }

    /// Target of the segment before this one, used to size the movement
    pub fn previous(&self) -> &PositionSnapshot {
        &self.previous
    }

    /// Render time spent in the current segment
    pub fn elapsed_time(&self) -> f32 {
        self.elapsed_time
    }

    /// Time the current segment takes to reach its target
    pub fn target_duration(&self) -> f32 {
        self.target_duration
    }

    /// Number of buffered snapshots not yet applied
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Ticks of the buffered snapshots, oldest first
    pub fn pending_ticks(&self) -> Vec<Tick> {
        self.pending.iter().map(|snapshot| snapshot.tick()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    const STEP: f32 = 0.02;

    fn clock_at(current_tick: Tick) -> TickClock {
        TickClock::new(current_tick, 2)
    }

    fn interpolator_at(clock: &TickClock, position: Vec3) -> SnapshotInterpolator {
        SnapshotInterpolator::new(clock, position, InterpolationConfig::default())
    }

    fn update(tick: Tick, x: f32) -> PositionSnapshot {
        PositionSnapshot::new(tick, false, Vec3::new(x, 0.0, 0.0))
    }

    /// Runs one render frame with the interpolation tick two ticks behind
    fn frame(interp: &mut SnapshotInterpolator, now_tick: Tick, delta_time: f32) -> Vec3 {
        interp.advance_frame(now_tick, now_tick.wrapping_sub(2), delta_time, STEP)
    }

    #[test]
    fn test_initial_state() {
        let clock = clock_at(10);
        let start = Vec3::new(1.0, 2.0, 3.0);
        let interp = interpolator_at(&clock, start);

        assert_eq!(interp.position(), start);
        assert_eq!(interp.to().tick(), 10);
        assert_eq!(interp.from().tick(), 8);
        assert_eq!(interp.previous().tick(), 8);
        assert_eq!(interp.pending_len(), 0);
        assert_approx_eq!(interp.target_duration(), DEFAULT_TIME_TO_REACH_TARGET);
    }

    #[test]
    fn test_out_of_order_enqueue_is_sorted() {
        let clock = clock_at(2);
        let mut interp = interpolator_at(&clock, Vec3::ZERO);

        for tick in [9, 4, 12, 5, 3, 20, 7] {
            assert!(interp.enqueue(update(tick, tick as f32), &clock));
        }

        assert_eq!(interp.pending_ticks(), vec![3, 4, 5, 7, 9, 12, 20]);
    }

    #[test]
    fn test_duplicate_ticks_keep_arrival_order() {
        let clock = clock_at(2);
        let mut interp = interpolator_at(&clock, Vec3::ZERO);

        interp.enqueue(update(5, 1.0), &clock);
        interp.enqueue(update(5, 2.0), &clock);
        interp.enqueue(update(4, 0.5), &clock);

        assert_eq!(interp.pending_ticks(), vec![4, 5, 5]);

        frame(&mut interp, 5, 0.0);
        assert_eq!(interp.to().position(), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(interp.previous().position(), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_stale_snapshot_is_discarded() {
        let clock = clock_at(20);
        let mut interp = interpolator_at(&clock, Vec3::ZERO);
        let before = interp.clone();

        assert!(!interp.enqueue(update(18, 50.0), &clock));
        assert!(!interp.enqueue(update(3, 50.0), &clock));
        interp.advance_frame(clock.current_tick(), clock.interpolation_tick(), 0.0, STEP);

        assert_eq!(interp.pending_len(), 0);
        assert_eq!(interp.to(), before.to());
        assert_eq!(interp.from(), before.from());
        assert_eq!(interp.previous(), before.previous());
        assert_eq!(interp.position(), before.position());
    }

    #[test]
    fn test_stale_teleport_is_still_accepted() {
        let clock = clock_at(20);
        let mut interp = interpolator_at(&clock, Vec3::ZERO);

        let teleport = PositionSnapshot::new(5, true, Vec3::new(100.0, 0.0, 0.0));
        assert!(interp.enqueue(teleport, &clock));
        assert_eq!(interp.pending_len(), 1);
    }

    #[test]
    fn test_teleport_collapses_segment() {
        let clock = clock_at(2);
        let mut interp = interpolator_at(&clock, Vec3::ZERO);
        let target = Vec3::new(300.0, 40.0, -2.0);
        let teleport = PositionSnapshot::new(6, true, target);

        interp.enqueue(update(4, 10.0), &clock);
        interp.enqueue(teleport, &clock);
        let position = frame(&mut interp, 6, 0.0);

        assert_eq!(*interp.to(), teleport);
        assert_eq!(*interp.from(), teleport);
        assert_eq!(*interp.previous(), teleport);
        assert_eq!(position, target);
        assert_eq!(interp.elapsed_time(), 0.0);
    }

    #[test]
    fn test_drain_applies_in_tick_order() {
        let clock = clock_at(0);
        let mut interp = interpolator_at(&clock, Vec3::ZERO);

        for tick in [5, 3, 8, 1] {
            interp.enqueue(update(tick, tick as f32 * 10.0), &clock);
        }

        let mut applied = Vec::new();
        for now in 0..=8 {
            let pending_before = interp.pending_len();
            frame(&mut interp, now, STEP);
            if interp.pending_len() < pending_before {
                applied.push(interp.to().tick());
            }
        }

        assert_eq!(applied, vec![1, 3, 5, 8]);
        assert_eq!(interp.pending_len(), 0);
    }

    #[test]
    fn test_drain_all_at_once_keeps_order() {
        let clock = clock_at(0);
        let mut interp = interpolator_at(&clock, Vec3::ZERO);

        for tick in [5, 3, 8, 1] {
            interp.enqueue(update(tick, tick as f32 * 10.0), &clock);
        }
        frame(&mut interp, 8, 0.0);

        assert_eq!(interp.to().tick(), 8);
        assert_eq!(interp.previous().tick(), 5);
        assert_eq!(interp.pending_len(), 0);
    }

    #[test]
    fn test_future_snapshots_stay_buffered() {
        let clock = clock_at(2);
        let mut interp = interpolator_at(&clock, Vec3::ZERO);

        interp.enqueue(update(3, 1.0), &clock);
        interp.enqueue(update(10, 2.0), &clock);
        frame(&mut interp, 4, STEP);

        assert_eq!(interp.to().tick(), 3);
        assert_eq!(interp.pending_ticks(), vec![10]);
    }

    #[test]
    fn test_segment_duration_and_lerp_amount() {
        let duration = segment_duration(10, 14, STEP);
        assert_approx_eq!(duration, 0.08);
        assert_approx_eq!(0.04 / duration, 0.5);
    }

    #[test]
    fn test_degenerate_segment_floors_to_one_step() {
        assert_approx_eq!(segment_duration(10, 10, STEP), STEP);
        assert_approx_eq!(segment_duration(14, 10, STEP), STEP);
        assert_approx_eq!(segment_duration(u16::MAX, 1, STEP), 2.0 * STEP);
    }

    #[test]
    fn test_applied_segment_spans_from_interpolation_tick() {
        let clock = clock_at(8);
        let mut interp = interpolator_at(&clock, Vec3::ZERO);

        interp.enqueue(update(14, 40.0), &clock);
        let position = interp.advance_frame(14, 10, 0.04, STEP);

        assert_eq!(interp.from().tick(), 10);
        assert_eq!(interp.to().tick(), 14);
        assert_approx_eq!(interp.target_duration(), 0.08);
        assert_approx_eq!(interp.lerp_amount(), 0.5);
        assert_approx_eq!(position.x, 20.0);
    }

    #[test]
    fn test_applied_segment_restarts_from_rendered_position() {
        let clock = clock_at(2);
        let mut interp = interpolator_at(&clock, Vec3::ZERO);

        interp.enqueue(update(5, 10.0), &clock);
        frame(&mut interp, 5, 0.0);

        assert_eq!(interp.from().tick(), 3);
        assert_eq!(interp.from().position(), Vec3::ZERO);
        assert_approx_eq!(interp.target_duration(), 2.0 * STEP);
        assert_eq!(interp.elapsed_time(), 0.0);
    }

    #[test]
    fn test_late_release_never_starts_after_target() {
        let clock = clock_at(2);
        let mut interp = interpolator_at(&clock, Vec3::ZERO);

        // Several fixed steps passed without a render frame
        interp.enqueue(update(4, 10.0), &clock);
        frame(&mut interp, 9, 0.0);

        assert_eq!(interp.from().tick(), 4);
        assert_eq!(interp.to().tick(), 4);
        assert_approx_eq!(interp.target_duration(), STEP);
    }

    #[test]
    fn test_segments_stay_ordered_with_irregular_frames() {
        let mut interp = interpolator_at(&clock_at(2), Vec3::ZERO);
        let mut now: Tick = 2;

        for steps in [1u16, 3, 1, 2, 5, 1, 1, 4, 2, 1, 3, 1] {
            let arrival = clock_at(now);
            for tick in (now + 1)..=(now + steps) {
                if tick % 2 == 0 {
                    assert!(interp.enqueue(update(tick, tick as f32), &arrival));
                }
            }
            now += steps;

            frame(&mut interp, now, STEP * steps as f32);
            assert!(tick_diff(interp.to().tick(), interp.from().tick()) >= 0);
            assert!(interp.target_duration() > 0.0);
        }
    }

    #[test]
    fn test_constant_velocity_converges() {
        // One unit per tick, an update every other tick, one frame per fixed step
        let start: Tick = 2;
        let mut interp = interpolator_at(&clock_at(start), Vec3::ZERO);
        let mut errors = Vec::new();

        for now in start..start + 60 {
            if now % 2 == 0 {
                interp.enqueue(update(now, (now - start) as f32), &clock_at(now));
            }

            let position = frame(&mut interp, now, STEP);
            assert!(tick_diff(interp.to().tick(), interp.from().tick()) >= 0);

            // The rendered position trails the newest update by one tick
            let expected = (now - start) as f32 - 1.0;
            errors.push((position.x - expected).abs());
        }

        for error in &errors[10..] {
            assert!(*error < 0.001, "rendered position drifted by {}", error);
        }
    }

    #[test]
    fn test_large_movement_interpolates() {
        let clock = clock_at(2);
        let mut interp = interpolator_at(&clock, Vec3::ZERO);

        interp.enqueue(update(5, 10.0), &clock);
        let position = interp.advance_frame(5, 4, STEP / 2.0, STEP);

        assert_approx_eq!(interp.lerp_amount(), 0.5);
        assert_approx_eq!(position.x, 5.0);
    }

    #[test]
    fn test_large_movement_overshoots_when_late() {
        let clock = clock_at(2);
        let mut interp = interpolator_at(&clock, Vec3::ZERO);

        interp.enqueue(update(5, 10.0), &clock);
        interp.advance_frame(5, 4, STEP, STEP);
        let position = interp.advance_frame(5, 4, STEP / 2.0, STEP);

        assert_approx_eq!(interp.lerp_amount(), 1.5);
        assert_approx_eq!(position.x, 15.0);
    }

    #[test]
    fn test_small_movement_never_overshoots() {
        let clock = clock_at(2);
        let mut interp = interpolator_at(&clock, Vec3::ZERO);

        // 0.04 from the previous target, under the 0.05 threshold
        interp.enqueue(update(5, 0.04), &clock);
        interp.advance_frame(5, 4, 0.0, STEP);
        let position = interp.advance_frame(5, 4, STEP * 3.0, STEP);

        assert!(interp.lerp_amount() > 1.0);
        assert_approx_eq!(position.x, 0.04);
    }

    #[test]
    fn test_small_movement_holds_when_at_target() {
        let clock = clock_at(2);
        let start = Vec3::new(1.0, 1.0, 1.0);
        let mut interp = interpolator_at(&clock, start);

        interp.enqueue(PositionSnapshot::new(5, false, start), &clock);
        let position = frame(&mut interp, 5, STEP * 4.0);

        assert_eq!(position, start);
    }

    #[test]
    fn test_custom_movement_threshold() {
        let clock = clock_at(2);
        let mut interp = SnapshotInterpolator::new(
            &clock,
            Vec3::ZERO,
            InterpolationConfig {
                movement_threshold: 20.0,
            },
        );

        interp.enqueue(update(5, 10.0), &clock);
        interp.advance_frame(5, 4, 0.0, STEP);
        let position = interp.advance_frame(5, 4, STEP * 2.0, STEP);

        assert_approx_eq!(position.x, 10.0);
    }

    #[test]
    fn test_elapsed_time_accumulates() {
        let clock = clock_at(2);
        let mut interp = interpolator_at(&clock, Vec3::ZERO);

        frame(&mut interp, 2, 0.01);
        frame(&mut interp, 2, 0.015);

        assert_approx_eq!(interp.elapsed_time(), 0.025);
    }

    #[test]
    fn test_ordering_across_tick_wrap() {
        let clock = clock_at(65530);
        let mut interp = interpolator_at(&clock, Vec3::ZERO);

        for tick in [1u16, 65534, 3, 65535] {
            interp.enqueue(update(tick, 1.0), &clock);
        }

        assert_eq!(interp.pending_ticks(), vec![65534, 65535, 1, 3]);

        frame(&mut interp, 0, 0.0);
        assert_eq!(interp.to().tick(), 65535);
        assert_eq!(interp.from().tick(), 65534);
        assert_eq!(interp.pending_ticks(), vec![1, 3]);
    }
}
