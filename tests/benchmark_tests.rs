//! Performance benchmarks for the tick and interpolation hot paths

use bincode::{deserialize, serialize};
use client::game::ClientGameState;
use client::interpolation::{InterpolationConfig, SnapshotInterpolator};
use client::sync::SyncConfig;
use server::game::GameState;
use shared::tick::tick_diff;
use shared::{
    fixed_step_duration, Packet, PositionSnapshot, Tick, TickClock, Vec3, WORLD_HEIGHT, WORLD_WIDTH,
};
use std::time::Instant;

/// Benchmarks wraparound-aware tick comparison
#[test]
fn benchmark_tick_comparison() {
    let iterations = 1_000_000u32;
    let start = Instant::now();

    let mut ahead = 0u32;
    for i in 0..iterations {
        let a = i as Tick;
        let b = a.wrapping_sub((i % 7) as Tick);
        if tick_diff(a, b) > 0 {
            ahead += 1;
        }
    }

    let duration = start.elapsed();
    println!(
        "Tick comparison: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Every seventh pair is equal
    assert_eq!(ahead, iterations - (iterations + 6) / 7);
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks network packet serialization performance
#[test]
fn benchmark_packet_serialization() {
    let packets: Vec<Packet> = (0..100u32)
        .map(|i| Packet::PositionUpdate {
            entity_id: i,
            tick: (i * 2) as Tick,
            is_teleport: i % 10 == 0,
            position: Vec3::new(i as f32, 2.0 * i as f32, 0.0),
        })
        .collect();

    let iterations = 1000;
    let start = Instant::now();

    for _ in 0..iterations {
        for packet in &packets {
            let data = serialize(packet).unwrap();
            let _: Packet = deserialize(&data).unwrap();
        }
    }

    let duration = start.elapsed();
    println!(
        "Packet serialization: {} roundtrips in {:?}",
        iterations * packets.len(),
        duration
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Stress tests buffering of heavily reordered snapshots
#[test]
fn stress_test_out_of_order_snapshots() {
    let clock = TickClock::new(0, 2);
    let mut interpolator =
        SnapshotInterpolator::new(&clock, Vec3::ZERO, InterpolationConfig::default());

    // Interleave two halves so nearly every insert lands mid-buffer
    let count: Tick = 2000;
    let ticks: Vec<Tick> = (1..=count / 2)
        .flat_map(|t| [count / 2 + t, t])
        .collect();

    let start = Instant::now();
    for tick in &ticks {
        let position = Vec3::new(*tick as f32, 0.0, 0.0);
        assert!(interpolator.enqueue(PositionSnapshot::new(*tick, false, position), &clock));
    }
    let duration = start.elapsed();

    println!("Out-of-order enqueue: {} snapshots in {:?}", ticks.len(), duration);

    let buffered = interpolator.pending_ticks();
    assert_eq!(buffered.len(), count as usize);
    for window in buffered.windows(2) {
        assert!(tick_diff(window[1], window[0]) > 0);
    }

    // Draining everything in one frame applies them all in order
    let end_position = interpolator.advance_frame(count, count - 2, 0.02, 0.02);
    assert_eq!(interpolator.pending_len(), 0);
    assert_eq!(interpolator.to().tick(), count);
    assert!(end_position.x.is_finite());

    assert!(duration.as_millis() < 1000);
}

/// Benchmarks render frames with many interpolated entities
#[test]
fn benchmark_render_frames_many_entities() {
    let step = fixed_step_duration(50);
    let mut state = ClientGameState::new(
        1,
        TickClock::new(0, 2),
        SyncConfig::default(),
        InterpolationConfig::default(),
        step,
    );

    let entities = 200u32;
    let frames = 1000u32;
    let start = Instant::now();

    for frame in 0..frames {
        let tick = frame as Tick;
        if tick % 2 == 0 {
            for id in 0..entities {
                let position = Vec3::new(
                    (id as f32 * 3.0 + frame as f32) % WORLD_WIDTH,
                    (id as f32 * 2.0) % WORLD_HEIGHT,
                    0.0,
                );
                state.handle_position_update(id, tick, frame == 0, position);
            }
        }

        state.on_fixed_step();
        state.on_render_frame(step);
    }

    let duration = start.elapsed();
    println!(
        "Render frames: {} frames x {} entities in {:?}",
        frames, entities, duration
    );

    assert_eq!(state.entity_count(), entities as usize);
    assert_eq!(state.render_positions().len(), entities as usize);
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks the authoritative world tick with many entities
#[test]
fn benchmark_server_world_ticks() {
    let mut world = GameState::new(2);
    for i in 0..500 {
        let position = Vec3::new(
            (i as f32 * 13.0) % WORLD_WIDTH,
            20.0 + (i as f32 * 7.0) % (WORLD_HEIGHT - 40.0),
            0.0,
        );
        let velocity = Vec3::new(60.0 - (i % 120) as f32, 30.0, 0.0);
        world.add_entity(position, velocity);
    }

    let ticks = 1000;
    let dt = fixed_step_duration(50);
    let mut updates_sent = 0;
    let start = Instant::now();

    for _ in 0..ticks {
        world.step(dt);
        if world.should_send_positions() {
            updates_sent += world.take_position_updates().len();
        }
        world.advance_tick();
    }

    let duration = start.elapsed();
    println!(
        "World ticks: {} ticks, {} updates in {:?}",
        ticks, updates_sent, duration
    );

    assert_eq!(updates_sent, 500 * ticks / 2);
    assert!(duration.as_millis() < 5000);
}
