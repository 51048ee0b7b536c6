use crate::tick::Tick;
use serde::{Deserialize, Serialize};

/// Represents a point or direction in 3D world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn add(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(&self, scalar: f32) -> Vec3 {
        Vec3::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }

    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Linear interpolation with `t` clamped to [0, 1]
    pub fn lerp(&self, other: &Vec3, t: f32) -> Vec3 {
        self.lerp_unclamped(other, t.clamp(0.0, 1.0))
    }

    /// Linear interpolation that extrapolates past either endpoint
    pub fn lerp_unclamped(&self, other: &Vec3, t: f32) -> Vec3 {
        self.add(&other.sub(self).scale(t))
    }
}

/// Authoritative position of one networked entity at a server tick.
///
/// Snapshots are immutable once built. Ordering inside the interpolator only
/// looks at the tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    tick: Tick,
    is_teleport: bool,
    position: Vec3,
}

impl PositionSnapshot {
    /// Creates a snapshot of `position` as it was at `tick`
    pub fn new(tick: Tick, is_teleport: bool, position: Vec3) -> Self {
        Self {
            tick,
            is_teleport,
            position,
        }
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Teleports are applied instantly instead of being smoothed
    pub fn is_teleport(&self) -> bool {
        self.is_teleport
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }
}
