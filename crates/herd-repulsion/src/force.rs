//! Horizontal force math.
//!
//! Repulsion never touches the vertical axis, so forces are (x, z) pairs.

use std::ops::{Add, AddAssign, Mul};

use herd_ecs::{RepulsionParams, Velocity};

use crate::config::RepulsionConfig;

/// A force on the x/z plane, in velocity units per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HorizontalForce {
    pub x: f64,
    pub z: f64,
}

/// The smoothed force last applied to an entity.
pub type ForceState = HorizontalForce;

impl HorizontalForce {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    #[must_use]
    pub fn magnitude(self) -> f64 {
        self.x.hypot(self.z)
    }

    /// Same direction, magnitude at most `max`.
    #[must_use]
    pub fn clamped(self, max: f64) -> Self {
        let (x, z) = clamp_magnitude(self.x, self.z, max);
        Self { x, z }
    }
}

impl Add for HorizontalForce {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.z + rhs.z)
    }
}

impl AddAssign for HorizontalForce {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.z += rhs.z;
    }
}

impl Mul<f64> for HorizontalForce {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.z * rhs)
    }
}

/// Scale `(x, z)` down so its length is at most `max`.
#[must_use]
pub fn clamp_magnitude(x: f64, z: f64, max: f64) -> (f64, f64) {
    let length = x.hypot(z);
    if length <= max || length == 0.0 {
        return (x, z);
    }
    let scale = max / length;
    (x * scale, z * scale)
}

/// Push on an entity from one neighbor.
///
/// `(dx, dz)` points from the neighbor to the entity and has length
/// `distance`, which must be positive. Magnitude falls off quadratically to
/// zero at the influence radius and is capped at `max_pair_force`.
#[must_use]
pub fn pair_force(
    dx: f64,
    dz: f64,
    distance: f64,
    params: RepulsionParams,
    max_pair_force: f64,
) -> HorizontalForce {
    let falloff = (params.radius - distance) / params.radius;
    let magnitude = (params.strength * falloff * falloff).min(max_pair_force);
    HorizontalForce::new(dx / distance * magnitude, dz / distance * magnitude)
}

/// Amplification for `count` contributing neighbors.
#[must_use]
pub fn crowd_multiplier(count: u32, config: &RepulsionConfig) -> f64 {
    if count <= config.crowd_threshold {
        return 1.0;
    }
    let excess = f64::from(count - config.crowd_threshold);
    (1.0 + excess * config.crowd_rate).min(config.max_crowd_multiplier)
}

/// Dampening for `count` contributing neighbors.
#[must_use]
pub fn inner_crowd_damping(count: u32, config: &RepulsionConfig) -> f64 {
    if count > config.inner_crowd_threshold {
        config.inner_crowd_damping
    } else {
        1.0
    }
}

/// Exponential blend of last tick's force with this tick's.
#[must_use]
pub fn smooth(previous: ForceState, raw: HorizontalForce, smoothing: f64) -> ForceState {
    previous * smoothing + raw * (1.0 - smoothing)
}

/// Apply `force` to `current`, capping the change and then the total
/// horizontal speed. The vertical component passes through untouched.
///
/// If `current` is already faster than `max_speed` the speed cap wins over
/// the change cap.
#[must_use]
pub fn limit_velocity(
    current: Velocity,
    force: HorizontalForce,
    max_delta: f64,
    max_speed: f64,
) -> Velocity {
    let delta = force.clamped(max_delta);
    let (x, z) = clamp_magnitude(current.x + delta.x, current.z + delta.z, max_speed);
    Velocity::new(x, current.y, z)
}
