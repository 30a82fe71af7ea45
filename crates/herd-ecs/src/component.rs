//! Component value types read and written by the spatial core.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// World-space position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub const ORIGIN: Self = Self::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Offset from `other` to `self` on the x/z plane.
    #[must_use]
    pub fn horizontal_offset(self, other: Self) -> (f64, f64) {
        (self.x - other.x, self.z - other.z)
    }

    /// Distance to `other` ignoring the vertical axis.
    #[must_use]
    pub fn horizontal_distance(self, other: Self) -> f64 {
        let (dx, dz) = self.horizontal_offset(other);
        dx.hypot(dz)
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Velocity in world units per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Velocity {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Speed on the x/z plane.
    #[must_use]
    pub fn horizontal_speed(self) -> f64 {
        self.x.hypot(self.z)
    }
}

/// Per-entity override of the configured repulsion defaults.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepulsionParams {
    /// Influence distance.
    pub radius: f64,
    /// Force scale.
    pub strength: f64,
}

bitflags! {
    /// Marker tags the spatial core filters on.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Tags: u8 {
        /// Takes part in crowd repulsion and is indexed by the radial index.
        const PARTICIPANT = 1 << 0;
        /// Being torn down this tick; excluded from indexing.
        const DESTROYING = 1 << 1;
    }
}
