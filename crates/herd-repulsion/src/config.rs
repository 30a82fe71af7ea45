//! Repulsion tuning.
//!
//! All values are per tick: forces are velocity deltas in world units per
//! tick, speeds are world units per tick.

use herd_ecs::RepulsionParams;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Tuning knobs for [`crate::RepulsionEngine`].
///
/// `crowd_threshold` and `inner_crowd_threshold` are independent. Nothing
/// stops the inner threshold from sitting below the crowd threshold, in which
/// case dampening kicks in before amplification does.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepulsionConfig {
    /// Influence distance for entities without their own params.
    pub radius: f64,
    /// Force scale for entities without their own params.
    pub strength: f64,
    /// Neighbors closer than this (horizontally) are ignored.
    pub min_separation: f64,
    /// Cap on a single neighbor's contribution.
    pub max_pair_force: f64,
    /// Neighbor count above which the total force is amplified.
    pub crowd_threshold: u32,
    /// Amplification per neighbor above `crowd_threshold`.
    pub crowd_rate: f64,
    /// Upper bound on the amplification.
    pub max_crowd_multiplier: f64,
    /// Neighbor count above which the total force is dampened.
    pub inner_crowd_threshold: u32,
    /// Dampening factor applied above `inner_crowd_threshold`.
    pub inner_crowd_damping: f64,
    /// Weight of last tick's force in the exponential blend.
    pub smoothing: f64,
    /// Cap on the horizontal velocity change in one tick.
    pub max_velocity_delta: f64,
    /// Cap on total horizontal speed after repulsion.
    pub max_horizontal_speed: f64,
}

impl Default for RepulsionConfig {
    fn default() -> Self {
        Self {
            radius: 1.2,
            strength: 0.08,
            min_separation: 0.01,
            max_pair_force: 0.05,
            crowd_threshold: 4,
            crowd_rate: 0.15,
            max_crowd_multiplier: 3.0,
            inner_crowd_threshold: 12,
            inner_crowd_damping: 0.7,
            smoothing: 0.6,
            max_velocity_delta: 0.1,
            max_horizontal_speed: 0.6,
        }
    }
}

fn positive(field: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::new(field, "finite and > 0", value))
    }
}

fn non_negative(field: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::new(field, "finite and >= 0", value))
    }
}

impl RepulsionConfig {
    /// Check every field. Meant to run once at startup.
    pub fn validate(&self) -> ConfigResult<()> {
        positive("radius", self.radius)?;
        non_negative("strength", self.strength)?;
        non_negative("min_separation", self.min_separation)?;
        positive("max_pair_force", self.max_pair_force)?;
        non_negative("crowd_rate", self.crowd_rate)?;
        if !(self.max_crowd_multiplier.is_finite() && self.max_crowd_multiplier >= 1.0) {
            return Err(ConfigError::new(
                "max_crowd_multiplier",
                "finite and >= 1",
                self.max_crowd_multiplier,
            ));
        }
        if !(self.inner_crowd_damping > 0.0 && self.inner_crowd_damping <= 1.0) {
            return Err(ConfigError::new(
                "inner_crowd_damping",
                "in (0, 1]",
                self.inner_crowd_damping,
            ));
        }
        if !(self.smoothing >= 0.0 && self.smoothing < 1.0) {
            return Err(ConfigError::new("smoothing", "in [0, 1)", self.smoothing));
        }
        positive("max_velocity_delta", self.max_velocity_delta)?;
        positive("max_horizontal_speed", self.max_horizontal_speed)?;
        Ok(())
    }

    /// `true` when dampening starts at a lower neighbor count than amplification.
    #[must_use]
    pub const fn thresholds_inverted(&self) -> bool {
        self.inner_crowd_threshold < self.crowd_threshold
    }

    /// `true` when no neighbor can contribute at the default radius: every
    /// distance is either below `min_separation` or at or past `radius`.
    #[must_use]
    pub fn separation_covers_radius(&self) -> bool {
        self.min_separation >= self.radius
    }

    /// The configured defaults as per-entity params.
    #[must_use]
    pub const fn default_params(&self) -> RepulsionParams {
        RepulsionParams {
            radius: self.radius,
            strength: self.strength,
        }
    }

    /// Resolve an entity's params, falling back to the defaults when the
    /// entity has none or carries unusable values.
    #[must_use]
    pub fn params_for(&self, params: Option<RepulsionParams>) -> RepulsionParams {
        match params {
            Some(p) if positive("radius", p.radius).is_ok() && non_negative("strength", p.strength).is_ok() => p,
            _ => self.default_params(),
        }
    }
}
