//! Simulation configuration.

use std::path::Path;

use herd_ecs::Point;
use herd_repulsion::RepulsionConfig;
use herd_spatial::octree::{DEFAULT_LEAF_CAPACITY, DEFAULT_MAX_DEPTH};
use herd_spatial::{SpatialError, WorldBounds, grid};
use serde::{Deserialize, Serialize};

use crate::error::TickResult;

/// Everything needed to build a [`crate::Simulation`].
///
/// Every field has a default, so a config file only names what it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Edge length of a grid cell.
    pub cell_size: f64,
    /// Center of the octree's world cube.
    pub world_center: Point,
    /// Half the edge length of the octree's world cube.
    pub world_half_extent: f64,
    pub octree_leaf_capacity: usize,
    pub octree_max_depth: u32,
    /// Empty grid cell lists kept for reuse.
    pub pool_bound: usize,
    pub repulsion: RepulsionConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cell_size: 16.0,
            world_center: Point::ORIGIN,
            world_half_extent: 1024.0,
            octree_leaf_capacity: DEFAULT_LEAF_CAPACITY,
            octree_max_depth: DEFAULT_MAX_DEPTH,
            pool_bound: grid::DEFAULT_POOL_BOUND,
            repulsion: RepulsionConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> TickResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> TickResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> TickResult<()> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(SpatialError::InvalidCellSize(self.cell_size).into());
        }
        self.world_bounds()?;
        if self.octree_leaf_capacity == 0 {
            return Err(SpatialError::ZeroLeafCapacity.into());
        }
        self.repulsion.validate()?;
        Ok(())
    }

    /// The octree's world cube.
    pub fn world_bounds(&self) -> TickResult<WorldBounds> {
        Ok(WorldBounds::new(self.world_center, self.world_half_extent)?)
    }
}
