//! Spatial index error types.

use herd_ecs::{Entity, Point};
use thiserror::Error;

/// Spatial index error type.
#[derive(Debug, Error, PartialEq)]
pub enum SpatialError {
    /// Grid cell size must be finite and positive.
    #[error("invalid cell size: {0}")]
    InvalidCellSize(f64),

    /// World half-extent must be finite and positive.
    #[error("invalid world half-extent: {0}")]
    InvalidHalfExtent(f64),

    /// Octree leaves must hold at least one point.
    #[error("octree leaf capacity must be non-zero")]
    ZeroLeafCapacity,

    /// A point lies outside the configured world cube.
    #[error("entity {entity} at {point:?} is outside the world bounds")]
    OutOfBounds { entity: Entity, point: Point },
}

/// Result type for spatial index operations.
pub type SpatialResult<T> = Result<T, SpatialError>;
