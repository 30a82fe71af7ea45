//! Tick error types.

use herd_repulsion::ConfigError;
use herd_spatial::SpatialError;
use thiserror::Error;

/// Error type for simulation setup and ticking.
#[derive(Debug, Error)]
pub enum TickError {
    /// Spatial index rejected a setting or a point.
    #[error("spatial error: {0}")]
    Spatial(#[from] SpatialError),

    /// Repulsion setting out of range.
    #[error("repulsion config error: {0}")]
    Config(#[from] ConfigError),

    /// Config file is not valid JSON for [`crate::SimConfig`].
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for simulation operations.
pub type TickResult<T> = Result<T, TickError>;
