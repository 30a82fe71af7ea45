#![allow(clippy::float_cmp)]

//! Herd crowd repulsion
//!
//! Pushes overlapping participants apart on the horizontal plane. Each tick
//! the [`RepulsionEngine`] reads neighbors from a freshly built
//! [`herd_spatial::RadialIndex`], scales the summed push for crowd density,
//! blends it with the previous tick and writes a capped velocity back.

mod config;
mod engine;
mod error;
pub mod force;

pub use config::RepulsionConfig;
pub use engine::{Accumulated, DEFAULT_BUFFER_POOL_BOUND, RepulsionEngine, RepulsionStats};
pub use error::{ConfigError, ConfigResult};
pub use force::{ForceState, HorizontalForce};
