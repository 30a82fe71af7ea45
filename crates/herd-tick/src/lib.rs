#![allow(clippy::float_cmp)]

//! Herd tick orchestration
//!
//! [`Simulation`] owns every piece of per-world spatial state: the uniform
//! grid, the per-tick octree and the repulsion force history. Nothing is
//! global, so several worlds can run side by side.

mod config;
mod error;
mod simulation;

pub use config::SimConfig;
pub use error::{TickError, TickResult};
pub use simulation::{Simulation, TickReport};
