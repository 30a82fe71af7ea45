//! Herd spatial indexing
//!
//! Two independent indexes over entity positions:
//!
//! - [`GridIndex`]: uniform grid, updated incrementally from the moved set,
//!   O(1) membership changes via swap-remove
//! - [`RadialIndex`]: octree rebuilt every tick, answers radius queries
//!
//! Plus [`Pool`], the bounded free list both use to recycle scratch buffers.

pub mod cell;
pub mod error;
pub mod grid;
pub mod octree;
pub mod pool;

pub use cell::CellKey;
pub use error::{SpatialError, SpatialResult};
pub use grid::{GridIndex, ReconcileStats};
pub use octree::{RadialIndex, WorldBounds};
pub use pool::{Pool, PoolStats, Recycle};
