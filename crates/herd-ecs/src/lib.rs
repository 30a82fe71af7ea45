#![allow(clippy::float_cmp)]

//! Herd ECS primitives
//!
//! The spatial core does not own entities or components. This crate holds
//! the small set of types it shares with the rest of the server:
//!
//! - **Entity**: generational handle; a recycled id never matches the old handle
//! - **EntityMap**: dense, generation-checked per-entity storage
//! - **Components**: `Point`, `Velocity`, `RepulsionParams`, `Tags`
//! - **Interfaces**: `ComponentStore`, `MoveTracker`, `LifecycleHook`
//! - **MemoryWorld**: in-memory store implementing the interfaces

mod arena;
mod component;
mod entity;
mod memory;
mod store;

pub use arena::EntityMap;
pub use component::{Point, RepulsionParams, Tags, Velocity};
pub use entity::{Entity, EntityAllocator, EntityId, Generation};
pub use memory::MemoryWorld;
pub use store::{ComponentStore, LifecycleHook, MoveTracker};
