//! Interfaces the spatial core consumes from the rest of the server.
//!
//! The component store, move tracking and entity lifecycle are owned
//! elsewhere. The core only ever talks to them through these traits.

use hashbrown::HashSet;

use crate::component::{Point, RepulsionParams, Tags, Velocity};
use crate::entity::Entity;

/// Read/write access to the components the spatial core needs.
///
/// Lookups for destroyed entities return `None` rather than failing.
pub trait ComponentStore {
    fn position(&self, entity: Entity) -> Option<Point>;

    fn velocity(&self, entity: Entity) -> Option<Velocity>;

    /// Write `velocity` only if it differs from the stored value.
    ///
    /// Returns `true` when a write happened.
    fn set_velocity_if_changed(&mut self, entity: Entity, velocity: Velocity) -> bool;

    /// `true` if the entity carries every tag in `tags`.
    fn has_tag(&self, entity: Entity, tags: Tags) -> bool;

    /// All live entities carrying every tag in `tags`.
    fn entities_with_tags(&self, tags: Tags) -> impl Iterator<Item = Entity> + '_;

    fn repulsion_params(&self, entity: Entity) -> Option<RepulsionParams>;
}

/// Source of "which entities moved since last asked".
pub trait MoveTracker {
    /// Return the moved set and reset it.
    fn consume_moved(&mut self) -> HashSet<Entity>;
}

/// Receives entity destruction notifications from the lifecycle manager.
///
/// Must be called before the entity's id can be handed out again.
pub trait LifecycleHook {
    fn on_entity_destroyed(&mut self, entity: Entity);
}
