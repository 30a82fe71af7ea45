//! In-memory component store.
//!
//! Backs tests, benches and the demo runner. Real servers plug their own
//! store in through [`ComponentStore`] and [`MoveTracker`].

use hashbrown::HashSet;
use tracing::trace;

use crate::arena::EntityMap;
use crate::component::{Point, RepulsionParams, Tags, Velocity};
use crate::entity::{Entity, EntityAllocator};
use crate::store::{ComponentStore, LifecycleHook, MoveTracker};

#[derive(Clone, Debug)]
struct Record {
    position: Point,
    velocity: Velocity,
    tags: Tags,
    params: Option<RepulsionParams>,
}

/// A flat entity store with position, velocity, tags and repulsion params.
#[derive(Debug, Default)]
pub struct MemoryWorld {
    entities: EntityAllocator,
    records: EntityMap<Record>,
    moved: HashSet<Entity>,
    velocity_writes: u64,
}

impl MemoryWorld {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entities: EntityAllocator::with_capacity(capacity),
            records: EntityMap::with_capacity(capacity),
            moved: HashSet::with_capacity(capacity),
            velocity_writes: 0,
        }
    }

    /// Spawn an untagged entity. It counts as moved on the next consume.
    pub fn spawn(&mut self, position: Point) -> Entity {
        self.spawn_tagged(position, Tags::empty())
    }

    /// Spawn a repulsion participant.
    pub fn spawn_participant(&mut self, position: Point) -> Entity {
        self.spawn_tagged(position, Tags::PARTICIPANT)
    }

    pub fn spawn_tagged(&mut self, position: Point, tags: Tags) -> Entity {
        let entity = self.entities.allocate();
        self.records.insert(
            entity,
            Record {
                position,
                velocity: Velocity::ZERO,
                tags,
                params: None,
            },
        );
        self.moved.insert(entity);
        trace!(%entity, ?position, "spawned");
        entity
    }

    /// Destroy an entity without notifying anyone.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if self.records.remove(entity).is_none() {
            return false;
        }
        self.moved.remove(&entity);
        self.entities.deallocate(entity)
    }

    /// Destroy an entity, notifying `hook` before its id is released.
    pub fn despawn_with<H: LifecycleHook + ?Sized>(&mut self, entity: Entity, hook: &mut H) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        hook.on_entity_destroyed(entity);
        self.despawn(entity)
    }

    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Move an entity and mark it as moved. Setting the same position is not a move.
    pub fn set_position(&mut self, entity: Entity, position: Point) -> bool {
        let Some(record) = self.records.get_mut(entity) else {
            return false;
        };
        if record.position != position {
            record.position = position;
            self.moved.insert(entity);
        }
        true
    }

    pub fn set_velocity(&mut self, entity: Entity, velocity: Velocity) -> bool {
        let Some(record) = self.records.get_mut(entity) else {
            return false;
        };
        record.velocity = velocity;
        true
    }

    pub fn add_tags(&mut self, entity: Entity, tags: Tags) -> bool {
        let Some(record) = self.records.get_mut(entity) else {
            return false;
        };
        record.tags.insert(tags);
        true
    }

    pub fn remove_tags(&mut self, entity: Entity, tags: Tags) -> bool {
        let Some(record) = self.records.get_mut(entity) else {
            return false;
        };
        record.tags.remove(tags);
        true
    }

    pub fn set_repulsion_params(&mut self, entity: Entity, params: RepulsionParams) -> bool {
        let Some(record) = self.records.get_mut(entity) else {
            return false;
        };
        record.params = Some(params);
        true
    }

    /// Apply every entity's velocity to its position, then scale horizontal
    /// velocity by `drag`. Entities that end up somewhere new are marked moved.
    pub fn integrate(&mut self, drag: f64) {
        for (entity, record) in self.records.iter_mut() {
            let velocity = record.velocity;
            if velocity != Velocity::ZERO {
                record.position.x += velocity.x;
                record.position.y += velocity.y;
                record.position.z += velocity.z;
                self.moved.insert(entity);
            }
            record.velocity.x *= drag;
            record.velocity.z *= drag;
        }
    }

    /// Number of velocity writes performed through [`ComponentStore`].
    #[must_use]
    pub const fn velocity_writes(&self) -> u64 {
        self.velocity_writes
    }

    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.records.iter().map(|(entity, _)| entity)
    }
}

impl ComponentStore for MemoryWorld {
    fn position(&self, entity: Entity) -> Option<Point> {
        self.records.get(entity).map(|record| record.position)
    }

    fn velocity(&self, entity: Entity) -> Option<Velocity> {
        self.records.get(entity).map(|record| record.velocity)
    }

    fn set_velocity_if_changed(&mut self, entity: Entity, velocity: Velocity) -> bool {
        let Some(record) = self.records.get_mut(entity) else {
            return false;
        };
        if record.velocity == velocity {
            return false;
        }
        record.velocity = velocity;
        self.velocity_writes += 1;
        true
    }

    fn has_tag(&self, entity: Entity, tags: Tags) -> bool {
        self.records
            .get(entity)
            .is_some_and(|record| record.tags.contains(tags))
    }

    fn entities_with_tags(&self, tags: Tags) -> impl Iterator<Item = Entity> + '_ {
        self.records
            .iter()
            .filter(move |(_, record)| record.tags.contains(tags))
            .map(|(entity, _)| entity)
    }

    fn repulsion_params(&self, entity: Entity) -> Option<RepulsionParams> {
        self.records.get(entity).and_then(|record| record.params)
    }
}

impl MoveTracker for MemoryWorld {
    fn consume_moved(&mut self) -> HashSet<Entity> {
        std::mem::take(&mut self.moved)
    }
}
