//! Recyclable entity handles.
//!
//! An id is reused once its entity is destroyed. The handle pairs the id
//! with the generation it was issued under, so a handle kept past
//! destruction never compares equal to whatever holds the id next.

use std::fmt;

/// How many times an id slot has been released.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Generation(u32);

impl Generation {
    const fn bump(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Dense index into per-entity tables.
pub type EntityId = u32;

/// Handle to a live (or formerly live) entity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    id: EntityId,
    generation: Generation,
}

impl Entity {
    pub(crate) const fn new(id: EntityId, generation: Generation) -> Self {
        Self { id, generation }
    }

    #[must_use]
    pub const fn id(self) -> EntityId {
        self.id
    }

    #[must_use]
    pub const fn generation(self) -> Generation {
        self.generation
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({self})")
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.id, self.generation.0)
    }
}

/// Hands out ids, reusing released ones under a new generation.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    current: Vec<Generation>,
    released: Vec<EntityId>,
}

impl EntityAllocator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: Vec::new(),
            released: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            current: Vec::with_capacity(capacity),
            released: Vec::new(),
        }
    }

    /// Most recently released id first; a fresh id when none is free.
    pub fn allocate(&mut self) -> Entity {
        if let Some(id) = self.released.pop() {
            return Entity::new(id, self.current[id as usize]);
        }
        let id = self.current.len() as EntityId;
        self.current.push(Generation::default());
        Entity::new(id, Generation::default())
    }

    /// Release `entity`'s id. `false` if the handle is already stale.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let slot = &mut self.current[entity.id as usize];
        *slot = slot.bump();
        self.released.push(entity.id);
        true
    }

    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.current.get(entity.id as usize) == Some(&entity.generation)
    }
}
