//! Generation-checked per-entity storage.
//!
//! `EntityMap<T>` stores at most one value per entity id in a dense `Vec`
//! indexed by `Entity::id()`. Every slot remembers the generation it was
//! written with, so reads through a recycled id miss instead of returning
//! the previous occupant's data.

use crate::entity::{Entity, Generation};

#[derive(Clone, Debug)]
struct Slot<T> {
    generation: Generation,
    value: T,
}

/// Dense entity-keyed arena.
#[derive(Clone, Debug)]
pub struct EntityMap<T> {
    slots: Vec<Option<Slot<T>>>,
    len: usize,
}

impl<T> Default for EntityMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EntityMap<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            len: 0,
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            len: 0,
        }
    }

    /// Store `value` for `entity`.
    ///
    /// Returns whatever occupied the id slot before, together with the entity
    /// it belonged to. The returned entity may carry an older generation when
    /// the id was recycled without its record being removed.
    pub fn insert(&mut self, entity: Entity, value: T) -> Option<(Entity, T)> {
        let index = entity.id() as usize;
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }

        let previous = self.slots[index].replace(Slot {
            generation: entity.generation(),
            value,
        });

        match previous {
            Some(slot) => Some((Entity::new(entity.id(), slot.generation), slot.value)),
            None => {
                self.len += 1;
                None
            }
        }
    }

    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        match self.slots.get(entity.id() as usize)? {
            Some(slot) if slot.generation == entity.generation() => Some(&slot.value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        match self.slots.get_mut(entity.id() as usize)? {
            Some(slot) if slot.generation == entity.generation() => Some(&mut slot.value),
            _ => None,
        }
    }

    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.get(entity).is_some()
    }

    /// Remove the value stored for `entity`.
    ///
    /// A slot written by a different generation is left untouched.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let cell = self.slots.get_mut(entity.id() as usize)?;
        if !cell
            .as_ref()
            .is_some_and(|slot| slot.generation == entity.generation())
        {
            return None;
        }

        self.len -= 1;
        cell.take().map(|slot| slot.value)
    }

    /// Number of occupied slots.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.len = 0;
    }

    /// Iterate occupied slots as `(entity, value)`.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|slot| (Entity::new(index as u32, slot.generation), &slot.value))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> + '_ {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            slot.as_mut()
                .map(|slot| (Entity::new(index as u32, slot.generation), &mut slot.value))
        })
    }
}
