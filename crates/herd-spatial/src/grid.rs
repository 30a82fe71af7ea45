//! Incrementally maintained uniform grid.
//!
//! Each occupied cell keeps an unordered occupant list. A side arena records,
//! per entity, the cell it was last filed under and its index in that list,
//! which makes removal a swap-remove plus one slot fix-up.
//!
//! Invariants:
//! - a cell exists iff it has at least one occupant
//! - an entity is filed under at most one cell
//! - every recorded slot points at the entity it belongs to

use hashbrown::HashMap;
use herd_ecs::{ComponentStore, Entity, EntityMap, Point};
use rustc_hash::FxBuildHasher;
use tracing::trace;

use crate::cell::CellKey;
use crate::error::{SpatialError, SpatialResult};
use crate::pool::{Pool, PoolStats};

/// Default number of empty occupant lists kept for reuse.
pub const DEFAULT_POOL_BOUND: usize = 256;

/// Where an entity is filed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Membership {
    key: CellKey,
    slot: usize,
}

/// Outcome of one [`GridIndex::reconcile`] pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Moved entities looked at.
    pub examined: usize,
    /// Moved but still inside their last-known cell.
    pub unchanged: usize,
    /// Crossed into a different cell.
    pub relocated: usize,
    /// Not tracked before; filed for the first time.
    pub inserted: usize,
    /// No longer in the store; dropped from the grid.
    pub removed: usize,
}

/// Uniform grid keyed by [`CellKey`].
#[derive(Debug)]
pub struct GridIndex {
    cell_size: f64,
    cells: HashMap<CellKey, Vec<Entity>, FxBuildHasher>,
    members: EntityMap<Membership>,
    pool: Pool<Vec<Entity>>,
}

impl GridIndex {
    /// Create an empty grid. Fails unless `cell_size` is finite and positive.
    pub fn new(cell_size: f64) -> SpatialResult<Self> {
        Self::with_pool_bound(cell_size, DEFAULT_POOL_BOUND)
    }

    pub fn with_pool_bound(cell_size: f64, pool_bound: usize) -> SpatialResult<Self> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(SpatialError::InvalidCellSize(cell_size));
        }

        Ok(Self {
            cell_size,
            cells: HashMap::default(),
            members: EntityMap::new(),
            pool: Pool::new(pool_bound),
        })
    }

    #[must_use]
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Key of the cell containing `point`.
    #[must_use]
    pub fn key_for(&self, point: Point) -> CellKey {
        CellKey::from_point(point, self.cell_size)
    }

    /// File `entity` under the cell containing `point`.
    ///
    /// An entity that is already tracked is moved rather than duplicated.
    pub fn insert(&mut self, entity: Entity, point: Point) {
        self.remove(entity);
        let key = self.key_for(point);
        self.file(entity, key);
    }

    /// Drop `entity` from the grid. Returns `false` if it was not tracked.
    pub fn remove(&mut self, entity: Entity) -> bool {
        let Some(membership) = self.members.remove(entity) else {
            return false;
        };
        self.detach(entity, membership);
        true
    }

    /// Bring the grid up to date for the entities that moved.
    ///
    /// Only entities yielded by `moved` are looked at. An entity that stays
    /// inside its last-known cell costs one key computation and nothing else.
    /// Entities the store no longer knows are removed.
    pub fn reconcile<S, I>(&mut self, moved: I, store: &S) -> ReconcileStats
    where
        S: ComponentStore,
        I: IntoIterator<Item = Entity>,
    {
        let mut stats = ReconcileStats::default();

        for entity in moved {
            stats.examined += 1;

            let Some(point) = store.position(entity) else {
                if self.remove(entity) {
                    stats.removed += 1;
                }
                continue;
            };

            let key = self.key_for(point);
            match self.members.get(entity).copied() {
                Some(membership) if membership.key == key => stats.unchanged += 1,
                Some(membership) => {
                    trace!(%entity, from = ?membership.key, to = ?key, "cell transition");
                    self.remove(entity);
                    self.file(entity, key);
                    stats.relocated += 1;
                }
                None => {
                    self.file(entity, key);
                    stats.inserted += 1;
                }
            }
        }

        stats
    }

    /// Occupants of the cell containing `point`. Empty if there is no such cell.
    #[must_use]
    pub fn query(&self, point: Point) -> &[Entity] {
        self.cell(self.key_for(point))
    }

    /// Occupants of the cell with key `key`.
    #[must_use]
    pub fn cell(&self, key: CellKey) -> &[Entity] {
        self.cells.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Occupants of every cell within `cell_radius` cells (Chebyshev, x/z)
    /// of the cell containing `point`, in the same height band.
    #[must_use]
    pub fn query_neighborhood(&self, point: Point, cell_radius: u32) -> Vec<Entity> {
        let mut out = Vec::new();
        self.query_neighborhood_into(point, cell_radius, &mut out);
        out
    }

    /// Like [`Self::query_neighborhood`], writing into a caller-owned buffer.
    /// The buffer is cleared first.
    pub fn query_neighborhood_into(&self, point: Point, cell_radius: u32, out: &mut Vec<Entity>) {
        out.clear();
        let center = self.key_for(point);

        let side = 2 * u128::from(cell_radius) + 1;
        if side * side > self.cells.len() as u128 {
            for (key, occupants) in &self.cells {
                if key.y == center.y && key.horizontal_distance(center) <= cell_radius {
                    out.extend_from_slice(occupants);
                }
            }
            return;
        }

        for key in center.neighborhood(cell_radius) {
            if let Some(occupants) = self.cells.get(&key) {
                out.extend_from_slice(occupants);
            }
        }
    }

    /// Forget everything about `entity`. Safe to call for unknown entities.
    ///
    /// The lifecycle manager must call this before the id is recycled.
    pub fn cleanup_entity(&mut self, entity: Entity) {
        if self.remove(entity) {
            trace!(%entity, "grid cleanup");
        }
    }

    /// Cell the entity was last filed under.
    #[must_use]
    pub fn cell_of(&self, entity: Entity) -> Option<CellKey> {
        self.members.get(entity).map(|membership| membership.key)
    }

    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.members.contains(entity)
    }

    /// Number of tracked entities.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Every occupied cell with its occupants. No ordering.
    pub fn cells(&self) -> impl Iterator<Item = (CellKey, &[Entity])> + '_ {
        self.cells
            .iter()
            .map(|(key, occupants)| (*key, occupants.as_slice()))
    }

    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    fn file(&mut self, entity: Entity, key: CellKey) {
        let occupants = self
            .cells
            .entry(key)
            .or_insert_with(|| self.pool.acquire());
        let slot = occupants.len();
        occupants.push(entity);

        // The id slot still held an older generation that was never cleaned up.
        if let Some((stale, membership)) = self.members.insert(entity, Membership { key, slot }) {
            trace!(%stale, %entity, "evicting stale grid occupant");
            self.detach(stale, membership);
        }
    }

    /// Swap-remove `entity` from its cell. Its own record must already be gone.
    fn detach(&mut self, entity: Entity, membership: Membership) {
        let Some(occupants) = self.cells.get_mut(&membership.key) else {
            return;
        };
        let in_sync = occupants.get(membership.slot) == Some(&entity);
        debug_assert!(in_sync, "grid slot for {entity} is out of sync");
        if !in_sync {
            return;
        }

        occupants.swap_remove(membership.slot);
        if let Some(&swapped) = occupants.get(membership.slot) {
            if let Some(record) = self.members.get_mut(swapped) {
                record.slot = membership.slot;
            }
        }

        if occupants.is_empty() {
            if let Some(list) = self.cells.remove(&membership.key) {
                self.pool.release(list);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use herd_ecs::{EntityAllocator, MemoryWorld, MoveTracker};

    use super::*;

    fn assert_consistent(grid: &GridIndex) {
        let mut filed = 0;
        for (key, occupants) in grid.cells() {
            assert!(!occupants.is_empty(), "empty cell {key:?} kept alive");
            for (slot, &entity) in occupants.iter().enumerate() {
                let membership = grid.members.get(entity).copied();
                assert_eq!(membership, Some(Membership { key, slot }));
                filed += 1;
            }
        }
        assert_eq!(filed, grid.len());
    }

    #[test]
    fn test_rejects_bad_cell_size() {
        assert_eq!(
            GridIndex::new(0.0).unwrap_err(),
            SpatialError::InvalidCellSize(0.0)
        );
        assert!(GridIndex::new(-4.0).is_err());
        assert!(GridIndex::new(f64::NAN).is_err());
        assert!(GridIndex::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_insert_and_query_exact_cell() {
        let mut entities = EntityAllocator::new();
        let mut grid = GridIndex::new(16.0).unwrap();

        let a = entities.allocate();
        let b = entities.allocate();
        let c = entities.allocate();
        grid.insert(a, Point::new(1.0, 0.0, 1.0));
        grid.insert(b, Point::new(15.0, 3.0, 2.0));
        grid.insert(c, Point::new(17.0, 0.0, 1.0));

        let mut here = grid.query(Point::new(8.0, 8.0, 8.0)).to_vec();
        here.sort();
        assert_eq!(here, vec![a, b]);
        assert_eq!(grid.query(Point::new(20.0, 0.0, 0.0)), &[c]);
        assert!(grid.query(Point::new(-100.0, 0.0, 0.0)).is_empty());
        assert_eq!(grid.cell_count(), 2);
        assert_consistent(&grid);
    }

    #[test]
    fn test_reinsert_moves_instead_of_duplicating() {
        let mut entities = EntityAllocator::new();
        let mut grid = GridIndex::new(1.0).unwrap();

        let a = entities.allocate();
        grid.insert(a, Point::new(0.5, 0.0, 0.5));
        grid.insert(a, Point::new(3.5, 0.0, 0.5));

        assert_eq!(grid.len(), 1);
        assert_eq!(grid.cell_count(), 1);
        assert_eq!(grid.cell_of(a), Some(CellKey::new(3, 0, 0)));
        assert_consistent(&grid);
    }

    #[test]
    fn test_swap_remove_patches_moved_slot() {
        let mut entities = EntityAllocator::new();
        let mut grid = GridIndex::new(10.0).unwrap();

        let all: Vec<_> = (0..5).map(|_| entities.allocate()).collect();
        for (i, &e) in all.iter().enumerate() {
            grid.insert(e, Point::new(i as f64, 0.0, 0.0));
        }

        assert!(grid.remove(all[1]));
        assert_consistent(&grid);
        assert!(grid.remove(all[0]));
        assert_consistent(&grid);
        assert!(!grid.remove(all[0]));

        let mut left = grid.query(Point::ORIGIN).to_vec();
        left.sort();
        assert_eq!(left, vec![all[2], all[3], all[4]]);
    }

    #[test]
    fn test_last_occupant_deletes_cell() {
        let mut entities = EntityAllocator::new();
        let mut grid = GridIndex::new(4.0).unwrap();

        let a = entities.allocate();
        grid.insert(a, Point::new(1.0, 1.0, 1.0));
        assert_eq!(grid.cell_count(), 1);

        assert!(grid.remove(a));
        assert_eq!(grid.cell_count(), 0);
        assert!(grid.query(Point::new(1.0, 1.0, 1.0)).is_empty());
        assert_eq!(grid.cells().count(), 0);
        assert_eq!(grid.pool_stats().free, 1);
    }

    #[test]
    fn test_reconcile_cell_transition() {
        let mut world = MemoryWorld::new();
        let mut grid = GridIndex::new(1.0).unwrap();

        let e = world.spawn(Point::new(0.5, 0.5, 0.5));
        let stats = grid.reconcile(world.consume_moved(), &world);
        assert_eq!(stats.inserted, 1);
        assert_eq!(grid.cell(CellKey::new(0, 0, 0)), &[e]);

        world.set_position(e, Point::new(1.5, 0.5, 0.5));
        let stats = grid.reconcile(world.consume_moved(), &world);
        assert_eq!(stats.relocated, 1);

        assert!(grid.cell(CellKey::new(0, 0, 0)).is_empty());
        assert!(grid.cells().all(|(key, _)| key != CellKey::new(0, 0, 0)));
        assert_eq!(grid.cell(CellKey::new(1, 0, 0)), &[e]);
        assert_consistent(&grid);
    }

    #[test]
    fn test_reconcile_same_cell_is_noop() {
        let mut world = MemoryWorld::new();
        let mut grid = GridIndex::new(8.0).unwrap();

        let e = world.spawn(Point::new(1.0, 0.0, 1.0));
        grid.reconcile(world.consume_moved(), &world);

        world.set_position(e, Point::new(2.0, 0.0, 3.0));
        let stats = grid.reconcile(world.consume_moved(), &world);
        assert_eq!(stats.unchanged, 1);
        assert_eq!(stats.relocated, 0);
        assert_eq!(grid.cell_of(e), Some(CellKey::new(0, 0, 0)));
    }

    #[test]
    fn test_reconcile_ignores_unmoved() {
        let mut world = MemoryWorld::new();
        let mut grid = GridIndex::new(1.0).unwrap();

        let a = world.spawn(Point::new(0.5, 0.0, 0.5));
        let b = world.spawn(Point::new(0.5, 0.0, 0.5));
        grid.reconcile(world.consume_moved(), &world);

        // b moves but is not reported; the grid keeps its last-known cell.
        world.set_position(b, Point::new(9.5, 0.0, 0.5));
        let _ = world.consume_moved();
        world.set_position(a, Point::new(5.5, 0.0, 0.5));
        grid.reconcile(world.consume_moved(), &world);

        assert_eq!(grid.cell_of(a), Some(CellKey::new(5, 0, 0)));
        assert_eq!(grid.cell_of(b), Some(CellKey::new(0, 0, 0)));
    }

    #[test]
    fn test_reconcile_twice_with_empty_set_is_idempotent() {
        let mut world = MemoryWorld::new();
        let mut grid = GridIndex::new(2.0).unwrap();

        for i in 0..20_i32 {
            world.spawn(Point::new(f64::from(i) * 0.7, 0.0, f64::from(i % 3)));
        }
        grid.reconcile(world.consume_moved(), &world);

        let snapshot = |grid: &GridIndex| {
            let mut cells: Vec<_> = grid
                .cells()
                .map(|(key, occupants)| (key, occupants.to_vec()))
                .collect();
            cells.sort_by_key(|(key, _)| *key);
            cells
        };

        let before = snapshot(&grid);
        let stats = grid.reconcile(world.consume_moved(), &world);
        assert_eq!(stats, ReconcileStats::default());
        grid.reconcile(world.consume_moved(), &world);
        assert_eq!(snapshot(&grid), before);
    }

    #[test]
    fn test_reconcile_drops_despawned() {
        let mut world = MemoryWorld::new();
        let mut grid = GridIndex::new(1.0).unwrap();

        let e = world.spawn(Point::ORIGIN);
        grid.reconcile(world.consume_moved(), &world);
        world.despawn(e);

        let stats = grid.reconcile([e], &world);
        assert_eq!(stats.removed, 1);
        assert!(grid.is_empty());
        assert_eq!(grid.cell_count(), 0);
    }

    #[test]
    fn test_query_neighborhood_same_band() {
        let mut entities = EntityAllocator::new();
        let mut grid = GridIndex::new(1.0).unwrap();

        let center = entities.allocate();
        let east = entities.allocate();
        let corner = entities.allocate();
        let far = entities.allocate();
        let above = entities.allocate();

        grid.insert(center, Point::new(0.5, 0.5, 0.5));
        grid.insert(east, Point::new(1.5, 0.5, 0.5));
        grid.insert(corner, Point::new(-0.5, 0.5, -0.5));
        grid.insert(far, Point::new(2.5, 0.5, 0.5));
        grid.insert(above, Point::new(0.5, 1.5, 0.5));

        let mut near = grid.query_neighborhood(Point::new(0.5, 0.5, 0.5), 1);
        near.sort();
        assert_eq!(near, vec![center, east, corner]);

        let wide = grid.query_neighborhood(Point::new(0.5, 0.5, 0.5), 2);
        assert_eq!(wide.len(), 4);
        assert!(!wide.contains(&above));

        let mut buf = vec![far];
        grid.query_neighborhood_into(Point::new(0.5, 0.5, 0.5), 0, &mut buf);
        assert_eq!(buf, vec![center]);
    }

    #[test]
    fn test_query_neighborhood_huge_radius() {
        let mut entities = EntityAllocator::new();
        let mut grid = GridIndex::new(1.0).unwrap();

        let here = entities.allocate();
        let distant = entities.allocate();
        let other_band = entities.allocate();
        grid.insert(here, Point::new(0.5, 0.0, 0.5));
        grid.insert(distant, Point::new(-1.0e6, 0.0, 3.0e6));
        grid.insert(other_band, Point::new(0.5, 9.0, 0.5));

        let mut found = grid.query_neighborhood(Point::ORIGIN, u32::MAX);
        found.sort();
        assert_eq!(found, vec![here, distant]);

        let found = grid.query_neighborhood(Point::ORIGIN, 5_000);
        assert_eq!(found, vec![here]);
    }

    #[test]
    fn test_query_neighborhood_sparse_and_dense_agree() {
        let mut entities = EntityAllocator::new();
        let mut grid = GridIndex::new(1.0).unwrap();
        for x in -15..15_i32 {
            for z in -15..15_i32 {
                let point = Point::new(f64::from(x) + 0.5, 0.0, f64::from(z) + 0.5);
                grid.insert(entities.allocate(), point);
            }
        }
        assert_eq!(grid.cell_count(), 900);

        let query_at = Point::new(3.5, 0.0, -2.5);
        let center = grid.key_for(query_at);
        // Radius 3 walks 49 keys; radius 20 covers more keys than cells exist.
        for radius in [3, 20] {
            let mut found = grid.query_neighborhood(query_at, radius);
            found.sort();

            let mut expected: Vec<Entity> = grid
                .cells()
                .filter(|(key, _)| key.horizontal_distance(center) <= radius)
                .flat_map(|(_, occupants)| occupants.iter().copied())
                .collect();
            expected.sort();

            assert_eq!(found, expected, "radius {radius}");
        }
    }

    #[test]
    fn test_cleanup_unknown_entity_is_noop() {
        let mut entities = EntityAllocator::new();
        let mut grid = GridIndex::new(1.0).unwrap();

        let ghost = entities.allocate();
        grid.cleanup_entity(ghost);
        grid.cleanup_entity(ghost);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_recycled_id_evicts_stale_occupant() {
        let mut entities = EntityAllocator::new();
        let mut grid = GridIndex::new(1.0).unwrap();

        let old = entities.allocate();
        let neighbor = entities.allocate();
        grid.insert(old, Point::new(0.5, 0.0, 0.5));
        grid.insert(neighbor, Point::new(0.5, 0.0, 0.5));

        // Destroyed without cleanup, then the id comes back.
        entities.deallocate(old);
        let reused = entities.allocate();
        assert_eq!(reused.id(), old.id());
        assert!(!grid.contains(reused));

        grid.insert(reused, Point::new(4.5, 0.0, 0.5));
        assert_eq!(grid.query(Point::new(0.5, 0.0, 0.5)), &[neighbor]);
        assert_eq!(grid.query(Point::new(4.5, 0.0, 0.5)), &[reused]);
        assert_eq!(grid.len(), 2);
        assert_consistent(&grid);
    }

    #[test]
    fn test_pool_recycles_cell_lists() {
        let mut entities = EntityAllocator::new();
        let mut grid = GridIndex::with_pool_bound(1.0, 4).unwrap();

        let e = entities.allocate();
        for x in 0..10_i32 {
            grid.insert(e, Point::new(f64::from(x) + 0.5, 0.0, 0.0));
        }

        let stats = grid.pool_stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 9);
        assert_eq!(grid.cell_count(), 1);
    }
}
