//! The per-server simulation context.
//!
//! ```text
//! tick:
//!   1. radial index: clear, populate from current participants
//!   2. grid: reconcile against the consumed moved set
//!   3. repulsion: read the radial index, write velocities
//! ```
//!
//! Step 1 always finishes before step 3. Destruction notifications arrive
//! between ticks through [`LifecycleHook`].

use herd_ecs::{ComponentStore, Entity, LifecycleHook, MoveTracker, Point, Tags};
use herd_repulsion::{RepulsionConfig, RepulsionEngine, RepulsionStats};
use herd_spatial::{GridIndex, RadialIndex, ReconcileStats};
use tracing::{debug, trace};

use crate::config::SimConfig;
use crate::error::TickResult;

/// What one [`Simulation::tick`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Participants placed in the radial index.
    pub indexed: usize,
    pub grid: ReconcileStats,
    pub repulsion: RepulsionStats,
}

/// Owns the grid, the radial index and the repulsion state for one world.
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    grid: GridIndex,
    radial: RadialIndex,
    repulsion: RepulsionEngine,
    tick: u64,
}

impl Simulation {
    /// Validate `config` and build empty indexes.
    pub fn new(config: SimConfig) -> TickResult<Self> {
        config.validate()?;

        let grid = GridIndex::with_pool_bound(config.cell_size, config.pool_bound)?;
        let radial = RadialIndex::new(
            config.world_bounds()?,
            config.octree_leaf_capacity,
            config.octree_max_depth,
        )?;
        let repulsion = RepulsionEngine::new(config.repulsion.clone())?;

        Ok(Self {
            config,
            grid,
            radial,
            repulsion,
            tick: 0,
        })
    }

    /// Run one tick against `world`.
    ///
    /// A participant outside the world bounds aborts the tick before
    /// repulsion runs. The radial index is left empty, the grid untouched and
    /// the moved set stays with the world.
    pub fn tick<W>(&mut self, world: &mut W) -> TickResult<TickReport>
    where
        W: ComponentStore + MoveTracker,
    {
        self.tick += 1;

        self.radial.clear();
        let indexed = match self
            .radial
            .populate(&*world, world.entities_with_tags(Tags::PARTICIPANT))
        {
            Ok(indexed) => indexed,
            Err(err) => {
                self.radial.clear();
                return Err(err.into());
            }
        };

        let moved = world.consume_moved();
        let grid = self.grid.reconcile(moved, &*world);

        let repulsion = self.repulsion.run(world, &self.radial);

        let report = TickReport {
            tick: self.tick,
            indexed,
            grid,
            repulsion,
        };
        debug!(
            tick = report.tick,
            indexed,
            relocated = grid.relocated,
            inserted = grid.inserted,
            removed = grid.removed,
            pushed = repulsion.pushed,
            published = repulsion.published,
            "tick complete"
        );
        Ok(report)
    }

    /// Drop every piece of per-entity state held for `entity`.
    pub fn cleanup_entity(&mut self, entity: Entity) {
        trace!(%entity, "simulation cleanup");
        self.grid.cleanup_entity(entity);
        self.repulsion.cleanup_entity(entity);
    }

    /// Participants within `radius` of `center` as of the last tick.
    #[must_use]
    pub fn radius_search(&self, center: Point, radius: f64) -> Vec<Entity> {
        self.radial.radius_search(center, radius)
    }

    /// Grid occupants within `cell_radius` cells of the cell holding `point`.
    #[must_use]
    pub fn query_neighborhood(&self, point: Point, cell_radius: u32) -> Vec<Entity> {
        self.grid.query_neighborhood(point, cell_radius)
    }

    /// Grid occupants of the cell holding `point`.
    #[must_use]
    pub fn entities_in_grid(&self, point: Point) -> &[Entity] {
        self.grid.query(point)
    }

    /// Replace the repulsion tuning. Keeps the current tuning on error.
    pub fn set_repulsion_config(&mut self, config: RepulsionConfig) -> TickResult<()> {
        self.repulsion.set_config(config.clone())?;
        self.config.repulsion = config;
        Ok(())
    }

    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    #[must_use]
    pub const fn grid(&self) -> &GridIndex {
        &self.grid
    }

    #[must_use]
    pub const fn radial(&self) -> &RadialIndex {
        &self.radial
    }

    #[must_use]
    pub const fn repulsion(&self) -> &RepulsionEngine {
        &self.repulsion
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.tick
    }
}

impl LifecycleHook for Simulation {
    fn on_entity_destroyed(&mut self, entity: Entity) {
        self.cleanup_entity(entity);
    }
}

#[cfg(test)]
mod tests {
    use herd_ecs::MemoryWorld;
    use herd_spatial::SpatialError;

    use super::*;
    use crate::TickError;

    fn small_world_config() -> SimConfig {
        SimConfig {
            cell_size: 1.0,
            world_half_extent: 64.0,
            ..SimConfig::default()
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = SimConfig {
            cell_size: -1.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            Simulation::new(config),
            Err(TickError::Spatial(SpatialError::InvalidCellSize(_)))
        ));
    }

    #[test]
    fn test_tick_counts_and_indexes() {
        let mut world = MemoryWorld::new();
        world.spawn_participant(Point::new(0.5, 0.0, 0.5));
        world.spawn_participant(Point::new(10.5, 0.0, 0.5));
        world.spawn(Point::new(20.5, 0.0, 0.5));

        let mut sim = Simulation::new(small_world_config()).unwrap();
        let report = sim.tick(&mut world).unwrap();

        assert_eq!(report.tick, 1);
        assert_eq!(report.indexed, 2);
        assert_eq!(report.grid.inserted, 3);
        assert_eq!(sim.grid().len(), 3);
        assert_eq!(sim.radial().len(), 2);

        let report = sim.tick(&mut world).unwrap();
        assert_eq!(report.tick, 2);
        assert_eq!(report.grid.examined, 0);
        assert_eq!(sim.ticks(), 2);
    }

    #[test]
    fn test_out_of_bounds_aborts_tick() {
        let mut world = MemoryWorld::new();
        let inside = world.spawn_participant(Point::new(1.0, 0.0, 0.0));
        world.spawn_participant(Point::new(1.5, 0.0, 0.0));
        world.spawn_participant(Point::new(500.0, 0.0, 0.0));

        let mut sim = Simulation::new(small_world_config()).unwrap();
        let err = sim.tick(&mut world).unwrap_err();

        assert!(matches!(
            err,
            TickError::Spatial(SpatialError::OutOfBounds { .. })
        ));
        assert!(sim.repulsion().force_state(inside).is_none());
        assert!(sim.grid().is_empty());
        assert!(sim.radial().is_empty());
        assert!(sim.radius_search(Point::ORIGIN, 10.0).is_empty());
    }

    #[test]
    fn test_destroy_hook_clears_state() {
        let mut world = MemoryWorld::new();
        let a = world.spawn_participant(Point::new(0.0, 0.0, 0.0));
        world.spawn_participant(Point::new(0.5, 0.0, 0.0));

        let mut sim = Simulation::new(small_world_config()).unwrap();
        sim.tick(&mut world).unwrap();
        assert!(sim.grid().contains(a));
        assert!(sim.repulsion().force_state(a).is_some());

        assert!(world.despawn_with(a, &mut sim));
        assert!(!sim.grid().contains(a));
        assert!(sim.repulsion().force_state(a).is_none());

        // Cleanup of an unknown entity is a no-op.
        sim.on_entity_destroyed(a);
    }

    #[test]
    fn test_set_repulsion_config_keeps_old_on_error() {
        let mut sim = Simulation::new(small_world_config()).unwrap();
        let bad = RepulsionConfig {
            smoothing: 2.0,
            ..RepulsionConfig::default()
        };
        assert!(sim.set_repulsion_config(bad).is_err());
        assert_eq!(sim.config().repulsion, RepulsionConfig::default());

        let good = RepulsionConfig {
            radius: 3.0,
            ..RepulsionConfig::default()
        };
        sim.set_repulsion_config(good.clone()).unwrap();
        assert_eq!(sim.repulsion().config(), &good);
        assert_eq!(sim.config().repulsion, good);
    }
}
