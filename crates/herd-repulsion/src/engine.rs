//! Per-tick crowd repulsion.
//!
//! For every participant: find neighbors in the radial index, sum the
//! falloff forces, scale for crowd density, smooth against last tick, cap,
//! and write the new velocity back through the store.

use herd_ecs::{ComponentStore, Entity, EntityMap, Point, RepulsionParams, Tags};
use herd_spatial::{Pool, PoolStats, RadialIndex};
use tracing::{trace, warn};

use crate::config::RepulsionConfig;
use crate::error::ConfigResult;
use crate::force::{
    ForceState, HorizontalForce, crowd_multiplier, inner_crowd_damping, limit_velocity,
    pair_force, smooth,
};

/// Default number of scratch buffers kept for reuse.
pub const DEFAULT_BUFFER_POOL_BOUND: usize = 4;

/// Counters from one [`RepulsionEngine::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RepulsionStats {
    /// Participants considered.
    pub participants: usize,
    /// Participants with at least one contributing neighbor.
    pub pushed: usize,
    /// Participants with no neighbor inside their radius.
    pub isolated: usize,
    /// Participants skipped because the store lost their position or velocity.
    pub missing: usize,
    /// Velocity writes that actually changed the stored value.
    pub published: usize,
}

/// Raw force and neighbor count before crowd scaling.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Accumulated {
    pub force: HorizontalForce,
    pub neighbors: u32,
}

/// Computes and applies separation velocities.
#[derive(Debug)]
pub struct RepulsionEngine {
    config: RepulsionConfig,
    states: EntityMap<ForceState>,
    participant_buffers: Pool<Vec<Entity>>,
    neighbor_buffers: Pool<Vec<(Entity, Point)>>,
}

impl RepulsionEngine {
    /// Build an engine. Fails on an invalid config.
    pub fn new(config: RepulsionConfig) -> ConfigResult<Self> {
        Self::with_pool_bound(config, DEFAULT_BUFFER_POOL_BOUND)
    }

    pub fn with_pool_bound(config: RepulsionConfig, pool_bound: usize) -> ConfigResult<Self> {
        config.validate()?;
        warn_on_hazards(&config);

        Ok(Self {
            config,
            states: EntityMap::new(),
            participant_buffers: Pool::new(pool_bound),
            neighbor_buffers: Pool::new(pool_bound),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &RepulsionConfig {
        &self.config
    }

    /// Swap in a new config. The old one stays if the new one is invalid.
    pub fn set_config(&mut self, config: RepulsionConfig) -> ConfigResult<()> {
        config.validate()?;
        warn_on_hazards(&config);
        self.config = config;
        Ok(())
    }

    /// Run one tick of repulsion.
    ///
    /// `index` must already hold this tick's participants.
    pub fn run<S: ComponentStore>(&mut self, store: &mut S, index: &RadialIndex) -> RepulsionStats {
        let mut stats = RepulsionStats::default();
        let mut participants = self.participant_buffers.acquire();
        let mut neighbors = self.neighbor_buffers.acquire();

        participants.extend(store.entities_with_tags(Tags::PARTICIPANT));

        for &entity in &participants {
            if store.has_tag(entity, Tags::DESTROYING) {
                continue;
            }
            stats.participants += 1;

            let (Some(position), Some(velocity)) = (store.position(entity), store.velocity(entity))
            else {
                stats.missing += 1;
                continue;
            };

            let params = self.config.params_for(store.repulsion_params(entity));
            index.radius_search_points_into(position, params.radius, &mut neighbors);

            let accumulated = self.accumulate(entity, position, params, &neighbors);
            if accumulated.neighbors == 0 {
                stats.isolated += 1;
                continue;
            }
            stats.pushed += 1;

            let total = accumulated.force
                * crowd_multiplier(accumulated.neighbors, &self.config)
                * inner_crowd_damping(accumulated.neighbors, &self.config);

            let previous = self.states.get(entity).copied().unwrap_or_default();
            let smoothed = smooth(previous, total, self.config.smoothing);
            self.states.insert(entity, smoothed);

            let next = limit_velocity(
                velocity,
                smoothed,
                self.config.max_velocity_delta,
                self.config.max_horizontal_speed,
            );
            if store.set_velocity_if_changed(entity, next) {
                stats.published += 1;
            }

            trace!(
                %entity,
                neighbors = accumulated.neighbors,
                force = smoothed.magnitude(),
                "repulsion applied"
            );
        }

        self.participant_buffers.release(participants);
        self.neighbor_buffers.release(neighbors);
        stats
    }

    /// Sum the per-neighbor pushes on `entity` at `position`.
    ///
    /// Neighbors at or beyond the radius, closer than the separation floor,
    /// or exactly on top of the entity do not contribute.
    #[must_use]
    pub fn accumulate(
        &self,
        entity: Entity,
        position: Point,
        params: RepulsionParams,
        neighbors: &[(Entity, Point)],
    ) -> Accumulated {
        let mut accumulated = Accumulated::default();

        for &(other, point) in neighbors {
            if other == entity {
                continue;
            }

            let (dx, dz) = position.horizontal_offset(point);
            let distance = dx.hypot(dz);
            if distance <= 0.0 || distance < self.config.min_separation || distance >= params.radius {
                continue;
            }

            accumulated.force += pair_force(dx, dz, distance, params, self.config.max_pair_force);
            accumulated.neighbors += 1;
        }

        accumulated
    }

    /// Smoothed force last applied to `entity`.
    #[must_use]
    pub fn force_state(&self, entity: Entity) -> Option<ForceState> {
        self.states.get(entity).copied()
    }

    /// Number of entities carrying a force state.
    #[must_use]
    pub const fn tracked_states(&self) -> usize {
        self.states.len()
    }

    /// Drop `entity`'s force state. Safe to call for unknown entities.
    pub fn cleanup_entity(&mut self, entity: Entity) {
        if self.states.remove(entity).is_some() {
            trace!(%entity, "force state cleanup");
        }
    }

    /// Usage of the participant and neighbor scratch pools.
    #[must_use]
    pub fn pool_stats(&self) -> (PoolStats, PoolStats) {
        (
            self.participant_buffers.stats(),
            self.neighbor_buffers.stats(),
        )
    }
}

fn warn_on_hazards(config: &RepulsionConfig) {
    if config.thresholds_inverted() {
        warn!(
            crowd_threshold = config.crowd_threshold,
            inner_crowd_threshold = config.inner_crowd_threshold,
            "inner crowd threshold is below crowd threshold; dampening will apply before amplification"
        );
    }
    if config.separation_covers_radius() {
        warn!(
            min_separation = config.min_separation,
            radius = config.radius,
            "min separation is not below the default radius; entities without their own params never repel"
        );
    }
}
