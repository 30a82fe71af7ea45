//! Headless crowd demo
//!
//! Spawns a tight crowd of participants in an in-memory world and lets the
//! simulation push it apart. Every few ticks one entity is destroyed and a
//! new one spawned in the middle, so ids get recycled under load.
//!
//! Environment:
//! - `HERD_CONFIG`: optional path to a JSON `SimConfig`
//! - `HERD_ENTITIES`: crowd size (default 400)
//! - `HERD_TICKS`: ticks to run, 0 for unbounded (default 200)
//! - `TARGET_TPS`: ticks per second, 0 for as fast as possible (default 20)

use std::time::{Duration, Instant};

use herd_ecs::{Entity, MemoryWorld, Point};
use herd_tick::{SimConfig, Simulation, TickReport};
use tracing::{info, warn};

/// Horizontal velocity kept per tick after integration.
const DRAG: f64 = 0.91;

/// Ticks between destroy/respawn rounds.
const CHURN_INTERVAL: u64 = 10;

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("herd_runner=info".parse()?)
                .add_directive("herd_tick=info".parse()?),
        )
        .init();

    let config = match std::env::var("HERD_CONFIG") {
        Ok(path) => {
            info!("Loading config from {}", path);
            SimConfig::load(&path)?
        }
        Err(_) => SimConfig::default(),
    };

    let entity_count: u32 = env_or("HERD_ENTITIES", 400);
    let max_ticks: u64 = env_or("HERD_TICKS", 200);
    let target_tps: f32 = env_or("TARGET_TPS", 20.0);

    info!(
        entity_count,
        max_ticks,
        target_tps,
        cell_size = config.cell_size,
        radius = config.repulsion.radius,
        "Starting herd runner"
    );

    let mut sim = Simulation::new(config)?;
    let mut world = MemoryWorld::with_capacity(usize::try_from(entity_count)?);
    let mut crowd = spawn_crowd(&mut world, entity_count);

    let target_delta =
        (target_tps > 0.0).then(|| Duration::from_secs_f32(1.0 / target_tps));
    let mut tick: u64 = 0;
    let mut busy = Duration::ZERO;

    while max_ticks == 0 || tick < max_ticks {
        let start = Instant::now();

        let report = sim.tick(&mut world)?;
        world.integrate(DRAG);
        tick += 1;

        if tick.is_multiple_of(CHURN_INTERVAL) {
            churn(&mut world, &mut sim, &mut crowd);
        }

        let elapsed = start.elapsed();
        busy += elapsed;

        if tick.is_multiple_of(20) {
            log_report(&report, &sim, &world, busy / 20);
            busy = Duration::ZERO;
        }

        if let Some(target_delta) = target_delta {
            if elapsed < target_delta {
                std::thread::sleep(target_delta - elapsed);
            } else {
                warn!(tick, ?elapsed, "tick overran target interval");
            }
        }
    }

    info!(
        ticks = sim.ticks(),
        velocity_writes = world.velocity_writes(),
        "Shutting down"
    );
    Ok(())
}

/// Square lattice, tighter than the repulsion radius.
fn spawn_crowd(world: &mut MemoryWorld, count: u32) -> Vec<Entity> {
    let side = f64::from(count).sqrt().ceil();
    let spacing = 0.25;

    (0..count)
        .map(|i| {
            let i = f64::from(i);
            let x = (i % side - side / 2.0) * spacing;
            let z = ((i / side).floor() - side / 2.0) * spacing;
            world.spawn_participant(Point::new(x, 64.0, z))
        })
        .collect()
}

/// Destroy the oldest crowd member and spawn a replacement at the center.
fn churn(world: &mut MemoryWorld, sim: &mut Simulation, crowd: &mut Vec<Entity>) {
    if crowd.is_empty() {
        return;
    }
    let victim = crowd.remove(0);
    world.despawn_with(victim, sim);
    crowd.push(world.spawn_participant(Point::new(0.0, 64.0, 0.0)));
}

fn log_report(report: &TickReport, sim: &Simulation, world: &MemoryWorld, mean: Duration) {
    let grid_pool = sim.grid().pool_stats();
    info!(
        tick = report.tick,
        entities = world.len(),
        indexed = report.indexed,
        octree_nodes = sim.radial().node_count(),
        grid_cells = sim.grid().cell_count(),
        relocated = report.grid.relocated,
        pushed = report.repulsion.pushed,
        isolated = report.repulsion.isolated,
        published = report.repulsion.published,
        force_states = sim.repulsion().tracked_states(),
        pool_hits = grid_pool.hits,
        pool_misses = grid_pool.misses,
        ?mean,
        "tick stats"
    );
}
