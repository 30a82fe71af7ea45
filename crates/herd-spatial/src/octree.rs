//! Octree point index rebuilt from scratch every tick.
//!
//! Participants churn and move every tick, so the tree is cleared and
//! refilled rather than maintained incrementally. A rebuild is linear in the
//! participant count and is dwarfed by the neighbor force pass that follows.
//!
//! Nodes live in a flat `Vec`; the eight children of a split node are stored
//! contiguously. Clearing keeps the `Vec` allocation for the next tick.

use herd_ecs::{ComponentStore, Entity, Point, Tags};
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

use crate::error::{SpatialError, SpatialResult};

/// Default number of points a leaf holds before splitting.
pub const DEFAULT_LEAF_CAPACITY: usize = 8;

/// Default split depth limit. Stops runaway splitting on coincident points.
pub const DEFAULT_MAX_DEPTH: u32 = 12;

/// The cube every indexed point must lie in.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub center: Point,
    pub half_extent: f64,
}

impl WorldBounds {
    /// Fails unless `half_extent` is finite and positive.
    pub fn new(center: Point, half_extent: f64) -> SpatialResult<Self> {
        if !half_extent.is_finite() || half_extent <= 0.0 || !center.is_finite() {
            return Err(SpatialError::InvalidHalfExtent(half_extent));
        }
        Ok(Self {
            center,
            half_extent,
        })
    }

    /// Inclusive containment. Non-finite points are never contained.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.is_finite()
            && (point.x - self.center.x).abs() <= self.half_extent
            && (point.y - self.center.y).abs() <= self.half_extent
            && (point.z - self.center.z).abs() <= self.half_extent
    }
}

#[derive(Clone, Debug)]
struct Node {
    center: Point,
    half: f64,
    first_child: Option<u32>,
    entries: SmallVec<[(Entity, Point); DEFAULT_LEAF_CAPACITY]>,
}

impl Node {
    fn leaf(center: Point, half: f64) -> Self {
        Self {
            center,
            half,
            first_child: None,
            entries: SmallVec::new(),
        }
    }

    fn octant(&self, point: Point) -> usize {
        usize::from(point.x >= self.center.x)
            | usize::from(point.y >= self.center.y) << 1
            | usize::from(point.z >= self.center.z) << 2
    }

    fn child_center(&self, octant: usize) -> Point {
        let quarter = self.half / 2.0;
        let offset = |bit: usize| if octant & bit == 0 { -quarter } else { quarter };
        Point::new(
            self.center.x + offset(1),
            self.center.y + offset(2),
            self.center.z + offset(4),
        )
    }

    /// Squared distance from `point` to this node's box; zero inside.
    fn distance_squared_to(&self, point: Point) -> f64 {
        let axis = |p: f64, c: f64| {
            let d = ((p - c).abs() - self.half).max(0.0);
            d * d
        };
        axis(point.x, self.center.x) + axis(point.y, self.center.y) + axis(point.z, self.center.z)
    }
}

/// Radius-query index over this tick's participants.
#[derive(Clone, Debug)]
pub struct RadialIndex {
    bounds: WorldBounds,
    leaf_capacity: usize,
    max_depth: u32,
    nodes: Vec<Node>,
    len: usize,
}

impl RadialIndex {
    pub fn new(bounds: WorldBounds, leaf_capacity: usize, max_depth: u32) -> SpatialResult<Self> {
        let bounds = WorldBounds::new(bounds.center, bounds.half_extent)?;
        if leaf_capacity == 0 {
            return Err(SpatialError::ZeroLeafCapacity);
        }

        Ok(Self {
            bounds,
            leaf_capacity,
            max_depth,
            nodes: vec![Node::leaf(bounds.center, bounds.half_extent)],
            len: 0,
        })
    }

    /// Index with default leaf capacity and depth.
    pub fn with_bounds(bounds: WorldBounds) -> SpatialResult<Self> {
        Self::new(bounds, DEFAULT_LEAF_CAPACITY, DEFAULT_MAX_DEPTH)
    }

    #[must_use]
    pub const fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    /// Discard every indexed point.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes
            .push(Node::leaf(self.bounds.center, self.bounds.half_extent));
        self.len = 0;
    }

    /// Index `entity` at `point`.
    ///
    /// Points outside the world cube are a configuration error and are
    /// reported, not dropped.
    pub fn insert(&mut self, entity: Entity, point: Point) -> SpatialResult<()> {
        if !self.bounds.contains(point) {
            return Err(SpatialError::OutOfBounds { entity, point });
        }

        let mut index = 0;
        let mut depth = 0;
        while let Some(first) = self.nodes[index].first_child {
            index = first as usize + self.nodes[index].octant(point);
            depth += 1;
        }

        self.nodes[index].entries.push((entity, point));
        if self.nodes[index].entries.len() > self.leaf_capacity && depth < self.max_depth {
            self.split(index);
        }

        self.len += 1;
        Ok(())
    }

    /// Index every supplied entity that is a live participant.
    ///
    /// Entities without [`Tags::PARTICIPANT`], tagged [`Tags::DESTROYING`], or
    /// without a position are skipped. Returns how many were indexed.
    pub fn populate<S, I>(&mut self, store: &S, entities: I) -> SpatialResult<usize>
    where
        S: ComponentStore,
        I: IntoIterator<Item = Entity>,
    {
        let mut inserted = 0;
        for entity in entities {
            if !store.has_tag(entity, Tags::PARTICIPANT) || store.has_tag(entity, Tags::DESTROYING) {
                continue;
            }
            let Some(point) = store.position(entity) else {
                continue;
            };
            self.insert(entity, point)?;
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Entities within `radius` (Euclidean, inclusive) of `center`. No ordering.
    #[must_use]
    pub fn radius_search(&self, center: Point, radius: f64) -> Vec<Entity> {
        let mut out = Vec::new();
        self.radius_search_into(center, radius, &mut out);
        out
    }

    /// Like [`Self::radius_search`], writing into a caller-owned buffer.
    /// The buffer is cleared first.
    pub fn radius_search_into(&self, center: Point, radius: f64, out: &mut Vec<Entity>) {
        out.clear();
        self.visit_within(center, radius, |entity, _| out.push(entity));
    }

    /// Like [`Self::radius_search_into`], keeping each hit's indexed position.
    pub fn radius_search_points_into(
        &self,
        center: Point,
        radius: f64,
        out: &mut Vec<(Entity, Point)>,
    ) {
        out.clear();
        self.visit_within(center, radius, |entity, point| out.push((entity, point)));
    }

    fn visit_within(&self, center: Point, radius: f64, mut visit: impl FnMut(Entity, Point)) {
        if self.len == 0 || radius.is_nan() || radius < 0.0 {
            return;
        }

        let radius_sq = radius * radius;
        let mut stack: SmallVec<[u32; 64]> = smallvec![0];

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if node.distance_squared_to(center) > radius_sq {
                continue;
            }

            match node.first_child {
                Some(first) => stack.extend(first..first + 8),
                None => {
                    for &(entity, point) in &node.entries {
                        if point.distance_squared(center) <= radius_sq {
                            visit(entity, point);
                        }
                    }
                }
            }
        }
    }

    /// Number of indexed points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Every indexed `(entity, point)`. No ordering.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, Point)> + '_ {
        self.nodes
            .iter()
            .flat_map(|node| node.entries.iter().copied())
    }

    fn split(&mut self, index: usize) {
        let first = self.nodes.len() as u32;
        let parent = &self.nodes[index];
        let half = parent.half / 2.0;
        let children: [Node; 8] = std::array::from_fn(|octant| Node::leaf(parent.child_center(octant), half));
        self.nodes.extend(children);

        let entries = std::mem::take(&mut self.nodes[index].entries);
        self.nodes[index].first_child = Some(first);
        for (entity, point) in entries {
            let child = first as usize + self.nodes[index].octant(point);
            self.nodes[child].entries.push((entity, point));
        }
    }
}
