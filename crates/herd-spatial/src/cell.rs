//! Discretized grid cell keys.

use herd_ecs::Point;

/// Integer coordinates of a uniform grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CellKey {
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Cell containing `point` for a grid of `cell_size` world units.
    ///
    /// Coordinates beyond `i32` saturate and NaN maps to 0, so every point has a key.
    #[must_use]
    pub fn from_point(point: Point, cell_size: f64) -> Self {
        Self {
            x: (point.x / cell_size).floor() as i32,
            y: (point.y / cell_size).floor() as i32,
            z: (point.z / cell_size).floor() as i32,
        }
    }

    /// Chebyshev distance on the x/z plane.
    #[must_use]
    pub fn horizontal_distance(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dz = self.z.abs_diff(other.z);
        dx.max(dz)
    }

    /// Keys of every cell within `radius` cells on the x/z plane, same y band.
    pub fn neighborhood(self, radius: u32) -> impl Iterator<Item = Self> {
        let r = i64::from(radius);
        let (cx, cz, y) = (i64::from(self.x), i64::from(self.z), self.y);
        (cx - r..=cx + r).flat_map(move |x| {
            (cz - r..=cz + r).filter_map(move |z| {
                let x = i32::try_from(x).ok()?;
                let z = i32::try_from(z).ok()?;
                Some(Self::new(x, y, z))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_point_floors() {
        assert_eq!(CellKey::from_point(Point::new(0.0, 0.0, 0.0), 16.0), CellKey::new(0, 0, 0));
        assert_eq!(CellKey::from_point(Point::new(15.9, 0.0, 0.0), 16.0), CellKey::new(0, 0, 0));
        assert_eq!(CellKey::from_point(Point::new(16.0, 0.0, 0.0), 16.0), CellKey::new(1, 0, 0));
        assert_eq!(CellKey::from_point(Point::new(-0.1, -16.0, -16.1), 16.0), CellKey::new(-1, -1, -2));
    }

    #[test]
    fn test_neighborhood_is_square_in_same_band() {
        let center = CellKey::new(5, 2, -3);
        let keys: Vec<_> = center.neighborhood(1).collect();

        assert_eq!(keys.len(), 9);
        assert!(keys.iter().all(|k| k.y == 2));
        assert!(keys.iter().all(|k| k.horizontal_distance(center) <= 1));
        assert!(keys.contains(&CellKey::new(4, 2, -4)));
        assert!(keys.contains(&CellKey::new(6, 2, -2)));

        assert_eq!(center.neighborhood(0).collect::<Vec<_>>(), vec![center]);
    }

    #[test]
    fn test_neighborhood_at_i32_edge() {
        let edge = CellKey::new(i32::MAX, 0, 0);
        assert_eq!(edge.neighborhood(1).count(), 6);
    }
}
