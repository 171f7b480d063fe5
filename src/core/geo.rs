use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in canvas pixel space, relative to the canvas top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// A position expressed as a fraction of the full map extent.
///
/// At zoom 0 the whole world is the unit square `[0, 1] x [0, 1]`; values
/// outside that range are legal and simply lie off the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

impl WorldPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Default for WorldPoint {
    fn default() -> Self {
        Self::new(0.5, 0.5)
    }
}

impl From<(f64, f64)> for WorldPoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Pixel dimensions of a drawable surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn half(&self) -> Point {
        Point::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Axis-aligned rectangle in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width as f64, size.height as f64)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Address of a tile in the slippy map pyramid.
///
/// `x` and `y` are signed so that out-of-range "blank edge" tiles can be
/// requested when a map allows negative tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub z: u8,
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub fn new(z: u8, x: i32, y: i32) -> Self {
        Self { z, x, y }
    }

    /// Number of tiles along one axis at this tile's zoom level
    /// (saturating at `i64::MAX`)
    pub fn tiles_per_axis(&self) -> i64 {
        1_i64
            .checked_shl(self.z as u32)
            .filter(|n| *n > 0)
            .unwrap_or(i64::MAX)
    }

    /// Gets the parent tile at the next lower zoom level
    pub fn parent(&self) -> Option<TileCoord> {
        if self.z == 0 {
            None
        } else {
            Some(TileCoord::new(
                self.z - 1,
                self.x.div_euclid(2),
                self.y.div_euclid(2),
            ))
        }
    }

    /// Returns the ancestor `levels` steps up the pyramid
    pub fn ancestor(&self, levels: u8) -> Option<TileCoord> {
        if levels > self.z {
            return None;
        }
        // Arithmetic shift floors toward negative infinity like `div_euclid`
        let shift = levels.min(63);
        Some(TileCoord::new(
            self.z - levels,
            ((self.x as i64) >> shift) as i32,
            ((self.y as i64) >> shift) as i32,
        ))
    }

    /// Whether `self` covers `other`'s footprint (a tile is its own ancestor)
    pub fn is_ancestor_of(&self, other: &TileCoord) -> bool {
        other.z >= self.z && other.ancestor(other.z - self.z) == Some(*self)
    }

    /// Checks if the tile index lies inside the world at its zoom level
    pub fn is_in_range(&self) -> bool {
        let max = self.tiles_per_axis();
        (0..max).contains(&(self.x as i64)) && (0..max).contains(&(self.y as i64))
    }

    /// Canonical `"{z}/{x}/{y}"` form used as the cache key
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_key_format() {
        assert_eq!(TileCoord::new(3, 5, 2).key(), "3/5/2");
        assert_eq!(TileCoord::new(1, -1, 0).key(), "1/-1/0");
    }

    #[test]
    fn test_parent_floors_negative_indices() {
        assert_eq!(TileCoord::new(3, 5, 2).parent(), Some(TileCoord::new(2, 2, 1)));
        assert_eq!(TileCoord::new(2, -1, -3).parent(), Some(TileCoord::new(1, -1, -2)));
        assert_eq!(TileCoord::new(0, 0, 0).parent(), None);
    }

    #[test]
    fn test_ancestor_relationships() {
        let tile = TileCoord::new(4, 13, 6);
        assert_eq!(tile.ancestor(0), Some(tile));
        assert_eq!(tile.ancestor(2), Some(TileCoord::new(2, 3, 1)));
        assert_eq!(tile.ancestor(5), None);

        assert!(TileCoord::new(2, 3, 1).is_ancestor_of(&tile));
        assert!(tile.is_ancestor_of(&tile));
        assert!(!tile.is_ancestor_of(&TileCoord::new(2, 3, 1)));
        assert!(!TileCoord::new(2, 0, 0).is_ancestor_of(&tile));
    }

    #[test]
    fn test_deep_levels_do_not_overflow() {
        let deep = TileCoord::new(40, -5, 7);
        assert_eq!(deep.ancestor(40), Some(TileCoord::new(0, -1, 0)));
        assert_eq!(deep.ancestor(33), Some(TileCoord::new(7, -1, 0)));
        assert_eq!(TileCoord::new(64, 0, 0).tiles_per_axis(), i64::MAX);
        assert!(TileCoord::new(70, i32::MAX, 0).is_in_range());
    }

    #[test]
    fn test_tile_range() {
        assert!(TileCoord::new(0, 0, 0).is_in_range());
        assert!(!TileCoord::new(0, 1, 0).is_in_range());
        assert!(!TileCoord::new(2, -1, 0).is_in_range());
        assert!(TileCoord::new(2, 3, 3).is_in_range());
        assert!(!TileCoord::new(2, 3, 4).is_in_range());
    }

    #[test]
    fn test_rect_intersection() {
        let canvas = Rect::new(0.0, 0.0, 256.0, 256.0);
        assert!(canvas.intersects(&Rect::new(200.0, 200.0, 100.0, 100.0)));
        assert!(!canvas.intersects(&Rect::new(256.0, 0.0, 10.0, 10.0)));
    }
}
