//! Coordinate transform between viewport state and canvas/tile space
//!
//! All functions here are pure. The world is the unit square at zoom 0 and
//! is `2^zoom * tile_size` pixels wide at `zoom`. Fractional zoom levels are
//! rendered by scaling the tiles of the next integer level down by
//! [`ViewTransform::tile_scale`] rather than fetching fractional tiles.

use crate::core::config::MapConfig;
use crate::core::geo::{Point, Rect, Size, TileCoord, WorldPoint};
use crate::core::viewport::Viewport;

/// World-to-pixel factor at `zoom`
pub fn scale_at(zoom: f64, tile_size: u32) -> f64 {
    2_f64.powf(zoom) * tile_size as f64
}

/// Integer pyramid level fetched for a (possibly fractional) zoom
pub fn tile_zoom_level(zoom: f64, max_zoom: u8) -> u8 {
    let level = zoom.ceil().max(0.0);
    if level >= max_zoom as f64 {
        max_zoom
    } else {
        level as u8
    }
}

/// Snapshot of everything needed to place tiles on a canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    zoom: f64,
    center: WorldPoint,
    tile_size: u32,
    tile_zoom: u8,
    canvas: Size,
}

impl ViewTransform {
    pub fn new(zoom: f64, center: WorldPoint, tile_size: u32, max_zoom: u8, canvas: Size) -> Self {
        Self {
            zoom,
            center,
            tile_size,
            tile_zoom: tile_zoom_level(zoom, max_zoom),
            canvas,
        }
    }

    pub fn for_viewport(viewport: &Viewport, config: &MapConfig, canvas: Size) -> Self {
        Self::new(
            viewport.zoom(),
            viewport.center(),
            config.tile_size(),
            config.max_zoom(),
            canvas,
        )
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn center(&self) -> WorldPoint {
        self.center
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn canvas(&self) -> Size {
        self.canvas
    }

    /// Pixels per world unit
    pub fn scale(&self) -> f64 {
        scale_at(self.zoom, self.tile_size)
    }

    pub fn tile_zoom_level(&self) -> u8 {
        self.tile_zoom
    }

    /// Factor applied to tiles of [`Self::tile_zoom_level`] when drawn
    pub fn tile_scale(&self) -> f64 {
        2_f64.powf(self.zoom - self.tile_zoom as f64)
    }

    /// On-screen edge length of one tile of the fetched level
    pub fn tile_pixel_size(&self) -> f64 {
        self.tile_size as f64 * self.tile_scale()
    }

    /// World pixel position of the canvas top-left corner
    pub fn top_left(&self) -> Point {
        let scale = self.scale();
        let half = self.canvas.half();
        Point::new(
            self.center.x * scale - half.x,
            self.center.y * scale - half.y,
        )
    }

    /// Center expressed in tile units of the fetched level
    pub fn tile_space_center(&self) -> Point {
        let tiles = 2_f64.powi(self.tile_zoom as i32);
        Point::new(self.center.x * tiles, self.center.y * tiles)
    }

    pub fn world_to_pixel(&self, world: WorldPoint) -> Point {
        let scale = self.scale();
        let top_left = self.top_left();
        Point::new(world.x * scale - top_left.x, world.y * scale - top_left.y)
    }

    pub fn pixel_to_world(&self, pixel: Point) -> WorldPoint {
        let scale = self.scale();
        let top_left = self.top_left();
        WorldPoint::new((pixel.x + top_left.x) / scale, (pixel.y + top_left.y) / scale)
    }

    /// Destination rectangle of a tile of any level on the canvas
    pub fn tile_rect(&self, coord: TileCoord) -> Rect {
        let size = self.tile_size as f64 * 2_f64.powf(self.zoom - coord.z as f64);
        let top_left = self.top_left();
        Rect::new(
            coord.x as f64 * size - top_left.x,
            coord.y as f64 * size - top_left.y,
            size,
            size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(diff < 1e-9, "expected {expected}, got {actual} (diff: {diff})");
    }

    #[test]
    fn test_tile_zoom_level() {
        assert_eq!(tile_zoom_level(0.0, 18), 0);
        assert_eq!(tile_zoom_level(2.0, 18), 2);
        assert_eq!(tile_zoom_level(2.3, 18), 3);
        assert_eq!(tile_zoom_level(17.5, 17), 17);
        assert_eq!(tile_zoom_level(25.0, 18), 18);
    }

    #[test]
    fn test_scale_and_top_left() {
        let t = ViewTransform::new(1.0, WorldPoint::new(0.5, 0.5), 256, 18, Size::new(800, 600));
        assert_close(t.scale(), 512.0);
        assert_close(t.top_left().x, 256.0 - 400.0);
        assert_close(t.top_left().y, 256.0 - 300.0);
        assert_close(t.tile_scale(), 1.0);
    }

    #[test]
    fn test_fractional_zoom_scales_next_level_down() {
        let t = ViewTransform::new(2.5, WorldPoint::new(0.5, 0.5), 256, 18, Size::new(512, 512));
        assert_eq!(t.tile_zoom_level(), 3);
        assert_close(t.tile_scale(), 2_f64.powf(-0.5));
        let rect = t.tile_rect(TileCoord::new(3, 4, 4));
        assert_close(rect.width, 256.0 * 2_f64.powf(-0.5));
        // Tile (4,4) at level 3 starts exactly at the world center
        assert_close(rect.x, 256.0);
        assert_close(rect.y, 256.0);
    }

    #[test]
    fn test_world_pixel_round_trip() {
        let canvas = Size::new(640, 480);
        let points = [
            WorldPoint::new(0.0, 0.0),
            WorldPoint::new(0.25, 0.75),
            WorldPoint::new(0.5123, 0.4999),
            WorldPoint::new(-0.3, 1.2),
        ];
        for zoom in [0.0, 0.7, 3.0, 8.25, 18.0] {
            let t = ViewTransform::new(zoom, WorldPoint::new(0.31, 0.62), 256, 18, canvas);
            for p in points {
                let back = t.pixel_to_world(t.world_to_pixel(p));
                assert_close(back.x, p.x);
                assert_close(back.y, p.y);
            }
        }
    }

    #[test]
    fn test_center_maps_to_canvas_middle() {
        let center = WorldPoint::new(0.2, 0.9);
        let t = ViewTransform::new(5.0, center, 256, 18, Size::new(300, 200));
        let pixel = t.world_to_pixel(center);
        assert_close(pixel.x, 150.0);
        assert_close(pixel.y, 100.0);
    }

    #[test]
    fn test_ancestor_rect_covers_descendant() {
        let t = ViewTransform::new(4.0, WorldPoint::new(0.4, 0.6), 256, 18, Size::new(800, 600));
        let child = TileCoord::new(4, 6, 9);
        let parent = child.ancestor(2).unwrap();
        let child_rect = t.tile_rect(child);
        let parent_rect = t.tile_rect(parent);
        assert_close(parent_rect.width, child_rect.width * 4.0);
        assert!(parent_rect.x <= child_rect.x && parent_rect.right() >= child_rect.right());
        assert!(parent_rect.y <= child_rect.y && parent_rect.bottom() >= child_rect.bottom());
    }
}
