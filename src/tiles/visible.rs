//! Visible-tile set calculation

use crate::core::config::MapConfig;
use crate::core::constants::VISIBLE_TILE_MARGIN;
use crate::core::geo::{Point, TileCoord};
use crate::core::transform::ViewTransform;
use std::cmp::Ordering;

/// Tiles at the fetched zoom level covering the canvas plus the default
/// one-tile margin, nearest to the center first
pub fn visible_tiles(transform: &ViewTransform, config: &MapConfig) -> Vec<TileCoord> {
    visible_tiles_with_margin(transform, config.allow_negative_tiles(), VISIBLE_TILE_MARGIN)
}

/// Same as [`visible_tiles`] with an explicit margin in tiles
pub fn visible_tiles_with_margin(
    transform: &ViewTransform,
    allow_negative_tiles: bool,
    margin: i32,
) -> Vec<TileCoord> {
    let canvas = transform.canvas();
    let tile_px = transform.tile_pixel_size();
    if canvas.is_empty() || !tile_px.is_finite() || tile_px <= 0.0 {
        return Vec::new();
    }

    let z = transform.tile_zoom_level();
    let top_left = transform.top_left();

    let first_x = (top_left.x / tile_px).floor() as i64 - margin as i64;
    let first_y = (top_left.y / tile_px).floor() as i64 - margin as i64;
    let last_x = ((top_left.x + canvas.width as f64) / tile_px).ceil() as i64 - 1 + margin as i64;
    let last_y = ((top_left.y + canvas.height as f64) / tile_px).ceil() as i64 - 1 + margin as i64;

    let in_range = |v: i64| -> bool {
        allow_negative_tiles || (0..(1_i64 << z)).contains(&v)
    };

    let mut tiles = Vec::new();
    for y in first_y..=last_y {
        if !in_range(y) || y < i32::MIN as i64 || y > i32::MAX as i64 {
            continue;
        }
        for x in first_x..=last_x {
            if !in_range(x) || x < i32::MIN as i64 || x > i32::MAX as i64 {
                continue;
            }
            tiles.push(TileCoord::new(z, x as i32, y as i32));
        }
    }

    let center = transform.tile_space_center();
    let distance = |tile: &TileCoord| -> f64 {
        Point::new(tile.x as f64 + 0.5, tile.y as f64 + 0.5).distance_to(&center)
    };
    tiles.sort_by(|a, b| {
        distance(a)
            .partial_cmp(&distance(b))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cmp(b))
    });
    tiles
}
