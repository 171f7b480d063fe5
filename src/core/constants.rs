//! Map-wide constants and configuration defaults.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Default lowest zoom level a map may show.
pub const DEFAULT_MIN_ZOOM: u8 = 0;

/// Default highest zoom level a map may show.
pub const DEFAULT_MAX_ZOOM: u8 = 18;

/// Highest zoom level accepted by configuration validation.
/// Tile indices are `i32`, so `2^30` tiles per axis is the ceiling.
pub const MAX_SUPPORTED_ZOOM: u8 = 30;

/// Zoom change per unit of wheel `delta_y`.
pub const DEFAULT_ZOOM_SENSITIVITY: f64 = 0.001;

/// Programmatic +/- zoom step for `zoom_in`/`zoom_out`.
pub const DEFAULT_ZOOM_DELTA: f64 = 1.0;

/// Extra ring of tiles requested around the visible area.
pub const VISIBLE_TILE_MARGIN: i32 = 1;

/// Initial world-normalized center when none is configured.
pub const DEFAULT_CENTER: (f64, f64) = (0.5, 0.5);
