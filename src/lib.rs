//! # tilecanvas
//!
//! A slippy-map tile engine for 2D drawing surfaces.
//!
//! The library turns a viewport (fractional zoom plus a world-normalized
//! center) into draws of `{z}/{x}/{y}` raster tiles. Tiles are fetched once,
//! memoized, and stood in for by blocky ancestor tiles while they load;
//! results arriving after a newer render pass has started are discarded.

pub mod core;
pub mod input;
pub mod prelude;
pub mod rendering;
pub mod runtime;
pub mod tiles;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    builder::MapBuilder,
    config::{MapConfig, TileBounds, ZoomAnchorMode},
    geo::{Point, Rect, Size, TileCoord, WorldPoint},
    map::Map,
    transform::ViewTransform,
    viewport::{Viewport, ViewportHandle},
};

pub use crate::input::{EventHandled, InputEvent, InteractionController, MouseButton};

pub use crate::rendering::{
    DrawSurface, PassReport, PixmapSurface, RecordingSurface, RenderPass, RenderScheduler,
};

pub use crate::tiles::{
    GatedTileFetcher, HttpTileFetcher, MemoryTileFetcher, TileCache, TileEntry, TileFetcher,
    TileImage, TileSource, UrlTemplate,
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} fetching {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render error: {0}")]
    Render(String),
}

/// Error type alias for convenience
pub type Error = MapError;
