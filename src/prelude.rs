//! Prelude module for common tilecanvas types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use tilecanvas::prelude::*;`

pub use crate::core::{
    builder::MapBuilder,
    config::{MapConfig, TileBounds, ZoomAnchorMode},
    geo::{Point, Rect, Size, TileCoord, WorldPoint},
    map::Map,
    transform::ViewTransform,
    viewport::{Viewport, ViewportHandle},
};

pub use crate::input::{
    events::{EventHandled, InputEvent, MouseButton},
    handler::{DragState, InteractionController},
};

pub use crate::rendering::{
    generation::{GenerationToken, RenderGeneration},
    scheduler::{PassReport, RenderPass, RenderScheduler},
    surface::{DrawCommand, DrawSurface, PixmapSurface, RecordingSurface},
};

pub use crate::tiles::{
    cache::{CacheStats, TileCache, TileEntry},
    loader::{GatedTileFetcher, HttpTileFetcher, MemoryTileFetcher, TileFetcher, TileImage},
    source::{TileSource, UrlTemplate},
    visible::visible_tiles,
};

pub use crate::runtime::{init_runtime, runtime, spawn, AsyncHandle, AsyncSpawner};

pub use crate::{Error as MapError, Result};

pub use std::sync::Arc;

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
