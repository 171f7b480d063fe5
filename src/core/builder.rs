//! Map builder for fluent API configuration
//!
//! [`MapBuilder`] assembles a [`MapConfig`] option by option and wires the
//! resulting map to a tile fetcher and URL source. Anything left unset falls
//! back to the config defaults, an HTTP fetcher and the config's URL
//! template.

use crate::core::config::{MapConfig, TileBounds, ZoomAnchorMode};
use crate::core::map::Map;
use crate::prelude::Arc;
use crate::rendering::surface::DrawSurface;
use crate::tiles::loader::{HttpTileFetcher, TileFetcher};
use crate::tiles::source::{TileSource, UrlTemplate};
use crate::Result;

/// Builder for creating and configuring Map instances
pub struct MapBuilder {
    config: MapConfig,
    /// Tile fetcher, HTTP when unset
    fetcher: Option<Arc<dyn TileFetcher>>,
    /// URL source, the config template when unset
    source: Option<Arc<dyn TileSource>>,
    /// Optional LRU bound for the tile cache
    cache_capacity: Option<usize>,
}

impl MapBuilder {
    /// Starts from the defaults for `tile_url_template`
    pub fn new(tile_url_template: impl Into<String>) -> Self {
        Self::from_config(MapConfig::defaults(tile_url_template.into()))
    }

    /// Starts from an existing config, e.g. one parsed from JSON
    pub fn from_config(config: MapConfig) -> Self {
        Self {
            config,
            fetcher: None,
            source: None,
            cache_capacity: None,
        }
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.config.tile_size = tile_size;
        self
    }

    pub fn with_zoom_limits(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.config.min_zoom = min_zoom;
        self.config.max_zoom = max_zoom;
        self
    }

    pub fn with_zoom_anchor_mode(mut self, mode: ZoomAnchorMode) -> Self {
        self.config.zoom_anchor_mode = mode;
        self
    }

    pub fn with_allow_negative_tiles(mut self, allow: bool) -> Self {
        self.config.allow_negative_tiles = allow;
        self
    }

    pub fn with_bounds(mut self, bounds: TileBounds) -> Self {
        self.config.bounds = Some(bounds);
        self
    }

    /// Sets the starting zoom and world-normalized center
    pub fn with_initial_view(mut self, zoom: f64, center: (f64, f64)) -> Self {
        self.config.initial_zoom = Some(zoom);
        self.config.initial_center = Some(center);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn TileFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Overrides URL construction; the config template is still validated
    pub fn with_source(mut self, source: Arc<dyn TileSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Bounds the tile cache to `capacity` entries, evicting least recently
    /// used tiles
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    /// Validated config without building a map
    pub fn config(&self) -> Result<MapConfig> {
        self.config.validate()?;
        Ok(self.config.clone())
    }

    /// Validates the config and builds the map around `surface`
    pub fn build<S: DrawSurface + 'static>(self, surface: S) -> Result<Map<S>> {
        self.config.validate()?;
        let fetcher: Arc<dyn TileFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpTileFetcher::new()),
        };
        let source: Arc<dyn TileSource> = match self.source {
            Some(source) => source,
            None => Arc::new(UrlTemplate::new(self.config.tile_url_template())),
        };
        Ok(Map::from_parts(
            self.config,
            surface,
            fetcher,
            source,
            self.cache_capacity,
        ))
    }
}
