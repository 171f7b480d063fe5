use crate::core::config::MapConfig;
use crate::core::constants::DEFAULT_ZOOM_DELTA;
use crate::core::geo::{Point, Size, WorldPoint};
use crate::core::viewport::{Viewport, ViewportHandle};
use crate::input::events::{EventHandled, InputEvent};
use crate::input::handler::InteractionController;
use crate::prelude::Arc;
use crate::rendering::scheduler::{lock_surface, RenderPass, RenderScheduler};
use crate::rendering::surface::DrawSurface;
use crate::runtime::{self, AsyncHandle};
use crate::tiles::cache::TileCache;
use crate::tiles::loader::{HttpTileFetcher, TileFetcher};
use crate::tiles::source::{TileSource, UrlTemplate};
use crate::Result;
use std::sync::Mutex;

/// One mounted tile map: viewport, tile cache, render scheduler and
/// interaction controller wired to a single drawing surface
pub struct Map<S> {
    config: Arc<MapConfig>,
    viewport: ViewportHandle,
    cache: TileCache,
    scheduler: RenderScheduler<S>,
    controller: InteractionController,
}

impl<S: DrawSurface + 'static> Map<S> {
    /// Creates a map fetching tiles over HTTP from the configured template.
    ///
    /// Fails with [`crate::MapError::InvalidConfig`] when `config` does not validate.
    pub fn new(config: MapConfig, surface: S) -> Result<Self> {
        config.validate()?;
        let source = Arc::new(UrlTemplate::new(config.tile_url_template()));
        Ok(Self::from_parts(
            config,
            surface,
            Arc::new(HttpTileFetcher::new()),
            source,
            None,
        ))
    }

    pub(crate) fn from_parts(
        config: MapConfig,
        surface: S,
        fetcher: Arc<dyn TileFetcher>,
        source: Arc<dyn TileSource>,
        cache_capacity: Option<usize>,
    ) -> Self {
        let config = Arc::new(config);
        let viewport = ViewportHandle::new(Viewport::new(&config));
        let cache = match cache_capacity {
            Some(capacity) => TileCache::with_capacity(config.min_zoom(), fetcher, capacity),
            None => TileCache::new(config.min_zoom(), fetcher),
        };
        let scheduler = RenderScheduler::new(
            surface,
            Arc::clone(&config),
            viewport.clone(),
            cache.clone(),
            source,
        );
        let controller = InteractionController::new(viewport.clone(), &config);

        log::debug!(
            "map created for {} at zoom {:.2}",
            config.tile_url_template(),
            viewport.zoom()
        );

        Self {
            config,
            viewport,
            cache,
            scheduler,
            controller,
        }
    }

    pub fn get_zoom(&self) -> f64 {
        self.viewport.zoom()
    }

    /// Sets the zoom, clamped to the configured limits
    pub fn set_zoom(&self, zoom: f64) {
        self.viewport.update(|viewport| viewport.set_zoom(zoom));
    }

    pub fn get_center(&self) -> WorldPoint {
        self.viewport.center()
    }

    /// Sets the world-normalized center, clamped to the pan bounds
    pub fn set_center(&self, center: WorldPoint) {
        self.viewport.update(|viewport| viewport.set_center(center));
    }

    pub fn pan_to(&self, center: WorldPoint) {
        self.set_center(center);
    }

    /// Moves the map content by `delta` screen pixels
    pub fn pan_by(&self, delta: Point) {
        self.viewport.update(|viewport| viewport.pan(delta));
    }

    /// Zooms by `delta_zoom` keeping the world point under `anchor` in place
    pub fn zoom_around(&self, anchor: Point, delta_zoom: f64) {
        let canvas = self.canvas_size();
        self.viewport
            .update(|viewport| viewport.zoom_around(anchor, canvas, delta_zoom));
    }

    pub fn zoom_in(&self) {
        self.viewport
            .update(|viewport| viewport.set_zoom(viewport.zoom() + DEFAULT_ZOOM_DELTA));
    }

    pub fn zoom_out(&self) {
        self.viewport
            .update(|viewport| viewport.set_zoom(viewport.zoom() - DEFAULT_ZOOM_DELTA));
    }

    /// Routes an input event to the interaction controller. Resizes are
    /// applied to the surface directly.
    pub fn handle_event(&mut self, event: &InputEvent) -> EventHandled {
        if let InputEvent::Resize { size } = *event {
            let mut surface = lock_surface(self.scheduler.surface());
            if surface.size() == size {
                return EventHandled::NotHandled;
            }
            log::debug!("surface resized to {}x{}", size.width, size.height);
            surface.resize(size);
            return EventHandled::Handled;
        }
        let canvas = self.canvas_size();
        self.controller.handle_event(event, canvas)
    }

    /// Starts a render pass for the current viewport
    pub fn render(&mut self) -> RenderPass<S> {
        self.scheduler.render()
    }

    /// Starts a render pass only if the viewport, the canvas size or an
    /// invalidation changed since the last one
    pub fn render_frame(&mut self) -> Option<RenderPass<S>> {
        self.scheduler.render_frame()
    }

    /// Per-frame entry point: starts a pass if needed and finishes it on
    /// the installed runtime
    pub fn on_animation_frame(&mut self) -> Option<Box<dyn AsyncHandle>> {
        let pass = self.render_frame()?;
        Some(runtime::spawn(async move {
            pass.finish().await;
        }))
    }

    pub fn needs_render(&self) -> bool {
        self.scheduler.needs_render()
    }

    /// Forces the next frame to render
    pub fn invalidate(&mut self) {
        self.scheduler.invalidate();
    }

    pub fn canvas_size(&self) -> Size {
        lock_surface(self.scheduler.surface()).size()
    }

    pub fn surface(&self) -> &Arc<Mutex<S>> {
        self.scheduler.surface()
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn viewport(&self) -> &ViewportHandle {
        &self.viewport
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut InteractionController {
        &mut self.controller
    }
}
