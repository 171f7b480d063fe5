//! Render passes with stale-result suppression
//!
//! Each pass advances the map's [`RenderGeneration`] while holding the
//! surface lock, draws whatever the cache can supply right away (ancestor
//! placeholders first, then exact tiles) and hands back a [`RenderPass`]
//! whose [`RenderPass::finish`] awaits the missing tiles. Late tiles are
//! drawn only if no newer pass has started; the generation check happens
//! under the same surface lock, so a superseded pass never touches pixels
//! drawn by its successor.

use super::generation::{GenerationToken, RenderGeneration};
use super::surface::DrawSurface;
use crate::core::config::MapConfig;
use crate::core::geo::{Rect, Size, TileCoord};
use crate::core::transform::ViewTransform;
use crate::core::viewport::ViewportHandle;
use crate::prelude::Arc;
use crate::tiles::cache::{TileCache, TileLoad};
use crate::tiles::loader::TileImage;
use crate::tiles::source::TileSource;
use crate::tiles::visible::visible_tiles;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::{Mutex, MutexGuard};

/// What a render pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub generation: u64,
    /// Ancestor placeholders drawn synchronously
    pub fallback_draws: usize,
    /// Exact tiles that were already cached
    pub exact_draws: usize,
    /// Tiles requested because no exact image was cached
    pub requested: usize,
    /// Requested tiles drawn after their fetch completed
    pub late_draws: usize,
    /// Requested tiles whose fetch failed
    pub failed: usize,
    /// Requested tiles that arrived after the pass was superseded
    pub discarded: usize,
}

impl PassReport {
    pub fn total_draws(&self) -> usize {
        self.fallback_draws + self.exact_draws + self.late_draws
    }
}

pub(crate) fn lock_surface<S>(surface: &Mutex<S>) -> MutexGuard<'_, S> {
    match surface.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn full_rect(image: &TileImage) -> Rect {
    Rect::new(0.0, 0.0, image.width() as f64, image.height() as f64)
}

/// Region of an ancestor tile image covering `key`'s footprint
fn ancestor_source_rect(image: &TileImage, key: TileCoord, ancestor: TileCoord) -> Rect {
    let factor = 1_i64 << (key.z - ancestor.z);
    let width = image.width() as f64 / factor as f64;
    let height = image.height() as f64 / factor as f64;
    let offset_x = key.x as i64 - ancestor.x as i64 * factor;
    let offset_y = key.y as i64 - ancestor.y as i64 * factor;
    Rect::new(offset_x as f64 * width, offset_y as f64 * height, width, height)
}

#[derive(Debug, Default)]
struct FrameState {
    /// Viewport revision and canvas size of the last pass
    rendered: Option<(u64, Size)>,
    invalidated: bool,
}

/// Orchestrates render passes for one map
pub struct RenderScheduler<S> {
    surface: Arc<Mutex<S>>,
    config: Arc<MapConfig>,
    viewport: ViewportHandle,
    cache: TileCache,
    source: Arc<dyn TileSource>,
    generation: RenderGeneration,
    frame: FrameState,
}

impl<S: DrawSurface + 'static> RenderScheduler<S> {
    pub fn new(
        surface: S,
        config: Arc<MapConfig>,
        viewport: ViewportHandle,
        cache: TileCache,
        source: Arc<dyn TileSource>,
    ) -> Self {
        Self {
            surface: Arc::new(Mutex::new(surface)),
            config,
            viewport,
            cache,
            source,
            generation: RenderGeneration::new(),
            frame: FrameState::default(),
        }
    }

    pub fn surface(&self) -> &Arc<Mutex<S>> {
        &self.surface
    }

    pub fn generation(&self) -> &RenderGeneration {
        &self.generation
    }

    /// Forces the next frame to render even if nothing changed
    pub fn invalidate(&mut self) {
        self.frame.invalidated = true;
    }

    /// Whether the viewport, canvas size or an invalidation changed since
    /// the last pass
    pub fn needs_render(&self) -> bool {
        if self.frame.invalidated {
            return true;
        }
        let size = lock_surface(&self.surface).size();
        self.frame.rendered != Some((self.viewport.revision(), size))
    }

    /// Starts a pass if anything changed since the previous one. Calling this
    /// once per animation frame batches any number of input events into at
    /// most one pass.
    pub fn render_frame(&mut self) -> Option<RenderPass<S>> {
        if self.needs_render() {
            Some(self.render())
        } else {
            None
        }
    }

    /// Starts a pass unconditionally
    pub fn render(&mut self) -> RenderPass<S> {
        let mut surface = lock_surface(&self.surface);
        let token = self.generation.advance();
        let size = surface.size();
        let viewport = self.viewport.snapshot();
        self.frame = FrameState {
            rendered: Some((viewport.revision(), size)),
            invalidated: false,
        };

        let mut report = PassReport {
            generation: token.generation(),
            ..PassReport::default()
        };

        if let Err(e) = surface.clear_rect(Rect::from_size(size)) {
            log::warn!("failed to clear surface: {}", e);
        }

        let transform = ViewTransform::for_viewport(&viewport, &self.config, size);
        let tiles = visible_tiles(&transform, &self.config);

        let mut fallbacks = Vec::new();
        let mut exact = Vec::new();
        let mut missing = Vec::new();
        for key in tiles {
            match self.cache.find_best_available(key) {
                Some((image, actual)) if actual == key => exact.push((key, image)),
                Some((image, actual)) => {
                    fallbacks.push((key, image, actual));
                    missing.push(key);
                }
                None => missing.push(key),
            }
        }

        // Placeholders are scaled up blocky on purpose
        surface.set_image_smoothing(false);
        for (key, image, ancestor) in &fallbacks {
            let source = ancestor_source_rect(image, *key, *ancestor);
            match surface.draw_image(image, source, transform.tile_rect(*key)) {
                Ok(()) => report.fallback_draws += 1,
                Err(e) => log::warn!("failed to draw fallback {} for {}: {}", ancestor, key, e),
            }
        }

        surface.set_image_smoothing(true);
        for (key, image) in &exact {
            match surface.draw_image(image, full_rect(image), transform.tile_rect(*key)) {
                Ok(()) => report.exact_draws += 1,
                Err(e) => log::warn!("failed to draw tile {}: {}", key, e),
            }
        }
        drop(surface);

        let loads: Vec<(TileCoord, TileLoad)> = missing
            .into_iter()
            .map(|key| (key, self.cache.request(key, self.source.as_ref())))
            .collect();
        report.requested = loads.len();

        log::debug!(
            "render pass {} at zoom {:.2} (level {}): {} fallback, {} exact, {} requested",
            report.generation,
            transform.zoom(),
            transform.tile_zoom_level(),
            report.fallback_draws,
            report.exact_draws,
            report.requested
        );

        RenderPass {
            token,
            surface: Arc::clone(&self.surface),
            transform,
            loads,
            report,
        }
    }
}

/// A started render pass whose missing tiles are still loading
#[must_use = "late tiles are only drawn once the pass is finished"]
pub struct RenderPass<S> {
    token: GenerationToken,
    surface: Arc<Mutex<S>>,
    transform: ViewTransform,
    loads: Vec<(TileCoord, TileLoad)>,
    report: PassReport,
}

impl<S: DrawSurface + 'static> RenderPass<S> {
    pub fn generation(&self) -> u64 {
        self.token.generation()
    }

    pub fn is_current(&self) -> bool {
        self.token.is_current()
    }

    /// Draws performed so far
    pub fn report(&self) -> PassReport {
        self.report
    }

    /// Awaits every requested tile and draws those arriving while this pass
    /// is still current, in completion order
    pub async fn finish(self) -> PassReport {
        let RenderPass {
            token,
            surface,
            transform,
            loads,
            mut report,
        } = self;

        let mut pending: FuturesUnordered<_> = loads
            .into_iter()
            .map(|(key, load)| async move { (key, load.await) })
            .collect();

        while let Some((key, result)) = pending.next().await {
            let Some(image) = result else {
                report.failed += 1;
                continue;
            };
            let mut canvas = lock_surface(&surface);
            if !token.is_current() {
                log::trace!(
                    "discarding tile {} for superseded pass {}",
                    key,
                    token.generation()
                );
                report.discarded += 1;
                continue;
            }
            canvas.set_image_smoothing(true);
            match canvas.draw_image(&image, full_rect(&image), transform.tile_rect(key)) {
                Ok(()) => report.late_draws += 1,
                Err(e) => log::warn!("failed to draw tile {}: {}", key, e),
            }
        }

        log::debug!(
            "render pass {} finished: {} late, {} failed, {} discarded",
            report.generation,
            report.late_draws,
            report.failed,
            report.discarded
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::viewport::Viewport;
    use crate::rendering::surface::{DrawCommand, RecordingSurface};
    use crate::tiles::loader::{GatedTileFetcher, MemoryTileFetcher};
    use crate::tiles::source::UrlTemplate;
    use crate::tiles::TileFetcher;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    fn config() -> Arc<MapConfig> {
        Arc::new(
            MapConfig::from_json(
                r#"{
                    "tileUrlTemplate": "mem://{z}/{x}/{y}",
                    "tileSize": 256,
                    "allowNegativeTiles": false,
                    "initialZoom": 1
                }"#,
            )
            .unwrap(),
        )
    }

    fn scheduler(
        fetcher: Arc<dyn TileFetcher>,
    ) -> (RenderScheduler<RecordingSurface>, ViewportHandle, TileCache) {
        let config = config();
        let viewport = ViewportHandle::new(Viewport::new(&config));
        let cache = TileCache::new(config.min_zoom(), fetcher);
        let source: Arc<dyn TileSource> = Arc::new(UrlTemplate::new(config.tile_url_template()));
        let scheduler = RenderScheduler::new(
            RecordingSurface::new(512, 512),
            Arc::clone(&config),
            viewport.clone(),
            cache.clone(),
            source,
        );
        (scheduler, viewport, cache)
    }

    fn colour(command: &DrawCommand) -> Option<[u8; 4]> {
        match command {
            DrawCommand::Image { image, .. } => Some(image.pixels().get_pixel(0, 0).0),
            DrawCommand::Clear { .. } => None,
        }
    }

    #[test]
    fn test_ancestor_source_rect() {
        let image = TileImage::solid(256, 256, RED);
        let rect = ancestor_source_rect(&image, TileCoord::new(3, 5, 2), TileCoord::new(1, 1, 0));
        assert_eq!(rect, Rect::new(64.0, 128.0, 64.0, 64.0));
        assert_eq!(
            ancestor_source_rect(&image, TileCoord::new(2, 1, 1), TileCoord::new(2, 1, 1)),
            full_rect(&image)
        );
    }

    #[tokio::test]
    async fn test_fallbacks_drawn_before_exact_tiles() {
        let root = TileCoord::new(0, 0, 0);
        let cached = TileCoord::new(1, 0, 0);
        let late = TileCoord::new(1, 1, 0);
        let fetcher = Arc::new(
            MemoryTileFetcher::new()
                .with_tile(root, TileImage::solid(8, 8, RED))
                .with_tile(cached, TileImage::solid(8, 8, BLUE))
                .with_tile(late, TileImage::solid(8, 8, BLUE)),
        );
        let (mut scheduler, _, cache) = scheduler(fetcher.clone());
        let source = UrlTemplate::new("mem://{z}/{x}/{y}");
        cache.request(root, &source).await;
        cache.request(cached, &source).await;

        let pass = scheduler.render();
        let report = pass.report();
        assert_eq!(report.fallback_draws, 3);
        assert_eq!(report.exact_draws, 1);
        assert_eq!(report.requested, 3);

        {
            let surface = lock_surface(scheduler.surface());
            let commands = surface.commands();
            assert!(matches!(commands[0], DrawCommand::Clear { .. }));
            for command in &commands[1..4] {
                assert!(matches!(command, DrawCommand::Image { smoothing: false, .. }));
                assert_eq!(colour(command), Some(RED));
            }
            assert!(matches!(commands[4], DrawCommand::Image { smoothing: true, .. }));
            assert_eq!(colour(&commands[4]), Some(BLUE));

            // Fallback for (1,1,1) samples the lower-right quarter of the root
            let quarter = commands[1..4].iter().any(|c| {
                matches!(c, DrawCommand::Image { source, .. } if *source == Rect::new(4.0, 4.0, 4.0, 4.0))
            });
            assert!(quarter);
        }

        let report = pass.finish().await;
        assert_eq!(report.late_draws, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.discarded, 0);
        assert_eq!(lock_surface(scheduler.surface()).draw_count(), 5);
    }

    #[tokio::test]
    async fn test_superseded_pass_draws_nothing() {
        let fetcher = Arc::new(GatedTileFetcher::new());
        let gates: Vec<_> = [(0, 0), (1, 0), (0, 1), (1, 1)]
            .iter()
            .map(|&(x, y)| fetcher.gate(TileCoord::new(1, x, y)))
            .collect();
        let (mut scheduler, viewport, _) = scheduler(fetcher.clone());

        let stale = scheduler.render();
        assert_eq!(stale.report().requested, 4);
        assert_eq!(stale.report().total_draws(), 0);

        viewport.update(|v| v.pan(crate::core::geo::Point::new(10.0, 0.0)));
        let current = scheduler.render();
        assert!(!stale.is_current());
        let draws_before = lock_surface(scheduler.surface()).draw_count();

        for gate in gates {
            gate.send(Some(TileImage::solid(8, 8, BLUE))).ok();
        }
        let stale_report = stale.finish().await;
        assert_eq!(stale_report.late_draws, 0);
        assert_eq!(stale_report.discarded, 4);
        assert_eq!(lock_surface(scheduler.surface()).draw_count(), draws_before);

        // The newer pass shares the same fetches and draws their results
        let report = current.finish().await;
        assert_eq!(report.late_draws, 4);
        assert_eq!(fetcher.fetch_count(), 4);
    }

    #[tokio::test]
    async fn test_render_frame_coalesces_changes() {
        let (mut scheduler, viewport, _) = scheduler(Arc::new(MemoryTileFetcher::new()));

        let first = scheduler.render_frame().expect("initial frame renders");
        assert!(scheduler.render_frame().is_none());

        for step in 0..10 {
            viewport.update(|v| v.pan(crate::core::geo::Point::new(step as f64, 1.0)));
        }
        let second = scheduler.render_frame().expect("viewport changed");
        assert!(scheduler.render_frame().is_none());
        assert_eq!(second.generation(), first.generation() + 1);

        lock_surface(scheduler.surface()).resize(Size::new(300, 200));
        assert!(scheduler.render_frame().is_some());

        scheduler.invalidate();
        assert!(scheduler.render_frame().is_some());
        assert!(scheduler.render_frame().is_none());
    }

    #[tokio::test]
    async fn test_dropped_pass_still_fills_cache() {
        let fetcher = Arc::new(MemoryTileFetcher::new());
        for x in 0..2 {
            for y in 0..2 {
                fetcher.insert(TileCoord::new(1, x, y), TileImage::solid(8, 8, BLUE));
            }
        }
        let (mut scheduler, _, cache) = scheduler(fetcher.clone());

        let pass = scheduler.render();
        assert_eq!(pass.report().requested, 4);
        drop(pass);

        for _ in 0..100 {
            if cache.stats().ready == 4 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(cache.stats().ready, 4);

        let report = scheduler.render().finish().await;
        assert_eq!(report.exact_draws, 4);
        assert_eq!(report.requested, 0);
        assert_eq!(fetcher.fetch_count(), 4);
    }
}
