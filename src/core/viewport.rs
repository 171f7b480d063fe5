use crate::core::config::{MapConfig, TileBounds};
use crate::core::geo::{Point, Size, WorldPoint};
use crate::core::transform::scale_at;
use crate::prelude::Arc;
use std::sync::{RwLock, RwLockReadGuard};

/// Manages the current view of the map: center and zoom, plus the limits
/// copied from the config that every setter enforces
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    /// The current zoom level, always within `[min_zoom, max_zoom]`
    zoom: f64,
    /// The center of the view in world-normalized coordinates
    center: WorldPoint,
    min_zoom: f64,
    max_zoom: f64,
    tile_size: u32,
    bounds: Option<TileBounds>,
    /// Bumped whenever zoom or center actually changes
    revision: u64,
}

impl Viewport {
    /// Creates a viewport at the config's initial zoom and center
    pub fn new(config: &MapConfig) -> Self {
        let mut viewport = Self {
            zoom: config.initial_zoom(),
            center: config.initial_center(),
            min_zoom: config.min_zoom() as f64,
            max_zoom: config.max_zoom() as f64,
            tile_size: config.tile_size(),
            bounds: config.bounds().copied(),
            revision: 0,
        };
        viewport.center = viewport.clamp_center(viewport.center);
        viewport
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn center(&self) -> WorldPoint {
        self.center
    }

    pub fn min_zoom(&self) -> f64 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    pub fn bounds(&self) -> Option<&TileBounds> {
        self.bounds.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Pixels per world unit at the current zoom
    pub fn scale(&self) -> f64 {
        scale_at(self.zoom, self.tile_size)
    }

    /// Sets the zoom level, clamping to the valid range.
    ///
    /// Bounds without a reference zoom depend on the zoom, so the center is
    /// re-clamped afterwards.
    pub fn set_zoom(&mut self, zoom: f64) {
        if !zoom.is_finite() {
            log::warn!("ignoring non-finite zoom {}", zoom);
            return;
        }
        let zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        let center = self.clamp_center_at(self.center, zoom);
        self.commit(zoom, center);
    }

    /// Sets the center, clamped to the configured bounds if any
    pub fn set_center(&mut self, center: WorldPoint) {
        if !center.is_finite() {
            log::warn!("ignoring non-finite center {:?}", center);
            return;
        }
        let center = self.clamp_center(center);
        self.commit(self.zoom, center);
    }

    /// Moves the content by a pixel offset, as if it had been dragged
    pub fn pan(&mut self, delta: Point) {
        let scale = self.scale();
        self.set_center(WorldPoint::new(
            self.center.x - delta.x / scale,
            self.center.y - delta.y / scale,
        ));
    }

    /// Changes zoom while keeping the world point under `anchor` fixed on
    /// a canvas of `canvas` pixels
    pub fn zoom_around(&mut self, anchor: Point, canvas: Size, delta_zoom: f64) {
        let old_scale = self.scale();
        let offset = anchor.subtract(&canvas.half());
        let world = WorldPoint::new(
            self.center.x + offset.x / old_scale,
            self.center.y + offset.y / old_scale,
        );

        let zoom = (self.zoom + delta_zoom).clamp(self.min_zoom, self.max_zoom);
        if !zoom.is_finite() {
            return;
        }
        let new_scale = scale_at(zoom, self.tile_size);
        let center = WorldPoint::new(
            world.x - offset.x / new_scale,
            world.y - offset.y / new_scale,
        );
        let center = self.clamp_center_at(center, zoom);
        self.commit(zoom, center);
    }

    fn clamp_center(&self, center: WorldPoint) -> WorldPoint {
        self.clamp_center_at(center, self.zoom)
    }

    fn clamp_center_at(&self, center: WorldPoint, zoom: f64) -> WorldPoint {
        match &self.bounds {
            Some(bounds) => bounds.clamp(center, zoom),
            None => center,
        }
    }

    fn commit(&mut self, zoom: f64, center: WorldPoint) {
        if zoom != self.zoom || center != self.center {
            self.zoom = zoom;
            self.center = center;
            self.revision += 1;
        }
    }
}

/// Shared handle to a viewport, read by the render scheduler and written by
/// the interaction controller and the public map API
#[derive(Debug, Clone)]
pub struct ViewportHandle {
    inner: Arc<RwLock<Viewport>>,
}

impl ViewportHandle {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            inner: Arc::new(RwLock::new(viewport)),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> Viewport {
        self.read().clone()
    }

    pub fn zoom(&self) -> f64 {
        self.read().zoom()
    }

    pub fn center(&self) -> WorldPoint {
        self.read().center()
    }

    pub fn revision(&self) -> u64 {
        self.read().revision()
    }

    /// Runs `f` with exclusive access to the viewport
    pub fn update<R>(&self, f: impl FnOnce(&mut Viewport) -> R) -> R {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    fn read(&self) -> RwLockReadGuard<'_, Viewport> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MapConfig {
        MapConfig::new("https://tiles.example.com/{z}/{x}/{y}.png").unwrap()
    }

    #[test]
    fn test_viewport_creation() {
        let viewport = Viewport::new(&config());
        assert_eq!(viewport.zoom(), 0.0);
        assert_eq!(viewport.center(), WorldPoint::new(0.5, 0.5));
        assert_eq!(viewport.revision(), 0);
    }

    #[test]
    fn test_zoom_limits() {
        let mut config = config();
        config.min_zoom = 2;
        config.max_zoom = 15;
        let mut viewport = Viewport::new(&config);

        viewport.set_zoom(1.0);
        assert_eq!(viewport.zoom(), 2.0);

        viewport.set_zoom(20.0);
        assert_eq!(viewport.zoom(), 15.0);

        viewport.set_zoom(f64::NAN);
        assert_eq!(viewport.zoom(), 15.0);
    }

    #[test]
    fn test_set_center_clamps_to_bounds() {
        let mut config = config();
        config.bounds = Some(TileBounds::new(0.0, 0.0, 3.0, 3.0));
        let mut viewport = Viewport::new(&config);
        viewport.set_zoom(2.0);

        viewport.set_center(WorldPoint::new(5.0 / 4.0, 2.0 / 4.0));
        assert!((viewport.center().x * 4.0 - 3.0).abs() < 1e-12);
        assert!((viewport.center().y * 4.0 - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_pan_moves_center_against_delta() {
        let mut viewport = Viewport::new(&config());
        viewport.set_zoom(1.0);
        viewport.pan(Point::new(51.2, -25.6));
        // scale is 512 px per world unit at zoom 1
        assert!((viewport.center().x - (0.5 - 0.1)).abs() < 1e-12);
        assert!((viewport.center().y - (0.5 + 0.05)).abs() < 1e-12);
    }

    #[test]
    fn test_zoom_around_keeps_anchor_fixed() {
        let mut viewport = Viewport::new(&config());
        viewport.set_zoom(3.0);
        let canvas = Size::new(800, 600);
        let anchor = Point::new(620.0, 140.0);

        let world_before = {
            let scale = viewport.scale();
            let offset = anchor.subtract(&canvas.half());
            (
                viewport.center().x + offset.x / scale,
                viewport.center().y + offset.y / scale,
            )
        };

        viewport.zoom_around(anchor, canvas, 0.75);
        assert_eq!(viewport.zoom(), 3.75);

        let scale = viewport.scale();
        let offset = anchor.subtract(&canvas.half());
        assert!((viewport.center().x + offset.x / scale - world_before.0).abs() < 1e-12);
        assert!((viewport.center().y + offset.y / scale - world_before.1).abs() < 1e-12);
    }

    #[test]
    fn test_revision_only_bumps_on_change() {
        let handle = ViewportHandle::new(Viewport::new(&config()));
        handle.update(|v| v.set_zoom(0.0));
        assert_eq!(handle.revision(), 0);
        handle.update(|v| v.set_zoom(4.0));
        assert_eq!(handle.revision(), 1);
        assert_eq!(handle.snapshot().zoom(), 4.0);
    }
}
