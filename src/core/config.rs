//! Map configuration
//!
//! A [`MapConfig`] is supplied by whoever mounts the map. It can be built in
//! code (see [`crate::core::builder::MapBuilder`]) or deserialized from JSON
//! with the camelCase option names used by web map widgets. Every path goes
//! through [`MapConfig::validate`], so an invalid config is never observable.

use crate::core::constants::{
    DEFAULT_CENTER, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, MAX_SUPPORTED_ZOOM, TILE_SIZE,
};
use crate::core::geo::WorldPoint;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};

/// Which point stays fixed on screen while wheel-zooming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ZoomAnchorMode {
    /// The world point under the pointer stays under the pointer
    #[serde(alias = "mouse")]
    Pointer,
    /// Zoom around the current center
    #[default]
    #[serde(alias = "center")]
    ViewportCenter,
}

/// Panning extent in tile-index units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    /// Zoom level the indices refer to; `None` means the viewport's current zoom
    #[serde(default)]
    pub reference_zoom: Option<u8>,
}

impl TileBounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
            reference_zoom: None,
        }
    }

    pub fn at_zoom(mut self, zoom: u8) -> Self {
        self.reference_zoom = Some(zoom);
        self
    }

    /// Clamps a world-normalized point into the bounds, evaluated at `zoom`
    pub fn clamp(&self, point: WorldPoint, zoom: f64) -> WorldPoint {
        let tiles = match self.reference_zoom {
            Some(reference) => 2_f64.powi(reference as i32),
            None => 2_f64.powf(zoom),
        };
        WorldPoint::new(
            (point.x * tiles).clamp(self.min_x, self.max_x) / tiles,
            (point.y * tiles).clamp(self.min_y, self.max_y) / tiles,
        )
    }

    fn validate(&self) -> Result<()> {
        let values = [self.min_x, self.min_y, self.max_x, self.max_y];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(MapError::InvalidConfig(
                "bounds must be finite numbers".to_string(),
            ));
        }
        if self.min_x > self.max_x || self.min_y > self.max_y {
            return Err(MapError::InvalidConfig(format!(
                "bounds minimum ({}, {}) exceeds maximum ({}, {})",
                self.min_x, self.min_y, self.max_x, self.max_y
            )));
        }
        if matches!(self.reference_zoom, Some(z) if z > MAX_SUPPORTED_ZOOM) {
            return Err(MapError::InvalidConfig(format!(
                "bounds reference zoom must not exceed {}",
                MAX_SUPPORTED_ZOOM
            )));
        }
        Ok(())
    }
}

/// Immutable configuration of one map instance.
///
/// Deserializing goes through [`MapConfig::validate`] as well, so every
/// `MapConfig` a caller can hold satisfies the construction invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawMapConfig")]
pub struct MapConfig {
    pub(crate) tile_url_template: String,
    pub(crate) tile_size: u32,
    pub(crate) min_zoom: u8,
    pub(crate) max_zoom: u8,
    pub(crate) zoom_anchor_mode: ZoomAnchorMode,
    pub(crate) allow_negative_tiles: bool,
    pub(crate) bounds: Option<TileBounds>,
    pub(crate) initial_zoom: Option<f64>,
    pub(crate) initial_center: Option<(f64, f64)>,
}

/// Wire form of [`MapConfig`] before validation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMapConfig {
    #[serde(alias = "tileUrl")]
    tile_url_template: String,
    #[serde(default = "default_tile_size")]
    tile_size: u32,
    #[serde(default = "default_min_zoom")]
    min_zoom: u8,
    #[serde(default = "default_max_zoom")]
    max_zoom: u8,
    #[serde(default, alias = "zoomCenter")]
    zoom_anchor_mode: ZoomAnchorMode,
    #[serde(default = "default_allow_negative_tiles")]
    allow_negative_tiles: bool,
    #[serde(default)]
    bounds: Option<TileBounds>,
    #[serde(default)]
    initial_zoom: Option<f64>,
    #[serde(default)]
    initial_center: Option<(f64, f64)>,
}

impl TryFrom<RawMapConfig> for MapConfig {
    type Error = MapError;

    fn try_from(raw: RawMapConfig) -> Result<Self> {
        let config = MapConfig {
            tile_url_template: raw.tile_url_template,
            tile_size: raw.tile_size,
            min_zoom: raw.min_zoom,
            max_zoom: raw.max_zoom,
            zoom_anchor_mode: raw.zoom_anchor_mode,
            allow_negative_tiles: raw.allow_negative_tiles,
            bounds: raw.bounds,
            initial_zoom: raw.initial_zoom,
            initial_center: raw.initial_center,
        };
        config.validate()?;
        Ok(config)
    }
}

fn default_tile_size() -> u32 {
    TILE_SIZE
}

fn default_min_zoom() -> u8 {
    DEFAULT_MIN_ZOOM
}

fn default_max_zoom() -> u8 {
    DEFAULT_MAX_ZOOM
}

fn default_allow_negative_tiles() -> bool {
    true
}

impl MapConfig {
    /// Creates a validated config with every other option at its default
    pub fn new(tile_url_template: impl Into<String>) -> Result<Self> {
        let config = Self::defaults(tile_url_template.into());
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn defaults(tile_url_template: String) -> Self {
        Self {
            tile_url_template,
            tile_size: TILE_SIZE,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            zoom_anchor_mode: ZoomAnchorMode::default(),
            allow_negative_tiles: true,
            bounds: None,
            initial_zoom: None,
            initial_center: None,
        }
    }

    /// Parses and validates a JSON config object
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawMapConfig = serde_json::from_str(json)?;
        MapConfig::try_from(raw)
    }

    /// Checks every construction-time invariant
    pub fn validate(&self) -> Result<()> {
        let template = self.tile_url_template.trim();
        if template.is_empty() {
            return Err(MapError::InvalidConfig(
                "tile URL template is missing".to_string(),
            ));
        }
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !template.contains(placeholder) {
                return Err(MapError::InvalidConfig(format!(
                    "tile URL template `{}` has no {} placeholder",
                    template, placeholder
                )));
            }
        }
        if self.tile_size == 0 {
            return Err(MapError::InvalidConfig(
                "tile size must be positive".to_string(),
            ));
        }
        if self.min_zoom > self.max_zoom {
            return Err(MapError::InvalidConfig(format!(
                "minZoom ({}) is greater than maxZoom ({})",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.max_zoom > MAX_SUPPORTED_ZOOM {
            return Err(MapError::InvalidConfig(format!(
                "maxZoom ({}) exceeds the supported maximum of {}",
                self.max_zoom, MAX_SUPPORTED_ZOOM
            )));
        }
        if let Some(bounds) = &self.bounds {
            bounds.validate()?;
        }
        if matches!(self.initial_zoom, Some(z) if !z.is_finite()) {
            return Err(MapError::InvalidConfig(
                "initial zoom must be a finite number".to_string(),
            ));
        }
        if matches!(self.initial_center, Some((x, y)) if !(x.is_finite() && y.is_finite())) {
            return Err(MapError::InvalidConfig(
                "initial center must be finite".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tile_url_template(&self) -> &str {
        &self.tile_url_template
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    pub fn zoom_anchor_mode(&self) -> ZoomAnchorMode {
        self.zoom_anchor_mode
    }

    pub fn allow_negative_tiles(&self) -> bool {
        self.allow_negative_tiles
    }

    pub fn bounds(&self) -> Option<&TileBounds> {
        self.bounds.as_ref()
    }

    /// Zoom the viewport starts at, clamped to the zoom limits
    pub fn initial_zoom(&self) -> f64 {
        self.initial_zoom
            .unwrap_or(self.min_zoom as f64)
            .clamp(self.min_zoom as f64, self.max_zoom as f64)
    }

    /// Center the viewport starts at (before bounds clamping)
    pub fn initial_center(&self) -> WorldPoint {
        self.initial_center.unwrap_or(DEFAULT_CENTER).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OSM: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

    #[test]
    fn test_defaults() {
        let config = MapConfig::new(OSM).unwrap();
        assert_eq!(config.tile_size(), 256);
        assert_eq!(config.min_zoom(), 0);
        assert_eq!(config.max_zoom(), 18);
        assert_eq!(config.zoom_anchor_mode(), ZoomAnchorMode::ViewportCenter);
        assert!(config.allow_negative_tiles());
        assert!(config.bounds().is_none());
        assert_eq!(config.initial_zoom(), 0.0);
        assert_eq!(config.initial_center(), WorldPoint::new(0.5, 0.5));
    }

    #[test]
    fn test_from_json_with_options() {
        let config = MapConfig::from_json(
            r#"{
                "tileUrlTemplate": "https://tiles.example.com/{z}/{x}/{y}.png",
                "tileSize": 512,
                "minZoom": 2,
                "maxZoom": 12,
                "zoomAnchorMode": "pointer",
                "allowNegativeTiles": false,
                "bounds": { "minX": 0, "minY": 0, "maxX": 3, "maxY": 3 },
                "initialZoom": 4.5
            }"#,
        )
        .unwrap();

        assert_eq!(config.tile_size(), 512);
        assert_eq!(config.min_zoom(), 2);
        assert_eq!(config.max_zoom(), 12);
        assert_eq!(config.zoom_anchor_mode(), ZoomAnchorMode::Pointer);
        assert!(!config.allow_negative_tiles());
        assert_eq!(config.bounds(), Some(&TileBounds::new(0.0, 0.0, 3.0, 3.0)));
        assert_eq!(config.initial_zoom(), 4.5);
    }

    #[test]
    fn test_legacy_option_names() {
        let config = MapConfig::from_json(
            r#"{ "tileUrl": "/tiles/{z}/{x}/{y}.png", "zoomCenter": "mouse" }"#,
        )
        .unwrap();
        assert_eq!(config.tile_url_template(), "/tiles/{z}/{x}/{y}.png");
        assert_eq!(config.zoom_anchor_mode(), ZoomAnchorMode::Pointer);
    }

    #[test]
    fn test_missing_template_is_rejected() {
        assert!(matches!(MapConfig::new(""), Err(MapError::InvalidConfig(_))));
        assert!(matches!(
            MapConfig::new("https://example.com/{z}/{x}.png"),
            Err(MapError::InvalidConfig(_))
        ));
        assert!(matches!(
            MapConfig::from_json(r#"{ "tileSize": 256 }"#),
            Err(MapError::Serialization(_))
        ));
    }

    #[test]
    fn test_inverted_zoom_range_is_rejected() {
        let result = MapConfig::from_json(
            r#"{ "tileUrlTemplate": "{z}/{x}/{y}", "minZoom": 10, "maxZoom": 3 }"#,
        );
        assert!(matches!(result, Err(MapError::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_bounds_are_rejected() {
        let mut config = MapConfig::defaults(OSM.to_string());
        config.bounds = Some(TileBounds::new(4.0, 0.0, 1.0, 3.0));
        assert!(config.validate().is_err());

        config.bounds = Some(TileBounds::new(0.0, 0.0, f64::NAN, 3.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_initial_zoom_is_clamped() {
        let mut config = MapConfig::defaults(OSM.to_string());
        config.min_zoom = 3;
        config.initial_zoom = Some(25.0);
        assert_eq!(config.initial_zoom(), 18.0);
        config.initial_zoom = None;
        assert_eq!(config.initial_zoom(), 3.0);
    }

    #[test]
    fn test_bounds_clamp_at_current_zoom() {
        let bounds = TileBounds::new(0.0, 0.0, 3.0, 3.0);
        // zoom 2 => 4 tiles per axis, tile index 5 clamps to 3
        let clamped = bounds.clamp(WorldPoint::new(5.0 / 4.0, 1.0 / 4.0), 2.0);
        assert!((clamped.x * 4.0 - 3.0).abs() < 1e-12);
        assert!((clamped.y * 4.0 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_bounds_clamp_at_reference_zoom() {
        let bounds = TileBounds::new(0.0, 0.0, 8.0, 8.0).at_zoom(4);
        let clamped = bounds.clamp(WorldPoint::new(0.9, -0.2), 10.0);
        assert!((clamped.x - 0.5).abs() < 1e-12);
        assert_eq!(clamped.y, 0.0);
    }

    #[test]
    fn test_serde_deserialize_validates() {
        let result = serde_json::from_str::<MapConfig>(
            r#"{ "tileUrlTemplate": "mem://{z}/{x}/{y}", "minZoom": 5, "maxZoom": 2 }"#,
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("minZoom (5) is greater than maxZoom (2)"));

        let result = serde_json::from_str::<MapConfig>(
            r#"{ "tileUrlTemplate": "mem://{z}/{x}/{y}", "maxZoom": 40 }"#,
        );
        assert!(result.is_err());

        let config: MapConfig =
            serde_json::from_str(r#"{ "tileUrl": "mem://{z}/{x}/{y}", "maxZoom": 12 }"#).unwrap();
        assert_eq!(config.max_zoom(), 12);
        let round_trip: MapConfig =
            serde_json::from_str(&serde_json::to_string(&config).unwrap()).unwrap();
        assert_eq!(round_trip, config);
    }
}
