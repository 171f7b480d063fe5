use crate::core::geo::TileCoord;
use crate::prelude::{Arc, HashMap};
use crate::{MapError, Result};
use async_trait::async_trait;
use futures::channel::oneshot;
use image::RgbaImage;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Shared async HTTP client for tile fetching. Public tile servers such as
/// OpenStreetMap reject requests without a User-Agent.
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(concat!("tilecanvas/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(30))
        .pool_max_idle_per_host(16)
        .build()
        .unwrap_or_else(|e| {
            log::warn!("falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
});

/// A decoded tile, cheap to clone
#[derive(Debug, Clone)]
pub struct TileImage {
    pixels: Arc<RgbaImage>,
}

impl TileImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    /// Decodes PNG or JPEG bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)?;
        Ok(Self::new(decoded.to_rgba8()))
    }

    /// Builds a single-colour tile
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::new(RgbaImage::from_pixel(width, height, image::Rgba(rgba)))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// The image-fetch primitive the tile cache depends on
#[async_trait]
pub trait TileFetcher: Send + Sync {
    async fn fetch(&self, coord: TileCoord, url: &str) -> Result<TileImage>;
}

/// Fetches tiles over HTTP(S) and decodes them
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpTileFetcher;

impl HttpTileFetcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TileFetcher for HttpTileFetcher {
    async fn fetch(&self, coord: TileCoord, url: &str) -> Result<TileImage> {
        log::debug!("fetching tile {} from {}", coord, url);
        let response = HTTP_CLIENT.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MapError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let bytes = response.bytes().await?;
        log::trace!("downloaded tile {} ({} bytes)", coord, bytes.len());
        TileImage::decode(&bytes)
    }
}

/// Serves tiles from memory, counting every fetch call.
///
/// Coordinates with no stored image fail like a 404 would.
#[derive(Debug, Default)]
pub struct MemoryTileFetcher {
    tiles: Mutex<HashMap<TileCoord, TileImage>>,
    calls: Mutex<HashMap<TileCoord, usize>>,
}

impl MemoryTileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, coord: TileCoord, image: TileImage) {
        if let Ok(mut tiles) = self.tiles.lock() {
            tiles.insert(coord, image);
        }
    }

    pub fn with_tile(self, coord: TileCoord, image: TileImage) -> Self {
        self.insert(coord, image);
        self
    }

    /// Total number of fetch calls
    pub fn fetch_count(&self) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.values().sum())
            .unwrap_or(0)
    }

    /// Number of fetch calls made for `coord`
    pub fn fetches_for(&self, coord: TileCoord) -> usize {
        self.calls
            .lock()
            .ok()
            .and_then(|calls| calls.get(&coord).copied())
            .unwrap_or(0)
    }
}

#[async_trait]
impl TileFetcher for MemoryTileFetcher {
    async fn fetch(&self, coord: TileCoord, url: &str) -> Result<TileImage> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(coord).or_insert(0) += 1;
        }
        let found = self
            .tiles
            .lock()
            .ok()
            .and_then(|tiles| tiles.get(&coord).cloned());
        found.ok_or_else(|| MapError::HttpStatus {
            status: 404,
            url: url.to_string(),
        })
    }
}

/// Holds gated tiles until the caller releases them.
///
/// A coordinate registered with [`GatedTileFetcher::gate`] resolves to
/// whatever is sent through the returned sender; sending `None` or dropping
/// the sender fails the fetch. Every other coordinate resolves at once to a
/// grey tile.
#[derive(Debug, Default)]
pub struct GatedTileFetcher {
    gates: Mutex<HashMap<TileCoord, oneshot::Receiver<Option<TileImage>>>>,
    calls: AtomicUsize,
}

impl GatedTileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds `coord` until the returned sender fires
    pub fn gate(&self, coord: TileCoord) -> oneshot::Sender<Option<TileImage>> {
        let (tx, rx) = oneshot::channel();
        if let Ok(mut gates) = self.gates.lock() {
            gates.insert(coord, rx);
        }
        tx
    }

    /// Total number of fetch calls
    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TileFetcher for GatedTileFetcher {
    async fn fetch(&self, coord: TileCoord, url: &str) -> Result<TileImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self
            .gates
            .lock()
            .ok()
            .and_then(|mut gates| gates.remove(&coord));
        let image = match gate {
            Some(rx) => rx.await.ok().flatten(),
            None => Some(TileImage::solid(8, 8, [128, 128, 128, 255])),
        };
        image.ok_or_else(|| MapError::HttpStatus {
            status: 404,
            url: url.to_string(),
        })
    }
}
