pub mod cache;
pub mod loader;
pub mod source;
pub mod visible;

// Re-exports for convenience
pub use cache::{CacheStats, TileCache, TileEntry, TileLoad};
pub use loader::{GatedTileFetcher, HttpTileFetcher, MemoryTileFetcher, TileFetcher, TileImage};
pub use source::{TileSource, UrlTemplate};
pub use visible::{visible_tiles, visible_tiles_with_margin};
