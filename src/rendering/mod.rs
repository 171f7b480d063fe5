pub mod generation;
pub mod scheduler;
pub mod surface;

// Re-export main types
pub use generation::{GenerationToken, RenderGeneration};
pub use scheduler::{PassReport, RenderPass, RenderScheduler};
pub use surface::{DrawCommand, DrawSurface, PixmapSurface, RecordingSurface};
