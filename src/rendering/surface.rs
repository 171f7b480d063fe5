use crate::core::geo::{Rect, Size};
use crate::tiles::loader::TileImage;
use crate::{MapError, Result};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use std::path::Path;

/// Canvas-like target the render scheduler draws tiles onto
pub trait DrawSurface: Send {
    /// Current pixel dimensions
    fn size(&self) -> Size;

    /// Changes the pixel dimensions, discarding the current contents
    fn resize(&mut self, size: Size);

    /// Resets `rect` to fully transparent
    fn clear_rect(&mut self, rect: Rect) -> Result<()>;

    /// Toggles interpolation for subsequent scaled draws
    fn set_image_smoothing(&mut self, enabled: bool);

    /// Draws the `source` region of `image` scaled into `dest`
    fn draw_image(&mut self, image: &TileImage, source: Rect, dest: Rect) -> Result<()>;
}

fn validate_draw(image: &TileImage, source: Rect, dest: Rect) -> Result<()> {
    if !(dest.width > 0.0 && dest.height > 0.0 && dest.x.is_finite() && dest.y.is_finite()) {
        return Err(MapError::Render(format!("invalid destination rect {:?}", dest)));
    }
    let fits = source.x >= 0.0
        && source.y >= 0.0
        && source.width > 0.0
        && source.height > 0.0
        && source.right() <= image.width() as f64
        && source.bottom() <= image.height() as f64;
    if !fits {
        return Err(MapError::Render(format!(
            "source rect {:?} outside {}x{} image",
            source,
            image.width(),
            image.height()
        )));
    }
    Ok(())
}

/// Commands recorded by a [`RecordingSurface`]
#[derive(Debug, Clone)]
pub enum DrawCommand {
    Clear {
        rect: Rect,
    },
    Image {
        image: TileImage,
        source: Rect,
        dest: Rect,
        smoothing: bool,
    },
}

impl DrawCommand {
    pub fn is_image(&self) -> bool {
        matches!(self, DrawCommand::Image { .. })
    }
}

/// Headless surface that only records what was drawn
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    size: Size,
    smoothing: bool,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Size::new(width, height),
            smoothing: true,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Removes and returns everything recorded so far
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_image()).count()
    }

    pub fn smoothing(&self) -> bool {
        self.smoothing
    }
}

impl DrawSurface for RecordingSurface {
    fn size(&self) -> Size {
        self.size
    }

    fn resize(&mut self, size: Size) {
        self.size = size;
    }

    fn clear_rect(&mut self, rect: Rect) -> Result<()> {
        self.commands.push(DrawCommand::Clear { rect });
        Ok(())
    }

    fn set_image_smoothing(&mut self, enabled: bool) {
        self.smoothing = enabled;
    }

    fn draw_image(&mut self, image: &TileImage, source: Rect, dest: Rect) -> Result<()> {
        validate_draw(image, source, dest)?;
        self.commands.push(DrawCommand::Image {
            image: image.clone(),
            source,
            dest,
            smoothing: self.smoothing,
        });
        Ok(())
    }
}

/// Raster surface compositing into an RGBA buffer
#[derive(Debug, Clone)]
pub struct PixmapSurface {
    pixels: RgbaImage,
    smoothing: bool,
}

impl PixmapSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            smoothing: true,
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Writes the current contents as a PNG
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.pixels
            .save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

impl DrawSurface for PixmapSurface {
    fn size(&self) -> Size {
        Size::new(self.pixels.width(), self.pixels.height())
    }

    fn resize(&mut self, size: Size) {
        self.pixels = RgbaImage::new(size.width, size.height);
    }

    fn clear_rect(&mut self, rect: Rect) -> Result<()> {
        let x0 = rect.x.max(0.0).floor() as u32;
        let y0 = rect.y.max(0.0).floor() as u32;
        let x1 = (rect.right().max(0.0).ceil() as u32).min(self.pixels.width());
        let y1 = (rect.bottom().max(0.0).ceil() as u32).min(self.pixels.height());
        for y in y0..y1 {
            for x in x0..x1 {
                self.pixels.put_pixel(x, y, Rgba([0, 0, 0, 0]));
            }
        }
        Ok(())
    }

    fn set_image_smoothing(&mut self, enabled: bool) {
        self.smoothing = enabled;
    }

    fn draw_image(&mut self, image: &TileImage, source: Rect, dest: Rect) -> Result<()> {
        validate_draw(image, source, dest)?;
        if !dest.intersects(&Rect::from_size(self.size())) {
            return Ok(());
        }

        let sx = source.x.floor() as u32;
        let sy = source.y.floor() as u32;
        let sw = (source.width.round() as u32).clamp(1, image.width() - sx);
        let sh = (source.height.round() as u32).clamp(1, image.height() - sy);
        let region = imageops::crop_imm(image.pixels(), sx, sy, sw, sh).to_image();

        // Snap edges rather than sizes so adjacent tiles meet without gaps
        let left = dest.x.round();
        let top = dest.y.round();
        let width = ((dest.right().round() - left) as u32).max(1);
        let height = ((dest.bottom().round() - top) as u32).max(1);

        let filter = if self.smoothing {
            FilterType::Triangle
        } else {
            FilterType::Nearest
        };
        let scaled = if (width, height) == (sw, sh) {
            region
        } else {
            imageops::resize(&region, width, height, filter)
        };
        imageops::overlay(&mut self.pixels, &scaled, left as i64, top as i64);
        Ok(())
    }
}
