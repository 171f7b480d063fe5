//! Headless tile map renderer
//!
//! Renders one viewport of a `{z}/{x}/{y}` tile server into a PNG, optionally
//! after replaying a drag and a wheel gesture through the map's input path.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tilecanvas::{
    InputEvent, MapBuilder, MapConfig, MouseButton, PixmapSurface, Point, Size, ZoomAnchorMode,
};

#[derive(Parser, Debug)]
#[command(name = "tilecanvas-app")]
#[command(about = "Render a slippy-map viewport to a PNG file")]
struct Args {
    /// Tile URL template with {z}, {x} and {y} placeholders
    #[arg(short, long, default_value = "https://tile.openstreetmap.org/{z}/{x}/{y}.png")]
    url: String,

    /// JSON map config; overrides --url
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fractional zoom level
    #[arg(short, long)]
    zoom: Option<f64>,

    /// World-normalized center as `x,y`
    #[arg(short, long, value_parser = parse_pair)]
    center: Option<(f64, f64)>,

    #[arg(long, default_value_t = 800)]
    width: u32,

    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Drag the map by `dx,dy` pixels before rendering
    #[arg(long, value_parser = parse_pair)]
    drag: Option<(f64, f64)>,

    /// Wheel delta applied before rendering (negative zooms in)
    #[arg(long, allow_hyphen_values = true)]
    wheel: Option<f64>,

    /// Pointer position for --wheel as `x,y`; canvas center by default
    #[arg(long, value_parser = parse_pair)]
    wheel_at: Option<(f64, f64)>,

    /// Keep the point under the pointer fixed while wheel-zooming
    #[arg(long)]
    anchor_pointer: bool,

    /// Output PNG path
    #[arg(short, long, default_value = "map.png")]
    output: PathBuf,
}

fn parse_pair(s: &str) -> std::result::Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{}`", s))?;
    let x = x.trim().parse::<f64>().map_err(|e| e.to_string())?;
    let y = y.trim().parse::<f64>().map_err(|e| e.to_string())?;
    Ok((x, y))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut builder = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            MapBuilder::from_config(MapConfig::from_json(&json)?)
        }
        None => MapBuilder::new(args.url.as_str()),
    };
    if args.anchor_pointer {
        builder = builder.with_zoom_anchor_mode(ZoomAnchorMode::Pointer);
    }
    let config = builder.config()?;
    let zoom = args.zoom.unwrap_or_else(|| config.initial_zoom());
    let center = args.center.unwrap_or_else(|| {
        let center = config.initial_center();
        (center.x, center.y)
    });

    let mut map = builder
        .with_initial_view(zoom, center)
        .build(PixmapSurface::new(args.width, args.height))?;

    let middle = Size::new(args.width, args.height).half();
    if let Some((dx, dy)) = args.drag {
        let end = Point::new(middle.x + dx, middle.y + dy);
        for event in [
            InputEvent::PointerDown {
                position: middle,
                button: MouseButton::Left,
            },
            InputEvent::PointerMove { position: end },
            InputEvent::PointerUp { position: end },
        ] {
            map.handle_event(&event);
        }
    }
    if let Some(delta_y) = args.wheel {
        let position = args
            .wheel_at
            .map(|(x, y)| Point::new(x, y))
            .unwrap_or(middle);
        map.handle_event(&InputEvent::Wheel { delta_y, position });
    }

    let center = map.get_center();
    log::info!(
        "rendering {}x{} at zoom {:.3}, center ({:.6}, {:.6})",
        args.width,
        args.height,
        map.get_zoom(),
        center.x,
        center.y
    );

    let report = map.render().finish().await;
    log::info!(
        "drew {} tiles ({} placeholders), {} failed",
        report.total_draws(),
        report.fallback_draws,
        report.failed
    );
    if report.failed > 0 {
        log::warn!("{} tiles could not be fetched", report.failed);
    }

    let surface = map
        .surface()
        .lock()
        .map_err(|_| anyhow::anyhow!("surface lock poisoned"))?;
    surface
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!("{}", args.output.display());
    Ok(())
}
