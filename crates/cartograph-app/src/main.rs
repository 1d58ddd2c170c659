//! Headless world-map renderer.
//!
//! Renders a seeded synthetic world through the full pipeline while the camera
//! tours the map, then writes the last frame as a PNG.
//! Run with `cargo run -p cartograph-app -- --frames 120 --output map.png`.

mod world;

use std::path::{Path, PathBuf};

use cartograph_config::{CliArgs, Config};
use cartograph_map::ViewState;
use cartograph_render::{CompositorError, MapCompositor};
use clap::Parser;
use image::{Rgba, RgbaImage};
use tiny_skia::Pixmap;
use tracing::{debug, error, info};

use crate::world::World;

const DEFAULT_OUTPUT: &str = "cartograph.png";
const FALLBACK_CONFIG_DIR: &str = ".cartograph";
/// Frames between recorded discovery points.
const DISCOVERY_INTERVAL: u32 = 8;
const PROGRESS_INTERVAL: u32 = 60;

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Compositor(#[from] CompositorError),

    #[error("invalid viewport size {width}x{height}")]
    Viewport { width: u32, height: u32 },

    #[error("failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

fn main() {
    let args = CliArgs::parse();

    let config_dir = args
        .config
        .clone()
        .or_else(Config::default_dir)
        .unwrap_or_else(|| PathBuf::from(FALLBACK_CONFIG_DIR));

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    cartograph_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    if let Err(e) = run(&args, &config) {
        error!(error = %e, "render failed");
        std::process::exit(1);
    }
}

fn run(args: &CliArgs, config: &Config) -> Result<PathBuf, AppError> {
    let world = World::generate(args.seed);
    let (width, height) = (config.viewport.width, config.viewport.height);
    let mut target = Pixmap::new(width, height).ok_or(AppError::Viewport { width, height })?;
    let mut compositor = MapCompositor::new(config)?;

    let mut view = ViewState::new(width, height);
    view.fog_enabled = config.fog.enabled;
    view.reveal_radius = config.fog.reveal_radius;

    let frames = args.frames.max(1);
    info!(
        seed = args.seed,
        entities = world.entities.len(),
        frames,
        "rendering synthetic world"
    );

    for frame in 0..frames {
        let t = frame as f32 / (frames - 1).max(1) as f32;
        let camera = world.camera_at(t);
        view.zoom = zoom_at(t);
        view.center_on(camera);
        if frame % DISCOVERY_INTERVAL == 0 {
            view.discovered_areas.push(camera);
        }

        let report = compositor.render(&mut target, &world.entities, &view);
        if frame % PROGRESS_INTERVAL == 0 {
            debug!(
                frame,
                drawn = report.drawn,
                culled = report.culled,
                tiles = report.tiles_drawn,
                lod = report.lod,
                "frame rendered"
            );
        }
    }

    // Let the fog catch up so the written frame matches the final view.
    compositor.sync_fog();
    let report = compositor.render(&mut target, &world.entities, &view);

    info!(
        perf = %serde_json::to_string(&compositor.perf_stats()).unwrap_or_default(),
        tiles = %serde_json::to_string(&compositor.tile_stats()).unwrap_or_default(),
        frame = %serde_json::to_string(&report).unwrap_or_default(),
        "finished"
    );

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    write_png(&target, &output)?;
    info!(path = %output.display(), "wrote frame");

    compositor.dispose();
    Ok(output)
}

/// Zoom oscillates between 0.6 and 1.1 over the tour.
fn zoom_at(t: f32) -> f32 {
    0.6 + 0.5 * (t * std::f32::consts::TAU).sin().abs()
}

/// Demultiply the pixmap and save it as PNG.
fn write_png(pixmap: &Pixmap, path: &Path) -> Result<(), AppError> {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    image.save(path).map_err(|source| AppError::Output {
        path: path.to_path_buf(),
        source,
    })
}
