//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Cartograph command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "cartograph", about = "Headless world-map renderer")]
pub struct CliArgs {
    /// Viewport width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Viewport height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Highest global LOD value.
    #[arg(long)]
    pub max_lod: Option<u8>,

    /// Enable or disable the adaptive LOD feedback loop.
    #[arg(long)]
    pub adaptive_lod: Option<bool>,

    /// Enable or disable the fog overlay.
    #[arg(long)]
    pub fog: Option<bool>,

    /// Fog reveal radius in world units.
    #[arg(long)]
    pub reveal_radius: Option<f32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of frames to render before exiting.
    #[arg(long, default_value_t = 240)]
    pub frames: u32,

    /// Where to write the last rendered frame as PNG.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Seed for the synthetic world.
    #[arg(long, default_value_t = 7)]
    pub seed: u64,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.viewport.width = w;
        }
        if let Some(h) = args.height {
            self.viewport.height = h;
        }
        if let Some(lod) = args.max_lod {
            self.render.max_lod = lod;
        }
        if let Some(adaptive) = args.adaptive_lod {
            self.render.adaptive_lod = adaptive;
        }
        if let Some(fog) = args.fog {
            self.fog.enabled = fog;
        }
        if let Some(radius) = args.reveal_radius {
            self.fog.reveal_radius = radius;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            width: Some(1920),
            max_lod: Some(2),
            fog: Some(false),
            ..CliArgs::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.viewport.width, 1920);
        assert_eq!(config.render.max_lod, 2);
        assert!(!config.fog.enabled);
        // Non-overridden fields retain defaults
        assert_eq!(config.viewport.height, 720);
        assert_eq!(config.fog.reveal_radius, 120.0);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from([
            "cartograph",
            "--adaptive-lod",
            "false",
            "--frames",
            "10",
            "--reveal-radius",
            "80",
        ]);
        assert_eq!(args.adaptive_lod, Some(false));
        assert_eq!(args.frames, 10);
        assert_eq!(args.reveal_radius, Some(80.0));
    }
}
