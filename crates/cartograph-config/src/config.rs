//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";
const APP_NAME: &str = "cartograph";

/// Top-level renderer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Viewport and minimap settings.
    pub viewport: ViewportConfig,
    /// Tile rendering and LOD settings.
    pub render: RenderConfig,
    /// Asset loading settings.
    pub assets: AssetConfig,
    /// Fog-of-war settings.
    pub fog: FogConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Viewport configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewportConfig {
    /// Viewport width in pixels.
    pub width: u32,
    /// Viewport height in pixels.
    pub height: u32,
    /// Side length of the square minimap inset in pixels (0 = no minimap).
    pub minimap_size: u32,
    /// Pixels per world unit on the minimap.
    pub minimap_zoom: f32,
}

/// Tile rendering and level-of-detail configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Side length of one cached tile bitmap in pixels.
    pub tile_size: u32,
    /// Highest (coarsest) global LOD value.
    pub max_lod: u8,
    /// Let the frame-time feedback loop raise and lower the LOD.
    pub adaptive_lod: bool,
    /// Average frame time above which the LOD is raised, in milliseconds.
    pub slow_frame_ms: f64,
    /// Average frame time below which the LOD is lowered, in milliseconds.
    pub fast_frame_ms: f64,
    /// Maximum cached tiles before least-recently-used eviction (0 = unbounded).
    pub tile_cache_capacity: usize,
    /// Minimum zoom at which region names are drawn.
    pub region_label_zoom: f32,
    /// Minimum zoom at which route names are drawn.
    pub route_label_zoom: f32,
    /// Minimum zoom at which location names are drawn.
    pub location_label_zoom: f32,
}

/// Asset loading configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory that image paths are resolved against.
    pub asset_root: PathBuf,
    /// Loader worker threads (clamped to 1..=2).
    pub worker_count: usize,
    /// Optional base-map image drawn beneath the tiles.
    pub background_image: Option<String>,
}

/// Fog-of-war configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FogConfig {
    /// Draw the fog overlay.
    pub enabled: bool,
    /// Reveal radius around each discovered point, in world units.
    pub reveal_radius: f32,
    /// Fog color as straight-alpha RGBA.
    pub color: [u8; 4],
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Show the FPS/LOD readout.
    pub show_fps: bool,
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            minimap_size: 192,
            minimap_zoom: 0.1,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tile_size: 256,
            max_lod: 4,
            adaptive_lod: true,
            slow_frame_ms: 33.0,
            fast_frame_ms: 16.0,
            tile_cache_capacity: 1024,
            region_label_zoom: 0.75,
            route_label_zoom: 1.0,
            location_label_zoom: 0.5,
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            worker_count: 2,
            background_image: None,
        }
    }
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reveal_radius: 120.0,
            color: [12, 14, 28, 255],
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            show_fps: false,
            log_level: "info".to_string(),
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Platform config directory for this application, if the OS exposes one.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|base| base.join(APP_NAME))
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("tile_size: 256"));
        assert!(ron_str.contains("worker_count: 2"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.assets.background_image = Some("maps/world.png".to_string());
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    /// A config missing whole sections falls back to their defaults.
    #[test]
    fn test_missing_field_uses_default() {
        let ron_str = "(viewport: (width: 640), debug: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.viewport.width, 640);
        assert_eq!(config.viewport.height, 720);
        assert_eq!(config.fog, FogConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.render.max_lod = 6;
        config.fog.reveal_radius = 64.0;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.render.adaptive_lod = false;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(!result.unwrap().render.adaptive_lod);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }
}
