//! Configuration for the map renderer.
//!
//! Settings persist to disk as RON, accept CLI overrides via clap, and support
//! hot-reload detection. Every section is forward/backward compatible: missing
//! fields take their defaults and unknown fields are ignored.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{AssetConfig, Config, DebugConfig, FogConfig, RenderConfig, ViewportConfig};
pub use error::ConfigError;
