//! Per-frame composition of the world map.
//!
//! [`MapCompositor`] is the one consumer of every rendering subsystem. Each
//! frame it asks the performance controller what to draw, pulls tiles from the
//! tile cache, keeps the fog mask current and paints the minimap inset.

mod background;
mod compositor;
mod error;
mod minimap;

pub use compositor::{FrameReport, MapCompositor};
pub use error::CompositorError;
