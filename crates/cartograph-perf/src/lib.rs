//! Frame timing and adaptive level of detail.
//!
//! [`PerformanceController`] measures frames, keeps a smoothed frame-time
//! estimate and nudges a global LOD value up or down once per second. It also
//! answers the per-entity culling and LOD questions the compositor asks every
//! frame. It belongs to the render thread; nothing here is shared with workers.

mod controller;
mod culling;

pub use controller::{FRAME_AVERAGE_WARMUP, LodSettings, PerfStats, PerformanceController};
pub use culling::render_threshold;
