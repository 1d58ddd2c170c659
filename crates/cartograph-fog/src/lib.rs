//! Fog-of-war mask generation.
//!
//! [`FogGenerator`] owns a viewport-sized RGBA mask. Parameter changes bump a
//! version counter; the mask is rebuilt on a dedicated `fog-mask` thread only
//! when the generated version lags behind, and reused otherwise.

mod error;
mod generator;
mod mask;

pub use error::FogError;
pub use generator::{FogGenerator, FogParams};
pub use mask::{blur3x3, build_mask};
