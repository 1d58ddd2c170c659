//! Shared map data model: entities, geometry, view rectangles, and the drawing
//! surface seam used by every rendering subsystem.

mod entity;
mod geometry;
mod surface;
mod view;

pub use entity::{EntityId, EntityKind, MapEntity};
pub use geometry::Geometry;
pub use surface::Surface;
pub use view::{ViewRect, ViewState};
