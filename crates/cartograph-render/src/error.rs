use cartograph_assets::AssetError;
use cartograph_fog::FogError;
use cartograph_tiles::TileError;

/// Errors raised while building or resizing a [`MapCompositor`](crate::MapCompositor).
///
/// Rendering a frame has no error path.
#[derive(Debug, thiserror::Error)]
pub enum CompositorError {
    #[error(transparent)]
    Tiles(#[from] TileError),

    #[error(transparent)]
    Fog(#[from] FogError),

    #[error(transparent)]
    Assets(#[from] AssetError),
}
