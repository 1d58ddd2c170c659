/// Errors raised while configuring a tile cache.
///
/// Rasterisation itself never fails: degenerate geometry produces a blank tile.
#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("tile size must be between 1 and {max} pixels, got {size}")]
    InvalidTileSize { size: u32, max: u32 },
}
