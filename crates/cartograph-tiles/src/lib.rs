//! Memoized tile rasterisation for map entities.
//!
//! A tile is a fixed-size square bitmap showing the part of one entity that
//! falls inside one grid cell at one zoom bucket. [`TileCache`] rasterises a
//! tile on first request and blits the stored bitmap on every later request
//! for the same [`CacheKey`].

mod cache;
mod error;
mod key;
mod label;
mod raster;

pub use cache::{MAX_TILE_SIZE, TileCache, TileCacheStats};
pub use error::TileError;
pub use key::{
    CacheKey, TileLayer, TileRequest, ZOOM_STEPS, bucket_zoom, covering_tiles, quantize_zoom,
    tile_world_rect, zoom_bucket,
};
pub use label::text_width;
pub use raster::LabelPolicy;
