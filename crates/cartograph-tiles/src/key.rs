//! Cache keys, zoom buckets and the tile grid.

use std::fmt;

use cartograph_map::{EntityId, EntityKind, MapEntity, ViewRect};

/// Zoom buckets per unit of zoom. Zoom is quantised to `1 / ZOOM_STEPS` steps.
pub const ZOOM_STEPS: f32 = 20.0;

/// Bucket index for a zoom factor. Non-positive or non-finite zooms map to the
/// smallest bucket.
pub fn zoom_bucket(zoom: f32) -> u32 {
    if !zoom.is_finite() || zoom <= 0.0 {
        return 1;
    }
    (zoom * ZOOM_STEPS).round().max(1.0) as u32
}

/// The zoom factor a bucket stands for.
pub fn bucket_zoom(bucket: u32) -> f32 {
    bucket.max(1) as f32 / ZOOM_STEPS
}

/// Snap a zoom factor to its bucket.
pub fn quantize_zoom(zoom: f32) -> f32 {
    bucket_zoom(zoom_bucket(zoom))
}

/// Which pass a tile belongs to. The two layers never share entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileLayer {
    Full,
    Minimap,
}

impl TileLayer {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Minimap => "minimap",
        }
    }
}

/// Which tile of an entity to produce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileRequest {
    pub layer: TileLayer,
    pub tile_x: i32,
    pub tile_y: i32,
    /// Zoom factor; snapped to its bucket before use.
    pub zoom: f32,
}

impl TileRequest {
    pub fn new(layer: TileLayer, tile_x: i32, tile_y: i32, zoom: f32) -> Self {
        Self {
            layer,
            tile_x,
            tile_y,
            zoom,
        }
    }
}

/// Identifies one memoized tile.
///
/// The string form is `kind/entity/layer/zoom_bucket/x/y`, so every tile of
/// an entity shares the prefix `kind/entity/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: EntityKind,
    pub entity_id: EntityId,
    pub layer: TileLayer,
    pub zoom_bucket: u32,
    pub tile_x: i32,
    pub tile_y: i32,
}

impl CacheKey {
    pub fn new(entity: &MapEntity, request: &TileRequest) -> Self {
        Self {
            kind: entity.kind,
            entity_id: entity.id.clone(),
            layer: request.layer,
            zoom_bucket: zoom_bucket(request.zoom),
            tile_x: request.tile_x,
            tile_y: request.tile_y,
        }
    }

    /// Prefix shared by every tile of one entity.
    pub fn entity_prefix(kind: EntityKind, id: &EntityId) -> String {
        format!("{}/{}/", kind.tag(), id)
    }

    /// The zoom this key's tile is rasterised at.
    pub fn zoom(&self) -> f32 {
        bucket_zoom(self.zoom_bucket)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}/{}",
            self.kind.tag(),
            self.entity_id,
            self.layer.tag(),
            self.zoom_bucket,
            self.tile_x,
            self.tile_y
        )
    }
}

/// World-space rectangle covered by tile `(tile_x, tile_y)`.
pub fn tile_world_rect(tile_size: u32, zoom: f32, tile_x: i32, tile_y: i32) -> ViewRect {
    let span = tile_size as f32 / zoom;
    ViewRect::new(tile_x as f32 * span, tile_y as f32 * span, span, span)
}

/// Grid cells overlapping a world-space rectangle, row by row.
pub fn covering_tiles(
    rect: &ViewRect,
    tile_size: u32,
    zoom: f32,
) -> impl Iterator<Item = (i32, i32)> + use<> {
    let span = tile_size as f32 / zoom;
    let x0 = (rect.x / span).floor() as i32;
    let y0 = (rect.y / span).floor() as i32;
    let x1 = ((rect.x + rect.w) / span).floor() as i32;
    let y1 = ((rect.y + rect.h) / span).floor() as i32;
    (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| (x, y)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartograph_map::Geometry;
    use glam::Vec2;

    #[test]
    fn test_zoom_buckets() {
        assert_eq!(zoom_bucket(1.0), 20);
        assert_eq!(zoom_bucket(1.02), 20);
        assert_eq!(zoom_bucket(1.03), 21);
        assert_eq!(zoom_bucket(0.0), 1);
        assert_eq!(zoom_bucket(f32::NAN), 1);
        assert!((quantize_zoom(0.74) - 0.75).abs() < 1e-6);
    }

    /// Keys of one entity share a prefix that does not match a longer ID.
    #[test]
    fn test_key_string_and_prefix() {
        let entity = MapEntity::new("r1", EntityKind::Region, Geometry::Point(Vec2::ZERO), "A");
        let key = CacheKey::new(&entity, &TileRequest::new(TileLayer::Full, -1, 2, 0.5));
        assert_eq!(key.to_string(), "region/r1/full/10/-1/2");

        let prefix = CacheKey::entity_prefix(EntityKind::Region, &entity.id);
        assert!(key.to_string().starts_with(&prefix));
        assert!(!"region/r10/full/10/0/0".starts_with(&prefix));
    }

    #[test]
    fn test_covering_tiles() {
        // At zoom 2 a 256-px tile spans 128 world units.
        let rect = ViewRect::new(100.0, -10.0, 60.0, 20.0);
        let tiles: Vec<_> = covering_tiles(&rect, 256, 2.0).collect();
        assert_eq!(tiles, vec![(0, -1), (1, -1), (0, 0), (1, 0)]);

        let cell = tile_world_rect(256, 2.0, 1, -1);
        assert_eq!(cell, ViewRect::new(128.0, -128.0, 128.0, 128.0));
    }
}
