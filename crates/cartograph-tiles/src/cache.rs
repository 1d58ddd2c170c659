//! The tile cache: memoized rasterisation with LRU eviction.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Instant;

use cartograph_map::{EntityId, EntityKind, Geometry, MapEntity, Surface, ViewRect};
use rustc_hash::{FxHashMap, FxHasher};
use serde::Serialize;
use tiny_skia::Pixmap;
use tracing::{debug, trace};

use crate::error::TileError;
use crate::key::{CacheKey, TileLayer, TileRequest, covering_tiles, quantize_zoom};
use crate::raster::{LabelPolicy, Rasterizer};

/// Largest supported tile edge in pixels.
pub const MAX_TILE_SIZE: u32 = 4096;

/// Counters for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TileCacheStats {
    pub hits: u64,
    /// Requests that had to rasterise, stale entries included.
    pub misses: u64,
    /// Times the rasteriser actually ran.
    pub rasterized: u64,
    pub evictions: u64,
    /// Entries found under the right key but built from different entity state.
    pub stale: u64,
    pub entries: usize,
}

struct CachedTile {
    bitmap: Arc<Pixmap>,
    created_at: Instant,
    fingerprint: u64,
    /// String form of the key, matched by [`TileCache::invalidate`].
    tag: String,
    last_used: u64,
}

/// Memoizes entity tiles keyed by [`CacheKey`].
///
/// Entries live until evicted by [`invalidate`](Self::invalidate),
/// [`clear`](Self::clear), or, when a capacity is set, by least-recently-used
/// eviction. Each entry also remembers a fingerprint of the entity state it was
/// drawn from; a lookup whose entity has changed re-rasterises instead of
/// serving the old bitmap.
///
/// Owned by the render thread; not shared.
pub struct TileCache {
    tile_size: u32,
    /// Maximum entries; `0` means unbounded.
    capacity: usize,
    rasterizer: Rasterizer,
    entries: FxHashMap<CacheKey, CachedTile>,
    /// `last_used` tick to key, oldest first.
    recency: BTreeMap<u64, CacheKey>,
    clock: u64,
    stats: TileCacheStats,
}

impl TileCache {
    /// Create a cache of `tile_size`-pixel square tiles holding at most
    /// `capacity` entries (`0` for no limit).
    pub fn new(tile_size: u32, capacity: usize, labels: LabelPolicy) -> Result<Self, TileError> {
        let invalid = TileError::InvalidTileSize {
            size: tile_size,
            max: MAX_TILE_SIZE,
        };
        if tile_size > MAX_TILE_SIZE {
            return Err(invalid);
        }
        let blank = Pixmap::new(tile_size, tile_size).ok_or(invalid)?;
        Ok(Self {
            tile_size,
            capacity,
            rasterizer: Rasterizer::new(blank, labels),
            entries: FxHashMap::default(),
            recency: BTreeMap::new(),
            clock: 0,
            stats: TileCacheStats::default(),
        })
    }

    #[must_use]
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> TileCacheStats {
        TileCacheStats {
            entries: self.entries.len(),
            ..self.stats
        }
    }

    /// When the tile under `key` was rasterised, if it is cached.
    pub fn created_at(&self, key: &CacheKey) -> Option<Instant> {
        self.entries.get(key).map(|tile| tile.created_at)
    }

    /// Tiles of `entity` on `layer` at `zoom` that overlap `view`.
    ///
    /// Geometry bounds are padded by what the entity may paint outside them
    /// (strokes, markers, its label), so no visible pixel is missed. Degenerate
    /// geometry covers no tiles.
    pub fn tiles_for(
        &self,
        entity: &MapEntity,
        layer: TileLayer,
        zoom: f32,
        view: &ViewRect,
    ) -> Vec<TileRequest> {
        let zoom = quantize_zoom(zoom);
        let Some(bounds) = entity.geometry.bounds() else {
            return Vec::new();
        };
        let padded = bounds.expand_by(self.rasterizer.paint_margin(entity, zoom) / zoom);
        let Some(area) = intersection(&padded, view) else {
            return Vec::new();
        };
        covering_tiles(&area, self.tile_size, zoom)
            .map(|(x, y)| TileRequest::new(layer, x, y, zoom))
            .collect()
    }

    /// The bitmap for one tile, rasterising it on a miss.
    pub fn tile(&mut self, entity: &MapEntity, request: &TileRequest) -> Arc<Pixmap> {
        let key = CacheKey::new(entity, request);
        let fingerprint = fingerprint(entity);
        self.clock += 1;
        let now = self.clock;

        if let Some(entry) = self.entries.get_mut(&key) {
            if entry.fingerprint == fingerprint {
                self.recency.remove(&entry.last_used);
                entry.last_used = now;
                self.recency.insert(now, key);
                self.stats.hits += 1;
                return Arc::clone(&entry.bitmap);
            }
            trace!(key = %key, "tile fingerprint changed, re-rasterising");
            self.stats.stale += 1;
        }

        self.stats.misses += 1;
        let bitmap = Arc::new(self.rasterizer.rasterize(entity, &key));
        self.stats.rasterized += 1;

        let entry = CachedTile {
            bitmap: Arc::clone(&bitmap),
            created_at: Instant::now(),
            fingerprint,
            tag: key.to_string(),
            last_used: now,
        };
        if let Some(old) = self.entries.insert(key.clone(), entry) {
            self.recency.remove(&old.last_used);
        }
        self.recency.insert(now, key);
        self.evict_over_capacity();
        bitmap
    }

    /// Fetch or rasterise a tile and blit it with its top-left at `dest`.
    pub fn render_tile<S: Surface + ?Sized>(
        &mut self,
        target: &mut S,
        entity: &MapEntity,
        request: &TileRequest,
        dest: (i32, i32),
    ) {
        let bitmap = self.tile(entity, request);
        target.draw_bitmap(dest.0, dest.1, &bitmap);
    }

    /// Remove every entry whose key string starts with `prefix`. Returns the
    /// number removed.
    pub fn invalidate(&mut self, prefix: &str) -> usize {
        let doomed: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, tile)| tile.tag.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            if let Some(tile) = self.entries.remove(key) {
                self.recency.remove(&tile.last_used);
            }
        }
        if !doomed.is_empty() {
            debug!(prefix, removed = doomed.len(), "invalidated tiles");
        }
        doomed.len()
    }

    /// Remove every tile of one entity, on all layers and zooms.
    pub fn invalidate_entity(&mut self, kind: EntityKind, id: &EntityId) -> usize {
        self.invalidate(&CacheKey::entity_prefix(kind, id))
    }

    /// Drop everything, e.g. on map switch. Counters are kept.
    pub fn clear(&mut self) {
        let removed = self.entries.len();
        self.entries.clear();
        self.recency.clear();
        debug!(removed, "tile cache cleared");
    }

    /// Change the label thresholds. Existing tiles were drawn under the old
    /// policy, so the cache is cleared.
    pub fn set_label_policy(&mut self, labels: LabelPolicy) {
        self.rasterizer = self.rasterizer.with_labels(labels);
        self.clear();
    }

    fn evict_over_capacity(&mut self) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() > self.capacity {
            let Some((_, key)) = self.recency.pop_first() else {
                break;
            };
            self.entries.remove(&key);
            self.stats.evictions += 1;
            trace!(key = %key, "evicted tile");
        }
    }
}

fn intersection(a: &ViewRect, b: &ViewRect) -> Option<ViewRect> {
    let min = a.min().max(b.min());
    let max = a.max().min(b.max());
    (min.x <= max.x && min.y <= max.y)
        .then(|| ViewRect::new(min.x, min.y, max.x - min.x, max.y - min.y))
}

/// Hash of every entity field that affects its pixels.
fn fingerprint(entity: &MapEntity) -> u64 {
    let mut hasher = FxHasher::default();
    entity.kind.hash(&mut hasher);
    entity.display_name.hash(&mut hasher);
    entity.discovered.hash(&mut hasher);
    let shape: u8 = match entity.geometry {
        Geometry::Point(_) => 0,
        Geometry::Polyline(_) => 1,
        Geometry::Polygon(_) => 2,
    };
    shape.hash(&mut hasher);
    for p in entity.geometry.points() {
        p.x.to_bits().hash(&mut hasher);
        p.y.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}
