//! The frame pipeline.

use cartograph_assets::ResourceLoader;
use cartograph_config::Config;
use cartograph_fog::FogGenerator;
use cartograph_map::{EntityId, EntityKind, MapEntity, Surface, ViewRect, ViewState};
use cartograph_perf::{LodSettings, PerfStats, PerformanceController};
use cartograph_tiles::{LabelPolicy, TileCache, TileCacheStats, TileLayer, quantize_zoom};
use glam::Vec2;
use serde::Serialize;
use tracing::{debug, info};

use crate::background::Background;
use crate::error::CompositorError;
use crate::minimap::Minimap;

const MAP_BACKGROUND: [u8; 4] = [34, 52, 66, 255];
const READOUT_BACKGROUND: [u8; 4] = [0, 0, 0, 160];
const READOUT_FPS: [u8; 4] = [120, 220, 120, 255];
const READOUT_LOD: [u8; 4] = [230, 170, 80, 255];
/// FPS that fills the readout bar.
const READOUT_FULL_FPS: f32 = 60.0;

/// What happened during one [`MapCompositor::render`] call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameReport {
    /// Zoom after snapping to its tile bucket.
    pub zoom: f32,
    /// Global LOD the frame was culled at.
    pub lod: u8,
    pub entities: usize,
    pub drawn: usize,
    /// Entities skipped by distance/priority culling or by element LOD.
    pub culled: usize,
    /// Entities skipped because their geometry is unusable.
    pub degenerate: usize,
    pub tiles_drawn: usize,
    pub minimap_drawn: usize,
    /// The fog mask shown this frame lagged behind the current parameters.
    pub fog_stale: bool,
    pub background_drawn: bool,
}

/// Renders the world map: tiles for visible entities, the fog overlay, the
/// minimap inset and an optional base-map image.
///
/// One compositor is built per map scene and owns one instance of every
/// rendering subsystem. Independent compositors share nothing.
pub struct MapCompositor {
    width: u32,
    height: u32,
    perf: PerformanceController,
    tiles: TileCache,
    fog: FogGenerator,
    loader: ResourceLoader,
    minimap: Option<Minimap>,
    background: Background,
    show_readout: bool,
    last_report: FrameReport,
}

impl MapCompositor {
    pub fn new(config: &Config) -> Result<Self, CompositorError> {
        let render = &config.render;
        let perf = PerformanceController::new(LodSettings {
            max_lod: render.max_lod,
            adaptive: render.adaptive_lod,
            slow_frame_ms: render.slow_frame_ms,
            fast_frame_ms: render.fast_frame_ms,
        });
        let labels = LabelPolicy {
            region_zoom: render.region_label_zoom,
            route_zoom: render.route_label_zoom,
            location_zoom: render.location_label_zoom,
        };
        let tiles = TileCache::new(render.tile_size, render.tile_cache_capacity, labels)?;

        let viewport = &config.viewport;
        let fog = FogGenerator::new(viewport.width, viewport.height, config.fog.color)?;
        let loader = ResourceLoader::new(&config.assets.asset_root, config.assets.worker_count)?;
        let background = Background::request(&loader, config.assets.background_image.as_deref());

        info!(
            width = viewport.width,
            height = viewport.height,
            tile_size = render.tile_size,
            max_lod = render.max_lod,
            workers = loader.worker_count(),
            "map compositor ready"
        );

        Ok(Self {
            width: viewport.width,
            height: viewport.height,
            perf,
            tiles,
            fog,
            loader,
            minimap: Minimap::new(viewport.minimap_size, viewport.minimap_zoom),
            background,
            show_readout: config.debug.show_fps,
            last_report: FrameReport::default(),
        })
    }

    /// Composite one frame of `entities` seen through `view` onto `target`.
    ///
    /// Never blocks on background work: a fog mask or background image that
    /// is still being produced shows up on a later frame.
    pub fn render<S: Surface + ?Sized>(
        &mut self,
        target: &mut S,
        entities: &[MapEntity],
        view: &ViewState,
    ) -> FrameReport {
        self.perf.start_frame();

        let zoom = quantize_zoom(view.zoom);
        let view_rect = snapped_view_rect(view, zoom, self.width, self.height);
        let mut report = FrameReport {
            zoom,
            lod: self.perf.current_lod(),
            entities: entities.len(),
            ..FrameReport::default()
        };

        self.refresh_fog(view, zoom);
        self.background.poll();

        target.clear(MAP_BACKGROUND);
        if let Some(image) = self.background.pixmap() {
            let origin = -view.offset * zoom;
            target.draw_bitmap_scaled(origin.x, origin.y, zoom, image);
            report.background_drawn = true;
        }

        self.draw_entities(target, entities, view.offset, zoom, &view_rect, &mut report);

        report.fog_stale = self.fog.is_dirty();
        self.fog.render(target);

        if let Some(minimap) = self.minimap.as_mut() {
            report.minimap_drawn = minimap.render(target, &mut self.tiles, entities, &view_rect);
        }
        if self.show_readout {
            self.draw_readout(target);
        }

        self.perf.end_frame();
        self.last_report = report.clone();
        report
    }

    /// Draw the tiles of every entity that survives culling.
    ///
    /// On top of [`PerformanceController::should_render`], this compositor
    /// drops entities whose element LOD reaches `max_lod` unless their
    /// priority is 0. That extra cut is a rendering policy of the compositor,
    /// not part of `should_render`.
    fn draw_entities<S: Surface + ?Sized>(
        &mut self,
        target: &mut S,
        entities: &[MapEntity],
        offset: Vec2,
        zoom: f32,
        view_rect: &ViewRect,
        report: &mut FrameReport,
    ) {
        let max_lod = self.perf.max_lod();
        let tile_size = self.tiles.tile_size() as i32;
        let shift = (offset * zoom).round();

        for kind in EntityKind::DRAW_ORDER {
            for entity in entities.iter().filter(|e| e.kind == kind) {
                let Some(bounds) = entity.geometry.bounds() else {
                    report.degenerate += 1;
                    continue;
                };
                if !self.perf.should_render(&bounds, view_rect, entity.priority) {
                    report.culled += 1;
                    continue;
                }
                // At the coarsest detail only must-render entities survive.
                let detail = self.perf.element_lod(&bounds, view_rect, 0);
                if max_lod > 0 && detail >= max_lod && entity.priority != 0 {
                    report.culled += 1;
                    continue;
                }

                for request in self.tiles.tiles_for(entity, TileLayer::Full, zoom, view_rect) {
                    let dest = (
                        request.tile_x * tile_size - shift.x as i32,
                        request.tile_y * tile_size - shift.y as i32,
                    );
                    self.tiles.render_tile(target, entity, &request, dest);
                    report.tiles_drawn += 1;
                }
                report.drawn += 1;
            }
        }
    }

    /// Feed the fog generator this frame's parameters in viewport pixels and
    /// start a rebuild if they changed.
    fn refresh_fog(&mut self, view: &ViewState, zoom: f32) {
        let points: Vec<Vec2> = view
            .discovered_areas
            .iter()
            .map(|p| (*p - view.offset) * zoom)
            .collect();
        self.fog
            .update_params(view.fog_enabled, view.reveal_radius * zoom, &points);
        if self.fog.is_dirty() {
            self.fog.generate_async(|_| {});
        }
    }

    fn draw_readout<S: Surface + ?Sized>(&self, target: &mut S) {
        const BAR_WIDTH: f32 = 120.0;
        target.fill_rect(6.0, 6.0, BAR_WIDTH + 8.0, 20.0, READOUT_BACKGROUND);
        let fps_share = (self.perf.current_fps() as f32 / READOUT_FULL_FPS).min(1.0);
        target.fill_rect(10.0, 10.0, BAR_WIDTH * fps_share, 5.0, READOUT_FPS);
        let max_lod = f32::from(self.perf.max_lod().max(1));
        let lod_share = f32::from(self.perf.current_lod()) / max_lod;
        target.fill_rect(10.0, 17.0, BAR_WIDTH * lod_share, 5.0, READOUT_LOD);
    }

    /// Block until the fog mask matches the latest parameters.
    pub fn sync_fog(&mut self) {
        self.fog.generate_blocking();
    }

    #[must_use]
    pub fn current_fps(&self) -> u32 {
        self.perf.current_fps()
    }

    #[must_use]
    pub fn current_lod(&self) -> u8 {
        self.perf.current_lod()
    }

    #[must_use]
    pub fn perf_stats(&self) -> PerfStats {
        self.perf.stats()
    }

    #[must_use]
    pub fn tile_stats(&self) -> TileCacheStats {
        self.tiles.stats()
    }

    #[must_use]
    pub fn last_report(&self) -> &FrameReport {
        &self.last_report
    }

    pub fn performance(&self) -> &PerformanceController {
        &self.perf
    }

    pub fn performance_mut(&mut self) -> &mut PerformanceController {
        &mut self.perf
    }

    pub fn fog(&self) -> &FogGenerator {
        &self.fog
    }

    pub fn loader(&self) -> &ResourceLoader {
        &self.loader
    }

    /// Returns true while the background image is still loading.
    #[must_use]
    pub fn background_pending(&self) -> bool {
        self.background.is_pending()
    }

    /// Drop cached tiles whose key starts with `prefix`.
    pub fn invalidate(&mut self, prefix: &str) -> usize {
        self.tiles.invalidate(prefix)
    }

    /// Drop every cached tile of one entity after its appearance changed.
    pub fn invalidate_entity(&mut self, kind: EntityKind, id: &EntityId) -> usize {
        self.tiles.invalidate_entity(kind, id)
    }

    /// Start over for a different map: drop all tiles, return to full detail
    /// and request a new background image.
    pub fn switch_map(&mut self, background_image: Option<&str>) {
        self.tiles.clear();
        self.perf.reset();
        self.background = Background::request(&self.loader, background_image);
        debug!(background = ?background_image, "switched map");
    }

    /// Adapt to a new viewport size.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), CompositorError> {
        self.fog.resize(width, height)?;
        self.width = width;
        self.height = height;
        debug!(width, height, "compositor resized");
        Ok(())
    }

    /// Scene teardown: stop the loader and drop its caches and listeners.
    pub fn dispose(&mut self) {
        self.loader.dispose();
        self.background = Background::None;
    }
}

/// View rectangle for the snapped zoom, so culling matches the tiles drawn.
fn snapped_view_rect(view: &ViewState, zoom: f32, width: u32, height: u32) -> ViewRect {
    ViewRect::new(
        view.offset.x,
        view.offset.y,
        width as f32 / zoom,
        height as f32 / zoom,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartograph_map::Geometry;
    use tiny_skia::Pixmap;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.viewport.width = 160;
        config.viewport.height = 120;
        config.viewport.minimap_size = 0;
        config.render.tile_size = 64;
        config.render.adaptive_lod = false;
        config
    }

    fn town(id: &str, x: f32, y: f32) -> MapEntity {
        MapEntity::new(id, EntityKind::Location, Geometry::Point(Vec2::new(x, y)), id)
    }

    #[test]
    fn test_snapped_view_rect_uses_viewport() {
        let mut view = ViewState::new(999, 999);
        view.offset = Vec2::new(10.0, 20.0);
        let rect = snapped_view_rect(&view, 2.0, 160, 120);
        assert_eq!(rect, ViewRect::new(10.0, 20.0, 80.0, 60.0));
    }

    /// Off-screen and degenerate entities are counted but not drawn.
    #[test]
    fn test_report_counts() {
        let mut compositor = MapCompositor::new(&small_config()).unwrap();
        let mut target = Pixmap::new(160, 120).unwrap();
        let entities = vec![
            town("near", 40.0, 40.0),
            town("far", 5000.0, 5000.0),
            MapEntity::new("bad", EntityKind::Route, Geometry::Polyline(vec![]), "x"),
        ];
        let report = compositor.render(&mut target, &entities, &ViewState::new(160, 120));
        assert_eq!(report.entities, 3);
        assert_eq!(report.drawn, 1);
        assert_eq!(report.culled, 1);
        assert_eq!(report.degenerate, 1);
        assert!(report.tiles_drawn >= 1);
        assert_eq!(compositor.last_report(), &report);
    }

    #[test]
    fn test_readout_draws_when_enabled() {
        let mut config = small_config();
        config.debug.show_fps = true;
        let mut compositor = MapCompositor::new(&config).unwrap();
        let mut target = Pixmap::new(160, 120).unwrap();
        compositor.render(&mut target, &[], &ViewState::new(160, 120));
        let px = target.pixel(8, 8).unwrap();
        // Readout darkens the map background.
        assert!(px.blue() < MAP_BACKGROUND[2]);
    }

    /// At the coarsest element LOD only priority-0 entities survive, even
    /// though `should_render` alone would keep them.
    #[test]
    fn test_coarsest_element_lod_keeps_only_priority_zero() {
        let mut config = small_config();
        config.render.max_lod = 1;
        let mut compositor = MapCompositor::new(&config).unwrap();
        let mut target = Pixmap::new(160, 120).unwrap();
        let view = ViewState::new(160, 120);

        let edge = town("edge", 150.0, 60.0);
        let bounds = edge.geometry.bounds().unwrap();
        let view_rect = snapped_view_rect(&view, 1.0, 160, 120);
        assert!(compositor.performance().should_render(&bounds, &view_rect, 1));

        let entities = vec![
            town("center", 80.0, 60.0),
            edge,
            town("pinned", 150.0, 60.0).with_priority(0),
        ];
        let report = compositor.render(&mut target, &entities, &view);
        assert_eq!(report.drawn, 2);
        assert_eq!(report.culled, 1);
    }
}
