//! The minimap inset: every discovered entity at a fixed small zoom, centered
//! on the camera, with the main view outlined.

use cartograph_map::{EntityKind, MapEntity, Surface, ViewRect};
use cartograph_tiles::{TileCache, TileLayer, quantize_zoom};
use glam::Vec2;
use tiny_skia::Pixmap;

const MINIMAP_BACKGROUND: [u8; 4] = [28, 34, 40, 230];
const VIEW_OUTLINE: [u8; 4] = [255, 236, 160, 255];
const FRAME_COLOR: [u8; 4] = [210, 200, 170, 255];
/// Gap between the inset and the viewport edge.
pub(crate) const MINIMAP_MARGIN: i32 = 8;

pub(crate) struct Minimap {
    pixmap: Pixmap,
    zoom: f32,
}

impl Minimap {
    /// `None` when `size` is zero, which disables the inset.
    pub(crate) fn new(size: u32, zoom: f32) -> Option<Self> {
        Some(Self {
            pixmap: Pixmap::new(size, size)?,
            zoom: quantize_zoom(zoom),
        })
    }

    pub(crate) fn size(&self) -> u32 {
        self.pixmap.width()
    }

    /// World rectangle shown by the inset when centered on `camera`.
    pub(crate) fn world_rect(&self, camera: Vec2) -> ViewRect {
        let span = self.size() as f32 / self.zoom;
        ViewRect::new(camera.x - span / 2.0, camera.y - span / 2.0, span, span)
    }

    /// Redraw the inset and composite it into the top-right corner of
    /// `target`. Returns the number of entities drawn.
    pub(crate) fn render<S: Surface + ?Sized>(
        &mut self,
        target: &mut S,
        tiles: &mut TileCache,
        entities: &[MapEntity],
        view: &ViewRect,
    ) -> usize {
        let area = self.world_rect(view.center());
        let zoom = self.zoom;
        let tile_size = tiles.tile_size() as i32;
        let shift = (area.min() * zoom).round();

        Surface::clear(&mut self.pixmap, MINIMAP_BACKGROUND);
        let mut drawn = 0;
        for kind in EntityKind::DRAW_ORDER {
            for entity in entities.iter().filter(|e| e.kind == kind && e.discovered) {
                let requests = tiles.tiles_for(entity, TileLayer::Minimap, zoom, &area);
                if requests.is_empty() {
                    continue;
                }
                for request in &requests {
                    let dest = (
                        request.tile_x * tile_size - shift.x as i32,
                        request.tile_y * tile_size - shift.y as i32,
                    );
                    tiles.render_tile(&mut self.pixmap, entity, request, dest);
                }
                drawn += 1;
            }
        }

        let outline_min = (view.min() - area.min()) * zoom;
        Surface::stroke_rect(
            &mut self.pixmap,
            outline_min.x,
            outline_min.y,
            view.w * zoom,
            view.h * zoom,
            1.5,
            VIEW_OUTLINE,
        );
        let size = self.size() as f32;
        Surface::stroke_rect(
            &mut self.pixmap,
            0.5,
            0.5,
            size - 1.0,
            size - 1.0,
            1.0,
            FRAME_COLOR,
        );

        let x = target.width() as i32 - self.size() as i32 - MINIMAP_MARGIN;
        target.draw_bitmap(x, MINIMAP_MARGIN, &self.pixmap);
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartograph_map::Geometry;
    use cartograph_tiles::LabelPolicy;

    fn spot(id: &str, x: f32, y: f32) -> MapEntity {
        MapEntity::new(id, EntityKind::Location, Geometry::Point(Vec2::new(x, y)), id)
    }

    #[test]
    fn test_zero_size_disables() {
        assert!(Minimap::new(0, 0.1).is_none());
    }

    /// Only discovered entities near the camera reach the inset.
    #[test]
    fn test_minimap_draws_discovered_only() {
        let mut minimap = Minimap::new(64, 0.1).unwrap();
        let mut tiles = TileCache::new(64, 0, LabelPolicy::default()).unwrap();
        let mut target = Pixmap::new(200, 100).unwrap();
        let entities = vec![
            spot("a", 50.0, 50.0),
            spot("b", 60.0, 40.0).with_discovered(false),
            spot("c", 9e4, 9e4),
        ];
        let view = ViewRect::new(0.0, 0.0, 100.0, 100.0);

        let drawn = minimap.render(&mut target, &mut tiles, &entities, &view);
        assert_eq!(drawn, 1);
        // Inset lands in the top-right corner.
        let x = 200 - 64 - MINIMAP_MARGIN as u32;
        assert!(target.pixel(x + 1, MINIMAP_MARGIN as u32 + 1).unwrap().alpha() > 0);
        assert_eq!(target.pixel(x - 2, 50).unwrap().alpha(), 0);
    }
}
