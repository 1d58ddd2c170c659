//! Rasterisation of one entity into one tile.

use cartograph_map::{EntityKind, Geometry, MapEntity};
use glam::Vec2;
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::key::CacheKey;
use crate::label;

/// Radius of a location marker in pixels.
const MARKER_RADIUS: f32 = 5.0;
/// Gap between a location marker and its label.
const LABEL_GAP: f32 = 4.0;
/// Pixels an entity may paint outside its geometric bounds without a label.
const STROKE_MARGIN: f32 = MARKER_RADIUS + 3.0;
const LABEL_SCALE: u32 = 1;
const LABEL_COLOR: [u8; 4] = [245, 240, 225, 255];
const LABEL_SHADOW: [u8; 4] = [20, 18, 14, 200];

/// Minimum zoom at which each kind's name becomes legible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPolicy {
    pub region_zoom: f32,
    pub route_zoom: f32,
    pub location_zoom: f32,
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self {
            region_zoom: 0.75,
            route_zoom: 1.0,
            location_zoom: 0.5,
        }
    }
}

impl LabelPolicy {
    pub fn threshold(&self, kind: EntityKind) -> f32 {
        match kind {
            EntityKind::Region => self.region_zoom,
            EntityKind::Route => self.route_zoom,
            EntityKind::Location => self.location_zoom,
        }
    }

    /// Returns true if a label of this kind is drawn at `zoom`.
    pub fn shows_label(&self, kind: EntityKind, zoom: f32) -> bool {
        zoom >= self.threshold(kind)
    }
}

struct Style {
    fill: [u8; 4],
    stroke: [u8; 4],
    stroke_width: f32,
}

fn style_for(kind: EntityKind, discovered: bool) -> Style {
    let style = match kind {
        EntityKind::Region => Style {
            fill: [86, 132, 74, 110],
            stroke: [52, 88, 44, 255],
            stroke_width: 2.0,
        },
        EntityKind::Route => Style {
            fill: [0, 0, 0, 0],
            stroke: [196, 164, 112, 255],
            stroke_width: 3.0,
        },
        EntityKind::Location => Style {
            fill: [214, 72, 56, 255],
            stroke: [250, 244, 230, 255],
            stroke_width: 1.5,
        },
    };
    if discovered { style } else { muted(style) }
}

/// Greyed-out variant for undiscovered entities.
fn muted(style: Style) -> Style {
    let grey = |c: [u8; 4]| {
        let luma = (u16::from(c[0]) * 3 + u16::from(c[1]) * 6 + u16::from(c[2])) / 10;
        let l = luma as u8 / 2 + 40;
        [l, l, l, c[3] / 2]
    };
    Style {
        fill: grey(style.fill),
        stroke: grey(style.stroke),
        stroke_width: style.stroke_width,
    }
}

fn paint(rgba: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]);
    paint.anti_alias = true;
    paint
}

/// Stateless apart from its configuration: the same entity state and key
/// always produce the same pixels.
pub(crate) struct Rasterizer {
    tile_size: u32,
    labels: LabelPolicy,
    blank: Pixmap,
}

impl Rasterizer {
    pub(crate) fn new(blank: Pixmap, labels: LabelPolicy) -> Self {
        Self {
            tile_size: blank.width(),
            labels,
            blank,
        }
    }

    pub(crate) fn with_labels(&self, labels: LabelPolicy) -> Self {
        Self::new(self.blank.clone(), labels)
    }

    /// Returns true if `entity` gets a label in a tile rasterised at `zoom`.
    pub(crate) fn draws_label(&self, entity: &MapEntity, zoom: f32) -> bool {
        entity.discovered
            && !entity.display_name.is_empty()
            && self.labels.shows_label(entity.kind, zoom)
    }

    /// Pixels the entity may paint beyond its bounds at `zoom`.
    pub(crate) fn paint_margin(&self, entity: &MapEntity, zoom: f32) -> f32 {
        if self.draws_label(entity, zoom) {
            let text = label::text_width(&entity.display_name, LABEL_SCALE);
            STROKE_MARGIN + LABEL_GAP + text
        } else {
            STROKE_MARGIN
        }
    }

    pub(crate) fn rasterize(&self, entity: &MapEntity, key: &CacheKey) -> Pixmap {
        let mut pixmap = self.blank.clone();
        if entity.geometry.is_degenerate() {
            return pixmap;
        }

        let zoom = key.zoom();
        let tile = self.tile_size as f32;
        let origin = Vec2::new(key.tile_x as f32 * tile, key.tile_y as f32 * tile);
        let to_pixels = |p: Vec2| p * zoom - origin;
        let style = style_for(entity.kind, entity.discovered);

        match &entity.geometry {
            Geometry::Point(p) => draw_marker(&mut pixmap, to_pixels(*p), &style),
            Geometry::Polyline(points) => {
                let pixels: Vec<Vec2> = points.iter().map(|p| to_pixels(*p)).collect();
                draw_path(&mut pixmap, &pixels, false, &style);
            }
            Geometry::Polygon(points) => {
                let pixels: Vec<Vec2> = points.iter().map(|p| to_pixels(*p)).collect();
                draw_path(&mut pixmap, &pixels, true, &style);
            }
        }

        if self.draws_label(entity, zoom)
            && let Some(center) = entity.geometry.center()
        {
            let anchor = to_pixels(center);
            let width = label::text_width(&entity.display_name, LABEL_SCALE);
            let height = label::text_height(LABEL_SCALE);
            let (x, y) = match entity.kind {
                EntityKind::Location => {
                    (anchor.x + MARKER_RADIUS + LABEL_GAP, anchor.y - height / 2.0)
                }
                EntityKind::Region | EntityKind::Route => {
                    (anchor.x - width / 2.0, anchor.y - height / 2.0)
                }
            };
            label::draw_text(
                &mut pixmap,
                &entity.display_name,
                x,
                y,
                LABEL_SCALE,
                LABEL_COLOR,
                LABEL_SHADOW,
            );
        }

        pixmap
    }
}

fn draw_marker(pixmap: &mut Pixmap, center: Vec2, style: &Style) {
    let Some(path) = PathBuilder::from_circle(center.x, center.y, MARKER_RADIUS) else {
        return;
    };
    pixmap.fill_path(
        &path,
        &paint(style.fill),
        FillRule::Winding,
        Transform::identity(),
        None,
    );
    let stroke = Stroke {
        width: style.stroke_width,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &paint(style.stroke), &stroke, Transform::identity(), None);
}

fn draw_path(pixmap: &mut Pixmap, points: &[Vec2], closed: bool, style: &Style) {
    let mut builder = PathBuilder::new();
    let mut iter = points.iter();
    let Some(first) = iter.next() else {
        return;
    };
    builder.move_to(first.x, first.y);
    for p in iter {
        builder.line_to(p.x, p.y);
    }
    if closed {
        builder.close();
    }
    // Zero-area shapes (all points equal) yield no path.
    let Some(path) = builder.finish() else {
        return;
    };

    if closed {
        pixmap.fill_path(
            &path,
            &paint(style.fill),
            FillRule::EvenOdd,
            Transform::identity(),
            None,
        );
    }
    let stroke = Stroke {
        width: style.stroke_width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &paint(style.stroke), &stroke, Transform::identity(), None);
}
