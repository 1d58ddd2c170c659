//! The drawing seam between the rendering core and whatever presents pixels.
//!
//! Tile and fog bitmaps are always [`Pixmap`]s; a [`Surface`] only has to know
//! how to composite them. The software implementation for [`Pixmap`] itself is
//! used by the headless binary and the tests.

use tiny_skia::{Color, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, Transform};

/// A drawable render target.
pub trait Surface {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Replace every pixel with the given straight-alpha RGBA color.
    fn clear(&mut self, rgba: [u8; 4]);

    /// Source-over composite `bitmap` with its top-left corner at `(x, y)`.
    fn draw_bitmap(&mut self, x: i32, y: i32, bitmap: &Pixmap);

    /// Composite `bitmap` scaled uniformly by `scale`, top-left at `(x, y)`.
    fn draw_bitmap_scaled(&mut self, x: f32, y: f32, scale: f32, bitmap: &Pixmap);

    /// Fill a rectangle given in pixels, source-over.
    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, rgba: [u8; 4]);

    /// Outline a rectangle given in pixels.
    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, width: f32, rgba: [u8; 4]);
}

fn paint_for(rgba: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]);
    paint.anti_alias = true;
    paint
}

impl Surface for Pixmap {
    fn width(&self) -> u32 {
        Pixmap::width(self)
    }

    fn height(&self) -> u32 {
        Pixmap::height(self)
    }

    fn clear(&mut self, rgba: [u8; 4]) {
        self.fill(Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]));
    }

    fn draw_bitmap(&mut self, x: i32, y: i32, bitmap: &Pixmap) {
        self.draw_pixmap(
            x,
            y,
            bitmap.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }

    fn draw_bitmap_scaled(&mut self, x: f32, y: f32, scale: f32, bitmap: &Pixmap) {
        if !scale.is_finite() || scale <= 0.0 {
            return;
        }
        self.draw_pixmap(
            0,
            0,
            bitmap.as_ref(),
            &PixmapPaint::default(),
            Transform::from_row(scale, 0.0, 0.0, scale, x, y),
            None,
        );
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, rgba: [u8; 4]) {
        if let Some(rect) = Rect::from_xywh(x, y, w, h) {
            Pixmap::fill_rect(self, rect, &paint_for(rgba), Transform::identity(), None);
        }
    }

    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, width: f32, rgba: [u8; 4]) {
        let Some(rect) = Rect::from_xywh(x, y, w, h) else {
            return;
        };
        let path = PathBuilder::from_rect(rect);
        let stroke = Stroke {
            width,
            ..Stroke::default()
        };
        self.stroke_path(&path, &paint_for(rgba), &stroke, Transform::identity(), None);
    }
}
