//! Mask rasterisation: dark fill, radial cut-outs, then a 3x3 blur.

use glam::Vec2;
use tiny_skia::{
    BlendMode, Color, GradientStop, Paint, Pixmap, Point, RadialGradient, Rect, SpreadMode,
    Transform,
};

/// Build a `width` x `height` mask.
///
/// When `enabled`, the mask starts as `color` and every reveal point cuts a
/// hole whose opacity falls off linearly from fully cleared at the point to
/// untouched at `reveal_radius` pixels. When disabled the mask is fully
/// transparent. The blur always runs. Returns `None` for a zero-sized mask.
pub fn build_mask(
    width: u32,
    height: u32,
    color: [u8; 4],
    enabled: bool,
    reveal_radius: f32,
    reveal_points: &[Vec2],
) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(width, height)?;
    if enabled {
        pixmap.fill(Color::from_rgba8(color[0], color[1], color[2], color[3]));
        if reveal_radius > 0.0 && reveal_radius.is_finite() {
            for point in reveal_points.iter().filter(|p| p.is_finite()) {
                cut_out(&mut pixmap, *point, reveal_radius);
            }
        }
    }
    blur3x3(&mut pixmap);
    Some(pixmap)
}

fn cut_out(pixmap: &mut Pixmap, center: Vec2, radius: f32) {
    let c = Point::from_xy(center.x, center.y);
    let Some(shader) = RadialGradient::new(
        c,
        c,
        radius,
        vec![
            GradientStop::new(0.0, Color::BLACK),
            GradientStop::new(1.0, Color::TRANSPARENT),
        ],
        SpreadMode::Pad,
        Transform::identity(),
    ) else {
        return;
    };
    let side = radius * 2.0;
    let Some(rect) = Rect::from_xywh(center.x - radius, center.y - radius, side, side) else {
        return;
    };
    let paint = Paint {
        shader,
        blend_mode: BlendMode::DestinationOut,
        anti_alias: true,
        ..Paint::default()
    };
    pixmap.fill_rect(rect, &paint, Transform::identity(), None);
}

/// Normalised 3x3 blur (corners 1/16, edges 2/16, center 4/16) with edge
/// pixels clamped.
///
/// Works on premultiplied bytes, so every output pixel stays a valid
/// premultiplied color.
pub fn blur3x3(pixmap: &mut Pixmap) {
    const KERNEL: [[u32; 3]; 3] = [[1, 2, 1], [2, 4, 2], [1, 2, 1]];

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let source = pixmap.data().to_vec();
    let out = pixmap.data_mut();

    for y in 0..height {
        for x in 0..width {
            let mut sum = [0u32; 4];
            for (ky, row) in KERNEL.iter().enumerate() {
                let sy = (y + ky).saturating_sub(1).min(height - 1);
                for (kx, weight) in row.iter().enumerate() {
                    let sx = (x + kx).saturating_sub(1).min(width - 1);
                    let base = (sy * width + sx) * 4;
                    for (channel, total) in sum.iter_mut().enumerate() {
                        *total += u32::from(source[base + channel]) * weight;
                    }
                }
            }
            let base = (y * width + x) * 4;
            for (channel, total) in sum.iter().enumerate() {
                out[base + channel] = ((total + 8) / 16) as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOG: [u8; 4] = [10, 10, 30, 255];

    fn alpha(pixmap: &Pixmap, x: u32, y: u32) -> u8 {
        pixmap.pixel(x, y).unwrap().alpha()
    }

    /// A single opaque pixel spreads with the documented weights.
    #[test]
    fn test_blur_kernel_weights() {
        let mut pixmap = Pixmap::new(5, 5).unwrap();
        let data = pixmap.data_mut();
        let center = (2 * 5 + 2) * 4;
        data[center..center + 4].copy_from_slice(&[255, 255, 255, 255]);

        blur3x3(&mut pixmap);
        assert_eq!(alpha(&pixmap, 2, 2), 64);
        assert_eq!(alpha(&pixmap, 2, 1), 32);
        assert_eq!(alpha(&pixmap, 1, 1), 16);
        assert_eq!(alpha(&pixmap, 0, 0), 0);
    }

    /// Uniform images are unchanged, edges included.
    #[test]
    fn test_blur_preserves_uniform_fill() {
        let mut pixmap = Pixmap::new(4, 3).unwrap();
        pixmap.fill(Color::from_rgba8(FOG[0], FOG[1], FOG[2], FOG[3]));
        let before = pixmap.data().to_vec();
        blur3x3(&mut pixmap);
        assert_eq!(pixmap.data(), &before[..]);
    }

    #[test]
    fn test_disabled_mask_is_transparent() {
        let mask = build_mask(32, 32, FOG, false, 10.0, &[Vec2::new(16.0, 16.0)]).unwrap();
        assert!(mask.pixels().iter().all(|p| p.alpha() == 0));
    }

    /// Reveal points are clear at the center, partly clear midway, and fogged
    /// beyond the radius.
    #[test]
    fn test_reveal_falloff() {
        let mask = build_mask(100, 100, FOG, true, 20.0, &[Vec2::new(50.0, 50.0)]).unwrap();
        let center = alpha(&mask, 50, 50);
        let midway = alpha(&mask, 60, 50);
        let outside = alpha(&mask, 80, 50);
        assert!(center < 30, "center alpha {center}");
        assert!(midway > center && midway < outside, "midway alpha {midway}");
        assert_eq!(outside, 255);
        assert_eq!(alpha(&mask, 0, 0), 255);
    }

    #[test]
    fn test_zero_size_is_none() {
        assert!(build_mask(0, 10, FOG, true, 5.0, &[]).is_none());
    }
}
