//! View rectangles and the per-frame view-state snapshot.

use glam::Vec2;

/// Axis-aligned rectangle `{x, y, w, h}` in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl ViewRect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.w, self.y + self.h)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    /// Returns true if the rectangles overlap, including touching edges.
    pub fn intersects(&self, other: &ViewRect) -> bool {
        self.x <= other.x + other.w
            && self.x + self.w >= other.x
            && self.y <= other.y + other.h
            && self.y + self.h >= other.y
    }

    /// Returns true if the point lies inside or on the boundary.
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.x + self.w && p.y >= self.y && p.y <= self.y + self.h
    }

    /// Grow the rectangle by `margin` on every side.
    pub fn expand_by(&self, margin: f32) -> ViewRect {
        ViewRect::new(
            self.x - margin,
            self.y - margin,
            self.w + 2.0 * margin,
            self.h + 2.0 * margin,
        )
    }
}

/// Snapshot of everything the renderer needs to know about the camera and fog
/// for one frame.
///
/// `offset` is the world position shown at the top-left corner of the
/// viewport; one world unit covers `zoom` pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub offset: Vec2,
    pub zoom: f32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub fog_enabled: bool,
    /// Reveal radius in world units.
    pub reveal_radius: f32,
    /// Visited points in world units, in visit order.
    pub discovered_areas: Vec<Vec2>,
}

impl ViewState {
    /// A view at the origin with zoom 1 and fog disabled.
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
            viewport_width,
            viewport_height,
            fog_enabled: false,
            reveal_radius: 0.0,
            discovered_areas: Vec::new(),
        }
    }

    /// The world-space rectangle currently on screen.
    ///
    /// Recomputed from `offset` and `zoom` on every call, so it is always in
    /// sync with the camera.
    pub fn view_rect(&self) -> ViewRect {
        let zoom = self.zoom.max(f32::EPSILON);
        ViewRect::new(
            self.offset.x,
            self.offset.y,
            self.viewport_width as f32 / zoom,
            self.viewport_height as f32 / zoom,
        )
    }

    /// World position of the viewport center (the camera).
    pub fn camera(&self) -> Vec2 {
        self.view_rect().center()
    }

    /// Move the camera so that `world` sits at the viewport center.
    pub fn center_on(&mut self, world: Vec2) {
        let half = Vec2::new(self.viewport_width as f32, self.viewport_height as f32)
            / (2.0 * self.zoom.max(f32::EPSILON));
        self.offset = world - half;
    }

    /// Convert a world position to viewport pixels.
    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        (world - self.offset) * self.zoom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects_touching_edges() {
        let a = ViewRect::new(0.0, 0.0, 10.0, 10.0);
        let b = ViewRect::new(10.0, 10.0, 5.0, 5.0);
        let c = ViewRect::new(10.1, 0.0, 5.0, 5.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    /// The view rectangle shrinks as zoom increases.
    #[test]
    fn test_view_rect_follows_zoom() {
        let mut view = ViewState::new(800, 600);
        view.offset = Vec2::new(100.0, 50.0);
        assert_eq!(view.view_rect(), ViewRect::new(100.0, 50.0, 800.0, 600.0));
        view.zoom = 2.0;
        assert_eq!(view.view_rect(), ViewRect::new(100.0, 50.0, 400.0, 300.0));
    }

    #[test]
    fn test_center_on_places_point_mid_screen() {
        let mut view = ViewState::new(800, 600);
        view.zoom = 0.5;
        view.center_on(Vec2::new(1000.0, 1000.0));
        assert_eq!(view.camera(), Vec2::new(1000.0, 1000.0));
        assert_eq!(
            view.world_to_screen(Vec2::new(1000.0, 1000.0)),
            Vec2::new(400.0, 300.0)
        );
    }
}
