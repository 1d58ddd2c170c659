//! Entity geometry in world units.

use glam::Vec2;

use crate::view::ViewRect;

/// Shape of a map entity, in world coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Vec2),
    Polyline(Vec<Vec2>),
    Polygon(Vec<Vec2>),
}

impl Geometry {
    /// Vertices of the shape (a single one for points).
    pub fn points(&self) -> &[Vec2] {
        match self {
            Self::Point(p) => std::slice::from_ref(p),
            Self::Polyline(pts) | Self::Polygon(pts) => pts,
        }
    }

    /// Returns true if the shape cannot be drawn: too few vertices for its
    /// type, or any non-finite coordinate.
    pub fn is_degenerate(&self) -> bool {
        let too_few = match self {
            Self::Point(_) => false,
            Self::Polyline(pts) => pts.len() < 2,
            Self::Polygon(pts) => pts.len() < 3,
        };
        too_few || self.points().iter().any(|p| !p.is_finite())
    }

    /// Axis-aligned bounds, or `None` for degenerate geometry.
    ///
    /// Points produce a zero-sized rectangle at their position.
    pub fn bounds(&self) -> Option<ViewRect> {
        if self.is_degenerate() {
            return None;
        }
        let pts = self.points();
        let (min, max) = pts
            .iter()
            .fold((Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)), |(lo, hi), p| {
                (lo.min(*p), hi.max(*p))
            });
        Some(ViewRect::new(min.x, min.y, max.x - min.x, max.y - min.y))
    }

    /// Center of the bounds, used for label anchoring and distance tests.
    pub fn center(&self) -> Option<Vec2> {
        self.bounds().map(|b| b.center())
    }
}
