//! Distance- and priority-based visibility and per-entity LOD.

use cartograph_map::ViewRect;

use crate::PerformanceController;

/// Fraction of the half view width removed per global LOD step.
const LOD_FALLOFF_PER_STEP: f32 = 0.2;

/// Maximum distance from the view center at which an entity of `priority`
/// is still drawn under global `lod`.
///
/// `(view_width / 2) * (1 - lod * 0.2) / (priority + 1)`, floored at zero.
pub fn render_threshold(view_width: f32, lod: u8, priority: u32) -> f32 {
    let falloff = (1.0 - f32::from(lod) * LOD_FALLOFF_PER_STEP).max(0.0);
    (view_width / 2.0) * falloff / (priority as f32 + 1.0)
}

impl PerformanceController {
    /// Decide whether an entity is drawn this frame.
    ///
    /// Priority 0 always renders. Anything outside the view never renders.
    /// At LOD 0 everything in view renders; above it, distant and low-priority
    /// entities are dropped first.
    pub fn should_render(
        &self,
        entity_bounds: &ViewRect,
        view_bounds: &ViewRect,
        priority: u32,
    ) -> bool {
        if priority == 0 {
            return true;
        }
        if !entity_bounds.intersects(view_bounds) {
            return false;
        }
        let lod = self.current_lod();
        if lod == 0 {
            return true;
        }
        let distance = view_bounds.center().distance(entity_bounds.center());
        distance <= render_threshold(view_bounds.w, lod, priority)
    }

    /// Detail level for one entity: global LOD plus one step per quarter view
    /// width of distance plus `base_lod`, clamped to `[0, max_lod]`.
    pub fn element_lod(
        &self,
        entity_bounds: &ViewRect,
        view_bounds: &ViewRect,
        base_lod: u8,
    ) -> u8 {
        let max_lod = self.max_lod();
        let quarter = view_bounds.w / 4.0;
        let distance = view_bounds.center().distance(entity_bounds.center());

        // A zero-width view puts everything infinitely far away; the cast saturates.
        let distance_lod = if quarter > 0.0 {
            (distance / quarter).floor() as u32
        } else {
            u32::from(max_lod)
        };

        let total = u32::from(self.current_lod())
            .saturating_add(distance_lod)
            .saturating_add(u32::from(base_lod));
        total.min(u32::from(max_lod)) as u8
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::LodSettings;

    fn view() -> ViewRect {
        ViewRect::new(0.0, 0.0, 800.0, 600.0)
    }

    /// Drive the real feedback loop with slow frames until the LOD reaches `lod`.
    fn controller_at_lod(lod: u8) -> PerformanceController {
        let t0 = Instant::now();
        let mut ctrl = PerformanceController::starting_at(LodSettings::default(), t0);
        for tick in 1..=u64::from(lod) {
            ctrl.record_frame(Duration::from_millis(40), t0 + Duration::from_secs(tick));
        }
        ctrl.set_adaptive(false);
        assert_eq!(ctrl.current_lod(), lod);
        ctrl
    }

    /// Priority 0 bypasses both the view test and the distance test.
    #[test]
    fn test_priority_zero_always_renders() {
        let ctrl = controller_at_lod(4);
        let far_away = ViewRect::new(5000.0, 5000.0, 0.0, 0.0);
        assert!(ctrl.should_render(&far_away, &view(), 0));
    }

    #[test]
    fn test_outside_view_never_renders() {
        let ctrl = controller_at_lod(0);
        let outside = ViewRect::new(900.0, 0.0, 10.0, 10.0);
        assert!(!ctrl.should_render(&outside, &view(), 1));
    }

    #[test]
    fn test_lod_zero_renders_everything_in_view() {
        let ctrl = controller_at_lod(0);
        let corner = ViewRect::new(790.0, 590.0, 5.0, 5.0);
        assert!(ctrl.should_render(&corner, &view(), 50));
    }

    /// Priority 2, 1000 units from center, LOD 3: threshold is ~53.3, so culled.
    #[test]
    fn test_distance_threshold_culls_low_priority() {
        let ctrl = controller_at_lod(3);
        // Wide region that overlaps the view but is centered 1000 units to the right.
        let region = ViewRect::new(400.0, 0.0, 2000.0, 600.0);
        assert_eq!(view().center().distance(region.center()), 1000.0);
        assert!((render_threshold(800.0, 3, 2) - 53.333).abs() < 0.01);
        assert!(!ctrl.should_render(&region, &view(), 2));
    }

    /// Entities near the center survive a raised LOD.
    #[test]
    fn test_near_center_survives_high_lod() {
        let ctrl = controller_at_lod(2);
        let near = ViewRect::new(395.0, 295.0, 10.0, 10.0);
        assert!(ctrl.should_render(&near, &view(), 1));
    }

    #[test]
    fn test_threshold_never_negative() {
        assert_eq!(render_threshold(800.0, 10, 1), 0.0);
    }

    #[test]
    fn test_element_lod_grows_with_distance() {
        let ctrl = controller_at_lod(0);
        let center = ViewRect::new(400.0, 300.0, 0.0, 0.0);
        let quarter_out = ViewRect::new(600.0, 300.0, 0.0, 0.0);
        let far = ViewRect::new(5000.0, 300.0, 0.0, 0.0);
        assert_eq!(ctrl.element_lod(&center, &view(), 0), 0);
        assert_eq!(ctrl.element_lod(&quarter_out, &view(), 0), 1);
        assert_eq!(ctrl.element_lod(&far, &view(), 0), 4);
    }

    /// Global LOD and base LOD add on top of distance, clamped to the maximum.
    #[test]
    fn test_element_lod_adds_global_and_base() {
        let ctrl = controller_at_lod(2);
        let center = ViewRect::new(400.0, 300.0, 0.0, 0.0);
        assert_eq!(ctrl.element_lod(&center, &view(), 1), 3);
        assert_eq!(ctrl.element_lod(&center, &view(), 9), 4);
    }
}
