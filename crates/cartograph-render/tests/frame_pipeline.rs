//! End-to-end frames through the compositor.

use std::time::{Duration, Instant};

use cartograph_config::Config;
use cartograph_map::{EntityKind, Geometry, MapEntity, ViewState};
use cartograph_render::MapCompositor;
use glam::Vec2;
use tiny_skia::Pixmap;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;
const DEADLINE: Duration = Duration::from_secs(5);

fn config() -> Config {
    let mut config = Config::default();
    config.viewport.width = WIDTH;
    config.viewport.height = HEIGHT;
    config.viewport.minimap_size = 64;
    config.render.tile_size = 128;
    config.render.adaptive_lod = false;
    config
}

fn world() -> Vec<MapEntity> {
    vec![
        MapEntity::new(
            "meadow",
            EntityKind::Region,
            Geometry::Polygon(vec![
                Vec2::new(20.0, 20.0),
                Vec2::new(200.0, 30.0),
                Vec2::new(150.0, 200.0),
            ]),
            "Meadow",
        ),
        MapEntity::new(
            "road",
            EntityKind::Route,
            Geometry::Polyline(vec![Vec2::new(0.0, 220.0), Vec2::new(300.0, 100.0)]),
            "Road",
        ),
        MapEntity::new(
            "inn",
            EntityKind::Location,
            Geometry::Point(Vec2::new(250.0, 60.0)),
            "Inn",
        )
        .with_priority(0),
    ]
}

fn view() -> ViewState {
    ViewState::new(WIDTH, HEIGHT)
}

/// A steady view is served from the tile cache after the first frame.
#[test]
fn test_repeat_frames_hit_the_cache() {
    let mut compositor = MapCompositor::new(&config()).unwrap();
    let mut target = Pixmap::new(WIDTH, HEIGHT).unwrap();
    let entities = world();

    let first = compositor.render(&mut target, &entities, &view());
    assert_eq!(first.drawn, 3);
    assert_eq!(first.minimap_drawn, 3);
    let rasterized = compositor.tile_stats().rasterized;
    let snapshot = target.data().to_vec();

    compositor.render(&mut target, &entities, &view());
    let stats = compositor.tile_stats();
    assert_eq!(stats.rasterized, rasterized);
    assert!(stats.hits > 0);
    assert_eq!(target.data(), &snapshot[..]);
}

/// Invalidating one entity re-rasterises only its tiles.
#[test]
fn test_invalidate_entity_rerenders() {
    let mut compositor = MapCompositor::new(&config()).unwrap();
    let mut target = Pixmap::new(WIDTH, HEIGHT).unwrap();
    let entities = world();
    compositor.render(&mut target, &entities, &view());
    let before = compositor.tile_stats().rasterized;

    let removed = compositor.invalidate_entity(EntityKind::Location, &entities[2].id);
    assert!(removed >= 2, "full and minimap tiles, got {removed}");
    compositor.render(&mut target, &entities, &view());
    assert_eq!(compositor.tile_stats().rasterized, before + removed as u64);
}

/// Fog covers the map except around discovered points once the mask is built.
#[test]
fn test_fog_overlay() {
    let mut compositor = MapCompositor::new(&config()).unwrap();
    let mut target = Pixmap::new(WIDTH, HEIGHT).unwrap();
    let mut view = view();
    view.fog_enabled = true;
    view.reveal_radius = 40.0;
    view.discovered_areas = vec![Vec2::new(100.0, 150.0)];

    compositor.render(&mut target, &[], &view);
    compositor.sync_fog();

    let second = compositor.render(&mut target, &[], &view);
    assert!(!second.fog_stale);
    let fog = config().fog.color;
    let corner = target.pixel(2, HEIGHT - 3).unwrap();
    assert_eq!((corner.red(), corner.green(), corner.blue()), (fog[0], fog[1], fog[2]));
    let revealed = target.pixel(100, 150).unwrap();
    assert_ne!(revealed.blue(), fog[2]);

    // Panning moves the holes, so the parameters change.
    let version = compositor.fog().params_version();
    compositor.render(&mut target, &[], &view);
    assert_eq!(compositor.fog().params_version(), version);
    view.offset = Vec2::new(30.0, 0.0);
    compositor.render(&mut target, &[], &view);
    assert_eq!(compositor.fog().params_version(), version + 1);
}

/// The base-map image loads in the background and shows up on a later frame.
#[test]
fn test_background_image_loads() {
    let dir = tempfile::tempdir().unwrap();
    image::RgbaImage::from_pixel(WIDTH, HEIGHT, image::Rgba([200, 10, 10, 255]))
        .save(dir.path().join("base.png"))
        .unwrap();
    let mut config = config();
    config.assets.asset_root = dir.path().to_path_buf();
    config.assets.background_image = Some("base.png".to_string());

    let mut compositor = MapCompositor::new(&config).unwrap();
    let mut target = Pixmap::new(WIDTH, HEIGHT).unwrap();
    let start = Instant::now();
    loop {
        let report = compositor.render(&mut target, &[], &view());
        if report.background_drawn {
            break;
        }
        assert!(start.elapsed() < DEADLINE, "background never loaded");
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(target.pixel(10, HEIGHT - 10).unwrap().red(), 200);
    assert_eq!(compositor.loader().image_count(), 1);
}

/// A missing base-map image degrades to the plain background.
#[test]
fn test_missing_background_degrades() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config();
    config.assets.asset_root = dir.path().to_path_buf();
    config.assets.background_image = Some("absent.png".to_string());

    let mut compositor = MapCompositor::new(&config).unwrap();
    let mut target = Pixmap::new(WIDTH, HEIGHT).unwrap();
    let start = Instant::now();
    while compositor.background_pending() {
        compositor.render(&mut target, &[], &view());
        assert!(start.elapsed() < DEADLINE, "load never resolved");
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(!compositor.render(&mut target, &[], &view()).background_drawn);
}

/// Two compositors keep separate caches and controllers.
#[test]
fn test_compositors_are_independent() {
    let mut a = MapCompositor::new(&config()).unwrap();
    let b = MapCompositor::new(&config()).unwrap();
    let mut target = Pixmap::new(WIDTH, HEIGHT).unwrap();
    a.render(&mut target, &world(), &view());

    assert!(a.tile_stats().entries > 0);
    assert_eq!(b.tile_stats().entries, 0);
    assert_eq!(a.perf_stats().frame_count, 1);
    assert_eq!(b.perf_stats().frame_count, 0);
}

#[test]
fn test_switch_map_and_resize() {
    let mut compositor = MapCompositor::new(&config()).unwrap();
    let mut target = Pixmap::new(WIDTH, HEIGHT).unwrap();
    compositor.render(&mut target, &world(), &view());

    compositor.switch_map(None);
    assert_eq!(compositor.tile_stats().entries, 0);
    assert_eq!(compositor.current_lod(), 0);

    compositor.resize(200, 100).unwrap();
    assert_eq!(compositor.fog().size(), (200, 100));
    assert!(compositor.resize(0, 100).is_err());

    let report = serde_json::to_value(compositor.last_report()).unwrap();
    assert_eq!(report["drawn"], 3);
}
