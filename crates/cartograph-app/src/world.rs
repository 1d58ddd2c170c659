//! Seeded synthetic world for the demo: regions, routes between locations and
//! a camera tour that discovers the map as it goes.

use cartograph_map::{EntityKind, Geometry, MapEntity};
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

/// Side length of the square world in world units.
pub const WORLD_EXTENT: f32 = 4000.0;
const REGION_COUNT: usize = 14;
const LOCATION_COUNT: usize = 48;
const REGION_VERTICES: usize = 8;

const SYLLABLES: [&str; 16] = [
    "ka", "ren", "tor", "mi", "val", "os", "dun", "el", "bar", "sha", "lin", "gor", "ve", "ith",
    "ma", "rok",
];

/// A generated world plus the route the camera follows through it.
pub struct World {
    pub entities: Vec<MapEntity>,
    pub tour: Vec<Vec2>,
}

impl World {
    pub fn generate(seed: u64) -> Self {
        let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
        let tour = tour(&mut rng);

        let mut entities = Vec::with_capacity(REGION_COUNT + LOCATION_COUNT * 2);
        for index in 0..REGION_COUNT {
            entities.push(region(&mut rng, index, &tour));
        }

        let mut locations: Vec<MapEntity> = (0..LOCATION_COUNT)
            .map(|index| location(&mut rng, index, &tour))
            .collect();
        // Chain locations west to east so routes rarely cross.
        locations.sort_by(|a, b| {
            let ax = a.geometry.points()[0].x;
            let bx = b.geometry.points()[0].x;
            ax.total_cmp(&bx)
        });
        for (index, pair) in locations.windows(2).enumerate() {
            entities.push(route(&mut rng, index, &pair[0], &pair[1]));
        }
        entities.extend(locations);

        Self { entities, tour }
    }

    /// Camera center at `t` in `[0, 1]` along the tour.
    pub fn camera_at(&self, t: f32) -> Vec2 {
        let Some(last) = self.tour.len().checked_sub(1) else {
            return Vec2::splat(WORLD_EXTENT / 2.0);
        };
        let scaled = t.clamp(0.0, 1.0) * last as f32;
        let index = (scaled.floor() as usize).min(last.saturating_sub(1));
        let next = (index + 1).min(last);
        self.tour[index].lerp(self.tour[next], scaled - index as f32)
    }
}

fn name(rng: &mut impl Rng) -> String {
    let count = rng.gen_range(2..=3);
    let mut name: String = (0..count)
        .map(|_| SYLLABLES[rng.gen_range(0..SYLLABLES.len())])
        .collect();
    if let Some(first) = name.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    name
}

fn tour(rng: &mut impl Rng) -> Vec<Vec2> {
    let stops = 8;
    (0..=stops)
        .map(|i| {
            let x = WORLD_EXTENT * (0.1 + 0.8 * i as f32 / stops as f32);
            let y = WORLD_EXTENT * rng.gen_range(0.3..0.7);
            Vec2::new(x, y)
        })
        .collect()
}

fn near_tour(point: Vec2, tour: &[Vec2], reach: f32) -> bool {
    tour.iter().any(|stop| stop.distance(point) <= reach)
}

fn region(rng: &mut impl Rng, index: usize, tour: &[Vec2]) -> MapEntity {
    let center = Vec2::new(
        rng.gen_range(0.0..WORLD_EXTENT),
        rng.gen_range(0.0..WORLD_EXTENT),
    );
    let radius = rng.gen_range(180.0..420.0);
    let outline = (0..REGION_VERTICES)
        .map(|v| {
            let angle = v as f32 / REGION_VERTICES as f32 * std::f32::consts::TAU;
            let r = radius * rng.gen_range(0.7..1.15);
            center + Vec2::from_angle(angle) * r
        })
        .collect();
    MapEntity::new(
        format!("region-{index}"),
        EntityKind::Region,
        Geometry::Polygon(outline),
        name(rng),
    )
    .with_priority(2)
    .with_discovered(near_tour(center, tour, 900.0))
}

fn location(rng: &mut impl Rng, index: usize, tour: &[Vec2]) -> MapEntity {
    let position = Vec2::new(
        rng.gen_range(0.0..WORLD_EXTENT),
        rng.gen_range(0.0..WORLD_EXTENT),
    );
    // A handful of landmarks are always drawn.
    let priority = if index % 12 == 0 { 0 } else { rng.gen_range(1..=3) };
    MapEntity::new(
        format!("location-{index}"),
        EntityKind::Location,
        Geometry::Point(position),
        name(rng),
    )
    .with_priority(priority)
    .with_discovered(near_tour(position, tour, 700.0))
}

fn route(rng: &mut impl Rng, index: usize, from: &MapEntity, to: &MapEntity) -> MapEntity {
    let a = from.geometry.points()[0];
    let b = to.geometry.points()[0];
    let bend = (b - a).perp().normalize_or_zero() * rng.gen_range(-120.0..120.0);
    let path = vec![a, a.lerp(b, 0.5) + bend, b];
    MapEntity::new(
        format!("route-{index}"),
        EntityKind::Route,
        Geometry::Polyline(path),
        format!("{} road", from.display_name),
    )
    .with_priority(3)
    .with_discovered(from.discovered && to.discovered)
}
