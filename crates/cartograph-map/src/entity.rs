//! Map entities supplied by the world/map collaborator.

use std::fmt;

use crate::geometry::Geometry;

/// Stable identifier of a map entity, unique within its [`EntityKind`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub String);

impl EntityId {
    /// Create an ID from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw ID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three kinds of things drawn on the world map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// An area, normally a polygon.
    Region,
    /// A path between locations, normally a polyline.
    Route,
    /// A point of interest.
    Location,
}

impl EntityKind {
    /// All kinds in back-to-front draw order.
    pub const DRAW_ORDER: [EntityKind; 3] =
        [EntityKind::Region, EntityKind::Route, EntityKind::Location];

    /// Lowercase tag used in cache keys and logs.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Region => "region",
            Self::Route => "route",
            Self::Location => "location",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One drawable thing on the map. Read-only to the rendering core.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub geometry: Geometry,
    pub display_name: String,
    /// Undiscovered entities are drawn muted and without labels.
    pub discovered: bool,
    /// Culling priority. `0` means the entity is always rendered.
    pub priority: u32,
}

impl MapEntity {
    /// Create a discovered entity with priority 1.
    pub fn new(
        id: impl Into<String>,
        kind: EntityKind,
        geometry: Geometry,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: EntityId::new(id),
            kind,
            geometry,
            display_name: display_name.into(),
            discovered: true,
            priority: 1,
        }
    }

    /// Builder-style priority override.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Builder-style discovered flag override.
    pub fn with_discovered(mut self, discovered: bool) -> Self {
        self.discovered = discovered;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_kind_tags_are_distinct() {
        assert_eq!(EntityKind::Region.tag(), "region");
        assert_eq!(EntityKind::Route.to_string(), "route");
        assert_eq!(EntityKind::Location.tag(), "location");
    }

    /// Builders override the defaults set by `new`.
    #[test]
    fn test_entity_builders() {
        let e = MapEntity::new("town", EntityKind::Location, Geometry::Point(Vec2::ZERO), "Town")
            .with_priority(0)
            .with_discovered(false);
        assert_eq!(e.id.as_str(), "town");
        assert_eq!(e.priority, 0);
        assert!(!e.discovered);
    }
}
