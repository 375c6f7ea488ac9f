//! Room categories and templates.

use std::fmt;

use delve_geometry::{Obb, Pose};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// What role a placed entity plays in the dungeon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomCategory {
    /// The fixed starting room. Exactly one per session, never cascaded away.
    Spawn,
    /// A room that carries task-slots.
    Room,
    /// A connector piece between a spawn/room and the next room.
    Hallway,
}

impl fmt::Display for RoomCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn => write!(f, "Spawn"),
            Self::Room => write!(f, "Room"),
            Self::Hallway => write!(f, "Hallway"),
        }
    }
}

/// The catalog-side classification of a template.
///
/// Finer than [`RoomCategory`]: variants like [`SpecialRoom`](Self::SpecialRoom)
/// exist so a template source can pick between them, but once placed a
/// special room is just a [`RoomCategory::Room`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateCategory {
    Spawn,
    AlternateSpawn,
    Room,
    SpecialRoom,
    Hallway,
}

impl TemplateCategory {
    /// The entity category a template of this kind produces.
    pub fn room_category(self) -> RoomCategory {
        match self {
            Self::Spawn | Self::AlternateSpawn => RoomCategory::Spawn,
            Self::Room | Self::SpecialRoom => RoomCategory::Room,
            Self::Hallway => RoomCategory::Hallway,
        }
    }
}

impl fmt::Display for TemplateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn => write!(f, "Spawn"),
            Self::AlternateSpawn => write!(f, "AlternateSpawn"),
            Self::Room => write!(f, "Room"),
            Self::SpecialRoom => write!(f, "SpecialRoom"),
            Self::Hallway => write!(f, "Hallway"),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomTemplate
// ---------------------------------------------------------------------------

/// A prefab a [`RoomEntity`](crate::RoomEntity) is instantiated from.
///
/// All geometry is in the template's own frame. `bounds` may hold several
/// parts (an L-shaped room is two boxes); parts of one entity never collide
/// with each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomTemplate {
    pub name: String,
    pub category: TemplateCategory,
    /// Attachment poses, outward axis pointing away from the room.
    pub connectors: Vec<Pose>,
    pub bounds: Vec<Obb>,
    /// Kinds of task-slot this room offers (opaque to the engine).
    #[serde(default)]
    pub task_slots: Vec<String>,
}

impl RoomTemplate {
    pub fn new(name: impl Into<String>, category: TemplateCategory) -> Self {
        Self {
            name: name.into(),
            category,
            connectors: Vec::new(),
            bounds: Vec::new(),
            task_slots: Vec::new(),
        }
    }

    pub fn with_connector(mut self, pose: Pose) -> Self {
        self.connectors.push(pose);
        self
    }

    pub fn with_bounds(mut self, part: Obb) -> Self {
        self.bounds.push(part);
        self
    }

    pub fn with_task(mut self, kind: impl Into<String>) -> Self {
        self.task_slots.push(kind.into());
        self
    }

    pub fn room_category(&self) -> RoomCategory {
        self.category.room_category()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_category_maps_to_room_category() {
        assert_eq!(TemplateCategory::AlternateSpawn.room_category(), RoomCategory::Spawn);
        assert_eq!(TemplateCategory::SpecialRoom.room_category(), RoomCategory::Room);
        assert_eq!(TemplateCategory::Hallway.room_category(), RoomCategory::Hallway);
    }

    #[test]
    fn test_template_deserializes_without_task_slots() {
        let json = r#"{
            "name": "corridor",
            "category": "Hallway",
            "connectors": [
                { "position": [-2.0, 0.0], "rotation": 3.14159265 },
                { "position": [2.0, 0.0] }
            ],
            "bounds": [ { "center": [0.0, 0.0], "half_extents": [2.0, 1.0] } ]
        }"#;
        let t: RoomTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(t.category, TemplateCategory::Hallway);
        assert_eq!(t.connectors.len(), 2);
        assert_eq!(t.connectors[1].rotation, 0.0);
        assert!(t.task_slots.is_empty());
    }
}
