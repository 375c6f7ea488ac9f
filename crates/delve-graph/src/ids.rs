//! Identity types.
//!
//! Newtype wrappers so an entity id can't be passed where a task-slot index
//! is expected, and so log lines read `E-3#1` instead of a bare tuple.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle to a [`RoomEntity`](crate::RoomEntity) in a
/// [`DungeonGraph`](crate::DungeonGraph).
///
/// Ids are allocated by the graph that owns the entity and are never
/// reused within that graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E-{}", self.0)
    }
}

/// A typed edge to one connection point: which entity owns it, and its
/// index in that entity's connector list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectorRef {
    pub entity: EntityId,
    pub index: usize,
}

impl ConnectorRef {
    pub fn new(entity: EntityId, index: usize) -> Self {
        Self { entity, index }
    }
}

impl fmt::Display for ConnectorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.entity, self.index)
    }
}

/// Index of a task-slot within its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskSlotId(pub u32);

impl fmt::Display for TaskSlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T-{}", self.0)
    }
}

/// A task-slot addressed from outside its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskSlotRef {
    pub room: EntityId,
    pub slot: TaskSlotId,
}

impl fmt::Display for TaskSlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.room, self.slot)
    }
}
