//! Error types for the graph layer.

use crate::{ConnectorRef, EntityId, TaskSlotId};

/// Errors raised by [`DungeonGraph`](crate::DungeonGraph) and
/// [`RoomEntity`](crate::RoomEntity) operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// No live entity has this id.
    #[error("entity {0} not in graph")]
    UnknownEntity(EntityId),

    /// The entity exists but has no connector at that index.
    #[error("connector {0} does not exist")]
    UnknownConnector(ConnectorRef),

    #[error("room {0} has no task-slot {1}")]
    UnknownTaskSlot(EntityId, TaskSlotId),

    /// Only active slots can complete.
    #[error("task-slot {1} in room {0} is not active")]
    TaskNotActive(EntityId, TaskSlotId),

    /// An entity with this id is already present.
    #[error("entity {0} already in graph")]
    DuplicateEntity(EntityId),

    /// A structural invariant does not hold.
    #[error("graph invariant violated: {0}")]
    Invariant(String),
}
