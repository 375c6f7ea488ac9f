//! Task-slots: the places inside a room where a mini-game can be hosted.
//!
//! The engine doesn't know what a task *is*; it only tracks which slots
//! were activated and which of those have reported completion.

use serde::{Deserialize, Serialize};

use crate::TaskSlotId;

/// Lifecycle of one task-slot.
///
/// ```text
/// Dormant ──activate──▶ Active ──complete──▶ Completed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskSlotState {
    /// Present in the room but not selected by the assignment policy.
    Dormant,
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSlot {
    pub id: TaskSlotId,
    pub kind: String,
    pub state: TaskSlotState,
}

impl TaskSlot {
    pub fn new(id: TaskSlotId, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            state: TaskSlotState::Dormant,
        }
    }

    /// Activated at some point, whether or not it has completed since.
    pub fn was_activated(&self) -> bool {
        matches!(self.state, TaskSlotState::Active | TaskSlotState::Completed)
    }
}

/// Result of reporting a task completion to a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskProgress {
    /// The room still has active slots left.
    Pending { remaining: usize },
    /// That was the last active slot. Returned exactly once per room.
    RoomCompleted,
}
