//! The dungeon data model for Delve.
//!
//! This crate owns the *shape* of a dungeon but never decides how it grows:
//!
//! - [`ConnectorState`] — the reservation flag on a connection point
//! - [`RoomTemplate`] — what a room looks like before it is placed
//! - [`RoomEntity`] — a placed spawn, hallway or room
//! - [`DungeonGraph`] — the arena holding every live entity
//!
//! # Edges, not pointers
//!
//! An entity refers to the connector it hangs off through a [`ConnectorRef`]
//! (entity id + connector index) into the graph. Cascade removal is
//! therefore a lookup in the arena, never a walk over borrowed references.
//!
//! ```text
//! Spawn ──#0──▶ Hallway ──#1──▶ Room
//!   ▲             │  ▲            │
//!   └─ parent ────┘  └─ parent ───┘
//! ```

mod connector;
mod entity;
mod error;
mod graph;
mod ids;
mod task;
mod template;

pub use connector::{ConnectionPoint, ConnectorState};
pub use entity::{CONNECTOR_DRAWS, RoomEntity};
pub use error::GraphError;
pub use graph::DungeonGraph;
pub use ids::{ConnectorRef, EntityId, TaskSlotId, TaskSlotRef};
pub use task::{TaskProgress, TaskSlot, TaskSlotState};
pub use template::{RoomCategory, RoomTemplate, TemplateCategory};
