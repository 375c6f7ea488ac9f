//! Connection points and their reservation flag.

use delve_geometry::Pose;
use serde::{Deserialize, Serialize};

/// The occupancy flag of a connection point.
///
/// ```text
///   Free ──reserve()──▶ Reserved
///    ▲                     │
///    └──────release()──────┘
/// ```
///
/// A point goes Free → Reserved when a placement attempt starts using it and
/// back only on an explicit release (teardown, or rollback of a failed
/// attempt). Every code path that reserves must release on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectorState {
    reserved: bool,
}

impl ConnectorState {
    /// Marks the point Reserved.
    ///
    /// Returns `false` and changes nothing if it already was.
    pub fn reserve(&mut self) -> bool {
        if self.reserved {
            return false;
        }
        self.reserved = true;
        true
    }

    /// Marks the point Free. Idempotent.
    pub fn release(&mut self) {
        self.reserved = false;
    }

    /// `true` while a placement attempt or an attached child holds the
    /// point. A reserved point is never handed out by
    /// [`RoomEntity::available_connector`](crate::RoomEntity::available_connector).
    pub fn is_reserved(&self) -> bool {
        self.reserved
    }
}

/// A fixed attachment pose on an entity, plus its occupancy.
///
/// `local` is relative to the owning entity; use
/// [`RoomEntity::connector_pose`](crate::RoomEntity::connector_pose) for the
/// world pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionPoint {
    /// Pose in the owner's frame. Its forward axis points out of the room,
    /// the way a child attached here will extend.
    pub local: Pose,
    pub state: ConnectorState,
}

impl ConnectionPoint {
    /// A free point at `local`.
    pub fn new(local: Pose) -> Self {
        Self {
            local,
            state: ConnectorState::default(),
        }
    }
}
