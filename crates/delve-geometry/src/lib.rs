//! Spatial primitives for Delve.
//!
//! Everything the placement engine needs to reason about space lives here:
//!
//! - [`Pose`] — a 2-D position plus an orientation (radians, CCW from +X).
//!   Connection points and entity transforms are both poses.
//! - [`Obb`] — an oriented bounding box with a separating-axis overlap test.
//! - [`align_to`] — the rigid transform that snaps one connector onto another.
//!
//! Nothing in this crate knows about rooms or graphs; it works with plain
//! values so it can be tested in isolation.

mod obb;
mod pose;

pub use glam::Vec2;
pub use obb::Obb;
pub use pose::{align_to, normalize_angle, Pose};

/// Distance below which two values are considered equal.
///
/// Alignment goes through `sin`/`cos`, so connectors that should coincide
/// exactly land within a few ULPs of each other.
pub const EPSILON: f32 = 1e-4;
