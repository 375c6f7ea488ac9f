//! Collision validation.

use delve_geometry::Obb;
use delve_graph::{DungeonGraph, EntityId, RoomEntity};

/// Returns the first live entity the candidate overlaps, if any.
///
/// The candidate's bounding parts are shrunk by `margin` first so that
/// neighbors meeting at a shared connector don't register. Parts belonging
/// to the candidate itself are never tested against each other.
///
/// Only meaningful once the candidate has been aligned.
pub fn first_overlap(graph: &DungeonGraph, candidate: &RoomEntity, margin: f32) -> Option<EntityId> {
    let parts: Vec<Obb> = candidate.bounds().map(|b| b.shrunk(margin)).collect();

    graph
        .iter()
        .filter(|other| other.id() != candidate.id())
        .find(|other| {
            other
                .bounds()
                .any(|theirs| parts.iter().any(|ours| ours.overlaps(&theirs)))
        })
        .map(|other| other.id())
}
