//! Oriented bounding boxes.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::Pose;

/// An oriented bounding box in the dungeon plane.
///
/// Templates describe their footprint as one or more `Obb`s in the
/// template's local frame; the placement engine maps them into world space
/// with [`Obb::transformed`] once an entity has been aligned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obb {
    pub center: Vec2,
    pub half_extents: Vec2,
    #[serde(default)]
    pub rotation: f32,
}

impl Obb {
    pub fn new(center: Vec2, half_extents: Vec2, rotation: f32) -> Self {
        Self {
            center,
            half_extents: half_extents.abs(),
            rotation,
        }
    }

    /// An axis-aligned box centered at `(x, y)` with the given half extents.
    pub fn rect(x: f32, y: f32, half_w: f32, half_h: f32) -> Self {
        Self::new(Vec2::new(x, y), Vec2::new(half_w, half_h), 0.0)
    }

    /// Maps a box expressed in `pose`'s local frame into the parent frame.
    pub fn transformed(&self, pose: Pose) -> Self {
        Self {
            center: pose.transform_point(self.center),
            half_extents: self.half_extents,
            rotation: crate::normalize_angle(pose.rotation + self.rotation),
        }
    }

    /// Shrinks both half extents by `margin` (a fraction, `0.1` = 10% smaller).
    pub fn shrunk(&self, margin: f32) -> Self {
        let scale = (1.0 - margin).max(0.0);
        Self {
            half_extents: self.half_extents * scale,
            ..*self
        }
    }

    /// The box's local X and Y axes in world space.
    pub fn axes(&self) -> [Vec2; 2] {
        let x = Vec2::from_angle(self.rotation);
        [x, x.perp()]
    }

    /// Separating-axis overlap test.
    ///
    /// Boxes that merely touch (shared edge, shared corner) do not overlap.
    pub fn overlaps(&self, other: &Obb) -> bool {
        let delta = other.center - self.center;
        let [ax, ay] = self.axes();
        let [bx, by] = other.axes();

        [ax, ay, bx, by].into_iter().all(|axis| {
            let ra = self.projected_radius(axis, ax, ay);
            let rb = other.projected_radius(axis, bx, by);
            delta.dot(axis).abs() < ra + rb - crate::EPSILON
        })
    }

    /// Returns `true` if `point` lies inside (or on the edge of) the box.
    pub fn contains_point(&self, point: Vec2) -> bool {
        let d = point - self.center;
        let [ax, ay] = self.axes();
        d.dot(ax).abs() <= self.half_extents.x + crate::EPSILON
            && d.dot(ay).abs() <= self.half_extents.y + crate::EPSILON
    }

    fn projected_radius(&self, axis: Vec2, own_x: Vec2, own_y: Vec2) -> f32 {
        self.half_extents.x * axis.dot(own_x).abs()
            + self.half_extents.y * axis.dot(own_y).abs()
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    use super::*;

    #[test]
    fn test_disjoint_boxes_do_not_overlap() {
        let a = Obb::rect(0.0, 0.0, 1.0, 1.0);
        let b = Obb::rect(5.0, 0.0, 1.0, 1.0);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_touching_edges_do_not_overlap() {
        let a = Obb::rect(0.0, 0.0, 5.0, 5.0);
        let b = Obb::rect(7.0, 0.0, 2.0, 1.0);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_nested_boxes_overlap() {
        let outer = Obb::rect(0.0, 0.0, 5.0, 5.0);
        let inner = Obb::rect(1.0, 1.0, 0.5, 0.5);
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn test_rotated_box_separated_only_on_its_own_axis() {
        // A diamond whose AABB would overlap the square, but whose edges don't.
        let square = Obb::rect(0.0, 0.0, 1.0, 1.0);
        let diamond = Obb::new(Vec2::new(2.0, 2.0), Vec2::new(1.0, 1.0), FRAC_PI_4);
        assert!(!square.overlaps(&diamond));

        let closer = Obb::new(Vec2::new(1.5, 1.5), Vec2::new(1.0, 1.0), FRAC_PI_4);
        assert!(square.overlaps(&closer));
    }

    #[test]
    fn test_shrunk_keeps_center_and_rotation() {
        let b = Obb::new(Vec2::new(3.0, 4.0), Vec2::new(10.0, 2.0), 0.5).shrunk(0.1);
        assert_eq!(b.center, Vec2::new(3.0, 4.0));
        assert!((b.half_extents.x - 9.0).abs() < 1e-5);
        assert!((b.half_extents.y - 1.8).abs() < 1e-5);
        assert_eq!(b.rotation, 0.5);
    }

    #[test]
    fn test_shrink_separates_boxes_sharing_a_wall_with_slack() {
        // Slightly interpenetrating neighbors, as happens at a shared connector.
        let a = Obb::rect(0.0, 0.0, 5.0, 5.0);
        let b = Obb::rect(6.9, 0.0, 2.0, 1.0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&b.shrunk(0.1)));
    }

    #[test]
    fn test_transformed_moves_center_and_adds_rotation() {
        let local = Obb::rect(2.0, 0.0, 2.0, 1.0);
        let world = local.transformed(Pose::at(10.0, 0.0, FRAC_PI_2));
        assert!(world.center.distance(Vec2::new(10.0, 2.0)) < 1e-5);
        assert!((world.rotation - FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_contains_point() {
        let b = Obb::new(Vec2::ZERO, Vec2::new(2.0, 1.0), FRAC_PI_2);
        assert!(b.contains_point(Vec2::new(0.0, 1.9)));
        assert!(!b.contains_point(Vec2::new(1.9, 0.0)));
    }
}
