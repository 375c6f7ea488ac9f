//! Poses and connector alignment.

use std::f32::consts::{PI, TAU};
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Pose
// ---------------------------------------------------------------------------

/// A position and an orientation in the dungeon plane.
///
/// For a connection point, `rotation` is the direction of its *outward*
/// axis: the way you would walk to leave the room through it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec2,
    /// Radians, counter-clockwise from +X. Kept in `(-PI, PI]`.
    #[serde(default)]
    pub rotation: f32,
}

impl Pose {
    /// The identity pose: origin, facing +X.
    pub const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        rotation: 0.0,
    };

    pub fn new(position: Vec2, rotation: f32) -> Self {
        Self {
            position,
            rotation: normalize_angle(rotation),
        }
    }

    /// Shorthand for `Pose::new(Vec2::new(x, y), rotation)`.
    pub fn at(x: f32, y: f32, rotation: f32) -> Self {
        Self::new(Vec2::new(x, y), rotation)
    }

    /// Unit vector along the outward axis.
    pub fn forward(&self) -> Vec2 {
        Vec2::from_angle(self.rotation)
    }

    /// Maps a point from this pose's local frame into the parent frame.
    pub fn transform_point(&self, local: Vec2) -> Vec2 {
        self.position + self.forward().rotate(local)
    }

    /// Maps a pose expressed in this pose's local frame into the parent frame.
    pub fn compose(&self, local: Pose) -> Pose {
        Pose::new(
            self.transform_point(local.position),
            self.rotation + local.rotation,
        )
    }

    /// Returns `true` if both poses occupy the same spot with the same heading.
    pub fn approx_eq(&self, other: &Pose) -> bool {
        self.position.distance(other.position) < crate::EPSILON
            && angle_between(self.rotation, other.rotation) < crate::EPSILON
    }

    /// Returns `true` if the two outward axes point in opposite directions.
    pub fn faces(&self, other: &Pose) -> bool {
        angle_between(self.rotation, other.rotation + PI) < crate::EPSILON
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.2}, {:.2}) @ {:.1}°",
            self.position.x,
            self.position.y,
            self.rotation.to_degrees()
        )
    }
}

/// Wraps an angle into `(-PI, PI]`.
pub fn normalize_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI { wrapped - TAU } else { wrapped }
}

fn angle_between(a: f32, b: f32) -> f32 {
    normalize_angle(a - b).abs()
}

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

/// Computes the pose an entity must take so that its connector `child_local`
/// (expressed in the entity's own frame) sits exactly on `parent_world` and
/// faces it.
///
/// The rotation makes the two outward axes anti-parallel; the translation
/// then makes the two connector positions coincide. This is a rigid
/// transform applied in one step, there is no interpolation.
///
/// ```
/// use delve_geometry::{align_to, Pose};
/// use std::f32::consts::PI;
///
/// // Parent connector on the east wall, facing east.
/// let parent = Pose::at(5.0, 0.0, 0.0);
/// // Child connector on its own west wall, facing west.
/// let child = Pose::at(-2.0, 0.0, PI);
///
/// let entity = align_to(parent, child);
/// assert!(entity.compose(child).position.distance(parent.position) < 1e-4);
/// assert!(entity.compose(child).faces(&parent));
/// ```
pub fn align_to(parent_world: Pose, child_local: Pose) -> Pose {
    let rotation = normalize_angle(parent_world.rotation + PI - child_local.rotation);
    let offset = Vec2::from_angle(rotation).rotate(child_local.position);
    Pose::new(parent_world.position - offset, rotation)
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    #[test]
    fn test_normalize_angle_wraps_into_half_open_range() {
        assert!((normalize_angle(3.0 * PI).abs() - PI).abs() < 1e-5);
        assert!((normalize_angle(-PI).abs() - PI).abs() < 1e-5);
        assert!(normalize_angle(TAU).abs() < 1e-5);
        assert!((normalize_angle(-FRAC_PI_2) + FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_transform_point_rotates_then_translates() {
        let pose = Pose::at(10.0, 0.0, FRAC_PI_2);
        let p = pose.transform_point(Vec2::new(1.0, 0.0));
        assert!(p.distance(Vec2::new(10.0, 1.0)) < 1e-5);
    }

    #[test]
    fn test_compose_adds_rotations() {
        let outer = Pose::at(0.0, 0.0, FRAC_PI_2);
        let inner = Pose::at(2.0, 0.0, FRAC_PI_2);
        let world = outer.compose(inner);
        assert!(world.position.distance(Vec2::new(0.0, 2.0)) < 1e-5);
        assert!((world.rotation.abs() - PI).abs() < 1e-5);
    }

    #[test]
    fn test_align_to_straight_east() {
        let parent = Pose::at(5.0, 0.0, 0.0);
        let child = Pose::at(-2.0, 0.0, PI);
        let entity = align_to(parent, child);
        assert!(entity.position.distance(Vec2::new(7.0, 0.0)) < 1e-5);
        assert!(entity.rotation.abs() < 1e-5);
    }

    #[test]
    fn test_align_to_flips_entity_when_child_connector_faces_parent_direction() {
        // The child's connector faces east in its own frame, so the entity
        // has to turn around to present it to an east-facing parent.
        let parent = Pose::at(5.0, 0.0, 0.0);
        let child = Pose::at(2.0, 0.0, 0.0);
        let entity = align_to(parent, child);
        assert!(entity.position.distance(Vec2::new(7.0, 0.0)) < 1e-4);
        assert!((entity.rotation.abs() - PI).abs() < 1e-5);
        let joined = entity.compose(child);
        assert!(joined.position.distance(parent.position) < 1e-4);
        assert!(joined.faces(&parent));
    }

    #[test]
    fn test_align_to_arbitrary_angles_coincide_and_face() {
        for (i, parent_rot) in [0.3_f32, 1.9, -2.4, PI].iter().enumerate() {
            let parent = Pose::at(3.0 + i as f32, -1.5, *parent_rot);
            let child = Pose::at(-1.0, 4.0, 0.7 * i as f32);
            let joined = align_to(parent, child).compose(child);
            assert!(joined.position.distance(parent.position) < 1e-4);
            assert!(joined.faces(&parent), "parent rotation {parent_rot}");
        }
    }

    #[test]
    fn test_pose_display() {
        assert_eq!(Pose::at(1.0, 2.0, 0.0).to_string(), "(1.00, 2.00) @ 0.0°");
    }
}
