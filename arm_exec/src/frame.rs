//! # Frame Transform
//!
//! Two frames are used throughout the arm software:
//!
//! - World (W): defined by the fiducial marker board, the frame in which boxes, groups and user
//!   positions are given.
//! - Arm (A): the arm's own frame, origin at the base joint, Z up.
//!
//! Both frames share a vertical Z axis, so the transform between them is a rotation about Z
//! followed by a translation:
//!
//! ```text
//! p_w = Rz(rotation_offset) * p_a + translation
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Rigid transform from the arm frame into the world frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameTransform {
    /// Rotation of the arm frame about the world Z axis.
    ///
    /// Units: radians, in the range (-pi, pi]
    pub rotation_offset_rad: f64,

    /// Position of the arm frame's origin in the world frame.
    ///
    /// Units: meters
    pub translation_m: Vector3<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FrameTransform {
    pub fn new(rotation_offset_rad: f64, translation_m: Vector3<f64>) -> Self {
        Self {
            rotation_offset_rad,
            translation_m,
        }
    }

    /// The rotation part of the transform.
    pub fn rotation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.rotation_offset_rad)
    }

    /// The transform as an isometry mapping arm frame points into the world frame.
    pub fn isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.translation_m), self.rotation())
    }

    /// Express a point given in the arm frame in the world frame.
    pub fn arm_to_world(&self, point_m_a: &Point3<f64>) -> Point3<f64> {
        self.isometry().transform_point(point_m_a)
    }

    /// Express a point given in the world frame in the arm frame.
    pub fn world_to_arm(&self, point_m_w: &Point3<f64>) -> Point3<f64> {
        self.isometry().inverse_transform_point(point_m_w)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_round_trip() {
        let transform = FrameTransform::new(2.3, Vector3::new(0.4, -0.15, 0.02));

        for p in [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.2, 0.1, 0.05),
            Point3::new(-1.5, 3.0, -0.7),
        ]
        .iter()
        {
            let there = transform.arm_to_world(p);
            assert!((transform.world_to_arm(&there) - p).norm() < 1e-12);

            let back = transform.world_to_arm(p);
            assert!((transform.arm_to_world(&back) - p).norm() < 1e-12);
        }
    }

    #[test]
    fn test_quarter_turn() {
        let transform =
            FrameTransform::new(std::f64::consts::FRAC_PI_2, Vector3::new(1.0, 0.0, 0.5));

        // Arm X maps onto world Y, then gets shifted by the translation
        let p_w = transform.arm_to_world(&Point3::new(0.2, 0.0, 0.0));
        assert!((p_w - Point3::new(1.0, 0.2, 0.5)).norm() < 1e-12);
    }
}
