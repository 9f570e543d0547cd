//! # Kinematics Module
//!
//! The kinematics port describes everything the calibration and compilation pipeline needs to know
//! about the arm's geometry: where the gripper is for a given set of joint angles, how to reach a
//! target, and how joint angles map onto the actuator angles understood by the servo transport.
//!
//! [`ArmKinematics`] implements the port for the base-yaw, two-link and wrist arm the software
//! drives.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod arm_kin;
mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::servo::ServoAngles;
use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::frame::FrameTransform;

pub use arm_kin::ArmKinematics;
pub use params::Params;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// The number of joints of the arm, excluding the gripper.
pub const NUM_JOINTS: usize = 4;

/// Index of the base yaw joint.
pub const BASE: usize = 0;

/// Index of the shoulder pitch joint.
pub const SHOULDER: usize = 1;

/// Index of the elbow pitch joint.
pub const ELBOW: usize = 2;

/// Index of the wrist pitch joint.
pub const WRIST: usize = 3;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Angles of each joint of the arm, ordered base, shoulder, elbow, wrist.
///
/// The base angle is measured about the arm frame's Z axis from its X axis. The shoulder angle is
/// measured from the horizontal, the elbow and wrist angles are relative to the previous link.
///
/// Units: radians
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JointAngles(pub [f64; NUM_JOINTS]);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible errors that can occur in the kinematics.
#[derive(Debug, thiserror::Error)]
pub enum KinError {
    #[error("Expected {expected} servo angles but got {found}")]
    WrongNumServos { expected: usize, found: usize },
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// The kinematics of the arm.
pub trait Kinematics {
    /// Joint angles of the arm's home configuration, the one the arm returns to on an `Initial`
    /// command.
    fn home_joint_angles(&self) -> JointAngles;

    /// Compute the position of the gripper's grab point in the arm frame and the orientation of the
    /// gripper (and the camera rigidly attached to it) for the given joint angles.
    fn forward_kinematics(&self, joint_angles: &JointAngles) -> (Point3<f64>, UnitQuaternion<f64>);

    /// Convert the camera position measured in the world frame into the position of the gripper's
    /// grab point in the world frame.
    ///
    /// `board_yaw_rad` is the yaw of the camera in the world frame as seen by the vision process,
    /// the joint angles provide the gripper's pitch.
    fn camera_to_gripper(
        &self,
        camera_pos_m_w: &Point3<f64>,
        joint_angles: &JointAngles,
        board_yaw_rad: f64,
    ) -> Point3<f64>;

    /// Solve for the joint angles which put the gripper at `target_m_w`.
    ///
    /// Targets outside the arm's reach are brought back into it, so a solution is always returned.
    /// When several solutions exist the one closest to `current` is chosen. If `is_final` is false
    /// the arm should stop short of the target, approaching it from above.
    fn solve_move(
        &self,
        target_m_w: &Point3<f64>,
        transform: &FrameTransform,
        current: &JointAngles,
        is_final: bool,
    ) -> JointAngles;

    /// Convert joint angles into the actuator angles sent to the servos.
    fn joint_angles_to_servo_angles(&self, joint_angles: &JointAngles) -> ServoAngles;

    /// Convert actuator angles back into joint angles.
    fn servo_angles_to_joint_angles(
        &self,
        servo_angles: &ServoAngles,
    ) -> Result<JointAngles, KinError>;

    /// Find the translation of the arm frame in the world frame given one point known in both
    /// frames and the rotation between them.
    ///
    /// With the rotation already known a single point pair fully determines the translation, no
    /// fitting is needed.
    fn solve_translation(
        &self,
        point_m_w: &Point3<f64>,
        point_m_a: &Point3<f64>,
        rotation_offset_rad: f64,
    ) -> Vector3<f64> {
        let rot = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), rotation_offset_rad);
        point_m_w - rot.transform_point(point_m_a)
    }
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl JointAngles {
    pub fn base(&self) -> f64 {
        self.0[BASE]
    }

    pub fn shoulder(&self) -> f64 {
        self.0[SHOULDER]
    }

    pub fn elbow(&self) -> f64 {
        self.0[ELBOW]
    }

    pub fn wrist(&self) -> f64 {
        self.0[WRIST]
    }

    /// Absolute pitch of the gripper above the horizontal.
    pub fn gripper_pitch(&self) -> f64 {
        self.shoulder() + self.elbow() + self.wrist()
    }
}
