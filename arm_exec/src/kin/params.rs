//! Parameters structure for the arm kinematics

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::NUM_JOINTS;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the arm kinematics.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Params {
    // ---- GEOMETRY ----
    /// Height of the shoulder joint above the arm frame's origin.
    ///
    /// Units: meters.
    pub base_height_m: f64,

    /// The length of the upper arm, shoulder to elbow.
    ///
    /// Units: meters.
    pub shoulder_length_m: f64,

    /// The length of the forearm, elbow to wrist.
    ///
    /// Units: meters.
    pub elbow_length_m: f64,

    /// Distance from the wrist joint to the gripper's grab point.
    ///
    /// Units: meters.
    pub tool_length_m: f64,

    /// Position of the camera's optical centre relative to the grab point, in the gripper frame
    /// (X along the gripper, Z up when the gripper is level).
    ///
    /// Units: meters.
    pub camera_offset_m: [f64; 3],

    /// Height above the target at which non-final moves stop.
    ///
    /// Units: meters.
    pub approach_height_m: f64,

    // ---- CAPABILITIES ----
    /// Maximum joint position (highest positive value)
    ///
    /// Units: radians
    pub max_abs_pos_rad: [f64; NUM_JOINTS],

    /// Minimum joint position (lowest negative value)
    ///
    /// Units: radians
    pub min_abs_pos_rad: [f64; NUM_JOINTS],

    /// Home position of the arm's joints.
    ///
    /// Units: radians
    pub home_pos_rad: [f64; NUM_JOINTS],

    // ---- SERVOS ----
    /// Servo angle commanded when the joint is at `min_abs_pos_rad`.
    ///
    /// Units: degrees
    pub servo_at_min_deg: [f64; NUM_JOINTS],

    /// Servo angle commanded when the joint is at `max_abs_pos_rad`.
    ///
    /// Units: degrees
    pub servo_at_max_deg: [f64; NUM_JOINTS],
}
