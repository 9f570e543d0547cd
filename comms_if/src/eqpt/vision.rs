//! # Vision Equipment Communications Module
//!
//! Types exchanged with the external vision process, which estimates the pose of the gripper
//! camera relative to the fiducial marker board and detects the boxes to pick.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Matrix3, Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::cam::CamFrame;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Physical layout of the marker board which defines the world (W) frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerLayout {
    /// Side length of one marker.
    ///
    /// Units: meters
    pub marker_size_m: f64,

    /// Gap between two neighbouring markers.
    ///
    /// Units: meters
    pub marker_spacing_m: f64,

    /// Number of markers along the board's X and Y axes.
    pub num_markers: [u32; 2],
}

/// Intrinsic geometry of the gripper camera, used by the detector to project boxes back into the
/// world frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraGeometry {
    /// Row-major 3x3 camera matrix (fx, 0, cx; 0, fy, cy; 0, 0, 1).
    pub camera_matrix: [[f64; 3]; 3],

    /// Lens distortion coefficients (k1, k2, p1, p2, k3).
    pub dist_coeffs: Vec<f64>,
}

/// Pose of the gripper camera recovered from one image of the marker board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    /// Position of the camera's optical centre in the world frame.
    ///
    /// Units: meters
    pub position_m_w: Point3<f64>,

    /// Yaw of the camera about the world Z axis, i.e. the angle between the world X axis and the
    /// direction the arm is reaching in.
    ///
    /// Units: radians
    pub board_yaw_rad: f64,

    /// Rotation of the camera in the world frame.
    pub rotation: Matrix3<f64>,

    /// Rodrigues rotation vector of the board in the camera frame.
    pub rvec: Vector3<f64>,

    /// Translation of the board in the camera frame.
    ///
    /// Units: meters
    pub tvec: Vector3<f64>,
}

/// A box found by the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedBox {
    /// Identifier of the box, unique within a single detection pass only.
    pub id: u32,

    /// Point at which the gripper should close on the box, in the world frame.
    ///
    /// Units: meters
    pub grab_point_m_w: Point3<f64>,

    /// Outline of the box in the source image, for overlays.
    ///
    /// Units: pixels
    #[serde(default)]
    pub corners_px: Vec<[f64; 2]>,

    /// Yaw of the box about the world Z axis.
    ///
    /// Units: radians
    #[serde(default)]
    pub yaw_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Requests that can be sent to the vision process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VisionReq {
    /// Estimate the camera pose from the marker board in the frame.
    EstimatePose {
        frame: CamFrame,
        layout: MarkerLayout,
    },

    /// Detect boxes in the frame, given the camera pose previously estimated from it.
    DetectBoxes {
        frame: CamFrame,
        pose: CameraPose,
        geometry: CameraGeometry,
    },
}

/// Replies that can be sent by the vision process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VisionRep {
    /// The estimated pose, or `None` if the board isn't visible in the frame.
    Pose(Option<CameraPose>),

    /// Detected boxes along with the annotated overlay image.
    Boxes {
        boxes: Vec<DetectedBox>,
        overlay: CamFrame,
    },

    /// The vision process could not handle the request.
    Error(String),
}
