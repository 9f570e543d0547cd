//! Test doubles for the kinematics and vision ports

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::{
    cam::CamImage,
    servo::ServoAngles,
    vision::{CameraGeometry, CameraPose, DetectedBox, MarkerLayout},
};
use image::{DynamicImage, RgbImage};
use nalgebra::{Matrix3, Point3, UnitQuaternion, Vector3};

use std::f64::consts::PI;

use crate::{
    frame::FrameTransform,
    kin::{self, JointAngles, KinError, Kinematics, NUM_JOINTS},
    vision::{Detection, Vision, VisionError},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Kinematics of an imaginary arm whose first three joint "angles" are the arm frame coordinates of
/// the gripper, in meters. The camera sits on the grab point and servo angles equal joint angles.
pub struct StubKinematics {
    pub home_m_a: Point3<f64>,
}

/// A vision port returning canned results.
#[derive(Default)]
pub struct MockVision {
    pub pose: Option<CameraPose>,
    pub boxes: Vec<DetectedBox>,

    /// If set detection fails with this message.
    pub detect_error: Option<String>,

    pub num_pose_requests: usize,
    pub num_detect_requests: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for StubKinematics {
    fn default() -> Self {
        Self {
            home_m_a: Point3::new(0.2, 0.0, 0.1),
        }
    }
}

impl Kinematics for StubKinematics {
    fn home_joint_angles(&self) -> JointAngles {
        JointAngles([self.home_m_a.x, self.home_m_a.y, self.home_m_a.z, 0.0])
    }

    fn forward_kinematics(&self, joint_angles: &JointAngles) -> (Point3<f64>, UnitQuaternion<f64>) {
        (
            Point3::new(joint_angles.0[0], joint_angles.0[1], joint_angles.0[2]),
            UnitQuaternion::identity(),
        )
    }

    fn camera_to_gripper(
        &self,
        camera_pos_m_w: &Point3<f64>,
        _joint_angles: &JointAngles,
        _board_yaw_rad: f64,
    ) -> Point3<f64> {
        *camera_pos_m_w
    }

    fn solve_move(
        &self,
        target_m_w: &Point3<f64>,
        transform: &FrameTransform,
        _current: &JointAngles,
        _is_final: bool,
    ) -> JointAngles {
        let p = transform.world_to_arm(target_m_w);
        JointAngles([p.x, p.y, p.z, 0.0])
    }

    fn joint_angles_to_servo_angles(&self, joint_angles: &JointAngles) -> ServoAngles {
        ServoAngles(joint_angles.0.to_vec())
    }

    fn servo_angles_to_joint_angles(
        &self,
        servo_angles: &ServoAngles,
    ) -> Result<JointAngles, KinError> {
        if servo_angles.0.len() != NUM_JOINTS {
            return Err(KinError::WrongNumServos {
                expected: NUM_JOINTS,
                found: servo_angles.0.len(),
            });
        }

        let mut joint_angles = JointAngles::default();
        joint_angles.0.copy_from_slice(&servo_angles.0);
        Ok(joint_angles)
    }
}

impl MockVision {
    pub fn new(pose: Option<CameraPose>, boxes: Vec<DetectedBox>) -> Self {
        Self {
            pose,
            boxes,
            ..Default::default()
        }
    }
}

impl Vision for MockVision {
    fn estimate_pose(
        &mut self,
        _image: &CamImage,
        _layout: &MarkerLayout,
    ) -> Result<Option<CameraPose>, VisionError> {
        self.num_pose_requests += 1;
        Ok(self.pose.clone())
    }

    fn detect_boxes(
        &mut self,
        image: &CamImage,
        _pose: &CameraPose,
        _geometry: &CameraGeometry,
    ) -> Result<Detection, VisionError> {
        self.num_detect_requests += 1;

        if let Some(ref e) = self.detect_error {
            return Err(VisionError::Remote(e.clone()));
        }

        Ok(Detection {
            boxes: self.boxes.clone(),
            overlay: image.clone(),
        })
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// A small blank image.
pub fn test_image() -> CamImage {
    CamImage::new(DynamicImage::ImageRgb8(RgbImage::new(8, 6)))
}

/// A camera pose with the given position and yaw in the world frame.
pub fn camera_pose(position_m_w: Point3<f64>, board_yaw_rad: f64) -> CameraPose {
    CameraPose {
        position_m_w,
        board_yaw_rad,
        rotation: Matrix3::identity(),
        rvec: Vector3::zeros(),
        tvec: Vector3::zeros(),
    }
}

/// A box with the given id and grab point.
pub fn detected_box(id: u32, x: f64, y: f64, z: f64) -> DetectedBox {
    DetectedBox {
        id,
        grab_point_m_w: Point3::new(x, y, z),
        corners_px: vec![],
        yaw_rad: 0.0,
    }
}

pub fn marker_layout() -> MarkerLayout {
    MarkerLayout {
        marker_size_m: 0.036,
        marker_spacing_m: 0.005,
        num_markers: [4, 3],
    }
}

pub fn camera_geometry() -> CameraGeometry {
    CameraGeometry {
        camera_matrix: [[600.0, 0.0, 320.0], [0.0, 600.0, 240.0], [0.0, 0.0, 1.0]],
        dist_coeffs: vec![0.0; 5],
    }
}

/// Parameters of a small desktop arm.
pub fn arm_params() -> kin::Params {
    kin::Params {
        base_height_m: 0.1,
        shoulder_length_m: 0.2,
        elbow_length_m: 0.15,
        tool_length_m: 0.05,
        camera_offset_m: [-0.03, 0.0, 0.04],
        approach_height_m: 0.05,
        max_abs_pos_rad: [PI; NUM_JOINTS],
        min_abs_pos_rad: [-PI; NUM_JOINTS],
        home_pos_rad: [0.0, 1.2, -1.9, -0.87],
        servo_at_min_deg: [0.0, 360.0, 0.0, 0.0],
        servo_at_max_deg: [360.0, 0.0, 360.0, 360.0],
    }
}
