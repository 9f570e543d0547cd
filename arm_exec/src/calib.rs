//! # Frame Calibration
//!
//! Calibration finds the [`FrameTransform`] between the arm frame and the world frame defined by
//! the marker board, from a single image taken by the gripper camera.
//!
//! The image must be taken with the arm in its home configuration. Every compiled command queue
//! ends with an `Initial` command, so this holds whenever the arm has finished executing the last
//! queue it was sent.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::{
    cam::CamImage,
    vision::{CameraPose, MarkerLayout},
};
use log::{debug, info};
use nalgebra::Point3;
use util::maths::wrap_pi;

use crate::{
    frame::FrameTransform,
    kin::{JointAngles, Kinematics},
    vision::{Vision, VisionError},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Calibrates the arm frame against the marker board.
#[derive(Debug, Clone)]
pub struct FrameCalibrator {
    layout: MarkerLayout,

    /// Position of the gripper in the arm frame when the arm is at home.
    home_gripper_m_a: Point3<f64>,
}

/// The result of a successful calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub transform: FrameTransform,

    /// Position of the gripper in the world frame at the time the image was taken.
    pub gripper_pos_m_w: Point3<f64>,

    /// The camera pose the calibration was computed from.
    pub pose: CameraPose,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("The marker board could not be found in the image")]
    BoardNotFound,

    #[error("Could not estimate the camera pose: {0}")]
    Vision(VisionError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FrameCalibrator {
    /// Create a new calibrator for the given marker board.
    pub fn new(layout: MarkerLayout, kin: &dyn Kinematics) -> Self {
        let (home_gripper_m_a, _) = kin.forward_kinematics(&kin.home_joint_angles());

        Self {
            layout,
            home_gripper_m_a,
        }
    }

    pub fn layout(&self) -> &MarkerLayout {
        &self.layout
    }

    pub fn home_gripper_m_a(&self) -> &Point3<f64> {
        &self.home_gripper_m_a
    }

    /// Compute the calibration from an image taken with the arm at `joint_angles`.
    ///
    /// Nothing is modified on failure, the caller decides what to commit.
    pub fn calibrate(
        &self,
        image: &CamImage,
        joint_angles: &JointAngles,
        vision: &mut dyn Vision,
        kin: &dyn Kinematics,
    ) -> Result<Calibration, CalibrationError> {
        let pose = vision
            .estimate_pose(image, &self.layout)
            .map_err(CalibrationError::Vision)?
            .ok_or(CalibrationError::BoardNotFound)?;

        let gripper_pos_m_w =
            kin.camera_to_gripper(&pose.position_m_w, joint_angles, pose.board_yaw_rad);

        // Direction the arm reaches in at home, in its own frame
        let arm_angle_rad = self.home_gripper_m_a.y.atan2(self.home_gripper_m_a.x);
        let rotation_offset_rad = wrap_pi(pose.board_yaw_rad - arm_angle_rad);

        info!(
            "Board yaw: {:.2} deg, arm angle: {:.2} deg",
            pose.board_yaw_rad.to_degrees(),
            arm_angle_rad.to_degrees()
        );

        let translation_m =
            kin.solve_translation(&gripper_pos_m_w, &self.home_gripper_m_a, rotation_offset_rad);

        let transform = FrameTransform::new(rotation_offset_rad, translation_m);

        debug!(
            "Calibrated {:?}, gripper at {:?} in the world frame",
            transform, gripper_pos_m_w
        );

        Ok(Calibration {
            transform,
            gripper_pos_m_w,
            pose,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        kin::ArmKinematics,
        test_utils::{arm_params, camera_pose, marker_layout, test_image, MockVision, StubKinematics},
    };
    use nalgebra::Vector3;

    #[test]
    fn test_board_not_found() {
        let kin = StubKinematics::default();
        let calibrator = FrameCalibrator::new(marker_layout(), &kin);
        let mut vision = MockVision::new(None, vec![]);

        assert!(matches!(
            calibrator.calibrate(&test_image(), &kin.home_joint_angles(), &mut vision, &kin),
            Err(CalibrationError::BoardNotFound)
        ));
        assert_eq!(vision.num_pose_requests, 1);
    }

    #[test]
    fn test_recovers_transform() {
        let kin = StubKinematics {
            home_m_a: Point3::new(0.1, 0.1, 0.08),
        };
        let calibrator = FrameCalibrator::new(marker_layout(), &kin);

        let truth = FrameTransform::new(0.5, Vector3::new(0.3, 0.1, 0.0));

        // The camera (at the grab point for the stub) faces along the arm's home reach direction
        let camera_m_w = truth.arm_to_world(&kin.home_m_a);
        let board_yaw = 0.5 + std::f64::consts::FRAC_PI_4;
        let mut vision = MockVision::new(Some(camera_pose(camera_m_w, board_yaw)), vec![]);

        let calib = calibrator
            .calibrate(&test_image(), &kin.home_joint_angles(), &mut vision, &kin)
            .unwrap();

        assert!((calib.transform.rotation_offset_rad - 0.5).abs() < 1e-12);
        assert!((calib.transform.translation_m - truth.translation_m).norm() < 1e-12);
        assert!((calib.gripper_pos_m_w - camera_m_w).norm() < 1e-12);

        // The home gripper position maps onto where the camera saw it
        assert!(
            (calib.transform.arm_to_world(calibrator.home_gripper_m_a()) - calib.gripper_pos_m_w)
                .norm()
                < 1e-12
        );
    }

    #[test]
    fn test_rotation_offset_wraps() {
        let kin = StubKinematics {
            home_m_a: Point3::new(-0.2, 0.0, 0.1),
        };
        let calibrator = FrameCalibrator::new(marker_layout(), &kin);

        // The arm reaches along pi at home, so the raw offset of -3 - pi must be wrapped
        let mut vision = MockVision::new(Some(camera_pose(Point3::origin(), -3.0)), vec![]);

        let calib = calibrator
            .calibrate(&test_image(), &kin.home_joint_angles(), &mut vision, &kin)
            .unwrap();

        let offset = calib.transform.rotation_offset_rad;
        assert!(offset > -std::f64::consts::PI && offset <= std::f64::consts::PI);
        assert!((offset - (std::f64::consts::TAU - 3.0 - std::f64::consts::PI)).abs() < 1e-12);
    }

    #[test]
    fn test_idempotent() {
        let kin = ArmKinematics::new(arm_params());
        let calibrator = FrameCalibrator::new(marker_layout(), &kin);
        let home = kin.home_joint_angles();

        let mut vision = MockVision::new(Some(camera_pose(Point3::new(0.4, 0.2, 0.3), 1.1)), vec![]);

        let first = calibrator
            .calibrate(&test_image(), &home, &mut vision, &kin)
            .unwrap();
        let second = calibrator
            .calibrate(&test_image(), &home, &mut vision, &kin)
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_arm_kinematics_calibration() {
        let kin = ArmKinematics::new(arm_params());
        let calibrator = FrameCalibrator::new(marker_layout(), &kin);
        let home = kin.home_joint_angles();

        let truth = FrameTransform::new(-2.0, Vector3::new(0.25, 0.4, 0.0));

        // Where the camera really is with the arm at home
        let (gripper_m_a, rot) = kin.forward_kinematics(&home);
        let camera_m_a = gripper_m_a + rot * Vector3::from(arm_params().camera_offset_m);
        let camera_m_w = truth.arm_to_world(&camera_m_a);
        let board_yaw = wrap_pi(truth.rotation_offset_rad + home.base());

        let mut vision = MockVision::new(Some(camera_pose(camera_m_w, board_yaw)), vec![]);

        let calib = calibrator
            .calibrate(&test_image(), &home, &mut vision, &kin)
            .unwrap();

        assert!((calib.transform.rotation_offset_rad - truth.rotation_offset_rad).abs() < 1e-9);
        assert!((calib.transform.translation_m - truth.translation_m).norm() < 1e-9);
    }
}
