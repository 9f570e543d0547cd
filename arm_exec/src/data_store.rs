//! # Data Store
//!
//! All state held by the arm executable between requests. The store is owned by the main loop and
//! handed out by mutable reference, so only one cycle can run at a time.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::{
    eqpt::{cam::CamImage, servo::ServoCommand, vision::CameraGeometry},
    program::{Group, Instruction, ProgramData},
};
use log::info;
use serde::Serialize;

use crate::{
    box_registry::BoxRegistry,
    calib::{Calibration, CalibrationError, FrameCalibrator},
    compiler::{self, CompileError, MoveChain},
    kin::{JointAngles, Kinematics},
    vision::{Vision, VisionError},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
pub struct DataStore {
    /// Number of cycles successfully completed
    pub num_cycles: u64,

    /// Joint angles the arm is at, or will be at once the current queue has been executed.
    pub joint_angles: JointAngles,

    /// The last successful calibration, `None` until the first one.
    pub calibration: Option<Calibration>,

    /// Boxes found in the last calibration image
    pub registry: BoxRegistry,

    /// Detection overlay of the last calibration image
    pub overlay: Option<CamImage>,

    /// The last compiled command queue
    pub queue: Vec<ServoCommand>,

    calibrator: FrameCalibrator,

    geometry: CameraGeometry,
}

/// Summary of one calibrate-detect-compile cycle, archived once per cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub time_s: f64,
    pub rotation_offset_rad: f64,
    pub translation_x_m: f64,
    pub translation_y_m: f64,
    pub translation_z_m: f64,
    pub gripper_x_m_w: f64,
    pub gripper_y_m_w: f64,
    pub gripper_z_m_w: f64,
    pub num_boxes: usize,
    pub num_cmds: usize,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Errors which end a cycle early.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("Calibration failed: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("Box detection failed: {0}")]
    Detection(VisionError),
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Create a new store with the arm at home and no calibration.
    pub fn new(kin: &dyn Kinematics, calibrator: FrameCalibrator, geometry: CameraGeometry) -> Self {
        Self {
            num_cycles: 0,
            joint_angles: kin.home_joint_angles(),
            calibration: None,
            registry: BoxRegistry::default(),
            overlay: None,
            queue: Vec::new(),
            calibrator,
            geometry,
        }
    }

    /// Run a full cycle on a new image: calibrate, detect boxes and compile the program.
    ///
    /// Results are only committed once every step has succeeded, a failed cycle leaves the store
    /// as it was.
    pub fn calibrate_and_compile(
        &mut self,
        image: &CamImage,
        program: &ProgramData,
        vision: &mut dyn Vision,
        kin: &dyn Kinematics,
    ) -> Result<CycleReport, CycleError> {
        let calibration = self
            .calibrator
            .calibrate(image, &self.joint_angles, vision, kin)?;

        let mut registry = BoxRegistry::default();
        let overlay = registry
            .detect(vision, image, &calibration.pose, &self.geometry)
            .map_err(CycleError::Detection)?;

        let mut chain = MoveChain {
            joint_angles: self.joint_angles,
            reference_point_m_w: calibration.gripper_pos_m_w,
        };
        let queue = compiler::compile(
            &program.instructions,
            &program.groups,
            &registry,
            &calibration.transform,
            &mut chain,
            kin,
        );

        let report = CycleReport {
            cycle: self.num_cycles,
            time_s: util::session::get_elapsed_seconds(),
            rotation_offset_rad: calibration.transform.rotation_offset_rad,
            translation_x_m: calibration.transform.translation_m.x,
            translation_y_m: calibration.transform.translation_m.y,
            translation_z_m: calibration.transform.translation_m.z,
            gripper_x_m_w: calibration.gripper_pos_m_w.x,
            gripper_y_m_w: calibration.gripper_pos_m_w.y,
            gripper_z_m_w: calibration.gripper_pos_m_w.z,
            num_boxes: registry.len(),
            num_cmds: queue.len(),
        };

        // Commit
        self.num_cycles += 1;
        self.joint_angles = chain.joint_angles;
        self.calibration = Some(calibration);
        self.registry = registry;
        self.overlay = Some(overlay);
        self.queue = queue;

        info!(
            "Cycle {} complete: {} boxes, {} commands",
            report.cycle, report.num_boxes, report.num_cmds
        );

        Ok(report)
    }

    /// Compile a script against the current calibration and boxes.
    ///
    /// The new queue replaces the stored one.
    pub fn compile_only(
        &mut self,
        script: &[Instruction],
        groups: &[Group],
        kin: &dyn Kinematics,
    ) -> Result<&[ServoCommand], CompileError> {
        let calibration = self
            .calibration
            .as_ref()
            .ok_or(CompileError::NotCalibrated)?;

        let mut chain = MoveChain {
            joint_angles: self.joint_angles,
            reference_point_m_w: calibration.gripper_pos_m_w,
        };

        self.queue = compiler::compile(
            script,
            groups,
            &self.registry,
            &calibration.transform,
            &mut chain,
            kin,
        );
        self.joint_angles = chain.joint_angles;

        info!("Recompiled {} commands", self.queue.len());

        Ok(&self.queue)
    }

    /// The last compiled queue.
    pub fn queue(&self) -> &[ServoCommand] {
        &self.queue
    }

    /// True once an image has been successfully processed.
    pub fn has_image(&self) -> bool {
        self.overlay.is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::{
        camera_geometry, camera_pose, detected_box, marker_layout, test_image, MockVision,
        StubKinematics,
    };
    use nalgebra::Point3;
    use serde_json::json;

    fn store(kin: &StubKinematics) -> DataStore {
        DataStore::new(
            kin,
            FrameCalibrator::new(marker_layout(), kin),
            camera_geometry(),
        )
    }

    fn program() -> ProgramData {
        ProgramData {
            groups: vec![],
            instructions: vec![
                Instruction::new("ungrip", json!({})),
                Instruction::new("go_nearest_box", json!({})),
                Instruction::new("grip", json!({})),
                Instruction::new("go_box", json!({"box_id": 2})),
            ],
        }
    }

    #[test]
    fn test_compile_before_calibration() {
        let kin = StubKinematics::default();
        let mut ds = store(&kin);

        assert_eq!(
            ds.compile_only(&program().instructions, &[], &kin),
            Err(CompileError::NotCalibrated)
        );
        assert!(ds.queue().is_empty());
        assert!(!ds.has_image());
    }

    #[test]
    fn test_full_cycle() {
        let kin = StubKinematics::default();
        let mut ds = store(&kin);

        // Identity calibration: camera sees the gripper exactly where the arm has it
        let mut vision = MockVision::new(
            Some(camera_pose(kin.home_m_a, 0.0)),
            vec![detected_box(1, 0.15, 0.0, 0.0), detected_box(2, 0.25, 0.1, 0.0)],
        );

        let report = ds
            .calibrate_and_compile(&test_image(), &program(), &mut vision, &kin)
            .unwrap();

        assert_eq!(report.cycle, 0);
        assert_eq!(report.num_boxes, 2);
        assert_eq!(report.num_cmds, 5);
        assert_eq!(ds.num_cycles, 1);
        assert!(ds.has_image());
        assert!(report.translation_x_m.abs() < 1e-12);

        // go_box 2, grip, nearest box (box 2 itself), ungrip, initial
        assert_eq!(
            ds.queue()[0],
            ServoCommand::Move(kin.joint_angles_to_servo_angles(&kin.solve_move(
                &Point3::new(0.25, 0.1, 0.0),
                &ds.calibration.as_ref().unwrap().transform,
                &kin.home_joint_angles(),
                true
            )))
        );
        assert_eq!(ds.queue()[1], ServoCommand::Grip(true));
        assert_eq!(ds.queue()[2], ds.queue()[0]);
        assert_eq!(ds.queue()[3], ServoCommand::Grip(false));
        assert_eq!(ds.queue()[4], ServoCommand::Initial);

        // The queue ends at home
        assert_eq!(ds.joint_angles, kin.home_joint_angles());

        // Recompiling without new images uses the stored boxes
        let queue = ds
            .compile_only(
                &[Instruction::new("go_box", json!({"box_id": 1}))],
                &[],
                &kin,
            )
            .unwrap()
            .to_vec();
        assert_eq!(queue.len(), 2);
        assert_eq!(ds.queue(), &queue[..]);
        assert_eq!(vision.num_detect_requests, 1);
    }

    #[test]
    fn test_failed_cycles_leave_no_trace() {
        let kin = StubKinematics::default();
        let mut ds = store(&kin);

        let mut vision = MockVision::new(
            Some(camera_pose(kin.home_m_a, 0.0)),
            vec![detected_box(2, 0.25, 0.1, 0.0)],
        );
        ds.calibrate_and_compile(&test_image(), &program(), &mut vision, &kin)
            .unwrap();

        let calibration = ds.calibration.clone();
        let registry = ds.registry.clone();
        let queue = ds.queue.clone();

        // Board out of view
        let mut no_board = MockVision::new(None, vec![]);
        assert!(matches!(
            ds.calibrate_and_compile(&test_image(), &program(), &mut no_board, &kin),
            Err(CycleError::Calibration(CalibrationError::BoardNotFound))
        ));
        assert_eq!(no_board.num_detect_requests, 0);

        // Board found but the detector fails after the pose was estimated
        let mut bad_detector = MockVision::new(
            Some(camera_pose(Point3::new(0.5, 0.5, 0.1), 1.0)),
            vec![detected_box(9, 0.0, 0.0, 0.0)],
        );
        bad_detector.detect_error = Some("detector crashed".into());
        assert!(matches!(
            ds.calibrate_and_compile(&test_image(), &program(), &mut bad_detector, &kin),
            Err(CycleError::Detection(_))
        ));

        assert_eq!(ds.calibration, calibration);
        assert_eq!(ds.registry, registry);
        assert_eq!(ds.queue, queue);
        assert_eq!(ds.num_cycles, 1);
    }
}
