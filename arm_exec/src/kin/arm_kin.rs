//! Kinematics of the base-yaw, two-link and wrist arm

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::FRAC_PI_2;

use comms_if::eqpt::servo::ServoAngles;
use log::{debug, trace};
use nalgebra::{Point3, UnitQuaternion, Vector3};
use util::maths::{clamp, get_ang_dist_2pi, lin_map, wrap_pi};

// Internal imports
use super::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Distances below this are treated as zero when solving.
///
/// Units: meters
const DIST_EPS_M: f64 = 1e-9;

/// Pitch of the gripper for final moves: straight down onto the target.
///
/// Units: radians
const FINAL_PITCH_RAD: f64 = -FRAC_PI_2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinematics of an arm made of a yawing base, a shoulder and elbow moving in a vertical plane, and
/// a pitching wrist carrying the gripper and the camera.
#[derive(Debug, Clone)]
pub struct ArmKinematics {
    params: Params,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmKinematics {
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Orientation of the gripper frame for the given yaw and pitch.
    fn gripper_rotation(yaw_rad: f64, pitch_rad: f64) -> UnitQuaternion<f64> {
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw_rad)
            * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -pitch_rad)
    }

    /// Solve the shoulder and elbow angles which put the wrist at the given horizontal and
    /// vertical distance from the shoulder.
    ///
    /// The target is limited to the annulus the two links can reach. Of the two elbow solutions the
    /// one whose shoulder angle is closest to `current_shoulder_rad` is returned.
    fn solve_two_link(
        &self,
        horizontal_distance_m: f64,
        vertical_distance_m: f64,
        current_shoulder_rad: f64,
    ) -> (f64, f64) {
        let l1 = self.params.shoulder_length_m;
        let l2 = self.params.elbow_length_m;

        let mut horizontal_distance_m = horizontal_distance_m;
        let mut vertical_distance_m = vertical_distance_m;

        let max_distance_m = l1 + l2;
        let min_distance_m = (l1 - l2).abs();
        let mut wrist_target_distance_m = horizontal_distance_m.hypot(vertical_distance_m);

        // Limit target distance to be within range of arm
        if wrist_target_distance_m > max_distance_m {
            horizontal_distance_m *= max_distance_m / wrist_target_distance_m;
            vertical_distance_m *= max_distance_m / wrist_target_distance_m;
            wrist_target_distance_m = max_distance_m;
        } else if wrist_target_distance_m < min_distance_m {
            if wrist_target_distance_m < DIST_EPS_M {
                horizontal_distance_m = min_distance_m;
                vertical_distance_m = 0.0;
            } else {
                horizontal_distance_m *= min_distance_m / wrist_target_distance_m;
                vertical_distance_m *= min_distance_m / wrist_target_distance_m;
            }
            wrist_target_distance_m = min_distance_m;
        }

        let cos_elbow = clamp(
            &((wrist_target_distance_m.powi(2) - l1.powi(2) - l2.powi(2)) / (2.0 * l1 * l2)),
            &-1.0,
            &1.0,
        );
        let elbow_mag_rad = cos_elbow.acos();
        let target_elevation_rad = vertical_distance_m.atan2(horizontal_distance_m);

        let solution = |elbow_rad: f64| {
            let shoulder_rad = target_elevation_rad
                - (l2 * elbow_rad.sin()).atan2(l1 + l2 * elbow_rad.cos());
            (shoulder_rad, elbow_rad)
        };

        let elbow_up = solution(-elbow_mag_rad);
        let elbow_down = solution(elbow_mag_rad);

        trace!(
            "Two link solutions: up {:?}, down {:?}, current shoulder {}",
            elbow_up,
            elbow_down,
            current_shoulder_rad
        );

        if get_ang_dist_2pi(elbow_up.0, current_shoulder_rad).abs()
            <= get_ang_dist_2pi(elbow_down.0, current_shoulder_rad).abs()
        {
            elbow_up
        } else {
            elbow_down
        }
    }

    /// Limit each joint to its allowed range.
    fn limit(&self, joint_angles: JointAngles) -> JointAngles {
        let mut limited = joint_angles;

        for i in 0..NUM_JOINTS {
            limited.0[i] = clamp(
                &joint_angles.0[i],
                &self.params.min_abs_pos_rad[i],
                &self.params.max_abs_pos_rad[i],
            );
        }

        limited
    }
}

impl Kinematics for ArmKinematics {
    fn home_joint_angles(&self) -> JointAngles {
        JointAngles(self.params.home_pos_rad)
    }

    fn forward_kinematics(&self, joint_angles: &JointAngles) -> (Point3<f64>, UnitQuaternion<f64>) {
        let shoulder_rad = joint_angles.shoulder();
        let forearm_rad = shoulder_rad + joint_angles.elbow();
        let pitch_rad = joint_angles.gripper_pitch();

        let horizontal_m = self.params.shoulder_length_m * shoulder_rad.cos()
            + self.params.elbow_length_m * forearm_rad.cos()
            + self.params.tool_length_m * pitch_rad.cos();
        let vertical_m = self.params.base_height_m
            + self.params.shoulder_length_m * shoulder_rad.sin()
            + self.params.elbow_length_m * forearm_rad.sin()
            + self.params.tool_length_m * pitch_rad.sin();

        let base_rad = joint_angles.base();

        (
            Point3::new(
                horizontal_m * base_rad.cos(),
                horizontal_m * base_rad.sin(),
                vertical_m,
            ),
            Self::gripper_rotation(base_rad, pitch_rad),
        )
    }

    fn camera_to_gripper(
        &self,
        camera_pos_m_w: &Point3<f64>,
        joint_angles: &JointAngles,
        board_yaw_rad: f64,
    ) -> Point3<f64> {
        let rot = Self::gripper_rotation(board_yaw_rad, joint_angles.gripper_pitch());

        camera_pos_m_w - rot * Vector3::from(self.params.camera_offset_m)
    }

    fn solve_move(
        &self,
        target_m_w: &Point3<f64>,
        transform: &FrameTransform,
        current: &JointAngles,
        is_final: bool,
    ) -> JointAngles {
        let mut target_m_a = transform.world_to_arm(target_m_w);

        if !is_final {
            target_m_a.z += self.params.approach_height_m;
        }

        let horizontal_m = target_m_a.x.hypot(target_m_a.y);

        // Directly above the base any yaw works, so keep the current one
        let base_rad = if horizontal_m < DIST_EPS_M {
            current.base()
        } else {
            target_m_a.y.atan2(target_m_a.x)
        };

        // With the gripper pointing down the wrist sits straight above the grab point
        let wrist_horizontal_m = horizontal_m - self.params.tool_length_m * FINAL_PITCH_RAD.cos();
        let wrist_vertical_m = target_m_a.z
            - self.params.tool_length_m * FINAL_PITCH_RAD.sin()
            - self.params.base_height_m;

        let (shoulder_rad, elbow_rad) =
            self.solve_two_link(wrist_horizontal_m, wrist_vertical_m, current.shoulder());

        let wrist_rad = wrap_pi(FINAL_PITCH_RAD - shoulder_rad - elbow_rad);

        let solution = self.limit(JointAngles([base_rad, shoulder_rad, elbow_rad, wrist_rad]));

        debug!(
            "Move to {:?} (arm frame {:?}, final: {}) solved as {:?}",
            target_m_w, target_m_a, is_final, solution
        );

        solution
    }

    fn joint_angles_to_servo_angles(&self, joint_angles: &JointAngles) -> ServoAngles {
        let p = &self.params;

        ServoAngles(
            (0..NUM_JOINTS)
                .map(|i| {
                    let pos_rad = clamp(
                        &joint_angles.0[i],
                        &p.min_abs_pos_rad[i],
                        &p.max_abs_pos_rad[i],
                    );
                    lin_map(
                        (p.min_abs_pos_rad[i], p.max_abs_pos_rad[i]),
                        (p.servo_at_min_deg[i], p.servo_at_max_deg[i]),
                        pos_rad,
                    )
                })
                .collect(),
        )
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

        let p = &self.params;
        let mut joint_angles = JointAngles::default();

        for (i, servo_deg) in servo_angles.0.iter().enumerate() {
            // Servos may be mounted reversed, so either end of the range can be the lower one
            let lo = p.servo_at_min_deg[i].min(p.servo_at_max_deg[i]);
            let hi = p.servo_at_min_deg[i].max(p.servo_at_max_deg[i]);

            joint_angles.0[i] = lin_map(
                (p.servo_at_min_deg[i], p.servo_at_max_deg[i]),
                (p.min_abs_pos_rad[i], p.max_abs_pos_rad[i]),
                clamp(servo_deg, &lo, &hi),
            );
        }

        Ok(joint_angles)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::arm_params as test_params;
    use std::f64::consts::PI;

    fn identity() -> FrameTransform {
        FrameTransform::new(0.0, Vector3::zeros())
    }

    #[test]
    fn test_ik_fk_agreement() {
        let kin = ArmKinematics::new(test_params());
        let home = kin.home_joint_angles();

        let target = Point3::new(0.22, 0.08, 0.03);
        let solution = kin.solve_move(&target, &identity(), &home, true);
        let (pos, _) = kin.forward_kinematics(&solution);

        assert!((pos - target).norm() < 1e-9, "{:?} != {:?}", pos, target);

        // Gripper points straight down for final moves
        assert!((solution.gripper_pitch() - FINAL_PITCH_RAD).abs() < 1e-9);

        // The same target through a non-trivial frame transform
        let transform = FrameTransform::new(0.6, Vector3::new(0.3, -0.1, 0.0));
        let target_w = transform.arm_to_world(&target);
        let solution = kin.solve_move(&target_w, &transform, &home, true);
        let (pos, _) = kin.forward_kinematics(&solution);

        assert!((transform.arm_to_world(&pos) - target_w).norm() < 1e-9);
    }

    #[test]
    fn test_approach_from_above() {
        let kin = ArmKinematics::new(test_params());
        let home = kin.home_joint_angles();

        let target = Point3::new(0.2, -0.05, 0.02);
        let solution = kin.solve_move(&target, &identity(), &home, false);
        let (pos, _) = kin.forward_kinematics(&solution);

        assert!((pos - (target + Vector3::new(0.0, 0.0, 0.05))).norm() < 1e-9);
    }

    #[test]
    fn test_elbow_solution_follows_current() {
        let kin = ArmKinematics::new(test_params());
        let target = Point3::new(0.22, 0.08, 0.03);

        let mut current = kin.home_joint_angles();
        current.0[SHOULDER] = 1.2;
        let high = kin.solve_move(&target, &identity(), &current, true);

        current.0[SHOULDER] = -1.0;
        let low = kin.solve_move(&target, &identity(), &current, true);

        assert!(high.shoulder() > low.shoulder());
        assert!(high.elbow() < 0.0);
        assert!(low.elbow() > 0.0);

        // Both reach the target
        for s in [high, low].iter() {
            let (pos, _) = kin.forward_kinematics(s);
            assert!((pos - target).norm() < 1e-9);
        }
    }

    #[test]
    fn test_out_of_reach_is_limited() {
        let params = test_params();
        let kin = ArmKinematics::new(params.clone());

        let solution = kin.solve_move(
            &Point3::new(1.0, 0.0, 0.05),
            &identity(),
            &kin.home_joint_angles(),
            true,
        );
        let (pos, _) = kin.forward_kinematics(&solution);

        let wrist = pos + Vector3::new(0.0, 0.0, params.tool_length_m);
        let shoulder = Point3::new(0.0, 0.0, params.base_height_m);

        assert!(
            ((wrist - shoulder).norm() - (params.shoulder_length_m + params.elbow_length_m)).abs()
                < 1e-9
        );
        assert!(pos.y.abs() < 1e-12);
    }

    #[test]
    fn test_servo_codec() {
        let kin = ArmKinematics::new(test_params());

        let joints = JointAngles([0.5, 1.0, -1.5, -0.3]);
        let servos = kin.joint_angles_to_servo_angles(&joints);

        // Reversed shoulder servo: 0 rad sits mid range, positive angles go down
        assert!((servos.0[SHOULDER] - (180.0 - 1.0 * 180.0 / PI)).abs() < 1e-9);

        let back = kin.servo_angles_to_joint_angles(&servos).unwrap();
        for i in 0..NUM_JOINTS {
            assert!((back.0[i] - joints.0[i]).abs() < 1e-9);
        }

        assert!(matches!(
            kin.servo_angles_to_joint_angles(&ServoAngles(vec![90.0; 3])),
            Err(KinError::WrongNumServos {
                expected: 4,
                found: 3
            })
        ));
    }

    #[test]
    fn test_camera_to_gripper() {
        let kin = ArmKinematics::new(test_params());
        let home = kin.home_joint_angles();
        let transform = FrameTransform::new(-0.4, Vector3::new(0.1, 0.2, 0.0));

        // Where the camera really is for the home pose
        let (gripper_m_a, rot) = kin.forward_kinematics(&home);
        let camera_m_a = gripper_m_a + rot * Vector3::from(test_params().camera_offset_m);
        let camera_m_w = transform.arm_to_world(&camera_m_a);

        // The vision process sees the camera yawed by the frame rotation plus the base angle
        let board_yaw = transform.rotation_offset_rad + home.base();

        let gripper_m_w = kin.camera_to_gripper(&camera_m_w, &home, board_yaw);

        assert!((gripper_m_w - transform.arm_to_world(&gripper_m_a)).norm() < 1e-12);
    }
}
