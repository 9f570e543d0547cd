//! # Instruction Compiler
//!
//! The compiler walks the user's instruction script and produces the queue of servo commands the
//! transport will execute.
//!
//! Instructions are executed in the reverse of their stored order, and every queue ends with an
//! `Initial` command returning the arm home. Each instruction is first resolved against the groups
//! and the box registry into an [`Action`]. Instructions that cannot be resolved (an unknown box,
//! an empty group, bad parameters) are skipped with a warning rather than failing the whole
//! script.
//!
//! Joint angles are threaded through the compilation in a [`MoveChain`]: each move is solved
//! starting from the angles the previous move ended at, and the position the gripper was last sent
//! to is used as the reference for nearest box selection.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::servo::ServoCommand,
    program::{Group, Instruction, MalformedInstruction, Step},
};
use log::{debug, warn};
use nalgebra::Point3;

use crate::{
    box_registry::BoxRegistry,
    frame::FrameTransform,
    kin::{JointAngles, Kinematics},
    proximity,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// State threaded from one move to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveChain {
    /// Joint angles the arm will be at after the last compiled command.
    pub joint_angles: JointAngles,

    /// Where the gripper was last sent, in the world frame.
    ///
    /// Units: meters
    pub reference_point_m_w: Point3<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// What a resolved instruction does.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Emit the command as is.
    Emit(ServoCommand),

    /// Return the arm to its home configuration.
    Home,

    /// Move the gripper to the given point in the world frame.
    MoveTo(Point3<f64>),
}

/// Outcome of resolving one instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(Action),
    Skipped(SkipReason),
}

/// Reasons an instruction is left out of the queue.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkipReason {
    #[error("{0}")]
    Malformed(MalformedInstruction),

    #[error("No box with id {0} was detected")]
    UnknownBox(u32),

    #[error("No group with id \"{0}\"")]
    UnknownGroup(String),

    #[error("None of the boxes in group \"{0}\" were detected")]
    NoGroupBoxes(String),

    #[error("No boxes were detected")]
    NoBoxes,

    #[error("Group \"{0}\" has no location")]
    GroupHasNoLocation(String),
}

/// Errors which prevent compilation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("The arm has not been calibrated, moves cannot be compiled")]
    NotCalibrated,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Compile the script into a servo command queue.
///
/// `chain` must hold the arm's state at the start of the script. On return it holds the state at
/// the end of the queue, i.e. the home joint angles.
pub fn compile(
    script: &[Instruction],
    groups: &[Group],
    registry: &BoxRegistry,
    transform: &FrameTransform,
    chain: &mut MoveChain,
    kin: &dyn Kinematics,
) -> Vec<ServoCommand> {
    let mut queue = Vec::with_capacity(script.len() + 1);

    for (idx, instruction) in script.iter().enumerate().rev() {
        let action = match resolve(instruction, groups, registry, &chain.reference_point_m_w) {
            Resolution::Resolved(a) => a,
            Resolution::Skipped(reason) => {
                warn!(
                    "Skipping instruction {} (\"{}\"): {}",
                    idx, instruction.kind, reason
                );
                continue;
            }
        };

        let cmd = match action {
            Action::Emit(cmd) => cmd,
            Action::Home => {
                chain.joint_angles = kin.home_joint_angles();
                ServoCommand::Initial
            }
            Action::MoveTo(target_m_w) => resolve_move(&target_m_w, transform, chain, kin),
        };

        debug!("Instruction {} compiled to {:?}", idx, cmd);

        queue.push(cmd);
    }

    // Always finish at home so the next calibration image is taken from there
    chain.joint_angles = kin.home_joint_angles();
    queue.push(ServoCommand::Initial);

    queue
}

/// Resolve a single instruction.
///
/// `reference_m_w` is used to choose between several candidate boxes.
pub fn resolve(
    instruction: &Instruction,
    groups: &[Group],
    registry: &BoxRegistry,
    reference_m_w: &Point3<f64>,
) -> Resolution {
    let step = match instruction.parse() {
        Ok(s) => s,
        Err(e) => return Resolution::Skipped(SkipReason::Malformed(e)),
    };

    match step {
        Step::Wait { time } => Resolution::Resolved(Action::Emit(ServoCommand::Wait(time))),
        Step::Grip => Resolution::Resolved(Action::Emit(ServoCommand::Grip(true))),
        Step::Ungrip => Resolution::Resolved(Action::Emit(ServoCommand::Grip(false))),
        Step::Initial => Resolution::Resolved(Action::Home),
        Step::GoBox { box_id } => match registry.find(box_id) {
            Some(b) => Resolution::Resolved(Action::MoveTo(b.grab_point_m_w)),
            None => Resolution::Skipped(SkipReason::UnknownBox(box_id)),
        },
        Step::GoGroupBox { group_id } => {
            let group = match find_group(groups, &group_id) {
                Some(g) => g,
                None => return Resolution::Skipped(SkipReason::UnknownGroup(group_id)),
            };

            match proximity::nearest(registry.in_group(group), reference_m_w) {
                Some(b) => Resolution::Resolved(Action::MoveTo(b.grab_point_m_w)),
                None => Resolution::Skipped(SkipReason::NoGroupBoxes(group_id)),
            }
        }
        Step::GoNearestBox => match proximity::nearest(registry.boxes(), reference_m_w) {
            Some(b) => Resolution::Resolved(Action::MoveTo(b.grab_point_m_w)),
            None => Resolution::Skipped(SkipReason::NoBoxes),
        },
        Step::GoPos(location) => Resolution::Resolved(Action::MoveTo(location.to_point_m())),
        Step::GoGroupLocation { group_id } => match find_group(groups, &group_id) {
            Some(Group {
                location: Some(location),
                ..
            }) => Resolution::Resolved(Action::MoveTo(location.to_point_m())),
            Some(_) => Resolution::Skipped(SkipReason::GroupHasNoLocation(group_id)),
            None => Resolution::Skipped(SkipReason::UnknownGroup(group_id)),
        },
    }
}

fn find_group<'a>(groups: &'a [Group], id: &str) -> Option<&'a Group> {
    groups.iter().find(|g| g.id == id)
}

/// Solve a move to `target_m_w`, advancing the chain and returning the command to emit.
pub fn resolve_move(
    target_m_w: &Point3<f64>,
    transform: &FrameTransform,
    chain: &mut MoveChain,
    kin: &dyn Kinematics,
) -> ServoCommand {
    let joint_angles = kin.solve_move(target_m_w, transform, &chain.joint_angles, true);

    chain.joint_angles = joint_angles;
    chain.reference_point_m_w = *target_m_w;

    ServoCommand::Move(kin.joint_angles_to_servo_angles(&joint_angles))
}
