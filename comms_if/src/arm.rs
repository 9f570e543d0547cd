//! # Arm Requests
//!
//! Requests accepted by the arm executable's server and the replies it sends back. These cover
//! everything the surrounding application (the web UI, the servo transport) needs: submitting
//! calibration images, collecting the compiled command queue and editing the stored program.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{
    eqpt::{cam::CamFrame, servo::ServoCommand, vision::DetectedBox},
    program::{Group, Instruction, ProgramData},
};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A request sent to the arm server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ArmReq {
    /// Calibrate from a new camera frame, detect boxes and compile the stored program.
    Calibrate(CamFrame),

    /// Get the command queue compiled by the last successful calibration.
    GetMovements,

    /// Get the detection overlay and detected boxes from the last successful calibration.
    GetCamData,

    /// Compile the stored program again using the existing calibration.
    Recompile,

    /// Get the whole stored program.
    GetProgram,

    /// Get the stored groups.
    GetGroups,

    /// Get the stored instructions.
    GetInstructions,

    /// Add a new group. An id is assigned if the group doesn't have one.
    AddGroup(Group),

    /// Replace the group with the given id.
    UpdateGroup { id: String, group: Group },

    /// Delete the group with the given id.
    DeleteGroup(String),

    /// Replace the stored instructions.
    SaveInstructions(Vec<Instruction>),
}

/// A reply sent by the arm server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ArmRep {
    /// Calibration, detection and compilation succeeded.
    Calibrated { num_boxes: usize, num_cmds: usize },

    /// A compiled command queue.
    Movements(Vec<ServoCommand>),

    /// The detection overlay (a base64 JPEG frame) and the detected boxes.
    CamData {
        overlay: CamFrame,
        boxes: Vec<DetectedBox>,
    },

    Program(ProgramData),

    Groups(Vec<Group>),

    Instructions(Vec<Instruction>),

    /// The group as stored after an add or update.
    Group(Group),

    /// The request succeeded and has no data to return.
    Ok,

    /// The request failed.
    Error(ArmRepError),
}

/// Errors reported to clients of the arm server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum ArmRepError {
    #[error("The request could not be parsed: {0}")]
    InvalidRequest(String),

    #[error("The submitted image could not be decoded: {0}")]
    InvalidImage(String),

    #[error("No marker board was found in the image")]
    BoardNotFound,

    #[error("The vision process failed: {0}")]
    VisionFailure(String),

    #[error("No camera image has been processed yet")]
    NoImageYet,

    #[error("The arm has not been calibrated yet")]
    NotCalibrated,

    #[error("No group with id \"{0}\"")]
    GroupNotFound(String),

    #[error("The program store failed: {0}")]
    StoreFailure(String),
}
