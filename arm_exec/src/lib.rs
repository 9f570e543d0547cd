//! # Arm library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access items defined
//! inside the arm crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Arm server - accepts requests from the surrounding application
pub mod arm_server;

/// Box registry - the boxes found by the last detection pass
pub mod box_registry;

/// Frame calibration - relates the marker board's world frame to the arm's own frame
pub mod calib;

/// Instruction compiler - turns a program into a servo command queue
pub mod compiler;

/// Global data store for the executable
pub mod data_store;

/// Frame transform between the world and arm frames
pub mod frame;

/// Arm kinematics
pub mod kin;

/// Parameters for the arm executable
pub mod params;

/// Persistent storage of the user's program
pub mod program_store;

/// Nearest box selection
pub mod proximity;

/// Vision port and the client to the external vision process
pub mod vision;

/// Test doubles for the kinematics and vision ports
#[cfg(test)]
pub(crate) mod test_utils;
