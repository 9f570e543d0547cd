//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the arm software: the
//! requests served by the arm executable, the exchanges with the external
//! vision process, the servo command queue and the stored program format.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Requests and replies served by the arm executable
pub mod arm;

/// Command and response definitions for equipment (camera, servos, vision)
pub mod eqpt;

/// Network module
pub mod net;

/// Stored instruction scripts and location groups
pub mod program;
