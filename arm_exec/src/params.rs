//! # Arm Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::vision::{CameraGeometry, MarkerLayout};
use serde::{Deserialize, Serialize};

use crate::kin;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmExecParams {
    /// Endpoint the arm server binds to
    pub arm_endpoint: String,

    /// Endpoint of the vision process
    pub vision_endpoint: String,

    /// Longest time to wait for the vision process to answer a request.
    ///
    /// Units: milliseconds
    pub vision_timeout_ms: i32,

    /// Period at which the server checks for requests.
    ///
    /// Units: milliseconds
    pub server_poll_ms: i32,

    /// Path to the program file, relative to the software root
    pub program_path: String,

    /// JPEG quality of the overlay sent to clients, 1 to 100
    pub overlay_jpeg_quality: u8,

    pub marker_layout: MarkerLayout,

    pub camera_geometry: CameraGeometry,

    pub kinematics: kin::Params,
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_shipped_params_parse() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("params")
            .join("arm_exec.toml");

        let params: ArmExecParams = util::params::load_from_path(path).unwrap();

        assert_eq!(params.marker_layout.marker_size_m, 0.036);
        assert_eq!(params.marker_layout.marker_spacing_m, 0.005);
        assert_eq!(params.camera_geometry.camera_matrix[2], [0.0, 0.0, 1.0]);
        assert!(params.kinematics.shoulder_length_m > 0.0);
    }
}
