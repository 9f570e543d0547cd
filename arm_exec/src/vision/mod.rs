//! # Vision Module
//!
//! The vision port provides the two pieces of image processing the arm relies on: estimating the
//! camera's pose from the marker board, and detecting boxes once that pose is known. Both run in an
//! external vision process, reached through [`VisionClient`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod client;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::{
    cam::{CamError, CamImage},
    vision::{CameraGeometry, CameraPose, DetectedBox, MarkerLayout},
};

pub use client::{VisionClient, VisionClientError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Result of a box detection pass.
#[derive(Clone)]
pub struct Detection {
    pub boxes: Vec<DetectedBox>,

    /// The source image annotated with the detected boxes.
    pub overlay: CamImage,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur while using the vision port.
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("Vision client error: {0}")]
    ClientError(#[from] VisionClientError),

    #[error("Could not convert the image: {0}")]
    ImageError(#[from] CamError),

    #[error("The vision process reported an error: {0}")]
    Remote(String),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Image processing needed by the arm.
pub trait Vision {
    /// Estimate the pose of the camera from the marker board visible in the image.
    ///
    /// `Ok(None)` is returned if the board cannot be found.
    fn estimate_pose(
        &mut self,
        image: &CamImage,
        layout: &MarkerLayout,
    ) -> Result<Option<CameraPose>, VisionError>;

    /// Detect the boxes in the image, given the camera pose estimated from it.
    fn detect_boxes(
        &mut self,
        image: &CamImage,
        pose: &CameraPose,
        geometry: &CameraGeometry,
    ) -> Result<Detection, VisionError>;
}
