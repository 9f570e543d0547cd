//! # Camera Equipment Communications Module

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use base64::DecodeError;
use chrono::{serde::ts_milliseconds, DateTime, Utc};
use image::{DynamicImage, ImageError};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A serialisable frame from the gripper camera, or an annotated overlay produced from one.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CamFrame {
    /// UTC timestamp at which the frame was acquired
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// The format of this frame
    pub format: ImageFormat,

    /// The formatted image data, encoded in base64.
    pub b64_data: String,
}

/// A decoded camera image.
#[derive(Clone)]
pub struct CamImage {
    /// UTC timestamp at which the frame was acquired
    pub timestamp: DateTime<Utc>,

    /// The image itself
    pub image: DynamicImage,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible formats for camera images. This is used rather than image::ImageFormat to:
///     1. Restrict the formats that can be sent back and forth
///     2. Allow serialisation as image::ImageFormat does not implement serde.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq)]
pub enum ImageFormat {
    /// PNG image
    Png,

    /// JPEG image with a quality value between 1 and 100, where 100 is best.
    Jpeg(u8),
}

#[derive(Debug, thiserror::Error)]
pub enum CamError {
    #[error("Failed to decode frame data from base64: {0}")]
    Base64DecodeError(DecodeError),

    #[error("Failed to decode the image: {0}")]
    ImageDecodeError(ImageError),

    #[error("Failed to encode the image: {0}")]
    ImageEncodeError(ImageError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CamFrame {
    /// Build a frame directly from already encoded image bytes, as read from a file or received
    /// from a camera.
    pub fn from_encoded(format: ImageFormat, data: &[u8]) -> Self {
        Self {
            timestamp: Utc::now(),
            format,
            b64_data: base64::encode(data),
        }
    }

    /// Convert this camera frame into a camera image
    pub fn to_cam_image(&self) -> Result<CamImage, CamError> {
        let data = base64::decode(&self.b64_data).map_err(CamError::Base64DecodeError)?;

        let format = match self.format {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg(_) => image::ImageFormat::Jpeg,
        };

        let image = image::load_from_memory_with_format(&data, format)
            .map_err(CamError::ImageDecodeError)?;

        Ok(CamImage {
            timestamp: self.timestamp,
            image,
        })
    }
}

impl CamImage {
    /// Wrap an image acquired now.
    pub fn new(image: DynamicImage) -> Self {
        Self {
            timestamp: Utc::now(),
            image,
        }
    }

    /// Convert this camera image into a camera frame with the given format
    pub fn to_cam_frame(&self, format: ImageFormat) -> Result<CamFrame, CamError> {
        let mut data = Vec::<u8>::new();

        let output_format = match format {
            ImageFormat::Png => image::ImageOutputFormat::Png,
            ImageFormat::Jpeg(q) => image::ImageOutputFormat::Jpeg(q),
        };

        self.image
            .write_to(&mut data, output_format)
            .map_err(CamError::ImageEncodeError)?;

        Ok(CamFrame {
            timestamp: self.timestamp,
            format,
            b64_data: base64::encode(&data),
        })
    }
}

impl TryFrom<&CamFrame> for CamImage {
    type Error = CamError;

    fn try_from(frame: &CamFrame) -> Result<Self, Self::Error> {
        frame.to_cam_image()
    }
}
