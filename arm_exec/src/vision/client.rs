//! # Vision Client
//!
//! The vision client sends images to the external vision process and waits for the estimated
//! camera pose or the detected boxes.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::{
        cam::{CamImage, ImageFormat},
        vision::{CameraGeometry, CameraPose, MarkerLayout, VisionRep, VisionReq},
    },
    net::{zmq, MessageError, MonitoredSocket, MonitoredSocketError, SocketOptions},
};
use log::{debug, trace};

use super::{Detection, Vision, VisionError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The vision client
pub struct VisionClient {
    /// Request-response socket for vision requests and responses
    reqrep: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum VisionClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("The client is not connected to the server")]
    NotConnected,

    #[error("Could not exchange a message with the server: {0}")]
    MessageError(MessageError),

    #[error("Expected a {expected} response, got {found:?} instead")]
    UnexpectedResponse {
        expected: &'static str,
        found: VisionRep,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VisionClient {
    /// Create a new client connecting to the vision process at `endpoint`.
    ///
    /// `recv_timeout_ms` is the longest the client will wait for the vision process to answer a
    /// single request.
    pub fn new(
        ctx: &zmq::Context,
        endpoint: &str,
        recv_timeout_ms: i32,
    ) -> Result<Self, VisionClientError> {
        let reqrep_opts = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: recv_timeout_ms,
            send_timeout: 10,
            req_correlate: true,
            req_relaxed: true,
            ..Default::default()
        };

        let reqrep = MonitoredSocket::new(ctx, zmq::REQ, reqrep_opts, endpoint)
            .map_err(VisionClientError::SocketError)?;

        Ok(Self { reqrep })
    }

    /// True if the vision process is connected.
    pub fn connected(&self) -> bool {
        self.reqrep.connected()
    }

    /// Send a request and block until the response arrives or the timeout elapses.
    fn request(&mut self, request: &VisionReq) -> Result<VisionRep, VisionClientError> {
        if !self.reqrep.connected() {
            return Err(VisionClientError::NotConnected);
        }

        self.reqrep
            .send_json(request)
            .map_err(VisionClientError::MessageError)?;

        trace!("Vision request sent, waiting for response");

        self.reqrep
            .recv_json()
            .map_err(VisionClientError::MessageError)
    }
}

impl Vision for VisionClient {
    fn estimate_pose(
        &mut self,
        image: &CamImage,
        layout: &MarkerLayout,
    ) -> Result<Option<CameraPose>, VisionError> {
        let request = VisionReq::EstimatePose {
            frame: image.to_cam_frame(ImageFormat::Png)?,
            layout: *layout,
        };

        match self.request(&request)? {
            VisionRep::Pose(pose) => {
                debug!("Vision process returned pose {:?}", pose);
                Ok(pose)
            }
            VisionRep::Error(e) => Err(VisionError::Remote(e)),
            r => Err(VisionClientError::UnexpectedResponse {
                expected: "Pose",
                found: r,
            }
            .into()),
        }
    }

    fn detect_boxes(
        &mut self,
        image: &CamImage,
        pose: &CameraPose,
        geometry: &CameraGeometry,
    ) -> Result<Detection, VisionError> {
        let request = VisionReq::DetectBoxes {
            frame: image.to_cam_frame(ImageFormat::Png)?,
            pose: pose.clone(),
            geometry: geometry.clone(),
        };

        match self.request(&request)? {
            VisionRep::Boxes { boxes, overlay } => {
                debug!("Vision process detected {} boxes", boxes.len());
                Ok(Detection {
                    boxes,
                    overlay: overlay.to_cam_image()?,
                })
            }
            VisionRep::Error(e) => Err(VisionError::Remote(e)),
            r => Err(VisionClientError::UnexpectedResponse {
                expected: "Boxes",
                found: r,
            }
            .into()),
        }
    }
}
