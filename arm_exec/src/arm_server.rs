//! # Arm Server Module
//!
//! This module abstracts over the networking side of the arm executable. The server accepts
//! requests from the surrounding application (the user interface and the servo transport): new
//! calibration images, requests for the compiled command queue and the detection overlay, and
//! edits to the stored program.
//!
//! [`handle_request`] holds the behaviour of each request and is independent of the socket.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    arm::{ArmRep, ArmRepError, ArmReq},
    eqpt::cam::ImageFormat,
    net::{zmq, MessageError, MonitoredSocket, MonitoredSocketError, SocketOptions},
    program::ProgramData,
};
use image::GenericImageView;
use log::{info, warn};

use crate::{
    calib::CalibrationError,
    compiler::CompileError,
    data_store::{CycleError, CycleReport, DataStore},
    kin::Kinematics,
    params::ArmExecParams,
    program_store::{ProgramStore, StoreError},
    vision::Vision,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An abstraction over the networking part of the arm executable.
pub struct ArmServer {
    /// REP socket which accepts requests from clients
    reqrep: MonitoredSocket,
}

/// Everything a request may need to read or modify.
pub struct RequestContext<'a> {
    pub ds: &'a mut DataStore,
    pub store: &'a ProgramStore,
    pub vision: &'a mut dyn Vision,
    pub kin: &'a dyn Kinematics,

    /// Format the detection overlay is sent to clients in
    pub overlay_format: ImageFormat,
}

/// The result of handling a request.
pub struct Response {
    /// Reply to send back to the client
    pub rep: ArmRep,

    /// Report of the cycle run by the request, if any
    pub cycle: Option<CycleReport>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur in the [`ArmServer`]
#[derive(thiserror::Error, Debug)]
pub enum ArmServerError {
    #[error("Socket error: {0}")]
    SocketError(#[from] MonitoredSocketError),

    #[error("Could not send data to the client: {0}")]
    SendError(MessageError),

    #[error("Could not receive data from the client: {0}")]
    RecvError(MessageError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ArmServer {
    /// Create a new instance of the arm server.
    ///
    /// This function will not wait for a connection from a client before returning.
    pub fn new(ctx: &zmq::Context, params: &ArmExecParams) -> Result<Self, ArmServerError> {
        let reqrep_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            recv_timeout: params.server_poll_ms,
            send_timeout: 10,
            ..Default::default()
        };

        let reqrep = MonitoredSocket::new(ctx, zmq::REP, reqrep_options, &params.arm_endpoint)?;

        Ok(Self { reqrep })
    }

    /// Retrieve the next request from a client.
    ///
    /// `Ok(None)` is returned if no request arrived before the poll period elapsed, or if the
    /// request was invalid, in which case the client has already been sent an error. Otherwise the
    /// user MUST call [`ArmServer::send_response`] before getting the next request.
    pub fn get_request(&mut self) -> Result<Option<ArmReq>, ArmServerError> {
        match self.reqrep.recv_json() {
            Ok(req) => Ok(Some(req)),
            Err(MessageError::Timeout) => Ok(None),
            Err(e @ MessageError::DeserializationError(_)) | Err(e @ MessageError::NonUtf8Message) => {
                warn!("Invalid request: {}", e);
                self.send_response(&ArmRep::Error(ArmRepError::InvalidRequest(e.to_string())))?;
                Ok(None)
            }
            Err(e) => Err(ArmServerError::RecvError(e)),
        }
    }

    /// Send the response to the last request.
    pub fn send_response(&mut self, rep: &ArmRep) -> Result<(), ArmServerError> {
        self.reqrep
            .send_json(rep)
            .map_err(ArmServerError::SendError)
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Handle a single request.
pub fn handle_request(req: ArmReq, ctx: &mut RequestContext) -> Response {
    let mut cycle = None;

    let rep = match req {
        ArmReq::Calibrate(frame) => match calibrate(frame, ctx) {
            Ok(report) => {
                let rep = ArmRep::Calibrated {
                    num_boxes: report.num_boxes,
                    num_cmds: report.num_cmds,
                };
                cycle = Some(report);
                Ok(rep)
            }
            Err(e) => Err(e),
        },
        ArmReq::GetMovements => {
            if ctx.ds.has_image() {
                Ok(ArmRep::Movements(ctx.ds.queue().to_vec()))
            } else {
                Err(ArmRepError::NoImageYet)
            }
        }
        ArmReq::GetCamData => match ctx.ds.overlay {
            Some(ref overlay) => overlay
                .to_cam_frame(ctx.overlay_format)
                .map(|overlay| ArmRep::CamData {
                    overlay,
                    boxes: ctx.ds.registry.boxes().to_vec(),
                })
                .map_err(|e| ArmRepError::InvalidImage(e.to_string())),
            None => Err(ArmRepError::NoImageYet),
        },
        ArmReq::Recompile => ctx.store.load().map_err(store_failure).and_then(|data| {
            ctx.ds
                .compile_only(&data.instructions, &data.groups, ctx.kin)
                .map(|queue| ArmRep::Movements(queue.to_vec()))
                .map_err(|e| match e {
                    CompileError::NotCalibrated => ArmRepError::NotCalibrated,
                })
        }),
        ArmReq::GetProgram => ctx.store.load().map(ArmRep::Program).map_err(store_failure),
        ArmReq::GetGroups => ctx
            .store
            .load()
            .map(|d| ArmRep::Groups(d.groups))
            .map_err(store_failure),
        ArmReq::GetInstructions => ctx
            .store
            .load()
            .map(|d| ArmRep::Instructions(d.instructions))
            .map_err(store_failure),
        ArmReq::AddGroup(group) => {
            edit_program(ctx.store, |data| Ok(ArmRep::Group(data.add_group(group))))
        }
        ArmReq::UpdateGroup { id, group } => edit_program(ctx.store, |data| {
            data.update_group(&id, group)
                .map(ArmRep::Group)
                .ok_or_else(|| ArmRepError::GroupNotFound(id.clone()))
        }),
        ArmReq::DeleteGroup(id) => edit_program(ctx.store, |data| {
            data.delete_group(&id);
            Ok(ArmRep::Ok)
        }),
        ArmReq::SaveInstructions(instructions) => edit_program(ctx.store, |data| {
            data.instructions = instructions;
            Ok(ArmRep::Ok)
        }),
    };

    Response {
        rep: rep.unwrap_or_else(|e| {
            warn!("Request failed: {}", e);
            ArmRep::Error(e)
        }),
        cycle,
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn calibrate(
    frame: comms_if::eqpt::cam::CamFrame,
    ctx: &mut RequestContext,
) -> Result<CycleReport, ArmRepError> {
    let image = frame
        .to_cam_image()
        .map_err(|e| ArmRepError::InvalidImage(e.to_string()))?;

    info!(
        "Received calibration image ({}x{})",
        image.image.width(),
        image.image.height()
    );

    let program = ctx.store.load().map_err(store_failure)?;

    ctx.ds
        .calibrate_and_compile(&image, &program, ctx.vision, ctx.kin)
        .map_err(|e| match e {
            CycleError::Calibration(CalibrationError::BoardNotFound) => ArmRepError::BoardNotFound,
            CycleError::Calibration(CalibrationError::Vision(e)) | CycleError::Detection(e) => {
                ArmRepError::VisionFailure(e.to_string())
            }
        })
}

/// Load the program, apply the edit and save it if the edit succeeded.
fn edit_program<F>(store: &ProgramStore, edit: F) -> Result<ArmRep, ArmRepError>
where
    F: FnOnce(&mut ProgramData) -> Result<ArmRep, ArmRepError>,
{
    let mut data = store.load().map_err(store_failure)?;
    let rep = edit(&mut data)?;
    store.save(&data).map_err(store_failure)?;
    Ok(rep)
}

fn store_failure(e: StoreError) -> ArmRepError {
    ArmRepError::StoreFailure(e.to_string())
}
