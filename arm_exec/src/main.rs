//! # Arm Executable
//!
//! Turns images of the workspace into servo command queues for the picker arm.
//!
//! # Architecture
//!
//!     - Initialise the session, logging, parameters and vision client
//!     - Main loop:
//!         - Wait for a request from a client
//!         - Calibration images run a full cycle:
//!             - Camera pose estimation and frame calibration
//!             - Box detection
//!             - Program compilation
//!         - Program edits are written to the program store
//!         - Send the response
//!
//! With `--once <image>` a single cycle is run on an image file and the resulting queue printed to
//! stdout.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use comms_if::{eqpt::cam::{CamImage, ImageFormat}, net::zmq};
use log::{debug, info, warn};
use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};
use structopt::StructOpt;

// Internal
use arm_lib::{
    arm_server::{handle_request, ArmServer, RequestContext},
    calib::FrameCalibrator,
    data_store::{CycleReport, DataStore},
    kin::ArmKinematics,
    params::ArmExecParams,
    program_store::ProgramStore,
    vision::VisionClient,
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Longest time an offline cycle waits for the vision process to connect.
const ONCE_CONNECT_TIMEOUT_S: u64 = 5;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "arm_exec", about = "Picker arm executable")]
struct Opt {
    /// Parameter file, relative to the params directory
    #[structopt(long, default_value = "arm_exec.toml")]
    params: String,

    /// Run a single cycle on this image and print the resulting queue
    #[structopt(long, parse(from_os_str))]
    once: Option<PathBuf>,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("arm_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Picker Arm Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: ArmExecParams =
        util::params::load(&opt.params).wrap_err("Could not load arm_exec params")?;

    info!("Parameters loaded");

    // ---- MODULE INITIALISATION ----

    let kin = ArmKinematics::new(params.kinematics.clone());
    let calibrator = FrameCalibrator::new(params.marker_layout, &kin);
    let mut ds = DataStore::new(&kin, calibrator, params.camera_geometry.clone());

    let store = ProgramStore::new(
        util::params::get_sw_root()
            .wrap_err("Could not find the software root")?
            .join(&params.program_path),
    );
    info!("Program store at {:?}", store.path());

    let mut archiver = Archiver::from_path(&session, "calibration.csv")
        .wrap_err("Failed to create the calibration archive")?;

    let zmq_ctx = zmq::Context::new();

    let mut vision = VisionClient::new(
        &zmq_ctx,
        &params.vision_endpoint,
        params.vision_timeout_ms,
    )
    .wrap_err("Failed to initialise the vision client")?;

    info!("Vision client initialised");

    // ---- OFFLINE CYCLE ----

    if let Some(ref image_path) = opt.once {
        let image = CamImage::new(
            image::open(image_path).wrap_err_with(|| format!("Could not open {:?}", image_path))?,
        );

        let start = Instant::now();
        while !vision.connected() {
            if start.elapsed() > Duration::from_secs(ONCE_CONNECT_TIMEOUT_S) {
                return Err(eyre!("The vision process did not connect"));
            }
            thread::sleep(Duration::from_millis(100));
        }

        let program = store.load().wrap_err("Could not load the program")?;
        let report = ds
            .calibrate_and_compile(&image, &program, &mut vision, &kin)
            .wrap_err("Cycle failed")?;

        archive_cycle(&session, &mut archiver, &ds, &report);

        println!("{}", serde_json::to_string_pretty(ds.queue())?);

        session.exit();
        return Ok(());
    }

    // ---- SERVER INITIALISATION ----

    let mut server = ArmServer::new(&zmq_ctx, &params).wrap_err("Failed to initialise server")?;

    info!("Server initialised on {}", params.arm_endpoint);

    // ---- MAIN LOOP ----

    info!("Initialisation complete, entering main loop");

    loop {
        let req = match server.get_request() {
            Ok(Some(r)) => r,
            Ok(None) => continue,
            Err(e) => {
                warn!("Could not get a request: {}", e);
                continue;
            }
        };

        debug!("Request: {:?}", req);

        let mut ctx = RequestContext {
            ds: &mut ds,
            store: &store,
            vision: &mut vision,
            kin: &kin,
            overlay_format: ImageFormat::Jpeg(params.overlay_jpeg_quality),
        };
        let response = handle_request(req, &mut ctx);

        if let Err(e) = server.send_response(&response.rep) {
            warn!("Could not send the response: {}", e);
        }

        if let Some(ref report) = response.cycle {
            archive_cycle(&session, &mut archiver, &ds, report);
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Write the cycle to the calibration archive and save its queue in the session.
fn archive_cycle(session: &Session, archiver: &mut Archiver, ds: &DataStore, report: &CycleReport) {
    if let Err(e) = archiver.serialise(report) {
        warn!("Could not archive cycle {}: {}", report.cycle, e);
    }

    session.save(format!("queues/queue_{}.json", report.cycle), ds.queue().to_vec());
}
