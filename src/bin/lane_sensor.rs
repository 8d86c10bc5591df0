//! lane_sensor - lane zone vehicle counter with serial signal output.
//!
//! Reads frames from a camera or a looping video file, detects vehicles in
//! the lane zone, and sends `COUNT_LANE_<n>=<count>` / `AMBULANCE_LANE_<n>`
//! to the signal controller at most once per notify interval.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use lane_sensor::config::SensorConfig;
use lane_sensor::detect::select_detector;
use lane_sensor::display::sink_for;
use lane_sensor::ingest::DEFAULT_CAMERA_DEVICE;
use lane_sensor::{
    open_source, run_loop, LaneSensor, LoopOptions, OverlayRenderer, RateLimitedNotifier,
    RunControl, SerialLink, SourceKind,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Count vehicles in a lane zone and signal the controller over serial"
)]
struct Args {
    /// Frame source: camera or video.
    #[arg(long, value_name = "KIND")]
    source: Option<String>,

    /// Camera device or video file (stub://<name> for a synthetic feed).
    #[arg(long)]
    path: Option<String>,

    /// Serial port of the signal controller (e.g. /dev/ttyUSB0).
    #[arg(long)]
    serial_port: Option<String>,

    /// ONNX detector model.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Write annotated frames to this JPEG file.
    #[arg(long, env = "LANE_SENSOR_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Stop at the end of a video instead of restarting it.
    #[arg(long)]
    no_loop: bool,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = SensorConfig::load()?;
    if let Some(kind) = args.source.as_deref() {
        cfg.source.kind = kind.parse()?;
    }
    if let Some(path) = args.path {
        cfg.source.path = path;
    }
    if cfg.source.kind == SourceKind::Video && cfg.source.path == DEFAULT_CAMERA_DEVICE {
        return Err(anyhow!("video source needs --path <file>"));
    }
    if let Some(port) = args.serial_port {
        cfg.serial.port = Some(port);
    }
    if let Some(model) = args.model {
        cfg.detector.model = Some(model);
    }
    if let Some(snapshot) = args.snapshot {
        cfg.display.snapshot_path = Some(snapshot);
    }
    if args.no_loop {
        cfg.source.loop_playback = false;
    }

    let backend = select_detector(
        cfg.detector.model.as_deref(),
        cfg.detector.params,
        cfg.detector.seed,
        &cfg.source.path,
    )?;

    let kind = cfg.source.kind;
    let mut source = open_source(&cfg.source)
        .with_context(|| format!("failed to open {} source {}", kind, cfg.source.path))?;
    let link = SerialLink::open(&cfg.serial);
    let renderer = OverlayRenderer::new(cfg.lane, cfg.display.font.as_deref())?;
    let mut sensor = LaneSensor::new(
        backend,
        cfg.classes.clone(),
        cfg.region,
        RateLimitedNotifier::new(cfg.lane, cfg.notify_interval),
        link,
        renderer,
    )?;
    let mut sink = sink_for(
        cfg.display.snapshot_path.as_deref(),
        cfg.display.snapshot_interval,
    );

    let control = RunControl::new();
    control.install_ctrlc()?;
    let options = LoopOptions {
        loop_playback: kind == SourceKind::Video && cfg.source.loop_playback,
        frame_delay: cfg.display.frame_delay_for(kind),
        max_frames: args.max_frames,
        ..LoopOptions::default()
    };

    log::info!("lane_sensor running. Press Ctrl-C to quit.");
    let result = run_loop(&mut source, &control, &options, |frame| {
        sensor.process(frame, Instant::now())?;
        sink.present(frame.image())
    });

    let closed = sensor.shutdown();
    let summary = result?;
    closed?;
    log::info!(
        "lane_sensor finished: {} frames, {} rewinds, {} commands sent ({:?})",
        summary.frames,
        summary.rewinds,
        sensor.link().commands_sent(),
        summary.reason
    );
    Ok(())
}
