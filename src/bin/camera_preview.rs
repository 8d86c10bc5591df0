//! camera_preview - check a camera and detector together.
//!
//! Runs the detector on the whole frame and draws every box. No lane zone,
//! no counting, no serial output.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use lane_sensor::config::SensorConfig;
use lane_sensor::detect::{detect_full_frame, select_detector};
use lane_sensor::display::sink_for;
use lane_sensor::ingest::DEFAULT_CAMERA_DEVICE;
use lane_sensor::{open_source, run_loop, LoopOptions, OverlayRenderer, RunControl, SourceKind};

#[derive(Parser, Debug)]
#[command(author, version, about = "Live full-frame detection preview")]
struct Args {
    /// Camera device (stub://<name> for a synthetic feed).
    #[arg(long, default_value = DEFAULT_CAMERA_DEVICE)]
    device: String,

    /// ONNX detector model.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Write annotated frames to this JPEG file.
    #[arg(long, env = "LANE_SENSOR_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = SensorConfig::load()?;
    cfg.source.kind = SourceKind::Camera;
    cfg.source.path = args.device;
    if let Some(model) = args.model {
        cfg.detector.model = Some(model);
    }
    if let Some(snapshot) = args.snapshot {
        cfg.display.snapshot_path = Some(snapshot);
    }

    let mut backend = select_detector(
        cfg.detector.model.as_deref(),
        cfg.detector.params,
        cfg.detector.seed,
        &cfg.source.path,
    )?;
    let mut source = open_source(&cfg.source)
        .with_context(|| format!("could not open camera {}", cfg.source.path))?;
    let renderer = OverlayRenderer::new(cfg.lane, cfg.display.font.as_deref())?;
    let mut sink = sink_for(
        cfg.display.snapshot_path.as_deref(),
        cfg.display.snapshot_interval,
    );

    let control = RunControl::new();
    control.install_ctrlc()?;
    let options = LoopOptions {
        frame_delay: cfg.display.frame_delay_for(SourceKind::Camera),
        max_frames: args.max_frames,
        ..LoopOptions::default()
    };

    log::info!("starting camera feed. Press Ctrl-C to quit.");
    let summary = run_loop(&mut source, &control, &options, |frame| {
        let detections = detect_full_frame(backend.as_mut(), frame, &cfg.classes)?;
        renderer.draw_detections(frame.image_mut(), &detections, &cfg.classes);
        sink.present(frame.image())
    })?;
    log::info!("feed closed after {} frames ({:?})", summary.frames, summary.reason);
    Ok(())
}
