//! accident_monitor - accident classification over a video file.
//!
//! Plays the video once, classifies a sliding window of frames every tenth
//! frame, and writes `A` (accident) or `N` (normal) to the controller.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use lane_sensor::accident::{self, AccidentMonitor, MonitorSettings, ACCIDENT_THRESHOLD};
use lane_sensor::detect::select_classifier;
use lane_sensor::display::{sink_for, DEFAULT_SNAPSHOT_INTERVAL};
use lane_sensor::{
    open_source, run_loop, LoopOptions, OverlayRenderer, RunControl, SerialLink, SourceSettings,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Accident detection from a video file")]
struct Args {
    /// Path to the video file (stub://<name> for a synthetic clip).
    #[arg(long)]
    video: String,

    /// ONNX accident classifier model.
    #[arg(long, env = "LANE_SENSOR_ACCIDENT_MODEL")]
    model: Option<PathBuf>,

    /// Serial port of the controller board.
    #[arg(long, env = "LANE_SENSOR_ACCIDENT_PORT")]
    serial_port: Option<String>,

    /// Serial baud rate.
    #[arg(long, default_value_t = accident::ACCIDENT_BAUD)]
    baud: u32,

    /// Probability above which a window counts as an accident.
    #[arg(long, default_value_t = ACCIDENT_THRESHOLD)]
    threshold: f32,

    /// TrueType font for the status line.
    #[arg(long, env = "LANE_SENSOR_FONT")]
    font: Option<PathBuf>,

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

    let settings = MonitorSettings {
        threshold: args.threshold,
        ..MonitorSettings::default()
    };
    let classifier =
        select_classifier(args.model.as_deref(), settings.window, settings.input_size)?;

    let mut serial = accident::serial_settings(args.serial_port);
    serial.baud = args.baud;
    let link = SerialLink::open(&serial);
    let mut monitor = AccidentMonitor::new(classifier, settings, link)?;

    let mut source = open_source(&SourceSettings {
        loop_playback: false,
        resize: false,
        ..SourceSettings::video(&args.video)
    })
    .with_context(|| format!("failed to open video {}", args.video))?;

    let renderer = OverlayRenderer::new(0, args.font.as_deref())?;
    let mut sink = sink_for(args.snapshot.as_deref(), DEFAULT_SNAPSHOT_INTERVAL);

    let control = RunControl::new();
    control.install_ctrlc()?;
    let options = LoopOptions {
        loop_playback: false,
        frame_delay: Duration::from_millis(1),
        max_frames: args.max_frames,
        ..LoopOptions::default()
    };

    log::info!("starting video processing. Press Ctrl-C to quit.");
    let result = run_loop(&mut source, &control, &options, |frame| {
        monitor.observe(frame)?;
        let (text, color) = monitor.status();
        renderer.draw_status(frame.image_mut(), &text, color);
        sink.present(frame.image())
    });

    let closed = monitor.shutdown();
    let summary = result?;
    closed?;
    log::info!(
        "video processing finished: {} frames ({:?})",
        summary.frames,
        summary.reason
    );
    Ok(())
}
