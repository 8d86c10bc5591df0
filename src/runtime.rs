//! Frame loop driver shared by the binaries.
//!
//! The loop is single-threaded: read, process, pace, repeat. It ends on a
//! shutdown request (Ctrl-C), after `max_frames`, or when the source runs dry
//! or fails to deliver a frame. With `loop_playback` both of the latter rewind
//! the source instead. Errors raised by the per-frame callback stop the loop
//! and are returned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::frame::Frame;
use crate::ingest::FrameSource;

pub const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Shared stop flag.
#[derive(Clone, Default)]
pub struct RunControl {
    shutdown: Arc<AtomicBool>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stop flag on Ctrl-C. Call at most once per process.
    pub fn install_ctrlc(&self) -> Result<()> {
        let shutdown = Arc::clone(&self.shutdown);
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::SeqCst);
        })
        .context("error setting Ctrl-C handler")
    }

    pub fn request_stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn should_stop(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug)]
pub struct LoopOptions {
    /// Rewind at end of stream instead of stopping.
    pub loop_playback: bool,
    /// Pause after each processed frame.
    pub frame_delay: Duration,
    pub max_frames: Option<u64>,
    pub health_interval: Duration,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            loop_playback: false,
            frame_delay: Duration::ZERO,
            max_frames: None,
            health_interval: HEALTH_LOG_INTERVAL,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    EndOfStream,
    MaxFrames,
    ReadFailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub rewinds: u64,
    pub reason: StopReason,
}

pub fn run_loop<S, F>(
    source: &mut S,
    control: &RunControl,
    options: &LoopOptions,
    mut on_frame: F,
) -> Result<RunSummary>
where
    S: FrameSource + ?Sized,
    F: FnMut(&mut Frame) -> Result<()>,
{
    let mut frames = 0u64;
    let mut rewinds = 0u64;
    let mut frames_since_rewind = 0u64;
    let mut last_health_log = Instant::now();

    let reason = loop {
        if control.should_stop() {
            log::info!("shutdown requested");
            break StopReason::Shutdown;
        }
        if options.max_frames.is_some_and(|max| frames >= max) {
            log::info!("processed {} frames, stopping", frames);
            break StopReason::MaxFrames;
        }

        let mut frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) if options.loop_playback && frames_since_rewind > 0 => {
                log::info!("end of stream, restarting playback");
                source.rewind()?;
                rewinds += 1;
                frames_since_rewind = 0;
                continue;
            }
            Ok(None) => {
                log::info!("end of stream after {} frames", frames);
                break StopReason::EndOfStream;
            }
            Err(err) if options.loop_playback && frames_since_rewind > 0 => {
                log::warn!("failed to read frame: {:#}; restarting playback", err);
                source.rewind()?;
                rewinds += 1;
                frames_since_rewind = 0;
                continue;
            }
            Err(err) => {
                log::error!("failed to read frame: {:#}", err);
                break StopReason::ReadFailed;
            }
        };

        on_frame(&mut frame)?;
        frames += 1;
        frames_since_rewind += 1;

        if last_health_log.elapsed() >= options.health_interval {
            let stats = source.stats();
            log::info!(
                "source health={} frames={} rewinds={} source={}",
                source.is_healthy(),
                stats.frames_captured,
                stats.rewinds,
                stats.source
            );
            last_health_log = Instant::now();
        }

        if !options.frame_delay.is_zero() {
            std::thread::sleep(options.frame_delay);
        }
    };

    Ok(RunSummary {
        frames,
        rewinds,
        reason,
    })
}
