//! Annotated frame output.
//!
//! There is no window toolkit in this crate. Annotated frames go to a
//! `FrameSink`: either a JPEG snapshot file refreshed at a bounded rate (open
//! it in any auto-reloading image viewer) or nowhere.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use image::RgbImage;

pub const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_millis(500);

pub trait FrameSink {
    /// Show one annotated frame.
    fn present(&mut self, image: &RgbImage) -> Result<()>;
}

/// Discards frames.
#[derive(Default)]
pub struct NullSink {
    presented: u64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl FrameSink for NullSink {
    fn present(&mut self, _image: &RgbImage) -> Result<()> {
        self.presented += 1;
        Ok(())
    }
}

/// Writes the latest frame to a JPEG file at most once per `interval`.
///
/// The file is written next to the target and renamed over it, so readers
/// never see a partial image.
pub struct SnapshotSink {
    path: PathBuf,
    staging: PathBuf,
    interval: Duration,
    last_write: Option<Instant>,
    written: u64,
}

impl SnapshotSink {
    pub fn new<P: AsRef<Path>>(path: P, interval: Duration) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut staging = path.clone().into_os_string();
        staging.push(".partial.jpg");
        Self {
            path,
            staging: PathBuf::from(staging),
            interval,
            last_write: None,
            written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl FrameSink for SnapshotSink {
    fn present(&mut self, image: &RgbImage) -> Result<()> {
        let now = Instant::now();
        if let Some(last) = self.last_write {
            if now.duration_since(last) < self.interval {
                return Ok(());
            }
        }
        image
            .save_with_format(&self.staging, image::ImageFormat::Jpeg)
            .with_context(|| format!("failed to write snapshot {}", self.staging.display()))?;
        std::fs::rename(&self.staging, &self.path)
            .with_context(|| format!("failed to publish snapshot {}", self.path.display()))?;
        self.last_write = Some(now);
        self.written += 1;
        Ok(())
    }
}

/// Build the sink for an optional snapshot path.
pub fn sink_for(path: Option<&Path>, interval: Duration) -> Box<dyn FrameSink> {
    match path {
        Some(path) => {
            log::info!("writing annotated frames to {}", path.display());
            Box::new(SnapshotSink::new(path, interval))
        }
        None => Box::new(NullSink::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_sink_writes_and_throttles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lane.jpg");
        let mut sink = SnapshotSink::new(&path, Duration::from_secs(60));
        let image = RgbImage::new(32, 32);

        sink.present(&image).unwrap();
        sink.present(&image).unwrap();

        assert_eq!(sink.written(), 1);
        let written = image::open(&path).unwrap();
        assert_eq!((written.width(), written.height()), (32, 32));
    }

    #[test]
    fn null_sink_counts_frames() {
        let mut sink = NullSink::new();
        sink.present(&RgbImage::new(2, 2)).unwrap();
        assert_eq!(sink.presented(), 1);
    }
}
