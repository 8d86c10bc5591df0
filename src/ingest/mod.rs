//! Frame ingestion sources.
//!
//! - Live cameras (V4L2, feature: ingest-v4l2)
//! - Local video files (FFmpeg, feature: ingest-file-ffmpeg)
//! - Synthetic `stub://` scenes for both (always available)
//!
//! Every source hands out owned `Frame`s with a sequence number that keeps
//! counting across rewinds. `next_frame` returns `Ok(None)` at end of stream;
//! live cameras never end, they fail.

pub mod camera;
pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
mod normalize;
mod synthetic;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::frame::Frame;

pub use camera::{CameraConfig, CameraSource};
pub use file::{FileConfig, FileSource};

/// Resolution requested from cameras and used for resized video.
pub const DEFAULT_WIDTH: u32 = 1280;
pub const DEFAULT_HEIGHT: u32 = 720;
pub const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";

/// Path prefix selecting a synthetic scene instead of a real device or file.
pub const SYNTHETIC_PREFIX: &str = "stub://";

pub fn is_synthetic(path: &str) -> bool {
    path.starts_with(SYNTHETIC_PREFIX)
}

pub trait FrameSource {
    fn connect(&mut self) -> Result<()>;

    /// Next frame, or `None` once a finite stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Restart a finite stream at its first frame.
    fn rewind(&mut self) -> Result<()>;

    fn is_healthy(&self) -> bool;

    fn stats(&self) -> SourceStats;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }

    fn rewind(&mut self) -> Result<()> {
        (**self).rewind()
    }

    fn is_healthy(&self) -> bool {
        (**self).is_healthy()
    }

    fn stats(&self) -> SourceStats {
        (**self).stats()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub rewinds: u64,
    pub source: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Camera,
    Video,
}

impl std::str::FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "camera" => Ok(Self::Camera),
            "video" | "file" => Ok(Self::Video),
            other => Err(anyhow!("unknown source kind '{}' (camera|video)", other)),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Camera => write!(f, "camera"),
            Self::Video => write!(f, "video"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceSettings {
    pub kind: SourceKind,
    /// Device node, file path, or `stub://<name>`.
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
    /// Video only: rewind at end of stream instead of stopping.
    pub loop_playback: bool,
    /// Video only: resize decoded frames to `width` x `height`.
    pub resize: bool,
    /// Length of synthetic `stub://` video clips.
    pub clip_frames: u64,
}

impl SourceSettings {
    pub fn camera(path: &str) -> Self {
        Self {
            kind: SourceKind::Camera,
            path: path.to_string(),
            ..Self::default()
        }
    }

    pub fn video(path: &str) -> Self {
        Self {
            kind: SourceKind::Video,
            path: path.to_string(),
            ..Self::default()
        }
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            kind: SourceKind::Camera,
            path: DEFAULT_CAMERA_DEVICE.to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            target_fps: 30,
            loop_playback: true,
            resize: true,
            clip_frames: file::DEFAULT_CLIP_FRAMES,
        }
    }
}

/// Build and connect the source described by `settings`.
pub fn open_source(settings: &SourceSettings) -> Result<Box<dyn FrameSource>> {
    let mut source: Box<dyn FrameSource> = match settings.kind {
        SourceKind::Camera => Box::new(CameraSource::new(CameraConfig {
            device: settings.path.clone(),
            target_fps: settings.target_fps,
            width: settings.width,
            height: settings.height,
        })?),
        SourceKind::Video => Box::new(FileSource::new(FileConfig {
            path: settings.path.clone(),
            resize: settings.resize.then_some((settings.width, settings.height)),
            clip_frames: settings.clip_frames,
        })?),
    };
    source.connect()?;
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_parses() {
        assert_eq!("camera".parse::<SourceKind>().unwrap(), SourceKind::Camera);
        assert_eq!("Video".parse::<SourceKind>().unwrap(), SourceKind::Video);
        assert!("rtsp".parse::<SourceKind>().is_err());
    }

    #[test]
    fn open_source_connects_stub_camera() {
        let mut source = open_source(&SourceSettings::camera("stub://cam")).unwrap();
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!((frame.width(), frame.height()), (DEFAULT_WIDTH, DEFAULT_HEIGHT));
        assert!(source.is_healthy());
    }
}
