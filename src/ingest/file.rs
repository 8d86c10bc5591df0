//! Local video file source.
//!
//! Plays a local file front to back. At the end of the file `next_frame`
//! returns `None`; callers that loop playback call `rewind` and keep reading.
//! `stub://` paths play a synthetic clip of `clip_frames` frames.

use anyhow::{anyhow, Result};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::synthetic::SyntheticScene;
use super::{FrameSource, SourceStats, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::frame::Frame;

pub const DEFAULT_CLIP_FRAMES: u64 = 300;

#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local file path (e.g. "traffic.mp4") or `stub://<name>`.
    pub path: String,
    /// Resize every decoded frame to this size.
    pub resize: Option<(u32, u32)>,
    /// Length of a synthetic clip.
    pub clip_frames: u64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            resize: Some((DEFAULT_WIDTH, DEFAULT_HEIGHT)),
            clip_frames: DEFAULT_CLIP_FRAMES,
        }
    }
}

pub struct FileSource {
    backend: FileBackend,
    resize: Option<(u32, u32)>,
    sequence: u64,
    rewinds: u64,
}

enum FileBackend {
    Synthetic(SyntheticClip),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn new(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "video playback only supports local paths, got '{}'",
                config.path
            ));
        }
        let resize = config.resize;
        let backend = if super::is_synthetic(&config.path) {
            FileBackend::Synthetic(SyntheticClip::new(config))
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                FileBackend::Ffmpeg(FfmpegFileSource::new(config)?)
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                return Err(anyhow!(
                    "video playback requires the ingest-file-ffmpeg feature"
                ));
            }
        };
        Ok(Self {
            backend,
            resize,
            sequence: 0,
            rewinds: 0,
        })
    }
}

impl FrameSource for FileSource {
    fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.connect(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let next = match &mut self.backend {
            FileBackend::Synthetic(source) => source.next_image(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_image()?,
        };
        let Some(image) = next else {
            return Ok(None);
        };
        self.sequence += 1;
        let frame = Frame::new(image, self.sequence);
        Ok(Some(match self.resize {
            Some((width, height)) => frame.resized(width, height),
            None => frame,
        }))
    }

    fn rewind(&mut self) -> Result<()> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.rewind(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.rewind()?,
        }
        self.rewinds += 1;
        log::info!("FileSource: rewound to the first frame");
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        match &self.backend {
            FileBackend::Synthetic(_) => true,
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.is_healthy(),
        }
    }

    fn stats(&self) -> SourceStats {
        let source = match &self.backend {
            FileBackend::Synthetic(source) => source.path.clone(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.path().to_string(),
        };
        SourceStats {
            frames_captured: self.sequence,
            rewinds: self.rewinds,
            source,
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic clip (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticClip {
    path: String,
    scene: SyntheticScene,
    length: u64,
    position: u64,
}

impl SyntheticClip {
    fn new(config: FileConfig) -> Self {
        let (width, height) = config.resize.unwrap_or((DEFAULT_WIDTH, DEFAULT_HEIGHT));
        Self {
            scene: SyntheticScene::new(width, height, 0x0f11e),
            path: config.path,
            length: config.clip_frames,
            position: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        log::info!(
            "FileSource: opened {} (synthetic, {} frames)",
            self.path,
            self.length
        );
        Ok(())
    }

    fn next_image(&mut self) -> Option<image::RgbImage> {
        if self.position >= self.length {
            return None;
        }
        let image = self.scene.render(self.position);
        self.position += 1;
        Some(image)
    }

    fn rewind(&mut self) {
        self.position = 0;
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if super::is_synthetic(path) {
        return true;
    }
    !path.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub(frames: u64) -> FileSource {
        let mut source = FileSource::new(FileConfig {
            path: "stub://clip".to_string(),
            resize: Some((320, 180)),
            clip_frames: frames,
        })
        .unwrap();
        source.connect().unwrap();
        source
    }

    #[test]
    fn synthetic_clip_ends_and_rewinds() {
        let mut source = stub(3);
        let first = source.next_frame().unwrap().unwrap();
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());

        source.rewind().unwrap();
        let again = source.next_frame().unwrap().unwrap();
        assert_eq!(again.image().as_raw(), first.image().as_raw());
        // Sequence keeps counting across rewinds.
        assert_eq!(again.sequence, 4);

        let stats = source.stats();
        assert_eq!(stats.rewinds, 1);
        assert_eq!(stats.frames_captured, 4);
    }

    #[test]
    fn remote_urls_are_rejected() {
        let err = FileSource::new(FileConfig {
            path: "rtsp://camera/stream".to_string(),
            ..FileConfig::default()
        });
        assert!(err.is_err());
        assert!(FileSource::new(FileConfig::default()).is_err());
    }

    #[test]
    fn frames_have_requested_size() {
        let mut source = stub(1);
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!((frame.width(), frame.height()), (320, 180));
    }
}
