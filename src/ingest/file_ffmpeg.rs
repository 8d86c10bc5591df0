//! Local video decoding using FFmpeg.
//!
//! Frames are converted to RGB24 in memory. End of file drains the decoder
//! before reporting end of stream; rewinding reopens the file.

use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;
use image::RgbImage;
use std::time::{Duration, Instant};

use super::file::FileConfig;

struct Decoding {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    eof_sent: bool,
}

pub(crate) struct FfmpegFileSource {
    config: FileConfig,
    decoding: Decoding,
    connected_at: Option<Instant>,
    last_frame_at: Option<Instant>,
    last_error: Option<String>,
}

impl FfmpegFileSource {
    pub(crate) fn new(config: FileConfig) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let decoding = open(&config.path)?;
        Ok(Self {
            config,
            decoding,
            connected_at: None,
            last_frame_at: None,
            last_error: None,
        })
    }

    pub(crate) fn path(&self) -> &str {
        &self.config.path
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        self.connected_at = Some(Instant::now());
        log::info!(
            "FileSource: opened {} ({}x{}, ffmpeg)",
            self.config.path,
            self.decoding.decoder.width(),
            self.decoding.decoder.height()
        );
        Ok(())
    }

    pub(crate) fn next_image(&mut self) -> Result<Option<RgbImage>> {
        let result = self.decoding.next_image();
        match &result {
            Ok(Some(_)) => {
                self.last_frame_at = Some(Instant::now());
                self.last_error = None;
            }
            Ok(None) => log::info!("FileSource: end of {}", self.config.path),
            Err(err) => self.last_error = Some(err.to_string()),
        }
        result
    }

    pub(crate) fn rewind(&mut self) -> Result<()> {
        self.decoding = open(&self.config.path)?;
        Ok(())
    }

    pub(crate) fn is_healthy(&self) -> bool {
        if self.last_error.is_some() {
            return false;
        }
        let Some(connected_at) = self.connected_at else {
            return false;
        };
        match self.last_frame_at {
            Some(last_frame_at) => last_frame_at.elapsed() <= Duration::from_secs(2),
            None => connected_at.elapsed() <= Duration::from_secs(5),
        }
    }
}

fn open(path: &str) -> Result<Decoding> {
    let input = ffmpeg::format::input(&path)
        .with_context(|| format!("failed to open video file '{}' with ffmpeg", path))?;
    let input_stream = input
        .streams()
        .best(ffmpeg::media::Type::Video)
        .ok_or_else(|| anyhow::anyhow!("'{}' has no video track", path))?;
    let stream_index = input_stream.index();
    let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
        .context("load video decoder parameters")?;
    let decoder = context
        .decoder()
        .video()
        .context("open ffmpeg video decoder")?;

    let scaler = ffmpeg::software::scaling::context::Context::get(
        decoder.format(),
        decoder.width(),
        decoder.height(),
        ffmpeg::util::format::pixel::Pixel::RGB24,
        decoder.width(),
        decoder.height(),
        ffmpeg::software::scaling::flag::Flags::BILINEAR,
    )
    .context("create ffmpeg scaler")?;

    Ok(Decoding {
        input,
        stream_index,
        decoder,
        scaler,
        eof_sent: false,
    })
}

impl Decoding {
    fn next_image(&mut self) -> Result<Option<RgbImage>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            // Frames already buffered in the decoder come first.
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.convert(&decoded).map(Some);
            }
            if self.eof_sent {
                return Ok(None);
            }

            let mut sent = false;
            for (stream, packet) in self.input.packets() {
                if stream.index() != self.stream_index {
                    continue;
                }
                self.decoder
                    .send_packet(&packet)
                    .context("send packet to ffmpeg decoder")?;
                sent = true;
                break;
            }
            if !sent {
                self.decoder.send_eof().context("flush ffmpeg decoder")?;
                self.eof_sent = true;
            }
        }
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video) -> Result<RgbImage> {
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb_frame)
            .context("scale frame to RGB")?;
        frame_to_image(&rgb_frame)
    }
}

fn frame_to_image(frame: &ffmpeg::frame::Video) -> Result<RgbImage> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    let pixels = if stride == row_bytes {
        data.get(..row_bytes * height as usize)
            .context("ffmpeg frame is shorter than its dimensions")?
            .to_vec()
    } else {
        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            let end = start + row_bytes;
            pixels.extend_from_slice(
                data.get(start..end)
                    .context("ffmpeg frame row is out of bounds")?,
            );
        }
        pixels
    };

    RgbImage::from_raw(width, height, pixels).context("ffmpeg frame size mismatch")
}
