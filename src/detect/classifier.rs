use std::collections::VecDeque;

use anyhow::Result;
use image::{imageops, RgbImage};

/// Frame-sequence classifier input size (pixels, square).
pub const CLASSIFIER_INPUT_SIZE: u32 = 128;
/// Frames per classification window.
pub const CLASSIFIER_WINDOW: usize = 20;

/// Sliding window of resized, normalized frames.
///
/// Each entry is `size * size * 3` floats in row-major HWC order with BGR
/// channels scaled to `0..=1`, the layout the accident model was trained on.
pub struct FrameWindow {
    frames: VecDeque<Vec<f32>>,
    capacity: usize,
    size: u32,
}

impl FrameWindow {
    pub fn new(capacity: usize, size: u32) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            size,
        }
    }

    /// Resize, normalize and append a frame, evicting the oldest when full.
    pub fn push(&mut self, image: &RgbImage) {
        let resized = imageops::resize(image, self.size, self.size, imageops::FilterType::Triangle);
        let mut values = Vec::with_capacity((self.size * self.size * 3) as usize);
        for pixel in resized.pixels() {
            let [r, g, b] = pixel.0;
            values.push(b as f32 / 255.0);
            values.push(g as f32 / 255.0);
            values.push(r as f32 / 255.0);
        }
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(values);
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Frames oldest first.
    pub fn frames(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.frames.iter().map(|f| f.as_slice())
    }
}

/// Frame-sequence classifier backend: window in, probability out.
pub trait ClassifierBackend {
    fn name(&self) -> &'static str;

    /// Probability (0..=1) that the window shows the positive class.
    fn classify(&mut self, window: &FrameWindow) -> Result<f32>;
}

impl<C: ClassifierBackend + ?Sized> ClassifierBackend for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn classify(&mut self, window: &FrameWindow) -> Result<f32> {
        (**self).classify(window)
    }
}

/// Replays a fixed list of probabilities, cycling. An empty script yields 0.
pub struct StubClassifier {
    script: Vec<f32>,
    calls: usize,
}

impl StubClassifier {
    pub fn scripted(script: Vec<f32>) -> Self {
        Self { script, calls: 0 }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl ClassifierBackend for StubClassifier {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn classify(&mut self, _window: &FrameWindow) -> Result<f32> {
        let index = self.calls;
        self.calls += 1;
        if self.script.is_empty() {
            return Ok(0.0);
        }
        Ok(self.script[index % self.script.len()])
    }
}
