//! Accident classification over a sliding window of frames.
//!
//! Every frame is downscaled into a fixed-length window. Once the window is
//! full, every `interval`-th frame is classified and the verdict goes straight
//! out as a single byte: `A` above the threshold, `N` otherwise. There is no
//! rate limiter on this path. `N` is sent once more on shutdown so the
//! controller is left in its normal state.

use std::time::Duration;

use anyhow::{anyhow, Result};
use image::Rgb;

use crate::command::Command;
use crate::detect::{ClassifierBackend, FrameWindow, CLASSIFIER_INPUT_SIZE, CLASSIFIER_WINDOW};
use crate::frame::Frame;
use crate::overlay::{ALERT_STATUS_COLOR, NORMAL_STATUS_COLOR};
use crate::serial::{SerialLink, SerialSettings};

/// Probability above which a window is an accident (strict).
pub const ACCIDENT_THRESHOLD: f32 = 0.6;
pub const PREDICTION_INTERVAL: u64 = 10;
pub const ACCIDENT_BAUD: u32 = 9600;
pub const ACCIDENT_SETTLE: Duration = Duration::from_secs(2);
pub const INITIAL_STATUS: &str = "Status: Initializing...";

/// Serial defaults for the accident controller board.
pub fn serial_settings(port: Option<String>) -> SerialSettings {
    SerialSettings {
        port,
        baud: ACCIDENT_BAUD,
        settle: ACCIDENT_SETTLE,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AccidentVerdict {
    pub probability: f32,
    pub accident: bool,
}

impl AccidentVerdict {
    pub fn from_probability(probability: f32, threshold: f32) -> Self {
        Self {
            probability,
            accident: probability > threshold,
        }
    }

    pub fn command(&self) -> Command {
        if self.accident {
            Command::Accident
        } else {
            Command::Normal
        }
    }

    pub fn status_text(&self) -> String {
        if self.accident {
            format!("Status: ACCIDENT DETECTED! ({:.2})", self.probability)
        } else {
            format!("Status: Normal ({:.2})", self.probability)
        }
    }

    pub fn status_color(&self) -> Rgb<u8> {
        if self.accident {
            ALERT_STATUS_COLOR
        } else {
            NORMAL_STATUS_COLOR
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonitorSettings {
    pub window: usize,
    pub input_size: u32,
    pub interval: u64,
    pub threshold: f32,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            window: CLASSIFIER_WINDOW,
            input_size: CLASSIFIER_INPUT_SIZE,
            interval: PREDICTION_INTERVAL,
            threshold: ACCIDENT_THRESHOLD,
        }
    }
}

pub struct AccidentMonitor {
    classifier: Box<dyn ClassifierBackend>,
    window: FrameWindow,
    settings: MonitorSettings,
    frame_counter: u64,
    last_verdict: Option<AccidentVerdict>,
    link: SerialLink,
}

impl AccidentMonitor {
    pub fn new(
        classifier: Box<dyn ClassifierBackend>,
        settings: MonitorSettings,
        link: SerialLink,
    ) -> Result<Self> {
        if settings.window == 0 || settings.input_size == 0 || settings.interval == 0 {
            return Err(anyhow!(
                "accident window, input size and interval must be greater than zero"
            ));
        }
        log::info!(
            "accident monitor: classifier={} window={} every {} frames threshold={}",
            classifier.name(),
            settings.window,
            settings.interval,
            settings.threshold
        );
        Ok(Self {
            classifier,
            window: FrameWindow::new(settings.window, settings.input_size),
            settings,
            frame_counter: 0,
            last_verdict: None,
            link,
        })
    }

    /// Add `frame` to the window and classify when due.
    ///
    /// A produced verdict has already been written to the serial link.
    pub fn observe(&mut self, frame: &Frame) -> Result<Option<AccidentVerdict>> {
        self.frame_counter += 1;
        self.window.push(frame.image());

        if !self.window.is_full() || self.frame_counter % self.settings.interval != 0 {
            return Ok(None);
        }

        let probability = self.classifier.classify(&self.window)?;
        let verdict = AccidentVerdict::from_probability(probability, self.settings.threshold);
        log::info!(
            "frame {}: accident probability {:.2}",
            self.frame_counter,
            probability
        );
        self.link.send(&verdict.command())?;
        self.last_verdict = Some(verdict);
        Ok(Some(verdict))
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    pub fn last_verdict(&self) -> Option<AccidentVerdict> {
        self.last_verdict
    }

    pub fn link(&self) -> &SerialLink {
        &self.link
    }

    /// Status line for the overlay.
    pub fn status(&self) -> (String, Rgb<u8>) {
        match self.last_verdict {
            Some(verdict) => (verdict.status_text(), verdict.status_color()),
            None => (INITIAL_STATUS.to_string(), NORMAL_STATUS_COLOR),
        }
    }

    /// Reset the controller to normal and release the port.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.link.is_connected() {
            self.link.send(&Command::Normal)?;
        }
        self.link.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::StubClassifier;
    use image::RgbImage;

    fn monitor(script: Vec<f32>) -> AccidentMonitor {
        AccidentMonitor::new(
            Box::new(StubClassifier::scripted(script)),
            MonitorSettings {
                input_size: 8,
                ..MonitorSettings::default()
            },
            SerialLink::null(),
        )
        .unwrap()
    }

    fn frame(sequence: u64) -> Frame {
        Frame::new(RgbImage::new(32, 24), sequence)
    }

    #[test]
    fn threshold_is_strict() {
        assert!(!AccidentVerdict::from_probability(0.6, ACCIDENT_THRESHOLD).accident);
        assert!(AccidentVerdict::from_probability(0.61, ACCIDENT_THRESHOLD).accident);
    }

    #[test]
    fn classifies_every_tenth_frame_once_window_is_full() {
        let mut monitor = monitor(vec![0.1]);
        let produced: Vec<u64> = (1..=45)
            .filter(|&i| monitor.observe(&frame(i)).unwrap().is_some())
            .collect();
        assert_eq!(produced, vec![20, 30, 40]);
    }

    #[test]
    fn status_follows_latest_verdict() {
        let mut monitor = monitor(vec![0.87, 0.12]);
        assert_eq!(monitor.status().0, INITIAL_STATUS);

        for i in 1..=20 {
            monitor.observe(&frame(i)).unwrap();
        }
        let (text, color) = monitor.status();
        assert_eq!(text, "Status: ACCIDENT DETECTED! (0.87)");
        assert_eq!(color, ALERT_STATUS_COLOR);

        for i in 21..=30 {
            monitor.observe(&frame(i)).unwrap();
        }
        let (text, color) = monitor.status();
        assert_eq!(text, "Status: Normal (0.12)");
        assert_eq!(color, NORMAL_STATUS_COLOR);
    }
}
