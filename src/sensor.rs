//! The per-frame lane pipeline.
//!
//! One call to [`LaneSensor::process`] is one loop iteration:
//! region selection, detection inside the region, aggregation, a rate-limited
//! command to the signal controller, then annotation of the frame. The signal
//! state of an iteration depends only on that iteration's detections.

use std::time::Instant;

use anyhow::Result;

use crate::aggregate::SignalState;
use crate::command::Command;
use crate::detect::{detect_in_region, ClassMap, Detection, DetectorBackend};
use crate::frame::Frame;
use crate::notify::RateLimitedNotifier;
use crate::overlay::OverlayRenderer;
use crate::region::{Region, RegionBounds};
use crate::serial::SerialLink;

/// What one iteration saw and did.
#[derive(Clone, Debug)]
pub struct LaneReport {
    pub region: Region,
    pub detections: Vec<Detection>,
    pub signal: SignalState,
    /// Command that was due this iteration (sent, or dropped by a null link).
    pub command: Option<Command>,
}

pub struct LaneSensor {
    backend: Box<dyn DetectorBackend>,
    classes: ClassMap,
    bounds: RegionBounds,
    notifier: RateLimitedNotifier,
    link: SerialLink,
    renderer: OverlayRenderer,
}

impl LaneSensor {
    pub fn new(
        backend: Box<dyn DetectorBackend>,
        classes: ClassMap,
        bounds: RegionBounds,
        notifier: RateLimitedNotifier,
        link: SerialLink,
        renderer: OverlayRenderer,
    ) -> Result<Self> {
        bounds.validate()?;
        log::info!(
            "lane {} sensor: detector={} zone rows {}..{} interval={:?} serial={}",
            notifier.lane(),
            backend.name(),
            bounds.top,
            bounds.bottom,
            notifier.interval(),
            link.name()
        );
        Ok(Self {
            backend,
            classes,
            bounds,
            notifier,
            link,
            renderer,
        })
    }

    pub fn link(&self) -> &SerialLink {
        &self.link
    }

    pub fn notifier(&self) -> &RateLimitedNotifier {
        &self.notifier
    }

    pub fn process(&mut self, frame: &mut Frame, now: Instant) -> Result<LaneReport> {
        let region = self.bounds.select(frame.width(), frame.height());
        let detections = detect_in_region(self.backend.as_mut(), frame, &region, &self.classes)?;
        let signal = SignalState::aggregate(&detections, &self.classes);
        let command = self.notifier.notify(now, &signal, &mut self.link)?;

        self.renderer.draw_lane(
            frame.image_mut(),
            &region,
            &detections,
            &signal,
            &self.classes,
        );

        log::debug!(
            "frame {}: {} detections, {} vehicles, ambulance={}",
            frame.sequence,
            detections.len(),
            signal.vehicle_count,
            signal.ambulance
        );
        Ok(LaneReport {
            region,
            detections,
            signal,
            command,
        })
    }

    /// Release the serial device.
    pub fn shutdown(&mut self) -> Result<()> {
        self.link.close()
    }
}
