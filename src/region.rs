//! Lane zone selection.
//!
//! The lane zone is a horizontal band of the frame. Its vertical bounds are
//! fixed pixel offsets taken from configuration, and it always spans the full
//! frame width. The bounds do not scale with the capture resolution: callers
//! are expected to deliver 1280x720 frames.

use anyhow::{anyhow, Result};

pub const DEFAULT_REGION_TOP: u32 = 200;
pub const DEFAULT_REGION_BOTTOM: u32 = 650;

/// Configured vertical bounds of the lane zone, in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionBounds {
    pub top: u32,
    pub bottom: u32,
}

impl Default for RegionBounds {
    fn default() -> Self {
        Self {
            top: DEFAULT_REGION_TOP,
            bottom: DEFAULT_REGION_BOTTOM,
        }
    }
}

impl RegionBounds {
    pub fn new(top: u32, bottom: u32) -> Result<Self> {
        let bounds = Self { top, bottom };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top >= self.bottom {
            return Err(anyhow!(
                "region top ({}) must be above region bottom ({})",
                self.top,
                self.bottom
            ));
        }
        if self.bottom > i32::MAX as u32 {
            return Err(anyhow!("region bottom {} is out of range", self.bottom));
        }
        Ok(())
    }

    /// Derive the lane zone for a frame of the given size.
    ///
    /// The result is `(0, top, width, bottom)` regardless of `height`; use
    /// [`Region::clamped`] to get the part that actually lies inside the frame.
    pub fn select(&self, width: u32, _height: u32) -> Region {
        Region {
            left: 0,
            top: self.top as i32,
            right: width.min(i32::MAX as u32) as i32,
            bottom: self.bottom as i32,
        }
    }
}

/// Rectangle in frame coordinates: `left <= x < right`, `top <= y < bottom`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Region {
    pub fn width(&self) -> u32 {
        (self.right - self.left).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom - self.top).max(0) as u32
    }

    /// Offset that maps region-local coordinates back into the frame.
    pub fn origin(&self) -> (i32, i32) {
        (self.left, self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Intersect with a `width` x `height` frame.
    ///
    /// Bounds past the frame edge are truncated the way an array slice would
    /// be. Returns `None` when nothing of the region is left.
    pub fn clamped(&self, width: u32, height: u32) -> Option<Region> {
        let max_x = width.min(i32::MAX as u32) as i32;
        let max_y = height.min(i32::MAX as u32) as i32;
        let clamped = Region {
            left: self.left.clamp(0, max_x),
            top: self.top.clamp(0, max_y),
            right: self.right.clamp(0, max_x),
            bottom: self.bottom.clamp(0, max_y),
        };
        if clamped.is_empty() {
            None
        } else {
            Some(clamped)
        }
    }
}
