//! # Calibration Module
//!
//! Re-centers smoothed joystick samples and applies deadzones.
//!
//! ## Normalization
//!
//! The joystick ADC produces 0-4095 with its rest position near 2048. A sample
//! is re-centered and doubled:
//!
//! `output = (sample - 2048) * 2`
//!
//! giving a signed value in -4096..=4094.
//!
//! ## Deadzone
//!
//! Stick drift around the rest position is removed by forcing every output
//! inside `[low, high]` to zero. The throttle deadzone is asymmetric since the
//! stick tends to rest slightly above center.
//!
//! ## Usage
//!
//! ```
//! use rc433_link::controller::calibration::StickShaper;
//!
//! let throttle = StickShaper::new(-50, 150);
//!
//! assert_eq!(throttle.shape(2048), 0);
//! assert_eq!(throttle.shape(2100), 0);     // +104, inside deadzone
//! assert_eq!(throttle.shape(0), -4096);
//! ```

/// ADC value of the stick rest position
pub const STICK_CENTER: i32 = 2048;

/// Re-centers a joystick sample and applies a deadzone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StickShaper {
    /// Lowest normalized value forced to zero
    low: i32,
    /// Highest normalized value forced to zero
    high: i32,
}

impl Default for StickShaper {
    fn default() -> Self {
        Self::symmetric(100)
    }
}

impl StickShaper {
    /// Creates a shaper with deadzone `[low, high]` in normalized units.
    ///
    /// # Arguments
    ///
    /// * `low` - Lower deadzone edge. Positive values are clamped to 0.
    /// * `high` - Upper deadzone edge. Negative values are clamped to 0.
    #[must_use]
    pub fn new(low: i32, high: i32) -> Self {
        Self {
            low: low.min(0),
            high: high.max(0),
        }
    }

    /// Creates a shaper with deadzone `[-width, width]`.
    #[must_use]
    pub fn symmetric(width: i32) -> Self {
        Self::new(-width, width)
    }

    /// Creates a shaper that only re-centers.
    #[must_use]
    pub fn linear() -> Self {
        Self::new(0, 0)
    }

    /// Normalize `sample` around the stick center and apply the deadzone.
    #[must_use]
    pub fn shape(&self, sample: u16) -> i32 {
        let value = (i32::from(sample) - STICK_CENTER) * 2;
        if (self.low..=self.high).contains(&value) {
            0
        } else {
            value
        }
    }

    /// Returns the deadzone edges.
    #[must_use]
    pub fn deadzone(&self) -> (i32, i32) {
        (self.low, self.high)
    }
}
