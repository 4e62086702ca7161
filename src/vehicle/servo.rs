//! # Steering Servo
//!
//! Maps a signed steering position onto a servo pulse width.
//!
//! The mapping is inverted: the lowest position gives the longest pulse.
//!
//! ```text
//! position:  range_min ─────────── 0 ─────────── range_max
//! pulse:       us_max  ─────────  ~mid ─────────   us_min
//! ```

use super::pwm::PwmOutput;
use crate::config::VehicleConfig;
use crate::error::Result;
use tracing::trace;

/// Hobby servo on one PWM channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Servo {
    channel: u8,
    range_min: i16,
    range_max: i16,
    us_min: u16,
    us_max: u16,
}

impl Servo {
    /// Create a servo
    ///
    /// # Arguments
    ///
    /// * `channel` - PWM channel driving the servo
    /// * `range` - Position range `(min, max)`, `min < max`
    /// * `pulse_us` - Pulse range `(min, max)` for full travel
    pub fn new(channel: u8, range: (i16, i16), pulse_us: (u16, u16)) -> Self {
        Self {
            channel,
            range_min: range.0,
            range_max: range.1,
            us_min: pulse_us.0,
            us_max: pulse_us.1,
        }
    }

    pub fn from_config(channel: u8, config: &VehicleConfig) -> Self {
        Self::new(
            channel,
            (config.servo_range_min, config.servo_range_max),
            (config.servo_us_min, config.servo_us_max),
        )
    }

    /// Pulse width for `position`, inverted and truncated
    ///
    /// Positions outside the range are clamped to it.
    ///
    /// # Examples
    ///
    /// ```
    /// use rc433_link::vehicle::servo::Servo;
    ///
    /// let servo = Servo::new(0, (-512, 511), (500, 2500));
    /// assert_eq!(servo.pulse_for(-512), 2500);
    /// assert_eq!(servo.pulse_for(511), 500);
    /// assert_eq!(servo.pulse_for(0), 1499);
    /// ```
    pub fn pulse_for(&self, position: i16) -> u16 {
        let position = position.clamp(self.range_min, self.range_max);
        let fraction = (f32::from(position) - f32::from(self.range_min))
            / (f32::from(self.range_max) - f32::from(self.range_min));
        let span = f32::from(self.us_min) - f32::from(self.us_max);
        (f32::from(self.us_max) + span * fraction) as u16
    }

    /// Move the servo to `position`
    pub fn set_position(&self, pwm: &mut dyn PwmOutput, position: i16) -> Result<()> {
        let pulse = self.pulse_for(position);
        trace!("Servo position {} -> {} us", position, pulse);
        pwm.set_pulse_us(self.channel, pulse)
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }
}
