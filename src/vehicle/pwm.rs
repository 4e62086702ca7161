//! # PWM Output
//!
//! Channel-addressed PWM outputs on the vehicle (a 16-channel PWM expander in
//! the reference build).
//!
//! Duty is given in 12-bit ticks: `0` is fully off and [`DUTY_MAX`] fully on.

use crate::error::{LinkError, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Fully-on duty value
pub const DUTY_MAX: u16 = 4095;

/// Number of channels on the PWM expander
pub const PWM_CHANNELS: u8 = 16;

/// Highest output frequency the expander can run at
pub const PWM_FREQUENCY_MAX_HZ: u16 = 1600;

/// Channel-addressed PWM driver
#[cfg_attr(test, mockall::automock)]
pub trait PwmOutput {
    /// Set `channel` to `duty` ticks out of 4095
    fn set_duty(&mut self, channel: u8, duty: u16) -> Result<()>;

    /// Set `channel` to a pulse of `pulse_us` microseconds per period
    fn set_pulse_us(&mut self, channel: u8, pulse_us: u16) -> Result<()>;

    /// Set the output frequency shared by every channel
    fn set_frequency_hz(&mut self, frequency_hz: u16) -> Result<()>;
}

/// What a channel was last told to output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmLevel {
    Duty(u16),
    PulseUs(u16),
}

/// In-memory PWM sink that logs every change
///
/// Stands in for the expander when no hardware is attached.
#[derive(Debug, Default, Clone)]
pub struct LoggingPwm {
    levels: BTreeMap<u8, PwmLevel>,
    frequency_hz: Option<u16>,
    writes: u64,
}

impl LoggingPwm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last level written to `channel`
    pub fn level(&self, channel: u8) -> Option<PwmLevel> {
        self.levels.get(&channel).copied()
    }

    /// Output frequency, once set
    pub fn frequency_hz(&self) -> Option<u16> {
        self.frequency_hz
    }

    /// Total successful channel writes
    pub fn writes(&self) -> u64 {
        self.writes
    }

    fn store(&mut self, channel: u8, level: PwmLevel) -> Result<()> {
        if channel >= PWM_CHANNELS {
            return Err(LinkError::Pwm(format!(
                "Channel {} out of range (0-{})",
                channel,
                PWM_CHANNELS - 1
            )));
        }

        if self.levels.insert(channel, level) != Some(level) {
            debug!("PWM channel {} -> {:?}", channel, level);
        }
        self.writes += 1;
        Ok(())
    }
}

impl PwmOutput for LoggingPwm {
    fn set_duty(&mut self, channel: u8, duty: u16) -> Result<()> {
        if duty > DUTY_MAX {
            return Err(LinkError::Pwm(format!(
                "Duty {} out of range (0-{})",
                duty, DUTY_MAX
            )));
        }
        self.store(channel, PwmLevel::Duty(duty))
    }

    fn set_pulse_us(&mut self, channel: u8, pulse_us: u16) -> Result<()> {
        self.store(channel, PwmLevel::PulseUs(pulse_us))
    }

    fn set_frequency_hz(&mut self, frequency_hz: u16) -> Result<()> {
        if frequency_hz == 0 || frequency_hz > PWM_FREQUENCY_MAX_HZ {
            return Err(LinkError::Pwm(format!(
                "Frequency {} Hz out of range (1-{})",
                frequency_hz, PWM_FREQUENCY_MAX_HZ
            )));
        }
        debug!("PWM frequency -> {} Hz", frequency_hz);
        self.frequency_hz = Some(frequency_hz);
        Ok(())
    }
}
