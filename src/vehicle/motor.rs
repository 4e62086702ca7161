//! # Motor Drivers
//!
//! Drive-motor control through PWM expander channels.
//!
//! Direction lines are PWM channels held fully on or fully off. The
//! "on" and "off" levels default to [`DUTY_MAX`] and `0` but can be lowered
//! or raised for drivers that want a softer enable signal.
//!
//! | Driver | Channels | Forward | Backward |
//! |--------|----------|---------|----------|
//! | [`SingleDirectionPinDriver`] | speed, dir | dir = on | dir = off |
//! | [`DualBridgeDriver`] (IBT-2) | speed, fwd, bwd | fwd = on, bwd = off | fwd = off, bwd = on |

use super::pwm::{PwmOutput, DUTY_MAX};
use crate::error::Result;
use tracing::trace;

/// A PWM-controlled drive motor
pub trait MotorDriver {
    /// Set the rotation direction, `true` is forward
    fn set_direction(&mut self, pwm: &mut dyn PwmOutput, forward: bool) -> Result<()>;

    /// Set the speed as a duty value (0-4095)
    fn set_speed(&mut self, pwm: &mut dyn PwmOutput, speed: u16) -> Result<()>;

    /// Last direction set, `true` is forward
    fn direction(&self) -> bool;
}

/// Direction line levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionLevels {
    pub on: u16,
    pub off: u16,
}

impl Default for DirectionLevels {
    fn default() -> Self {
        Self {
            on: DUTY_MAX,
            off: 0,
        }
    }
}

/// Driver with one speed channel and one direction channel
#[derive(Debug, Clone)]
pub struct SingleDirectionPinDriver {
    speed_channel: u8,
    direction_channel: u8,
    levels: DirectionLevels,
    forward: bool,
}

impl SingleDirectionPinDriver {
    pub fn new(speed_channel: u8, direction_channel: u8) -> Self {
        Self::with_levels(speed_channel, direction_channel, DirectionLevels::default())
    }

    pub fn with_levels(speed_channel: u8, direction_channel: u8, levels: DirectionLevels) -> Self {
        Self {
            speed_channel,
            direction_channel,
            levels,
            forward: true,
        }
    }
}

impl MotorDriver for SingleDirectionPinDriver {
    fn set_direction(&mut self, pwm: &mut dyn PwmOutput, forward: bool) -> Result<()> {
        let level = if forward { self.levels.on } else { self.levels.off };
        pwm.set_duty(self.direction_channel, level)?;
        self.forward = forward;
        Ok(())
    }

    fn set_speed(&mut self, pwm: &mut dyn PwmOutput, speed: u16) -> Result<()> {
        trace!("Motor speed {}", speed);
        pwm.set_duty(self.speed_channel, speed.min(DUTY_MAX))
    }

    fn direction(&self) -> bool {
        self.forward
    }
}

/// IBT-2 style bridge with separate forward and backward enable channels
#[derive(Debug, Clone)]
pub struct DualBridgeDriver {
    speed_channel: u8,
    forward_channel: u8,
    backward_channel: u8,
    levels: DirectionLevels,
    forward: bool,
}

impl DualBridgeDriver {
    pub fn new(speed_channel: u8, forward_channel: u8, backward_channel: u8) -> Self {
        Self::with_levels(
            speed_channel,
            forward_channel,
            backward_channel,
            DirectionLevels::default(),
        )
    }

    pub fn with_levels(
        speed_channel: u8,
        forward_channel: u8,
        backward_channel: u8,
        levels: DirectionLevels,
    ) -> Self {
        Self {
            speed_channel,
            forward_channel,
            backward_channel,
            levels,
            forward: true,
        }
    }
}

impl MotorDriver for DualBridgeDriver {
    fn set_direction(&mut self, pwm: &mut dyn PwmOutput, forward: bool) -> Result<()> {
        let (fwd, bwd) = if forward {
            (self.levels.on, self.levels.off)
        } else {
            (self.levels.off, self.levels.on)
        };
        pwm.set_duty(self.forward_channel, fwd)?;
        pwm.set_duty(self.backward_channel, bwd)?;
        self.forward = forward;
        Ok(())
    }

    fn set_speed(&mut self, pwm: &mut dyn PwmOutput, speed: u16) -> Result<()> {
        trace!("Motor speed {}", speed);
        pwm.set_duty(self.speed_channel, speed.min(DUTY_MAX))
    }

    fn direction(&self) -> bool {
        self.forward
    }
}
