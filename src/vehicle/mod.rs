//! # Vehicle Module
//!
//! Receiver-side consumer of decoded commands.
//!
//! This module handles:
//! - Driving the motor through a single-pin or dual-bridge driver
//! - Positioning the steering servo
//! - Pulling fresh commands from the pulse receiver

pub mod motor;
pub mod pwm;
pub mod servo;

use crate::config::VehicleConfig;
use crate::error::Result;
use crate::link::protocol::Command;
use crate::link::receiver::PulseReceiver;
use crate::radio::{LinkInput, MicrosClock};
use motor::MotorDriver;
use pwm::{PwmOutput, DUTY_MAX};
use servo::Servo;
use tracing::debug;

/// Servo channel on the PWM expander
pub const SERVO_CHANNEL: u8 = 0;

/// Motor speed channel on the PWM expander
pub const MOTOR_PWM_CHANNEL: u8 = 1;

/// Backward enable (or the single direction line)
pub const MOTOR_BACKWARD_CHANNEL: u8 = 2;

/// Forward enable on a dual bridge
pub const MOTOR_FORWARD_CHANNEL: u8 = 3;

/// The car: one PWM expander, one drive motor, one steering servo
#[derive(Debug)]
pub struct Vehicle<P, M> {
    pwm: P,
    motor: M,
    servo: Servo,
    speed_scale: u16,
    last_applied: Option<Command>,
}

impl<P: PwmOutput, M: MotorDriver> Vehicle<P, M> {
    pub fn new(pwm: P, motor: M, servo: Servo, speed_scale: u16) -> Self {
        Self {
            pwm,
            motor,
            servo,
            speed_scale,
            last_applied: None,
        }
    }

    /// Build a vehicle with the servo on [`SERVO_CHANNEL`], setting the
    /// PWM output frequency first
    ///
    /// # Errors
    ///
    /// Returns error if the PWM driver rejects the frequency
    pub fn from_config(mut pwm: P, motor: M, config: &VehicleConfig) -> Result<Self> {
        pwm.set_frequency_hz(config.pwm_frequency_hz)?;
        Ok(Self::new(
            pwm,
            motor,
            Servo::from_config(SERVO_CHANNEL, config),
            config.speed_scale,
        ))
    }

    /// Drive the outputs from a command
    ///
    /// # Errors
    ///
    /// Returns error if a PWM write fails; outputs written before the failure
    /// keep their new values
    pub fn apply(&mut self, command: &Command) -> Result<()> {
        let speed = command.y.saturating_mul(self.speed_scale).min(DUTY_MAX);
        let magnitude = command.x as i16;
        let position = if command.servo_direction {
            magnitude
        } else {
            -magnitude
        };

        self.motor.set_direction(&mut self.pwm, command.motor_direction)?;
        self.motor.set_speed(&mut self.pwm, speed)?;
        self.servo.set_position(&mut self.pwm, position)?;

        debug!(
            "Applied command: forward={} speed={} steering={}",
            command.motor_direction, speed, position
        );
        self.last_applied = Some(*command);
        Ok(())
    }

    /// Apply the receiver's pending command, if any
    ///
    /// # Returns
    ///
    /// * `Result<bool>` - Whether a new command was applied
    pub fn poll<I: LinkInput, C: MicrosClock>(
        &mut self,
        receiver: &mut PulseReceiver<I, C>,
    ) -> Result<bool> {
        match receiver.take_command() {
            Some(command) => {
                self.apply(&command)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn last_applied(&self) -> Option<Command> {
        self.last_applied
    }

    pub fn pwm(&self) -> &P {
        &self.pwm
    }

    pub fn motor(&self) -> &M {
        &self.motor
    }
}
