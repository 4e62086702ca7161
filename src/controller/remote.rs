//! # Remote Control Pipeline
//!
//! One transmit cycle of the handheld remote:
//!
//! ```text
//! joystick ─▶ moving average ─▶ re-center + deadzone ─▶ ramp ─▶ encoder setters ─▶ make_message
//! ```
//!
//! Stick values are signed after shaping. The sign becomes the direction flag
//! and the magnitude becomes the axis value. A field is only handed to the
//! encoder when its ramp output changed, so a stick held still produces
//! keep-alives instead of repeated commands.

use super::calibration::StickShaper;
use super::joystick::JoystickInput;
use super::ramp::Ramp;
use super::smoothing::MovingAverage;
use crate::config::RemoteConfig;
use crate::error::Result;
use crate::link::encoder::MessageEncoder;
use crate::link::protocol::{Transmission, INPUT_AXIS_MAX};
use crate::radio::{LinkOutput, MicrosClock};
use embedded_hal::delay::DelayNs;
use tracing::trace;

/// Magnitude of a shaped value in encoder input range
fn magnitude(value: i32) -> u16 {
    value.unsigned_abs().min(u32::from(INPUT_AXIS_MAX)) as u16
}

/// Transmitter-side control loop
#[derive(Debug)]
pub struct Remote<J, O, D, C> {
    joystick: J,
    encoder: MessageEncoder<O, D>,
    clock: C,
    throttle_avg: MovingAverage,
    steering_avg: MovingAverage,
    throttle_shaper: StickShaper,
    steering_shaper: StickShaper,
    throttle_ramp: Ramp,
    steering_ramp: Ramp,
    motor_forward: bool,
    last_throttle: i32,
    last_steering: i32,
}

impl<J, O, D, C> Remote<J, O, D, C>
where
    J: JoystickInput,
    O: LinkOutput,
    D: DelayNs,
    C: MicrosClock,
{
    /// Build the pipeline around an encoder
    ///
    /// # Arguments
    ///
    /// * `joystick` - Analog stick
    /// * `encoder` - Message encoder owning the transmitter line
    /// * `clock` - Time base for the acceleration ramps
    /// * `config` - Smoothing windows, deadzones and ramp rates
    pub fn new(joystick: J, encoder: MessageEncoder<O, D>, clock: C, config: &RemoteConfig) -> Self {
        Self {
            joystick,
            encoder,
            clock,
            throttle_avg: MovingAverage::new(config.throttle_window),
            steering_avg: MovingAverage::new(config.steering_window),
            throttle_shaper: StickShaper::new(
                config.throttle_deadzone_low,
                config.throttle_deadzone_high,
            ),
            steering_shaper: StickShaper::symmetric(config.steering_deadzone),
            throttle_ramp: Ramp::new(config.throttle_step, config.ramp_interval_us),
            steering_ramp: Ramp::new(config.steering_step, config.ramp_interval_us),
            motor_forward: true,
            last_throttle: 0,
            last_steering: 0,
        }
    }

    /// Run one read-shape-send cycle
    ///
    /// # Returns
    ///
    /// * `Result<Transmission>` - What went out on the air this cycle
    ///
    /// # Errors
    ///
    /// Returns error if the joystick or the transmitter line fails
    pub fn cycle(&mut self) -> Result<Transmission> {
        let raw_y = self.joystick.read_y()?;
        let raw_x = self.joystick.read_x()?;

        let target_throttle = self.throttle_shaper.shape(self.throttle_avg.push(raw_y));
        let target_steering = self.steering_shaper.shape(self.steering_avg.push(raw_x));

        let now = self.clock.now_us();
        let throttle = self.throttle_ramp.update(target_throttle, now);
        let steering = self.steering_ramp.update(target_steering, now);

        if throttle != self.last_throttle {
            // Stick pulled below center drives forward; zero keeps the last direction
            if throttle < 0 {
                self.motor_forward = true;
            } else if throttle > 0 {
                self.motor_forward = false;
            }
            self.encoder.set_motor_direction(self.motor_forward);
            self.encoder.set_y(magnitude(throttle));
            self.last_throttle = throttle;
        }

        if steering != self.last_steering {
            self.encoder.set_servo_direction(steering >= 0);
            self.encoder.set_x(magnitude(steering));
            self.last_steering = steering;
        }

        trace!(
            "Remote cycle: raw=({}, {}) target=({}, {}) ramped=({}, {})",
            raw_x, raw_y, target_steering, target_throttle, steering, throttle
        );

        self.encoder.make_message()
    }

    pub fn encoder(&self) -> &MessageEncoder<O, D> {
        &self.encoder
    }

    /// Current ramped throttle, negative is forward
    pub fn throttle(&self) -> i32 {
        self.last_throttle
    }

    /// Current ramped steering, negative is left
    pub fn steering(&self) -> i32 {
        self.last_steering
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::joystick::MockJoystickInput;
    use crate::error::LinkError;
    use crate::link::transmitter::BitTransmitter;
    use crate::radio::loopback::{VirtualClock, VirtualDelay};

    struct NullLine;

    impl LinkOutput for NullLine {
        fn set_level(&mut self, _high: bool) -> Result<()> {
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn stick(x: u16, y: u16) -> MockJoystickInput {
        let mut joystick = MockJoystickInput::new();
        joystick.expect_read_x().returning(move || Ok(x));
        joystick.expect_read_y().returning(move || Ok(y));
        joystick
    }

    fn remote(
        joystick: MockJoystickInput,
    ) -> Remote<MockJoystickInput, NullLine, VirtualDelay, VirtualClock> {
        let clock = VirtualClock::new();
        let tx = BitTransmitter::new(NullLine, VirtualDelay::new(clock.clone()));
        Remote::new(joystick, MessageEncoder::new(tx), clock, &RemoteConfig::default())
    }

    #[test]
    fn test_magnitude() {
        assert_eq!(magnitude(0), 0);
        assert_eq!(magnitude(-80), 80);
        assert_eq!(magnitude(4094), 4094);
        assert_eq!(magnitude(-4096), 4095);
    }

    #[test]
    fn test_centered_stick_only_keeps_alive() {
        let mut remote = remote(stick(2048, 2048));
        for _ in 0..10 {
            assert_eq!(remote.cycle().unwrap(), Transmission::KeepAlive);
        }
        assert_eq!(remote.throttle(), 0);
        assert_eq!(remote.steering(), 0);
    }

    #[test]
    fn test_stick_drift_inside_deadzone_ignored() {
        let mut remote = remote(stick(2090, 2110));
        for _ in 0..5 {
            assert_eq!(remote.cycle().unwrap(), Transmission::KeepAlive);
        }
    }

    #[test]
    fn test_full_forward_ramps_up() {
        let mut remote = remote(stick(2048, 0));

        // First cycle only starts the ramp timer
        assert_eq!(remote.cycle().unwrap(), Transmission::KeepAlive);

        // The keep-alive took several ms, so a step is due
        assert!(matches!(remote.cycle().unwrap(), Transmission::Command(_)));
        assert_eq!(remote.throttle(), -80);

        let cmd = remote.encoder().current_command();
        assert!(cmd.motor_direction);
        assert_eq!(cmd.y, 19);
    }

    #[test]
    fn test_reverse_throttle_clears_motor_direction() {
        let mut remote = remote(stick(2048, 4095));
        remote.cycle().unwrap();
        remote.cycle().unwrap();

        assert_eq!(remote.throttle(), 80);
        assert!(!remote.encoder().current_command().motor_direction);
    }

    #[test]
    fn test_throttle_reaches_target() {
        let mut remote = remote(stick(2048, 0));
        for _ in 0..100 {
            remote.cycle().unwrap();
        }
        assert_eq!(remote.throttle(), -4096);
        assert_eq!(remote.encoder().current_command().y, 1023);

        // Settled: nothing new to send
        assert_eq!(remote.cycle().unwrap(), Transmission::KeepAlive);
    }

    #[test]
    fn test_steering_right_sets_servo_direction() {
        let mut remote = remote(stick(4095, 2048));
        remote.cycle().unwrap();
        assert!(matches!(remote.cycle().unwrap(), Transmission::Command(_)));

        assert_eq!(remote.steering(), 200);
        let cmd = remote.encoder().current_command();
        assert!(cmd.servo_direction);
        assert_eq!(cmd.x, 24);
    }

    #[test]
    fn test_steering_left_clears_servo_direction() {
        let mut remote = remote(stick(0, 2048));
        remote.cycle().unwrap();
        remote.cycle().unwrap();

        assert_eq!(remote.steering(), -200);
        assert!(!remote.encoder().current_command().servo_direction);
    }

    #[test]
    fn test_joystick_error_propagates() {
        let mut joystick = MockJoystickInput::new();
        joystick
            .expect_read_y()
            .returning(|| Err(LinkError::Pin("ADC timeout".to_string())));
        joystick.expect_read_x().never();

        let mut remote = remote(joystick);
        assert!(matches!(remote.cycle(), Err(LinkError::Pin(_))));
    }
}
