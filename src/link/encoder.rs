//! # Command Encoder
//!
//! Packs motion commands into 4-byte frames and decides, once per transmit
//! cycle, whether to send a command or a keep-alive.

use super::checksum::command_checksum;
use super::protocol::*;
use super::transmitter::BitTransmitter;
use crate::error::Result;
use crate::radio::LinkOutput;
use embedded_hal::delay::DelayNs;
use tracing::{debug, warn};

/// Linearly remap `value` from `[old_min, old_max]` onto `[new_min, new_max]`
///
/// Computed in floating point and truncated toward zero.
///
/// # Examples
///
/// ```
/// use rc433_link::link::encoder::remap;
///
/// assert_eq!(remap(4095, 0, 4095, 0, 1023), 1023);
/// assert_eq!(remap(0, 0, 4095, 0, 1023), 0);
/// assert_eq!(remap(2048, 0, 4095, 0, 1023), 511);
/// ```
pub fn remap(value: u16, old_min: u16, old_max: u16, new_min: u16, new_max: u16) -> u16 {
    let span_in = f32::from(old_max) - f32::from(old_min);
    let span_out = f32::from(new_max) - f32::from(new_min);
    let fraction = (f32::from(value) - f32::from(old_min)) / span_in;
    (f32::from(new_min) + span_out * fraction) as u16
}

/// Clamp a controller axis sample to the 12-bit input range
pub fn clamp_axis_input(value: u16) -> u16 {
    value.min(INPUT_AXIS_MAX)
}

/// Pack a command into the 32-bit wire word, checksum included
///
/// Axis values are expected in wire range and are masked to their field
/// widths.
pub fn encode_command_word(command: &Command) -> u32 {
    let y = command.y & AXIS_Y_MAX;
    let x = command.x & AXIS_X_MAX;
    let checksum = command_checksum(y, x, command.servo_direction);

    let mut word = MARKER_BIT;
    word = (word << 1) | u32::from(command.motor_direction);
    word = (word << AXIS_Y_BITS) | u32::from(y);
    word = (word << AXIS_X_BITS) | u32::from(x);
    word = (word << 1) | u32::from(command.servo_direction);
    word = (word << CHECKSUM_BITS) | u32::from(checksum);
    word
}

/// Pack a command into its 4-byte frame, most significant byte first
pub fn encode_command_frame(command: &Command) -> [u8; COMMAND_FRAME_LEN] {
    encode_command_word(command).to_be_bytes()
}

/// Field state with per-field change tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fields {
    motor_direction: bool,
    servo_direction: bool,
    y: u16,
    x: u16,
    motor_direction_dirty: bool,
    servo_direction_dirty: bool,
    y_dirty: bool,
    x_dirty: bool,
}

impl Default for Fields {
    fn default() -> Self {
        Self {
            motor_direction: true,
            servo_direction: false,
            y: 0,
            x: 0,
            motor_direction_dirty: false,
            servo_direction_dirty: false,
            y_dirty: false,
            x_dirty: false,
        }
    }
}

impl Fields {
    /// A command is only worth sending when a whole (direction, axis) pair is fresh
    fn ready(&self) -> bool {
        let all = self.motor_direction_dirty
            && self.servo_direction_dirty
            && self.y_dirty
            && self.x_dirty;
        let throttle = self.motor_direction_dirty && self.y_dirty;
        let steering = self.servo_direction_dirty && self.x_dirty;
        all || throttle || steering
    }

    fn clear_dirty(&mut self) {
        self.motor_direction_dirty = false;
        self.servo_direction_dirty = false;
        self.y_dirty = false;
        self.x_dirty = false;
    }

    /// Current fields rescaled from the 12-bit input range to wire range
    fn to_command(self) -> Command {
        Command::new(
            self.motor_direction,
            self.servo_direction,
            remap(self.y, 0, INPUT_AXIS_MAX, 0, AXIS_Y_MAX),
            remap(self.x, 0, INPUT_AXIS_MAX, 0, AXIS_X_MAX),
        )
    }
}

/// Transmitter-side message builder
///
/// Setters take controller-range values (0-4095) and mark the field dirty.
/// [`make_message`](Self::make_message) is called once per loop iteration.
///
/// # Examples
///
/// ```
/// use rc433_link::link::encoder::MessageEncoder;
/// use rc433_link::link::protocol::Transmission;
/// use rc433_link::link::transmitter::BitTransmitter;
/// use rc433_link::radio::HalOutput;
/// use rc433_link::radio::loopback::{Airwaves, VirtualClock, VirtualDelay};
///
/// let air = Airwaves::new();
/// let clock = VirtualClock::new();
/// let tx = BitTransmitter::new(
///     HalOutput::new(air.transmitter(clock.clone())),
///     VirtualDelay::new(clock.clone()),
/// );
/// let mut encoder = MessageEncoder::new(tx);
///
/// encoder.set_motor_direction(true);
/// encoder.set_y(4095);
/// assert!(matches!(encoder.make_message()?, Transmission::Command(_)));
/// assert_eq!(encoder.make_message()?, Transmission::KeepAlive);
/// # Ok::<(), rc433_link::error::LinkError>(())
/// ```
#[derive(Debug)]
pub struct MessageEncoder<O, D> {
    transmitter: BitTransmitter<O, D>,
    fields: Fields,
    repeat: u32,
    gap_ms: u32,
}

impl<O: LinkOutput, D: DelayNs> MessageEncoder<O, D> {
    /// Create an encoder sending each command once with a 6 ms gap
    pub fn new(transmitter: BitTransmitter<O, D>) -> Self {
        Self::with_framing(transmitter, 1, COMMAND_GAP_MS)
    }

    /// Create an encoder with a custom repeat count and post-command gap
    pub fn with_framing(transmitter: BitTransmitter<O, D>, repeat: u32, gap_ms: u32) -> Self {
        Self {
            transmitter,
            fields: Fields::default(),
            repeat,
            gap_ms,
        }
    }

    pub fn set_motor_direction(&mut self, forward: bool) {
        self.fields.motor_direction = forward;
        self.fields.motor_direction_dirty = true;
    }

    pub fn set_servo_direction(&mut self, right: bool) {
        self.fields.servo_direction = right;
        self.fields.servo_direction_dirty = true;
    }

    /// Set throttle magnitude (0-4095); larger values are clamped
    pub fn set_y(&mut self, value: u16) {
        if value > INPUT_AXIS_MAX {
            warn!("Throttle input {} out of range, clamping to {}", value, INPUT_AXIS_MAX);
        }
        self.fields.y = clamp_axis_input(value);
        self.fields.y_dirty = true;
    }

    /// Set steering magnitude (0-4095); larger values are clamped
    pub fn set_x(&mut self, value: u16) {
        if value > INPUT_AXIS_MAX {
            warn!("Steering input {} out of range, clamping to {}", value, INPUT_AXIS_MAX);
        }
        self.fields.x = clamp_axis_input(value);
        self.fields.x_dirty = true;
    }

    /// Whether the next `make_message` will send a command
    pub fn has_pending_command(&self) -> bool {
        self.fields.ready()
    }

    /// The command that would be sent now, in wire range
    pub fn current_command(&self) -> Command {
        self.fields.to_command()
    }

    /// Send a command if a complete field pair changed, otherwise a keep-alive
    ///
    /// Dirty flags are cleared only after a command was sent.
    pub fn make_message(&mut self) -> Result<Transmission> {
        if !self.fields.ready() {
            self.transmitter.keep_alive()?;
            return Ok(Transmission::KeepAlive);
        }

        let command = self.fields.to_command();
        let frame = encode_command_frame(&command);
        self.transmitter.send_message(&frame, self.repeat, self.gap_ms)?;
        self.fields.clear_dirty();

        debug!(
            "Sent command: motor_dir={} servo_dir={} y={} x={} frame={:02X?}",
            command.motor_direction, command.servo_direction, command.y, command.x, frame
        );
        Ok(Transmission::Command(frame))
    }
}
