//! # Link Protocol Constants and Types
//!
//! Core definitions for the 32-bit command word carried over the 433 MHz link.
//!
//! ```text
//!  bit 31   30      29..20     19..11     10      9..0
//! +------+-----+-----------+----------+-----+------------+
//! |  1   | MD  |  Y (10)   |  X (9)   | SD  | CHECK (10) |
//! +------+-----+-----------+----------+-----+------------+
//! ```
//!
//! The word is sent most significant byte first. The marker bit is always set
//! so a command can never look like an idle, all-zero line.

/// Value of the leading marker bit
pub const MARKER_BIT: u32 = 1;

/// Width of the throttle (Y) field in bits
pub const AXIS_Y_BITS: u32 = 10;

/// Width of the steering (X) field in bits
pub const AXIS_X_BITS: u32 = 9;

/// Width of the checksum field in bits
pub const CHECKSUM_BITS: u32 = 10;

/// Maximum throttle value on the wire (10-bit)
pub const AXIS_Y_MAX: u16 = (1 << AXIS_Y_BITS) - 1;

/// Maximum steering value on the wire (9-bit)
pub const AXIS_X_MAX: u16 = (1 << AXIS_X_BITS) - 1;

/// Checksum field mask
pub const CHECKSUM_MASK: u16 = (1 << CHECKSUM_BITS) - 1;

/// Maximum axis value accepted from the controller ADC (12-bit)
pub const INPUT_AXIS_MAX: u16 = 4095;

/// Size of an encoded command frame in bytes
pub const COMMAND_FRAME_LEN: usize = 4;

/// Number of bits in an encoded command frame
pub const COMMAND_FRAME_BITS: u16 = (COMMAND_FRAME_LEN * 8) as u16;

/// The keep-alive frame: a single zero byte
pub const KEEP_ALIVE_FRAME: [u8; 1] = [0x00];

/// Default receiver bit buffer size in bytes
pub const DEFAULT_BUFFER_LEN: usize = 64;

/// Default short pulse duration in microseconds
pub const SHORT_PULSE_US: u32 = 200;

/// Default long pulse duration in microseconds
pub const LONG_PULSE_US: u32 = 400;

/// Carrier-on durations strictly above this are classified as a `1` bit
pub const BIT_THRESHOLD_US: u64 = 300;

/// Silence after the last pulse that terminates a frame
pub const FRAME_TIMEOUT_US: u64 = 2000;

/// Idle gap after a command frame (leaves room for the PWM bus on the same loop)
pub const COMMAND_GAP_MS: u32 = 6;

/// Idle gap after a keep-alive frame
pub const KEEP_ALIVE_GAP_MS: u32 = 3;

/// A motion command with wire-range axis values.
///
/// `y` is the throttle magnitude (0-1023), `x` the steering magnitude
/// (0-511). The direction flags carry the sign of each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Command {
    /// Motor direction, `true` is forward
    pub motor_direction: bool,

    /// Servo direction, `true` is right
    pub servo_direction: bool,

    /// Throttle magnitude (0-1023)
    pub y: u16,

    /// Steering magnitude (0-511)
    pub x: u16,
}

impl Command {
    /// Create a command, masking each axis to its wire width
    pub fn new(motor_direction: bool, servo_direction: bool, y: u16, x: u16) -> Self {
        Self {
            motor_direction,
            servo_direction,
            y: y & AXIS_Y_MAX,
            x: x & AXIS_X_MAX,
        }
    }
}

/// Result of unpacking one received command word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedMessage {
    /// Fields as found on the wire (untrusted unless `valid`)
    pub fields: Command,

    /// Checksum carried by the frame
    pub checksum: u16,

    /// Whether the carried checksum matches the recomputed one
    pub valid: bool,
}

impl DecodedMessage {
    /// The command, only if the checksum matched.
    ///
    /// Fields of a rejected frame must never reach the motor layer.
    #[must_use]
    pub fn command(&self) -> Option<Command> {
        self.valid.then_some(self.fields)
    }
}

/// What the encoder put on the air during one transmit cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transmission {
    /// A full command frame
    Command([u8; COMMAND_FRAME_LEN]),

    /// A keep-alive byte
    KeepAlive,
}
