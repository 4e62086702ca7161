//! # Command Word Checksum
//!
//! 10-bit XOR checksum over the axis fields of a command word.
//!
//! `checksum = Y ^ ((X << 1) | servo_direction)`
//!
//! Both sides compute it over wire-range values, so any single flipped bit in
//! the Y, X or servo-direction fields changes the result.

use super::protocol::CHECKSUM_MASK;

/// Compute the checksum for the given wire-range fields
///
/// # Arguments
///
/// * `y` - Throttle value (0-1023)
/// * `x` - Steering value (0-511)
/// * `servo_direction` - Servo direction flag
///
/// # Examples
///
/// ```
/// use rc433_link::link::checksum::command_checksum;
///
/// assert_eq!(command_checksum(150, 75, false), 0);
/// ```
pub fn command_checksum(y: u16, x: u16, servo_direction: bool) -> u16 {
    let right = (x << 1) | u16::from(servo_direction);
    (y ^ right) & CHECKSUM_MASK
}

/// Check a received checksum against the fields it arrived with
pub fn verify_checksum(y: u16, x: u16, servo_direction: bool, received: u16) -> bool {
    command_checksum(y, x, servo_direction) == received
}
