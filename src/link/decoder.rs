//! # Command Decoder
//!
//! Unpacks received 4-byte frames back into command fields and validates the
//! checksum.

use super::checksum::verify_checksum;
use super::protocol::*;
use crate::error::{LinkError, Result};

/// Unpack a 32-bit command word
///
/// Fields are peeled off from the least significant end in reverse packing
/// order. The marker bit is ignored.
pub fn decode_command_word(word: u32) -> DecodedMessage {
    let mut rest = word;

    let checksum = (rest & u32::from(CHECKSUM_MASK)) as u16;
    rest >>= CHECKSUM_BITS;
    let servo_direction = rest & 1 == 1;
    rest >>= 1;
    let x = (rest & u32::from(AXIS_X_MAX)) as u16;
    rest >>= AXIS_X_BITS;
    let y = (rest & u32::from(AXIS_Y_MAX)) as u16;
    rest >>= AXIS_Y_BITS;
    let motor_direction = rest & 1 == 1;

    DecodedMessage {
        fields: Command {
            motor_direction,
            servo_direction,
            y,
            x,
        },
        checksum,
        valid: verify_checksum(y, x, servo_direction, checksum),
    }
}

/// Decode the first four bytes of a received bit buffer
///
/// # Arguments
///
/// * `frame` - Received bytes, most significant first (at least 4)
///
/// # Errors
///
/// Returns error if fewer than 4 bytes are given. A checksum mismatch is not
/// an error; it is reported through [`DecodedMessage::valid`].
///
/// # Examples
///
/// ```
/// use rc433_link::link::decoder::decode_frame;
///
/// let msg = decode_frame(&[0xC9, 0x51, 0x28, 0xDF])?;
/// assert!(msg.valid);
/// assert_eq!(msg.fields.y, 149);
/// assert_eq!(msg.fields.x, 37);
/// # Ok::<(), rc433_link::error::LinkError>(())
/// ```
pub fn decode_frame(frame: &[u8]) -> Result<DecodedMessage> {
    if frame.len() < COMMAND_FRAME_LEN {
        return Err(LinkError::Protocol(format!(
            "Frame too short: expected {} bytes, got {}",
            COMMAND_FRAME_LEN,
            frame.len()
        )));
    }

    let word = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]);
    Ok(decode_command_word(word))
}
