//! Trait abstraction for the analog joystick to enable testing

use crate::error::Result;

/// Two-axis analog stick read through a 12-bit ADC
///
/// Both axes return 0-4095 with the rest position near 2048.
#[cfg_attr(test, mockall::automock)]
pub trait JoystickInput {
    /// Steering axis
    fn read_x(&mut self) -> Result<u16>;

    /// Throttle axis
    fn read_y(&mut self) -> Result<u16>;
}
