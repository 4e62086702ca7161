//! Trait abstraction for the radio module's lines and time base to enable testing

use crate::error::Result;

/// Transmitter data line driving the OOK module
///
/// `set_level(true)` turns the carrier on. `flush` must not return until the
/// level is physically asserted, because symbol timing starts right after it.
#[cfg_attr(test, mockall::automock)]
pub trait LinkOutput {
    /// Drive the line high (carrier on) or low (carrier off)
    fn set_level(&mut self, high: bool) -> Result<()>;

    /// Wait until the last level is asserted on the pin
    fn flush(&mut self) -> Result<()>;
}

/// Receiver data line from the OOK module
#[cfg_attr(test, mockall::automock)]
pub trait LinkInput {
    /// Whether a carrier is currently detected
    fn is_active(&mut self) -> Result<bool>;
}

/// Free-running microsecond counter
#[cfg_attr(test, mockall::automock)]
pub trait MicrosClock {
    /// Microseconds since an arbitrary, fixed origin
    fn now_us(&self) -> u64;
}
