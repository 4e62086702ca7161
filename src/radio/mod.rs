//! # Radio Hardware Module
//!
//! Connects the link protocol to the 433 MHz transmitter and receiver modules.
//!
//! This module handles:
//! - Adapting `embedded-hal` digital pins to the link's line traits
//! - Receiver polarity (most OOK receivers pull the data line low on carrier)
//! - A monotonic microsecond clock and busy-wait delay for hosted builds
//! - A loopback medium for running both ends of the link in virtual time

pub mod loopback;
pub mod pin_trait;

pub use pin_trait::{LinkInput, LinkOutput, MicrosClock};

use crate::error::{LinkError, Result};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use std::time::{Duration, Instant};

/// Transmitter line backed by an `embedded-hal` output pin
#[derive(Debug)]
pub struct HalOutput<P> {
    pin: P,
}

impl<P: OutputPin> HalOutput<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Give the pin back
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> LinkOutput for HalOutput<P> {
    fn set_level(&mut self, high: bool) -> Result<()> {
        let result = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        result.map_err(|e| LinkError::Pin(format!("Failed to drive transmitter pin: {:?}", e)))
    }

    fn flush(&mut self) -> Result<()> {
        // embedded-hal writes are synchronous
        Ok(())
    }
}

/// Receiver line backed by an `embedded-hal` input pin
#[derive(Debug)]
pub struct HalInput<P> {
    pin: P,
    active_low: bool,
}

impl<P: InputPin> HalInput<P> {
    /// Wrap a pin; `active_low` means a detected carrier reads as low
    pub fn new(pin: P, active_low: bool) -> Self {
        Self { pin, active_low }
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: InputPin> LinkInput for HalInput<P> {
    fn is_active(&mut self) -> Result<bool> {
        let result = if self.active_low {
            self.pin.is_low()
        } else {
            self.pin.is_high()
        };
        result.map_err(|e| LinkError::Pin(format!("Failed to read receiver pin: {:?}", e)))
    }
}

/// Monotonic clock anchored at construction
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: Instant,
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl MicrosClock for StdClock {
    fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

/// Busy-wait delay
///
/// Symbol timing is part of the wire encoding, so the transmitter spins
/// instead of yielding to the scheduler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinDelay;

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        let deadline = Instant::now() + Duration::from_nanos(u64::from(ns));
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}
