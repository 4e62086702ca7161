//! # Loopback Radio Medium
//!
//! Runs both ends of the link in one process, in virtual time.
//!
//! The transmitter writes carrier edges into [`Airwaves`] through
//! [`AirwavesTx`]; its busy-wait delays advance a [`VirtualClock`] instead of
//! spinning. The receiver polls [`AirwavesRx`] at its own virtual clock, so the
//! two sides can be stepped independently and deterministically.
//!
//! Like most real receiver modules, [`AirwavesRx`] reads low while a carrier
//! is present unless created with `active_low = false`.

use super::pin_trait::MicrosClock;
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Shared virtual time base with nanosecond resolution
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now_ns: Rc<Cell<u64>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ns(&self) -> u64 {
        self.now_ns.get()
    }

    pub fn advance_ns(&self, ns: u64) {
        self.now_ns.set(self.now_ns.get() + ns);
    }

    pub fn advance_us(&self, us: u64) {
        self.advance_ns(us * 1_000);
    }

    /// Jump to an absolute time; never moves backwards
    pub fn set_us(&self, us: u64) {
        let ns = us * 1_000;
        if ns > self.now_ns.get() {
            self.now_ns.set(ns);
        }
    }
}

impl MicrosClock for VirtualClock {
    fn now_us(&self) -> u64 {
        self.now_ns.get() / 1_000
    }
}

/// Delay that advances a [`VirtualClock`] instead of waiting
#[derive(Debug, Clone)]
pub struct VirtualDelay {
    clock: VirtualClock,
}

impl VirtualDelay {
    pub fn new(clock: VirtualClock) -> Self {
        Self { clock }
    }
}

impl DelayNs for VirtualDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.clock.advance_ns(u64::from(ns));
    }

    fn delay_us(&mut self, us: u32) {
        self.clock.advance_us(u64::from(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.clock.advance_us(u64::from(ms) * 1_000);
    }
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    at_ns: u64,
    carrier: bool,
}

#[derive(Debug, Default)]
struct Medium {
    edges: Vec<Edge>,
    noise: Vec<(u64, u64)>,
}

/// Carrier timeline shared by a transmitter and a receiver
#[derive(Debug, Clone, Default)]
pub struct Airwaves {
    medium: Rc<RefCell<Medium>>,
}

impl Airwaves {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output pin keyed by a transmitter whose time base is `clock`
    pub fn transmitter(&self, clock: VirtualClock) -> AirwavesTx {
        AirwavesTx {
            air: self.clone(),
            clock,
        }
    }

    /// Receiver module data pin sampled at `clock`
    ///
    /// With `active_low` the pin reads low while a carrier is present.
    pub fn receiver(&self, clock: VirtualClock, active_low: bool) -> AirwavesRx {
        AirwavesRx {
            air: self.clone(),
            clock,
            active_low,
        }
    }

    fn key(&self, at_ns: u64, carrier: bool) {
        let mut medium = self.medium.borrow_mut();
        let idx = medium.edges.partition_point(|e| e.at_ns <= at_ns);
        medium.edges.insert(idx, Edge { at_ns, carrier });
    }

    /// Overlay a burst of carrier, e.g. interference from another remote
    pub fn inject_pulse(&self, start_us: u64, width_us: u64) {
        let start = start_us * 1_000;
        self.medium
            .borrow_mut()
            .noise
            .push((start, start + width_us * 1_000));
    }

    /// Whether a carrier is on the air at `at_us`
    pub fn carrier_at(&self, at_us: u64) -> bool {
        let at_ns = at_us * 1_000;
        let medium = self.medium.borrow();
        let idx = medium.edges.partition_point(|e| e.at_ns <= at_ns);
        let keyed = idx > 0 && medium.edges[idx - 1].carrier;
        keyed
            || medium
                .noise
                .iter()
                .any(|&(start, end)| start <= at_ns && at_ns < end)
    }

    /// Time of the most recent transmitter edge
    pub fn last_edge_us(&self) -> Option<u64> {
        self.medium.borrow().edges.last().map(|e| e.at_ns / 1_000)
    }

    /// Number of transmitter edges currently held
    pub fn edge_count(&self) -> usize {
        self.medium.borrow().edges.len()
    }

    /// Drop history the receiver has already sampled past
    ///
    /// The last edge at or before `before_us` is kept since it still sets the
    /// current level.
    pub fn discard_before(&self, before_us: u64) {
        let before_ns = before_us * 1_000;
        let mut medium = self.medium.borrow_mut();
        let idx = medium.edges.partition_point(|e| e.at_ns <= before_ns);
        if idx > 1 {
            medium.edges.drain(..idx - 1);
        }
        medium.noise.retain(|&(_, end)| end > before_ns);
    }
}

/// Transmitter data pin; high keys the carrier
#[derive(Debug, Clone)]
pub struct AirwavesTx {
    air: Airwaves,
    clock: VirtualClock,
}

impl ErrorType for AirwavesTx {
    type Error = Infallible;
}

impl OutputPin for AirwavesTx {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.air.key(self.clock.now_ns(), false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.air.key(self.clock.now_ns(), true);
        Ok(())
    }
}

/// Receiver module data pin
#[derive(Debug, Clone)]
pub struct AirwavesRx {
    air: Airwaves,
    clock: VirtualClock,
    active_low: bool,
}

impl AirwavesRx {
    fn carrier(&self) -> bool {
        self.air.carrier_at(self.clock.now_us())
    }
}

impl ErrorType for AirwavesRx {
    type Error = Infallible;
}

impl InputPin for AirwavesRx {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.carrier() != self.active_low)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.carrier() == self.active_low)
    }
}
