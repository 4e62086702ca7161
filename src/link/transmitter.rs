//! # Bit Transmitter
//!
//! Pulse-width keying of bytes onto the transmitter data line.
//!
//! Every symbol is one carrier-on period followed by one carrier-off period.
//! The bit value is carried by which of the two is long:
//!
//! ```text
//!  1:  ‾‾‾‾‾‾‾‾‾‾‾‾|______        (long on, short off)
//!  0:  ‾‾‾‾‾‾|____________        (short on, long off)
//! ```
//!
//! The receiver only measures the carrier-on time, so `long_pulse_us` must be
//! above its classification threshold and `short_pulse_us` below it.

use super::protocol::{KEEP_ALIVE_FRAME, KEEP_ALIVE_GAP_MS, LONG_PULSE_US, SHORT_PULSE_US};
use crate::error::Result;
use crate::radio::LinkOutput;
use embedded_hal::delay::DelayNs;
use tracing::trace;

/// Symbol and gap durations used by the transmitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxTiming {
    /// Short half of a symbol in microseconds
    pub short_pulse_us: u32,

    /// Long half of a symbol in microseconds
    pub long_pulse_us: u32,

    /// Idle gap after a keep-alive byte in milliseconds
    pub keep_alive_gap_ms: u32,
}

impl Default for TxTiming {
    fn default() -> Self {
        Self {
            short_pulse_us: SHORT_PULSE_US,
            long_pulse_us: LONG_PULSE_US,
            keep_alive_gap_ms: KEEP_ALIVE_GAP_MS,
        }
    }
}

/// Drives the transmitter line symbol by symbol
///
/// All waits are blocking; they are the wire encoding, not incidental latency.
#[derive(Debug)]
pub struct BitTransmitter<O, D> {
    line: O,
    delay: D,
    timing: TxTiming,
}

impl<O: LinkOutput, D: DelayNs> BitTransmitter<O, D> {
    /// Create a transmitter with the default 200/400 µs symbol timing
    pub fn new(line: O, delay: D) -> Self {
        Self::with_timing(line, delay, TxTiming::default())
    }

    pub fn with_timing(line: O, delay: D, timing: TxTiming) -> Self {
        Self {
            line,
            delay,
            timing,
        }
    }

    pub fn timing(&self) -> TxTiming {
        self.timing
    }

    /// Assert `high` and hold it for `hold_us`
    fn hold(&mut self, high: bool, hold_us: u32) -> Result<()> {
        self.line.set_level(high)?;
        self.line.flush()?;
        self.delay.delay_us(hold_us);
        Ok(())
    }

    /// Send a `1`: long carrier, short gap
    pub fn send_one(&mut self) -> Result<()> {
        self.hold(true, self.timing.long_pulse_us)?;
        self.hold(false, self.timing.short_pulse_us)
    }

    /// Send a `0`: short carrier, long gap
    pub fn send_zero(&mut self) -> Result<()> {
        self.hold(true, self.timing.short_pulse_us)?;
        self.hold(false, self.timing.long_pulse_us)
    }

    /// Send the 8 bits of `byte`, most significant first
    pub fn send_byte(&mut self, byte: u8) -> Result<()> {
        for bit in (0..8).rev() {
            if (byte >> bit) & 1 == 1 {
                self.send_one()?;
            } else {
                self.send_zero()?;
            }
        }
        Ok(())
    }

    /// Send `data` `repeat` times, idling `gap_ms` after each copy
    ///
    /// The gap is what terminates a frame at the receiver, so it must exceed
    /// the receiver's frame timeout.
    pub fn send_message(&mut self, data: &[u8], repeat: u32, gap_ms: u32) -> Result<()> {
        for copy in 0..repeat {
            for &byte in data {
                self.send_byte(byte)?;
            }
            trace!("Sent frame copy {} ({} bytes), idling {} ms", copy + 1, data.len(), gap_ms);
            self.delay.delay_ms(gap_ms);
        }
        Ok(())
    }

    /// Send a single zero byte to keep the receiver's noise floor settled
    ///
    /// Eight bits is below the receiver's minimum frame length, so this is
    /// never decoded as a command.
    pub fn keep_alive(&mut self) -> Result<()> {
        self.send_message(&KEEP_ALIVE_FRAME, 1, self.timing.keep_alive_gap_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LinkError;
    use crate::radio::pin_trait::MockLinkOutput;
    use mockall::Sequence;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every requested wait in microseconds
    #[derive(Clone, Default)]
    struct RecordingDelay {
        waits_us: Rc<RefCell<Vec<u32>>>,
    }

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.waits_us.borrow_mut().push(ns / 1_000);
        }

        fn delay_us(&mut self, us: u32) {
            self.waits_us.borrow_mut().push(us);
        }

        fn delay_ms(&mut self, ms: u32) {
            self.waits_us.borrow_mut().push(ms * 1_000);
        }
    }

    /// Output line that records levels as they are asserted
    #[derive(Clone, Default)]
    struct RecordingLine {
        levels: Rc<RefCell<Vec<bool>>>,
        flushes: Rc<RefCell<usize>>,
    }

    impl LinkOutput for RecordingLine {
        fn set_level(&mut self, high: bool) -> Result<()> {
            self.levels.borrow_mut().push(high);
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            *self.flushes.borrow_mut() += 1;
            Ok(())
        }
    }

    fn recording_transmitter() -> (BitTransmitter<RecordingLine, RecordingDelay>, RecordingLine, RecordingDelay) {
        let line = RecordingLine::default();
        let delay = RecordingDelay::default();
        let tx = BitTransmitter::new(line.clone(), delay.clone());
        (tx, line, delay)
    }

    #[test]
    fn test_send_one_is_long_then_short() {
        let mut line = MockLinkOutput::new();
        let mut seq = Sequence::new();

        line.expect_set_level().withf(|&h| h).times(1).in_sequence(&mut seq).returning(|_| Ok(()));
        line.expect_flush().times(1).in_sequence(&mut seq).returning(|| Ok(()));
        line.expect_set_level().withf(|&h| !h).times(1).in_sequence(&mut seq).returning(|_| Ok(()));
        line.expect_flush().times(1).in_sequence(&mut seq).returning(|| Ok(()));

        let delay = RecordingDelay::default();
        let mut tx = BitTransmitter::new(line, delay.clone());
        tx.send_one().unwrap();

        assert_eq!(*delay.waits_us.borrow(), vec![400, 200]);
    }

    #[test]
    fn test_send_zero_is_short_then_long() {
        let (mut tx, line, delay) = recording_transmitter();
        tx.send_zero().unwrap();

        assert_eq!(*line.levels.borrow(), vec![true, false]);
        assert_eq!(*line.flushes.borrow(), 2);
        assert_eq!(*delay.waits_us.borrow(), vec![200, 400]);
    }

    #[test]
    fn test_every_symbol_has_same_period() {
        let (mut tx, _line, delay) = recording_transmitter();
        tx.send_byte(0xA5).unwrap();

        let waits = delay.waits_us.borrow();
        assert_eq!(waits.len(), 16);
        for symbol in waits.chunks(2) {
            assert_eq!(symbol[0] + symbol[1], 600);
        }
    }

    #[test]
    fn test_send_byte_msb_first() {
        let (mut tx, _line, delay) = recording_transmitter();
        tx.send_byte(0b1000_0001).unwrap();

        let highs: Vec<u32> = delay.waits_us.borrow().chunks(2).map(|s| s[0]).collect();
        assert_eq!(highs, vec![400, 200, 200, 200, 200, 200, 200, 400]);
    }

    #[test]
    fn test_send_message_repeats_with_gap() {
        let (mut tx, line, delay) = recording_transmitter();
        tx.send_message(&[0xFF, 0x00], 2, 6).unwrap();

        // 2 copies x 2 bytes x 8 symbols x 2 levels
        assert_eq!(line.levels.borrow().len(), 64);

        let waits = delay.waits_us.borrow();
        assert_eq!(waits.len(), 2 * (32 + 1));
        assert_eq!(waits[32], 6_000);
        assert_eq!(waits[65], 6_000);
    }

    #[test]
    fn test_send_message_zero_repeat_sends_nothing() {
        let (mut tx, line, delay) = recording_transmitter();
        tx.send_message(&[0xFF], 0, 6).unwrap();

        assert!(line.levels.borrow().is_empty());
        assert!(delay.waits_us.borrow().is_empty());
    }

    #[test]
    fn test_keep_alive_sends_single_zero_byte() {
        let (mut tx, line, delay) = recording_transmitter();
        tx.keep_alive().unwrap();

        assert_eq!(line.levels.borrow().len(), 16);
        let waits = delay.waits_us.borrow();
        assert!(waits[..16].chunks(2).all(|s| s == [200, 400]));
        assert_eq!(waits[16], 3_000);
    }

    #[test]
    fn test_custom_timing() {
        let timing = TxTiming {
            short_pulse_us: 150,
            long_pulse_us: 450,
            keep_alive_gap_ms: 4,
        };
        let delay = RecordingDelay::default();
        let mut tx = BitTransmitter::with_timing(RecordingLine::default(), delay.clone(), timing);
        tx.send_one().unwrap();

        assert_eq!(tx.timing(), timing);
        assert_eq!(*delay.waits_us.borrow(), vec![450, 150]);
    }

    #[test]
    fn test_line_error_stops_transmission() {
        let mut line = MockLinkOutput::new();
        line.expect_set_level()
            .times(1)
            .returning(|_| Err(LinkError::Pin("stuck".to_string())));
        line.expect_flush().never();

        let mut tx = BitTransmitter::new(line, RecordingDelay::default());
        assert!(matches!(tx.send_byte(0xFF), Err(LinkError::Pin(_))));
    }
}
