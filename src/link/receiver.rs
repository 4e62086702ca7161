//! # Pulse Receiver
//!
//! Polling state machine that rebuilds frames from carrier pulse widths.
//!
//! ```text
//!            carrier                 carrier gone
//!   IDLE ─────────────▶ TIMING ─────────────────▶ TIMING_DONE
//!    ▲                    ▲                            │
//!    │                    └──────── carrier ───────────┤
//!    └──────── silence > frame timeout ────────────────┘
//! ```
//!
//! A carrier-on period longer than the bit threshold is a `1`, anything
//! shorter a `0`. There is no end-of-frame marker: a frame ends when the line
//! stays silent for longer than the frame timeout after the last pulse.
//!
//! [`PulseReceiver::tick`] must be called far more often than the shortest
//! pulse; each call samples the line once and makes at most one state
//! transition.

use super::decoder::decode_frame;
use super::protocol::{Command, DecodedMessage, BIT_THRESHOLD_US, DEFAULT_BUFFER_LEN, FRAME_TIMEOUT_US};
use crate::error::Result;
use crate::radio::{LinkInput, MicrosClock};
use tracing::{debug, trace, warn};

/// Receiver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxState {
    /// Waiting for the first pulse of a frame
    Idle,
    /// Carrier present, measuring its width
    Timing,
    /// Pulse finished; classifying it and waiting for the next one or for silence
    TimingDone,
}

/// Receiver thresholds and buffer size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxConfig {
    /// Pulses strictly longer than this are `1` bits
    pub bit_threshold_us: u64,

    /// Silence strictly longer than this ends a frame
    pub frame_timeout_us: u64,

    /// Bit buffer size in bytes
    pub buffer_len: usize,
}

impl Default for RxConfig {
    fn default() -> Self {
        Self {
            bit_threshold_us: BIT_THRESHOLD_US,
            frame_timeout_us: FRAME_TIMEOUT_US,
            buffer_len: DEFAULT_BUFFER_LEN,
        }
    }
}

/// Link quality counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkStats {
    /// Frames whose checksum matched
    pub frames_accepted: u64,

    /// Full frames rejected by the checksum
    pub checksum_failures: u64,

    /// Bursts of 8 bits or fewer (keep-alives and noise)
    pub noise_bursts: u64,

    /// Bursts longer than a keep-alive but shorter than a command
    pub short_frames: u64,

    /// Bits dropped because the buffer was full
    pub overflowed_bits: u64,
}

/// Receiver-side link endpoint
///
/// Owns the line, the clock and every piece of timing state; nothing else
/// mutates it, so no locking is involved. At most one decoded command is held
/// at a time and a newer valid frame replaces it.
#[derive(Debug)]
pub struct PulseReceiver<I, C> {
    input: I,
    clock: C,
    config: RxConfig,
    state: RxState,
    rise_us: Option<u64>,
    fall_us: u64,
    bit_timer_us: u64,
    pulse_pending: bool,
    count: u16,
    buffer: Vec<u8>,
    last_decoded: Option<DecodedMessage>,
    command: Option<Command>,
    available: bool,
    stats: LinkStats,
}

impl<I: LinkInput, C: MicrosClock> PulseReceiver<I, C> {
    /// Create a receiver with the default 300 µs / 2000 µs thresholds
    pub fn new(input: I, clock: C) -> Self {
        Self::with_config(input, clock, RxConfig::default())
    }

    pub fn with_config(input: I, clock: C, config: RxConfig) -> Self {
        Self {
            input,
            clock,
            config,
            state: RxState::Idle,
            rise_us: None,
            fall_us: 0,
            bit_timer_us: 0,
            pulse_pending: false,
            count: 0,
            buffer: vec![0; config.buffer_len],
            last_decoded: None,
            command: None,
            available: false,
            stats: LinkStats::default(),
        }
    }

    /// Advance the state machine by one poll
    ///
    /// # Errors
    ///
    /// Returns error only if the input line cannot be read.
    pub fn tick(&mut self) -> Result<()> {
        let active = self.input.is_active()?;

        match self.state {
            RxState::Idle => {
                if active {
                    self.count = 0;
                    self.rise_us = None;
                    self.state = RxState::Timing;
                }
            }

            RxState::Timing => {
                let now = self.clock.now_us();
                if self.rise_us.is_none() {
                    self.rise_us = Some(now);
                }
                if !active {
                    self.fall_us = now;
                    self.bit_timer_us = now;
                    self.pulse_pending = true;
                    self.state = RxState::TimingDone;
                }
            }

            RxState::TimingDone => {
                if self.pulse_pending {
                    self.classify_pulse();
                    self.pulse_pending = false;
                }

                let silence = self.clock.now_us().wrapping_sub(self.bit_timer_us);
                if silence > self.config.frame_timeout_us && !active {
                    self.finish_frame();
                    self.state = RxState::Idle;
                } else if active {
                    self.rise_us = None;
                    self.state = RxState::Timing;
                }
            }
        }

        Ok(())
    }

    /// Turn the last measured pulse into a bit
    fn classify_pulse(&mut self) {
        let rise = self.rise_us.unwrap_or(self.fall_us);
        let width = self.fall_us.wrapping_sub(rise);
        let bit = width > self.config.bit_threshold_us;

        let byte = usize::from(self.count / 8);
        if byte < self.buffer.len() {
            if bit {
                self.buffer[byte] |= 1 << (7 - self.count % 8);
            }
        } else {
            self.stats.overflowed_bits += 1;
        }
        trace!("Bit {}: {} ({} us)", self.count, u8::from(bit), width);
        self.count = self.count.saturating_add(1);
    }

    /// Decode what the silence just delimited and reset for the next frame
    fn finish_frame(&mut self) {
        let bits = self.count;
        let touched = usize::from(bits.div_ceil(8)).min(self.buffer.len());
        let filled = usize::from(bits / 8).min(self.buffer.len());

        if bits <= 8 {
            self.stats.noise_bursts += 1;
            trace!("Discarded {} bit burst", bits);
        } else {
            match decode_frame(&self.buffer[..filled]) {
                Ok(msg) => self.accept(msg, bits),
                Err(e) => {
                    self.stats.short_frames += 1;
                    debug!("Dropped {} bit frame: {}", bits, e);
                }
            }
        }

        self.buffer[..touched].fill(0);
        self.count = 0;
    }

    fn accept(&mut self, msg: DecodedMessage, bits: u16) {
        self.last_decoded = Some(msg);

        match msg.command() {
            Some(command) => {
                self.stats.frames_accepted += 1;
                if self.available {
                    debug!("Unconsumed command replaced");
                }
                self.command = Some(command);
                self.available = true;
                debug!(
                    "Received command ({} bits): motor_dir={} servo_dir={} y={} x={}",
                    bits, command.motor_direction, command.servo_direction, command.y, command.x
                );
            }
            None => {
                self.stats.checksum_failures += 1;
                warn!(
                    "Checksum mismatch ({} bits): carried 0x{:03X}",
                    bits, msg.checksum
                );
            }
        }
    }

    /// Whether a valid command arrived since the last [`take_command`](Self::take_command)
    pub fn message_available(&self) -> bool {
        self.available
    }

    /// Consume the pending command
    pub fn take_command(&mut self) -> Option<Command> {
        if !self.available {
            return None;
        }
        self.available = false;
        self.command
    }

    /// Motor direction of the most recent valid command
    pub fn motor_direction(&self) -> bool {
        self.command.map_or(true, |c| c.motor_direction)
    }

    /// Servo direction of the most recent valid command
    pub fn servo_direction(&self) -> bool {
        self.command.is_some_and(|c| c.servo_direction)
    }

    /// Throttle (0-1023) of the most recent valid command
    pub fn axis_y(&self) -> u16 {
        self.command.map_or(0, |c| c.y)
    }

    /// Steering (0-511) of the most recent valid command
    pub fn axis_x(&self) -> u16 {
        self.command.map_or(0, |c| c.x)
    }

    /// Result of the last decode attempt, valid or not
    pub fn last_decoded(&self) -> Option<DecodedMessage> {
        self.last_decoded
    }

    pub fn state(&self) -> RxState {
        self.state
    }

    /// Bits collected so far in the current frame
    pub fn bit_count(&self) -> u16 {
        self.count
    }

    /// Raw bit buffer
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn config(&self) -> RxConfig {
        self.config
    }
}
