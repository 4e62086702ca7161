//! # Loopback Bench
//!
//! Runs the remote and the car against each other in one process.
//!
//! ```text
//! SweepJoystick ─▶ Remote ─▶ HalOutput ─▶ Airwaves ─▶ HalInput ─▶ PulseReceiver ─▶ Vehicle ─▶ LoggingPwm
//! ```
//!
//! Each cycle the remote transmits in virtual time. The receiver is then
//! polled every `tick_us` of virtual time until it has caught up with the
//! transmitter, and the vehicle applies whatever was decoded.

use crate::config::Config;
use crate::controller::{JoystickInput, Remote};
use crate::error::Result;
use crate::link::encoder::MessageEncoder;
use crate::link::protocol::{Command, Transmission};
use crate::link::receiver::{LinkStats, PulseReceiver};
use crate::link::transmitter::BitTransmitter;
use crate::radio::loopback::{Airwaves, AirwavesRx, AirwavesTx, VirtualClock, VirtualDelay};
use crate::radio::{HalInput, HalOutput, MicrosClock};
use crate::vehicle::motor::DualBridgeDriver;
use crate::vehicle::pwm::LoggingPwm;
use crate::vehicle::{
    Vehicle, MOTOR_BACKWARD_CHANNEL, MOTOR_FORWARD_CHANNEL, MOTOR_PWM_CHANNEL,
};
use std::future::Future;
use tokio::time::{interval, Duration};
use tracing::{info, warn};

/// Joystick script: `(samples, x, y)` segments, repeated forever
const SWEEP: [(u64, u16, u16); 7] = [
    (25, 2048, 2048), // rest
    (75, 2048, 0),    // full forward
    (50, 4095, 0),    // forward, right
    (50, 0, 0),       // forward, left
    (50, 2048, 2048), // rest
    (75, 2048, 4095), // full reverse
    (25, 2048, 2048), // rest
];

/// Scripted joystick that steps through [`SWEEP`], one segment sample per read
#[derive(Debug, Clone, Default)]
pub struct SweepJoystick {
    sample: u64,
    x: u16,
    y: u16,
}

impl SweepJoystick {
    pub fn new() -> Self {
        Self {
            sample: 0,
            x: 2048,
            y: 2048,
        }
    }

    /// Stick position for sample `n`
    pub fn position(n: u64) -> (u16, u16) {
        let period: u64 = SWEEP.iter().map(|s| s.0).sum();
        let mut n = n % period;
        for &(len, x, y) in &SWEEP {
            if n < len {
                return (x, y);
            }
            n -= len;
        }
        (2048, 2048)
    }
}

impl JoystickInput for SweepJoystick {
    /// Both axes are sampled together on the throttle read
    fn read_y(&mut self) -> Result<u16> {
        let (x, y) = Self::position(self.sample);
        self.sample += 1;
        self.x = x;
        self.y = y;
        Ok(y)
    }

    fn read_x(&mut self) -> Result<u16> {
        Ok(self.x)
    }
}

pub type BenchRemote<J> = Remote<J, HalOutput<AirwavesTx>, VirtualDelay, VirtualClock>;
pub type BenchReceiver = PulseReceiver<HalInput<AirwavesRx>, VirtualClock>;
pub type BenchVehicle = Vehicle<LoggingPwm, DualBridgeDriver>;

/// Outcome of one bench cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub sent: Transmission,
    pub applied: Option<Command>,
}

/// Remote, air and car wired together
pub struct Bench<J> {
    remote: BenchRemote<J>,
    receiver: BenchReceiver,
    vehicle: BenchVehicle,
    air: Airwaves,
    tx_clock: VirtualClock,
    rx_clock: VirtualClock,
    tick_us: u64,
    cycle_interval_ms: u64,
    status_interval_cycles: u64,
    cycles: u64,
    commands_sent: u64,
    keep_alives_sent: u64,
}

impl<J: JoystickInput> Bench<J> {
    /// Build the bench from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the vehicle outputs cannot be initialized
    pub fn new(config: &Config, joystick: J) -> Result<Self> {
        let air = Airwaves::new();
        let tx_clock = VirtualClock::new();
        let rx_clock = VirtualClock::new();

        let transmitter = BitTransmitter::with_timing(
            HalOutput::new(air.transmitter(tx_clock.clone())),
            VirtualDelay::new(tx_clock.clone()),
            config.tx_timing(),
        );
        let encoder = MessageEncoder::with_framing(
            transmitter,
            config.timing.command_repeat,
            config.timing.command_gap_ms,
        );
        let remote = Remote::new(joystick, encoder, tx_clock.clone(), &config.remote);

        let active_low = config.receiver.active_low;
        let receiver = PulseReceiver::with_config(
            HalInput::new(air.receiver(rx_clock.clone(), active_low), active_low),
            rx_clock.clone(),
            config.rx_config(),
        );

        let vehicle = Vehicle::from_config(
            LoggingPwm::new(),
            DualBridgeDriver::new(MOTOR_PWM_CHANNEL, MOTOR_FORWARD_CHANNEL, MOTOR_BACKWARD_CHANNEL),
            &config.vehicle,
        )?;

        Ok(Self {
            remote,
            receiver,
            vehicle,
            air,
            tx_clock,
            rx_clock,
            tick_us: config.bench.tick_us.max(1),
            cycle_interval_ms: config.bench.cycle_interval_ms.max(1),
            status_interval_cycles: config.bench.status_interval_cycles.max(1),
            cycles: 0,
            commands_sent: 0,
            keep_alives_sent: 0,
        })
    }

    /// Transmit once, then let the receiver and the car catch up
    ///
    /// # Errors
    ///
    /// Returns error if any stage of the chain fails
    pub fn cycle(&mut self) -> Result<CycleReport> {
        let sent = self.remote.cycle()?;
        match sent {
            Transmission::Command(_) => self.commands_sent += 1,
            Transmission::KeepAlive => self.keep_alives_sent += 1,
        }

        let until = self.tx_clock.now_us();
        let mut applied = None;
        while self.rx_clock.now_us() < until {
            self.rx_clock.advance_us(self.tick_us);
            self.receiver.tick()?;
            if self.vehicle.poll(&mut self.receiver)? {
                applied = self.vehicle.last_applied();
            }
        }
        self.air.discard_before(self.rx_clock.now_us());

        self.cycles += 1;
        Ok(CycleReport { sent, applied })
    }

    /// Cycle every `cycle_interval_ms` until `shutdown` resolves or
    /// `max_cycles` have been attempted
    ///
    /// A failed cycle is logged and skipped, but still counts toward
    /// `max_cycles`.
    ///
    /// # Returns
    ///
    /// * `u64` - Total successful cycles so far
    pub async fn run<F>(&mut self, shutdown: F, max_cycles: Option<u64>) -> u64
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(Duration::from_millis(self.cycle_interval_ms));
        let mut attempts: u64 = 0;
        tokio::pin!(shutdown);

        info!("Starting bench loop every {} ms", self.cycle_interval_ms);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    attempts += 1;
                    match self.cycle() {
                        Ok(_) if self.cycles % self.status_interval_cycles == 0 => self.log_status(),
                        Ok(_) => {}
                        Err(e) => warn!("Bench cycle failed: {}", e),
                    }

                    if max_cycles.is_some_and(|max| attempts >= max) {
                        break;
                    }
                }

                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping after {} cycles", self.cycles);
                    break;
                }
            }
        }

        self.cycles
    }

    /// Log link and output state
    pub fn log_status(&self) {
        let stats = self.receiver.stats();
        info!(
            "Cycle {}: sent {} commands, {} keep-alives | rx accepted={} bad_checksum={} noise={} short={} overflow={}",
            self.cycles,
            self.commands_sent,
            self.keep_alives_sent,
            stats.frames_accepted,
            stats.checksum_failures,
            stats.noise_bursts,
            stats.short_frames,
            stats.overflowed_bits
        );
        if let Some(cmd) = self.vehicle.last_applied() {
            info!(
                "Vehicle: forward={} y={} x={} right={}",
                cmd.motor_direction, cmd.y, cmd.x, cmd.servo_direction
            );
        }
    }

    pub fn stats(&self) -> LinkStats {
        self.receiver.stats()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn commands_sent(&self) -> u64 {
        self.commands_sent
    }

    pub fn keep_alives_sent(&self) -> u64 {
        self.keep_alives_sent
    }

    /// Shared medium, e.g. for injecting interference
    pub fn air(&self) -> &Airwaves {
        &self.air
    }

    /// Current virtual time of the transmitter side
    pub fn now_us(&self) -> u64 {
        self.tx_clock.now_us()
    }

    pub fn remote(&self) -> &BenchRemote<J> {
        &self.remote
    }

    pub fn receiver(&self) -> &BenchReceiver {
        &self.receiver
    }

    pub fn vehicle(&self) -> &BenchVehicle {
        &self.vehicle
    }
}
