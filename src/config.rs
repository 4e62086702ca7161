//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every key is optional; anything left out takes the
//! protocol's default value.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::{LinkError, Result};
use crate::link::protocol::{
    BIT_THRESHOLD_US, COMMAND_GAP_MS, DEFAULT_BUFFER_LEN, FRAME_TIMEOUT_US, KEEP_ALIVE_GAP_MS,
    LONG_PULSE_US, SHORT_PULSE_US,
};
use crate::link::receiver::RxConfig;
use crate::link::transmitter::TxTiming;
use crate::vehicle::pwm::PWM_FREQUENCY_MAX_HZ;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub receiver: ReceiverConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub vehicle: VehicleConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub bench: BenchConfig,
}

/// Symbol and framing timing shared by both ends of the link
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    #[serde(default = "default_short_pulse_us")]
    pub short_pulse_us: u32,

    #[serde(default = "default_long_pulse_us")]
    pub long_pulse_us: u32,

    #[serde(default = "default_bit_threshold_us")]
    pub bit_threshold_us: u64,

    #[serde(default = "default_frame_timeout_us")]
    pub frame_timeout_us: u64,

    #[serde(default = "default_command_gap_ms")]
    pub command_gap_ms: u32,

    #[serde(default = "default_keep_alive_gap_ms")]
    pub keep_alive_gap_ms: u32,

    #[serde(default = "default_command_repeat")]
    pub command_repeat: u32,
}

/// Receiver module configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ReceiverConfig {
    /// Data pin reads low while a carrier is present
    #[serde(default = "default_active_low")]
    pub active_low: bool,

    #[serde(default = "default_buffer_len")]
    pub buffer_len: usize,
}

/// Joystick shaping on the remote
#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default = "default_throttle_window")]
    pub throttle_window: usize,

    #[serde(default = "default_steering_window")]
    pub steering_window: usize,

    #[serde(default = "default_throttle_deadzone_low")]
    pub throttle_deadzone_low: i32,

    #[serde(default = "default_throttle_deadzone_high")]
    pub throttle_deadzone_high: i32,

    #[serde(default = "default_steering_deadzone")]
    pub steering_deadzone: i32,

    #[serde(default = "default_throttle_step")]
    pub throttle_step: u16,

    #[serde(default = "default_steering_step")]
    pub steering_step: u16,

    #[serde(default = "default_ramp_interval_us")]
    pub ramp_interval_us: u64,
}

/// Motor and servo output on the vehicle
#[derive(Debug, Deserialize, Clone)]
pub struct VehicleConfig {
    #[serde(default = "default_servo_us_min")]
    pub servo_us_min: u16,

    #[serde(default = "default_servo_us_max")]
    pub servo_us_max: u16,

    #[serde(default = "default_servo_range_min")]
    pub servo_range_min: i16,

    #[serde(default = "default_servo_range_max")]
    pub servo_range_max: i16,

    /// Multiplier from wire throttle (0-1023) to PWM duty (0-4095)
    #[serde(default = "default_speed_scale")]
    pub speed_scale: u16,

    #[serde(default = "default_pwm_frequency_hz")]
    pub pwm_frequency_hz: u16,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub file_enabled: bool,

    #[serde(default = "default_log_dir")]
    pub dir: String,
}

/// Loopback bench configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BenchConfig {
    /// Receiver poll period in virtual microseconds
    #[serde(default = "default_tick_us")]
    pub tick_us: u64,

    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,

    #[serde(default = "default_status_interval_cycles")]
    pub status_interval_cycles: u64,
}

// Default value functions
fn default_short_pulse_us() -> u32 { SHORT_PULSE_US }
fn default_long_pulse_us() -> u32 { LONG_PULSE_US }
fn default_bit_threshold_us() -> u64 { BIT_THRESHOLD_US }
fn default_frame_timeout_us() -> u64 { FRAME_TIMEOUT_US }
fn default_command_gap_ms() -> u32 { COMMAND_GAP_MS }
fn default_keep_alive_gap_ms() -> u32 { KEEP_ALIVE_GAP_MS }
fn default_command_repeat() -> u32 { 1 }

fn default_active_low() -> bool { true }
fn default_buffer_len() -> usize { DEFAULT_BUFFER_LEN }

fn default_throttle_window() -> usize { 50 }
fn default_steering_window() -> usize { 20 }
fn default_throttle_deadzone_low() -> i32 { -50 }
fn default_throttle_deadzone_high() -> i32 { 150 }
fn default_steering_deadzone() -> i32 { 100 }
fn default_throttle_step() -> u16 { 80 }
fn default_steering_step() -> u16 { 200 }
fn default_ramp_interval_us() -> u64 { 100 }

fn default_servo_us_min() -> u16 { 500 }
fn default_servo_us_max() -> u16 { 2500 }
fn default_servo_range_min() -> i16 { -512 }
fn default_servo_range_max() -> i16 { 511 }
fn default_speed_scale() -> u16 { 4 }
fn default_pwm_frequency_hz() -> u16 { 50 }

fn default_log_level() -> String { "info".to_string() }
fn default_log_dir() -> String { "./logs".to_string() }

fn default_tick_us() -> u64 { 10 }
fn default_cycle_interval_ms() -> u64 { 20 }
fn default_status_interval_cycles() -> u64 { 50 }

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            short_pulse_us: default_short_pulse_us(),
            long_pulse_us: default_long_pulse_us(),
            bit_threshold_us: default_bit_threshold_us(),
            frame_timeout_us: default_frame_timeout_us(),
            command_gap_ms: default_command_gap_ms(),
            keep_alive_gap_ms: default_keep_alive_gap_ms(),
            command_repeat: default_command_repeat(),
        }
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            active_low: default_active_low(),
            buffer_len: default_buffer_len(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            throttle_window: default_throttle_window(),
            steering_window: default_steering_window(),
            throttle_deadzone_low: default_throttle_deadzone_low(),
            throttle_deadzone_high: default_throttle_deadzone_high(),
            steering_deadzone: default_steering_deadzone(),
            throttle_step: default_throttle_step(),
            steering_step: default_steering_step(),
            ramp_interval_us: default_ramp_interval_us(),
        }
    }
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            servo_us_min: default_servo_us_min(),
            servo_us_max: default_servo_us_max(),
            servo_range_min: default_servo_range_min(),
            servo_range_max: default_servo_range_max(),
            speed_scale: default_speed_scale(),
            pwm_frequency_hz: default_pwm_frequency_hz(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_enabled: false,
            dir: default_log_dir(),
        }
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            tick_us: default_tick_us(),
            cycle_interval_ms: default_cycle_interval_ms(),
            status_interval_cycles: default_status_interval_cycles(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> LinkError {
    LinkError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rc433_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Transmitter symbol timing
    pub fn tx_timing(&self) -> TxTiming {
        TxTiming {
            short_pulse_us: self.timing.short_pulse_us,
            long_pulse_us: self.timing.long_pulse_us,
            keep_alive_gap_ms: self.timing.keep_alive_gap_ms,
        }
    }

    /// Receiver thresholds and buffer size
    pub fn rx_config(&self) -> RxConfig {
        RxConfig {
            bit_threshold_us: self.timing.bit_threshold_us,
            frame_timeout_us: self.timing.frame_timeout_us,
            buffer_len: self.receiver.buffer_len,
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range or the
    /// timing values cannot round-trip through the receiver
    pub fn validate(&self) -> Result<()> {
        let t = &self.timing;

        // Pulse classification
        if u64::from(t.short_pulse_us) >= t.bit_threshold_us {
            return Err(invalid("short_pulse_us must be below bit_threshold_us"));
        }

        if u64::from(t.long_pulse_us) <= t.bit_threshold_us {
            return Err(invalid("long_pulse_us must be above bit_threshold_us"));
        }

        // A symbol must never look like the end of a frame
        if t.frame_timeout_us <= u64::from(t.long_pulse_us) + u64::from(t.short_pulse_us) {
            return Err(invalid("frame_timeout_us must exceed one full symbol period"));
        }

        for (name, gap_ms) in [
            ("command_gap_ms", t.command_gap_ms),
            ("keep_alive_gap_ms", t.keep_alive_gap_ms),
        ] {
            if u64::from(gap_ms) * 1000 <= t.frame_timeout_us {
                return Err(invalid(format!("{} must exceed frame_timeout_us", name)));
            }
        }

        if t.command_repeat == 0 {
            return Err(invalid("command_repeat must be at least 1"));
        }

        // Receiver buffer must hold at least one command frame
        if !(4..=255).contains(&self.receiver.buffer_len) {
            return Err(invalid("buffer_len must be between 4 and 255"));
        }

        // Remote shaping
        for (name, window) in [
            ("throttle_window", self.remote.throttle_window),
            ("steering_window", self.remote.steering_window),
        ] {
            if !(1..=100).contains(&window) {
                return Err(invalid(format!("{} must be between 1 and 100", name)));
            }
        }

        if self.remote.throttle_deadzone_low > 0 || self.remote.throttle_deadzone_high < 0 {
            return Err(invalid("throttle deadzone must contain the stick center"));
        }

        if self.remote.steering_deadzone < 0 {
            return Err(invalid("steering_deadzone cannot be negative"));
        }

        if self.remote.throttle_step == 0 || self.remote.steering_step == 0 {
            return Err(invalid("ramp steps must be greater than 0"));
        }

        if self.remote.ramp_interval_us == 0 {
            return Err(invalid("ramp_interval_us must be greater than 0"));
        }

        // Vehicle outputs
        if self.vehicle.servo_us_min >= self.vehicle.servo_us_max {
            return Err(invalid("servo_us_min must be less than servo_us_max"));
        }

        if self.vehicle.servo_range_min >= self.vehicle.servo_range_max {
            return Err(invalid("servo_range_min must be less than servo_range_max"));
        }

        if self.vehicle.speed_scale == 0 {
            return Err(invalid("speed_scale must be greater than 0"));
        }

        if self.vehicle.pwm_frequency_hz == 0
            || self.vehicle.pwm_frequency_hz > PWM_FREQUENCY_MAX_HZ
        {
            return Err(invalid("pwm_frequency_hz must be between 1 and 1600"));
        }

        // Logging
        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("log level must be one of: trace, debug, info, warn, error"));
        }

        if self.logging.file_enabled && self.logging.dir.is_empty() {
            return Err(invalid("logging dir cannot be empty when file logging is enabled"));
        }

        // Bench: a polled pulse can measure up to two ticks short
        let margin = (t.bit_threshold_us - u64::from(t.short_pulse_us))
            .min(u64::from(t.long_pulse_us) - t.bit_threshold_us);
        if self.bench.tick_us == 0 || self.bench.tick_us.saturating_mul(2) >= margin {
            return Err(invalid(
                "bench tick_us must be greater than 0 and under half the classification margin",
            ));
        }

        if self.bench.cycle_interval_ms == 0 {
            return Err(invalid("cycle_interval_ms must be greater than 0"));
        }

        if self.bench.status_interval_cycles == 0 {
            return Err(invalid("status_interval_cycles must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config {
            timing: TimingConfig {
                short_pulse_us: default_short_pulse_us(),
                long_pulse_us: default_long_pulse_us(),
                bit_threshold_us: default_bit_threshold_us(),
                frame_timeout_us: default_frame_timeout_us(),
                command_gap_ms: default_command_gap_ms(),
                keep_alive_gap_ms: default_keep_alive_gap_ms(),
                command_repeat: default_command_repeat(),
            },
            receiver: ReceiverConfig {
                active_low: default_active_low(),
                buffer_len: default_buffer_len(),
            },
            remote: RemoteConfig::default(),
            vehicle: VehicleConfig::default(),
            logging: LoggingConfig::default(),
            bench: BenchConfig::default(),
        }
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[timing]
command_repeat = 3

[receiver]
active_low = false

[logging]
level = "debug"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.timing.command_repeat, 3);
        assert_eq!(config.timing.short_pulse_us, 200);
        assert!(!config.receiver.active_low);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.remote.throttle_window, 50);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/rc433.toml");
        assert!(matches!(result, Err(LinkError::Io(_))));
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.tx_timing(), TxTiming::default());
        assert_eq!(config.rx_config(), RxConfig::default());
    }

    #[test]
    fn test_malformed_toml() {
        let result = Config::from_toml("[timing\nshort_pulse_us = 1");
        assert!(matches!(result, Err(LinkError::Config(_))));
    }

    #[test]
    fn test_invalid_values_rejected_on_load() {
        let result = Config::from_toml("[timing]\ncommand_repeat = 0\n");
        assert!(matches!(result, Err(LinkError::Config(_))));
    }

    // ==================== Timing Validation Tests ====================

    #[test]
    fn test_short_pulse_at_threshold() {
        let mut config = create_valid_config();
        config.timing.short_pulse_us = 300;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_long_pulse_at_threshold() {
        let mut config = create_valid_config();
        config.timing.long_pulse_us = 300;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_frame_timeout_within_symbol() {
        let mut config = create_valid_config();
        config.timing.frame_timeout_us = 600;
        assert!(config.validate().is_err());

        config.timing.frame_timeout_us = 601;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_command_gap_shorter_than_timeout() {
        let mut config = create_valid_config();
        config.timing.command_gap_ms = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_keep_alive_gap_shorter_than_timeout() {
        let mut config = create_valid_config();
        config.timing.keep_alive_gap_ms = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_command_repeat_zero() {
        let mut config = create_valid_config();
        config.timing.command_repeat = 0;
        assert!(config.validate().is_err());
    }

    // ==================== Receiver Validation Tests ====================

    #[test]
    fn test_buffer_len_too_small() {
        let mut config = create_valid_config();
        config.receiver.buffer_len = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_buffer_len_too_large() {
        let mut config = create_valid_config();
        config.receiver.buffer_len = 256;
        assert!(config.validate().is_err());
    }

    // ==================== Remote Validation Tests ====================

    #[test]
    fn test_window_zero() {
        let mut config = create_valid_config();
        config.remote.throttle_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_window_too_large() {
        let mut config = create_valid_config();
        config.remote.steering_window = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deadzone_excludes_center() {
        let mut config = create_valid_config();
        config.remote.throttle_deadzone_low = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_steering_deadzone() {
        let mut config = create_valid_config();
        config.remote.steering_deadzone = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ramp_step_zero() {
        let mut config = create_valid_config();
        config.remote.throttle_step = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ramp_interval_zero() {
        let mut config = create_valid_config();
        config.remote.ramp_interval_us = 0;
        assert!(config.validate().is_err());
    }

    // ==================== Vehicle Validation Tests ====================

    #[test]
    fn test_servo_pulse_range_inverted() {
        let mut config = create_valid_config();
        config.vehicle.servo_us_min = 2500;
        config.vehicle.servo_us_max = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_servo_position_range_empty() {
        let mut config = create_valid_config();
        config.vehicle.servo_range_min = 0;
        config.vehicle.servo_range_max = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_speed_scale_zero() {
        let mut config = create_valid_config();
        config.vehicle.speed_scale = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pwm_frequency_out_of_range() {
        let mut config = create_valid_config();
        config.vehicle.pwm_frequency_hz = 0;
        assert!(config.validate().is_err());

        config.vehicle.pwm_frequency_hz = 1601;
        assert!(config.validate().is_err());
    }

    // ==================== Logging Validation Tests ====================

    #[test]
    fn test_invalid_log_level() {
        let mut config = create_valid_config();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_log_levels() {
        let mut config = create_valid_config();
        for level in ["trace", "debug", "info", "warn", "error"] {
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "level {} rejected", level);
        }
    }

    #[test]
    fn test_empty_log_dir_when_enabled() {
        let mut config = create_valid_config();
        config.logging.file_enabled = true;
        config.logging.dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_disabled() {
        let mut config = create_valid_config();
        config.logging.file_enabled = false;
        config.logging.dir = String::new();
        assert!(config.validate().is_ok());
    }

    // ==================== Bench Validation Tests ====================

    #[test]
    fn test_bench_tick_too_coarse() {
        let mut config = create_valid_config();
        config.bench.tick_us = 200;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bench_tick_within_margin() {
        // Default margin is 100 us either side of the threshold
        let mut config = create_valid_config();
        config.bench.tick_us = 130;
        assert!(config.validate().is_err());

        config.bench.tick_us = 50;
        assert!(config.validate().is_err());

        config.bench.tick_us = 49;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bench_tick_tracks_timing() {
        let mut config = create_valid_config();
        config.timing.long_pulse_us = 320;
        config.bench.tick_us = 10;
        assert!(config.validate().is_err());

        config.bench.tick_us = 9;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bench_intervals_zero() {
        let mut config = create_valid_config();
        config.bench.cycle_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = create_valid_config();
        config.bench.status_interval_cycles = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_short_pulse_us(), 200);
        assert_eq!(default_long_pulse_us(), 400);
        assert_eq!(default_bit_threshold_us(), 300);
        assert_eq!(default_frame_timeout_us(), 2000);
        assert_eq!(default_command_gap_ms(), 6);
        assert_eq!(default_keep_alive_gap_ms(), 3);
        assert_eq!(default_command_repeat(), 1);
        assert!(default_active_low());
        assert_eq!(default_buffer_len(), 64);
        assert_eq!(default_throttle_window(), 50);
        assert_eq!(default_steering_window(), 20);
        assert_eq!(default_servo_us_min(), 500);
        assert_eq!(default_servo_us_max(), 2500);
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_tick_us(), 10);
    }
}
