//! # Controller Module
//!
//! Handheld remote input handling.
//!
//! This module handles:
//! - Reading the two-axis analog joystick
//! - Smoothing samples with a moving average
//! - Re-centering and applying deadzones
//! - Ramping throttle and steering toward the stick position
//! - Feeding the result into the link's message encoder

pub mod calibration;
pub mod joystick;
pub mod ramp;
pub mod remote;
pub mod smoothing;

pub use joystick::JoystickInput;
pub use remote::Remote;
