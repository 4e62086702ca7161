//! # RC433 Link Library
//!
//! One-way 433 MHz OOK command link between a joystick remote and an RC car.
//!
//! This library provides the pulse-width bit encoding, the checksummed 32-bit
//! command frame, the polling receiver that rebuilds frames from pulse
//! timings, and the remote and vehicle pipelines on either end of the link.

pub mod bench;
pub mod config;
pub mod controller;
pub mod error;
pub mod link;
pub mod radio;
pub mod vehicle;
