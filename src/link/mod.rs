//! # Link Protocol Module
//!
//! Both ends of the one-way 433 MHz OOK command link.
//!
//! This module handles:
//! - Packing commands into 32-bit checksummed frames
//! - Pulse-width keying of bits onto the transmitter line
//! - Keep-alive vs. command selection on the transmitter side
//! - Pulse timing, frame delimiting and checksum validation on the receiver side

pub mod protocol;
pub mod checksum;
pub mod encoder;
pub mod decoder;
pub mod transmitter;
pub mod receiver;
