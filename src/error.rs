//! # Error Types
//!
//! Custom error types for the RC433 link using `thiserror`.
//!
//! Checksum mismatches and noise bursts are not errors: they are ordinary
//! outcomes of a lossy radio link and are reported through
//! [`DecodedMessage::valid`](crate::link::protocol::DecodedMessage) and the
//! receiver statistics instead.

use thiserror::Error;

/// Main error type for the RC433 link
#[derive(Debug, Error)]
pub enum LinkError {
    /// Wire protocol errors (frame too short, bad buffer length)
    #[error("Link protocol error: {0}")]
    Protocol(String),

    /// A digital line reported a hardware error
    #[error("Pin error: {0}")]
    Pin(String),

    /// PWM output errors on the vehicle side
    #[error("PWM output error: {0}")]
    Pwm(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the RC433 link
pub type Result<T> = std::result::Result<T, LinkError>;
