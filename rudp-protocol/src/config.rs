//! Transport configuration
//!
//! Retry bound, per-attempt timeout, payload limit and acknowledgement mode.
//! The defaults reproduce the reference setup: 5 attempts, 100 ms, 1024 bytes,
//! content-only ACK marker.

use crate::ack::AckMode;
use std::time::Duration;
use thiserror::Error;

/// Default number of transmission attempts per packet
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default time to wait for an acknowledgement after each transmission
pub const DEFAULT_RETRY_TIMEOUT: Duration = Duration::from_millis(100);

/// Default maximum payload size in bytes
pub const DEFAULT_MAX_PACKET_SIZE: usize = 1024;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_retries must be at least 1")]
    ZeroRetries,

    #[error("retry_timeout must be non-zero")]
    ZeroTimeout,

    #[error("max_packet_size must be non-zero")]
    ZeroPacketSize,
}

/// Settings shared by the sender and receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// Transmission attempts before a packet is declared lost
    pub max_retries: u32,
    /// How long each attempt waits for its acknowledgement
    pub retry_timeout: Duration,
    /// Largest accepted payload
    pub max_packet_size: usize,
    /// Acknowledgement framing; both peers must agree
    pub ack_mode: AckMode,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_timeout: DEFAULT_RETRY_TIMEOUT,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            ack_mode: AckMode::Marker,
        }
    }
}

impl TransportConfig {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_timeout(mut self, retry_timeout: Duration) -> Self {
        self.retry_timeout = retry_timeout;
        self
    }

    pub fn with_max_packet_size(mut self, max_packet_size: usize) -> Self {
        self.max_packet_size = max_packet_size;
        self
    }

    pub fn with_ack_mode(mut self, ack_mode: AckMode) -> Self {
        self.ack_mode = ack_mode;
        self
    }

    /// Check that the configuration can drive at least one attempt
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::ZeroRetries);
        }
        if self.retry_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_packet_size == 0 {
            return Err(ConfigError::ZeroPacketSize);
        }
        Ok(())
    }

    /// Size of the largest datagram the receiver has to accept
    pub fn max_datagram_size(&self) -> usize {
        self.max_packet_size + self.ack_mode.header_len()
    }
}
