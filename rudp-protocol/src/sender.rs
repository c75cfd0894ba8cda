//! Reliable sender
//!
//! Stop-and-wait delivery of one payload at a time:
//!
//! ```text
//! Created -> Sent -> Acked                    (success)
//!              |
//!              v
//!           TimedOut -> Sent                  (attempts remain)
//!              |
//!              v
//!            Lost                             (attempts exhausted)
//! ```
//!
//! Retries of one packet are strictly sequential and there is no backoff
//! beyond the per-attempt timeout. Several threads may call
//! [`ReliableSender::send_reliable`] at once; their statistics updates
//! interleave but never get lost. With the marker acknowledgement they must
//! not share a connection, since one ACK cannot be told apart from another.

use crate::ack::Ack;
use crate::config::TransportConfig;
use crate::packet::{Packet, PacketError, SequenceGenerator};
use crate::stats::Statistics;
use bytes::Bytes;
use rudp_io::{DatagramConnection, SocketError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Send errors
#[derive(Error, Debug)]
pub enum SendError {
    #[error(transparent)]
    Invalid(#[from] PacketError),

    #[error("send error for packet {sequence}: {source}")]
    Transport {
        sequence: u64,
        source: SocketError,
    },

    #[error("max retries exceeded for packet {sequence} after {attempts} attempts")]
    MaxRetriesExceeded { sequence: u64, attempts: u32 },
}

/// Outcome of a successful send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub sequence: u64,
    /// Time from packet creation to acknowledgement, retries included
    pub rtt: Duration,
    /// Transmissions it took, 1 when the first attempt was acknowledged
    pub attempts: u32,
}

/// Retrying sender bound to a statistics instance
pub struct ReliableSender {
    config: TransportConfig,
    stats: Arc<Statistics>,
    sequence: Arc<SequenceGenerator>,
}

impl ReliableSender {
    /// Create a sender with its own sequence space
    pub fn new(config: TransportConfig, stats: Arc<Statistics>) -> Self {
        Self::with_sequence(config, stats, Arc::new(SequenceGenerator::new()))
    }

    /// Create a sender drawing sequence numbers from a shared generator
    pub fn with_sequence(
        config: TransportConfig,
        stats: Arc<Statistics>,
        sequence: Arc<SequenceGenerator>,
    ) -> Self {
        ReliableSender {
            config,
            stats,
            sequence,
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn stats(&self) -> &Arc<Statistics> {
        &self.stats
    }

    pub fn sequence(&self) -> &Arc<SequenceGenerator> {
        &self.sequence
    }

    /// Deliver `payload` over `conn`, retrying until acknowledged or exhausted
    ///
    /// Oversized payloads fail before any I/O or counter update. A write
    /// failure aborts the call; a read failure or a reply that is not the
    /// expected acknowledgement only ends the current attempt.
    pub fn send_reliable<C>(&self, conn: &C, payload: &[u8]) -> Result<Delivery, SendError>
    where
        C: DatagramConnection + ?Sized,
    {
        let packet = Packet::create(
            &self.sequence,
            Bytes::copy_from_slice(payload),
            self.config.max_packet_size,
        )?;
        let sequence = packet.sequence();
        let mode = self.config.ack_mode;
        let datagram = packet.encode(mode);
        // One spare byte so an over-long reply reads back longer than an ACK
        let mut ack_buf = vec![0u8; mode.ack_len() + 1];

        self.stats.record_sent();

        for attempt in 1..=self.config.max_retries {
            if let Err(source) = conn.send(&datagram) {
                tracing::warn!("Send of packet {} failed: {}", sequence, source);
                return Err(SendError::Transport { sequence, source });
            }

            match conn.recv_timeout(&mut ack_buf, self.config.retry_timeout) {
                Ok(n) if Ack::matches(&ack_buf[..n], mode, sequence) => {
                    let rtt = packet.created_at().elapsed();
                    self.stats.record_rtt(rtt);
                    tracing::debug!(
                        "Packet {} acknowledged on attempt {}, RTT: {:?}",
                        sequence,
                        attempt,
                        rtt
                    );
                    return Ok(Delivery {
                        sequence,
                        rtt,
                        attempts: attempt,
                    });
                }
                Ok(n) => {
                    tracing::debug!(
                        "Packet {}: unexpected {}-byte reply on attempt {}",
                        sequence,
                        n,
                        attempt
                    );
                }
                Err(SocketError::Timeout) => {
                    tracing::debug!("Packet {}: ACK timeout on attempt {}", sequence, attempt);
                }
                Err(e) => {
                    tracing::debug!("Packet {}: read failed on attempt {}: {}", sequence, attempt, e);
                }
            }

            if attempt < self.config.max_retries {
                self.stats.record_retry();
                tracing::debug!(
                    "Retry {}: packet {} (size: {} bytes)",
                    attempt,
                    sequence,
                    packet.len()
                );
            }
        }

        self.stats.record_lost();
        tracing::warn!(
            "Packet {} lost after {} attempts",
            sequence,
            self.config.max_retries
        );
        Err(SendError::MaxRetriesExceeded {
            sequence,
            attempts: self.config.max_retries,
        })
    }
}
