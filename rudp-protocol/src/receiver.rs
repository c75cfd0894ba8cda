//! Reliable receiver
//!
//! Handles one datagram per call: read it, apply the artificial drop policy,
//! and acknowledge it to its source. There is no backlog and no retry here;
//! recovering from loss is the sender's job.
//!
//! The receiver either records statistics (the drop decision comes after the
//! received counter is bumped) or runs logging-only (the drop decision comes
//! first and no counter is touched, every decision is logged instead). Both
//! read the drop rate from the shared [`Statistics`].

use crate::ack::Ack;
use crate::config::TransportConfig;
use crate::packet::{DataFrame, PacketError};
use crate::stats::Statistics;
use bytes::Bytes;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rudp_io::{DatagramListener, SocketError};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;

/// Receive errors
#[derive(Error, Debug)]
pub enum ReceiveError {
    #[error("read error: {0}")]
    Read(#[source] SocketError),

    #[error("packet from {peer} dropped (artificial loss)")]
    ArtificiallyDropped { peer: SocketAddr, len: usize },

    #[error("malformed frame from {peer}: {error}")]
    Malformed {
        peer: SocketAddr,
        #[source]
        error: PacketError,
    },

    #[error("failed to send ACK to {peer}: {error}")]
    AckWrite {
        peer: SocketAddr,
        #[source]
        error: SocketError,
    },
}

impl ReceiveError {
    /// True for simulated loss, false for real transport or framing faults
    pub fn is_artificial_drop(&self) -> bool {
        matches!(self, ReceiveError::ArtificiallyDropped { .. })
    }
}

/// An acknowledged datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub payload: Bytes,
    pub from: SocketAddr,
    /// Echoed sequence number, present only in sequenced mode
    pub sequence: Option<u64>,
}

/// Acknowledging receiver with loss injection
pub struct ReliableReceiver<R = StdRng> {
    config: TransportConfig,
    stats: Arc<Statistics>,
    record_stats: bool,
    rng: Mutex<R>,
}

impl ReliableReceiver<StdRng> {
    /// Create a statistics-recording receiver seeded from OS entropy
    pub fn new(config: TransportConfig, stats: Arc<Statistics>) -> Self {
        Self::with_rng(config, stats, StdRng::from_entropy())
    }
}

impl<R: Rng + Send> ReliableReceiver<R> {
    /// Create a statistics-recording receiver with a caller-supplied random source
    pub fn with_rng(config: TransportConfig, stats: Arc<Statistics>, rng: R) -> Self {
        ReliableReceiver {
            config,
            stats,
            record_stats: true,
            rng: Mutex::new(rng),
        }
    }

    /// Choose between recording statistics and logging-only operation
    pub fn record_stats(mut self, enabled: bool) -> Self {
        self.record_stats = enabled;
        self
    }

    pub fn records_stats(&self) -> bool {
        self.record_stats
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn stats(&self) -> &Arc<Statistics> {
        &self.stats
    }

    /// Receive one datagram and acknowledge it unless the drop policy fires
    ///
    /// Blocks until a datagram arrives or `listener` reports an error.
    pub fn receive_reliable<L>(&self, listener: &L) -> Result<Received, ReceiveError>
    where
        L: DatagramListener + ?Sized,
    {
        let mut buf = vec![0u8; self.config.max_datagram_size()];
        let (n, peer) = listener.recv_from(&mut buf).map_err(ReceiveError::Read)?;

        if self.record_stats {
            self.stats.record_received();
        }

        let rate = self.stats.drop_rate();
        let dropped = rate.should_drop(&mut *self.rng.lock());

        if dropped {
            if self.record_stats {
                self.stats.record_artificial_drop();
                tracing::debug!("Dropping packet from {} ({} drop rate)", peer, rate);
            } else {
                tracing::info!("Dropping packet from {} ({} drop rate)", peer, rate);
            }
            return Err(ReceiveError::ArtificiallyDropped { peer, len: n });
        }

        let frame = DataFrame::decode(&buf[..n], self.config.ack_mode)
            .map_err(|error| ReceiveError::Malformed { peer, error })?;

        let ack = Ack::for_frame(self.config.ack_mode, frame.sequence).to_bytes();
        listener
            .send_to(&ack, peer)
            .map_err(|error| ReceiveError::AckWrite { peer, error })?;

        if self.record_stats {
            tracing::debug!("Received {} bytes from {}", n, peer);
        } else {
            tracing::info!("Received {} bytes from {}", n, peer);
        }

        Ok(Received {
            payload: frame.payload,
            from: peer,
            sequence: frame.sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ack::AckMode;
    use crate::mock::ScriptedListener;

    fn peer() -> SocketAddr {
        "127.0.0.1:4000".parse().unwrap()
    }

    fn receiver(drop_rate: f64) -> ReliableReceiver {
        let stats = Arc::new(Statistics::with_drop_rate(drop_rate));
        ReliableReceiver::with_rng(TransportConfig::default(), stats, StdRng::seed_from_u64(1))
    }

    #[test]
    fn test_acknowledges_without_loss() {
        let receiver = receiver(0.0);
        let listener = ScriptedListener::new([(b"hello".to_vec(), peer())]);

        let received = receiver.receive_reliable(&listener).unwrap();
        assert_eq!(&received.payload[..], b"hello");
        assert_eq!(received.from, peer());
        assert_eq!(received.sequence, None);
        assert_eq!(listener.sent(), vec![(b"ACK".to_vec(), peer())]);

        let snap = receiver.stats().snapshot();
        assert_eq!(snap.packets_received, 1);
        assert_eq!(snap.packets_lost, 0);
    }

    #[test]
    fn test_full_loss_withholds_ack() {
        let receiver = receiver(100.0);
        let listener = ScriptedListener::new([(b"hello".to_vec(), peer())]);

        let err = receiver.receive_reliable(&listener).unwrap_err();
        assert!(err.is_artificial_drop());
        assert!(listener.sent().is_empty());

        let snap = receiver.stats().snapshot();
        assert_eq!(snap.packets_received, 1);
        assert_eq!(snap.packets_lost, 1);
        assert_eq!(snap.artificial_drops, 1);
    }

    #[test]
    fn test_logging_only_mode_leaves_stats_alone() {
        let receiver = receiver(100.0).record_stats(false);
        let listener = ScriptedListener::new([(b"a".to_vec(), peer())]);
        assert!(receiver.receive_reliable(&listener).unwrap_err().is_artificial_drop());

        receiver.stats().set_drop_rate(0.0);
        let listener = ScriptedListener::new([(b"b".to_vec(), peer())]);
        receiver.receive_reliable(&listener).unwrap();

        let snap = receiver.stats().snapshot();
        assert_eq!(snap.packets_received, 0);
        assert_eq!(snap.packets_lost, 0);
        assert_eq!(snap.artificial_drops, 0);
    }

    #[test]
    fn test_read_error_surfaces() {
        let receiver = receiver(0.0);
        let listener = ScriptedListener::new([]);

        let err = receiver.receive_reliable(&listener).unwrap_err();
        assert!(matches!(err, ReceiveError::Read(_)));
        assert!(!err.is_artificial_drop());
        assert_eq!(receiver.stats().snapshot().packets_received, 0);
    }

    #[test]
    fn test_ack_write_error_surfaces() {
        let receiver = receiver(0.0);
        let listener = ScriptedListener::failing_sends([(b"x".to_vec(), peer())]);

        let err = receiver.receive_reliable(&listener).unwrap_err();
        assert!(matches!(err, ReceiveError::AckWrite { .. }));
    }

    #[test]
    fn test_sequenced_mode_echoes_sequence() {
        let stats = Arc::new(Statistics::new());
        let config = TransportConfig::default().with_ack_mode(AckMode::Sequenced);
        let receiver = ReliableReceiver::with_rng(config, stats, StdRng::seed_from_u64(1));

        let frame = [&7u64.to_be_bytes()[..], &b"body"[..]].concat();
        let listener = ScriptedListener::new([(frame, peer())]);

        let received = receiver.receive_reliable(&listener).unwrap();
        assert_eq!(received.sequence, Some(7));
        assert_eq!(&received.payload[..], b"body");
        assert_eq!(listener.sent()[0].0, Ack::Sequenced(7).to_bytes().to_vec());
    }

    #[test]
    fn test_sequenced_mode_rejects_short_frames() {
        let stats = Arc::new(Statistics::new());
        let config = TransportConfig::default().with_ack_mode(AckMode::Sequenced);
        let receiver = ReliableReceiver::with_rng(config, stats, StdRng::seed_from_u64(1));
        let listener = ScriptedListener::new([(vec![1, 2], peer())]);

        assert!(matches!(
            receiver.receive_reliable(&listener),
            Err(ReceiveError::Malformed { .. })
        ));
        assert!(listener.sent().is_empty());
    }

    #[test]
    fn test_seeded_drops_are_reproducible() {
        let run = || {
            let receiver = receiver(50.0);
            let incoming = (0..100).map(|i| (vec![i as u8], peer()));
            let listener = ScriptedListener::new(incoming);
            (0..100)
                .map(|_| receiver.receive_reliable(&listener).is_ok())
                .collect::<Vec<_>>()
        };
        let first = run();
        assert_eq!(first, run());
        assert!(first.iter().any(|ok| *ok));
        assert!(first.iter().any(|ok| !*ok));
    }
}
