//! Measurement runs
//!
//! Drives a [`ReliableSender`] over a connection for a fixed number of
//! packets, applying optional sender-side simulated loss, and folds each
//! outcome into a [`RunSummary`]. The performance matrix repeats that for
//! every (drop rate, packet size) pair against a live receiver.

use crate::config::BenchConfig;
use crate::report::{format_rtt, PacketOutcome, RunSummary, TestResult};
use rand::Rng;
use rudp::io::DatagramConnection;
use rudp::{DropRate, ReliableSender, RudpSocket, SendError, SocketError, Statistics, TransportConfig};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Run errors
#[derive(Error, Debug)]
pub enum RunError {
    #[error("socket error: {0}")]
    Socket(#[from] SocketError),

    #[error("send error: {0}")]
    Send(#[from] SendError),
}

/// Parameters of one sending run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub packet_count: usize,
    pub payload: Vec<u8>,
    /// Probability of skipping a packet before it is written
    pub simulated_drop: DropRate,
    /// Pause after each transmitted packet
    pub interval: Duration,
}

/// Payload of `size` bytes filled with a repeating `0..=255` pattern
pub fn pattern_payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Payload of `size` random bytes
pub fn random_payload<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Vec<u8> {
    let mut payload = vec![0u8; size];
    rng.fill(&mut payload[..]);
    payload
}

/// Send `options.packet_count` packets and summarize the outcomes
///
/// Loss and write failures are logged and counted; only an invalid payload
/// stops the run.
pub fn run_packets<C, R>(
    sender: &ReliableSender,
    conn: &C,
    options: &RunOptions,
    rng: &mut R,
) -> Result<RunSummary, RunError>
where
    C: DatagramConnection + ?Sized,
    R: Rng + ?Sized,
{
    let size = options.payload.len();
    let mut summary = RunSummary::new();
    let start = Instant::now();

    for i in 0..options.packet_count {
        if options.simulated_drop.should_drop(rng) {
            tracing::info!("Packet {} dropped (simulated)", i);
            summary.record(PacketOutcome::SimulatedDrop, size);
            continue;
        }

        let outcome = match sender.send_reliable(conn, &options.payload) {
            Ok(delivery) => {
                tracing::info!(
                    "Packet {} sent successfully, RTT: {} ({} attempts)",
                    i,
                    format_rtt(delivery.rtt),
                    delivery.attempts
                );
                PacketOutcome::Delivered {
                    rtt: delivery.rtt,
                    attempts: delivery.attempts,
                }
            }
            Err(SendError::MaxRetriesExceeded { sequence, attempts }) => {
                tracing::warn!(
                    "Packet {} ACK timeout (seq {}, {} attempts)",
                    i,
                    sequence,
                    attempts
                );
                PacketOutcome::Lost
            }
            Err(SendError::Transport { sequence, source }) => {
                tracing::error!("Failed to send packet {} (seq {}): {}", i, sequence, source);
                PacketOutcome::Failed
            }
            Err(e @ SendError::Invalid(_)) => return Err(e.into()),
        };
        summary.record(outcome, size);

        if !options.interval.is_zero() {
            thread::sleep(options.interval);
        }
    }

    summary.elapsed = start.elapsed();
    Ok(summary)
}

/// Run every (drop rate, packet size) test of `bench` against its remote
///
/// One [`Statistics`] instance serves the whole matrix and is reset between
/// tests.
pub fn run_matrix<R: Rng + ?Sized>(
    bench: &BenchConfig,
    transport: TransportConfig,
    rng: &mut R,
) -> Result<Vec<TestResult>, RunError> {
    let stats = Arc::new(Statistics::new());
    let sender = ReliableSender::new(transport, Arc::clone(&stats));
    let mut results = Vec::with_capacity(bench.drop_rates.len() * bench.packet_sizes.len());

    for &drop_rate in &bench.drop_rates {
        for &packet_size in &bench.packet_sizes {
            stats.reset();
            let conn = RudpSocket::connect_to(bench.remote)?;
            let options = RunOptions {
                packet_count: bench.packet_count,
                payload: pattern_payload(packet_size),
                simulated_drop: DropRate::new(drop_rate),
                interval: Duration::from_millis(1),
            };

            let summary = run_packets(&sender, &conn, &options, rng)?;
            let result = TestResult::from_summary(drop_rate, packet_size, &summary);
            let snapshot = stats.snapshot();
            tracing::info!(
                "{}: RTT {:.3} ms, {:.5} MB/s, loss {:.2}% (retries {}, lost {})",
                result.test_id,
                result.rtt_ms,
                result.bandwidth_mbps,
                result.packet_loss_percent,
                snapshot.packets_retried,
                snapshot.packets_lost
            );
            results.push(result);
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rudp::ReliableReceiver;
    use std::net::SocketAddr;
    use std::path::PathBuf;

    /// Acknowledge datagrams on a loopback socket until it is closed
    fn spawn_receiver(drop_rate: f64) -> (SocketAddr, RudpSocket, thread::JoinHandle<()>) {
        let socket = RudpSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();
        let addr = socket.local_addr().unwrap();
        let handle = socket.try_clone().unwrap();

        let stats = Arc::new(Statistics::with_drop_rate(drop_rate));
        let receiver = ReliableReceiver::new(TransportConfig::default(), stats);
        let join = thread::spawn(move || {
            while !socket.is_closed() {
                let _ = receiver.receive_reliable(&socket);
            }
        });
        (addr, handle, join)
    }

    #[test]
    fn test_payload_helpers() {
        assert_eq!(pattern_payload(3), vec![0, 1, 2]);
        assert_eq!(pattern_payload(300)[257], 1);

        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(random_payload(16, &mut rng).len(), 16);
    }

    #[test]
    fn test_run_packets_over_loopback() {
        let (addr, handle, join) = spawn_receiver(0.0);
        let sender = ReliableSender::new(TransportConfig::default(), Arc::new(Statistics::new()));
        let conn = RudpSocket::connect_to(addr).unwrap();
        let options = RunOptions {
            packet_count: 10,
            payload: pattern_payload(128),
            simulated_drop: DropRate::NONE,
            interval: Duration::ZERO,
        };

        let summary = run_packets(&sender, &conn, &options, &mut StdRng::seed_from_u64(1)).unwrap();
        handle.close();
        join.join().unwrap();

        assert_eq!(summary.packets_sent, 10);
        assert_eq!(summary.packets_received, 10);
        assert_eq!(summary.bytes_delivered, 1280);
        assert_eq!(summary.rtts.len(), 10);
    }

    #[test]
    fn test_simulated_drop_skips_every_packet() {
        let (addr, handle, join) = spawn_receiver(0.0);
        let sender = ReliableSender::new(TransportConfig::default(), Arc::new(Statistics::new()));
        let conn = RudpSocket::connect_to(addr).unwrap();
        let options = RunOptions {
            packet_count: 5,
            payload: pattern_payload(8),
            simulated_drop: DropRate::ALL,
            interval: Duration::ZERO,
        };

        let summary = run_packets(&sender, &conn, &options, &mut StdRng::seed_from_u64(1)).unwrap();
        handle.close();
        join.join().unwrap();

        assert_eq!(summary.simulated_drops, 5);
        assert_eq!(summary.packets_sent, 0);
        assert_eq!(sender.stats().snapshot().packets_sent, 0);
        assert_eq!(summary.end_to_end_loss_percent(), 100.0);
    }

    #[test]
    fn test_oversized_payload_stops_the_run() {
        let (addr, handle, join) = spawn_receiver(0.0);
        let sender = ReliableSender::new(TransportConfig::default(), Arc::new(Statistics::new()));
        let conn = RudpSocket::connect_to(addr).unwrap();
        let options = RunOptions {
            packet_count: 3,
            payload: pattern_payload(2048),
            simulated_drop: DropRate::NONE,
            interval: Duration::ZERO,
        };

        let result = run_packets(&sender, &conn, &options, &mut StdRng::seed_from_u64(1));
        handle.close();
        join.join().unwrap();

        assert!(matches!(result, Err(RunError::Send(SendError::Invalid(_)))));
    }

    #[test]
    fn test_run_matrix() {
        let (addr, handle, join) = spawn_receiver(0.0);
        let bench = BenchConfig {
            remote: addr,
            drop_rates: vec![0.0, 100.0],
            packet_sizes: vec![16, 64],
            packet_count: 3,
            optimized: false,
            output_dir: PathBuf::from("."),
        };

        let results =
            run_matrix(&bench, TransportConfig::default(), &mut StdRng::seed_from_u64(9)).unwrap();
        handle.close();
        join.join().unwrap();

        let ids: Vec<&str> = results.iter().map(|r| r.test_id.as_str()).collect();
        assert_eq!(ids, vec!["drop0_size16", "drop0_size64", "drop100_size16", "drop100_size64"]);
        assert_eq!(results[0].packet_loss_percent, 0.0);
        assert!(results[0].rtt_ms > 0.0);
        assert_eq!(results[2].packet_loss_percent, 100.0);
        assert_eq!(results[2].rtt_ms, 0.0);
    }
}
