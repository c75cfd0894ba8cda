//! Shared fixtures for the RUDP integration tests

use rand::rngs::StdRng;
use rand::SeedableRng;
use rudp_io::RudpSocket;
use rudp_protocol::{ReceiveError, Received, ReliableReceiver, Statistics, TransportConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often the receiver thread wakes up to check for shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A receiver running on its own thread over a loopback socket
pub struct LoopbackReceiver {
    addr: SocketAddr,
    stats: Arc<Statistics>,
    socket: RudpSocket,
    join: Option<JoinHandle<Vec<Result<Received, String>>>>,
}

impl LoopbackReceiver {
    /// Start a statistics-recording receiver with the given drop rate
    pub fn start(config: TransportConfig, drop_rate: f64) -> Self {
        Self::start_with(config, drop_rate, true)
    }

    /// Start a receiver, choosing whether it records statistics
    pub fn start_with(config: TransportConfig, drop_rate: f64, record_stats: bool) -> Self {
        let socket = RudpSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        socket.set_read_timeout(Some(POLL_INTERVAL)).unwrap();
        let addr = socket.local_addr().unwrap();
        let worker = socket.try_clone().unwrap();

        let stats = Arc::new(Statistics::with_drop_rate(drop_rate));
        let receiver =
            ReliableReceiver::with_rng(config, Arc::clone(&stats), StdRng::seed_from_u64(0xACC))
                .record_stats(record_stats);

        let join = thread::spawn(move || {
            let mut log = Vec::new();
            while !worker.is_closed() {
                match receiver.receive_reliable(&worker) {
                    Ok(received) => log.push(Ok(received)),
                    Err(ReceiveError::Read(e)) if e.is_timeout() => {}
                    Err(ReceiveError::Read(_)) => break,
                    Err(e) => log.push(Err(e.to_string())),
                }
            }
            log
        });

        LoopbackReceiver {
            addr,
            stats,
            socket,
            join: Some(join),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn stats(&self) -> &Arc<Statistics> {
        &self.stats
    }

    /// Stop the thread and return what it saw, in arrival order
    pub fn stop(mut self) -> Vec<Result<Received, String>> {
        self.socket.close();
        self.join
            .take()
            .map(|join| join.join().unwrap())
            .unwrap_or_default()
    }
}

impl Drop for LoopbackReceiver {
    fn drop(&mut self) {
        self.socket.close();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Config with a short timeout so exhaustion tests stay quick
pub fn fast_config() -> TransportConfig {
    TransportConfig::default().with_retry_timeout(Duration::from_millis(20))
}
