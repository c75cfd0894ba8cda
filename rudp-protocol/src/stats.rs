//! Statistics aggregator
//!
//! One [`Statistics`] instance is created per test run and shared between
//! senders and receivers through an `Arc`. All state lives behind a single
//! mutex; readers take a [`StatsSnapshot`] copy instead of reading fields
//! piecemeal, so derived metrics are computed from a consistent view.

use crate::drop_rate::DropRate;
use parking_lot::Mutex;
use std::time::Duration;

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSnapshot {
    /// Packets handed to the sender
    pub packets_sent: u64,
    /// Packets acknowledged (sender) or read off the socket (recording receiver)
    pub packets_received: u64,
    /// Packets that exhausted their retries, plus receiver-side artificial drops
    pub packets_lost: u64,
    /// Attempts that timed out or got a mismatched reply and were retried
    pub packets_retried: u64,
    /// Acknowledgements withheld by the receiver's loss injection
    pub artificial_drops: u64,
    /// Sum of round-trip times over acknowledged packets
    pub total_rtt: Duration,
    /// Configured artificial drop rate
    pub drop_rate: DropRate,
}

impl StatsSnapshot {
    /// Mean round-trip time, or `None` if nothing was acknowledged
    pub fn mean_rtt(&self) -> Option<Duration> {
        if self.packets_received == 0 {
            return None;
        }
        let nanos = self.total_rtt.as_nanos() / u128::from(self.packets_received);
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }

    /// Lost packets as a percentage of sent packets
    pub fn loss_rate_percent(&self) -> f64 {
        if self.packets_sent == 0 {
            0.0
        } else {
            100.0 * self.packets_lost as f64 / self.packets_sent as f64
        }
    }
}

/// Thread-safe counters shared by both sides of a run
#[derive(Debug, Default)]
pub struct Statistics {
    inner: Mutex<StatsSnapshot>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with an initial drop rate
    pub fn with_drop_rate(percent: f64) -> Self {
        let stats = Self::new();
        stats.set_drop_rate(percent);
        stats
    }

    pub fn record_sent(&self) {
        self.inner.lock().packets_sent += 1;
    }

    /// Count an acknowledged packet and accumulate its round-trip time
    pub fn record_rtt(&self, rtt: Duration) {
        let mut stats = self.inner.lock();
        stats.packets_received += 1;
        stats.total_rtt += rtt;
    }

    pub fn record_retry(&self) {
        self.inner.lock().packets_retried += 1;
    }

    pub fn record_lost(&self) {
        self.inner.lock().packets_lost += 1;
    }

    pub fn record_received(&self) {
        self.inner.lock().packets_received += 1;
    }

    /// Count a datagram whose acknowledgement was withheld on purpose
    ///
    /// Increments both the lost and the artificial-drop counters.
    pub fn record_artificial_drop(&self) {
        let mut stats = self.inner.lock();
        stats.packets_lost += 1;
        stats.artificial_drops += 1;
    }

    /// Store a clamped drop rate and return what was stored
    pub fn set_drop_rate(&self, percent: f64) -> DropRate {
        let rate = DropRate::new(percent);
        self.inner.lock().drop_rate = rate;
        tracing::debug!("Drop rate set to {}", rate);
        rate
    }

    pub fn drop_rate(&self) -> DropRate {
        self.inner.lock().drop_rate
    }

    /// Copy every counter under one lock acquisition
    pub fn snapshot(&self) -> StatsSnapshot {
        *self.inner.lock()
    }

    /// Zero the counters and RTT accumulator, keeping the drop rate
    pub fn reset(&self) {
        let mut stats = self.inner.lock();
        *stats = StatsSnapshot {
            drop_rate: stats.drop_rate,
            ..StatsSnapshot::default()
        };
    }
}
