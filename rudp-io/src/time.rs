//! Time utilities for RUDP
//!
//! Provides the monotonic clock used to stamp packets at creation and to
//! measure round-trip time when the acknowledgement arrives.

use std::time::{Duration, Instant};

/// Monotonic timestamp
///
/// Wraps `std::time::Instant`. Packets capture one at construction; the
/// round-trip time is the elapsed time since that capture, so it includes
/// every retry delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(Instant);

impl Timestamp {
    /// Get the current timestamp
    #[inline]
    pub fn now() -> Self {
        Timestamp(Instant::now())
    }

    /// Calculate elapsed time since this timestamp
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}
