//! RUDP - Reliable delivery over UDP
//!
//! High-level API for stop-and-wait delivery with artificial loss injection,
//! used to measure round-trip latency and bandwidth under controlled loss.

pub use rudp_io as io;
pub use rudp_protocol as protocol;

// Re-export commonly used types
pub use io::{RudpSocket, SocketError};
pub use protocol::{
    AckMode, Delivery, DropRate, ReceiveError, Received, ReliableReceiver, ReliableSender,
    SendError, Statistics, StatsSnapshot, TransportConfig,
};
