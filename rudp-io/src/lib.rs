//! RUDP I/O and Platform Abstraction
//!
//! This crate provides the datagram plumbing underneath the reliable-delivery
//! layer: a UDP socket wrapper, the connection/listener traits the protocol
//! drives, and a monotonic timestamp used for round-trip measurement.

pub mod socket;
pub mod time;
pub mod transport;

pub use socket::{RudpSocket, SocketError};
pub use time::Timestamp;
pub use transport::{DatagramConnection, DatagramListener};
