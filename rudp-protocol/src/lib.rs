//! RUDP Protocol Core Implementation
//!
//! This crate implements a minimal reliable-delivery layer over UDP: packet
//! construction and size validation, acknowledgement framing, a retrying
//! sender, a receiver with artificial loss injection, and the shared
//! statistics aggregator both sides report into.
//!
//! Delivery guarantee is "delivered or declared lost after N attempts". There
//! is no ordering, duplicate suppression, flow control or handshake.

pub mod ack;
pub mod config;
pub mod drop_rate;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod stats;

#[cfg(test)]
mod mock;

pub use ack::{Ack, AckMode, ACK_MARKER};
pub use config::{ConfigError, TransportConfig};
pub use drop_rate::DropRate;
pub use packet::{DataFrame, Packet, PacketError, SequenceGenerator, MAX_PACKET_SIZE};
pub use receiver::{ReceiveError, Received, ReliableReceiver};
pub use sender::{Delivery, ReliableSender, SendError};
pub use stats::{Statistics, StatsSnapshot};
