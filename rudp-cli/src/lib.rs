//! RUDP CLI Library
//!
//! Shared functionality for the RUDP measurement tools.

pub mod config;
pub mod logging;
pub mod report;
pub mod runner;

pub use config::{AckModeSetting, BenchConfig, Config, ReceiverConfig, SenderConfig, TransportSettings};
pub use report::{format_bytes, format_duration, format_rtt, PacketOutcome, RunSummary, TestResult};
pub use runner::{run_matrix, run_packets, RunError, RunOptions};
