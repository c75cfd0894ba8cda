//! Configuration file support for RUDP CLI tools

use rudp::protocol::config::{DEFAULT_MAX_PACKET_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_TIMEOUT};
use rudp::{AckMode, TransportConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Acknowledgement framing as written in config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AckModeSetting {
    /// Bare `ACK` marker, no correlation
    #[default]
    Marker,
    /// Marker plus echoed sequence number
    Sequenced,
}

impl From<AckModeSetting> for AckMode {
    fn from(setting: AckModeSetting) -> Self {
        match setting {
            AckModeSetting::Marker => AckMode::Marker,
            AckModeSetting::Sequenced => AckMode::Sequenced,
        }
    }
}

/// Retry and framing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSettings {
    /// Transmission attempts per packet
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Per-attempt ACK timeout in milliseconds
    #[serde(default = "default_retry_timeout_ms")]
    pub retry_timeout_ms: u64,
    /// Maximum payload size in bytes
    #[serde(default = "default_max_packet_size")]
    pub max_packet_size: usize,
    /// Acknowledgement framing
    #[serde(default)]
    pub ack_mode: AckModeSetting,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_timeout_ms() -> u64 {
    DEFAULT_RETRY_TIMEOUT.as_millis() as u64
}

fn default_max_packet_size() -> usize {
    DEFAULT_MAX_PACKET_SIZE
}

impl Default for TransportSettings {
    fn default() -> Self {
        TransportSettings {
            max_retries: default_max_retries(),
            retry_timeout_ms: default_retry_timeout_ms(),
            max_packet_size: default_max_packet_size(),
            ack_mode: AckModeSetting::Marker,
        }
    }
}

impl TransportSettings {
    /// Convert to the protocol's configuration
    pub fn to_transport_config(&self) -> TransportConfig {
        TransportConfig::default()
            .with_max_retries(self.max_retries)
            .with_retry_timeout(Duration::from_millis(self.retry_timeout_ms))
            .with_max_packet_size(self.max_packet_size)
            .with_ack_mode(self.ack_mode.into())
    }
}

/// Sender configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderConfig {
    /// Receiver address
    #[serde(default = "default_target")]
    pub target: SocketAddr,
    /// Number of packets to send
    pub packet_count: usize,
    /// Payload size in bytes
    pub packet_size: usize,
    /// Sender-side simulated drop rate (percent)
    #[serde(default)]
    pub drop_rate: f64,
    /// Pause between packets in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_target() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_interval_ms() -> u64 {
    1
}

impl Default for SenderConfig {
    fn default() -> Self {
        SenderConfig {
            target: default_target(),
            packet_count: 100,
            packet_size: DEFAULT_MAX_PACKET_SIZE,
            drop_rate: 0.0,
            interval_ms: default_interval_ms(),
        }
    }
}

impl SenderConfig {
    /// Get the inter-packet pause as Duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Receiver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Artificial drop rate (percent)
    #[serde(default)]
    pub drop_rate: f64,
    /// Record statistics instead of logging every decision
    #[serde(default)]
    pub record_stats: bool,
    /// Statistics log interval in seconds (0 disables)
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
    /// Kernel receive buffer size in bytes (system default when unset)
    #[serde(default)]
    pub recv_buffer_size: Option<usize>,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_stats_interval() -> u64 {
    0
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        ReceiverConfig {
            listen: default_listen(),
            drop_rate: 0.0,
            record_stats: false,
            stats_interval_secs: default_stats_interval(),
            recv_buffer_size: None,
        }
    }
}

impl ReceiverConfig {
    /// Get statistics interval as Duration
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}

/// Performance test matrix configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Receiver address
    #[serde(default = "default_target")]
    pub remote: SocketAddr,
    /// Sender-side drop rates to test (percent)
    pub drop_rates: Vec<f64>,
    /// Payload sizes to test
    pub packet_sizes: Vec<usize>,
    /// Packets per test
    pub packet_count: usize,
    /// Tag results as produced by an optimized build
    #[serde(default)]
    pub optimized: bool,
    /// Directory for the results CSV
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            remote: default_target(),
            drop_rates: vec![0.0, 5.0, 10.0, 20.0],
            packet_sizes: vec![64, 512, 1024],
            packet_count: 100,
            optimized: false,
            output_dir: default_output_dir(),
        }
    }
}

/// Combined configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Transport settings shared by all tools
    #[serde(default)]
    pub transport: TransportSettings,
    /// Sender configuration
    pub sender: Option<SenderConfig>,
    /// Receiver configuration
    pub receiver: Option<ReceiverConfig>,
    /// Performance test configuration
    pub bench: Option<BenchConfig>,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Check the process-level contract: drop rates in `[0, 100]`, non-zero
    /// packet counts, payload sizes within the transport limit
    pub fn validate(&self) -> Result<(), ConfigError> {
        let transport = self.transport.to_transport_config();
        transport
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let max = transport.max_packet_size;

        if let Some(sender) = &self.sender {
            check_drop_rate(sender.drop_rate)?;
            check_count(sender.packet_count)?;
            check_size(sender.packet_size, max)?;
        }
        if let Some(receiver) = &self.receiver {
            check_drop_rate(receiver.drop_rate)?;
        }
        if let Some(bench) = &self.bench {
            check_count(bench.packet_count)?;
            if bench.drop_rates.is_empty() || bench.packet_sizes.is_empty() {
                return Err(ConfigError::Invalid(
                    "bench needs at least one drop rate and one packet size".into(),
                ));
            }
            for rate in &bench.drop_rates {
                check_drop_rate(*rate)?;
            }
            for size in &bench.packet_sizes {
                check_size(*size, max)?;
            }
        }
        Ok(())
    }
}

fn check_drop_rate(rate: f64) -> Result<(), ConfigError> {
    if (0.0..=100.0).contains(&rate) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "drop rate {} outside [0, 100]",
            rate
        )))
    }
}

fn check_count(count: usize) -> Result<(), ConfigError> {
    if count == 0 {
        Err(ConfigError::Invalid("packet count must be positive".into()))
    } else {
        Ok(())
    }
}

fn check_size(size: usize, max: usize) -> Result<(), ConfigError> {
    if size > max {
        Err(ConfigError::Invalid(format!(
            "packet size {} exceeds maximum of {} bytes",
            size, max
        )))
    } else {
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
