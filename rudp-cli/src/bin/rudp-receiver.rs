//! RUDP Receiver - acknowledging endpoint with artificial loss
//!
//! Acknowledges every datagram it receives unless the configured drop rate
//! says to withhold the ACK, simulating loss for the sender to recover from.

use clap::Parser;
use rudp::{ReceiveError, ReliableReceiver, RudpSocket, SocketError, Statistics};
use rudp_cli::config::{AckModeSetting, Config};
use rudp_cli::logging;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

#[derive(Parser, Debug)]
#[command(name = "rudp-receiver")]
#[command(about = "Reliable UDP receiver with artificial packet loss", long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Artificial drop rate in percent
    #[arg(short, long)]
    drop_rate: Option<f64>,

    /// Record statistics instead of logging every accept/drop decision
    #[arg(long)]
    record_stats: bool,

    /// Statistics log interval in seconds (0 disables)
    #[arg(long)]
    stats: Option<u64>,

    /// Kernel receive buffer size in bytes
    #[arg(long)]
    recv_buffer: Option<usize>,

    /// Acknowledgement framing
    #[arg(long, value_enum)]
    ack_mode: Option<AckModeSetting>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let mut receiver = config.receiver.take().unwrap_or_default();
    if let Some(listen) = args.listen {
        receiver.listen = listen;
    }
    if let Some(drop_rate) = args.drop_rate {
        receiver.drop_rate = drop_rate;
    }
    if args.record_stats {
        receiver.record_stats = true;
    }
    if let Some(stats) = args.stats {
        receiver.stats_interval_secs = stats;
    }
    if let Some(size) = args.recv_buffer {
        receiver.recv_buffer_size = Some(size);
    }
    config.receiver = Some(receiver);

    if let Some(mode) = args.ack_mode {
        config.transport.ack_mode = mode;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = load_config(&args)?;
    let transport = config.transport.to_transport_config();
    let Some(receiver_config) = config.receiver else {
        anyhow::bail!("receiver configuration missing");
    };

    let socket = RudpSocket::bind(receiver_config.listen)?;
    if let Some(size) = receiver_config.recv_buffer_size {
        socket.set_recv_buffer_size(size)?;
        tracing::debug!("Receive buffer: {} bytes", socket.recv_buffer_size()?);
    }
    let stats = Arc::new(Statistics::new());
    let rate = stats.set_drop_rate(receiver_config.drop_rate);
    let receiver = ReliableReceiver::new(transport, Arc::clone(&stats))
        .record_stats(receiver_config.record_stats);

    tracing::info!(
        "Receiver started on {} (drop rate: {}, {:?} ACK)",
        socket.local_addr()?,
        rate,
        transport.ack_mode
    );

    // Statistics thread
    let interval = receiver_config.stats_interval();
    if receiver.records_stats() && !interval.is_zero() {
        let stats = Arc::clone(&stats);
        thread::spawn(move || loop {
            thread::sleep(interval);
            let snap = stats.snapshot();
            tracing::info!(
                "Stats: received={}, dropped={}, loss={:.2}%",
                snap.packets_received,
                snap.artificial_drops,
                if snap.packets_received == 0 {
                    0.0
                } else {
                    100.0 * snap.artificial_drops as f64 / snap.packets_received as f64
                }
            );
        });
    }

    loop {
        match receiver.receive_reliable(&socket) {
            Ok(_) => {}
            Err(ReceiveError::ArtificiallyDropped { .. }) => {}
            Err(ReceiveError::Read(SocketError::Closed)) => break,
            Err(e @ ReceiveError::Read(_)) => tracing::error!("Error reading: {}", e),
            Err(e) => tracing::warn!("{}", e),
        }
    }

    Ok(())
}
