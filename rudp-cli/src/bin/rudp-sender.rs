//! RUDP Sender - reliable delivery probe
//!
//! Sends a fixed number of packets to a receiver, retrying each one until it
//! is acknowledged or declared lost, then prints the run summary.

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rudp::{DropRate, ReliableSender, RudpSocket, Statistics};
use rudp_cli::config::{AckModeSetting, Config};
use rudp_cli::runner::{random_payload, run_packets, RunOptions};
use rudp_cli::{format_bytes, format_duration, logging};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "rudp-sender")]
#[command(about = "Reliable UDP latency and loss probe", long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Receiver address
    #[arg(short, long)]
    target: Option<SocketAddr>,

    /// Number of packets to send
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Sender-side simulated drop rate in percent
    #[arg(short, long)]
    drop_rate: Option<f64>,

    /// Payload size in bytes
    #[arg(short, long)]
    size: Option<usize>,

    /// Pause between packets in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Acknowledgement framing
    #[arg(long, value_enum)]
    ack_mode: Option<AckModeSetting>,

    /// Transmission attempts per packet
    #[arg(long)]
    max_retries: Option<u32>,

    /// Per-attempt ACK timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let mut sender = config.sender.take().unwrap_or_default();
    if let Some(target) = args.target {
        sender.target = target;
    }
    if let Some(count) = args.count {
        sender.packet_count = count;
    }
    if let Some(drop_rate) = args.drop_rate {
        sender.drop_rate = drop_rate;
    }
    if let Some(size) = args.size {
        sender.packet_size = size;
    }
    if let Some(interval_ms) = args.interval_ms {
        sender.interval_ms = interval_ms;
    }
    config.sender = Some(sender);

    if let Some(mode) = args.ack_mode {
        config.transport.ack_mode = mode;
    }
    if let Some(max_retries) = args.max_retries {
        config.transport.max_retries = max_retries;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.transport.retry_timeout_ms = timeout_ms;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = load_config(&args)?;
    let transport = config.transport.to_transport_config();
    let Some(sender_config) = config.sender else {
        anyhow::bail!("sender configuration missing");
    };

    tracing::info!(
        "RUDP Sender: {} packets of {} to {} ({} simulated drop, {:?} ACK)",
        sender_config.packet_count,
        format_bytes(sender_config.packet_size as u64),
        sender_config.target,
        DropRate::new(sender_config.drop_rate),
        transport.ack_mode
    );

    let conn = RudpSocket::connect_to(sender_config.target)?;
    tracing::info!("Sender bound to {} -> {}", conn.local_addr()?, conn.peer_addr()?);

    let stats = Arc::new(Statistics::new());
    let sender = ReliableSender::new(transport, Arc::clone(&stats));
    let mut rng = StdRng::from_entropy();
    let options = RunOptions {
        packet_count: sender_config.packet_count,
        payload: random_payload(sender_config.packet_size, &mut rng),
        simulated_drop: DropRate::new(sender_config.drop_rate),
        interval: sender_config.interval(),
    };

    let summary = run_packets(&sender, &conn, &options, &mut rng)?;

    let snapshot = stats.snapshot();
    tracing::info!(
        "Finished in {}: {} retries, {} lost, {} delivered",
        format_duration(summary.elapsed),
        snapshot.packets_retried,
        snapshot.packets_lost,
        format_bytes(summary.bytes_delivered)
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    summary.write_metrics(&mut out)?;
    out.flush()?;

    Ok(())
}
