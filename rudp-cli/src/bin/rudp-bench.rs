//! RUDP Bench - performance test matrix
//!
//! Runs a probe for every combination of drop rate and packet size against a
//! running receiver and writes the results to a timestamped CSV file.

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rudp_cli::config::Config;
use rudp_cli::report::save_results;
use rudp_cli::runner::run_matrix;
use rudp_cli::logging;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rudp-bench")]
#[command(about = "Reliable UDP performance test runner", long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Receiver address
    #[arg(short, long)]
    remote: Option<SocketAddr>,

    /// Drop rates to test, comma separated (percent)
    #[arg(short, long, value_delimiter = ',')]
    drop_rates: Vec<f64>,

    /// Packet sizes to test, comma separated (bytes)
    #[arg(short, long, value_delimiter = ',')]
    sizes: Vec<usize>,

    /// Packets per test
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Tag results as coming from an optimized build
    #[arg(long)]
    optimized: bool,

    /// Directory for the results file
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let mut bench = config.bench.take().unwrap_or_default();
    if let Some(remote) = args.remote {
        bench.remote = remote;
    }
    if !args.drop_rates.is_empty() {
        bench.drop_rates = args.drop_rates;
    }
    if !args.sizes.is_empty() {
        bench.packet_sizes = args.sizes;
    }
    if let Some(count) = args.count {
        bench.packet_count = count;
    }
    if args.optimized {
        bench.optimized = true;
    }
    if let Some(dir) = args.output_dir {
        bench.output_dir = dir;
    }
    config.bench = Some(bench);

    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = load_config(args)?;
    let transport = config.transport.to_transport_config();
    let Some(bench) = config.bench else {
        anyhow::bail!("bench configuration missing");
    };

    tracing::info!(
        "Running {} tests against {} ({} packets each)",
        bench.drop_rates.len() * bench.packet_sizes.len(),
        bench.remote,
        bench.packet_count
    );

    let mut rng = StdRng::from_entropy();
    let results = run_matrix(&bench, transport, &mut rng)?;
    let path = save_results(&results, &bench.output_dir, bench.optimized)?;

    println!("Results written to {}", path.display());
    Ok(())
}
