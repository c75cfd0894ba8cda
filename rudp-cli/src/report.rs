//! Result reporting and formatting
//!
//! Turns per-packet outcomes into the run summary printed by the sender and
//! the CSV rows written by the performance runner.

use chrono::Local;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Format bytes in human-readable form
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format RTT in human-readable form
pub fn format_rtt(rtt: Duration) -> String {
    let micros = rtt.as_micros();
    if micros >= 1_000_000 {
        format!("{:.2}s", rtt.as_secs_f64())
    } else if micros >= 1_000 {
        format!("{:.2}ms", micros as f64 / 1_000.0)
    } else {
        format!("{}µs", micros)
    }
}

/// Format duration in human-readable form
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

fn as_millis_f64(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}

/// What happened to one packet of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketOutcome {
    /// Acknowledged
    Delivered { rtt: Duration, attempts: u32 },
    /// Skipped by the sender-side loss simulation, never written
    SimulatedDrop,
    /// Retries exhausted
    Lost,
    /// Write failed
    Failed,
}

/// Aggregate results of one sending run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Packets the run was asked to send, simulated drops included
    pub packets_planned: u64,
    /// Packets actually handed to the transport
    pub packets_sent: u64,
    /// Packets acknowledged
    pub packets_received: u64,
    /// Packets skipped by the sender-side loss simulation
    pub simulated_drops: u64,
    /// Payload bytes acknowledged
    pub bytes_delivered: u64,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
    /// Round-trip time of every acknowledged packet, in send order
    pub rtts: Vec<Duration>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one packet of `size` payload bytes
    pub fn record(&mut self, outcome: PacketOutcome, size: usize) {
        self.packets_planned += 1;
        match outcome {
            PacketOutcome::Delivered { rtt, .. } => {
                self.packets_sent += 1;
                self.packets_received += 1;
                self.bytes_delivered += size as u64;
                self.rtts.push(rtt);
            }
            PacketOutcome::SimulatedDrop => self.simulated_drops += 1,
            PacketOutcome::Lost | PacketOutcome::Failed => self.packets_sent += 1,
        }
    }

    /// Sent packets that were never acknowledged
    pub fn dropped(&self) -> u64 {
        self.packets_sent - self.packets_received
    }

    /// Unacknowledged share of sent packets, in percent
    pub fn loss_rate_percent(&self) -> f64 {
        if self.packets_sent == 0 {
            0.0
        } else {
            100.0 * self.dropped() as f64 / self.packets_sent as f64
        }
    }

    /// Unacknowledged share of planned packets, simulated drops included
    pub fn end_to_end_loss_percent(&self) -> f64 {
        if self.packets_planned == 0 {
            0.0
        } else {
            100.0 * (self.packets_planned - self.packets_received) as f64
                / self.packets_planned as f64
        }
    }

    /// Acknowledged payload throughput in MiB per second
    pub fn bandwidth_mbps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.bytes_delivered as f64 / secs / (1024.0 * 1024.0)
        }
    }

    /// Mean round-trip time, or `None` if nothing was acknowledged
    pub fn mean_rtt(&self) -> Option<Duration> {
        if self.rtts.is_empty() {
            return None;
        }
        let total: Duration = self.rtts.iter().sum();
        Some(total / self.rtts.len() as u32)
    }

    /// Mean round-trip time in milliseconds (0 when nothing was acknowledged)
    pub fn mean_rtt_ms(&self) -> f64 {
        self.mean_rtt().map_or(0.0, as_millis_f64)
    }

    /// Write the `Metric,Value` summary block
    pub fn write_metrics<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Metric,Value")?;
        writeln!(out, "Packets_Sent,{}", self.packets_sent)?;
        writeln!(out, "Packets_Received,{}", self.packets_received)?;
        writeln!(out, "Dropped_Packets,{}", self.dropped())?;
        writeln!(out, "Packet_Loss_Rate,{:.2}", self.loss_rate_percent())?;
        writeln!(out, "Bandwidth_MBps,{:.5}", self.bandwidth_mbps())?;
        writeln!(out, "Average_RTT_ms,{:.3}", self.mean_rtt_ms())?;
        Ok(())
    }
}

/// One row of the performance results file
#[derive(Debug, Clone, PartialEq)]
pub struct TestResult {
    /// `drop{rate}_size{bytes}`
    pub test_id: String,
    pub rtt_ms: f64,
    pub bandwidth_mbps: f64,
    pub packet_loss_percent: f64,
}

impl TestResult {
    /// Build a row from a finished run
    pub fn from_summary(drop_rate: f64, packet_size: usize, summary: &RunSummary) -> Self {
        TestResult {
            test_id: test_id(drop_rate, packet_size),
            rtt_ms: summary.mean_rtt_ms(),
            bandwidth_mbps: summary.bandwidth_mbps(),
            packet_loss_percent: summary.end_to_end_loss_percent(),
        }
    }
}

/// Identifier of a (drop rate, packet size) test
pub fn test_id(drop_rate: f64, packet_size: usize) -> String {
    format!("drop{:.0}_size{}", drop_rate, packet_size)
}

/// CSV header of the performance results file
pub const CSV_HEADER: &str = "Test,RTT (ms),Bandwidth (MB/s),Packet Loss (%)";

/// Write results as CSV
pub fn write_csv<W: Write>(results: &[TestResult], out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", CSV_HEADER)?;
    for result in results {
        writeln!(
            out,
            "{},{:.2},{:.2},{:.2}",
            result.test_id, result.rtt_ms, result.bandwidth_mbps, result.packet_loss_percent
        )?;
    }
    Ok(())
}

/// Name of the results file for a run started now
pub fn results_file_name(optimized: bool) -> String {
    format!(
        "results_{}_{}.csv",
        Local::now().format("%Y%m%d_%H%M%S"),
        if optimized { "opt" } else { "noopt" }
    )
}

/// Write `results` into a timestamped CSV under `dir`, returning its path
pub fn save_results(results: &[TestResult], dir: &Path, optimized: bool) -> io::Result<PathBuf> {
    let path = dir.join(results_file_name(optimized));
    let mut writer = BufWriter::new(File::create(&path)?);
    write_csv(results, &mut writer)?;
    writer.flush()?;
    Ok(path)
}
