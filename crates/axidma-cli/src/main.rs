//! `axidma` — command-line capture tool for the AXI DMA S2MM channel.
//!
//! ```text
//! USAGE:
//!   axidma capture -n 10 --out samples.txt   Capture transfers into a file
//!   axidma status                            Decode the channel status register
//! ```

use anyhow::{Context, Result};
use axidma_chip::{layout::RxLayout, platform, regs, status::S2mmStatus};
use axidma_driver::{CaptureSession, DevMem, PollConfig, RegisterIo, RxBuffer, S2mmChannel};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "axidma", about = "AXI DMA S2MM capture CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

/// Physical window bases; hex, defaults from the reference platform.
#[derive(Args)]
struct Windows {
    /// Physical base of the DMA control-register window (hex).
    #[arg(long, value_parser = parse_hex, default_value = "0x40400000")]
    ctrl: u64,

    /// Physical base of the receive-buffer window (hex).
    #[arg(long, value_parser = parse_hex, default_value = "0x0f000000")]
    data: u64,
}

#[derive(Subcommand)]
enum Cmd {
    /// Capture sample transfers into a file.
    Capture {
        /// Number of transfers to issue.
        #[arg(long, short = 'n', default_value_t = 10)]
        transfers: usize,

        /// Samples per transfer.
        #[arg(long, default_value_t = platform::SAMPLES_PER_TRANSFER)]
        samples: usize,

        /// Output file, one line of decimal samples per transfer.
        #[arg(long, short, default_value = "samples.txt")]
        out: PathBuf,

        /// Per-transfer completion deadline in milliseconds.
        #[arg(long, default_value_t = 1000)]
        timeout_ms: u64,

        #[command(flatten)]
        windows: Windows,
    },
    /// Print the decoded channel status register.
    Status {
        #[command(flatten)]
        windows: Windows,
    },
}

fn parse_hex(s: &str) -> std::result::Result<u64, std::num::ParseIntError> {
    let trimmed = s.trim_start_matches("0x").trim_start_matches("0X");
    u64::from_str_radix(trimmed, 16)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::Capture {
            transfers,
            samples,
            out,
            timeout_ms,
            windows,
        } => cmd_capture(transfers, samples, &out, timeout_ms, &windows),
        Cmd::Status { windows } => cmd_status(&windows),
    }
}

fn cmd_capture(
    transfers: usize,
    samples: usize,
    out: &Path,
    timeout_ms: u64,
    windows: &Windows,
) -> Result<()> {
    let layout = RxLayout::new(samples, transfers);

    let devmem = DevMem::open().context("open /dev/mem (root required)")?;
    let ctrl_window = devmem.map(windows.ctrl, platform::CTRL_WINDOW_LEN)?;
    let data_window = devmem.map(windows.data, platform::RX_WINDOW_LEN)?;

    let poll = PollConfig {
        timeout: Duration::from_millis(timeout_ms),
        ..PollConfig::default()
    };
    let channel =
        S2mmChannel::new(ctrl_window, windows.data, platform::RX_WINDOW_LEN).with_poll(poll);
    let rx = RxBuffer::new(data_window, layout)?;

    let mut session = CaptureSession::new(channel, rx);
    let stats = session.run().context("capture failed")?;

    let file = File::create(out).with_context(|| format!("create {}", out.display()))?;
    let mut writer = BufWriter::new(file);
    for transfer in 0..layout.num_transfers() {
        let block = session.rx().transfer_samples(transfer)?;
        let line: Vec<String> = block.iter().map(|s| format!("{s:4}")).collect();
        writeln!(writer, "{}", line.join(" "))?;
    }
    writer.flush()?;

    println!(
        "{} / {} samples transferred",
        stats.bytes / 4,
        layout.total_samples()
    );
    println!("wrote {}", out.display());

    Ok(())
}

fn cmd_status(windows: &Windows) -> Result<()> {
    let devmem = DevMem::open().context("open /dev/mem (root required)")?;
    let ctrl_window = devmem.map(windows.ctrl, platform::CTRL_WINDOW_LEN)?;

    let status = S2mmStatus::from_raw(ctrl_window.read32(regs::S2MM_SR));

    println!("S2MM_DMASR : {status}");
    if status.halted() {
        println!("channel    : halted");
    } else {
        println!("channel    : running");
    }
    if status.any_error() {
        println!("errors     : yes (see flags above)");
    }

    Ok(())
}
