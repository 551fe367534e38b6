//! # emotiv-epoc-cli
//!
//! Command-line logger for raw Emotiv EPOC frames. Decodes a capture of
//! encrypted 32-byte frames and prints channel values, or writes a synthetic
//! capture for a given serial and headset variant.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;

mod app;
mod synth;

use app::{DecodeOptions, OutputFormat, run_decode};
use emotiv_epoc::{AcquisitionMode, DeviceMode, EpocConfig};

/// Decode and inspect raw Emotiv EPOC captures.
#[derive(Parser)]
#[command(name = "emotiv-epoc-cli", version, about)]
struct Cli {
    /// Path to epoc.toml config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dongle serial override
    #[arg(short, long)]
    serial: Option<String>,

    /// Headset variant override
    #[arg(long, value_parser = parse_device_mode)]
    device_mode: Option<DeviceMode>,

    /// Enable verbose logging (set RUST_LOG for fine-grained control)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a capture file and print samples.
    Decode {
        /// Capture of back-to-back encrypted frames
        capture: PathBuf,

        /// Decode on a background producer instead of inline
        #[arg(long)]
        queued: bool,

        /// Stop after this many samples (0 = until the capture ends)
        #[arg(short = 'n', long, default_value_t = 0)]
        max_samples: u64,

        /// Print one JSON snapshot per line
        #[arg(long)]
        json: bool,

        /// Print channel values in microvolts instead of ADC codes
        #[arg(long)]
        microvolts: bool,
    },
    /// Write a synthetic capture encrypted for the configured serial.
    Synth {
        /// Output file
        output: PathBuf,

        /// Number of frames to write (battery frames included)
        #[arg(short = 'n', long, default_value_t = 1024)]
        frames: usize,
    },
}

fn parse_device_mode(s: &str) -> Result<DeviceMode, String> {
    s.parse().map_err(|e: emotiv_epoc::EpocError| e.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("emotiv_epoc=debug,emotiv_epoc_cli=debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("emotiv_epoc=warn")
            .with_writer(std::io::stderr)
            .init();
    }

    let mut config = match EpocConfig::discover(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) if cli.config.is_some() => return Err(e.into()),
        Err(e) => {
            eprintln!("{} {}", "Note:".yellow(), e);
            eprintln!("  Falling back to defaults.\n");
            EpocConfig::default()
        }
    };

    if let Some(serial) = cli.serial {
        config.serial = Some(serial);
    }
    if let Some(mode) = cli.device_mode {
        config.mode = mode;
    }
    tracing::debug!(?config, "Resolved config");

    if config.serial.is_none() {
        eprintln!(
            "{} no serial configured. Pass {} or set {}.",
            "Error:".red(),
            "--serial".cyan(),
            "EMOTIV_EPOC_SERIAL".cyan()
        );
        std::process::exit(2);
    }

    match cli.command {
        Command::Decode {
            capture,
            queued,
            max_samples,
            json,
            microvolts,
        } => {
            if queued {
                config.acquisition.mode = AcquisitionMode::Queued;
            }
            let options = DecodeOptions {
                max_samples,
                format: if json {
                    OutputFormat::Json
                } else {
                    OutputFormat::Text { microvolts }
                },
            };
            run_decode(&config, &capture, &options).await?;
        }
        Command::Synth { output, frames } => {
            let serial = config.serial_number()?;
            let written = synth::write_capture(&output, &serial, config.mode, frames)?;
            eprintln!(
                "{} {} frames to {}",
                "Wrote".green(),
                written,
                output.display().to_string().cyan()
            );
        }
    }

    Ok(())
}
