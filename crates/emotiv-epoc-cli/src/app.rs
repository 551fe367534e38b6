use std::path::Path;

use colored::Colorize;
use futures_util::StreamExt;

use emotiv_epoc::headset::to_microvolts;
use emotiv_epoc::{
    AcquisitionMode, Electrode, EpocConfig, EpocError, EpocResult, ReplayTransport, Sample,
    Session, Snapshot,
};

pub enum OutputFormat {
    Text { microvolts: bool },
    Json,
}

pub struct DecodeOptions {
    pub max_samples: u64,
    pub format: OutputFormat,
}

/// Totals printed after a decode run.
#[derive(Default)]
struct Summary {
    samples: u64,
    battery_frames: u64,
    last: Option<Snapshot>,
    dropped: u64,
}

pub async fn run_decode(
    config: &EpocConfig,
    capture: &Path,
    options: &DecodeOptions,
) -> EpocResult<()> {
    let transport = ReplayTransport::open(capture)?;
    let session = Session::from_config(config, transport)?;

    eprintln!(
        "Decoding {} ({} headset, {} acquisition)...",
        capture.display().to_string().cyan(),
        config.mode,
        match config.acquisition.mode {
            AcquisitionMode::Synchronous => "synchronous",
            AcquisitionMode::Queued => "queued",
        }
    );

    let summary = match config.acquisition.mode {
        AcquisitionMode::Synchronous => decode_inline(session, options)?,
        AcquisitionMode::Queued => decode_queued(session, options).await?,
    };

    if !matches!(options.format, OutputFormat::Json) {
        print_summary(&summary);
    }
    Ok(())
}

fn decode_inline(mut session: Session, options: &DecodeOptions) -> EpocResult<Summary> {
    let mut summary = Summary::default();
    loop {
        match session.next_snapshot() {
            Ok(Some(snapshot)) => {
                if !record(&mut summary, snapshot, options) {
                    break;
                }
            }
            Ok(None) => {}
            Err(EpocError::EndOfStream) => break,
            Err(e) => return Err(e),
        }
    }
    session.shutdown();
    Ok(summary)
}

async fn decode_queued(session: Session, options: &DecodeOptions) -> EpocResult<Summary> {
    let mut stream = session.into_stream()?;
    let mut summary = Summary::default();

    loop {
        tokio::select! {
            item = stream.next() => {
                let Some(snapshot) = item else { break };
                if !record(&mut summary, snapshot, options) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n{}", "Decoding stopped.".yellow());
                break;
            }
        }
    }

    stream.stop();
    summary.dropped = stream.dropped_snapshots();
    match stream.exit_reason() {
        None | Some(EpocError::EndOfStream) => Ok(summary),
        Some(e) => Err(e),
    }
}

/// Print one snapshot. Returns `false` once the sample limit is reached.
fn record(summary: &mut Summary, snapshot: Snapshot, options: &DecodeOptions) -> bool {
    match &options.format {
        OutputFormat::Json => match serde_json::to_string(&snapshot) {
            Ok(line) => println!("{line}"),
            Err(err) => eprintln!("{} {}", "Failed to format JSON output:".yellow(), err),
        },
        OutputFormat::Text { microvolts } => print_sample(&snapshot.sample, *microvolts),
    }

    match snapshot.sample {
        Sample::Battery { .. } => summary.battery_frames += 1,
        Sample::Data(_) => summary.samples += 1,
    }
    summary.last = Some(snapshot);

    options.max_samples == 0 || summary.samples < options.max_samples
}

fn print_sample(sample: &Sample, microvolts: bool) {
    match sample {
        Sample::Battery { code, percent } => {
            println!(
                "{} battery {}% (code {code})",
                "[bat]".yellow(),
                percent.to_string().green()
            );
        }
        Sample::Data(data) => {
            let vals: Vec<String> = Electrode::ALL
                .iter()
                .map(|&e| {
                    let code = data.channel(e);
                    if microvolts {
                        format!("{} {:.1}", e.name().dimmed(), to_microvolts(code))
                    } else {
                        format!("{} {code:5}", e.name().dimmed())
                    }
                })
                .collect();
            let quality = data.quality.map_or_else(String::new, |q| {
                format!("  {} {}={}", "q".dimmed(), q.electrode, q.value)
            });
            println!(
                "[{:3}] {}  gyro {:4} {:4}{quality}",
                data.counter,
                vals.join(" "),
                data.gyro_x,
                data.gyro_y
            );
        }
    }
}

fn print_summary(summary: &Summary) {
    println!();
    println!(
        "{} {} samples, {} battery frames",
        "Done:".green(),
        summary.samples,
        summary.battery_frames
    );
    let Some(last) = &summary.last else {
        return;
    };
    println!("  Battery: {}%", last.battery_percent);
    println!("  Lost frames: {}", last.lost_frames);
    if summary.dropped > 0 {
        println!("  Dropped snapshots: {}", summary.dropped.to_string().yellow());
    }
    let quality: Vec<String> = last
        .quality
        .iter()
        .map(|(e, v)| format!("{e}={v}"))
        .collect();
    println!("  Contact quality: {}", quality.join(" "));
}
