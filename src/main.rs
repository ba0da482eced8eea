//! `bpm_detect` command-line driver

use std::process::ExitCode;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;

use beatmark::{Config, Pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "bpm_detect",
    about = "Detect BPM, beats, meter and key; write the audio with a metronome click overlay"
)]
struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG, MP4, M4A) or URL
    input: String,

    /// Output WAV path (default: <input>_click.wav)
    #[arg(short, long)]
    output: Option<String>,

    /// Print detailed diagnostics
    #[arg(short, long)]
    verbose: bool,

    /// Minimum BPM to consider
    #[arg(long, default_value_t = 50.0)]
    min_bpm: f32,

    /// Maximum BPM to consider
    #[arg(long, default_value_t = 220.0)]
    max_bpm: f32,

    /// Click volume, 0.0-1.0
    #[arg(long, default_value_t = 0.5)]
    click_volume: f32,

    /// Click frequency in Hz
    #[arg(long, default_value_t = 1000.0)]
    click_freq: f32,

    /// Downbeat click frequency in Hz
    #[arg(long, default_value_t = 1500.0)]
    downbeat_freq: f32,

    /// Use a higher-pitched click on downbeats
    #[arg(long)]
    accent_downbeats: bool,

    /// Disable time-signature detection
    #[arg(long)]
    no_meter: bool,

    /// Disable key-signature detection
    #[arg(long)]
    no_key: bool,
}

fn run(cli: Cli) -> Result<()> {
    let config = Config {
        min_bpm: cli.min_bpm,
        max_bpm: cli.max_bpm,
        click_volume: cli.click_volume,
        click_freq: cli.click_freq,
        downbeat_freq: cli.downbeat_freq,
        accent_downbeats: cli.accent_downbeats,
        detect_meter: !cli.no_meter,
        detect_key: !cli.no_key,
    };

    // File inputs default to `<input>_click.wav`; URL streams derive their
    // name from the stream title inside the pipeline.
    let output = match cli.output {
        Some(path) => path,
        None if !cli.input.contains("://") => format!("{}_click.wav", cli.input),
        None => String::new(),
    };

    Pipeline::run(&cli.input, &output, &config)?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version requests are successes; anything else is a
            // usage error.
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}
