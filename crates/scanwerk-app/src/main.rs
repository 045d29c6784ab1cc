// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk — Document capture pipeline
//
// Entry point. Initialises logging, loads the pipeline config and dispatches
// to a subcommand.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use scanwerk_core::error::Result;
use scanwerk_core::human_errors::humanize_error;
use scanwerk_core::{OutputFilter, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "scanwerk")]
#[command(about = "Detect, straighten and auto-capture documents from camera frames")]
struct Cli {
    /// Pipeline config (JSON). Missing keys take their defaults.
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a still image and print the detection as JSON.
    Detect {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Clockwise rotation that makes the image upright (0, 90, 180, 270).
        #[arg(short, long, default_value_t = 0)]
        rotation: i32,
    },

    /// Detect the document in a still image and write the straightened crop.
    Crop {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Output file; `.jpg`/`.jpeg` writes JPEG, anything else PNG.
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        #[arg(short, long, default_value_t = 0)]
        rotation: i32,

        /// Overrides the filter from the config file.
        #[arg(short, long, value_enum)]
        filter: Option<FilterArg>,

        /// Keep the whole frame when no document is found.
        #[arg(long)]
        full_frame: bool,
    },

    /// Play a directory of frames through a live session and save captures.
    Replay {
        #[arg(value_name = "DIR")]
        frames: PathBuf,

        /// Directory that receives captured documents.
        #[arg(short, long, value_name = "DIR", default_value = "captures")]
        out_dir: PathBuf,

        #[arg(short, long, default_value_t = 0)]
        rotation: i32,

        /// Delay between frames, emulating the camera frame rate.
        #[arg(long, default_value_t = 33)]
        interval_ms: u64,

        /// Stop after this many captures.
        #[arg(long, default_value_t = 1)]
        max_captures: u32,

        /// Replay the frames in a loop until enough captures are taken.
        #[arg(long = "loop")]
        looping: bool,

        /// Disable auto-capture and take one manual capture when the frames
        /// run out.
        #[arg(long)]
        manual: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum FilterArg {
    None,
    Grayscale,
    Binarized,
    Otsu,
    Enhanced,
}

impl From<FilterArg> for OutputFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::None => OutputFilter::None,
            FilterArg::Grayscale => OutputFilter::Grayscale,
            FilterArg::Binarized => OutputFilter::Binarized,
            FilterArg::Otsu => OutputFilter::Otsu,
            FilterArg::Enhanced => OutputFilter::Enhanced,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "scanwerk failed");
            let human = humanize_error(&err);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    tracing::debug!(?config, "Pipeline config loaded");

    match cli.command {
        Command::Detect { image, rotation } => commands::detect::run(&config, &image, rotation),
        Command::Crop {
            image,
            output,
            rotation,
            filter,
            full_frame,
        } => {
            let mut config = config;
            if let Some(filter) = filter {
                config.output_filter = filter.into();
            }
            commands::crop::run(&config, &image, &output, rotation, full_frame)
        }
        Command::Replay {
            frames,
            out_dir,
            rotation,
            interval_ms,
            max_captures,
            looping,
            manual,
        } => {
            let options = commands::replay::ReplayOptions {
                frames,
                out_dir,
                rotation,
                interval_ms,
                max_captures,
                looping,
                manual,
            };
            commands::replay::run(config, options).await
        }
    }
}
