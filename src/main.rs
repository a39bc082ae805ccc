//! # encodemeta - Tagged audio batch encoder
//!
//! Encodes a tree of rendered `.wav` files into FLAC, MP3, OGG and WAV
//! copies, tagged and named from a JSON metadata description.
//!
//! ## Features
//!
//! - **Incremental**: targets newer than both their source and the metadata file are skipped
//! - **Parallel**: a bounded pool of ffmpeg processes, one per logical CPU by default
//! - **Best effort**: missing sources and failed encodes are reported without stopping the run
//! - **Cover art**: album or per-track covers embedded as attached pictures
//!
//! ## Usage
//!
//! ```bash
//! # Encode everything that is out of date
//! encodemeta albums.json
//!
//! # Limit the number of concurrent encoders
//! encodemeta --num-threads 2 albums.json
//!
//! # Show the ffmpeg commands without running them
//! encodemeta --dry-run albums.json
//! ```

use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use encodemeta::commands::encode::EncodeCommand;
use encodemeta::config::default_concurrency;

/// encodemeta - Batch-encode rendered audio into tagged files
#[derive(Parser)]
#[command(
    name = "encodemeta",
    about = "Batch-encode rendered audio into tagged files",
    long_about = "Encodes rendered .wav files into the formats listed in a JSON metadata description, skipping targets that are already up to date.",
    version
)]
struct Cli {
    /// Path to the JSON metadata description
    metadata: PathBuf,
    /// The number of worker threads to use (defaults to the number of logical CPUs)
    #[arg(long, short = 'n', env = "ENCODEMETA_NUM_THREADS")]
    num_threads: Option<NonZeroUsize>,
    /// Print the encoder commands instead of running them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "encodemeta=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let concurrency = cli.num_threads.unwrap_or_else(default_concurrency);
    info!(
        "Starting encode for metadata: {:?}, threads: {}, dry run: {}",
        cli.metadata, concurrency, cli.dry_run
    );

    let result = EncodeCommand::new(cli.metadata, concurrency, cli.dry_run)
        .execute()
        .await;

    // Returning lets the runtime shut down and drop any remaining encoders
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Command failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
