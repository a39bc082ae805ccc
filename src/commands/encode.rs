use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, warn};

use crate::compiler::{Compilation, CompileEvent, TaskCompiler};
use crate::config::{Config, RunConfig};
use crate::ffmpeg::{format_command, FFmpegRunner};
use crate::metadata::Metadata;
use crate::task::Outcome;
use crate::worker::{PoolSummary, WorkerPool};

/// Command to encode every stale track described by a metadata file
pub struct EncodeCommand {
    metadata_path: PathBuf,
    concurrency: NonZeroUsize,
    dry_run: bool,
}

impl EncodeCommand {
    pub fn new(metadata_path: PathBuf, concurrency: NonZeroUsize, dry_run: bool) -> Self {
        Self {
            metadata_path,
            concurrency,
            dry_run,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let (metadata, metadata_modified) = Metadata::load(&self.metadata_path)?;
        let run = RunConfig::new(&metadata, &Config::from_env(), self.concurrency);

        tokio::fs::create_dir_all(&run.output_dir)
            .await
            .with_context(|| format!("Creating the output path {:?}", run.output_dir))?;

        let compilation = TaskCompiler::new(&run, metadata_modified).compile(&metadata.albums);
        report_compilation(&compilation);

        let tasks = compilation.tasks;
        info!("Processing {} track(s)", tasks.len());

        if self.dry_run {
            let ffmpeg = run.ffmpeg_path.to_string_lossy();
            for task in &tasks {
                println!("{}", format_command(&ffmpeg, &task.args));
            }
            return Ok(());
        }

        if tasks.is_empty() {
            info!("✅ Nothing to encode.");
            return Ok(());
        }

        let pool = WorkerPool::new(
            FFmpegRunner::new(run.ffmpeg_path.clone(), run.task_timeout),
            run.concurrency,
        );
        info!(
            "🚀 Encoding with {} worker(s) using {:?}",
            pool.concurrency(),
            run.ffmpeg_path
        );

        let progress = ProgressBar::new(tasks.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len}")?,
        );

        let total = tasks.len();
        let summary = pool
            .run(
                tasks,
                |outcome| {
                    progress.suspend(|| report_outcome(&outcome));
                    progress.inc(1);
                },
                interrupted(),
            )
            .await;

        if summary.interrupted {
            progress.abandon();
            warn!(
                "🛑 Interrupted after {} of {} task(s). Running encoders were stopped.",
                summary.attempted, total
            );
            return Err(anyhow!("Encoding interrupted"));
        }

        progress.finish_and_clear();
        report_summary(&summary);
        Ok(())
    }
}

/// Completes on Ctrl-C; never completes if the handler cannot be installed
async fn interrupted() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Unable to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn report_compilation(compilation: &Compilation) {
    for event in &compilation.events {
        match event {
            CompileEvent::UpToDate(target) => {
                info!("⏭️ Skipping {:?} (is more recent)", target)
            }
            CompileEvent::Failed(e) => error!("{}", e),
        }
    }
}

fn report_outcome(outcome: &Outcome) {
    match &outcome.result {
        Ok(()) => info!("✅ {}", outcome.description),
        Err(e) => error!("❌ {}: {}", outcome.description, e),
    }
}

fn report_summary(summary: &PoolSummary) {
    if summary.failed > 0 {
        warn!(
            "Finished {} task(s): {} succeeded, {} failed.",
            summary.attempted, summary.succeeded, summary.failed
        );
    } else {
        info!("Finished {} task(s).", summary.attempted);
    }
}
