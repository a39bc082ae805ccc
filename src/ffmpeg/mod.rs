pub mod args;

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::TaskError;
use crate::task::{Outcome, Task};

pub use args::{build_args, EncodeRequest};

/// Runs one task and turns whatever happens into an [`Outcome`].
///
/// Implementations must not fail: launch errors and encoder errors are
/// reported through the outcome.
pub trait Invoker: Send + Sync + 'static {
    fn invoke(&self, task: &Task) -> impl Future<Output = Outcome> + Send;
}

/// FFmpeg wrapper that runs one encoder process per task
pub struct FFmpegRunner {
    ffmpeg: PathBuf,
    timeout: Option<Duration>,
}

impl FFmpegRunner {
    pub fn new(ffmpeg: PathBuf, timeout: Option<Duration>) -> Self {
        Self { ffmpeg, timeout }
    }

    fn build_command(&self, task: &Task) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(&task.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // An aborted pool must not leave encoders running
            .kill_on_drop(true);
        cmd
    }
}

impl Invoker for FFmpegRunner {
    async fn invoke(&self, task: &Task) -> Outcome {
        let mut cmd = self.build_command(task);
        debug!(
            "Executing FFmpeg command: {}",
            format_command(&self.ffmpeg.to_string_lossy(), &task.args)
        );

        let launch_failure = |source: io::Error| TaskError::LaunchFailure {
            program: self.ffmpeg.clone(),
            source,
        };

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => return Outcome::failure(task, launch_failure(source)),
        };

        let output = match self.timeout {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, collect_output(&mut child)).await;
                match waited {
                    Ok(output) => output,
                    Err(_) => {
                        // The encoder is reaped before its outcome is reported
                        if let Err(e) = child.kill().await {
                            warn!("Failed to kill timed out encoder: {}", e);
                        }
                        return Outcome::failure(task, TaskError::TimedOut(limit));
                    }
                }
            }
            None => collect_output(&mut child).await,
        };

        match output {
            Err(source) => Outcome::failure(task, launch_failure(source)),
            Ok(output) if !output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                Outcome::failure(
                    task,
                    TaskError::NonZeroExit {
                        code: output.status.code(),
                        diagnostic: format_out_and_error(&stdout, &stderr),
                    },
                )
            }
            Ok(_) => Outcome::success(task),
        }
    }
}

/// Wait for the child while draining both pipes, leaving the child in place
/// so a caller that gives up can still kill it
async fn collect_output(child: &mut Child) -> io::Result<Output> {
    let stdout = read_pipe(child.stdout.take());
    let stderr = read_pipe(child.stderr.take());
    let (status, stdout, stderr) = tokio::try_join!(child.wait(), stdout, stderr)?;
    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Tidy the encoder's stdout and stderr into a single line
pub fn format_out_and_error(stdout: &str, stderr: &str) -> String {
    [stdout, stderr]
        .iter()
        .filter(|stream| !stream.is_empty())
        .map(|stream| {
            stream
                .trim_matches(|c| c == '\r' || c == '\n')
                .replace("\r\n", ", ")
                .replace('\n', ", ")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Display form of a command line, quoting arguments that contain spaces
pub fn format_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .map(quote)
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote(arg: &str) -> String {
    if arg.contains(' ') {
        format!("\"{arg}\"")
    } else {
        arg.to_string()
    }
}
