use std::env;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use crate::metadata::{from_slash, Metadata};
use crate::task::Variant;

/// Ambient settings read from the environment
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Encoder used when the metadata does not name one
    pub ffmpeg_path: Option<String>,
    /// Per-invocation limit; `None` lets an encoder run indefinitely
    pub task_timeout: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            ffmpeg_path: env::var("FFMPEG_PATH").ok().filter(|p| !p.is_empty()),
            task_timeout: env::var("ENCODE_TIMEOUT")
                .ok()
                .and_then(|secs| secs.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }
}

/// Everything a run needs besides the album tree itself
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub ffmpeg_path: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub variants: Vec<Variant>,
    pub concurrency: NonZeroUsize,
    pub task_timeout: Option<Duration>,
}

impl RunConfig {
    pub fn new(metadata: &Metadata, config: &Config, concurrency: NonZeroUsize) -> Self {
        let ffmpeg = if metadata.ffmpeg_path.is_empty() {
            config.ffmpeg_path.as_deref().unwrap_or("ffmpeg")
        } else {
            metadata.ffmpeg_path.as_str()
        };

        let concurrency = match metadata.parallel {
            Some(false) => NonZeroUsize::MIN,
            _ => concurrency,
        };

        Self {
            ffmpeg_path: from_slash(ffmpeg),
            input_dir: PathBuf::from(&metadata.input_path),
            output_dir: PathBuf::from(&metadata.output_path),
            variants: metadata
                .output_extensions
                .iter()
                .map(|extension| Variant::from_extension(extension))
                .collect(),
            concurrency,
            task_timeout: config.task_timeout,
        }
    }
}

/// Number of workers used when none is requested
pub fn default_concurrency() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}
