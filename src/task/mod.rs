use std::path::PathBuf;

use crate::error::TaskError;

/// Output formats the encoder knows special handling for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    /// Lossless, maximum compression
    Flac,
    /// Lossy, fixed 320k bitrate with ID3v2.3 tags
    Mp3,
    /// Lossy, highest quality index
    Ogg,
    /// Stream copy of the rendered audio, no cover art
    Wav,
    /// Any other extension; ffmpeg picks its own defaults
    Other(String),
}

impl Variant {
    pub fn from_extension(extension: &str) -> Self {
        match extension {
            "flac" => Variant::Flac,
            "mp3" => Variant::Mp3,
            "ogg" => Variant::Ogg,
            "wav" => Variant::Wav,
            other => Variant::Other(other.to_string()),
        }
    }

    pub fn extension(&self) -> &str {
        match self {
            Variant::Flac => "flac",
            Variant::Mp3 => "mp3",
            Variant::Ogg => "ogg",
            Variant::Wav => "wav",
            Variant::Other(extension) => extension,
        }
    }

    /// Whether a cover image can be embedded as an attached picture
    pub fn supports_cover(&self) -> bool {
        !matches!(self, Variant::Wav)
    }
}

/// A single, fully specified encode operation
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub source: PathBuf,
    pub target: PathBuf,
    pub variant: Variant,
    /// Encoder arguments, in order
    pub args: Vec<String>,
    pub description: String,
}

impl Task {
    pub fn new(source: PathBuf, target: PathBuf, variant: Variant, args: Vec<String>) -> Self {
        let description = format!("{} to {}", source.display(), target.display());
        Self {
            source,
            target,
            variant,
            args,
            description,
        }
    }
}

/// Result of running one task
#[derive(Debug)]
pub struct Outcome {
    pub description: String,
    pub result: Result<(), TaskError>,
}

impl Outcome {
    pub fn success(task: &Task) -> Self {
        Self {
            description: task.description.clone(),
            result: Ok(()),
        }
    }

    pub fn failure(task: &Task, error: TaskError) -> Self {
        Self {
            description: task.description.clone(),
            result: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}
