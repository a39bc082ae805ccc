use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Fatal problems with the metadata description itself
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Reading the metadata file {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Parsing the JSON metadata {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Non-fatal problems found while compiling tasks.
///
/// Each one is scoped to a single track or a single (track, format) pair and
/// never stops compilation of the rest of the tree.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Looking for {path:?}: {source}")]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path:?} is a directory (skipping)")]
    SourceIsDirectory { path: PathBuf },

    #[error("Creating directory {path:?}: {source}")]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path:?} is a directory (skipping)")]
    TargetIsDirectory { path: PathBuf },
}

/// Failure of a single encoder invocation
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Failed to launch encoder {program:?}: {source}")]
    LaunchFailure {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Encoder exited with status {}: {diagnostic}", exit_label(.code))]
    NonZeroExit {
        code: Option<i32>,
        diagnostic: String,
    },

    #[error("Encoder timed out after {0:?}")]
    TimedOut(Duration),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        // Terminated by a signal
        None => "unknown".to_string(),
    }
}
