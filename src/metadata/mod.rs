use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

use crate::error::MetadataError;

/// A single rendered track and the tags it overrides on its album.
///
/// Every optional field is `None` when the JSON leaves it out (or sets it to
/// `null`), which is different from an explicit empty string.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Track {
    /// Name of the rendered `.wav` file, without extension
    pub rendered_file: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub composer: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
}

/// An album: default tag values shared by an ordered list of tracks
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Album {
    pub title: String,
    pub composer: String,
    pub artist: String,
    pub genre: String,
    pub date: String,
    pub cover: String,
    pub copyright: String,
    pub tracks: Vec<Track>,
}

/// The whole metadata description
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Metadata {
    pub ffmpeg_path: String,
    pub input_path: String,
    pub output_path: String,
    pub output_extensions: Vec<String>,
    /// `Some(false)` restricts encoding to a single worker
    pub parallel: Option<bool>,
    pub albums: Vec<Album>,
}

impl Metadata {
    /// Parse a metadata description from JSON text
    pub fn from_json(path: &Path, text: &str) -> Result<Self, MetadataError> {
        serde_json::from_str(text).map_err(|source| MetadataError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read and parse a metadata file, returning it with its modification time.
    ///
    /// The modification time takes part in staleness checks: editing the
    /// metadata forces every target to be encoded again.
    pub fn load(path: &Path) -> Result<(Self, SystemTime), MetadataError> {
        let unreadable = |source| MetadataError::Unreadable {
            path: path.to_path_buf(),
            source,
        };

        let modified = std::fs::metadata(path)
            .and_then(|stat| stat.modified())
            .map_err(unreadable)?;
        let text = std::fs::read_to_string(path).map_err(unreadable)?;
        let metadata = Self::from_json(path, &text)?;

        debug!(
            "Loaded {} album(s) with {} track(s) from {:?}",
            metadata.albums.len(),
            metadata.track_count(),
            path
        );
        Ok((metadata, modified))
    }

    /// Number of tracks across all albums
    pub fn track_count(&self) -> usize {
        self.albums.iter().map(|album| album.tracks.len()).sum()
    }
}

/// Convert a `/`-separated path from the metadata into a native path
pub fn from_slash(path: &str) -> PathBuf {
    if std::path::MAIN_SEPARATOR == '/' {
        PathBuf::from(path)
    } else {
        PathBuf::from(path.replace('/', std::path::MAIN_SEPARATOR_STR))
    }
}
