use std::path::PathBuf;

use crate::metadata::{from_slash, Album, Track};

/// Pick the track's override when it has one, the album default otherwise
pub fn resolve<'a>(album_default: &'a str, track_override: Option<&'a str>) -> &'a str {
    track_override.unwrap_or(album_default)
}

/// Effective tag values for one track after applying its overrides
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTags {
    pub title: String,
    pub album: String,
    pub composer: String,
    pub artist: String,
    pub genre: String,
    pub date: String,
    pub copyright: String,
    /// `None` when the resolved cover path is empty
    pub cover: Option<PathBuf>,
}

impl ResolvedTags {
    pub fn new(album: &Album, track: &Track) -> Self {
        let field = |default: &str, over: &Option<String>| {
            resolve(default, over.as_deref()).to_string()
        };

        let cover = resolve(&album.cover, track.cover.as_deref());
        Self {
            title: track.title.clone(),
            album: album.title.clone(),
            composer: field(&album.composer, &track.composer),
            artist: field(&album.artist, &track.artist),
            genre: field(&album.genre, &track.genre),
            date: field(&album.date, &track.date),
            copyright: field(&album.copyright, &track.copyright),
            cover: (!cover.is_empty()).then(|| from_slash(cover)),
        }
    }
}
