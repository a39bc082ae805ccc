use std::path::Path;

use crate::tags::ResolvedTags;
use crate::task::Variant;

/// Everything needed to build the encoder command line for one task
#[derive(Debug, Clone, Copy)]
pub struct EncodeRequest<'a> {
    pub source: &'a Path,
    pub target: &'a Path,
    pub variant: &'a Variant,
    /// 1-based position of the track in its album
    pub track_number: usize,
    pub tags: &'a ResolvedTags,
}

/// Build the ffmpeg arguments for a request.
///
/// Argument order matters to ffmpeg: inputs and their options first, then
/// stream mapping, codec options, metadata and finally the output path.
pub fn build_args(request: &EncodeRequest<'_>) -> Vec<String> {
    let EncodeRequest {
        source,
        target,
        variant,
        track_number,
        tags,
    } = *request;

    let mut args = strings(&["-loglevel", "error", "-y", "-i"]);
    args.push(path_arg(source));

    if let Some(cover) = &tags.cover {
        if variant.supports_cover() {
            args.push("-i".to_string());
            args.push(path_arg(cover));
            args.extend(strings(&[
                "-disposition:v",
                "attached_pic",
                "-metadata:s:v",
                "title=Album Cover",
                "-metadata:s:v",
                "comment=Cover (Front)",
            ]));
        }
        // Most mp3 players only understand ID3v2.3 cover art
        if *variant == Variant::Mp3 {
            args.extend(strings(&["-map", "0:a", "-map", "1:v", "-id3v2_version", "3"]));
        }
    }

    if *variant == Variant::Wav {
        args.extend(strings(&["-acodec", "copy"]));
    }

    let metadata = [
        ("track", track_number.to_string()),
        ("title", tags.title.clone()),
        ("album", tags.album.clone()),
        ("genre", tags.genre.clone()),
        ("date", tags.date.clone()),
        ("artist", tags.artist.clone()),
        ("album_artist", tags.artist.clone()),
        ("composer", tags.composer.clone()),
        ("comment", tags.copyright.clone()),
    ];
    for (key, value) in metadata {
        args.push("-metadata".to_string());
        args.push(format!("{key}={value}"));
    }

    match variant {
        Variant::Flac => args.extend(strings(&["-compression_level", "12"])),
        Variant::Mp3 => args.extend(strings(&[
            "-compression_level",
            "0",
            "-abr",
            "1",
            "-b:a",
            "320k",
        ])),
        Variant::Ogg => args.extend(strings(&["-q", "10"])),
        Variant::Wav | Variant::Other(_) => {}
    }

    args.push(path_arg(target));
    args
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// Paths are built from UTF-8 metadata strings, so the lossy conversion never loses data.
fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
