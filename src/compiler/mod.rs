//! Turns the album tree into the list of encoder tasks for a run.
//!
//! Compilation is best effort: a missing source or an unusable target only
//! drops the affected track or (track, format) pair and is recorded as a
//! [`CompileError`].

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

use crate::config::RunConfig;
use crate::error::CompileError;
use crate::ffmpeg::{build_args, EncodeRequest};
use crate::metadata::{Album, Track};
use crate::staleness::check_target;
use crate::tags::ResolvedTags;
use crate::task::{Task, Variant};

/// Extension of the rendered source files
pub const SOURCE_EXTENSION: &str = "wav";

/// Something worth reporting about a track or (track, format) pair that
/// did not become a task
#[derive(Debug)]
pub enum CompileEvent {
    /// Target already newer than its source and the metadata
    UpToDate(PathBuf),
    Failed(CompileError),
}

/// Everything produced by one compilation
#[derive(Debug, Default)]
pub struct Compilation {
    /// Tasks to run, in album, track, format order
    pub tasks: Vec<Task>,
    /// Skips and errors, in the same order
    pub events: Vec<CompileEvent>,
}

impl Compilation {
    pub fn errors(&self) -> Vec<&CompileError> {
        self.events
            .iter()
            .filter_map(|event| match event {
                CompileEvent::Failed(e) => Some(e),
                CompileEvent::UpToDate(_) => None,
            })
            .collect()
    }

    pub fn skipped(&self) -> Vec<&PathBuf> {
        self.events
            .iter()
            .filter_map(|event| match event {
                CompileEvent::UpToDate(target) => Some(target),
                CompileEvent::Failed(_) => None,
            })
            .collect()
    }
}

/// Result of compiling a single (track, format) pair
enum Planned {
    Task(Task),
    UpToDate(PathBuf),
}

pub struct TaskCompiler<'a> {
    config: &'a RunConfig,
    metadata_modified: SystemTime,
}

impl<'a> TaskCompiler<'a> {
    pub fn new(config: &'a RunConfig, metadata_modified: SystemTime) -> Self {
        Self {
            config,
            metadata_modified,
        }
    }

    /// Compile every album; creates output directories along the way
    pub fn compile(&self, albums: &[Album]) -> Compilation {
        let mut compilation = Compilation::default();
        for album in albums {
            self.compile_album(album, &mut compilation);
        }
        debug!(
            "Compiled {} task(s), {} up to date, {} error(s)",
            compilation.tasks.len(),
            compilation.skipped().len(),
            compilation.errors().len()
        );
        compilation
    }

    fn compile_album(&self, album: &Album, compilation: &mut Compilation) {
        for (index, track) in album.tracks.iter().enumerate() {
            let track_number = index + 1;

            let source = self.source_path(track);
            let source_modified = match stat_source(&source) {
                Ok(modified) => modified,
                Err(e) => {
                    compilation.events.push(CompileEvent::Failed(e));
                    continue;
                }
            };

            let tags = ResolvedTags::new(album, track);
            for variant in &self.config.variants {
                let planned = self.plan(
                    album,
                    track,
                    track_number,
                    variant,
                    &tags,
                    &source,
                    source_modified,
                );
                match planned {
                    Ok(Planned::Task(task)) => compilation.tasks.push(task),
                    Ok(Planned::UpToDate(target)) => {
                        compilation.events.push(CompileEvent::UpToDate(target))
                    }
                    Err(e) => compilation.events.push(CompileEvent::Failed(e)),
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn plan(
        &self,
        album: &Album,
        track: &Track,
        track_number: usize,
        variant: &Variant,
        tags: &ResolvedTags,
        source: &Path,
        source_modified: SystemTime,
    ) -> Result<Planned, CompileError> {
        let target_dir = self.target_dir(album, variant);
        std::fs::create_dir_all(&target_dir).map_err(|e| CompileError::DirectoryCreateFailed {
            path: target_dir.clone(),
            source: e,
        })?;

        let target = target_dir.join(target_file_name(album, track_number, track, variant));
        if !check_target(&target, source_modified, self.metadata_modified)? {
            return Ok(Planned::UpToDate(target));
        }

        let args = build_args(&EncodeRequest {
            source,
            target: &target,
            variant,
            track_number,
            tags,
        });
        Ok(Planned::Task(Task::new(
            source.to_path_buf(),
            target,
            variant.clone(),
            args,
        )))
    }

    pub fn source_path(&self, track: &Track) -> PathBuf {
        self.config
            .input_dir
            .join(format!("{}.{}", track.rendered_file, SOURCE_EXTENSION))
    }

    /// `<output>/<format>/<album artist>/<album title>`
    pub fn target_dir(&self, album: &Album, variant: &Variant) -> PathBuf {
        self.config
            .output_dir
            .join(variant.extension())
            .join(&album.artist)
            .join(&album.title)
    }
}

/// `<album artist> - <album title> - <NN> <track title> [<rendered file>].<format>`
///
/// Other tools rely on this exact shape.
pub fn target_file_name(
    album: &Album,
    track_number: usize,
    track: &Track,
    variant: &Variant,
) -> String {
    format!(
        "{} - {} - {:02} {} [{}].{}",
        album.artist,
        album.title,
        track_number,
        track.title,
        track.rendered_file,
        variant.extension()
    )
}

fn stat_source(source: &Path) -> Result<SystemTime, CompileError> {
    let not_found = |e| CompileError::SourceNotFound {
        path: source.to_path_buf(),
        source: e,
    };

    let stat = std::fs::metadata(source).map_err(not_found)?;
    if stat.is_dir() {
        return Err(CompileError::SourceIsDirectory {
            path: source.to_path_buf(),
        });
    }
    stat.modified().map_err(not_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::num::NonZeroUsize;
    use std::time::Duration;
    use tempfile::TempDir;

    fn set_modified(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    fn hours_ago(hours: u64) -> SystemTime {
        SystemTime::now() - Duration::from_secs(hours * 3600)
    }

    struct Fixture {
        _temp_dir: TempDir,
        config: RunConfig,
        albums: Vec<Album>,
    }

    /// Album "Fruit" with tracks Apple and Pear, sources two hours old
    fn fixture(extensions: &[&str]) -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let input_dir = temp_dir.path().join("renders");
        fs::create_dir_all(&input_dir).unwrap();

        for name in ["apple_v3", "pear"] {
            let source = input_dir.join(format!("{name}.wav"));
            fs::write(&source, "RIFF").unwrap();
            set_modified(&source, hours_ago(2));
        }

        let config = RunConfig {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            input_dir,
            output_dir: temp_dir.path().join("out"),
            variants: extensions.iter().map(|e| Variant::from_extension(e)).collect(),
            concurrency: NonZeroUsize::MIN,
            task_timeout: None,
        };

        let albums = vec![Album {
            title: "Fruit".to_string(),
            artist: "The Growers".to_string(),
            tracks: vec![
                Track {
                    rendered_file: "apple_v3".to_string(),
                    title: "Apple".to_string(),
                    ..Default::default()
                },
                Track {
                    rendered_file: "pear".to_string(),
                    title: "Pear".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }];

        Fixture {
            _temp_dir: temp_dir,
            config,
            albums,
        }
    }

    #[test]
    fn test_one_task_per_track_and_format() {
        let fx = fixture(&["mp3", "flac"]);
        let compiler = TaskCompiler::new(&fx.config, hours_ago(1));
        let compilation = compiler.compile(&fx.albums);

        assert!(compilation.errors().is_empty());
        assert!(compilation.skipped().is_empty());
        assert_eq!(compilation.tasks.len(), 4);

        let expected = fx
            .config
            .output_dir
            .join("mp3")
            .join("The Growers")
            .join("Fruit")
            .join("The Growers - Fruit - 01 Apple [apple_v3].mp3");
        assert_eq!(compilation.tasks[0].target, expected);
        assert_eq!(compilation.tasks[0].variant, Variant::Mp3);
        assert_eq!(compilation.tasks[1].variant, Variant::Flac);
        assert!(compilation.tasks[2]
            .target
            .ends_with("The Growers - Fruit - 02 Pear [pear].mp3"));

        // Directories exist before any task referencing them is returned
        for task in &compilation.tasks {
            assert!(task.target.parent().unwrap().is_dir());
            assert_eq!(
                task.args.last().map(String::as_str),
                task.target.to_str()
            );
        }
    }

    #[test]
    fn test_fresh_target_is_skipped() {
        let fx = fixture(&["mp3", "flac"]);
        let compiler = TaskCompiler::new(&fx.config, hours_ago(1));

        let flac_dir = compiler.target_dir(&fx.albums[0], &Variant::Flac);
        fs::create_dir_all(&flac_dir).unwrap();
        let flac = flac_dir.join("The Growers - Fruit - 01 Apple [apple_v3].flac");
        fs::write(&flac, "fLaC").unwrap();

        let compilation = compiler.compile(&fx.albums);
        assert_eq!(compilation.tasks.len(), 3);
        assert_eq!(compilation.skipped(), vec![&flac]);
        assert!(compilation.tasks.iter().all(|task| task.target != flac));
    }

    #[test]
    fn test_target_older_than_metadata_is_rebuilt() {
        let fx = fixture(&["flac"]);
        let compiler = TaskCompiler::new(&fx.config, SystemTime::now());

        let flac_dir = compiler.target_dir(&fx.albums[0], &Variant::Flac);
        fs::create_dir_all(&flac_dir).unwrap();
        let flac = flac_dir.join("The Growers - Fruit - 01 Apple [apple_v3].flac");
        fs::write(&flac, "fLaC").unwrap();
        set_modified(&flac, hours_ago(1));

        let compilation = compiler.compile(&fx.albums);
        assert_eq!(compilation.tasks.len(), 2);
        assert!(compilation.skipped().is_empty());
    }

    #[test]
    fn test_missing_source_drops_whole_track() {
        let fx = fixture(&["mp3", "flac", "ogg"]);
        fs::remove_file(fx.config.input_dir.join("apple_v3.wav")).unwrap();

        let compilation = TaskCompiler::new(&fx.config, hours_ago(1)).compile(&fx.albums);
        assert_eq!(compilation.tasks.len(), 3);
        assert!(compilation.tasks.iter().all(|t| t.source.ends_with("pear.wav")));
        assert_eq!(compilation.errors().len(), 1);
        assert!(matches!(
            compilation.errors()[0],
            CompileError::SourceNotFound { .. }
        ));
    }

    #[test]
    fn test_source_directory_is_error() {
        let fx = fixture(&["mp3"]);
        let source = fx.config.input_dir.join("pear.wav");
        fs::remove_file(&source).unwrap();
        fs::create_dir(&source).unwrap();

        let compilation = TaskCompiler::new(&fx.config, hours_ago(1)).compile(&fx.albums);
        assert_eq!(compilation.tasks.len(), 1);
        assert!(matches!(
            compilation.errors()[..],
            [CompileError::SourceIsDirectory { .. }]
        ));
    }

    #[test]
    fn test_target_directory_drops_only_that_pair() {
        let fx = fixture(&["mp3", "flac"]);
        let compiler = TaskCompiler::new(&fx.config, hours_ago(1));

        let mp3_dir = compiler.target_dir(&fx.albums[0], &Variant::Mp3);
        fs::create_dir_all(mp3_dir.join("The Growers - Fruit - 02 Pear [pear].mp3")).unwrap();

        let compilation = compiler.compile(&fx.albums);
        assert_eq!(compilation.tasks.len(), 3);
        assert!(matches!(
            compilation.errors()[..],
            [CompileError::TargetIsDirectory { .. }]
        ));
    }

    #[test]
    fn test_directory_create_failure_drops_only_that_pair() {
        let fx = fixture(&["mp3", "flac"]);
        fs::create_dir_all(&fx.config.output_dir).unwrap();
        // A file where the flac directory should go
        fs::write(fx.config.output_dir.join("flac"), "").unwrap();

        let compilation = TaskCompiler::new(&fx.config, hours_ago(1)).compile(&fx.albums);
        assert_eq!(compilation.tasks.len(), 2);
        assert!(compilation.tasks.iter().all(|t| t.variant == Variant::Mp3));
        assert_eq!(compilation.errors().len(), 2);
        assert!(compilation
            .errors()
            .iter()
            .all(|e| matches!(e, CompileError::DirectoryCreateFailed { .. })));
    }

    #[test]
    fn test_events_keep_track_and_format_order() {
        let fx = fixture(&["mp3", "flac"]);
        let compiler = TaskCompiler::new(&fx.config, hours_ago(1));

        // Apple: mp3 target is a directory, flac target is up to date
        let mp3_dir = compiler.target_dir(&fx.albums[0], &Variant::Mp3);
        fs::create_dir_all(mp3_dir.join("The Growers - Fruit - 01 Apple [apple_v3].mp3"))
            .unwrap();
        let flac_dir = compiler.target_dir(&fx.albums[0], &Variant::Flac);
        fs::create_dir_all(&flac_dir).unwrap();
        let flac = flac_dir.join("The Growers - Fruit - 01 Apple [apple_v3].flac");
        fs::write(&flac, "fLaC").unwrap();
        // Pear: no source at all
        fs::remove_file(fx.config.input_dir.join("pear.wav")).unwrap();

        let compilation = compiler.compile(&fx.albums);
        assert!(compilation.tasks.is_empty());
        assert!(matches!(
            compilation.events[..],
            [
                CompileEvent::Failed(CompileError::TargetIsDirectory { .. }),
                CompileEvent::UpToDate(_),
                CompileEvent::Failed(CompileError::SourceNotFound { .. }),
            ]
        ));
        assert!(matches!(
            &compilation.events[1],
            CompileEvent::UpToDate(target) if *target == flac
        ));
    }

    #[test]
    fn test_duplicate_formats_compile_independently() {
        let fx = fixture(&["ogg", "ogg"]);
        let compilation = TaskCompiler::new(&fx.config, hours_ago(1)).compile(&fx.albums);
        assert_eq!(compilation.tasks.len(), 4);
        assert_eq!(compilation.tasks[0].target, compilation.tasks[1].target);
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let fx = fixture(&["mp3", "flac"]);
        let compiler = TaskCompiler::new(&fx.config, hours_ago(1));

        let first = compiler.compile(&fx.albums);
        assert_eq!(first.tasks.len(), 4);
        // Stand in for the encoder
        for task in &first.tasks {
            fs::write(&task.target, "encoded").unwrap();
        }

        let second = compiler.compile(&fx.albums);
        assert!(second.tasks.is_empty());
        assert!(second.errors().is_empty());
        assert_eq!(second.skipped().len(), 4);
    }

    #[test]
    fn test_target_file_name_is_deterministic() {
        let album = Album {
            title: "Fruit".to_string(),
            artist: "The Growers".to_string(),
            ..Default::default()
        };
        let track = Track {
            rendered_file: "apple_v3".to_string(),
            title: "Apple".to_string(),
            ..Default::default()
        };

        let first = target_file_name(&album, 1, &track, &Variant::Mp3);
        assert_eq!(first, "The Growers - Fruit - 01 Apple [apple_v3].mp3");
        assert_eq!(first, target_file_name(&album, 1, &track, &Variant::Mp3));
        assert_eq!(
            target_file_name(&album, 12, &track, &Variant::Flac),
            "The Growers - Fruit - 12 Apple [apple_v3].flac"
        );
    }

    #[test]
    fn test_track_artist_override_does_not_move_target() {
        let mut fx = fixture(&["mp3"]);
        fx.albums[0].tracks[0].artist = Some("Guest".to_string());

        let compilation = TaskCompiler::new(&fx.config, hours_ago(1)).compile(&fx.albums);
        let task = &compilation.tasks[0];
        assert!(task
            .target
            .ends_with("mp3/The Growers/Fruit/The Growers - Fruit - 01 Apple [apple_v3].mp3"));
        assert!(task.args.contains(&"artist=Guest".to_string()));
        assert!(task.args.contains(&"album_artist=Guest".to_string()));
    }
}
