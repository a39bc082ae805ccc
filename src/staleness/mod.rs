use std::path::Path;
use std::time::SystemTime;

use crate::error::CompileError;

/// Whether an existing target must be encoded again.
///
/// A missing target (`None`) is always stale. An existing one is up to date
/// only when it is strictly newer than both the source and the metadata.
///
/// Timestamps are compared as reported by the filesystem; clock skew between
/// the filesystem and the host is not accounted for.
pub fn is_stale(
    target_modified: Option<SystemTime>,
    source_modified: SystemTime,
    metadata_modified: SystemTime,
) -> bool {
    match target_modified {
        None => true,
        Some(target) => !(target > source_modified && target > metadata_modified),
    }
}

/// Stat `target` and decide whether it needs encoding.
///
/// Returns `Ok(false)` when the target is up to date and can be skipped.
pub fn check_target(
    target: &Path,
    source_modified: SystemTime,
    metadata_modified: SystemTime,
) -> Result<bool, CompileError> {
    let target_modified = match std::fs::metadata(target) {
        Ok(stat) if stat.is_dir() => {
            return Err(CompileError::TargetIsDirectory {
                path: target.to_path_buf(),
            })
        }
        // A target whose time cannot be read is treated as missing
        Ok(stat) => stat.modified().ok(),
        Err(_) => None,
    };

    Ok(is_stale(target_modified, source_modified, metadata_modified))
}
