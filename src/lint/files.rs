//! Writing linter config files and deleting legacy ones.

use crate::config::applicator::Mode;
use crate::config::version::{skip_reason, VersionError};
use crate::config::PatchConfig;
use crate::rewrite::atomic_write;
use crate::safety::{SafetyError, WorkspaceGuard};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("refusing to touch {path}: {source}")]
    Safety {
        path: PathBuf,
        #[source]
        source: SafetyError,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not touching {path}: {source}")]
    Version {
        path: PathBuf,
        #[source]
        source: VersionError,
    },
}

/// What happened (or, in check mode, would happen) to a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    Written { path: PathBuf },
    Removed { path: PathBuf },
    /// Removal target was not there; nothing to do
    Absent { path: PathBuf },
    /// Revision's version_range excludes the project version
    SkippedVersion { path: PathBuf, reason: String },
}

/// Write `contents` to `path` in full, replacing whatever was there.
pub fn write_config_file(path: &Path, contents: &str) -> Result<FileAction, FileError> {
    atomic_write(path, contents.as_bytes()).map_err(|source| FileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = contents.len(), "wrote config file");
    Ok(FileAction::Written {
        path: path.to_path_buf(),
    })
}

/// Delete `path` if it exists. A missing file is not an error.
pub fn remove_file(path: &Path) -> Result<FileAction, FileError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed file");
            Ok(FileAction::Removed {
                path: path.to_path_buf(),
            })
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(FileAction::Absent {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(FileError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Run a revision's config writes, then its removals, in table order.
///
/// The revision's `version_range` gates these exactly as it gates the
/// patches: a revision that does not apply to `project_version` writes and
/// deletes nothing.
pub fn apply_housekeeping(
    config: &PatchConfig,
    guard: &WorkspaceGuard,
    project_version: &str,
    mode: Mode,
) -> Vec<Result<FileAction, FileError>> {
    let targets = || {
        config
            .config_files
            .iter()
            .map(|file| file.path.as_str())
            .chain(config.cleanup.remove.iter().map(String::as_str))
            .map(|rel| guard.workspace_root().join(rel))
    };

    match skip_reason(&config.meta, project_version) {
        Ok(None) => {}
        Ok(Some(reason)) => {
            return targets()
                .map(|path| {
                    Ok(FileAction::SkippedVersion {
                        path,
                        reason: reason.clone(),
                    })
                })
                .collect();
        }
        Err(source) => {
            return targets()
                .map(|path| {
                    Err(FileError::Version {
                        path,
                        source: source.clone(),
                    })
                })
                .collect();
        }
    }

    let writes = config
        .config_files
        .iter()
        .map(|file| -> Result<FileAction, FileError> {
            let path = guarded(guard, &file.path)?;
            match mode {
                Mode::Apply => write_config_file(&path, &file.contents),
                Mode::Check => Ok(FileAction::Written { path }),
            }
        });

    let removals = config
        .cleanup
        .remove
        .iter()
        .map(|rel| -> Result<FileAction, FileError> {
            let absolute = guard.workspace_root().join(rel);
            if fs::symlink_metadata(&absolute).is_err() {
                return Ok(FileAction::Absent { path: absolute });
            }
            let path = guarded(guard, rel)?;
            match mode {
                Mode::Apply => remove_file(&path),
                Mode::Check => Ok(FileAction::Removed { path }),
            }
        });

    // All writes precede all removals.
    let mut actions: Vec<_> = writes.collect();
    actions.extend(removals);
    actions
}

fn guarded(guard: &WorkspaceGuard, rel: &str) -> Result<PathBuf, FileError> {
    guard
        .validate_new_path(rel)
        .map_err(|source| FileError::Safety {
            path: guard.workspace_root().join(rel),
            source,
        })
}
