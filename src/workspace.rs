//! Locating the target web app and reading its version.

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the project root.
pub const WORKSPACE_ENV: &str = "LINT_PATCHER_WORKSPACE";

/// Version assumed when package.json has none.
pub const FALLBACK_VERSION: &str = "0.0.0";

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("workspace path {path} is not usable: {source}")]
    InvalidPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not find a package.json in {start} or any parent directory")]
    NotFound { start: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} has no version field")]
    NoVersion { path: PathBuf },
}

/// How the workspace was found, for the startup banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Flag,
    Environment,
    AutoDetected,
}

/// Resolve the workspace root.
///
/// Priority order:
/// 1. Explicit `--workspace` flag
/// 2. `LINT_PATCHER_WORKSPACE` environment variable (ignored if the path is gone)
/// 3. Nearest ancestor of the current directory containing package.json
pub fn resolve_workspace(
    cli_workspace: Option<PathBuf>,
) -> Result<(PathBuf, Detection), WorkspaceError> {
    if let Some(path) = cli_workspace {
        return canonical(path).map(|p| (p, Detection::Flag));
    }

    if let Some(env_path) = env::var_os(WORKSPACE_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return canonical(path).map(|p| (p, Detection::Environment));
        }
        tracing::warn!(
            "{WORKSPACE_ENV} is set but path doesn't exist: {}",
            path.display()
        );
    }

    let cwd = env::current_dir().map_err(|source| WorkspaceError::InvalidPath {
        path: PathBuf::from("."),
        source,
    })?;
    find_project_root(&cwd)
        .map(|p| (p, Detection::AutoDetected))
        .ok_or(WorkspaceError::NotFound { start: cwd })
}

fn canonical(path: PathBuf) -> Result<PathBuf, WorkspaceError> {
    path.canonicalize()
        .map_err(|source| WorkspaceError::InvalidPath { path, source })
}

/// Walk up from `start` looking for a directory holding package.json.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join("package.json").is_file())
        .map(Path::to_path_buf)
}

#[derive(Deserialize)]
struct PackageJson {
    #[serde(default)]
    version: Option<String>,
}

/// Read the `version` field of `<workspace>/package.json`.
pub fn read_project_version(workspace: &Path) -> Result<String, WorkspaceError> {
    let path = workspace.join("package.json");
    let contents = fs::read_to_string(&path).map_err(|source| WorkspaceError::Io {
        path: path.clone(),
        source,
    })?;
    let package: PackageJson =
        serde_json::from_str(&contents).map_err(|source| WorkspaceError::Json {
            path: path.clone(),
            source,
        })?;
    package
        .version
        .filter(|v| !v.trim().is_empty())
        .ok_or(WorkspaceError::NoVersion { path })
}
