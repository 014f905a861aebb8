//! Loading patch revisions from TOML, from disk or from the built-in set.

use crate::config::schema::{PatchConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Revisions compiled into the binary, in application order.
const BUILTIN_REVISIONS: &[(&str, &str)] = &[
    ("01-initial", include_str!("../../patches/01-initial.toml")),
    ("02-followup", include_str!("../../patches/02-followup.toml")),
    ("03-final", include_str!("../../patches/03-final.toml")),
];

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        origin: Option<String>,
        source: toml_edit::de::Error,
    },
    Validation {
        origin: Option<String>,
        source: ValidationError,
    },
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
    UnknownRevision {
        name: String,
        available: Vec<String>,
    },
}

impl ConfigError {
    fn with_origin(self, origin: impl Into<String>) -> Self {
        match self {
            ConfigError::Toml {
                origin: None,
                source,
            } => ConfigError::Toml {
                origin: Some(origin.into()),
                source,
            },
            ConfigError::Validation {
                origin: None,
                source,
            } => ConfigError::Validation {
                origin: Some(origin.into()),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read patch revision from {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Toml { origin, source } => match origin {
                Some(origin) => write!(f, "failed to parse patch revision ({origin}): {source}"),
                None => write!(f, "failed to parse patch revision: {source}"),
            },
            ConfigError::Validation { origin, source } => match origin {
                Some(origin) => write!(f, "invalid patch revision ({origin}):\n{source}"),
                None => write!(f, "invalid patch revision:\n{source}"),
            },
            ConfigError::Walk { path, source } => {
                write!(f, "failed to scan {}: {}", path.display(), source)
            }
            ConfigError::UnknownRevision { name, available } => write!(
                f,
                "no revision named '{}' (available: {})",
                name,
                available.join(", ")
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
            ConfigError::Walk { source, .. } => Some(source),
            ConfigError::UnknownRevision { .. } => None,
        }
    }
}

pub fn load_from_str(input: &str) -> Result<PatchConfig, ConfigError> {
    let config: PatchConfig = toml_edit::de::from_str(input).map_err(|source| {
        ConfigError::Toml {
            origin: None,
            source,
        }
    })?;
    config.validate().map_err(|source| ConfigError::Validation {
        origin: None,
        source,
    })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PatchConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_origin(path.display().to_string()))
}

/// Where a revision was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionSource {
    File(PathBuf),
    Builtin,
}

impl fmt::Display for RevisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevisionSource::File(path) => write!(f, "{}", path.display()),
            RevisionSource::Builtin => write!(f, "built-in"),
        }
    }
}

/// A loaded patch table together with its identity.
#[derive(Debug, Clone)]
pub struct Revision {
    /// File stem (`03-final`) used for ordering and `--revision`
    pub name: String,
    pub source: RevisionSource,
    pub config: PatchConfig,
}

impl Revision {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            name,
            source: RevisionSource::File(path.to_path_buf()),
            config: load_from_path(path)?,
        })
    }

    /// Whether `query` names this revision by file stem or `meta.name`.
    pub fn is_named(&self, query: &str) -> bool {
        self.name == query || (!self.config.meta.name.is_empty() && self.config.meta.name == query)
    }
}

/// Revisions embedded in the binary.
pub fn builtin_revisions() -> Result<Vec<Revision>, ConfigError> {
    BUILTIN_REVISIONS
        .iter()
        .map(|(name, source)| {
            Ok(Revision {
                name: name.to_string(),
                source: RevisionSource::Builtin,
                config: load_from_str(source).map_err(|e| e.with_origin(*name))?,
            })
        })
        .collect()
}

/// Discover revisions, sorted by file name.
///
/// Looks in `<workspace>/patches`, then `./patches`; the first directory with
/// at least one `.toml` file wins. Falls back to the built-in revisions.
pub fn discover_revisions(workspace: &Path) -> Result<Vec<Revision>, ConfigError> {
    let cwd_patches = std::env::current_dir().ok().map(|cwd| cwd.join("patches"));
    let candidates = std::iter::once(workspace.join("patches")).chain(cwd_patches);

    for dir in candidates {
        if !dir.is_dir() {
            continue;
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).max_depth(1) {
            let entry = entry.map_err(|source| ConfigError::Walk {
                path: dir.clone(),
                source,
            })?;
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
            {
                files.push(entry.into_path());
            }
        }
        files.sort();

        if !files.is_empty() {
            return files.iter().map(Revision::from_path).collect();
        }
    }

    builtin_revisions()
}

/// Pick one revision: by name if given, otherwise the latest.
pub fn select_revision(
    mut revisions: Vec<Revision>,
    name: Option<&str>,
) -> Result<Revision, ConfigError> {
    match name {
        Some(query) => match revisions.iter().position(|r| r.is_named(query)) {
            Some(idx) => Ok(revisions.swap_remove(idx)),
            None => Err(ConfigError::UnknownRevision {
                name: query.to_string(),
                available: revisions.into_iter().map(|r| r.name).collect(),
            }),
        },
        None => revisions.pop().ok_or_else(|| ConfigError::UnknownRevision {
            name: "latest".to_string(),
            available: Vec::new(),
        }),
    }
}
