//! Patch applicator - walks a revision's table in order
//!
//! For every patch definition this module:
//! - Resolves the target path and checks it against the workspace guard
//! - Runs the file's substitutions in order against its whole text
//! - Writes the file back only if the text changed
//! - Reports one result per definition, in table order

use crate::config::schema::{Fix, PatchConfig, PatchDefinition};
use crate::config::version::{skip_reason, VersionError};
use crate::rewrite::{Outcome, Rewrite, RewriteError, RewriteResult, Substitution};
use crate::safety::{SafetyError, WorkspaceGuard};
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// Whether to persist changes or only report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Apply,
    Check,
}

/// Text of a file before and after its substitutions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    pub before: String,
    pub after: String,
}

/// Result of one patch definition
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchResult should be reported"]
pub enum PatchResult {
    /// Substitutions changed the file (written in `Mode::Apply`)
    Fixed {
        file: PathBuf,
        matches: usize,
        change: TextChange,
    },
    /// Nothing matched, or matches produced identical text
    Unchanged { file: PathBuf },
    /// Target file does not exist; skipped
    NotFound { file: PathBuf },
    /// Revision's version_range excludes the project version
    SkippedVersion { reason: String },
}

impl fmt::Display for PatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchResult::Fixed { file, .. } => write!(f, "Fixed: {}", file.display()),
            PatchResult::Unchanged { file } => write!(f, "Unchanged: {}", file.display()),
            PatchResult::NotFound { file } => write!(f, "File not found: {}", file.display()),
            PatchResult::SkippedVersion { reason } => write!(f, "Skipped (version): {}", reason),
        }
    }
}

/// Errors during patch application
#[derive(Debug)]
pub enum ApplicationError {
    Version(VersionError),
    /// Target resolved outside the workspace or into a forbidden directory
    Safety { file: PathBuf, source: SafetyError },
    Rewrite(RewriteError),
    /// A change computed for the file did not end up as a write
    Diverged { file: PathBuf, result: RewriteResult },
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::Version(e) => write!(f, "version error: {}", e),
            ApplicationError::Safety { file, source } => {
                write!(f, "refusing to modify {}: {}", file.display(), source)
            }
            ApplicationError::Rewrite(e) => write!(f, "rewrite error: {}", e),
            ApplicationError::Diverged { file, result } => write!(
                f,
                "expected to write {} but the rewrite reported {:?}",
                file.display(),
                result
            ),
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Version(e) => Some(e),
            ApplicationError::Safety { source, .. } => Some(source),
            ApplicationError::Rewrite(e) => Some(e),
            ApplicationError::Diverged { .. } => None,
        }
    }
}

impl From<VersionError> for ApplicationError {
    fn from(e: VersionError) -> Self {
        ApplicationError::Version(e)
    }
}

impl From<RewriteError> for ApplicationError {
    fn from(e: RewriteError) -> Self {
        ApplicationError::Rewrite(e)
    }
}

pub type PatchOutcome = (String, Result<PatchResult, ApplicationError>);

/// Apply every patch definition of a revision, in order.
///
/// Returns one result per definition. A missing target is a `NotFound`
/// result, not an error.
pub fn apply_patches(
    config: &PatchConfig,
    guard: &WorkspaceGuard,
    project_version: &str,
) -> Vec<PatchOutcome> {
    run_patches(config, guard, project_version, Mode::Apply)
}

/// Same as [`apply_patches`] but never writes; `Fixed` means "would fix".
pub fn check_patches(
    config: &PatchConfig,
    guard: &WorkspaceGuard,
    project_version: &str,
) -> Vec<PatchOutcome> {
    run_patches(config, guard, project_version, Mode::Check)
}

fn run_patches(
    config: &PatchConfig,
    guard: &WorkspaceGuard,
    project_version: &str,
    mode: Mode,
) -> Vec<PatchOutcome> {
    match skip_reason(&config.meta, project_version) {
        Ok(None) => config
            .patches
            .iter()
            .map(|patch| {
                (patch.id.clone(), run_patch(patch, guard, mode))
            })
            .collect(),
        Ok(Some(reason)) => config
            .patches
            .iter()
            .map(|patch| {
                (
                    patch.id.clone(),
                    Ok(PatchResult::SkippedVersion {
                        reason: reason.clone(),
                    }),
                )
            })
            .collect(),
        Err(e) => config
            .patches
            .iter()
            .map(|patch| (patch.id.clone(), Err(ApplicationError::Version(e.clone()))))
            .collect(),
    }
}

fn build_rewrite(file: PathBuf, fixes: &[Fix]) -> Result<Rewrite, RewriteError> {
    let substitutions = fixes
        .iter()
        .map(|fix| {
            if fix.literal {
                Substitution::literal(&fix.pattern, fix.replacement.as_str())
            } else {
                Substitution::new(&fix.pattern, fix.replacement.as_str())
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Rewrite::new(file, substitutions))
}

fn run_patch(
    patch: &PatchDefinition,
    guard: &WorkspaceGuard,
    mode: Mode,
) -> Result<PatchResult, ApplicationError> {
    let file = guard.workspace_root().join(&patch.file);
    let rewrite = build_rewrite(file.clone(), &patch.fixes)?;

    let outcome = rewrite.compute()?;
    let (before, after, matches) = match &outcome {
        Outcome::Missing => {
            debug!(patch = %patch.id, file = %file.display(), "target missing");
            return Ok(PatchResult::NotFound { file });
        }
        Outcome::Computed { .. } if !outcome.changed() => {
            return Ok(PatchResult::Unchanged { file });
        }
        Outcome::Computed {
            original,
            patched,
            matches,
        } => (original.clone(), patched.clone(), *matches),
    };

    guard
        .validate_path(&file)
        .map_err(|source| ApplicationError::Safety {
            file: file.clone(),
            source,
        })?;

    if mode == Mode::Apply {
        commit_change(&rewrite, outcome)?;
    }

    Ok(PatchResult::Fixed {
        file,
        matches,
        change: TextChange { before, after },
    })
}

/// Persist a computed change; anything other than a write is an error.
fn commit_change(rewrite: &Rewrite, outcome: Outcome) -> Result<(), ApplicationError> {
    match rewrite.commit(outcome)? {
        RewriteResult::Fixed { .. } => Ok(()),
        result => Err(ApplicationError::Diverged {
            file: rewrite.file.clone(),
            result,
        }),
    }
}
