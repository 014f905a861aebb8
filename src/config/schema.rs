use crate::cache;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path};

/// Command used when a revision does not configure one.
pub const DEFAULT_LINT_COMMAND: &[&str] = &["npm", "run", "lint"];

const DEFAULT_LINT_BANNER: &str = "Running ESLint to check remaining issues...";

/// One patch table revision.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct PatchConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub patches: Vec<PatchDefinition>,
    #[serde(default)]
    pub config_files: Vec<ConfigFile>,
    #[serde(default)]
    pub cleanup: Cleanup,
    #[serde(default)]
    pub lint: Option<LintCommand>,
}

impl PatchConfig {
    /// Whether applying this revision does anything at all.
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
            && self.config_files.is_empty()
            && self.cleanup.remove.is_empty()
            && self.lint.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.is_empty() {
            issues.push(ValidationIssue::EmptyRevision);
        }

        let mut seen_ids = HashSet::new();
        for patch in &self.patches {
            if patch.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: None,
                    field: "id",
                });
            } else if !seen_ids.insert(patch.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId(patch.id.clone()));
            }

            if patch.file.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: Some(patch.id.clone()),
                    field: "file",
                });
            } else if let Err(message) = check_relative(&patch.file) {
                issues.push(ValidationIssue::InvalidPath {
                    path: patch.file.clone(),
                    message,
                });
            }

            if patch.fixes.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: Some(patch.id.clone()),
                    field: "fixes",
                });
            }

            for fix in &patch.fixes {
                if fix.pattern.is_empty() {
                    issues.push(ValidationIssue::MissingField {
                        patch_id: Some(patch.id.clone()),
                        field: "fixes.pattern",
                    });
                    continue;
                }
                if let Err(e) = cache::get_or_compile(&fix.pattern) {
                    issues.push(ValidationIssue::InvalidPattern {
                        patch_id: patch.id.clone(),
                        pattern: fix.pattern.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        for file in &self.config_files {
            if file.path.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: None,
                    field: "config_files.path",
                });
            } else if let Err(message) = check_relative(&file.path) {
                issues.push(ValidationIssue::InvalidPath {
                    path: file.path.clone(),
                    message,
                });
            }
        }

        for path in &self.cleanup.remove {
            if path.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: None,
                    field: "cleanup.remove",
                });
            } else if let Err(message) = check_relative(path) {
                issues.push(ValidationIssue::InvalidPath {
                    path: path.clone(),
                    message,
                });
            }
        }

        if let Some(lint) = &self.lint {
            if lint.command.first().map_or(true, |p| p.trim().is_empty()) {
                issues.push(ValidationIssue::MissingField {
                    patch_id: None,
                    field: "lint.command",
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Lint step of this revision, falling back to the default command.
    pub fn lint_or_default(&self) -> LintCommand {
        self.lint.clone().unwrap_or_default()
    }
}

fn check_relative(path: &str) -> Result<(), String> {
    let path = Path::new(path);
    if path.is_absolute() {
        return Err("path must be relative to the workspace".to_string());
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err("path must not contain '..'".to_string());
    }
    Ok(())
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Semver requirement checked against the project's package.json version
    #[serde(default)]
    pub version_range: Option<String>,
}

/// All substitutions for one target file.
#[derive(Debug, Deserialize, Clone)]
pub struct PatchDefinition {
    pub id: String,
    pub file: String,
    #[serde(default)]
    pub fixes: Vec<Fix>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Fix {
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
    /// Insert `replacement` verbatim instead of expanding `${n}` references
    #[serde(default)]
    pub literal: bool,
    #[serde(default)]
    pub description: Option<String>,
}

/// A linter config file written in full.
#[derive(Debug, Deserialize, Clone)]
pub struct ConfigFile {
    pub path: String,
    #[serde(default)]
    pub contents: String,
    /// Trailing words for the `Created <path>` line, e.g. "with ignores"
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Cleanup {
    /// Legacy files to delete if present
    #[serde(default)]
    pub remove: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LintCommand {
    #[serde(default = "default_lint_command")]
    pub command: Vec<String>,
    #[serde(default)]
    pub banner: Option<String>,
}

impl LintCommand {
    pub fn program(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or("")
    }

    pub fn args(&self) -> &[String] {
        self.command.get(1..).unwrap_or(&[])
    }

    pub fn banner(&self) -> &str {
        self.banner.as_deref().unwrap_or(DEFAULT_LINT_BANNER)
    }
}

impl Default for LintCommand {
    fn default() -> Self {
        Self {
            command: default_lint_command(),
            banner: None,
        }
    }
}

impl fmt::Display for LintCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command.join(" "))
    }
}

fn default_lint_command() -> Vec<String> {
    DEFAULT_LINT_COMMAND.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyRevision,
    MissingField {
        patch_id: Option<String>,
        field: &'static str,
    },
    DuplicateId(String),
    InvalidPattern {
        patch_id: String,
        pattern: String,
        message: String,
    },
    InvalidPath {
        path: String,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRevision => {
                write!(f, "revision contains no patches, config files, removals or lint step")
            }
            ValidationIssue::MissingField { patch_id, field } => match patch_id {
                Some(id) => write!(f, "patch '{id}' missing required field '{field}'"),
                None => write!(f, "missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId(id) => write!(f, "duplicate patch id '{id}'"),
            ValidationIssue::InvalidPattern {
                patch_id,
                pattern,
                message,
            } => write!(
                f,
                "patch '{patch_id}' has invalid pattern `{pattern}`: {message}"
            ),
            ValidationIssue::InvalidPath { path, message } => {
                write!(f, "invalid path '{path}': {message}")
            }
        }
    }
}
