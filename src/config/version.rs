//! Version gating for revisions.
//!
//! A revision may carry a `version_range` like ">=0.1.0, <0.2.0"; it is
//! checked against the `version` field of the target project's package.json.

use crate::config::schema::Metadata;
use semver::{Version, VersionReq};
use std::fmt;

#[derive(Debug, Clone)]
pub enum VersionError {
    /// Project version is not valid semver (e.g. "latest")
    InvalidVersion { value: String, source: String },
    /// Revision's version_range does not parse (e.g. ">=bad")
    InvalidRequirement { value: String, source: String },
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::InvalidVersion { value, source } => {
                write!(f, "invalid project version '{}': {}", value, source)
            }
            VersionError::InvalidRequirement { value, source } => {
                write!(f, "invalid version_range '{}': {}", value, source)
            }
        }
    }
}

impl std::error::Error for VersionError {}

/// Check if a version matches a requirement string.
///
/// ```
/// use lint_patcher::config::version::matches_requirement;
///
/// assert!(matches_requirement("0.1.0", Some(">=0.1.0, <0.2.0")).unwrap());
/// assert!(!matches_requirement("0.2.3", Some("^0.1")).unwrap());
/// assert!(matches_requirement("1.0.0", None).unwrap());
/// ```
pub fn matches_requirement(
    version: &str,
    requirement: Option<&str>,
) -> Result<bool, VersionError> {
    let req_str = match requirement.map(str::trim) {
        None | Some("") => return Ok(true),
        Some(r) => r,
    };

    let req = VersionReq::parse(req_str).map_err(|e| VersionError::InvalidRequirement {
        value: req_str.to_string(),
        source: e.to_string(),
    })?;

    let version = Version::parse(version.trim()).map_err(|e| VersionError::InvalidVersion {
        value: version.to_string(),
        source: e.to_string(),
    })?;

    Ok(req.matches(&version))
}

/// Why a revision is skipped for a project version, or `None` if it applies.
pub fn skip_reason(meta: &Metadata, project_version: &str) -> Result<Option<String>, VersionError> {
    if matches_requirement(project_version, meta.version_range.as_deref())? {
        return Ok(None);
    }
    let req = meta.version_range.as_deref().unwrap_or("").trim();
    Ok(Some(format!(
        "project version {project_version} does not satisfy version_range {req}"
    )))
}
