use crate::cache;
use regex::{NoExpand, Regex};
use std::borrow::Cow;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// One `(regex, replacement)` pair from a patch table.
///
/// Replacements use `${1}` / `${name}` group references unless the
/// substitution is literal, in which case the text is inserted verbatim.
#[derive(Debug, Clone)]
pub struct Substitution {
    regex: Regex,
    replacement: String,
    literal: bool,
}

impl Substitution {
    /// Compile a substitution whose replacement may reference capture groups.
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self, RewriteError> {
        let regex = cache::get_or_compile(pattern).map_err(|source| {
            RewriteError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        Ok(Self {
            regex,
            replacement: replacement.into(),
            literal: false,
        })
    }

    /// Compile a substitution whose replacement is inserted verbatim.
    pub fn literal(pattern: &str, replacement: impl Into<String>) -> Result<Self, RewriteError> {
        let mut sub = Self::new(pattern, replacement)?;
        sub.literal = true;
        Ok(sub)
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Replace every non-overlapping match in `text`.
    ///
    /// Returns the borrowed input untouched when nothing matched.
    pub fn apply<'t>(&self, text: &'t str) -> (Cow<'t, str>, usize) {
        let matches = self.regex.find_iter(text).count();
        if matches == 0 {
            return (Cow::Borrowed(text), 0);
        }

        let replaced = if self.literal {
            self.regex.replace_all(text, NoExpand(&self.replacement))
        } else {
            self.regex.replace_all(text, self.replacement.as_str())
        };
        (replaced, matches)
    }
}

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What a rewrite would do to its file, computed without touching disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Target file does not exist
    Missing,
    /// File was read and every substitution run against it
    Computed {
        original: String,
        patched: String,
        matches: usize,
    },
}

impl Outcome {
    pub fn changed(&self) -> bool {
        match self {
            Outcome::Missing => false,
            Outcome::Computed {
                original, patched, ..
            } => original != patched,
        }
    }
}

/// Result of applying a rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "RewriteResult should be checked to report what happened"]
pub enum RewriteResult {
    /// Content changed and was written back
    Fixed { file: PathBuf, matches: usize },
    /// No substitution changed the content; file left byte-identical
    Unchanged { file: PathBuf },
    /// Target file does not exist; nothing written
    NotFound { file: PathBuf },
}

/// Ordered substitutions against a single file.
///
/// Every substitution runs against the whole text produced by the previous
/// one. The file is persisted only if the final text differs.
#[derive(Debug, Clone)]
#[must_use = "Rewrite does nothing until apply() is called"]
pub struct Rewrite {
    pub file: PathBuf,
    pub substitutions: Vec<Substitution>,
}

impl Rewrite {
    pub fn new(file: impl Into<PathBuf>, substitutions: Vec<Substitution>) -> Self {
        Self {
            file: file.into(),
            substitutions,
        }
    }

    /// Run every substitution in order. Returns the new text and total matches.
    pub fn apply_to_str(&self, text: &str) -> (String, usize) {
        let mut current = text.to_string();
        let mut total = 0;

        for sub in &self.substitutions {
            let (next, matches) = sub.apply(&current);
            debug!(
                file = %self.file.display(),
                pattern = sub.pattern(),
                matches,
                "substitution"
            );
            if let Cow::Owned(next) = next {
                current = next;
            }
            total += matches;
        }

        (current, total)
    }

    /// Read the file and compute the patched text without writing.
    pub fn compute(&self) -> Result<Outcome, RewriteError> {
        if !self.file.exists() {
            return Ok(Outcome::Missing);
        }

        let original = fs::read_to_string(&self.file).map_err(|source| RewriteError::Io {
            path: self.file.clone(),
            source,
        })?;
        let (patched, matches) = self.apply_to_str(&original);

        Ok(Outcome::Computed {
            original,
            patched,
            matches,
        })
    }

    /// Apply the substitutions and persist the result if it changed.
    pub fn apply(&self) -> Result<RewriteResult, RewriteError> {
        self.commit(self.compute()?)
    }

    /// Persist a previously computed outcome.
    pub fn commit(&self, outcome: Outcome) -> Result<RewriteResult, RewriteError> {
        match outcome {
            Outcome::Missing => Ok(RewriteResult::NotFound {
                file: self.file.clone(),
            }),
            Outcome::Computed {
                original,
                patched,
                matches,
            } => {
                if original == patched {
                    return Ok(RewriteResult::Unchanged {
                        file: self.file.clone(),
                    });
                }

                atomic_write(&self.file, patched.as_bytes()).map_err(|source| {
                    RewriteError::Io {
                        path: self.file.clone(),
                        source,
                    }
                })?;
                debug!(file = %self.file.display(), matches, "wrote patched file");

                Ok(RewriteResult::Fixed {
                    file: self.file.clone(),
                    matches,
                })
            }
        }
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Permissions of an existing target are carried over to the replacement.
pub fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        Some(_) => Path::new("."),
        None => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Path has no parent directory",
            ))
        }
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())?;
    }

    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
