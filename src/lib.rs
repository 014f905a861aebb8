//! Lint Patcher: regex patch tables for silencing a web app's linter
//!
//! A revision is a TOML table listing target files and the ordered
//! `(regex, replacement)` pairs to run against each, plus linter config files
//! to write, legacy files to delete and the lint command to run afterwards.
//!
//! # Architecture
//!
//! Every file edit compiles down to a single primitive: [`Rewrite`], an
//! ordered list of [`Substitution`]s applied to the whole text of one file
//! with multi-line and dot-all matching. The file is written back only when
//! the text changed.
//!
//! # Safety
//!
//! - Files with no matching pattern stay byte-identical
//! - Atomic file writes (tempfile + fsync + rename)
//! - Workspace boundary enforcement (`node_modules`, `.git`, `.next` refused)
//! - Missing targets are reported and skipped, never created
//!
//! # Example
//!
//! ```no_run
//! use lint_patcher::{Rewrite, Substitution};
//!
//! let rewrite = Rewrite::new(
//!     "src/app/api/users/sync/route.ts",
//!     vec![Substitution::new(
//!         r"export async function POST\(request:",
//!         "export async function POST(_request:",
//!     )
//!     .unwrap()],
//! );
//!
//! match rewrite.apply() {
//!     Ok(result) => println!("{:?}", result),
//!     Err(e) => eprintln!("Rewrite failed: {}", e),
//! }
//! ```

pub mod cache;
pub mod config;
pub mod lint;
pub mod rewrite;
pub mod safety;
pub mod workspace;

// Re-exports
pub use config::{
    apply_patches, check_patches, discover_revisions, load_from_path, load_from_str,
    select_revision, ApplicationError, ConfigError, PatchConfig, PatchResult, Revision,
    VersionError,
};
pub use lint::{run_lint, FileAction, LintError, LintOutput};
pub use rewrite::{Rewrite, RewriteError, RewriteResult, Substitution};
pub use safety::{SafetyError, WorkspaceGuard};
