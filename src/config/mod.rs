pub mod applicator;
pub mod loader;
pub mod schema;
pub mod version;

pub use applicator::{
    apply_patches, check_patches, ApplicationError, Mode, PatchOutcome, PatchResult, TextChange,
};
pub use loader::{
    builtin_revisions, discover_revisions, load_from_path, load_from_str, select_revision,
    ConfigError, Revision, RevisionSource,
};
pub use schema::{
    Cleanup, ConfigFile, Fix, LintCommand, Metadata, PatchConfig, PatchDefinition,
    ValidationError, ValidationIssue, DEFAULT_LINT_COMMAND,
};
pub use version::{matches_requirement, VersionError};
