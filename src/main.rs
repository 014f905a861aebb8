use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use lint_patcher::config::{
    apply_patches, check_patches, discover_revisions, select_revision, ApplicationError, Mode,
    PatchOutcome, PatchResult, Revision,
};
use lint_patcher::lint::{apply_housekeeping, run_lint, FileAction, FileError};
use lint_patcher::safety::WorkspaceGuard;
use lint_patcher::workspace::{
    read_project_version, resolve_workspace, Detection, WorkspaceError, FALLBACK_VERSION,
    WORKSPACE_ENV,
};
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "lint-patcher")]
#[command(about = "Apply regex patch tables to a web app and re-run its linter", long_about = None)]
#[command(version)]
struct Cli {
    /// Log every substitution, write and removal
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Target {
    /// Path to the project root (auto-detected from package.json if not specified)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Specific revision file to use
    #[arg(short, long)]
    patches: Option<PathBuf>,

    /// Revision by file stem or meta name (defaults to the latest)
    #[arg(short, long, conflicts_with = "patches")]
    revision: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a revision's patches, config files and removals, then run the linter
    Apply {
        #[command(flatten)]
        target: Target,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Skip the lint step
        #[arg(long)]
        no_lint: bool,
    },

    /// Show what a revision would change without touching any file
    Status {
        #[command(flatten)]
        target: Target,

        /// Show unified diff of pending changes
        #[arg(short, long)]
        diff: bool,
    },

    /// List available revisions
    List {
        /// Path to the project root (auto-detected if not specified)
        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },

    /// Run only the lint step of a revision
    Lint {
        #[command(flatten)]
        target: Target,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Apply {
            target,
            diff,
            no_lint,
        } => cmd_apply(target, diff, no_lint),

        Commands::Status { target, diff } => cmd_status(target, diff),

        Commands::List { workspace } => cmd_list(workspace),

        Commands::Lint { target } => cmd_lint(target),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("lint_patcher=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Resolve the workspace, turning "not found" into remediation hints.
fn workspace_or_hint(cli_workspace: Option<PathBuf>) -> Result<PathBuf> {
    match resolve_workspace(cli_workspace) {
        Ok((path, detection)) => {
            if detection == Detection::AutoDetected {
                println!(
                    "{}",
                    format!("Auto-detected workspace: {}", path.display()).dimmed()
                );
            }
            Ok(path)
        }
        Err(WorkspaceError::NotFound { start }) => anyhow::bail!(
            "{}\n{}\n  {}\n  {}\n  {}",
            format!("Could not find a package.json above {}.", start.display()).red(),
            "Try one of:".bold(),
            "1. cd into the web app: cd /path/to/app && lint-patcher apply",
            "2. Specify explicitly: lint-patcher apply --workspace /path/to/app",
            format!("3. Set environment variable: export {WORKSPACE_ENV}=/path/to/app")
        ),
        Err(e) => Err(e.into()),
    }
}

fn project_version(workspace: &Path) -> String {
    read_project_version(workspace).unwrap_or_else(|e| {
        eprintln!(
            "{}",
            format!("Warning: {e}, using {FALLBACK_VERSION}").yellow()
        );
        FALLBACK_VERSION.to_string()
    })
}

fn load_revision(workspace: &Path, target: &Target) -> Result<Revision> {
    if let Some(path) = &target.patches {
        return Ok(Revision::from_path(path)?);
    }
    Ok(select_revision(
        discover_revisions(workspace)?,
        target.revision.as_deref(),
    )?)
}

/// Path as written in the patch table, when it lives under the workspace.
fn relative<'a>(workspace: &Path, path: &'a Path) -> std::borrow::Cow<'a, str> {
    path.strip_prefix(workspace)
        .unwrap_or(path)
        .to_string_lossy()
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &str, original: &str, modified: &str) {
    println!("\n{}", format!("--- {} (original)", file).dimmed());
    println!("{}", format!("+++ {} (patched)", file).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for (idx, group) in diff.grouped_ops(3).iter().enumerate() {
        if idx > 0 {
            println!("{}", "...".dimmed());
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Delete => format!("-{}", change).red(),
                    ChangeTag::Insert => format!("+{}", change).green(),
                    ChangeTag::Equal => format!(" {}", change).normal(),
                };
                print!("{}", sign);
            }
        }
    }
}

fn print_header(workspace: &Path, version: &str, revision: &Revision) {
    println!("Workspace: {}", workspace.display());
    println!("Version: {}", version);
    println!("Revision: {} ({})", revision.name, revision.source);
    if let Some(description) = &revision.config.meta.description {
        println!("  {}", description.dimmed());
    }
    println!();
}

#[derive(Default)]
struct Tally {
    fixed: usize,
    unchanged: usize,
    not_found: usize,
    skipped: usize,
    failed: usize,
}

fn report_patches(
    workspace: &Path,
    results: Vec<PatchOutcome>,
    show_diff: bool,
    mode: Mode,
) -> Tally {
    let mut tally = Tally::default();
    let fixed_label = match mode {
        Mode::Apply => "Fixed:",
        Mode::Check => "Would fix:",
    };

    for (patch_id, result) in results {
        match result {
            Ok(PatchResult::Fixed {
                file,
                matches,
                change,
            }) => {
                let rel = relative(workspace, &file);
                println!(
                    "{} {} {}",
                    fixed_label.green(),
                    rel,
                    format!("({matches} matches)").dimmed()
                );
                if show_diff {
                    display_diff(&rel, &change.before, &change.after);
                }
                tally.fixed += 1;
            }
            Ok(PatchResult::Unchanged { file }) => {
                tracing::debug!(patch = %patch_id, file = %file.display(), "unchanged");
                tally.unchanged += 1;
            }
            Ok(PatchResult::NotFound { file }) => {
                println!("{} {}", "File not found:".yellow(), relative(workspace, &file));
                tally.not_found += 1;
            }
            Ok(PatchResult::SkippedVersion { reason }) => {
                println!("{} {}: Skipped ({})", "⊘".cyan(), patch_id, reason);
                tally.skipped += 1;
            }
            Err(e) => {
                eprintln!("{} {}: Error - {}", "✗".red(), patch_id, e);
                if let ApplicationError::Safety { file, .. } = &e {
                    eprintln!("  File: {}", file.display());
                    eprintln!("  Action: keep patch targets inside the project sources");
                }
                tally.failed += 1;
            }
        }
    }

    tally
}

/// `" <note>"` for a config file whose table entry carries one.
fn config_note(revision: &Revision, rel: &str) -> String {
    revision
        .config
        .config_files
        .iter()
        .find(|file| Path::new(&file.path) == Path::new(rel))
        .and_then(|file| file.note.as_deref())
        .map(|note| format!(" {note}"))
        .unwrap_or_default()
}

fn report_housekeeping(
    workspace: &Path,
    revision: &Revision,
    actions: Vec<Result<FileAction, FileError>>,
    mode: Mode,
    tally: &mut Tally,
) {
    for action in actions {
        match (action, mode) {
            (Ok(FileAction::Written { path }), Mode::Apply) => {
                let rel = relative(workspace, &path);
                println!("{} {}{}", "Created".green(), rel, config_note(revision, &rel));
            }
            (Ok(FileAction::Written { path }), Mode::Check) => {
                println!("{} {}", "Would write".green(), relative(workspace, &path));
            }
            (Ok(FileAction::Removed { path }), Mode::Apply) => {
                println!("{} {}", "Removed".cyan(), relative(workspace, &path));
            }
            (Ok(FileAction::Removed { path }), Mode::Check) => {
                println!("{} {}", "Would remove".cyan(), relative(workspace, &path));
            }
            (Ok(FileAction::Absent { path }), _) => {
                tracing::debug!(path = %path.display(), "nothing to remove");
            }
            (Ok(FileAction::SkippedVersion { path, reason }), _) => {
                println!(
                    "{} {}: Skipped ({})",
                    "⊘".cyan(),
                    relative(workspace, &path),
                    reason
                );
                tally.skipped += 1;
            }
            (Err(e), _) => {
                eprintln!("{} {}", "✗".red(), e);
                tally.failed += 1;
            }
        }
    }
}

fn print_summary(tally: &Tally) {
    println!();
    println!("{}", "Summary:".bold());
    println!("  {} fixed", format!("{}", tally.fixed).green());
    println!("  {} unchanged", tally.unchanged);
    println!("  {} not found", format!("{}", tally.not_found).yellow());
    println!("  {} skipped", format!("{}", tally.skipped).cyan());
    println!("  {} failed", format!("{}", tally.failed).red());
}

/// Run the lint step and echo its output verbatim. Exit status is ignored.
fn lint_step(workspace: &Path, revision: &Revision) {
    let lint = revision.config.lint_or_default();
    println!("\n{}", lint.banner());

    match run_lint(workspace, &lint) {
        Ok(output) => {
            println!("{}", output.stdout);
            println!("{}", output.stderr);
        }
        Err(e) => {
            eprintln!("{}", format!("Warning: {e}").yellow());
        }
    }
}

fn cmd_apply(target: Target, show_diff: bool, no_lint: bool) -> Result<()> {
    let workspace = workspace_or_hint(target.workspace.clone())?;
    let revision = load_revision(&workspace, &target)?;
    let version = project_version(&workspace);
    let guard = WorkspaceGuard::new(&workspace)?;

    print_header(&workspace, &version, &revision);

    let results = apply_patches(&revision.config, &guard, &version);
    let mut tally = report_patches(&workspace, results, show_diff, Mode::Apply);

    let actions = apply_housekeeping(&revision.config, &guard, &version, Mode::Apply);
    report_housekeeping(&workspace, &revision, actions, Mode::Apply, &mut tally);

    print_summary(&tally);

    if !no_lint {
        lint_step(&workspace, &revision);
    }

    if tally.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_status(target: Target, show_diff: bool) -> Result<()> {
    let workspace = workspace_or_hint(target.workspace.clone())?;
    let revision = load_revision(&workspace, &target)?;
    let version = project_version(&workspace);
    let guard = WorkspaceGuard::new(&workspace)?;

    println!("{}", "Revision Status Report".bold());
    print_header(&workspace, &version, &revision);

    let results = check_patches(&revision.config, &guard, &version);
    let mut tally = report_patches(&workspace, results, show_diff, Mode::Check);

    let actions = apply_housekeeping(&revision.config, &guard, &version, Mode::Check);
    report_housekeeping(&workspace, &revision, actions, Mode::Check, &mut tally);

    print_summary(&tally);

    if tally.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_list(workspace: Option<PathBuf>) -> Result<()> {
    let root = match workspace {
        Some(path) => path,
        None => resolve_workspace(None)
            .map(|(path, _)| path)
            .or_else(|_| std::env::current_dir())?,
    };

    let revisions = discover_revisions(&root)?;
    let latest = revisions.last().map(|r| r.name.clone());

    for revision in &revisions {
        let config = &revision.config;
        let marker = if Some(&revision.name) == latest.as_ref() {
            " (latest)".green().to_string()
        } else {
            String::new()
        };
        println!("{}{}", revision.name.bold(), marker);
        if !config.meta.name.is_empty() {
            println!("  name: {}", config.meta.name);
        }
        if let Some(description) = &config.meta.description {
            println!("  {}", description.dimmed());
        }
        println!(
            "  {} patches, {} config files, {} removals",
            config.patches.len(),
            config.config_files.len(),
            config.cleanup.remove.len()
        );
        if let Some(range) = &config.meta.version_range {
            println!("  version_range: {}", range);
        }
        match &config.lint {
            Some(lint) => println!("  lint: {}", lint),
            None => println!("  lint: {} (default)", config.lint_or_default()),
        }
        println!("  source: {}", revision.source);
        println!();
    }

    Ok(())
}

fn cmd_lint(target: Target) -> Result<()> {
    let workspace = workspace_or_hint(target.workspace.clone())?;
    let revision = load_revision(&workspace, &target)?;

    lint_step(&workspace, &revision);

    Ok(())
}
