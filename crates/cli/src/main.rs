//! prconflict command-line tool.
//!
//! Augments a pull-request report with per-package component metadata and
//! cross-change conflicts, lists the conflicts of an augmented report, and
//! generates / validates configuration files.

mod conflicts;
mod logging;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use prconflict_core::config::AppConfig;
use prconflict_core::project::UNKNOWN_PACKAGE;
use prconflict_core::{
    report, Aggregator, ColorAllocator, GitMaterializer, MetadataBuilder, NoopMaterializer,
    PackageResolver, RuleClassifier, RunSummary,
};

const DEFAULT_CONFIG_PATH: &str = "prconflict.toml";

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// prconflict command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "prconflict",
    version,
    about = "Annotate pull requests with touched components and cross-PR conflicts"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Working tree to use instead of `project.repo_path`.
    #[arg(long, global = true)]
    repo: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add metadata and conflicts to a report.
    Augment {
        /// Report written by the collector.
        #[arg(short, long)]
        report: PathBuf,

        /// Where to write the augmented report (default: overwrite the input).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Classify against the working tree as it is, without git checkouts.
        #[arg(long)]
        no_checkout: bool,
    },

    /// List conflicting components of an augmented report.
    Conflicts {
        /// Augmented report.
        #[arg(short, long)]
        report: PathBuf,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./prconflict.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file and the project manifest.
    Validate,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config, source) = match load_config(cli.config.as_deref(), cli.repo.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", style::error(&format!("{:#}", e)));
            return ExitCode::FAILURE;
        }
    };

    let _guard = match logging::init(&config.logging) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("{}", style::error(&format!("failed to initialize logging: {:#}", e)));
            return ExitCode::FAILURE;
        }
    };

    match &source {
        Some(path) => info!(config = %path.display(), "configuration loaded"),
        None => info!("no configuration file, using defaults"),
    }

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::error(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    match cli.command {
        Commands::Augment {
            report,
            output,
            no_checkout,
        } => cmd_augment(&config, &report, output.as_deref(), no_checkout).await,
        Commands::Conflicts { report } => cmd_conflicts(&report),
        Commands::Init { output } => cmd_init(&output),
        Commands::Validate => {
            let path = cli
                .config
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
            cmd_validate(&path, cli.repo.as_deref())
        }
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

/// Load the configuration and return the file it came from.
///
/// Runs before logging is set up, so it reports through its return value.
/// A missing file at the default path means defaults; an explicitly given
/// path must exist.
fn load_config(path: Option<&Path>, repo: Option<&Path>) -> Result<(AppConfig, Option<PathBuf>)> {
    let source = match path {
        Some(p) => Some(p.to_path_buf()),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            Some(PathBuf::from(DEFAULT_CONFIG_PATH))
        }
        None => None,
    };
    let mut config = match &source {
        Some(p) => AppConfig::load_from_file(p).context("failed to load configuration file")?,
        None => AppConfig::default(),
    };
    if let Some(repo) = repo {
        config.project.repo_path = repo.to_path_buf();
    }
    Ok((config, source))
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_augment(
    config: &AppConfig,
    report_path: &Path,
    output: Option<&Path>,
    no_checkout: bool,
) -> Result<()> {
    config.validate().context("invalid configuration")?;
    let project = &config.project;
    let resolver = PackageResolver::from_manifest(project.manifest_path())
        .context("failed to load project manifest")?;
    let classifier = RuleClassifier::from_config(&config.classifier, &project.repo_path)
        .context("invalid classifier rules")?;
    let builder = MetadataBuilder::from_config(
        &resolver,
        &classifier,
        &config.metadata,
        &project.manifest_file_name(),
    );
    let mut colors = match &config.colors.palette {
        Some(palette) => ColorAllocator::new(palette.clone()).context("invalid color palette")?,
        None => ColorAllocator::default(),
    };
    let output = output.unwrap_or(report_path);
    info!(
        report = %report_path.display(),
        output = %output.display(),
        no_checkout,
        packages = resolver.directories().len(),
        "starting augmentation"
    );

    let summary = if no_checkout {
        Aggregator::new(&NoopMaterializer, builder)
            .run_file(report_path, output, &mut colors)
            .await
    } else {
        let git = GitMaterializer::from_config(project).context("failed to open working tree")?;
        Aggregator::new(&git, builder)
            .run_file(report_path, output, &mut colors)
            .await
    }
    .context("failed to augment report")?;

    print_summary(&summary, output);
    Ok(())
}

fn print_summary(summary: &RunSummary, output: &Path) {
    println!();
    println!("{}", style::header("Augmentation Summary"));
    println!();
    println!("  Open changes      : {}", summary.open_changes);
    println!("  Closed changes    : {}", summary.closed_changes);
    println!("  Files classified  : {}", summary.files.classified);
    println!("  Files skipped     : {}", summary.files.skipped.len());
    println!(
        "  Conflicting items : {}",
        summary.detection.conflicting_components
    );
    println!("  Conflict refs     : {}", summary.detection.conflict_refs);
    println!();

    if !summary.checkout_failures.is_empty() {
        let ids: Vec<String> = summary
            .checkout_failures
            .iter()
            .map(|id| format!("#{}", id))
            .collect();
        println!(
            "{}",
            style::warn(&format!(
                "Checkout failed, metadata left empty: {}",
                ids.join(", ")
            ))
        );
    }
    if !summary.missing_files.is_empty() {
        println!(
            "{}",
            style::warn(&format!(
                "{} change(s) had no file list",
                summary.missing_files.len()
            ))
        );
    }
    if !summary.files.failed.is_empty() {
        println!(
            "{}",
            style::warn(&format!(
                "{} file(s) could not be classified (see log)",
                summary.files.failed.len()
            ))
        );
    }
    if !summary.baseline_restored {
        println!(
            "{}",
            style::warn("Baseline was not restored; closed changes used the current tree")
        );
    }

    println!(
        "{}",
        style::success(&format!("Report written to {}", output.display()))
    );
}

fn cmd_conflicts(report_path: &Path) -> Result<()> {
    let report = report::load(report_path).context("failed to load report")?;
    conflicts::print(&report);
    Ok(())
}

fn cmd_init(output: &Path) -> Result<()> {
    let default_config = r##"# prconflict Configuration
# Every setting is optional; the values below are the defaults.

[project]
repo_path = "."
manifest = "sfdx-project.json"
baseline_ref = "main"
remote = "origin"

[metadata]
skip_patterns = []
include_deleted = false

[classifier]
require_existing = true

# Extra rules are tried before the built-in ones. Use exactly one of
# `suffix`, `bundle_dir` or `parent_dir` + `child_dir` + `suffix`.
# [[classifier.rules]]
# type = "ExternalServiceRegistration"
# suffix = ".externalServiceRegistration-meta.xml"

[colors]
# palette = ["#e6194B", "#3cb44b", "#ffe119"]

[logging]
level = "info"
# log_file = "prconflict.log"
"##;

    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, default_config).context("failed to write config file")?;

    println!(
        "{}",
        style::success(&format!(
            "Default configuration written to {}",
            output.display()
        ))
    );
    println!();
    println!("Next steps:");
    println!("  1. Point project.repo_path at a clone of your project");
    println!(
        "  2. Validate with: prconflict validate --config {}",
        output.display()
    );
    println!(
        "  3. Augment a report: prconflict --config {} augment --report prs.json",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &Path, repo: Option<&Path>) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config =
        AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    if let Some(repo) = repo {
        config.project.repo_path = repo.to_path_buf();
    }
    println!("  {}", style::success("TOML structure is valid"));

    match config.validate() {
        Ok(()) => println!("  {}", style::success("All fields are valid")),
        Err(e) => {
            println!("  {}", style::error(&format!("Validation error: {}", e)));
            anyhow::bail!("configuration validation failed");
        }
    }

    let manifest = config.project.manifest_path();
    let resolver = match PackageResolver::from_manifest(&manifest) {
        Ok(r) => {
            println!(
                "  {}",
                style::success(&format!(
                    "Project manifest lists {} package directories",
                    r.directories().len()
                ))
            );
            r
        }
        Err(e) => {
            println!("  {}", style::error(&format!("Manifest error: {}", e)));
            anyhow::bail!("project manifest is not usable");
        }
    };

    let classifier_rules =
        RuleClassifier::from_config(&config.classifier, &config.project.repo_path)
            .context("invalid classifier rules")?
            .rule_count();

    if let Err(e) = GitMaterializer::from_config(&config.project) {
        println!("  {}", style::warn(&format!("{} (use --no-checkout)", e)));
    } else {
        println!("  {}", style::success("Working tree is a git repository"));
    }

    println!();
    println!("{}", style::header("Packages"));
    for dir in resolver.directories() {
        println!(
            "  {:<30} {}",
            dir.package.as_deref().unwrap_or(UNKNOWN_PACKAGE),
            style::dim(&dir.path)
        );
    }

    println!();
    println!("{}", style::header("Configuration summary"));
    println!("  Repository    : {}", config.project.repo_path.display());
    println!("  Baseline ref  : {}", config.project.baseline_ref);
    println!("  Remote        : {}", config.project.remote);
    println!("  Skip patterns : {}", config.metadata.skip_patterns.len());
    println!(
        "  Classifier    : {} rules ({} configured)",
        classifier_rules,
        config.classifier.rules.len()
    );
    println!(
        "  Palette       : {}",
        config
            .colors
            .palette
            .as_ref()
            .map(|p| format!("{} custom colors", p.len()))
            .unwrap_or_else(|| "built-in".to_string())
    );
    println!();
    println!("Configuration is valid.");

    Ok(())
}
