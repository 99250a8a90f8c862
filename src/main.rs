//! Sumi-Archive main entry point
//!
//! This is the command-line interface for the Sumi-Archive workspace archiver.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use sumi_archive::config::{load_config_with_hash, resolve_token, validate, Config, TabularMode};
use sumi_archive::crawler::archive;
use sumi_archive::output::print_report;
use tracing_subscriber::EnvFilter;

/// Sumi-Archive: a workspace archiver
///
/// Sumi-Archive walks a remote workspace (spaces, folders, task lists and
/// documents) and mirrors it into a local directory tree: task lists become
/// CSV files and document pages become markdown files.
#[derive(Parser, Debug)]
#[command(name = "sumi-archive")]
#[command(version)]
#[command(about = "Archives a remote workspace into markdown and CSV files", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the workspace (root) id
    #[arg(long, value_name = "ID")]
    root: Option<String>,

    /// Archive only this space of the workspace
    #[arg(long, value_name = "ID")]
    scope: Option<String>,

    /// Override the output directory
    #[arg(long, value_name = "DIR")]
    output: Option<String>,

    /// Skip documents and pages
    #[arg(long, conflicts_with = "no_tasks")]
    no_docs: bool,

    /// Skip task lists
    #[arg(long, conflicts_with = "no_docs")]
    no_tasks: bool,

    /// Write each task list in one pass with a fixed header
    #[arg(long)]
    batch: bool,

    /// Validate config and show what would be archived without contacting the remote
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli);
    validate(&config).context("invalid configuration after command-line overrides")?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_archive(&config, &config_hash, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_archive=info,warn"),
            1 => EnvFilter::new("sumi_archive=debug,info"),
            2 => EnvFilter::new("sumi_archive=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Replaces configuration values with the ones given on the command line
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(root) = &cli.root {
        config.workspace.root_id = root.clone();
    }
    if let Some(scope) = &cli.scope {
        config.workspace.scope_id = Some(scope.clone());
    }
    if let Some(output) = &cli.output {
        config.export.output_dir = output.clone();
    }
    if cli.no_docs {
        config.export.include_docs = false;
    }
    if cli.no_tasks {
        config.export.include_tasks = false;
    }
    if cli.batch {
        config.export.tabular_mode = TabularMode::Batch;
    }
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Archive Dry Run ===\n");

    println!("Workspace:");
    println!("  Root id: {}", config.workspace.root_id);
    match &config.workspace.scope_id {
        Some(scope) => println!("  Scope: space {}", scope),
        None => println!("  Scope: every space"),
    }

    println!("\nAPI:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  Request delay: {}ms", config.api.request_delay_ms);
    println!("  Timeout: {}s", config.api.timeout_secs);
    let token_source = if config.api.token.is_some() {
        "config file".to_string()
    } else {
        format!("${}", config.api.token_env)
    };
    println!("  Token from: {}", token_source);

    println!("\nExport:");
    println!("  Output directory: {}", config.export.output_dir);
    println!("  Documents: {}", yes_no(config.export.include_docs));
    println!("  Task lists: {}", yes_no(config.export.include_tasks));
    println!("  Tabular mode: {:?}", config.export.tabular_mode);

    println!("\n✓ Configuration is valid");
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Handles the main archive operation
async fn handle_archive(config: &Config, config_hash: &str, quiet: bool) -> anyhow::Result<()> {
    let token = resolve_token(&config.api).context("cannot authenticate")?;

    tracing::info!(
        "Archiving workspace {} (docs: {}, tasks: {})",
        config.workspace.root_id,
        yes_no(config.export.include_docs),
        yes_no(config.export.include_tasks)
    );

    let report = archive(config, &token, Some(config_hash))
        .await
        .context("archive run failed")?;

    if !quiet {
        print_report(&report);
    }

    let failed = report.failures().count();
    if failed > 0 {
        bail!(
            "{} of {} space(s) could not be archived",
            failed,
            report.subtrees.len()
        );
    }

    tracing::info!("Archive completed successfully");
    Ok(())
}
