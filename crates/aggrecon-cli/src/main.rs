use clap::{Parser, Subcommand};
use colored::Colorize;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use aggrecon_core::{ColumnStatus, ComparisonOptions, Config, Report, Severity, Side, SideConfig};
use aggrecon_catalog::{
    executor_from_config, resolver_from_config, BackendInfoResolver, QueryExecutor, TableIdentifier,
};
use aggrecon_engine::{ComparisonRun, RunSide};

/// aggrecon - aggregate-statistics reconciliation between two warehouse tables
#[derive(Parser)]
#[command(name = "aggrecon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, default_value = "aggrecon.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare aggregate statistics of the origin and target tables
    Check {
        /// Output file for the JSON report
        #[arg(short, long, default_value = "aggrecon-report.json")]
        output: PathBuf,

        /// Also output markdown report
        #[arg(short, long)]
        markdown: Option<PathBuf>,

        /// Wrap every column in a safe numeric cast
        #[arg(long)]
        attempt_cast: bool,

        /// Round metrics to DIGITS decimal places before comparing
        #[arg(long, value_name = "DIGITS", value_parser = clap::value_parser!(u32).range(0..=10))]
        round: Option<u32>,
    },

    /// Print the aggregate queries that would run, without executing them
    Queries {
        /// Wrap every column in a safe numeric cast
        #[arg(long)]
        attempt_cast: bool,

        /// Print queries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check catalog tokens and warehouse connections of both sides
    TestConnection,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Credentials referenced as ${VAR} may come from .env
    dotenvy::dotenv().ok();
    init_tracing(cli.verbose);

    let config = load_config(&cli.config, cli.verbose)?;

    match cli.command {
        Commands::Check { output, markdown, attempt_cast, round } => {
            let options = comparison_options(&config, attempt_cast, round);
            check_command(&config, options, &output, markdown.as_deref(), cli.verbose).await
        }
        Commands::Queries { attempt_cast, json } => {
            let options = comparison_options(&config, attempt_cast, None);
            queries_command(&config, options, json).await
        }
        Commands::TestConnection => test_connection_command(&config).await,
    }
}

/// Log to stderr at `warn` (or `info` with --verbose) unless RUST_LOG says otherwise
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: &Path, verbose: bool) -> Result<Config> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "Config file not found at {}. Create one with [origin] and [target] sections or pass --config.",
            path.display()
        ));
    }

    let config = Config::from_file(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    config.validate()?;

    if verbose {
        eprintln!("{} {}", "Loaded config from:".cyan(), path.display());
    }

    Ok(config)
}

/// `[comparison]` options with command-line overrides applied
fn comparison_options(config: &Config, attempt_cast: bool, round: Option<u32>) -> ComparisonOptions {
    let mut options = config.comparison;
    if attempt_cast {
        options.attempt_cast = true;
    }
    if let Some(digits) = round {
        options.round = true;
        options.round_digits = digits;
    }
    options
}

/// Collaborators built from one side's configuration
struct SideSetup {
    table_id: TableIdentifier,
    database_identifier: String,
    resolver: Box<dyn BackendInfoResolver>,
    executor: Box<dyn QueryExecutor>,
}

impl SideSetup {
    fn from_config(side: Side, config: &SideConfig) -> Result<Self> {
        let table_id = TableIdentifier::from_display(&config.table_id)
            .with_context(|| format!("Invalid {} table_id", side))?;
        let database_identifier = config
            .warehouse
            .database_identifier()
            .with_context(|| format!("Invalid [{}.warehouse] section", side))?;
        let resolver = resolver_from_config(&config.catalog)
            .with_context(|| format!("Invalid [{}.catalog] section", side))?;
        let executor = executor_from_config(&config.warehouse)
            .with_context(|| format!("Invalid [{}.warehouse] section", side))?;

        Ok(Self {
            table_id,
            database_identifier,
            resolver,
            executor,
        })
    }

    fn run_side(&self) -> RunSide<'_> {
        RunSide {
            table_id: self.table_id.clone(),
            database_identifier: self.database_identifier.clone(),
            resolver: self.resolver.as_ref(),
            executor: self.executor.as_ref(),
        }
    }
}

fn setup_sides(config: &Config) -> Result<(SideSetup, SideSetup)> {
    let origin = SideSetup::from_config(Side::Origin, config.side(Side::Origin)?)?;
    let target = SideSetup::from_config(Side::Target, config.side(Side::Target)?)?;
    Ok((origin, target))
}

/// Check command - fetch aggregates on both sides and compare them
async fn check_command(
    config: &Config,
    options: ComparisonOptions,
    output: &Path,
    markdown: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let (origin, target) = setup_sides(config)?;

    if verbose {
        eprintln!(
            "{} {} → {}",
            "Comparing".cyan(),
            origin.table_id,
            target.table_id
        );
    }

    let run = ComparisonRun::run(&origin.run_side(), &target.run_side(), options).await?;
    let report = run.report(&options);

    report.save_to_file(output)?;
    tracing::info!(path = %output.display(), columns = report.summary.columns_compared, "report written");
    if verbose {
        eprintln!("{} {}", "Report saved to:".green(), output.display());
    }

    if let Some(md_path) = markdown {
        std::fs::write(md_path, generate_markdown_report(&report))?;
        if verbose {
            eprintln!("{} {}", "Markdown report saved to:".green(), md_path.display());
        }
    }

    print_report_summary(&report);

    // Exit with error code if any column mismatched or errored
    if report.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}

/// Queries command - resolve, generate and validate without executing
async fn queries_command(config: &Config, options: ComparisonOptions, json: bool) -> Result<()> {
    let (origin, target) = setup_sides(config)?;
    let run = ComparisonRun::plan(&origin.run_side(), &target.run_side(), options).await?;

    let invalid: Vec<_> = Side::BOTH
        .iter()
        .flat_map(|side| run.side(*side).queries.validate().into_iter().map(move |d| d.with_side(*side)))
        .collect();

    if json {
        let queries: BTreeMap<String, BTreeMap<String, String>> = Side::BOTH
            .iter()
            .map(|side| (side.to_string(), run.side(*side).queries.to_map()))
            .collect();
        println!("{}", serde_json::to_string_pretty(&queries)?);
    } else {
        for side in Side::BOTH {
            let state = run.side(side);
            println!(
                "{} {} ({}, {})",
                format!("-- {}", side).bold().bright_blue(),
                state.table_id,
                state.queries.backend_kind(),
                state.info.qualified_name()
            );

            if state.queries.is_empty() {
                println!("{}", "-- no numeric columns".yellow());
            }
            for query in state.queries.iter() {
                let cast = if query.cast_applied { ", cast" } else { "" };
                println!("-- {} ({}{})", query.column, query.effective_type, cast);
                println!("{}", query.sql);
            }
            println!();
        }

        for note in run.notifications().iter().chain(&invalid) {
            print_notification(note);
        }
    }

    if !invalid.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}

/// Test-connection command - verify catalog tokens and warehouse connections
async fn test_connection_command(config: &Config) -> Result<()> {
    let mut failed = false;

    for side in Side::BOTH {
        let side_config = config.side(side)?;
        println!("{}", format!("{}:", side).bold());

        let catalog = match resolver_from_config(&side_config.catalog) {
            Ok(resolver) => resolver.test_connection().await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        failed |= report_check("catalog", &side_config.catalog.url, catalog);

        let warehouse = match executor_from_config(&side_config.warehouse) {
            Ok(executor) => executor.test_connection().await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        failed |= report_check("warehouse", &side_config.warehouse.warehouse_type, warehouse);
    }

    if failed {
        std::process::exit(1);
    }

    Ok(())
}

/// Print one connection check; returns true when it failed
fn report_check(what: &str, target: &str, outcome: std::result::Result<(), String>) -> bool {
    match outcome {
        Ok(()) => {
            println!("  {} {} ({})", "✓".green(), what, target);
            false
        }
        Err(e) => {
            println!("  {} {} ({}): {}", "✗".red(), what, target, e);
            true
        }
    }
}

fn print_notification(diag: &aggrecon_core::Diagnostic) {
    let severity_str = match diag.severity {
        Severity::Error => "ERROR".red().bold(),
        Severity::Warn => "WARN".yellow().bold(),
        Severity::Info => "INFO".cyan(),
    };

    println!("  [{}] {}: {}", severity_str, diag.code, diag.message);

    if let Some(exp) = &diag.expected {
        println!("    Expected: {}", exp);
    }
    if let Some(act) = &diag.actual {
        println!("    Actual:   {}", act);
    }
}

/// Print report summary to stdout
fn print_report_summary(report: &Report) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Aggregate Reconciliation Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    if let (Some(origin), Some(target)) = (&report.origin, &report.target) {
        println!("Origin: {} ({})", origin.table_id, origin.table.backend_kind);
        println!("Target: {} ({})", target.table_id, target.table.backend_kind);
    }
    println!("Timestamp: {}", report.timestamp);
    if let Some(digits) = report.options.rounding() {
        println!("Rounding: {} digits", digits);
    }
    println!();

    println!("{}", "Summary:".bold());
    println!("  Columns compared: {}", report.summary.columns_compared);
    println!("  Matched:    {}", format!("{}", report.summary.matched).green());

    if report.summary.mismatched > 0 {
        println!("  Mismatched: {}", format!("{}", report.summary.mismatched).red().bold());
    } else {
        println!("  Mismatched: {}", format!("{}", report.summary.mismatched).green());
    }

    if report.summary.errored > 0 {
        println!("  Errored:    {}", format!("{}", report.summary.errored).red().bold());
    } else {
        println!("  Errored:    {}", format!("{}", report.summary.errored).green());
    }
    println!();

    if !report.results.is_empty() {
        println!("{}", "Columns:".bold());
        for result in &report.results {
            let status = match result.overall_status {
                ColumnStatus::Match => "MATCH".green(),
                ColumnStatus::Mismatch => "MISMATCH".red().bold(),
                ColumnStatus::Error => "ERROR".red().bold(),
            };
            println!(
                "  {:<30} {} ({} / {})",
                result.column_name, status, result.origin_declared_type, result.target_declared_type
            );
        }
        println!();
    }

    if report.summary.columns_compared > 0 && !report.has_failures() {
        println!("{}", "✓ All compared columns match!".green().bold());
    }

    if !report.diagnostics.is_empty() {
        println!("{}", "Notifications:".bold());
        for diag in &report.diagnostics {
            print_notification(diag);
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

/// Generate markdown report
fn generate_markdown_report(report: &Report) -> String {
    let mut md = String::new();

    md.push_str("# Aggregate Reconciliation Report\n\n");
    md.push_str(&format!("**Version:** {}\n\n", report.version));
    md.push_str(&format!("**Timestamp:** {}\n\n", report.timestamp));
    if let (Some(origin), Some(target)) = (&report.origin, &report.target) {
        md.push_str(&format!(
            "**Origin:** `{}` ({})\n\n**Target:** `{}` ({})\n\n",
            origin.table_id, origin.table.backend_kind, target.table_id, target.table.backend_kind
        ));
    }

    md.push_str("## Summary\n\n");
    md.push_str(&format!("- Columns compared: {}\n", report.summary.columns_compared));
    md.push_str(&format!("- Matched: {}\n", report.summary.matched));
    md.push_str(&format!("- Mismatched: {}\n", report.summary.mismatched));
    md.push_str(&format!("- Errored: {}\n", report.summary.errored));
    md.push('\n');

    if !report.results.is_empty() {
        md.push_str("## Columns\n\n");
        md.push_str("| Column | Origin type | Target type | Status | Details |\n");
        md.push_str("|--------|-------------|-------------|--------|---------|\n");

        for result in &report.results {
            let status_emoji = match result.overall_status {
                ColumnStatus::Match => "✅",
                ColumnStatus::Mismatch => "❌",
                ColumnStatus::Error => "⚠️",
            };
            let details = match result.overall_status {
                ColumnStatus::Match => String::new(),
                ColumnStatus::Mismatch => result
                    .mismatched_metrics()
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                ColumnStatus::Error => result.error.clone().unwrap_or_default(),
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} {} | {} |\n",
                result.column_name,
                result.origin_declared_type,
                result.target_declared_type,
                status_emoji,
                result.overall_status,
                details.replace('|', "\\|")
            ));
        }
        md.push('\n');
    }

    if !report.diagnostics.is_empty() {
        md.push_str("## Notifications\n\n");
        for diag in &report.diagnostics {
            md.push_str(&format!("- **{}** `{}`: {}\n", diag.severity, diag.code, diag.message));
        }
        md.push('\n');
    }

    md
}
