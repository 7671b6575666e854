use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use imagegraph_core::{Config, Report, Severity};
use imagegraph_engine::{project_edges, Analysis, Analyzer, ImageRepository};
use imagegraph_graph::{build_graph, Inventory};

/// ImageGraph - Build and image stream dependency analysis
#[derive(Parser)]
#[command(name = "imagegraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: imagegraph.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report unpushable and circular build configs
    Check {
        /// Inventory snapshot (.json, .yaml or .yml)
        inventory: PathBuf,

        /// Also write the report as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format for stdout
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List digests of the managed images in an image stream repository
    Enumerate {
        /// Inventory snapshot (.json, .yaml or .yml)
        inventory: PathBuf,

        /// Repository as namespace/name
        repository: String,
    },

    /// Print every node and its projected edges
    Graph {
        /// Inventory snapshot (.json, .yaml or .yml)
        inventory: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::Check { inventory, output, format } => {
            check_command(config, &inventory, output.as_deref(), format, cli.verbose)
        }
        Commands::Enumerate { inventory, repository } => {
            enumerate_command(&inventory, &repository)
        }
        Commands::Graph { inventory } => graph_command(&inventory),
    }
}

/// Log to stderr; `RUST_LOG` wins over the verbosity flag
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    let config = if let Some(config_path) = path {
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else if Path::new("imagegraph.toml").exists() {
        Config::from_file(Path::new("imagegraph.toml")).context("Failed to load imagegraph.toml")?
    } else {
        if verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    for key in config.severity.unknown_keys() {
        tracing::warn!(key, "severity override names an unknown marker key");
    }

    Ok(config)
}

fn load_inventory(path: &Path) -> Result<(Inventory, String)> {
    Inventory::from_file_with_digest(path)
        .with_context(|| format!("Failed to load inventory {}", path.display()))
}

/// Check command - run the detectors and report markers
fn check_command(
    config: Config,
    inventory_path: &Path,
    output: Option<&Path>,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    if verbose {
        eprintln!("{} {}", "Loading inventory from:".cyan(), inventory_path.display());
    }
    let (inventory, digest) = load_inventory(inventory_path)?;

    let analysis = Analyzer::new(config).analyze(&inventory);

    if verbose {
        print_unresolved(&analysis);
    }

    let report = Report::from_markers(analysis.markers.clone())
        .with_build_configs_checked(analysis.build_config_count())
        .with_metadata(serde_json::json!({
            "inventory": inventory_path.display().to_string(),
            "inventory_digest": digest,
            "nodes": analysis.graph.node_count(),
            "edges": analysis.graph.edge_count(),
            "unresolved_references": analysis.projection.unresolved.len(),
        }));

    if let Some(path) = output {
        report
            .save_to_file(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        if verbose {
            eprintln!("{} {}", "Report saved to:".green(), path.display());
        }
    }

    match format {
        OutputFormat::Text => print_report_summary(&report),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    // Exit with error code if there are errors
    if report.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}

/// Enumerate command - digests the registry would list for a repository
fn enumerate_command(inventory_path: &Path, repository: &str) -> Result<()> {
    let (namespace, name) = repository
        .split_once('/')
        .filter(|(ns, name)| !ns.is_empty() && !name.is_empty() && !name.contains('/'))
        .ok_or_else(|| anyhow::anyhow!("Repository must be namespace/name, got '{}'", repository))?;

    let (inventory, _) = load_inventory(inventory_path)?;
    let mut graph = build_graph(&inventory);
    project_edges(&mut graph);

    let digests = ImageRepository::new(&graph, namespace, name).enumerate()?;
    for digest in &digests {
        println!("{digest}");
    }

    Ok(())
}

/// Graph command - dump the projected graph
fn graph_command(inventory_path: &Path) -> Result<()> {
    let (inventory, _) = load_inventory(inventory_path)?;
    let mut graph = build_graph(&inventory);
    let projection = project_edges(&mut graph);

    print!("{graph}");
    println!();
    println!(
        "{} nodes, {} edges ({} unresolved references)",
        graph.node_count(),
        graph.edge_count(),
        projection.unresolved.len()
    );

    Ok(())
}

fn print_unresolved(analysis: &Analysis) {
    for unresolved in &analysis.projection.unresolved {
        eprintln!(
            "  {} {} {}: {} {} ({})",
            "Skipped".yellow(),
            unresolved.build_config,
            unresolved.slot,
            unresolved.kind,
            unresolved.name,
            unresolved.reason
        );
    }
}

fn print_report_summary(report: &Report) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Build Graph Check Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    println!();

    println!("{}", "Summary:".bold());
    println!("  Build configs checked: {}", report.summary.build_configs_checked);
    println!("  Total markers: {}", report.summary.total);

    if report.summary.errors > 0 {
        println!("  Errors:   {}", format!("{}", report.summary.errors).red().bold());
    } else {
        println!("  Errors:   {}", format!("{}", report.summary.errors).green());
    }

    if report.summary.warnings > 0 {
        println!("  Warnings: {}", format!("{}", report.summary.warnings).yellow());
    } else {
        println!("  Warnings: {}", format!("{}", report.summary.warnings).green());
    }

    println!("  Info:     {}", report.summary.info);
    println!();

    if report.markers.is_empty() {
        println!("{}", "✓ No issues found!".green().bold());
    } else {
        println!("{}", "Markers:".bold());
        for marker in &report.markers {
            let severity_str = match marker.severity {
                Severity::Error => "ERROR".red().bold(),
                Severity::Warning => "WARN".yellow().bold(),
                Severity::Info => "INFO".cyan(),
            };

            println!("  [{}] {}: {}", severity_str, marker.key, marker.node);

            if let Some(message) = &marker.message {
                println!("    {}", message);
            }

            if !marker.related_nodes.is_empty() {
                println!("    Related: {}", marker.related_nodes.join(", "));
            }

            if let Some(suggestion) = &marker.suggestion {
                println!("    {} {}", "Suggestion:".green(), suggestion);
            }
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}
