use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use jacoco_report::config::Config;
use jacoco_report::{AsyncFileWriter, Collector, FileWriter, JacocoReport, ReportSummary};

const CONFIG_FILE: &str = "jacoco.toml";

#[derive(Parser)]
#[command(name = "jacoco-report")]
#[command(about = "Convert Istanbul coverage.json files into a JaCoCo XML report")]
#[command(version)]
struct Cli {
    /// Coverage JSON files or glob patterns (default: coverage/coverage*.json)
    inputs: Vec<String>,

    /// Path to config file (default: jacoco.toml, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the report is written to
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Report file name
    #[arg(short, long)]
    file: Option<String>,

    /// Value of the report name attribute
    #[arg(long)]
    project_root: Option<PathBuf>,

    /// Value of the session id attribute
    #[arg(long)]
    host: Option<String>,

    /// Write the report through the async writer
    #[arg(long)]
    async_write: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir().context("Could not determine current directory")?;
    let mut config = load_config(cli.config.as_deref(), &cwd)?;

    // command line wins over the config file
    if !cli.inputs.is_empty() {
        config.report.inputs = cli.inputs.clone();
    }
    if cli.dir.is_some() {
        config.report.dir = cli.dir.clone();
    }
    if cli.file.is_some() {
        config.report.file = cli.file.clone();
    }
    if cli.project_root.is_some() {
        config.report.project_root = cli.project_root.clone();
    }
    if cli.host.is_some() {
        config.report.host = cli.host.clone();
    }
    config.report.async_write |= cli.async_write;

    let collector = collect(&config.inputs(), &cwd)?;
    if collector.is_empty() {
        anyhow::bail!("No coverage records found in {}", config.inputs().join(", "));
    }

    let report = JacocoReport::new(config.report_options(&cwd));
    let summary = if config.report.async_write {
        write_async(&report, &collector)?
    } else {
        report.write_report(&collector, &FileWriter)?
    };

    print_summary(&summary, &report.output_path());
    Ok(())
}

fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<Config> {
    match explicit {
        Some(path) => Config::load(path),
        None => {
            let default = cwd.join(CONFIG_FILE);
            if default.exists() {
                Config::load(&default)
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn collect(inputs: &[String], cwd: &Path) -> Result<Collector> {
    let mut collector = Collector::new();

    for input in inputs {
        let pattern = cwd.join(input);
        let pattern = pattern.to_string_lossy();
        let mut matched = 0;

        for entry in glob::glob(&pattern).with_context(|| format!("Invalid pattern: {}", input))? {
            let path = entry.with_context(|| format!("Could not read match for {}", input))?;
            debug!(path = %path.display(), "loading coverage");
            collector
                .load_file(&path)
                .with_context(|| format!("Could not load {}", path.display()))?;
            matched += 1;
        }

        if matched == 0 {
            warn!(input = %input, "no coverage files matched");
        }
    }

    Ok(collector)
}

#[tokio::main]
async fn write_async(report: &JacocoReport, collector: &Collector) -> Result<ReportSummary> {
    Ok(report.write_report_async(collector, &AsyncFileWriter).await?)
}

fn print_summary(summary: &ReportSummary, path: &Path) {
    println!(
        "\n{} {} packages, {} classes, {}/{} methods covered",
        "📦".cyan(),
        summary.packages,
        summary.classes,
        summary.methods.covered,
        summary.methods.total()
    );

    let line_pct = summary.line_percentage();
    let line_str = format!("{:.1}%", line_pct);
    println!(
        "  Lines: {} ({}/{})",
        if line_pct >= 50.0 { line_str.green() } else { line_str.red() },
        summary.lines.covered,
        summary.lines.total()
    );
    if summary.branches.total() > 0 {
        println!(
            "  Branches: {:.1}% ({}/{})",
            summary.branch_percentage(),
            summary.branches.covered,
            summary.branches.total()
        );
    }

    println!(
        "\n{} Report generated: {}",
        "📊".cyan(),
        path.display().to_string().green()
    );
}
