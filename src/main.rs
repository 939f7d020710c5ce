use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use conflict_report::logging::init_logging;
use conflict_report::{build_report, PipelineConfig};

#[derive(Parser)]
#[command(name = "conflict-report")]
#[command(about = "Render the yearly conflict deaths report")]
#[command(version)]
struct Cli {
    /// JSON file overriding the built-in settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Multi-year source (Entity, Code, Year, deaths)
    #[arg(long)]
    timeseries: Option<PathBuf>,

    /// Single-year source (Country, Fatalities)
    #[arg(long)]
    single_year: Option<PathBuf>,

    /// Output HTML path; the SVG and JSON land beside it
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    println!("📊 Conflict Report v{}", conflict_report::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Configuration
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(path) = cli.timeseries {
        config.timeseries_path = path;
    }
    if let Some(path) = cli.single_year {
        config.single_year_path = path;
    }
    if let Some(path) = cli.output {
        config.output_path = path;
    }

    // 2. Load, filter, aggregate, render
    println!("\n📂 Loading sources...");
    println!("   {}", config.timeseries_path.display());
    println!("   {} (year {})", config.single_year_path.display(), config.single_year);
    let outcome = build_report(&config).with_context(|| {
        format!(
            "Failed to build report from {} and {}",
            config.timeseries_path.display(),
            config.single_year_path.display()
        )
    })?;

    let summary = &outcome.document.summary;
    println!("✓ {}", summary.summary());
    if !outcome.audit.is_clean() {
        println!("⚠️  {} exclusion list notes (see Methodology)", outcome.audit.notes().len());
    }

    // 3. Write document
    println!("\n💾 Writing report...");
    let paths = outcome
        .document
        .write_outputs(&config.output_path)
        .with_context(|| format!("Failed to write report: {}", config.output_path.display()))?;
    println!("✓ {}", paths.html.display());
    println!("✓ {}", paths.svg.display());
    println!("✓ {}", paths.json.display());

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if summary.has_data() {
        println!("✅ Report complete");
    } else {
        println!("⚠️  Report complete, but no data fell in the year range");
    }

    Ok(())
}
