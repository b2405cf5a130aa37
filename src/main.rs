// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io;
use std::path::PathBuf;

use snapshot_diff::{
    load_dataset, render_text_table, run_job, write_csv, write_json, write_report_csvs,
    JobConfig, JobReport, VERSION,
};

/// Compare two snapshots of the same records and report what changed.
///
/// Rows are matched on the key column; only rows whose tracked fields
/// differ show up in a report.
#[derive(Parser)]
#[command(name = "snapshot-diff", version = VERSION, about)]
struct Cli {
    /// Earlier snapshot (.csv, .xlsx, .xls, .xlsb, .ods)
    old: PathBuf,

    /// Later snapshot
    new: PathBuf,

    /// TOML job config (defaults to the delivery date / request status job)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Output format for stdout
    #[arg(long, short, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Also write one <comparison>.csv per report into this directory
    #[arg(long, short)]
    out: Option<PathBuf>,

    /// Browse the reports in the terminal viewer
    #[arg(long)]
    tui: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Csv,
    Json,
}

fn main() -> Result<()> {
    // SNAPSHOT_DIFF_LOG=debug for stage sizes; logs go to stderr so stdout stays pipeable
    let env_filter = tracing_subscriber::EnvFilter::try_from_env("SNAPSHOT_DIFF_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("snapshot_diff=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => JobConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => JobConfig::default(),
    };

    let old = load_dataset(&cli.old)
        .with_context(|| format!("failed to load old snapshot {}", cli.old.display()))?;
    let new = load_dataset(&cli.new)
        .with_context(|| format!("failed to load new snapshot {}", cli.new.display()))?;

    let report = run_job(&config, &old, &new).context("comparison failed")?;

    if let Some(dir) = &cli.out {
        let paths = write_report_csvs(&report, dir)
            .with_context(|| format!("failed to write reports to {}", dir.display()))?;
        for path in paths {
            eprintln!("✓ Wrote {}", path.display());
        }
    }

    if cli.tui {
        run_ui_mode(report)
    } else {
        print_report(&report, cli.format)
    }
}

fn print_report(report: &JobReport, format: Format) -> Result<()> {
    match format {
        Format::Table => {
            for comparison in &report.comparisons {
                println!("{}", comparison.title);
                println!("{}", "━".repeat(comparison.title.chars().count()));
                if comparison.result.is_empty() {
                    println!("{}", comparison.empty_message);
                } else {
                    print!("{}", render_text_table(&comparison.result));
                }
                println!("{}\n", comparison.result.summary());
            }
        }
        Format::Csv => {
            for comparison in &report.comparisons {
                println!("# {}", comparison.title);
                write_csv(&comparison.result, io::stdout().lock())
                    .context("failed to write CSV")?;
                println!();
            }
        }
        Format::Json => {
            write_json(report, io::stdout().lock()).context("failed to write JSON")?;
            println!();
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(report: JobReport) -> Result<()> {
    let mut app = ui::App::new(report);
    ui::run_ui(&mut app)?;
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_report: JobReport) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or print the reports: snapshot-diff OLD NEW --format table");
    std::process::exit(1);
}
