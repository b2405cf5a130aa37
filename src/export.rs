// 📤 Report Export - CSV files, JSON and plain-text tables

use crate::job::JobReport;
use crate::reconciliation::ComparisonResult;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write one result as CSV, header row first, in output column order
pub fn write_csv<W: Write>(result: &ComparisonResult, writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(result.columns())?;
    for row in result.rows() {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `<name>.csv` for every comparison into `dir`; returns the paths
pub fn write_report_csvs(report: &JobReport, dir: &Path) -> Result<Vec<PathBuf>, csv::Error> {
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(report.comparisons.len());
    for comparison in &report.comparisons {
        let path = dir.join(format!("{}.csv", comparison.name));
        write_csv(&comparison.result, fs::File::create(&path)?)?;
        tracing::debug!(path = %path.display(), rows = comparison.result.len(), "wrote report");
        written.push(path);
    }

    Ok(written)
}

pub fn write_json<W: Write>(report: &JobReport, writer: W) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(writer, report)
}

/// Column-aligned text table
pub fn render_text_table(result: &ComparisonResult) -> String {
    let columns = result.columns();
    let rows: Vec<Vec<String>> = result
        .rows()
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:<w$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&line(&columns));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &rows {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================
