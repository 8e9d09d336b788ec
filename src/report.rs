//! # Report Rendering
//!
//! Formats an [`AggregateReport`] for people or tools: an aligned text
//! table, CSV with the same columns, or the full report as JSON with run
//! metadata. Rows appear in first-seen label order followed by a `TOTAL`
//! row for the selected view.

use crate::cli::{ReportFormat, ReportView};
use crate::store::AggregateReport;
use crate::summary::LabelSummary;
use crate::utils::{format_millis, format_percent, format_table_row, format_table_separator};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Columns present in every tabular report.
pub const BASE_COLUMNS: [&str; 14] = [
    "Label",
    "# Samples",
    "Throughput",
    "Average",
    "Median",
    "90% Line",
    "95% Line",
    "99% Line",
    "Min",
    "Max",
    "Error %",
    "Apdex",
    "Sent KB/sec",
    "Received KB/sec",
];

/// Columns appended when any row carries latency data.
pub const LATENCY_COLUMNS: [&str; 5] = [
    "Latency Avg",
    "Latency Median",
    "Latency 90%",
    "Latency 95%",
    "Latency 99%",
];

/// Metadata attached to JSON reports
#[derive(Debug, Serialize)]
pub struct ReportMetadata {
    pub version: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub source: String,
    pub view: ReportView,
}

/// JSON document layout
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    metadata: ReportMetadata,
    labels: Vec<&'a LabelSummary>,
    total: &'a LabelSummary,
    records: usize,
}

/// Renders reports in one format for one view
#[derive(Debug, Clone, Copy)]
pub struct ReportWriter {
    format: ReportFormat,
    view: ReportView,
}

impl ReportWriter {
    pub fn new(format: ReportFormat, view: ReportView) -> Self {
        Self { format, view }
    }

    /// Write the report to `path`, or to stdout when no path is given.
    pub fn write_to(&self, report: &AggregateReport, source: &str, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create report file: {}", path.display()))?;
                self.write(report, source, file)?;
                info!("Report written to: {:?}", path);
            }
            None => {
                let stdout = std::io::stdout();
                self.write(report, source, stdout.lock())?;
            }
        }
        Ok(())
    }

    /// Render the report into any writer.
    pub fn write<W: Write>(&self, report: &AggregateReport, source: &str, out: W) -> Result<()> {
        let mut out = BufWriter::new(out);
        let (rows, total) = self.select(report);

        match self.format {
            ReportFormat::Json => {
                let document = JsonReport {
                    metadata: ReportMetadata {
                        version: crate::VERSION.to_string(),
                        generated_at: chrono::Utc::now(),
                        source: source.to_string(),
                        view: self.view,
                    },
                    labels: rows,
                    total,
                    records: report.records,
                };
                serde_json::to_writer_pretty(&mut out, &document)
                    .context("Failed to serialize JSON report")?;
                writeln!(out)?;
            }
            ReportFormat::Csv => {
                let table = Table::build(&rows, total);
                let mut writer = csv::Writer::from_writer(&mut out);
                writer.write_record(&table.header)?;
                for row in &table.rows {
                    writer.write_record(row)?;
                }
                writer.flush()?;
            }
            ReportFormat::Table => {
                let table = Table::build(&rows, total);
                let widths = table.widths();
                let separator = format_table_separator(&widths);
                writeln!(out, "{}", separator)?;
                writeln!(out, "{}", format_table_row(&table.header, &widths))?;
                writeln!(out, "{}", separator)?;
                for row in &table.rows {
                    writeln!(out, "{}", format_table_row(row, &widths))?;
                }
                writeln!(out, "{}", separator)?;
            }
        }

        out.flush().context("Failed to flush report output")?;
        Ok(())
    }

    /// Rows and grand total for the configured view.
    fn select<'a>(&self, report: &'a AggregateReport) -> (Vec<&'a LabelSummary>, &'a LabelSummary) {
        match self.view {
            ReportView::All => (report.labels.iter().collect(), report.overall_total()),
            ReportView::Requests => (report.requests().collect(), &report.totals.requests),
            ReportView::Transactions => {
                (report.transactions().collect(), &report.totals.transactions)
            }
        }
    }
}

/// Rendered cells for the tabular formats.
struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn build(rows: &[&LabelSummary], total: &LabelSummary) -> Self {
        let with_latency = rows.iter().any(|r| r.latency.is_some()) || total.latency.is_some();

        let mut header: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
        if with_latency {
            header.extend(LATENCY_COLUMNS.iter().map(|c| c.to_string()));
        }

        let rows = rows
            .iter()
            .copied()
            .map(|summary| row_cells(summary, &summary.label, with_latency))
            .chain(std::iter::once(row_cells(
                total,
                crate::defaults::TOTAL_LABEL,
                with_latency,
            )))
            .collect();

        Self { header, rows }
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.header.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        widths
    }
}

fn row_cells(summary: &LabelSummary, label: &str, with_latency: bool) -> Vec<String> {
    let optional = |value: Option<f64>| value.map(format_millis).unwrap_or_default();
    let p = summary.percentiles;

    let mut cells = vec![
        label.to_string(),
        summary.samples.to_string(),
        format!("{:.2}/sec", summary.throughput),
        format_millis(summary.average),
        format_millis(summary.median),
        optional(p.map(|p| p.p90)),
        optional(p.map(|p| p.p95)),
        optional(p.map(|p| p.p99)),
        optional(summary.min),
        optional(summary.max),
        format_percent(summary.error_rate),
        format!("{:.2}", summary.apdex),
        format!("{:.2}", summary.sent_rate),
        format!("{:.2}", summary.received_rate),
    ];

    if with_latency {
        let latency = summary.latency;
        cells.extend([
            optional(latency.map(|l| l.average)),
            optional(latency.map(|l| l.median)),
            optional(latency.map(|l| l.percentiles.p90)),
            optional(latency.map(|l| l.percentiles.p95)),
            optional(latency.map(|l| l.percentiles.p99)),
        ]);
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::store::AggregateStore;

    fn record(label: &str, timestamp: f64, elapsed: f64, latency: Option<f64>) -> Record {
        Record {
            timestamp,
            elapsed,
            label: label.to_string(),
            response_code: 200.0,
            bytes_received: 500.0,
            bytes_sent: 50.0,
            latency,
            connect: None,
            thread_name: None,
            success: Some(true),
            is_root_transaction: label == "Login",
        }
    }

    fn sample_report(latency: bool) -> AggregateReport {
        let mut store = AggregateStore::default();
        let lat = |v: f64| latency.then_some(v);
        store.fold(&record("Login", 1000.0, 5.0, None));
        store.fold(&record("open", 1010.0, 100.0, lat(40.0)));
        store.fold(&record("open", 1200.0, 300.0, lat(60.0)));
        store.finish()
    }

    fn render(report: &AggregateReport, format: ReportFormat, view: ReportView) -> String {
        let mut buffer = Vec::new();
        ReportWriter::new(format, view)
            .write(report, "test.jtl", &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_csv_without_latency_columns() {
        let output = render(&sample_report(false), ReportFormat::Csv, ReportView::All);
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], BASE_COLUMNS.join(","));
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("Login,1,"));
        assert!(lines[2].starts_with("open,2,"));
        assert!(lines[3].starts_with("TOTAL,2,"));
        assert!(lines[2].contains(",0.00%,"));
    }

    #[test]
    fn test_csv_with_latency_columns() {
        let output = render(&sample_report(true), ReportFormat::Csv, ReportView::Requests);
        let header = output.lines().next().unwrap();

        assert!(header.ends_with("Latency 99%"));
        assert_eq!(output.lines().count(), 3);
        assert!(!output.contains("Login"));
    }

    #[test]
    fn test_table_layout() {
        let output = render(&sample_report(false), ReportFormat::Table, ReportView::Transactions);
        let lines: Vec<&str> = output.lines().collect();

        assert!(lines[0].starts_with("+-"));
        assert!(lines[1].starts_with("| Label "));
        assert!(lines[3].starts_with("| Login "));
        assert!(lines[4].starts_with("| TOTAL "));
        assert_eq!(lines.len(), 6);
        assert!(lines.iter().all(|l| l.chars().count() == lines[0].chars().count()));
    }

    #[test]
    fn test_json_document() {
        let output = render(&sample_report(true), ReportFormat::Json, ReportView::All);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["metadata"]["source"], "test.jtl");
        assert_eq!(value["metadata"]["version"], crate::VERSION);
        assert_eq!(value["records"], 3);
        assert_eq!(value["labels"].as_array().unwrap().len(), 2);
        assert_eq!(value["total"]["samples"], 2);
        assert_eq!(value["labels"][1]["percentiles"]["p90"], 300.0);
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        ReportWriter::new(ReportFormat::Csv, ReportView::All)
            .write_to(&sample_report(false), "test.jtl", Some(&path))
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Label,# Samples,"));
    }
}
