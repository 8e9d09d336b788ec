use crate::store::AggregatorConfig;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// JTL Aggregate - builds an aggregate report from a JMeter result log
#[derive(Parser, Debug, Clone)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Result log to aggregate (CSV/JTL)
    #[clap(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file for the report (stdout when omitted)
    #[clap(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Report format
    #[clap(short = 'f', long, value_enum, default_value_t = ReportFormat::Table)]
    pub format: ReportFormat,

    /// Which labels to include in the report
    #[clap(long, value_enum, default_value_t = ReportView::All)]
    pub view: ReportView,

    /// Apdex satisfied threshold in milliseconds
    #[clap(long, default_value_t = crate::defaults::APDEX_THRESHOLD_MS)]
    pub apdex_threshold: f64,

    /// The input has no header row; assume the default JMeter column order
    #[clap(long, default_value_t = false)]
    pub no_header: bool,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

/// Output formats for the aggregate report
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum ReportFormat {
    /// Aligned text table
    #[clap(name = "table")]
    Table,

    /// Comma-separated values
    #[clap(name = "csv")]
    Csv,

    /// Full report as JSON
    #[clap(name = "json")]
    Json,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Table => write!(f, "table"),
            ReportFormat::Csv => write!(f, "csv"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

/// Label partitions a report can show
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum ReportView {
    /// Every label
    #[clap(name = "all")]
    All,

    /// Only plain sub-requests
    #[clap(name = "requests")]
    Requests,

    /// Only transaction controllers
    #[clap(name = "transactions")]
    Transactions,
}

impl std::fmt::Display for ReportView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportView::All => write!(f, "All Labels"),
            ReportView::Requests => write!(f, "Requests"),
            ReportView::Transactions => write!(f, "Transactions"),
        }
    }
}

/// Resolved configuration for one report run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportConfig {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub format: ReportFormat,
    pub view: ReportView,
    pub has_header: bool,
    pub aggregator: AggregatorConfig,
}

impl From<&Args> for ReportConfig {
    fn from(args: &Args) -> Self {
        Self {
            input: args.input.clone(),
            output: args.output.clone(),
            format: args.format,
            view: args.view,
            has_header: !args.no_header,
            aggregator: AggregatorConfig {
                apdex_threshold_ms: args.apdex_threshold,
            },
        }
    }
}
