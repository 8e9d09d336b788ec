//! # JTL Aggregate Library
//!
//! Turns a JMeter-style performance-test result log (one row per executed
//! request or transaction) into a per-label aggregate report: throughput,
//! latency distribution, error rate, Apdex and byte-transfer rates.
//!
//! ## Architecture Overview
//!
//! Records flow through the crate in a single ordered pass:
//!
//! - `source`: reads the delimited log lazily, one row at a time
//! - `record`: decodes a row into a typed [`Record`]
//! - `store`: folds records into per-label [`Accumulator`]s and grand
//!   totals, extending parent transaction windows over their children
//! - `accumulator`: running counts, min/max/sum and sample histories
//! - `summary`: finalization pass deriving percentiles, median, averages
//!   and rates
//! - `report`: table, CSV and JSON rendering
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use jtl_aggregate::{AggregateStore, AggregatorConfig, JtlSource};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut store = AggregateStore::new(AggregatorConfig::default());
//!     for record in JtlSource::from_path("results.jtl", true)? {
//!         store.fold(&record?);
//!     }
//!
//!     let report = store.finish();
//!     for label in &report.labels {
//!         println!("{}: {} samples, {:.2}/sec", label.label, label.samples, label.throughput);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Ordering
//!
//! Folding is sequential and must follow file order: the active parent
//! transaction and the monotonic window ends depend on it. Only the final
//! summary pass runs in parallel, one label per task.

/// Per-label running statistics
pub mod accumulator;

/// Command-line interface and configuration
///
/// Argument parsing using clap, converted into a [`cli::ReportConfig`].
pub mod cli;

pub mod error;

/// Colourised tracing output for the binary
pub mod logging;

/// Record decoding from named CSV fields
pub mod record;

/// Table, CSV and JSON rendering of finalized reports
pub mod report;

/// Lazy reader over delimited result logs
pub mod source;

/// Label-keyed aggregation and transaction hierarchy
pub mod store;

/// Percentiles, median, averages and rates
pub mod summary;

pub mod utils;

pub use accumulator::Accumulator;
pub use cli::{Args, ReportConfig, ReportFormat, ReportView};
pub use error::SourceError;
pub use record::Record;
pub use report::ReportWriter;
pub use source::JtlSource;
pub use store::{AggregateReport, AggregateStore, AggregatorConfig, Totals};
pub use summary::{LabelSummary, LatencyStats, Percentiles};

/// The current version of the crate, embedded in JSON reports.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fold every record of an iterator and finalize the result.
///
/// Stops at the first source error.
pub fn aggregate<I>(records: I, config: AggregatorConfig) -> Result<AggregateReport, SourceError>
where
    I: IntoIterator<Item = Result<Record, SourceError>>,
{
    let mut store = AggregateStore::new(config);
    for record in records {
        store.fold(&record?);
    }
    Ok(store.finish())
}

/// Default configuration values
pub mod defaults {
    /// Apdex satisfied threshold in milliseconds
    ///
    /// Samples at or under this are satisfied, up to four times it
    /// tolerating, anything slower frustrated.
    pub const APDEX_THRESHOLD_MS: f64 = 500.0;

    /// Response codes at or above this count as errors
    pub const ERROR_CODE_THRESHOLD: f64 = 400.0;

    /// URL column value written for transaction-controller rows
    pub const NO_URL_MARKER: &str = "null";

    /// Label used for grand-total rows
    pub const TOTAL_LABEL: &str = "TOTAL";
}
