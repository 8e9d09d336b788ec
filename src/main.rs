//! # JTL Aggregate - Main Entry Point
//!
//! Reads a result log, aggregates it per label and writes the report.
//!
//! 1. **Initialize logging**: colourised tracing output on stderr
//! 2. **Parse arguments**: clap-derived [`Args`] into a [`ReportConfig`]
//! 3. **Fold**: stream every record into the aggregate store in file order
//! 4. **Finalize and render**: summary pass, then table/CSV/JSON output

use anyhow::{Context, Result};
use clap::Parser;
use jtl_aggregate::{
    cli::{Args, ReportConfig},
    logging,
    report::ReportWriter,
    source::JtlSource,
    store::AggregateStore,
    utils::format_window_ms,
};
use tracing::{debug, error, info};

fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    if let Err(e) = run(&args) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let config = ReportConfig::from(args);
    info!(
        "Aggregating {} ({} report, {} view)",
        config.input.display(),
        config.format,
        config.view
    );
    debug!("Configuration: {:?}", config);

    let source = JtlSource::from_path(&config.input, config.has_header)?;
    let mut store = AggregateStore::new(config.aggregator);
    for record in source {
        let record = record.with_context(|| format!("Failed to read {}", config.input.display()))?;
        store.fold(&record);
    }

    let total = store.totals().requests.window_ms();
    info!(
        "Folded {} records into {} labels over {}",
        store.records_folded(),
        store.accumulators().len(),
        format_window_ms(total)
    );

    let report = store.finish();
    let source_name = config.input.display().to_string();
    ReportWriter::new(config.format, config.view).write_to(
        &report,
        &source_name,
        config.output.as_deref(),
    )?;

    Ok(())
}
