//! # Aggregate Store
//!
//! Owns one [`Accumulator`] per label plus the two grand totals, and folds
//! records into them in file order. The store also resolves the transaction
//! hierarchy: each record extends the window of the most recently seen
//! transaction label, so a transaction controller's reported window covers
//! every sub-request nested under it.
//!
//! Folding is single-writer and order dependent. Once the input is
//! exhausted, [`AggregateStore::finish`] consumes the store and runs the
//! summary pass, in parallel across labels.

use crate::accumulator::Accumulator;
use crate::record::Record;
use crate::summary::LabelSummary;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Tuning knobs for the fold phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Apdex satisfied threshold in milliseconds
    pub apdex_threshold_ms: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            apdex_threshold_ms: crate::defaults::APDEX_THRESHOLD_MS,
        }
    }
}

/// Grand totals split by label classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Totals<T> {
    /// Everything folded into non-transaction labels
    pub requests: T,
    /// Everything folded into transaction labels
    pub transactions: T,
}

/// Label-keyed accumulators in first-seen order.
#[derive(Debug, Clone)]
pub struct AggregateStore {
    config: AggregatorConfig,
    entries: Vec<Accumulator>,
    index: HashMap<String, usize>,
    totals: Totals<Accumulator>,
    /// Most recently seen transaction label
    last_parent: Option<usize>,
    records_folded: usize,
}

impl AggregateStore {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            index: HashMap::new(),
            totals: Totals {
                requests: Accumulator::empty(crate::defaults::TOTAL_LABEL, false),
                transactions: Accumulator::empty(crate::defaults::TOTAL_LABEL, true),
            },
            last_parent: None,
            records_folded: 0,
        }
    }

    /// Return the slot for `label`, creating it from `first` when absent.
    ///
    /// Classification and window start are fixed at creation.
    pub fn ensure(&mut self, label: &str, first: &Record) -> usize {
        if let Some(&slot) = self.index.get(label) {
            return slot;
        }
        let slot = self.entries.len();
        let mut acc = Accumulator::for_label(first);
        acc.label = label.to_string();
        debug!(
            label,
            slot,
            transaction = acc.is_transaction,
            "new label"
        );
        self.entries.push(acc);
        self.index.insert(label.to_string(), slot);
        slot
    }

    /// Fold one record into its label, the matching grand total, and the
    /// window of the active parent transaction.
    pub fn fold(&mut self, record: &Record) {
        if record.elapsed.is_nan() {
            warn!(
                label = %record.label,
                "non-numeric elapsed time, running sums for this label are now NaN"
            );
        }

        let slot = self.ensure(&record.label, record);
        let threshold = self.config.apdex_threshold_ms;

        let is_transaction = self.entries[slot].is_transaction;
        if is_transaction {
            self.last_parent = Some(slot);
        }

        self.entries[slot].fold(record, threshold);
        if is_transaction {
            self.totals.transactions.fold(record, threshold);
        } else {
            self.totals.requests.fold(record, threshold);
        }

        if let Some(parent) = self.last_parent.filter(|&p| p != slot) {
            let end = record.end_time();
            self.entries[parent].extend_window(end);
            self.totals.transactions.extend_window(end);
        }
        self.records_folded += 1;
    }

    /// Accumulator for `label`, if it has been seen.
    pub fn get(&self, label: &str) -> Option<&Accumulator> {
        self.index.get(label).map(|&slot| &self.entries[slot])
    }

    /// All accumulators in first-seen order.
    pub fn accumulators(&self) -> &[Accumulator] {
        &self.entries
    }

    /// Accumulators for plain sub-requests.
    pub fn requests(&self) -> impl Iterator<Item = &Accumulator> {
        self.entries.iter().filter(|acc| !acc.is_transaction)
    }

    /// Accumulators for transaction labels.
    pub fn transactions(&self) -> impl Iterator<Item = &Accumulator> {
        self.entries.iter().filter(|acc| acc.is_transaction)
    }

    pub fn totals(&self) -> &Totals<Accumulator> {
        &self.totals
    }

    pub fn records_folded(&self) -> usize {
        self.records_folded
    }

    /// Run the summary pass over every accumulator and both totals.
    pub fn finish(mut self) -> AggregateReport {
        let labels: Vec<LabelSummary> = self
            .entries
            .par_iter_mut()
            .map(Accumulator::summarize)
            .collect();

        let requests = self.totals.requests.summarize();
        let mut transactions = self.totals.transactions.summarize();
        // Transactions carry no per-request latency of their own.
        if transactions.latency.is_none() {
            transactions.latency = requests.latency;
        }

        info!(
            records = self.records_folded,
            labels = labels.len(),
            "aggregation complete"
        );

        AggregateReport {
            records: self.records_folded,
            labels,
            totals: Totals {
                requests,
                transactions,
            },
        }
    }
}

impl Default for AggregateStore {
    fn default() -> Self {
        Self::new(AggregatorConfig::default())
    }
}

/// Finalized output of an aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    /// Number of records folded
    pub records: usize,
    /// Per-label summaries in first-seen order
    pub labels: Vec<LabelSummary>,
    pub totals: Totals<LabelSummary>,
}

impl AggregateReport {
    pub fn label(&self, label: &str) -> Option<&LabelSummary> {
        self.labels.iter().find(|s| s.label == label)
    }

    pub fn requests(&self) -> impl Iterator<Item = &LabelSummary> {
        self.labels.iter().filter(|s| !s.is_transaction)
    }

    pub fn transactions(&self) -> impl Iterator<Item = &LabelSummary> {
        self.labels.iter().filter(|s| s.is_transaction)
    }

    /// Grand total for the unfiltered view.
    ///
    /// The requests total when any sub-request exists, otherwise the
    /// transactions total.
    pub fn overall_total(&self) -> &LabelSummary {
        if self.totals.requests.samples > 0 || self.totals.transactions.samples == 0 {
            &self.totals.requests
        } else {
            &self.totals.transactions
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: &str, timestamp: f64, elapsed: f64, transaction: bool) -> Record {
        Record {
            timestamp,
            elapsed,
            label: label.to_string(),
            response_code: 200.0,
            bytes_received: 100.0,
            bytes_sent: 10.0,
            latency: (!transaction).then_some(elapsed / 2.0),
            connect: None,
            thread_name: None,
            success: Some(true),
            is_root_transaction: transaction,
        }
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let mut store = AggregateStore::default();
        let first = record("call1", 100.0, 10.0, false);
        let a = store.ensure("call1", &first);
        let b = store.ensure("call1", &record("call1", 900.0, 10.0, true));

        assert_eq!(a, b);
        assert_eq!(store.accumulators().len(), 1);
        let acc = store.get("call1").unwrap();
        assert_eq!(acc.window_start, Some(100.0));
        assert!(!acc.is_transaction);
    }

    #[test]
    fn test_totals_follow_partition() {
        let mut store = AggregateStore::default();
        store.fold(&record("Login", 1000.0, 5.0, true));
        store.fold(&record("open", 1010.0, 100.0, false));
        store.fold(&record("submit", 1120.0, 200.0, false));

        let totals = store.totals();
        assert_eq!(totals.transactions.sample_count, 1);
        assert_eq!(totals.requests.sample_count, 2);
        assert_eq!(store.requests().count(), 2);
        assert_eq!(store.transactions().count(), 1);

        let request_sum: usize = store.requests().map(|a| a.sample_count).sum();
        assert_eq!(request_sum, totals.requests.sample_count);
        assert_eq!(store.records_folded(), 3);
    }

    #[test]
    fn test_parent_window_spans_children() {
        let mut store = AggregateStore::default();
        store.fold(&record("Login", 1000.0, 5.0, true));
        store.fold(&record("open", 1010.0, 100.0, false));
        store.fold(&record("submit", 1120.0, 200.0, false));
        store.fold(&record("redirect", 1330.0, 50.0, false));

        let login = store.get("Login").unwrap();
        assert_eq!(login.window_start, Some(1000.0));
        assert_eq!(login.window_end, Some(1380.0));
        assert_eq!(login.sample_count, 1);
    }

    #[test]
    fn test_later_parent_takes_over() {
        let mut store = AggregateStore::default();
        store.fold(&record("Login", 1000.0, 5.0, true));
        store.fold(&record("open", 1010.0, 100.0, false));
        store.fold(&record("Search", 2000.0, 5.0, true));
        store.fold(&record("query", 2010.0, 400.0, false));

        assert_eq!(store.get("Login").unwrap().window_end, Some(1110.0));
        assert_eq!(store.get("Search").unwrap().window_end, Some(2410.0));
    }

    #[test]
    fn test_finish_copies_latency_into_transactions_total() {
        let mut store = AggregateStore::default();
        store.fold(&record("Login", 1000.0, 5.0, true));
        store.fold(&record("open", 1010.0, 100.0, false));

        let report = store.finish();
        assert!(report.totals.requests.latency.is_some());
        assert_eq!(report.totals.transactions.latency, report.totals.requests.latency);
        assert_eq!(report.labels.len(), 2);
        assert_eq!(report.labels[0].label, "Login");
        assert_eq!(report.overall_total().samples, 1);
    }

    #[test]
    fn test_empty_store_report() {
        let report = AggregateStore::default().finish();

        assert!(report.labels.is_empty());
        assert_eq!(report.records, 0);
        let total = report.overall_total();
        assert_eq!(total.samples, 0);
        assert_eq!(total.throughput, 0.0);
        assert_eq!(total.sent_rate, 0.0);
        assert_eq!(total.received_rate, 0.0);
        assert_eq!(total.error_rate, 0.0);
    }
}
