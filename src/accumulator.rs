//! # Per-Label Accumulator
//!
//! Running statistics for one label (or for a grand total). An accumulator
//! is mutated only while records are folded; the derived figures are
//! produced afterwards by [`crate::summary`].

use crate::record::Record;
use serde::{Deserialize, Serialize};

/// Running min/max/sum over a sample history.
///
/// The same bookkeeping is used for elapsed time and for latency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSeries {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    /// Samples in fold order; sorted descending once summarized
    pub values: Vec<f64>,
}

impl SampleSeries {
    pub fn new() -> Self {
        Self {
            // Sentinels chosen so the first real sample always wins.
            min: f64::MAX,
            max: f64::MIN,
            sum: 0.0,
            values: Vec::new(),
        }
    }

    pub fn push(&mut self, value: f64) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
        self.sum += value;
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for SampleSeries {
    fn default() -> Self {
        Self::new()
    }
}

/// Apdex satisfaction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApdexCounts {
    pub satisfied: usize,
    pub tolerating: usize,
    pub frustrated: usize,
}

impl ApdexCounts {
    /// Classify one elapsed time against threshold `t`.
    pub fn record(&mut self, elapsed: f64, t: f64) {
        if elapsed <= t {
            self.satisfied += 1;
        } else if elapsed <= 4.0 * t {
            self.tolerating += 1;
        } else {
            self.frustrated += 1;
        }
    }
}

/// Running statistics for one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accumulator {
    pub label: String,
    pub sample_count: usize,
    pub error_count: usize,
    pub elapsed: SampleSeries,
    pub latency: SampleSeries,
    pub bytes_received: f64,
    pub bytes_sent: f64,
    pub connect_sum: f64,
    pub connect_samples: usize,
    /// Timestamp of the first record; unset only for a grand total before
    /// its first fold
    pub window_start: Option<f64>,
    pub window_end: Option<f64>,
    pub is_transaction: bool,
    pub apdex: ApdexCounts,
}

impl Accumulator {
    /// Create the accumulator for a label from its first record.
    pub fn for_label(first: &Record) -> Self {
        let mut acc = Self::empty(first.label.clone(), first.is_root_transaction);
        acc.window_start = Some(first.timestamp);
        acc
    }

    /// Create an accumulator with no window, as used for the grand totals.
    pub fn empty(label: impl Into<String>, is_transaction: bool) -> Self {
        Self {
            label: label.into(),
            sample_count: 0,
            error_count: 0,
            elapsed: SampleSeries::new(),
            latency: SampleSeries::new(),
            bytes_received: 0.0,
            bytes_sent: 0.0,
            connect_sum: 0.0,
            connect_samples: 0,
            window_start: None,
            window_end: None,
            is_transaction,
            apdex: ApdexCounts::default(),
        }
    }

    /// Fold one record into the running statistics.
    pub fn fold(&mut self, record: &Record, apdex_threshold: f64) {
        self.sample_count += 1;
        if record.is_error() {
            self.error_count += 1;
        }

        self.elapsed.push(record.elapsed);
        self.apdex.record(record.elapsed, apdex_threshold);

        self.bytes_received += record.bytes_received;
        self.bytes_sent += record.bytes_sent;

        self.extend_window(record.end_time());
        if self.window_start.is_none() {
            self.window_start = Some(record.timestamp);
        }

        if !self.is_transaction {
            if let Some(latency) = record.latency {
                self.latency.push(latency);
            }
            if let Some(connect) = record.connect {
                self.connect_sum += connect;
                self.connect_samples += 1;
            }
        }
    }

    /// Raise the window end to `end`. The window never shrinks.
    pub fn extend_window(&mut self, end: f64) {
        match self.window_end {
            Some(current) if current >= end => {}
            // NaN ends are ignored so a malformed row cannot erase the window.
            _ if end.is_nan() => {}
            _ => self.window_end = Some(end),
        }
    }

    /// Length of the observed window in milliseconds.
    pub fn window_ms(&self) -> f64 {
        match (self.window_start, self.window_end) {
            (Some(start), Some(end)) => end - start,
            _ => 0.0,
        }
    }
}
