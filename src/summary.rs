//! # Summary Engine
//!
//! Finalization pass run once per accumulator after the input is exhausted.
//! It sorts the sample histories in place (descending) and derives the
//! report figures: percentiles, median, mean, throughput, error rate,
//! Apdex score and byte-transfer rates.
//!
//! ## Percentile definition
//!
//! Percentiles are taken from the descending-sorted samples: for percentile
//! `p`, keep the first `ceil(n * (100 - p) / 100)` values and report the last
//! of them. At small sample counts this differs from rank-based textbook
//! definitions; the historical values are preserved exactly.
//!
//! Re-running finalization on an accumulator that has not been folded into
//! since produces identical output.

use crate::accumulator::{Accumulator, SampleSeries};
use crate::utils::round2;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Percentiles reported for every label.
pub const PERCENTILES: [f64; 4] = [50.0, 90.0, 95.0, 99.0];

/// Fixed percentile set derived from one sample series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Latency (time to first byte) statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub median: f64,
    pub percentiles: Percentiles,
}

/// Finalized statistics for one label or grand total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSummary {
    pub label: String,
    pub is_transaction: bool,
    pub samples: usize,
    pub errors: usize,
    /// None when no samples were folded
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub total: f64,
    pub average: f64,
    pub median: f64,
    pub percentiles: Option<Percentiles>,
    /// Samples per second over the observed window
    pub throughput: f64,
    /// Fraction of samples with an error response code
    pub error_rate: f64,
    pub apdex: f64,
    pub bytes_received: f64,
    pub bytes_sent: f64,
    /// Bytes sent per millisecond of window
    pub sent_rate: f64,
    /// Bytes received per millisecond of window
    pub received_rate: f64,
    pub average_connect: Option<f64>,
    pub latency: Option<LatencyStats>,
    pub window_start: Option<f64>,
    pub window_end: Option<f64>,
    pub started_at: Option<DateTime<Utc>>,
}

impl Accumulator {
    /// Derive the report figures for this accumulator.
    ///
    /// Sorts the sample histories in place; folding after this call is not
    /// supported.
    pub fn summarize(&mut self) -> LabelSummary {
        sort_descending(&mut self.elapsed.values);
        sort_descending(&mut self.latency.values);

        let samples = self.sample_count;
        let window_ms = self.window_ms();

        let (min, max) = if self.elapsed.is_empty() {
            (None, None)
        } else {
            (Some(self.elapsed.min), Some(self.elapsed.max))
        };

        let average_connect = (self.connect_samples > 0)
            .then(|| round2(self.connect_sum / self.connect_samples as f64));

        let summary = LabelSummary {
            label: self.label.clone(),
            is_transaction: self.is_transaction,
            samples,
            errors: self.error_count,
            min,
            max,
            total: self.elapsed.sum,
            average: ratio(self.elapsed.sum, samples as f64),
            median: median(&self.elapsed.values).unwrap_or(0.0),
            percentiles: percentiles(&self.elapsed.values),
            throughput: throughput(samples, window_ms),
            error_rate: ratio(self.error_count as f64, samples as f64),
            apdex: ratio(
                self.apdex.satisfied as f64 + self.apdex.tolerating as f64 / 2.0,
                samples as f64,
            ),
            bytes_received: self.bytes_received,
            bytes_sent: self.bytes_sent,
            sent_rate: ratio(self.bytes_sent, window_ms),
            received_rate: ratio(self.bytes_received, window_ms),
            average_connect,
            latency: latency_stats(&self.latency),
            window_start: self.window_start,
            window_end: self.window_end,
            started_at: self.window_start.and_then(epoch_millis_to_utc),
        };

        debug!(
            label = %summary.label,
            samples = summary.samples,
            window_ms,
            "summarized label"
        );
        summary
    }
}

/// Percentile `p` of a descending-sorted slice.
///
/// Returns `None` for an empty slice.
pub fn descending_percentile(sorted_desc: &[f64], p: f64) -> Option<f64> {
    if sorted_desc.is_empty() {
        return None;
    }
    let keep = (sorted_desc.len() as f64 * (100.0 - p) / 100.0).ceil() as usize;
    // A prefix of length zero (p = 100) falls back to the first element.
    let keep = keep.clamp(1, sorted_desc.len());
    sorted_desc[..keep].last().copied()
}

/// Median of a descending-sorted slice.
///
/// Odd counts take the middle element; even counts average the two
/// elements straddling the midpoint.
pub fn median(sorted_desc: &[f64]) -> Option<f64> {
    let n = sorted_desc.len();
    if n == 0 {
        return None;
    }
    let mid = n / 2;
    if n % 2 == 1 {
        Some(sorted_desc[mid])
    } else {
        Some((sorted_desc[mid - 1] + sorted_desc[mid]) / 2.0)
    }
}

fn percentiles(sorted_desc: &[f64]) -> Option<Percentiles> {
    let [p50, p90, p95, p99] = PERCENTILES;
    Some(Percentiles {
        p50: descending_percentile(sorted_desc, p50)?,
        p90: descending_percentile(sorted_desc, p90)?,
        p95: descending_percentile(sorted_desc, p95)?,
        p99: descending_percentile(sorted_desc, p99)?,
    })
}

fn latency_stats(series: &SampleSeries) -> Option<LatencyStats> {
    if series.is_empty() {
        return None;
    }
    Some(LatencyStats {
        min: series.min,
        max: series.max,
        average: ratio(series.sum, series.len() as f64),
        median: median(&series.values)?,
        percentiles: percentiles(&series.values)?,
    })
}

/// NaN samples from malformed rows sort ahead of every number.
fn sort_descending(values: &mut [f64]) {
    values.sort_by(|a, b| b.total_cmp(a));
}

/// `samples * 1000 / window_ms`, or 0 when the window is empty.
fn throughput(samples: usize, window_ms: f64) -> f64 {
    let value = samples as f64 * 1000.0 / window_ms;
    if value.is_finite() {
        value
    } else {
        debug!(samples, window_ms, "zero-length window, reporting no throughput");
        0.0
    }
}

/// Rounded quotient, with non-finite results (empty input) reported as 0.
///
/// A NaN numerator from malformed input is passed through untouched.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if numerator.is_nan() {
        return f64::NAN;
    }
    let value = numerator / denominator;
    if value.is_finite() {
        round2(value)
    } else {
        0.0
    }
}

fn epoch_millis_to_utc(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt(millis as i64).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn record(timestamp: f64, elapsed: f64, code: f64) -> Record {
        Record {
            timestamp,
            elapsed,
            label: "call1".to_string(),
            response_code: code,
            bytes_received: 1000.0,
            bytes_sent: 200.0,
            latency: None,
            connect: None,
            thread_name: None,
            success: None,
            is_root_transaction: false,
        }
    }

    fn folded(elapsed: &[f64]) -> Accumulator {
        let first = record(1000.0, elapsed[0], 200.0);
        let mut acc = Accumulator::for_label(&first);
        for (i, &e) in elapsed.iter().enumerate() {
            acc.fold(&record(1000.0 + 100.0 * i as f64, e, 200.0), 500.0);
        }
        acc
    }

    #[test]
    fn test_descending_percentile() {
        let sorted = [1170.0, 1131.0, 1023.0, 24.0];
        assert_eq!(descending_percentile(&sorted, 50.0), Some(1131.0));
        assert_eq!(descending_percentile(&sorted, 90.0), Some(1170.0));
        assert_eq!(descending_percentile(&sorted, 95.0), Some(1170.0));
        assert_eq!(descending_percentile(&sorted, 99.0), Some(1170.0));
        assert_eq!(descending_percentile(&sorted, 0.0), Some(24.0));
        assert_eq!(descending_percentile(&[], 50.0), None);
    }

    #[test]
    fn test_percentile_small_sample_divergence() {
        // ten samples 1..=10 descending: p90 keeps ceil(1.0) = 1 value
        let sorted: Vec<f64> = (1..=10).rev().map(f64::from).collect();
        assert_eq!(descending_percentile(&sorted, 90.0), Some(10.0));
        assert_eq!(descending_percentile(&sorted, 50.0), Some(6.0));
        assert_eq!(descending_percentile(&sorted, 75.0), Some(8.0));
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[1170.0, 1131.0, 1023.0, 24.0]), Some(1077.0));
        assert_eq!(median(&[9.0, 5.0, 1.0]), Some(5.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_summarize_scenario() {
        let mut acc = folded(&[24.0, 1023.0, 1131.0, 1170.0]);
        acc.error_count = 1;
        let summary = acc.summarize();

        assert_eq!(summary.samples, 4);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.max, Some(1170.0));
        assert_eq!(summary.min, Some(24.0));
        assert_eq!(summary.total, 3348.0);
        assert_eq!(summary.average, 837.0);
        assert_eq!(summary.median, 1077.0);
        assert_eq!(summary.error_rate, 0.25);
        let p = summary.percentiles.unwrap();
        assert_eq!(p.p50, 1131.0);
        assert_eq!(p.p90, 1170.0);
        assert!(summary.latency.is_none());
        assert_eq!(acc.elapsed.values, vec![1170.0, 1131.0, 1023.0, 24.0]);
    }

    #[test]
    fn test_percentile_monotonicity() {
        let mut acc = folded(&[5.0, 80.0, 12.0, 12.0, 300.0, 41.0, 7.0, 99.0, 3.0]);
        let p = acc.summarize().percentiles.unwrap();
        assert!(p.p50 <= p.p90);
        assert!(p.p90 <= p.p95);
        assert!(p.p95 <= p.p99);
    }

    #[test]
    fn test_summarize_is_idempotent() {
        let mut acc = folded(&[300.0, 20.0, 45.0, 45.0, 1.0]);
        let first = acc.summarize();
        let second = acc.summarize();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_accumulator_reports_zeroes() {
        let mut acc = Accumulator::empty("TOTAL", false);
        let summary = acc.summarize();

        assert_eq!(summary.samples, 0);
        assert_eq!(summary.throughput, 0.0);
        assert_eq!(summary.average, 0.0);
        assert_eq!(summary.error_rate, 0.0);
        assert_eq!(summary.apdex, 0.0);
        assert_eq!(summary.sent_rate, 0.0);
        assert_eq!(summary.received_rate, 0.0);
        assert_eq!(summary.min, None);
        assert!(summary.percentiles.is_none());
        assert!(summary.started_at.is_none());
    }

    #[test]
    fn test_zero_length_window_throughput() {
        let first = record(1000.0, 0.0, 200.0);
        let mut acc = Accumulator::for_label(&first);
        acc.fold(&first, 500.0);
        let summary = acc.summarize();

        assert_eq!(summary.samples, 1);
        assert_eq!(summary.throughput, 0.0);
        assert_eq!(summary.received_rate, 0.0);
    }

    #[test]
    fn test_rates_over_window() {
        // window 1000..=2000 from two samples
        let first = record(1000.0, 500.0, 200.0);
        let mut acc = Accumulator::for_label(&first);
        acc.fold(&first, 500.0);
        acc.fold(&record(1500.0, 500.0, 200.0), 500.0);
        let summary = acc.summarize();

        assert_eq!(summary.throughput, 2.0);
        assert_eq!(summary.received_rate, 2.0);
        assert_eq!(summary.sent_rate, 0.4);
        assert_eq!(summary.apdex, 1.0);
    }
}
