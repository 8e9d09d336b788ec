//! # Record Decoder
//!
//! Maps one decoded JTL row (field name to raw string) into a typed
//! [`Record`]. The decoder never fails: numeric columns that do not parse
//! become `NaN` and travel into the accumulators unchanged, and absent
//! optional columns stay `None` so that a measured latency of zero can be
//! told apart from "not measured".
//!
//! ## Known defect
//!
//! A non-numeric `elapsed` poisons the running sum of its label (and of the
//! grand total) with `NaN`. This mirrors how the reports have always
//! behaved; callers that need clean data must filter rows before folding.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column names of a JMeter CSV result file, in default save order.
///
/// Used as the header when the input file was written without one.
pub const DEFAULT_COLUMNS: [&str; 17] = [
    "timeStamp",
    "elapsed",
    "label",
    "responseCode",
    "responseMessage",
    "threadName",
    "dataType",
    "success",
    "failureMessage",
    "bytes",
    "sentBytes",
    "grpThreads",
    "allThreads",
    "URL",
    "Latency",
    "IdleTime",
    "Connect",
];

/// Field name constants for the columns the decoder reads.
pub mod fields {
    pub const TIMESTAMP: &str = "timeStamp";
    pub const ELAPSED: &str = "elapsed";
    pub const LABEL: &str = "label";
    pub const RESPONSE_CODE: &str = "responseCode";
    pub const THREAD_NAME: &str = "threadName";
    pub const SUCCESS: &str = "success";
    pub const BYTES: &str = "bytes";
    pub const SENT_BYTES: &str = "sentBytes";
    pub const URL: &str = "URL";
    pub const LATENCY: &str = "Latency";
    pub const CONNECT: &str = "Connect";
}

/// A decoded row keyed by column name.
pub type RawRow = HashMap<String, String>;

/// One executed request or transaction from the result log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Start of the sample, epoch milliseconds
    pub timestamp: f64,
    /// Elapsed time in milliseconds (not validated, may be negative or NaN)
    pub elapsed: f64,
    pub label: String,
    pub response_code: f64,
    pub bytes_received: f64,
    pub bytes_sent: f64,
    /// Time to first byte, when the column was saved
    pub latency: Option<f64>,
    /// Connection establishment time, when the column was saved
    pub connect: Option<f64>,
    pub thread_name: Option<String>,
    pub success: Option<bool>,
    /// True for transaction-controller rows, which carry no URL
    pub is_root_transaction: bool,
}

impl Record {
    /// Decode a row into a record.
    pub fn from_row(row: &RawRow) -> Self {
        let text = |name: &str| row.get(name).map(String::as_str);

        Self {
            timestamp: parse_numeric(text(fields::TIMESTAMP)),
            elapsed: parse_numeric(text(fields::ELAPSED)),
            label: text(fields::LABEL).unwrap_or_default().to_string(),
            response_code: parse_numeric(text(fields::RESPONSE_CODE)),
            bytes_received: parse_numeric(text(fields::BYTES)),
            bytes_sent: parse_numeric(text(fields::SENT_BYTES)),
            latency: parse_optional(text(fields::LATENCY)),
            connect: parse_optional(text(fields::CONNECT)),
            thread_name: text(fields::THREAD_NAME)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            success: text(fields::SUCCESS).and_then(|s| s.trim().parse::<bool>().ok()),
            is_root_transaction: text(fields::URL) == Some(crate::defaults::NO_URL_MARKER),
        }
    }

    /// Time at which the sample finished (`timestamp + elapsed`).
    pub fn end_time(&self) -> f64 {
        self.timestamp + self.elapsed
    }

    /// Whether the response code marks this sample as an error.
    pub fn is_error(&self) -> bool {
        self.response_code >= crate::defaults::ERROR_CODE_THRESHOLD
    }
}

/// Best-effort integer conversion.
///
/// Accepts a leading integer prefix the way lenient parsers do
/// (`"200 OK"` decodes as 200). Anything without a leading integer,
/// including an absent field, yields `NaN`.
pub fn parse_numeric(value: Option<&str>) -> f64 {
    let Some(value) = value else {
        return f64::NAN;
    };
    let trimmed = value.trim();
    let digits_end = trimmed
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(trimmed.len(), |(i, _)| i);

    trimmed[..digits_end]
        .parse::<f64>()
        .unwrap_or(f64::NAN)
}

/// Parse an optional column: absent or empty means "not measured".
fn parse_optional(value: Option<&str>) -> Option<f64> {
    match value {
        Some(v) if !v.trim().is_empty() => Some(parse_numeric(Some(v))),
        _ => None,
    }
}
