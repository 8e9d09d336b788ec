//! Errors raised at the I/O boundary.
//!
//! The aggregation core is infallible; only reading the result log can fail.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open result log {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed row at line {line}: {source}")]
    Csv {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("failed to read header row: {0}")]
    Header(#[source] csv::Error),
}
