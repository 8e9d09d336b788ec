//! # Utility Functions and Helper Module
//!
//! Small helpers shared by the summary engine and the report renderer:
//! rounding, human-readable formatting of times, rates and percentages,
//! and fixed-width table layout.
//!
//! ## Usage Examples
//!
//! ```rust
//! use jtl_aggregate::utils::*;
//!
//! assert_eq!(round2(836.999), 837.0);
//! assert_eq!(format_percent(0.25), "25.00%");
//! assert_eq!(format_window_ms(90_000.0), "1m 30s");
//! ```

/// Round to two decimal places.
///
/// NaN and infinities pass through unchanged so malformed input stays
/// visible in the report.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    (value * 100.0).round() / 100.0
}

/// Render a fraction as a percentage with two decimals and a trailing `%`.
///
/// ## Examples
///
/// ```rust
/// # use jtl_aggregate::utils::format_percent;
/// assert_eq!(format_percent(0.0), "0.00%");
/// assert_eq!(format_percent(0.5), "50.00%");
/// ```
pub fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// Render a millisecond figure for table cells.
///
/// Whole values print without decimals, anything else with two.
pub fn format_millis(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

/// Format a window length given in milliseconds
///
/// Converts the length of an observed time window to a human-readable
/// string, selecting the most appropriate unit based on magnitude.
///
/// ## Unit Selection Logic
///
/// - **Milliseconds**: < 1 second (e.g., "250ms")
/// - **Seconds**: < 60 seconds (e.g., "5.25s")
/// - **Minutes and Hours**: longer windows (e.g., "5m 30s", "2h 15m 30s")
///
/// Negative or non-finite windows (malformed timestamps) render as "n/a".
///
/// ## Examples
///
/// ```rust
/// # use jtl_aggregate::utils::format_window_ms;
/// assert_eq!(format_window_ms(250.0), "250ms");
/// assert_eq!(format_window_ms(5250.0), "5.25s");
/// assert_eq!(format_window_ms(8_130_000.0), "2h 15m 30s");
/// ```
pub fn format_window_ms(window_ms: f64) -> String {
    if !window_ms.is_finite() || window_ms < 0.0 {
        return "n/a".to_string();
    }

    if window_ms < 1_000.0 {
        format!("{}ms", window_ms as u64)
    } else if window_ms < 60_000.0 {
        format!("{:.2}s", window_ms / 1_000.0)
    } else {
        let seconds = (window_ms / 1_000.0) as u64;
        let minutes = seconds / 60;
        let remaining_seconds = seconds % 60;

        if minutes < 60 {
            format!("{}m {}s", minutes, remaining_seconds)
        } else {
            let hours = minutes / 60;
            let remaining_minutes = minutes % 60;
            format!("{}h {}m {}s", hours, remaining_minutes, remaining_seconds)
        }
    }
}

/// Format one row of a fixed-width table
///
/// ## Parameters
/// - `columns`: Cell contents
/// - `widths`: Column widths; missing entries default to 10
///
/// ## Visual Example
///
/// ```text
/// +----------------+-----------+
/// | Label          | # Samples |
/// +----------------+-----------+
/// | call1          | 4         |
/// +----------------+-----------+
/// ```
pub fn format_table_row<S: AsRef<str>>(columns: &[S], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (i, column) in columns.iter().enumerate() {
        let width = widths.get(i).copied().unwrap_or(10);
        line.push_str(&format!(" {:width$} |", column.as_ref(), width = width));
    }
    line
}

/// Format a table separator matching [`format_table_row`] widths.
pub fn format_table_separator(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for &width in widths {
        line.push_str(&"-".repeat(width + 2));
        line.push('+');
    }
    line
}
