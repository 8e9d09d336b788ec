//! # JTL Source
//!
//! Thin reader that turns a comma-delimited, double-quote-escaped result
//! log into [`Record`]s one row at a time. Rows are decoded lazily from the
//! underlying reader, so only the current row is held in memory.

use crate::error::SourceError;
use crate::record::{fields, RawRow, Record, DEFAULT_COLUMNS};
use csv::StringRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Iterator over the records of a result log.
pub struct JtlSource<R: Read> {
    reader: csv::Reader<R>,
    headers: Vec<String>,
    row: StringRecord,
    /// First row of a log that was expected to carry a header but did not.
    pending: Option<StringRecord>,
}

impl JtlSource<File> {
    /// Open a result log from disk.
    pub fn from_path<P: AsRef<Path>>(path: P, has_header: bool) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SourceError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::new(file, has_header)
    }
}

impl<R: Read> JtlSource<R> {
    /// Wrap a reader. Without a header row the default JMeter column
    /// order is assumed. A first row that lacks the `timeStamp` and
    /// `label` columns is not a header: the default order is used and the
    /// row is yielded as data.
    pub fn new(input: R, has_header: bool) -> Result<Self, SourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(input);

        let mut headers = default_columns();
        let mut pending = None;
        if has_header {
            let mut first = StringRecord::new();
            if reader.read_record(&mut first).map_err(SourceError::Header)? {
                if is_header_row(&first) {
                    headers = first.iter().map(|h| h.trim().to_string()).collect();
                } else {
                    warn!(
                        "first row has no {} and {} columns, reading the log as headerless",
                        fields::TIMESTAMP,
                        fields::LABEL
                    );
                    pending = Some(first);
                }
            }
        }
        debug!(columns = headers.len(), has_header, "opened result log");

        Ok(Self {
            reader,
            headers,
            row: StringRecord::new(),
            pending,
        })
    }

    /// Column names rows are decoded against.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Pair the current row with the header names. Short rows simply
    /// lack the trailing fields.
    fn current_row(&self) -> RawRow {
        self.headers
            .iter()
            .zip(self.row.iter())
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect()
    }
}

fn default_columns() -> Vec<String> {
    DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect()
}

fn is_header_row(row: &StringRecord) -> bool {
    let has = |name: &str| row.iter().any(|field| field.trim() == name);
    has(fields::TIMESTAMP) && has(fields::LABEL)
}

impl<R: Read> Iterator for JtlSource<R> {
    type Item = Result<Record, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(first) = self.pending.take() {
            self.row = first;
            return Some(Ok(Record::from_row(&self.current_row())));
        }
        loop {
            match self.reader.read_record(&mut self.row) {
                Ok(false) => return None,
                Ok(true) => {
                    // Blank lines decode as a single empty field.
                    if self.row.len() == 1 && self.row.get(0).map_or(true, str::is_empty) {
                        continue;
                    }
                    return Some(Ok(Record::from_row(&self.current_row())));
                }
                Err(source) => {
                    let line = source
                        .position()
                        .or_else(|| self.row.position())
                        .map_or(0, |p| p.line());
                    return Some(Err(SourceError::Csv { line, source }));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WITH_HEADER: &str = "\
timeStamp,elapsed,label,responseCode,responseMessage,threadName,success,bytes,sentBytes,URL,Latency
1448450968840,24,call1,500,\"Internal, Error\",TG 1-1,false,1000,200,http://host/call1,12
1448450969091,2200,call2,200,OK,TG 1-2,true,1000,200,http://host/call2,

";

    #[test]
    fn test_reads_with_header() {
        let records: Vec<Record> = JtlSource::new(WITH_HEADER.as_bytes(), true)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].label, "call1");
        assert_eq!(records[0].response_code, 500.0);
        assert_eq!(records[0].latency, Some(12.0));
        assert_eq!(records[1].latency, None);
        assert_eq!(records[1].elapsed, 2200.0);
    }

    #[test]
    fn test_reads_headerless_default_columns() {
        let data = "1448450968840,1170,Login,200,OK,TG 1-1,,true,,0,0,1,1,null,0,0,0\n";
        let mut source = JtlSource::new(data.as_bytes(), false).unwrap();
        let record = source.next().unwrap().unwrap();

        assert_eq!(record.label, "Login");
        assert!(record.is_root_transaction);
        assert_eq!(record.connect, Some(0.0));
        assert!(source.next().is_none());
        assert_eq!(source.headers().len(), DEFAULT_COLUMNS.len());
    }

    #[test]
    fn test_short_rows_leave_fields_absent() {
        let data = "1448450968840,100,short\n";
        let record = JtlSource::new(data.as_bytes(), false)
            .unwrap()
            .next()
            .unwrap()
            .unwrap();

        assert_eq!(record.label, "short");
        assert!(record.response_code.is_nan());
        assert_eq!(record.latency, None);
        assert!(!record.is_root_transaction);
    }

    #[test]
    fn test_missing_header_falls_back_to_default_columns() {
        let data = "\
1448450968840,24,call1,500,Internal Error,TG 1-1,text,false,,1000,200,1,1,http://host/call1,20,0,3
1448450969100,1023,call1,200,OK,TG 1-1,text,true,,1000,200,1,1,http://host/call1,300,0,3
";
        let mut source = JtlSource::new(data.as_bytes(), true).unwrap();
        assert_eq!(source.headers().len(), DEFAULT_COLUMNS.len());

        let records: Vec<Record> = source.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.label == "call1"));
        assert_eq!(records[0].elapsed, 24.0);
        assert_eq!(records[0].response_code, 500.0);
        assert_eq!(records[1].latency, Some(300.0));
    }

    #[test]
    fn test_empty_log_with_header_expected() {
        let mut source = JtlSource::new("".as_bytes(), true).unwrap();
        assert!(source.next().is_none());
        assert_eq!(source.headers().len(), DEFAULT_COLUMNS.len());
    }
}
