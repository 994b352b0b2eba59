// Streaming telemetry log parser - builds a SeriesStore in one pass

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::core::compression::open_log;
use crate::core::constants::{DEFAULT_MAX_ERRORS, MAX_RECORDED_ISSUES, PROGRESS_INTERVAL};
use crate::core::error::{CanlogError, Result};
use crate::core::format::{parse_line, IssueKind, LogLine, ParseIssue, ParseReport, SignalName};
use crate::core::series::Series;
use crate::core::store::SeriesStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Row errors tolerated before aborting; `None` never aborts.
    pub max_errors: Option<usize>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::with_max_errors(DEFAULT_MAX_ERRORS)
    }
}

impl ParseOptions {
    /// Zero or a negative limit disables the limit.
    pub fn with_max_errors(max_errors: i64) -> Self {
        Self {
            max_errors: (max_errors > 0).then_some(max_errors as usize),
        }
    }
}

/// Parse the log at `path`, aborting after more than `max_errors` bad rows.
pub fn parse(path: impl AsRef<Path>, max_errors: i64) -> Result<SeriesStore> {
    LogParser::new(ParseOptions::with_max_errors(max_errors)).parse(path)
}

#[derive(Debug, Clone, Default)]
pub struct LogParser {
    options: ParseOptions,
}

impl LogParser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    pub fn parse(&self, path: impl AsRef<Path>) -> Result<SeriesStore> {
        let path = path.as_ref();
        let reader = open_log(path)?;
        self.parse_reader(reader, &path.display().to_string())
    }

    pub fn parse_reader<R: BufRead>(&self, reader: R, source: &str) -> Result<SeriesStore> {
        let mut state = ParseState::new(source, self.options);
        let mut lines = reader.split(b'\n');

        if let Some(first) = lines.next() {
            let first = first?;
            state.header_line = String::from_utf8_lossy(&first).trim().to_string();
            info!("{}: {}", source, state.header_line);
        }

        for (idx, raw) in lines.enumerate() {
            // 1-based, counting the informational first line
            let line_no = idx + 2;
            let raw = raw?;
            state.lines = line_no;

            let parsed = match std::str::from_utf8(&raw) {
                Ok(text) => parse_line(text),
                Err(e) => Err((IssueKind::MalformedRow, format!("invalid UTF-8: {}", e))),
            };

            match parsed {
                Ok(LogLine::Header(pair)) => state.declare(pair.id, &pair.name, line_no),
                Ok(LogLine::Data(row)) => {
                    if state.names.contains_key(&row.id) {
                        state.push(row.timestamp, row.id, row.value);
                    } else {
                        state.issue(
                            line_no,
                            IssueKind::UnknownId,
                            format!("data row for undeclared id {}", row.id),
                        )?;
                    }
                }
                Ok(LogLine::Blank) => {}
                Err((kind, message)) => state.issue(line_no, kind, message)?,
            }

            if line_no % PROGRESS_INTERVAL == 0 {
                debug!("{}: {} lines, {} samples", source, line_no, state.samples);
            }
        }

        state.finish()
    }
}

struct ParseState {
    source: String,
    options: ParseOptions,
    header_line: String,
    names: HashMap<u32, SignalName>,
    id_of: HashMap<String, u32>,
    header_order: Vec<u32>,
    buckets: HashMap<u32, (Vec<i64>, Vec<f64>)>,
    samples: usize,
    lines: usize,
    start_time: Option<i64>,
    end_time: Option<i64>,
    report: ParseReport,
}

impl ParseState {
    fn new(source: &str, options: ParseOptions) -> Self {
        Self {
            source: source.to_string(),
            options,
            header_line: String::new(),
            names: HashMap::new(),
            id_of: HashMap::new(),
            header_order: Vec::new(),
            buckets: HashMap::new(),
            samples: 0,
            lines: 1,
            start_time: None,
            end_time: None,
            report: ParseReport::default(),
        }
    }

    fn declare(&mut self, id: u32, full: &str, line_no: usize) {
        let name = SignalName::parse(full);

        match self.names.insert(id, name.clone()) {
            Some(previous) => {
                warn!(
                    "{}:{}: id {} redeclared as {:?} (was {:?})",
                    self.source, line_no, id, name.full, previous.full
                );
                self.report.duplicate_ids += 1;
                if self.id_of.get(&previous.full) == Some(&id) {
                    self.id_of.remove(&previous.full);
                }
            }
            None => self.header_order.push(id),
        }
        self.id_of.insert(name.full, id);
    }

    fn push(&mut self, timestamp: i64, id: u32, value: f64) {
        let bucket = self.buckets.entry(id).or_default();
        bucket.0.push(timestamp);
        bucket.1.push(value);

        self.samples += 1;
        self.start_time.get_or_insert(timestamp);
        self.end_time = Some(timestamp);
    }

    fn issue(&mut self, line: usize, kind: IssueKind, message: String) -> Result<()> {
        self.report.errors += 1;
        warn!("{}:{}: {}", self.source, line, message);

        if self.report.issues.len() < MAX_RECORDED_ISSUES {
            self.report.issues.push(ParseIssue { line, kind, message });
        }

        match self.options.max_errors {
            Some(limit) if self.report.errors > limit => Err(CanlogError::TooManyErrors {
                source_name: self.source.clone(),
                count: self.report.errors,
                limit,
            }),
            _ => Ok(()),
        }
    }

    fn finish(mut self) -> Result<SeriesStore> {
        let mut by_id = HashMap::with_capacity(self.header_order.len());
        let mut total_points = 0;

        for &id in &self.header_order {
            let (timestamps, values) = self.buckets.remove(&id).unwrap_or_default();
            if timestamps.is_empty() {
                warn!("{}: signal {} declared but has no data", self.source, id);
            }

            // logs are not ordered per id; a stable sort keeps duplicate timestamps in file order
            let mut order: Vec<usize> = (0..timestamps.len()).collect();
            order.sort_by_key(|&i| timestamps[i]);
            let timestamps: Vec<i64> = order.iter().map(|&i| timestamps[i]).collect();
            let values: Vec<f64> = order.iter().map(|&i| values[i]).collect();

            let name = &self.names[&id];
            let series = Series::new(
                id,
                name.short_name.clone(),
                name.description.clone(),
                timestamps,
                values,
            )?;
            total_points += series.len();
            by_id.insert(id, series);
        }

        self.report.lines = self.lines;
        info!(
            "Parsed {}: {} signals, {} samples, {} errors",
            self.source,
            by_id.len(),
            total_points,
            self.report.errors
        );

        Ok(SeriesStore {
            by_id,
            names: self.names,
            id_of: self.id_of,
            header_order: self.header_order,
            total_points,
            start_time: self.start_time,
            end_time: self.end_time,
            source: self.source,
            header_line: self.header_line,
            report: self.report,
        })
    }
}
