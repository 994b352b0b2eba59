// Line grammar and metadata structures for telemetry logs

use serde::{Deserialize, Serialize};

use crate::core::constants::{FIELD_SEPARATOR, HEADER_SEPARATOR, VALUE_PREFIX};

/// A signal's header name, split into its description and short name.
///
/// Header names usually read `"Pack Voltage (ams.pack.voltage)"`; names
/// without a trailing parenthesised part use the whole name for both fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalName {
    pub full: String,
    pub description: String,
    pub short_name: String,
}

impl SignalName {
    pub fn parse(full: &str) -> Self {
        let s = full.trim();

        if s.ends_with(')') {
            if let Some(left) = s.rfind('(') {
                let description = s[..left].trim_end();
                let short_name = s[left + 1..s.len() - 1].trim();
                if !short_name.is_empty() {
                    return Self {
                        full: s.to_string(),
                        description: if description.is_empty() {
                            short_name.to_string()
                        } else {
                            description.to_string()
                        },
                        short_name: short_name.to_string(),
                    };
                }
            }
        }

        Self {
            full: s.to_string(),
            description: s.to_string(),
            short_name: s.to_string(),
        }
    }

    /// Whether `query` refers to this signal by its short or full name.
    pub fn matches_exactly(&self, query: &str) -> bool {
        self.short_name == query || self.full == query
    }

    /// Whether `query` appears in the full name, parenthesised or verbatim.
    pub fn contains(&self, query: &str) -> bool {
        self.full.contains(&format!("({})", query)) || self.full.contains(query)
    }
}

/// Listing entry for one parsed signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalInfo {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub points: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderPair {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataRow {
    pub timestamp: i64,
    pub id: u32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogLine {
    Header(HeaderPair),
    Data(DataRow),
    Blank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MalformedHeader,
    MalformedRow,
    UnknownId,
}

/// A row-level problem: the row was skipped and parsing went on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseIssue {
    pub line: usize,
    pub kind: IssueKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseReport {
    pub lines: usize,
    pub errors: usize,
    pub duplicate_ids: usize,
    pub issues: Vec<ParseIssue>,
}

impl ParseReport {
    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }
}

/// Classify one log line (the informational first line excluded).
pub fn parse_line(line: &str) -> std::result::Result<LogLine, (IssueKind, String)> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(LogLine::Blank);
    }

    if let Some(rest) = line.strip_prefix(VALUE_PREFIX) {
        return parse_header(rest).map(LogLine::Header);
    }

    parse_data(line).map(LogLine::Data)
}

fn parse_header(rest: &str) -> std::result::Result<HeaderPair, (IssueKind, String)> {
    let malformed = |msg: String| (IssueKind::MalformedHeader, msg);

    let (left, right) = rest
        .trim()
        .split_once(HEADER_SEPARATOR)
        .ok_or_else(|| malformed(format!("missing '{}' in header pair", HEADER_SEPARATOR.trim())))?;
    let (left, right) = (left.trim(), right.trim());

    // "Value <id>: <name>", or the older "Value <name>: <id>"
    let (id, name) = match (left.parse::<u32>(), right.parse::<u32>()) {
        (Ok(id), _) => (id, right),
        (Err(_), Ok(id)) => (id, left),
        (Err(e), Err(_)) => return Err(malformed(format!("no integer id in header pair: {}", e))),
    };

    let name = unquote(name);
    if name.is_empty() {
        return Err(malformed(format!("empty name for id {}", id)));
    }

    Ok(HeaderPair {
        id,
        name: name.to_string(),
    })
}

fn parse_data(line: &str) -> std::result::Result<DataRow, (IssueKind, String)> {
    let malformed = |msg: String| (IssueKind::MalformedRow, msg);

    let mut fields = line.split(FIELD_SEPARATOR).map(str::trim);
    let (ts, id, value) = match (fields.next(), fields.next(), fields.next()) {
        (Some(ts), Some(id), Some(value)) => (ts, id, value),
        _ => return Err(malformed(format!("expected timestamp,id,value: {:?}", line))),
    };

    let timestamp = ts
        .parse::<i64>()
        .map_err(|e| malformed(format!("bad timestamp {:?}: {}", ts, e)))?;
    if timestamp < 0 {
        return Err(malformed(format!("negative timestamp {}", timestamp)));
    }
    let id = id
        .parse::<u32>()
        .map_err(|e| malformed(format!("bad id {:?}: {}", id, e)))?;
    let value = value
        .parse::<f64>()
        .map_err(|e| malformed(format!("bad value {:?}: {}", value, e)))?;

    Ok(DataRow { timestamp, id, value })
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(s)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_name_with_short_name() {
        let name = SignalName::parse("Pack Voltage (ams.pack.voltage)");
        assert_eq!(name.description, "Pack Voltage");
        assert_eq!(name.short_name, "ams.pack.voltage");
        assert!(name.matches_exactly("ams.pack.voltage"));
        assert!(name.contains("pack.voltage"));
    }

    #[test]
    fn test_signal_name_without_parens() {
        let name = SignalName::parse("wheelSpeed");
        assert_eq!(name.description, "wheelSpeed");
        assert_eq!(name.short_name, "wheelSpeed");
        assert!(!name.contains("Speed (x)"));
    }

    #[test]
    fn test_parse_header_both_orders() {
        let expected = LogLine::Header(HeaderPair {
            id: 7,
            name: "Pack Voltage (ams.pack.voltage)".to_string(),
        });
        assert_eq!(parse_line("Value 7: Pack Voltage (ams.pack.voltage)").unwrap(), expected);
        assert_eq!(parse_line("Value Pack Voltage (ams.pack.voltage): 7").unwrap(), expected);
        assert_eq!(parse_line("Value 7: \"Pack Voltage (ams.pack.voltage)\"").unwrap(), expected);
    }

    #[test]
    fn test_parse_data_row() {
        assert_eq!(
            parse_line("1000,1,400.5\n").unwrap(),
            LogLine::Data(DataRow {
                timestamp: 1000,
                id: 1,
                value: 400.5
            })
        );
        assert_eq!(parse_line("   ").unwrap(), LogLine::Blank);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_line("Value foo bar").unwrap_err().0, IssueKind::MalformedHeader);
        assert_eq!(parse_line("Value a: b").unwrap_err().0, IssueKind::MalformedHeader);
        assert_eq!(parse_line("1000,1").unwrap_err().0, IssueKind::MalformedRow);
        assert_eq!(parse_line("-5,1,2.0").unwrap_err().0, IssueKind::MalformedRow);
        assert_eq!(parse_line("1000,x,2.0").unwrap_err().0, IssueKind::MalformedRow);
        assert_eq!(parse_line("1000,1,volts").unwrap_err().0, IssueKind::MalformedRow);
    }
}
