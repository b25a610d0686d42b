use crate::error::{BenchError, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `YYYY-MM-DD_HH:MM:SS`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn now_timestamp() -> String {
    format_timestamp(&Local::now())
}

// ---------------------------------------------------------------------------
// RevisionToken
// ---------------------------------------------------------------------------

/// Working-copy identifier, e.g. `kxqvpsro 1a2b3c4d`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionToken(String);

impl RevisionToken {
    /// Join `fields` with single spaces. Empty or blank input gives `None`.
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let joined = fields
            .into_iter()
            .filter(|f| !f.trim().is_empty())
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            None
        } else {
            Some(Self(joined))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Elapsed
// ---------------------------------------------------------------------------

/// User CPU time exactly as the timing facility printed it (`0m0.512s`,
/// `0.512s`, `0.51`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Elapsed(String);

impl Elapsed {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One line of a benchmark log: `<timestamp> <revision> <elapsed>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: String,
    pub revision: RevisionToken,
    pub elapsed: Elapsed,
}

impl Record {
    pub fn new(timestamp: impl Into<String>, revision: RevisionToken, elapsed: Elapsed) -> Self {
        Self {
            timestamp: timestamp.into(),
            revision,
            elapsed,
        }
    }

    pub fn to_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.timestamp, self.revision, self.elapsed)
    }
}

impl std::str::FromStr for Record {
    type Err = BenchError;

    /// First token is the timestamp, last is the elapsed time, everything in
    /// between is the revision.
    fn from_str(line: &str) -> Result<Self> {
        let invalid = || BenchError::InvalidRecord(line.to_string());
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let [timestamp, middle @ .., elapsed] = tokens.as_slice() else {
            return Err(invalid());
        };
        NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).map_err(|_| invalid())?;
        let revision = RevisionToken::from_fields(middle.iter().copied()).ok_or_else(invalid)?;
        Ok(Record::new(*timestamp, revision, Elapsed::new(*elapsed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn rev(s: &str) -> RevisionToken {
        RevisionToken::from_fields(s.split_whitespace()).unwrap()
    }

    #[test]
    fn timestamp_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap();
        assert_eq!(format_timestamp(&at), "2024-03-09_07:05:02");
    }

    #[test]
    fn now_timestamp_parses_back() {
        let ts = now_timestamp();
        assert!(NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT).is_ok(), "{ts}");
    }

    #[test]
    fn record_line_layout() {
        let record = Record::new("2024-03-09_07:05:02", rev("abc123 4"), Elapsed::new("0.512s"));
        assert_eq!(record.to_line(), "2024-03-09_07:05:02 abc123 4 0.512s");
    }

    #[test]
    fn record_parses_its_own_line() {
        let line = "2024-03-09_07:05:02 abc123 4 0m1.250s";
        let record: Record = line.parse().unwrap();
        assert_eq!(record.timestamp, "2024-03-09_07:05:02");
        assert_eq!(record.revision.as_str(), "abc123 4");
        assert_eq!(record.elapsed.as_str(), "0m1.250s");
        assert_eq!(record.to_line(), line);
    }

    #[test]
    fn record_rejects_malformed_lines() {
        for line in [
            "",
            "2024-03-09_07:05:02",
            "2024-03-09_07:05:02 0.5s",
            "yesterday abc 4 0.5s",
        ] {
            assert!(line.parse::<Record>().is_err(), "expected invalid: {line:?}");
        }
    }

    #[test]
    fn revision_token_collapses_whitespace() {
        assert_eq!(rev("  kx   1a2b ").as_str(), "kx 1a2b");
        assert!(RevisionToken::from_fields(["", "  "]).is_none());
    }
}
