//! Reading back the append-only benchmark logs.

use crate::error::Result;
use crate::io;
use crate::record::Record;
use std::path::Path;

/// Parse every well-formed record in `log`. Malformed lines are skipped with
/// a warning; a missing log is an empty history.
pub fn read(log: &Path) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for (idx, line) in io::read_lines(log)?.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Record>() {
            Ok(r) => records.push(r),
            Err(_) => tracing::warn!(
                log = %log.display(),
                line = idx + 1,
                "skipping malformed record"
            ),
        }
    }
    Ok(records)
}

/// The most recent `n` records, oldest first.
pub fn last(log: &Path, n: usize) -> Result<Vec<Record>> {
    let mut records = read(log)?;
    let skip = records.len().saturating_sub(n);
    Ok(records.split_off(skip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LOG: &str = "\
2024-01-01_10:00:00 aaa 1 0.500s
garbage line
2024-01-02_10:00:00 bbb 2 0.400s

2024-01-03_10:00:00 ccc 3 0.300s
";

    #[test]
    fn read_skips_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fib.benchmark");
        std::fs::write(&path, LOG).unwrap();

        let records = read(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].revision.as_str(), "aaa 1");
        assert_eq!(records[2].elapsed.as_str(), "0.300s");
    }

    #[test]
    fn last_keeps_newest_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fib.benchmark");
        std::fs::write(&path, LOG).unwrap();

        let tail = last(&path, 2).unwrap();
        let revs: Vec<_> = tail.iter().map(|r| r.revision.as_str()).collect();
        assert_eq!(revs, vec!["bbb 2", "ccc 3"]);
        assert_eq!(last(&path, 10).unwrap().len(), 3);
    }

    #[test]
    fn missing_log_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(read(&dir.path().join("none.benchmark")).unwrap().is_empty());
    }
}
