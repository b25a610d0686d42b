use crate::error::Result;
use std::io::Write;
use std::path::Path;

/// Append `line` plus a trailing newline to `path`, creating the file if needed.
///
/// The whole line goes out in one `write_all` on an append-mode handle so an
/// interrupted process never leaves half a record behind.
pub fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    f.write_all(buf.as_bytes())?;
    f.flush()?;
    Ok(())
}

/// Read a file's lines, returning an empty list if it doesn't exist.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(content.lines().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn append_line_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fib.benchmark");
        append_line(&path, "a b c").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a b c\n");
    }

    #[test]
    fn append_line_appends_to_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fib.benchmark");
        std::fs::write(&path, "first\n").unwrap();
        append_line(&path, "second").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "first\nsecond\n"
        );
    }

    #[test]
    fn append_line_fails_in_missing_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope/fib.benchmark");
        assert!(append_line(&path, "x").is_err());
    }

    #[test]
    fn read_lines_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let lines = read_lines(&dir.path().join("absent")).unwrap();
        assert!(lines.is_empty());
    }
}
