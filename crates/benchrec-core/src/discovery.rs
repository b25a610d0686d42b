use crate::error::{BenchError, Result};
use crate::paths;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One benchmark script found in the benchmarks directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenchmarkDefinition {
    /// File stem of the script, e.g. `fib` for `fib.py`.
    pub name: String,
    pub script: PathBuf,
}

impl BenchmarkDefinition {
    /// Result log for this benchmark, next to its script.
    pub fn log_path(&self) -> PathBuf {
        let dir = self.script.parent().unwrap_or(Path::new("."));
        paths::log_path(dir, &self.name)
    }
}

/// Scan `dir` for files ending in `.<extension>`, sorted by name.
///
/// The scan is repeated on every call; nothing is cached between runs.
pub fn discover(dir: &Path, extension: &str) -> Result<Vec<BenchmarkDefinition>> {
    if !dir.is_dir() {
        return Err(BenchError::BenchmarksDirMissing(dir.to_path_buf()));
    }

    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            tracing::warn!(path = %path.display(), "skipping non-UTF8 benchmark file name");
            continue;
        };
        if name.is_empty() {
            continue;
        }
        found.push(BenchmarkDefinition {
            name: name.to_string(),
            script: path.clone(),
        });
    }

    found.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::debug!(dir = %dir.display(), count = found.len(), "discovered benchmarks");
    Ok(found)
}

/// Keep only the benchmarks named in `only`, in discovery order.
/// An empty filter keeps everything; a name with no match is an error.
pub fn select(
    definitions: Vec<BenchmarkDefinition>,
    only: &[String],
) -> Result<Vec<BenchmarkDefinition>> {
    if only.is_empty() {
        return Ok(definitions);
    }
    if let Some(missing) = only
        .iter()
        .find(|name| !definitions.iter().any(|d| &d.name == *name))
    {
        return Err(BenchError::UnknownBenchmark(missing.clone()));
    }
    Ok(definitions
        .into_iter()
        .filter(|d| only.contains(&d.name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), "").unwrap();
    }

    fn names(defs: &[BenchmarkDefinition]) -> Vec<&str> {
        defs.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn finds_only_matching_extension_sorted() {
        let dir = TempDir::new().unwrap();
        for f in ["sort.py", "fib.py", "fib.benchmark", "notes.txt", "bouncy.py"] {
            touch(dir.path(), f);
        }
        std::fs::create_dir(dir.path().join("nested.py")).unwrap();

        let defs = discover(dir.path(), "py").unwrap();
        assert_eq!(names(&defs), vec!["bouncy", "fib", "sort"]);
        assert_eq!(defs[1].script, dir.path().join("fib.py"));
    }

    #[test]
    fn discovery_is_repeatable() {
        let dir = TempDir::new().unwrap();
        for f in ["b.py", "c.py", "a.py"] {
            touch(dir.path(), f);
        }
        let first = discover(dir.path(), "py").unwrap();
        let second = discover(dir.path(), "py").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_dir_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = discover(&dir.path().join("benchmarks"), "py").unwrap_err();
        assert!(matches!(err, BenchError::BenchmarksDirMissing(_)));
    }

    #[test]
    fn empty_dir_yields_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(discover(dir.path(), "py").unwrap().is_empty());
    }

    #[test]
    fn log_path_sits_next_to_script() {
        let def = BenchmarkDefinition {
            name: "fib".to_string(),
            script: PathBuf::from("/proj/benchmarks/fib.py"),
        };
        assert_eq!(
            def.log_path(),
            PathBuf::from("/proj/benchmarks/fib.benchmark")
        );
    }

    #[test]
    fn select_filters_and_rejects_unknown() {
        let dir = TempDir::new().unwrap();
        for f in ["a.py", "b.py", "c.py"] {
            touch(dir.path(), f);
        }
        let defs = discover(dir.path(), "py").unwrap();

        let picked = select(defs.clone(), &["c".to_string(), "a".to_string()]).unwrap();
        assert_eq!(names(&picked), vec!["a", "c"]);

        let all = select(defs.clone(), &[]).unwrap();
        assert_eq!(all.len(), 3);

        let err = select(defs, &["zzz".to_string()]).unwrap_err();
        assert!(matches!(err, BenchError::UnknownBenchmark(n) if n == "zzz"));
    }
}
