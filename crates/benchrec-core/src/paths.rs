use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const BENCHMARKS_DIR: &str = "benchmarks";
pub const CONFIG_FILE: &str = "benchrec.yaml";

/// Suffix of the append-only result log kept next to each benchmark source.
pub const LOG_EXTENSION: &str = "benchmark";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn benchmarks_dir(root: &Path, relative: &Path) -> PathBuf {
    root.join(relative)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// `<dir>/<name>.benchmark`
pub fn log_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{LOG_EXTENSION}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/benchrec.yaml")
        );
        assert_eq!(
            benchmarks_dir(root, Path::new(BENCHMARKS_DIR)),
            PathBuf::from("/tmp/proj/benchmarks")
        );
        assert_eq!(
            log_path(Path::new("/tmp/proj/benchmarks"), "fib"),
            PathBuf::from("/tmp/proj/benchmarks/fib.benchmark")
        );
    }

    #[test]
    fn absolute_benchmarks_dir_replaces_root() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            benchmarks_dir(root, Path::new("/srv/bench")),
            PathBuf::from("/srv/bench")
        );
    }
}
