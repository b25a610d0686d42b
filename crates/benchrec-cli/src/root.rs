use std::path::{Path, PathBuf};

use benchrec_core::paths::BENCHMARKS_DIR;

/// Resolve the project root directory.
///
/// Priority:
/// 1. Positional directory / `--root` flag / `BENCHREC_ROOT` (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `benchmarks/`
/// 3. Walk upward from `cwd` looking for `.jj/` or `.git/`
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_root_from(explicit, &cwd)
}

fn resolve_root_from(explicit: Option<&Path>, cwd: &Path) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    if let Some(dir) = find_upward(cwd, |d| d.join(BENCHMARKS_DIR).is_dir()) {
        return dir;
    }

    if let Some(dir) = find_upward(cwd, |d| d.join(".jj").is_dir() || d.join(".git").is_dir()) {
        return dir;
    }

    cwd.to_path_buf()
}

fn find_upward(start: &Path, found: impl Fn(&Path) -> bool) -> Option<PathBuf> {
    start.ancestors().find(|d| found(d)).map(Path::to_path_buf)
}
