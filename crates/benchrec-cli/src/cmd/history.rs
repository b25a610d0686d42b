use anyhow::Context;
use benchrec_core::{config::Config, history, paths};
use std::path::Path;

use crate::output::{print_json, print_table};

pub fn run(root: &Path, name: &str, last: Option<usize>, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let log = paths::log_path(&config.benchmarks_path(root), name);
    if !log.exists() {
        anyhow::bail!("no history for '{name}' (expected {})", log.display());
    }

    let records = match last {
        Some(n) => history::last(&log, n),
        None => history::read(&log),
    }
    .with_context(|| format!("failed to read {}", log.display()))?;

    if json {
        return print_json(&records);
    }

    if records.is_empty() {
        println!("No records for '{name}'.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.timestamp.clone(),
                r.revision.to_string(),
                r.elapsed.to_string(),
            ]
        })
        .collect();
    print_table(&["TIMESTAMP", "REVISION", "ELAPSED"], &rows);
    Ok(())
}
