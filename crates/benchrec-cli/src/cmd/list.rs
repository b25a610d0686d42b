use anyhow::Context;
use benchrec_core::{config::Config, discovery, history};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::output::{print_json, print_table};

#[derive(Serialize)]
struct ListedBenchmark {
    name: String,
    script: PathBuf,
    log: PathBuf,
    records: usize,
    last_elapsed: Option<String>,
}

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let dir = config.benchmarks_path(root);
    let defs = discovery::discover(&dir, &config.source_extension)
        .with_context(|| format!("cannot list benchmarks in {}", root.display()))?;

    let mut listed = Vec::with_capacity(defs.len());
    for def in defs {
        let log = def.log_path();
        let records = history::read(&log)
            .with_context(|| format!("failed to read {}", log.display()))?;
        listed.push(ListedBenchmark {
            last_elapsed: records.last().map(|r| r.elapsed.to_string()),
            records: records.len(),
            name: def.name,
            script: def.script,
            log,
        });
    }

    if json {
        return print_json(&listed);
    }

    if listed.is_empty() {
        println!(
            "No *.{} benchmarks in {}",
            config.source_extension,
            dir.display()
        );
        return Ok(());
    }

    let rows: Vec<Vec<String>> = listed
        .iter()
        .map(|b| {
            vec![
                b.name.clone(),
                b.records.to_string(),
                b.last_elapsed.clone().unwrap_or_else(|| "-".to_string()),
                b.script.display().to_string(),
            ]
        })
        .collect();
    print_table(&["BENCHMARK", "RECORDS", "LAST", "SCRIPT"], &rows);
    Ok(())
}
