//! `generate` and `enrich`: producing record files.
use anyhow::{Context, Result};
use std::path::Path;

use recoup_classifiers::enrichment::enrich_all;
use recoup_classifiers::io::{read_raw_records, write_records};
use recoup_classifiers::synthetic;

pub fn run_generate(rows: usize, seed: u64, output: &Path, enrich: bool) -> Result<()> {
    if rows == 0 {
        anyhow::bail!("--rows must be positive");
    }
    let written = if enrich {
        write_records(output, &synthetic::generate(rows, seed))
    } else {
        write_records(output, &synthetic::generate_raw(rows, seed))
    };
    written.with_context(|| format!("Failed to write records to {}", output.display()))?;

    log::info!(
        "generated {} {} records (seed {}) into {}",
        rows,
        if enrich { "enriched" } else { "raw" },
        seed,
        output.display()
    );
    Ok(())
}

pub fn run_enrich(raw_path: &Path, output: &Path) -> Result<()> {
    let raw = read_raw_records(raw_path)
        .with_context(|| format!("Failed to read raw records from {}", raw_path.display()))?;
    let records = enrich_all(&raw);
    let positives = records.iter().filter(|r| r.response_positive == 1).count();
    write_records(output, &records)
        .with_context(|| format!("Failed to write enriched records to {}", output.display()))?;

    log::info!(
        "enriched {} records ({} positive responses) into {}",
        records.len(),
        positives,
        output.display()
    );
    Ok(())
}
