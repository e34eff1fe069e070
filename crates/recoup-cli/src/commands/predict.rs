use anyhow::{Context, Result};
use std::path::Path;

use recoup_classifiers::data_handling::Record;
use recoup_classifiers::enrichment::enrich_all;
use recoup_classifiers::evaluation::predict_labels;
use recoup_classifiers::io::{read_raw_records, read_records, write_predictions};
use recoup_classifiers::models::FittedModel;

/// Score every record in `data_path` and write `cliente_id,probabilidade,previsao`.
///
/// Categorical levels the model never saw encode to all-zero columns and are
/// scored normally.
pub fn run_predict(model_path: &Path, data_path: &Path, output: &Path, raw: bool) -> Result<()> {
    let model = FittedModel::load(model_path)
        .with_context(|| format!("Failed to load model {}", model_path.display()))?;

    let records: Vec<Record> = if raw {
        enrich_all(&read_raw_records(data_path).with_context(|| {
            format!("Failed to read raw records from {}", data_path.display())
        })?)
    } else {
        read_records(data_path)
            .with_context(|| format!("Failed to read records from {}", data_path.display()))?
    };

    let probabilities = model.predict_records(&records)?;
    let predicted = predict_labels(&probabilities);
    write_predictions(output, &records, &probabilities, &predicted)
        .with_context(|| format!("Failed to write predictions to {}", output.display()))?;

    log::info!(
        "scored {} records with {} ({} predicted positive) into {}",
        records.len(),
        model.classifier().params().model_type.display_name(),
        predicted.iter().filter(|&&p| p == 1).count(),
        output.display()
    );
    Ok(())
}
