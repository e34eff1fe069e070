//! `encode` and `train`: runs of the pipeline over a CSV record file.
use anyhow::{Context, Result};

use recoup_classifiers::config::PipelineConfig;
use recoup_classifiers::io::CsvRecordSource;
use recoup_classifiers::pipeline::{Pipeline, RunOutcome};
use recoup_classifiers::report::FsArtifactWriter;

fn fail_if_degraded(what: &str, errors: &[recoup_classifiers::RecoupError]) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    for e in errors {
        log::error!("{}", e);
    }
    anyhow::bail!("{} finished but {} artifact write(s) failed", what, errors.len())
}

pub fn run_encode(config: PipelineConfig) -> Result<()> {
    let writer = FsArtifactWriter::new(&config.output_dir);
    let source = CsvRecordSource::new(&config.input_path);
    let pipeline = Pipeline::new(config, &writer)?;

    let (data, artifact_errors) = pipeline
        .encode(&source)
        .with_context(|| format!("Failed to encode {}", source.path().display()))?;
    fail_if_degraded("encoding", &artifact_errors)?;

    log::info!(
        "encoded {} features into {}",
        data.split.feature_names.len(),
        writer.root().display()
    );
    Ok(())
}

pub fn run_train(config: PipelineConfig) -> Result<RunOutcome> {
    let writer = FsArtifactWriter::new(&config.output_dir);
    let source = CsvRecordSource::new(&config.input_path);
    let pipeline = Pipeline::new(config, &writer)?;

    let outcome = pipeline
        .run(&source)
        .with_context(|| format!("Training on {} failed", source.path().display()))?;

    for backend in &outcome.backends {
        let report = &backend.report;
        let cm = &report.confusion_matrix;
        log::info!(
            "{:<22} accuracy {:.3}  AUC {:.3}  tn {} fp {} fn {} tp {}",
            report.display_name,
            report.classification.accuracy,
            report.auc,
            cm.tn,
            cm.fp,
            cm.fn_,
            cm.tp
        );
    }
    fail_if_degraded("training", &outcome.artifact_errors)?;
    Ok(outcome)
}
