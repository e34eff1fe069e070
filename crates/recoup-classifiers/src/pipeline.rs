//! End-to-end run: load records, split, encode, then fit, evaluate and
//! persist every configured backend.
//!
//! The encoder is fitted on the training partition only and the same fitted
//! encoder transforms both partitions. Training and evaluation errors abort
//! the run. Artifact write failures are logged and collected; the run still
//! returns its in-memory reports and is marked degraded.

use crate::config::{ModelConfig, PipelineConfig};
use crate::data_handling::{self, EncodedSplit, Partition, Record, SplitPlan};
use crate::error::{RecoupError, Result};
use crate::evaluation::{self, EvaluationReport};
use crate::io::RecordSource;
use crate::models::{build_model, ClassifierModel, FittedModel};
use crate::preprocessing::{fit_encoder, FittedEncoder};
use crate::report::ArtifactWriter;

/// Records split, encoded and ready for fitting.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub encoder: FittedEncoder,
    pub split: EncodedSplit,
}

/// Stratify `records`, fit the encoder on the train side and encode both sides.
pub fn prepare(records: &[Record], train_fraction: f64, seed: u64) -> Result<PreparedData> {
    let labels = data_handling::labels(records);
    data_handling::log_label_summary(&labels);

    let plan = SplitPlan::stratified(&labels, train_fraction, seed)?;
    let (train_records, test_records) = plan.select(records);
    let (y_train, y_test) = plan.select(&labels);

    let encoder = fit_encoder(&train_records)?;
    let x_train = encoder.transform(&train_records)?;
    let x_test = encoder.transform(&test_records)?;
    log::info!(
        "encoded {} train / {} test rows into {} features",
        x_train.nrows(),
        x_test.nrows(),
        encoder.n_features()
    );

    let split = EncodedSplit {
        feature_names: encoder.feature_names().to_vec(),
        train: Partition {
            x: x_train,
            y: y_train,
            rows: plan.train,
        },
        test: Partition {
            x: x_test,
            y: y_test,
            rows: plan.test,
        },
    };
    Ok(PreparedData { encoder, split })
}

/// Fit one backend on the train partition and evaluate it on the test partition.
pub fn train_and_evaluate(
    data: &PreparedData,
    params: ModelConfig,
) -> Result<(FittedModel, EvaluationReport)> {
    let mut classifier = build_model(params)?;
    log::info!(
        "{}: fitting on {} rows ({} positive)",
        classifier.name(),
        data.split.train.len(),
        data.split.train.positives()
    );
    classifier.fit(&data.split.train.x, &data.split.train.y)?;

    let model = FittedModel::new(data.encoder.clone(), classifier)?;
    let report = evaluation::evaluate(&model, &data.split.test.x, &data.split.test.y)?;
    Ok((model, report))
}

/// Result of one backend within a run.
#[derive(Debug, Clone)]
pub struct BackendOutcome {
    pub backend: String,
    pub model: FittedModel,
    pub report: EvaluationReport,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub backends: Vec<BackendOutcome>,
    /// Artifact writes that failed; non-empty means the run is degraded.
    pub artifact_errors: Vec<RecoupError>,
}

impl RunOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.artifact_errors.is_empty()
    }

    pub fn report(&self, backend: &str) -> Option<&EvaluationReport> {
        self.backends
            .iter()
            .find(|b| b.backend == backend)
            .map(|b| &b.report)
    }
}

pub struct Pipeline<'a> {
    config: PipelineConfig,
    writer: &'a dyn ArtifactWriter,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: PipelineConfig, writer: &'a dyn ArtifactWriter) -> Result<Self> {
        config.validate()?;
        Ok(Pipeline { config, writer })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn load(&self, source: &dyn RecordSource) -> Result<Vec<Record>> {
        log::info!("loading records from {}", source.describe());
        let records = source.load()?;
        if records.is_empty() {
            return Err(RecoupError::InsufficientData(format!(
                "{} contains no records",
                source.describe()
            )));
        }
        Ok(records)
    }

    fn record_write(errors: &mut Vec<RecoupError>, what: &str, result: Result<()>) {
        if let Err(e) = result {
            log::error!("failed to write {}: {}", what, e);
            errors.push(e);
        }
    }

    /// Split, encode and persist both the encoded and the untransformed
    /// partitions without training.
    pub fn encode(&self, source: &dyn RecordSource) -> Result<(PreparedData, Vec<RecoupError>)> {
        let records = self.load(source)?;
        let data = prepare(&records, self.config.train_fraction, self.config.seed)?;
        let mut artifact_errors = Vec::new();
        Self::record_write(
            &mut artifact_errors,
            "encoded split",
            self.writer.write_encoded_split(&data.split),
        );
        let pick = |rows: &[usize]| -> Vec<Record> {
            rows.iter().map(|&i| records[i].clone()).collect()
        };
        Self::record_write(
            &mut artifact_errors,
            "record split",
            self.writer
                .write_record_split(&pick(&data.split.train.rows), &pick(&data.split.test.rows)),
        );
        Ok((data, artifact_errors))
    }

    /// Full run over every configured backend, in configuration order.
    pub fn run(&self, source: &dyn RecordSource) -> Result<RunOutcome> {
        let (data, mut artifact_errors) = self.encode(source)?;

        let mut backends = Vec::with_capacity(self.config.models.len());
        for model_type in &self.config.models {
            let params = self.config.model_config(model_type);
            let (model, report) = train_and_evaluate(&data, params)?;
            let backend = model_type.name();

            Self::record_write(
                &mut artifact_errors,
                &format!("{} model", backend),
                self.writer.write_model(backend, &model),
            );
            Self::record_write(
                &mut artifact_errors,
                &format!("{} report", backend),
                self.writer.write_report(backend, &report),
            );

            backends.push(BackendOutcome {
                backend: backend.to_string(),
                model,
                report,
            });
        }

        if !artifact_errors.is_empty() {
            log::warn!(
                "run finished degraded: {} artifact write(s) failed",
                artifact_errors.len()
            );
        }
        Ok(RunOutcome {
            backends,
            artifact_errors,
        })
    }
}
