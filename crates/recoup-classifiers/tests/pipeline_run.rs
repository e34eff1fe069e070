use std::collections::HashSet;

use recoup_classifiers::config::{ModelType, PipelineConfig};
use recoup_classifiers::data_handling::{EncodedSplit, Record};
use recoup_classifiers::evaluation::EvaluationReport;
use recoup_classifiers::io::{read_records, write_records, CsvRecordSource};
use recoup_classifiers::models::FittedModel;
use recoup_classifiers::pipeline::Pipeline;
use recoup_classifiers::report::writer::{
    CONFUSION_PLOT_FILE, IMPACT_PLOT_FILE, IMPACT_TABLE_FILE, METRICS_FILE, MODEL_FILE,
    REPORT_FILE, ROC_PLOT_FILE, TEST_RECORDS_FILE, TRAIN_RECORDS_FILE,
};
use recoup_classifiers::report::{ArtifactWriter, FsArtifactWriter};
use recoup_classifiers::synthetic;
use recoup_classifiers::{RecoupError, Result};

fn quick_config(output_dir: &std::path::Path) -> PipelineConfig {
    PipelineConfig {
        output_dir: output_dir.to_path_buf(),
        seed: 42,
        train_fraction: 0.7,
        models: vec![
            ModelType::GradientBoosted {
                n_estimators: 20,
                learning_rate: 0.3,
                max_depth: 4,
                lambda: 1.0,
                gamma: 0.0,
                min_child_weight: 1.0,
                subsample: 1.0,
            },
            ModelType::RandomForest {
                n_estimators: 20,
                max_depth: Some(8),
                min_samples_split: 2,
                max_features: None,
            },
            ModelType::logistic_regression(),
        ],
        ..PipelineConfig::default()
    }
}

#[test]
fn full_run_writes_every_artifact() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("clientes_enriquecido.csv");
    let records = synthetic::generate(250, 42);
    write_records(&input, &records).unwrap();

    let out = dir.path().join("out");
    let writer = FsArtifactWriter::new(&out);
    let pipeline = Pipeline::new(quick_config(&out), &writer).unwrap();
    let outcome = pipeline.run(&CsvRecordSource::new(&input)).unwrap();

    assert!(!outcome.is_degraded());
    assert_eq!(outcome.backends.len(), 3);
    for file in [
        "X_train.csv",
        "y_train.csv",
        "X_test.csv",
        "y_test.csv",
        TRAIN_RECORDS_FILE,
        TEST_RECORDS_FILE,
    ] {
        assert!(out.join(file).is_file(), "missing {}", file);
    }
    for backend in ["gradient_boosted", "random_forest", "logistic_regression"] {
        for file in [
            MODEL_FILE,
            METRICS_FILE,
            IMPACT_TABLE_FILE,
            CONFUSION_PLOT_FILE,
            ROC_PLOT_FILE,
            IMPACT_PLOT_FILE,
            REPORT_FILE,
        ] {
            assert!(out.join(backend).join(file).is_file(), "missing {}/{}", backend, file);
        }
        let report = outcome.report(backend).unwrap();
        assert!((0.0..=1.0).contains(&report.auc));
        assert_eq!(report.confusion_matrix.total(), report.test_size);
    }

    let rf = outcome.report("random_forest").unwrap();
    let total: f64 = rf.impact.entries.iter().map(|e| e.score).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn split_partitions_cover_every_row_once() {
    let dir = tempfile::tempdir().unwrap();
    let writer = FsArtifactWriter::new(dir.path());
    let records = synthetic::generate(120, 5);
    let pipeline = Pipeline::new(quick_config(dir.path()), &writer).unwrap();
    let (data, errors) = pipeline.encode(&records).unwrap();
    assert!(errors.is_empty());

    let train: HashSet<usize> = data.split.train.rows.iter().copied().collect();
    let test: HashSet<usize> = data.split.test.rows.iter().copied().collect();
    assert!(train.is_disjoint(&test));
    assert_eq!(train.len() + test.len(), records.len());
    assert_eq!(data.split.train.x.ncols(), data.split.test.x.ncols());

    let x_train = std::fs::read_to_string(dir.path().join("X_train.csv")).unwrap();
    let header = x_train.lines().next().unwrap();
    assert_eq!(header, data.split.feature_names.join(","));
    assert!(header.ends_with("dias_em_atraso,valor_divida"));

    // untransformed partitions keep the original rows in partition order
    let train_records = read_records(dir.path().join(TRAIN_RECORDS_FILE)).unwrap();
    let test_records = read_records(dir.path().join(TEST_RECORDS_FILE)).unwrap();
    let expected: Vec<Record> = data
        .split
        .train
        .rows
        .iter()
        .map(|&i| records[i].clone())
        .collect();
    assert_eq!(train_records, expected);
    assert_eq!(test_records.len(), data.split.test.len());
    assert_eq!(test_records[0], records[data.split.test.rows[0]]);
}

#[test]
fn saved_model_reloads_and_predicts_identically() {
    let dir = tempfile::tempdir().unwrap();
    let records = synthetic::generate(200, 8);
    let writer = FsArtifactWriter::new(dir.path());
    let pipeline = Pipeline::new(quick_config(dir.path()), &writer).unwrap();
    let outcome = pipeline.run(&records).unwrap();

    for backend in &outcome.backends {
        let path = dir.path().join(&backend.backend).join(MODEL_FILE);
        let loaded = FittedModel::load(&path).unwrap();
        let before = backend.model.predict_records(&records).unwrap();
        let after = loaded.predict_records(&records).unwrap();
        for (a, b) in before.iter().zip(&after) {
            assert!((a - b).abs() < 1e-9, "{}: {} vs {}", backend.backend, a, b);
        }
    }
}

struct FailingReportWriter {
    inner: FsArtifactWriter,
}

impl ArtifactWriter for FailingReportWriter {
    fn write_model(&self, backend: &str, model: &FittedModel) -> Result<()> {
        self.inner.write_model(backend, model)
    }

    fn write_report(&self, backend: &str, _report: &EvaluationReport) -> Result<()> {
        Err(RecoupError::ArtifactWrite {
            path: self.inner.backend_dir(backend),
            message: "disk full".to_string(),
        })
    }

    fn write_encoded_split(&self, split: &EncodedSplit) -> Result<()> {
        self.inner.write_encoded_split(split)
    }

    fn write_record_split(&self, train: &[Record], test: &[Record]) -> Result<()> {
        self.inner.write_record_split(train, test)
    }
}

#[test]
fn write_failure_degrades_but_keeps_reports() {
    let dir = tempfile::tempdir().unwrap();
    let writer = FailingReportWriter {
        inner: FsArtifactWriter::new(dir.path()),
    };
    let mut config = quick_config(dir.path());
    config.models = vec![ModelType::logistic_regression()];
    let pipeline = Pipeline::new(config, &writer).unwrap();
    let outcome = pipeline.run(&synthetic::generate(100, 3)).unwrap();

    assert!(outcome.is_degraded());
    assert_eq!(outcome.artifact_errors.len(), 1);
    assert!(outcome.report("logistic_regression").is_some());
    assert!(dir.path().join("logistic_regression").join(MODEL_FILE).is_file());
}

#[test]
fn enriched_csv_round_trips_through_reader() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.csv");
    let records = synthetic::generate(30, 12);
    write_records(&path, &records).unwrap();
    assert_eq!(read_records(&path).unwrap(), records);
}

#[test]
fn single_class_input_is_insufficient() {
    let dir = tempfile::tempdir().unwrap();
    let writer = FsArtifactWriter::new(dir.path());
    let mut records = synthetic::generate(40, 2);
    for r in records.iter_mut() {
        r.response_positive = 0;
    }
    let pipeline = Pipeline::new(quick_config(dir.path()), &writer).unwrap();
    assert!(matches!(
        pipeline.run(&records),
        Err(RecoupError::InsufficientData(_))
    ));
}
