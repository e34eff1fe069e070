use recoup_classifiers::config::{ModelConfig, ModelType};
use recoup_classifiers::data_handling::Record;
use recoup_classifiers::evaluation::{evaluate, ImpactMeasure};
use recoup_classifiers::pipeline::{prepare, train_and_evaluate};
use recoup_classifiers::preprocessing::fit_encoder;

fn record(id: u64, days: u32, positive: bool) -> Record {
    Record {
        client_id: id,
        days_overdue: days,
        debt_value: 1000.0,
        channel: Some("SMS".to_string()),
        response: Some(if positive { "Prometeu pagar" } else { "Ignorou" }.to_string()),
        risk_band: Some("Baixo".to_string()),
        delay_band: Some("<15 dias".to_string()),
        response_positive: positive as u8,
        channel_group: Some("Digital".to_string()),
        value_band: Some("Médio".to_string()),
    }
}

/// Positives are contacted early, negatives late, with a wide gap between.
fn separable_records() -> Vec<Record> {
    let mut records = Vec::new();
    for i in 0..20u32 {
        records.push(record(i as u64, 1 + i, true));
        records.push(record(100 + i as u64, 81 + i, false));
    }
    records
}

#[test]
fn separable_data_gives_perfect_logistic_evaluation() {
    let data = prepare(&separable_records(), 0.7, 42).unwrap();
    // single-level categorical columns contribute nothing
    assert_eq!(
        data.split.feature_names,
        vec!["dias_em_atraso".to_string(), "valor_divida".to_string()]
    );

    let (_, report) =
        train_and_evaluate(&data, ModelConfig::new(42, ModelType::logistic_regression())).unwrap();

    assert!((report.auc - 1.0).abs() < 1e-12);
    assert_eq!(report.confusion_matrix.fp, 0);
    assert_eq!(report.confusion_matrix.fn_, 0);
    assert_eq!(report.confusion_matrix.total(), data.split.test.len());
    assert_eq!(report.impact.measure, ImpactMeasure::OddsChange);
    // earlier contact raises the odds, so the days coefficient is negative
    let days = report
        .impact
        .entries
        .iter()
        .find(|e| e.feature == "dias_em_atraso")
        .unwrap();
    assert!(days.coefficient.unwrap() < 0.0);
    assert!(days.score < 0.0);
}

#[test]
fn tree_backends_rank_ascending_and_stay_in_bounds() {
    let data = prepare(&separable_records(), 0.7, 7).unwrap();
    let configs = [
        ModelConfig::new(
            7,
            ModelType::GradientBoosted {
                n_estimators: 10,
                learning_rate: 0.3,
                max_depth: 3,
                lambda: 1.0,
                gamma: 0.0,
                min_child_weight: 1.0,
                subsample: 1.0,
            },
        ),
        ModelConfig::new(
            7,
            ModelType::RandomForest {
                n_estimators: 20,
                max_depth: None,
                min_samples_split: 2,
                max_features: None,
            },
        ),
    ];
    for params in configs {
        let (_, report) = train_and_evaluate(&data, params).unwrap();
        assert!((0.0..=1.0).contains(&report.auc));
        assert_eq!(report.confusion_matrix.total(), report.test_size);
        let scores: Vec<f64> = report.impact.entries.iter().map(|e| e.score).collect();
        assert!(scores.windows(2).all(|w| w[0] <= w[1]), "{:?}", scores);
        if report.impact.measure == ImpactMeasure::GiniImportance {
            assert!((scores.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }
}

#[test]
fn evaluation_rejects_mismatched_labels() {
    let data = prepare(&separable_records(), 0.7, 1).unwrap();
    let (model, _) =
        train_and_evaluate(&data, ModelConfig::new(1, ModelType::logistic_regression())).unwrap();
    let too_few = &data.split.test.y[1..];
    assert!(evaluate(&model, &data.split.test.x, too_few).is_err());
}

#[test]
fn encoder_is_fitted_on_training_rows_only() {
    let mut records = separable_records();
    // one test-only channel would add a column if the encoder saw every row
    records[0].channel = Some("Assessoria".to_string());
    let data = prepare(&records, 0.7, 3).unwrap();
    let in_train = data.split.train.rows.contains(&0);
    let full = fit_encoder(&records).unwrap();
    if in_train {
        assert_eq!(data.encoder.n_features(), full.n_features());
    } else {
        assert_eq!(data.encoder.n_features() + 1, full.n_features());
    }
}
