//! Held-out evaluation of a fitted model.
//!
//! `evaluate` is pure: it scores the test partition, derives every metric and
//! the feature-impact ranking, and returns them as an [`EvaluationReport`].
//! Persisting the report is left to an `ArtifactWriter`.

use serde::Serialize;

use crate::error::{RecoupError, Result};
use crate::math::Array2;
use crate::models::{ClassifierModel, FeatureImpact, FittedModel};
use crate::stats::{self, ClassificationReport, ConfusionMatrix, RocCurve};

/// Probability above which a row is predicted positive.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// What an [`ImpactEntry::score`] measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactMeasure {
    /// Total split gain (gradient boosting).
    Gain,
    /// Normalized mean impurity decrease (random forest).
    GiniImportance,
    /// `exp(coefficient) - 1`: relative change in the odds of a positive
    /// response per unit increase of the feature (logistic regression).
    OddsChange,
}

impl ImpactMeasure {
    pub fn label(&self) -> &'static str {
        match self {
            ImpactMeasure::Gain => "importance",
            ImpactMeasure::GiniImportance => "importance",
            ImpactMeasure::OddsChange => "impact_percentage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactEntry {
    pub feature: String,
    pub score: f64,
    /// Log-odds coefficient, logistic regression only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coefficient: Option<f64>,
}

/// Feature impact paired with feature names and ordered for display:
/// ascending importance for tree ensembles, descending odds change for
/// logistic regression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactRanking {
    pub measure: ImpactMeasure,
    pub entries: Vec<ImpactEntry>,
}

impl ImpactRanking {
    pub fn new(feature_names: &[String], impact: FeatureImpact) -> Result<Self> {
        if impact.values().len() != feature_names.len() {
            return Err(RecoupError::Schema(format!(
                "{} impact values for {} feature names",
                impact.values().len(),
                feature_names.len()
            )));
        }

        let (measure, mut entries): (ImpactMeasure, Vec<ImpactEntry>) = match impact {
            FeatureImpact::Gain(values) => {
                (ImpactMeasure::Gain, plain_entries(feature_names, &values))
            }
            FeatureImpact::Impurity(values) => (
                ImpactMeasure::GiniImportance,
                plain_entries(feature_names, &values),
            ),
            FeatureImpact::Coefficients(values) => (
                ImpactMeasure::OddsChange,
                feature_names
                    .iter()
                    .zip(values)
                    .map(|(name, coef)| ImpactEntry {
                        feature: name.clone(),
                        score: coef.exp() - 1.0,
                        coefficient: Some(coef),
                    })
                    .collect(),
            ),
        };

        match measure {
            ImpactMeasure::OddsChange => entries.sort_by(|a, b| b.score.total_cmp(&a.score)),
            _ => entries.sort_by(|a, b| a.score.total_cmp(&b.score)),
        }
        Ok(ImpactRanking { measure, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn plain_entries(feature_names: &[String], values: &[f64]) -> Vec<ImpactEntry> {
    feature_names
        .iter()
        .zip(values)
        .map(|(name, &score)| ImpactEntry {
            feature: name.clone(),
            score,
            coefficient: None,
        })
        .collect()
}

/// Everything computed for one backend on the test partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub backend: String,
    pub display_name: String,
    pub test_size: usize,
    pub threshold: f64,
    pub confusion_matrix: ConfusionMatrix,
    pub classification: ClassificationReport,
    pub roc: RocCurve,
    pub auc: f64,
    pub impact: ImpactRanking,
}

/// Apply the fixed decision threshold.
pub fn predict_labels(probabilities: &[f64]) -> Vec<u8> {
    probabilities
        .iter()
        .map(|&p| (p > DECISION_THRESHOLD) as u8)
        .collect()
}

/// Score `x_test` with `model` and compute the evaluation report.
///
/// # Arguments
///
/// * `model` - Fitted encoder and backend; `x_test` must come from its encoder.
/// * `x_test` - Encoded test partition.
/// * `y_test` - Test labels, aligned with `x_test`.
///
/// # Errors
///
/// * `Schema` if shapes disagree.
/// * `InsufficientData` if `y_test` lacks one of the classes.
pub fn evaluate(
    model: &FittedModel,
    x_test: &Array2<f64>,
    y_test: &[u8],
) -> Result<EvaluationReport> {
    if x_test.nrows() != y_test.len() {
        return Err(RecoupError::Schema(format!(
            "test matrix has {} rows but {} labels were given",
            x_test.nrows(),
            y_test.len()
        )));
    }

    let classifier = model.classifier();
    let probabilities = model.predict_encoded(x_test)?;
    let predicted = predict_labels(&probabilities);

    let confusion_matrix = stats::confusion_matrix(y_test, &predicted);
    let classification = stats::classification_report(&confusion_matrix);
    let roc = stats::roc_curve(y_test, &probabilities)?;
    let auc = stats::auc(&roc.fpr, &roc.tpr);
    let impact = ImpactRanking::new(model.feature_names(), classifier.feature_impact()?)?;

    log::info!(
        "{}: accuracy {:.3}, AUC {:.3} on {} test rows",
        classifier.name(),
        classification.accuracy,
        auc,
        y_test.len()
    );
    log::debug!("{}: confusion {:?}", classifier.name(), confusion_matrix.as_rows());

    Ok(EvaluationReport {
        backend: classifier.name().to_string(),
        display_name: classifier.params().model_type.display_name().to_string(),
        test_size: y_test.len(),
        threshold: DECISION_THRESHOLD,
        confusion_matrix,
        classification,
        roc,
        auc,
        impact,
    })
}
