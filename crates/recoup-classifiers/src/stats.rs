use serde::Serialize;

use crate::error::{RecoupError, Result};

/// Binary confusion matrix; rows are actual classes, columns predicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionMatrix {
    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }

    /// `[[tn, fp], [fn, tp]]`
    pub fn as_rows(&self) -> [[usize; 2]; 2] {
        [[self.tn, self.fp], [self.fn_, self.tp]]
    }
}

/// Tally predicted against actual 0/1 labels.
///
/// # Arguments
///
/// * `y_true` - Actual labels.
/// * `y_pred` - Predicted labels, aligned with `y_true`.
pub fn confusion_matrix(y_true: &[u8], y_pred: &[u8]) -> ConfusionMatrix {
    debug_assert_eq!(y_true.len(), y_pred.len());
    let mut cm = ConfusionMatrix::default();
    for (&actual, &predicted) in y_true.iter().zip(y_pred) {
        match (actual == 1, predicted == 1) {
            (false, false) => cm.tn += 1,
            (false, true) => cm.fp += 1,
            (true, false) => cm.fn_ += 1,
            (true, true) => cm.tp += 1,
        }
    }
    cm
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    /// Metrics for class 0 and class 1, in that order.
    pub classes: [ClassMetrics; 2],
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn class_metrics(hits: usize, predicted: usize, support: usize) -> ClassMetrics {
    let precision = ratio(hits, predicted);
    let recall = ratio(hits, support);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    ClassMetrics {
        precision,
        recall,
        f1,
        support,
    }
}

fn average(classes: &[ClassMetrics; 2], weights: [f64; 2], support: usize) -> ClassMetrics {
    let norm: f64 = weights.iter().sum();
    let mean = |metric: fn(&ClassMetrics) -> f64| {
        if norm == 0.0 {
            0.0
        } else {
            classes
                .iter()
                .zip(weights)
                .map(|(c, w)| w * metric(c))
                .sum::<f64>()
                / norm
        }
    };
    ClassMetrics {
        precision: mean(|c| c.precision),
        recall: mean(|c| c.recall),
        f1: mean(|c| c.f1),
        support,
    }
}

/// Per-class precision, recall and F1 with accuracy and averages.
///
/// Any metric with a zero denominator is reported as 0.
pub fn classification_report(cm: &ConfusionMatrix) -> ClassificationReport {
    let negative = class_metrics(cm.tn, cm.tn + cm.fn_, cm.tn + cm.fp);
    let positive = class_metrics(cm.tp, cm.tp + cm.fp, cm.tp + cm.fn_);
    let total = cm.total();

    ClassificationReport {
        classes: [negative, positive],
        accuracy: ratio(cm.tn + cm.tp, total),
        macro_avg: average(&[negative, positive], [1.0, 1.0], total),
        weighted_avg: average(
            &[negative, positive],
            [negative.support as f64, positive.support as f64],
            total,
        ),
    }
}

/// Receiver operating characteristic curve.
///
/// Points are ordered by decreasing threshold. The first point is (0, 0) with
/// an infinite threshold (serialized as `null`), the last is (1, 1).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    pub thresholds: Vec<f64>,
}

/// Sweep every distinct score as a decision threshold.
///
/// A row is called positive at threshold `t` when its score is `>= t`.
///
/// # Errors
///
/// `InsufficientData` when `y_true` does not contain both classes.
pub fn roc_curve(y_true: &[u8], scores: &[f64]) -> Result<RocCurve> {
    debug_assert_eq!(y_true.len(), scores.len());
    let positives = y_true.iter().filter(|&&l| l == 1).count();
    let negatives = y_true.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(RecoupError::InsufficientData(format!(
            "ROC needs both classes, got {} positive and {} negative rows",
            positives, negatives
        )));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut curve = RocCurve {
        fpr: vec![0.0],
        tpr: vec![0.0],
        thresholds: vec![f64::INFINITY],
    };
    let (mut tp, mut fp) = (0usize, 0usize);
    for (pos, &i) in order.iter().enumerate() {
        if y_true[i] == 1 {
            tp += 1;
        } else {
            fp += 1;
        }
        let last_of_group = order
            .get(pos + 1)
            .map_or(true, |&next| scores[next] != scores[i]);
        if last_of_group {
            curve.fpr.push(fp as f64 / negatives as f64);
            curve.tpr.push(tp as f64 / positives as f64);
            curve.thresholds.push(scores[i]);
        }
    }

    Ok(curve)
}

/// Area under a curve by the trapezoidal rule.
pub fn auc(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum()
}
