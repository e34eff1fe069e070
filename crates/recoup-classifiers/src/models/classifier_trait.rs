use crate::error::Result;
use crate::math::Array2;

/// Per-feature influence reported by a fitted backend, in encoder column order.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureImpact {
    /// Total split gain per feature (gradient boosting).
    Gain(Vec<f64>),
    /// Mean impurity decrease per feature, normalized to sum to 1 (random forest).
    Impurity(Vec<f64>),
    /// Log-odds coefficient per feature (logistic regression).
    Coefficients(Vec<f64>),
}

impl FeatureImpact {
    pub fn values(&self) -> &[f64] {
        match self {
            FeatureImpact::Gain(v)
            | FeatureImpact::Impurity(v)
            | FeatureImpact::Coefficients(v) => v,
        }
    }
}

/// Contract shared by every classifier backend.
///
/// Labels are 0/1 with 1 meaning a positive response. All backends are
/// deterministic for a fixed seed and input.
pub trait ClassifierModel {
    /// Fit the model on a feature matrix and its labels.
    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()>;

    /// Probability of the positive class for every row of `x`.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<f64>>;

    /// Backend-specific feature impact of the fitted model.
    fn feature_impact(&self) -> Result<FeatureImpact>;

    /// Number of feature columns seen at fit time, `None` before fitting.
    fn n_features(&self) -> Option<usize>;

    fn name(&self) -> &'static str {
        "classifier"
    }
}

/// Shape and label checks shared by the backends' `fit`.
pub(crate) fn check_training_data(name: &str, x: &Array2<f64>, y: &[u8]) -> Result<()> {
    use crate::error::RecoupError;

    if x.nrows() != y.len() {
        return Err(RecoupError::Schema(format!(
            "{}: feature matrix has {} rows but {} labels were given",
            name,
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(RecoupError::InsufficientData(format!(
            "{}: cannot fit on a {}x{} feature matrix",
            name,
            x.nrows(),
            x.ncols()
        )));
    }
    if let Some(bad) = y.iter().find(|&&l| l > 1) {
        return Err(RecoupError::Schema(format!(
            "{}: labels must be 0 or 1, found {}",
            name, bad
        )));
    }
    if let Some(pos) = x.as_slice().iter().position(|v| !v.is_finite()) {
        return Err(RecoupError::Schema(format!(
            "{}: non-finite feature value at row {}",
            name,
            pos / x.ncols()
        )));
    }
    Ok(())
}

/// Reject prediction input whose width differs from the fitted model.
pub(crate) fn check_width(
    name: &'static str,
    fitted: Option<usize>,
    x: &Array2<f64>,
) -> Result<()> {
    use crate::error::RecoupError;

    let expected = fitted.ok_or(RecoupError::NotFitted(name))?;
    if x.ncols() != expected {
        return Err(RecoupError::Schema(format!(
            "{}: expected {} feature columns, got {}",
            name,
            expected,
            x.ncols()
        )));
    }
    Ok(())
}
