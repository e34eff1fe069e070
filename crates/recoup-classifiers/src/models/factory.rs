use serde::{Deserialize, Serialize};

use crate::config::{ModelConfig, ModelType};
use crate::error::Result;
use crate::math::Array2;
use crate::models::classifier_trait::{ClassifierModel, FeatureImpact};
use crate::models::gbdt::GradientBoostedClassifier;
use crate::models::logistic::LogisticRegressionClassifier;
use crate::models::random_forest::RandomForestClassifier;

/// Closed set of classifier backends.
///
/// Serialized with a `backend` tag so a saved model reloads into the right
/// variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum Classifier {
    GradientBoosted(GradientBoostedClassifier),
    RandomForest(RandomForestClassifier),
    LogisticRegression(LogisticRegressionClassifier),
}

/// Build an unfitted classifier from a `ModelConfig`.
pub fn build_model(params: ModelConfig) -> Result<Classifier> {
    params.model_type.validate()?;
    Ok(match params.model_type {
        ModelType::GradientBoosted { .. } => {
            Classifier::GradientBoosted(GradientBoostedClassifier::new(params))
        }
        ModelType::RandomForest { .. } => {
            Classifier::RandomForest(RandomForestClassifier::new(params))
        }
        ModelType::LogisticRegression { .. } => {
            Classifier::LogisticRegression(LogisticRegressionClassifier::new(params))
        }
    })
}

impl Classifier {
    fn inner(&self) -> &dyn ClassifierModel {
        match self {
            Classifier::GradientBoosted(m) => m,
            Classifier::RandomForest(m) => m,
            Classifier::LogisticRegression(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ClassifierModel {
        match self {
            Classifier::GradientBoosted(m) => m,
            Classifier::RandomForest(m) => m,
            Classifier::LogisticRegression(m) => m,
        }
    }

    pub fn params(&self) -> &ModelConfig {
        match self {
            Classifier::GradientBoosted(m) => m.params(),
            Classifier::RandomForest(m) => m.params(),
            Classifier::LogisticRegression(m) => m.params(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.n_features().is_some()
    }
}

impl ClassifierModel for Classifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        self.inner().predict_proba(x)
    }

    fn feature_impact(&self) -> Result<FeatureImpact> {
        self.inner().feature_impact()
    }

    fn n_features(&self) -> Option<usize> {
        self.inner().n_features()
    }

    fn name(&self) -> &'static str {
        self.inner().name()
    }
}
