use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{RecoupError, Result};

/// Central configuration for models in the crate.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Seed for every random draw made while fitting.
    pub seed: u64,

    #[serde(flatten)]
    pub model_type: ModelType,
}

/// Supported model types and their hyper-parameters. Fields missing from a
/// config file take the values of the matching default constructor.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ModelType {
    GradientBoosted {
        #[serde(default = "defaults::n_estimators")]
        n_estimators: u32,
        #[serde(default = "defaults::learning_rate")]
        learning_rate: f64,
        #[serde(default = "defaults::gbdt_max_depth")]
        max_depth: u32,
        /// L2 penalty on leaf weights.
        #[serde(default = "defaults::one")]
        lambda: f64,
        /// Minimum gain for a split to be kept.
        #[serde(default)]
        gamma: f64,
        /// Minimum hessian mass per child.
        #[serde(default = "defaults::one")]
        min_child_weight: f64,
        /// Row fraction sampled per boosting round.
        #[serde(default = "defaults::one")]
        subsample: f64,
    },
    RandomForest {
        #[serde(default = "defaults::n_estimators")]
        n_estimators: u32,
        /// `None` grows trees until leaves are pure.
        #[serde(default)]
        max_depth: Option<u32>,
        #[serde(default = "defaults::min_samples_split")]
        min_samples_split: usize,
        /// Features examined per split; `None` means `sqrt(n_features)`.
        #[serde(default)]
        max_features: Option<usize>,
    },
    LogisticRegression {
        /// Inverse L2 regularization strength.
        #[serde(default = "defaults::one")]
        c: f64,
        #[serde(default = "defaults::max_iter")]
        max_iter: usize,
        #[serde(default = "defaults::tolerance")]
        tolerance: f64,
    },
}

mod defaults {
    pub fn n_estimators() -> u32 {
        100
    }

    pub fn learning_rate() -> f64 {
        0.3
    }

    pub fn gbdt_max_depth() -> u32 {
        6
    }

    pub fn one() -> f64 {
        1.0
    }

    pub fn min_samples_split() -> usize {
        2
    }

    pub fn max_iter() -> usize {
        100
    }

    pub fn tolerance() -> f64 {
        1e-6
    }
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::gradient_boosted()
    }
}

impl ModelType {
    pub fn gradient_boosted() -> Self {
        ModelType::GradientBoosted {
            n_estimators: defaults::n_estimators(),
            learning_rate: defaults::learning_rate(),
            max_depth: defaults::gbdt_max_depth(),
            lambda: 1.0,
            gamma: 0.0,
            min_child_weight: 1.0,
            subsample: 1.0,
        }
    }

    pub fn random_forest() -> Self {
        ModelType::RandomForest {
            n_estimators: defaults::n_estimators(),
            max_depth: None,
            min_samples_split: defaults::min_samples_split(),
            max_features: None,
        }
    }

    pub fn logistic_regression() -> Self {
        ModelType::LogisticRegression {
            c: 1.0,
            max_iter: defaults::max_iter(),
            tolerance: defaults::tolerance(),
        }
    }

    /// Stable name used for artifact directories and logs.
    pub fn name(&self) -> &'static str {
        match self {
            ModelType::GradientBoosted { .. } => "gradient_boosted",
            ModelType::RandomForest { .. } => "random_forest",
            ModelType::LogisticRegression { .. } => "logistic_regression",
        }
    }

    /// Human readable label used in plot titles.
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelType::GradientBoosted { .. } => "Gradient Boosted Trees",
            ModelType::RandomForest { .. } => "Random Forest",
            ModelType::LogisticRegression { .. } => "Logistic Regression",
        }
    }

    /// Check hyper-parameters that would otherwise fail deep inside fitting.
    pub fn validate(&self) -> Result<()> {
        let bad = |msg: &str| Err(RecoupError::Config(format!("{}: {}", self.name(), msg)));
        match *self {
            ModelType::GradientBoosted {
                n_estimators,
                learning_rate,
                lambda,
                subsample,
                ..
            } => {
                if n_estimators == 0 {
                    return bad("n_estimators must be positive");
                }
                if !(learning_rate > 0.0) {
                    return bad("learning_rate must be positive");
                }
                if lambda < 0.0 {
                    return bad("lambda must be non-negative");
                }
                if !(subsample > 0.0 && subsample <= 1.0) {
                    return bad("subsample must be in (0, 1]");
                }
            }
            ModelType::RandomForest {
                n_estimators,
                min_samples_split,
                max_features,
                ..
            } => {
                if n_estimators == 0 {
                    return bad("n_estimators must be positive");
                }
                if min_samples_split < 2 {
                    return bad("min_samples_split must be at least 2");
                }
                if max_features == Some(0) {
                    return bad("max_features must be positive");
                }
            }
            ModelType::LogisticRegression {
                c,
                max_iter,
                tolerance,
            } => {
                if !(c > 0.0) {
                    return bad("c must be positive");
                }
                if max_iter == 0 {
                    return bad("max_iter must be positive");
                }
                if !(tolerance > 0.0) {
                    return bad("tolerance must be positive");
                }
            }
        }
        Ok(())
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gbdt" | "gradient_boosted" | "xgboost" => Ok(ModelType::gradient_boosted()),
            "random_forest" | "rf" => Ok(ModelType::random_forest()),
            "logistic" | "logistic_regression" | "logreg" => Ok(ModelType::logistic_regression()),
            _ => Err(format!(
                "Unknown model type: {}. Valid options are: gbdt, random_forest, logistic",
                s
            )),
        }
    }
}

impl ModelConfig {
    pub fn new(seed: u64, model_type: ModelType) -> Self {
        Self { seed, model_type }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            model_type: ModelType::default(),
        }
    }
}

/// Run-level configuration: where records come from, where artifacts go,
/// and how the data is partitioned.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub seed: u64,
    pub train_fraction: f64,
    /// Backends trained in this run, in order.
    pub models: Vec<ModelType>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("clientes_enriquecido.csv"),
            output_dir: PathBuf::from("recoup_output"),
            seed: 42,
            train_fraction: 0.7,
            models: vec![
                ModelType::gradient_boosted(),
                ModelType::random_forest(),
                ModelType::logistic_regression(),
            ],
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file. Missing keys take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            RecoupError::Config(format!(
                "failed to read config {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Model configuration for one backend, sharing the run seed.
    pub fn model_config(&self, model_type: &ModelType) -> ModelConfig {
        ModelConfig::new(self.seed, model_type.clone())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(RecoupError::Config(format!(
                "train_fraction must be in (0, 1), got {}",
                self.train_fraction
            )));
        }
        if self.models.is_empty() {
            return Err(RecoupError::Config("no models configured".to_string()));
        }
        self.models.iter().try_for_each(ModelType::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_model_entries_take_constructor_defaults() {
        let rf: ModelType =
            serde_json::from_str(r#"{"RandomForest":{"n_estimators":50}}"#).unwrap();
        assert_eq!(
            rf,
            ModelType::RandomForest {
                n_estimators: 50,
                max_depth: None,
                min_samples_split: 2,
                max_features: None,
            }
        );

        let gb: ModelType = serde_json::from_str(r#"{"GradientBoosted":{}}"#).unwrap();
        assert_eq!(gb, ModelType::gradient_boosted());

        let lr: ModelType =
            serde_json::from_str(r#"{"LogisticRegression":{"c":0.5}}"#).unwrap();
        assert_eq!(
            lr,
            ModelType::LogisticRegression {
                c: 0.5,
                max_iter: 100,
                tolerance: 1e-6,
            }
        );
    }

    #[test]
    fn pipeline_config_accepts_partial_models() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"seed": 3, "models": [{"RandomForest": {"max_depth": 4}}]}"#,
        )
        .unwrap();
        assert_eq!(config.seed, 3);
        assert_eq!(config.train_fraction, 0.7);
        assert!(config.validate().is_ok());
        assert!(matches!(
            config.models[0],
            ModelType::RandomForest {
                n_estimators: 100,
                max_depth: Some(4),
                ..
            }
        ));
    }
}
