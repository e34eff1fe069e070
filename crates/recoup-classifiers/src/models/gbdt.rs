use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{ModelConfig, ModelType};
use crate::error::{RecoupError, Result};
use crate::math::{sigmoid, softplus, Array2};
use crate::models::classifier_trait::{
    check_training_data, check_width, ClassifierModel, FeatureImpact,
};
use crate::models::tree::{self, DecisionTree, SplitObjective, TreeParams};

const NAME: &str = "gradient_boosted";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct BoostedEnsemble {
    /// Initial log-odds shared by every row.
    base_margin: f64,
    trees: Vec<DecisionTree>,
    /// Total split gain per feature over all trees.
    gain: Vec<f64>,
}

/// Gradient-boosted decision trees on the logistic loss.
///
/// Each round fits a regression tree to the gradient and hessian of the
/// log-loss at the current margin, using the second-order split gain with an
/// L2 penalty on leaf weights, and adds the tree shrunk by the learning rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedClassifier {
    params: ModelConfig,
    model: Option<BoostedEnsemble>,
}

impl GradientBoostedClassifier {
    pub fn new(params: ModelConfig) -> Self {
        GradientBoostedClassifier {
            params,
            model: None,
        }
    }

    pub fn params(&self) -> &ModelConfig {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.model.as_ref().map_or(0, |m| m.trees.len())
    }

    fn margin(model: &BoostedEnsemble, row: &[f64]) -> f64 {
        model.base_margin + model.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }
}

impl ClassifierModel for GradientBoostedClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()> {
        let ModelType::GradientBoosted {
            n_estimators,
            learning_rate,
            max_depth,
            lambda,
            gamma,
            min_child_weight,
            subsample,
        } = self.params.model_type
        else {
            return Err(RecoupError::Config(format!(
                "expected gradient boosted parameters, got {}",
                self.params.model_type.name()
            )));
        };
        self.params.model_type.validate()?;
        check_training_data(NAME, x, y)?;

        let n = x.nrows();
        let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed);
        let objective = SplitObjective::Newton {
            lambda,
            gamma,
            min_child_weight,
        };
        let tree_params = TreeParams {
            max_depth: Some(max_depth),
            min_samples_split: 2,
            max_features: None,
        };
        let n_sampled = ((n as f64 * subsample).round() as usize).clamp(1, n);

        // base score 0.5, i.e. zero log-odds
        let base_margin = 0.0;
        let mut margin = vec![base_margin; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let mut trees = Vec::with_capacity(n_estimators as usize);
        let mut gain = vec![0.0; x.ncols()];

        for round in 0..n_estimators {
            for i in 0..n {
                let p = sigmoid(margin[i]);
                grad[i] = p - y[i] as f64;
                hess[i] = p * (1.0 - p);
            }

            let samples = if n_sampled < n {
                let mut rows = index::sample(&mut rng, n, n_sampled).into_vec();
                rows.sort_unstable();
                rows
            } else {
                (0..n).collect()
            };

            let (mut tree, tree_gain) =
                tree::grow(x, &grad, &hess, samples, objective, tree_params, &mut rng);
            tree.scale_leaves(learning_rate);

            for (i, m) in margin.iter_mut().enumerate() {
                *m += tree.predict_row(x.row_slice(i));
            }
            for (total, g) in gain.iter_mut().zip(tree_gain) {
                *total += g;
            }
            trees.push(tree);

            if log::log_enabled!(log::Level::Debug) && (round + 1) % 10 == 0 {
                let loss = margin
                    .iter()
                    .zip(y)
                    .map(|(&m, &label)| softplus(m) - label as f64 * m)
                    .sum::<f64>()
                    / n as f64;
                log::debug!("{}: round {} train logloss {:.5}", NAME, round + 1, loss);
            }
        }

        log::info!(
            "{}: fitted {} trees on {} rows x {} features",
            NAME,
            trees.len(),
            n,
            x.ncols()
        );
        self.model = Some(BoostedEnsemble {
            base_margin,
            trees,
            gain,
        });
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        check_width(NAME, self.n_features(), x)?;
        let model = self.model.as_ref().ok_or(RecoupError::NotFitted(NAME))?;
        Ok(x.rows().map(|row| sigmoid(Self::margin(model, row))).collect())
    }

    fn feature_impact(&self) -> Result<FeatureImpact> {
        let model = self.model.as_ref().ok_or(RecoupError::NotFitted(NAME))?;
        Ok(FeatureImpact::Gain(model.gain.clone()))
    }

    fn n_features(&self) -> Option<usize> {
        self.model.as_ref().map(|m| m.gain.len())
    }

    fn name(&self) -> &'static str {
        NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> (Array2<f64>, Vec<u8>) {
        // label follows the second feature; the others are noise
        let x = Array2::from_shape_vec(
            (10, 3),
            vec![
                0.1, 1.0, 5.0, 0.4, 0.0, 5.0, 0.6, 1.0, 4.0, 0.9, 0.0, 4.0, 1.2, 1.0, 5.0, 1.5,
                0.0, 5.0, 1.8, 1.0, 4.0, 2.1, 0.0, 4.0, 2.4, 1.0, 5.0, 2.7, 0.0, 5.0,
            ],
        )
        .unwrap();
        let y = vec![1, 0, 1, 0, 1, 0, 1, 0, 1, 0];
        (x, y)
    }

    fn config(n_estimators: u32) -> ModelConfig {
        ModelConfig::new(
            42,
            ModelType::GradientBoosted {
                n_estimators,
                learning_rate: 0.3,
                max_depth: 3,
                lambda: 1.0,
                gamma: 0.0,
                min_child_weight: 0.0,
                subsample: 1.0,
            },
        )
    }

    #[test]
    fn learns_informative_feature() {
        let (x, y) = toy();
        let mut model = GradientBoostedClassifier::new(config(20));
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        for (p, label) in proba.iter().zip(&y) {
            assert_eq!((*p > 0.5) as u8, *label);
        }

        let FeatureImpact::Gain(gain) = model.feature_impact().unwrap() else {
            panic!("boosting reports gain");
        };
        assert!(gain[1] > 0.0);
        assert_eq!(gain[0], 0.0);
        assert_eq!(gain[2], 0.0);
    }

    #[test]
    fn predict_before_fit_is_an_error() {
        let (x, _) = toy();
        let model = GradientBoostedClassifier::new(config(5));
        assert!(matches!(
            model.predict_proba(&x),
            Err(RecoupError::NotFitted(_))
        ));
    }

    #[test]
    fn rejects_wrong_width() {
        let (x, y) = toy();
        let mut model = GradientBoostedClassifier::new(config(2));
        model.fit(&x, &y).unwrap();
        let narrow = Array2::from_shape_vec((1, 2), vec![0.0, 1.0]).unwrap();
        assert!(matches!(
            model.predict_proba(&narrow),
            Err(RecoupError::Schema(_))
        ));
    }

    #[test]
    fn subsampling_is_seeded() {
        let (x, y) = toy();
        let mut cfg = config(10);
        if let ModelType::GradientBoosted { subsample, .. } = &mut cfg.model_type {
            *subsample = 0.6;
        }
        let mut a = GradientBoostedClassifier::new(cfg.clone());
        let mut b = GradientBoostedClassifier::new(cfg);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }
}
