use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{ModelConfig, ModelType};
use crate::error::{RecoupError, Result};
use crate::math::Array2;
use crate::models::classifier_trait::{
    check_training_data, check_width, ClassifierModel, FeatureImpact,
};
use crate::models::tree::{self, DecisionTree, SplitObjective, TreeParams};

const NAME: &str = "random_forest";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Forest {
    trees: Vec<DecisionTree>,
    /// Normalized mean impurity decrease per feature.
    importance: Vec<f64>,
}

/// Bagged Gini trees with per-split feature subsampling.
///
/// Tree `t` draws its bootstrap sample and feature subsets from a ChaCha8
/// stream seeded with `seed + t`, so a forest is reproducible tree by tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    params: ModelConfig,
    model: Option<Forest>,
}

impl RandomForestClassifier {
    pub fn new(params: ModelConfig) -> Self {
        RandomForestClassifier {
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
}

fn normalize(values: &mut [f64]) {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter_mut().for_each(|v| *v /= total);
    }
}

impl ClassifierModel for RandomForestClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()> {
        let ModelType::RandomForest {
            n_estimators,
            max_depth,
            min_samples_split,
            max_features,
        } = self.params.model_type
        else {
            return Err(RecoupError::Config(format!(
                "expected random forest parameters, got {}",
                self.params.model_type.name()
            )));
        };
        self.params.model_type.validate()?;
        check_training_data(NAME, x, y)?;

        let n = x.nrows();
        let n_features = x.ncols();
        let max_features = max_features
            .unwrap_or_else(|| ((n_features as f64).sqrt().floor() as usize).max(1))
            .min(n_features);
        let tree_params = TreeParams {
            max_depth,
            min_samples_split,
            max_features: Some(max_features),
        };
        let labels: Vec<f64> = y.iter().map(|&l| l as f64).collect();
        let ones = vec![1.0; n];

        let mut trees = Vec::with_capacity(n_estimators as usize);
        let mut importance = vec![0.0; n_features];
        for t in 0..n_estimators {
            let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed.wrapping_add(t as u64));
            let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let (tree, mut tree_importance) = tree::grow(
                x,
                &labels,
                &ones,
                bootstrap,
                SplitObjective::Gini,
                tree_params,
                &mut rng,
            );
            normalize(&mut tree_importance);
            for (total, v) in importance.iter_mut().zip(tree_importance) {
                *total += v;
            }
            trees.push(tree);
        }
        // single-leaf trees contribute nothing; if every tree is a single
        // leaf the importances stay all zero
        normalize(&mut importance);

        log::info!(
            "{}: fitted {} trees ({} features per split) on {} rows x {} features",
            NAME,
            trees.len(),
            max_features,
            n,
            n_features
        );
        self.model = Some(Forest { trees, importance });
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        check_width(NAME, self.n_features(), x)?;
        let model = self.model.as_ref().ok_or(RecoupError::NotFitted(NAME))?;
        let n_trees = model.trees.len() as f64;
        Ok(x
            .rows()
            .map(|row| model.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect())
    }

    fn feature_impact(&self) -> Result<FeatureImpact> {
        let model = self.model.as_ref().ok_or(RecoupError::NotFitted(NAME))?;
        Ok(FeatureImpact::Impurity(model.importance.clone()))
    }

    fn n_features(&self) -> Option<usize> {
        self.model.as_ref().map(|m| m.importance.len())
    }

    fn name(&self) -> &'static str {
        NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(n_estimators: u32, max_features: Option<usize>) -> ModelConfig {
        ModelConfig::new(
            7,
            ModelType::RandomForest {
                n_estimators,
                max_depth: None,
                min_samples_split: 2,
                max_features,
            },
        )
    }

    fn data() -> (Array2<f64>, Vec<u8>) {
        let mut values = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            let label = (i % 4 == 0) as u8;
            let signal = label as f64 * 2.0 + (i % 3) as f64 * 0.1;
            values.extend_from_slice(&[i as f64, signal, 1.0]);
            y.push(label);
        }
        (Array2::from_shape_vec((40, 3), values).unwrap(), y)
    }

    #[test]
    fn importances_sum_to_one() {
        let (x, y) = data();
        let mut model = RandomForestClassifier::new(config(25, None));
        model.fit(&x, &y).unwrap();
        let impact = model.feature_impact().unwrap();
        let total: f64 = impact.values().iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        // the constant column never splits
        assert_eq!(impact.values()[2], 0.0);
    }

    #[test]
    fn probabilities_are_vote_fractions() {
        let (x, y) = data();
        let mut model = RandomForestClassifier::new(config(10, Some(3)));
        model.fit(&x, &y).unwrap();
        for p in model.predict_proba(&x).unwrap() {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn same_seed_same_forest() {
        let (x, y) = data();
        let mut a = RandomForestClassifier::new(config(8, None));
        let mut b = RandomForestClassifier::new(config(8, None));
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn wrong_parameters_are_rejected() {
        let (x, y) = data();
        let mut model = RandomForestClassifier::new(ModelConfig::default());
        assert!(matches!(model.fit(&x, &y), Err(RecoupError::Config(_))));
    }

    #[test]
    fn one_feature_per_split_still_finds_the_informative_column() {
        // column 0 is the label, the other eight columns are constant
        let n = 40;
        let mut values = Vec::with_capacity(n * 9);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let label = (i % 2) as u8;
            values.push(label as f64);
            values.extend(std::iter::repeat(1.0).take(8));
            y.push(label);
        }
        let x = Array2::from_shape_vec((n, 9), values).unwrap();

        let mut model = RandomForestClassifier::new(config(50, Some(1)));
        model.fit(&x, &y).unwrap();
        let p = model.predict_proba(&x).unwrap();

        let positives: Vec<f64> = p
            .iter()
            .zip(&y)
            .filter(|&(_, &l)| l == 1)
            .map(|(&p, _)| p)
            .collect();
        let mean = positives.iter().sum::<f64>() / positives.len() as f64;
        assert!(mean > 0.99, "mean positive probability {}", mean);

        let impact = model.feature_impact().unwrap();
        assert!((impact.values()[0] - 1.0).abs() < 1e-9);
    }
}
