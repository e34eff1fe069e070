use serde::{Deserialize, Serialize};

use crate::config::{ModelConfig, ModelType};
use crate::error::{RecoupError, Result};
use crate::math::{cholesky_solve, sigmoid, softplus, Array2};
use crate::models::classifier_trait::{
    check_training_data, check_width, ClassifierModel, FeatureImpact,
};

const NAME: &str = "logistic_regression";
const ARMIJO: f64 = 1e-4;
const MAX_HALVINGS: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LinearModel {
    intercept: f64,
    coefficients: Vec<f64>,
    iterations: usize,
}

/// L2-regularized logistic regression fitted by damped Newton steps.
///
/// Minimizes `sum(log-loss) + ||w||^2 / (2 c)` with an unpenalized intercept.
/// Fitting fails with [`RecoupError::Convergence`] when the step size does not
/// drop below the tolerance within `max_iter` iterations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegressionClassifier {
    params: ModelConfig,
    model: Option<LinearModel>,
}

impl LogisticRegressionClassifier {
    pub fn new(params: ModelConfig) -> Self {
        LogisticRegressionClassifier {
            params,
            model: None,
        }
    }

    pub fn params(&self) -> &ModelConfig {
        &self.params
    }

    pub fn intercept(&self) -> Option<f64> {
        self.model.as_ref().map(|m| m.intercept)
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.model.as_ref().map(|m| m.coefficients.as_slice())
    }
}

/// Weights are laid out as `[intercept, coefficients...]`.
fn linear(w: &[f64], row: &[f64]) -> f64 {
    w[0] + w[1..].iter().zip(row).map(|(a, b)| a * b).sum::<f64>()
}

fn objective(x: &Array2<f64>, y: &[u8], w: &[f64], lambda: f64) -> f64 {
    let data: f64 = x
        .rows()
        .zip(y)
        .map(|(row, &label)| {
            let z = linear(w, row);
            softplus(z) - label as f64 * z
        })
        .sum();
    let penalty: f64 = w[1..].iter().map(|v| v * v).sum();
    data + 0.5 * lambda * penalty
}

/// Armijo backtracking along `-direction` from `w`, halving the step up to
/// `MAX_HALVINGS` times. Returns the accepted point, its loss and step size,
/// or `None` when every halving is rejected.
fn backtrack<F: Fn(&[f64]) -> f64>(
    f: F,
    w: &[f64],
    direction: &[f64],
    loss: f64,
    slope: f64,
) -> Option<(Vec<f64>, f64, f64)> {
    let mut t = 1.0;
    let mut candidate = w.to_vec();
    for _ in 0..MAX_HALVINGS {
        for (c, (wj, dj)) in candidate.iter_mut().zip(w.iter().zip(direction)) {
            *c = wj - t * dj;
        }
        let trial = f(&candidate);
        if trial <= loss - ARMIJO * t * slope {
            return Some((candidate, trial, t));
        }
        t *= 0.5;
    }
    None
}

impl ClassifierModel for LogisticRegressionClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()> {
        let ModelType::LogisticRegression {
            c,
            max_iter,
            tolerance,
        } = self.params.model_type
        else {
            return Err(RecoupError::Config(format!(
                "expected logistic regression parameters, got {}",
                self.params.model_type.name()
            )));
        };
        self.params.model_type.validate()?;
        check_training_data(NAME, x, y)?;

        let lambda = 1.0 / c;
        let dim = x.ncols() + 1;
        let mut w = vec![0.0; dim];
        let mut loss = objective(x, y, &w, lambda);
        let mut last_step = f64::INFINITY;

        for iteration in 1..=max_iter {
            let mut grad = vec![0.0; dim];
            let mut hess = vec![0.0; dim * dim];
            for (row, &label) in x.rows().zip(y) {
                let p = sigmoid(linear(&w, row));
                let r = p - label as f64;
                let s = p * (1.0 - p);
                let at = |j: usize| if j == 0 { 1.0 } else { row[j - 1] };
                for j in 0..dim {
                    let xj = at(j);
                    grad[j] += r * xj;
                    for k in 0..=j {
                        hess[j * dim + k] += s * xj * at(k);
                    }
                }
            }
            for j in 1..dim {
                grad[j] += lambda * w[j];
                hess[j * dim + j] += lambda;
            }
            for j in 0..dim {
                for k in 0..j {
                    hess[k * dim + j] = hess[j * dim + k];
                }
            }

            let Some(direction) = cholesky_solve(&hess, &grad) else {
                return Err(RecoupError::Convergence {
                    iterations: iteration,
                    last_step: f64::NAN,
                });
            };

            let slope: f64 = grad.iter().zip(&direction).map(|(g, d)| g * d).sum();
            let current_scale = w.iter().map(|v| v.abs()).fold(1.0, f64::max);
            let full_step = direction.iter().map(|d| d.abs()).fold(0.0, f64::max);
            match backtrack(|v| objective(x, y, v, lambda), &w, &direction, loss, slope) {
                Some((candidate, trial, t)) => {
                    last_step = t * full_step;
                    loss = trial;
                    w = candidate;
                }
                // rounding noise at the optimum rejects every step
                None if full_step <= tolerance * current_scale => last_step = 0.0,
                None => {
                    return Err(RecoupError::Convergence {
                        iterations: iteration,
                        last_step,
                    })
                }
            }
            let scale = w.iter().map(|v| v.abs()).fold(1.0, f64::max);

            log::trace!(
                "{}: iteration {} loss {:.6} step {:.3e}",
                NAME,
                iteration,
                loss,
                last_step
            );
            if last_step <= tolerance * scale {
                log::info!(
                    "{}: converged after {} iterations on {} rows x {} features",
                    NAME,
                    iteration,
                    x.nrows(),
                    x.ncols()
                );
                self.model = Some(LinearModel {
                    intercept: w[0],
                    coefficients: w[1..].to_vec(),
                    iterations: iteration,
                });
                return Ok(());
            }
        }

        Err(RecoupError::Convergence {
            iterations: max_iter,
            last_step,
        })
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        check_width(NAME, self.n_features(), x)?;
        let model = self.model.as_ref().ok_or(RecoupError::NotFitted(NAME))?;
        Ok(x
            .rows()
            .map(|row| {
                let z = model.intercept
                    + model
                        .coefficients
                        .iter()
                        .zip(row)
                        .map(|(a, b)| a * b)
                        .sum::<f64>();
                sigmoid(z)
            })
            .collect())
    }

    fn feature_impact(&self) -> Result<FeatureImpact> {
        let model = self.model.as_ref().ok_or(RecoupError::NotFitted(NAME))?;
        Ok(FeatureImpact::Coefficients(model.coefficients.clone()))
    }

    fn n_features(&self) -> Option<usize> {
        self.model.as_ref().map(|m| m.coefficients.len())
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
