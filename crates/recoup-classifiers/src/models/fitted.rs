use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data_handling::Record;
use crate::error::{RecoupError, Result};
use crate::math::Array2;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::factory::Classifier;
use crate::preprocessing::FittedEncoder;

/// A fitted encoder paired with the backend trained on its output.
///
/// The classifier is only ever applied to matrices whose width matches this
/// encoder, so the two travel and persist together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    encoder: FittedEncoder,
    classifier: Classifier,
}

impl FittedModel {
    /// # Errors
    ///
    /// * `NotFitted` if the classifier has not been fitted.
    /// * `Schema` if its input width differs from the encoder's output.
    pub fn new(encoder: FittedEncoder, classifier: Classifier) -> Result<Self> {
        let width = classifier
            .n_features()
            .ok_or(RecoupError::NotFitted(classifier.name()))?;
        if width != encoder.n_features() {
            return Err(RecoupError::Schema(format!(
                "{} was fitted on {} features but the encoder produces {}",
                classifier.name(),
                width,
                encoder.n_features()
            )));
        }
        Ok(FittedModel {
            encoder,
            classifier,
        })
    }

    pub fn encoder(&self) -> &FittedEncoder {
        &self.encoder
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn feature_names(&self) -> &[String] {
        self.encoder.feature_names()
    }

    /// Positive-class probability for rows already encoded by [`Self::encoder`].
    pub fn predict_encoded(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        self.classifier.predict_proba(x)
    }

    /// Encode raw records and score them.
    pub fn predict_records(&self, records: &[Record]) -> Result<Vec<f64>> {
        let x = self.encoder.transform(records)?;
        self.classifier.predict_proba(&x)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a model previously written as `model.json`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let model: FittedModel = serde_json::from_str(&content)?;
        // re-check the pairing in case the file was edited by hand
        FittedModel::new(model.encoder, model.classifier)
    }
}
