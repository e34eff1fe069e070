pub mod classifier_trait;
pub mod factory;
pub mod fitted;
pub mod gbdt;
pub mod logistic;
pub mod random_forest;
pub mod tree;

pub use classifier_trait::{ClassifierModel, FeatureImpact};
pub use factory::{build_model, Classifier};
pub use fitted::FittedModel;
