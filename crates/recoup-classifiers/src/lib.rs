//! recoup-classifiers: response modelling for debt-collection contacts.
//!
//! The crate turns enriched collections records into a numeric feature matrix
//! (`preprocessing`), holds out a stratified test partition (`data_handling`),
//! fits one of three interchangeable backends (`models`: gradient-boosted
//! trees, random forest, logistic regression) and evaluates it on the held-out
//! rows (`evaluation`). `report` renders plots and an HTML report and persists
//! every artifact; `pipeline` wires the stages together for a full run.
//!
//! `enrichment` and `synthetic` derive the banded columns from raw records and
//! generate seeded demo data.
pub mod config;
pub mod data_handling;
pub mod enrichment;
pub mod error;
pub mod evaluation;
pub mod io;
pub mod math;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod report;
pub mod stats;
pub mod synthetic;

pub use error::{RecoupError, Result};
