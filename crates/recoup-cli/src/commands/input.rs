use anyhow::{Context, Result};
use clap::ArgMatches;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use recoup_classifiers::config::{ModelType, PipelineConfig};

/// Load the run configuration, then apply command line overrides.
///
/// Without a config file every field starts from `PipelineConfig::default()`.
pub fn pipeline_config_from_arguments(matches: &ArgMatches) -> Result<PipelineConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(config_path) => {
            log::info!("using config {}", config_path.display());
            PipelineConfig::from_json_file(config_path)
                .with_context(|| format!("Failed to load config file: {:?}", config_path))?
        }
        None => {
            log::info!("no config provided; using defaults");
            PipelineConfig::default()
        }
    };

    if let Some(data) = matches.get_one::<PathBuf>("data") {
        config.input_path = data.clone();
    }
    validate_csv_file(&config.input_path)?;

    if let Some(output_dir) = matches.get_one::<PathBuf>("output_dir") {
        config.output_dir = output_dir.clone();
    }
    if let Some(&seed) = matches.get_one::<u64>("seed") {
        config.seed = seed;
    }
    if let Some(&train_fraction) = matches.get_one::<f64>("train_fraction") {
        config.train_fraction = train_fraction;
    }

    // `encode` has no model selector
    if let Ok(Some(choice)) = matches.try_get_one::<String>("model_type") {
        config.models = select_models(&config.models, choice)?;
    }

    config.validate().context("Invalid run configuration")?;
    Ok(config)
}

/// Resolve a `-m` choice against the configured backends. A backend already
/// present in the config keeps its hyper-parameters; otherwise defaults apply.
pub fn select_models(configured: &[ModelType], choice: &str) -> Result<Vec<ModelType>> {
    let wanted = if choice == "all" {
        vec![
            ModelType::gradient_boosted(),
            ModelType::random_forest(),
            ModelType::logistic_regression(),
        ]
    } else {
        vec![ModelType::from_str(choice).map_err(anyhow::Error::msg)?]
    };

    Ok(wanted
        .into_iter()
        .map(|default| {
            configured
                .iter()
                .find(|m| m.name() == default.name())
                .cloned()
                .unwrap_or(default)
        })
        .collect())
}

pub fn validate_csv_file(path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    if ext.as_deref() != Some("csv") {
        anyhow::bail!("File must have a .csv extension: {}", path.display());
    }

    if !path.exists() {
        anyhow::bail!("File does not exist: {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::build_cli;

    fn sub_matches(args: &[&str]) -> ArgMatches {
        let matches = build_cli().get_matches_from(args);
        let (_, sub) = matches.subcommand().unwrap();
        sub.clone()
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("records.csv");
        std::fs::write(&data, "cliente_id\n").unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{"output_dir": "from_file", "seed": 1, "train_fraction": 0.6}"#,
        )
        .unwrap();

        let matches = sub_matches(&[
            "recoup",
            "train",
            config_path.to_str().unwrap(),
            "-d",
            data.to_str().unwrap(),
            "--seed",
            "7",
            "-m",
            "logistic",
        ]);
        let config = pipeline_config_from_arguments(&matches).unwrap();

        assert_eq!(config.input_path, data);
        assert_eq!(config.output_dir, PathBuf::from("from_file"));
        assert_eq!(config.seed, 7);
        assert_eq!(config.train_fraction, 0.6);
        assert_eq!(config.models, vec![ModelType::logistic_regression()]);
    }

    #[test]
    fn missing_input_is_reported() {
        let matches = sub_matches(&["recoup", "encode", "-d", "does/not/exist.csv"]);
        let err = pipeline_config_from_arguments(&matches).unwrap_err();
        assert!(format!("{:#}", err).contains("does not exist"));
    }

    #[test]
    fn out_of_range_fraction_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("records.csv");
        std::fs::write(&data, "cliente_id\n").unwrap();
        let matches = sub_matches(&[
            "recoup",
            "encode",
            "-d",
            data.to_str().unwrap(),
            "--train-fraction",
            "1.5",
        ]);
        assert!(pipeline_config_from_arguments(&matches).is_err());
    }

    #[test]
    fn selection_keeps_configured_hyper_parameters() {
        let tuned = ModelType::RandomForest {
            n_estimators: 7,
            max_depth: Some(3),
            min_samples_split: 4,
            max_features: None,
        };
        let selected = select_models(&[tuned.clone()], "all").unwrap();
        assert_eq!(selected.len(), 3);
        assert_eq!(selected[1], tuned);
        assert_eq!(selected[0], ModelType::gradient_boosted());

        assert!(select_models(&[], "svm").is_err());
    }

    #[test]
    fn only_csv_inputs_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let tsv = dir.path().join("records.tsv");
        std::fs::write(&tsv, "").unwrap();
        assert!(validate_csv_file(&tsv).is_err());
    }
}
