use anyhow::Result;
use clap::ArgMatches;
use log::LevelFilter;
use std::path::PathBuf;

use recoup_cli::cli::build_cli;
use recoup_cli::commands::data::{run_enrich, run_generate};
use recoup_cli::commands::input::pipeline_config_from_arguments;
use recoup_cli::commands::predict::run_predict;
use recoup_cli::commands::train::{run_encode, run_train};

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("RECOUP_LOG", "error,recoup=info"))
        .init();

    let matches = build_cli().get_matches();

    let (name, result) = match matches.subcommand() {
        Some(("generate", sub_m)) => ("Generation", handle_generate(sub_m)),
        Some(("enrich", sub_m)) => ("Enrichment", handle_enrich(sub_m)),
        Some(("encode", sub_m)) => ("Encoding", handle_encode(sub_m)),
        Some(("train", sub_m)) => ("Training", handle_train(sub_m)),
        Some(("predict", sub_m)) => ("Prediction", handle_predict(sub_m)),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            log::error!("{} failed: {:#}", name, e);
            std::process::exit(1)
        }
    }
}

fn required_path<'a>(matches: &'a ArgMatches, id: &str) -> &'a PathBuf {
    matches
        .get_one::<PathBuf>(id)
        .unwrap_or_else(|| unreachable!("{} is required by CLI configuration", id))
}

fn handle_generate(matches: &ArgMatches) -> Result<()> {
    let rows = matches.get_one::<usize>("rows").copied().unwrap_or(250);
    let seed = matches.get_one::<u64>("seed").copied().unwrap_or(42);
    run_generate(
        rows,
        seed,
        required_path(matches, "output_file"),
        matches.get_flag("enrich"),
    )
}

fn handle_enrich(matches: &ArgMatches) -> Result<()> {
    run_enrich(
        required_path(matches, "raw"),
        required_path(matches, "output_file"),
    )
}

fn handle_encode(matches: &ArgMatches) -> Result<()> {
    let config = pipeline_config_from_arguments(matches)?;
    log::info!(
        "[Recoup::Encode] {} -> {}",
        config.input_path.display(),
        config.output_dir.display()
    );
    run_encode(config)
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let config = pipeline_config_from_arguments(matches)?;
    log::info!(
        "[Recoup::Train] {} -> {} ({})",
        config.input_path.display(),
        config.output_dir.display(),
        config
            .models
            .iter()
            .map(|m| m.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    log::debug!(
        "[Recoup::Train] effective config:\n{}",
        serde_json::to_string_pretty(&config).unwrap_or_default()
    );
    run_train(config).map(|_| ())
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    run_predict(
        required_path(matches, "model"),
        required_path(matches, "data"),
        required_path(matches, "output_file"),
        matches.get_flag("raw"),
    )
}
