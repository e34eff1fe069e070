use clap::{Arg, ArgAction, Command, ValueHint};
use std::path::PathBuf;

fn data_arg() -> Arg {
    Arg::new("data")
        .short('d')
        .long("data")
        .help(
            "Path to the enriched records CSV. \
             Overrides the input_path specified in the configuration file.",
        )
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn output_dir_arg() -> Arg {
    Arg::new("output_dir")
        .short('o')
        .long("output")
        .help(
            "Directory the artifacts are written to. \
             Overrides the output_dir specified in the configuration file.",
        )
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::DirPath)
}

fn config_arg() -> Arg {
    Arg::new("config")
        .help("Path to run configuration JSON file")
        .required(false)
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn seed_arg() -> Arg {
    Arg::new("seed")
        .long("seed")
        .help("Seed for the split and every model. Overrides the configuration file.")
        .value_parser(clap::value_parser!(u64))
}

fn train_fraction_arg() -> Arg {
    Arg::new("train_fraction")
        .long("train-fraction")
        .help("Fraction of each class assigned to training, in (0, 1).")
        .value_parser(clap::value_parser!(f64))
}

/// Full command tree of the `recoup` binary.
pub fn build_cli() -> Command {
    Command::new("recoup")
        .version(clap::crate_version!())
        .about("Recoup - response classifiers for debt collection campaigns")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("generate")
                .about("Generate a synthetic collections dataset")
                .arg(
                    Arg::new("rows")
                        .short('n')
                        .long("rows")
                        .help("Number of records to generate")
                        .default_value("250")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .help("Seed for the generator")
                        .default_value("42")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output")
                        .help("CSV file the records are written to")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("enrich")
                        .long("enrich")
                        .help(
                            "Write enriched records (bands, label, channel group) \
                             instead of raw ones.",
                        )
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("enrich")
                .about("Derive bands, channel group and the response label from raw records")
                .arg(
                    Arg::new("raw")
                        .help("Path to the raw records CSV")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output")
                        .help("CSV file the enriched records are written to")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("encode")
                .about("Split and encode records, writing the train/test feature and label files")
                .arg(config_arg())
                .arg(data_arg())
                .arg(output_dir_arg())
                .arg(seed_arg())
                .arg(train_fraction_arg()),
        )
        .subcommand(
            Command::new("train")
                .about("Train, evaluate and report one or all classifier backends")
                .arg(config_arg())
                .arg(data_arg())
                .arg(output_dir_arg())
                .arg(
                    Arg::new("model_type")
                        .short('m')
                        .long("model")
                        .help(
                            "Backend to train. \
                             Overrides the models listed in the configuration file.",
                        )
                        .value_parser(["gbdt", "random_forest", "logistic", "all"])
                        .value_hint(ValueHint::Other),
                )
                .arg(seed_arg())
                .arg(train_fraction_arg()),
        )
        .subcommand(
            Command::new("predict")
                .about("Score records with a saved model")
                .arg(
                    Arg::new("model")
                        .help("Path to a model.json written by `recoup train`")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("data")
                        .short('d')
                        .long("data")
                        .help("Path to the records CSV to score")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output")
                        .help("CSV file the predictions are written to")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("raw")
                        .long("raw")
                        .help("Input holds raw records; enrich them before scoring.")
                        .action(ArgAction::SetTrue),
                ),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn train_rejects_unknown_backend() {
        let result = build_cli().try_get_matches_from(["recoup", "train", "-m", "svm"]);
        assert!(result.is_err());
    }
}
