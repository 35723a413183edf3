use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Instant;

use hpo_svm::config::DEFAULT_MNIST_MIRROR;
use hpo_svm::io::{mnist, HttpFetcher};
use hpo_svm::{Evaluator, RunReport};
use hpo_svm_cli::config::load_experiment_config;
use hpo_svm_cli::params::parse_params;

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("HPO_SVM_LOG", "error,hpo_svm=info"))
        .init();

    let matches = Command::new("hpo-svm")
        .version(clap::crate_version!())
        .about("Kernel SVM hyperparameter benchmark on MNIST and CIFAR-10")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("evaluate")
                .about("Train and score one hyperparameter arm and print the ParamILS result line")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .help("Path to the experiment JSON configuration file")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("dataset")
                        .long("dataset")
                        .help("Dataset to evaluate on. Overrides EXPERIMENT.dataset.")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("data_dir")
                        .long("data-dir")
                        .help("Dataset storage directory. Overrides EXPERIMENT.data_dir.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::DirPath),
                )
                .arg(
                    Arg::new("combine")
                        .long("combine")
                        .help("Prepend the validation split to the training split.")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("fold")
                        .long("fold")
                        .help("Fold index passed by the optimizer harness (recorded only).")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("folds")
                        .long("folds")
                        .help("Number of folds passed by the optimizer harness (recorded only).")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("params")
                        .long("params")
                        .help(
                            "Hyperparameters as -name value pairs, e.g. \
                             --params -preprocessor 1 -kernel 1 -C 1.0 -gamma 0.01. \
                             Must come last.",
                        )
                        .required(true)
                        .num_args(1..)
                        .allow_hyphen_values(true)
                        .value_hint(ValueHint::Other),
                ),
        )
        .subcommand(
            Command::new("fetch")
                .about("Download the MNIST files into a storage directory")
                .arg(
                    Arg::new("dataset")
                        .long("dataset")
                        .help("Dataset to download. Only MNIST is downloadable.")
                        .value_parser(["mnist"])
                        .default_value("mnist"),
                )
                .arg(
                    Arg::new("data_dir")
                        .long("data-dir")
                        .help("Directory the files are stored in")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::DirPath),
                )
                .arg(
                    Arg::new("mirror")
                        .long("mirror")
                        .help("Base URL to download from")
                        .default_value(DEFAULT_MNIST_MIRROR)
                        .value_hint(ValueHint::Url),
                ),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("evaluate", sub_m)) => handle_evaluate(sub_m),
        Some(("fetch", sub_m)) => handle_fetch(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_evaluate(matches: &ArgMatches) -> Result<()> {
    let start = Instant::now();
    let config_path: &PathBuf = matches.get_one("config").unwrap();
    log::info!("[hpo-svm::cli] Evaluating with config: {:?}", config_path);

    let mut config = load_experiment_config(config_path)?;
    if let Some(dataset) = matches.get_one::<String>("dataset") {
        config.experiment.dataset = dataset.clone();
    }
    if let Some(data_dir) = matches.get_one::<PathBuf>("data_dir") {
        config.experiment.data_dir = data_dir.clone();
    }
    if matches.get_flag("combine") {
        config.benchmark.loader.combine = true;
    }
    if let (Some(fold), Some(folds)) = (
        matches.get_one::<usize>("fold"),
        matches.get_one::<usize>("folds"),
    ) {
        log::debug!("[hpo-svm::cli] fold {} of {}", fold, folds);
    }

    let tokens: Vec<&String> = matches
        .get_many::<String>("params")
        .map(|v| v.collect())
        .unwrap_or_default();
    let arm = parse_params(&tokens).context("Invalid --params")?;

    let evaluator = Evaluator::new(config.benchmark);
    match evaluator.evaluate(&config.experiment.dataset, &config.experiment.data_dir, &arm) {
        Ok(result) => {
            println!("{}", RunReport::new(result, start.elapsed()));
            Ok(())
        }
        Err(e) => {
            log::error!("Evaluation failed: {:#}", anyhow::Error::new(e));
            std::process::exit(1)
        }
    }
}

fn handle_fetch(matches: &ArgMatches) -> Result<()> {
    let data_dir: &PathBuf = matches.get_one("data_dir").unwrap();
    let mirror: &String = matches.get_one("mirror").unwrap();
    log::info!("[hpo-svm::cli] Fetching MNIST into {:?}", data_dir);

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    mnist::ensure_files(data_dir, mirror, &HttpFetcher::default())
        .with_context(|| format!("Failed to fetch MNIST into {}", data_dir.display()))?;
    Ok(())
}
