//! Evaluate a small grid of arms on MNIST, loading the dataset once.
//!
//! ```text
//! cargo run --release --example mnist_grid -- /path/to/mnist
//! ```
use std::path::PathBuf;
use std::time::Instant;

use hpo_svm::arm::arm_from_pairs;
use hpo_svm::{BenchmarkConfig, Evaluator, Result, RunReport};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/mnist"));
    let evaluator = Evaluator::new(BenchmarkConfig::default());

    for preprocessor in ["2", "4"] {
        for gamma in ["0.01", "0.1"] {
            let arm = arm_from_pairs([
                ("preprocessor", preprocessor),
                ("kernel", "1"),
                ("C", "10"),
                ("gamma", gamma),
            ]);
            let start = Instant::now();
            let result = evaluator.evaluate("mnist", &data_dir, &arm)?;
            println!("{:?}\n  {}", arm, RunReport::new(result, start.elapsed()));
        }
    }
    Ok(())
}
