use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use smart_eta::gbdt::BoosterConfig;
use smart_eta::trainer::{Trainer, TrainerConfig, DEFAULT_SEED, DEFAULT_TEST_FRACTION};

/// Train the delivery ETA pipeline and write it as a single artifact file.
#[derive(Debug, Parser)]
#[command(name = "eta-train", version)]
struct Args {
    /// Historical orders CSV.
    #[arg(long, default_value = "data/smarteta_dataset.csv")]
    data: PathBuf,

    /// Where to write the pipeline artifact.
    #[arg(long, default_value = "model/eta_pipeline.json")]
    output: PathBuf,

    /// Seed for the split and the booster.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Held-out fraction.
    #[arg(long, default_value_t = DEFAULT_TEST_FRACTION)]
    test_fraction: f64,

    #[arg(long, default_value_t = 100)]
    rounds: usize,

    #[arg(long, default_value_t = 5)]
    max_depth: usize,

    #[arg(long, default_value_t = 0.1)]
    learning_rate: f64,

    /// Refuse to save when held-out R² falls below this value.
    #[arg(long)]
    min_r2: Option<f64>,

    /// Print the training report as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "smart_eta=info".into()),
        )
        .init();

    let args = Args::parse();
    let trainer = Trainer::new(TrainerConfig {
        data_path: args.data,
        output_path: args.output,
        seed: args.seed,
        test_fraction: args.test_fraction,
        booster: BoosterConfig {
            n_estimators: args.rounds,
            max_depth: args.max_depth,
            learning_rate: args.learning_rate,
            ..Default::default()
        },
        min_r2: args.min_r2,
    });

    match trainer.run() {
        Ok(report) => {
            if args.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(s) => println!("{s}"),
                    Err(e) => {
                        eprintln!("failed to render report: {e}");
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                println!("MAE: {:.2}", report.metrics.mae);
                println!("RMSE: {:.2}", report.metrics.rmse);
                println!("R² Score: {:.2}", report.metrics.r2);
                if let Some(path) = &report.artifact_path {
                    println!("Model saved to {}", path.display());
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "training failed");
            eprintln!("training failed: {e}");
            ExitCode::FAILURE
        }
    }
}
