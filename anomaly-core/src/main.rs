//! Timeseries Anomaly Detection - Main Entry Point
//!
//! Convolutional autoencoder trained on a normal series; windows of the test
//! series that it reconstructs poorly are flagged.

mod api;
mod logic;
pub mod constants;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use api::commands::{self, TrainOptions};
use constants::{APP_NAME, APP_VERSION};
use logic::config::Config;
use logic::model::{ThresholdConfig, ThresholdStrategy};

#[derive(Parser)]
#[command(name = "tsad", version = APP_VERSION)]
#[command(about = "Timeseries anomaly detection with a convolutional autoencoder", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train on a normal series and save the model
    Train {
        /// Training series (URL or CSV path)
        #[arg(long)]
        train: Option<String>,

        #[command(flatten)]
        dirs: DirArgs,

        #[command(flatten)]
        opts: TrainArgs,
    },

    /// Score a series with a saved model
    Detect {
        /// Test series (URL or CSV path)
        #[arg(long)]
        test: Option<String>,

        #[command(flatten)]
        dirs: DirArgs,

        /// Download again even if cached
        #[arg(long)]
        refresh: bool,
    },

    /// Train then detect
    Run {
        #[arg(long)]
        train: Option<String>,

        #[arg(long)]
        test: Option<String>,

        #[command(flatten)]
        dirs: DirArgs,

        #[command(flatten)]
        opts: TrainArgs,
    },

    /// Print the metadata of a saved model
    Inspect {
        #[arg(long)]
        model_dir: Option<PathBuf>,
    },

    /// Feed a series point by point through a saved model
    Stream {
        /// Input series (URL or CSV path)
        #[arg(short, long)]
        input: String,

        #[arg(long)]
        model_dir: Option<PathBuf>,

        #[arg(long)]
        refresh: bool,
    },
}

#[derive(Args)]
struct DirArgs {
    /// Download cache directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Where weights and metadata live
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Where exports and the report are written
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

impl DirArgs {
    fn apply(self, config: &mut Config) {
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(dir) = self.model_dir {
            config.model_dir = dir;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
    }
}

#[derive(Args)]
struct TrainArgs {
    #[arg(long)]
    epochs: Option<usize>,

    #[arg(long)]
    batch_size: Option<usize>,

    /// Window length, a multiple of 4
    #[arg(long)]
    time_steps: Option<usize>,

    /// Threshold strategy (max, p99, meanstd:3)
    #[arg(long, default_value = "max")]
    threshold: String,

    /// Threshold is divided by this, > 1 flags more windows
    #[arg(long, default_value = "1.0")]
    sensitivity: f32,

    #[arg(long)]
    learning_rate: Option<f64>,

    /// Epochs without val_loss improvement before stopping, 0 disables
    #[arg(long)]
    patience: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Download again even if cached
    #[arg(long)]
    refresh: bool,
}

impl TrainArgs {
    fn apply(self, config: &mut Config) -> anyhow::Result<TrainOptions> {
        if let Some(epochs) = self.epochs {
            config.epochs = epochs;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(time_steps) = self.time_steps {
            config.time_steps = time_steps;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        let strategy: ThresholdStrategy = self.threshold.parse()?;
        let mut opts = TrainOptions {
            threshold: ThresholdConfig {
                strategy,
                sensitivity: self.sensitivity,
            },
            refresh: self.refresh,
            ..TrainOptions::default()
        };
        if let Some(lr) = self.learning_rate {
            opts.learning_rate = lr;
        }
        if let Some(patience) = self.patience {
            opts.patience = patience;
        }
        Ok(opts)
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = Config::from_env();

    log::info!("Starting {} v{}", APP_NAME, APP_VERSION);

    match cli.command {
        Commands::Train { train, dirs, opts } => {
            if let Some(src) = train {
                config.train_source = src;
            }
            dirs.apply(&mut config);
            let opts = opts.apply(&mut config)?;
            config.validate()?;

            commands::train(&config, &opts).context("training failed")?;
        }
        Commands::Detect { test, dirs, refresh } => {
            if let Some(src) = test {
                config.test_source = src;
            }
            dirs.apply(&mut config);

            commands::detect(&config, refresh).with_context(|| {
                format!("detection with model in {} failed", config.model_dir.display())
            })?;
        }
        Commands::Run { train, test, dirs, opts } => {
            if let Some(src) = train {
                config.train_source = src;
            }
            if let Some(src) = test {
                config.test_source = src;
            }
            dirs.apply(&mut config);
            let opts = opts.apply(&mut config)?;
            config.validate()?;

            commands::run(&config, &opts).context("run failed")?;
        }
        Commands::Inspect { model_dir } => {
            let dir = model_dir.unwrap_or(config.model_dir);
            let metadata = commands::inspect(&dir)
                .with_context(|| format!("cannot read model in {}", dir.display()))?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        Commands::Stream { input, model_dir, refresh } => {
            if let Some(dir) = model_dir {
                config.model_dir = dir;
            }
            let flagged = commands::stream(&config, &input, refresh).context("streaming failed")?;
            for score in &flagged {
                println!(
                    "{}\tmae={:.4}\tscore={:.2}",
                    score.index, score.mae, score.score
                );
            }
        }
    }

    Ok(())
}
