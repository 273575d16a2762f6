// Voltwise control CLI
// Trains the household DQN agent and compares it against the baseline strategies

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::{Overrides, RunConfig};

#[derive(Parser)]
#[command(name = "energyctl")]
#[command(about = "Household energy management: DQN training and strategy comparison", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a DQN agent on the household environment
    Train {
        /// JSON run file with `environment`, `agent` and `training` sections
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of training episodes
        #[arg(short, long)]
        episodes: Option<usize>,

        /// Environment steps per episode
        #[arg(long)]
        steps: Option<usize>,

        /// Mini-batch size
        #[arg(long)]
        batch_size: Option<usize>,

        /// Seed for the environment and the agent
        #[arg(long)]
        seed: Option<u64>,

        /// Where to write the trained model
        #[arg(short, long, default_value = "model.json")]
        output: PathBuf,

        /// Append per-episode statistics to this JSONL file
        #[arg(long)]
        stats: Option<PathBuf>,

        /// Write the loss plot into this directory
        #[arg(long)]
        plot_dir: Option<PathBuf>,
    },

    /// Replay every strategy from the same state and compare their cost
    Compare {
        /// JSON run file with `environment`, `agent` and `training` sections
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Trained model; the DQN strategy is skipped without one
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Hours to replay
        #[arg(long, default_value = "168")]
        horizon: usize,

        /// Seed for the environment and the random strategies
        #[arg(long)]
        seed: Option<u64>,

        /// Write the comparison plots into this directory
        #[arg(long)]
        plot_dir: Option<PathBuf>,

        /// Write the full report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            config,
            episodes,
            steps,
            batch_size,
            seed,
            output,
            stats,
            plot_dir,
        } => {
            let mut run = RunConfig::load(config.as_deref())?;
            run.apply(&Overrides {
                episodes,
                steps,
                batch_size,
                seed,
            });
            commands::train(run, &output, stats.as_deref(), plot_dir.as_deref()).await?;
        }

        Commands::Compare {
            config,
            model,
            horizon,
            seed,
            plot_dir,
            report,
        } => {
            let mut run = RunConfig::load(config.as_deref())?;
            run.apply(&Overrides {
                seed,
                ..Overrides::default()
            });
            commands::compare(
                run,
                model.as_deref(),
                horizon,
                plot_dir.as_deref(),
                report.as_deref(),
            )
            .await?;
        }
    }

    Ok(())
}
