// Command implementations for energyctl

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::info;

use energy_rl_agent::{train as train_agent, EpisodeStats};
use energy_rl_analysis::{compare_strategies, render_loss_history, render_report, HouseholdAgent};
use energy_rl_core::Agent;
use energy_rl_env::HouseholdEnv;

use crate::config::RunConfig;

/// Train a fresh agent and save it to `output`
pub async fn train(
    run: RunConfig,
    output: &Path,
    stats: Option<&Path>,
    plot_dir: Option<&Path>,
) -> Result<()> {
    info!(
        episodes = run.training.episodes,
        steps = run.training.steps_per_episode,
        batch_size = run.agent.base.batch_size,
        seed = ?run.agent.seed,
        "starting training run"
    );

    let env = HouseholdEnv::new(run.environment).context("Invalid environment config")?;
    let (agent_config, training) = (run.agent, run.training);
    let outcome = tokio::task::spawn_blocking(move || train_agent(env, agent_config, training))
        .await
        .context("Training task panicked")?
        .context("Training failed")?;

    outcome
        .agent
        .save(output)
        .await
        .with_context(|| format!("Failed to save model to {}", output.display()))?;

    if let Some(path) = stats {
        append_episode_stats(path, &outcome.episodes).await?;
        info!(path = %path.display(), episodes = outcome.episodes.len(), "appended episode stats");
    }

    if let Some(dir) = plot_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        render_loss_history(&outcome.loss_history, &dir.join("loss.svg"))
            .context("Failed to plot loss history")?;
    }

    let final_loss = outcome.loss_history.last().copied().unwrap_or_default();
    info!(model = %output.display(), final_loss, "training run finished");
    Ok(())
}

/// One JSON object per line, appended
async fn append_episode_stats(path: &Path, episodes: &[EpisodeStats]) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to open stats file {}", path.display()))?;

    for stats in episodes {
        let mut line = serde_json::to_string(stats)?;
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
    }
    file.flush().await?;
    Ok(())
}

/// Replay every strategy and report their cost
pub async fn compare(
    run: RunConfig,
    model: Option<&Path>,
    horizon: usize,
    plot_dir: Option<&Path>,
    report_path: Option<&Path>,
) -> Result<()> {
    anyhow::ensure!(horizon > 0, "Horizon must be at least one hour");

    let agent = match model {
        Some(path) => Some(
            HouseholdAgent::from_checkpoint(path)
                .await
                .with_context(|| format!("Failed to load model {}", path.display()))?,
        ),
        None => None,
    };

    let mut rng = match run.environment.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut env = HouseholdEnv::new(run.environment).context("Invalid environment config")?;
    let report = compare_strategies(&mut env, horizon, agent.as_ref(), &mut rng)
        .context("Strategy comparison failed")?;

    info!(horizon, strategies = report.runs.len(), "comparison finished");
    for (rank, (strategy, total)) in report.ranking().into_iter().enumerate() {
        let summary = report.runs[&strategy].summary();
        info!(
            "{:>2}. {:<14} total {:>10.3}  mean {:>8.4}  std {:>8.4}",
            rank + 1,
            strategy,
            total,
            summary.mean,
            summary.std_dev
        );
    }

    if let Some(dir) = plot_dir {
        let written = render_report(&report, dir).context("Failed to plot comparison")?;
        info!(dir = %dir.display(), figures = written.len(), "plots written");
    }

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Overrides;

    fn small_run(seed: u64) -> RunConfig {
        let mut run = RunConfig::default();
        run.apply(&Overrides {
            episodes: Some(2),
            steps: Some(5),
            batch_size: Some(4),
            seed: Some(seed),
        });
        run
    }

    #[tokio::test]
    async fn test_train_writes_model_stats_and_plot() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.json");
        let stats = dir.path().join("stats.jsonl");
        let plots = dir.path().join("plots");

        train(small_run(1), &model, Some(&stats), Some(&plots)).await.unwrap();
        // a second run appends
        train(small_run(2), &model, Some(&stats), None).await.unwrap();

        let agent = HouseholdAgent::from_checkpoint(&model).await.unwrap();
        assert_eq!(agent.config().base.batch_size, 4);
        assert_eq!(agent.metrics().total_episodes, 2);

        let lines: Vec<EpisodeStats> = std::fs::read_to_string(&stats)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|s| s.steps == 5));
        assert!(plots.join("loss.svg").exists());
    }

    #[tokio::test]
    async fn test_compare_with_model_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.json");
        train(small_run(3), &model, None, None).await.unwrap();

        let report = dir.path().join("report.json");
        let plots = dir.path().join("plots");
        compare(small_run(3), Some(&model), 24, Some(&plots), Some(&report))
            .await
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(json["horizon"], 24);
        assert_eq!(json["runs"].as_object().unwrap().len(), 7);
        assert!(json["q_values"].is_object());
        assert!(plots.join("q_values.svg").exists());
    }

    #[tokio::test]
    async fn test_compare_without_model_skips_dqn() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("report.json");
        compare(small_run(4), None, 12, None, Some(&report)).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(json["runs"].as_object().unwrap().len(), 6);
        assert!(json["runs"].get("DQN").is_none());
        assert!(json["q_values"].is_null());
    }

    #[tokio::test]
    async fn test_compare_rejects_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        let err = compare(small_run(5), Some(&missing), 12, None, None).await.unwrap_err();
        assert!(err.to_string().contains("Failed to load model"));
    }
}
