// Run configuration: an optional JSON file, then command-line overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use energy_rl_agent::{DqnConfig, TrainingConfig};
use energy_rl_env::HouseholdConfig;

/// Everything a train or compare run needs; missing sections default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub environment: HouseholdConfig,
    pub agent: DqnConfig,
    pub training: TrainingConfig,
}

/// Command-line values that win over the run file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub episodes: Option<usize>,
    pub steps: Option<usize>,
    pub batch_size: Option<usize>,
    pub seed: Option<u64>,
}

impl RunConfig {
    /// Read `path`, or fall back to defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read run config {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("Invalid run config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded run config");
        Ok(config)
    }

    /// Apply command-line overrides; one seed drives both environment and agent
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(episodes) = overrides.episodes {
            self.training.episodes = episodes;
        }
        if let Some(steps) = overrides.steps {
            self.training.steps_per_episode = steps;
        }
        if let Some(batch_size) = overrides.batch_size {
            self.agent.base.batch_size = batch_size;
        }
        if let Some(seed) = overrides.seed {
            self.environment.seed = Some(seed);
            self.agent.seed = Some(seed);
        }
    }
}
