//! DQN training loop with experience replay

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use energy_rl_core::{
    DiscreteAction, Environment, Learning, Policy, RLError, Result, State, TrackedEnvironment,
    Transition,
};

use crate::buffer::ReplayMemory;
use crate::dqn::{DqnAgent, DqnConfig};

/// Training loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of episodes
    pub episodes: usize,
    /// Environment steps (and gradient steps) per episode
    pub steps_per_episode: usize,
    /// Log progress every N episodes
    pub log_interval: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 50,
            steps_per_episode: 50,
            log_interval: 10,
        }
    }
}

impl TrainingConfig {
    /// Reject configurations the loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.steps_per_episode == 0 {
            return Err(RLError::Config("steps_per_episode must be non-zero".into()));
        }
        if self.log_interval == 0 {
            return Err(RLError::Config("log_interval must be non-zero".into()));
        }
        Ok(())
    }
}

/// Episode training statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStats {
    /// Episode index, starting at zero
    pub episode: usize,
    /// Episode identifier assigned by the tracked environment
    pub episode_id: String,
    /// Sum of the mini-batch losses over the episode
    pub loss: f64,
    /// Sum of rewards
    pub total_reward: f64,
    /// Sum of costs
    pub total_cost: f64,
    /// Steps taken
    pub steps: usize,
    /// When the episode finished
    pub timestamp: DateTime<Utc>,
}

/// Result of a training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome<S, A> {
    /// Accumulated loss of every episode
    pub loss_history: Vec<f64>,
    /// Per-episode statistics
    pub episodes: Vec<EpisodeStats>,
    /// Trained agent
    pub agent: DqnAgent<S, A>,
}

/// Owns the agent, its replay memory and the exploration RNG
pub struct Trainer<S, A> {
    agent: DqnAgent<S, A>,
    memory: ReplayMemory<S, A>,
    config: TrainingConfig,
    rng: StdRng,
}

impl<S, A> Trainer<S, A>
where
    S: State + 'static,
    A: DiscreteAction,
{
    /// Create a trainer with a freshly initialised agent and empty memory
    pub fn new(dqn_config: DqnConfig, config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = dqn_config.rng();
        let memory = ReplayMemory::new(dqn_config.base.buffer_size);
        let agent = DqnAgent::with_rng(dqn_config, &mut rng)?;
        Ok(Self {
            agent,
            memory,
            config,
            rng,
        })
    }

    /// Agent being trained
    #[must_use]
    pub fn agent(&self) -> &DqnAgent<S, A> {
        &self.agent
    }

    /// Replay memory
    #[must_use]
    pub fn memory(&self) -> &ReplayMemory<S, A> {
        &self.memory
    }

    /// Act epsilon-greedily, step `env` and remember the transition
    fn explore<E>(&mut self, env: &mut E) -> Result<()>
    where
        E: Environment<State = S, Action = A>,
    {
        let state = env.current_state().clone();
        let action = self.agent.policy().act(&state, &mut self.rng)?;
        let step = env.step(action)?;
        self.memory.push(Transition::new(state, action, step.reward, step.state));
        Ok(())
    }

    /// Fill the replay memory to capacity with the untrained policy
    pub fn prefill<E>(&mut self, env: &mut E) -> Result<()>
    where
        E: Environment<State = S, Action = A>,
    {
        env.reset()?;
        while !self.memory.is_full() {
            self.explore(env)?;
        }
        tracing::debug!(transitions = self.memory.len(), "replay memory filled");
        Ok(())
    }

    /// Run one episode, taking a gradient step after every environment step
    pub fn run_episode<E>(&mut self, env: &mut TrackedEnvironment<E>, episode: usize) -> Result<EpisodeStats>
    where
        E: Environment<State = S, Action = A>,
    {
        env.reset()?;
        let batch_size = self.agent.config().base.batch_size;
        let mut loss = 0.0;

        for _ in 0..self.config.steps_per_episode {
            self.explore(env)?;
            let batch = self.memory.sample(batch_size, &mut self.rng).ok_or_else(|| {
                RLError::Agent(format!(
                    "replay memory holds {} transitions, batch needs {batch_size}",
                    self.memory.len()
                ))
            })?;
            loss += self.agent.train_step(&batch)?;
            metrics::counter!("dqn_train_steps_total", 1);
        }

        let info = env
            .finish_episode()
            .ok_or_else(|| RLError::Environment("episode was never started".into()))?;
        self.agent.record_episode(info.total_reward);

        #[allow(clippy::cast_precision_loss)]
        let memory_len = self.memory.len() as f64;
        metrics::gauge!("dqn_replay_memory_len", memory_len);
        metrics::gauge!("dqn_episode_loss", loss);

        Ok(EpisodeStats {
            episode,
            episode_id: info.id,
            loss,
            total_reward: info.total_reward,
            total_cost: info.total_cost,
            steps: info.steps,
            timestamp: info.end_time.unwrap_or_else(Utc::now),
        })
    }

    /// Pre-fill the memory, then train for the configured number of episodes
    pub fn run<E>(mut self, env: E) -> Result<TrainingOutcome<S, A>>
    where
        E: Environment<State = S, Action = A>,
    {
        let mut env = TrackedEnvironment::new(env);
        self.prefill(&mut env.env)?;

        tracing::info!(
            episodes = self.config.episodes,
            steps = self.config.steps_per_episode,
            batch_size = self.agent.config().base.batch_size,
            "starting DQN training"
        );

        let mut loss_history = Vec::with_capacity(self.config.episodes);
        let mut episodes = Vec::with_capacity(self.config.episodes);
        for episode in 0..self.config.episodes {
            let stats = self.run_episode(&mut env, episode)?;
            if episode % self.config.log_interval == 0 {
                tracing::info!(
                    episode,
                    loss = stats.loss,
                    reward = stats.total_reward,
                    cost = stats.total_cost,
                    "episode finished"
                );
            }
            loss_history.push(stats.loss);
            episodes.push(stats);
        }

        tracing::info!(run_id = %self.agent.run_id(), "training complete");
        Ok(TrainingOutcome {
            loss_history,
            episodes,
            agent: self.agent,
        })
    }
}

/// Train a fresh DQN agent on `env`
pub fn train<E>(
    env: E,
    dqn_config: DqnConfig,
    config: TrainingConfig,
) -> Result<TrainingOutcome<E::State, E::Action>>
where
    E: Environment,
    E::State: 'static,
{
    Trainer::new(dqn_config, config)?.run(env)
}
