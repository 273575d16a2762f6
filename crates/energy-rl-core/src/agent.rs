//! Agent traits and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{DiscreteAction, State, Transition};

/// Configuration shared by value-based agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Learning rate
    pub learning_rate: f64,
    /// Discount factor
    pub gamma: f64,
    /// Batch size for training
    pub batch_size: usize,
    /// Buffer size for experience replay
    pub buffer_size: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            gamma: 0.9,
            batch_size: 10,
            buffer_size: 100,
        }
    }
}

impl AgentConfig {
    /// Reject configurations the training loop cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(crate::RLError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(crate::RLError::Config(format!(
                "gamma must lie in [0, 1], got {}",
                self.gamma
            )));
        }
        if self.batch_size == 0 || self.buffer_size == 0 {
            return Err(crate::RLError::Config(
                "batch_size and buffer_size must be non-zero".into(),
            ));
        }
        if self.batch_size > self.buffer_size {
            return Err(crate::RLError::Config(format!(
                "batch_size {} exceeds buffer_size {}",
                self.batch_size, self.buffer_size
            )));
        }
        Ok(())
    }
}

/// Core agent trait
#[async_trait]
pub trait Agent: Send + Sync {
    /// State type
    type State: State;
    /// Action type
    type Action: DiscreteAction;

    /// Action the agent would take in `state` when not exploring
    fn act(&self, state: &Self::State) -> crate::Result<Self::Action>;

    /// Save the agent
    async fn save(&self, path: &std::path::Path) -> crate::Result<()>;

    /// Load the agent
    async fn load(&mut self, path: &std::path::Path) -> crate::Result<()>;

    /// Get agent metrics
    fn metrics(&self) -> AgentMetrics {
        AgentMetrics::default()
    }
}

/// Agent metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    /// Total gradient steps taken
    pub total_steps: usize,
    /// Total episodes
    pub total_episodes: usize,
    /// Average reward per episode
    pub avg_episode_reward: f64,
    /// Most recent loss value
    pub loss: Option<f64>,
}

/// Trait for agents that learn from replayed transitions
pub trait Learning: Agent {
    /// Perform one gradient step on a mini-batch, returning the loss
    fn train_step(
        &mut self,
        batch: &[Transition<Self::State, Self::Action>],
    ) -> crate::Result<f64>;
}
