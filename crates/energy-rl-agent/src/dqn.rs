//! Deep Q-Network (DQN) agent implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::path::Path;

use energy_rl_core::{
    ActionValueFunction, Agent, AgentConfig, AgentMetrics, DiscreteAction, EpsilonGreedy, Learning,
    RLError, Result, State, Transition,
};

use crate::network::QNetwork;
use crate::optimizer::Adam;

/// DQN-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    /// Base agent configuration
    #[serde(flatten)]
    pub base: AgentConfig,
    /// Exploration rate of the epsilon-greedy policy
    pub epsilon: f64,
    /// Width of each hidden layer
    pub hidden_units: usize,
    /// Number of hidden layers
    pub hidden_layers: usize,
    /// Negative-side slope of the leaky ReLU
    pub leaky_slope: f64,
    /// Random seed for weight initialisation and exploration
    pub seed: Option<u64>,
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self {
            base: AgentConfig::default(),
            epsilon: 0.1,
            hidden_units: 10,
            hidden_layers: 2,
            leaky_slope: 0.1,
            seed: None,
        }
    }
}

impl DqnConfig {
    /// Reject configurations the agent cannot be built from
    pub fn validate(&self) -> Result<()> {
        self.base.validate()?;
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(RLError::Config(format!(
                "epsilon must lie in [0, 1], got {}",
                self.epsilon
            )));
        }
        if self.hidden_units == 0 || self.hidden_layers == 0 {
            return Err(RLError::Config("hidden layers must be non-empty".into()));
        }
        if !self.leaky_slope.is_finite() {
            return Err(RLError::Config("leaky_slope must be finite".into()));
        }
        Ok(())
    }

    /// Random generator seeded from [`Self::seed`], or from entropy when unset
    #[must_use]
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// On-disk form of a trained agent
#[derive(Debug, Serialize, Deserialize)]
struct Checkpoint {
    run_id: String,
    created_at: DateTime<Utc>,
    config: DqnConfig,
    network: QNetwork,
    optimizer: Adam,
    metrics: AgentMetrics,
}

/// Q-learning agent with a single Q-network
///
/// The network scores one `(state, action)` pair at a time: its input is the
/// one-hot action followed by the state features.
#[derive(Debug, Clone)]
pub struct DqnAgent<S, A> {
    config: DqnConfig,
    network: QNetwork,
    optimizer: Adam,
    metrics: AgentMetrics,
    run_id: String,
    created_at: DateTime<Utc>,
    _marker: PhantomData<fn() -> (S, A)>,
}

impl<S: State, A: DiscreteAction> DqnAgent<S, A> {
    /// Width of the network input: one-hot action followed by state features
    pub const INPUT_DIM: usize = A::COUNT + S::FEATURE_DIM;

    /// Create an agent whose weights are drawn from the configured seed
    pub fn new(config: DqnConfig) -> Result<Self> {
        let mut rng = config.rng();
        Self::with_rng(config, &mut rng)
    }

    /// Create an agent drawing its initial weights from `rng`
    pub fn with_rng<R: Rng + ?Sized>(config: DqnConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let hidden = vec![config.hidden_units; config.hidden_layers];
        let network = QNetwork::new(Self::INPUT_DIM, &hidden, config.leaky_slope, rng)?;
        let optimizer = Adam::new(config.base.learning_rate);
        let run_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(
            %run_id,
            input_dim = Self::INPUT_DIM,
            parameters = network.parameter_count(),
            "created DQN agent"
        );

        Ok(Self {
            config,
            network,
            optimizer,
            metrics: AgentMetrics::default(),
            run_id,
            created_at: Utc::now(),
            _marker: PhantomData,
        })
    }

    /// Restore an agent from a checkpoint written by [`Agent::save`]
    pub async fn from_checkpoint(path: &Path) -> Result<Self>
    where
        S: 'static,
    {
        let mut agent = Self::new(DqnConfig::default())?;
        agent.load(path).await?;
        Ok(agent)
    }

    /// Agent configuration
    #[must_use]
    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    /// Underlying Q-network
    #[must_use]
    pub fn network(&self) -> &QNetwork {
        &self.network
    }

    /// Identifier of the training run that produced the weights
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Network input for `(state, action)`
    pub fn encode(state: &S, action: A) -> Result<Vec<f64>> {
        let features = state.features();
        if features.len() != S::FEATURE_DIM {
            return Err(RLError::DimensionMismatch {
                expected: S::FEATURE_DIM,
                actual: features.len(),
            });
        }
        let mut input = action.one_hot();
        input.extend(features);
        Ok(input)
    }

    /// Rows of `(state, action)` inputs stacked into one matrix
    fn encode_batch<'a>(pairs: impl Iterator<Item = (&'a S, A)>) -> Result<Array2<f64>>
    where
        S: 'a,
    {
        let mut data = Vec::new();
        let mut rows = 0;
        for (state, action) in pairs {
            data.extend(Self::encode(state, action)?);
            rows += 1;
        }
        Array2::from_shape_vec((rows, Self::INPUT_DIM), data)
            .map_err(|e| RLError::Computation(e.to_string()))
    }

    /// Q-values of every action in `state`, in action index order
    pub fn q_values(&self, state: &S) -> Result<Vec<f64>> {
        let inputs = Self::encode_batch(A::all().iter().map(|&a| (state, a)))?;
        Ok(self.network.predict_batch(&inputs)?.to_vec())
    }

    /// Action with the highest Q-value
    pub fn greedy_action(&self, state: &S) -> Result<A> {
        self.best_action_value(state).map(|(action, _)| action)
    }

    /// Epsilon-greedy policy over this agent's Q-values
    #[must_use]
    pub fn policy(&self) -> EpsilonGreedy<&Self> {
        EpsilonGreedy::new(self, self.config.epsilon)
    }

    /// Bellman targets `r + γ·max_a' Q(s', a')`, held fixed during the update
    fn targets(&self, batch: &[Transition<S, A>]) -> Result<Array1<f64>> {
        let actions = A::all();
        let next = Self::encode_batch(
            batch
                .iter()
                .flat_map(|t| actions.iter().map(move |&a| (&t.next_state, a))),
        )?;
        let next_q = self.network.predict_batch(&next)?;

        let gamma = self.config.base.gamma;
        let targets = batch
            .iter()
            .zip(next_q.exact_chunks(actions.len()))
            .map(|(t, q)| {
                let best = q.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                t.reward.value() + gamma * best
            })
            .collect();
        Ok(targets)
    }

    pub(crate) fn record_episode(&mut self, total_reward: f64) {
        let m = &mut self.metrics;
        m.total_episodes += 1;
        #[allow(clippy::cast_precision_loss)]
        let n = m.total_episodes as f64;
        m.avg_episode_reward += (total_reward - m.avg_episode_reward) / n;
    }
}

impl<S: State, A: DiscreteAction> ActionValueFunction for DqnAgent<S, A> {
    type State = S;
    type Action = A;

    fn q_value(&self, state: &S, action: A) -> Result<f64> {
        self.network.predict(&Self::encode(state, action)?)
    }

    fn all_q_values(&self, state: &S) -> Result<Vec<f64>> {
        self.q_values(state)
    }
}

#[async_trait]
impl<S, A> Agent for DqnAgent<S, A>
where
    S: State + 'static,
    A: DiscreteAction,
{
    type State = S;
    type Action = A;

    fn act(&self, state: &S) -> Result<A> {
        self.greedy_action(state)
    }

    async fn save(&self, path: &Path) -> Result<()> {
        let checkpoint = Checkpoint {
            run_id: self.run_id.clone(),
            created_at: self.created_at,
            config: self.config.clone(),
            network: self.network.clone(),
            optimizer: self.optimizer.clone(),
            metrics: self.metrics.clone(),
        };
        let json = serde_json::to_string_pretty(&checkpoint)?;
        tokio::fs::write(path, json).await?;
        tracing::info!(path = %path.display(), run_id = %self.run_id, "saved DQN checkpoint");
        Ok(())
    }

    async fn load(&mut self, path: &Path) -> Result<()> {
        let json = tokio::fs::read_to_string(path).await?;
        let checkpoint: Checkpoint = serde_json::from_str(&json)?;

        if checkpoint.network.input_dim() != Self::INPUT_DIM {
            return Err(RLError::DimensionMismatch {
                expected: Self::INPUT_DIM,
                actual: checkpoint.network.input_dim(),
            });
        }
        checkpoint.network.validate()?;
        checkpoint.optimizer.validate_for(&checkpoint.network)?;

        self.config = checkpoint.config;
        self.network = checkpoint.network;
        self.optimizer = checkpoint.optimizer;
        self.metrics = checkpoint.metrics;
        self.run_id = checkpoint.run_id;
        self.created_at = checkpoint.created_at;
        tracing::info!(path = %path.display(), run_id = %self.run_id, "loaded DQN checkpoint");
        Ok(())
    }

    fn metrics(&self) -> AgentMetrics {
        self.metrics.clone()
    }
}

impl<S, A> Learning for DqnAgent<S, A>
where
    S: State + 'static,
    A: DiscreteAction,
{
    fn train_step(&mut self, batch: &[Transition<S, A>]) -> Result<f64> {
        if batch.is_empty() {
            return Err(RLError::Agent("cannot train on an empty batch".into()));
        }

        let targets = self.targets(batch)?;
        let inputs = Self::encode_batch(batch.iter().map(|t| (&t.state, t.action)))?;
        let pass = self.network.forward(&inputs)?;

        #[allow(clippy::cast_precision_loss)]
        let n = batch.len() as f64;
        let diff = &pass.output - &targets;
        let loss = diff.mapv(|d| d * d).sum() / n;
        let output_grad = diff.mapv(|d| 2.0 * d / n);

        let gradients = self.network.backward(&pass, &output_grad)?;
        self.optimizer.step(&mut self.network, &gradients)?;

        self.metrics.total_steps += 1;
        self.metrics.loss = Some(loss);
        tracing::debug!(loss, grad_norm = gradients.norm(), step = self.metrics.total_steps, "train step");
        Ok(loss)
    }
}
