//! Environment traits and types

use serde::{Deserialize, Serialize};

use crate::{DiscreteAction, Reward, State};

/// Result of a single environment step
#[derive(Debug, Clone)]
pub struct Step<S> {
    /// State reached after the action
    pub state: S,
    /// Reward signal
    pub reward: Reward,
    /// Monetary cost paid during the step
    pub cost: f64,
    /// Whether the episode is done
    pub done: bool,
}

/// Episode information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    /// Episode ID
    pub id: String,
    /// Total reward
    pub total_reward: f64,
    /// Total cost
    pub total_cost: f64,
    /// Number of steps
    pub steps: usize,
    /// Start time
    pub start_time: chrono::DateTime<chrono::Utc>,
    /// End time
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
}

/// Core environment trait
///
/// Stepping is synchronous: every call advances the environment by exactly
/// one transition from [`Environment::current_state`].
pub trait Environment {
    /// State type
    type State: State;
    /// Action type
    type Action: DiscreteAction;

    /// Start a new episode and return its initial state
    fn reset(&mut self) -> crate::Result<Self::State>;

    /// Apply an action to the current state
    fn step(&mut self, action: Self::Action) -> crate::Result<Step<Self::State>>;

    /// State the next [`Environment::step`] starts from
    fn current_state(&self) -> &Self::State;

    /// Rewind the environment to a previously observed state
    fn restore(&mut self, state: Self::State) -> crate::Result<()>;

    /// Get current episode info
    fn episode_info(&self) -> Option<Episode> {
        None
    }
}

impl<E> Environment for &mut E
where
    E: Environment + ?Sized,
{
    type State = E::State;
    type Action = E::Action;

    fn reset(&mut self) -> crate::Result<Self::State> {
        (**self).reset()
    }

    fn step(&mut self, action: Self::Action) -> crate::Result<Step<Self::State>> {
        (**self).step(action)
    }

    fn current_state(&self) -> &Self::State {
        (**self).current_state()
    }

    fn restore(&mut self, state: Self::State) -> crate::Result<()> {
        (**self).restore(state)
    }

    fn episode_info(&self) -> Option<Episode> {
        (**self).episode_info()
    }
}

/// Wrapper for environments that tracks episodes
pub struct TrackedEnvironment<E> {
    /// Inner environment
    pub env: E,
    /// Current episode
    pub episode: Option<Episode>,
    /// Step counter
    pub step_count: usize,
}

impl<E> TrackedEnvironment<E> {
    /// Create a new tracked environment
    pub fn new(env: E) -> Self {
        Self {
            env,
            episode: None,
            step_count: 0,
        }
    }

    /// Unwrap the inner environment
    pub fn into_inner(self) -> E {
        self.env
    }

    /// Close the current episode, if one is open
    pub fn finish_episode(&mut self) -> Option<Episode> {
        let episode = self.episode.as_mut()?;
        if episode.end_time.is_none() {
            episode.end_time = Some(chrono::Utc::now());
        }
        Some(episode.clone())
    }
}

impl<E> Environment for TrackedEnvironment<E>
where
    E: Environment,
{
    type State = E::State;
    type Action = E::Action;

    fn reset(&mut self) -> crate::Result<Self::State> {
        self.finish_episode();

        let episode = Episode {
            id: uuid::Uuid::new_v4().to_string(),
            total_reward: 0.0,
            total_cost: 0.0,
            steps: 0,
            start_time: chrono::Utc::now(),
            end_time: None,
        };
        tracing::debug!(episode_id = %episode.id, "starting episode");
        self.episode = Some(episode);
        self.step_count = 0;

        self.env.reset()
    }

    fn step(&mut self, action: Self::Action) -> crate::Result<Step<Self::State>> {
        let step = self.env.step(action)?;

        self.step_count += 1;
        if let Some(ref mut episode) = self.episode {
            episode.total_reward += step.reward.0;
            episode.total_cost += step.cost;
            episode.steps = self.step_count;

            if step.done {
                episode.end_time = Some(chrono::Utc::now());
            }
        }

        Ok(step)
    }

    fn current_state(&self) -> &Self::State {
        self.env.current_state()
    }

    fn restore(&mut self, state: Self::State) -> crate::Result<()> {
        self.env.restore(state)
    }

    fn episode_info(&self) -> Option<Episode> {
        self.episode.clone()
    }
}
