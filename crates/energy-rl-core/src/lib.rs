//! Core reinforcement learning traits and types for household energy control
//!
//! This crate provides the foundational abstractions shared by the
//! environment, the DQN agent and the strategy comparison tooling.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod agent;
pub mod environment;
pub mod error;
pub mod policy;
pub mod reward;
pub mod state;
pub mod trajectory;
pub mod value;

// Re-export core traits and types
pub use action::{ActionSpace, DiscreteAction, DiscreteSpace};
pub use agent::{Agent, AgentConfig, AgentMetrics, Learning};
pub use environment::{Environment, Episode, Step, TrackedEnvironment};
pub use error::{RLError, Result};
pub use policy::{epsilon_greedy_probabilities, EpsilonGreedy, Policy};
pub use reward::Reward;
pub use state::State;
pub use trajectory::Transition;
pub use value::{argmax, ActionValueFunction};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ActionSpace, ActionValueFunction, Agent, DiscreteAction, Environment, Policy, Result,
        Reward, State, Step, Transition,
    };
}
