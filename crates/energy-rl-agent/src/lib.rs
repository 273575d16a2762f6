//! Deep Q-Network agent for household energy control
//!
//! This crate provides:
//! - A pure ndarray Q-network with hand-written backpropagation
//! - The Adam optimizer
//! - A FIFO experience replay memory
//! - The DQN agent and its training loop

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod buffer;
pub mod dqn;
pub mod network;
pub mod optimizer;
pub mod trainer;

// Re-export agents
pub use dqn::{DqnAgent, DqnConfig};

// Re-export training components
pub use buffer::ReplayMemory;
pub use network::{ForwardPass, Gradients, QNetwork};
pub use optimizer::Adam;
pub use trainer::{train, EpisodeStats, Trainer, TrainingConfig, TrainingOutcome};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{train, DqnAgent, DqnConfig, ReplayMemory, TrainingConfig, TrainingOutcome};
    pub use energy_rl_core::prelude::*;
}
