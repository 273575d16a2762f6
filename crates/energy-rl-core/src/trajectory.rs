//! Transitions stored for experience replay

use serde::{Deserialize, Serialize};

use crate::Reward;

/// Single `(state, action, reward, next_state)` transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition<S, A> {
    /// State the action was taken in
    pub state: S,
    /// Action taken
    pub action: A,
    /// Reward received
    pub reward: Reward,
    /// State reached after the action
    pub next_state: S,
}

impl<S, A> Transition<S, A> {
    /// Create a new transition
    pub fn new(state: S, action: A, reward: Reward, next_state: S) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
        }
    }
}
