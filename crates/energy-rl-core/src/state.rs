//! State representations

use std::fmt::Debug;

/// Trait for states in an RL environment
pub trait State: Clone + Debug + Send + Sync {
    /// Number of entries in [`State::features`]
    const FEATURE_DIM: usize;

    /// Get a feature representation of the state
    fn features(&self) -> Vec<f64>;
}
