//! Action representations and action spaces

use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt::Debug;

/// Trait for actions drawn from a small, fixed, enumerated set
pub trait DiscreteAction: Copy + Debug + PartialEq + Send + Sync + 'static {
    /// Number of distinct actions
    const COUNT: usize;

    /// Every action, in index order
    fn all() -> &'static [Self];

    /// Position of the action in [`DiscreteAction::all`]
    fn index(self) -> usize;

    /// Action at the given position, if any
    fn from_index(index: usize) -> Option<Self> {
        Self::all().get(index).copied()
    }

    /// One-hot encoding of the action
    fn one_hot(self) -> Vec<f64> {
        let mut flags = vec![0.0; Self::COUNT];
        flags[self.index()] = 1.0;
        flags
    }
}

/// Trait for defining action spaces
pub trait ActionSpace {
    /// The type of actions in this space
    type Action: DiscreteAction;

    /// Sample an action uniformly from the space
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> crate::Result<Self::Action>;

    /// Check if an action is valid within this space
    fn contains(&self, action: &Self::Action) -> bool;

    /// Number of actions in the space
    fn len(&self) -> usize;

    /// Whether the space has no actions at all
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Discrete action space over a subset of a [`DiscreteAction`] type
#[derive(Debug, Clone)]
pub struct DiscreteSpace<A> {
    actions: Vec<A>,
}

impl<A: DiscreteAction> DiscreteSpace<A> {
    /// Space containing every action
    #[must_use]
    pub fn full() -> Self {
        Self {
            actions: A::all().to_vec(),
        }
    }

    /// Space restricted to the given actions
    #[must_use]
    pub fn subset(actions: &[A]) -> Self {
        Self {
            actions: actions.to_vec(),
        }
    }

    /// Actions in this space
    #[must_use]
    pub fn actions(&self) -> &[A] {
        &self.actions
    }
}

impl<A: DiscreteAction> ActionSpace for DiscreteSpace<A> {
    type Action = A;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> crate::Result<Self::Action> {
        self.actions
            .choose(rng)
            .copied()
            .ok_or_else(|| crate::RLError::InvalidAction("cannot sample from an empty action space".into()))
    }

    fn contains(&self, action: &Self::Action) -> bool {
        self.actions.contains(action)
    }

    fn len(&self) -> usize {
        self.actions.len()
    }
}
