//! Policy abstractions for action selection

use rand::Rng;
use rand_distr::{Distribution, WeightedIndex};

use crate::{argmax, ActionValueFunction, DiscreteAction, RLError, State};

/// Core policy trait for selecting actions
pub trait Policy {
    /// State type
    type State: State;
    /// Action type
    type Action: DiscreteAction;

    /// Probability of each action in `state`, in action index order
    fn action_probabilities(&self, state: &Self::State) -> crate::Result<Vec<f64>>;

    /// Sample an action from the policy distribution
    fn act<R: Rng + ?Sized>(&self, state: &Self::State, rng: &mut R) -> crate::Result<Self::Action> {
        let probs = self.action_probabilities(state)?;
        let dist = WeightedIndex::new(&probs).map_err(|e| RLError::Policy(e.to_string()))?;
        let index = dist.sample(rng);
        Self::Action::from_index(index)
            .ok_or_else(|| RLError::InvalidAction(format!("no action at index {index}")))
    }
}

/// Epsilon-greedy distribution over `q_values`
///
/// Every action receives `epsilon / n`; the first maximal entry receives an
/// extra `1 - epsilon`.
#[must_use]
pub fn epsilon_greedy_probabilities(q_values: &[f64], epsilon: f64) -> Vec<f64> {
    let Some(best) = argmax(q_values) else {
        return Vec::new();
    };
    let epsilon = epsilon.clamp(0.0, 1.0);
    #[allow(clippy::cast_precision_loss)]
    let mut probs = vec![epsilon / q_values.len() as f64; q_values.len()];
    probs[best] += 1.0 - epsilon;
    probs
}

/// Epsilon-greedy policy over an action value function
#[derive(Debug, Clone)]
pub struct EpsilonGreedy<Q> {
    /// Action value estimates
    pub q_function: Q,
    /// Exploration rate
    pub epsilon: f64,
}

impl<Q> EpsilonGreedy<Q> {
    /// Create a new epsilon-greedy policy
    pub fn new(q_function: Q, epsilon: f64) -> Self {
        Self {
            q_function,
            epsilon: epsilon.clamp(0.0, 1.0),
        }
    }

    /// Set the exploration rate
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon.clamp(0.0, 1.0);
    }
}

impl<Q: ActionValueFunction> EpsilonGreedy<Q> {
    /// Action with the highest estimated value
    pub fn greedy_action(&self, state: &Q::State) -> crate::Result<Q::Action> {
        self.q_function.best_action_value(state).map(|(action, _)| action)
    }
}

impl<Q: ActionValueFunction> Policy for EpsilonGreedy<Q> {
    type State = Q::State;
    type Action = Q::Action;

    fn action_probabilities(&self, state: &Self::State) -> crate::Result<Vec<f64>> {
        let q_values = self.q_function.all_q_values(state)?;
        Ok(epsilon_greedy_probabilities(&q_values, self.epsilon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::tests::Toy;
    use crate::environment::tests::LineState;
    use crate::value::tests::FixedQ;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_probabilities_boost_greedy_action() {
        let probs = epsilon_greedy_probabilities(&[0.2, 0.9, -0.3], 0.3);
        assert_relative_eq!(probs[0], 0.1);
        assert_relative_eq!(probs[1], 0.8);
        assert_relative_eq!(probs[2], 0.1);
    }

    #[test]
    fn test_empty_values_give_empty_distribution() {
        assert!(epsilon_greedy_probabilities(&[], 0.1).is_empty());
    }

    #[test]
    fn test_zero_epsilon_is_greedy() {
        let policy = EpsilonGreedy::new(FixedQ([0.0, 0.0, 1.0]), 0.0);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            assert_eq!(policy.act(&LineState(0.0), &mut rng).unwrap(), Toy::Right);
        }
        assert_eq!(policy.greedy_action(&LineState(0.0)).unwrap(), Toy::Right);
    }

    #[test]
    fn test_full_epsilon_explores_every_action() {
        let q = FixedQ([5.0, 0.0, 0.0]);
        let policy = EpsilonGreedy::new(&q, 1.0);
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = [false; 3];
        for _ in 0..300 {
            seen[policy.act(&LineState(0.0), &mut rng).unwrap().index()] = true;
        }
        assert_eq!(seen, [true; 3]);
    }

    #[test]
    fn test_epsilon_is_clamped() {
        let mut policy = EpsilonGreedy::new(FixedQ([0.0; 3]), 3.0);
        assert_relative_eq!(policy.epsilon, 1.0);
        policy.set_epsilon(-1.0);
        assert_relative_eq!(policy.epsilon, 0.0);
    }

    proptest! {
        #[test]
        fn prop_probabilities_sum_to_one_and_favor_best(
            q in proptest::collection::vec(-100.0f64..100.0, 1..8),
            epsilon in 0.0f64..=1.0,
        ) {
            let probs = epsilon_greedy_probabilities(&q, epsilon);
            prop_assert_eq!(probs.len(), q.len());
            prop_assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);

            let best = argmax(&q).unwrap();
            for p in &probs {
                prop_assert!(*p >= 0.0);
                prop_assert!(probs[best] >= *p);
            }
        }
    }
}
