//! Action value functions

use crate::{DiscreteAction, State};

/// Index of the first maximal entry, `None` for an empty slice
///
/// NaN entries lose against any number.
#[must_use]
pub fn argmax(values: &[f64]) -> Option<usize> {
    if values.is_empty() {
        return None;
    }
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] || values[best].is_nan() {
            best = i;
        }
    }
    Some(best)
}

/// Action value function Q(s, a)
pub trait ActionValueFunction {
    /// State type
    type State: State;
    /// Action type
    type Action: DiscreteAction;

    /// Estimate the value of taking an action in a given state
    fn q_value(&self, state: &Self::State, action: Self::Action) -> crate::Result<f64>;

    /// Get Q-values for all actions, in action index order
    fn all_q_values(&self, state: &Self::State) -> crate::Result<Vec<f64>> {
        Self::Action::all()
            .iter()
            .map(|&action| self.q_value(state, action))
            .collect()
    }

    /// Get the best action and its value
    fn best_action_value(&self, state: &Self::State) -> crate::Result<(Self::Action, f64)> {
        let q_values = self.all_q_values(state)?;
        let best = argmax(&q_values)
            .ok_or_else(|| crate::RLError::Computation("no action values to compare".into()))?;
        let action = Self::Action::from_index(best)
            .ok_or_else(|| crate::RLError::InvalidAction(format!("no action at index {best}")))?;
        Ok((action, q_values[best]))
    }
}

impl<Q> ActionValueFunction for &Q
where
    Q: ActionValueFunction + ?Sized,
{
    type State = Q::State;
    type Action = Q::Action;

    fn q_value(&self, state: &Self::State, action: Self::Action) -> crate::Result<f64> {
        (**self).q_value(state, action)
    }

    fn all_q_values(&self, state: &Self::State) -> crate::Result<Vec<f64>> {
        (**self).all_q_values(state)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::action::tests::Toy;
    use crate::environment::tests::LineState;

    /// Q-function whose value depends on the action only
    pub struct FixedQ(pub [f64; 3]);

    impl ActionValueFunction for FixedQ {
        type State = LineState;
        type Action = Toy;

        fn q_value(&self, _state: &LineState, action: Toy) -> crate::Result<f64> {
            Ok(self.0[action.index()])
        }
    }

    #[test]
    fn test_argmax_picks_first_maximum() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), Some(1));
        assert_eq!(argmax(&[-2.0, -1.0, -5.0]), Some(1));
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[f64::NAN, 0.5]), Some(1));
    }

    #[test]
    fn test_best_action_value() {
        let q = FixedQ([0.1, -0.4, 0.7]);
        let (action, value) = q.best_action_value(&LineState(0.0)).unwrap();
        assert_eq!(action, Toy::Right);
        assert!((value - 0.7).abs() < 1e-12);
    }
}
