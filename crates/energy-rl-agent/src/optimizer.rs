//! Adam optimizer for [`QNetwork`]

use ndarray::{Array, Dimension, Zip};
use serde::{Deserialize, Serialize};

use energy_rl_core::{RLError, Result};

use crate::network::{Gradients, QNetwork};

/// First and second moment estimates, shaped like the network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Moments {
    weights: Vec<ndarray::Array2<f64>>,
    biases: Vec<ndarray::Array1<f64>>,
}

impl From<Gradients> for Moments {
    fn from(g: Gradients) -> Self {
        Self {
            weights: g.weights,
            biases: g.biases,
        }
    }
}

/// Adam with bias-corrected moment estimates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adam {
    /// Step size
    pub learning_rate: f64,
    /// Decay of the first moment estimate
    pub beta1: f64,
    /// Decay of the second moment estimate
    pub beta2: f64,
    /// Denominator offset
    pub epsilon: f64,
    t: u32,
    momentum: Option<Moments>,
    velocity: Option<Moments>,
}

struct StepCoefficients {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    correction1: f64,
    correction2: f64,
}

fn update<D: Dimension>(
    param: &mut Array<f64, D>,
    grad: &Array<f64, D>,
    m: &mut Array<f64, D>,
    v: &mut Array<f64, D>,
    c: &StepCoefficients,
) {
    Zip::from(param).and(grad).and(m).and(v).for_each(|p, &g, m, v| {
        *m = c.beta1 * *m + (1.0 - c.beta1) * g;
        *v = c.beta2 * *v + (1.0 - c.beta2) * g * g;
        let m_hat = *m / c.correction1;
        let v_hat = *v / c.correction2;
        *p -= c.learning_rate * m_hat / (v_hat.sqrt() + c.epsilon);
    });
}

impl Adam {
    /// Check that any stored moment estimates are shaped like `network`
    pub fn validate_for(&self, network: &QNetwork) -> Result<()> {
        let consistent = [&self.momentum, &self.velocity]
            .into_iter()
            .flatten()
            .all(|m| network.shapes_match(&m.weights, &m.biases));
        if consistent {
            Ok(())
        } else {
            Err(RLError::Computation(
                "optimizer moments do not match the network".into(),
            ))
        }
    }

    /// Create an optimizer with the usual decay rates
    #[must_use]
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            t: 0,
            momentum: None,
            velocity: None,
        }
    }

    /// Number of updates applied so far
    #[must_use]
    pub fn steps(&self) -> u32 {
        self.t
    }

    /// Apply one update to `network`
    pub fn step(&mut self, network: &mut QNetwork, gradients: &Gradients) -> Result<()> {
        if !gradients.matches(network) {
            return Err(RLError::Computation(
                "gradient shapes do not match the network".into(),
            ));
        }

        self.validate_for(network)?;

        // Initialize optimizer state if needed
        let momentum = self
            .momentum
            .get_or_insert_with(|| Gradients::zeros_like(network).into());
        let velocity = self
            .velocity
            .get_or_insert_with(|| Gradients::zeros_like(network).into());

        self.t = self.t.saturating_add(1);
        let t = i32::try_from(self.t).unwrap_or(i32::MAX);
        let c = StepCoefficients {
            learning_rate: self.learning_rate,
            beta1: self.beta1,
            beta2: self.beta2,
            epsilon: self.epsilon,
            correction1: 1.0 - self.beta1.powi(t),
            correction2: 1.0 - self.beta2.powi(t),
        };

        let (weights, biases) = network.parameters_mut();
        for (i, w) in weights.iter_mut().enumerate() {
            update(w, &gradients.weights[i], &mut momentum.weights[i], &mut velocity.weights[i], &c);
        }
        for (i, b) in biases.iter_mut().enumerate() {
            update(b, &gradients.biases[i], &mut momentum.biases[i], &mut velocity.biases[i], &c);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn mse(net: &QNetwork, x: &Array2<f64>, y: &Array1<f64>) -> (f64, Gradients) {
        let pass = net.forward(x).unwrap();
        #[allow(clippy::cast_precision_loss)]
        let n = y.len() as f64;
        let diff = &pass.output - y;
        let loss = diff.mapv(|d| d * d).sum() / n;
        let grads = net.backward(&pass, &diff.mapv(|d| 2.0 * d / n)).unwrap();
        (loss, grads)
    }

    #[test]
    fn test_adam_reduces_regression_loss() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut net = QNetwork::new(2, &[8, 8], 0.1, &mut rng).unwrap();
        let x = Array2::from_shape_vec((4, 2), vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0]).unwrap();
        let y = Array1::from(vec![0.0, 1.0, 1.0, 2.0]);

        let mut adam = Adam::new(1e-2);
        let (initial, _) = mse(&net, &x, &y);
        for _ in 0..300 {
            let (_, grads) = mse(&net, &x, &y);
            adam.step(&mut net, &grads).unwrap();
        }
        let (trained, _) = mse(&net, &x, &y);

        assert_eq!(adam.steps(), 300);
        assert!(trained < initial * 0.25, "loss {initial} -> {trained}");
    }

    #[test]
    fn test_first_step_moves_each_parameter_by_learning_rate() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut net = QNetwork::new(3, &[4], 0.1, &mut rng).unwrap();
        let mut before = net.clone();
        let mut grads = Gradients::zeros_like(&net);
        grads.weights[0].fill(0.5);

        let mut adam = Adam::new(1e-3);
        adam.step(&mut net, &grads).unwrap();

        let (after_w, after_b) = net.parameters_mut();
        let (before_w, before_b) = before.parameters_mut();
        let delta = &before_w[0] - &after_w[0];
        assert!(delta.iter().all(|d| (d - 1e-3).abs() < 1e-6));
        assert_eq!(before_w[1], after_w[1]);
        assert_eq!(before_b, after_b);
    }

    #[test]
    fn test_rejects_mismatched_gradients() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut net = QNetwork::new(3, &[4], 0.1, &mut rng).unwrap();
        let other = QNetwork::new(5, &[4], 0.1, &mut rng).unwrap();
        let grads = Gradients::zeros_like(&other);
        assert!(Adam::new(1e-3).step(&mut net, &grads).is_err());
    }

    #[test]
    fn test_moments_must_match_network() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut small = QNetwork::new(3, &[4], 0.1, &mut rng).unwrap();
        let mut wide = QNetwork::new(3, &[6], 0.1, &mut rng).unwrap();

        let mut adam = Adam::new(1e-3);
        assert!(adam.validate_for(&small).is_ok());
        let grads = Gradients::zeros_like(&small);
        adam.step(&mut small, &grads).unwrap();
        assert!(adam.validate_for(&small).is_ok());

        assert!(adam.validate_for(&wide).is_err());
        let grads = Gradients::zeros_like(&wide);
        assert!(adam.step(&mut wide, &grads).is_err());
        assert_eq!(adam.steps(), 1);
    }
}
