//! Feed-forward Q-network
//!
//! A pure ndarray multi-layer perceptron mapping an encoded
//! `(state, action)` pair to a single scalar value. Hidden layers use a
//! leaky ReLU; the output layer is linear. Gradients are computed by hand,
//! so the network needs no tensor framework.

use ndarray::{Array, Array1, Array2, Axis, Dimension, ShapeBuilder};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use energy_rl_core::{RLError, Result};

/// Multi-layer perceptron with one scalar output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QNetwork {
    /// Weights for each layer, shaped `(inputs, outputs)`
    weights: Vec<Array2<f64>>,
    /// Biases for each layer
    biases: Vec<Array1<f64>>,
    /// Negative-side slope of the hidden activations
    leaky_slope: f64,
}

/// Intermediate values of a batched forward pass, needed for backprop
#[derive(Debug, Clone)]
pub struct ForwardPass {
    /// Input of every layer; the first entry is the network input
    activations: Vec<Array2<f64>>,
    /// Pre-activation output of every layer
    pre_activations: Vec<Array2<f64>>,
    /// One value per input row
    pub output: Array1<f64>,
}

/// Parameter gradients, shaped like the network
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    /// Weight gradients for each layer
    pub weights: Vec<Array2<f64>>,
    /// Bias gradients for each layer
    pub biases: Vec<Array1<f64>>,
}

impl Gradients {
    /// Euclidean norm over every parameter gradient
    #[must_use]
    pub fn norm(&self) -> f64 {
        let weights: f64 = self.weights.iter().map(|w| w.mapv(|g| g * g).sum()).sum();
        let biases: f64 = self.biases.iter().map(|b| b.mapv(|g| g * g).sum()).sum();
        (weights + biases).sqrt()
    }

    /// Zero gradients shaped like `network`
    #[must_use]
    pub fn zeros_like(network: &QNetwork) -> Self {
        Self {
            weights: network.weights.iter().map(|w| Array2::zeros(w.raw_dim())).collect(),
            biases: network.biases.iter().map(|b| Array1::zeros(b.raw_dim())).collect(),
        }
    }

    /// Whether every tensor has the same shape as the matching network parameter
    #[must_use]
    pub fn matches(&self, network: &QNetwork) -> bool {
        network.shapes_match(&self.weights, &self.biases)
    }
}

fn leaky_relu(x: f64, slope: f64) -> f64 {
    if x > 0.0 {
        x
    } else {
        slope * x
    }
}

fn leaky_relu_grad(x: f64, slope: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else {
        slope
    }
}

/// Glorot normal initialization, truncated at two standard deviations
fn glorot_normal<Sh, D, R>(shape: Sh, fan_in: usize, fan_out: usize, rng: &mut R) -> Result<Array<f64, D>>
where
    Sh: ShapeBuilder<Dim = D>,
    D: Dimension,
    R: Rng + ?Sized,
{
    #[allow(clippy::cast_precision_loss)]
    let std_dev = (2.0 / (fan_in + fan_out) as f64).sqrt();
    let normal = Normal::new(0.0, std_dev)
        .map_err(|e| RLError::Computation(format!("invalid initializer: {e}")))?;
    Ok(Array::from_shape_simple_fn(shape, || loop {
        let x: f64 = normal.sample(rng);
        if x.abs() <= 2.0 * std_dev {
            break x;
        }
    }))
}

impl QNetwork {
    /// Create a randomly initialised network
    ///
    /// Weights and biases are drawn from a truncated Glorot normal
    /// distribution using `rng`.
    pub fn new<R: Rng + ?Sized>(
        input_dim: usize,
        hidden_dims: &[usize],
        leaky_slope: f64,
        rng: &mut R,
    ) -> Result<Self> {
        if input_dim == 0 || hidden_dims.contains(&0) {
            return Err(RLError::Config(format!(
                "layer sizes must be non-zero, got input {input_dim} and hidden {hidden_dims:?}"
            )));
        }

        let mut dims = Vec::with_capacity(hidden_dims.len() + 2);
        dims.push(input_dim);
        dims.extend_from_slice(hidden_dims);
        dims.push(1);

        let mut weights = Vec::with_capacity(dims.len() - 1);
        let mut biases = Vec::with_capacity(dims.len() - 1);
        for pair in dims.windows(2) {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            weights.push(glorot_normal((fan_in, fan_out), fan_in, fan_out, rng)?);
            biases.push(glorot_normal(fan_out, fan_out, fan_out, rng)?);
        }

        Ok(Self {
            weights,
            biases,
            leaky_slope,
        })
    }

    /// Check that the layers chain into a single output
    ///
    /// Every layer's input width must equal the previous layer's output
    /// width, every bias must match its layer, and the last layer must
    /// have one output.
    pub fn validate(&self) -> Result<()> {
        if self.weights.is_empty() {
            return Err(RLError::Computation("network has no layers".into()));
        }
        if self.weights.len() != self.biases.len() {
            return Err(RLError::DimensionMismatch {
                expected: self.weights.len(),
                actual: self.biases.len(),
            });
        }
        for (i, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            if b.len() != w.ncols() {
                return Err(RLError::DimensionMismatch {
                    expected: w.ncols(),
                    actual: b.len(),
                });
            }
            if let Some(next) = self.weights.get(i + 1) {
                if next.nrows() != w.ncols() {
                    return Err(RLError::DimensionMismatch {
                        expected: w.ncols(),
                        actual: next.nrows(),
                    });
                }
            }
        }
        let outputs = self.weights.last().map_or(0, Array2::ncols);
        if outputs != 1 {
            return Err(RLError::DimensionMismatch {
                expected: 1,
                actual: outputs,
            });
        }
        Ok(())
    }

    /// Whether `weights` and `biases` are shaped like this network's parameters
    pub(crate) fn shapes_match(&self, weights: &[Array2<f64>], biases: &[Array1<f64>]) -> bool {
        weights.len() == self.weights.len()
            && biases.len() == self.biases.len()
            && weights.iter().zip(&self.weights).all(|(g, w)| g.dim() == w.dim())
            && biases.iter().zip(&self.biases).all(|(g, b)| g.dim() == b.dim())
    }

    /// Width of the expected input
    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.weights.first().map_or(0, Array2::nrows)
    }

    /// Widths of the hidden layers
    #[must_use]
    pub fn hidden_dims(&self) -> Vec<usize> {
        let n = self.weights.len().saturating_sub(1);
        self.weights.iter().take(n).map(Array2::ncols).collect()
    }

    /// Total number of trainable parameters
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.weights.iter().map(Array2::len).sum::<usize>() + self.biases.iter().map(Array1::len).sum::<usize>()
    }

    /// Negative-side slope of the hidden activations
    #[must_use]
    pub fn leaky_slope(&self) -> f64 {
        self.leaky_slope
    }

    pub(crate) fn parameters_mut(&mut self) -> (&mut [Array2<f64>], &mut [Array1<f64>]) {
        (&mut self.weights, &mut self.biases)
    }

    /// Batched forward pass; each row of `inputs` is one encoded pair
    pub fn forward(&self, inputs: &Array2<f64>) -> Result<ForwardPass> {
        self.validate()?;
        if inputs.ncols() != self.input_dim() {
            return Err(RLError::DimensionMismatch {
                expected: self.input_dim(),
                actual: inputs.ncols(),
            });
        }

        let last = self.weights.len() - 1;
        let mut activations = Vec::with_capacity(self.weights.len());
        let mut pre_activations = Vec::with_capacity(self.weights.len());
        let mut current = inputs.clone();

        for (i, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            let z = current.dot(w) + b;
            let next = if i == last {
                z.clone()
            } else {
                z.mapv(|v| leaky_relu(v, self.leaky_slope))
            };
            activations.push(current);
            pre_activations.push(z);
            current = next;
        }

        Ok(ForwardPass {
            activations,
            pre_activations,
            output: current.column(0).to_owned(),
        })
    }

    /// Gradients of a loss given its derivative with respect to each output
    pub fn backward(&self, pass: &ForwardPass, output_grad: &Array1<f64>) -> Result<Gradients> {
        if output_grad.len() != pass.output.len() {
            return Err(RLError::DimensionMismatch {
                expected: pass.output.len(),
                actual: output_grad.len(),
            });
        }
        let n = self.weights.len();
        if pass.activations.len() != n || pass.pre_activations.len() != n {
            return Err(RLError::Computation("forward pass does not belong to this network".into()));
        }

        let mut weights = Vec::with_capacity(n);
        let mut biases = Vec::with_capacity(n);
        let mut delta = output_grad.clone().insert_axis(Axis(1));

        for i in (0..n).rev() {
            if i != n - 1 {
                let slope = self.leaky_slope;
                delta = delta * pass.pre_activations[i].mapv(|z| leaky_relu_grad(z, slope));
            }
            weights.push(pass.activations[i].t().dot(&delta));
            biases.push(delta.sum_axis(Axis(0)));
            if i > 0 {
                delta = delta.dot(&self.weights[i].t());
            }
        }

        weights.reverse();
        biases.reverse();
        Ok(Gradients { weights, biases })
    }

    /// Values for a batch of encoded pairs
    pub fn predict_batch(&self, inputs: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.forward(inputs)?.output)
    }

    /// Value for a single encoded pair
    pub fn predict(&self, input: &[f64]) -> Result<f64> {
        let inputs = Array2::from_shape_vec((1, input.len()), input.to_vec())
            .map_err(|e| RLError::Computation(e.to_string()))?;
        Ok(self.predict_batch(&inputs)?[0])
    }
}
