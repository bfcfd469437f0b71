//! Evolvable steering network
//!
//! A bias-free two-layer network: input -> hidden (sigmoid) -> output
//! (linear). It is never trained by gradients; new generations are produced
//! by cloning survivor brains and perturbing their weights.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::rng::BrainRng;

/// Feedforward network evolved by truncation selection and mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteeringNetwork {
    /// Shape (hidden, input)
    weights_input_hidden: Array2<f32>,
    /// Shape (output, hidden)
    weights_hidden_output: Array2<f32>,
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl SteeringNetwork {
    /// Create with every weight drawn uniformly from [-1, 1)
    pub fn random<R: BrainRng + ?Sized>(
        input_dim: usize,
        hidden_dim: usize,
        output_dim: usize,
        rng: &mut R,
    ) -> Self {
        let weights_input_hidden =
            Array2::from_shape_fn((hidden_dim, input_dim), |_| rng.gen_symmetric(1.0));
        let weights_hidden_output =
            Array2::from_shape_fn((output_dim, hidden_dim), |_| rng.gen_symmetric(1.0));

        Self {
            weights_input_hidden,
            weights_hidden_output,
        }
    }

    pub fn input_dim(&self) -> usize {
        self.weights_input_hidden.ncols()
    }

    pub fn hidden_dim(&self) -> usize {
        self.weights_input_hidden.nrows()
    }

    pub fn output_dim(&self) -> usize {
        self.weights_hidden_output.nrows()
    }

    /// Dimensions of both weight matrices
    pub fn shape(&self) -> [(usize, usize); 2] {
        [
            self.weights_input_hidden.dim(),
            self.weights_hidden_output.dim(),
        ]
    }

    /// Total number of weights
    pub fn weight_count(&self) -> usize {
        self.weights_input_hidden.len() + self.weights_hidden_output.len()
    }

    /// Forward pass: sensor readings -> raw outputs
    pub fn predict(&self, inputs: &[f32]) -> Vec<f32> {
        assert_eq!(inputs.len(), self.input_dim(), "Input dimension mismatch");

        let input = ArrayView1::from(inputs);
        let hidden: Array1<f32> = self.weights_input_hidden.dot(&input).mapv(sigmoid);
        self.weights_hidden_output.dot(&hidden).to_vec()
    }

    /// Perturb each weight independently with probability `rate` by a
    /// uniform value in [-magnitude, magnitude). Returns how many weights
    /// changed.
    pub fn mutate<R: BrainRng + ?Sized>(&mut self, rate: f32, magnitude: f32, rng: &mut R) -> usize {
        let mut mutated = 0;
        for weights in [
            &mut self.weights_input_hidden,
            &mut self.weights_hidden_output,
        ] {
            for weight in weights.iter_mut() {
                if rng.check_probability(rate) {
                    *weight += rng.gen_symmetric(magnitude);
                    mutated += 1;
                }
            }
        }
        mutated
    }

    /// All weights in row-major order, input layer first
    pub fn weights(&self) -> Vec<f32> {
        self.weights_input_hidden
            .iter()
            .chain(self.weights_hidden_output.iter())
            .copied()
            .collect()
    }
}
