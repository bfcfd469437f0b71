//! Q-value network
//!
//! Dense feedforward network mapping a sensor state to one Q-value per
//! discrete action. Trained with mean-squared error and Adam.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::optimizer::Adam;
use crate::rng::BrainRng;

/// Layer activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Relu,
    Linear,
}

impl Activation {
    fn apply(&self, z: &Array2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => z.mapv(|v| v.max(0.0)),
            Activation::Linear => z.clone(),
        }
    }

    /// Multiply the upstream gradient by the activation derivative at `z`
    fn backprop(&self, z: &Array2<f32>, grad: Array2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => {
                let mut grad = grad;
                ndarray::Zip::from(&mut grad).and(z).for_each(|g, &v| {
                    if v <= 0.0 {
                        *g = 0.0;
                    }
                });
                grad
            }
            Activation::Linear => grad,
        }
    }
}

/// Fully connected layer, weights shaped (outputs, inputs)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
    pub activation: Activation,
}

impl DenseLayer {
    /// Glorot-uniform weights, zero bias
    pub fn glorot<R: BrainRng + ?Sized>(
        inputs: usize,
        outputs: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let limit = (6.0 / (inputs + outputs) as f32).sqrt();
        Self {
            weights: Array2::from_shape_fn((outputs, inputs), |_| rng.gen_symmetric(limit)),
            bias: Array1::zeros(outputs),
            activation,
        }
    }

    fn pre_activation(&self, input: &ArrayView2<f32>) -> Array2<f32> {
        input.dot(&self.weights.t()) + &self.bias
    }
}

/// Gradients for one dense layer
#[derive(Debug, Clone)]
pub struct LayerGradients {
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
}

/// Multi-layer Q-network: ReLU hidden layers, linear output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QNetwork {
    layers: Vec<DenseLayer>,
}

impl QNetwork {
    pub fn new<R: BrainRng + ?Sized>(
        state_size: usize,
        hidden: &[usize],
        action_size: usize,
        rng: &mut R,
    ) -> Self {
        let mut layers = Vec::with_capacity(hidden.len() + 1);
        let mut inputs = state_size;
        for &units in hidden {
            layers.push(DenseLayer::glorot(inputs, units, Activation::Relu, rng));
            inputs = units;
        }
        layers.push(DenseLayer::glorot(
            inputs,
            action_size,
            Activation::Linear,
            rng,
        ));
        Self { layers }
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [DenseLayer] {
        &mut self.layers
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map_or(0, |l| l.weights.ncols())
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map_or(0, |l| l.weights.nrows())
    }

    /// Q-values for a single state
    pub fn forward(&self, state: &[f32]) -> Vec<f32> {
        assert_eq!(state.len(), self.input_dim(), "Input dimension mismatch");

        let input = ArrayView1::from(state).insert_axis(Axis(0));
        self.forward_batch(input).row(0).to_vec()
    }

    /// Q-values for a batch of states, one row per state
    pub fn forward_batch(&self, states: ArrayView2<f32>) -> Array2<f32> {
        assert_eq!(states.ncols(), self.input_dim(), "Input dimension mismatch");

        let mut activation = states.to_owned();
        for layer in &self.layers {
            let z = layer.pre_activation(&activation.view());
            activation = layer.activation.apply(&z);
        }
        activation
    }

    /// Mean-squared error and per-layer gradients for one batch
    pub fn gradients(
        &self,
        states: ArrayView2<f32>,
        targets: ArrayView2<f32>,
    ) -> (f32, Vec<LayerGradients>) {
        assert_eq!(states.ncols(), self.input_dim(), "Input dimension mismatch");
        assert_eq!(
            targets.dim(),
            (states.nrows(), self.output_dim()),
            "Target shape mismatch"
        );

        // Forward pass, caching inputs and pre-activations of every layer
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut pre_activations = Vec::with_capacity(self.layers.len());
        let mut activation = states.to_owned();
        for layer in &self.layers {
            let z = layer.pre_activation(&activation.view());
            let next = layer.activation.apply(&z);
            inputs.push(activation);
            pre_activations.push(z);
            activation = next;
        }

        // MSE averaged over every element of the output matrix
        let diff = &activation - &targets;
        let n = diff.len().max(1) as f32;
        let loss = diff.mapv(|d| d * d).sum() / n;
        let mut grad = diff.mapv(|d| 2.0 * d / n);

        let mut grads = Vec::with_capacity(self.layers.len());
        for (i, layer) in self.layers.iter().enumerate().rev() {
            let dz = layer.activation.backprop(&pre_activations[i], grad);
            let weights = dz.t().dot(&inputs[i]);
            let bias = dz.sum_axis(Axis(0));
            grad = dz.dot(&layer.weights);
            grads.push(LayerGradients { weights, bias });
        }
        grads.reverse();

        (loss, grads)
    }

    /// One optimizer step on a batch. Returns the loss before the step.
    pub fn train_batch(
        &mut self,
        states: ArrayView2<f32>,
        targets: ArrayView2<f32>,
        optimizer: &mut Adam,
    ) -> f32 {
        let (loss, grads) = self.gradients(states, targets);
        optimizer.step(self.layers_mut(), &grads);
        loss
    }
}

/// Index of the largest value, first one on ties
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded;
    use ndarray::array;

    #[test]
    fn test_network_dimensions() {
        let mut rng = seeded(1);
        let net = QNetwork::new(3, &[24, 24], 3, &mut rng);

        assert_eq!(net.input_dim(), 3);
        assert_eq!(net.output_dim(), 3);
        assert_eq!(net.layers().len(), 3);
        assert_eq!(net.layers()[0].weights.dim(), (24, 3));
        assert_eq!(net.layers()[1].weights.dim(), (24, 24));
        assert_eq!(net.layers()[2].weights.dim(), (3, 24));
        assert!(net.layers().iter().all(|l| l.bias.iter().all(|&b| b == 0.0)));
    }

    #[test]
    fn test_glorot_limit() {
        let mut rng = seeded(2);
        let layer = DenseLayer::glorot(3, 24, Activation::Relu, &mut rng);
        let limit = (6.0f32 / 27.0).sqrt();
        assert!(layer.weights.iter().all(|w| w.abs() <= limit));
    }

    #[test]
    fn test_forward_matches_batch() {
        let mut rng = seeded(3);
        let net = QNetwork::new(3, &[24, 24], 3, &mut rng);

        let single = net.forward(&[0.1, 0.5, 0.9]);
        let batch = net.forward_batch(array![[0.1, 0.5, 0.9], [0.0, 0.0, 0.0]].view());

        assert_eq!(single.len(), 3);
        for (a, b) in single.iter().zip(batch.row(0).iter()) {
            assert!((a - b).abs() < 1e-6);
        }
        // Zero input with zero biases gives zero output
        assert!(batch.row(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        let mut rng = seeded(4);
        let net = QNetwork::new(2, &[4], 2, &mut rng);
        let states = array![[0.3, -0.7], [0.9, 0.2]];
        let targets = array![[1.0, -1.0], [0.5, 0.0]];

        let (_, grads) = net.gradients(states.view(), targets.view());

        let eps = 1e-3;
        for layer_idx in 0..2 {
            let (rows, cols) = net.layers()[layer_idx].weights.dim();
            for r in 0..rows {
                for c in 0..cols {
                    let mut plus = net.clone();
                    plus.layers_mut()[layer_idx].weights[[r, c]] += eps;
                    let mut minus = net.clone();
                    minus.layers_mut()[layer_idx].weights[[r, c]] -= eps;

                    let (lp, _) = plus.gradients(states.view(), targets.view());
                    let (lm, _) = minus.gradients(states.view(), targets.view());
                    let numeric = (lp - lm) / (2.0 * eps);
                    let analytic = grads[layer_idx].weights[[r, c]];

                    assert!(
                        (numeric - analytic).abs() < 1e-2,
                        "layer {layer_idx} [{r},{c}]: numeric {numeric} vs analytic {analytic}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_train_batch_reduces_loss() {
        let mut rng = seeded(5);
        let mut net = QNetwork::new(3, &[24, 24], 3, &mut rng);
        let mut adam = Adam::new(&net, 0.01);

        let states = array![[0.1, 0.2, 0.3], [0.9, 0.8, 0.7], [0.5, 0.0, 0.5]];
        let targets = array![[1.0, 0.0, -1.0], [0.0, 2.0, 0.0], [0.5, 0.5, 0.5]];

        let first = net.train_batch(states.view(), targets.view(), &mut adam);
        let mut last = first;
        for _ in 0..200 {
            last = net.train_batch(states.view(), targets.view(), &mut adam);
        }
        assert!(last < first * 0.5, "loss {first} -> {last}");
    }

    #[test]
    fn test_argmax_first_on_ties() {
        assert_eq!(argmax(&[1.0, 3.0, 2.0]), 1);
        assert_eq!(argmax(&[2.0, 2.0, 1.0]), 0);
        assert_eq!(argmax(&[-1.0, -0.5, -0.5]), 1);
        assert_eq!(argmax(&[]), 0);
    }
}
