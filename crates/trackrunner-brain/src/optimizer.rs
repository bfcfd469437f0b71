//! Adam optimizer for dense layers

use ndarray::{Array1, Array2, Zip};
use serde::{Deserialize, Serialize};

use crate::qnet::{DenseLayer, LayerGradients, QNetwork};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Moments {
    m_weights: Array2<f32>,
    v_weights: Array2<f32>,
    m_bias: Array1<f32>,
    v_bias: Array1<f32>,
}

/// Adam with bias-corrected first and second moment estimates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adam {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    steps: u32,
    moments: Vec<Moments>,
}

impl Adam {
    /// Create with zeroed moments matching the network's layer shapes
    pub fn new(network: &QNetwork, learning_rate: f32) -> Self {
        let moments = network
            .layers()
            .iter()
            .map(|layer| Moments {
                m_weights: Array2::zeros(layer.weights.raw_dim()),
                v_weights: Array2::zeros(layer.weights.raw_dim()),
                m_bias: Array1::zeros(layer.bias.raw_dim()),
                v_bias: Array1::zeros(layer.bias.raw_dim()),
            })
            .collect();

        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            steps: 0,
            moments,
        }
    }

    /// Number of updates applied so far
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Apply one update to every layer
    pub fn step(&mut self, layers: &mut [DenseLayer], grads: &[LayerGradients]) {
        assert_eq!(layers.len(), grads.len(), "Gradient count mismatch");
        assert_eq!(layers.len(), self.moments.len(), "Optimizer/network mismatch");

        self.steps += 1;
        let t = self.steps as i32;
        let lr = self.learning_rate;
        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);
        let correction1 = 1.0 - b1.powi(t);
        let correction2 = 1.0 - b2.powi(t);

        for ((layer, grad), moments) in layers.iter_mut().zip(grads).zip(&mut self.moments) {
            Zip::from(&mut layer.weights)
                .and(&grad.weights)
                .and(&mut moments.m_weights)
                .and(&mut moments.v_weights)
                .for_each(|w, &g, m, v| {
                    *m = b1 * *m + (1.0 - b1) * g;
                    *v = b2 * *v + (1.0 - b2) * g * g;
                    let m_hat = *m / correction1;
                    let v_hat = *v / correction2;
                    *w -= lr * m_hat / (v_hat.sqrt() + eps);
                });

            Zip::from(&mut layer.bias)
                .and(&grad.bias)
                .and(&mut moments.m_bias)
                .and(&mut moments.v_bias)
                .for_each(|b, &g, m, v| {
                    *m = b1 * *m + (1.0 - b1) * g;
                    *v = b2 * *v + (1.0 - b2) * g * g;
                    let m_hat = *m / correction1;
                    let v_hat = *v / correction2;
                    *b -= lr * m_hat / (v_hat.sqrt() + eps);
                });
        }
    }
}
