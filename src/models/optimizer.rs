//! Adam optimiser and gradient clipping.

use ndarray::{Array, Dimension, Zip};

use super::lstm::LstmParams;

/// Adam hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdamConfig {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
        }
    }
}

/// Adam state: first and second moment estimates per parameter.
#[derive(Debug, Clone)]
pub struct Adam {
    config: AdamConfig,
    m: LstmParams,
    v: LstmParams,
    step: i32,
}

impl Adam {
    pub fn new(config: AdamConfig, params: &LstmParams) -> Self {
        Self {
            config,
            m: params.zeros_like(),
            v: params.zeros_like(),
            step: 0,
        }
    }

    /// Number of updates applied so far.
    pub fn steps(&self) -> i32 {
        self.step
    }

    /// Applies one bias-corrected update.
    pub fn update(&mut self, params: &mut LstmParams, grads: &LstmParams) {
        self.step = self.step.saturating_add(1);
        let c = self.config;
        let bias1 = 1.0 - c.beta1.powi(self.step);
        let bias2 = 1.0 - c.beta2.powi(self.step);
        let lr = c.learning_rate * bias2.sqrt() / bias1;

        let update = |p: &mut f32, g: f32, m: &mut f32, v: &mut f32| {
            *m = c.beta1 * *m + (1.0 - c.beta1) * g;
            *v = c.beta2 * *v + (1.0 - c.beta2) * g * g;
            *p -= lr * *m / (v.sqrt() + c.epsilon);
        };

        apply(
            &mut params.w_input,
            &grads.w_input,
            &mut self.m.w_input,
            &mut self.v.w_input,
            update,
        );
        apply(
            &mut params.w_hidden,
            &grads.w_hidden,
            &mut self.m.w_hidden,
            &mut self.v.w_hidden,
            update,
        );
        apply(&mut params.bias, &grads.bias, &mut self.m.bias, &mut self.v.bias, update);
        apply(&mut params.w_out, &grads.w_out, &mut self.m.w_out, &mut self.v.w_out, update);
        apply(&mut params.b_out, &grads.b_out, &mut self.m.b_out, &mut self.v.b_out, update);
    }
}

fn apply<D: Dimension>(
    param: &mut Array<f32, D>,
    grad: &Array<f32, D>,
    m: &mut Array<f32, D>,
    v: &mut Array<f32, D>,
    f: impl Fn(&mut f32, f32, &mut f32, &mut f32),
) {
    Zip::from(param)
        .and(grad)
        .and(m)
        .and(v)
        .for_each(|p, &g, m, v| f(p, g, m, v));
}

/// Rescales `grads` so their global norm is at most `max_norm`.
///
/// Returns the norm before clipping.
pub fn clip_by_global_norm(grads: &mut LstmParams, max_norm: f32) -> f32 {
    let norm = grads.global_norm();
    if norm > max_norm && norm.is_finite() {
        grads.scale(max_norm / norm);
    }
    norm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModelConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn params() -> LstmParams {
        let config = ModelConfig {
            vocab_size: 3,
            hidden_size: 2,
            sequence_length: 2,
            dropout: 0.0,
        };
        LstmParams::init(&config, &mut ChaCha8Rng::seed_from_u64(0)).unwrap()
    }

    #[test]
    fn first_step_moves_by_learning_rate() {
        let mut p = params();
        let before = p.clone();
        let mut grads = p.zeros_like();
        grads.b_out.fill(0.5);
        grads.w_out[[0, 0]] = -3.0;

        let mut adam = Adam::new(AdamConfig::default(), &p);
        adam.update(&mut p, &grads);
        assert_eq!(adam.steps(), 1);

        // Bias-corrected first step is lr * sign(g).
        for (a, b) in p.b_out.iter().zip(before.b_out.iter()) {
            assert!((b - a - 0.001).abs() < 1e-6);
        }
        assert!((p.w_out[[0, 0]] - before.w_out[[0, 0]] - 0.001).abs() < 1e-6);
        // Zero gradients leave weights untouched.
        assert_eq!(p.w_hidden, before.w_hidden);
    }

    #[test]
    fn clipping_caps_global_norm() {
        let mut grads = params().zeros_like();
        grads.bias.fill(3.0);
        grads.b_out.fill(4.0);
        let norm = clip_by_global_norm(&mut grads, 1.0);
        assert!(norm > 1.0);
        assert!((grads.global_norm() - 1.0).abs() < 1e-5);

        let mut small = params().zeros_like();
        small.b_out[0] = 0.5;
        assert_eq!(clip_by_global_norm(&mut small, 1.0), 0.5);
        assert_eq!(small.b_out[0], 0.5);
    }
}
