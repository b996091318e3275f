//! Single-layer LSTM next-symbol model.
//!
//! One-hot symbol windows feed a single LSTM layer; the final hidden state
//! (with dropout while training) goes through a dense softmax layer over the
//! vocabulary. Gate blocks are stacked in the order input, forget, cell,
//! output along the first axis of the input and recurrent matrices.
//!
//! Because the input is one-hot, `W_input · x_t` is a column lookup and the
//! one-hot matrix is never materialised here.

use ndarray::{s, Array1, Array2, Axis, Dimension};
use rand::Rng;
use rand_distr::{Bernoulli, Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{MelodyError, Result};
use crate::types::ModelConfig;

use super::NextSymbolModel;

/// Trainable weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmParams {
    /// Input weights, `[4H, V]`.
    pub w_input: Array2<f32>,
    /// Recurrent weights, `[4H, H]`.
    pub w_hidden: Array2<f32>,
    /// Gate biases, `[4H]`.
    pub bias: Array1<f32>,
    /// Output projection, `[V, H]`.
    pub w_out: Array2<f32>,
    /// Output bias, `[V]`.
    pub b_out: Array1<f32>,
}

impl LstmParams {
    /// Random initialisation: scaled normal weights, forget-gate bias of one.
    pub fn init<R: Rng + ?Sized>(config: &ModelConfig, rng: &mut R) -> Result<Self> {
        let v = config.vocab_size;
        let h = config.hidden_size;

        let w_input = random_matrix((4 * h, v), glorot_std(v, 4 * h), rng)?;
        let w_hidden = random_matrix((4 * h, h), glorot_std(h, 4 * h), rng)?;
        let w_out = random_matrix((v, h), glorot_std(h, v), rng)?;

        let mut bias = Array1::zeros(4 * h);
        bias.slice_mut(s![h..2 * h]).fill(1.0);

        Ok(Self {
            w_input,
            w_hidden,
            bias,
            w_out,
            b_out: Array1::zeros(v),
        })
    }

    /// All-zero parameters with the same shapes.
    pub fn zeros_like(&self) -> Self {
        Self {
            w_input: Array2::zeros(self.w_input.raw_dim()),
            w_hidden: Array2::zeros(self.w_hidden.raw_dim()),
            bias: Array1::zeros(self.bias.raw_dim()),
            w_out: Array2::zeros(self.w_out.raw_dim()),
            b_out: Array1::zeros(self.b_out.raw_dim()),
        }
    }

    /// Checks every tensor against the architecture.
    pub fn check_shapes(&self, config: &ModelConfig) -> Result<()> {
        let v = config.vocab_size;
        let h = config.hidden_size;
        let expected: [(&str, &[usize], Vec<usize>); 5] = [
            ("w_input", self.w_input.shape(), vec![4 * h, v]),
            ("w_hidden", self.w_hidden.shape(), vec![4 * h, h]),
            ("bias", self.bias.shape(), vec![4 * h]),
            ("w_out", self.w_out.shape(), vec![v, h]),
            ("b_out", self.b_out.shape(), vec![v]),
        ];
        for (name, actual, want) in expected {
            if actual != want.as_slice() {
                return Err(MelodyError::invalid_artifact(format!(
                    "{} has shape {:?}, expected {:?}",
                    name, actual, want
                )));
            }
        }
        Ok(())
    }

    /// Euclidean norm over every tensor.
    pub fn global_norm(&self) -> f32 {
        let sum_sq = sum_squares(&self.w_input)
            + sum_squares(&self.w_hidden)
            + sum_squares(&self.bias)
            + sum_squares(&self.w_out)
            + sum_squares(&self.b_out);
        sum_sq.sqrt()
    }

    /// Multiplies every tensor by `factor`.
    pub fn scale(&mut self, factor: f32) {
        self.w_input *= factor;
        self.w_hidden *= factor;
        self.bias *= factor;
        self.w_out *= factor;
        self.b_out *= factor;
    }

    /// True when no tensor holds NaN or infinity.
    pub fn is_finite(&self) -> bool {
        all_finite(&self.w_input)
            && all_finite(&self.w_hidden)
            && all_finite(&self.bias)
            && all_finite(&self.w_out)
            && all_finite(&self.b_out)
    }
}

fn glorot_std(fan_in: usize, fan_out: usize) -> f32 {
    (2.0 / (fan_in + fan_out) as f32).sqrt()
}

fn random_matrix<R: Rng + ?Sized>(
    shape: (usize, usize),
    std: f32,
    rng: &mut R,
) -> Result<Array2<f32>> {
    let normal = Normal::new(0.0f32, std)
        .map_err(|e| MelodyError::training_failed(format!("weight initialisation: {}", e)))?;
    Ok(Array2::from_shape_simple_fn(shape, || normal.sample(rng)))
}

fn sum_squares<D: Dimension>(a: &ndarray::Array<f32, D>) -> f32 {
    a.iter().map(|x| x * x).sum()
}

fn all_finite<D: Dimension>(a: &ndarray::Array<f32, D>) -> bool {
    a.iter().all(|x| x.is_finite())
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Softmax over each row, with max subtraction.
fn softmax_rows(logits: &mut Array2<f32>) {
    for mut row in logits.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        row.mapv_inplace(|x| (x - max).exp());
        let sum = row.sum();
        row /= sum;
    }
}

/// Gate activations of one time step, `[B, H]` each.
struct StepGates {
    input: Array2<f32>,
    forget: Array2<f32>,
    cell: Array2<f32>,
    output: Array2<f32>,
    tanh_c: Array2<f32>,
}

/// Everything the backward pass needs from a forward pass.
struct ForwardTrace {
    /// Symbol ids per step, one per batch entry.
    inputs: Vec<Vec<usize>>,
    gates: Vec<StepGates>,
    /// Hidden states, `hs[0]` is the zero initial state.
    hs: Vec<Array2<f32>>,
    /// Cell states, `cs[0]` is the zero initial state.
    cs: Vec<Array2<f32>>,
}

/// LSTM model: architecture plus weights.
#[derive(Debug, Clone)]
pub struct LstmModel {
    config: ModelConfig,
    params: LstmParams,
}

impl LstmModel {
    /// Builds a model from existing weights, checking their shapes.
    pub fn new(config: ModelConfig, params: LstmParams) -> Result<Self> {
        if let Some(msg) = config.validate() {
            return Err(MelodyError::invalid_artifact(msg));
        }
        params.check_shapes(&config)?;
        Ok(Self { config, params })
    }

    /// Builds a randomly initialised model.
    pub fn init<R: Rng + ?Sized>(config: ModelConfig, rng: &mut R) -> Result<Self> {
        if let Some(msg) = config.validate() {
            return Err(MelodyError::invalid_config(msg));
        }
        let params = LstmParams::init(&config, rng)?;
        Ok(Self { config, params })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn params(&self) -> &LstmParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut LstmParams {
        &mut self.params
    }

    pub fn into_parts(self) -> (ModelConfig, LstmParams) {
        (self.config, self.params)
    }

    /// Next-symbol distributions for a batch of equal-length windows, `[B, V]`.
    pub fn predict_batch(&self, windows: &[&[usize]]) -> Result<Array2<f32>> {
        let trace = self.forward(windows)?;
        // hs always holds the initial state, so the last entry exists.
        Ok(self.output(&trace.hs[trace.hs.len() - 1]))
    }

    /// Inverted-dropout mask for the final hidden state, `[B, H]`.
    ///
    /// Kept units are scaled by `1 / (1 - p)` so inference needs no rescaling.
    pub fn dropout_mask<R: Rng + ?Sized>(&self, batch: usize, rng: &mut R) -> Result<Array2<f32>> {
        let p = self.config.dropout as f64;
        let shape = (batch, self.config.hidden_size);
        if p <= 0.0 {
            return Ok(Array2::ones(shape));
        }
        let keep = Bernoulli::new(1.0 - p)
            .map_err(|e| MelodyError::training_failed(format!("dropout: {}", e)))?;
        let scale = 1.0 / (1.0 - p as f32);
        Ok(Array2::from_shape_simple_fn(shape, || {
            if keep.sample(rng) {
                scale
            } else {
                0.0
            }
        }))
    }

    /// Mean cross-entropy of `targets` given `windows`, and its gradient.
    ///
    /// `mask` multiplies the final hidden state (dropout); pass None for
    /// evaluation.
    pub fn loss_and_gradients(
        &self,
        windows: &[&[usize]],
        targets: &[usize],
        mask: Option<&Array2<f32>>,
    ) -> Result<(f32, LstmParams)> {
        if windows.len() != targets.len() {
            return Err(MelodyError::training_failed(format!(
                "{} windows but {} targets",
                windows.len(),
                targets.len()
            )));
        }
        if windows.is_empty() {
            return Err(MelodyError::training_failed("empty batch"));
        }
        if let Some(&bad) = targets.iter().find(|&&y| y >= self.config.vocab_size) {
            return Err(MelodyError::unknown_id(bad, self.config.vocab_size));
        }

        let h = self.config.hidden_size;
        let batch = windows.len();
        let trace = self.forward(windows)?;
        let last = &trace.hs[trace.hs.len() - 1];

        let dropped = match mask {
            Some(m) => last * m,
            None => last.clone(),
        };
        let probs = self.output(&dropped);

        let mut loss = 0.0f32;
        let mut d_logits = probs.clone();
        for (b, &y) in targets.iter().enumerate() {
            loss -= probs[[b, y]].max(f32::MIN_POSITIVE).ln();
            d_logits[[b, y]] -= 1.0;
        }
        loss /= batch as f32;
        d_logits /= batch as f32;

        let mut grads = self.params.zeros_like();
        grads.w_out = d_logits.t().dot(&dropped);
        grads.b_out = d_logits.sum_axis(Axis(0));

        let mut dh = d_logits.dot(&self.params.w_out);
        if let Some(m) = mask {
            dh *= m;
        }
        let mut dc: Array2<f32> = Array2::zeros((batch, h));

        for t in (0..trace.gates.len()).rev() {
            let gates = &trace.gates[t];

            let d_output = &dh * &gates.tanh_c;
            dc = dc + &dh * &gates.output * gates.tanh_c.mapv(|x| 1.0 - x * x);
            let d_input = &dc * &gates.cell;
            let d_cell = &dc * &gates.input;
            let d_forget = &dc * &trace.cs[t];

            let mut dz = Array2::zeros((batch, 4 * h));
            dz.slice_mut(s![.., 0..h])
                .assign(&(d_input * gates.input.mapv(|a| a * (1.0 - a))));
            dz.slice_mut(s![.., h..2 * h])
                .assign(&(d_forget * gates.forget.mapv(|a| a * (1.0 - a))));
            dz.slice_mut(s![.., 2 * h..3 * h])
                .assign(&(d_cell * gates.cell.mapv(|a| 1.0 - a * a)));
            dz.slice_mut(s![.., 3 * h..])
                .assign(&(d_output * gates.output.mapv(|a| a * (1.0 - a))));

            grads.w_hidden += &dz.t().dot(&trace.hs[t]);
            grads.bias += &dz.sum_axis(Axis(0));
            for (row, &id) in dz.rows().into_iter().zip(&trace.inputs[t]) {
                let mut column = grads.w_input.column_mut(id);
                column += &row;
            }

            dh = dz.dot(&self.params.w_hidden);
            dc = dc * &gates.forget;
        }

        Ok((loss, grads))
    }

    /// Runs the recurrence over a batch of equal-length windows.
    fn forward(&self, windows: &[&[usize]]) -> Result<ForwardTrace> {
        let h = self.config.hidden_size;
        let v = self.config.vocab_size;
        let batch = windows.len();
        let steps = windows.first().map_or(0, |w| w.len());

        if windows.iter().any(|w| w.len() != steps) {
            return Err(MelodyError::training_failed(
                "windows in a batch must have equal length",
            ));
        }
        if let Some(&bad) = windows.iter().flat_map(|w| w.iter()).find(|&&id| id >= v) {
            return Err(MelodyError::unknown_id(bad, v));
        }

        let mut trace = ForwardTrace {
            inputs: Vec::with_capacity(steps),
            gates: Vec::with_capacity(steps),
            hs: vec![Array2::zeros((batch, h))],
            cs: vec![Array2::zeros((batch, h))],
        };

        for t in 0..steps {
            let ids: Vec<usize> = windows.iter().map(|w| w[t]).collect();

            let mut z = trace.hs[t].dot(&self.params.w_hidden.t());
            z += &self.params.bias;
            for (mut row, &id) in z.rows_mut().into_iter().zip(&ids) {
                row += &self.params.w_input.column(id);
            }

            let input = z.slice(s![.., 0..h]).mapv(sigmoid);
            let forget = z.slice(s![.., h..2 * h]).mapv(sigmoid);
            let cell = z.slice(s![.., 2 * h..3 * h]).mapv(f32::tanh);
            let output = z.slice(s![.., 3 * h..]).mapv(sigmoid);

            let c = &forget * &trace.cs[t] + &input * &cell;
            let tanh_c = c.mapv(f32::tanh);
            let h_next = &output * &tanh_c;

            trace.inputs.push(ids);
            trace.gates.push(StepGates {
                input,
                forget,
                cell,
                output,
                tanh_c,
            });
            trace.hs.push(h_next);
            trace.cs.push(c);
        }

        Ok(trace)
    }

    /// Dense softmax layer, `[B, H] -> [B, V]`.
    fn output(&self, hidden: &Array2<f32>) -> Array2<f32> {
        let mut logits = hidden.dot(&self.params.w_out.t());
        logits += &self.params.b_out;
        softmax_rows(&mut logits);
        logits
    }
}

impl NextSymbolModel for LstmModel {
    fn vocab_size(&self) -> usize {
        self.config.vocab_size
    }

    fn predict(&self, window: &[usize]) -> Result<Array1<f32>> {
        let probs = self.predict_batch(&[window])?;
        Ok(probs.row(0).to_owned())
    }
}
