use std::fmt;
use std::str::FromStr;

use burn::{
    nn::{
        Dropout, DropoutConfig, LayerNorm, LayerNormConfig, Linear, LinearConfig,
        Lstm, LstmConfig,
        gru::{Gru, GruConfig},
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};

/// Which recurrent cell the stack is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Lstm,
    Gru,
    /// Vanilla tanh recurrence
    Rnn,
}

impl FromStr for LayerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "lstm" => Ok(LayerKind::Lstm),
            "gru" => Ok(LayerKind::Gru),
            "rnn" => Ok(LayerKind::Rnn),
            other => anyhow::bail!("unknown layer type '{other}' (expected lstm, gru or rnn)"),
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Lstm => write!(f, "lstm"),
            LayerKind::Gru => write!(f, "gru"),
            LayerKind::Rnn => write!(f, "rnn"),
        }
    }
}

#[derive(Config, Debug)]
pub struct AcousticModelConfig {
    pub nb_features: usize,
    pub nb_classes: usize,
    pub layer: LayerKind,
    #[config(default = 3)]
    pub nb_layers: usize,
    #[config(default = 250)]
    pub nb_hidden: usize,
    #[config(default = false)]
    pub layer_norm: bool,
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl AcousticModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> AcousticModel<B> {
        let blocks = (0..self.nb_layers)
            .map(|i| {
                let d_input = if i == 0 { self.nb_features } else { self.nb_hidden };
                self.build_block(d_input, device)
            })
            .collect();
        // Time-distributed dense head: applied per frame by Linear broadcasting
        let proj = LinearConfig::new(self.nb_hidden, self.nb_classes).init(device);
        AcousticModel { blocks, proj }
    }

    fn build_block<B: Backend>(&self, d_input: usize, device: &B::Device) -> RecurrentBlock<B> {
        let layer = match self.layer {
            LayerKind::Lstm => {
                RecurrentLayer::Lstm(LstmConfig::new(d_input, self.nb_hidden, true).init(device))
            }
            LayerKind::Gru => {
                RecurrentLayer::Gru(GruConfig::new(d_input, self.nb_hidden, true).init(device))
            }
            LayerKind::Rnn => {
                RecurrentLayer::Rnn(SimpleRnnConfig::new(d_input, self.nb_hidden).init(device))
            }
        };
        let norm = if self.layer_norm {
            Some(LayerNormConfig::new(self.nb_hidden).init(device))
        } else {
            None
        };
        let dropout = DropoutConfig::new(self.dropout).init();
        RecurrentBlock { layer, norm, dropout }
    }
}

// ─── SimpleRnn ────────────────────────────────────────────────────────────────
// burn ships Lstm and Gru but no vanilla RNN, so the tanh cell is
// written out as a plain time loop over precomputed input projections:
//   h_t = tanh(W_x x_t + b + W_h h_{t-1})

#[derive(Config, Debug)]
pub struct SimpleRnnConfig {
    pub d_input: usize,
    pub d_hidden: usize,
}

impl SimpleRnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SimpleRnn<B> {
        SimpleRnn {
            input: LinearConfig::new(self.d_input, self.d_hidden).init(device),
            recurrent: LinearConfig::new(self.d_hidden, self.d_hidden)
                .with_bias(false)
                .init(device),
            d_hidden: self.d_hidden,
        }
    }
}

#[derive(Module, Debug)]
pub struct SimpleRnn<B: Backend> {
    input: Linear<B>,
    recurrent: Linear<B>,
    d_hidden: usize,
}

impl<B: Backend> SimpleRnn<B> {
    /// [batch, frames, d_input] → [batch, frames, d_hidden]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, frames, _] = x.dims();
        let device = x.device();

        let projected = self.input.forward(x);
        let mut hidden = Tensor::<B, 2>::zeros([batch, self.d_hidden], &device);
        let mut outputs = Vec::with_capacity(frames);
        for t in 0..frames {
            let x_t = projected
                .clone()
                .slice([0..batch, t..t + 1, 0..self.d_hidden])
                .reshape([batch, self.d_hidden]);
            hidden = burn::tensor::activation::tanh(x_t + self.recurrent.forward(hidden));
            outputs.push(hidden.clone().reshape([batch, 1, self.d_hidden]));
        }
        Tensor::cat(outputs, 1)
    }
}

// ─── Recurrent stack ──────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub enum RecurrentLayer<B: Backend> {
    Lstm(Lstm<B>),
    Gru(Gru<B>),
    Rnn(SimpleRnn<B>),
}

#[derive(Module, Debug)]
pub struct RecurrentBlock<B: Backend> {
    layer: RecurrentLayer<B>,
    norm: Option<LayerNorm<B>>,
    dropout: Dropout,
}

impl<B: Backend> RecurrentBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = match &self.layer {
            RecurrentLayer::Lstm(lstm) => lstm.forward(x, None).0,
            RecurrentLayer::Gru(gru) => gru.forward(x, None),
            RecurrentLayer::Rnn(rnn) => rnn.forward(x),
        };
        let x = match &self.norm {
            Some(norm) => norm.forward(x),
            None => x,
        };
        self.dropout.forward(x)
    }
}

/// The acoustic model: recurrent stack + per-frame class projection.
#[derive(Module, Debug)]
pub struct AcousticModel<B: Backend> {
    blocks: Vec<RecurrentBlock<B>>,
    proj: Linear<B>,
}

impl<B: Backend> AcousticModel<B> {
    /// features [batch, frames, feat_dim] → logits [batch, frames, classes]
    pub fn forward(&self, features: Tensor<B, 3>) -> Tensor<B, 3> {
        let mut x = features;
        for block in &self.blocks {
            x = block.forward(x);
        }
        self.proj.forward(x)
    }

    /// Log-softmax over the class dimension — the input the CTC loss
    /// and the decoders expect.
    pub fn log_probs(&self, features: Tensor<B, 3>) -> Tensor<B, 3> {
        burn::tensor::activation::log_softmax(self.forward(features), 2)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Distribution;

    type TestBackend = burn::backend::NdArray<f32>;

    fn forward_dims(layer: LayerKind, layer_norm: bool) -> [usize; 3] {
        let device = Default::default();
        let config = AcousticModelConfig::new(13, 5, layer)
            .with_nb_layers(2)
            .with_nb_hidden(8)
            .with_layer_norm(layer_norm);
        let model = config.init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 3>::random([2, 7, 13], Distribution::Default, &device);
        model.forward(x).dims()
    }

    #[test]
    fn lstm_stack_shapes() {
        assert_eq!(forward_dims(LayerKind::Lstm, false), [2, 7, 5]);
    }

    #[test]
    fn gru_stack_shapes() {
        assert_eq!(forward_dims(LayerKind::Gru, true), [2, 7, 5]);
    }

    #[test]
    fn rnn_stack_shapes() {
        assert_eq!(forward_dims(LayerKind::Rnn, true), [2, 7, 5]);
    }

    #[test]
    fn log_probs_normalise_over_classes() {
        let device = Default::default();
        let config = AcousticModelConfig::new(4, 6, LayerKind::Rnn)
            .with_nb_layers(1)
            .with_nb_hidden(5);
        let model = config.init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 3>::random([1, 3, 4], Distribution::Default, &device);

        let probs = model.log_probs(x).exp().sum_dim(2);
        let sums = probs.into_data().to_vec::<f32>().unwrap();
        for s in sums {
            assert!((s - 1.0).abs() < 1e-5, "per-frame probabilities sum to {s}");
        }
    }

    #[test]
    fn layer_kind_parsing() {
        assert_eq!("gru".parse::<LayerKind>().unwrap(), LayerKind::Gru);
        assert!("rhn".parse::<LayerKind>().is_err());
    }
}
