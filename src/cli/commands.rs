// ============================================================
// CLI Commands and Arguments
// ============================================================
// The two subcommands and their flags. The application layer
// never sees clap types: args convert into the serialisable
// configs at this boundary, which is also where layer and
// label names are parsed (so `TryFrom`, not `From`).

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::application::eval_use_case::EvalConfig;
use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a CTC acoustic model on the TIMIT archive
    Train(TrainArgs),

    /// Decode a split with a saved model and report the error rate
    Eval(EvalArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Path to the pre-processed dataset archive
    #[arg(long, default_value = "timit.safetensors")]
    pub data: String,

    /// TIMIT phoneme fold map (used with --label-type phn)
    #[arg(long, default_value = "timit/phones.60-48-39.map")]
    pub phn_map: String,

    /// Recurrent layer type: lstm, gru or rnn
    #[arg(long, default_value = "lstm")]
    pub layer: String,

    /// Number of stacked recurrent layers
    #[arg(long, default_value_t = 3)]
    pub nb_layers: usize,

    /// Apply layer normalisation to each recurrent layer's output
    #[arg(long)]
    pub layer_norm: bool,

    /// Hidden units per recurrent layer
    #[arg(long, default_value_t = 250)]
    pub nb_hidden: usize,

    /// Utterances per mini-batch
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Number of training epochs
    #[arg(long, default_value_t = 250)]
    pub nb_epoch: usize,

    /// Label granularity: phn or char
    #[arg(long, default_value = "phn")]
    pub label_type: String,

    /// Learning rate
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// Gradient-norm clipping threshold
    #[arg(long, default_value_t = 10.0)]
    pub clipnorm: f32,

    /// SGD momentum
    #[arg(long, default_value_t = 0.9)]
    pub momentum: f64,

    /// Compute device: cpu, gpu or gpu:<index>
    #[arg(long, default_value = "cpu")]
    pub device: String,

    /// Dropout on each recurrent layer's output
    #[arg(long, default_value_t = 0.0)]
    pub dropout: f64,

    /// Run directory for checkpoints and metadata [default: results/<uuid>]
    #[arg(long)]
    pub save: Option<String>,

    /// Resume: run directory holding previously saved weights
    #[arg(long)]
    pub load: Option<String>,
}

impl TryFrom<TrainArgs> for TrainConfig {
    type Error = anyhow::Error;

    fn try_from(a: TrainArgs) -> Result<Self> {
        Ok(TrainConfig {
            data: a.data,
            phn_map: a.phn_map,
            layer: a.layer.parse()?,
            nb_layers: a.nb_layers,
            layer_norm: a.layer_norm,
            nb_hidden: a.nb_hidden,
            batch_size: a.batch_size,
            nb_epoch: a.nb_epoch,
            label_type: a.label_type.parse()?,
            lr: a.lr,
            clipnorm: a.clipnorm,
            momentum: a.momentum,
            device: a.device,
            dropout: a.dropout,
            save: a
                .save
                .unwrap_or_else(|| format!("results/{}", uuid::Uuid::new_v4())),
            load: a.load,
        })
    }
}

/// All arguments for the `eval` command.
#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Run directory holding weights and train_config.json
    #[arg(long)]
    pub model_dir: String,

    /// Path to the pre-processed dataset archive
    #[arg(long, default_value = "timit.safetensors")]
    pub data: String,

    /// TIMIT phoneme fold map (used with phn-label runs)
    #[arg(long, default_value = "timit/phones.60-48-39.map")]
    pub phn_map: String,

    /// Which split to decode
    #[arg(long, default_value = "test")]
    pub split: String,

    /// Utterances per mini-batch
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Beam width for prefix beam search (greedy decoding if omitted)
    #[arg(long)]
    pub beam_width: Option<usize>,

    /// Compute device: cpu, gpu or gpu:<index>
    #[arg(long, default_value = "cpu")]
    pub device: String,

    /// Print the first N reference/hypothesis pairs
    #[arg(long, default_value_t = 5)]
    pub show: usize,
}

impl From<EvalArgs> for EvalConfig {
    fn from(a: EvalArgs) -> Self {
        EvalConfig {
            data: a.data,
            phn_map: a.phn_map,
            model_dir: a.model_dir,
            split: a.split,
            batch_size: a.batch_size,
            beam_width: a.beam_width,
            device: a.device,
            show: a.show,
        }
    }
}
