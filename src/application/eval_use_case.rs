// ============================================================
// EvalUseCase
// ============================================================
// Loads a trained run, decodes one corpus split and reports the
// label error rate. The model architecture is rebuilt from the
// run directory's train_config.json before the weights are
// restored; the best-validation snapshot is preferred, falling
// back to the latest one for runs that never improved.

use anyhow::{Result, ensure};
use burn::{
    data::dataloader::DataLoaderBuilder,
    tensor::backend::Backend,
};
use serde::{Deserialize, Serialize};

use crate::application::{DeviceSpec, check_label_range};
use crate::data::{archive::SpeechArchive, batcher::CtcBatcher, dataset::UtteranceDataset};
use crate::domain::{
    labels::{LabelKind, LabelMap},
    traits::CorpusSource,
};
use crate::infra::{
    checkpoint::{BEST, CheckpointManager, LATEST},
    metrics::MetricsAccumulator,
};
use crate::ml::{
    decoder::{CtcDecoder, label_error_rate},
    model::{AcousticModel, AcousticModelConfig},
};

type CpuBackend = burn::backend::NdArray;
type GpuBackend = burn::backend::Wgpu;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    pub data: String,
    pub phn_map: String,
    /// Run directory holding weights + train_config.json
    pub model_dir: String,
    pub split: String,
    pub batch_size: usize,
    /// Beam width for prefix beam search; greedy decoding when absent
    pub beam_width: Option<usize>,
    pub device: String,
    /// How many reference/hypothesis pairs to print
    pub show: usize,
}

pub struct EvalUseCase {
    config: EvalConfig,
}

impl EvalUseCase {
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        let ckpt = CheckpointManager::new(&cfg.model_dir);
        let train_cfg = ckpt.load_config()?;

        let label_map = match train_cfg.label_type {
            LabelKind::Phn => LabelMap::from_phn_map_file(&cfg.phn_map)?,
            LabelKind::Char => LabelMap::char_map(),
        };

        let archive = SpeechArchive::open(&cfg.data)?;
        let utterances = archive.load_split(&cfg.split, train_cfg.label_type)?;
        ensure!(
            !utterances.is_empty(),
            "split '{}' of '{}' holds no utterances",
            cfg.split,
            cfg.data
        );
        check_label_range(&utterances, &label_map)?;

        let nb_features = utterances[0].feat_dim;
        // Dropout off for deterministic evaluation
        let model_cfg =
            AcousticModelConfig::new(nb_features, label_map.num_classes(), train_cfg.layer)
                .with_nb_layers(train_cfg.nb_layers)
                .with_nb_hidden(train_cfg.nb_hidden)
                .with_layer_norm(train_cfg.layer_norm)
                .with_dropout(0.0);
        let dataset = UtteranceDataset::new(utterances);

        match cfg.device.parse::<DeviceSpec>()? {
            DeviceSpec::Cpu => {
                run_eval::<CpuBackend>(cfg, model_cfg, dataset, &label_map, Default::default())
            }
            DeviceSpec::Gpu(None) => run_eval::<GpuBackend>(
                cfg,
                model_cfg,
                dataset,
                &label_map,
                burn::backend::wgpu::WgpuDevice::default(),
            ),
            DeviceSpec::Gpu(Some(index)) => run_eval::<GpuBackend>(
                cfg,
                model_cfg,
                dataset,
                &label_map,
                burn::backend::wgpu::WgpuDevice::DiscreteGpu(index),
            ),
        }
    }
}

fn run_eval<B: Backend>(
    cfg: &EvalConfig,
    model_cfg: AcousticModelConfig,
    dataset: UtteranceDataset,
    label_map: &LabelMap,
    device: B::Device,
) -> Result<()> {
    let ckpt = CheckpointManager::new(&cfg.model_dir);

    let model: AcousticModel<B> = model_cfg.init(&device);
    let model = match ckpt.load_model(model, BEST, &device) {
        Ok(model) => {
            tracing::info!("loaded best-validation snapshot");
            model
        }
        Err(_) => {
            tracing::info!("no best snapshot, loading latest");
            ckpt.load_model(model_cfg.init(&device), LATEST, &device)?
        }
    };

    let decoder = CtcDecoder::new(label_map.blank());
    let loader = DataLoaderBuilder::new(CtcBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(dataset);

    let mut ler = MetricsAccumulator::new();
    let mut shown = 0usize;

    for batch in loader.iter() {
        let log_probs = model.log_probs(batch.features);
        let [_, frames, classes] = log_probs.dims();
        let host = log_probs
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("cannot read activations: {e:?}"))?;

        for (i, reference) in batch.labels.iter().enumerate() {
            let utt = &host[i * frames * classes..(i + 1) * frames * classes];
            let hypothesis = match cfg.beam_width {
                Some(width) => decoder.beam_search(utt, batch.input_lengths[i], classes, width),
                None => decoder.greedy(utt, batch.input_lengths[i], classes),
            };
            ler.add(label_error_rate(&hypothesis, reference));

            if shown < cfg.show {
                println!("REF: {}", label_map.display(reference));
                println!("HYP: {}\n", label_map.display(&hypothesis));
                shown += 1;
            }
        }
    }

    println!(
        "{} '{}' utterances | label error rate {:.4}",
        ler.count(),
        cfg.split,
        ler.mean()
    );
    Ok(())
}
