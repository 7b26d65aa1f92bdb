// ============================================================
// TrainUseCase
// ============================================================
// Runs the full training pipeline in order:
//
//   Step 1: Build the label dictionary        (domain)
//   Step 2: Open the archive, load splits     (data)
//   Step 3: Wrap splits as datasets           (data)
//   Step 4: Derive the model configuration    (ml)
//   Step 5: Prepare run dir, config, metadata (infra)
//   Step 6: Dispatch on device, run the loop  (ml)

use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::application::{DeviceSpec, check_label_range};
use crate::data::{archive::SpeechArchive, dataset::UtteranceDataset};
use crate::domain::{
    labels::{LabelKind, LabelMap},
    traits::CorpusSource,
    utterance::Utterance,
};
use crate::infra::{checkpoint::CheckpointManager, meta::MetaCheckpoint};
use crate::ml::model::{AcousticModelConfig, LayerKind};
use crate::ml::trainer::train;

type CpuBackend = burn::backend::Autodiff<burn::backend::NdArray>;
type GpuBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters of one run. Serialisable so it can be saved
// into the run directory and reloaded for evaluation or resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data: String,
    pub phn_map: String,
    pub layer: LayerKind,
    pub nb_layers: usize,
    pub layer_norm: bool,
    pub nb_hidden: usize,
    pub batch_size: usize,
    pub nb_epoch: usize,
    pub label_type: LabelKind,
    pub lr: f64,
    pub clipnorm: f32,
    pub momentum: f64,
    pub device: String,
    pub dropout: f64,
    pub save: String,
    pub load: Option<String>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data: "timit.safetensors".to_string(),
            phn_map: "timit/phones.60-48-39.map".to_string(),
            layer: LayerKind::Lstm,
            nb_layers: 3,
            layer_norm: false,
            nb_hidden: 250,
            batch_size: 64,
            nb_epoch: 250,
            label_type: LabelKind::Phn,
            lr: 1e-4,
            clipnorm: 10.0,
            momentum: 0.9,
            device: "cpu".to_string(),
            dropout: 0.0,
            save: "results/run".to_string(),
            load: None,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: label dictionary ──────────────────────────────────────────
        let label_map = match cfg.label_type {
            LabelKind::Phn => LabelMap::from_phn_map_file(&cfg.phn_map)?,
            LabelKind::Char => LabelMap::char_map(),
        };
        tracing::info!(
            "label dictionary: {} symbols + blank ({})",
            label_map.len(),
            cfg.label_type
        );

        // ── Step 2: archive + splits ──────────────────────────────────────────
        let archive = SpeechArchive::open(&cfg.data)?;
        let (train_utts, val_utts) = load_corpus(&archive, cfg.label_type)?;
        ensure!(
            !train_utts.is_empty(),
            "train split of '{}' holds no utterances",
            cfg.data
        );
        check_label_range(&train_utts, &label_map)?;
        check_label_range(&val_utts, &label_map)?;

        let nb_features = train_utts[0].feat_dim;
        tracing::info!(
            "{} train / {} valid utterances, {} features per frame",
            train_utts.len(),
            val_utts.len(),
            nb_features
        );

        // ── Step 3: datasets ──────────────────────────────────────────────────
        let train_dataset = UtteranceDataset::new(train_utts);
        let val_dataset = UtteranceDataset::new(val_utts);

        // ── Step 4: model configuration ───────────────────────────────────────
        let model_cfg = AcousticModelConfig::new(nb_features, label_map.num_classes(), cfg.layer)
            .with_nb_layers(cfg.nb_layers)
            .with_nb_hidden(cfg.nb_hidden)
            .with_layer_norm(cfg.layer_norm)
            .with_dropout(cfg.dropout);

        // ── Step 5: run directory, config, metadata ───────────────────────────
        let ckpt = CheckpointManager::new(&cfg.save);
        ckpt.save_config(cfg)?;
        let mut meta = MetaCheckpoint::new(Path::new(&cfg.save), cfg.clone())
            .with_context(|| format!("cannot prepare run metadata in '{}'", cfg.save))?;

        println!("Run directory: {}", cfg.save);
        println!(
            "Model: {} x{} hidden={} layer_norm={} dropout={}",
            cfg.layer, cfg.nb_layers, cfg.nb_hidden, cfg.layer_norm, cfg.dropout
        );

        // ── Step 6: device dispatch + training loop ───────────────────────────
        match cfg.device.parse::<DeviceSpec>()? {
            DeviceSpec::Cpu => train::<CpuBackend>(
                cfg,
                model_cfg,
                train_dataset,
                val_dataset,
                &label_map,
                &ckpt,
                &mut meta,
                Default::default(),
            ),
            DeviceSpec::Gpu(None) => train::<GpuBackend>(
                cfg,
                model_cfg,
                train_dataset,
                val_dataset,
                &label_map,
                &ckpt,
                &mut meta,
                burn::backend::wgpu::WgpuDevice::default(),
            ),
            DeviceSpec::Gpu(Some(index)) => train::<GpuBackend>(
                cfg,
                model_cfg,
                train_dataset,
                val_dataset,
                &label_map,
                &ckpt,
                &mut meta,
                burn::backend::wgpu::WgpuDevice::DiscreteGpu(index),
            ),
        }
    }
}

fn load_corpus(
    source: &impl CorpusSource,
    kind: LabelKind,
) -> Result<(Vec<Utterance>, Vec<Utterance>)> {
    Ok((source.load_split("train", kind)?, source.load_split("valid", kind)?))
}
