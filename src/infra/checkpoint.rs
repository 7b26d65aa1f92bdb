// ============================================================
// Checkpoint Manager
// ============================================================
// Saves and restores model weights with burn's CompactRecorder
// (MessagePack records). Two snapshots live in every run
// directory: `model` — the latest epoch, and `best` — the
// epoch with the lowest validation label error rate. The
// training configuration is stored next to them so evaluation
// can rebuild the exact architecture before loading weights.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use burn::{
    module::Module,
    record::{CompactRecorder, Recorder},
    tensor::backend::Backend,
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::AcousticModel;

/// Snapshot updated every epoch.
pub const LATEST: &str = "model";
/// Snapshot updated when the validation error rate improves.
pub const BEST: &str = "best";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a manager rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    /// Save model weights under `name` (without extension — the
    /// recorder appends its own).
    pub fn save_model<B: Backend>(&self, model: &AcousticModel<B>, name: &str) -> Result<()> {
        let path = self.dir.join(name);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .map_err(|e| {
                anyhow::anyhow!("failed to save checkpoint '{}': {e:?}", path.display())
            })?;
        tracing::debug!("saved checkpoint '{}'", path.display());
        Ok(())
    }

    /// Restore weights from the `name` snapshot into `model`. The model
    /// must already have the matching architecture.
    pub fn load_model<B: Backend>(
        &self,
        model: AcousticModel<B>,
        name: &str,
        device: &B::Device,
    ) -> Result<AcousticModel<B>> {
        let path = self.dir.join(name);
        let record = CompactRecorder::new().load(path.clone(), device).map_err(|e| {
            anyhow::anyhow!(
                "cannot load checkpoint '{}' (has this run trained yet?): {e:?}",
                path.display()
            )
        })?;
        Ok(model.load_record(record))
    }

    /// Persist the training configuration for later rebuilds.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("cannot write config to '{}'", path.display()))?;
        tracing::debug!("saved training config '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "cannot read config from '{}' — train a model there first",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::{AcousticModelConfig, LayerKind};
    use burn::tensor::{Distribution, Tensor};

    type TestBackend = burn::backend::NdArray<f32>;

    #[test]
    fn config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());

        let cfg = TrainConfig::default();
        ckpt.save_config(&cfg).unwrap();
        let loaded = ckpt.load_config().unwrap();
        assert_eq!(loaded.nb_hidden, cfg.nb_hidden);
        assert_eq!(loaded.layer, cfg.layer);
        assert_eq!(loaded.label_type, cfg.label_type);
    }

    #[test]
    fn weights_roundtrip_preserves_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        let device = Default::default();

        let model_cfg = AcousticModelConfig::new(4, 5, LayerKind::Rnn)
            .with_nb_layers(1)
            .with_nb_hidden(6);
        let model = model_cfg.init::<TestBackend>(&device);
        ckpt.save_model(&model, LATEST).unwrap();

        let fresh = model_cfg.init::<TestBackend>(&device);
        let restored = ckpt.load_model(fresh, LATEST, &device).unwrap();

        let x = Tensor::<TestBackend, 3>::random([1, 3, 4], Distribution::Default, &device);
        let a = model.forward(x.clone()).into_data().to_vec::<f32>().unwrap();
        let b = restored.forward(x).into_data().to_vec::<f32>().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        let device = Default::default();

        let model_cfg = AcousticModelConfig::new(2, 3, LayerKind::Rnn).with_nb_layers(1);
        let model = model_cfg.init::<TestBackend>(&device);
        assert!(ckpt.load_model(model, LATEST, &device).is_err());
    }
}
