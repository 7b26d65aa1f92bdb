// ============================================================
// Run Metadata Document
// ============================================================
// Checkpoints training information in a meta file next to the
// model snapshots. Together with the saved weights this allows
// resuming training and inspecting any run after the fact.
//
// The document holds the ordered epoch list, the invocation
// arguments, and one value series per metric. It is serialised
// in full after every epoch: the redundant I/O is a few
// kilobytes, and a crash can only ever lose the epoch in
// flight. When a run directory already contains a meta.json
// (a resumed run), epoch numbering continues where it left off.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    /// Absolute epoch numbers, in training order
    pub epoch: Vec<usize>,

    /// The CLI arguments this run was started with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_args: Option<TrainConfig>,

    /// One series per metric name ("loss", "val_loss", "val_ler")
    #[serde(default)]
    pub history: BTreeMap<String, Vec<f64>>,
}

pub struct MetaCheckpoint {
    path: PathBuf,
    meta: RunMeta,
    epoch_offset: usize,
}

impl MetaCheckpoint {
    /// Open `dir`'s metadata document, resuming an existing one when
    /// present. `training_args` always reflect the CURRENT invocation.
    pub fn new(dir: &Path, training_args: TrainConfig) -> Result<Self> {
        let path = dir.join("meta.json");
        let meta = if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("cannot read '{}'", path.display()))?;
            let mut meta: RunMeta = serde_json::from_str(&text)
                .with_context(|| format!("'{}' is not a valid run meta file", path.display()))?;
            meta.training_args = Some(training_args);
            meta
        } else {
            RunMeta {
                epoch: Vec::new(),
                training_args: Some(training_args),
                history: BTreeMap::new(),
            }
        };
        let epoch_offset = meta.epoch.len();
        Ok(Self { path, meta, epoch_offset })
    }

    /// Epochs recorded by previous runs in this directory.
    pub fn epoch_offset(&self) -> usize {
        self.epoch_offset
    }

    pub fn meta(&self) -> &RunMeta {
        &self.meta
    }

    /// Record one finished epoch (1-based within the current run) and
    /// rewrite the document.
    pub fn on_epoch_end(&mut self, epoch: usize, logs: &[(&str, f64)]) -> Result<()> {
        self.meta.epoch.push(self.epoch_offset + epoch);
        for (name, value) in logs {
            self.meta
                .history
                .entry((*name).to_string())
                .or_default()
                .push(*value);
        }

        let json = serde_json::to_string_pretty(&self.meta)?;
        fs::write(&self.path, json)
            .with_context(|| format!("cannot write '{}'", self.path.display()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_epochs_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let mut meta = MetaCheckpoint::new(dir.path(), TrainConfig::default()).unwrap();
        assert_eq!(meta.epoch_offset(), 0);

        meta.on_epoch_end(1, &[("loss", 2.5), ("val_ler", 0.9)]).unwrap();
        meta.on_epoch_end(2, &[("loss", 2.1), ("val_ler", 0.8)]).unwrap();

        let text = fs::read_to_string(dir.path().join("meta.json")).unwrap();
        let parsed: RunMeta = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.epoch, vec![1, 2]);
        assert_eq!(parsed.history["loss"], vec![2.5, 2.1]);
        assert_eq!(parsed.history["val_ler"], vec![0.9, 0.8]);
        assert!(parsed.training_args.is_some());
    }

    #[test]
    fn resume_continues_epoch_numbering() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut meta = MetaCheckpoint::new(dir.path(), TrainConfig::default()).unwrap();
            meta.on_epoch_end(1, &[("loss", 3.0)]).unwrap();
            meta.on_epoch_end(2, &[("loss", 2.0)]).unwrap();
        }

        let mut resumed = MetaCheckpoint::new(dir.path(), TrainConfig::default()).unwrap();
        assert_eq!(resumed.epoch_offset(), 2);
        resumed.on_epoch_end(1, &[("loss", 1.5)]).unwrap();

        assert_eq!(resumed.meta().epoch, vec![1, 2, 3]);
        assert_eq!(resumed.meta().history["loss"], vec![3.0, 2.0, 1.5]);
    }
}
