use serde::{Deserialize, Serialize};

/// One epoch's summary, as printed and fed into the metadata document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Absolute epoch number (offset included on resumed runs)
    pub epoch: usize,
    pub train_loss: f64,
    pub val_loss: f64,
    /// Validation label error rate from greedy decoding
    pub val_ler: f64,
    pub duration_secs: f64,
}

impl EpochMetrics {
    pub fn print(&self) {
        println!(
            "Epoch {:>3} | loss={:.4} | val_loss={:.4} | val_ler={:.4} | {:.1}s",
            self.epoch, self.train_loss, self.val_loss, self.val_ler, self.duration_secs,
        );
    }

    pub fn is_improvement(&self, best_val_ler: f64) -> bool {
        self.val_ler < best_val_ler
    }
}

/// Running mean over batches or utterances.
#[derive(Debug, Default)]
pub struct MetricsAccumulator {
    sum: f64,
    count: usize,
}

impl MetricsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum / self.count as f64
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_mean() {
        let mut acc = MetricsAccumulator::new();
        assert_eq!(acc.mean(), 0.0);
        acc.add(2.0);
        acc.add(4.0);
        assert_eq!(acc.mean(), 3.0);
        assert_eq!(acc.count(), 2);
    }

    #[test]
    fn improvement_is_strictly_lower() {
        let m = EpochMetrics {
            epoch: 3,
            train_loss: 1.0,
            val_loss: 1.2,
            val_ler: 0.45,
            duration_secs: 10.0,
        };
        assert!(m.is_improvement(0.5));
        assert!(!m.is_improvement(0.45));
    }
}
