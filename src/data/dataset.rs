use burn::data::dataset::Dataset;

use crate::domain::utterance::Utterance;

/// One corpus split wrapped for burn's DataLoader.
pub struct UtteranceDataset {
    items: Vec<Utterance>,
}

impl UtteranceDataset {
    pub fn new(items: Vec<Utterance>) -> Self {
        Self { items }
    }

    /// Feature dimension of the split (0 for an empty split).
    pub fn feat_dim(&self) -> usize {
        self.items.first().map(|u| u.feat_dim).unwrap_or(0)
    }
}

impl Dataset<Utterance> for UtteranceDataset {
    fn get(&self, index: usize) -> Option<Utterance> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_and_len() {
        let ds = UtteranceDataset::new(vec![
            Utterance::new(vec![0.0; 4], 2, 2, vec![1]),
            Utterance::new(vec![0.0; 6], 3, 2, vec![0, 2]),
        ]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.feat_dim(), 2);
        assert_eq!(ds.get(1).unwrap().labels, vec![0, 2]);
        assert!(ds.get(2).is_none());
    }
}
