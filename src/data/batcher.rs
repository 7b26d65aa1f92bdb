// ============================================================
// CTC Batcher
// ============================================================
// Stacks a mini-batch of utterances into one feature tensor.
//
// Utterances vary in length, so features are padded with zeros
// to the longest utterance IN THE BATCH (the archive's global
// padding was trimmed at load time). Frame counts and label
// sequences ride along host-side: the CTC loss consumes ragged
// targets directly and the decoder needs per-utterance frame
// counts, so turning either into a rectangular tensor would
// only add a round-trip.

use burn::{
    data::dataloader::batcher::Batcher,
    tensor::{Tensor, backend::Backend},
};

use crate::domain::utterance::Utterance;

/// A batch ready for the forward pass.
#[derive(Debug, Clone)]
pub struct CtcBatch<B: Backend> {
    /// Zero-padded features — shape: [batch, max_frames, feat_dim]
    pub features: Tensor<B, 3>,

    /// Real frame count per utterance (<= max_frames)
    pub input_lengths: Vec<usize>,

    /// Ragged label sequences, one per utterance
    pub labels: Vec<Vec<usize>>,
}

#[derive(Clone, Debug)]
pub struct CtcBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> CtcBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<B, Utterance, CtcBatch<B>> for CtcBatcher<B> {
    fn batch(&self, items: Vec<Utterance>, device: &B::Device) -> CtcBatch<B> {
        let batch_size = items.len();
        let feat_dim = items[0].feat_dim;
        let max_frames = items.iter().map(|u| u.num_frames).max().unwrap_or(0);

        let mut flat = vec![0.0f32; batch_size * max_frames * feat_dim];
        for (i, utt) in items.iter().enumerate() {
            let start = i * max_frames * feat_dim;
            flat[start..start + utt.features.len()].copy_from_slice(&utt.features);
        }

        let features = Tensor::<B, 1>::from_floats(flat.as_slice(), device)
            .reshape([batch_size, max_frames, feat_dim]);

        CtcBatch {
            features,
            input_lengths: items.iter().map(|u| u.num_frames).collect(),
            labels: items.into_iter().map(|u| u.labels).collect(),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray<f32>;

    #[test]
    fn pads_to_longest_in_batch() {
        let device = Default::default();
        let batcher = CtcBatcher::<TestBackend>::new(device);

        let items = vec![
            Utterance::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 2, vec![0, 1]),
            Utterance::new(vec![7.0, 8.0], 1, 2, vec![2]),
        ];
        let batch = batcher.batch(items, &Default::default());

        assert_eq!(batch.features.dims(), [2, 3, 2]);
        assert_eq!(batch.input_lengths, vec![3, 1]);
        assert_eq!(batch.labels, vec![vec![0, 1], vec![2]]);

        let data = batch.features.into_data().to_vec::<f32>().unwrap();
        // second utterance: one real frame, two zero-padded frames
        assert_eq!(&data[6..], &[7.0, 8.0, 0.0, 0.0, 0.0, 0.0]);
    }
}
