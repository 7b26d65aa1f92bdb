// ============================================================
// Utterance Domain Type
// ============================================================

/// One utterance from the corpus: a frame-major feature matrix
/// (`num_frames` rows of `feat_dim` filterbank/MFCC values) and
/// its label index sequence.
///
/// Labels stay ragged — one `Vec<usize>` per utterance, never a
/// padded rectangle. The CTC loss and the error-rate metric both
/// consume them in this form.
#[derive(Debug, Clone)]
pub struct Utterance {
    /// Flattened features, row-major: frame t starts at `t * feat_dim`
    pub features: Vec<f32>,

    /// Number of real frames (no padding)
    pub num_frames: usize,

    /// Feature dimension per frame
    pub feat_dim: usize,

    /// Label indices into the run's [`LabelMap`](crate::domain::labels::LabelMap)
    pub labels: Vec<usize>,
}

impl Utterance {
    pub fn new(features: Vec<f32>, num_frames: usize, feat_dim: usize, labels: Vec<usize>) -> Self {
        assert_eq!(
            features.len(),
            num_frames * feat_dim,
            "feature buffer is {} values, expected {} frames x {} dims",
            features.len(),
            num_frames,
            feat_dim
        );
        Self { features, num_frames, feat_dim, labels }
    }

    /// The feature row for frame `t`.
    pub fn frame(&self, t: usize) -> &[f32] {
        let start = t * self.feat_dim;
        &self.features[start..start + self.feat_dim]
    }
}
