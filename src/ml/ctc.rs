// ============================================================
// CTC Loss
// ============================================================
// Connectionist Temporal Classification (Graves et al., 2006):
// the negative log-probability of a label sequence summed over
// every frame-level alignment, computed with the forward (alpha)
// recursion over the blank-interleaved target sequence
//   l' = (b, l1, b, l2, ..., lL, b)
// in log space, batched over utterances.
//
// The targets arrive ragged (one blank-free index sequence per
// utterance); the extended targets and the skip-transition mask
// are assembled host-side and lifted into tensors, while the
// recursion itself stays on-device so the loss is differentiable
// through the framework's autodiff.
//
// Log-zero is the finite floor -1e5 rather than -inf: impossible
// alignments saturate instead of producing NaN through inf - inf,
// and a small epsilon guards log(0) in the log-sum-exp.

use burn::prelude::*;

/// Finite stand-in for log(0).
const LOG_ZERO: f32 = -1e5;
/// Guards log(0) in the log-sum-exp.
const EPSILON: f32 = 1e-8;

/// Configuration for the [CTC loss](CtcLoss).
#[derive(Config, Debug)]
pub struct CtcLossConfig {
    /// Class index reserved for the blank label.
    pub blank: usize,
}

impl CtcLossConfig {
    pub fn init(&self) -> CtcLoss {
        CtcLoss { blank: self.blank }
    }
}

#[derive(Module, Clone, Debug)]
pub struct CtcLoss {
    blank: usize,
}

impl CtcLoss {
    /// Per-utterance negative log-likelihood, shape `[batch]`.
    ///
    /// - `log_probs`: `[batch, frames, classes]` log-softmax output.
    /// - `targets`: ragged blank-free label sequences, one per utterance.
    /// - `input_lengths`: real frame count per utterance; frames past an
    ///   utterance's length are frozen out of the recursion.
    pub fn forward<B: Backend>(
        &self,
        log_probs: Tensor<B, 3>,
        targets: &[Vec<usize>],
        input_lengths: &[usize],
    ) -> Tensor<B, 1> {
        let device = log_probs.device();
        let [batch, frames, classes] = log_probs.dims();
        self.assertions(batch, frames, classes, targets, input_lengths);

        let max_target = targets.iter().map(Vec::len).max().unwrap_or(0);
        let s_len = 2 * max_target + 1;

        // l' per utterance, padded with blanks past its own 2L+1 entries.
        // Paths can never reach the padding: transitions only move forward
        // and the likelihood is read at each utterance's own 2L / 2L-1.
        let mut extended = vec![self.blank as i64; batch * s_len];
        for (b, seq) in targets.iter().enumerate() {
            for (u, &label) in seq.iter().enumerate() {
                extended[b * s_len + 2 * u + 1] = label as i64;
            }
        }

        // skip[s] = 1 where the s-2 transition is allowed: l'[s] is a real
        // label and differs from l'[s-2] (repeats must pass through a blank)
        let mut skip = vec![0.0f32; batch * s_len];
        for b in 0..batch {
            for s in 2..s_len {
                let cur = extended[b * s_len + s];
                if cur != self.blank as i64 && cur != extended[b * s_len + s - 2] {
                    skip[b * s_len + s] = 1.0;
                }
            }
        }

        let extended =
            Tensor::<B, 2, Int>::from_data(TensorData::new(extended, [batch, s_len]), &device);
        let skip = Tensor::<B, 2>::from_data(TensorData::new(skip, [batch, s_len]), &device);
        // Adds LOG_ZERO exactly where skips are forbidden
        let skip_floor = skip.clone().neg().add_scalar(1.0).mul_scalar(LOG_ZERO);

        // Emission term for frame t: log_probs[:, t, l'[s]] for every s
        let emit = |t: usize| -> Tensor<B, 2> {
            log_probs
                .clone()
                .slice([0..batch, t..t + 1, 0..classes])
                .reshape([batch, classes])
                .gather(1, extended.clone())
        };

        // alpha_1: only the first blank and the first label are reachable
        let alpha0 = Tensor::<B, 2>::full([batch, s_len], LOG_ZERO, &device);
        let emit0 = emit(0);
        let alpha0 = alpha0.slice_assign([0..batch, 0..1], emit0.clone().slice([0..batch, 0..1]));
        let mut alpha = alpha0.slice_assign([0..batch, 1..2], emit0.slice([0..batch, 1..2]));

        for t in 1..frames {
            // alpha_{t-1}(s), alpha_{t-1}(s-1), alpha_{t-1}(s-2)
            let stay = alpha.clone();
            let step = shift_right(alpha.clone(), 1, &device);
            let skip_step = shift_right(alpha.clone(), 2, &device)
                .mul(skip.clone())
                .add(skip_floor.clone());

            let max = stay.clone().max_pair(step.clone()).max_pair(skip_step.clone());
            let sum = (stay - max.clone()).exp()
                + (step - max.clone()).exp()
                + (skip_step - max.clone()).exp();
            let next = (sum.add_scalar(EPSILON).log() + max + emit(t)).clamp_min(LOG_ZERO);

            // Utterances whose frames are exhausted keep their alpha
            let active: Vec<f32> = input_lengths
                .iter()
                .map(|&len| if t < len { 1.0 } else { 0.0 })
                .collect();
            let active = Tensor::<B, 2>::from_data(TensorData::new(active, [batch, 1]), &device)
                .expand([batch, s_len]);
            alpha = next.mul(active.clone()) + alpha.mul(active.neg().add_scalar(1.0));
        }

        // P(l|x) = alpha_T(2L) + alpha_T(2L-1), read at each utterance's own L
        let mut idx_blank = Vec::with_capacity(batch);
        let mut idx_label = Vec::with_capacity(batch);
        for seq in targets {
            idx_blank.push(2 * seq.len() as i64);
            idx_label.push(2 * seq.len() as i64 - 1);
        }
        let idx_blank =
            Tensor::<B, 2, Int>::from_data(TensorData::new(idx_blank, [batch, 1]), &device);
        let idx_label =
            Tensor::<B, 2, Int>::from_data(TensorData::new(idx_label, [batch, 1]), &device);

        let last_blank = alpha.clone().gather(1, idx_blank).reshape([batch]);
        let last_label = alpha.gather(1, idx_label).reshape([batch]);

        let max = last_blank.clone().max_pair(last_label.clone());
        let log_likelihood = ((last_blank - max.clone()).exp() + (last_label - max.clone()).exp())
            .add_scalar(EPSILON)
            .log()
            + max;
        log_likelihood.neg()
    }

    /// Mean-reduced loss: per-utterance loss divided by its target length,
    /// then averaged over the batch.
    pub fn forward_mean<B: Backend>(
        &self,
        log_probs: Tensor<B, 3>,
        targets: &[Vec<usize>],
        input_lengths: &[usize],
    ) -> Tensor<B, 1> {
        let device = log_probs.device();
        let nll = self.forward(log_probs, targets, input_lengths);
        let lens: Vec<f32> = targets.iter().map(|t| t.len() as f32).collect();
        let lens = Tensor::<B, 1>::from_floats(lens.as_slice(), &device);
        nll.div(lens).mean()
    }

    fn assertions(
        &self,
        batch: usize,
        frames: usize,
        classes: usize,
        targets: &[Vec<usize>],
        input_lengths: &[usize],
    ) {
        assert!(
            self.blank < classes,
            "blank index {} must be less than num_classes {}",
            self.blank,
            classes
        );
        assert_eq!(
            targets.len(),
            batch,
            "targets cover {} utterances but the batch holds {}",
            targets.len(),
            batch
        );
        assert_eq!(
            input_lengths.len(),
            batch,
            "input_lengths cover {} utterances but the batch holds {}",
            input_lengths.len(),
            batch
        );
        for (b, seq) in targets.iter().enumerate() {
            assert!(!seq.is_empty(), "utterance {b} has an empty target sequence");
            for &label in seq {
                assert!(
                    label < classes && label != self.blank,
                    "utterance {b} target contains {label}, outside the real labels"
                );
            }
        }
        for (b, &len) in input_lengths.iter().enumerate() {
            assert!(
                len >= 1 && len <= frames,
                "utterance {b} input length {len} outside 1..={frames}"
            );
        }
    }
}

/// Shift every row right by `by`, filling vacated columns with LOG_ZERO.
fn shift_right<B: Backend>(tensor: Tensor<B, 2>, by: usize, device: &B::Device) -> Tensor<B, 2> {
    let [rows, cols] = tensor.dims();
    let pad = Tensor::<B, 2>::full([rows, by], LOG_ZERO, device);
    Tensor::cat(vec![pad, tensor.slice([0..rows, 0..cols - by])], 1)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Distribution;

    type TestBackend = burn::backend::NdArray<f32>;

    fn uniform_log_probs(
        frames: usize,
        batch: usize,
        classes: usize,
    ) -> Tensor<TestBackend, 3> {
        let device = Default::default();
        Tensor::full([batch, frames, classes], (1.0 / classes as f32).ln(), &device)
    }

    fn loss_values(t: Tensor<TestBackend, 1>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn repeated_label_minimum_length() {
        // C=2 with blank=1, target [0, 0], T=3: the only valid path is
        // (0, blank, 0), so P = (1/2)^3 and loss = 3 ln 2.
        let ctc = CtcLossConfig::new(1).init();
        let loss = ctc.forward(uniform_log_probs(3, 1, 2), &[vec![0, 0]], &[3]);
        let expected = 3.0 * 2.0_f32.ln();
        assert!((loss_values(loss)[0] - expected).abs() < 1e-3);
    }

    #[test]
    fn two_labels_three_frames_uniform() {
        // C=3 with blank=2, target [0, 1], T=3: five valid paths out of 27
        // equally likely ones, so loss = -ln(5/27).
        let ctc = CtcLossConfig::new(2).init();
        let loss = ctc.forward(uniform_log_probs(3, 1, 3), &[vec![0, 1]], &[3]);
        let expected = -(5.0_f32 / 27.0).ln();
        assert!((loss_values(loss)[0] - expected).abs() < 1e-3);
    }

    #[test]
    fn single_label_two_frames_uniform() {
        // C=2 with blank=1, target [0], T=2: paths (0,0), (0,b), (b,0)
        // cover 3/4 of the mass, so loss = -ln(0.75).
        let ctc = CtcLossConfig::new(1).init();
        let loss = ctc.forward(uniform_log_probs(2, 1, 2), &[vec![0]], &[2]);
        let expected = -0.75_f32.ln();
        assert!((loss_values(loss)[0] - expected).abs() < 1e-3);
    }

    #[test]
    fn impossible_alignment_saturates_finite() {
        // Target [0, 0] needs at least 3 frames; with 2 the loss has no
        // valid path and saturates near the log-zero floor instead of inf.
        let ctc = CtcLossConfig::new(1).init();
        let loss = ctc.forward(uniform_log_probs(2, 1, 2), &[vec![0, 0]], &[2]);
        let v = loss_values(loss)[0];
        assert!(v.is_finite());
        assert!(v > 1e4, "expected a saturated loss, got {v}");
    }

    #[test]
    fn padded_frames_do_not_change_the_loss() {
        let device = Default::default();
        let real = Tensor::<TestBackend, 3>::random([1, 4, 3], Distribution::Default, &device);
        let real = burn::tensor::activation::log_softmax(real, 2);
        let padding = Tensor::<TestBackend, 3>::full([1, 3, 3], (1.0f32 / 3.0).ln(), &device);
        let padded = Tensor::cat(vec![real.clone(), padding], 1);

        let ctc = CtcLossConfig::new(2).init();
        let unpadded = loss_values(ctc.forward(real, &[vec![0, 1]], &[4]));
        let padded = loss_values(ctc.forward(padded, &[vec![0, 1]], &[4]));
        assert!((unpadded[0] - padded[0]).abs() < 1e-4);
    }

    #[test]
    fn batched_matches_individual() {
        let device = Default::default();
        let a = Tensor::<TestBackend, 3>::random([1, 5, 4], Distribution::Default, &device);
        let a = burn::tensor::activation::log_softmax(a, 2);
        let b = Tensor::<TestBackend, 3>::random([1, 3, 4], Distribution::Default, &device);
        let b = burn::tensor::activation::log_softmax(b, 2);
        // pad b's frames up to a's with uniform filler the recursion must ignore
        let filler = Tensor::<TestBackend, 3>::full([1, 2, 4], 0.25f32.ln(), &device);
        let b_padded = Tensor::cat(vec![b.clone(), filler], 1);
        let both = Tensor::cat(vec![a.clone(), b_padded], 0);

        let ctc = CtcLossConfig::new(3).init();
        let separate_a = loss_values(ctc.forward(a, &[vec![0, 1, 0]], &[5]))[0];
        let separate_b = loss_values(ctc.forward(b, &[vec![2]], &[3]))[0];
        let batched = loss_values(ctc.forward(both, &[vec![0, 1, 0], vec![2]], &[5, 3]));

        assert!((batched[0] - separate_a).abs() < 1e-3);
        assert!((batched[1] - separate_b).abs() < 1e-3);
    }

    #[test]
    fn mean_reduction_divides_by_target_length() {
        let ctc = CtcLossConfig::new(2).init();
        let log_probs = uniform_log_probs(4, 2, 3);
        let targets = vec![vec![0, 1], vec![1]];
        let lengths = [4, 4];

        let per_sample = loss_values(ctc.forward(log_probs.clone(), &targets, &lengths));
        let mean = loss_values(ctc.forward_mean(log_probs, &targets, &lengths))[0];
        let expected = (per_sample[0] / 2.0 + per_sample[1] / 1.0) / 2.0;
        assert!((mean - expected).abs() < 1e-4);
    }

    #[test]
    fn backward_produces_finite_gradients() {
        type AdBackend = burn::backend::Autodiff<TestBackend>;
        let device = Default::default();

        let logits = Tensor::<AdBackend, 3>::random([2, 6, 4], Distribution::Default, &device)
            .require_grad();
        let log_probs = burn::tensor::activation::log_softmax(logits.clone(), 2);

        let ctc = CtcLossConfig::new(3).init();
        let loss = ctc.forward_mean(log_probs, &[vec![0, 1], vec![2, 2]], &[6, 5]);
        let grads = loss.backward();

        let grad = logits.grad(&grads).expect("logits gradient");
        for g in grad.into_data().to_vec::<f32>().unwrap() {
            assert!(g.is_finite(), "non-finite gradient {g}");
        }
    }

    #[test]
    #[should_panic(expected = "empty target")]
    fn empty_target_panics() {
        let ctc = CtcLossConfig::new(1).init();
        ctc.forward(uniform_log_probs(2, 1, 2), &[vec![]], &[2]);
    }

    #[test]
    #[should_panic(expected = "blank index")]
    fn blank_out_of_range_panics() {
        let ctc = CtcLossConfig::new(5).init();
        ctc.forward(uniform_log_probs(2, 1, 2), &[vec![0]], &[2]);
    }
}
