// ============================================================
// CTC Decoding
// ============================================================
// Turns per-frame class log-probabilities back into label
// sequences, and scores hypotheses against references.
//
//   greedy      — best path: frame-wise argmax, collapse runs,
//                 drop blanks. What the training loop uses for
//                 the validation error rate.
//   beam_search — prefix beam search (Hannun et al., 2014):
//                 tracks per-prefix probability split into
//                 "ends in blank" / "ends in non-blank" mass so
//                 repeated labels merge correctly.
//
// Both operate on host memory: decoding is control-flow heavy
// and happens once per validation utterance, so there is nothing
// to gain from keeping it on-device.

use std::collections::HashMap;

/// Decodes class log-probabilities into label sequences.
pub struct CtcDecoder {
    blank: usize,
}

impl CtcDecoder {
    pub fn new(blank: usize) -> Self {
        Self { blank }
    }

    /// Best-path decoding over `frames` rows of `classes` log-probs.
    /// Collapses consecutive repeats, then removes blanks; a blank
    /// between two equal labels keeps both ("aa" survives only across
    /// a blank).
    pub fn greedy(&self, log_probs: &[f32], frames: usize, classes: usize) -> Vec<usize> {
        let mut decoded = Vec::new();
        let mut prev = self.blank;
        for t in 0..frames {
            let row = &log_probs[t * classes..(t + 1) * classes];
            let best = argmax(row);
            if best != self.blank && best != prev {
                decoded.push(best);
            }
            prev = best;
        }
        decoded
    }

    /// Prefix beam search with the given beam width. Returns the most
    /// probable prefix after summing over all alignments kept in the beam.
    pub fn beam_search(
        &self,
        log_probs: &[f32],
        frames: usize,
        classes: usize,
        beam_width: usize,
    ) -> Vec<usize> {
        assert!(beam_width >= 1, "beam width must be at least 1");

        // prefix → (log P ending in blank, log P ending in non-blank)
        let mut beams: Vec<(Vec<usize>, (f64, f64))> =
            vec![(Vec::new(), (0.0, f64::NEG_INFINITY))];

        for t in 0..frames {
            let row = &log_probs[t * classes..(t + 1) * classes];
            let mut next: HashMap<Vec<usize>, (f64, f64)> = HashMap::new();

            for (prefix, (p_blank, p_label)) in &beams {
                let total = log_sum_exp(*p_blank, *p_label);

                // Emit a blank: the prefix is unchanged, all mass moves
                // into its blank bucket.
                let entry = next
                    .entry(prefix.clone())
                    .or_insert((f64::NEG_INFINITY, f64::NEG_INFINITY));
                entry.0 = log_sum_exp(entry.0, total + row[self.blank] as f64);

                for label in 0..classes {
                    if label == self.blank {
                        continue;
                    }
                    let p = row[label] as f64;

                    if prefix.last() == Some(&label) {
                        // Same symbol again: extending the run keeps the
                        // prefix (non-blank mass only); starting a fresh
                        // occurrence requires the blank-ending mass.
                        let entry = next
                            .entry(prefix.clone())
                            .or_insert((f64::NEG_INFINITY, f64::NEG_INFINITY));
                        entry.1 = log_sum_exp(entry.1, p_label + p);

                        let mut grown = prefix.clone();
                        grown.push(label);
                        let entry = next
                            .entry(grown)
                            .or_insert((f64::NEG_INFINITY, f64::NEG_INFINITY));
                        entry.1 = log_sum_exp(entry.1, p_blank + p);
                    } else {
                        let mut grown = prefix.clone();
                        grown.push(label);
                        let entry = next
                            .entry(grown)
                            .or_insert((f64::NEG_INFINITY, f64::NEG_INFINITY));
                        entry.1 = log_sum_exp(entry.1, total + p);
                    }
                }
            }

            let mut pruned: Vec<_> = next.into_iter().collect();
            pruned.sort_by(|(_, pa), (_, pb)| {
                let pa = log_sum_exp(pa.0, pa.1);
                let pb = log_sum_exp(pb.0, pb.1);
                pb.partial_cmp(&pa).expect("beam scores are never NaN")
            });
            pruned.truncate(beam_width);
            beams = pruned;
        }

        beams
            .into_iter()
            .max_by(|(_, pa), (_, pb)| {
                let pa = log_sum_exp(pa.0, pa.1);
                let pb = log_sum_exp(pb.0, pb.1);
                pa.partial_cmp(&pb).expect("beam scores are never NaN")
            })
            .map(|(prefix, _)| prefix)
            .unwrap_or_default()
    }
}

fn argmax(row: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = i;
        }
    }
    best
}

fn log_sum_exp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let m = a.max(b);
    m + ((a - m).exp() + (b - m).exp()).ln()
}

// ─── Error-rate metric ────────────────────────────────────────────────────────

/// Levenshtein distance between two label sequences.
pub fn edit_distance(a: &[usize], b: &[usize]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];
    for (i, &x) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &y) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(x != y);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}

/// Label error rate: edit distance normalised by the reference length
/// (the `tf.edit_distance(..., normalize=True)` convention).
pub fn label_error_rate(hypothesis: &[usize], reference: &[usize]) -> f64 {
    if reference.is_empty() {
        return hypothesis.len() as f64;
    }
    edit_distance(hypothesis, reference) as f64 / reference.len() as f64
}
