// ============================================================
// Core Traits (Abstractions)
// ============================================================

use anyhow::Result;

use crate::domain::labels::LabelKind;
use crate::domain::utterance::Utterance;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can produce the utterances of a corpus split.
///
/// Implementations:
///   - SpeechArchive → reads the pre-processed safetensors archive
pub trait CorpusSource {
    /// Load every utterance of `split` ("train", "valid" or "test")
    /// with labels at the given granularity.
    fn load_split(&self, split: &str, kind: LabelKind) -> Result<Vec<Utterance>>;
}
