// ============================================================
// Data Pipeline
// ============================================================
// From the pre-processed archive to tensor batches:
//
//   timit.safetensors
//       │
//       ▼
//   SpeechArchive      → per-split features + sparse labels
//       │
//       ▼
//   UtteranceDataset   → implements burn's Dataset trait
//       │
//       ▼
//   CtcBatcher         → pads frames, keeps labels ragged
//       │
//       ▼
//   DataLoader         → feeds batches to the training loop
//
// Pre-processing (framing, filterbanks, label indexing) happens
// upstream; this layer only reads the archive's fixed layout.

/// Reads the safetensors dataset archive
pub mod archive;

/// Implements burn's Dataset trait for utterances
pub mod dataset;

/// Implements burn's Batcher trait for padded CTC batches
pub mod batcher;
