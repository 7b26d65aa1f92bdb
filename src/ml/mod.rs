// ============================================================
// ML / Model Layer (burn)
// ============================================================
// All burn-specific modelling code lives here.
//
//   model.rs   — the recurrent acoustic model: a stack of
//                lstm/gru/rnn blocks with optional LayerNorm
//                and dropout, then a time-distributed linear
//                projection to the label classes
//
//   ctc.rs     — the CTC loss: batched log-domain forward
//                recursion over blank-interleaved targets
//
//   decoder.rs — greedy and prefix-beam CTC decoding plus the
//                label-error-rate metric
//
//   trainer.rs — the training loop: SGD with momentum and
//                gradient clipping, validation LER, per-epoch
//                checkpoints and metadata updates
//
// Reference: Graves et al. (2006) Connectionist Temporal
//            Classification, Hannun et al. (2014) first-pass
//            prefix beam search

/// Recurrent acoustic model architecture
pub mod model;

/// Connectionist Temporal Classification loss
pub mod ctc;

/// Greedy / beam decoding and error-rate metric
pub mod decoder;

/// Full training loop with validation and checkpointing
pub mod trainer;
