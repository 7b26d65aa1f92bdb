// ============================================================
// Infrastructure Layer
// ============================================================
// Cross-cutting persistence concerns:
//
//   checkpoint.rs — model weights via burn's CompactRecorder
//                   (model.mpk every epoch, best.mpk on a new
//                   best validation error rate) plus the run's
//                   train_config.json
//
//   meta.rs       — the per-run metadata document: epoch list,
//                   invocation arguments and per-metric history,
//                   rewritten to meta.json after every epoch so
//                   a crash loses at most the current epoch
//
//   metrics.rs    — epoch metric records and the running
//                   accumulator used by the training loop

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training-run metadata document
pub mod meta;

/// Epoch metrics types
pub mod metrics;
