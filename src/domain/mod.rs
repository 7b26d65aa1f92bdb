// ============================================================
// Domain Layer
// ============================================================
// Plain Rust types for the core concepts of the system.
//
// Rules for this layer:
//   - No burn framework types
//   - No file I/O beyond reading the phoneme map
//   - Only structs, enums, and traits
//
// An Utterance is one spoken sentence: a frame-major feature
// matrix plus its phoneme or character label sequence. A
// LabelMap is the dictionary between label symbols and the
// integer indices the model and the CTC loss operate on.

// One utterance: acoustic frames + label sequence
pub mod utterance;

// Label symbol <-> index dictionary, with the CTC blank
pub mod labels;

// Abstractions implemented by the data layer
pub mod traits;
