use std::time::Duration;

/// Track id assigned by the upstream tracker before an object has a
/// stable identity.
pub const UNTRACKED_ID: u64 = u64::MAX;

/// Detector class id for faces (and for person boxes in the full-frame
/// pipeline variant).
pub const FACE_CLASS_ID: i32 = 0;

/// Faces smaller than this (either dimension, in pixels) carry too
/// little detail for a usable embedding.
pub const MIN_FACE_SIZE: f64 = 20.0;

/// Max unknown-identity tracks admitted for embedding per window.
pub const POOL_CAPACITY: usize = 4;

/// Whole-pool flush interval.
pub const POOL_WINDOW: Duration = Duration::from_secs(1);

/// Side length of the canonical aligned face chip.
pub const CHIP_SIZE: usize = 112;

/// Detections below this confidence end batch processing (the detector
/// emits them sorted by descending score).
pub const SCORE_THRESHOLD: f32 = 0.6;

/// Detector network input resolution (width, height).
pub const NETWORK_INPUT: (u32, u32) = (640, 640);

/// Length of the face embedding vector produced downstream.
pub const EMBEDDING_DIM: usize = 512;
