pub mod face_aligner;
pub mod similarity;
pub mod template;
pub mod warp;
