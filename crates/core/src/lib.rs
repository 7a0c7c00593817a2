//! Face-sighting deduplication and geometric alignment for multi-stream
//! video analytics.
//!
//! The surrounding pipeline (decoding, inference, rendering) hands this
//! crate one batch of face detections per frame. Two independent
//! components consume them:
//!
//! - [`tracking::identity_tracker::IdentityTracker`] decides, per
//!   detection, whether a face should proceed to embedding extraction or
//!   is a duplicate of an already-captured identity.
//! - [`alignment::face_aligner::FaceAligner`] turns raw detector output
//!   into canonical 112×112 face chips ready for an embedding model.

pub mod alignment;
pub mod detection;
pub mod pipeline;
pub mod shared;
pub mod tracking;
