//! Per-stream face-sighting deduplication.
//!
//! The tracker remembers which person tracks already had a face captured
//! for embedding extraction and bounds the work spent on faces whose
//! identity is still unknown. Identity memory is never evicted: a person
//! seen once is remembered for the pipeline's lifetime.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::detection::detection::{ComponentId, Detection, DetectionError};
use crate::shared::constants::{
    FACE_CLASS_ID, MIN_FACE_SIZE, POOL_CAPACITY, POOL_WINDOW,
};
use crate::tracking::candidate_pool::CandidatePool;

/// Verdict on one face detection. `Reject` is a normal outcome, not a
/// failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// Drop: too small, already captured, or over pool budget.
    Reject,
    /// Forward for embedding extraction as an unknown-identity candidate.
    AdmitPool,
    /// First face sighting of a known person; forward and mark captured.
    AdmitConfirmed,
}

/// State for one track that has been granted embedded status.
#[derive(Clone, Debug, Default)]
pub struct IdentityRecord {
    /// Frame number of the first admitted face sighting.
    pub embedded_at_frame: Option<u64>,
    /// L2-normalized feature vector, written exactly once.
    embedding: Option<Vec<f32>>,
}

impl IdentityRecord {
    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TrackerConfig {
    /// Faces with either box dimension below this are rejected outright
    /// when they come from the primary detector.
    pub min_face_size: f64,
    pub pool_capacity: usize,
    pub pool_window: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_face_size: MIN_FACE_SIZE,
            pool_capacity: POOL_CAPACITY,
            pool_window: POOL_WINDOW,
        }
    }
}

pub struct IdentityTracker {
    identities: HashMap<u64, IdentityRecord>,
    pool: CandidatePool,
    min_face_size: f64,
}

impl IdentityTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            identities: HashMap::new(),
            pool: CandidatePool::new(config.pool_capacity, config.pool_window),
            min_face_size: config.min_face_size,
        }
    }

    /// Registers a person track seen by the primary detector. The record
    /// starts with an empty embedding slot; the map only grows.
    pub fn observe_person(&mut self, track_id: u64, component_id: ComponentId, class_id: i32) {
        if component_id != ComponentId::Primary || class_id != FACE_CLASS_ID {
            return;
        }
        if !self.identities.contains_key(&track_id) {
            log::debug!("new person {track_id} registered");
            self.identities.insert(track_id, IdentityRecord::default());
        }
    }

    /// Decides whether one face detection proceeds to embedding
    /// extraction. Malformed detections fail without mutating state.
    pub fn admit_face(
        &mut self,
        detection: &Detection,
        frame_number: u64,
    ) -> Result<AdmissionDecision, DetectionError> {
        detection.validate()?;

        if detection.class_id != FACE_CLASS_ID {
            return Ok(AdmissionDecision::Reject);
        }
        if detection.component_id == ComponentId::Primary
            && (detection.bbox.width < self.min_face_size
                || detection.bbox.height < self.min_face_size)
        {
            return Ok(AdmissionDecision::Reject);
        }

        // In the two-stage pipeline the face links to its person box; in
        // the full-frame variant the face's own track carries identity.
        let identity_key = detection
            .parent_id()
            .or_else(|| detection.is_tracked().then_some(detection.track_id));
        if let Some(key) = identity_key {
            if let Some(record) = self.identities.get_mut(&key) {
                if record.embedded_at_frame.is_some() {
                    // Face of this person already captured.
                    self.pool.remove(detection.track_id);
                    return Ok(AdmissionDecision::Reject);
                }
                log::debug!("face of person {key} captured in frame {frame_number}");
                record.embedded_at_frame = Some(frame_number);
                self.pool.remove(detection.track_id);
                return Ok(AdmissionDecision::AdmitConfirmed);
            }
        }

        // Unknown identity: capacity-limited pool admission.
        if self.pool.contains(detection.track_id) {
            return Ok(AdmissionDecision::Reject);
        }
        if self.pool.insert(detection.track_id) {
            Ok(AdmissionDecision::AdmitPool)
        } else {
            Ok(AdmissionDecision::Reject)
        }
    }

    /// Advances the pool flush window; call once per processed frame.
    pub fn tick(&mut self, now: Instant) {
        if self.pool.tick(now) {
            log::debug!("candidate pool flushed");
        }
    }

    /// Stores the embedding for a confirmed identity, L2-normalized.
    /// First write wins; later writes are ignored. Returns `true` when
    /// the vector was stored.
    pub fn set_embedding(&mut self, track_id: u64, mut embedding: Vec<f32>) -> bool {
        let Some(record) = self.identities.get_mut(&track_id) else {
            return false;
        };
        if record.embedding.is_some() {
            return false;
        }
        l2_normalize(&mut embedding);
        record.embedding = Some(embedding);
        true
    }

    pub fn record(&self, track_id: u64) -> Option<&IdentityRecord> {
        self.identities.get(&track_id)
    }

    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
