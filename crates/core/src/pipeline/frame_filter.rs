//! Per-frame admission pass over a detection batch.
//!
//! Runs in two phases: first every detection gets a decision, then the
//! retained subset is produced as a separate pass. Nothing is removed
//! from a collection while it is being decided over.

use std::time::Instant;

use crate::detection::detection::{ComponentId, Detection};
use crate::tracking::identity_tracker::{AdmissionDecision, IdentityTracker};

/// Outcome for one frame's detections.
#[derive(Clone, Debug)]
pub struct FrameAdmission {
    /// One entry per input detection, in order. `None` when the
    /// detection was not subject to admission (person boxes from a
    /// non-face component) or was malformed and skipped.
    pub decisions: Vec<Option<AdmissionDecision>>,
    /// Face detections to forward to embedding extraction, input order.
    pub admitted: Vec<Detection>,
}

impl FrameAdmission {
    pub fn admitted_count(&self) -> usize {
        self.admitted.len()
    }

    pub fn count(&self, decision: AdmissionDecision) -> usize {
        self.decisions
            .iter()
            .filter(|d| **d == Some(decision))
            .count()
    }

    pub fn invalid_count(&self) -> usize {
        self.decisions.iter().filter(|d| d.is_none()).count()
    }
}

/// Owns one stream's tracker and applies it to whole frames.
pub struct FrameFilter {
    tracker: IdentityTracker,
    /// Which inference stage produces face boxes: `Secondary` in the
    /// person-then-face pipeline, `Primary` in the full-frame variant.
    face_component: ComponentId,
}

impl FrameFilter {
    pub fn new(tracker: IdentityTracker, face_component: ComponentId) -> Self {
        Self {
            tracker,
            face_component,
        }
    }

    pub fn tracker(&self) -> &IdentityTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut IdentityTracker {
        &mut self.tracker
    }

    /// Processes one frame's detections, delivered in detection-list
    /// order. `now` drives the pool flush window.
    pub fn process(
        &mut self,
        detections: &[Detection],
        frame_number: u64,
        now: Instant,
    ) -> FrameAdmission {
        self.tracker.tick(now);

        for det in detections {
            if det.component_id == ComponentId::Primary && det.is_tracked() {
                self.tracker
                    .observe_person(det.track_id, det.component_id, det.class_id);
            }
        }

        // Phase one: decide everything.
        let mut decisions = Vec::with_capacity(detections.len());
        for det in detections {
            if det.component_id != self.face_component {
                decisions.push(None);
                continue;
            }
            match self.tracker.admit_face(det, frame_number) {
                Ok(decision) => decisions.push(Some(decision)),
                Err(e) => {
                    log::warn!("frame {frame_number}: skipping detection: {e}");
                    decisions.push(None);
                }
            }
        }

        // Phase two: apply the decisions.
        let admitted = detections
            .iter()
            .zip(&decisions)
            .filter(|(_, d)| {
                matches!(
                    d,
                    Some(AdmissionDecision::AdmitPool)
                        | Some(AdmissionDecision::AdmitConfirmed)
                )
            })
            .map(|(det, _)| det.clone())
            .collect();

        FrameAdmission {
            decisions,
            admitted,
        }
    }
}
