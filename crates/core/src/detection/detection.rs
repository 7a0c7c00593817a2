use thiserror::Error;

use crate::detection::landmarks::FaceLandmarks;
use crate::shared::constants::UNTRACKED_ID;

/// Which inference stage produced a detection. Multi-stage pipelines use
/// a coarse primary detector for person boxes and a secondary one for
/// faces inside them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentId {
    Primary,
    Secondary,
    Tertiary,
}

/// Axis-aligned box as the upstream tracker reports it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum DetectionError {
    #[error("invalid detection: {0}")]
    InvalidDetection(&'static str),
}

/// One face (or person) instance found in one frame of one stream.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// Stable per-object id, or [`UNTRACKED_ID`] before tracking locks on.
    pub track_id: u64,
    pub bbox: BoundingBox,
    pub score: f64,
    pub landmarks: FaceLandmarks,
    pub class_id: i32,
    pub component_id: ComponentId,
    /// Person box containing this face, where the pipeline links them.
    pub parent_track_id: Option<u64>,
}

impl Detection {
    pub fn is_tracked(&self) -> bool {
        self.track_id != UNTRACKED_ID
    }

    /// Parent link with the untracked sentinel resolved to `None`.
    pub fn parent_id(&self) -> Option<u64> {
        self.parent_track_id.filter(|&id| id != UNTRACKED_ID)
    }

    /// Malformed geometry check. Callers skip invalid detections without
    /// touching tracker state.
    pub fn validate(&self) -> Result<(), DetectionError> {
        if self.bbox.width < 0.0 || self.bbox.height < 0.0 {
            return Err(DetectionError::InvalidDetection("negative box dimension"));
        }
        let finite = [
            self.bbox.left,
            self.bbox.top,
            self.bbox.width,
            self.bbox.height,
            self.score,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(DetectionError::InvalidDetection("non-finite geometry"));
        }
        if self
            .landmarks
            .points()
            .iter()
            .any(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(DetectionError::InvalidDetection("non-finite landmark"));
        }
        Ok(())
    }
}
