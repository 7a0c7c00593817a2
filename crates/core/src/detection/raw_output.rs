//! Parsing of the detector's raw NMS output layers.
//!
//! The post-NMS model emits flat buffers: boxes as `[x1, y1, x2, y2]`
//! strides of 4, one score per detection, landmarks as strides of 10.
//! Coordinates are in network-input space until the aligner rescales
//! them.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RawOutputError {
    #[error("{layer} buffer too short: need {needed} values, got {got}")]
    BufferTooShort {
        layer: &'static str,
        needed: usize,
        got: usize,
    },
}

/// One detection as read straight from the output tensors.
#[derive(Clone, Debug, PartialEq)]
pub struct RawFace {
    pub bbox: [f32; 4],
    pub score: f32,
    pub landmarks: [f32; 10],
}

/// Splits the flat NMS buffers into per-detection records.
///
/// Buffers may be padded beyond `num_detections` entries (the NMS plugin
/// allocates for its max output); only a shortfall is an error.
pub fn parse_nms_output(
    num_detections: usize,
    boxes: &[f32],
    scores: &[f32],
    landmarks: &[f32],
) -> Result<Vec<RawFace>, RawOutputError> {
    check_len("boxes", boxes, num_detections * 4)?;
    check_len("scores", scores, num_detections)?;
    check_len("landmarks", landmarks, num_detections * 10)?;

    let mut faces = Vec::with_capacity(num_detections);
    for i in 0..num_detections {
        let mut bbox = [0.0; 4];
        bbox.copy_from_slice(&boxes[i * 4..i * 4 + 4]);
        let mut lmk = [0.0; 10];
        lmk.copy_from_slice(&landmarks[i * 10..i * 10 + 10]);
        faces.push(RawFace {
            bbox,
            score: scores[i],
            landmarks: lmk,
        });
    }
    Ok(faces)
}

fn check_len(
    layer: &'static str,
    buf: &[f32],
    needed: usize,
) -> Result<(), RawOutputError> {
    if buf.len() < needed {
        return Err(RawOutputError::BufferTooShort {
            layer,
            needed,
            got: buf.len(),
        });
    }
    Ok(())
}
