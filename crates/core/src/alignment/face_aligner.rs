//! Batch face alignment: raw detector output in, embedding-ready chips
//! out.

use ndarray::{Array1, Array2, Array3, Array4};
use thiserror::Error;

use crate::alignment::similarity::estimate_similarity;
use crate::alignment::template::canonical_template;
use crate::alignment::warp::warp_into_chip;
use crate::detection::landmarks::FaceLandmarks;
use crate::detection::raw_output::{parse_nms_output, RawOutputError};
use crate::shared::constants::{CHIP_SIZE, NETWORK_INPUT, SCORE_THRESHOLD};
use crate::shared::frame::SourceFrame;

#[derive(Debug, Error, PartialEq)]
pub enum AlignError {
    #[error(transparent)]
    MalformedOutput(#[from] RawOutputError),
}

#[derive(Clone, Copy, Debug)]
pub struct AlignerConfig {
    /// Detector input resolution the box/landmark coordinates refer to.
    pub network_input: (u32, u32),
    pub score_threshold: f32,
    pub chip_size: usize,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            network_input: NETWORK_INPUT,
            score_threshold: SCORE_THRESHOLD,
            chip_size: CHIP_SIZE,
        }
    }
}

/// Aligned output for one source image. The four fields are parallel:
/// row `i` of `boxes`, `scores`, and `landmarks` describes chip `i`.
///
/// When nothing clears the threshold, every field is a single all-zero
/// row (the defined degenerate result, not an error).
#[derive(Clone, Debug)]
pub struct AlignmentResult {
    /// `[x1, y1, x2, y2]` per retained face, source-image pixels.
    pub boxes: Array2<f32>,
    pub scores: Array1<f32>,
    /// `(n, 5, 2)` landmark coordinates, source-image pixels.
    pub landmarks: Array3<f32>,
    /// `(n, 3, chip, chip)` channel-first chips, values in [-1, 1].
    pub chips: Array4<f32>,
}

impl AlignmentResult {
    fn placeholder(chip_size: usize) -> Self {
        Self {
            boxes: Array2::zeros((1, 4)),
            scores: Array1::zeros(1),
            landmarks: Array3::zeros((1, 5, 2)),
            chips: Array4::zeros((1, 3, chip_size, chip_size)),
        }
    }

    /// Number of rows; 1 for the degenerate placeholder.
    pub fn len(&self) -> usize {
        self.boxes.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct FaceAligner {
    config: AlignerConfig,
    template: [(f64, f64); 5],
}

impl FaceAligner {
    pub fn new(config: AlignerConfig) -> Self {
        let template = canonical_template(config.chip_size);
        Self { config, template }
    }

    /// Rescales, filters, and aligns one image's detections.
    ///
    /// Detections arrive sorted by descending score, so the score filter
    /// is a prefix truncation: the first sub-threshold score ends the
    /// batch, even if later entries would have passed. A detection with
    /// unusable landmarks is skipped on its own; only buffers that do
    /// not reshape to the expected layout fail the whole batch.
    pub fn align_batch(
        &self,
        source: &SourceFrame,
        num_detections: usize,
        boxes: &[f32],
        scores: &[f32],
        landmarks: &[f32],
    ) -> Result<AlignmentResult, AlignError> {
        if num_detections == 0 {
            return Ok(AlignmentResult::placeholder(self.config.chip_size));
        }
        let faces = parse_nms_output(num_detections, boxes, scores, landmarks)?;

        let (net_w, net_h) = self.config.network_input;
        let sx = source.width() as f64 / net_w as f64;
        let sy = source.height() as f64 / net_h as f64;

        let mut kept_boxes: Vec<[f32; 4]> = Vec::new();
        let mut kept_scores: Vec<f32> = Vec::new();
        let mut kept_landmarks: Vec<FaceLandmarks> = Vec::new();
        let mut kept_chips: Vec<Array3<f32>> = Vec::new();

        for (i, face) in faces.iter().enumerate() {
            if face.score < self.config.score_threshold {
                break;
            }
            let lm = match FaceLandmarks::from_flat(&face.landmarks) {
                Ok(lm) => lm.scaled(sx, sy),
                Err(e) => {
                    log::warn!("skipping detection {i}: {e}");
                    continue;
                }
            };
            let Some(transform) = estimate_similarity(lm.points(), &self.template) else {
                log::warn!("skipping detection {i}: degenerate landmarks");
                continue;
            };
            let Some(chip) = warp_into_chip(source, &transform, self.config.chip_size)
            else {
                log::warn!("skipping detection {i}: non-invertible transform");
                continue;
            };

            kept_boxes.push([
                face.bbox[0] * sx as f32,
                face.bbox[1] * sy as f32,
                face.bbox[2] * sx as f32,
                face.bbox[3] * sy as f32,
            ]);
            kept_scores.push(face.score);
            kept_landmarks.push(lm);
            kept_chips.push(chip);
        }

        if kept_chips.is_empty() {
            return Ok(AlignmentResult::placeholder(self.config.chip_size));
        }
        Ok(self.stack(kept_boxes, kept_scores, kept_landmarks, kept_chips))
    }

    fn stack(
        &self,
        boxes: Vec<[f32; 4]>,
        scores: Vec<f32>,
        landmarks: Vec<FaceLandmarks>,
        chips: Vec<Array3<f32>>,
    ) -> AlignmentResult {
        let n = boxes.len();
        let chip_size = self.config.chip_size;

        let mut out_boxes = Array2::zeros((n, 4));
        let mut out_landmarks = Array3::zeros((n, 5, 2));
        let mut out_chips = Array4::zeros((n, 3, chip_size, chip_size));

        for i in 0..n {
            for j in 0..4 {
                out_boxes[[i, j]] = boxes[i][j];
            }
            for (j, (x, y)) in landmarks[i].points().iter().enumerate() {
                out_landmarks[[i, j, 0]] = *x as f32;
                out_landmarks[[i, j, 1]] = *y as f32;
            }
            // HWC 0..255 to CHW [-1, 1]
            for y in 0..chip_size {
                for x in 0..chip_size {
                    for c in 0..3 {
                        out_chips[[i, c, y, x]] = normalize_pixel(chips[i][[y, x, c]]);
                    }
                }
            }
        }

        AlignmentResult {
            boxes: out_boxes,
            scores: Array1::from_vec(scores),
            landmarks: out_landmarks,
            chips: out_chips,
        }
    }
}

/// Maps 8-bit pixel values into the embedding model's [-1, 1] range.
pub fn normalize_pixel(value: f32) -> f32 {
    (value / 255.0 - 0.5) / 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn constant_frame(width: u32, height: u32, value: u8) -> SourceFrame {
        SourceFrame::from_rgb(
            vec![value; (width * height * 3) as usize],
            width,
            height,
        )
        .unwrap()
    }

    /// Plausible 5-point layout inside a box at network coordinates.
    fn landmarks_in_box(x: f32, y: f32) -> [f32; 10] {
        [
            x + 30.0,
            y + 40.0,
            x + 70.0,
            y + 40.0,
            x + 50.0,
            y + 60.0,
            x + 35.0,
            y + 80.0,
            x + 65.0,
            y + 80.0,
        ]
    }

    fn aligner() -> FaceAligner {
        FaceAligner::new(AlignerConfig::default())
    }

    fn assert_placeholder(result: &AlignmentResult) {
        assert_eq!(result.boxes.shape(), &[1, 4]);
        assert_eq!(result.scores.shape(), &[1]);
        assert_eq!(result.landmarks.shape(), &[1, 5, 2]);
        assert_eq!(result.chips.shape(), &[1, 3, 112, 112]);
        assert!(result.boxes.iter().all(|&v| v == 0.0));
        assert!(result.chips.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_zero_detections_returns_placeholder() {
        let frame = constant_frame(64, 64, 128);
        let result = aligner().align_batch(&frame, 0, &[], &[], &[]).unwrap();
        assert_placeholder(&result);
    }

    #[test]
    fn test_all_below_threshold_returns_placeholder() {
        let frame = constant_frame(640, 640, 128);
        let boxes = [100.0, 100.0, 200.0, 200.0];
        let landmarks = landmarks_in_box(100.0, 100.0);
        let result = aligner()
            .align_batch(&frame, 1, &boxes, &[0.2], &landmarks)
            .unwrap();
        assert_placeholder(&result);
    }

    #[test]
    fn test_parallel_output_lengths() {
        // All four outputs share one length
        let frame = constant_frame(640, 640, 128);
        let mut boxes = Vec::new();
        let mut scores = Vec::new();
        let mut landmarks = Vec::new();
        for i in 0..3 {
            let off = i as f32 * 150.0;
            boxes.extend_from_slice(&[off, off, off + 120.0, off + 120.0]);
            scores.push(0.9);
            landmarks.extend_from_slice(&landmarks_in_box(off, off));
        }
        let result = aligner()
            .align_batch(&frame, 3, &boxes, &scores, &landmarks)
            .unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result.scores.len(), 3);
        assert_eq!(result.landmarks.shape()[0], 3);
        assert_eq!(result.chips.shape()[0], 3);
    }

    #[test]
    fn test_early_exit_truncates_at_first_subthreshold_score() {
        // [0.9, 0.4, 0.8] with threshold 0.6 keeps only the first —
        // the 0.8 detection is behind the break, not filtered back in.
        let frame = constant_frame(640, 640, 128);
        let mut boxes = Vec::new();
        let mut landmarks = Vec::new();
        for i in 0..3 {
            let off = i as f32 * 150.0;
            boxes.extend_from_slice(&[off, off, off + 120.0, off + 120.0]);
            landmarks.extend_from_slice(&landmarks_in_box(off, off));
        }
        let result = aligner()
            .align_batch(&frame, 3, &boxes, &[0.9, 0.4, 0.8], &landmarks)
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result.scores[0], 0.9);
    }

    #[test]
    fn test_rescale_to_source_coordinates() {
        // Scenario: 1280x720 source, 640x640 network input, scale (2, 1.125)
        let frame = constant_frame(1280, 720, 255);
        let boxes = [
            100.0, 100.0, 200.0, 200.0, //
            0.0, 0.0, 50.0, 50.0,
        ];
        let mut landmarks = landmarks_in_box(100.0, 100.0).to_vec();
        landmarks.extend_from_slice(&landmarks_in_box(0.0, 0.0));

        let result = aligner()
            .align_batch(&frame, 2, &boxes, &[0.95, 0.3], &landmarks)
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result.boxes[[0, 0]], 200.0);
        assert_relative_eq!(result.boxes[[0, 1]], 112.5);
        assert_relative_eq!(result.boxes[[0, 2]], 400.0);
        assert_relative_eq!(result.boxes[[0, 3]], 225.0);
        assert_eq!(result.chips.shape(), &[1, 3, 112, 112]);
        // Landmarks rescaled with the same factors
        assert_relative_eq!(result.landmarks[[0, 0, 0]], 260.0);
        assert_relative_eq!(result.landmarks[[0, 0, 1]], 157.5);
    }

    #[test]
    fn test_chip_of_white_frame_normalizes_to_one() {
        let frame = constant_frame(1280, 720, 255);
        let boxes = [100.0, 100.0, 200.0, 200.0];
        let landmarks = landmarks_in_box(100.0, 100.0);
        let result = aligner()
            .align_batch(&frame, 1, &boxes, &[0.95], &landmarks)
            .unwrap();
        for &v in result.chips.iter() {
            assert_relative_eq!(v, 1.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_invalid_landmarks_skip_only_that_detection() {
        let frame = constant_frame(640, 640, 128);
        let boxes = [
            100.0, 100.0, 200.0, 200.0, //
            300.0, 300.0, 400.0, 400.0,
        ];
        let mut landmarks = vec![f32::NAN; 10];
        landmarks.extend_from_slice(&landmarks_in_box(300.0, 300.0));

        let result = aligner()
            .align_batch(&frame, 2, &boxes, &[0.9, 0.8], &landmarks)
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result.scores[0], 0.8);
    }

    #[test]
    fn test_degenerate_landmarks_skip_only_that_detection() {
        let frame = constant_frame(640, 640, 128);
        let boxes = [100.0, 100.0, 200.0, 200.0];
        // All five points coincide: no similarity transform exists
        let landmarks = [150.0, 150.0, 150.0, 150.0, 150.0, 150.0, 150.0, 150.0, 150.0, 150.0];
        let result = aligner()
            .align_batch(&frame, 1, &boxes, &[0.9], &landmarks)
            .unwrap();
        assert_placeholder(&result);
    }

    #[test]
    fn test_short_buffers_fail_the_batch() {
        let frame = constant_frame(640, 640, 128);
        let err = aligner()
            .align_batch(&frame, 2, &[0.0; 8], &[0.9], &[0.0; 20])
            .unwrap_err();
        assert!(matches!(err, AlignError::MalformedOutput(_)));
    }

    #[rstest]
    #[case(0.0, -1.0)]
    #[case(127.5, 0.0)]
    #[case(255.0, 1.0)]
    fn test_pixel_normalization(#[case] input: f32, #[case] expected: f32) {
        // [0, 255] maps onto [-1, 1]
        assert_relative_eq!(normalize_pixel(input), expected, epsilon = 1e-3);
    }
}
