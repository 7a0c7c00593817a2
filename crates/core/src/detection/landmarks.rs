//! 5-point face landmarks: left eye, right eye, nose tip, left and
//! right mouth corner, in detection order.

use thiserror::Error;

pub const LANDMARK_COUNT: usize = 5;

#[derive(Debug, Error, PartialEq)]
pub enum LandmarkError {
    #[error("expected {expected} landmark values, got {0}", expected = LANDMARK_COUNT * 2)]
    BadLength(usize),
    #[error("landmark coordinates must be finite")]
    NonFinite,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    points: [(f64, f64); LANDMARK_COUNT],
}

impl FaceLandmarks {
    pub fn new(points: [(f64, f64); LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    /// Builds landmarks from the detector's flattened
    /// `[x1, y1, x2, y2, ...]` layout.
    pub fn from_flat(values: &[f32]) -> Result<Self, LandmarkError> {
        if values.len() != LANDMARK_COUNT * 2 {
            return Err(LandmarkError::BadLength(values.len()));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(LandmarkError::NonFinite);
        }
        let mut points = [(0.0, 0.0); LANDMARK_COUNT];
        for (i, point) in points.iter_mut().enumerate() {
            *point = (values[i * 2] as f64, values[i * 2 + 1] as f64);
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[(f64, f64); LANDMARK_COUNT] {
        &self.points
    }

    /// Independent x/y rescale, e.g. from network-input space to source
    /// image space.
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        let mut points = self.points;
        for p in &mut points {
            p.0 *= sx;
            p.1 *= sy;
        }
        Self { points }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_flat_orders_pairs() {
        let lm =
            FaceLandmarks::from_flat(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0])
                .unwrap();
        assert_eq!(lm.points()[0], (1.0, 2.0));
        assert_eq!(lm.points()[4], (9.0, 10.0));
    }

    #[test]
    fn test_from_flat_wrong_length() {
        assert_eq!(
            FaceLandmarks::from_flat(&[1.0; 8]),
            Err(LandmarkError::BadLength(8))
        );
    }

    #[test]
    fn test_from_flat_rejects_nan() {
        let mut values = [1.0f32; 10];
        values[3] = f32::NAN;
        assert_eq!(
            FaceLandmarks::from_flat(&values),
            Err(LandmarkError::NonFinite)
        );
    }

    #[test]
    fn test_scaled_independent_axes() {
        let lm = FaceLandmarks::new([(10.0, 20.0); 5]).scaled(2.0, 1.125);
        assert_relative_eq!(lm.points()[0].0, 20.0);
        assert_relative_eq!(lm.points()[0].1, 22.5);
    }
}
