//! Canonical face template: target landmark positions in chip
//! coordinates for the ArcFace-style 112×112 crop.

use crate::detection::landmarks::LANDMARK_COUNT;

/// Reference eye/nose/mouth positions in a 112-wide frame, before the
/// +8 px horizontal centering shift.
const BASE_112: [(f64, f64); LANDMARK_COUNT] = [
    (30.2946, 51.6963),
    (65.5318, 51.5014),
    (48.0252, 71.7366),
    (33.5493, 92.3655),
    (62.7299, 92.2041),
];

const X_SHIFT_112: f64 = 8.0;

/// Template scaled to a square chip of `chip_size` pixels.
pub fn canonical_template(chip_size: usize) -> [(f64, f64); LANDMARK_COUNT] {
    let scale = chip_size as f64 / 112.0;
    let shift = X_SHIFT_112 * scale;
    let mut points = BASE_112;
    for p in &mut points {
        p.0 = p.0 * scale + shift;
        p.1 *= scale;
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_template_112_includes_shift() {
        let t = canonical_template(112);
        assert_relative_eq!(t[0].0, 38.2946);
        assert_relative_eq!(t[0].1, 51.6963);
        assert_relative_eq!(t[4].0, 70.7299);
    }

    #[test]
    fn test_template_scales_with_chip_size() {
        let t = canonical_template(224);
        assert_relative_eq!(t[0].0, 2.0 * 38.2946);
        assert_relative_eq!(t[0].1, 2.0 * 51.6963);
    }

    #[test]
    fn test_template_fits_inside_chip() {
        for (x, y) in canonical_template(112) {
            assert!(x > 0.0 && x < 112.0);
            assert!(y > 0.0 && y < 112.0);
        }
    }

    #[test]
    fn test_eyes_are_level() {
        let t = canonical_template(112);
        // Left and right eye sit on nearly the same row
        assert!((t[0].1 - t[1].1).abs() < 0.5);
    }
}
