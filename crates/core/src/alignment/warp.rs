//! Affine warping of a source frame into a fixed-size chip.

use ndarray::Array3;

use crate::alignment::similarity::AffineTransform;
use crate::shared::frame::SourceFrame;

/// Warps `src` into a `chip_size`×`chip_size` RGB image (HWC, f32 in
/// 0..=255) using `transform`, which maps source coordinates to chip
/// coordinates. Samples bilinearly through the inverse map; anything
/// falling outside the source fills with 0.
///
/// Returns `None` when the transform is not invertible.
pub fn warp_into_chip(
    src: &SourceFrame,
    transform: &AffineTransform,
    chip_size: usize,
) -> Option<Array3<f32>> {
    let inverse = transform.inverse()?;
    let mut chip = Array3::<f32>::zeros((chip_size, chip_size, 3));

    for y in 0..chip_size {
        for x in 0..chip_size {
            let (sx, sy) = inverse.apply(x as f64, y as f64);
            let rgb = sample_bilinear(src, sx, sy);
            for c in 0..3 {
                chip[[y, x, c]] = rgb[c];
            }
        }
    }
    Some(chip)
}

fn sample_bilinear(src: &SourceFrame, x: f64, y: f64) -> [f32; 3] {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = (x - x0) as f32;
    let fy = (y - y0) as f32;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let p00 = pixel_or_zero(src, x0, y0);
    let p10 = pixel_or_zero(src, x0 + 1, y0);
    let p01 = pixel_or_zero(src, x0, y0 + 1);
    let p11 = pixel_or_zero(src, x0 + 1, y0 + 1);

    let mut out = [0.0f32; 3];
    for c in 0..3 {
        let top = p00[c] + (p10[c] - p00[c]) * fx;
        let bottom = p01[c] + (p11[c] - p01[c]) * fx;
        out[c] = top + (bottom - top) * fy;
    }
    out
}

fn pixel_or_zero(src: &SourceFrame, x: i64, y: i64) -> [f32; 3] {
    match src.pixel(x, y) {
        Some([r, g, b]) => [r as f32, g as f32, b as f32],
        None => [0.0; 3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn gradient_frame(width: u32, height: u32) -> SourceFrame {
        // R encodes x, G encodes y, B constant
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(x as u8);
                data.push(y as u8);
                data.push(7);
            }
        }
        SourceFrame::from_rgb(data, width, height).unwrap()
    }

    #[test]
    fn test_identity_warp_copies_pixels() {
        let src = gradient_frame(16, 16);
        let chip = warp_into_chip(&src, &AffineTransform::identity(), 8).unwrap();
        assert_eq!(chip.shape(), &[8, 8, 3]);
        assert_relative_eq!(chip[[3, 5, 0]], 5.0);
        assert_relative_eq!(chip[[3, 5, 1]], 3.0);
        assert_relative_eq!(chip[[3, 5, 2]], 7.0);
    }

    #[test]
    fn test_translation_warp() {
        let src = gradient_frame(16, 16);
        // Source (4, 2) lands at chip (0, 0)
        let t = AffineTransform {
            m: [[1.0, 0.0, -4.0], [0.0, 1.0, -2.0]],
        };
        let chip = warp_into_chip(&src, &t, 4).unwrap();
        assert_relative_eq!(chip[[0, 0, 0]], 4.0);
        assert_relative_eq!(chip[[0, 0, 1]], 2.0);
    }

    #[test]
    fn test_out_of_bounds_fills_zero() {
        let src = gradient_frame(4, 4);
        // Shift far outside the 4x4 source
        let t = AffineTransform {
            m: [[1.0, 0.0, 100.0], [0.0, 1.0, 100.0]],
        };
        let chip = warp_into_chip(&src, &t, 4).unwrap();
        assert!(chip.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_bilinear_midpoint_average() {
        // 2x1 frame, R = 0 and 100; halfway sample interpolates
        let src = SourceFrame::from_rgb(vec![0, 0, 0, 100, 0, 0], 2, 1).unwrap();
        let rgb = sample_bilinear(&src, 0.5, 0.0);
        assert_relative_eq!(rgb[0], 50.0);
    }

    #[test]
    fn test_singular_transform_returns_none() {
        let src = gradient_frame(4, 4);
        let t = AffineTransform {
            m: [[0.0, 0.0, 0.0], [0.0, 0.0, 0.0]],
        };
        assert!(warp_into_chip(&src, &t, 4).is_none());
    }
}
