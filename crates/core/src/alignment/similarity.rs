//! Least-squares similarity transform estimation.
//!
//! A similarity transform has 4 degrees of freedom: uniform scale,
//! rotation, and translation — no shear, no reflection. The closed-form
//! least-squares fit over point correspondences writes the linear part
//! as `[[a, -b], [b, a]]` with `a = s·cosθ`, `b = s·sinθ`.

/// Row-major 2×3 affine matrix mapping `(x, y)` to
/// `(m00·x + m01·y + m02, m10·x + m11·y + m12)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineTransform {
    pub m: [[f64; 3]; 2],
}

impl AffineTransform {
    pub fn identity() -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.m[0][0] * x + self.m[0][1] * y + self.m[0][2],
            self.m[1][0] * x + self.m[1][1] * y + self.m[1][2],
        )
    }

    /// Inverse map, or `None` when the linear part is singular.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.m[0][0] * self.m[1][1] - self.m[0][1] * self.m[1][0];
        if det.abs() < 1e-12 {
            return None;
        }
        let i00 = self.m[1][1] / det;
        let i01 = -self.m[0][1] / det;
        let i10 = -self.m[1][0] / det;
        let i11 = self.m[0][0] / det;
        let tx = -(i00 * self.m[0][2] + i01 * self.m[1][2]);
        let ty = -(i10 * self.m[0][2] + i11 * self.m[1][2]);
        Some(Self {
            m: [[i00, i01, tx], [i10, i11, ty]],
        })
    }
}

/// Fits the similarity transform mapping `from` points onto `to` points,
/// minimizing the sum of squared residuals.
///
/// Returns `None` when the point sets differ in length or `from` has no
/// spatial spread (all points coincide), which leaves scale/rotation
/// undetermined.
pub fn estimate_similarity(
    from: &[(f64, f64)],
    to: &[(f64, f64)],
) -> Option<AffineTransform> {
    if from.len() != to.len() || from.is_empty() {
        return None;
    }
    let n = from.len() as f64;

    let (mut mean_fx, mut mean_fy, mut mean_tx, mut mean_ty) = (0.0, 0.0, 0.0, 0.0);
    for ((fx, fy), (tx, ty)) in from.iter().zip(to) {
        mean_fx += fx;
        mean_fy += fy;
        mean_tx += tx;
        mean_ty += ty;
    }
    mean_fx /= n;
    mean_fy /= n;
    mean_tx /= n;
    mean_ty /= n;

    // a = Σ(p·q) / Σ|p|², b = Σ(p×q) / Σ|p|² over centered points
    let mut dot = 0.0;
    let mut cross = 0.0;
    let mut norm = 0.0;
    for ((fx, fy), (tx, ty)) in from.iter().zip(to) {
        let (px, py) = (fx - mean_fx, fy - mean_fy);
        let (qx, qy) = (tx - mean_tx, ty - mean_ty);
        dot += px * qx + py * qy;
        cross += px * qy - py * qx;
        norm += px * px + py * py;
    }
    if norm < 1e-12 {
        return None;
    }
    let a = dot / norm;
    let b = cross / norm;

    let tx = mean_tx - (a * mean_fx - b * mean_fy);
    let ty = mean_ty - (b * mean_fx + a * mean_fy);
    Some(AffineTransform {
        m: [[a, -b, tx], [b, a, ty]],
    })
}
