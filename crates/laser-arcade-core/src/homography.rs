use nalgebra::{DMatrix, Matrix3, Point2, Vector3};

/// Divisor magnitude below which the homogeneous divide is considered
/// degenerate and a mapped point is rejected.
const MIN_HOMOGENEOUS_W: f64 = 1e-8;

/// Planar projective transform from camera space to screen space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum HomographyFitError {
    #[error("need at least 4 correspondences, got {0}")]
    TooFewPoints(usize),
    #[error("source/destination point counts differ ({src} vs {dst})")]
    LengthMismatch { src: usize, dst: usize },
    #[error("three or more source points are collinear")]
    Collinear,
    #[error("linear system is rank deficient")]
    RankDeficient,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Matrix3::from_row_slice(&[
            rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
            rows[2][1], rows[2][2],
        ]))
    }

    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        [
            [self.h[(0, 0)], self.h[(0, 1)], self.h[(0, 2)]],
            [self.h[(1, 0)], self.h[(1, 1)], self.h[(1, 2)]],
            [self.h[(2, 0)], self.h[(2, 1)], self.h[(2, 2)]],
        ]
    }

    /// Map a camera-space point into screen space.
    ///
    /// Returns `None` when the homogeneous divisor collapses toward zero,
    /// which happens for points far outside the calibrated domain. Callers
    /// must treat that as "no detection" rather than clamping the result.
    #[inline]
    pub fn apply_checked(&self, p: Point2<f32>) -> Option<Point2<f32>> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        if w.abs() < MIN_HOMOGENEOUS_W {
            return None;
        }
        Some(Point2::new((v[0] / w) as f32, (v[1] / w) as f32))
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

fn hartley_scale(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };
    Matrix3::<f64>::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

/// Hartley normalization: translate to centroid, scale so the mean distance
/// from the origin is sqrt(2).
fn normalize_points(pts: &[Point2<f32>]) -> (Vec<Point2<f64>>, Matrix3<f64>) {
    let n = pts.len() as f64;
    let (mut cx, mut cy) = (0.0, 0.0);
    for p in pts {
        cx += p.x as f64;
        cy += p.y as f64;
    }
    cx /= n;
    cy /= n;

    let mut mean_dist = 0.0;
    for p in pts {
        let dx = p.x as f64 - cx;
        let dy = p.y as f64 - cy;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= n;

    let t = hartley_scale(cx, cy, mean_dist);

    let out = pts
        .iter()
        .map(|p| {
            let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
            Point2::new(v[0], v[1])
        })
        .collect();
    (out, t)
}

/// True if any 3 of the given points are (near-)collinear.
///
/// The triangle-area test is scaled by the span of the point set so the
/// tolerance behaves the same for 640x480 and 1920x1080 camera frames.
pub fn any_three_collinear(pts: &[Point2<f32>]) -> bool {
    let span = point_span(pts).max(1.0);
    let tol = 1e-3 * span * span;

    for i in 0..pts.len() {
        for j in (i + 1)..pts.len() {
            for k in (j + 1)..pts.len() {
                let ax = (pts[j].x - pts[i].x) as f64;
                let ay = (pts[j].y - pts[i].y) as f64;
                let bx = (pts[k].x - pts[i].x) as f64;
                let by = (pts[k].y - pts[i].y) as f64;
                let cross = (ax * by - ay * bx).abs();
                if cross < tol {
                    return true;
                }
            }
        }
    }
    false
}

fn point_span(pts: &[Point2<f32>]) -> f64 {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in pts {
        min_x = min_x.min(p.x as f64);
        min_y = min_y.min(p.y as f64);
        max_x = max_x.max(p.x as f64);
        max_y = max_y.max(p.y as f64);
    }
    (max_x - min_x).max(max_y - min_y)
}

/// Estimate H such that: screen ~ H * camera, by normalized DLT.
///
/// Accepts 4 or more correspondences; with 5 the system is over-determined
/// by one equation pair and the SVD solution is the least-squares fit.
pub fn fit_homography(
    camera: &[Point2<f32>],
    screen: &[Point2<f32>],
) -> Result<Homography, HomographyFitError> {
    if camera.len() != screen.len() {
        return Err(HomographyFitError::LengthMismatch {
            src: camera.len(),
            dst: screen.len(),
        });
    }
    if camera.len() < 4 {
        return Err(HomographyFitError::TooFewPoints(camera.len()));
    }
    if any_three_collinear(camera) {
        return Err(HomographyFitError::Collinear);
    }

    let (src, t_src) = normalize_points(camera);
    let (dst, t_dst) = normalize_points(screen);

    // Build A (2N x 9) for Ah = 0
    let n = camera.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for k in 0..n {
        let x = src[k].x;
        let y = src[k].y;
        let u = dst[k].x;
        let v = dst[k].y;

        // [ -x -y -1   0  0  0   u*x u*y u ]
        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        // [ 0  0  0  -x -y -1   v*x v*y v ]
        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    // h is the right singular vector with the smallest singular value
    let svd = a.svd(true, true);
    let vt = svd.v_t.ok_or(HomographyFitError::RankDeficient)?;
    let last = vt.nrows() - 1;
    let h = vt.row(last);

    let hn =
        Matrix3::<f64>::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

    // Denormalize: H = T_dst^{-1} * Hn * T_src, then fix scale so h33 = 1
    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or(HomographyFitError::RankDeficient)?;
    let h_den = t_dst_inv * hn * t_src;
    let s = h_den[(2, 2)];
    if s.abs() < 1e-12 {
        return Err(HomographyFitError::RankDeficient);
    }

    Ok(Homography::new(h_den / s))
}

/// Mean reprojection error of the correspondences through `h`, in screen
/// pixels. Points whose divide degenerates count as an infinite residual.
pub fn mean_reprojection_error(
    h: &Homography,
    camera: &[Point2<f32>],
    screen: &[Point2<f32>],
) -> f64 {
    if camera.is_empty() {
        return 0.0;
    }
    let mut sum = 0.0;
    for (c, s) in camera.iter().zip(screen.iter()) {
        match h.apply_checked(*c) {
            Some(mapped) => {
                let dx = (mapped.x - s.x) as f64;
                let dy = (mapped.y - s.y) as f64;
                sum += (dx * dx + dy * dy).sqrt();
            }
            None => return f64::INFINITY,
        }
    }
    sum / camera.len() as f64
}
