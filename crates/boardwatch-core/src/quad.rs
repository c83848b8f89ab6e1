//! Board boundary quads: canonical corner ordering and the geometric sanity check.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Four board corners in image space, ordered TL, TR, BR, BL.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub corners: [Point2<f32>; 4],
}

impl Quad {
    /// Wrap corners that are already in TL, TR, BR, BL order.
    pub fn new(corners: [Point2<f32>; 4]) -> Self {
        Self { corners }
    }

    /// Order an arbitrary set of 4 points.
    ///
    /// min(x+y) -> TL, max(x+y) -> BR, min(y-x) -> TR, max(y-x) -> BL.
    /// Ties keep the first point in input order. A badly skewed set can
    /// assign one point to two slots; [`validate_quad`] rejects the result.
    pub fn from_unordered(pts: [Point2<f32>; 4]) -> Self {
        let sum = |p: &Point2<f32>| p.x + p.y;
        let diff = |p: &Point2<f32>| p.y - p.x;

        let tl = pick(&pts, sum, |a, b| a < b);
        let br = pick(&pts, sum, |a, b| a > b);
        let tr = pick(&pts, diff, |a, b| a < b);
        let bl = pick(&pts, diff, |a, b| a > b);

        Self::new([tl, tr, br, bl])
    }

    /// Order a point slice; `None` unless it holds exactly 4 points.
    pub fn from_points(pts: &[Point2<f32>]) -> Option<Self> {
        let arr: [Point2<f32>; 4] = pts.try_into().ok()?;
        Some(Self::from_unordered(arr))
    }

    /// Shoelace area in px².
    pub fn area(&self) -> f32 {
        polygon_area(&self.corners)
    }

    /// Average opposite side lengths `(w, h)`.
    pub fn side_lengths(&self) -> (f32, f32) {
        let [p0, p1, p2, p3] = self.corners;
        let w = 0.5 * ((p1 - p0).norm() + (p2 - p3).norm());
        let h = 0.5 * ((p3 - p0).norm() + (p2 - p1).norm());
        (w, h)
    }

    /// Mean per-corner Euclidean distance to `other`.
    pub fn mean_distance(&self, other: &Quad) -> f32 {
        self.corners
            .iter()
            .zip(other.corners.iter())
            .map(|(a, b)| (a - b).norm())
            .sum::<f32>()
            / 4.0
    }

    pub fn to_array(&self) -> [[f32; 2]; 4] {
        self.corners.map(|p| [p.x, p.y])
    }
}

fn pick(
    pts: &[Point2<f32>; 4],
    key: impl Fn(&Point2<f32>) -> f32,
    better: impl Fn(f32, f32) -> bool,
) -> Point2<f32> {
    let mut best = pts[0];
    let mut best_k = key(&pts[0]);
    for p in &pts[1..] {
        let k = key(p);
        if better(k, best_k) {
            best = *p;
            best_k = k;
        }
    }
    best
}

/// Shoelace polygon area (absolute value).
pub fn polygon_area(pts: &[Point2<f32>]) -> f32 {
    if pts.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0_f64;
    for (i, p) in pts.iter().enumerate() {
        let q = pts[(i + 1) % pts.len()];
        acc += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
    }
    (0.5 * acc.abs()) as f32
}

/// Thresholds for [`validate_points`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadValidationParams {
    /// Minimal shoelace area in px².
    pub min_area: f32,
    /// Accepted `w / h` band, inclusive.
    pub aspect_min: f32,
    pub aspect_max: f32,
}

impl Default for QuadValidationParams {
    fn default() -> Self {
        Self {
            min_area: 5000.0,
            aspect_min: 0.6,
            aspect_max: 2.0,
        }
    }
}

/// Why a candidate boundary was rejected. Diagnostics only.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum QuadRejection {
    #[error("expected 4 points, got {got}")]
    WrongPointCount { got: usize },
    #[error("area {area:.1} below minimum {min_area:.1}")]
    AreaTooSmall { area: f32, min_area: f32 },
    #[error("zero width or height")]
    Degenerate,
    #[error("corners {first} and {second} coincide")]
    RepeatedCorner { first: usize, second: usize },
    #[error("corners do not form a convex quadrilateral")]
    NotConvex,
    #[error("aspect ratio {aspect:.2} outside [{min:.2}, {max:.2}]")]
    AspectOutOfRange { aspect: f32, min: f32, max: f32 },
}

/// Summary of an accepted quad.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadCheck {
    pub area: f32,
    pub aspect: f32,
}

/// Validate a candidate boundary given as raw points (already in TL, TR, BR, BL order).
pub fn validate_points(
    pts: &[Point2<f32>],
    params: &QuadValidationParams,
) -> Result<QuadCheck, QuadRejection> {
    let corners: [Point2<f32>; 4] = pts
        .try_into()
        .map_err(|_| QuadRejection::WrongPointCount { got: pts.len() })?;
    validate_quad(&Quad::new(corners), params)
}

/// Distance below which two corners count as the same point, in px.
const CORNER_EPS: f32 = 1e-3;

/// Consecutive edge cross products; all share one sign iff the quad is
/// convex and not self-intersecting.
fn turn_signs(c: &[Point2<f32>; 4]) -> [f32; 4] {
    std::array::from_fn(|i| {
        let a = c[(i + 1) % 4] - c[i];
        let b = c[(i + 2) % 4] - c[(i + 1) % 4];
        a.x * b.y - a.y * b.x
    })
}

/// Validate an ordered quad: distinct corners, convexity, area, then side
/// lengths and aspect ratio.
pub fn validate_quad(
    quad: &Quad,
    params: &QuadValidationParams,
) -> Result<QuadCheck, QuadRejection> {
    let c = &quad.corners;
    for first in 0..4 {
        for second in first + 1..4 {
            if (c[first] - c[second]).norm() < CORNER_EPS {
                return Err(QuadRejection::RepeatedCorner { first, second });
            }
        }
    }

    let turns = turn_signs(c);
    if !(turns.iter().all(|&t| t > 0.0) || turns.iter().all(|&t| t < 0.0)) {
        return Err(QuadRejection::NotConvex);
    }

    let area = quad.area();
    if !(area >= params.min_area) {
        return Err(QuadRejection::AreaTooSmall {
            area,
            min_area: params.min_area,
        });
    }

    let (w, h) = quad.side_lengths();
    if !(w > 0.0 && h > 0.0) {
        return Err(QuadRejection::Degenerate);
    }

    let aspect = w / h;
    if !(params.aspect_min..=params.aspect_max).contains(&aspect) {
        return Err(QuadRejection::AspectOutOfRange {
            aspect,
            min: params.aspect_min,
            max: params.aspect_max,
        });
    }

    Ok(QuadCheck { area, aspect })
}
