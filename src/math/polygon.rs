use super::{Point2, TOLERANCE};

/// Containment of a 2D point with respect to a closed loop or a set of loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// Strictly inside.
    Inside,
    /// Within the boundary tolerance of an edge of the loop.
    Boundary,
    /// Strictly outside.
    Outside,
}

/// Winding number of `point` with respect to the closed polygon `verts`.
///
/// Non-zero => inside, zero => outside.
#[must_use]
pub fn winding_number(point: &Point2, verts: &[Point2]) -> i32 {
    let n = verts.len();
    let mut winding = 0i32;
    for i in 0..n {
        let a = verts[i];
        let b = verts[(i + 1) % n];

        if a.y <= point.y {
            if b.y > point.y && cross_2d(&a, &b, point) > 0.0 {
                winding += 1;
            }
        } else if b.y <= point.y && cross_2d(&a, &b, point) < 0.0 {
            winding -= 1;
        }
    }
    winding
}

/// Minimum distance from `point` to the edges of the closed polygon `verts`.
#[must_use]
pub fn distance_to_loop(point: &Point2, verts: &[Point2]) -> f64 {
    let n = verts.len();
    let mut best = f64::INFINITY;
    for i in 0..n {
        let d = point_to_segment_dist(point, &verts[i], &verts[(i + 1) % n]);
        best = best.min(d);
    }
    best
}

/// Signed area of a closed polygon (positive for counter-clockwise).
#[must_use]
pub fn signed_area(verts: &[Point2]) -> f64 {
    let n = verts.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = verts[i];
        let b = verts[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

/// A closed trim loop in a plane's 2D frame.
#[derive(Debug, Clone, PartialEq)]
pub enum TrimLoop {
    /// Straight-sided (or discretized) loop.
    Polygon(Vec<Point2>),
    /// Exact circle, kept analytic so rays near the rim see no chord sag.
    Circle { center: Point2, radius: f64 },
}

impl TrimLoop {
    /// Distance from `point` to the loop curve.
    #[must_use]
    pub fn distance(&self, point: &Point2) -> f64 {
        match self {
            Self::Polygon(verts) => distance_to_loop(point, verts),
            Self::Circle { center, radius } => ((point - center).norm() - radius).abs(),
        }
    }

    /// Returns `true` if `point` lies within the loop.
    #[must_use]
    pub fn encloses(&self, point: &Point2) -> bool {
        match self {
            Self::Polygon(verts) => verts.len() >= 3 && winding_number(point, verts) != 0,
            Self::Circle { center, radius } => (point - center).norm() < *radius,
        }
    }

    /// Axis-aligned bounds as `(min, max)` corners.
    #[must_use]
    pub fn bounds(&self) -> (Point2, Point2) {
        match self {
            Self::Polygon(verts) => verts.iter().fold(
                (
                    Point2::new(f64::INFINITY, f64::INFINITY),
                    Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
                ),
                |(lo, hi), p| {
                    (
                        Point2::new(lo.x.min(p.x), lo.y.min(p.y)),
                        Point2::new(hi.x.max(p.x), hi.y.max(p.y)),
                    )
                },
            ),
            Self::Circle { center, radius } => (
                Point2::new(center.x - radius, center.y - radius),
                Point2::new(center.x + radius, center.y + radius),
            ),
        }
    }

    fn is_degenerate(&self) -> bool {
        match self {
            Self::Polygon(verts) => verts.len() < 3,
            Self::Circle { radius, .. } => *radius <= TOLERANCE,
        }
    }
}

/// Classifies `point` against an outer loop with holes.
///
/// Points within `boundary_tol` of any loop are reported as
/// [`Containment::Boundary`].
#[must_use]
pub fn classify_in_loops(
    point: &Point2,
    outer: &TrimLoop,
    holes: &[TrimLoop],
    boundary_tol: f64,
) -> Containment {
    if outer.is_degenerate() {
        return Containment::Outside;
    }
    let near_edge = std::iter::once(outer)
        .chain(holes)
        .any(|l| l.distance(point) <= boundary_tol);
    if near_edge {
        return Containment::Boundary;
    }
    if !outer.encloses(point) || holes.iter().any(|h| h.encloses(point)) {
        return Containment::Outside;
    }
    Containment::Inside
}

fn point_to_segment_dist(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < TOLERANCE * TOLERANCE {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// 2D cross product of `(b - a)` and `(p - a)`.
#[inline]
fn cross_2d(a: &Point2, b: &Point2, p: &Point2) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}
