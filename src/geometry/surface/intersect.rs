use crate::math::{Point3, Vector3, TOLERANCE};

use super::SurfaceHit;

/// Solves `a*t^2 + b*t + c = 0` for a ray and returns the hits inside
/// `[t_min, t_max]`, sorted by `t`, with tangent duplicates removed.
pub(super) fn quadratic_hits(
    origin: &Point3,
    dir: &Vector3,
    t_min: f64,
    t_max: f64,
    (a, b, c): (f64, f64, f64),
    inverse: impl Fn(&Point3) -> (f64, f64),
) -> Vec<SurfaceHit> {
    let candidates = quadratic_roots(a, b, c);
    let mut hits: Vec<SurfaceHit> = candidates
        .into_iter()
        .filter(|t| *t >= t_min - TOLERANCE && *t <= t_max + TOLERANCE)
        .map(|t| {
            let point = origin + dir * t;
            let (u, v) = inverse(&point);
            SurfaceHit { t, u, v, point }
        })
        .collect();

    sort_and_dedup(&mut hits);
    hits
}

/// Real roots of `a*t^2 + b*t + c = 0` (linear fallback when `a` vanishes).
pub(super) fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a.abs() < TOLERANCE {
        if b.abs() < TOLERANCE {
            return Vec::new();
        }
        return vec![-c / b];
    }
    let disc = b * b - 4.0 * a * c;
    if disc < -TOLERANCE {
        return Vec::new();
    }
    let disc = disc.max(0.0).sqrt();
    vec![(-b - disc) / (2.0 * a), (-b + disc) / (2.0 * a)]
}

/// Sorts hits by `t` and drops near-duplicates (tangent case).
pub(super) fn sort_and_dedup(hits: &mut Vec<SurfaceHit>) {
    hits.sort_by(|a, b| a.t.total_cmp(&b.t));
    hits.dedup_by(|a, b| (a.t - b.t).abs() < TOLERANCE);
}
