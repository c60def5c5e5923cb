//! Incremental 3D convex hull.
//!
//! The hull is stored as outward-oriented triangular facets. A query point
//! is covered when it lies on the inner side of (or on) every facet plane,
//! which is the same region a Delaunay triangulation of the input points
//! would cover.

use std::collections::HashSet;

use crate::error::OcCostError::{self, DegenerateGeometry};
use nalgebra::{Point3, Vector3};

const RELATIVE_EPS: f64 = 1e-9;

#[derive(Debug, Clone)]
struct Facet {
    vertices: [usize; 3],
    normal: Vector3<f64>,
    offset: f64,
}

impl Facet {
    #[inline(always)]
    fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&p.coords) - self.offset
    }
}

#[derive(Debug, Clone)]
pub struct ConvexHull {
    facets: Vec<Facet>,
    eps: f64,
}

impl ConvexHull {
    /// Builds the hull of `points`.
    ///
    /// Fails with `DegenerateGeometry` when fewer than four points are given
    /// or when all points are coincident, collinear or coplanar.
    pub fn new(points: &[Point3<f64>]) -> Result<Self, OcCostError> {
        if points.len() < 4 {
            return Err(DegenerateGeometry(format!(
                "convex hull needs at least 4 points, got {}",
                points.len()
            )));
        }

        let mut lo = points[0].coords;
        let mut hi = points[0].coords;
        for p in points.iter() {
            lo = lo.inf(&p.coords);
            hi = hi.sup(&p.coords);
        }
        let scale = (hi - lo).max();
        if !(scale > 0.0) || !scale.is_finite() {
            return Err(DegenerateGeometry(
                "convex hull points are coincident or not finite".to_string(),
            ));
        }
        let eps = RELATIVE_EPS * scale;

        let [i0, i1, i2, i3] = initial_simplex(points, eps)?;
        let interior = Point3::from(
            (points[i0].coords
                + points[i1].coords
                + points[i2].coords
                + points[i3].coords)
                / 4.0,
        );

        let make_facet = |a: usize, b: usize, c: usize| -> Facet {
            let (pa, pb, pc) = (&points[a], &points[b], &points[c]);
            let mut normal = (pb - pa).cross(&(pc - pa));
            let norm = normal.norm();
            if norm > 0.0 {
                normal /= norm;
            }
            let mut vertices = [a, b, c];
            if normal.dot(&(interior - pa)) > 0.0 {
                normal = -normal;
                vertices = [a, c, b];
            }
            Facet {
                vertices,
                offset: normal.dot(&pa.coords),
                normal,
            }
        };

        let mut facets = vec![
            make_facet(i0, i1, i2),
            make_facet(i0, i1, i3),
            make_facet(i0, i2, i3),
            make_facet(i1, i2, i3),
        ];

        for (idx, p) in points.iter().enumerate() {
            if idx == i0 || idx == i1 || idx == i2 || idx == i3 {
                continue;
            }

            let visible: Vec<bool> = facets
                .iter()
                .map(|f| f.signed_distance(p) > eps)
                .collect();
            if !visible.iter().any(|&v| v) {
                continue;
            }

            // directed edges of the visible region; an edge whose reverse is
            // missing borders a facet that stays, i.e. lies on the horizon
            let mut edges = HashSet::new();
            for (f, _) in facets.iter().zip(&visible).filter(|(_, v)| **v) {
                let [a, b, c] = f.vertices;
                edges.insert((a, b));
                edges.insert((b, c));
                edges.insert((c, a));
            }
            let horizon: Vec<(usize, usize)> = edges
                .iter()
                .filter(|(a, b)| !edges.contains(&(*b, *a)))
                .copied()
                .collect();

            let mut kept: Vec<Facet> = facets
                .into_iter()
                .zip(visible)
                .filter(|(_, v)| !v)
                .map(|(f, _)| f)
                .collect();
            kept.extend(horizon.into_iter().map(|(a, b)| make_facet(a, b, idx)));
            facets = kept;
        }

        Ok(Self { facets, eps })
    }

    /// True if `p` lies inside the hull or on its boundary.
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        self.facets.iter().all(|f| f.signed_distance(p) <= self.eps)
    }

    pub fn num_facets(&self) -> usize {
        self.facets.len()
    }
}

/// Picks four affinely independent points: an extreme pair, the point
/// farthest from their line and the point farthest from their plane.
fn initial_simplex(
    points: &[Point3<f64>],
    eps: f64,
) -> Result<[usize; 4], OcCostError> {
    let i0 = 0;
    let p0 = points[i0];
    let (i1, d1) = farthest(points, |p| (p - p0).norm());
    if d1 <= eps {
        return Err(DegenerateGeometry(
            "convex hull points are coincident".to_string(),
        ));
    }

    let dir = (points[i1] - p0) / d1;
    let (i2, d2) = farthest(points, |p| (p - p0).cross(&dir).norm());
    if d2 <= eps {
        return Err(DegenerateGeometry(
            "convex hull points are collinear".to_string(),
        ));
    }

    let normal = (points[i1] - p0).cross(&(points[i2] - p0)).normalize();
    let (i3, d3) = farthest(points, |p| normal.dot(&(p - p0)).abs());
    if d3 <= eps {
        return Err(DegenerateGeometry(
            "convex hull points are coplanar".to_string(),
        ));
    }

    Ok([i0, i1, i2, i3])
}

fn farthest(
    points: &[Point3<f64>],
    score: impl Fn(&Point3<f64>) -> f64,
) -> (usize, f64) {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| (i, score(p)))
        .fold((0, f64::NEG_INFINITY), |best, cur| {
            if cur.1 > best.1 { cur } else { best }
        })
}
