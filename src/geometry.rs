//! Overlap measures between occupancy masks on a shared sample grid.
//!
//! All functions take the ground-truth mask first. Masks are boolean slices
//! indexed like the grid `xyz`.

use crate::error::OcCostError::{self, DegenerateGeometry, InvalidInput};
use crate::hull::ConvexHull;
use nalgebra::Point3;

fn check_lengths(gt: &[bool], pred: &[bool]) -> Result<(), OcCostError> {
    if gt.len() != pred.len() {
        return Err(InvalidInput(format!(
            "mask lengths differ: ground truth {}, prediction {}",
            gt.len(),
            pred.len()
        )));
    }
    Ok(())
}

/// Returns `(intersection, union)` occupied-point counts.
///
/// The union may be zero; callers dividing by it must check.
pub fn intersect_union(
    gt: &[bool],
    pred: &[bool],
) -> Result<(usize, usize), OcCostError> {
    check_lengths(gt, pred)?;
    let mut gt_count = 0;
    let mut pred_count = 0;
    let mut intersection = 0;
    for (&g, &p) in gt.iter().zip(pred) {
        gt_count += g as usize;
        pred_count += p as usize;
        intersection += (g && p) as usize;
    }
    Ok((intersection, gt_count + pred_count - intersection))
}

/// Intersection over union. Fails with `DegenerateGeometry` when both masks
/// are empty.
pub fn iou(gt: &[bool], pred: &[bool]) -> Result<f64, OcCostError> {
    let (intersection, union) = intersect_union(gt, pred)?;
    if union == 0 {
        return Err(DegenerateGeometry(
            "IoU of two empty masks is undefined".to_string(),
        ));
    }
    Ok(intersection as f64 / union as f64)
}

/// GIoU with the enclosing region taken as the axis-aligned bounding box of
/// the ground truth's occupied points.
pub fn giou_bbox(
    gt: &[bool],
    pred: &[bool],
    xyz: &[Point3<f64>],
) -> Result<f64, OcCostError> {
    check_grid(gt, xyz)?;
    let iou = iou(gt, pred)?;

    let mut occupied = gt.iter().zip(xyz).filter(|(g, _)| **g).map(|(_, p)| p);
    let first = occupied.next().ok_or_else(|| {
        DegenerateGeometry(
            "bounding-box GIoU needs a non-empty ground-truth mask".to_string(),
        )
    })?;
    let (lo, hi) = occupied.fold((first.coords, first.coords), |(lo, hi), p| {
        (lo.inf(&p.coords), hi.sup(&p.coords))
    });

    let covered = xyz.iter().map(|p| {
        p.coords
            .iter()
            .zip(lo.iter().zip(hi.iter()))
            .all(|(c, (l, h))| l <= c && c <= h)
    });
    Ok(iou - enclosure_penalty(gt, pred, covered)?)
}

/// GIoU with the enclosing region taken as the convex hull of the union of
/// both masks' occupied points.
pub fn giou_convex_hull(
    gt: &[bool],
    pred: &[bool],
    xyz: &[Point3<f64>],
) -> Result<f64, OcCostError> {
    check_grid(gt, xyz)?;
    let iou = iou(gt, pred)?;

    let union_points: Vec<Point3<f64>> = gt
        .iter()
        .zip(pred)
        .zip(xyz)
        .filter(|((g, p), _)| **g || **p)
        .map(|(_, pt)| *pt)
        .collect();
    let hull = ConvexHull::new(&union_points)?;

    let covered = xyz.iter().map(|p| hull.contains(p));
    Ok(iou - enclosure_penalty(gt, pred, covered)?)
}

/// Fraction of the enclosing region not occupied by either mask.
fn enclosure_penalty(
    gt: &[bool],
    pred: &[bool],
    covered: impl Iterator<Item = bool>,
) -> Result<f64, OcCostError> {
    let mut enclosed = 0usize;
    let mut empty = 0usize;
    for ((&g, &p), c) in gt.iter().zip(pred).zip(covered) {
        if c {
            enclosed += 1;
            empty += !(g || p) as usize;
        }
    }
    if enclosed == 0 {
        return Err(DegenerateGeometry(
            "enclosing region covers no sample points".to_string(),
        ));
    }
    Ok(empty as f64 / enclosed as f64)
}

fn check_grid(gt: &[bool], xyz: &[Point3<f64>]) -> Result<(), OcCostError> {
    if gt.len() != xyz.len() {
        return Err(InvalidInput(format!(
            "mask has {} points, grid has {}",
            gt.len(),
            xyz.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearly_eq::assert_nearly_eq;
    use quickcheck::{Arbitrary, Gen, TestResult};

    /// 4x4x4 voxel grid, x fastest.
    fn grid() -> Vec<Point3<f64>> {
        let mut xyz = Vec::new();
        for z in 0..4 {
            for y in 0..4 {
                for x in 0..4 {
                    xyz.push(Point3::new(x as f64, y as f64, z as f64));
                }
            }
        }
        xyz
    }

    /// Occupancy of the axis-aligned block `[lo, hi]` (inclusive) on `xyz`.
    fn block(xyz: &[Point3<f64>], lo: [f64; 3], hi: [f64; 3]) -> Vec<bool> {
        xyz.iter()
            .map(|p| (0..3).all(|k| lo[k] <= p[k] && p[k] <= hi[k]))
            .collect()
    }

    #[test]
    fn test_intersect_union() {
        let gt = [true, true, false, false];
        let pred = [false, true, true, false];
        assert_eq!(intersect_union(&gt, &pred).unwrap(), (1, 3));
    }

    #[test]
    fn test_intersect_union_length_mismatch() {
        assert!(matches!(
            intersect_union(&[true], &[true, false]),
            Err(InvalidInput(_))
        ));
    }

    #[test]
    fn test_iou() {
        let gt = [true, true, false, false];
        let pred = [false, true, true, false];
        assert_nearly_eq!(iou(&gt, &pred).unwrap(), 1.0 / 3.0, 1e-12);
        assert_nearly_eq!(iou(&gt, &gt).unwrap(), 1.0, 1e-12);
        assert_nearly_eq!(iou(&gt, &[false, false, true, true]).unwrap(), 0.0, 1e-12);
    }

    #[test]
    fn test_iou_empty_masks() {
        assert!(matches!(
            iou(&[false, false], &[false, false]),
            Err(DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_giou_bbox_identical() {
        let xyz = grid();
        let gt = block(&xyz, [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        assert_nearly_eq!(giou_bbox(&gt, &gt, &xyz).unwrap(), 1.0, 1e-12);
    }

    #[test]
    fn test_giou_bbox_hollow_ground_truth() {
        let xyz = grid();
        // two opposite corners of a 2x2x2 block: box covers 8 points, 2 occupied
        let gt: Vec<bool> = xyz
            .iter()
            .map(|p| *p == Point3::new(0.0, 0.0, 0.0) || *p == Point3::new(1.0, 1.0, 1.0))
            .collect();
        let giou = giou_bbox(&gt, &gt, &xyz).unwrap();
        assert_nearly_eq!(giou, 1.0 - 6.0 / 8.0, 1e-12);
    }

    #[test]
    fn test_giou_bbox_disjoint_is_negative() {
        let xyz = grid();
        let gt: Vec<bool> = xyz
            .iter()
            .map(|p| *p == Point3::new(0.0, 0.0, 0.0) || *p == Point3::new(3.0, 0.0, 0.0))
            .collect();
        let pred = block(&xyz, [1.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        // box covers the x-row y=z=0: 4 points, union occupies 3
        let giou = giou_bbox(&gt, &pred, &xyz).unwrap();
        assert_nearly_eq!(giou, 0.0 - 1.0 / 4.0, 1e-12);
        assert!(giou < 0.0);
    }

    #[test]
    fn test_giou_bbox_empty_ground_truth() {
        let xyz = grid();
        let gt = vec![false; xyz.len()];
        let pred = block(&xyz, [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        assert!(matches!(
            giou_bbox(&gt, &pred, &xyz),
            Err(DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_giou_convex_hull_identical_block() {
        let xyz = grid();
        let gt = block(&xyz, [0.0, 0.0, 0.0], [2.0, 2.0, 2.0]);
        assert_nearly_eq!(giou_convex_hull(&gt, &gt, &xyz).unwrap(), 1.0, 1e-12);
    }

    #[test]
    fn test_giou_convex_hull_separated_blocks() {
        let xyz = grid();
        let gt = block(&xyz, [0.0, 0.0, 0.0], [0.0, 3.0, 3.0]);
        let pred = block(&xyz, [3.0, 0.0, 0.0], [3.0, 3.0, 3.0]);
        // the hull spans the whole grid; the two middle slabs are empty
        let giou = giou_convex_hull(&gt, &pred, &xyz).unwrap();
        assert_nearly_eq!(giou, -0.5, 1e-12);
    }

    #[test]
    fn test_giou_convex_hull_planar_union() {
        let xyz = grid();
        let gt = block(&xyz, [0.0, 0.0, 0.0], [3.0, 3.0, 0.0]);
        assert!(matches!(
            giou_convex_hull(&gt, &gt, &xyz),
            Err(DegenerateGeometry(_))
        ));
    }

    fn random_mask(g: &mut Gen, n: usize) -> Vec<bool> {
        (0..n).map(|_| bool::arbitrary(g)).collect()
    }

    #[test]
    fn test_quickcheck_iou_bounds_and_symmetry() {
        fn prop(seed: u64) -> TestResult {
            let mut g = Gen::new((seed % 64) as usize + 2);
            let a = random_mask(&mut g, 64);
            let b = random_mask(&mut g, 64);
            match (iou(&a, &b), iou(&b, &a)) {
                (Ok(ab), Ok(ba)) => {
                    TestResult::from_bool((0.0..=1.0).contains(&ab) && ab == ba)
                }
                (Err(_), Err(_)) => TestResult::discard(),
                _ => TestResult::failed(),
            }
        }
        quickcheck::quickcheck(prop as fn(u64) -> TestResult);
    }

    #[test]
    fn test_quickcheck_giou_below_iou() {
        fn prop(seed: u64) -> TestResult {
            let xyz = grid();
            let mut g = Gen::new((seed % 64) as usize + 2);
            let a = random_mask(&mut g, xyz.len());
            let b = random_mask(&mut g, xyz.len());
            let Ok(plain) = iou(&a, &b) else {
                return TestResult::discard();
            };
            let bb = match giou_bbox(&a, &b, &xyz) {
                Ok(v) => v,
                Err(_) => return TestResult::discard(),
            };
            let ch = match giou_convex_hull(&a, &b, &xyz) {
                Ok(v) => v,
                Err(_) => return TestResult::discard(),
            };
            TestResult::from_bool(bb <= plain + 1e-12 && ch <= plain + 1e-12)
        }
        quickcheck::QuickCheck::new()
            .tests(30)
            .quickcheck(prop as fn(u64) -> TestResult);
    }
}
