use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use nalgebra::Point3;
use oc_cost3d::{GroundTruth, LocalizationMode, OcCost3d, OcCostParams, Predictions};

const NX: usize = 24;
const NY: usize = 24;
const NZ: usize = 8;

/* ----------------------------------------------------------------------------
 * Synthetic scene
 * ---------------------------------------------------------------------------- */

fn grid() -> Vec<Point3<f64>> {
    let mut xyz = Vec::with_capacity(NX * NY * NZ);
    for z in 0..NZ {
        for y in 0..NY {
            for x in 0..NX {
                xyz.push(Point3::new(x as f64, y as f64, z as f64));
            }
        }
    }
    xyz
}

fn block(xyz: &[Point3<f64>], lo: [f64; 3], hi: [f64; 3]) -> Vec<bool> {
    xyz.iter()
        .map(|p| (0..3).all(|k| lo[k] <= p[k] && p[k] <= hi[k]))
        .collect()
}

/// Eight ground-truth boxes on a 4x2 layout and nine predictions: each box
/// shifted by one voxel plus one false positive.
fn scene() -> (GroundTruth, Predictions) {
    let xyz = grid();
    let mut gt_masks = Vec::new();
    let mut pred_masks = Vec::new();
    for bx in 0..4 {
        for by in 0..2 {
            let x0 = (bx * 6) as f64;
            let y0 = (by * 12) as f64;
            gt_masks.push(block(&xyz, [x0, y0, 0.0], [x0 + 3.0, y0 + 4.0, 3.0]));
            pred_masks.push(block(&xyz, [x0 + 1.0, y0, 0.0], [x0 + 4.0, y0 + 4.0, 4.0]));
        }
    }
    pred_masks.push(block(&xyz, [0.0, 6.0, 5.0], [2.0, 8.0, 7.0]));

    let gt_labels = (0..gt_masks.len()).map(|i| i % 3).collect();
    let pred_labels = (0..pred_masks.len()).map(|i| i % 3).collect();
    let conf = (0..pred_masks.len()).map(|i| 0.5 + 0.05 * i as f64).collect();
    (
        GroundTruth::new(gt_masks, gt_labels, xyz),
        Predictions::new(pred_masks, pred_labels, conf),
    )
}

fn bench_oc_cost(c: &mut Criterion) {
    let (gt, preds) = scene();

    for (name, mode) in [
        ("cost_matrix_iou", LocalizationMode::Iou),
        ("cost_matrix_giou_bb", LocalizationMode::GiouBb),
        ("cost_matrix_giou_ch", LocalizationMode::GiouCh),
    ] {
        let evaluator = OcCost3d::new(OcCostParams::new(mode, 0.5, 0.6)).unwrap();
        c.bench_function(name, |b| {
            b.iter(|| evaluator.build_cost_matrix(&gt, &preds).unwrap());
        });
    }

    let evaluator =
        OcCost3d::new(OcCostParams::new(LocalizationMode::Iou, 0.5, 0.6)).unwrap();
    let cost = evaluator.build_cost_matrix(&gt, &preds).unwrap();
    c.bench_function("partial_matching", |b| {
        b.iter(|| evaluator.optimize(&cost, 0.6).unwrap());
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(20)
        .measurement_time(Duration::from_secs(10))
        .warm_up_time(Duration::from_secs(3));
    targets = bench_oc_cost
}
criterion_main!(benches);
