use crate::error::OcCostError::{self, InvalidInput};
use crate::geometry::{giou_bbox, giou_convex_hull, iou};
use crate::mask::{GroundTruth, MaskRecord, Predictions};
use nalgebra::{DMatrix, Point3};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the localization term measures overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalizationMode {
    /// Plain IoU.
    #[default]
    Iou,
    /// GIoU enclosed by the ground truth's axis-aligned bounding box.
    GiouBb,
    /// GIoU enclosed by the convex hull of both masks.
    GiouCh,
}

impl LocalizationMode {
    /// Resolves legacy boolean switches. When several are set, `iou` wins over
    /// `giou_bb`, which wins over `giou_ch`.
    pub fn from_flags(
        iou: bool,
        giou_bb: bool,
        giou_ch: bool,
    ) -> Result<Self, OcCostError> {
        if iou {
            Ok(Self::Iou)
        } else if giou_bb {
            Ok(Self::GiouBb)
        } else if giou_ch {
            Ok(Self::GiouCh)
        } else {
            Err(InvalidInput("no localization mode selected".to_string()))
        }
    }
}

/*------------------------------------------------------------------------------
CostModel
------------------------------------------------------------------------------*/

/// Pairwise correction cost `lambda * Cloc + (1 - lambda) * Ccls`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    mode: LocalizationMode,
    lambda: f64,
}

impl CostModel {
    pub fn new(mode: LocalizationMode, lambda: f64) -> Result<Self, OcCostError> {
        if !(0.0..=1.0).contains(&lambda) {
            return Err(InvalidInput(format!(
                "lambda must be in [0, 1], got {}",
                lambda
            )));
        }
        Ok(Self { mode, lambda })
    }

    #[inline(always)]
    pub fn mode(&self) -> LocalizationMode {
        self.mode
    }

    #[inline(always)]
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// `(1 - IoU) / 2` or `(1 - GIoU) / 2`.
    ///
    /// In the GIoU modes the result is not confined to `[0, 1]`: a hollow
    /// enclosing region drives GIoU below zero and the cost above one half.
    /// It is returned unclamped.
    pub fn localization_cost(
        &self,
        gt: &MaskRecord<'_>,
        pred: &MaskRecord<'_>,
        xyz: &[Point3<f64>],
    ) -> Result<f64, OcCostError> {
        let overlap = match self.mode {
            LocalizationMode::Iou => iou(gt.mask, pred.mask)?,
            LocalizationMode::GiouBb => giou_bbox(gt.mask, pred.mask, xyz)?,
            LocalizationMode::GiouCh => {
                giou_convex_hull(gt.mask, pred.mask, xyz)?
            }
        };
        Ok((1.0 - overlap) / 2.0)
    }

    /// `(1 - conf) / 2` on a label match, `(1 + conf) / 2` otherwise.
    pub fn classification_cost(gt_label: usize, pred_label: usize, conf: f64) -> f64 {
        if gt_label == pred_label {
            (1.0 - conf) / 2.0
        } else {
            (1.0 + conf) / 2.0
        }
    }

    pub fn pair_cost(
        &self,
        gt: &MaskRecord<'_>,
        pred: &MaskRecord<'_>,
        xyz: &[Point3<f64>],
    ) -> Result<f64, OcCostError> {
        let conf = pred.conf.ok_or_else(|| {
            InvalidInput("prediction record carries no confidence".to_string())
        })?;
        let c_loc = self.localization_cost(gt, pred, xyz)?;
        let c_cls = Self::classification_cost(gt.label, pred.label, conf);
        Ok(self.lambda * c_loc + (1.0 - self.lambda) * c_cls)
    }

    /// Dense `(num_preds, num_gts)` cost matrix over the full cross product.
    pub fn build_cost_matrix(
        &self,
        gt: &GroundTruth,
        preds: &Predictions,
    ) -> Result<DMatrix<f64>, OcCostError> {
        gt.validate()?;
        preds.validate(gt.num_points())?;

        let num_preds = preds.len();
        let num_gts = gt.len();
        let mut cost = DMatrix::zeros(num_preds, num_gts);
        for i in 0..num_preds {
            let pred = preds.record(i);
            for j in 0..num_gts {
                cost[(i, j)] = self.pair_cost(&gt.record(j), &pred, &gt.xyz)?;
            }
        }

        debug!(
            num_preds,
            num_gts,
            num_points = gt.num_points(),
            mode = ?self.mode,
            "built cost matrix"
        );
        Ok(cost)
    }
}
