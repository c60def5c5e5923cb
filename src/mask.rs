use crate::error::OcCostError::{self, InvalidInput};
use nalgebra::Point3;

/*------------------------------------------------------------------------------
MaskRecord struct
------------------------------------------------------------------------------*/

/// Borrowed view of one occupancy mask over the scene's sample grid.
///
/// `conf` is `None` for ground-truth records.
#[derive(Debug, Clone, Copy)]
pub struct MaskRecord<'a> {
    pub mask: &'a [bool],
    pub label: usize,
    pub conf: Option<f64>,
}

impl<'a> MaskRecord<'a> {
    pub fn new(mask: &'a [bool], label: usize, conf: Option<f64>) -> Self {
        Self { mask, label, conf }
    }

    /// Number of occupied sample points.
    pub fn occupied(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }
}

/*------------------------------------------------------------------------------
GroundTruth struct
------------------------------------------------------------------------------*/

/// Ground-truth objects of one scene, sharing the canonical sample grid `xyz`.
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    pub masks: Vec<Vec<bool>>,
    pub labels: Vec<usize>,
    pub xyz: Vec<Point3<f64>>,
}

impl GroundTruth {
    pub fn new(
        masks: Vec<Vec<bool>>,
        labels: Vec<usize>,
        xyz: Vec<Point3<f64>>,
    ) -> Self {
        Self { masks, labels, xyz }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    #[inline(always)]
    pub fn num_points(&self) -> usize {
        self.xyz.len()
    }

    pub fn record(&self, j: usize) -> MaskRecord<'_> {
        MaskRecord::new(&self.masks[j], self.labels[j], None)
    }

    pub fn validate(&self) -> Result<(), OcCostError> {
        if self.masks.len() != self.labels.len() {
            return Err(InvalidInput(format!(
                "ground truth has {} masks but {} labels",
                self.masks.len(),
                self.labels.len()
            )));
        }
        for (j, mask) in self.masks.iter().enumerate() {
            if mask.len() != self.xyz.len() {
                return Err(InvalidInput(format!(
                    "ground-truth mask {} has {} points, grid has {}",
                    j,
                    mask.len(),
                    self.xyz.len()
                )));
            }
        }
        Ok(())
    }
}

/*------------------------------------------------------------------------------
Predictions struct
------------------------------------------------------------------------------*/

/// Predicted objects of one scene over the same sample grid as the ground truth.
#[derive(Debug, Clone, Default)]
pub struct Predictions {
    pub masks: Vec<Vec<bool>>,
    pub labels: Vec<usize>,
    pub conf: Vec<f64>,
}

impl Predictions {
    pub fn new(masks: Vec<Vec<bool>>, labels: Vec<usize>, conf: Vec<f64>) -> Self {
        Self {
            masks,
            labels,
            conf,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    pub fn record(&self, i: usize) -> MaskRecord<'_> {
        MaskRecord::new(&self.masks[i], self.labels[i], Some(self.conf[i]))
    }

    /// Checks lengths against each other and against a grid of `num_points`.
    pub fn validate(&self, num_points: usize) -> Result<(), OcCostError> {
        if self.masks.len() != self.labels.len()
            || self.masks.len() != self.conf.len()
        {
            return Err(InvalidInput(format!(
                "predictions have {} masks, {} labels and {} confidences",
                self.masks.len(),
                self.labels.len(),
                self.conf.len()
            )));
        }
        for (i, mask) in self.masks.iter().enumerate() {
            if mask.len() != num_points {
                return Err(InvalidInput(format!(
                    "predicted mask {} has {} points, grid has {}",
                    i,
                    mask.len(),
                    num_points
                )));
            }
        }
        if let Some((i, c)) = self
            .conf
            .iter()
            .enumerate()
            .find(|(_, c)| !(0.0..=1.0).contains(*c))
        {
            return Err(InvalidInput(format!(
                "confidence of prediction {} is {}, expected a value in [0, 1]",
                i, c
            )));
        }
        Ok(())
    }
}
