use crate::cost::CostModel;
use crate::error::OcCostError;
use crate::lp::{LpSolver, SimplexSolver};
use crate::mask::{GroundTruth, Predictions};
use crate::matching::{PartialMatcher, TransportPlan, augment_cost_matrix};
use crate::params::OcCostParams;
use nalgebra::DMatrix;
use tracing::debug;

/// Everything computed for one scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneEvaluation {
    /// `(num_preds, num_gts)` pairwise costs.
    pub cost_matrix: DMatrix<f64>,
    pub plan: TransportPlan,
    /// OC-cost: the plan-weighted sum of the augmented cost matrix.
    pub score: f64,
}

/*-----------------------------------------------------------------------------
OcCost3d
-----------------------------------------------------------------------------*/

/// Scene-level OC-cost evaluator. Holds only configuration; every call
/// recomputes from its inputs, so one evaluator can be shared across threads
/// when the solver is `Sync`.
#[derive(Debug, Clone)]
pub struct OcCost3d<S: LpSolver = SimplexSolver> {
    params: OcCostParams,
    cost_model: CostModel,
    matcher: PartialMatcher<S>,
}

impl OcCost3d<SimplexSolver> {
    pub fn new(params: OcCostParams) -> Result<Self, OcCostError> {
        Self::with_solver(params, SimplexSolver::default())
    }
}

impl<S: LpSolver> OcCost3d<S> {
    pub fn with_solver(params: OcCostParams, solver: S) -> Result<Self, OcCostError> {
        params.validate()?;
        let cost_model = CostModel::new(params.mode, params.lambda)?;
        let matcher = PartialMatcher::new(solver, params.time_limit());
        Ok(Self {
            params,
            cost_model,
            matcher,
        })
    }

    #[inline(always)]
    pub fn params(&self) -> &OcCostParams {
        &self.params
    }

    #[inline(always)]
    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    pub fn build_cost_matrix(
        &self,
        gt: &GroundTruth,
        preds: &Predictions,
    ) -> Result<DMatrix<f64>, OcCostError> {
        self.cost_model.build_cost_matrix(gt, preds)
    }

    /// Transport plan of `cost` with `beta` as the unmatched price. `beta`
    /// is taken per call so one cost matrix can be re-solved at several
    /// slack levels.
    pub fn optimize(
        &self,
        cost: &DMatrix<f64>,
        beta: f64,
    ) -> Result<TransportPlan, OcCostError> {
        self.matcher.solve(cost, beta)
    }

    /// Cost matrix, transport plan and OC-cost of one scene using the
    /// configured `beta`.
    pub fn evaluate(
        &self,
        gt: &GroundTruth,
        preds: &Predictions,
    ) -> Result<SceneEvaluation, OcCostError> {
        let cost_matrix = self.build_cost_matrix(gt, preds)?;
        let plan = self.optimize(&cost_matrix, self.params.beta)?;
        let score =
            plan.weighted_cost(&augment_cost_matrix(&cost_matrix, self.params.beta))?;

        debug!(
            num_preds = preds.len(),
            num_gts = gt.len(),
            score,
            "scene evaluated"
        );
        Ok(SceneEvaluation {
            cost_matrix,
            plan,
            score,
        })
    }
}
