//! Partial matching between predictions and ground truths.
//!
//! The `(m, n)` cost matrix is augmented with a dummy row and a dummy column
//! standing for "unmatched". Real predictions supply one unit of mass each
//! and the dummy row supplies `n`; real ground truths demand one unit each
//! and the dummy column demands `m`. Any flow through a dummy cell costs
//! `beta`, the dummy-dummy cell is free. The optimal flows, with the
//! dummy-dummy cell zeroed and normalized to sum to one, form the
//! transport plan.

use std::time::Duration;

use crate::error::OcCostError::{self, InvalidInput, SolverFailure};
use crate::lp::{EqualityConstraint, LinearProgram, LpSolver, LpStatus, SimplexSolver};
use nalgebra::DMatrix;
use tracing::{debug, warn};

/// Default wall-clock budget of one solve.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(100);

/// `(m + 1, n + 1)` matrix with `beta` in the dummy row and column and zero
/// in the dummy-dummy cell.
pub fn augment_cost_matrix(cost: &DMatrix<f64>, beta: f64) -> DMatrix<f64> {
    let (m, n) = cost.shape();
    DMatrix::from_fn(m + 1, n + 1, |i, j| match (i < m, j < n) {
        (true, true) => cost[(i, j)],
        (false, false) => 0.0,
        _ => beta,
    })
}

/// Builds the linear program for `cost` of shape `(m, n)`. Variable
/// `i * (n + 1) + j` is the flow from row `i` to column `j` of the
/// augmented matrix.
pub fn build_matching_program(cost: &DMatrix<f64>, beta: f64) -> LinearProgram {
    let (m, n) = cost.shape();
    let width = n + 1;
    let var = |i: usize, j: usize| i * width + j;

    let mut lp = LinearProgram::new((m + 1) * width);
    let augmented = augment_cost_matrix(cost, beta);
    for i in 0..=m {
        for j in 0..=n {
            lp.set_cost(var(i, j), augmented[(i, j)]);
        }
    }

    for i in 0..=m {
        let supply = if i < m { 1.0 } else { n as f64 };
        let terms = (0..=n).map(|j| (var(i, j), 1.0)).collect();
        lp.add_constraint(EqualityConstraint::new(terms, supply));
    }
    for j in 0..=n {
        let demand = if j < n { 1.0 } else { m as f64 };
        let terms = (0..=m).map(|i| (var(i, j), 1.0)).collect();
        lp.add_constraint(EqualityConstraint::new(terms, demand));
    }
    lp
}

/*------------------------------------------------------------------------------
TransportPlan
------------------------------------------------------------------------------*/

/// Normalized flows of shape `(m + 1, n + 1)`; rows are predictions,
/// columns ground truths, the last row and column the unmatched bins.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportPlan {
    matrix: DMatrix<f64>,
}

impl TransportPlan {
    #[inline(always)]
    pub fn num_predictions(&self) -> usize {
        self.matrix.nrows() - 1
    }

    #[inline(always)]
    pub fn num_ground_truths(&self) -> usize {
        self.matrix.ncols() - 1
    }

    #[inline(always)]
    pub fn get(&self, pred: usize, gt: usize) -> f64 {
        self.matrix[(pred, gt)]
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn into_matrix(self) -> DMatrix<f64> {
        self.matrix
    }

    pub fn total(&self) -> f64 {
        self.matrix.sum()
    }

    pub fn row_sums(&self) -> Vec<f64> {
        self.matrix.row_iter().map(|r| r.sum()).collect()
    }

    pub fn col_sums(&self) -> Vec<f64> {
        self.matrix.column_iter().map(|c| c.sum()).collect()
    }

    /// Sum of plan times `augmented` cost, i.e. the OC-cost of the scene.
    pub fn weighted_cost(&self, augmented: &DMatrix<f64>) -> Result<f64, OcCostError> {
        if augmented.shape() != self.matrix.shape() {
            return Err(InvalidInput(format!(
                "augmented cost has shape {:?}, plan has {:?}",
                augmented.shape(),
                self.matrix.shape()
            )));
        }
        Ok(self.matrix.component_mul(augmented).sum())
    }
}

/*------------------------------------------------------------------------------
PartialMatcher
------------------------------------------------------------------------------*/

/// Solves the augmented transportation problem with any [`LpSolver`].
#[derive(Debug, Clone)]
pub struct PartialMatcher<S: LpSolver = SimplexSolver> {
    solver: S,
    time_limit: Duration,
}

impl Default for PartialMatcher<SimplexSolver> {
    fn default() -> Self {
        Self::new(SimplexSolver::default(), DEFAULT_TIME_LIMIT)
    }
}

impl<S: LpSolver> PartialMatcher<S> {
    pub fn new(solver: S, time_limit: Duration) -> Self {
        Self { solver, time_limit }
    }

    #[inline(always)]
    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    /// Solves for the normalized transport plan of `cost`, where `beta` is
    /// the price of one unit of unmatched mass.
    pub fn solve(
        &self,
        cost: &DMatrix<f64>,
        beta: f64,
    ) -> Result<TransportPlan, OcCostError> {
        let (m, n) = cost.shape();
        if m == 0 && n == 0 {
            return Err(InvalidInput(
                "cannot match an empty scene without predictions or ground truths"
                    .to_string(),
            ));
        }
        if !beta.is_finite() || beta < 0.0 {
            return Err(InvalidInput(format!(
                "beta must be finite and non-negative, got {}",
                beta
            )));
        }
        if cost.iter().any(|c| !c.is_finite()) {
            return Err(InvalidInput("cost matrix has non-finite entries".to_string()));
        }

        let lp = build_matching_program(cost, beta);
        let solution = self.solver.solve(&lp, self.time_limit);
        if !solution.is_optimal() {
            warn!(status = %solution.status, m, n, "partial matching not solved");
            return Err(SolverFailure {
                status: solution.status,
                reason: format!(
                    "no optimal plan within {:?} after {} iterations",
                    self.time_limit, solution.iterations
                ),
            });
        }

        if solution.values.len() != lp.num_vars() {
            return Err(SolverFailure {
                status: solution.status,
                reason: format!(
                    "solver returned {} values for {} variables",
                    solution.values.len(),
                    lp.num_vars()
                ),
            });
        }
        let mut flows = DMatrix::from_row_slice(m + 1, n + 1, &solution.values);
        flows.apply(|x| *x = x.max(0.0));
        check_marginals(&flows)?;

        flows[(m, n)] = 0.0;
        let total = flows.sum();
        if !(total > 0.0) {
            return Err(SolverFailure {
                status: solution.status,
                reason: "plan carries no mass outside the dummy-dummy cell".to_string(),
            });
        }
        flows /= total;

        debug!(m, n, beta, objective = solution.objective, "transport plan solved");
        Ok(TransportPlan { matrix: flows })
    }
}

/// Verifies the raw flows respect the supplies and demands before they are
/// normalized.
fn check_marginals(flows: &DMatrix<f64>) -> Result<(), OcCostError> {
    let (rows, cols) = flows.shape();
    let (m, n) = (rows - 1, cols - 1);
    let tol = 1e-6 * (m + n + 1) as f64;

    for (i, row) in flows.row_iter().enumerate() {
        let expected = if i < m { 1.0 } else { n as f64 };
        if (row.sum() - expected).abs() > tol {
            return Err(SolverFailure {
                status: LpStatus::Optimal,
                reason: format!(
                    "row {} carries {} instead of {}",
                    i,
                    row.sum(),
                    expected
                ),
            });
        }
    }
    for (j, col) in flows.column_iter().enumerate() {
        let expected = if j < n { 1.0 } else { m as f64 };
        if (col.sum() - expected).abs() > tol {
            return Err(SolverFailure {
                status: LpStatus::Optimal,
                reason: format!(
                    "column {} carries {} instead of {}",
                    j,
                    col.sum(),
                    expected
                ),
            });
        }
    }
    Ok(())
}
