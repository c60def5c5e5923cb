//! Linear-program description and the solver interface.
//!
//! Problems are in standard equality form: minimize `c^T x` subject to
//! `A x = b` and `x >= 0`. Any backend implementing [`LpSolver`] can be
//! plugged into the matcher.

pub mod simplex;

use std::fmt;
use std::time::Duration;

pub use simplex::SimplexSolver;

/// One row of `A x = b`, stored sparsely as `(variable, coefficient)` terms.
#[derive(Debug, Clone, PartialEq)]
pub struct EqualityConstraint {
    pub terms: Vec<(usize, f64)>,
    pub rhs: f64,
}

impl EqualityConstraint {
    pub fn new(terms: Vec<(usize, f64)>, rhs: f64) -> Self {
        Self { terms, rhs }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearProgram {
    objective: Vec<f64>,
    constraints: Vec<EqualityConstraint>,
}

impl LinearProgram {
    /// Problem over `num_vars` non-negative continuous variables with a zero
    /// objective and no constraints.
    pub fn new(num_vars: usize) -> Self {
        Self {
            objective: vec![0.0; num_vars],
            constraints: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn num_vars(&self) -> usize {
        self.objective.len()
    }

    #[inline(always)]
    pub fn objective(&self) -> &[f64] {
        &self.objective
    }

    #[inline(always)]
    pub fn constraints(&self) -> &[EqualityConstraint] {
        &self.constraints
    }

    pub fn set_cost(&mut self, var: usize, cost: f64) {
        self.objective[var] = cost;
    }

    pub fn add_constraint(&mut self, constraint: EqualityConstraint) {
        debug_assert!(
            constraint.terms.iter().all(|(v, _)| *v < self.num_vars()),
            "constraint references a variable out of range"
        );
        self.constraints.push(constraint);
    }

    /// Objective value of `values`.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.objective.iter().zip(values).map(|(c, x)| c * x).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpStatus {
    Optimal,
    Infeasible,
    Unbounded,
    TimeLimit,
}

impl fmt::Display for LpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LpStatus::Optimal => "optimal",
            LpStatus::Infeasible => "infeasible",
            LpStatus::Unbounded => "unbounded",
            LpStatus::TimeLimit => "time limit reached",
        };
        f.write_str(s)
    }
}

/// Values are only meaningful when `status` is `Optimal`.
#[derive(Debug, Clone, PartialEq)]
pub struct LpSolution {
    pub status: LpStatus,
    pub values: Vec<f64>,
    pub objective: f64,
    pub iterations: usize,
}

impl LpSolution {
    pub fn failed(status: LpStatus, num_vars: usize, iterations: usize) -> Self {
        Self {
            status,
            values: vec![0.0; num_vars],
            objective: f64::NAN,
            iterations,
        }
    }

    #[inline(always)]
    pub fn is_optimal(&self) -> bool {
        self.status == LpStatus::Optimal
    }
}

pub trait LpSolver {
    /// Solves `problem`, giving up with `LpStatus::TimeLimit` once
    /// `time_limit` has elapsed.
    fn solve(&self, problem: &LinearProgram, time_limit: Duration) -> LpSolution;
}
