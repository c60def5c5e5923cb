//! Dense two-phase tableau simplex.
//!
//! Phase 1 adds one artificial variable per constraint and minimizes their
//! sum; phase 2 optimizes the real objective from the feasible basis found.
//! Entering and leaving variables follow Bland's rule so degenerate
//! problems (transportation problems are highly degenerate) cannot cycle.

use std::time::{Duration, Instant};

use super::{LinearProgram, LpSolution, LpSolver, LpStatus};
use tracing::debug;

const DEFAULT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplexSolver {
    tolerance: f64,
}

impl Default for SimplexSolver {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl SimplexSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pivot elements and reduced costs smaller than `tolerance` in magnitude
    /// are treated as zero.
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

/*-----------------------------------------------------------------------------
Tableau
-----------------------------------------------------------------------------*/

struct Tableau {
    /// Constraint rows, each `width + 1` long with the right-hand side last.
    rows: Vec<Vec<f64>>,
    /// Reduced costs; the last entry holds the negated objective value.
    obj: Vec<f64>,
    basis: Vec<usize>,
    width: usize,
    eps: f64,
}

impl Tableau {
    fn pivot(&mut self, r: usize, col: usize) {
        let p = self.rows[r][col];
        self.rows[r].iter_mut().for_each(|v| *v /= p);
        let pivot_row = self.rows[r].clone();

        for (i, row) in self.rows.iter_mut().enumerate() {
            if i == r {
                continue;
            }
            let f = row[col];
            if f != 0.0 {
                row.iter_mut().zip(&pivot_row).for_each(|(v, pv)| *v -= f * pv);
                row[col] = 0.0;
            }
        }

        let f = self.obj[col];
        if f != 0.0 {
            self.obj
                .iter_mut()
                .zip(&pivot_row)
                .for_each(|(v, pv)| *v -= f * pv);
            self.obj[col] = 0.0;
        }
        self.basis[r] = col;
    }

    /// Pivots until no column below `allowed` improves the objective.
    fn optimize(
        &mut self,
        allowed: usize,
        start: Instant,
        time_limit: Duration,
        iterations: &mut usize,
    ) -> LpStatus {
        loop {
            if start.elapsed() >= time_limit {
                return LpStatus::TimeLimit;
            }

            let Some(col) = (0..allowed).find(|&j| self.obj[j] < -self.eps) else {
                return LpStatus::Optimal;
            };

            let mut leave: Option<(usize, f64)> = None;
            for (r, row) in self.rows.iter().enumerate() {
                let a = row[col];
                if a <= self.eps {
                    continue;
                }
                let ratio = row[self.width].max(0.0) / a;
                let better = match leave {
                    None => true,
                    Some((best, best_ratio)) => {
                        ratio < best_ratio - self.eps
                            || (ratio <= best_ratio + self.eps
                                && self.basis[r] < self.basis[best])
                    }
                };
                if better {
                    leave = Some((r, ratio));
                }
            }

            let Some((r, _)) = leave else {
                return LpStatus::Unbounded;
            };
            self.pivot(r, col);
            *iterations += 1;
        }
    }

    /// Replaces artificial basics (all at zero level after a feasible phase
    /// 1) by real columns, dropping rows that turn out to be redundant.
    fn drive_out_artificials(&mut self, num_real: usize) {
        let mut r = 0;
        while r < self.rows.len() {
            if self.basis[r] < num_real {
                r += 1;
                continue;
            }
            match (0..num_real).find(|&j| self.rows[r][j].abs() > self.eps) {
                Some(col) => {
                    self.pivot(r, col);
                    r += 1;
                }
                None => {
                    self.rows.remove(r);
                    self.basis.remove(r);
                }
            }
        }
    }
}

impl LpSolver for SimplexSolver {
    fn solve(&self, problem: &LinearProgram, time_limit: Duration) -> LpSolution {
        let start = Instant::now();
        let n = problem.num_vars();
        let m = problem.constraints().len();
        let width = n + m;

        let mut rows = Vec::with_capacity(m);
        let mut rhs_scale: f64 = 0.0;
        for (k, constraint) in problem.constraints().iter().enumerate() {
            let mut row = vec![0.0; width + 1];
            for &(var, coeff) in constraint.terms.iter() {
                row[var] += coeff;
            }
            row[width] = constraint.rhs;
            if constraint.rhs < 0.0 {
                row.iter_mut().for_each(|v| *v = -*v);
            }
            row[n + k] = 1.0;
            rhs_scale = rhs_scale.max(row[width]);
            rows.push(row);
        }

        // phase 1: minimize the sum of artificials
        let mut obj = vec![0.0; width + 1];
        for row in rows.iter() {
            for j in 0..n {
                obj[j] -= row[j];
            }
            obj[width] -= row[width];
        }

        let mut tableau = Tableau {
            rows,
            obj,
            basis: (n..width).collect(),
            width,
            eps: self.tolerance,
        };
        let mut iterations = 0;

        let status = tableau.optimize(width, start, time_limit, &mut iterations);
        if status != LpStatus::Optimal {
            return LpSolution::failed(status, n, iterations);
        }
        let infeasibility = -tableau.obj[width];
        if infeasibility > 1e-7 * (1.0 + rhs_scale) {
            debug!(infeasibility, "phase 1 ended with positive artificials");
            return LpSolution::failed(LpStatus::Infeasible, n, iterations);
        }
        tableau.drive_out_artificials(n);

        // phase 2: price out the basis against the real objective
        let mut obj = vec![0.0; width + 1];
        obj[..n].copy_from_slice(problem.objective());
        for (row, &b) in tableau.rows.iter().zip(tableau.basis.iter()) {
            let cb = if b < n { obj[b] } else { 0.0 };
            if cb != 0.0 {
                obj.iter_mut().zip(row).for_each(|(v, a)| *v -= cb * a);
            }
        }
        tableau.obj = obj;

        let status = tableau.optimize(n, start, time_limit, &mut iterations);
        if status != LpStatus::Optimal {
            return LpSolution::failed(status, n, iterations);
        }

        let mut values = vec![0.0; n];
        for (row, &b) in tableau.rows.iter().zip(tableau.basis.iter()) {
            if b < n {
                values[b] = row[width].max(0.0);
            }
        }
        let objective = problem.evaluate(&values);

        debug!(
            num_vars = n,
            num_constraints = m,
            iterations,
            objective,
            elapsed_us = start.elapsed().as_micros() as u64,
            "simplex solved"
        );

        LpSolution {
            status: LpStatus::Optimal,
            values,
            objective,
            iterations,
        }
    }
}
