//! Equality form of a bounded linear program.
//!
//! Each constraint `l <= a·x <= u` becomes the row `a·x - s = 0` with a slack
//! column `s` bounded by `[l, u]`, so every bound the engine sees is a column
//! bound. Columns `0..n` are the program's variables, `n..n + m` the slacks.

use crate::error::ModelError;
use crate::model::{LinearProgram, check_bounds, check_coefficient};

/// Engine input built from a snapshot of a [`LinearProgram`]
#[derive(Debug, Clone)]
pub(crate) struct WorkingSystem {
    /// Number of original variables
    pub num_variables: usize,
    /// Non-zero coefficients of each row, original columns only
    pub rows: Vec<Vec<(usize, f64)>>,
    /// Column bounds, original then slack
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    /// Minimization costs per column (slacks cost nothing)
    pub costs: Vec<f64>,
    pub nnz: usize,
}

impl WorkingSystem {
    pub fn build(problem: &LinearProgram) -> Result<Self, ModelError> {
        let n = problem.num_variables();
        let m = problem.num_constraints();

        let mut lower = Vec::with_capacity(n + m);
        let mut upper = Vec::with_capacity(n + m);

        for var in problem.variables() {
            check_bounds(var.lower(), var.upper(), || format!("variable '{}'", var.name()))?;
            lower.push(var.lower());
            upper.push(var.upper());
        }

        let mut rows = Vec::with_capacity(m);
        let mut nnz = 0;
        for c in problem.constraints() {
            check_bounds(c.lower(), c.upper(), || c.id().to_string())?;
            lower.push(c.lower());
            upper.push(c.upper());

            let mut row = Vec::with_capacity(c.coefficients().len());
            for (&var, &coef) in c.coefficients() {
                if var.index() >= n {
                    return Err(ModelError::UnknownVariable(var));
                }
                check_coefficient(coef, var, || c.id().to_string())?;
                if coef != 0.0 {
                    row.push((var.index(), coef));
                }
            }
            nnz += row.len();
            rows.push(row);
        }

        // Simplex minimizes, so for maximization we negate the coefficients
        let sign = if problem.objective().is_maximize() { -1.0 } else { 1.0 };
        let mut costs = vec![0.0; n + m];
        for (&var, &coef) in problem.objective().coefficients() {
            if var.index() >= n {
                return Err(ModelError::UnknownVariable(var));
            }
            check_coefficient(coef, var, || "objective".to_string())?;
            costs[var.index()] = sign * coef;
        }

        Ok(Self {
            num_variables: n,
            rows,
            lower,
            upper,
            costs,
            nnz,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.num_variables + self.rows.len()
    }

    pub fn slack_column(&self, row: usize) -> usize {
        self.num_variables + row
    }

    pub fn is_fixed(&self, col: usize) -> bool {
        self.lower[col] == self.upper[col]
    }

    /// Starting value of a non-basic column: lower bound, else upper bound, else 0
    pub fn initial_value(&self, col: usize) -> f64 {
        if self.lower[col].is_finite() {
            self.lower[col]
        } else if self.upper[col].is_finite() {
            self.upper[col]
        } else {
            0.0
        }
    }
}

/// `x` equals the finite `bound` up to a tolerance scaled by the bound's magnitude
pub(crate) fn within(x: f64, bound: f64, tolerance: f64) -> bool {
    bound.is_finite() && (x - bound).abs() <= tolerance * (1.0 + bound.abs())
}
