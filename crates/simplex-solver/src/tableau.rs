use crate::standard_form::WorkingSystem;

/// Dense `B⁻¹·[A | -I]` with the basic column of every row
#[derive(Debug, Clone)]
pub(crate) struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    /// Row of each basic column
    basic_row: Vec<Option<usize>>,
}

/// Pivot element too small to divide by
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SingularPivot {
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

impl Tableau {
    /// Start from the all-slack basis: `B = -I`, so the tableau is `[-A | I]`
    pub fn with_slack_basis(system: &WorkingSystem) -> Self {
        let n_rows = system.num_rows();
        let n_cols = system.num_columns();

        let mut data = vec![vec![0.0; n_cols]; n_rows];
        let mut basic_vars = Vec::with_capacity(n_rows);
        let mut basic_row = vec![None; n_cols];

        for (i, row) in system.rows.iter().enumerate() {
            for &(j, coef) in row {
                data[i][j] = -coef;
            }
            let slack = system.slack_column(i);
            data[i][slack] = 1.0;
            basic_vars.push(slack);
            basic_row[slack] = Some(i);
        }

        Self {
            data,
            basic_vars,
            basic_row,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.data.len()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row][col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row]
    }

    pub fn basic_vars(&self) -> &[usize] {
        &self.basic_vars
    }

    pub fn basic_var(&self, row: usize) -> usize {
        self.basic_vars[row]
    }

    pub fn is_basic(&self, col: usize) -> bool {
        self.basic_row[col].is_some()
    }

    /// Bring `col` into the basis in place of the basic variable of `row`
    pub fn pivot(&mut self, row: usize, col: usize, pivot_tolerance: f64) -> Result<(), SingularPivot> {
        let pivot_val = self.data[row][col];
        if !pivot_val.is_finite() || pivot_val.abs() <= pivot_tolerance {
            return Err(SingularPivot {
                row,
                col,
                value: pivot_val,
            });
        }

        // Update basic variable
        let leaving = self.basic_vars[row];
        self.basic_row[leaving] = None;
        self.basic_row[col] = Some(row);
        self.basic_vars[row] = col;

        // Scale pivot row
        for v in self.data[row].iter_mut() {
            *v /= pivot_val;
        }
        self.data[row][col] = 1.0;

        // Eliminate column in other rows
        let pivot_row = self.data[row].clone();
        for (i, other) in self.data.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = other[col];
            if factor == 0.0 {
                continue;
            }
            for (v, p) in other.iter_mut().zip(&pivot_row) {
                *v -= factor * p;
            }
            other[col] = 0.0;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{INFINITY, LinearProgram};

    fn two_by_two() -> WorkingSystem {
        // x + 2y <= 14
        // 3x - y >= 0
        let mut lp = LinearProgram::new();
        let x = lp.add_variable("x", 0.0, INFINITY).unwrap();
        let y = lp.add_variable("y", 0.0, INFINITY).unwrap();
        let c0 = lp.add_constraint(-INFINITY, 14.0).unwrap();
        lp.set_coefficient(c0, x, 1.0).unwrap();
        lp.set_coefficient(c0, y, 2.0).unwrap();
        let c1 = lp.add_constraint(0.0, INFINITY).unwrap();
        lp.set_coefficient(c1, x, 3.0).unwrap();
        lp.set_coefficient(c1, y, -1.0).unwrap();
        WorkingSystem::build(&lp).unwrap()
    }

    #[test]
    fn test_slack_basis() {
        let tableau = Tableau::with_slack_basis(&two_by_two());

        assert_eq!(tableau.basic_vars(), &[2, 3]);
        assert_eq!(tableau.row(0), &[-1.0, -2.0, 1.0, 0.0]);
        assert_eq!(tableau.row(1), &[-3.0, 1.0, 0.0, 1.0]);
        assert!(tableau.is_basic(3));
        assert!(!tableau.is_basic(0));
    }

    #[test]
    fn test_pivot_makes_unit_column() {
        let mut tableau = Tableau::with_slack_basis(&two_by_two());
        tableau.pivot(1, 0, 1e-11).unwrap();

        assert_eq!(tableau.basic_var(1), 0);
        assert!(tableau.is_basic(0));
        assert!(!tableau.is_basic(3));
        assert_eq!(tableau.get(1, 0), 1.0);
        assert_eq!(tableau.get(0, 0), 0.0);

        // row 1 was [-3, 1, 0, 1] / -3
        let expected = [1.0, -1.0 / 3.0, 0.0, -1.0 / 3.0];
        for (got, want) in tableau.row(1).iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "row 1: {:?}", tableau.row(1));
        }
    }

    #[test]
    fn test_rejects_zero_pivot() {
        let mut tableau = Tableau::with_slack_basis(&two_by_two());
        // column 2 is the basic slack of row 0, zero in row 1
        let err = tableau.pivot(1, 2, 1e-11).unwrap_err();
        assert_eq!(err.value, 0.0);
        assert_eq!(tableau.basic_vars(), &[2, 3], "basis unchanged");
    }
}
