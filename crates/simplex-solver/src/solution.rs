use std::fmt;

use crate::model::{ConstraintId, LinearProgram, VariableId};
use crate::standard_form::within;

/// Terminal outcome of a solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Status {
    /// An optimal solution was found
    Optimal,
    /// No assignment satisfies every bound
    Infeasible,
    /// The objective improves without limit over the feasible region
    Unbounded,
    /// Numerical breakdown: singular pivot, non-finite values or iteration limit
    Abnormal,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Optimal => "OPTIMAL",
            Status::Infeasible => "INFEASIBLE",
            Status::Unbounded => "UNBOUNDED",
            Status::Abnormal => "ABNORMAL",
        };
        f.write_str(name)
    }
}

/// The result of solving an LP problem
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    /// Solution status
    pub status: Status,
    /// Optimal values for each variable, empty unless optimal
    pub values: Vec<f64>,
    /// Optimal objective value
    pub objective_value: Option<f64>,
    /// Pivot counts
    pub statistics: SolveStatistics,
}

/// Work done by the engine during one solve
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolveStatistics {
    /// Basis changes and bound flips across both phases
    pub iterations: usize,
    /// Iterations spent restoring feasibility
    pub phase_one_iterations: usize,
    /// Steps that moved a non-basic variable to its opposite bound
    pub bound_flips: usize,
    /// Whether the leaving-variable choice fell back to smallest index
    pub strict_bland: bool,
}

impl Solution {
    /// Read the final assignment off the engine. Values that sit within
    /// `tolerance` of a bound are snapped onto it.
    pub(crate) fn extract(
        problem: &LinearProgram,
        status: Status,
        assignment: &[f64],
        tolerance: f64,
        statistics: SolveStatistics,
    ) -> Self {
        if status != Status::Optimal {
            return Self {
                status,
                values: Vec::new(),
                objective_value: None,
                statistics,
            };
        }

        let values: Vec<f64> = problem
            .variables()
            .iter()
            .zip(assignment)
            .map(|(var, &x)| snap(x, var.lower(), var.upper(), tolerance))
            .collect();
        let objective_value = problem.objective().evaluate(&values);

        Self {
            status,
            values,
            objective_value: Some(objective_value),
            statistics,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == Status::Optimal
    }

    pub fn value(&self, variable: VariableId) -> Option<f64> {
        self.values.get(variable.index()).copied()
    }

    /// Store values on the program's variables and objective. Anything but an
    /// optimal solution clears them.
    pub(crate) fn write_to(&self, problem: &mut LinearProgram) {
        for var in &mut problem.variables {
            var.value = self.values.get(var.id.index()).copied();
        }
        problem.objective.value = self.objective_value;
    }
}

fn snap(x: f64, lower: f64, upper: f64, tolerance: f64) -> f64 {
    if within(x, lower, tolerance) {
        lower
    } else if within(x, upper, tolerance) {
        upper
    } else if x == 0.0 {
        // normalize -0.0
        0.0
    } else {
        x
    }
}

/// What a [`ConstraintViolation`] refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ViolationSubject {
    Variable(VariableId),
    Constraint(ConstraintId),
}

/// Information about a violated bound
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstraintViolation {
    pub subject: ViolationSubject,
    /// The bound that is not met
    pub required: f64,
    /// Actual value achieved
    pub actual: f64,
    /// How much the bound is violated by
    pub violation_amount: f64,
    /// Human-readable description of what's wrong
    pub description: String,
}

impl ConstraintViolation {
    pub(crate) fn check(
        subject: ViolationSubject,
        label: &str,
        lower: f64,
        upper: f64,
        actual: f64,
        tolerance: f64,
    ) -> Option<Self> {
        if actual < lower - tolerance * (1.0 + lower.abs()) {
            let amount = lower - actual;
            Some(Self {
                subject,
                required: lower,
                actual,
                violation_amount: amount,
                description: format!("{} is below minimum of {:.2} by {:.2}", label, lower, amount),
            })
        } else if actual > upper + tolerance * (1.0 + upper.abs()) {
            let amount = actual - upper;
            Some(Self {
                subject,
                required: upper,
                actual,
                violation_amount: amount,
                description: format!("{} exceeds maximum of {:.2} by {:.2}", label, upper, amount),
            })
        } else {
            None
        }
    }
}
