use thiserror::Error;

use crate::model::{ConstraintId, VariableId};

/// Errors raised while building a [`LinearProgram`](crate::LinearProgram).
///
/// These are caller mistakes. Infeasible or unbounded problems are not errors,
/// they are reported through [`Status`](crate::Status).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid bounds on {subject}: lower {lower} / upper {upper}")]
    InvalidBounds {
        subject: String,
        lower: f64,
        upper: f64,
    },
    #[error("Unknown variable: {0}")]
    UnknownVariable(VariableId),
    #[error("Unknown constraint: {0}")]
    UnknownConstraint(ConstraintId),
    #[error("This program already has the variable: {0}")]
    DuplicateVariable(String),
    #[error("Coefficient for {variable} in {subject} must be finite, got {value}")]
    InvalidCoefficient {
        subject: String,
        variable: VariableId,
        value: f64,
    },
}
