//! Bounded-variable two-phase simplex solver.
//!
//! ```
//! use simplex_solver::{INFINITY, LinearProgram, Status};
//!
//! // Maximize 3x + 4y s.t. x + 2y <= 14, 3x - y >= 0, x - y <= 2
//! let mut lp = LinearProgram::new();
//! let x = lp.add_variable("x", 0.0, INFINITY)?;
//! let y = lp.add_variable("y", 0.0, INFINITY)?;
//!
//! for (lower, upper, a, b) in [(-INFINITY, 14.0, 1.0, 2.0), (0.0, INFINITY, 3.0, -1.0), (-INFINITY, 2.0, 1.0, -1.0)] {
//!     let c = lp.add_constraint(lower, upper)?;
//!     lp.set_coefficient(c, x, a)?;
//!     lp.set_coefficient(c, y, b)?;
//! }
//! lp.set_objective_coefficient(x, 3.0)?;
//! lp.set_objective_coefficient(y, 4.0)?;
//!
//! assert_eq!(lp.solve()?, Status::Optimal);
//! assert!((lp.objective().value().unwrap() - 34.0).abs() < 1e-9);
//! # Ok::<(), simplex_solver::ModelError>(())
//! ```

mod error;
mod model;
mod simplex;
mod solution;
mod standard_form;
mod tableau;

pub use error::ModelError;
pub use model::{Constraint, ConstraintId, INFINITY, LinearProgram, Objective, Variable, VariableId};
pub use simplex::Solver;
pub use solution::{ConstraintViolation, Solution, SolveStatistics, Status, ViolationSubject};
