//! Maximize 3x + 4y subject to:
//!     x + 2y <= 14
//!     3x - y >= 0
//!     x - y <= 2
//!
//! Run with `RUST_LOG=debug` to see the solver's progress.

use simplex_solver::{INFINITY, LinearProgram, ModelError};

fn main() -> Result<(), ModelError> {
    env_logger::init();

    let mut lp = LinearProgram::new();
    let x = lp.add_variable("x", 0.0, INFINITY)?;
    let y = lp.add_variable("y", 0.0, INFINITY)?;

    // x + 2y <= 14
    let c0 = lp.add_constraint(-INFINITY, 14.0)?;
    lp.set_coefficient(c0, x, 1.0)?;
    lp.set_coefficient(c0, y, 2.0)?;

    // 3x - y >= 0
    let c1 = lp.add_constraint(0.0, INFINITY)?;
    lp.set_coefficient(c1, x, 3.0)?;
    lp.set_coefficient(c1, y, -1.0)?;

    // x - y <= 2
    let c2 = lp.add_constraint(-INFINITY, 2.0)?;
    lp.set_coefficient(c2, x, 1.0)?;
    lp.set_coefficient(c2, y, -1.0)?;

    lp.set_objective_coefficient(x, 3.0)?;
    lp.set_objective_coefficient(y, 4.0)?;

    let status = lp.solve()?;

    println!("Solution status: {}", status);
    println!("Objective value: {:?}", lp.objective().value());
    println!("x value: {:?}", lp.value_of(x));
    println!("y value: {:?}", lp.value_of(y));
    Ok(())
}
