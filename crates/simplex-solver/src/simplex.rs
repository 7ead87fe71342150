use log::{debug, trace, warn};
use thiserror::Error;

use crate::error::ModelError;
use crate::model::{INFINITY, LinearProgram};
use crate::solution::{Solution, SolveStatistics, Status};
use crate::standard_form::{WorkingSystem, within};
use crate::tableau::{SingularPivot, Tableau};

/// Bounded-variable simplex solver for linear programming problems.
///
/// The solver only holds settings; every call builds its own engine state, so
/// one `Solver` can be shared between threads.
#[derive(Debug, Clone)]
pub struct Solver {
    /// Maximum iterations before giving up, sized from the problem when unset
    max_iterations: Option<usize>,
    /// Tolerance for bound and reduced cost comparisons
    tolerance: f64,
    /// Smallest pivot element the engine will divide by
    pivot_tolerance: f64,
    /// Zero-length steps in a row before the leaving choice uses smallest index
    degenerate_pivot_limit: usize,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: None,
            tolerance: 1e-9,
            pivot_tolerance: 1e-11,
            degenerate_pivot_limit: 50,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_pivot_tolerance(mut self, tol: f64) -> Self {
        self.pivot_tolerance = tol;
        self
    }

    pub fn with_degenerate_pivot_limit(mut self, limit: usize) -> Self {
        self.degenerate_pivot_limit = limit;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Solve `problem` and store the values on its variables and objective
    pub fn solve(&self, problem: &mut LinearProgram) -> Result<Status, ModelError> {
        let solution = self.run(problem)?;
        solution.write_to(problem);
        Ok(solution.status)
    }

    /// Solve `problem` without touching it
    pub fn run(&self, problem: &LinearProgram) -> Result<Solution, ModelError> {
        let system = WorkingSystem::build(problem)?;
        debug!(
            "solving LP: vars: {}, constraints: {}, nnz: {}, maximize: {}",
            system.num_variables,
            system.num_rows(),
            system.nnz,
            problem.objective().is_maximize(),
        );

        let mut engine = Engine::new(&system, self);
        let status = engine.solve();
        let statistics = engine.statistics();
        debug!(
            "finished with status {} after {} iterations ({} in phase 1, {} bound flips)",
            status, statistics.iterations, statistics.phase_one_iterations, statistics.bound_flips,
        );

        Ok(Solution::extract(problem, status, &engine.values, self.tolerance, statistics))
    }

    fn iteration_limit(&self, system: &WorkingSystem) -> usize {
        self.max_iterations.unwrap_or_else(|| {
            let size = system.num_columns();
            size.saturating_mul(size).saturating_mul(20).max(1000)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Minimize the total bound violation of the basic variables
    Feasibility,
    /// Minimize the real objective
    Optimality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    fn sign(self) -> f64 {
        match self {
            Direction::Increase => 1.0,
            Direction::Decrease => -1.0,
        }
    }
}

enum Step {
    Flip,
    Pivot,
    Unbounded,
}

#[derive(Error, Debug)]
enum Breakdown {
    #[error("pivot element {} at row {}, column {} is too small", .0.value, .0.row, .0.col)]
    Singular(SingularPivot),
    #[error("iteration limit of {0} exceeded")]
    IterationLimit(usize),
    #[error("column {0} took a non-finite value")]
    NonFinite(usize),
    #[error("column {0} reduces the bound violation without limit")]
    UnboundedFeasibilityRay(usize),
}

impl From<SingularPivot> for Breakdown {
    fn from(pivot: SingularPivot) -> Self {
        Breakdown::Singular(pivot)
    }
}

/// Basic variable that blocks the entering column first
#[derive(Debug, Clone, Copy)]
struct Leaving {
    row: usize,
    step: f64,
    /// Bound the leaving variable stops at
    bound: f64,
    magnitude: f64,
}

/// State of one solve: tableau, basis and a value for every column
pub(crate) struct Engine<'a> {
    system: &'a WorkingSystem,
    tableau: Tableau,
    values: Vec<f64>,
    tolerance: f64,
    pivot_tolerance: f64,
    degenerate_pivot_limit: usize,
    max_iterations: usize,
    iterations: usize,
    phase_one_iterations: usize,
    bound_flips: usize,
    degenerate_streak: usize,
    strict_bland: bool,
}

impl<'a> Engine<'a> {
    pub fn new(system: &'a WorkingSystem, settings: &Solver) -> Self {
        // Slack values are filled in from the original columns
        let values = (0..system.num_columns())
            .map(|j| if j < system.num_variables { system.initial_value(j) } else { 0.0 })
            .collect();

        Self {
            system,
            tableau: Tableau::with_slack_basis(system),
            values,
            tolerance: settings.tolerance,
            pivot_tolerance: settings.pivot_tolerance,
            degenerate_pivot_limit: settings.degenerate_pivot_limit,
            max_iterations: settings.iteration_limit(system),
            iterations: 0,
            phase_one_iterations: 0,
            bound_flips: 0,
            degenerate_streak: 0,
            strict_bland: false,
        }
    }

    pub fn solve(&mut self) -> Status {
        match self.run_phases() {
            Ok(status) => status,
            Err(breakdown) => {
                warn!("simplex aborted after {} iterations: {}", self.iterations, breakdown);
                Status::Abnormal
            }
        }
    }

    pub fn statistics(&self) -> SolveStatistics {
        SolveStatistics {
            iterations: self.iterations,
            phase_one_iterations: self.phase_one_iterations,
            bound_flips: self.bound_flips,
            strict_bland: self.strict_bland,
        }
    }

    fn run_phases(&mut self) -> Result<Status, Breakdown> {
        self.update_basic_values()?;

        let feasible = self.phase_one()?;
        self.phase_one_iterations = self.iterations;
        if !feasible {
            return Ok(Status::Infeasible);
        }

        self.phase_two()
    }

    fn phase_one(&mut self) -> Result<bool, Breakdown> {
        let zero_costs = vec![0.0; self.system.num_columns()];

        loop {
            // The violation cost is re-priced from the current values every iteration
            let basic_costs: Vec<f64> = self
                .tableau
                .basic_vars()
                .iter()
                .map(|&col| self.violation_cost(col))
                .collect();
            if basic_costs.iter().all(|&c| c == 0.0) {
                debug!("feasible basis found after {} iterations", self.iterations);
                return Ok(true);
            }

            let reduced = self.reduced_costs(&zero_costs, &basic_costs);
            let Some((entering, direction)) = self.select_entering(&reduced) else {
                debug!("no column reduces the bound violation of {:e}", self.total_violation());
                return Ok(false);
            };

            if let Step::Unbounded = self.step(entering, direction, Phase::Feasibility)? {
                return Err(Breakdown::UnboundedFeasibilityRay(entering));
            }
        }
    }

    fn phase_two(&mut self) -> Result<Status, Breakdown> {
        let system = self.system;

        loop {
            let reduced = self.objective_reduced_costs();
            let Some((entering, direction)) = self.select_entering(&reduced) else {
                return Ok(Status::Optimal);
            };

            if let Step::Unbounded = self.step(entering, direction, Phase::Optimality)? {
                debug!(
                    "column {} improves the objective without limit (cost {})",
                    entering, system.costs[entering]
                );
                return Ok(Status::Unbounded);
            }
        }
    }

    /// `d_j = c_j - c_B · B⁻¹ · A_j` for the real objective
    fn objective_reduced_costs(&self) -> Vec<f64> {
        let basic_costs: Vec<f64> = self
            .tableau
            .basic_vars()
            .iter()
            .map(|&col| self.system.costs[col])
            .collect();
        self.reduced_costs(&self.system.costs, &basic_costs)
    }

    fn reduced_costs(&self, column_costs: &[f64], basic_costs: &[f64]) -> Vec<f64> {
        let mut reduced = column_costs.to_vec();
        for (row, &cost) in basic_costs.iter().enumerate() {
            if cost == 0.0 {
                continue;
            }
            for (d, t) in reduced.iter_mut().zip(self.tableau.row(row)) {
                *d -= cost * t;
            }
        }
        for &col in self.tableau.basic_vars() {
            reduced[col] = 0.0;
        }
        reduced
    }

    /// Bland's rule: the lowest-index column whose move improves the objective
    fn select_entering(&self, reduced: &[f64]) -> Option<(usize, Direction)> {
        reduced
            .iter()
            .enumerate()
            .filter(|&(col, _)| !self.tableau.is_basic(col) && !self.system.is_fixed(col))
            .find_map(|(col, &d)| {
                if d < -self.tolerance && self.can_increase(col) {
                    Some((col, Direction::Increase))
                } else if d > self.tolerance && self.can_decrease(col) {
                    Some((col, Direction::Decrease))
                } else {
                    None
                }
            })
    }

    fn step(&mut self, entering: usize, direction: Direction, phase: Phase) -> Result<Step, Breakdown> {
        let x = self.values[entering];
        let (lower, upper) = (self.system.lower[entering], self.system.upper[entering]);
        let flip_distance = match direction {
            Direction::Increase => upper - x,
            Direction::Decrease => x - lower,
        };

        let leaving = self.ratio_test(entering, direction.sign(), phase);
        let flip = match leaving {
            None if flip_distance == INFINITY => return Ok(Step::Unbounded),
            None => true,
            Some(leaving) => flip_distance <= leaving.step,
        };

        let distance = match leaving {
            Some(leaving) if !flip => leaving.step,
            _ => flip_distance,
        };
        self.count_iteration(distance)?;

        let step = match leaving {
            Some(leaving) if !flip => {
                let leaving_col = self.tableau.basic_var(leaving.row);
                self.tableau.pivot(leaving.row, entering, self.pivot_tolerance)?;
                self.values[leaving_col] = leaving.bound;
                trace!(
                    "{:?} pivot {}: column {} enters, column {} leaves at {} (step {:e})",
                    phase, self.iterations, entering, leaving_col, leaving.bound, distance
                );
                Step::Pivot
            }
            _ => {
                self.values[entering] = match direction {
                    Direction::Increase => upper,
                    Direction::Decrease => lower,
                };
                self.bound_flips += 1;
                trace!(
                    "{:?} flip {}: column {} moves to {}",
                    phase, self.iterations, entering, self.values[entering]
                );
                Step::Flip
            }
        };

        self.update_basic_values()?;
        Ok(step)
    }

    /// Find the basic variable that first hits a bound as `entering` moves in
    /// direction `sign`.
    fn ratio_test(&self, entering: usize, sign: f64, phase: Phase) -> Option<Leaving> {
        let mut best: Option<Leaving> = None;

        for row in 0..self.tableau.num_rows() {
            let coef = self.tableau.get(row, entering);
            if coef.abs() <= self.pivot_tolerance {
                continue;
            }
            // x_B = -Σ T_j x_j, so the basic variable moves against the column
            let rate = -sign * coef;
            let col = self.tableau.basic_var(row);
            let Some((bound, distance)) = self.blocking_bound(col, rate, phase) else {
                continue;
            };

            let candidate = Leaving {
                row,
                step: (distance / rate.abs()).max(0.0),
                bound,
                magnitude: coef.abs(),
            };
            if best.is_none_or(|current| self.prefer(&candidate, &current)) {
                best = Some(candidate);
            }
        }

        best
    }

    /// The bound basic column `col` runs into when moving at `rate`, and how far away it is
    fn blocking_bound(&self, col: usize, rate: f64, phase: Phase) -> Option<(f64, f64)> {
        let x = self.values[col];
        let (lower, upper) = (self.system.lower[col], self.system.upper[col]);

        if phase == Phase::Feasibility {
            // An infeasible variable may only travel up to the bound it violates
            if self.is_below(col) {
                return (rate > 0.0).then_some((lower, lower - x));
            }
            if self.is_above(col) {
                return (rate < 0.0).then_some((upper, x - upper));
            }
        }

        if rate > 0.0 {
            upper.is_finite().then_some((upper, upper - x))
        } else {
            lower.is_finite().then_some((lower, x - lower))
        }
    }

    /// Shortest step wins; exact ties (usually degenerate zero steps) go to the
    /// largest pivot element, or to the smallest column once strict Bland is on.
    fn prefer(&self, candidate: &Leaving, current: &Leaving) -> bool {
        if candidate.step != current.step {
            return candidate.step < current.step;
        }
        if self.strict_bland {
            self.tableau.basic_var(candidate.row) < self.tableau.basic_var(current.row)
        } else {
            candidate.magnitude > current.magnitude
        }
    }

    fn count_iteration(&mut self, distance: f64) -> Result<(), Breakdown> {
        self.iterations += 1;
        if self.iterations > self.max_iterations {
            return Err(Breakdown::IterationLimit(self.max_iterations));
        }

        if distance <= self.tolerance {
            self.degenerate_streak += 1;
            if !self.strict_bland && self.degenerate_streak >= self.degenerate_pivot_limit {
                debug!(
                    "{} degenerate steps in a row, switching to strict Bland's rule",
                    self.degenerate_streak
                );
                self.strict_bland = true;
            }
        } else {
            self.degenerate_streak = 0;
        }
        Ok(())
    }

    /// Recompute `x_B = -Σ T_j x_j` over the non-basic columns
    fn update_basic_values(&mut self) -> Result<(), Breakdown> {
        for row in 0..self.tableau.num_rows() {
            let mut value = 0.0;
            for (col, &t) in self.tableau.row(row).iter().enumerate() {
                if t != 0.0 && !self.tableau.is_basic(col) {
                    value -= t * self.values[col];
                }
            }

            let col = self.tableau.basic_var(row);
            if !value.is_finite() {
                return Err(Breakdown::NonFinite(col));
            }
            self.values[col] = value;
        }
        Ok(())
    }

    fn can_increase(&self, col: usize) -> bool {
        let upper = self.system.upper[col];
        let x = self.values[col];
        upper == INFINITY || (x < upper && !within(x, upper, self.tolerance))
    }

    fn can_decrease(&self, col: usize) -> bool {
        let lower = self.system.lower[col];
        let x = self.values[col];
        lower == -INFINITY || (x > lower && !within(x, lower, self.tolerance))
    }

    fn is_below(&self, col: usize) -> bool {
        let lower = self.system.lower[col];
        let x = self.values[col];
        x < lower && !within(x, lower, self.tolerance)
    }

    fn is_above(&self, col: usize) -> bool {
        let upper = self.system.upper[col];
        let x = self.values[col];
        x > upper && !within(x, upper, self.tolerance)
    }

    /// Slope of the total bound violation with respect to column `col`
    fn violation_cost(&self, col: usize) -> f64 {
        if self.is_below(col) {
            -1.0
        } else if self.is_above(col) {
            1.0
        } else {
            0.0
        }
    }

    fn total_violation(&self) -> f64 {
        self.values
            .iter()
            .zip(self.system.lower.iter().zip(&self.system.upper))
            .map(|(&x, (&lower, &upper))| (lower - x).max(0.0) + (x - upper).max(0.0))
            .sum()
    }
}
