use std::collections::{BTreeMap, HashMap};
use std::fmt;

use log::warn;

use crate::error::ModelError;
use crate::simplex::Solver;
use crate::solution::{ConstraintViolation, Status, ViolationSubject};

/// Sentinel for a missing bound. Use `-INFINITY` for "no lower bound".
pub const INFINITY: f64 = f64::INFINITY;

/// Handle to a variable of one [`LinearProgram`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableId(usize);

impl VariableId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "variable #{}", self.0)
    }
}

/// Handle to a constraint of one [`LinearProgram`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstraintId(usize);

impl ConstraintId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "constraint #{}", self.0)
    }
}

/// A decision variable with its own bounds
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Variable {
    pub(crate) id: VariableId,
    pub(crate) name: String,
    pub(crate) lower: f64,
    pub(crate) upper: f64,
    /// Set only after an optimal solve
    pub(crate) value: Option<f64>,
}

impl Variable {
    pub fn id(&self) -> VariableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Value in the last optimal solution, `None` otherwise
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn is_fixed(&self) -> bool {
        self.lower == self.upper
    }
}

/// `lower <= sum(coefficients[v] * v) <= upper`
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Constraint {
    pub(crate) id: ConstraintId,
    pub(crate) lower: f64,
    pub(crate) upper: f64,
    pub(crate) coefficients: BTreeMap<VariableId, f64>,
}

impl Constraint {
    pub fn id(&self) -> ConstraintId {
        self.id
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Coefficient of `variable`, zero when unset
    pub fn coefficient(&self, variable: VariableId) -> f64 {
        self.coefficients.get(&variable).copied().unwrap_or(0.0)
    }

    pub fn coefficients(&self) -> &BTreeMap<VariableId, f64> {
        &self.coefficients
    }

    /// Weighted sum of `values`, indexed by variable index
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .map(|(var, coef)| coef * values.get(var.index()).copied().unwrap_or(0.0))
            .sum()
    }
}

/// The linear objective. Maximized unless [`Objective::set_minimize`] is called.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Objective {
    pub(crate) coefficients: BTreeMap<VariableId, f64>,
    pub(crate) maximize: bool,
    pub(crate) value: Option<f64>,
}

impl Default for Objective {
    fn default() -> Self {
        Self {
            coefficients: BTreeMap::new(),
            maximize: true,
            value: None,
        }
    }
}

impl Objective {
    pub fn set_maximize(&mut self) {
        self.maximize = true;
    }

    pub fn set_minimize(&mut self) {
        self.maximize = false;
    }

    pub fn is_maximize(&self) -> bool {
        self.maximize
    }

    pub fn coefficient(&self, variable: VariableId) -> f64 {
        self.coefficients.get(&variable).copied().unwrap_or(0.0)
    }

    pub fn coefficients(&self) -> &BTreeMap<VariableId, f64> {
        &self.coefficients
    }

    /// Objective value of the last optimal solution
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .map(|(var, coef)| coef * values.get(var.index()).copied().unwrap_or(0.0))
            .sum()
    }
}

/// A linear program: variables, constraints and one objective.
///
/// Variables and constraints are append-only; the handles returned by
/// [`add_variable`](Self::add_variable) and [`add_constraint`](Self::add_constraint)
/// index into this program only.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinearProgram {
    pub(crate) variables: Vec<Variable>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) objective: Objective,
    names: HashMap<String, VariableId>,
}

impl LinearProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable bounded by `lower <= x <= upper`
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        lower: f64,
        upper: f64,
    ) -> Result<VariableId, ModelError> {
        let name = name.into();
        check_bounds(lower, upper, || format!("variable '{}'", name))?;
        if self.names.contains_key(&name) {
            return Err(ModelError::DuplicateVariable(name));
        }

        let id = VariableId(self.variables.len());
        self.names.insert(name.clone(), id);
        self.variables.push(Variable {
            id,
            name,
            lower,
            upper,
            value: None,
        });
        Ok(id)
    }

    /// Add an empty constraint `lower <= ... <= upper`
    pub fn add_constraint(&mut self, lower: f64, upper: f64) -> Result<ConstraintId, ModelError> {
        let id = ConstraintId(self.constraints.len());
        check_bounds(lower, upper, || id.to_string())?;
        if lower == -INFINITY && upper == INFINITY {
            warn!("{} has no finite bound and will have no effect", id);
        }

        self.constraints.push(Constraint {
            id,
            lower,
            upper,
            coefficients: BTreeMap::new(),
        });
        Ok(id)
    }

    /// Set or overwrite the coefficient of `variable` in `constraint`
    pub fn set_coefficient(
        &mut self,
        constraint: ConstraintId,
        variable: VariableId,
        value: f64,
    ) -> Result<(), ModelError> {
        self.check_variable(variable)?;
        check_coefficient(value, variable, || constraint.to_string())?;
        let row = self
            .constraints
            .get_mut(constraint.index())
            .ok_or(ModelError::UnknownConstraint(constraint))?;
        row.coefficients.insert(variable, value);
        Ok(())
    }

    /// Set or overwrite the objective coefficient of `variable`
    pub fn set_objective_coefficient(&mut self, variable: VariableId, value: f64) -> Result<(), ModelError> {
        self.check_variable(variable)?;
        check_coefficient(value, variable, || "objective".to_string())?;
        self.objective.coefficients.insert(variable, value);
        Ok(())
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Mutable access for choosing the optimization sense
    pub fn objective_mut(&mut self) -> &mut Objective {
        &mut self.objective
    }

    /// Replace the objective with an empty maximization objective
    pub fn reset_objective(&mut self) -> &mut Objective {
        if !self.objective.coefficients.is_empty() {
            warn!("overwriting previously set objective");
        }
        self.objective = Objective::default();
        &mut self.objective
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn variable(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(id.index())
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        self.constraints.get(id.index())
    }

    pub fn variable_by_name(&self, name: &str) -> Option<VariableId> {
        self.names.get(name).copied()
    }

    /// Value of `id` in the last optimal solution
    pub fn value_of(&self, id: VariableId) -> Option<f64> {
        self.variable(id).and_then(Variable::value)
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Solve with the default [`Solver`] and store the solution on the model
    pub fn solve(&mut self) -> Result<Status, ModelError> {
        Solver::default().solve(self)
    }

    /// Every variable bound and constraint violated by `values`, worst first
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();

        for var in &self.variables {
            let actual = values.get(var.id.index()).copied().unwrap_or(0.0);
            let subject = ViolationSubject::Variable(var.id);
            if let Some(v) = ConstraintViolation::check(subject, &var.name, var.lower, var.upper, actual, tolerance) {
                violations.push(v);
            }
        }

        for c in &self.constraints {
            let actual = c.activity(values);
            let subject = ViolationSubject::Constraint(c.id);
            if let Some(v) = ConstraintViolation::check(subject, &c.id.to_string(), c.lower, c.upper, actual, tolerance) {
                violations.push(v);
            }
        }

        // Sort by violation amount (worst first)
        violations.sort_by(|a, b| b.violation_amount.total_cmp(&a.violation_amount));
        violations
    }

    fn check_variable(&self, variable: VariableId) -> Result<(), ModelError> {
        if variable.index() < self.variables.len() {
            Ok(())
        } else {
            Err(ModelError::UnknownVariable(variable))
        }
    }
}

/// `lower <= upper`, no NaN, and neither bound pinned at the wrong infinity
pub(crate) fn check_bounds(lower: f64, upper: f64, subject: impl FnOnce() -> String) -> Result<(), ModelError> {
    let valid = !lower.is_nan() && !upper.is_nan() && lower <= upper && lower < INFINITY && upper > -INFINITY;
    if valid {
        Ok(())
    } else {
        Err(ModelError::InvalidBounds {
            subject: subject(),
            lower,
            upper,
        })
    }
}

pub(crate) fn check_coefficient(
    value: f64,
    variable: VariableId,
    subject: impl FnOnce() -> String,
) -> Result<(), ModelError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ModelError::InvalidCoefficient {
            subject: subject(),
            variable,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_sequential() {
        let mut lp = LinearProgram::new();
        let x = lp.add_variable("x", 0.0, INFINITY).unwrap();
        let y = lp.add_variable("y", -INFINITY, 4.0).unwrap();
        let c = lp.add_constraint(-INFINITY, 14.0).unwrap();

        assert_eq!(x.index(), 0);
        assert_eq!(y.index(), 1);
        assert_eq!(c.index(), 0);
        assert_eq!(lp.variable_by_name("y"), Some(y));
        assert_eq!(lp.variable(y).map(|v| v.upper()), Some(4.0));
        assert_eq!(lp.value_of(x), None);
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let mut lp = LinearProgram::new();
        let err = lp.add_variable("x", 5.0, 1.0).unwrap_err();
        assert!(matches!(err, ModelError::InvalidBounds { .. }), "got {:?}", err);

        let err = lp.add_constraint(3.0, 2.0).unwrap_err();
        assert!(matches!(err, ModelError::InvalidBounds { .. }), "got {:?}", err);

        assert!(lp.add_variable("nan", f64::NAN, 1.0).is_err());
        assert!(lp.add_variable("pinned", INFINITY, INFINITY).is_err());
        assert_eq!(lp.num_variables(), 0);
        assert_eq!(lp.num_constraints(), 0);
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let mut lp = LinearProgram::new();
        lp.add_variable("x", 0.0, 1.0).unwrap();
        assert_eq!(
            lp.add_variable("x", 0.0, 2.0),
            Err(ModelError::DuplicateVariable("x".to_string()))
        );
    }

    #[test]
    fn test_rejects_foreign_handles() {
        let mut other = LinearProgram::new();
        other.add_variable("a", 0.0, 1.0).unwrap();
        let foreign = other.add_variable("b", 0.0, 1.0).unwrap();

        let mut lp = LinearProgram::new();
        lp.add_variable("x", 0.0, 1.0).unwrap();
        let c = lp.add_constraint(0.0, 1.0).unwrap();

        assert_eq!(
            lp.set_coefficient(c, foreign, 1.0),
            Err(ModelError::UnknownVariable(foreign))
        );
        assert_eq!(
            lp.set_objective_coefficient(foreign, 1.0),
            Err(ModelError::UnknownVariable(foreign))
        );
    }

    #[test]
    fn test_solve_rechecks_references() {
        let mut lp = LinearProgram::new();
        lp.add_variable("x", 0.0, 1.0).unwrap();
        let c = lp.add_constraint(0.0, 1.0).unwrap();
        lp.constraints[c.index()].coefficients.insert(VariableId(5), 1.0);

        assert_eq!(lp.solve(), Err(ModelError::UnknownVariable(VariableId(5))));
    }

    #[test]
    fn test_coefficients_overwrite() {
        let mut lp = LinearProgram::new();
        let x = lp.add_variable("x", 0.0, INFINITY).unwrap();
        let c = lp.add_constraint(-INFINITY, 10.0).unwrap();
        lp.set_coefficient(c, x, 2.0).unwrap();
        lp.set_coefficient(c, x, 3.0).unwrap();
        lp.set_objective_coefficient(x, 7.0).unwrap();

        assert_eq!(lp.constraints()[0].coefficient(x), 3.0);
        assert_eq!(lp.constraints()[0].coefficients().len(), 1);
        assert_eq!(lp.objective().coefficient(x), 7.0);
        assert!(lp.set_coefficient(c, x, f64::INFINITY).is_err());
    }

    #[test]
    fn test_objective_sense() {
        let mut lp = LinearProgram::new();
        let x = lp.add_variable("x", 0.0, 1.0).unwrap();
        assert!(lp.objective().is_maximize());
        lp.objective_mut().set_minimize();
        assert!(!lp.objective().is_maximize());

        lp.set_objective_coefficient(x, 1.0).unwrap();
        let objective = lp.reset_objective();
        assert!(objective.is_maximize());
        assert!(objective.coefficients().is_empty());
    }

    #[test]
    fn test_violations_worst_first() {
        let mut lp = LinearProgram::new();
        let x = lp.add_variable("x", 0.0, 10.0).unwrap();
        let y = lp.add_variable("y", 0.0, 10.0).unwrap();
        let sum = lp.add_constraint(-INFINITY, 4.0).unwrap();
        lp.set_coefficient(sum, x, 1.0).unwrap();
        lp.set_coefficient(sum, y, 1.0).unwrap();

        assert!(lp.violations(&[1.0, 3.0], 1e-9).is_empty());

        let violations = lp.violations(&[-1.0, 8.0], 1e-9);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].subject, ViolationSubject::Constraint(sum));
        assert!((violations[0].violation_amount - 3.0).abs() < 1e-12);
        assert_eq!(violations[1].subject, ViolationSubject::Variable(x));
        assert!((violations[1].violation_amount - 1.0).abs() < 1e-12);
    }
}
