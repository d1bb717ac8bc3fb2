//! The structural description of an optimisation problem and the interface to the solver.
//!
//! Formulations build a [`Problem`] out of [`Variable`]s and [`LinearExpr`]s. These are purely
//! structural: values only become available once the problem has been solved, through the
//! [`Solution`] type.
use anyhow::{Result, anyhow, bail};
use highs::{HighsModelStatus, RowProblem, Sense};
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, log_enabled};
use std::ops::{Add, AddAssign, Mul, Neg, RangeInclusive, Sub, SubAssign};

/// A handle to a decision variable in a [`Problem`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(usize);

/// The values a variable may take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableDomain {
    /// Any real number within the bounds
    Continuous,
    /// Zero or one
    Binary,
}

/// The definition of a decision variable
#[derive(Debug, Clone, PartialEq)]
struct VariableDefinition {
    name: String,
    lower: f64,
    upper: f64,
    domain: VariableDomain,
}

/// A linear expression of the form `c + a1*x1 + a2*x2 + ...`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(Variable, f64)>,
    constant: f64,
}

impl LinearExpr {
    /// An expression with no terms which evaluates to zero
    pub fn zero() -> Self {
        Self::default()
    }

    /// An expression with no variable terms
    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// An expression with a single term
    pub fn term(var: Variable, coefficient: f64) -> Self {
        Self {
            terms: vec![(var, coefficient)],
            constant: 0.0,
        }
    }

    /// Add `coefficient * var` to the expression
    pub fn add_term(&mut self, var: Variable, coefficient: f64) {
        self.terms.push((var, coefficient));
    }

    /// Add a constant to the expression
    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// Add `scale * other` to the expression
    pub fn add_scaled(&mut self, other: &LinearExpr, scale: f64) {
        self.terms
            .extend(other.terms.iter().map(|&(var, coeff)| (var, coeff * scale)));
        self.constant += other.constant * scale;
    }

    /// This expression multiplied by `scale`
    pub fn scaled(&self, scale: f64) -> Self {
        let mut out = Self::zero();
        out.add_scaled(self, scale);
        out
    }

    /// The constant part of the expression
    pub fn constant_value(&self) -> f64 {
        self.constant
    }

    /// Whether the expression contains no variable terms
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// Iterate over the variable terms, with repeated variables combined
    pub fn iter_terms(&self) -> impl Iterator<Item = (Variable, f64)> {
        let mut combined: IndexMap<Variable, f64> = IndexMap::new();
        for &(var, coeff) in &self.terms {
            *combined.entry(var).or_default() += coeff;
        }

        combined.into_iter().filter(|(_, coeff)| *coeff != 0.0)
    }
}

impl From<Variable> for LinearExpr {
    fn from(var: Variable) -> Self {
        Self::term(var, 1.0)
    }
}

impl From<f64> for LinearExpr {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl Mul<f64> for Variable {
    type Output = LinearExpr;

    fn mul(self, rhs: f64) -> LinearExpr {
        LinearExpr::term(self, rhs)
    }
}

impl<T: Into<LinearExpr>> Add<T> for Variable {
    type Output = LinearExpr;

    fn add(self, rhs: T) -> LinearExpr {
        LinearExpr::from(self) + rhs
    }
}

impl<T: Into<LinearExpr>> Sub<T> for Variable {
    type Output = LinearExpr;

    fn sub(self, rhs: T) -> LinearExpr {
        LinearExpr::from(self) - rhs
    }
}

impl AddAssign<&LinearExpr> for LinearExpr {
    fn add_assign(&mut self, rhs: &LinearExpr) {
        self.add_scaled(rhs, 1.0);
    }
}

impl AddAssign for LinearExpr {
    fn add_assign(&mut self, rhs: LinearExpr) {
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
    }
}

impl SubAssign<&LinearExpr> for LinearExpr {
    fn sub_assign(&mut self, rhs: &LinearExpr) {
        self.add_scaled(rhs, -1.0);
    }
}

impl SubAssign for LinearExpr {
    fn sub_assign(&mut self, rhs: LinearExpr) {
        self.add_scaled(&rhs, -1.0);
    }
}

impl<T: Into<LinearExpr>> Add<T> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: T) -> LinearExpr {
        self += rhs.into();
        self
    }
}

impl<T: Into<LinearExpr>> Sub<T> for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: T) -> LinearExpr {
        self -= rhs.into();
        self
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(self, rhs: f64) -> LinearExpr {
        self.scaled(rhs)
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self.scaled(-1.0)
    }
}

impl std::iter::Sum for LinearExpr {
    fn sum<I: Iterator<Item = LinearExpr>>(iter: I) -> Self {
        iter.fold(LinearExpr::zero(), |acc, expr| acc + expr)
    }
}

/// A linear constraint of the form `lower <= a1*x1 + a2*x2 + ... <= upper`
#[derive(Debug, Clone, PartialEq)]
struct Constraint {
    name: String,
    terms: Vec<(Variable, f64)>,
    lower: f64,
    upper: f64,
}

/// A mixed-integer linear minimisation problem
#[derive(Debug, Default)]
pub struct Problem {
    variables: Vec<VariableDefinition>,
    constraints: Vec<Constraint>,
    objective: LinearExpr,
}

impl Problem {
    /// Create a new, empty problem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a continuous variable with the given bounds
    pub fn add_variable(&mut self, name: impl Into<String>, bounds: RangeInclusive<f64>) -> Variable {
        self.add_variable_with_domain(name, bounds, VariableDomain::Continuous)
    }

    /// Add a continuous variable which cannot be negative
    pub fn add_nonnegative(&mut self, name: impl Into<String>) -> Variable {
        self.add_variable(name, 0.0..=f64::INFINITY)
    }

    /// Add a binary variable
    pub fn add_binary(&mut self, name: impl Into<String>) -> Variable {
        self.add_variable_with_domain(name, 0.0..=1.0, VariableDomain::Binary)
    }

    fn add_variable_with_domain(
        &mut self,
        name: impl Into<String>,
        bounds: RangeInclusive<f64>,
        domain: VariableDomain,
    ) -> Variable {
        let (lower, upper) = bounds.into_inner();
        self.variables.push(VariableDefinition {
            name: name.into(),
            lower,
            upper,
            domain,
        });

        Variable(self.variables.len() - 1)
    }

    /// Add the constraint `lower <= expr <= upper`.
    ///
    /// Any constant in `expr` is moved over to the bounds.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        expr: &LinearExpr,
        bounds: RangeInclusive<f64>,
    ) {
        let (lower, upper) = bounds.into_inner();
        self.constraints.push(Constraint {
            name: name.into(),
            terms: expr.iter_terms().collect(),
            lower: lower - expr.constant,
            upper: upper - expr.constant,
        });
    }

    /// Add the constraint `lhs <= rhs`
    pub fn add_le(&mut self, name: impl Into<String>, lhs: LinearExpr, rhs: LinearExpr) {
        self.add_constraint(name, &(lhs - rhs), f64::NEG_INFINITY..=0.0);
    }

    /// Add the constraint `lhs >= rhs`
    pub fn add_ge(&mut self, name: impl Into<String>, lhs: LinearExpr, rhs: LinearExpr) {
        self.add_constraint(name, &(lhs - rhs), 0.0..=f64::INFINITY);
    }

    /// Add the constraint `lhs == rhs`
    pub fn add_eq(&mut self, name: impl Into<String>, lhs: LinearExpr, rhs: LinearExpr) {
        self.add_constraint(name, &(lhs - rhs), 0.0..=0.0);
    }

    /// Set the expression to be minimised
    pub fn set_objective(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    /// The number of variables in the problem
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// The number of constraints in the problem
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Whether any variables are restricted to integer values
    pub fn is_mip(&self) -> bool {
        self.variables
            .iter()
            .any(|def| def.domain == VariableDomain::Binary)
    }

    /// The name given to a variable when it was added
    pub fn variable_name(&self, var: Variable) -> &str {
        &self.variables[var.0].name
    }

    /// Iterate over the names of the constraints
    #[cfg(test)]
    fn constraint_names(&self) -> impl Iterator<Item = &str> {
        self.constraints.iter().map(|c| c.name.as_str())
    }

    /// Solve the problem with HiGHS.
    ///
    /// # Returns
    ///
    /// The optimal solution or an error if the problem could not be solved to optimality (e.g.
    /// because it is infeasible).
    pub fn solve(&self) -> Result<Solution> {
        debug!(
            "Solving problem with {} variables and {} constraints{}",
            self.num_variables(),
            self.num_constraints(),
            if self.is_mip() { " (MIP)" } else { "" }
        );

        let mut objective_coeffs = vec![0.0; self.variables.len()];
        for (var, coeff) in self.objective.iter_terms() {
            objective_coeffs[var.0] = coeff;
        }

        let mut highs_problem = RowProblem::default();
        let columns = self
            .variables
            .iter()
            .zip(objective_coeffs)
            .map(|(def, coeff)| match def.domain {
                VariableDomain::Continuous => {
                    highs_problem.add_column(coeff, def.lower..=def.upper)
                }
                VariableDomain::Binary => {
                    highs_problem.add_integer_column(coeff, def.lower..=def.upper)
                }
            })
            .collect_vec();

        for constraint in &self.constraints {
            highs_problem.add_row(
                constraint.lower..=constraint.upper,
                constraint
                    .terms
                    .iter()
                    .map(|&(var, coeff)| (columns[var.0], coeff)),
            );
        }

        let mut model = highs_problem.optimise(Sense::Minimise);
        configure_highs_output(&mut model);

        let solved = model
            .try_solve()
            .map_err(|status| anyhow!("Could not solve: {status:?}"))?;
        match solved.status() {
            HighsModelStatus::Optimal => {}
            status => bail!("Could not solve: {status:?}"),
        }

        let values = solved.get_solution().columns().to_vec();
        let objective_value = evaluate(&values, &self.objective);

        Ok(Solution {
            values,
            objective_value,
        })
    }
}

/// Only show solver output when debug logging is enabled
fn configure_highs_output(model: &mut highs::Model) {
    let enabled = log_enabled!(log::Level::Debug);
    model.set_option("output_flag", enabled);
    model.set_option("log_to_console", enabled);
}

fn evaluate(values: &[f64], expr: &LinearExpr) -> f64 {
    expr.terms
        .iter()
        .map(|&(var, coeff)| values[var.0] * coeff)
        .sum::<f64>()
        + expr.constant
}

/// The optimal values of a solved [`Problem`]
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    values: Vec<f64>,
    objective_value: f64,
}

impl Solution {
    /// The value of a variable
    pub fn value(&self, var: Variable) -> f64 {
        self.values[var.0]
    }

    /// The value of an expression
    pub fn evaluate(&self, expr: &LinearExpr) -> f64 {
        evaluate(&self.values, expr)
    }

    /// The value of the objective function, including any constant terms
    pub fn objective_value(&self) -> f64 {
        self.objective_value
    }
}
