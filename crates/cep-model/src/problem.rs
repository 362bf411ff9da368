//! Optimization problem representation.
//!
//! Defines the variable/constraint/objective structures the framework
//! assembles and hands to the external solver. The representation is a
//! plain linear (mixed-integer) program: the framework owns composition,
//! never the solve.

use std::collections::{BTreeMap, HashMap};

use cep_core::{CepError, CepResult};
use serde::{Deserialize, Serialize};

/// Index of a decision variable within one assembled problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarId(usize);

impl VarId {
    #[inline]
    pub fn new(value: usize) -> Self {
        VarId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

/// Domain of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarDomain {
    Continuous { lb: f64, ub: f64 },
    Binary,
    Integer { lb: f64, ub: f64 },
}

/// A decision variable definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDef {
    pub name: String,
    pub domain: VarDomain,
}

/// A linear expression over decision variables, in canonical form.
///
/// Terms are keyed by [`VarId`] so that summing the same contributions in
/// any order produces an identical expression; zero coefficients are
/// dropped. This is what makes accumulator finalization order-independent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearExpr {
    terms: BTreeMap<VarId, f64>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// An expression with no variable terms.
    pub fn constant(value: f64) -> Self {
        Self {
            terms: BTreeMap::new(),
            constant: value,
        }
    }

    /// A single-term expression `coefficient * variable`.
    pub fn term(var: VarId, coefficient: f64) -> Self {
        let mut expr = Self::new();
        expr.add_term(var, coefficient);
        expr
    }

    pub fn with_term(mut self, var: VarId, coefficient: f64) -> Self {
        self.add_term(var, coefficient);
        self
    }

    /// Accumulate `coefficient * variable` into the expression.
    pub fn add_term(&mut self, var: VarId, coefficient: f64) {
        let entry = self.terms.entry(var).or_insert(0.0);
        *entry += coefficient;
        if entry.abs() < 1e-12 {
            self.terms.remove(&var);
        }
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    pub fn scaled(mut self, factor: f64) -> Self {
        for coefficient in self.terms.values_mut() {
            *coefficient *= factor;
        }
        self.constant *= factor;
        // Rescaling can zero nothing, but a zero factor zeroes everything
        if factor == 0.0 {
            self.terms.clear();
        }
        self
    }

    pub fn constant_value(&self) -> f64 {
        self.constant
    }

    pub fn terms(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.terms.iter().map(|(var, coefficient)| (*var, *coefficient))
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// True if the expression has no variable terms.
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluate the expression against a primal value array indexed by VarId.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.constant
            + self
                .terms
                .iter()
                .map(|(var, coefficient)| coefficient * values.get(var.value()).copied().unwrap_or(0.0))
                .sum::<f64>()
    }
}

impl std::ops::Add for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: LinearExpr) -> LinearExpr {
        self += rhs;
        self
    }
}

impl std::ops::AddAssign for LinearExpr {
    fn add_assign(&mut self, rhs: LinearExpr) {
        for (var, coefficient) in rhs.terms {
            self.add_term(var, coefficient);
        }
        self.constant += rhs.constant;
    }
}

/// Sense of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintSense {
    LessEqual,
    GreaterEqual,
    Equal,
}

/// A linear constraint `expr (sense) rhs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintDef {
    pub name: String,
    pub expr: LinearExpr,
    pub sense: ConstraintSense,
    pub rhs: f64,
}

/// Mutable model under construction.
///
/// Plugins add variables and constraints through this builder during the
/// build-components pass; [`Self::finish`] seals it into a [`ModelProblem`].
#[derive(Debug, Default)]
pub struct ModelBuilder {
    variables: Vec<VariableDef>,
    var_index: HashMap<String, VarId>,
    constraints: Vec<ConstraintDef>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable; the name must be unique within the build.
    pub fn add_variable(&mut self, name: impl Into<String>, domain: VarDomain) -> CepResult<VarId> {
        let name = name.into();
        if self.var_index.contains_key(&name) {
            return Err(CepError::Config(format!(
                "variable '{}' is already defined",
                name
            )));
        }
        let id = VarId::new(self.variables.len());
        self.var_index.insert(name.clone(), id);
        self.variables.push(VariableDef { name, domain });
        Ok(id)
    }

    pub fn add_continuous(
        &mut self,
        name: impl Into<String>,
        lb: f64,
        ub: f64,
    ) -> CepResult<VarId> {
        self.add_variable(name, VarDomain::Continuous { lb, ub })
    }

    pub fn add_binary(&mut self, name: impl Into<String>) -> CepResult<VarId> {
        self.add_variable(name, VarDomain::Binary)
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        expr: LinearExpr,
        sense: ConstraintSense,
        rhs: f64,
    ) {
        self.constraints.push(ConstraintDef {
            name: name.into(),
            expr,
            sense,
            rhs,
        });
    }

    /// Look up a variable by name.
    pub fn variable(&self, name: &str) -> Option<VarId> {
        self.var_index.get(name).copied()
    }

    /// Look up a variable by name, failing with a configuration error.
    pub fn require_variable(&self, name: &str) -> CepResult<VarId> {
        self.variable(name)
            .ok_or_else(|| CepError::Config(format!("variable '{}' is not defined", name)))
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Seal the builder into an immutable problem with the given objective.
    pub fn finish(self, objective: LinearExpr) -> ModelProblem {
        ModelProblem {
            variables: self.variables,
            constraints: self.constraints,
            objective,
        }
    }
}

/// The fully assembled optimization problem, handed to the external solver.
///
/// The objective is always minimized. Primal/dual results come back as
/// numeric arrays keyed by the same variable/constraint indices this
/// structure defines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelProblem {
    pub variables: Vec<VariableDef>,
    pub constraints: Vec<ConstraintDef>,
    pub objective: LinearExpr,
}

impl ModelProblem {
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Look up a variable id by name.
    pub fn variable(&self, name: &str) -> Option<VarId> {
        self.variables
            .iter()
            .position(|v| v.name == name)
            .map(VarId::new)
    }

    /// Count binary/integer variables (useful for logging problem class).
    pub fn num_discrete_variables(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| !matches!(v.domain, VarDomain::Continuous { .. }))
            .count()
    }
}
