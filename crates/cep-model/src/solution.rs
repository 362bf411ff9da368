//! Solution representation and the external-solver boundary.
//!
//! The solver is an external collaborator: one opaque, blocking call that
//! returns primal/dual values or a terminal status. This core never
//! retries or auto-relaxes; an infeasible, unbounded, or timed-out stage
//! is surfaced verbatim to whatever orchestrates the stage sequence.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::problem::{ModelProblem, VarId};

/// Status of the solver solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionStatus {
    /// Optimal solution found.
    Optimal,
    /// Problem is infeasible.
    Infeasible,
    /// Problem is unbounded.
    Unbounded,
    /// Solver timed out.
    Timeout,
    /// Solver hit iteration limit.
    IterationLimit,
    /// Numerical difficulties.
    NumericalError,
    /// Generic error occurred.
    Error,
    /// Solution status unknown.
    Unknown,
}

impl SolutionStatus {
    /// Check if this status represents a successful solve.
    pub fn is_success(&self) -> bool {
        matches!(self, SolutionStatus::Optimal)
    }

    /// Check if this status represents a failure.
    pub fn is_failure(&self) -> bool {
        !self.is_success() && !matches!(self, SolutionStatus::Unknown)
    }
}

impl std::fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolutionStatus::Optimal => write!(f, "optimal"),
            SolutionStatus::Infeasible => write!(f, "infeasible"),
            SolutionStatus::Unbounded => write!(f, "unbounded"),
            SolutionStatus::Timeout => write!(f, "timeout"),
            SolutionStatus::IterationLimit => write!(f, "iteration_limit"),
            SolutionStatus::NumericalError => write!(f, "numerical_error"),
            SolutionStatus::Error => write!(f, "error"),
            SolutionStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Solution returned by the external solver.
///
/// Primal values are indexed by [`VarId`]; duals by constraint position in
/// the [`ModelProblem`] that produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Solution status.
    pub status: SolutionStatus,

    /// Objective value.
    pub objective: f64,

    /// Primal variable values, indexed by VarId.
    pub variable_values: Vec<f64>,

    /// Dual values, indexed by constraint position.
    pub duals: Vec<f64>,

    /// Solve time in milliseconds.
    pub solve_time_ms: i64,

    /// Error message (if status is error/infeasible).
    pub error_message: Option<String>,
}

impl Solution {
    /// Create an empty solution with error status.
    pub fn error(message: &str) -> Self {
        Self {
            status: SolutionStatus::Error,
            objective: f64::NAN,
            variable_values: Vec::new(),
            duals: Vec::new(),
            solve_time_ms: 0,
            error_message: Some(message.to_string()),
        }
    }

    /// Create an infeasible solution.
    pub fn infeasible(message: &str) -> Self {
        Self {
            status: SolutionStatus::Infeasible,
            ..Self::error(message)
        }
    }

    /// Create a timeout solution.
    pub fn timeout(seconds: u64) -> Self {
        Self {
            status: SolutionStatus::Timeout,
            error_message: Some(format!("Solver timed out after {} seconds", seconds)),
            ..Self::error("")
        }
    }

    /// Check if solution is optimal.
    pub fn is_optimal(&self) -> bool {
        self.status.is_success()
    }

    /// Primal value of a variable, if present.
    pub fn value(&self, var: VarId) -> Option<f64> {
        self.variable_values.get(var.value()).copied()
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::error("No solution")
    }
}

/// Trait for the external solver boundary.
///
/// Implementations wrap whatever numerical backend the deployment uses.
/// The call blocks until the solver returns; there are no cancellation
/// semantics exposed to this core.
pub trait Solver {
    /// The solver name (e.g., "cbc", "highs").
    fn name(&self) -> &'static str;

    /// Solve the given problem.
    ///
    /// The implementation should:
    /// 1. Translate `ModelProblem` into the backend's input format
    /// 2. Run the backend to completion
    /// 3. Map the backend's termination condition onto [`SolutionStatus`]
    fn solve(&self, problem: &ModelProblem) -> Result<Solution>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_success_and_failure() {
        assert!(SolutionStatus::Optimal.is_success());
        assert!(!SolutionStatus::Optimal.is_failure());
        assert!(SolutionStatus::Infeasible.is_failure());
        assert!(SolutionStatus::Timeout.is_failure());
        assert!(!SolutionStatus::Unknown.is_failure());
    }

    #[test]
    fn test_solution_constructors() {
        let sol = Solution::infeasible("no feasible dispatch");
        assert_eq!(sol.status, SolutionStatus::Infeasible);
        assert!(!sol.is_optimal());

        let sol = Solution::timeout(300);
        assert_eq!(sol.status, SolutionStatus::Timeout);
        assert!(sol.error_message.unwrap().contains("300"));
    }

    #[test]
    fn test_value_lookup() {
        let sol = Solution {
            status: SolutionStatus::Optimal,
            objective: 10.0,
            variable_values: vec![1.0, 0.0, 42.0],
            duals: Vec::new(),
            solve_time_ms: 3,
            error_message: None,
        };
        assert_eq!(sol.value(VarId::new(2)), Some(42.0));
        assert_eq!(sol.value(VarId::new(9)), None);
    }
}
