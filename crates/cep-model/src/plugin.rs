//! Plugin capability contracts.
//!
//! Each capability family (capacity, operational, availability, reserve,
//! reliability, transmission-operational) is a trait. A family's *required
//! rules* have default bodies that fail with a missing-capability error;
//! an implementation must both override them and list them in
//! [`ComponentType::provided_rules`], which the registry loader
//! cross-checks at load time. *Optional* lifecycle hooks have no-op
//! default bodies, so absence is a no-op rather than an error and no
//! runtime introspection is ever needed.

use std::path::Path;

use cep_core::{
    CepError, CepResult, Diagnostics, PeriodId, Project, ReserveArea, StageId, TemporalModel,
    TimepointId, TransmissionLine,
};
use serde::{Deserialize, Serialize};

use crate::context::BuildCtx;
use crate::data::DataStore;
use crate::problem::{LinearExpr, ModelProblem};
use crate::solution::Solution;

/// Required-rule lists per capability family.
pub mod contract {
    pub const CAPACITY_FAMILY: &str = "capacity";
    pub const OPERATIONAL_FAMILY: &str = "operational";
    pub const AVAILABILITY_FAMILY: &str = "availability";
    pub const RESERVE_FAMILY: &str = "reserve";
    pub const RELIABILITY_FAMILY: &str = "reliability";
    pub const TX_OPERATIONAL_FAMILY: &str = "tx_operational";

    pub const CAPACITY_REQUIRED_RULES: &[&str] = &["capacity_rule", "capacity_cost_rule"];
    pub const OPERATIONAL_REQUIRED_RULES: &[&str] = &[
        "power_provision_rule",
        "startup_cost_rule",
        "shutdown_cost_rule",
        "startup_fuel_burn_rule",
    ];
    pub const AVAILABILITY_REQUIRED_RULES: &[&str] = &["availability_derate_rule"];
    pub const RESERVE_REQUIRED_RULES: &[&str] = &["reserve_provision_rule"];
    pub const RELIABILITY_REQUIRED_RULES: &[&str] = &["prm_contribution_rule"];
    pub const TX_OPERATIONAL_REQUIRED_RULES: &[&str] = &["transmit_power_rule"];
}

/// Error for a required rule invoked on a type that does not provide it.
///
/// Normally unreachable: the registry loader rejects such types before any
/// rule is dispatched.
pub fn rule_not_provided(family: &'static str, tag: &str, rule: &'static str) -> CepError {
    CepError::MissingCapability {
        family,
        tag: tag.to_string(),
        rule,
    }
}

/// A reference to any entity a plugin can be dispatched over.
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    Project(&'a Project),
    TransmissionLine(&'a TransmissionLine),
    ReserveArea(&'a ReserveArea),
}

impl<'a> EntityRef<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            EntityRef::Project(p) => &p.name,
            EntityRef::TransmissionLine(l) => &l.name,
            EntityRef::ReserveArea(a) => &a.name,
        }
    }

    pub fn project(&self) -> CepResult<&'a Project> {
        match self {
            EntityRef::Project(p) => Ok(p),
            _ => Err(CepError::Config(format!(
                "entity '{}' is not a project",
                self.name()
            ))),
        }
    }

    pub fn transmission_line(&self) -> CepResult<&'a TransmissionLine> {
        match self {
            EntityRef::TransmissionLine(l) => Ok(l),
            _ => Err(CepError::Config(format!(
                "entity '{}' is not a transmission line",
                self.name()
            ))),
        }
    }

    pub fn reserve_area(&self) -> CepResult<&'a ReserveArea> {
        match self {
            EntityRef::ReserveArea(a) => Ok(a),
            _ => Err(CepError::Config(format!(
                "entity '{}' is not a reserve area",
                self.name()
            ))),
        }
    }
}

/// One exported result value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    pub entity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timepoint: Option<TimepointId>,
    pub field: String,
    pub value: f64,
}

/// Read-only view of a solved stage model, handed to export hooks.
pub struct ExportView<'a> {
    pub temporal: &'a TemporalModel,
    pub stage: StageId,
    pub problem: &'a ModelProblem,
    pub solution: &'a Solution,
}

impl ExportView<'_> {
    /// Primal value of a variable by name, if it exists and was solved.
    pub fn value_of(&self, var_name: &str) -> Option<f64> {
        self.problem
            .variable(var_name)
            .and_then(|var| self.solution.value(var))
    }
}

/// Lifecycle hooks shared by every capability family.
///
/// All hooks are optional: the default bodies are no-ops, so a type that
/// has nothing to do at a lifecycle point simply doesn't override it.
pub trait ComponentType {
    /// The type tag this implementation answers to.
    fn name(&self) -> &'static str;

    /// Rules this implementation provides, checked against the family's
    /// required list at registry load time.
    fn provided_rules(&self) -> &'static [&'static str] {
        &[]
    }

    /// Build model components (variables, constraints, accumulator
    /// registrations) for one entity.
    fn build_components(&self, entity: &EntityRef, ctx: &mut BuildCtx) -> CepResult<()> {
        let _ = (entity, ctx);
        Ok(())
    }

    /// Load this type's own parameter tables for one entity.
    fn load_data(
        &self,
        entity: &EntityRef,
        inputs_dir: &Path,
        data: &mut DataStore,
    ) -> CepResult<()> {
        let _ = (entity, inputs_dir, data);
        Ok(())
    }

    /// Extract result rows for one entity from a solved stage model.
    fn export_results(&self, entity: &EntityRef, view: &ExportView) -> CepResult<Vec<ResultRow>> {
        let _ = (entity, view);
        Ok(Vec::new())
    }

    /// Absorb previously exported result rows (e.g., for warm starts).
    fn import_results(
        &self,
        entity: &EntityRef,
        rows: &[ResultRow],
        data: &mut DataStore,
    ) -> CepResult<()> {
        let _ = (entity, rows, data);
        Ok(())
    }

    /// Validate this type's input data for one entity.
    ///
    /// Findings go into `diag`; a returned `Err` is itself recorded as a
    /// diagnostic by the validation pass and never aborts the pass.
    fn validate(
        &self,
        entity: &EntityRef,
        data: &DataStore,
        diag: &mut Diagnostics,
    ) -> CepResult<()> {
        let _ = (entity, data, diag);
        Ok(())
    }
}

/// Capacity types: how much of a project exists in each period, at what cost.
pub trait CapacityType: ComponentType {
    /// Available capacity of the project in a period (MW).
    fn capacity(&self, project: &Project, period: PeriodId, ctx: &BuildCtx) -> CepResult<LinearExpr> {
        let _ = (project, period, ctx);
        Err(rule_not_provided(
            contract::CAPACITY_FAMILY,
            self.name(),
            "capacity_rule",
        ))
    }

    /// Capacity-related cost of the project in a period ($).
    fn capacity_cost(
        &self,
        project: &Project,
        period: PeriodId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let _ = (project, period, ctx);
        Err(rule_not_provided(
            contract::CAPACITY_FAMILY,
            self.name(),
            "capacity_cost_rule",
        ))
    }
}

/// Operational types: how a project dispatches within a timepoint.
pub trait OperationalType: ComponentType {
    /// Power delivered to the project's zone at a timepoint (MW).
    fn power_provision(
        &self,
        project: &Project,
        tmp: TimepointId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let _ = (project, tmp, ctx);
        Err(rule_not_provided(
            contract::OPERATIONAL_FAMILY,
            self.name(),
            "power_provision_rule",
        ))
    }

    /// Startup cost incurred at a timepoint ($).
    fn startup_cost(
        &self,
        project: &Project,
        tmp: TimepointId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let _ = (project, tmp, ctx);
        Err(rule_not_provided(
            contract::OPERATIONAL_FAMILY,
            self.name(),
            "startup_cost_rule",
        ))
    }

    /// Shutdown cost incurred at a timepoint ($).
    fn shutdown_cost(
        &self,
        project: &Project,
        tmp: TimepointId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let _ = (project, tmp, ctx);
        Err(rule_not_provided(
            contract::OPERATIONAL_FAMILY,
            self.name(),
            "shutdown_cost_rule",
        ))
    }

    /// Fuel burned by startups at a timepoint (MMBtu).
    fn startup_fuel_burn(
        &self,
        project: &Project,
        tmp: TimepointId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let _ = (project, tmp, ctx);
        Err(rule_not_provided(
            contract::OPERATIONAL_FAMILY,
            self.name(),
            "startup_fuel_burn_rule",
        ))
    }
}

impl std::fmt::Debug for dyn OperationalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationalType").field("name", &self.name()).finish()
    }
}

/// Availability types: exogenous derates on project capacity.
pub trait AvailabilityType: ComponentType {
    /// Fraction of capacity available at a timepoint (0..1).
    fn availability_derate(
        &self,
        project: &Project,
        tmp: TimepointId,
        data: &DataStore,
    ) -> CepResult<f64> {
        let _ = (project, tmp, data);
        Err(rule_not_provided(
            contract::AVAILABILITY_FAMILY,
            self.name(),
            "availability_derate_rule",
        ))
    }
}

/// Reserve types: provision toward a balancing area's requirement.
pub trait ReserveType: ComponentType {
    /// Reserve provided in an area at a timepoint (MW).
    fn reserve_provision(
        &self,
        area: &ReserveArea,
        tmp: TimepointId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let _ = (area, tmp, ctx);
        Err(rule_not_provided(
            contract::RESERVE_FAMILY,
            self.name(),
            "reserve_provision_rule",
        ))
    }
}

/// Reliability types: contributions toward the planning reserve margin.
pub trait ReliabilityType: ComponentType {
    /// Capacity credited toward the reserve margin in a period (MW).
    fn prm_contribution(
        &self,
        project: &Project,
        period: PeriodId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let _ = (project, period, ctx);
        Err(rule_not_provided(
            contract::RELIABILITY_FAMILY,
            self.name(),
            "prm_contribution_rule",
        ))
    }
}

/// Transmission operational types: power transfer between zones.
pub trait TxOperationalType: ComponentType {
    /// Power flowing on the line at a timepoint, from→to positive (MW).
    fn transmit_power(
        &self,
        line: &TransmissionLine,
        tmp: TimepointId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let _ = (line, tmp, ctx);
        Err(rule_not_provided(
            contract::TX_OPERATIONAL_FAMILY,
            self.name(),
            "transmit_power_rule",
        ))
    }
}
