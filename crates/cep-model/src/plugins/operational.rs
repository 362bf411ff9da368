//! Operational types: dispatch behavior within a timepoint.
//!
//! - `thermal_commit` - unit commitment with binary on/off decisions,
//!   minimum stable level, ramps, and startup/shutdown transitions. The
//!   commitment variables participate in the cross-stage pass-through.
//! - `variable_gen` - non-dispatchable output capped by a capacity factor.
//! - `storage` - charge/discharge with state-of-charge continuity across
//!   the balancing horizon.
//!
//! Ramp, transition, and state-of-charge constraints all go through
//! `TemporalModel::previous_timepoint`; the first timepoint of a linear
//! horizon simply skips them.

use std::path::Path;

use cep_core::{
    Adjacent, CepError, CepResult, CommitmentState, Diagnostics, Project, TimepointId,
};
use serde::Deserialize;

use crate::components::{ComponentKey, ExprIndex, SetMember};
use crate::context::BuildCtx;
use crate::data::DataStore;
use crate::plugin::{contract, ComponentType, EntityRef, ExportView, OperationalType, ResultRow};
use crate::plugins::var_names;
use crate::problem::{ConstraintSense, LinearExpr};

/// Resolve an operational type tag to its implementation.
pub fn resolve(tag: &str) -> Option<Box<dyn OperationalType>> {
    match tag {
        "thermal_commit" => Some(Box::new(ThermalCommit)),
        "variable_gen" => Some(Box::new(VariableGen)),
        "storage" => Some(Box::new(Storage)),
        _ => None,
    }
}

/// Committed thermal generation.
pub struct ThermalCommit;

const THERMAL_COMMIT_TMPS: &str = "thermal_commit_operational_timepoints";
const THERMAL_COMMIT_POWER: &str = "thermal_commit_power";
const THERMAL_COMMIT_COST: &str = "thermal_commit_operating_cost";

impl ComponentType for ThermalCommit {
    fn name(&self) -> &'static str {
        "thermal_commit"
    }

    fn provided_rules(&self) -> &'static [&'static str] {
        contract::OPERATIONAL_REQUIRED_RULES
    }

    fn build_components(&self, entity: &EntityRef, ctx: &mut BuildCtx) -> CepResult<()> {
        let project = entity.project()?;
        let temporal = ctx.temporal;
        let data = ctx.data;
        let params = data.project_params(&project.name)?.clone();
        let state = ctx.commitment_state(&project.name);

        ctx.register_component(ComponentKey::OperationalTimepointSets, THERMAL_COMMIT_TMPS)?;
        ctx.register_component(
            ComponentKey::LoadBalanceProductionComponents,
            THERMAL_COMMIT_POWER,
        )?;
        ctx.register_component(ComponentKey::OperatingCostComponents, THERMAL_COMMIT_COST)?;
        ctx.define_set(THERMAL_COMMIT_TMPS);
        ctx.define_expressions(THERMAL_COMMIT_POWER);
        ctx.define_expressions(THERMAL_COMMIT_COST);

        let tmps = temporal.timepoints_in_stage(ctx.stage);

        // First pass: variables, output bounds, and accumulator entries
        for &tmp in &tmps {
            let timepoint = temporal
                .timepoint(tmp)
                .ok_or_else(|| CepError::Config(format!("unknown timepoint {}", tmp.value())))?;
            let derate = ctx.availability_derate(&project.name, tmp);
            let available_mw = params.capacity_mw * derate;

            // A fixed commitment is a known constant, not a variable
            let commit_expr = match state {
                CommitmentState::Fixed => {
                    LinearExpr::constant(ctx.fixed_commitment(&project.name, tmp)?)
                }
                CommitmentState::Free | CommitmentState::Committing => {
                    let commit = ctx.model.add_binary(var_names::commit(&project.name, tmp))?;
                    LinearExpr::term(commit, 1.0)
                }
            };

            let power = ctx.model.add_continuous(
                var_names::power(&project.name, tmp),
                0.0,
                available_mw,
            )?;

            ctx.model.add_constraint(
                format!("{}__max_power__{}", project.name, tmp.value()),
                LinearExpr::term(power, 1.0) + commit_expr.clone().scaled(-available_mw),
                ConstraintSense::LessEqual,
                0.0,
            );
            if params.min_stable_level_fraction > 0.0 {
                ctx.model.add_constraint(
                    format!("{}__min_stable_level__{}", project.name, tmp.value()),
                    commit_expr
                        .clone()
                        .scaled(params.min_stable_level_fraction * available_mw)
                        + LinearExpr::term(power, -1.0),
                    ConstraintSense::LessEqual,
                    0.0,
                );
            }

            let mut startup_shutdown = None;
            if state != CommitmentState::Fixed {
                let start = ctx.model.add_continuous(
                    var_names::startup(&project.name, tmp),
                    0.0,
                    1.0,
                )?;
                let shut = ctx.model.add_continuous(
                    var_names::shutdown(&project.name, tmp),
                    0.0,
                    1.0,
                )?;
                startup_shutdown = Some((start, shut));
            }

            ctx.set_insert(
                THERMAL_COMMIT_TMPS,
                SetMember::ProjectTimepoint(project.name.clone(), tmp),
            );
            ctx.expr_add(
                THERMAL_COMMIT_POWER,
                ExprIndex::ZoneTimepoint(project.zone.clone(), tmp),
                LinearExpr::term(power, 1.0),
            );

            if !timepoint.spinup_or_lookahead {
                let period = temporal.period(timepoint.period).ok_or_else(|| {
                    CepError::Config(format!("unknown period {}", timepoint.period.value()))
                })?;
                let cost_weight = period.objective_weight() * timepoint.weight;
                let mut cost = LinearExpr::term(
                    power,
                    params.variable_cost_per_mwh * timepoint.number_of_hours * cost_weight,
                );
                if let Some((start, shut)) = startup_shutdown {
                    let startup_total = params.startup_cost
                        + params.startup_fuel_mmbtu * params.fuel_cost_per_mmbtu;
                    cost.add_term(start, startup_total * cost_weight);
                    cost.add_term(shut, params.shutdown_cost * cost_weight);
                }
                ctx.expr_add(THERMAL_COMMIT_COST, ExprIndex::Total, cost);
            }
        }

        // Second pass: constraints linking consecutive timepoints
        for &tmp in &tmps {
            let prev = match temporal.previous_timepoint(&project.balancing_type, tmp)? {
                Adjacent::Timepoint(prev) => prev,
                // First timepoint of a linear horizon: nothing to link to
                Adjacent::NotApplicable => continue,
            };

            if state != CommitmentState::Fixed {
                let commit = ctx
                    .model
                    .require_variable(&var_names::commit(&project.name, tmp))?;
                let commit_prev = ctx
                    .model
                    .require_variable(&var_names::commit(&project.name, prev))?;
                let start = ctx
                    .model
                    .require_variable(&var_names::startup(&project.name, tmp))?;
                let shut = ctx
                    .model
                    .require_variable(&var_names::shutdown(&project.name, tmp))?;
                ctx.model.add_constraint(
                    format!("{}__commit_transition__{}", project.name, tmp.value()),
                    LinearExpr::term(commit, 1.0)
                        .with_term(commit_prev, -1.0)
                        .with_term(start, -1.0)
                        .with_term(shut, 1.0),
                    ConstraintSense::Equal,
                    0.0,
                );
            }

            if params.ramp_rate_fraction_per_hour < 1.0 {
                let timepoint = temporal
                    .timepoint(tmp)
                    .ok_or_else(|| CepError::Config(format!("unknown timepoint {}", tmp.value())))?;
                let ramp_mw = params.ramp_rate_fraction_per_hour
                    * params.capacity_mw
                    * timepoint.number_of_hours;
                let power = ctx
                    .model
                    .require_variable(&var_names::power(&project.name, tmp))?;
                let power_prev = ctx
                    .model
                    .require_variable(&var_names::power(&project.name, prev))?;
                ctx.model.add_constraint(
                    format!("{}__ramp_up__{}", project.name, tmp.value()),
                    LinearExpr::term(power, 1.0).with_term(power_prev, -1.0),
                    ConstraintSense::LessEqual,
                    ramp_mw,
                );
                ctx.model.add_constraint(
                    format!("{}__ramp_down__{}", project.name, tmp.value()),
                    LinearExpr::term(power_prev, 1.0).with_term(power, -1.0),
                    ConstraintSense::LessEqual,
                    ramp_mw,
                );
            }
        }

        Ok(())
    }

    fn export_results(&self, entity: &EntityRef, view: &ExportView) -> CepResult<Vec<ResultRow>> {
        let project = entity.project()?;
        let mut rows = Vec::new();
        for tmp in view.temporal.timepoints_in_stage(view.stage) {
            let Some(timepoint) = view.temporal.timepoint(tmp) else {
                continue;
            };
            if timepoint.spinup_or_lookahead {
                continue;
            }
            if let Some(power) = view.value_of(&var_names::power(&project.name, tmp)) {
                rows.push(ResultRow {
                    entity: project.name.clone(),
                    timepoint: Some(tmp),
                    field: "power_mw".to_string(),
                    value: power,
                });
            }
            if let Some(commit) = view.value_of(&var_names::commit(&project.name, tmp)) {
                rows.push(ResultRow {
                    entity: project.name.clone(),
                    timepoint: Some(tmp),
                    field: "commitment".to_string(),
                    value: commit,
                });
            }
        }
        Ok(rows)
    }

    fn validate(
        &self,
        entity: &EntityRef,
        data: &DataStore,
        diag: &mut Diagnostics,
    ) -> CepResult<()> {
        let project = entity.project()?;
        let Some(params) = data.try_project_params(&project.name) else {
            diag.add(
                cep_core::DiagnosticIssue::new(
                    cep_core::Severity::Error,
                    "inputs",
                    "no parameters loaded",
                )
                .with_entity(&project.name)
                .with_source_module(self.name()),
            );
            return Ok(());
        };
        if params.capacity_mw <= 0.0 {
            diag.add(
                cep_core::DiagnosticIssue::new(
                    cep_core::Severity::Error,
                    "inputs",
                    "capacity must be positive for committed thermal projects",
                )
                .with_entity(&project.name)
                .with_source_module(self.name()),
            );
        }
        if !(0.0..=1.0).contains(&params.min_stable_level_fraction) {
            diag.add(
                cep_core::DiagnosticIssue::new(
                    cep_core::Severity::Error,
                    "inputs",
                    "minimum stable level must be a fraction in [0, 1]",
                )
                .with_entity(&project.name)
                .with_source_module(self.name()),
            );
        }
        Ok(())
    }
}

impl OperationalType for ThermalCommit {
    fn power_provision(
        &self,
        project: &Project,
        tmp: TimepointId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let power = ctx
            .model
            .require_variable(&var_names::power(&project.name, tmp))?;
        Ok(LinearExpr::term(power, 1.0))
    }

    fn startup_cost(
        &self,
        project: &Project,
        tmp: TimepointId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let params = ctx.data.project_params(&project.name)?;
        // No startup variable when the commitment is fixed
        Ok(match ctx.model.variable(&var_names::startup(&project.name, tmp)) {
            Some(start) => LinearExpr::term(start, params.startup_cost),
            None => LinearExpr::new(),
        })
    }

    fn shutdown_cost(
        &self,
        project: &Project,
        tmp: TimepointId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let params = ctx.data.project_params(&project.name)?;
        Ok(match ctx.model.variable(&var_names::shutdown(&project.name, tmp)) {
            Some(shut) => LinearExpr::term(shut, params.shutdown_cost),
            None => LinearExpr::new(),
        })
    }

    fn startup_fuel_burn(
        &self,
        project: &Project,
        tmp: TimepointId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let params = ctx.data.project_params(&project.name)?;
        Ok(match ctx.model.variable(&var_names::startup(&project.name, tmp)) {
            Some(start) => LinearExpr::term(start, params.startup_fuel_mmbtu),
            None => LinearExpr::new(),
        })
    }
}

/// Non-dispatchable renewable generation.
pub struct VariableGen;

const VARIABLE_GEN_TMPS: &str = "variable_gen_operational_timepoints";
const VARIABLE_GEN_POWER: &str = "variable_gen_power";
const VARIABLE_GEN_COST: &str = "variable_gen_operating_cost";

/// One row of the variable-gen profile table.
#[derive(Debug, Deserialize)]
struct ProfileRow {
    project: String,
    timepoint: u64,
    capacity_factor: f64,
}

impl ComponentType for VariableGen {
    fn name(&self) -> &'static str {
        "variable_gen"
    }

    fn provided_rules(&self) -> &'static [&'static str] {
        contract::OPERATIONAL_REQUIRED_RULES
    }

    /// Reads this type's own profile table; the core does not mediate it.
    fn load_data(
        &self,
        entity: &EntityRef,
        inputs_dir: &Path,
        data: &mut DataStore,
    ) -> CepResult<()> {
        let project = entity.project()?;
        let path = inputs_dir.join("variable_gen_profiles.csv");
        if !path.exists() {
            return Ok(());
        }
        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| CepError::Parse(format!("reading '{}': {}", path.display(), e)))?;
        for row in reader.deserialize() {
            let row: ProfileRow = row
                .map_err(|e| CepError::Parse(format!("parsing '{}': {}", path.display(), e)))?;
            if row.project == project.name {
                data.set_capacity_factor(
                    row.project,
                    TimepointId::new(row.timepoint),
                    row.capacity_factor,
                );
            }
        }
        Ok(())
    }

    fn build_components(&self, entity: &EntityRef, ctx: &mut BuildCtx) -> CepResult<()> {
        let project = entity.project()?;
        let temporal = ctx.temporal;
        let data = ctx.data;
        let params = data.project_params(&project.name)?.clone();

        ctx.register_component(ComponentKey::OperationalTimepointSets, VARIABLE_GEN_TMPS)?;
        ctx.register_component(
            ComponentKey::LoadBalanceProductionComponents,
            VARIABLE_GEN_POWER,
        )?;
        ctx.register_component(ComponentKey::OperatingCostComponents, VARIABLE_GEN_COST)?;
        ctx.define_set(VARIABLE_GEN_TMPS);
        ctx.define_expressions(VARIABLE_GEN_POWER);
        ctx.define_expressions(VARIABLE_GEN_COST);

        for tmp in temporal.timepoints_in_stage(ctx.stage) {
            let timepoint = temporal
                .timepoint(tmp)
                .ok_or_else(|| CepError::Config(format!("unknown timepoint {}", tmp.value())))?;
            let derate = ctx.availability_derate(&project.name, tmp);
            let max_output_mw =
                params.capacity_mw * derate * data.capacity_factor(&project.name, tmp);

            // Curtailment is implicit: output may fall below the resource profile
            let power =
                ctx.model
                    .add_continuous(var_names::power(&project.name, tmp), 0.0, max_output_mw)?;

            ctx.set_insert(
                VARIABLE_GEN_TMPS,
                SetMember::ProjectTimepoint(project.name.clone(), tmp),
            );
            ctx.expr_add(
                VARIABLE_GEN_POWER,
                ExprIndex::ZoneTimepoint(project.zone.clone(), tmp),
                LinearExpr::term(power, 1.0),
            );

            if !timepoint.spinup_or_lookahead && params.variable_cost_per_mwh != 0.0 {
                let period = temporal.period(timepoint.period).ok_or_else(|| {
                    CepError::Config(format!("unknown period {}", timepoint.period.value()))
                })?;
                let cost_weight = period.objective_weight() * timepoint.weight;
                ctx.expr_add(
                    VARIABLE_GEN_COST,
                    ExprIndex::Total,
                    LinearExpr::term(
                        power,
                        params.variable_cost_per_mwh * timepoint.number_of_hours * cost_weight,
                    ),
                );
            }
        }
        Ok(())
    }

    fn validate(
        &self,
        entity: &EntityRef,
        data: &DataStore,
        diag: &mut Diagnostics,
    ) -> CepResult<()> {
        let project = entity.project()?;
        if data.try_project_params(&project.name).is_none() {
            diag.add(
                cep_core::DiagnosticIssue::new(
                    cep_core::Severity::Error,
                    "inputs",
                    "no parameters loaded",
                )
                .with_entity(&project.name)
                .with_source_module(self.name()),
            );
        }
        Ok(())
    }
}

impl OperationalType for VariableGen {
    fn power_provision(
        &self,
        project: &Project,
        tmp: TimepointId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let power = ctx
            .model
            .require_variable(&var_names::power(&project.name, tmp))?;
        Ok(LinearExpr::term(power, 1.0))
    }

    fn startup_cost(
        &self,
        _project: &Project,
        _tmp: TimepointId,
        _ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        Ok(LinearExpr::new())
    }

    fn shutdown_cost(
        &self,
        _project: &Project,
        _tmp: TimepointId,
        _ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        Ok(LinearExpr::new())
    }

    fn startup_fuel_burn(
        &self,
        _project: &Project,
        _tmp: TimepointId,
        _ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        Ok(LinearExpr::new())
    }
}

/// Generic storage with state-of-charge continuity.
pub struct Storage;

const STORAGE_TMPS: &str = "storage_operational_timepoints";
const STORAGE_POWER: &str = "storage_power";
const STORAGE_COST: &str = "storage_operating_cost";

impl ComponentType for Storage {
    fn name(&self) -> &'static str {
        "storage"
    }

    fn provided_rules(&self) -> &'static [&'static str] {
        contract::OPERATIONAL_REQUIRED_RULES
    }

    fn build_components(&self, entity: &EntityRef, ctx: &mut BuildCtx) -> CepResult<()> {
        let project = entity.project()?;
        let temporal = ctx.temporal;
        let data = ctx.data;
        let params = data.project_params(&project.name)?.clone();
        let energy_capacity_mwh = params.capacity_mw * params.storage_duration_hours;

        ctx.register_component(ComponentKey::OperationalTimepointSets, STORAGE_TMPS)?;
        ctx.register_component(ComponentKey::LoadBalanceProductionComponents, STORAGE_POWER)?;
        ctx.register_component(ComponentKey::OperatingCostComponents, STORAGE_COST)?;
        ctx.define_set(STORAGE_TMPS);
        ctx.define_expressions(STORAGE_POWER);
        ctx.define_expressions(STORAGE_COST);

        let tmps = temporal.timepoints_in_stage(ctx.stage);

        for &tmp in &tmps {
            let timepoint = temporal
                .timepoint(tmp)
                .ok_or_else(|| CepError::Config(format!("unknown timepoint {}", tmp.value())))?;
            let derate = ctx.availability_derate(&project.name, tmp);
            let power_limit_mw = params.capacity_mw * derate;

            let discharge = ctx.model.add_continuous(
                var_names::power(&project.name, tmp),
                0.0,
                power_limit_mw,
            )?;
            let charge = ctx.model.add_continuous(
                var_names::charge(&project.name, tmp),
                0.0,
                power_limit_mw,
            )?;
            let _soc = ctx.model.add_continuous(
                var_names::soc(&project.name, tmp),
                0.0,
                energy_capacity_mwh,
            )?;

            ctx.set_insert(
                STORAGE_TMPS,
                SetMember::ProjectTimepoint(project.name.clone(), tmp),
            );
            // Net injection: discharging adds to the zone, charging draws from it
            ctx.expr_add(
                STORAGE_POWER,
                ExprIndex::ZoneTimepoint(project.zone.clone(), tmp),
                LinearExpr::term(discharge, 1.0).with_term(charge, -1.0),
            );

            if !timepoint.spinup_or_lookahead && params.variable_cost_per_mwh != 0.0 {
                let period = temporal.period(timepoint.period).ok_or_else(|| {
                    CepError::Config(format!("unknown period {}", timepoint.period.value()))
                })?;
                let cost_weight = period.objective_weight() * timepoint.weight;
                ctx.expr_add(
                    STORAGE_COST,
                    ExprIndex::Total,
                    LinearExpr::term(
                        discharge,
                        params.variable_cost_per_mwh * timepoint.number_of_hours * cost_weight,
                    ),
                );
            }
        }

        // State-of-charge continuity along the balancing horizon. The
        // first timepoint of a linear horizon has a free initial state.
        for &tmp in &tmps {
            let prev = match temporal.previous_timepoint(&project.balancing_type, tmp)? {
                Adjacent::Timepoint(prev) => prev,
                Adjacent::NotApplicable => continue,
            };
            let timepoint = temporal
                .timepoint(tmp)
                .ok_or_else(|| CepError::Config(format!("unknown timepoint {}", tmp.value())))?;
            let hours = timepoint.number_of_hours;

            let soc = ctx
                .model
                .require_variable(&var_names::soc(&project.name, tmp))?;
            let soc_prev = ctx
                .model
                .require_variable(&var_names::soc(&project.name, prev))?;
            let charge = ctx
                .model
                .require_variable(&var_names::charge(&project.name, tmp))?;
            let discharge = ctx
                .model
                .require_variable(&var_names::power(&project.name, tmp))?;

            ctx.model.add_constraint(
                format!("{}__soc_continuity__{}", project.name, tmp.value()),
                LinearExpr::term(soc, 1.0)
                    .with_term(soc_prev, -1.0)
                    .with_term(charge, -params.charging_efficiency * hours)
                    .with_term(discharge, hours / params.discharging_efficiency),
                ConstraintSense::Equal,
                0.0,
            );
        }

        Ok(())
    }

    fn validate(
        &self,
        entity: &EntityRef,
        data: &DataStore,
        diag: &mut Diagnostics,
    ) -> CepResult<()> {
        let project = entity.project()?;
        let Some(params) = data.try_project_params(&project.name) else {
            diag.add(
                cep_core::DiagnosticIssue::new(
                    cep_core::Severity::Error,
                    "inputs",
                    "no parameters loaded",
                )
                .with_entity(&project.name)
                .with_source_module(self.name()),
            );
            return Ok(());
        };
        if params.storage_duration_hours <= 0.0 {
            diag.add(
                cep_core::DiagnosticIssue::new(
                    cep_core::Severity::Error,
                    "inputs",
                    "storage duration must be positive",
                )
                .with_entity(&project.name)
                .with_source_module(self.name()),
            );
        }
        for (label, value) in [
            ("charging efficiency", params.charging_efficiency),
            ("discharging efficiency", params.discharging_efficiency),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                diag.add(
                    cep_core::DiagnosticIssue::new(
                        cep_core::Severity::Error,
                        "inputs",
                        format!("{} must be in (0, 1]", label),
                    )
                    .with_entity(&project.name)
                    .with_source_module(self.name()),
                );
            }
        }
        Ok(())
    }
}

impl OperationalType for Storage {
    fn power_provision(
        &self,
        project: &Project,
        tmp: TimepointId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let discharge = ctx
            .model
            .require_variable(&var_names::power(&project.name, tmp))?;
        let charge = ctx
            .model
            .require_variable(&var_names::charge(&project.name, tmp))?;
        Ok(LinearExpr::term(discharge, 1.0).with_term(charge, -1.0))
    }

    fn startup_cost(
        &self,
        _project: &Project,
        _tmp: TimepointId,
        _ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        Ok(LinearExpr::new())
    }

    fn shutdown_cost(
        &self,
        _project: &Project,
        _tmp: TimepointId,
        _ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        Ok(LinearExpr::new())
    }

    fn startup_fuel_burn(
        &self,
        _project: &Project,
        _tmp: TimepointId,
        _ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        Ok(LinearExpr::new())
    }
}
