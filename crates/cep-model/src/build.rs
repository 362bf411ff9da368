//! Stage-model assembly.
//!
//! The build is strictly ordered: load registries for every type family
//! the scenario uses, run the register-phase dispatch (every entity's
//! build-components hook), finalize the accumulator, then emit the
//! system-wide constraints and objective from the finalized aggregates.
//! The resulting [`StageModel`] is handed to the external solver by the
//! stage runner.

use std::collections::HashMap;

use cep_core::{
    CepResult, CommitmentLedger, CommitmentState, LoadZone, Project, ReserveArea, StageId,
    StageOrder, TemporalModel, TimepointId, TransmissionLine,
};
use tracing::info;

use crate::components::{ComponentKey, ExprIndex};
use crate::context::BuildCtx;
use crate::data::DataStore;
use crate::dispatch::{self, Tagged};
use crate::plugin::{
    contract, AvailabilityType, CapacityType, EntityRef, OperationalType, ReliabilityType,
    ReserveType, TxOperationalType,
};
use crate::plugins::{self, var_names};
use crate::problem::{ConstraintSense, LinearExpr, ModelProblem, VarId};
use crate::registry::Registry;

/// The loaded registries for every capability family a scenario uses.
#[derive(Debug)]
pub struct StageRegistries {
    pub capacity: Registry<dyn CapacityType>,
    pub operational: Registry<dyn OperationalType>,
    pub availability: Registry<dyn AvailabilityType>,
    pub reserve: Registry<dyn ReserveType>,
    pub reliability: Registry<dyn ReliabilityType>,
    pub tx_operational: Registry<dyn TxOperationalType>,
}

/// Load registries from the tags the scenario's entities declare.
///
/// Fails fast on an unknown tag or an implementation that does not meet
/// its family's capability contract.
pub fn load_registries(
    projects: &[Project],
    lines: &[TransmissionLine],
    areas: &[ReserveArea],
) -> CepResult<StageRegistries> {
    Ok(StageRegistries {
        capacity: Registry::load(
            contract::CAPACITY_FAMILY,
            projects.iter().map(|p| p.capacity_type.as_str()),
            plugins::capacity::resolve,
            contract::CAPACITY_REQUIRED_RULES,
        )?,
        operational: Registry::load(
            contract::OPERATIONAL_FAMILY,
            projects.iter().map(|p| p.operational_type.as_str()),
            plugins::operational::resolve,
            contract::OPERATIONAL_REQUIRED_RULES,
        )?,
        availability: Registry::load(
            contract::AVAILABILITY_FAMILY,
            projects.iter().map(|p| p.availability_type.as_str()),
            plugins::availability::resolve,
            contract::AVAILABILITY_REQUIRED_RULES,
        )?,
        reserve: Registry::load(
            contract::RESERVE_FAMILY,
            areas.iter().map(|a| a.reserve_type.as_str()),
            plugins::reserve::resolve,
            contract::RESERVE_REQUIRED_RULES,
        )?,
        reliability: Registry::load(
            contract::RELIABILITY_FAMILY,
            projects.iter().filter_map(|p| p.reliability_type.as_deref()),
            plugins::reliability::resolve,
            contract::RELIABILITY_REQUIRED_RULES,
        )?,
        tx_operational: Registry::load(
            contract::TX_OPERATIONAL_FAMILY,
            lines.iter().map(|l| l.operational_type.as_str()),
            plugins::transmission::resolve,
            contract::TX_OPERATIONAL_REQUIRED_RULES,
        )?,
    })
}

/// Everything one stage-model build reads.
pub struct StageInputs<'a> {
    pub temporal: &'a TemporalModel,
    pub stage: StageId,
    pub stage_name: &'a str,
    pub stage_order: &'a StageOrder,
    pub zones: &'a [LoadZone],
    pub projects: &'a [Project],
    pub lines: &'a [TransmissionLine],
    pub areas: &'a [ReserveArea],
    pub data: &'a DataStore,
    pub ledger: Option<&'a CommitmentLedger>,
}

/// An assembled stage model, ready for the external solver.
#[derive(Debug)]
pub struct StageModel {
    pub stage: StageId,
    pub stage_name: String,
    pub problem: ModelProblem,
    /// Commitment variables whose solved values must be exported for
    /// later stages: (project, timepoint, variable)
    pub commitments_to_export: Vec<(String, TimepointId, VarId)>,
}

/// Build the optimization model for one stage.
pub fn build_stage_model(
    registries: &StageRegistries,
    inputs: &StageInputs,
) -> CepResult<StageModel> {
    info!(stage = inputs.stage_name, "building stage model");

    // Commitment states follow stage order, never execution order
    let mut states = HashMap::new();
    for project in inputs.projects {
        let state = inputs
            .stage_order
            .commitment_state(inputs.stage_name, project.final_commitment_stage.as_deref())?;
        states.insert(project.name.clone(), state);
    }

    let stage_tmps = inputs.temporal.timepoints_in_stage(inputs.stage);

    // Effective availability via the availability-type rules
    let mut derates = HashMap::new();
    for project in inputs.projects {
        let availability = registries.availability.get(&project.availability_type)?;
        for &tmp in &stage_tmps {
            let derate = availability.availability_derate(project, tmp, inputs.data)?;
            if derate != 1.0 {
                derates.insert((project.name.clone(), tmp), derate);
            }
        }
    }

    let mut ctx = BuildCtx::new(inputs.temporal, inputs.stage, inputs.stage_name, inputs.data)
        .with_commitment_states(states.clone(), inputs.ledger)
        .with_availability_derates(derates);

    // Register-phase dispatch: every entity's build-components hook
    let capacity_tagged: Vec<Tagged> = inputs
        .projects
        .iter()
        .map(|p| Tagged::new(&p.capacity_type, EntityRef::Project(p)))
        .collect();
    dispatch::build_pass(&registries.capacity, &capacity_tagged, &mut ctx)?;

    let operational_tagged: Vec<Tagged> = inputs
        .projects
        .iter()
        .map(|p| Tagged::new(&p.operational_type, EntityRef::Project(p)))
        .collect();
    dispatch::build_pass(&registries.operational, &operational_tagged, &mut ctx)?;

    let tx_tagged: Vec<Tagged> = inputs
        .lines
        .iter()
        .map(|l| Tagged::new(&l.operational_type, EntityRef::TransmissionLine(l)))
        .collect();
    dispatch::build_pass(&registries.tx_operational, &tx_tagged, &mut ctx)?;

    let reserve_tagged: Vec<Tagged> = inputs
        .areas
        .iter()
        .map(|a| Tagged::new(&a.reserve_type, EntityRef::ReserveArea(a)))
        .collect();
    dispatch::build_pass(&registries.reserve, &reserve_tagged, &mut ctx)?;

    let reliability_tagged: Vec<Tagged> = inputs
        .projects
        .iter()
        .filter_map(|p| {
            p.reliability_type
                .as_deref()
                .map(|tag| Tagged::new(tag, EntityRef::Project(p)))
        })
        .collect();
    dispatch::build_pass(&registries.reliability, &reliability_tagged, &mut ctx)?;

    // Close the register phase; aggregates are readable from here on
    ctx.finalize_components()?;

    let production = ctx
        .aggregates()?
        .expressions(ComponentKey::LoadBalanceProductionComponents);
    let consumption = ctx
        .aggregates()?
        .expressions(ComponentKey::LoadBalanceConsumptionComponents);

    // Load balance per (zone, timepoint)
    let mut unserved_penalty = LinearExpr::new();
    for zone in inputs.zones {
        for &tmp in &stage_tmps {
            let index = ExprIndex::ZoneTimepoint(zone.name.clone(), tmp);
            let mut balance = production.get(&index).cloned().unwrap_or_default();
            if let Some(consumed) = consumption.get(&index) {
                balance += consumed.clone().scaled(-1.0);
            }
            if zone.allow_unserved_energy {
                let unserved = ctx.model.add_continuous(
                    var_names::unserved_energy(&zone.name, tmp),
                    0.0,
                    f64::INFINITY,
                )?;
                balance.add_term(unserved, 1.0);
                if let Some(timepoint) = inputs.temporal.timepoint(tmp) {
                    if !timepoint.spinup_or_lookahead {
                        let weight = inputs
                            .temporal
                            .period(timepoint.period)
                            .map(|p| p.objective_weight())
                            .unwrap_or(1.0)
                            * timepoint.weight
                            * timepoint.number_of_hours;
                        unserved_penalty
                            .add_term(unserved, zone.unserved_energy_penalty_per_mwh * weight);
                    }
                }
            }
            ctx.model.add_constraint(
                format!("load_balance__{}__{}", zone.name, tmp.value()),
                balance,
                ConstraintSense::Equal,
                inputs.data.zone_demand(&zone.name, tmp),
            );
        }
    }

    // Reserve requirements per (area, timepoint)
    let provision = ctx
        .aggregates()?
        .expressions(ComponentKey::ReserveProvisionComponents);
    for area in inputs.areas {
        for &tmp in &stage_tmps {
            let index = ExprIndex::AreaTimepoint(area.name.clone(), tmp);
            let expr = provision.get(&index).cloned().unwrap_or_default();
            ctx.model.add_constraint(
                format!("reserve_requirement__{}__{}", area.name, tmp.value()),
                expr,
                ConstraintSense::GreaterEqual,
                area.requirement_mw,
            );
        }
    }

    // Planning reserve margin per period, where a requirement is given
    let prm = ctx
        .aggregates()?
        .expressions(ComponentKey::PrmContributionComponents);
    for period in inputs.temporal.periods() {
        if let Some(requirement) = inputs.data.prm_requirement(period.id) {
            let expr = prm
                .get(&ExprIndex::Period(period.id))
                .cloned()
                .unwrap_or_default();
            ctx.model.add_constraint(
                format!("planning_reserve_margin__{}", period.id.value()),
                expr,
                ConstraintSense::GreaterEqual,
                requirement,
            );
        }
    }

    // Objective: finalized cost aggregates plus system-level penalties
    let mut objective = LinearExpr::new();
    for key in [
        ComponentKey::CapitalCostComponents,
        ComponentKey::OperatingCostComponents,
        ComponentKey::PenaltyCostComponents,
    ] {
        objective += ctx.aggregates()?.total_expression(key);
    }
    objective += unserved_penalty;

    // Commitment variables the runner must export after the solve
    let mut commitments_to_export = Vec::new();
    for project in inputs.projects {
        if states.get(&project.name) == Some(&CommitmentState::Committing) {
            for &tmp in &stage_tmps {
                if let Some(var) = ctx.model.variable(&var_names::commit(&project.name, tmp)) {
                    commitments_to_export.push((project.name.clone(), tmp, var));
                }
            }
        }
    }

    info!(
        stage = inputs.stage_name,
        variables = ctx.model.num_variables(),
        constraints = ctx.model.num_constraints(),
        "stage model assembled"
    );

    Ok(StageModel {
        stage: inputs.stage,
        stage_name: inputs.stage_name.to_string(),
        problem: ctx.into_model().finish(objective),
        commitments_to_export,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ProjectParams;
    use cep_core::{
        Boundary, CepError, CommitmentRecord, Horizon, HorizonId, Period, PeriodId, Stage,
        Subproblem, SubproblemId, Timepoint,
    };

    fn two_stage_temporal() -> TemporalModel {
        let mut temporal = TemporalModel::new();
        temporal.add_period(Period::new(PeriodId::new(2030), 1.0, 1.0));
        temporal.add_subproblem(Subproblem::new(SubproblemId::new(1)));
        temporal.add_stage(Stage::new(StageId::new(1), "s1", SubproblemId::new(1)));
        temporal.add_stage(Stage::new(StageId::new(2), "s2", SubproblemId::new(1)));
        temporal.add_horizon(Horizon::new(
            HorizonId::new(1),
            "day",
            PeriodId::new(2030),
            Boundary::Circular,
        ));
        temporal.add_horizon(Horizon::new(
            HorizonId::new(2),
            "day",
            PeriodId::new(2030),
            Boundary::Circular,
        ));
        for i in 1..=4u64 {
            temporal.add_timepoint(Timepoint::new(
                TimepointId::new(i),
                PeriodId::new(2030),
                StageId::new(1),
            ));
            temporal.add_timepoint(
                Timepoint::new(TimepointId::new(100 + i), PeriodId::new(2030), StageId::new(2))
                    .with_previous_stage_timepoint(TimepointId::new(i)),
            );
        }
        temporal
            .assign_horizon(HorizonId::new(1), (1..=4).map(TimepointId::new).collect())
            .unwrap();
        temporal
            .assign_horizon(
                HorizonId::new(2),
                (101..=104).map(TimepointId::new).collect(),
            )
            .unwrap();
        temporal
    }

    fn fixture() -> (Vec<LoadZone>, Vec<Project>, Vec<TransmissionLine>, Vec<ReserveArea>, DataStore)
    {
        let zones = vec![
            LoadZone::new("north").with_unserved_energy(5e3),
            LoadZone::new("south").with_unserved_energy(5e3),
        ];
        let projects = vec![
            Project::new("coal_1", "north", "existing_gen", "thermal_commit")
                .with_final_commitment_stage("s1"),
            Project::new("wind_1", "south", "new_build_gen", "variable_gen"),
        ];
        let lines = vec![TransmissionLine::new(
            "north_south",
            "north",
            "south",
            "tx_simple",
        )
        .with_flow_limits(-200.0, 200.0)];
        let areas = vec![ReserveArea::new("ba", "spinning", 30.0)];

        let mut data = DataStore::new();
        data.set_project_params(
            "coal_1",
            ProjectParams::default()
                .with_capacity(300.0)
                .with_variable_cost(25.0)
                .with_commitment_costs(5_000.0, 1_000.0),
        );
        data.set_project_params(
            "wind_1",
            ProjectParams::default()
                .with_capacity(200.0)
                .with_new_build_costs(80_000.0, 400.0),
        );
        for tmp in 1..=4u64 {
            data.set_zone_demand("north", TimepointId::new(tmp), 150.0);
            data.set_zone_demand("south", TimepointId::new(tmp), 80.0);
        }
        (zones, projects, lines, areas, data)
    }

    #[test]
    fn test_build_stage_model_first_stage() {
        let temporal = two_stage_temporal();
        let (zones, projects, lines, areas, data) = fixture();
        let registries = load_registries(&projects, &lines, &areas).unwrap();
        let order = StageOrder::from_names(vec!["s1", "s2"]).unwrap();

        let model = build_stage_model(
            &registries,
            &StageInputs {
                temporal: &temporal,
                stage: StageId::new(1),
                stage_name: "s1",
                stage_order: &order,
                zones: &zones,
                projects: &projects,
                lines: &lines,
                areas: &areas,
                data: &data,
                ledger: None,
            },
        )
        .unwrap();

        // Free commitment decision at every timepoint of the stage
        assert_eq!(model.commitments_to_export.len(), 4);
        assert!(model.problem.num_discrete_variables() >= 4);
        // Load balance for 2 zones x 4 timepoints, reserve for 1 area x 4
        let balance_count = model
            .problem
            .constraints
            .iter()
            .filter(|c| c.name.starts_with("load_balance__"))
            .count();
        assert_eq!(balance_count, 8);
        let reserve_count = model
            .problem
            .constraints
            .iter()
            .filter(|c| c.name.starts_with("reserve_requirement__"))
            .count();
        assert_eq!(reserve_count, 4);
        // Objective carries operating, capital, and penalty components
        assert!(model.problem.objective.num_terms() > 0);
    }

    #[test]
    fn test_build_second_stage_fixes_commitments() {
        let temporal = two_stage_temporal();
        let (zones, projects, lines, areas, data) = fixture();
        let registries = load_registries(&projects, &lines, &areas).unwrap();
        let order = StageOrder::from_names(vec!["s1", "s2"]).unwrap();

        let mut ledger = CommitmentLedger::new();
        for tmp in 1..=4u64 {
            ledger.insert(CommitmentRecord {
                project: "coal_1".into(),
                timepoint: TimepointId::new(tmp),
                stage: "s1".into(),
                committed: 1.0,
            });
        }

        let model = build_stage_model(
            &registries,
            &StageInputs {
                temporal: &temporal,
                stage: StageId::new(2),
                stage_name: "s2",
                stage_order: &order,
                zones: &zones,
                projects: &projects,
                lines: &lines,
                areas: &areas,
                data: &data,
                ledger: Some(&ledger),
            },
        )
        .unwrap();

        // Nothing to export, and no commitment variables exist
        assert!(model.commitments_to_export.is_empty());
        assert!(model
            .problem
            .variable(&var_names::commit("coal_1", TimepointId::new(101)))
            .is_none());
    }

    #[test]
    fn test_build_second_stage_without_ledger_fails() {
        let temporal = two_stage_temporal();
        let (zones, projects, lines, areas, data) = fixture();
        let registries = load_registries(&projects, &lines, &areas).unwrap();
        let order = StageOrder::from_names(vec!["s1", "s2"]).unwrap();

        let err = build_stage_model(
            &registries,
            &StageInputs {
                temporal: &temporal,
                stage: StageId::new(2),
                stage_name: "s2",
                stage_order: &order,
                zones: &zones,
                projects: &projects,
                lines: &lines,
                areas: &areas,
                data: &data,
                ledger: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, CepError::MissingPassThroughData { .. }));
    }

    #[test]
    fn test_load_registries_unknown_tag_fails() {
        let projects = vec![Project::new("x", "north", "unknown_type", "thermal_commit")];
        let err = load_registries(&projects, &[], &[]).unwrap_err();
        assert!(matches!(err, CepError::UnknownTypeTag { .. }));
        assert!(err.to_string().contains("unknown_type"));
    }
}
