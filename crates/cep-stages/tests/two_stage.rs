//! End-to-end two-stage scenario: a committed thermal project decides its
//! commitment in the first stage and runs with it fixed in the second.

use anyhow::Result;
use cep_core::{
    Boundary, CepError, Horizon, HorizonId, LoadZone, Period, PeriodId, Project, Stage, StageId,
    StageOrder, Subproblem, SubproblemId, TemporalModel, Timepoint, TimepointId,
};
use cep_model::{
    build_stage_model, load_registries, DataStore, ModelProblem, ProjectParams, Solution,
    SolutionStatus, Solver, StageInputs,
};
use cep_stages::{
    load_pass_through_manifest, load_scenario_data, run_stages, validate_scenario,
    StageRunnerConfig,
};

/// Deterministic stand-in for the external solver: commitment variables
/// solve to their timepoint id modulo 2, everything else to zero.
struct ParitySolver;

impl Solver for ParitySolver {
    fn name(&self) -> &'static str {
        "parity_test"
    }

    fn solve(&self, problem: &ModelProblem) -> Result<Solution> {
        let values: Vec<f64> = problem
            .variables
            .iter()
            .map(|v| {
                if v.name.contains("__commit__") {
                    let tmp: u64 = v
                        .name
                        .rsplit("__")
                        .next()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(0);
                    (tmp % 2) as f64
                } else {
                    0.0
                }
            })
            .collect();
        Ok(Solution {
            status: SolutionStatus::Optimal,
            objective: problem.objective.evaluate(&values),
            variable_values: values,
            duals: vec![0.0; problem.num_constraints()],
            solve_time_ms: 1,
            error_message: None,
        })
    }
}

/// Two periods, one subproblem, two stages; one circular 24-timepoint
/// horizon per (period, stage). Second-stage timepoints map back to the
/// first stage via the previous-stage-timepoint relation (id - 100).
fn build_temporal() -> TemporalModel {
    let mut temporal = TemporalModel::new();
    temporal.add_period(Period::new(PeriodId::new(2025), 1.0, 5.0));
    temporal.add_period(Period::new(PeriodId::new(2030), 0.8, 5.0));
    temporal.add_subproblem(Subproblem::new(SubproblemId::new(1)));
    temporal.add_stage(Stage::new(StageId::new(1), "s1", SubproblemId::new(1)));
    temporal.add_stage(Stage::new(StageId::new(2), "s2", SubproblemId::new(1)));

    let mut horizon_id = 1;
    for (stage, offset) in [(StageId::new(1), 0u64), (StageId::new(2), 100u64)] {
        for (i, period) in [PeriodId::new(2025), PeriodId::new(2030)].into_iter().enumerate() {
            let horizon = HorizonId::new(horizon_id);
            horizon_id += 1;
            temporal.add_horizon(Horizon::new(horizon, "day", period, Boundary::Circular));

            let first = offset + (i as u64) * 24 + 1;
            let members: Vec<TimepointId> = (first..first + 24).map(TimepointId::new).collect();
            for &tmp in &members {
                let mut timepoint = Timepoint::new(tmp, period, stage)
                    .with_weight(365.0)
                    .with_hour_of_day(((tmp.value() - first) % 24) as u8);
                if offset > 0 {
                    timepoint = timepoint
                        .with_previous_stage_timepoint(TimepointId::new(tmp.value() - offset));
                }
                temporal.add_timepoint(timepoint);
            }
            temporal.assign_horizon(horizon, members).unwrap();
        }
    }
    temporal
}

fn fixture() -> (Vec<LoadZone>, Vec<Project>, DataStore) {
    let zones = vec![LoadZone::new("north").with_unserved_energy(1e4)];
    let projects = vec![
        Project::new("coal_1", "north", "existing_gen", "thermal_commit")
            .with_final_commitment_stage("s1"),
    ];
    let mut data = DataStore::new();
    data.set_project_params(
        "coal_1",
        ProjectParams::default()
            .with_capacity(300.0)
            .with_variable_cost(25.0)
            .with_commitment_costs(5_000.0, 1_000.0)
            .with_min_stable_level(0.4),
    );
    for tmp in (1..=48).chain(101..=148) {
        data.set_zone_demand("north", TimepointId::new(tmp), 100.0);
    }
    (zones, projects, data)
}

#[test]
fn two_stage_run_passes_commitments_through() {
    let temporal = build_temporal();
    let (zones, projects, data) = fixture();
    let registries = load_registries(&projects, &[], &[]).unwrap();
    let order = StageOrder::from_names(vec!["s1", "s2"]).unwrap();
    let output = tempfile::tempdir().unwrap();

    let summary = run_stages(
        &registries,
        &StageRunnerConfig {
            temporal: &temporal,
            stage_order: &order,
            zones: &zones,
            projects: &projects,
            lines: &[],
            areas: &[],
            data: &data,
            solver: &ParitySolver,
            output_root: output.path().to_path_buf(),
            halt_on_failure: true,
        },
    )
    .unwrap();

    assert_eq!(summary.success, 2);
    assert_eq!(summary.failure, 0);

    // Stage 1: a free commitment decision at all 24 timepoints of both periods
    assert_eq!(summary.stages[0].commitments_exported, 48);
    // Stage 2: nothing left to commit
    assert_eq!(summary.stages[1].commitments_exported, 0);

    // The ledger carries stage 1's solved values
    assert_eq!(summary.ledger.len(), 48);
    for tmp in 1..=48u64 {
        let record = summary.ledger.get("coal_1", TimepointId::new(tmp)).unwrap();
        assert_eq!(record.stage, "s1");
        assert_eq!(record.committed, (tmp % 2) as f64);
    }

    // The persisted manifest matches the ledger
    let manifest =
        load_pass_through_manifest(&output.path().join("s1").join("commitments.json")).unwrap();
    assert_eq!(manifest.num_records, 48);
    assert!(manifest
        .records
        .iter()
        .all(|r| r.committed == (r.timepoint.value() % 2) as f64));

    assert!(output.path().join("run_manifest.json").exists());
    assert!(output.path().join("s1").join("results.json").exists());
}

#[test]
fn second_stage_model_fixes_commitments_to_recorded_values() {
    let temporal = build_temporal();
    let (zones, projects, data) = fixture();
    let registries = load_registries(&projects, &[], &[]).unwrap();
    let order = StageOrder::from_names(vec!["s1", "s2"]).unwrap();
    let output = tempfile::tempdir().unwrap();

    let summary = run_stages(
        &registries,
        &StageRunnerConfig {
            temporal: &temporal,
            stage_order: &order,
            zones: &zones,
            projects: &projects,
            lines: &[],
            areas: &[],
            data: &data,
            solver: &ParitySolver,
            output_root: output.path().to_path_buf(),
            halt_on_failure: true,
        },
    )
    .unwrap();

    let model = build_stage_model(
        &registries,
        &StageInputs {
            temporal: &temporal,
            stage: StageId::new(2),
            stage_name: "s2",
            stage_order: &order,
            zones: &zones,
            projects: &projects,
            lines: &[],
            areas: &[],
            data: &data,
            ledger: Some(&summary.ledger),
        },
    )
    .unwrap();

    // The commitment is not a decision variable in stage 2
    assert!(model
        .problem
        .variables
        .iter()
        .all(|v| !v.name.contains("__commit__")));

    // Fixed values flow into the output bound as constants:
    // timepoint 101 maps to stage-1 timepoint 1 (committed = 1), so
    // power <= 300 * 1; timepoint 102 maps to timepoint 2 (committed = 0)
    let on = model
        .problem
        .constraints
        .iter()
        .find(|c| c.name == "coal_1__max_power__101")
        .unwrap();
    assert!((on.expr.constant_value() + 300.0).abs() < 1e-9);
    let off = model
        .problem
        .constraints
        .iter()
        .find(|c| c.name == "coal_1__max_power__102")
        .unwrap();
    assert!(off.expr.constant_value().abs() < 1e-9);
}

#[test]
fn second_stage_without_pass_through_data_fails_at_load() {
    let temporal = build_temporal();
    let (zones, projects, data) = fixture();
    let registries = load_registries(&projects, &[], &[]).unwrap();
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
            lines: &[],
            areas: &[],
            data: &data,
            ledger: None,
        },
    )
    .unwrap_err();

    assert!(matches!(err, CepError::MissingPassThroughData { .. }));
}

#[test]
fn infeasible_stage_is_surfaced_verbatim_and_halts() {
    struct InfeasibleSolver;
    impl Solver for InfeasibleSolver {
        fn name(&self) -> &'static str {
            "infeasible_test"
        }
        fn solve(&self, _problem: &ModelProblem) -> Result<Solution> {
            Ok(Solution::infeasible("no feasible dispatch"))
        }
    }

    let temporal = build_temporal();
    let (zones, projects, data) = fixture();
    let registries = load_registries(&projects, &[], &[]).unwrap();
    let order = StageOrder::from_names(vec!["s1", "s2"]).unwrap();
    let output = tempfile::tempdir().unwrap();

    let summary = run_stages(
        &registries,
        &StageRunnerConfig {
            temporal: &temporal,
            stage_order: &order,
            zones: &zones,
            projects: &projects,
            lines: &[],
            areas: &[],
            data: &data,
            solver: &InfeasibleSolver,
            output_root: output.path().to_path_buf(),
            halt_on_failure: true,
        },
    )
    .unwrap();

    assert_eq!(summary.success, 0);
    assert_eq!(summary.failure, 1);
    assert_eq!(summary.stages[0].status, "infeasible");
    // halt_on_failure stopped the sequence before stage 2
    assert_eq!(summary.stages.len(), 1);
}

#[test]
fn plugins_load_their_own_tables_through_the_data_pass() {
    let (_zones, mut projects, mut data) = fixture();
    projects.push(Project::new("wind_1", "north", "existing_gen", "variable_gen"));
    data.set_project_params("wind_1", ProjectParams::default().with_capacity(200.0));

    let inputs = tempfile::tempdir().unwrap();
    std::fs::write(
        inputs.path().join("variable_gen_profiles.csv"),
        "project,timepoint,capacity_factor\nwind_1,1,0.35\nwind_1,2,0.4\n",
    )
    .unwrap();

    let registries = load_registries(&projects, &[], &[]).unwrap();
    load_scenario_data(&registries, &projects, &[], &[], inputs.path(), &mut data).unwrap();

    assert_eq!(data.capacity_factor("wind_1", TimepointId::new(1)), 0.35);
    assert_eq!(data.capacity_factor("wind_1", TimepointId::new(2)), 0.4);
}

#[test]
fn validation_pass_covers_structure_and_entities() {
    let temporal = build_temporal();
    let (zones, mut projects, data) = fixture();
    // A second project with no parameters: flagged, but validation continues
    projects.push(Project::new("wind_1", "north", "existing_gen", "variable_gen"));

    let registries = load_registries(&projects, &[], &[]).unwrap();
    let diag = validate_scenario(&registries, &temporal, &zones, &projects, &[], &[], &data);

    assert!(diag
        .errors()
        .any(|i| i.entity.as_deref() == Some("wind_1")));
    // The well-formed project produced no findings
    assert!(!diag.issues.iter().any(|i| i.entity.as_deref() == Some("coal_1")));
}
