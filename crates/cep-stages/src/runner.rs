//! Sequential stage runner.
//!
//! Runs each stage's full build → solve → export cycle in stage order.
//! Committing entities' solved commitment values are appended to the
//! ledger and persisted after each stage; later stages read them back as
//! fixed inputs at build time. Solver failure is terminal for that
//! stage's build - the status is recorded verbatim and the configuration
//! decides whether later stages still run.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use std::path::PathBuf;
use tracing::{info, warn};

use cep_core::{
    CommitmentLedger, CommitmentRecord, Diagnostics, LoadZone, Project, ReserveArea, StageId,
    StageOrder, TemporalModel, TransmissionLine, ZoneNetwork,
};
use cep_model::{
    build_stage_model, dispatch, EntityRef, ExportView, Solver, StageInputs, StageRegistries,
    Tagged,
};
use cep_model::DataStore;
use serde::{Deserialize, Serialize};

use crate::manifest::{
    write_pass_through_manifest, write_run_manifest, PassThroughManifest, RunManifest,
};

/// Runner settings for one scenario's stage sequence.
pub struct StageRunnerConfig<'a> {
    pub temporal: &'a TemporalModel,
    pub stage_order: &'a StageOrder,
    pub zones: &'a [LoadZone],
    pub projects: &'a [Project],
    pub lines: &'a [TransmissionLine],
    pub areas: &'a [ReserveArea],
    pub data: &'a DataStore,
    pub solver: &'a dyn Solver,
    pub output_root: PathBuf,
    /// Stop the sequence at the first non-optimal stage. When false, later
    /// stages still run (and fail loudly if pass-through data is missing).
    pub halt_on_failure: bool,
}

/// Outcome of one stage's cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRunRecord {
    pub stage_name: String,
    /// Solver status, verbatim ("optimal", "infeasible", …), or "error"
    pub status: String,
    pub objective: Option<f64>,
    pub commitments_exported: usize,
    pub error: Option<String>,
}

/// Summary returned after the run.
pub struct StageRunSummary {
    pub success: usize,
    pub failure: usize,
    pub manifest_path: PathBuf,
    pub stages: Vec<StageRunRecord>,
    pub ledger: CommitmentLedger,
}

/// Initialize tracing to stderr for standalone runs.
///
/// Respects the `RUST_LOG` environment variable; defaults to INFO.
/// Safe to call more than once - later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn stage_id_by_name(temporal: &TemporalModel, name: &str) -> Result<StageId> {
    temporal
        .stages()
        .find(|stage| stage.name == name)
        .map(|stage| stage.id)
        .ok_or_else(|| anyhow!("stage '{}' not found in temporal model", name))
}

/// Run every stage in order, threading the commitment ledger through.
pub fn run_stages(
    registries: &StageRegistries,
    config: &StageRunnerConfig,
) -> Result<StageRunSummary> {
    std::fs::create_dir_all(&config.output_root).with_context(|| {
        format!(
            "creating run output root '{}'",
            config.output_root.display()
        )
    })?;

    let mut ledger = CommitmentLedger::new();
    let mut records = Vec::new();

    for stage_name in config.stage_order.names() {
        let record = run_stage(registries, config, stage_name, &mut ledger);
        let failed = record.status != "optimal";
        if failed {
            warn!(stage = stage_name.as_str(), status = record.status.as_str(), "stage failed");
        }
        records.push(record);
        if failed && config.halt_on_failure {
            break;
        }
    }

    let success = records.iter().filter(|r| r.status == "optimal").count();
    let failure = records.len() - success;

    let manifest = RunManifest {
        created_at: Utc::now(),
        num_stages: records.len(),
        success,
        failure,
        stages: records.clone(),
    };
    let manifest_path = config.output_root.join("run_manifest.json");
    write_run_manifest(&manifest_path, &manifest)?;

    Ok(StageRunSummary {
        success,
        failure,
        manifest_path,
        stages: records,
        ledger,
    })
}

/// One stage's full build-solve-export cycle.
fn run_stage(
    registries: &StageRegistries,
    config: &StageRunnerConfig,
    stage_name: &str,
    ledger: &mut CommitmentLedger,
) -> StageRunRecord {
    let mut runner = || -> Result<(f64, usize)> {
        let stage = stage_id_by_name(config.temporal, stage_name)?;
        let stage_model = build_stage_model(
            registries,
            &StageInputs {
                temporal: config.temporal,
                stage,
                stage_name,
                stage_order: config.stage_order,
                zones: config.zones,
                projects: config.projects,
                lines: config.lines,
                areas: config.areas,
                data: config.data,
                ledger: if ledger.is_empty() { None } else { Some(&*ledger) },
            },
        )?;

        info!(
            stage = stage_name,
            solver = config.solver.name(),
            "handing problem to solver"
        );
        let solution = config.solver.solve(&stage_model.problem)?;
        if !solution.status.is_success() {
            // Surfaced verbatim; the caller decides whether to continue
            return Err(anyhow!("{}", solution.status));
        }

        // Export committed decisions for later stages
        let mut exported = Vec::new();
        for (project, timepoint, var) in &stage_model.commitments_to_export {
            let committed = solution.value(*var).ok_or_else(|| {
                anyhow!(
                    "solver returned no value for commitment of '{}' at timepoint {}",
                    project,
                    timepoint.value()
                )
            })?;
            exported.push(CommitmentRecord {
                project: project.clone(),
                timepoint: *timepoint,
                stage: stage_name.to_string(),
                committed,
            });
        }
        let num_exported = exported.len();
        if num_exported > 0 {
            let manifest = PassThroughManifest {
                created_at: Utc::now(),
                stage: stage_name.to_string(),
                num_records: num_exported,
                records: exported.clone(),
            };
            write_pass_through_manifest(
                &config.output_root.join(stage_name).join("commitments.json"),
                &manifest,
            )?;
            ledger.extend(exported);
        }

        // Per-plugin result rows for downstream reporting
        let view = ExportView {
            temporal: config.temporal,
            stage,
            problem: &stage_model.problem,
            solution: &solution,
        };
        let operational_tagged: Vec<Tagged> = config
            .projects
            .iter()
            .map(|p| Tagged::new(&p.operational_type, EntityRef::Project(p)))
            .collect();
        let rows =
            dispatch::export_results_pass(&registries.operational, &operational_tagged, &view)?;
        let results_path = config.output_root.join(stage_name).join("results.json");
        if let Some(parent) = results_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&results_path, serde_json::to_string_pretty(&rows)?)
            .with_context(|| format!("writing results '{}'", results_path.display()))?;

        Ok((solution.objective, num_exported))
    };

    match runner() {
        Ok((objective, commitments_exported)) => StageRunRecord {
            stage_name: stage_name.to_string(),
            status: "optimal".to_string(),
            objective: Some(objective),
            commitments_exported,
            error: None,
        },
        Err(err) => {
            let message = err.to_string();
            // Solver statuses come through as their display form
            let status = match message.as_str() {
                "infeasible" | "unbounded" | "timeout" | "iteration_limit" | "numerical_error" => {
                    message.clone()
                }
                _ => "error".to_string(),
            };
            StageRunRecord {
                stage_name: stage_name.to_string(),
                status,
                objective: None,
                commitments_exported: 0,
                error: Some(message),
            }
        }
    }
}

/// Data-loading pass: each plugin reads its own parameter tables.
///
/// Runs after the shared tables (see `cep-io`) are loaded and before
/// validation, so validation sees everything the build will see.
pub fn load_scenario_data(
    registries: &StageRegistries,
    projects: &[Project],
    lines: &[TransmissionLine],
    areas: &[ReserveArea],
    inputs_dir: &std::path::Path,
    data: &mut DataStore,
) -> Result<()> {
    let capacity_tagged: Vec<Tagged> = projects
        .iter()
        .map(|p| Tagged::new(&p.capacity_type, EntityRef::Project(p)))
        .collect();
    dispatch::load_data_pass(&registries.capacity, &capacity_tagged, inputs_dir, data)?;

    let operational_tagged: Vec<Tagged> = projects
        .iter()
        .map(|p| Tagged::new(&p.operational_type, EntityRef::Project(p)))
        .collect();
    dispatch::load_data_pass(&registries.operational, &operational_tagged, inputs_dir, data)?;

    let availability_tagged: Vec<Tagged> = projects
        .iter()
        .map(|p| Tagged::new(&p.availability_type, EntityRef::Project(p)))
        .collect();
    dispatch::load_data_pass(&registries.availability, &availability_tagged, inputs_dir, data)?;

    let tx_tagged: Vec<Tagged> = lines
        .iter()
        .map(|l| Tagged::new(&l.operational_type, EntityRef::TransmissionLine(l)))
        .collect();
    dispatch::load_data_pass(&registries.tx_operational, &tx_tagged, inputs_dir, data)?;

    let reserve_tagged: Vec<Tagged> = areas
        .iter()
        .map(|a| Tagged::new(&a.reserve_type, EntityRef::ReserveArea(a)))
        .collect();
    dispatch::load_data_pass(&registries.reserve, &reserve_tagged, inputs_dir, data)?;

    Ok(())
}

/// Batch validation pass over the scenario's structure and entities.
///
/// Findings are aggregated; nothing here aborts. The returned diagnostics
/// are flushed to a persisted report by the caller after the full pass.
pub fn validate_scenario(
    registries: &StageRegistries,
    temporal: &TemporalModel,
    zones: &[LoadZone],
    projects: &[Project],
    lines: &[TransmissionLine],
    areas: &[ReserveArea],
    data: &DataStore,
) -> Diagnostics {
    let mut diag = Diagnostics::new();

    temporal.validate_into(&mut diag);
    let network = ZoneNetwork::from_entities(zones, lines);
    network.validate_into(zones, lines, &mut diag);

    let capacity_tagged: Vec<Tagged> = projects
        .iter()
        .map(|p| Tagged::new(&p.capacity_type, EntityRef::Project(p)))
        .collect();
    dispatch::validate_pass(&registries.capacity, &capacity_tagged, data, &mut diag);

    let operational_tagged: Vec<Tagged> = projects
        .iter()
        .map(|p| Tagged::new(&p.operational_type, EntityRef::Project(p)))
        .collect();
    dispatch::validate_pass(&registries.operational, &operational_tagged, data, &mut diag);

    let availability_tagged: Vec<Tagged> = projects
        .iter()
        .map(|p| Tagged::new(&p.availability_type, EntityRef::Project(p)))
        .collect();
    dispatch::validate_pass(&registries.availability, &availability_tagged, data, &mut diag);

    let reliability_tagged: Vec<Tagged> = projects
        .iter()
        .filter_map(|p| {
            p.reliability_type
                .as_deref()
                .map(|tag| Tagged::new(tag, EntityRef::Project(p)))
        })
        .collect();
    dispatch::validate_pass(&registries.reliability, &reliability_tagged, data, &mut diag);

    let tx_tagged: Vec<Tagged> = lines
        .iter()
        .map(|l| Tagged::new(&l.operational_type, EntityRef::TransmissionLine(l)))
        .collect();
    dispatch::validate_pass(&registries.tx_operational, &tx_tagged, data, &mut diag);

    let reserve_tagged: Vec<Tagged> = areas
        .iter()
        .map(|a| Tagged::new(&a.reserve_type, EntityRef::ReserveArea(a)))
        .collect();
    dispatch::validate_pass(&registries.reserve, &reserve_tagged, data, &mut diag);

    diag
}
