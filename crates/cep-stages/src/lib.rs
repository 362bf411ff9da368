//! # cep-stages: Stage Sequencing and Commitment Pass-Through
//!
//! Orchestrates the per-stage build → solve → export cycle and carries
//! committed decisions from each entity's final commitment stage into
//! every later stage as fixed inputs. One stage's full cycle completes
//! before the next stage's build begins; no two stages interleave.

pub mod manifest;
pub mod runner;

pub use manifest::{
    load_pass_through_manifest, write_diagnostics_report, write_pass_through_manifest,
    write_run_manifest, PassThroughManifest, RunManifest,
};
pub use runner::{
    init_tracing, load_scenario_data, run_stages, validate_scenario, StageRunRecord,
    StageRunnerConfig, StageRunSummary,
};
