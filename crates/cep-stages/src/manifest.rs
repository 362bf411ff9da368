//! Persisted artifacts of a stage run.
//!
//! Commitment records are written through an explicit manifest type with a
//! defined serialization contract, decoupled from any particular file
//! layout: the next stage's load phase reads records back by content, not
//! by naming convention.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use cep_core::{CommitmentRecord, Diagnostics};

use crate::runner::StageRunRecord;

/// Commitment records exported after one stage's solve.
#[derive(Debug, Serialize, Deserialize)]
pub struct PassThroughManifest {
    pub created_at: DateTime<Utc>,
    pub stage: String,
    pub num_records: usize,
    pub records: Vec<CommitmentRecord>,
}

pub fn write_pass_through_manifest(path: &Path, manifest: &PassThroughManifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating manifest directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(manifest)
        .context("serializing pass-through manifest to JSON")?;
    fs::write(path, json)
        .with_context(|| format!("writing pass-through manifest '{}'", path.display()))?;
    Ok(())
}

pub fn load_pass_through_manifest(path: &Path) -> Result<PassThroughManifest> {
    let file = fs::File::open(path)
        .with_context(|| format!("opening pass-through manifest '{}'", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("parsing pass-through manifest '{}'", path.display()))
}

/// Summary of a full stage-sequence run.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunManifest {
    pub created_at: DateTime<Utc>,
    pub num_stages: usize,
    pub success: usize,
    pub failure: usize,
    pub stages: Vec<StageRunRecord>,
}

pub fn write_run_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating manifest directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(manifest).context("serializing run manifest to JSON")?;
    fs::write(path, json)
        .with_context(|| format!("writing run manifest '{}'", path.display()))?;
    Ok(())
}

/// Flush a completed validation pass to a persisted report.
pub fn write_diagnostics_report(path: &Path, diag: &Diagnostics) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating report directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(diag).context("serializing diagnostics to JSON")?;
    fs::write(path, json)
        .with_context(|| format!("writing diagnostics report '{}'", path.display()))?;
    Ok(())
}
