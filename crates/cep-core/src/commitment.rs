//! Stage ordering and cross-stage commitment pass-through data.
//!
//! Stages within a subproblem have a total order, established once from an
//! external stage-name list and reused for every entity. A project declares
//! a "final commitment stage": the stage at which its discrete commitment
//! is decided freely. Earlier stages treat the commitment as a free
//! decision variable; the final stage additionally exports the solved
//! values as [`CommitmentRecord`]s; every later stage reads those records
//! and fixes the commitment as a constant.
//!
//! Transitions are driven purely by stage order, never by wall-clock
//! execution order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CepError, CepResult};
use crate::TimepointId;

/// The total order of stage names within a subproblem.
#[derive(Debug, Clone)]
pub struct StageOrder {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl StageOrder {
    /// Establish the order from a persisted stage-name list.
    pub fn from_names<I, S>(names: I) -> CepResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(CepError::Config("stage list is empty".into()));
        }
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(CepError::Config(format!(
                    "duplicate stage name '{}' in stage list",
                    name
                )));
            }
        }
        Ok(Self { names, index })
    }

    pub fn index_of(&self, name: &str) -> CepResult<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| CepError::Config(format!("unknown stage '{}'", name)))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Commitment state of an entity in `current_stage`, given its declared
    /// final commitment stage. `None` means the commitment is free in every
    /// stage.
    pub fn commitment_state(
        &self,
        current_stage: &str,
        final_commitment_stage: Option<&str>,
    ) -> CepResult<CommitmentState> {
        let current = self.index_of(current_stage)?;
        let Some(final_stage) = final_commitment_stage else {
            return Ok(CommitmentState::Free);
        };
        let final_idx = self.index_of(final_stage)?;
        Ok(if current < final_idx {
            CommitmentState::Free
        } else if current == final_idx {
            CommitmentState::Committing
        } else {
            CommitmentState::Fixed
        })
    }
}

/// Commitment state of one (entity, stage) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentState {
    /// The commitment is a true decision variable, never fixed from outside.
    Free,
    /// The commitment is free, and its solved value is exported after solve.
    Committing,
    /// The commitment is read from a prior stage's record and fixed.
    Fixed,
}

/// A committed decision exported from an entity's final commitment stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitmentRecord {
    pub project: String,
    pub timepoint: TimepointId,
    /// The stage that produced this value
    pub stage: String,
    pub committed: f64,
}

/// Collected commitment records, keyed by (project, timepoint).
///
/// The runner inserts records stage by stage, so a later export overwrites
/// an earlier one and a lookup always sees the nearest earlier stage's
/// value.
#[derive(Debug, Clone, Default)]
pub struct CommitmentLedger {
    records: HashMap<(String, TimepointId), CommitmentRecord>,
}

impl CommitmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: CommitmentRecord) {
        self.records
            .insert((record.project.clone(), record.timepoint), record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = CommitmentRecord>) {
        for record in records {
            self.insert(record);
        }
    }

    pub fn get(&self, project: &str, timepoint: TimepointId) -> Option<&CommitmentRecord> {
        self.records.get(&(project.to_string(), timepoint))
    }

    /// The fixed commitment value for a (project, timepoint) pair.
    ///
    /// A missing record is a [`CepError::MissingPassThroughData`] - the
    /// model cannot be meaningfully constructed without it, so this is
    /// fatal at model-load time, never silently defaulted.
    pub fn fixed_value(
        &self,
        project: &str,
        timepoint: TimepointId,
        requesting_stage: &str,
    ) -> CepResult<f64> {
        self.get(project, timepoint)
            .map(|record| record.committed)
            .ok_or_else(|| CepError::MissingPassThroughData {
                project: project.to_string(),
                timepoint: timepoint.value(),
                stage: requesting_stage.to_string(),
            })
    }

    pub fn records(&self) -> impl Iterator<Item = &CommitmentRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
