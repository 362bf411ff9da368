//! Availability types: exogenous derates on project capacity.

use std::path::Path;

use cep_core::{CepError, CepResult, Diagnostics, Project, TimepointId};
use serde::Deserialize;

use crate::data::DataStore;
use crate::plugin::{contract, AvailabilityType, ComponentType, EntityRef};

/// Resolve an availability type tag to its implementation.
pub fn resolve(tag: &str) -> Option<Box<dyn AvailabilityType>> {
    match tag {
        "always_available" => Some(Box::new(AlwaysAvailable)),
        "exogenous_derate" => Some(Box::new(ExogenousDerate)),
        _ => None,
    }
}

/// No derating: the project is fully available at every timepoint.
pub struct AlwaysAvailable;

impl ComponentType for AlwaysAvailable {
    fn name(&self) -> &'static str {
        "always_available"
    }

    fn provided_rules(&self) -> &'static [&'static str] {
        contract::AVAILABILITY_REQUIRED_RULES
    }
}

impl AvailabilityType for AlwaysAvailable {
    fn availability_derate(
        &self,
        _project: &Project,
        _tmp: TimepointId,
        _data: &DataStore,
    ) -> CepResult<f64> {
        Ok(1.0)
    }
}

/// Derates read from input data (planned outages, seasonal maintenance).
pub struct ExogenousDerate;

/// One row of the derate table.
#[derive(Debug, Deserialize)]
struct DerateRow {
    project: String,
    timepoint: u64,
    derate: f64,
}

impl ComponentType for ExogenousDerate {
    fn name(&self) -> &'static str {
        "exogenous_derate"
    }

    fn provided_rules(&self) -> &'static [&'static str] {
        contract::AVAILABILITY_REQUIRED_RULES
    }

    /// Reads this type's own derate table; the core does not mediate it.
    fn load_data(
        &self,
        entity: &EntityRef,
        inputs_dir: &Path,
        data: &mut DataStore,
    ) -> CepResult<()> {
        let project = entity.project()?;
        let path = inputs_dir.join("availability_derates.csv");
        if !path.exists() {
            return Ok(());
        }
        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| CepError::Parse(format!("reading '{}': {}", path.display(), e)))?;
        for row in reader.deserialize() {
            let row: DerateRow = row
                .map_err(|e| CepError::Parse(format!("parsing '{}': {}", path.display(), e)))?;
            if row.project == project.name {
                data.set_availability_derate(
                    row.project,
                    TimepointId::new(row.timepoint),
                    row.derate,
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
                    cep_core::Severity::Warning,
                    "inputs",
                    "no parameters loaded; derates will apply to zero capacity",
                )
                .with_entity(&project.name)
                .with_source_module(self.name()),
            );
        }
        Ok(())
    }
}

impl AvailabilityType for ExogenousDerate {
    fn availability_derate(
        &self,
        project: &Project,
        tmp: TimepointId,
        data: &DataStore,
    ) -> CepResult<f64> {
        // Missing entries mean fully available
        Ok(data.availability_derate(&project.name, tmp).clamp(0.0, 1.0))
    }
}
