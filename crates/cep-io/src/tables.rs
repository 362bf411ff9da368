//! Readers for the entity and parameter tables.
//!
//! Expected files in the scenario inputs directory:
//!
//! - `load_zones.csv` - `zone,allow_unserved_energy,unserved_energy_penalty_per_mwh`
//! - `projects.csv` - `project,zone,capacity_type,operational_type,
//!   availability_type,reliability_type,balancing_type,final_commitment_stage`
//! - `transmission_lines.csv` - `line,from_zone,to_zone,operational_type,
//!   min_flow_mw,max_flow_mw`
//! - `reserve_areas.csv` - `area,reserve_type,requirement_mw,violation_penalty_per_mw`
//! - `project_params.csv` - shared technical/cost parameters per project
//! - `zone_demand.csv` - `zone,timepoint,demand_mw`
//!
//! Tables other than `projects.csv` and `load_zones.csv` are optional;
//! plugin-specific tables (profiles, derates) are read by the owning
//! plugin's data-loading hook, not here.

use std::path::Path;

use serde::Deserialize;

use cep_core::{LoadZone, Project, ReserveArea, TimepointId, TransmissionLine};
use cep_model::{DataStore, ProjectParams};

use crate::error::ImportResult;

#[derive(Debug, Deserialize)]
struct ZoneRow {
    zone: String,
    #[serde(default)]
    allow_unserved_energy: bool,
    #[serde(default)]
    unserved_energy_penalty_per_mwh: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ProjectRow {
    project: String,
    zone: String,
    capacity_type: String,
    operational_type: String,
    #[serde(default)]
    availability_type: Option<String>,
    #[serde(default)]
    reliability_type: Option<String>,
    #[serde(default)]
    balancing_type: Option<String>,
    #[serde(default)]
    final_commitment_stage: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LineRow {
    line: String,
    from_zone: String,
    to_zone: String,
    operational_type: String,
    min_flow_mw: f64,
    max_flow_mw: f64,
}

#[derive(Debug, Deserialize)]
struct AreaRow {
    area: String,
    reserve_type: String,
    requirement_mw: f64,
    #[serde(default)]
    violation_penalty_per_mw: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ProjectParamsRow {
    project: String,
    #[serde(default)]
    capacity_mw: Option<f64>,
    #[serde(default)]
    min_stable_level_fraction: Option<f64>,
    #[serde(default)]
    variable_cost_per_mwh: Option<f64>,
    #[serde(default)]
    startup_cost: Option<f64>,
    #[serde(default)]
    shutdown_cost: Option<f64>,
    #[serde(default)]
    startup_fuel_mmbtu: Option<f64>,
    #[serde(default)]
    fuel_cost_per_mmbtu: Option<f64>,
    #[serde(default)]
    ramp_rate_fraction_per_hour: Option<f64>,
    #[serde(default)]
    capital_cost_per_mw_yr: Option<f64>,
    #[serde(default)]
    fixed_cost_per_mw_yr: Option<f64>,
    #[serde(default)]
    max_new_build_mw: Option<f64>,
    #[serde(default)]
    storage_duration_hours: Option<f64>,
    #[serde(default)]
    charging_efficiency: Option<f64>,
    #[serde(default)]
    discharging_efficiency: Option<f64>,
    #[serde(default)]
    elcc_fraction: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DemandRow {
    zone: String,
    timepoint: u64,
    demand_mw: f64,
}

fn read_rows<T: serde::de::DeserializeOwned>(path: &Path) -> ImportResult<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Load the load-zone table.
pub fn load_zones(inputs_dir: &Path) -> ImportResult<Vec<LoadZone>> {
    let mut zones = Vec::new();
    for row in read_rows::<ZoneRow>(&inputs_dir.join("load_zones.csv"))? {
        let mut zone = LoadZone::new(row.zone);
        if row.allow_unserved_energy {
            zone = zone.with_unserved_energy(row.unserved_energy_penalty_per_mwh.unwrap_or(5e3));
        }
        zones.push(zone);
    }
    Ok(zones)
}

/// Load the project table with its type-tag assignments.
pub fn load_projects(inputs_dir: &Path) -> ImportResult<Vec<Project>> {
    let mut projects = Vec::new();
    for row in read_rows::<ProjectRow>(&inputs_dir.join("projects.csv"))? {
        let mut project = Project::new(
            row.project,
            row.zone,
            row.capacity_type,
            row.operational_type,
        );
        if let Some(tag) = row.availability_type {
            project = project.with_availability_type(tag);
        }
        if let Some(tag) = row.reliability_type {
            project = project.with_reliability_type(tag);
        }
        if let Some(balancing_type) = row.balancing_type {
            project = project.with_balancing_type(balancing_type);
        }
        if let Some(stage_name) = row.final_commitment_stage {
            project = project.with_final_commitment_stage(stage_name);
        }
        projects.push(project);
    }
    Ok(projects)
}

/// Load the transmission-line table, if present.
pub fn load_transmission_lines(inputs_dir: &Path) -> ImportResult<Vec<TransmissionLine>> {
    let path = inputs_dir.join("transmission_lines.csv");
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut lines = Vec::new();
    for row in read_rows::<LineRow>(&path)? {
        lines.push(
            TransmissionLine::new(row.line, row.from_zone, row.to_zone, row.operational_type)
                .with_flow_limits(row.min_flow_mw, row.max_flow_mw),
        );
    }
    Ok(lines)
}

/// Load the reserve-area table, if present.
pub fn load_reserve_areas(inputs_dir: &Path) -> ImportResult<Vec<ReserveArea>> {
    let path = inputs_dir.join("reserve_areas.csv");
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut areas = Vec::new();
    for row in read_rows::<AreaRow>(&path)? {
        let mut area = ReserveArea::new(row.area, row.reserve_type, row.requirement_mw);
        if let Some(penalty) = row.violation_penalty_per_mw {
            area = area.with_violation_penalty(penalty);
        }
        areas.push(area);
    }
    Ok(areas)
}

/// Load shared project parameters and zone demand into a data store.
pub fn load_data_store(inputs_dir: &Path) -> ImportResult<DataStore> {
    let mut data = DataStore::new();

    let params_path = inputs_dir.join("project_params.csv");
    if params_path.exists() {
        for row in read_rows::<ProjectParamsRow>(&params_path)? {
            let defaults = ProjectParams::default();
            let params = ProjectParams {
                capacity_mw: row.capacity_mw.unwrap_or(defaults.capacity_mw),
                min_stable_level_fraction: row
                    .min_stable_level_fraction
                    .unwrap_or(defaults.min_stable_level_fraction),
                variable_cost_per_mwh: row
                    .variable_cost_per_mwh
                    .unwrap_or(defaults.variable_cost_per_mwh),
                startup_cost: row.startup_cost.unwrap_or(defaults.startup_cost),
                shutdown_cost: row.shutdown_cost.unwrap_or(defaults.shutdown_cost),
                startup_fuel_mmbtu: row
                    .startup_fuel_mmbtu
                    .unwrap_or(defaults.startup_fuel_mmbtu),
                fuel_cost_per_mmbtu: row
                    .fuel_cost_per_mmbtu
                    .unwrap_or(defaults.fuel_cost_per_mmbtu),
                ramp_rate_fraction_per_hour: row
                    .ramp_rate_fraction_per_hour
                    .unwrap_or(defaults.ramp_rate_fraction_per_hour),
                capital_cost_per_mw_yr: row
                    .capital_cost_per_mw_yr
                    .unwrap_or(defaults.capital_cost_per_mw_yr),
                fixed_cost_per_mw_yr: row
                    .fixed_cost_per_mw_yr
                    .unwrap_or(defaults.fixed_cost_per_mw_yr),
                max_new_build_mw: row.max_new_build_mw.unwrap_or(defaults.max_new_build_mw),
                storage_duration_hours: row
                    .storage_duration_hours
                    .unwrap_or(defaults.storage_duration_hours),
                charging_efficiency: row
                    .charging_efficiency
                    .unwrap_or(defaults.charging_efficiency),
                discharging_efficiency: row
                    .discharging_efficiency
                    .unwrap_or(defaults.discharging_efficiency),
                elcc_fraction: row.elcc_fraction.unwrap_or(defaults.elcc_fraction),
            };
            data.set_project_params(row.project, params);
        }
    }

    let demand_path = inputs_dir.join("zone_demand.csv");
    if demand_path.exists() {
        for row in read_rows::<DemandRow>(&demand_path)? {
            data.set_zone_demand(row.zone, TimepointId::new(row.timepoint), row.demand_mw);
        }
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_projects_with_tags() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("projects.csv"),
            "project,zone,capacity_type,operational_type,availability_type,reliability_type,balancing_type,final_commitment_stage\n\
             coal_1,north,existing_gen,thermal_commit,exogenous_derate,simple_capacity,day,day_ahead\n\
             wind_1,south,new_build_gen,variable_gen,,,,\n",
        )
        .unwrap();

        let projects = load_projects(dir.path()).unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].availability_type, "exogenous_derate");
        assert_eq!(
            projects[0].final_commitment_stage.as_deref(),
            Some("day_ahead")
        );
        // Missing optional columns fall back to defaults
        assert_eq!(projects[1].availability_type, "always_available");
        assert_eq!(projects[1].balancing_type, "day");
        assert!(projects[1].final_commitment_stage.is_none());
    }

    #[test]
    fn test_load_zones_and_demand() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("load_zones.csv"),
            "zone,allow_unserved_energy,unserved_energy_penalty_per_mwh\nnorth,true,20000\nsouth,false,\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("zone_demand.csv"),
            "zone,timepoint,demand_mw\nnorth,1,150.0\nsouth,1,80.0\n",
        )
        .unwrap();

        let zones = load_zones(dir.path()).unwrap();
        assert_eq!(zones.len(), 2);
        assert!(zones[0].allow_unserved_energy);
        assert_eq!(zones[0].unserved_energy_penalty_per_mwh, 20000.0);
        assert!(!zones[1].allow_unserved_energy);

        let data = load_data_store(dir.path()).unwrap();
        assert_eq!(data.zone_demand("north", TimepointId::new(1)), 150.0);
    }

    #[test]
    fn test_load_project_params_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("project_params.csv"),
            "project,capacity_mw,variable_cost_per_mwh,storage_duration_hours\nbattery_1,100.0,1.0,4.0\n",
        )
        .unwrap();

        let data = load_data_store(dir.path()).unwrap();
        let params = data.project_params("battery_1").unwrap();
        assert_eq!(params.capacity_mw, 100.0);
        assert_eq!(params.storage_duration_hours, 4.0);
        // Unspecified columns take defaults
        assert_eq!(params.charging_efficiency, 1.0);
        assert!(params.max_new_build_mw.is_infinite());
    }

    #[test]
    fn test_optional_tables_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_transmission_lines(dir.path()).unwrap().is_empty());
        assert!(load_reserve_areas(dir.path()).unwrap().is_empty());
    }
}
