//! Scenario input data shared across plugins.
//!
//! The core does not mediate plugin-specific parameter tables; each
//! plugin's `load_data` hook reads its own files and deposits parameters
//! here. The store is populated before the build pass and read-only during
//! it.

use std::collections::HashMap;

use cep_core::{CepError, CepResult, PeriodId, TimepointId};
use serde::{Deserialize, Serialize};

/// Per-project technical and cost parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectParams {
    /// Installed (or per-unit) capacity in MW
    pub capacity_mw: f64,
    /// Minimum stable output as a fraction of committed capacity
    pub min_stable_level_fraction: f64,
    /// Variable cost ($/MWh)
    pub variable_cost_per_mwh: f64,
    /// Cost per startup ($)
    pub startup_cost: f64,
    /// Cost per shutdown ($)
    pub shutdown_cost: f64,
    /// Fuel burned per startup (MMBtu)
    pub startup_fuel_mmbtu: f64,
    /// Fuel cost ($/MMBtu)
    pub fuel_cost_per_mmbtu: f64,
    /// Max ramp between consecutive timepoints, fraction of capacity per hour
    pub ramp_rate_fraction_per_hour: f64,
    /// Annualized capital cost for new builds ($/MW-yr)
    pub capital_cost_per_mw_yr: f64,
    /// Fixed O&M ($/MW-yr)
    pub fixed_cost_per_mw_yr: f64,
    /// Cap on cumulative new build (MW)
    pub max_new_build_mw: f64,
    /// Storage duration at rated power (hours)
    pub storage_duration_hours: f64,
    /// Storage charging efficiency (0..1]
    pub charging_efficiency: f64,
    /// Storage discharging efficiency (0..1]
    pub discharging_efficiency: f64,
    /// Fraction of capacity counted toward the planning reserve margin
    pub elcc_fraction: f64,
}

impl Default for ProjectParams {
    fn default() -> Self {
        Self {
            capacity_mw: 0.0,
            min_stable_level_fraction: 0.0,
            variable_cost_per_mwh: 0.0,
            startup_cost: 0.0,
            shutdown_cost: 0.0,
            startup_fuel_mmbtu: 0.0,
            fuel_cost_per_mmbtu: 0.0,
            ramp_rate_fraction_per_hour: 1.0,
            capital_cost_per_mw_yr: 0.0,
            fixed_cost_per_mw_yr: 0.0,
            max_new_build_mw: f64::INFINITY,
            storage_duration_hours: 0.0,
            charging_efficiency: 1.0,
            discharging_efficiency: 1.0,
            elcc_fraction: 1.0,
        }
    }
}

impl ProjectParams {
    pub fn with_capacity(mut self, capacity_mw: f64) -> Self {
        self.capacity_mw = capacity_mw;
        self
    }

    pub fn with_variable_cost(mut self, cost_per_mwh: f64) -> Self {
        self.variable_cost_per_mwh = cost_per_mwh;
        self
    }

    pub fn with_commitment_costs(mut self, startup: f64, shutdown: f64) -> Self {
        self.startup_cost = startup;
        self.shutdown_cost = shutdown;
        self
    }

    pub fn with_min_stable_level(mut self, fraction: f64) -> Self {
        self.min_stable_level_fraction = fraction;
        self
    }

    pub fn with_ramp_rate(mut self, fraction_per_hour: f64) -> Self {
        self.ramp_rate_fraction_per_hour = fraction_per_hour;
        self
    }

    pub fn with_new_build_costs(mut self, capital_per_mw_yr: f64, max_new_build_mw: f64) -> Self {
        self.capital_cost_per_mw_yr = capital_per_mw_yr;
        self.max_new_build_mw = max_new_build_mw;
        self
    }

    pub fn with_storage(mut self, duration_hours: f64, charge_eff: f64, discharge_eff: f64) -> Self {
        self.storage_duration_hours = duration_hours;
        self.charging_efficiency = charge_eff;
        self.discharging_efficiency = discharge_eff;
        self
    }
}

/// Scenario-wide input data, keyed the way plugins look things up.
#[derive(Debug, Default)]
pub struct DataStore {
    project_params: HashMap<String, ProjectParams>,
    zone_demand_mw: HashMap<(String, TimepointId), f64>,
    capacity_factors: HashMap<(String, TimepointId), f64>,
    availability_derates: HashMap<(String, TimepointId), f64>,
    prm_requirement_mw: HashMap<PeriodId, f64>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_project_params(&mut self, project: impl Into<String>, params: ProjectParams) {
        self.project_params.insert(project.into(), params);
    }

    /// Parameters for a project; missing parameters are a configuration
    /// error at build time (validation flags them earlier, non-fatally).
    pub fn project_params(&self, project: &str) -> CepResult<&ProjectParams> {
        self.project_params.get(project).ok_or_else(|| {
            CepError::Config(format!("no parameters loaded for project '{}'", project))
        })
    }

    pub fn try_project_params(&self, project: &str) -> Option<&ProjectParams> {
        self.project_params.get(project)
    }

    pub fn set_zone_demand(&mut self, zone: impl Into<String>, tmp: TimepointId, demand_mw: f64) {
        self.zone_demand_mw.insert((zone.into(), tmp), demand_mw);
    }

    pub fn zone_demand(&self, zone: &str, tmp: TimepointId) -> f64 {
        self.zone_demand_mw
            .get(&(zone.to_string(), tmp))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn set_capacity_factor(&mut self, project: impl Into<String>, tmp: TimepointId, cf: f64) {
        self.capacity_factors.insert((project.into(), tmp), cf);
    }

    pub fn capacity_factor(&self, project: &str, tmp: TimepointId) -> f64 {
        self.capacity_factors
            .get(&(project.to_string(), tmp))
            .copied()
            .unwrap_or(1.0)
    }

    pub fn has_capacity_factor(&self, project: &str, tmp: TimepointId) -> bool {
        self.capacity_factors
            .contains_key(&(project.to_string(), tmp))
    }

    pub fn set_availability_derate(
        &mut self,
        project: impl Into<String>,
        tmp: TimepointId,
        derate: f64,
    ) {
        self.availability_derates.insert((project.into(), tmp), derate);
    }

    pub fn availability_derate(&self, project: &str, tmp: TimepointId) -> f64 {
        self.availability_derates
            .get(&(project.to_string(), tmp))
            .copied()
            .unwrap_or(1.0)
    }

    pub fn set_prm_requirement(&mut self, period: PeriodId, requirement_mw: f64) {
        self.prm_requirement_mw.insert(period, requirement_mw);
    }

    pub fn prm_requirement(&self, period: PeriodId) -> Option<f64> {
        self.prm_requirement_mw.get(&period).copied()
    }
}
