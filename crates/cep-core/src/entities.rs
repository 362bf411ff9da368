//! Model entities and their type tags.
//!
//! Projects, transmission lines, and reserve areas each carry one or more
//! *type tags* - string keys selecting which plugin implementation governs
//! their behavior in each capability family. Entities are created from
//! external tables before a model build and their tags are immutable for
//! the duration of one build.

use serde::{Deserialize, Serialize};

/// A generation/storage project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    /// Load zone the project injects into
    pub zone: String,
    /// Capacity-type tag (e.g., "existing_gen", "new_build_gen")
    pub capacity_type: String,
    /// Operational-type tag (e.g., "thermal_commit", "variable_gen")
    pub operational_type: String,
    /// Availability-type tag (e.g., "always_available")
    pub availability_type: String,
    /// Reliability-type tag, if the project counts toward reserve margin
    pub reliability_type: Option<String>,
    /// Balancing type whose horizons govern this project's intertemporal
    /// constraints (ramps, storage continuity)
    pub balancing_type: String,
    /// Name of the stage at which this project's commitment is decided;
    /// later stages treat the commitment as fixed. `None` means the
    /// commitment (if any) is free in every stage.
    pub final_commitment_stage: Option<String>,
}

impl Project {
    pub fn new(
        name: impl Into<String>,
        zone: impl Into<String>,
        capacity_type: impl Into<String>,
        operational_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            zone: zone.into(),
            capacity_type: capacity_type.into(),
            operational_type: operational_type.into(),
            availability_type: "always_available".to_string(),
            reliability_type: None,
            balancing_type: "day".to_string(),
            final_commitment_stage: None,
        }
    }

    pub fn with_availability_type(mut self, tag: impl Into<String>) -> Self {
        self.availability_type = tag.into();
        self
    }

    pub fn with_balancing_type(mut self, balancing_type: impl Into<String>) -> Self {
        self.balancing_type = balancing_type.into();
        self
    }

    pub fn with_reliability_type(mut self, tag: impl Into<String>) -> Self {
        self.reliability_type = Some(tag.into());
        self
    }

    pub fn with_final_commitment_stage(mut self, stage_name: impl Into<String>) -> Self {
        self.final_commitment_stage = Some(stage_name.into());
        self
    }
}

/// A transmission line between two load zones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransmissionLine {
    pub name: String,
    pub from_zone: String,
    pub to_zone: String,
    /// Transmission-operational-type tag (e.g., "tx_simple")
    pub operational_type: String,
    /// Flow limit in the from→to direction (MW)
    pub max_flow_mw: f64,
    /// Flow limit in the to→from direction (MW, given as a negative bound)
    pub min_flow_mw: f64,
}

impl TransmissionLine {
    pub fn new(
        name: impl Into<String>,
        from_zone: impl Into<String>,
        to_zone: impl Into<String>,
        operational_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_zone: from_zone.into(),
            to_zone: to_zone.into(),
            operational_type: operational_type.into(),
            max_flow_mw: f64::INFINITY,
            min_flow_mw: f64::NEG_INFINITY,
        }
    }

    pub fn with_flow_limits(mut self, min_flow_mw: f64, max_flow_mw: f64) -> Self {
        self.min_flow_mw = min_flow_mw;
        self.max_flow_mw = max_flow_mw;
        self
    }
}

/// A reserve balancing area with a requirement to meet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveArea {
    pub name: String,
    /// Reserve-type tag (e.g., "spinning")
    pub reserve_type: String,
    /// Requirement in MW, applied at every timepoint
    pub requirement_mw: f64,
    /// Penalty for unmet requirement ($/MW)
    pub violation_penalty_per_mw: f64,
}

impl ReserveArea {
    pub fn new(
        name: impl Into<String>,
        reserve_type: impl Into<String>,
        requirement_mw: f64,
    ) -> Self {
        Self {
            name: name.into(),
            reserve_type: reserve_type.into(),
            requirement_mw,
            violation_penalty_per_mw: 1e6,
        }
    }

    pub fn with_violation_penalty(mut self, penalty_per_mw: f64) -> Self {
        self.violation_penalty_per_mw = penalty_per_mw;
        self
    }
}

/// A load zone: the demand-balance granularity of the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadZone {
    pub name: String,
    /// Whether unserved energy is allowed (at a penalty) in this zone
    pub allow_unserved_energy: bool,
    /// Penalty for unserved energy ($/MWh)
    pub unserved_energy_penalty_per_mwh: f64,
}

impl LoadZone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allow_unserved_energy: false,
            unserved_energy_penalty_per_mwh: 5e3,
        }
    }

    pub fn with_unserved_energy(mut self, penalty_per_mwh: f64) -> Self {
        self.allow_unserved_energy = true;
        self.unserved_energy_penalty_per_mwh = penalty_per_mwh;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_builder() {
        let project = Project::new("coal_1", "north", "existing_gen", "thermal_commit")
            .with_final_commitment_stage("day_ahead")
            .with_reliability_type("simple_capacity");

        assert_eq!(project.name, "coal_1");
        assert_eq!(project.capacity_type, "existing_gen");
        assert_eq!(project.availability_type, "always_available");
        assert_eq!(project.final_commitment_stage.as_deref(), Some("day_ahead"));
        assert_eq!(project.reliability_type.as_deref(), Some("simple_capacity"));
    }

    #[test]
    fn test_transmission_line_limits() {
        let line = TransmissionLine::new("north_south", "north", "south", "tx_simple")
            .with_flow_limits(-400.0, 500.0);
        assert_eq!(line.max_flow_mw, 500.0);
        assert_eq!(line.min_flow_mw, -400.0);
    }

    #[test]
    fn test_load_zone_defaults() {
        let zone = LoadZone::new("north");
        assert!(!zone.allow_unserved_energy);

        let zone = zone.with_unserved_energy(2e4);
        assert!(zone.allow_unserved_energy);
        assert_eq!(zone.unserved_energy_penalty_per_mwh, 2e4);
    }
}
