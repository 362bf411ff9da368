//! # cep-core: Capacity-Expansion Modeling Core
//!
//! Provides the temporal hierarchy and entity data structures that every other
//! crate in the CEP workspace builds on.
//!
//! ## Design Philosophy
//!
//! A capacity-expansion and dispatch model is indexed by a **multi-level
//! temporal hierarchy**:
//!
//! - **Periods**: investment periods (e.g., 2025, 2030) with discounting data
//! - **Subproblems**: independently solved slices of the planning horizon
//! - **Stages**: ordered commitment stages within a subproblem (e.g.,
//!   day-ahead, real-time)
//! - **Horizons**: balancing windows over which intertemporal constraints
//!   (ramps, storage continuity) are enforced, with linear or circular
//!   boundaries
//! - **Timepoints**: the finest dispatch resolution, weighted to represent
//!   many hours
//!
//! The [`TemporalModel`] is constructed once per scenario build and handed,
//! read-only, to every downstream component. Its `previous_timepoint` /
//! `next_timepoint` lookups are the single source of truth for horizon
//! boundary semantics: rule code must never re-derive "is this the first
//! timepoint of a linear horizon" locally.
//!
//! ## Quick Start
//!
//! ```rust
//! use cep_core::*;
//!
//! let mut temporal = TemporalModel::new();
//! temporal.add_period(Period::new(PeriodId::new(2030), 0.8, 5.0));
//! let sub = SubproblemId::new(1);
//! temporal.add_subproblem(Subproblem::new(sub));
//! temporal.add_stage(Stage::new(StageId::new(1), "day_ahead", sub));
//!
//! let horizon = HorizonId::new(1);
//! temporal.add_horizon(Horizon::new(
//!     horizon,
//!     "day",
//!     PeriodId::new(2030),
//!     Boundary::Circular,
//! ));
//! for hour in 0..24 {
//!     temporal.add_timepoint(
//!         Timepoint::new(TimepointId::new(hour + 1), PeriodId::new(2030), StageId::new(1))
//!             .with_hour_of_day(hour as u8),
//!     );
//! }
//! temporal
//!     .assign_horizon(horizon, (1..=24).map(TimepointId::new).collect())
//!     .unwrap();
//!
//! // Circular horizon: the timepoint before the first is the last.
//! assert_eq!(
//!     temporal.previous_timepoint("day", TimepointId::new(1)).unwrap(),
//!     Adjacent::Timepoint(TimepointId::new(24)),
//! );
//! ```
//!
//! ## Modules
//!
//! - [`diagnostics`] - Validation and diagnostic reporting
//! - [`entities`] - Projects, transmission lines, reserve areas and their type tags
//! - [`network`] - Load-zone / transmission topology
//! - [`commitment`] - Stage ordering and cross-stage commitment records

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

pub mod commitment;
pub mod diagnostics;
pub mod entities;
pub mod error;
pub mod network;

pub use commitment::{CommitmentLedger, CommitmentRecord, CommitmentState, StageOrder};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use entities::{LoadZone, Project, ReserveArea, TransmissionLine};
pub use error::{CepError, CepResult};
pub use network::{ZoneNetwork, ZoneNetworkStats};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodId(u64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubproblemId(u64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(u64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HorizonId(u64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimepointId(u64);

impl PeriodId {
    #[inline]
    pub fn new(value: u64) -> Self {
        PeriodId(value)
    }
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl SubproblemId {
    #[inline]
    pub fn new(value: u64) -> Self {
        SubproblemId(value)
    }
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl StageId {
    #[inline]
    pub fn new(value: u64) -> Self {
        StageId(value)
    }
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl HorizonId {
    #[inline]
    pub fn new(value: u64) -> Self {
        HorizonId(value)
    }
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl TimepointId {
    #[inline]
    pub fn new(value: u64) -> Self {
        TimepointId(value)
    }
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// An investment period (e.g., a model year). Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Period {
    pub id: PeriodId,
    /// Discount factor applied to this period's costs in the objective
    pub discount_factor: f64,
    /// How many calendar years this period stands in for
    pub number_years_represented: f64,
}

impl Period {
    pub fn new(id: PeriodId, discount_factor: f64, number_years_represented: f64) -> Self {
        Self {
            id,
            discount_factor,
            number_years_represented,
        }
    }

    /// Combined objective weight for costs incurred in this period.
    pub fn objective_weight(&self) -> f64 {
        self.discount_factor * self.number_years_represented
    }
}

/// An independently solved slice of the planning horizon.
///
/// Owns an ordered list of stages; the stage order within a subproblem is
/// the total order used for final-commitment-stage comparisons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subproblem {
    pub id: SubproblemId,
    pub stages: Vec<StageId>,
}

impl Subproblem {
    pub fn new(id: SubproblemId) -> Self {
        Self {
            id,
            stages: Vec::new(),
        }
    }
}

/// A commitment stage within a subproblem (e.g., "day_ahead", "real_time").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub name: String,
    pub subproblem: SubproblemId,
}

impl Stage {
    pub fn new(id: StageId, name: impl Into<String>, subproblem: SubproblemId) -> Self {
        Self {
            id,
            name: name.into(),
            subproblem,
        }
    }
}

/// Boundary semantics of a horizon.
///
/// Governs whether the horizon's first timepoint has a defined previous
/// timepoint: a circular horizon wraps around to its last timepoint, a
/// linear horizon does not wrap and edge lookups are not applicable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Boundary {
    Linear,
    Circular,
}

/// A balancing window over which intertemporal constraints are enforced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Horizon {
    pub id: HorizonId,
    /// Balancing type this horizon belongs to (e.g., "day", "week", "year")
    pub balancing_type: String,
    pub period: PeriodId,
    pub boundary: Boundary,
}

impl Horizon {
    pub fn new(
        id: HorizonId,
        balancing_type: impl Into<String>,
        period: PeriodId,
        boundary: Boundary,
    ) -> Self {
        Self {
            id,
            balancing_type: balancing_type.into(),
            period,
            boundary,
        }
    }
}

/// The finest dispatch resolution of the model.
///
/// Timepoints are partitioned by (subproblem, stage) and associated with
/// zero or more (balancing type, horizon) pairs via
/// [`TemporalModel::assign_horizon`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timepoint {
    pub id: TimepointId,
    pub period: PeriodId,
    pub stage: StageId,
    /// Duration represented by this timepoint, in hours
    pub number_of_hours: f64,
    /// How many times this timepoint counts toward period-level totals
    pub weight: f64,
    pub month: u8,
    pub hour_of_day: u8,
    /// The corresponding timepoint in the previous stage, if any.
    /// Used to map pass-through commitments across stages.
    pub previous_stage_timepoint: Option<TimepointId>,
    /// Spinup/lookahead timepoints are constrained but excluded from
    /// results export and cost aggregation.
    pub spinup_or_lookahead: bool,
}

impl Timepoint {
    pub fn new(id: TimepointId, period: PeriodId, stage: StageId) -> Self {
        Self {
            id,
            period,
            stage,
            number_of_hours: 1.0,
            weight: 1.0,
            month: 1,
            hour_of_day: 0,
            previous_stage_timepoint: None,
            spinup_or_lookahead: false,
        }
    }

    pub fn with_hours(mut self, number_of_hours: f64) -> Self {
        self.number_of_hours = number_of_hours;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_month(mut self, month: u8) -> Self {
        self.month = month;
        self
    }

    pub fn with_hour_of_day(mut self, hour_of_day: u8) -> Self {
        self.hour_of_day = hour_of_day;
        self
    }

    pub fn with_previous_stage_timepoint(mut self, tmp: TimepointId) -> Self {
        self.previous_stage_timepoint = Some(tmp);
        self
    }

    pub fn as_spinup_or_lookahead(mut self) -> Self {
        self.spinup_or_lookahead = true;
        self
    }
}

/// Outcome of a previous/next-timepoint lookup.
///
/// `NotApplicable` is a sentinel, not an error: it marks the edge of a
/// linear horizon, where rules that depend on a neighbouring timepoint
/// (ramps, startup/shutdown transitions, storage continuity) must be
/// skipped rather than fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjacent {
    Timepoint(TimepointId),
    NotApplicable,
}

impl Adjacent {
    /// The neighbouring timepoint, if one exists.
    pub fn timepoint(&self) -> Option<TimepointId> {
        match self {
            Adjacent::Timepoint(tmp) => Some(*tmp),
            Adjacent::NotApplicable => None,
        }
    }
}

/// The realized temporal hierarchy for one scenario build.
///
/// Constructed once from external rows (see `cep-io`), then handed
/// read-only to every later component.
#[derive(Debug, Clone, Default)]
pub struct TemporalModel {
    periods: BTreeMap<PeriodId, Period>,
    subproblems: BTreeMap<SubproblemId, Subproblem>,
    stages: BTreeMap<StageId, Stage>,
    horizons: BTreeMap<HorizonId, Horizon>,
    timepoints: BTreeMap<TimepointId, Timepoint>,
    /// Ordered timepoint membership per horizon
    horizon_timepoints: BTreeMap<HorizonId, Vec<TimepointId>>,
    /// Position of a timepoint within its horizon's ordered list
    horizon_positions: HashMap<(HorizonId, TimepointId), usize>,
    /// Horizon lookup per (balancing type, timepoint)
    timepoint_horizon: HashMap<(String, TimepointId), HorizonId>,
}

impl TemporalModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_period(&mut self, period: Period) {
        self.periods.insert(period.id, period);
    }

    pub fn add_subproblem(&mut self, subproblem: Subproblem) {
        self.subproblems.insert(subproblem.id, subproblem);
    }

    pub fn add_stage(&mut self, stage: Stage) {
        if let Some(subproblem) = self.subproblems.get_mut(&stage.subproblem) {
            subproblem.stages.push(stage.id);
        }
        self.stages.insert(stage.id, stage);
    }

    pub fn add_horizon(&mut self, horizon: Horizon) {
        self.horizons.insert(horizon.id, horizon);
    }

    pub fn add_timepoint(&mut self, timepoint: Timepoint) {
        self.timepoints.insert(timepoint.id, timepoint);
    }

    /// Associate an ordered list of timepoints with a horizon.
    ///
    /// The order given here defines the horizon's previous/next chain.
    pub fn assign_horizon(
        &mut self,
        horizon: HorizonId,
        timepoints: Vec<TimepointId>,
    ) -> CepResult<()> {
        let hz = self
            .horizons
            .get(&horizon)
            .ok_or_else(|| CepError::Config(format!("unknown horizon {}", horizon.value())))?;
        let balancing_type = hz.balancing_type.clone();
        for (pos, tmp) in timepoints.iter().enumerate() {
            if !self.timepoints.contains_key(tmp) {
                return Err(CepError::Config(format!(
                    "horizon {} references unknown timepoint {}",
                    horizon.value(),
                    tmp.value()
                )));
            }
            self.horizon_positions.insert((horizon, *tmp), pos);
            self.timepoint_horizon
                .insert((balancing_type.clone(), *tmp), horizon);
        }
        self.horizon_timepoints.insert(horizon, timepoints);
        Ok(())
    }

    pub fn period(&self, id: PeriodId) -> Option<&Period> {
        self.periods.get(&id)
    }

    pub fn stage(&self, id: StageId) -> Option<&Stage> {
        self.stages.get(&id)
    }

    pub fn horizon(&self, id: HorizonId) -> Option<&Horizon> {
        self.horizons.get(&id)
    }

    pub fn timepoint(&self, id: TimepointId) -> Option<&Timepoint> {
        self.timepoints.get(&id)
    }

    pub fn periods(&self) -> impl Iterator<Item = &Period> {
        self.periods.values()
    }

    pub fn subproblems(&self) -> impl Iterator<Item = &Subproblem> {
        self.subproblems.values()
    }

    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.stages.values()
    }

    pub fn horizons(&self) -> impl Iterator<Item = &Horizon> {
        self.horizons.values()
    }

    pub fn timepoints(&self) -> impl Iterator<Item = &Timepoint> {
        self.timepoints.values()
    }

    /// Boundary semantics of a horizon.
    pub fn boundary_of(&self, horizon: HorizonId) -> CepResult<Boundary> {
        self.horizons
            .get(&horizon)
            .map(|hz| hz.boundary)
            .ok_or_else(|| CepError::Config(format!("unknown horizon {}", horizon.value())))
    }

    /// The horizon a timepoint belongs to for a given balancing type.
    pub fn horizon_of(&self, balancing_type: &str, tmp: TimepointId) -> CepResult<HorizonId> {
        self.timepoint_horizon
            .get(&(balancing_type.to_string(), tmp))
            .copied()
            .ok_or_else(|| {
                CepError::Config(format!(
                    "timepoint {} is not on any '{}' horizon",
                    tmp.value(),
                    balancing_type
                ))
            })
    }

    /// The timepoint before `tmp` on its `balancing_type` horizon.
    ///
    /// For a circular horizon the timepoint before the first is the last;
    /// for a linear horizon the first timepoint has no predecessor and
    /// [`Adjacent::NotApplicable`] is returned. An unknown timepoint or
    /// balancing type is an error, distinct from the sentinel.
    pub fn previous_timepoint(
        &self,
        balancing_type: &str,
        tmp: TimepointId,
    ) -> CepResult<Adjacent> {
        let horizon = self.horizon_of(balancing_type, tmp)?;
        let members = &self.horizon_timepoints[&horizon];
        let pos = self.horizon_positions[&(horizon, tmp)];
        if pos == 0 {
            match self.boundary_of(horizon)? {
                Boundary::Circular => Ok(Adjacent::Timepoint(
                    *members.last().expect("assigned horizon is non-empty"),
                )),
                Boundary::Linear => Ok(Adjacent::NotApplicable),
            }
        } else {
            Ok(Adjacent::Timepoint(members[pos - 1]))
        }
    }

    /// The timepoint after `tmp` on its `balancing_type` horizon.
    ///
    /// Mirror image of [`Self::previous_timepoint`].
    pub fn next_timepoint(&self, balancing_type: &str, tmp: TimepointId) -> CepResult<Adjacent> {
        let horizon = self.horizon_of(balancing_type, tmp)?;
        let members = &self.horizon_timepoints[&horizon];
        let pos = self.horizon_positions[&(horizon, tmp)];
        if pos + 1 == members.len() {
            match self.boundary_of(horizon)? {
                Boundary::Circular => Ok(Adjacent::Timepoint(members[0])),
                Boundary::Linear => Ok(Adjacent::NotApplicable),
            }
        } else {
            Ok(Adjacent::Timepoint(members[pos + 1]))
        }
    }

    /// All timepoints in a period, in id order.
    pub fn timepoints_in_period(&self, period: PeriodId) -> Vec<TimepointId> {
        self.timepoints
            .values()
            .filter(|tmp| tmp.period == period)
            .map(|tmp| tmp.id)
            .collect()
    }

    /// The ordered timepoints of a horizon.
    pub fn timepoints_in_horizon(&self, horizon: HorizonId) -> CepResult<&[TimepointId]> {
        self.horizon_timepoints
            .get(&horizon)
            .map(|tmps| tmps.as_slice())
            .ok_or_else(|| {
                CepError::Config(format!("horizon {} has no timepoints", horizon.value()))
            })
    }

    /// All timepoints in a stage, in id order.
    pub fn timepoints_in_stage(&self, stage: StageId) -> Vec<TimepointId> {
        self.timepoints
            .values()
            .filter(|tmp| tmp.stage == stage)
            .map(|tmp| tmp.id)
            .collect()
    }

    /// Compute basic statistics about the temporal hierarchy.
    pub fn stats(&self) -> TemporalStats {
        let mut stats = TemporalStats {
            num_periods: self.periods.len(),
            num_subproblems: self.subproblems.len(),
            num_stages: self.stages.len(),
            num_horizons: self.horizons.len(),
            num_timepoints: self.timepoints.len(),
            ..TemporalStats::default()
        };
        for tmp in self.timepoints.values() {
            stats.total_weighted_hours += tmp.number_of_hours * tmp.weight;
            if tmp.spinup_or_lookahead {
                stats.num_spinup_or_lookahead += 1;
            }
        }
        stats
    }

    /// Validate the hierarchy for common issues that break model builds.
    ///
    /// Populates the provided `Diagnostics` with any warnings/errors found.
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        if self.periods.is_empty() {
            diag.add_error("structure", "Temporal model has no periods");
            return; // Can't check further
        }
        if self.timepoints.is_empty() {
            diag.add_error("structure", "Temporal model has no timepoints");
            return;
        }

        for tmp in self.timepoints.values() {
            if !self.periods.contains_key(&tmp.period) {
                diag.add_error_with_entity(
                    "structure",
                    &format!("timepoint references unknown period {}", tmp.period.value()),
                    &format!("timepoint {}", tmp.id.value()),
                );
            }
            if !self.stages.contains_key(&tmp.stage) {
                diag.add_error_with_entity(
                    "structure",
                    &format!("timepoint references unknown stage {}", tmp.stage.value()),
                    &format!("timepoint {}", tmp.id.value()),
                );
            }
            if tmp.weight <= 0.0 {
                diag.add_error_with_entity(
                    "structure",
                    "timepoint weight must be positive",
                    &format!("timepoint {}", tmp.id.value()),
                );
            }
            if tmp.number_of_hours <= 0.0 {
                diag.add_error_with_entity(
                    "structure",
                    "timepoint duration must be positive",
                    &format!("timepoint {}", tmp.id.value()),
                );
            }
        }

        for (horizon, members) in &self.horizon_timepoints {
            let hz = &self.horizons[horizon];
            if members.is_empty() {
                diag.add_error_with_entity(
                    "structure",
                    "horizon has no timepoints",
                    &format!("horizon {}", horizon.value()),
                );
                continue;
            }
            for tmp in members {
                if let Some(timepoint) = self.timepoints.get(tmp) {
                    if timepoint.period != hz.period {
                        diag.add_error_with_entity(
                            "structure",
                            &format!(
                                "timepoint {} is in period {} but horizon is in period {}",
                                tmp.value(),
                                timepoint.period.value(),
                                hz.period.value()
                            ),
                            &format!("horizon {}", horizon.value()),
                        );
                    }
                }
            }
        }

        for horizon in self.horizons.keys() {
            if !self.horizon_timepoints.contains_key(horizon) {
                diag.add_warning_with_entity(
                    "structure",
                    "horizon has no assigned timepoints",
                    &format!("horizon {}", horizon.value()),
                );
            }
        }

        for period in self.periods.values() {
            if period.discount_factor <= 0.0 {
                diag.add_error_with_entity(
                    "structure",
                    "discount factor must be positive",
                    &format!("period {}", period.id.value()),
                );
            }
        }
    }
}

/// Statistics about a temporal hierarchy's size
#[derive(Debug, Clone, Default)]
pub struct TemporalStats {
    pub num_periods: usize,
    pub num_subproblems: usize,
    pub num_stages: usize,
    pub num_horizons: usize,
    pub num_timepoints: usize,
    pub num_spinup_or_lookahead: usize,
    pub total_weighted_hours: f64,
}

impl std::fmt::Display for TemporalStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} periods, {} stages, {} horizons, {} timepoints ({:.0} weighted hours)",
            self.num_periods,
            self.num_stages,
            self.num_horizons,
            self.num_timepoints,
            self.total_weighted_hours
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day_model(boundary: Boundary) -> TemporalModel {
        let mut temporal = TemporalModel::new();
        temporal.add_period(Period::new(PeriodId::new(2030), 0.8, 5.0));
        let sub = SubproblemId::new(1);
        temporal.add_subproblem(Subproblem::new(sub));
        temporal.add_stage(Stage::new(StageId::new(1), "day_ahead", sub));
        temporal.add_horizon(Horizon::new(
            HorizonId::new(1),
            "day",
            PeriodId::new(2030),
            boundary,
        ));
        for hour in 0..24u64 {
            temporal.add_timepoint(
                Timepoint::new(TimepointId::new(hour + 1), PeriodId::new(2030), StageId::new(1))
                    .with_hour_of_day(hour as u8),
            );
        }
        temporal
            .assign_horizon(HorizonId::new(1), (1..=24).map(TimepointId::new).collect())
            .unwrap();
        temporal
    }

    #[test]
    fn test_circular_horizon_wraps_previous() {
        let temporal = day_model(Boundary::Circular);
        assert_eq!(
            temporal
                .previous_timepoint("day", TimepointId::new(1))
                .unwrap(),
            Adjacent::Timepoint(TimepointId::new(24))
        );
        assert_eq!(
            temporal
                .previous_timepoint("day", TimepointId::new(13))
                .unwrap(),
            Adjacent::Timepoint(TimepointId::new(12))
        );
    }

    #[test]
    fn test_linear_horizon_edge_is_not_applicable() {
        let temporal = day_model(Boundary::Linear);
        assert_eq!(
            temporal
                .previous_timepoint("day", TimepointId::new(1))
                .unwrap(),
            Adjacent::NotApplicable
        );
        // Interior lookups are unaffected by the boundary
        assert_eq!(
            temporal
                .previous_timepoint("day", TimepointId::new(2))
                .unwrap(),
            Adjacent::Timepoint(TimepointId::new(1))
        );
    }

    #[test]
    fn test_next_timepoint_mirrors_previous() {
        let circular = day_model(Boundary::Circular);
        assert_eq!(
            circular.next_timepoint("day", TimepointId::new(24)).unwrap(),
            Adjacent::Timepoint(TimepointId::new(1))
        );

        let linear = day_model(Boundary::Linear);
        assert_eq!(
            linear.next_timepoint("day", TimepointId::new(24)).unwrap(),
            Adjacent::NotApplicable
        );
        assert_eq!(
            linear.next_timepoint("day", TimepointId::new(5)).unwrap(),
            Adjacent::Timepoint(TimepointId::new(6))
        );
    }

    #[test]
    fn test_unknown_timepoint_is_error_not_sentinel() {
        let temporal = day_model(Boundary::Circular);
        assert!(temporal
            .previous_timepoint("day", TimepointId::new(99))
            .is_err());
        assert!(temporal
            .previous_timepoint("week", TimepointId::new(1))
            .is_err());
    }

    #[test]
    fn test_timepoints_in_lookups() {
        let temporal = day_model(Boundary::Circular);
        assert_eq!(temporal.timepoints_in_period(PeriodId::new(2030)).len(), 24);
        assert_eq!(temporal.timepoints_in_stage(StageId::new(1)).len(), 24);
        assert_eq!(
            temporal
                .timepoints_in_horizon(HorizonId::new(1))
                .unwrap()
                .len(),
            24
        );
        assert!(temporal.timepoints_in_period(PeriodId::new(2040)).is_empty());
    }

    #[test]
    fn test_boundary_of() {
        let temporal = day_model(Boundary::Circular);
        assert_eq!(
            temporal.boundary_of(HorizonId::new(1)).unwrap(),
            Boundary::Circular
        );
        assert!(temporal.boundary_of(HorizonId::new(9)).is_err());
    }

    #[test]
    fn test_assign_horizon_rejects_unknown_timepoint() {
        let mut temporal = day_model(Boundary::Circular);
        temporal.add_horizon(Horizon::new(
            HorizonId::new(2),
            "week",
            PeriodId::new(2030),
            Boundary::Linear,
        ));
        let err = temporal
            .assign_horizon(HorizonId::new(2), vec![TimepointId::new(999)])
            .unwrap_err();
        assert!(err.to_string().contains("999"));
    }

    #[test]
    fn test_stats() {
        let mut temporal = day_model(Boundary::Circular);
        temporal.add_timepoint(
            Timepoint::new(TimepointId::new(25), PeriodId::new(2030), StageId::new(1))
                .with_weight(364.0)
                .as_spinup_or_lookahead(),
        );
        let stats = temporal.stats();
        assert_eq!(stats.num_periods, 1);
        assert_eq!(stats.num_timepoints, 25);
        assert_eq!(stats.num_spinup_or_lookahead, 1);
        assert!((stats.total_weighted_hours - (24.0 + 364.0)).abs() < 1e-9);
    }

    #[test]
    fn test_validation_empty() {
        let temporal = TemporalModel::new();
        let mut diag = Diagnostics::new();
        temporal.validate_into(&mut diag);
        assert!(diag.has_errors());
        assert!(diag.errors().any(|i| i.message.contains("no periods")));
    }

    #[test]
    fn test_validation_flags_bad_weight_and_period_mismatch() {
        let mut temporal = day_model(Boundary::Circular);
        temporal.add_timepoint(
            Timepoint::new(TimepointId::new(30), PeriodId::new(2030), StageId::new(1))
                .with_weight(0.0),
        );
        temporal.add_period(Period::new(PeriodId::new(2040), 0.6, 5.0));
        temporal.add_horizon(Horizon::new(
            HorizonId::new(2),
            "week",
            PeriodId::new(2040),
            Boundary::Linear,
        ));
        temporal
            .assign_horizon(HorizonId::new(2), vec![TimepointId::new(1)])
            .unwrap();

        let mut diag = Diagnostics::new();
        temporal.validate_into(&mut diag);
        assert!(diag
            .errors()
            .any(|i| i.message.contains("weight must be positive")));
        assert!(diag.errors().any(|i| i.message.contains("period 2040")));
    }

    #[test]
    fn test_validation_clean_model() {
        let temporal = day_model(Boundary::Circular);
        let mut diag = Diagnostics::new();
        temporal.validate_into(&mut diag);
        assert!(!diag.has_errors());
    }

    #[test]
    fn test_period_objective_weight() {
        let period = Period::new(PeriodId::new(2030), 0.8, 5.0);
        assert!((period.objective_weight() - 4.0).abs() < 1e-12);
    }
}
