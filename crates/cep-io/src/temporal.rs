//! Readers for the temporal-hierarchy tables.
//!
//! The ETL layer delivers the realized temporal model as plain CSV rows;
//! this module assembles them into a [`TemporalModel`]. Expected files in
//! the scenario inputs directory:
//!
//! - `periods.csv` - `period,discount_factor,number_years_represented`
//! - `stages.csv` - `stage,stage_name,subproblem` (file order is stage order)
//! - `horizons.csv` - `horizon,balancing_type,period,boundary`
//! - `timepoints.csv` - `timepoint,period,stage,number_of_hours,weight,month,
//!   hour_of_day,previous_stage_timepoint,spinup_or_lookahead`
//! - `horizon_timepoints.csv` - `horizon,timepoint` (file order defines the
//!   horizon's previous/next chain)

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use cep_core::{
    Boundary, Horizon, HorizonId, Period, PeriodId, Stage, StageId, Subproblem, SubproblemId,
    TemporalModel, Timepoint, TimepointId,
};

use crate::error::{ImportError, ImportResult};

#[derive(Debug, Deserialize)]
struct PeriodRow {
    period: u64,
    discount_factor: f64,
    number_years_represented: f64,
}

#[derive(Debug, Deserialize)]
struct StageRow {
    stage: u64,
    stage_name: String,
    subproblem: u64,
}

#[derive(Debug, Deserialize)]
struct HorizonRow {
    horizon: u64,
    balancing_type: String,
    period: u64,
    boundary: Boundary,
}

#[derive(Debug, Deserialize)]
struct TimepointRow {
    timepoint: u64,
    period: u64,
    stage: u64,
    #[serde(default = "default_one")]
    number_of_hours: f64,
    #[serde(default = "default_one")]
    weight: f64,
    #[serde(default = "default_month")]
    month: u8,
    #[serde(default)]
    hour_of_day: u8,
    #[serde(default)]
    previous_stage_timepoint: Option<u64>,
    #[serde(default)]
    spinup_or_lookahead: bool,
}

#[derive(Debug, Deserialize)]
struct HorizonTimepointRow {
    horizon: u64,
    timepoint: u64,
}

fn default_one() -> f64 {
    1.0
}

fn default_month() -> u8 {
    1
}

fn read_rows<T: serde::de::DeserializeOwned>(path: &Path) -> ImportResult<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Load the full temporal hierarchy from a scenario inputs directory.
pub fn load_temporal_model(inputs_dir: &Path) -> ImportResult<TemporalModel> {
    let mut temporal = TemporalModel::new();

    for row in read_rows::<PeriodRow>(&inputs_dir.join("periods.csv"))? {
        temporal.add_period(Period::new(
            PeriodId::new(row.period),
            row.discount_factor,
            row.number_years_represented,
        ));
    }

    let stage_rows = read_rows::<StageRow>(&inputs_dir.join("stages.csv"))?;
    for row in &stage_rows {
        let subproblem = SubproblemId::new(row.subproblem);
        if temporal
            .subproblems()
            .all(|existing| existing.id != subproblem)
        {
            temporal.add_subproblem(Subproblem::new(subproblem));
        }
        temporal.add_stage(Stage::new(
            StageId::new(row.stage),
            row.stage_name.clone(),
            subproblem,
        ));
    }

    for row in read_rows::<HorizonRow>(&inputs_dir.join("horizons.csv"))? {
        temporal.add_horizon(Horizon::new(
            HorizonId::new(row.horizon),
            row.balancing_type,
            PeriodId::new(row.period),
            row.boundary,
        ));
    }

    for row in read_rows::<TimepointRow>(&inputs_dir.join("timepoints.csv"))? {
        let mut timepoint = Timepoint::new(
            TimepointId::new(row.timepoint),
            PeriodId::new(row.period),
            StageId::new(row.stage),
        )
        .with_hours(row.number_of_hours)
        .with_weight(row.weight)
        .with_month(row.month)
        .with_hour_of_day(row.hour_of_day);
        if let Some(prev) = row.previous_stage_timepoint {
            timepoint = timepoint.with_previous_stage_timepoint(TimepointId::new(prev));
        }
        if row.spinup_or_lookahead {
            timepoint = timepoint.as_spinup_or_lookahead();
        }
        temporal.add_timepoint(timepoint);
    }

    // File order within each horizon defines the previous/next chain
    let mut memberships: BTreeMap<u64, Vec<TimepointId>> = BTreeMap::new();
    for row in read_rows::<HorizonTimepointRow>(&inputs_dir.join("horizon_timepoints.csv"))? {
        memberships
            .entry(row.horizon)
            .or_default()
            .push(TimepointId::new(row.timepoint));
    }
    for (horizon, timepoints) in memberships {
        temporal
            .assign_horizon(HorizonId::new(horizon), timepoints)
            .map_err(|e| ImportError::Invalid(e.to_string()))?;
    }

    Ok(temporal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cep_core::Adjacent;
    use std::fs;

    fn write_fixture(dir: &Path) {
        fs::write(
            dir.join("periods.csv"),
            "period,discount_factor,number_years_represented\n2030,0.8,5.0\n",
        )
        .unwrap();
        fs::write(
            dir.join("stages.csv"),
            "stage,stage_name,subproblem\n1,day_ahead,1\n2,real_time,1\n",
        )
        .unwrap();
        fs::write(
            dir.join("horizons.csv"),
            "horizon,balancing_type,period,boundary\n1,day,2030,circular\n",
        )
        .unwrap();
        fs::write(
            dir.join("timepoints.csv"),
            "timepoint,period,stage,number_of_hours,weight,month,hour_of_day,previous_stage_timepoint,spinup_or_lookahead\n\
             1,2030,1,1.0,365.0,1,0,,false\n\
             2,2030,1,1.0,365.0,1,1,,false\n\
             3,2030,1,1.0,365.0,1,2,,true\n\
             101,2030,2,1.0,365.0,1,0,1,false\n",
        )
        .unwrap();
        fs::write(
            dir.join("horizon_timepoints.csv"),
            "horizon,timepoint\n1,1\n1,2\n1,3\n",
        )
        .unwrap();
    }

    #[test]
    fn test_load_temporal_model_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());

        let temporal = load_temporal_model(dir.path()).unwrap();
        let stats = temporal.stats();
        assert_eq!(stats.num_periods, 1);
        assert_eq!(stats.num_stages, 2);
        assert_eq!(stats.num_timepoints, 4);
        assert_eq!(stats.num_spinup_or_lookahead, 1);

        // Circular wrap from the loaded membership order
        assert_eq!(
            temporal
                .previous_timepoint("day", TimepointId::new(1))
                .unwrap(),
            Adjacent::Timepoint(TimepointId::new(3))
        );

        // Previous-stage mapping survives the round trip
        let tmp = temporal.timepoint(TimepointId::new(101)).unwrap();
        assert_eq!(tmp.previous_stage_timepoint, Some(TimepointId::new(1)));
        assert_eq!(tmp.stage, StageId::new(2));
    }

    #[test]
    fn test_unknown_timepoint_in_membership_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        fs::write(
            dir.path().join("horizon_timepoints.csv"),
            "horizon,timepoint\n1,999\n",
        )
        .unwrap();

        let err = load_temporal_model(dir.path()).unwrap_err();
        assert!(matches!(err, ImportError::Invalid(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_temporal_model(dir.path()).is_err());
    }
}
