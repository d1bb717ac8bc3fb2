//! Code for reading the temporal hierarchy from CSV files.
use super::*;
use crate::temporal::{
    BoundaryPolicy, Horizon, HorizonID, Period, PeriodID, TemporalHierarchy, Timepoint,
    TimepointID,
};
use crate::units::{Dimensionless, Hours};
use serde::Deserialize;
use std::collections::HashSet;

const PERIODS_FILE_NAME: &str = "periods.csv";
const HORIZONS_FILE_NAME: &str = "horizons.csv";
const TIMEPOINTS_FILE_NAME: &str = "timepoints.csv";

#[derive(Deserialize, PartialEq, Debug)]
struct PeriodRaw {
    period: PeriodID,
    discount_factor: f64,
    years_represented: f64,
}

#[derive(Deserialize, PartialEq, Debug)]
struct HorizonRaw {
    horizon: HorizonID,
    period: PeriodID,
    boundary: BoundaryPolicy,
    weight: f64,
}

#[derive(Deserialize, PartialEq, Debug)]
struct TimepointRaw {
    timepoint: TimepointID,
    horizon: HorizonID,
    duration_hours: f64,
    #[serde(default)]
    subproblem: Option<u32>,
    #[serde(default)]
    stage: Option<u32>,
}

/// Read periods, horizons and timepoints from the model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_temporal_hierarchy(model_dir: &Path) -> Result<TemporalHierarchy> {
    let file_path = model_dir.join(PERIODS_FILE_NAME);
    let periods = read_periods_from_iter(read_csv(&file_path)?)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(HORIZONS_FILE_NAME);
    let horizons = read_horizons_from_iter(read_csv(&file_path)?)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(TIMEPOINTS_FILE_NAME);
    let timepoints = read_timepoints_from_iter(read_csv(&file_path)?)
        .with_context(|| input_err_msg(&file_path))?;

    TemporalHierarchy::new(periods, horizons, timepoints)
        .with_context(|| input_err_msg(&file_path))
}

fn read_periods_from_iter<I>(iter: I) -> Result<Vec<Period>>
where
    I: Iterator<Item = PeriodRaw>,
{
    let mut ids = HashSet::new();
    iter.map(|raw| -> Result<_> {
        ensure!(ids.insert(raw.period), "Duplicate period {}", raw.period);
        check_nonnegative(raw.discount_factor, "discount_factor")?;
        check_positive(raw.years_represented, "years_represented")?;
        Ok(Period {
            id: raw.period,
            discount_factor: Dimensionless(raw.discount_factor),
            years_represented: Dimensionless(raw.years_represented),
        })
    })
    .collect()
}

fn read_horizons_from_iter<I>(iter: I) -> Result<Vec<Horizon>>
where
    I: Iterator<Item = HorizonRaw>,
{
    let mut ids = HashSet::new();
    iter.map(|raw| -> Result<_> {
        ensure!(ids.insert(raw.horizon), "Duplicate horizon {}", raw.horizon);
        check_positive(raw.weight, "weight")?;
        Ok(Horizon {
            id: raw.horizon,
            period: raw.period,
            boundary: raw.boundary,
            weight: Dimensionless(raw.weight),
            timepoints: Vec::new(),
        })
    })
    .collect()
}

fn read_timepoints_from_iter<I>(iter: I) -> Result<Vec<Timepoint>>
where
    I: Iterator<Item = TimepointRaw>,
{
    let mut ids = HashSet::new();
    iter.map(|raw| -> Result<_> {
        ensure!(ids.insert(raw.timepoint), "Duplicate timepoint {}", raw.timepoint);
        check_positive(raw.duration_hours, "duration_hours")?;
        Ok(Timepoint {
            id: raw.timepoint,
            horizon: raw.horizon,
            // Filled in from the horizon when the hierarchy is built
            period: 0,
            duration: Hours(raw.duration_hours),
            subproblem: raw.subproblem.unwrap_or(1),
            stage: raw.stage.unwrap_or(1),
        })
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut file = File::create(dir.join(name)).unwrap();
        writeln!(file, "{contents}").unwrap();
    }

    #[test]
    fn test_read_temporal_hierarchy() {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            PERIODS_FILE_NAME,
            "period,discount_factor,years_represented\n2030,1.0,10\n2040,0.5,10",
        );
        write_file(
            dir.path(),
            HORIZONS_FILE_NAME,
            "horizon,period,boundary,weight\n1,2030,circular,365\n2,2040,linear,365",
        );
        write_file(
            dir.path(),
            TIMEPOINTS_FILE_NAME,
            "timepoint,horizon,duration_hours,subproblem,stage\n1,1,12,1,1\n2,1,12,1,\n3,2,24,2,1",
        );

        let temporal = read_temporal_hierarchy(dir.path()).unwrap();
        assert_eq!(temporal.iter_period_ids().collect::<Vec<_>>(), [2030, 2040]);
        assert_eq!(temporal.period_of(3), 2040);
        assert_eq!(temporal.previous(1), Some(2));
        assert_eq!(temporal.previous(3), None);
        assert_eq!(temporal.subproblem_stages(), [(1, 1), (2, 1)]);
    }

    #[test]
    fn test_read_periods_invalid() {
        let raw = |period, years_represented| PeriodRaw {
            period,
            discount_factor: 1.0,
            years_represented,
        };
        assert_error!(
            read_periods_from_iter([raw(2030, 10.0), raw(2030, 10.0)].into_iter()),
            "Duplicate period 2030"
        );
        assert_error!(
            read_periods_from_iter([raw(2030, 0.0)].into_iter()),
            "years_represented must be a finite number greater than zero"
        );
    }

    #[test]
    fn test_read_timepoints_invalid_duration() {
        let raw = TimepointRaw {
            timepoint: 1,
            horizon: 1,
            duration_hours: -1.0,
            subproblem: None,
            stage: None,
        };
        assert_error!(
            read_timepoints_from_iter([raw].into_iter()),
            "duration_hours must be a finite number greater than zero"
        );
    }
}
