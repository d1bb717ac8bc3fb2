//! Code for reading per-timepoint project profiles: availability derates and capacity factors.
use super::*;
use crate::id::IDCollection;
use crate::project::{ProjectID, ProjectMap};
use crate::temporal::{TemporalHierarchy, TimepointID};
use crate::units::Dimensionless;
use serde::Deserialize;
use std::collections::HashMap;

const AVAILABILITY_FILE_NAME: &str = "project_availability.csv";
const VARIABLE_PROFILES_FILE_NAME: &str = "variable_profiles.csv";

/// A value for each project and timepoint
type ProfileMap = HashMap<(ProjectID, TimepointID), Dimensionless>;

#[derive(Deserialize, PartialEq, Debug)]
struct AvailabilityRaw {
    project: String,
    timepoint: TimepointID,
    #[serde(deserialize_with = "deserialise_proportion")]
    availability_derate: f64,
}

#[derive(Deserialize, PartialEq, Debug)]
struct CapacityFactorRaw {
    project: String,
    timepoint: TimepointID,
    #[serde(deserialize_with = "deserialise_proportion")]
    capacity_factor: f64,
}

/// Read availability derates for projects with exogenous availability.
///
/// The file is optional. Capacity is fully available in timepoints without a derate.
pub fn read_availability_derates(
    model_dir: &Path,
    projects: &ProjectMap,
    temporal: &TemporalHierarchy,
) -> Result<ProfileMap> {
    let file_path = model_dir.join(AVAILABILITY_FILE_NAME);
    let iter = read_csv_optional::<AvailabilityRaw>(&file_path)?
        .map(|raw| (raw.project, raw.timepoint, raw.availability_derate));
    read_profile_from_iter(iter, projects, temporal).with_context(|| input_err_msg(&file_path))
}

/// Read capacity factors for variable generation.
///
/// The file is optional.
pub fn read_capacity_factors(
    model_dir: &Path,
    projects: &ProjectMap,
    temporal: &TemporalHierarchy,
) -> Result<ProfileMap> {
    let file_path = model_dir.join(VARIABLE_PROFILES_FILE_NAME);
    let iter = read_csv_optional::<CapacityFactorRaw>(&file_path)?
        .map(|raw| (raw.project, raw.timepoint, raw.capacity_factor));
    read_profile_from_iter(iter, projects, temporal).with_context(|| input_err_msg(&file_path))
}

fn read_profile_from_iter<I>(
    iter: I,
    projects: &ProjectMap,
    temporal: &TemporalHierarchy,
) -> Result<ProfileMap>
where
    I: Iterator<Item = (String, TimepointID, f64)>,
{
    let mut profile = ProfileMap::new();
    for (project, timepoint, value) in iter {
        let project = projects.get_id_by_str(&project)?;
        ensure!(
            temporal.contains_timepoint(timepoint),
            "Unknown timepoint {timepoint} for project {project}"
        );
        ensure!(
            profile
                .insert((project.clone(), timepoint), Dimensionless(value))
                .is_none(),
            "Duplicate entry for project {project} in timepoint {timepoint}"
        );
    }

    Ok(profile)
}
