//! Code for reading operating reserve data from CSV files.
use super::*;
use crate::id::IDCollection;
use crate::project::ProjectMap;
use crate::reserves::{ReserveData, ReserveEligibility, ReserveType};
use crate::temporal::{TemporalHierarchy, TimepointID};
use crate::units::{Dimensionless, Power};
use crate::zone::ZoneMap;
use serde::Deserialize;

const REQUIREMENTS_FILE_NAME: &str = "reserve_requirements.csv";
const PROJECT_RESERVES_FILE_NAME: &str = "project_reserves.csv";

#[derive(Deserialize, PartialEq, Debug)]
struct ReserveRequirementRaw {
    reserve_type: ReserveType,
    zone: String,
    timepoint: TimepointID,
    requirement_mw: f64,
}

#[derive(Deserialize, PartialEq, Debug)]
struct ProjectReserveRaw {
    project: String,
    reserve_type: ReserveType,
    #[serde(default)]
    max_fraction: Option<f64>,
}

/// Read reserve requirements and the projects eligible to provide each reserve.
///
/// Both files are optional.
pub fn read_reserve_data(
    model_dir: &Path,
    zones: &ZoneMap,
    projects: &ProjectMap,
    temporal: &TemporalHierarchy,
) -> Result<ReserveData> {
    let mut data = ReserveData::default();

    let file_path = model_dir.join(REQUIREMENTS_FILE_NAME);
    read_requirements_from_iter(read_csv_optional(&file_path)?, zones, temporal, &mut data)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(PROJECT_RESERVES_FILE_NAME);
    read_eligibility_from_iter(read_csv_optional(&file_path)?, projects, &mut data)
        .with_context(|| input_err_msg(&file_path))?;

    Ok(data)
}

fn read_requirements_from_iter<I>(
    iter: I,
    zones: &ZoneMap,
    temporal: &TemporalHierarchy,
    data: &mut ReserveData,
) -> Result<()>
where
    I: Iterator<Item = ReserveRequirementRaw>,
{
    for raw in iter {
        let zone = zones.get_id_by_str(&raw.zone)?;
        ensure!(
            temporal.contains_timepoint(raw.timepoint),
            "Unknown timepoint {} in {} requirement for zone {zone}",
            raw.timepoint,
            raw.reserve_type
        );
        check_nonnegative(raw.requirement_mw, "requirement_mw")?;
        ensure!(
            data.requirements
                .insert(
                    (raw.reserve_type, zone.clone(), raw.timepoint),
                    Power(raw.requirement_mw)
                )
                .is_none(),
            "Duplicate {} requirement for zone {zone} in timepoint {}",
            raw.reserve_type,
            raw.timepoint
        );
    }

    Ok(())
}

fn read_eligibility_from_iter<I>(iter: I, projects: &ProjectMap, data: &mut ReserveData) -> Result<()>
where
    I: Iterator<Item = ProjectReserveRaw>,
{
    for raw in iter {
        let project = projects.get_id_by_str(&raw.project)?;
        if let Some(fraction) = raw.max_fraction {
            ensure!(
                fraction > 0.0 && fraction <= 1.0,
                "max_fraction for project {project} must be in the range (0, 1]"
            );
        }
        ensure!(
            !data.eligibility.iter().any(|eligibility| {
                eligibility.project == project && eligibility.reserve_type == raw.reserve_type
            }),
            "Duplicate {} eligibility for project {project}",
            raw.reserve_type
        );

        data.eligibility.push(ReserveEligibility {
            project,
            reserve_type: raw.reserve_type,
            max_fraction: raw.max_fraction.map(Dimensionless),
        });
    }

    Ok(())
}
