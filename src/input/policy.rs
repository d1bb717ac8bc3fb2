//! Code for reading policy zones and targets from CSV files.
use super::*;
use crate::id::IDCollection;
use crate::policy::{PolicyData, PolicyMembership, PolicyType};
use crate::project::ProjectMap;
use crate::temporal::{PeriodID, TemporalHierarchy};
use serde::Deserialize;

const POLICY_ZONES_FILE_NAME: &str = "policy_zones.csv";
const POLICY_TARGETS_FILE_NAME: &str = "policy_targets.csv";

#[derive(Deserialize, PartialEq, Debug)]
struct PolicyZoneRaw {
    project: String,
    policy_type: PolicyType,
    policy_zone: String,
}

#[derive(Deserialize, PartialEq, Debug)]
struct PolicyTargetRaw {
    policy_type: PolicyType,
    policy_zone: String,
    period: PeriodID,
    target: f64,
}

/// Read policy zone memberships and targets.
///
/// Both files are optional. Every target must refer to a policy zone with at least one member.
pub fn read_policy_data(
    model_dir: &Path,
    projects: &ProjectMap,
    temporal: &TemporalHierarchy,
) -> Result<PolicyData> {
    let mut data = PolicyData::default();

    let file_path = model_dir.join(POLICY_ZONES_FILE_NAME);
    read_memberships_from_iter(read_csv_optional(&file_path)?, projects, &mut data)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(POLICY_TARGETS_FILE_NAME);
    read_targets_from_iter(read_csv_optional(&file_path)?, temporal, &mut data)
        .with_context(|| input_err_msg(&file_path))?;

    Ok(data)
}

fn read_memberships_from_iter<I>(iter: I, projects: &ProjectMap, data: &mut PolicyData) -> Result<()>
where
    I: Iterator<Item = PolicyZoneRaw>,
{
    for raw in iter {
        let project = projects.get_id_by_str(&raw.project)?;
        ensure!(
            !data.memberships.iter().any(|membership| {
                membership.project == project && membership.policy_type == raw.policy_type
            }),
            "Project {project} is assigned to more than one {} zone",
            raw.policy_type
        );
        data.memberships.push(PolicyMembership {
            project,
            policy_type: raw.policy_type,
            policy_zone: raw.policy_zone.as_str().into(),
        });
    }

    Ok(())
}

fn read_targets_from_iter<I>(iter: I, temporal: &TemporalHierarchy, data: &mut PolicyData) -> Result<()>
where
    I: Iterator<Item = PolicyTargetRaw>,
{
    for raw in iter {
        let zone = raw.policy_zone.as_str();
        ensure!(
            data.memberships.iter().any(|membership| {
                membership.policy_type == raw.policy_type && &*membership.policy_zone.0 == zone
            }),
            "No projects in {} zone {zone}",
            raw.policy_type
        );
        ensure!(
            temporal.contains_period(raw.period),
            "Unknown period {} for {} zone {zone}",
            raw.period,
            raw.policy_type
        );
        check_nonnegative(raw.target, "target")?;
        ensure!(
            data.targets
                .insert((raw.policy_type, zone.into(), raw.period), raw.target)
                .is_none(),
            "Duplicate target for {} zone {zone} in period {}",
            raw.policy_type,
            raw.period
        );
    }

    Ok(())
}
