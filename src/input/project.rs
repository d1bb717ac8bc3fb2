//! Code for reading projects from a CSV file.
use super::*;
use crate::id::IDCollection;
use crate::project::{
    AvailabilityType, CapacityType, OperatingCharacteristics, OperationalType, PrmType, Project,
    ProjectMap,
};
use crate::units::{Dimensionless, Hours, MoneyPerEnergy, MoneyPerPower};
use crate::zone::ZoneMap;
use serde::Deserialize;
use std::rc::Rc;

const PROJECTS_FILE_NAME: &str = "projects.csv";

#[derive(Deserialize, PartialEq, Debug)]
struct ProjectRaw {
    project: String,
    zone: String,
    capacity_type: CapacityType,
    operational_type: OperationalType,
    #[serde(default)]
    availability_type: Option<AvailabilityType>,
    #[serde(default)]
    prm_type: Option<PrmType>,
    #[serde(default)]
    variable_om_cost_per_mwh: Option<f64>,
    #[serde(default)]
    carbon_intensity_tonnes_per_mwh: Option<f64>,
    #[serde(default)]
    elcc_fraction: Option<f64>,
    #[serde(default)]
    min_duration_for_full_capacity_hours: Option<f64>,
    #[serde(default)]
    min_stable_level_fraction: Option<f64>,
    #[serde(default)]
    startup_plus_ramp_up_rate: Option<f64>,
    #[serde(default)]
    shutdown_plus_ramp_down_rate: Option<f64>,
    #[serde(default)]
    ramp_up_when_on_rate: Option<f64>,
    #[serde(default)]
    ramp_down_when_on_rate: Option<f64>,
    #[serde(default)]
    min_up_time_hours: Option<f64>,
    #[serde(default)]
    min_down_time_hours: Option<f64>,
    #[serde(default)]
    startup_cost_per_mw: Option<f64>,
    #[serde(default)]
    shutdown_cost_per_mw: Option<f64>,
    #[serde(default)]
    charging_efficiency: Option<f64>,
    #[serde(default)]
    discharging_efficiency: Option<f64>,
}

/// Read projects from the model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `zones` - The model's load zones
pub fn read_projects(model_dir: &Path, zones: &ZoneMap) -> Result<ProjectMap> {
    let file_path = model_dir.join(PROJECTS_FILE_NAME);
    read_projects_from_iter(read_csv(&file_path)?, zones).with_context(|| input_err_msg(&file_path))
}

fn read_projects_from_iter<I>(iter: I, zones: &ZoneMap) -> Result<ProjectMap>
where
    I: Iterator<Item = ProjectRaw>,
{
    let mut projects = ProjectMap::new();
    for raw in iter {
        let project = read_project(raw, zones)?;
        let id = project.id.clone();
        ensure!(
            projects.insert(id.clone(), Rc::new(project)).is_none(),
            "Duplicate project ID {id}"
        );
    }

    Ok(projects)
}

fn read_project(raw: ProjectRaw, zones: &ZoneMap) -> Result<Project> {
    let id = raw.project.as_str();
    let zone = zones
        .get_id_by_str(&raw.zone)
        .with_context(|| format!("Invalid zone for project {id}"))?;

    let variable_om_cost = raw.variable_om_cost_per_mwh.unwrap_or(0.0);
    ensure!(
        variable_om_cost.is_finite(),
        "variable_om_cost_per_mwh for project {id} must be finite"
    );
    let carbon_intensity = raw.carbon_intensity_tonnes_per_mwh.unwrap_or(0.0);
    check_nonnegative(carbon_intensity, "carbon_intensity_tonnes_per_mwh")?;

    let nonnegative = |value: Option<f64>, name: &str| -> Result<Option<f64>> {
        if let Some(value) = value {
            check_nonnegative(value, name)
                .with_context(|| format!("Invalid value for project {id}"))?;
        }
        Ok(value)
    };

    Ok(Project {
        id: id.into(),
        zone,
        capacity_type: raw.capacity_type,
        operational_type: raw.operational_type,
        availability_type: raw.availability_type.unwrap_or_default(),
        prm_type: raw.prm_type,
        variable_om_cost: MoneyPerEnergy(variable_om_cost),
        carbon_intensity,
        elcc_fraction: nonnegative(raw.elcc_fraction, "elcc_fraction")?.map(Dimensionless),
        min_duration_for_full_capacity: raw.min_duration_for_full_capacity_hours.map(Hours),
        operating: OperatingCharacteristics {
            min_stable_level: raw.min_stable_level_fraction.map(Dimensionless),
            startup_plus_ramp_up_rate: nonnegative(
                raw.startup_plus_ramp_up_rate,
                "startup_plus_ramp_up_rate",
            )?
            .map(Dimensionless),
            shutdown_plus_ramp_down_rate: nonnegative(
                raw.shutdown_plus_ramp_down_rate,
                "shutdown_plus_ramp_down_rate",
            )?
            .map(Dimensionless),
            ramp_up_when_on_rate: nonnegative(raw.ramp_up_when_on_rate, "ramp_up_when_on_rate")?
                .map(Dimensionless),
            ramp_down_when_on_rate: nonnegative(
                raw.ramp_down_when_on_rate,
                "ramp_down_when_on_rate",
            )?
            .map(Dimensionless),
            min_up_time: nonnegative(raw.min_up_time_hours, "min_up_time_hours")?.map(Hours),
            min_down_time: nonnegative(raw.min_down_time_hours, "min_down_time_hours")?.map(Hours),
            startup_cost: nonnegative(raw.startup_cost_per_mw, "startup_cost_per_mw")?
                .map(MoneyPerPower),
            shutdown_cost: nonnegative(raw.shutdown_cost_per_mw, "shutdown_cost_per_mw")?
                .map(MoneyPerPower),
            charging_efficiency: raw.charging_efficiency.map(Dimensionless),
            discharging_efficiency: raw.discharging_efficiency.map(Dimensionless),
        },
    })
}
