//! Code for reading the data used by capacity types.
use super::*;
use crate::capacity::{CapacityData, SpecifiedCapacity, Vintage};
use crate::id::IDCollection;
use crate::project::ProjectMap;
use crate::temporal::{PeriodID, TemporalHierarchy};
use crate::units::{Energy, MoneyPerEnergyYear, MoneyPerPowerYear, Power};
use serde::Deserialize;

const VINTAGE_COSTS_FILE_NAME: &str = "new_build_vintage_costs.csv";
const BUILD_SIZES_FILE_NAME: &str = "new_build_sizes.csv";
const SPECIFIED_CAPACITY_FILE_NAME: &str = "specified_capacity.csv";

#[derive(Deserialize, PartialEq, Debug)]
struct VintageRaw {
    project: String,
    vintage: PeriodID,
    lifetime_years: u32,
    #[serde(default)]
    annualized_cost_per_mw_yr: Option<f64>,
    #[serde(default)]
    annualized_cost_per_mwh_yr: Option<f64>,
    #[serde(default)]
    max_cumulative_new_build_mw: Option<f64>,
}

#[derive(Deserialize, PartialEq, Debug)]
struct BuildSizeRaw {
    project: String,
    build_size_mw: f64,
}

#[derive(Deserialize, PartialEq, Debug)]
struct SpecifiedCapacityRaw {
    project: String,
    period: PeriodID,
    capacity_mw: f64,
    #[serde(default)]
    energy_capacity_mwh: Option<f64>,
    #[serde(default)]
    fixed_cost_per_mw_yr: Option<f64>,
}

/// Read new-build vintages, build sizes and specified capacity.
///
/// All of these files are optional.
pub fn read_capacity_data(
    model_dir: &Path,
    projects: &ProjectMap,
    temporal: &TemporalHierarchy,
) -> Result<CapacityData> {
    let mut data = CapacityData::default();

    let file_path = model_dir.join(VINTAGE_COSTS_FILE_NAME);
    read_vintages_from_iter(read_csv_optional(&file_path)?, projects, temporal, &mut data)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(BUILD_SIZES_FILE_NAME);
    read_build_sizes_from_iter(read_csv_optional(&file_path)?, projects, &mut data)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(SPECIFIED_CAPACITY_FILE_NAME);
    read_specified_capacity_from_iter(read_csv_optional(&file_path)?, projects, temporal, &mut data)
        .with_context(|| input_err_msg(&file_path))?;

    Ok(data)
}

fn read_vintages_from_iter<I>(
    iter: I,
    projects: &ProjectMap,
    temporal: &TemporalHierarchy,
    data: &mut CapacityData,
) -> Result<()>
where
    I: Iterator<Item = VintageRaw>,
{
    for raw in iter {
        let project = projects.get_id_by_str(&raw.project)?;
        ensure!(
            temporal.contains_period(raw.vintage),
            "Unknown period {} for vintage of project {project}",
            raw.vintage
        );
        for (value, name) in [
            (raw.annualized_cost_per_mw_yr, "annualized_cost_per_mw_yr"),
            (raw.annualized_cost_per_mwh_yr, "annualized_cost_per_mwh_yr"),
            (raw.max_cumulative_new_build_mw, "max_cumulative_new_build_mw"),
        ] {
            if let Some(value) = value {
                check_nonnegative(value, name)?;
            }
        }

        let vintages = data.vintages.entry(project.clone()).or_default();
        ensure!(
            vintages.iter().all(|vintage| vintage.period != raw.vintage),
            "Duplicate vintage {} for project {project}",
            raw.vintage
        );
        vintages.push(Vintage {
            period: raw.vintage,
            lifetime: raw.lifetime_years,
            annualised_cost: raw.annualized_cost_per_mw_yr.map(MoneyPerPowerYear),
            annualised_energy_cost: raw.annualized_cost_per_mwh_yr.map(MoneyPerEnergyYear),
            max_cumulative_new_build: raw.max_cumulative_new_build_mw.map(Power),
        });
    }

    for vintages in data.vintages.values_mut() {
        vintages.sort_by_key(|vintage| vintage.period);
    }

    Ok(())
}

fn read_build_sizes_from_iter<I>(iter: I, projects: &ProjectMap, data: &mut CapacityData) -> Result<()>
where
    I: Iterator<Item = BuildSizeRaw>,
{
    for raw in iter {
        let project = projects.get_id_by_str(&raw.project)?;
        check_positive(raw.build_size_mw, "build_size_mw")?;
        ensure!(
            data.build_sizes
                .insert(project.clone(), Power(raw.build_size_mw))
                .is_none(),
            "Duplicate build size for project {project}"
        );
    }

    Ok(())
}

fn read_specified_capacity_from_iter<I>(
    iter: I,
    projects: &ProjectMap,
    temporal: &TemporalHierarchy,
    data: &mut CapacityData,
) -> Result<()>
where
    I: Iterator<Item = SpecifiedCapacityRaw>,
{
    for raw in iter {
        let project = projects.get_id_by_str(&raw.project)?;
        ensure!(
            temporal.contains_period(raw.period),
            "Unknown period {} for specified capacity of project {project}",
            raw.period
        );
        check_nonnegative(raw.capacity_mw, "capacity_mw")?;
        if let Some(energy) = raw.energy_capacity_mwh {
            check_nonnegative(energy, "energy_capacity_mwh")?;
        }
        if let Some(cost) = raw.fixed_cost_per_mw_yr {
            check_nonnegative(cost, "fixed_cost_per_mw_yr")?;
        }

        let spec = SpecifiedCapacity {
            capacity: Power(raw.capacity_mw),
            energy_capacity: raw.energy_capacity_mwh.map(Energy),
            fixed_cost: raw.fixed_cost_per_mw_yr.map(MoneyPerPowerYear),
        };
        ensure!(
            data.specified
                .insert((project.clone(), raw.period), spec)
                .is_none(),
            "Duplicate specified capacity for project {project} in period {}",
            raw.period
        );
    }

    Ok(())
}
