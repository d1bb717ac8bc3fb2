//! Fixtures for tests

use crate::capacity::{CapacityLookup, SpecifiedCapacity, Vintage};
use crate::composition::BuildContext;
use crate::model::{Model, ModelParameters};
use crate::plugin::{PluginSet, group_by_tag};
use crate::project::{
    AvailabilityType, CapacityType, OperatingCharacteristics, OperationalType, Project,
};
use crate::temporal::{
    BoundaryPolicy, Horizon, HorizonID, Period, PeriodID, TemporalHierarchy, Timepoint,
    TimepointID,
};
use crate::units::{Dimensionless, Energy, Hours, MoneyPerEnergy, MoneyPerPowerYear, Power};
use crate::zone::Zone;
use itertools::Itertools;
use rstest::fixture;
use std::path::PathBuf;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.err().unwrap().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

pub fn timepoint(id: TimepointID, horizon: HorizonID, duration: f64) -> Timepoint {
    Timepoint {
        id,
        horizon,
        period: 0,
        duration: Hours(duration),
        subproblem: 1,
        stage: 1,
    }
}

/// A single horizon in period 2030 with timepoints of the given durations
pub fn temporal_hierarchy(boundary: BoundaryPolicy, durations: &[f64]) -> TemporalHierarchy {
    let period = Period {
        id: 2030,
        discount_factor: Dimensionless(0.5),
        years_represented: Dimensionless(10.0),
    };
    let horizon = Horizon {
        id: 1,
        period: 2030,
        boundary,
        weight: Dimensionless(365.0),
        timepoints: Vec::new(),
    };
    let timepoints = durations
        .iter()
        .zip(1..)
        .map(|(&duration, id)| timepoint(id, 1, duration))
        .collect_vec();

    TemporalHierarchy::new([period], [horizon], timepoints).unwrap()
}

/// Four ten-year periods, each with a circular horizon of two 12-hour timepoints
#[fixture]
pub fn temporal() -> TemporalHierarchy {
    let periods = [2020, 2030, 2040, 2050].map(|id| Period {
        id,
        discount_factor: Dimensionless(1.0),
        years_represented: Dimensionless(10.0),
    });
    let horizons = periods
        .iter()
        .zip(1..)
        .map(|(period, id)| Horizon {
            id,
            period: period.id,
            boundary: BoundaryPolicy::Circular,
            weight: Dimensionless(1.0),
            timepoints: Vec::new(),
        })
        .collect_vec();
    let timepoints = (1..=4)
        .flat_map(|horizon| [2 * horizon - 1, 2 * horizon].map(|id| timepoint(id, horizon, 12.0)))
        .collect_vec();

    TemporalHierarchy::new(periods, horizons, timepoints).unwrap()
}

/// A model with a single zone and 50 MW of load in every timepoint, but no projects
#[fixture]
pub fn model(temporal: TemporalHierarchy) -> Model {
    let zone = Zone {
        id: "z1".into(),
        unserved_energy_penalty: None,
        overgeneration_penalty: None,
    };
    let load = temporal
        .iter_timepoints()
        .map(|tp| ((zone.id.clone(), tp.id), Power(50.0)))
        .collect();

    Model {
        model_path: PathBuf::new(),
        parameters: ModelParameters::default(),
        temporal,
        zones: [(zone.id.clone(), zone)].into_iter().collect(),
        load,
        projects: Default::default(),
        capacity_data: Default::default(),
        availability_derates: Default::default(),
        capacity_factors: Default::default(),
        transmission_lines: Default::default(),
        transmission_data: Default::default(),
        reserve_data: Default::default(),
        prm_requirements: Default::default(),
        policy_data: Default::default(),
    }
}

pub fn project(id: &str, capacity_type: CapacityType) -> Project {
    Project {
        id: id.into(),
        zone: "z1".into(),
        capacity_type,
        operational_type: OperationalType::GenSimple,
        availability_type: AvailabilityType::Exogenous,
        prm_type: None,
        variable_om_cost: MoneyPerEnergy(0.0),
        carbon_intensity: 0.0,
        elcc_fraction: None,
        min_duration_for_full_capacity: None,
        operating: OperatingCharacteristics::default(),
    }
}

pub fn vintage(period: PeriodID, lifetime: u32, cost: f64) -> Vintage {
    Vintage {
        period,
        lifetime,
        annualised_cost: Some(MoneyPerPowerYear(cost)),
        annualised_energy_cost: None,
        max_cumulative_new_build: None,
    }
}

/// A generator with the given capacity specified for every period of the model
pub fn specified_project(model: &mut Model, id: &str, capacity: f64) -> Project {
    for period in model.temporal.iter_period_ids() {
        model.capacity_data.specified.insert(
            (id.into(), period),
            SpecifiedCapacity {
                capacity: Power(capacity),
                energy_capacity: None,
                fixed_cost: None,
            },
        );
    }

    project(id, CapacityType::GenSpec)
}

/// A storage project with the given power and energy capacity specified for every period
pub fn specified_storage(model: &mut Model, id: &str, power: f64, energy: f64) -> Project {
    for period in model.temporal.iter_period_ids() {
        model.capacity_data.specified.insert(
            (id.into(), period),
            SpecifiedCapacity {
                capacity: Power(power),
                energy_capacity: Some(Energy(energy)),
                fixed_cost: None,
            },
        );
    }

    let mut project = project(id, CapacityType::StorSpec);
    project.operational_type = OperationalType::Stor;
    project
}

/// Run the capacity and availability types for the given projects and collect the results
pub fn capacity_lookup<'a>(ctx: &mut BuildContext<'a>, projects: &[&Project]) -> CapacityLookup<'a> {
    let mut capacity_types = PluginSet::load(projects.iter().map(|p| p.capacity_type));
    for (tag, group) in group_by_tag(projects.iter().copied(), |p: &Project| p.capacity_type) {
        capacity_types
            .get_mut(tag)
            .unwrap()
            .add_model_components(ctx, &group)
            .unwrap();
    }

    let mut availability_types = PluginSet::load(projects.iter().map(|p| p.availability_type));
    for (tag, group) in group_by_tag(projects.iter().copied(), |p: &Project| p.availability_type) {
        availability_types
            .get_mut(tag)
            .unwrap()
            .add_model_components(ctx, &group)
            .unwrap();
    }

    CapacityLookup::new(
        ctx.temporal,
        ctx.components.operational_index(),
        projects.iter().copied(),
        &capacity_types,
        &availability_types,
    )
    .unwrap()
}
