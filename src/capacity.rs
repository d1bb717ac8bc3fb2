//! Capacity types: how the installed capacity of each project is determined.
//!
//! New capacity is built in vintages. A vintage built in period `v` with a lifetime of `L` years
//! is operational in every period `p` with `v <= p < v + L`, where period IDs are used as a proxy
//! for the passage of time.
use crate::composition::BuildContext;
use crate::model::Model;
use crate::plugin::{PluginSet, TypeTag};
use crate::problem::{LinearExpr, Solution};
use crate::project::{AvailabilityType, CapacityType, Project, ProjectID};
use crate::registry::OperationalIndex;
use crate::temporal::{PeriodID, TemporalHierarchy, TimepointID};
use crate::units::{Dimensionless, Energy, MoneyPerEnergyYear, MoneyPerPowerYear, Power};
use crate::validation::ValidationReport;
use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;

pub mod new_bin;
pub mod new_lin;
pub mod specified;

/// A period in which new capacity may be built
#[derive(Debug, Clone, PartialEq)]
pub struct Vintage {
    /// The period in which the capacity is built
    pub period: PeriodID,
    /// The number of years the capacity remains operational
    pub lifetime: u32,
    /// Annualised cost per MW of power capacity
    pub annualised_cost: Option<MoneyPerPowerYear>,
    /// Annualised cost per MWh of energy capacity (storage only)
    pub annualised_energy_cost: Option<MoneyPerEnergyYear>,
    /// Upper limit on total capacity of the project in the vintage's period
    pub max_cumulative_new_build: Option<Power>,
}

impl Vintage {
    /// Whether capacity built in this vintage is operational in `period`
    pub fn is_operational_in(&self, period: PeriodID) -> bool {
        self.period <= period && period < self.period.saturating_add(self.lifetime)
    }
}

/// Pre-specified capacity for a project in a period
#[derive(Debug, Clone, PartialEq)]
pub struct SpecifiedCapacity {
    /// Power capacity
    pub capacity: Power,
    /// Energy capacity (storage only)
    pub energy_capacity: Option<Energy>,
    /// Annual fixed cost per MW
    pub fixed_cost: Option<MoneyPerPowerYear>,
}

/// Input data used by the capacity types
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapacityData {
    /// New build vintages for each project
    pub vintages: HashMap<ProjectID, Vec<Vintage>>,
    /// Block size for projects built in discrete units
    pub build_sizes: HashMap<ProjectID, Power>,
    /// Pre-specified capacity for each project and period
    pub specified: HashMap<(ProjectID, PeriodID), SpecifiedCapacity>,
}

impl CapacityData {
    /// The vintages defined for a project
    pub fn vintages_for(&self, project: &ProjectID) -> &[Vintage] {
        self.vintages.get(project).map_or(&[], Vec::as_slice)
    }
}

/// New capacity built for a project in one vintage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewBuild {
    /// The project built
    pub project: ProjectID,
    /// The vintage period
    pub vintage: PeriodID,
    /// New power capacity
    pub capacity_mw: f64,
    /// New energy capacity (storage only)
    pub energy_capacity_mwh: Option<f64>,
}

/// The interface implemented by every capacity type
pub trait CapacityFormulation {
    /// Check input data for the projects using this formulation
    fn validate_inputs(&self, _model: &Model, _projects: &[&Project], _report: &mut ValidationReport) {}

    /// Add variables and constraints for the given projects and register the periods in which
    /// they are operational
    fn add_model_components(&mut self, ctx: &mut BuildContext, projects: &[&Project]) -> Result<()>;

    /// The power capacity of a project in a period
    fn capacity(&self, project: &ProjectID, period: PeriodID) -> LinearExpr;

    /// Whether this formulation defines energy capacity
    fn provides_energy_capacity(&self) -> bool {
        false
    }

    /// The energy capacity of a project in a period, if the formulation defines one
    fn energy_capacity(&self, _project: &ProjectID, _period: PeriodID) -> Option<LinearExpr> {
        None
    }

    /// The annual cost of a project's capacity in a period
    fn capacity_cost(&self, project: &ProjectID, period: PeriodID) -> LinearExpr;

    /// New capacity built in the solution
    fn new_builds(&self, _solution: &Solution) -> Vec<NewBuild> {
        Vec::new()
    }
}

impl TypeTag for CapacityType {
    type Plugin = dyn CapacityFormulation;
    const KIND: &'static str = "capacity type";

    fn load_plugin(self) -> Box<dyn CapacityFormulation> {
        match self {
            Self::GenNewLin => Box::new(new_lin::NewLinearCapacity::new(false)),
            Self::StorNewLin => Box::new(new_lin::NewLinearCapacity::new(true)),
            Self::GenNewBin => Box::<new_bin::NewBinaryCapacity>::default(),
            Self::GenSpec => Box::new(specified::SpecifiedCapacityFormulation::new(false)),
            Self::StorSpec => Box::new(specified::SpecifiedCapacityFormulation::new(true)),
        }
    }
}

/// The capacity and availability of every project, as seen by the operational types
pub struct CapacityLookup<'a> {
    temporal: &'a TemporalHierarchy,
    operational: OperationalIndex,
    capacity: HashMap<(ProjectID, PeriodID), LinearExpr>,
    energy_capacity: HashMap<(ProjectID, PeriodID), LinearExpr>,
    derates: HashMap<(ProjectID, TimepointID), Dimensionless>,
}

impl<'a> CapacityLookup<'a> {
    /// Collect capacities and availability derates from the capacity and availability types.
    ///
    /// # Arguments
    ///
    /// * `temporal` - The temporal structure being built for
    /// * `operational` - The periods in which each project is operational
    /// * `projects` - The projects in the model
    /// * `capacity_types` - Formulations for the projects' capacity types
    /// * `availability_types` - Formulations for the projects' availability types
    pub fn new<'b>(
        temporal: &'a TemporalHierarchy,
        operational: OperationalIndex,
        projects: impl IntoIterator<Item = &'b Project>,
        capacity_types: &PluginSet<CapacityType>,
        availability_types: &PluginSet<AvailabilityType>,
    ) -> Result<Self> {
        let mut lookup = Self {
            temporal,
            operational,
            capacity: HashMap::new(),
            energy_capacity: HashMap::new(),
            derates: HashMap::new(),
        };

        for project in projects {
            let capacity_type = capacity_types.get(project.capacity_type)?;
            let availability_type = availability_types.get(project.availability_type)?;
            for &period in lookup.operational.periods(&project.id) {
                let key = (project.id.clone(), period);
                lookup
                    .capacity
                    .insert(key.clone(), capacity_type.capacity(&project.id, period));
                if let Some(energy) = capacity_type.energy_capacity(&project.id, period) {
                    lookup.energy_capacity.insert(key, energy);
                }

                for timepoint in temporal.iter_timepoints_in_period(period) {
                    lookup.derates.insert(
                        (project.id.clone(), timepoint),
                        availability_type.derate(&project.id, timepoint),
                    );
                }
            }
        }

        Ok(lookup)
    }

    /// The periods in which each project is operational
    pub fn operational(&self) -> &OperationalIndex {
        &self.operational
    }

    /// The timepoints in which a project is operational
    pub fn timepoints(&self, project: &ProjectID) -> impl Iterator<Item = TimepointID> + '_ {
        self.operational.timepoints(project, self.temporal)
    }

    /// The power capacity of a project in a period (zero if not operational)
    pub fn capacity(&self, project: &ProjectID, period: PeriodID) -> LinearExpr {
        self.capacity
            .get(&(project.clone(), period))
            .cloned()
            .unwrap_or_default()
    }

    /// The energy capacity of a project in a period (zero if not defined)
    pub fn energy_capacity(&self, project: &ProjectID, period: PeriodID) -> LinearExpr {
        self.energy_capacity
            .get(&(project.clone(), period))
            .cloned()
            .unwrap_or_default()
    }

    /// The availability derate of a project in a timepoint
    pub fn derate(&self, project: &ProjectID, timepoint: TimepointID) -> Dimensionless {
        self.derates
            .get(&(project.clone(), timepoint))
            .copied()
            .unwrap_or(Dimensionless(1.0))
    }

    /// Power capacity multiplied by the availability derate in a timepoint
    pub fn available_capacity(&self, project: &ProjectID, timepoint: TimepointID) -> LinearExpr {
        self.capacity(project, self.temporal.period_of(timepoint))
            .scaled(self.derate(project, timepoint).value())
    }

    /// Energy capacity in the period of a timepoint
    pub fn energy_capacity_at(&self, project: &ProjectID, timepoint: TimepointID) -> LinearExpr {
        self.energy_capacity(project, self.temporal.period_of(timepoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn vintage(period: PeriodID, lifetime: u32) -> Vintage {
        Vintage {
            period,
            lifetime,
            annualised_cost: None,
            annualised_energy_cost: None,
            max_cumulative_new_build: None,
        }
    }

    #[rstest]
    #[case(2020, 30, 2020, true)]
    #[case(2020, 30, 2030, true)]
    #[case(2020, 30, 2049, true)]
    #[case(2020, 30, 2050, false)]
    #[case(2020, 30, 2010, false)]
    #[case(2030, 10, 2040, false)]
    #[case(2030, 0, 2030, false)]
    #[case(u32::MAX - 1, 100, u32::MAX - 1, true)]
    fn test_vintage_window(
        #[case] built: PeriodID,
        #[case] lifetime: u32,
        #[case] period: PeriodID,
        #[case] expected: bool,
    ) {
        assert_eq!(vintage(built, lifetime).is_operational_in(period), expected);
    }

    #[test]
    fn test_vintages_for() {
        let mut data = CapacityData::default();
        data.vintages
            .insert("gas".into(), vec![vintage(2030, 20), vintage(2040, 20)]);
        assert_eq!(data.vintages_for(&"gas".into()).len(), 2);
        assert!(data.vintages_for(&"wind".into()).is_empty());
    }
}
