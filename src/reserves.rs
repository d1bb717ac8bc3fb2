//! Operating reserves.
//!
//! Projects which are eligible to provide a reserve get a provision variable in each timepoint in
//! which they are operational. Upward reserves are registered as headroom and downward reserves
//! as footroom, which the operational types must leave between power output and their limits.
//! Each zone's requirement must be met by the projects in the zone, with any shortage penalised.
use crate::capacity::CapacityLookup;
use crate::composition::BuildContext;
use crate::plugin::PluginSet;
use crate::problem::{LinearExpr, Solution, Variable};
use crate::project::{OperationalType, ProjectID};
use crate::registry::CostComponent;
use crate::temporal::TimepointID;
use crate::units::{Dimensionless, Power};
use crate::zone::ZoneID;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use serde_string_enum::DeserializeLabeledStringEnum;

/// A type of operating reserve
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    DeserializeLabeledStringEnum,
    strum::Display,
    strum::EnumIter,
)]
pub enum ReserveType {
    /// Upward regulation
    #[string = "regulation_up"]
    #[strum(serialize = "regulation_up")]
    RegulationUp,
    /// Downward regulation
    #[string = "regulation_down"]
    #[strum(serialize = "regulation_down")]
    RegulationDown,
    /// Spinning reserves (upward)
    #[string = "spinning_reserves"]
    #[strum(serialize = "spinning_reserves")]
    SpinningReserves,
}

/// Whether a reserve requires output to be increased or decreased
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveDirection {
    /// Output can be increased: needs headroom
    Up,
    /// Output can be decreased: needs footroom
    Down,
}

impl ReserveType {
    /// The direction in which this reserve is deployed
    pub fn direction(self) -> ReserveDirection {
        match self {
            Self::RegulationUp | Self::SpinningReserves => ReserveDirection::Up,
            Self::RegulationDown => ReserveDirection::Down,
        }
    }
}

/// A project which may provide a reserve
#[derive(Debug, Clone, PartialEq)]
pub struct ReserveEligibility {
    /// The project
    pub project: ProjectID,
    /// The reserve which can be provided
    pub reserve_type: ReserveType,
    /// Maximum provision as a fraction of available capacity
    pub max_fraction: Option<Dimensionless>,
}

/// Input data for reserves
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReserveData {
    /// Requirement for each reserve type, zone and timepoint
    pub requirements: IndexMap<(ReserveType, ZoneID, TimepointID), Power>,
    /// The projects eligible to provide each reserve
    pub eligibility: Vec<ReserveEligibility>,
}

/// Reserve provision variables, keyed by reserve type, project and timepoint
#[derive(Debug, Default)]
pub struct ReserveProvisionVariables(IndexMap<(ReserveType, ProjectID, TimepointID), Variable>);

impl ReserveProvisionVariables {
    /// The total provision of a reserve by the given projects in a timepoint
    pub fn total<'a>(
        &self,
        reserve_type: ReserveType,
        projects: impl IntoIterator<Item = &'a ProjectID>,
        timepoint: TimepointID,
    ) -> LinearExpr {
        projects
            .into_iter()
            .filter_map(|project| {
                self.0
                    .get(&(reserve_type, project.clone(), timepoint))
                    .copied()
            })
            .map(LinearExpr::from)
            .sum()
    }

    /// The number of provision variables
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no provision variables
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Add reserve provision variables for eligible projects and register them with the registry.
///
/// Eligibility for projects whose operational type cannot provide reserves is ignored, with an
/// advisory.
pub fn add_reserve_provision(
    ctx: &mut BuildContext,
    operational_types: &PluginSet<OperationalType>,
    capacity: &CapacityLookup,
) -> Result<ReserveProvisionVariables> {
    let model = ctx.model;
    let mut provision = ReserveProvisionVariables::default();
    for eligibility in &model.reserve_data.eligibility {
        let project = model
            .projects
            .get(&eligibility.project)
            .with_context(|| format!("Unknown project {} in reserve eligibility", eligibility.project))?;
        if !operational_types
            .get(project.operational_type)?
            .can_provide_reserves()
        {
            ctx.report.warn(
                &project.id,
                format!(
                    "Operational type {} cannot provide reserves; ignoring eligibility for {}",
                    project.operational_type, eligibility.reserve_type
                ),
            );
            continue;
        }

        let reserve_type = eligibility.reserve_type;
        for timepoint in capacity.timepoints(&project.id) {
            let variable = ctx
                .problem
                .add_nonnegative(format!("provide_{reserve_type}[{},{timepoint}]", project.id));
            if let Some(max_fraction) = eligibility.max_fraction {
                ctx.problem.add_le(
                    format!("max_{reserve_type}[{},{timepoint}]", project.id),
                    variable.into(),
                    capacity
                        .available_capacity(&project.id, timepoint)
                        .scaled(max_fraction.value()),
                );
            }

            match reserve_type.direction() {
                ReserveDirection::Up => {
                    ctx.components.add_headroom(&project.id, timepoint, variable);
                }
                ReserveDirection::Down => {
                    ctx.components.add_footroom(&project.id, timepoint, variable);
                }
            }
            provision
                .0
                .insert((reserve_type, project.id.clone(), timepoint), variable);
        }
    }

    Ok(provision)
}

/// The balance of a reserve requirement in the solution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReserveResult {
    /// The reserve type
    pub reserve_type: String,
    /// The zone
    pub zone: ZoneID,
    /// The timepoint
    pub timepoint: TimepointID,
    /// The requirement
    pub requirement_mw: f64,
    /// Total provision by projects in the zone
    pub provided_mw: f64,
    /// Unmet requirement
    pub shortage_mw: f64,
}

struct ReserveBalance {
    reserve_type: ReserveType,
    zone: ZoneID,
    timepoint: TimepointID,
    requirement: Power,
    provided: LinearExpr,
    shortage: Variable,
}

/// Reserve requirement constraints for each reserve type, zone and timepoint
#[derive(Default)]
pub struct ReserveRequirements(Vec<ReserveBalance>);

impl ReserveRequirements {
    /// Results for every requirement
    pub fn results(&self, solution: &Solution) -> Vec<ReserveResult> {
        self.0
            .iter()
            .map(|balance| ReserveResult {
                reserve_type: balance.reserve_type.to_string(),
                zone: balance.zone.clone(),
                timepoint: balance.timepoint,
                requirement_mw: balance.requirement.value(),
                provided_mw: solution.evaluate(&balance.provided),
                shortage_mw: solution.value(balance.shortage),
            })
            .collect()
    }
}

/// Add a constraint for each reserve requirement in the temporal scope being built.
///
/// Provision by the projects in the zone plus a penalised shortage must meet the requirement.
pub fn add_reserve_requirements(
    ctx: &mut BuildContext,
    provision: &ReserveProvisionVariables,
) -> ReserveRequirements {
    let (model, temporal) = (ctx.model, ctx.temporal);
    let penalty = model.parameters.reserve_shortage_penalty;
    let mut requirements = ReserveRequirements::default();
    for ((reserve_type, zone, timepoint), requirement) in &model.reserve_data.requirements {
        let timepoint = *timepoint;
        if !temporal.contains_timepoint(timepoint) {
            continue;
        }

        let projects = model
            .projects
            .values()
            .filter(|project| project.zone == *zone)
            .map(|project| &project.id);
        let provided = provision.total(*reserve_type, projects, timepoint);
        let shortage = ctx
            .problem
            .add_nonnegative(format!("{reserve_type}_shortage[{zone},{timepoint}]"));
        ctx.problem.add_ge(
            format!("{reserve_type}_requirement[{zone},{timepoint}]"),
            provided.clone() + shortage,
            requirement.value().into(),
        );

        let weight = temporal.objective_hours(timepoint).value();
        ctx.components.add_cost(
            CostComponent::ReserveShortage,
            &(shortage * (penalty.value() * weight)).into(),
        );
        requirements.0.push(ReserveBalance {
            reserve_type: *reserve_type,
            zone: zone.clone(),
            timepoint,
            requirement: *requirement,
            provided,
            shortage,
        });
    }

    requirements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{capacity_lookup, model, specified_project};
    use crate::model::Model;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(ReserveType::RegulationUp, ReserveDirection::Up)]
    #[case(ReserveType::RegulationDown, ReserveDirection::Down)]
    #[case(ReserveType::SpinningReserves, ReserveDirection::Up)]
    fn test_direction(#[case] reserve_type: ReserveType, #[case] expected: ReserveDirection) {
        assert_eq!(reserve_type.direction(), expected);
    }

    fn eligible(project: &str, reserve_type: ReserveType, max_fraction: Option<f64>) -> ReserveEligibility {
        ReserveEligibility {
            project: project.into(),
            reserve_type,
            max_fraction: max_fraction.map(Dimensionless),
        }
    }

    #[rstest]
    fn test_must_run_cannot_provide_reserves(mut model: Model) {
        let mut project = specified_project(&mut model, "nuclear", 100.0);
        project.operational_type = OperationalType::GenMustRun;
        model.projects.insert(project.id.clone(), project.clone().into());
        model
            .reserve_data
            .eligibility
            .push(eligible("nuclear", ReserveType::RegulationUp, None));

        let mut ctx = BuildContext::new(&model, &model.temporal);
        let lookup = capacity_lookup(&mut ctx, &[&project]);
        let operational_types = PluginSet::load([OperationalType::GenMustRun]);
        let provision = add_reserve_provision(&mut ctx, &operational_types, &lookup).unwrap();
        assert!(provision.is_empty());
        assert!(ctx.report.contains("nuclear", "cannot provide reserves"));
    }

    #[rstest]
    fn test_reserves_limit_power(mut model: Model) {
        let project = specified_project(&mut model, "gas", 100.0);
        model.projects.insert(project.id.clone(), project.clone().into());
        model.reserve_data.eligibility.extend([
            eligible("gas", ReserveType::RegulationUp, Some(0.1)),
            eligible("gas", ReserveType::SpinningReserves, None),
        ]);
        model.reserve_data.requirements.extend([
            (
                (ReserveType::RegulationUp, "z1".into(), 1),
                Power(20.0),
            ),
            (
                (ReserveType::SpinningReserves, "z1".into(), 1),
                Power(15.0),
            ),
        ]);

        let mut ctx = BuildContext::new(&model, &model.temporal);
        let lookup = capacity_lookup(&mut ctx, &[&project]);
        let mut operational_types = PluginSet::load([OperationalType::GenSimple]);
        let provision = add_reserve_provision(&mut ctx, &operational_types, &lookup).unwrap();
        let operations = operational_types.get_mut(OperationalType::GenSimple).unwrap();
        operations
            .add_model_components(&mut ctx, &[&project], &lookup)
            .unwrap();
        let requirements = add_reserve_requirements(&mut ctx, &provision);

        // Regulation is limited to 10 MW, so there is a 10 MW shortage. Spinning reserves are met
        // in full, leaving 75 MW for generation.
        let power = operations.power(&project.id, 1);
        ctx.problem
            .set_objective(ctx.components.total_cost() - power.clone());
        let solution = ctx.problem.solve().unwrap();
        assert_approx_eq!(f64, solution.evaluate(&power), 75.0, epsilon = 1e-6);

        let results = requirements.results(&solution);
        assert_eq!(results.len(), 2);
        assert_approx_eq!(f64, results[0].provided_mw, 10.0, epsilon = 1e-6);
        assert_approx_eq!(f64, results[0].shortage_mw, 10.0, epsilon = 1e-6);
        assert_approx_eq!(f64, results[1].shortage_mw, 0.0, epsilon = 1e-6);
    }
}
