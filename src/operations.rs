//! Operational types: how projects are dispatched in each timepoint.
//!
//! Operational types receive the projects' capacities through a [`CapacityLookup`] and read the
//! reserve variables registered against each project from the registry, so they work the same
//! whatever capacity type a project has.
use crate::capacity::CapacityLookup;
use crate::composition::BuildContext;
use crate::model::Model;
use crate::plugin::TypeTag;
use crate::problem::{LinearExpr, Solution};
use crate::project::{OperationalType, Project, ProjectID};
use crate::temporal::TimepointID;
use crate::units::Dimensionless;
use crate::validation::ValidationReport;
use anyhow::Result;
use serde::Serialize;

pub mod commit_cap;
pub mod must_run;
pub mod simple;
pub mod storage;
pub mod variable;

/// The dispatch of a project in a timepoint
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchResult {
    /// Net power output
    pub power_mw: f64,
    /// Committed capacity
    pub committed_mw: Option<f64>,
    /// Capacity started up
    pub startup_mw: Option<f64>,
    /// Capacity shut down
    pub shutdown_mw: Option<f64>,
    /// Power used for charging
    pub charge_mw: Option<f64>,
    /// Power delivered by discharging
    pub discharge_mw: Option<f64>,
    /// Energy stored at the end of the timepoint
    pub state_of_charge_mwh: Option<f64>,
    /// Available power which was not used
    pub curtailment_mw: Option<f64>,
}

/// The interface implemented by every operational type
pub trait OperationalFormulation {
    /// The names of the optional project attributes used by this formulation
    fn accepted_attributes(&self) -> &'static [&'static str];

    /// Check input data for the projects using this formulation.
    ///
    /// By default, this warns about attributes which are specified but not used.
    fn validate_inputs(&self, _model: &Model, projects: &[&Project], report: &mut ValidationReport) {
        warn_unused_attributes(self.accepted_attributes(), projects, report);
    }

    /// Whether projects of this type need a capacity type which defines energy capacity
    fn requires_energy_capacity(&self) -> bool {
        false
    }

    /// Whether projects of this type may provide reserves
    fn can_provide_reserves(&self) -> bool {
        true
    }

    /// Add variables and constraints for the given projects
    fn add_model_components(
        &mut self,
        ctx: &mut BuildContext,
        projects: &[&Project],
        capacity: &CapacityLookup,
    ) -> Result<()>;

    /// The net power output of a project in a timepoint
    fn power(&self, project: &ProjectID, timepoint: TimepointID) -> LinearExpr;

    /// The output on which variable O&M costs are charged
    fn variable_om_basis(&self, project: &ProjectID, timepoint: TimepointID) -> LinearExpr {
        self.power(project, timepoint)
    }

    /// The dispatch of a project in a timepoint in the solution
    fn dispatch_results(
        &self,
        solution: &Solution,
        project: &ProjectID,
        timepoint: TimepointID,
    ) -> DispatchResult {
        DispatchResult {
            power_mw: solution.evaluate(&self.power(project, timepoint)),
            ..DispatchResult::default()
        }
    }
}

impl TypeTag for OperationalType {
    type Plugin = dyn OperationalFormulation;
    const KIND: &'static str = "operational type";

    fn load_plugin(self) -> Box<dyn OperationalFormulation> {
        match self {
            Self::GenCommitCap => Box::<commit_cap::CommitCapacity>::default(),
            Self::GenSimple => Box::<simple::SimpleGeneration>::default(),
            Self::GenMustRun => Box::<must_run::MustRunGeneration>::default(),
            Self::GenVar => Box::<variable::VariableGeneration>::default(),
            Self::Stor => Box::<storage::Storage>::default(),
        }
    }
}

/// Warn about attributes which are specified for projects but not used by their operational type
fn warn_unused_attributes(
    accepted: &[&str],
    projects: &[&Project],
    report: &mut ValidationReport,
) {
    for project in projects {
        for attribute in project.operating.specified_attributes() {
            if !accepted.contains(&attribute) {
                report.warn(
                    &project.id,
                    format!(
                        "{attribute} is not used by operational type {}; ignoring",
                        project.operational_type
                    ),
                );
            }
        }
    }
}

/// A fraction which should lie in (0, 1], substituting `default` if it is missing or invalid
fn fraction_or_default(
    project: &Project,
    name: &str,
    value: Option<Dimensionless>,
    default: Dimensionless,
    report: &mut ValidationReport,
) -> Dimensionless {
    match value {
        None => default,
        Some(value) if value > Dimensionless(0.0) && value <= Dimensionless(1.0) => value,
        Some(value) => {
            report.warn(
                &project.id,
                format!("{name} of {value} is outside (0, 1]; using {default}"),
            );
            default
        }
    }
}

/// Add a ramp constraint for a project without unit commitment: the change in output (less
/// reserves which could be deployed in the opposite direction) is limited to `rate` times
/// the available capacity per hour of the previous timepoint.
fn add_simple_ramp_limits(
    ctx: &mut BuildContext,
    project: &Project,
    capacity: &CapacityLookup,
    power: impl Fn(TimepointID) -> LinearExpr,
) {
    let temporal = ctx.temporal;
    let (Some(up_rate), Some(down_rate)) = (
        project.operating.ramp_up_when_on_rate,
        project.operating.ramp_down_when_on_rate,
    ) else {
        return;
    };

    for timepoint in capacity.timepoints(&project.id) {
        let Some(prev) = temporal.previous(timepoint) else {
            continue;
        };
        let hours = temporal.duration(prev).value();
        let available = capacity.available_capacity(&project.id, timepoint);

        let up = power(timepoint) + ctx.components.headroom(&project.id, timepoint)
            - (power(prev) - ctx.components.footroom(&project.id, prev));
        ctx.problem.add_le(
            format!("ramp_up[{},{timepoint}]", project.id),
            up,
            available.scaled((up_rate.value() * hours).min(1.0)),
        );

        let down = power(prev) + ctx.components.headroom(&project.id, prev)
            - (power(timepoint) - ctx.components.footroom(&project.id, timepoint));
        ctx.problem.add_le(
            format!("ramp_down[{},{timepoint}]", project.id),
            down,
            available.scaled((down_rate.value() * hours).min(1.0)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::project;
    use crate::project::CapacityType;
    use rstest::rstest;

    #[test]
    fn test_warn_unused_attributes() {
        let mut project = project("gas", CapacityType::GenSpec);
        project.operating.charging_efficiency = Some(Dimensionless(0.9));
        project.operating.min_stable_level = Some(Dimensionless(0.4));

        let mut report = ValidationReport::new();
        warn_unused_attributes(&["min_stable_level_fraction"], &[&project], &mut report);
        assert_eq!(report.len(), 1);
        assert!(report.contains("gas", "charging_efficiency is not used"));
    }

    #[rstest]
    #[case(None, 1.0, false)]
    #[case(Some(0.9), 0.9, false)]
    #[case(Some(1.0), 1.0, false)]
    #[case(Some(0.0), 1.0, true)]
    #[case(Some(1.5), 1.0, true)]
    fn test_fraction_or_default(
        #[case] value: Option<f64>,
        #[case] expected: f64,
        #[case] warned: bool,
    ) {
        let project = project("battery", CapacityType::StorSpec);
        let mut report = ValidationReport::new();
        let fraction = fraction_or_default(
            &project,
            "charging_efficiency",
            value.map(Dimensionless),
            Dimensionless(1.0),
            &mut report,
        );
        assert_eq!(fraction, Dimensionless(expected));
        assert_eq!(!report.is_empty(), warned);
    }

    #[test]
    fn test_load_plugins() {
        use strum::IntoEnumIterator;
        for operational_type in OperationalType::iter() {
            let plugin = operational_type.load_plugin();
            assert_eq!(
                plugin.can_provide_reserves(),
                operational_type != OperationalType::GenMustRun
            );
            assert_eq!(
                plugin.requires_energy_capacity(),
                operational_type == OperationalType::Stor
            );
        }
    }
}
