//! Availability types: how much of a project's capacity is available in each timepoint.
use crate::composition::BuildContext;
use crate::plugin::TypeTag;
use crate::project::{AvailabilityType, Project, ProjectID};
use crate::temporal::TimepointID;
use crate::units::Dimensionless;
use anyhow::Result;
use std::collections::HashMap;

/// The interface implemented by every availability type
pub trait AvailabilityFormulation {
    /// Add variables and constraints for the given projects
    fn add_model_components(&mut self, ctx: &mut BuildContext, projects: &[&Project]) -> Result<()>;

    /// The fraction of a project's capacity available in a timepoint
    fn derate(&self, project: &ProjectID, timepoint: TimepointID) -> Dimensionless;
}

impl TypeTag for AvailabilityType {
    type Plugin = dyn AvailabilityFormulation;
    const KIND: &'static str = "availability type";

    fn load_plugin(self) -> Box<dyn AvailabilityFormulation> {
        match self {
            Self::Exogenous => Box::<ExogenousAvailability>::default(),
        }
    }
}

/// Availability derates given as input data. Capacity is fully available unless specified
/// otherwise.
#[derive(Debug, Default)]
pub struct ExogenousAvailability {
    derates: HashMap<(ProjectID, TimepointID), Dimensionless>,
}

impl AvailabilityFormulation for ExogenousAvailability {
    fn add_model_components(&mut self, ctx: &mut BuildContext, projects: &[&Project]) -> Result<()> {
        for project in projects {
            for timepoint in ctx.temporal.iter_timepoints() {
                let key = (project.id.clone(), timepoint.id);
                if let Some(derate) = ctx.model.availability_derates.get(&key) {
                    self.derates.insert(key, *derate);
                }
            }
        }

        Ok(())
    }

    fn derate(&self, project: &ProjectID, timepoint: TimepointID) -> Dimensionless {
        self.derates
            .get(&(project.clone(), timepoint))
            .copied()
            .unwrap_or(Dimensionless(1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{model, project};
    use crate::model::Model;
    use crate::project::CapacityType;
    use rstest::rstest;

    #[rstest]
    fn test_exogenous_derates(mut model: Model) {
        model
            .availability_derates
            .insert(("gas".into(), 1), Dimensionless(0.8));
        let project = project("gas", CapacityType::GenSpec);
        let mut ctx = BuildContext::new(&model, &model.temporal);
        let mut formulation = AvailabilityType::Exogenous.load_plugin();
        formulation.add_model_components(&mut ctx, &[&project]).unwrap();

        assert_eq!(formulation.derate(&"gas".into(), 1), Dimensionless(0.8));
        assert_eq!(formulation.derate(&"gas".into(), 2), Dimensionless(1.0));
    }
}
