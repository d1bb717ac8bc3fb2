//! Generation which always runs at its available capacity (`gen_must_run`).
use super::OperationalFormulation;
use crate::capacity::CapacityLookup;
use crate::composition::BuildContext;
use crate::problem::LinearExpr;
use crate::project::{Project, ProjectID};
use crate::temporal::TimepointID;
use anyhow::Result;
use std::collections::HashMap;

/// Formulation for must-run generators. Output is fixed, so no variables are needed and the
/// projects cannot provide reserves.
#[derive(Debug, Default)]
pub struct MustRunGeneration {
    power: HashMap<(ProjectID, TimepointID), LinearExpr>,
}

impl OperationalFormulation for MustRunGeneration {
    fn accepted_attributes(&self) -> &'static [&'static str] {
        &[]
    }

    fn can_provide_reserves(&self) -> bool {
        false
    }

    fn add_model_components(
        &mut self,
        _ctx: &mut BuildContext,
        projects: &[&Project],
        capacity: &CapacityLookup,
    ) -> Result<()> {
        for project in projects {
            for timepoint in capacity.timepoints(&project.id) {
                self.power.insert(
                    (project.id.clone(), timepoint),
                    capacity.available_capacity(&project.id, timepoint),
                );
            }
        }

        Ok(())
    }

    fn power(&self, project: &ProjectID, timepoint: TimepointID) -> LinearExpr {
        self.power
            .get(&(project.clone(), timepoint))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{capacity_lookup, model, specified_project};
    use crate::model::Model;
    use crate::units::Dimensionless;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_power_is_available_capacity(mut model: Model) {
        let project = specified_project(&mut model, "nuclear", 400.0);
        model
            .availability_derates
            .insert(("nuclear".into(), 1), Dimensionless(0.9));

        let mut ctx = BuildContext::new(&model, &model.temporal);
        let lookup = capacity_lookup(&mut ctx, &[&project]);
        let mut formulation = MustRunGeneration::default();
        formulation
            .add_model_components(&mut ctx, &[&project], &lookup)
            .unwrap();

        let power = formulation.power(&project.id, 1);
        assert!(power.is_constant());
        assert_approx_eq!(f64, power.constant_value(), 360.0);
        assert_eq!(ctx.problem.num_variables(), 0);
    }
}
