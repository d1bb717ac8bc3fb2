//! Variable generation such as wind and solar (`gen_var`).
use super::{DispatchResult, OperationalFormulation};
use crate::capacity::CapacityLookup;
use crate::composition::BuildContext;
use crate::problem::{LinearExpr, Solution, Variable};
use crate::project::{Project, ProjectID};
use crate::temporal::TimepointID;
use anyhow::Result;
use indexmap::IndexMap;

#[derive(Debug, Clone)]
struct VariableDispatch {
    power: Variable,
    scheduled: LinearExpr,
}

/// Formulation for generators whose output is limited by an exogenous capacity factor.
///
/// Output may be curtailed below the scheduled level and headroom comes from curtailment.
#[derive(Debug, Default)]
pub struct VariableGeneration {
    dispatch: IndexMap<(ProjectID, TimepointID), VariableDispatch>,
}

impl OperationalFormulation for VariableGeneration {
    fn accepted_attributes(&self) -> &'static [&'static str] {
        &[]
    }

    fn add_model_components(
        &mut self,
        ctx: &mut BuildContext,
        projects: &[&Project],
        capacity: &CapacityLookup,
    ) -> Result<()> {
        let model = ctx.model;
        for project in projects {
            let mut missing = 0;
            for timepoint in capacity.timepoints(&project.id) {
                let capacity_factor = match model
                    .capacity_factors
                    .get(&(project.id.clone(), timepoint))
                {
                    Some(cf) => cf.value(),
                    None => {
                        missing += 1;
                        0.0
                    }
                };
                let scheduled = capacity
                    .available_capacity(&project.id, timepoint)
                    .scaled(capacity_factor);

                let power = ctx
                    .problem
                    .add_nonnegative(format!("power[{},{timepoint}]", project.id));
                ctx.problem.add_le(
                    format!("power_max[{},{timepoint}]", project.id),
                    power + ctx.components.headroom(&project.id, timepoint),
                    scheduled.clone(),
                );
                ctx.problem.add_ge(
                    format!("power_min[{},{timepoint}]", project.id),
                    power - ctx.components.footroom(&project.id, timepoint),
                    LinearExpr::zero(),
                );
                self.dispatch.insert(
                    (project.id.clone(), timepoint),
                    VariableDispatch { power, scheduled },
                );
            }

            if missing > 0 {
                ctx.report.warn(
                    &project.id,
                    format!("No capacity factor given for {missing} timepoint(s); assuming zero"),
                );
            }
        }

        Ok(())
    }

    fn power(&self, project: &ProjectID, timepoint: TimepointID) -> LinearExpr {
        self.dispatch
            .get(&(project.clone(), timepoint))
            .map_or_else(LinearExpr::zero, |dispatch| dispatch.power.into())
    }

    fn dispatch_results(
        &self,
        solution: &Solution,
        project: &ProjectID,
        timepoint: TimepointID,
    ) -> DispatchResult {
        let Some(dispatch) = self.dispatch.get(&(project.clone(), timepoint)) else {
            return DispatchResult::default();
        };

        let power = solution.value(dispatch.power);
        DispatchResult {
            power_mw: power,
            curtailment_mw: Some(solution.evaluate(&dispatch.scheduled) - power),
            ..DispatchResult::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{capacity_lookup, model, specified_project};
    use crate::model::Model;
    use crate::project::OperationalType;
    use crate::units::Dimensionless;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_curtailment(mut model: Model) {
        let mut project = specified_project(&mut model, "wind", 200.0);
        project.operational_type = OperationalType::GenVar;
        model
            .capacity_factors
            .insert(("wind".into(), 1), Dimensionless(0.4));

        let mut ctx = BuildContext::new(&model, &model.temporal);
        let lookup = capacity_lookup(&mut ctx, &[&project]);
        let mut formulation = VariableGeneration::default();
        formulation
            .add_model_components(&mut ctx, &[&project], &lookup)
            .unwrap();
        assert!(ctx.report.contains("wind", "No capacity factor"));

        let power = formulation.power(&project.id, 1);
        ctx.problem.add_le("cap", power.clone(), 50.0.into());
        ctx.problem.set_objective(-power);
        let solution = ctx.problem.solve().unwrap();

        let result = formulation.dispatch_results(&solution, &project.id, 1);
        assert_approx_eq!(f64, result.power_mw, 50.0, epsilon = 1e-6);
        assert_approx_eq!(f64, result.curtailment_mw.unwrap(), 30.0, epsilon = 1e-6);

        // No capacity factor, so nothing can be generated
        let result = formulation.dispatch_results(&solution, &project.id, 2);
        assert_approx_eq!(f64, result.power_mw, 0.0, epsilon = 1e-6);
    }
}
