//! Dispatchable generation without unit commitment (`gen_simple`).
use super::{OperationalFormulation, add_simple_ramp_limits};
use crate::capacity::CapacityLookup;
use crate::composition::BuildContext;
use crate::problem::{LinearExpr, Variable};
use crate::project::{Project, ProjectID};
use crate::temporal::TimepointID;
use anyhow::Result;
use indexmap::IndexMap;

/// Formulation for generators which can be dispatched anywhere between zero and their available
/// capacity
#[derive(Debug, Default)]
pub struct SimpleGeneration {
    power: IndexMap<(ProjectID, TimepointID), Variable>,
}

impl OperationalFormulation for SimpleGeneration {
    fn accepted_attributes(&self) -> &'static [&'static str] {
        &["ramp_up_when_on_rate", "ramp_down_when_on_rate"]
    }

    fn add_model_components(
        &mut self,
        ctx: &mut BuildContext,
        projects: &[&Project],
        capacity: &CapacityLookup,
    ) -> Result<()> {
        for project in projects {
            for timepoint in capacity.timepoints(&project.id) {
                let power = ctx
                    .problem
                    .add_nonnegative(format!("power[{},{timepoint}]", project.id));
                ctx.problem.add_le(
                    format!("power_max[{},{timepoint}]", project.id),
                    power + ctx.components.headroom(&project.id, timepoint),
                    capacity.available_capacity(&project.id, timepoint),
                );
                ctx.problem.add_ge(
                    format!("power_min[{},{timepoint}]", project.id),
                    power - ctx.components.footroom(&project.id, timepoint),
                    LinearExpr::zero(),
                );
                self.power.insert((project.id.clone(), timepoint), power);
            }

            add_simple_ramp_limits(ctx, project, capacity, |tp| self.power(&project.id, tp));
        }

        Ok(())
    }

    fn power(&self, project: &ProjectID, timepoint: TimepointID) -> LinearExpr {
        self.power
            .get(&(project.clone(), timepoint))
            .map_or_else(LinearExpr::zero, |&var| var.into())
    }
}
