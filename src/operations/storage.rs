//! Energy storage (`stor`).
//!
//! Storage charges and discharges within its power capacity and tracks its state of charge
//! through each horizon. On circular horizons the state of charge wraps around from the last
//! timepoint to the first; on linear horizons the store starts each horizon empty.
use super::{DispatchResult, OperationalFormulation, fraction_or_default};
use crate::capacity::CapacityLookup;
use crate::composition::BuildContext;
use crate::problem::{LinearExpr, Solution, Variable};
use crate::project::{Project, ProjectID};
use crate::temporal::TimepointID;
use crate::units::Dimensionless;
use anyhow::Result;
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy)]
struct StorageVariables {
    charge: Variable,
    discharge: Variable,
    state_of_charge: Variable,
}

/// Formulation for storage projects
#[derive(Debug, Default)]
pub struct Storage {
    variables: IndexMap<(ProjectID, TimepointID), StorageVariables>,
}

impl Storage {
    fn get(&self, project: &ProjectID, timepoint: TimepointID) -> Option<&StorageVariables> {
        self.variables.get(&(project.clone(), timepoint))
    }
}

impl OperationalFormulation for Storage {
    fn accepted_attributes(&self) -> &'static [&'static str] {
        &["charging_efficiency", "discharging_efficiency"]
    }

    fn requires_energy_capacity(&self) -> bool {
        true
    }

    fn add_model_components(
        &mut self,
        ctx: &mut BuildContext,
        projects: &[&Project],
        capacity: &CapacityLookup,
    ) -> Result<()> {
        let temporal = ctx.temporal;
        for project in projects {
            let charging_efficiency = fraction_or_default(
                project,
                "charging_efficiency",
                project.operating.charging_efficiency,
                Dimensionless(1.0),
                &mut ctx.report,
            );
            let discharging_efficiency = fraction_or_default(
                project,
                "discharging_efficiency",
                project.operating.discharging_efficiency,
                Dimensionless(1.0),
                &mut ctx.report,
            );

            let timepoints: Vec<_> = capacity.timepoints(&project.id).collect();
            for &timepoint in &timepoints {
                let name = |var: &str| format!("{var}[{},{timepoint}]", project.id);
                let vars = StorageVariables {
                    charge: ctx.problem.add_nonnegative(name("charge")),
                    discharge: ctx.problem.add_nonnegative(name("discharge")),
                    state_of_charge: ctx.problem.add_nonnegative(name("state_of_charge")),
                };
                self.variables.insert((project.id.clone(), timepoint), vars);

                let available = capacity.available_capacity(&project.id, timepoint);
                let headroom = ctx.components.headroom(&project.id, timepoint);
                let footroom = ctx.components.footroom(&project.id, timepoint);
                ctx.problem.add_le(
                    name("max_discharge"),
                    vars.discharge - vars.charge + headroom,
                    available.clone(),
                );
                ctx.problem.add_le(
                    name("max_charge"),
                    vars.charge - vars.discharge + footroom,
                    available,
                );
                ctx.problem.add_le(
                    name("max_state_of_charge"),
                    vars.state_of_charge.into(),
                    capacity.energy_capacity_at(&project.id, timepoint),
                );
            }

            for &timepoint in &timepoints {
                let vars = self.variables[&(project.id.clone(), timepoint)];
                let hours = temporal.duration(timepoint).value();
                let net_stored = vars.charge * (charging_efficiency.value() * hours)
                    - vars.discharge * (hours / discharging_efficiency.value());

                // A linear horizon starts empty
                let initial = temporal
                    .previous(timepoint)
                    .and_then(|prev| self.get(&project.id, prev))
                    .map_or_else(LinearExpr::zero, |prev| prev.state_of_charge.into());
                ctx.problem.add_eq(
                    format!("state_of_charge_tracking[{},{timepoint}]", project.id),
                    vars.state_of_charge.into(),
                    initial + net_stored,
                );
            }
        }

        Ok(())
    }

    fn power(&self, project: &ProjectID, timepoint: TimepointID) -> LinearExpr {
        self.get(project, timepoint)
            .map_or_else(LinearExpr::zero, |vars| vars.discharge - vars.charge)
    }

    fn variable_om_basis(&self, project: &ProjectID, timepoint: TimepointID) -> LinearExpr {
        self.get(project, timepoint)
            .map_or_else(LinearExpr::zero, |vars| vars.discharge.into())
    }

    fn dispatch_results(
        &self,
        solution: &Solution,
        project: &ProjectID,
        timepoint: TimepointID,
    ) -> DispatchResult {
        let Some(vars) = self.get(project, timepoint) else {
            return DispatchResult::default();
        };

        let charge = solution.value(vars.charge);
        let discharge = solution.value(vars.discharge);
        DispatchResult {
            power_mw: discharge - charge,
            charge_mw: Some(charge),
            discharge_mw: Some(discharge),
            state_of_charge_mwh: Some(solution.value(vars.state_of_charge)),
            ..DispatchResult::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{capacity_lookup, model, specified_storage, temporal_hierarchy};
    use crate::model::Model;
    use crate::temporal::BoundaryPolicy;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn build_battery<'a>(
        model: &'a Model,
        project: &Project,
    ) -> (BuildContext<'a>, Storage) {
        let mut ctx = BuildContext::new(model, &model.temporal);
        let lookup = capacity_lookup(&mut ctx, &[project]);
        let mut formulation = Storage::default();
        formulation
            .add_model_components(&mut ctx, &[project], &lookup)
            .unwrap();
        (ctx, formulation)
    }

    #[rstest]
    fn test_linear_horizon_starts_empty(mut model: Model) {
        model.temporal = temporal_hierarchy(BoundaryPolicy::Linear, &[1.0; 4]);
        let mut project = specified_storage(&mut model, "battery", 50.0, 100.0);
        project.operating.charging_efficiency = Some(Dimensionless(0.9));
        let (mut ctx, formulation) = build_battery(&model, &project);

        // Discharging 45 MWh needs 50 MWh of charging beforehand
        ctx.problem
            .add_eq("discharge", formulation.power(&project.id, 4), 45.0.into());
        let total_charge: LinearExpr = (1..=4)
            .map(|tp| LinearExpr::from(formulation.get(&project.id, tp).unwrap().charge))
            .sum();
        ctx.problem.set_objective(total_charge.clone());
        let solution = ctx.problem.solve().unwrap();
        assert_approx_eq!(f64, solution.evaluate(&total_charge), 50.0, epsilon = 1e-6);

        let result = formulation.dispatch_results(&solution, &project.id, 4);
        assert_approx_eq!(f64, result.discharge_mw.unwrap(), 45.0, epsilon = 1e-6);
        assert_approx_eq!(f64, result.state_of_charge_mwh.unwrap(), 0.0, epsilon = 1e-6);
    }

    #[rstest]
    fn test_cannot_discharge_first_timepoint_of_linear_horizon(mut model: Model) {
        model.temporal = temporal_hierarchy(BoundaryPolicy::Linear, &[1.0; 2]);
        let project = specified_storage(&mut model, "battery", 50.0, 100.0);
        let (mut ctx, formulation) = build_battery(&model, &project);

        ctx.problem
            .add_eq("discharge", formulation.power(&project.id, 1), 10.0.into());
        assert!(ctx.problem.solve().is_err());
    }

    #[rstest]
    fn test_circular_horizon_wraps_around(mut model: Model) {
        model.temporal = temporal_hierarchy(BoundaryPolicy::Circular, &[1.0; 2]);
        let project = specified_storage(&mut model, "battery", 50.0, 100.0);
        let (mut ctx, formulation) = build_battery(&model, &project);

        // Energy charged in the last timepoint is available in the first
        ctx.problem
            .add_eq("discharge", formulation.power(&project.id, 1), 30.0.into());
        let solution = ctx.problem.solve().unwrap();
        let result = formulation.dispatch_results(&solution, &project.id, 2);
        assert_approx_eq!(f64, result.power_mw, -30.0, epsilon = 1e-6);
    }

    #[rstest]
    fn test_state_of_charge_limited_by_energy_capacity(mut model: Model) {
        model.temporal = temporal_hierarchy(BoundaryPolicy::Linear, &[1.0; 4]);
        let project = specified_storage(&mut model, "battery", 50.0, 60.0);
        let (mut ctx, formulation) = build_battery(&model, &project);

        let last = formulation.get(&project.id, 4).unwrap().state_of_charge;
        ctx.problem.set_objective(-LinearExpr::from(last));
        let solution = ctx.problem.solve().unwrap();
        assert_approx_eq!(f64, solution.value(last), 60.0, epsilon = 1e-6);
    }
}
