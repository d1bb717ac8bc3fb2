//! Planning reserve margin (PRM).
//!
//! Each zone may have a requirement for the capacity counting towards reliability in each period.
//! How much of a project's capacity counts depends on its PRM type.
use crate::capacity::CapacityLookup;
use crate::composition::BuildContext;
use crate::model::Model;
use crate::plugin::TypeTag;
use crate::problem::{LinearExpr, Solution, Variable};
use crate::project::{PrmType, Project};
use crate::registry::CostComponent;
use crate::temporal::PeriodID;
use crate::units::Dimensionless;
use crate::validation::ValidationReport;
use crate::zone::ZoneID;
use anyhow::Result;
use serde::Serialize;

/// The interface implemented by every PRM type
pub trait PrmFormulation {
    /// Whether projects of this type need a capacity type which defines energy capacity
    fn requires_energy_capacity(&self) -> bool {
        false
    }

    /// Check input data for the projects using this formulation
    fn validate_inputs(&self, _model: &Model, projects: &[&Project], report: &mut ValidationReport) {
        for project in projects {
            if project.elcc_fraction.is_none() {
                report.warn(&project.id, "No ELCC fraction given; assuming 1");
            }
        }
    }

    /// Add each project's contribution to its zone's reserve margin in each operational period
    fn add_model_components(
        &mut self,
        ctx: &mut BuildContext,
        projects: &[&Project],
        capacity: &CapacityLookup,
    ) -> Result<()>;
}

impl TypeTag for PrmType {
    type Plugin = dyn PrmFormulation;
    const KIND: &'static str = "PRM type";

    fn load_plugin(self) -> Box<dyn PrmFormulation> {
        match self {
            Self::FullyDeliverable => Box::new(FullyDeliverable),
            Self::EnergyLimited => Box::new(EnergyLimited),
        }
    }
}

fn elcc_fraction(project: &Project) -> f64 {
    project
        .elcc_fraction
        .unwrap_or(Dimensionless(1.0))
        .value()
}

/// A fixed fraction of capacity counts towards the reserve margin
#[derive(Debug, Default)]
pub struct FullyDeliverable;

impl PrmFormulation for FullyDeliverable {
    fn add_model_components(
        &mut self,
        ctx: &mut BuildContext,
        projects: &[&Project],
        capacity: &CapacityLookup,
    ) -> Result<()> {
        for project in projects {
            for &period in capacity.operational().periods(&project.id) {
                let contribution = capacity
                    .capacity(&project.id, period)
                    .scaled(elcc_fraction(project));
                ctx.components
                    .add_prm_contribution(&project.zone, period, &contribution);
            }
        }

        Ok(())
    }
}

/// As [`FullyDeliverable`], but the contribution is also limited to the power the project could
/// sustain for its minimum duration, given its energy capacity
#[derive(Debug, Default)]
pub struct EnergyLimited;

impl PrmFormulation for EnergyLimited {
    fn requires_energy_capacity(&self) -> bool {
        true
    }

    fn validate_inputs(&self, model: &Model, projects: &[&Project], report: &mut ValidationReport) {
        FullyDeliverable.validate_inputs(model, projects, report);
        for project in projects {
            if !project
                .min_duration_for_full_capacity
                .is_some_and(|hours| hours.value() > 0.0)
            {
                report.warn(
                    &project.id,
                    "No positive minimum duration for full capacity; energy limit not applied",
                );
            }
        }
    }

    fn add_model_components(
        &mut self,
        ctx: &mut BuildContext,
        projects: &[&Project],
        capacity: &CapacityLookup,
    ) -> Result<()> {
        for project in projects {
            let min_duration = project
                .min_duration_for_full_capacity
                .filter(|hours| hours.value() > 0.0);
            for &period in capacity.operational().periods(&project.id) {
                let contribution = ctx
                    .problem
                    .add_nonnegative(format!("elcc[{},{period}]", project.id));
                ctx.problem.add_le(
                    format!("elcc_max[{},{period}]", project.id),
                    contribution.into(),
                    capacity
                        .capacity(&project.id, period)
                        .scaled(elcc_fraction(project)),
                );
                if let Some(hours) = min_duration {
                    ctx.problem.add_le(
                        format!("elcc_energy_limit[{},{period}]", project.id),
                        contribution.into(),
                        capacity
                            .energy_capacity(&project.id, period)
                            .scaled(1.0 / hours.value()),
                    );
                }

                ctx.components.add_prm_contribution(
                    &project.zone,
                    period,
                    &contribution.into(),
                );
            }
        }

        Ok(())
    }
}

/// The balance of a reserve margin requirement in the solution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrmResult {
    /// The zone
    pub zone: ZoneID,
    /// The period
    pub period: PeriodID,
    /// The requirement
    pub requirement_mw: f64,
    /// Capacity counting towards the requirement
    pub contribution_mw: f64,
    /// Unmet requirement
    pub shortfall_mw: f64,
}

struct PrmBalance {
    zone: ZoneID,
    period: PeriodID,
    requirement: f64,
    contribution: LinearExpr,
    shortfall: Variable,
}

/// Reserve margin constraints for each zone and period
#[derive(Default)]
pub struct PrmRequirements(Vec<PrmBalance>);

impl PrmRequirements {
    /// Results for every requirement
    pub fn results(&self, solution: &Solution) -> Vec<PrmResult> {
        self.0
            .iter()
            .map(|balance| PrmResult {
                zone: balance.zone.clone(),
                period: balance.period,
                requirement_mw: balance.requirement,
                contribution_mw: solution.evaluate(&balance.contribution),
                shortfall_mw: solution.value(balance.shortfall),
            })
            .collect()
    }
}

/// Add a constraint for each reserve margin requirement in the periods being built, with any
/// shortfall penalised
pub fn add_prm_requirements(ctx: &mut BuildContext) -> PrmRequirements {
    let (model, temporal) = (ctx.model, ctx.temporal);
    let penalty = model.parameters.prm_shortfall_penalty.value();
    let mut requirements = PrmRequirements::default();
    for ((zone, period), requirement) in &model.prm_requirements {
        let period = *period;
        if !temporal.contains_period(period) {
            continue;
        }

        let contribution = ctx.components.prm_contribution(zone, period);
        let shortfall = ctx
            .problem
            .add_nonnegative(format!("prm_shortfall[{zone},{period}]"));
        ctx.problem.add_ge(
            format!("prm_requirement[{zone},{period}]"),
            contribution.clone() + shortfall,
            requirement.value().into(),
        );
        ctx.components.add_cost(
            CostComponent::PrmShortfall,
            &(shortfall * (penalty * temporal.period_weight(period).value())).into(),
        );
        requirements.0.push(PrmBalance {
            zone: zone.clone(),
            period,
            requirement: requirement.value(),
            contribution,
            shortfall,
        });
    }

    requirements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{capacity_lookup, model, project, specified_project, specified_storage};
    use crate::project::CapacityType;
    use crate::units::{Hours, Power};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_fully_deliverable(mut model: Model) {
        let mut project = specified_project(&mut model, "gas", 100.0);
        project.prm_type = Some(PrmType::FullyDeliverable);
        project.elcc_fraction = Some(Dimensionless(0.8));
        model.prm_requirements.insert(("z1".into(), 2030), Power(100.0));

        let mut ctx = BuildContext::new(&model, &model.temporal);
        let lookup = capacity_lookup(&mut ctx, &[&project]);
        PrmType::FullyDeliverable
            .load_plugin()
            .add_model_components(&mut ctx, &[&project], &lookup)
            .unwrap();
        let requirements = add_prm_requirements(&mut ctx);

        ctx.problem.set_objective(ctx.components.total_cost());
        let solution = ctx.problem.solve().unwrap();
        let results = requirements.results(&solution);
        assert_eq!(results.len(), 1);
        assert_approx_eq!(f64, results[0].contribution_mw, 80.0, epsilon = 1e-6);
        assert_approx_eq!(f64, results[0].shortfall_mw, 20.0, epsilon = 1e-6);
    }

    #[rstest]
    fn test_energy_limited(mut model: Model) {
        let mut project = specified_storage(&mut model, "battery", 100.0, 200.0);
        project.prm_type = Some(PrmType::EnergyLimited);
        project.min_duration_for_full_capacity = Some(Hours(4.0));
        model.prm_requirements.insert(("z1".into(), 2030), Power(100.0));

        let mut ctx = BuildContext::new(&model, &model.temporal);
        let lookup = capacity_lookup(&mut ctx, &[&project]);
        PrmType::EnergyLimited
            .load_plugin()
            .add_model_components(&mut ctx, &[&project], &lookup)
            .unwrap();
        let requirements = add_prm_requirements(&mut ctx);

        ctx.problem.set_objective(ctx.components.total_cost());
        let solution = ctx.problem.solve().unwrap();
        let results = requirements.results(&solution);
        assert_approx_eq!(f64, results[0].contribution_mw, 50.0, epsilon = 1e-6);
    }

    #[rstest]
    fn test_energy_limited_advisories(model: Model) {
        let mut project = project("battery", CapacityType::StorSpec);
        project.prm_type = Some(PrmType::EnergyLimited);
        let mut report = ValidationReport::new();
        EnergyLimited.validate_inputs(&model, &[&project], &mut report);
        assert!(report.contains("battery", "No ELCC fraction"));
        assert!(report.contains("battery", "No positive minimum duration"));
        assert!(EnergyLimited.requires_energy_capacity());
        assert!(!FullyDeliverable.requires_energy_capacity());
    }
}
