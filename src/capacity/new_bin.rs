//! New capacity built in blocks of a fixed size (`gen_new_bin`).
//!
//! Each vintage has a binary build decision. At most one vintage of a project may be operational
//! in any period, so a project cannot be rebuilt while an earlier build is still operational.
use super::{CapacityFormulation, NewBuild, Vintage};
use crate::composition::BuildContext;
use crate::model::Model;
use crate::problem::{LinearExpr, Solution, Variable};
use crate::project::{CapacityType, Project, ProjectID};
use crate::temporal::PeriodID;
use crate::units::Power;
use crate::validation::ValidationReport;
use anyhow::Result;
use indexmap::IndexMap;

#[derive(Debug, Clone)]
struct BinaryBuild {
    vintage: Vintage,
    build: Variable,
}

/// Formulation for discrete new build in fixed-size blocks
#[derive(Debug, Default)]
pub struct NewBinaryCapacity {
    build_sizes: IndexMap<ProjectID, Power>,
    builds: IndexMap<ProjectID, Vec<BinaryBuild>>,
}

impl NewBinaryCapacity {
    fn build_size(&self, project: &ProjectID) -> f64 {
        self.build_sizes.get(project).map_or(0.0, |size| size.value())
    }

    fn operational_builds(
        &self,
        project: &ProjectID,
        period: PeriodID,
    ) -> impl Iterator<Item = &BinaryBuild> {
        self.builds
            .get(project)
            .into_iter()
            .flatten()
            .filter(move |build| build.vintage.is_operational_in(period))
    }
}

impl CapacityFormulation for NewBinaryCapacity {
    fn validate_inputs(&self, model: &Model, projects: &[&Project], report: &mut ValidationReport) {
        for project in projects {
            if !model.capacity_data.build_sizes.contains_key(&project.id) {
                report.warn(
                    &project.id,
                    "No build size given; new builds will not add capacity",
                );
            }

            for vintage in model.capacity_data.vintages_for(&project.id) {
                if vintage.annualised_cost.is_none() {
                    report.warn(
                        &project.id,
                        format!(
                            "No annualised cost per MW-yr for vintage {}; assuming zero",
                            vintage.period
                        ),
                    );
                }
            }
        }
    }

    fn add_model_components(&mut self, ctx: &mut BuildContext, projects: &[&Project]) -> Result<()> {
        let (model, temporal) = (ctx.model, ctx.temporal);
        for project in projects {
            if let Some(size) = model.capacity_data.build_sizes.get(&project.id) {
                self.build_sizes.insert(project.id.clone(), *size);
            }

            let builds = model
                .capacity_data
                .vintages_for(&project.id)
                .iter()
                .filter(|vintage| temporal.contains_period(vintage.period))
                .map(|vintage| BinaryBuild {
                    vintage: vintage.clone(),
                    build: ctx
                        .problem
                        .add_binary(format!("build[{},{}]", project.id, vintage.period)),
                })
                .collect();
            self.builds.insert(project.id.clone(), builds);

            let mut operational_periods = Vec::new();
            for period in temporal.iter_period_ids() {
                let operational: LinearExpr = self
                    .operational_builds(&project.id, period)
                    .map(|build| LinearExpr::from(build.build))
                    .sum();
                if operational.is_constant() {
                    continue;
                }

                ctx.problem.add_le(
                    format!("one_build_operational[{},{period}]", project.id),
                    operational,
                    1.0.into(),
                );
                operational_periods.push((project.id.clone(), period));
            }
            ctx.components
                .register_operational_periods(CapacityType::GenNewBin, operational_periods);
        }

        Ok(())
    }

    fn capacity(&self, project: &ProjectID, period: PeriodID) -> LinearExpr {
        let size = self.build_size(project);
        self.operational_builds(project, period)
            .map(|build| build.build * size)
            .sum()
    }

    fn capacity_cost(&self, project: &ProjectID, period: PeriodID) -> LinearExpr {
        let size = self.build_size(project);
        self.operational_builds(project, period)
            .map(|build| {
                let cost = build.vintage.annualised_cost.map_or(0.0, |c| c.value());
                build.build * (size * cost)
            })
            .sum()
    }

    fn new_builds(&self, solution: &Solution) -> Vec<NewBuild> {
        self.builds
            .iter()
            .flat_map(|(project, builds)| {
                let size = self.build_size(project);
                builds.iter().map(move |build| NewBuild {
                    project: project.clone(),
                    vintage: build.vintage.period,
                    capacity_mw: solution.value(build.build).round() * size,
                    energy_capacity_mwh: None,
                })
            })
            .collect()
    }
}
