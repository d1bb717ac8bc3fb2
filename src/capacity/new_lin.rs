//! New capacity built in continuous amounts (`gen_new_lin` and `stor_new_lin`).
//!
//! There is one non-negative build variable per vintage. Storage projects have a second build
//! variable for energy capacity.
use super::{CapacityFormulation, NewBuild, Vintage};
use crate::composition::BuildContext;
use crate::model::Model;
use crate::problem::{LinearExpr, Solution, Variable};
use crate::project::{CapacityType, Project, ProjectID};
use crate::temporal::PeriodID;
use crate::validation::ValidationReport;
use anyhow::Result;
use indexmap::IndexMap;

/// Build variables for one vintage
#[derive(Debug, Clone)]
struct VintageBuild {
    vintage: Vintage,
    power: Variable,
    energy: Option<Variable>,
}

/// Formulation for continuous new build of power (and, for storage, energy) capacity
#[derive(Debug)]
pub struct NewLinearCapacity {
    storage: bool,
    builds: IndexMap<ProjectID, Vec<VintageBuild>>,
}

impl NewLinearCapacity {
    /// Create a new formulation, for storage projects if `storage` is true
    pub fn new(storage: bool) -> Self {
        Self {
            storage,
            builds: IndexMap::new(),
        }
    }

    fn capacity_type(&self) -> CapacityType {
        if self.storage {
            CapacityType::StorNewLin
        } else {
            CapacityType::GenNewLin
        }
    }

    /// The builds of a project which are operational in a period
    fn operational_builds(
        &self,
        project: &ProjectID,
        period: PeriodID,
    ) -> impl Iterator<Item = &VintageBuild> {
        self.builds
            .get(project)
            .into_iter()
            .flatten()
            .filter(move |build| build.vintage.is_operational_in(period))
    }
}

impl CapacityFormulation for NewLinearCapacity {
    fn validate_inputs(&self, model: &Model, projects: &[&Project], report: &mut ValidationReport) {
        for project in projects {
            let vintages = model.capacity_data.vintages_for(&project.id);
            if vintages.is_empty() {
                report.warn(&project.id, "No new build vintages defined");
            }

            for vintage in vintages {
                if vintage.annualised_cost.is_none() {
                    report.warn(
                        &project.id,
                        format!(
                            "No annualised cost per MW-yr for vintage {}; assuming zero",
                            vintage.period
                        ),
                    );
                }
                if self.storage && vintage.annualised_energy_cost.is_none() {
                    report.warn(
                        &project.id,
                        format!(
                            "No annualised cost per MWh-yr for vintage {}; assuming zero",
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
            // Only vintages whose build period is being modelled can be built
            let builds = model
                .capacity_data
                .vintages_for(&project.id)
                .iter()
                .filter(|vintage| temporal.contains_period(vintage.period))
                .map(|vintage| {
                    let power = ctx.problem.add_nonnegative(format!(
                        "build_capacity[{},{}]",
                        project.id, vintage.period
                    ));
                    let energy = self.storage.then(|| {
                        ctx.problem.add_nonnegative(format!(
                            "build_energy_capacity[{},{}]",
                            project.id, vintage.period
                        ))
                    });

                    VintageBuild {
                        vintage: vintage.clone(),
                        power,
                        energy,
                    }
                })
                .collect::<Vec<_>>();
            self.builds.insert(project.id.clone(), builds);

            let operational_periods = temporal
                .iter_period_ids()
                .filter(|&period| self.operational_builds(&project.id, period).next().is_some())
                .map(|period| (project.id.clone(), period))
                .collect::<Vec<_>>();
            ctx.components
                .register_operational_periods(self.capacity_type(), operational_periods);

            for vintage in model.capacity_data.vintages_for(&project.id) {
                let Some(max) = vintage.max_cumulative_new_build else {
                    continue;
                };
                if !temporal.contains_period(vintage.period) {
                    continue;
                }

                ctx.problem.add_le(
                    format!("max_cumulative_new_build[{},{}]", project.id, vintage.period),
                    self.capacity(&project.id, vintage.period),
                    max.value().into(),
                );
            }
        }

        Ok(())
    }

    fn capacity(&self, project: &ProjectID, period: PeriodID) -> LinearExpr {
        self.operational_builds(project, period)
            .map(|build| LinearExpr::from(build.power))
            .sum()
    }

    fn provides_energy_capacity(&self) -> bool {
        self.storage
    }

    fn energy_capacity(&self, project: &ProjectID, period: PeriodID) -> Option<LinearExpr> {
        self.storage.then(|| {
            self.operational_builds(project, period)
                .filter_map(|build| build.energy)
                .map(LinearExpr::from)
                .sum()
        })
    }

    fn capacity_cost(&self, project: &ProjectID, period: PeriodID) -> LinearExpr {
        let mut cost = LinearExpr::zero();
        for build in self.operational_builds(project, period) {
            let power_cost = build.vintage.annualised_cost.map_or(0.0, |c| c.value());
            cost.add_term(build.power, power_cost);

            if let Some(energy) = build.energy {
                let energy_cost = build
                    .vintage
                    .annualised_energy_cost
                    .map_or(0.0, |c| c.value());
                cost.add_term(energy, energy_cost);
            }
        }

        cost
    }

    fn new_builds(&self, solution: &Solution) -> Vec<NewBuild> {
        self.builds
            .iter()
            .flat_map(|(project, builds)| {
                builds.iter().map(|build| NewBuild {
                    project: project.clone(),
                    vintage: build.vintage.period,
                    capacity_mw: solution.value(build.power),
                    energy_capacity_mwh: build.energy.map(|var| solution.value(var)),
                })
            })
            .collect()
    }
}
