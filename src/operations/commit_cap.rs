//! Dispatchable generation with linearised unit commitment (`gen_commit_cap`).
//!
//! Committed capacity is a continuous variable bounded by available capacity. Output must lie
//! between the minimum stable level and the committed capacity, with room left for any reserves
//! the project provides. Changes in committed capacity are tracked by startup and shutdown
//! variables, which are used to enforce ramp limits and minimum up and down times.
use super::{DispatchResult, OperationalFormulation};
use crate::capacity::CapacityLookup;
use crate::composition::BuildContext;
use crate::problem::{LinearExpr, Solution, Variable};
use crate::project::{Project, ProjectID};
use crate::registry::CostComponent;
use crate::temporal::TimepointID;
use crate::units::Dimensionless;
use crate::validation::ValidationReport;
use anyhow::Result;
use indexmap::IndexMap;

/// Variables limiting how quickly output can change between timepoints
#[derive(Debug, Clone, Copy)]
struct RampVariables {
    /// Upward ramp of capacity which has just started up
    up_startup: Variable,
    /// Upward ramp of capacity which was already committed
    up_when_on: Variable,
    /// Downward ramp of capacity which is shutting down
    down_shutdown: Variable,
    /// Downward ramp of capacity which remains committed
    down_when_on: Variable,
}

#[derive(Debug, Clone, Copy)]
struct CommitVariables {
    commit: Variable,
    power: Variable,
    startup: Variable,
    shutdown: Variable,
    ramp: Option<RampVariables>,
}

/// Formulation for dispatchable generators with unit commitment
#[derive(Debug, Default)]
pub struct CommitCapacity {
    vars: IndexMap<(ProjectID, TimepointID), CommitVariables>,
}

/// The minimum stable level of a project, clamped to [0, 1]
fn min_stable_level(project: &Project, report: &mut ValidationReport) -> f64 {
    let Some(level) = project.operating.min_stable_level else {
        return 0.0;
    };

    if !(Dimensionless(0.0)..=Dimensionless(1.0)).contains(&level) {
        let clamped = level.value().clamp(0.0, 1.0);
        report.warn(
            &project.id,
            format!("Minimum stable level of {level} is outside [0, 1]; using {clamped}"),
        );
        return clamped;
    }

    level.value()
}

fn has_ramp_limits(project: &Project) -> bool {
    let operating = &project.operating;
    operating.startup_plus_ramp_up_rate.is_some()
        || operating.shutdown_plus_ramp_down_rate.is_some()
        || operating.ramp_up_when_on_rate.is_some()
        || operating.ramp_down_when_on_rate.is_some()
}

/// The fraction of capacity which can ramp in a timepoint, with unspecified rates unconstrained
fn ramp_fraction(rate: Option<Dimensionless>, hours: f64, cap: f64) -> f64 {
    rate.map_or(cap, |rate| (rate.value() * hours).min(cap))
}

impl CommitCapacity {
    fn get(&self, project: &ProjectID, timepoint: TimepointID) -> Option<&CommitVariables> {
        self.vars.get(&(project.clone(), timepoint))
    }

    fn add_variables(
        &mut self,
        ctx: &mut BuildContext,
        project: &Project,
        capacity: &CapacityLookup,
        min_stable_level: f64,
    ) {
        let ramp_limited = has_ramp_limits(project);
        for timepoint in capacity.timepoints(&project.id) {
            let name = |var: &str| format!("{var}[{},{timepoint}]", project.id);
            let problem = &mut ctx.problem;
            let vars = CommitVariables {
                commit: problem.add_nonnegative(name("commit")),
                power: problem.add_nonnegative(name("power")),
                startup: problem.add_nonnegative(name("startup")),
                shutdown: problem.add_nonnegative(name("shutdown")),
                ramp: ramp_limited.then(|| RampVariables {
                    up_startup: problem.add_nonnegative(name("ramp_up_startup")),
                    up_when_on: problem.add_nonnegative(name("ramp_up_when_on")),
                    down_shutdown: problem.add_nonnegative(name("ramp_down_shutdown")),
                    down_when_on: problem.add_nonnegative(name("ramp_down_when_on")),
                }),
            };

            let headroom = ctx.components.headroom(&project.id, timepoint);
            let footroom = ctx.components.footroom(&project.id, timepoint);
            ctx.problem.add_le(
                name("commit_max"),
                vars.commit.into(),
                capacity.available_capacity(&project.id, timepoint),
            );
            ctx.problem.add_le(
                name("power_max"),
                LinearExpr::from(vars.power) + headroom,
                vars.commit.into(),
            );
            ctx.problem.add_ge(
                name("power_min"),
                LinearExpr::from(vars.power) - footroom,
                vars.commit * min_stable_level,
            );

            self.vars.insert((project.id.clone(), timepoint), vars);
        }
    }

    /// Constraints linking each timepoint to the previous one
    fn add_transition_constraints(
        &self,
        ctx: &mut BuildContext,
        project: &Project,
        capacity: &CapacityLookup,
        min_stable_level: f64,
    ) {
        let temporal = ctx.temporal;
        let operating = &project.operating;
        for timepoint in capacity.timepoints(&project.id) {
            let Some(vars) = self.get(&project.id, timepoint) else {
                continue;
            };
            let Some((prev, prev_vars)) = temporal
                .previous(timepoint)
                .and_then(|prev| self.get(&project.id, prev).map(|vars| (prev, vars)))
            else {
                continue;
            };
            let name = |con: &str| format!("{con}[{},{timepoint}]", project.id);

            ctx.problem.add_eq(
                name("commit_change"),
                vars.startup * 1.0 - vars.shutdown,
                vars.commit * 1.0 - prev_vars.commit,
            );

            // Capacity starting up must be offline before and online now, and the reverse for
            // capacity shutting down
            ctx.problem
                .add_le(name("startup_max_on"), vars.startup.into(), vars.commit.into());
            ctx.problem.add_le(
                name("startup_max_off"),
                vars.startup.into(),
                capacity.available_capacity(&project.id, timepoint) - prev_vars.commit,
            );
            ctx.problem
                .add_le(name("shutdown_max_on"), vars.shutdown.into(), prev_vars.commit.into());
            ctx.problem.add_le(
                name("shutdown_max_off"),
                vars.shutdown.into(),
                capacity.available_capacity(&project.id, prev) - vars.commit,
            );

            let Some(ramp) = vars.ramp else {
                continue;
            };
            let hours = temporal.duration(prev).value();

            // Upward ramp, allowing for upward reserves now and downward reserves before.
            // Capacity shutting down was running at least at its minimum stable level, so
            // simultaneous startups and shutdowns gain no ramp unless startup is faster.
            let up = LinearExpr::from(vars.power) + ctx.components.headroom(&project.id, timepoint)
                - (LinearExpr::from(prev_vars.power)
                    - ctx.components.footroom(&project.id, prev));
            ctx.problem.add_le(
                name("ramp_up"),
                up,
                ramp.up_startup * 1.0 + ramp.up_when_on - vars.shutdown * min_stable_level,
            );
            ctx.problem.add_le(
                name("ramp_up_startup_max"),
                ramp.up_startup.into(),
                vars.startup * ramp_fraction(operating.startup_plus_ramp_up_rate, hours, 1.0),
            );
            ctx.problem.add_le(
                name("ramp_up_when_on_max"),
                ramp.up_when_on.into(),
                prev_vars.commit
                    * ramp_fraction(operating.ramp_up_when_on_rate, hours, 1.0 - min_stable_level),
            );

            // Downward ramp, allowing for upward reserves before and downward reserves now
            let down = LinearExpr::from(prev_vars.power) + ctx.components.headroom(&project.id, prev)
                - (LinearExpr::from(vars.power) - ctx.components.footroom(&project.id, timepoint));
            ctx.problem.add_le(
                name("ramp_down"),
                down,
                ramp.down_shutdown * 1.0 + ramp.down_when_on - vars.startup * min_stable_level,
            );
            ctx.problem.add_le(
                name("ramp_down_shutdown_max"),
                ramp.down_shutdown.into(),
                vars.shutdown * ramp_fraction(operating.shutdown_plus_ramp_down_rate, hours, 1.0),
            );
            ctx.problem.add_le(
                name("ramp_down_when_on_max"),
                ramp.down_when_on.into(),
                vars.commit
                    * ramp_fraction(
                        operating.ramp_down_when_on_rate,
                        hours,
                        1.0 - min_stable_level,
                    ),
            );
        }
    }

    /// Minimum up and down time constraints over each timepoint's lookback window
    fn add_min_time_constraints(
        &self,
        ctx: &mut BuildContext,
        project: &Project,
        capacity: &CapacityLookup,
    ) {
        let temporal = ctx.temporal;
        for timepoint in capacity.timepoints(&project.id) {
            let Some(vars) = self.get(&project.id, timepoint) else {
                continue;
            };

            if let Some(min_up) = project.operating.min_up_time {
                let window = temporal.lookback_window(timepoint, min_up);
                if let Some(window) = window.constraint_timepoints() {
                    let started: LinearExpr = window
                        .iter()
                        .filter_map(|&tp| self.get(&project.id, tp))
                        .map(|vars| LinearExpr::from(vars.startup))
                        .sum();
                    ctx.problem.add_ge(
                        format!("min_up_time[{},{timepoint}]", project.id),
                        vars.commit.into(),
                        started,
                    );
                }
            }

            if let Some(min_down) = project.operating.min_down_time {
                let window = temporal.lookback_window(timepoint, min_down);
                if let Some(window) = window.constraint_timepoints() {
                    let shut_down: LinearExpr = window
                        .iter()
                        .filter_map(|&tp| self.get(&project.id, tp))
                        .map(|vars| LinearExpr::from(vars.shutdown))
                        .sum();
                    ctx.problem.add_ge(
                        format!("min_down_time[{},{timepoint}]", project.id),
                        capacity.available_capacity(&project.id, timepoint) - vars.commit,
                        shut_down,
                    );
                }
            }
        }
    }

    fn add_costs(&self, ctx: &mut BuildContext, project: &Project, capacity: &CapacityLookup) {
        let temporal = ctx.temporal;
        let startup_cost = project.operating.startup_cost.map(|c| c.value());
        let shutdown_cost = project.operating.shutdown_cost.map(|c| c.value());
        for timepoint in capacity.timepoints(&project.id) {
            let Some(vars) = self.get(&project.id, timepoint) else {
                continue;
            };
            let weight = temporal.objective_event_weight(timepoint).value();
            if let Some(cost) = startup_cost {
                ctx.components
                    .add_cost(CostComponent::Startup, &(vars.startup * (cost * weight)));
            }
            if let Some(cost) = shutdown_cost {
                ctx.components
                    .add_cost(CostComponent::Shutdown, &(vars.shutdown * (cost * weight)));
            }
        }
    }
}

impl OperationalFormulation for CommitCapacity {
    fn accepted_attributes(&self) -> &'static [&'static str] {
        &[
            "min_stable_level_fraction",
            "startup_plus_ramp_up_rate",
            "shutdown_plus_ramp_down_rate",
            "ramp_up_when_on_rate",
            "ramp_down_when_on_rate",
            "min_up_time_hours",
            "min_down_time_hours",
            "startup_cost_per_mw",
            "shutdown_cost_per_mw",
        ]
    }

    fn add_model_components(
        &mut self,
        ctx: &mut BuildContext,
        projects: &[&Project],
        capacity: &CapacityLookup,
    ) -> Result<()> {
        for project in projects {
            let min_stable_level = min_stable_level(project, &mut ctx.report);
            self.add_variables(ctx, project, capacity, min_stable_level);
            self.add_transition_constraints(ctx, project, capacity, min_stable_level);
            self.add_min_time_constraints(ctx, project, capacity);
            self.add_costs(ctx, project, capacity);
        }

        Ok(())
    }

    fn power(&self, project: &ProjectID, timepoint: TimepointID) -> LinearExpr {
        self.get(project, timepoint)
            .map_or_else(LinearExpr::zero, |vars| vars.power.into())
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

        DispatchResult {
            power_mw: solution.value(vars.power),
            committed_mw: Some(solution.value(vars.commit)),
            startup_mw: Some(solution.value(vars.startup)),
            shutdown_mw: Some(solution.value(vars.shutdown)),
            ..DispatchResult::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{capacity_lookup, model, specified_project, temporal_hierarchy};
    use crate::model::Model;
    use crate::project::OperationalType;
    use crate::temporal::BoundaryPolicy;
    use crate::units::Hours;
    use float_cmp::assert_approx_eq;
    use itertools::Itertools;
    use rstest::rstest;

    /// A model with a single unit over five one-hour timepoints in one horizon
    fn unit_model(
        mut model: Model,
        boundary: BoundaryPolicy,
        capacity: f64,
        configure: impl FnOnce(&mut Project),
    ) -> (Model, Project) {
        model.temporal = temporal_hierarchy(boundary, &[1.0; 5]);
        let mut project = specified_project(&mut model, "gas", capacity);
        project.operational_type = OperationalType::GenCommitCap;
        configure(&mut project);
        (model, project)
    }

    /// Add the unit's capacity and commitment formulation to a new problem
    fn build_unit<'a>(model: &'a Model, project: &Project) -> (BuildContext<'a>, CommitCapacity) {
        let mut ctx = BuildContext::new(model, &model.temporal);
        let lookup = capacity_lookup(&mut ctx, &[project]);
        let mut formulation = CommitCapacity::default();
        formulation
            .add_model_components(&mut ctx, &[project], &lookup)
            .unwrap();
        (ctx, formulation)
    }

    #[rstest]
    fn test_min_up_time(model: Model) {
        let (model, project) = unit_model(model, BoundaryPolicy::Linear, 100.0, |project| {
            project.operating.min_up_time = Some(Hours(3.0));
        });
        let (mut ctx, formulation) = build_unit(&model, &project);

        // Off in the first timepoint and fully on in the second
        let commit = |tp| formulation.get(&project.id, tp).unwrap().commit;
        ctx.problem.add_eq("off", commit(1).into(), 0.0.into());
        ctx.problem.add_eq("on", commit(2).into(), 100.0.into());
        ctx.problem
            .set_objective((1..=5).map(|tp| LinearExpr::from(commit(tp))).sum());
        let solution = ctx.problem.solve().unwrap();

        let committed = (1..=5)
            .map(|tp| solution.value(commit(tp)).round())
            .collect_vec();
        assert_eq!(committed, vec![0.0, 100.0, 100.0, 100.0, 0.0]);
    }

    #[rstest]
    fn test_min_stable_level(model: Model) {
        let (model, project) = unit_model(model, BoundaryPolicy::Linear, 100.0, |project| {
            project.operating.min_stable_level = Some(Dimensionless(0.4));
        });
        let (mut ctx, formulation) = build_unit(&model, &project);

        let vars = *formulation.get(&project.id, 3).unwrap();
        ctx.problem.add_eq("on", vars.commit.into(), 50.0.into());
        ctx.problem.set_objective(vars.power.into());
        let solution = ctx.problem.solve().unwrap();
        assert_approx_eq!(f64, solution.value(vars.power), 20.0, epsilon = 1e-6);

        let result = formulation.dispatch_results(&solution, &project.id, 3);
        assert_approx_eq!(f64, result.committed_mw.unwrap(), 50.0, epsilon = 1e-6);
        assert!(result.charge_mw.is_none());
    }

    #[rstest]
    fn test_min_up_time_wraps_in_circular_horizon(model: Model) {
        let (model, project) = unit_model(model, BoundaryPolicy::Circular, 100.0, |project| {
            project.operating.min_up_time = Some(Hours(3.0));
        });
        let (mut ctx, formulation) = build_unit(&model, &project);

        // Started in the last timepoint, so must stay on into the start of the horizon
        let commit = |tp| formulation.get(&project.id, tp).unwrap().commit;
        ctx.problem.add_eq("off", commit(4).into(), 0.0.into());
        ctx.problem.add_eq("on", commit(5).into(), 100.0.into());
        ctx.problem
            .set_objective((1..=5).map(|tp| LinearExpr::from(commit(tp))).sum());
        let solution = ctx.problem.solve().unwrap();

        let committed = (1..=5)
            .map(|tp| solution.value(commit(tp)).round())
            .collect_vec();
        assert_eq!(committed, vec![100.0, 100.0, 0.0, 0.0, 100.0]);
    }

    #[rstest]
    fn test_min_down_time(model: Model) {
        let (model, project) = unit_model(model, BoundaryPolicy::Linear, 100.0, |project| {
            project.operating.min_down_time = Some(Hours(3.0));
        });
        let (mut ctx, formulation) = build_unit(&model, &project);

        // Shut down in the second timepoint, then keep as much online as possible
        let commit = |tp| formulation.get(&project.id, tp).unwrap().commit;
        ctx.problem.add_eq("on", commit(1).into(), 100.0.into());
        ctx.problem.add_eq("off", commit(2).into(), 0.0.into());
        ctx.problem
            .set_objective(-(1..=5).map(|tp| LinearExpr::from(commit(tp))).sum::<LinearExpr>());
        let solution = ctx.problem.solve().unwrap();

        let committed = (1..=5)
            .map(|tp| solution.value(commit(tp)).round())
            .collect_vec();
        assert_eq!(committed, vec![100.0, 0.0, 0.0, 0.0, 100.0]);
    }

    #[rstest]
    #[case::fully_committed(100.0)]
    #[case::spare_capacity(200.0)]
    fn test_ramp_limits(model: Model, #[case] capacity: f64) {
        let (model, project) = unit_model(model, BoundaryPolicy::Linear, capacity, |project| {
            project.operating.min_stable_level = Some(Dimensionless(0.2));
            project.operating.ramp_up_when_on_rate = Some(Dimensionless(0.1));
            project.operating.startup_plus_ramp_up_rate = Some(Dimensionless(0.2));
        });
        let (mut ctx, formulation) = build_unit(&model, &project);

        // 100 MW committed throughout, starting at minimum output: output can rise by 10 MW/h
        // however startups and shutdowns are chosen
        let get = |tp| *formulation.get(&project.id, tp).unwrap();
        for tp in 1..=5 {
            ctx.problem
                .add_eq(format!("on{tp}"), get(tp).commit.into(), 100.0.into());
        }
        ctx.problem
            .add_eq("start", get(1).power.into(), 20.0.into());
        ctx.problem.set_objective(-LinearExpr::from(get(5).power));
        let solution = ctx.problem.solve().unwrap();
        assert_approx_eq!(f64, solution.value(get(5).power), 60.0, epsilon = 1e-6);
    }

    #[rstest]
    fn test_no_transitions_without_change(model: Model) {
        let (model, project) = unit_model(model, BoundaryPolicy::Linear, 100.0, |_| {});
        let (mut ctx, formulation) = build_unit(&model, &project);

        // Rewarding startups cannot create any while commitment is unchanged
        let get = |tp| *formulation.get(&project.id, tp).unwrap();
        for tp in 1..=5 {
            ctx.problem
                .add_eq(format!("on{tp}"), get(tp).commit.into(), 100.0.into());
        }
        ctx.problem
            .set_objective(-(2..=5).map(|tp| LinearExpr::from(get(tp).startup)).sum::<LinearExpr>());
        let solution = ctx.problem.solve().unwrap();

        for tp in 2..=5 {
            let result = formulation.dispatch_results(&solution, &project.id, tp);
            assert_approx_eq!(f64, result.startup_mw.unwrap(), 0.0, epsilon = 1e-6);
            assert_approx_eq!(f64, result.shutdown_mw.unwrap(), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_min_stable_level_clamped() {
        let mut project = crate::fixture::project("gas", crate::project::CapacityType::GenSpec);
        project.operating.min_stable_level = Some(Dimensionless(1.5));
        let mut report = ValidationReport::new();
        assert_approx_eq!(f64, min_stable_level(&project, &mut report), 1.0);
        assert!(report.contains("gas", "outside [0, 1]"));
    }
}
