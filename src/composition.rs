//! Composition of the optimisation problem for one subproblem and stage.
//!
//! Formulations are loaded for the type tags in use and then asked, in a fixed order, to add their
//! variables and constraints. Cross-cutting components (reserve requirements, planning reserve
//! margin, policy targets, load balance and the objective) are built last from the contributions
//! the formulations have pushed into the registry.
use crate::capacity::CapacityLookup;
use crate::model::Model;
use crate::plugin::{PluginSet, group_by_tag};
use crate::policy::{PolicyTargets, PolicyType, add_policy_contributions, add_policy_targets};
use crate::problem::{Problem, Solution};
use crate::project::{
    AvailabilityType, CapacityType, OperationalType, PrmType, Project, ProjectID,
};
use crate::registry::{CostComponent, DynamicComponents};
use crate::reliability::{PrmRequirements, add_prm_requirements};
use crate::reserves::{ReserveRequirements, add_reserve_provision, add_reserve_requirements};
use crate::temporal::TemporalHierarchy;
use crate::transmission::cycles::Cycle;
use crate::transmission::{TransmissionLine, TxOperationalType};
use crate::validation::ValidationReport;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, info};

pub mod results;
use results::{LoadBalance, ModelResults};

/// The state shared by formulations while a problem is being composed
pub struct BuildContext<'a> {
    /// The model being built
    pub model: &'a Model,
    /// The part of the temporal hierarchy being built for
    pub temporal: &'a TemporalHierarchy,
    /// The optimisation problem
    pub problem: Problem,
    /// Contributions made by formulations
    pub components: DynamicComponents,
    /// Advisory issues found so far
    pub report: ValidationReport,
}

impl<'a> BuildContext<'a> {
    /// Create a context with an empty problem and registry
    pub fn new(model: &'a Model, temporal: &'a TemporalHierarchy) -> Self {
        Self {
            model,
            temporal,
            problem: Problem::new(),
            components: DynamicComponents::new(),
            report: ValidationReport::new(),
        }
    }
}

/// The formulations for every type tag used in a model
pub struct Formulations {
    capacity: PluginSet<CapacityType>,
    availability: PluginSet<AvailabilityType>,
    operational: PluginSet<OperationalType>,
    transmission: PluginSet<TxOperationalType>,
    prm: PluginSet<PrmType>,
    policy: PluginSet<PolicyType>,
}

impl Formulations {
    /// Load the formulations for the tags used by the model's entities.
    ///
    /// Fails if a formulation needs something that the formulation chosen for another of a
    /// project's roles cannot provide.
    pub fn load(model: &Model) -> Result<Self> {
        let projects = || model.projects.values();
        let formulations = Self {
            capacity: PluginSet::load(projects().map(|p| p.capacity_type)),
            availability: PluginSet::load(projects().map(|p| p.availability_type)),
            operational: PluginSet::load(projects().map(|p| p.operational_type)),
            transmission: PluginSet::load(
                model
                    .transmission_lines
                    .values()
                    .map(|line| line.operational_type),
            ),
            prm: PluginSet::load(projects().filter_map(|p| p.prm_type)),
            policy: PluginSet::load(model.policy_data.policy_types()),
        };
        formulations.check_required_hooks(model)?;

        Ok(formulations)
    }

    /// Check that every project needing energy capacity has a capacity type which defines it
    fn check_required_hooks(&self, model: &Model) -> Result<()> {
        for project in model.projects.values() {
            let provides_energy = self
                .capacity
                .get(project.capacity_type)?
                .provides_energy_capacity();
            ensure!(
                provides_energy
                    || !self
                        .operational
                        .get(project.operational_type)?
                        .requires_energy_capacity(),
                "Operational type {} of project {} requires energy capacity, but capacity type {} \
                does not provide it",
                project.operational_type,
                project.id,
                project.capacity_type
            );

            if let Some(prm_type) = project.prm_type {
                ensure!(
                    provides_energy || !self.prm.get(prm_type)?.requires_energy_capacity(),
                    "PRM type {prm_type} of project {} requires energy capacity, but capacity \
                    type {} does not provide it",
                    project.id,
                    project.capacity_type
                );
            }
        }

        Ok(())
    }

    /// Ask every formulation to check the input data for its entities
    pub fn validate_inputs(&self, model: &Model, report: &mut ValidationReport) -> Result<()> {
        let projects = model.projects.values().map(AsRef::as_ref).collect_vec();
        for (tag, group) in group_by_tag(projects.iter().copied(), |p: &Project| p.capacity_type) {
            self.capacity.get(tag)?.validate_inputs(model, &group, report);
        }
        for (tag, group) in group_by_tag(projects.iter().copied(), |p: &Project| p.operational_type)
        {
            self.operational.get(tag)?.validate_inputs(model, &group, report);
        }
        for (tag, group) in group_by_prm_type(&projects) {
            self.prm.get(tag)?.validate_inputs(model, &group, report);
        }

        Ok(())
    }
}

/// Group the projects which count towards the planning reserve margin by PRM type
fn group_by_prm_type<'a>(projects: &[&'a Project]) -> IndexMap<PrmType, Vec<&'a Project>> {
    let mut groups: IndexMap<PrmType, Vec<&'a Project>> = IndexMap::new();
    for project in projects {
        if let Some(prm_type) = project.prm_type {
            groups.entry(prm_type).or_default().push(*project);
        }
    }

    groups
}

/// A composed problem, ready to be solved
pub struct ComposedModel<'a> {
    model: &'a Model,
    formulations: Formulations,
    capacity: CapacityLookup<'a>,
    problem: Problem,
    components: DynamicComponents,
    report: ValidationReport,
    reserves: ReserveRequirements,
    prm: PrmRequirements,
    policy: PolicyTargets,
    load_balance: Vec<LoadBalance>,
}

impl ComposedModel<'_> {
    /// The optimisation problem
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    /// Advisory issues found while composing the problem
    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    /// The cycles used to impose Kirchhoff's voltage law
    pub fn cycles(&self) -> impl Iterator<Item = &Cycle> {
        self.formulations
            .transmission
            .iter()
            .flat_map(|(_, formulation)| formulation.cycles())
    }

    /// Solve the problem
    pub fn solve(&self) -> Result<Solution> {
        info!(
            "Solving problem with {} variables and {} constraints",
            self.problem.num_variables(),
            self.problem.num_constraints()
        );
        self.problem.solve()
    }
}

/// Compose the problem for a model over the given part of its temporal hierarchy.
///
/// # Arguments
///
/// * `model` - The model
/// * `temporal` - The periods, horizons and timepoints of one subproblem and stage
pub fn compose<'a>(model: &'a Model, temporal: &'a TemporalHierarchy) -> Result<ComposedModel<'a>> {
    let mut formulations = Formulations::load(model)?;
    let mut ctx = BuildContext::new(model, temporal);
    formulations.validate_inputs(model, &mut ctx.report)?;

    let projects = model.projects.values().map(AsRef::as_ref).collect_vec();
    for (tag, group) in group_by_tag(projects.iter().copied(), |p: &Project| p.capacity_type) {
        debug!("Adding capacity components for {} project(s) of type {tag}", group.len());
        formulations
            .capacity
            .get_mut(tag)?
            .add_model_components(&mut ctx, &group)?;
    }
    for (tag, group) in group_by_tag(projects.iter().copied(), |p: &Project| p.availability_type) {
        formulations
            .availability
            .get_mut(tag)?
            .add_model_components(&mut ctx, &group)?;
    }

    let capacity = CapacityLookup::new(
        temporal,
        ctx.components.operational_index(),
        projects.iter().copied(),
        &formulations.capacity,
        &formulations.availability,
    )?;
    let provision = add_reserve_provision(&mut ctx, &formulations.operational, &capacity)?;

    for (tag, group) in group_by_tag(projects.iter().copied(), |p: &Project| p.operational_type) {
        debug!("Adding operational components for {} project(s) of type {tag}", group.len());
        formulations
            .operational
            .get_mut(tag)?
            .add_model_components(&mut ctx, &group, &capacity)?;
    }
    add_project_power(&mut ctx, &projects, &formulations, &capacity)?;
    add_capacity_costs(&mut ctx, &formulations, &capacity)?;

    let lines = model.transmission_lines.values().map(AsRef::as_ref);
    for (tag, group) in group_by_tag(lines, |line: &TransmissionLine| line.operational_type) {
        formulations
            .transmission
            .get_mut(tag)?
            .add_model_components(&mut ctx, &group)?;
    }

    for (tag, group) in group_by_prm_type(&projects) {
        formulations
            .prm
            .get_mut(tag)?
            .add_model_components(&mut ctx, &group, &capacity)?;
    }
    let prm = add_prm_requirements(&mut ctx);

    add_policy_contributions(&mut ctx, &formulations.policy)?;
    let policy = add_policy_targets(&mut ctx, &formulations.policy)?;
    let reserves = add_reserve_requirements(&mut ctx, &provision);
    let load_balance = add_load_balance(&mut ctx)?;

    let objective = ctx.components.total_cost();
    ctx.problem.set_objective(objective);

    let BuildContext {
        problem,
        components,
        report,
        ..
    } = ctx;
    Ok(ComposedModel {
        model,
        formulations,
        capacity,
        problem,
        components,
        report,
        reserves,
        prm,
        policy,
        load_balance,
    })
}

/// Register each project's power output with the load balance and charge variable O&M costs
fn add_project_power(
    ctx: &mut BuildContext,
    projects: &[&Project],
    formulations: &Formulations,
    capacity: &CapacityLookup,
) -> Result<()> {
    let temporal = ctx.temporal;
    for project in projects {
        let formulation = formulations.operational.get(project.operational_type)?;
        for timepoint in capacity.timepoints(&project.id) {
            let power = formulation.power(&project.id, timepoint);
            ctx.components
                .add_load_balance_term(&project.zone, timepoint, &power);

            let cost = project.variable_om_cost.value() * temporal.objective_hours(timepoint).value();
            let basis = formulation.variable_om_basis(&project.id, timepoint);
            ctx.components
                .add_cost(CostComponent::VariableOm, &basis.scaled(cost));
            ctx.components.set_project_power(&project.id, timepoint, power);
        }
    }

    Ok(())
}

/// Charge the annual capacity cost of every project in each period it is operational
fn add_capacity_costs(
    ctx: &mut BuildContext,
    formulations: &Formulations,
    capacity: &CapacityLookup,
) -> Result<()> {
    let (model, temporal) = (ctx.model, ctx.temporal);
    for (project_id, period) in capacity.operational().iter() {
        let project = model
            .projects
            .get(project_id)
            .with_context(|| format!("Unknown project {project_id} in operational periods"))?;
        let cost = formulations
            .capacity
            .get(project.capacity_type)?
            .capacity_cost(project_id, period);
        ctx.components.add_cost(
            CostComponent::Capacity,
            &cost.scaled(temporal.period_weight(period).value()),
        );
    }

    Ok(())
}

/// Add a load balance constraint for every zone and timepoint.
///
/// Injections from projects and transmission plus unserved energy, less overgeneration, must
/// equal load. Unserved energy and overgeneration are penalised.
fn add_load_balance(ctx: &mut BuildContext) -> Result<Vec<LoadBalance>> {
    let (model, temporal) = (ctx.model, ctx.temporal);
    let mut balances = Vec::new();
    for zone in model.zones.values() {
        let unserved_penalty = zone
            .unserved_energy_penalty
            .unwrap_or(model.parameters.unserved_energy_penalty);
        let overgeneration_penalty = zone
            .overgeneration_penalty
            .unwrap_or(model.parameters.overgeneration_penalty);

        for timepoint in temporal.iter_timepoints() {
            let timepoint = timepoint.id;
            let load = model
                .load
                .get(&(zone.id.clone(), timepoint))
                .with_context(|| format!("Missing load for zone {} in timepoint {timepoint}", zone.id))?;
            let injections = ctx.components.load_balance_terms(&zone.id, timepoint);
            let unserved = ctx
                .problem
                .add_nonnegative(format!("unserved_energy[{},{timepoint}]", zone.id));
            let overgeneration = ctx
                .problem
                .add_nonnegative(format!("overgeneration[{},{timepoint}]", zone.id));
            ctx.problem.add_eq(
                format!("load_balance[{},{timepoint}]", zone.id),
                injections.clone() + unserved - overgeneration,
                load.value().into(),
            );

            let hours = temporal.objective_hours(timepoint).value();
            ctx.components.add_cost(
                CostComponent::UnservedEnergy,
                &(unserved * (unserved_penalty.value() * hours)),
            );
            ctx.components.add_cost(
                CostComponent::Overgeneration,
                &(overgeneration * (overgeneration_penalty.value() * hours)),
            );

            balances.push(LoadBalance {
                zone: zone.id.clone(),
                timepoint,
                load: *load,
                injections,
                unserved,
                overgeneration,
            });
        }
    }

    Ok(balances)
}

impl ComposedModel<'_> {
    /// Collect the results of a solved problem
    pub fn results(&self, solution: &Solution) -> Result<ModelResults> {
        results::collect(self, solution)
    }

    fn project(&self, id: &ProjectID) -> Result<&Project> {
        self.model
            .projects
            .get(id)
            .map(AsRef::as_ref)
            .with_context(|| format!("Unknown project {id}"))
    }
}
