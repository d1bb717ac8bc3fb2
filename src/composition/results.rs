//! Results extracted from a solved problem.
use super::ComposedModel;
use crate::capacity::NewBuild;
use crate::operations::DispatchResult;
use crate::policy::PolicyResult;
use crate::problem::{LinearExpr, Solution, Variable};
use crate::project::ProjectID;
use crate::reliability::PrmResult;
use crate::reserves::ReserveResult;
use crate::temporal::{PeriodID, TimepointID};
use crate::transmission::TransmissionLineID;
use crate::units::Power;
use crate::zone::ZoneID;
use anyhow::Result;
use serde::Serialize;

/// The load balance constraint for a zone in a timepoint
pub struct LoadBalance {
    pub(super) zone: ZoneID,
    pub(super) timepoint: TimepointID,
    pub(super) load: Power,
    pub(super) injections: LinearExpr,
    pub(super) unserved: Variable,
    pub(super) overgeneration: Variable,
}

/// The capacity of a project in a period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityResult {
    /// The project
    pub project: ProjectID,
    /// The period
    pub period: PeriodID,
    /// Power capacity
    pub capacity_mw: f64,
    /// Only given for capacity types which define energy capacity
    pub energy_capacity_mwh: Option<f64>,
}

/// Identifies the project and timepoint of a [`DispatchResult`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectTimepoint {
    /// The project
    pub project: ProjectID,
    /// The timepoint
    pub timepoint: TimepointID,
}

/// The flow on a transmission line in a timepoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowResult {
    /// The line
    pub transmission_line: TransmissionLineID,
    /// The timepoint
    pub timepoint: TimepointID,
    /// Positive in the line's declared direction
    pub flow_mw: f64,
}

/// The balance of supply and demand in a zone and timepoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadBalanceResult {
    /// The zone
    pub zone: ZoneID,
    /// The timepoint
    pub timepoint: TimepointID,
    /// Load to be met
    pub load_mw: f64,
    /// Net injections from projects and transmission
    pub injections_mw: f64,
    /// Load not served
    pub unserved_energy_mw: f64,
    /// Surplus injections
    pub overgeneration_mw: f64,
}

/// The value of one component of the objective function
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostResult {
    /// The name of the cost component
    pub component: String,
    /// Its contribution to the objective
    pub cost: f64,
}

/// Everything exported for one subproblem and stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResults {
    /// Capacity of each project in each operational period
    pub capacity: Vec<CapacityResult>,
    /// Capacity built in each vintage
    pub new_builds: Vec<NewBuild>,
    /// Dispatch of each project in each timepoint
    pub dispatch: Vec<(ProjectTimepoint, DispatchResult)>,
    /// Transmission flows
    pub flows: Vec<FlowResult>,
    /// Load balance in each zone and timepoint
    pub load_balance: Vec<LoadBalanceResult>,
    /// Reserve provision against requirements
    pub reserves: Vec<ReserveResult>,
    /// PRM contributions against requirements
    pub prm: Vec<PrmResult>,
    /// Policy totals against targets
    pub policy: Vec<PolicyResult>,
    /// Breakdown of the objective function
    pub costs: Vec<CostResult>,
    /// The objective value
    pub objective: f64,
}

pub(super) fn collect(composed: &ComposedModel, solution: &Solution) -> Result<ModelResults> {
    let formulations = &composed.formulations;

    let mut capacity = Vec::new();
    for (project_id, period) in composed.capacity.operational().iter() {
        let project = composed.project(project_id)?;
        let provides_energy = formulations
            .capacity
            .get(project.capacity_type)?
            .provides_energy_capacity();
        capacity.push(CapacityResult {
            project: project_id.clone(),
            period,
            capacity_mw: solution.evaluate(&composed.capacity.capacity(project_id, period)),
            energy_capacity_mwh: provides_energy.then(|| {
                solution.evaluate(&composed.capacity.energy_capacity(project_id, period))
            }),
        });
    }

    let new_builds = formulations
        .capacity
        .iter()
        .flat_map(|(_, formulation)| formulation.new_builds(solution))
        .collect();

    let mut dispatch = Vec::new();
    for project in composed.model.projects.values() {
        let formulation = formulations.operational.get(project.operational_type)?;
        for timepoint in composed.capacity.timepoints(&project.id) {
            let key = ProjectTimepoint {
                project: project.id.clone(),
                timepoint,
            };
            dispatch.push((key, formulation.dispatch_results(solution, &project.id, timepoint)));
        }
    }

    let flows = formulations
        .transmission
        .iter()
        .flat_map(|(_, formulation)| {
            formulation
                .iter_flows()
                .map(move |(line, timepoint)| FlowResult {
                    transmission_line: line.clone(),
                    timepoint,
                    flow_mw: solution.evaluate(&formulation.flow(line, timepoint)),
                })
        })
        .collect();

    let load_balance = composed
        .load_balance
        .iter()
        .map(|balance| LoadBalanceResult {
            zone: balance.zone.clone(),
            timepoint: balance.timepoint,
            load_mw: balance.load.value(),
            injections_mw: solution.evaluate(&balance.injections),
            unserved_energy_mw: solution.value(balance.unserved),
            overgeneration_mw: solution.value(balance.overgeneration),
        })
        .collect();

    let costs = composed
        .components
        .iter_costs()
        .map(|(component, cost)| CostResult {
            component: component.to_string(),
            cost: solution.evaluate(cost),
        })
        .collect();

    Ok(ModelResults {
        capacity,
        new_builds,
        dispatch,
        flows,
        load_balance,
        reserves: composed.reserves.results(solution),
        prm: composed.prm.results(solution),
        policy: composed.policy.results(solution),
        costs,
        objective: solution.objective_value(),
    })
}
