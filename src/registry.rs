//! The registry of components contributed by formulations while a model is being composed.
//!
//! Formulations for a particular type (e.g. a capacity type) know nothing of one another, but
//! some model components need contributions from all of them: the set of periods in which each
//! project is operational, the reserve variables to be respected by each operational type, the
//! terms in each zone's load balance and the costs in the objective function. Formulations push
//! their contributions into [`DynamicComponents`] and the aggregation steps read them back.
//!
//! A fresh [`DynamicComponents`] is created for every subproblem and stage. It is only mutated
//! while the model is being composed.
use crate::policy::{PolicyType, PolicyZoneID};
use crate::problem::{LinearExpr, Variable};
use crate::project::{CapacityType, ProjectID};
use crate::temporal::{PeriodID, TemporalHierarchy, TimepointID};
use crate::zone::ZoneID;
use indexmap::IndexMap;
use std::collections::HashMap;

/// The components of the objective function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum CostComponent {
    /// Annualised capacity costs
    Capacity,
    /// Variable operation and maintenance costs
    VariableOm,
    /// Unit startup costs
    Startup,
    /// Unit shutdown costs
    Shutdown,
    /// Penalty for unserved energy
    UnservedEnergy,
    /// Penalty for overgeneration
    Overgeneration,
    /// Penalty for unmet reserve requirements
    ReserveShortage,
    /// Penalty for unmet planning reserve margin requirements
    PrmShortfall,
    /// Penalty for violating policy targets
    PolicyViolation,
}

/// The periods in which each project is operational
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationalIndex(IndexMap<ProjectID, Vec<PeriodID>>);

impl OperationalIndex {
    /// The periods in which a project is operational, in ascending order
    pub fn periods(&self, project: &ProjectID) -> &[PeriodID] {
        self.0.get(project).map_or(&[], Vec::as_slice)
    }

    /// Whether a project is operational in the given period
    pub fn is_operational(&self, project: &ProjectID, period: PeriodID) -> bool {
        self.periods(project).contains(&period)
    }

    /// The timepoints in which a project is operational
    pub fn timepoints<'a>(
        &'a self,
        project: &ProjectID,
        temporal: &'a TemporalHierarchy,
    ) -> impl Iterator<Item = TimepointID> + 'a {
        self.periods(project)
            .iter()
            .flat_map(move |&period| temporal.iter_timepoints_in_period(period))
    }

    /// Iterate over every operational (project, period) pair
    pub fn iter(&self) -> impl Iterator<Item = (&ProjectID, PeriodID)> {
        self.0
            .iter()
            .flat_map(|(project, periods)| periods.iter().map(move |&period| (project, period)))
    }
}

/// The components contributed by formulations during model composition
#[derive(Debug, Default)]
pub struct DynamicComponents {
    operational_period_sets: IndexMap<CapacityType, Vec<(ProjectID, PeriodID)>>,
    headroom: HashMap<(ProjectID, TimepointID), Vec<Variable>>,
    footroom: HashMap<(ProjectID, TimepointID), Vec<Variable>>,
    load_balance: IndexMap<(ZoneID, TimepointID), LinearExpr>,
    project_power: IndexMap<(ProjectID, TimepointID), LinearExpr>,
    costs: IndexMap<CostComponent, LinearExpr>,
    prm_contributions: IndexMap<(ZoneID, PeriodID), LinearExpr>,
    policy_contributions: IndexMap<(PolicyType, PolicyZoneID, PeriodID), LinearExpr>,
}

impl DynamicComponents {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the (project, period) pairs in which projects of a capacity type are operational
    pub fn register_operational_periods(
        &mut self,
        capacity_type: CapacityType,
        entries: impl IntoIterator<Item = (ProjectID, PeriodID)>,
    ) {
        self.operational_period_sets
            .entry(capacity_type)
            .or_default()
            .extend(entries);
    }

    /// The union of all registered operational period sets
    pub fn operational_index(&self) -> OperationalIndex {
        let mut index: IndexMap<ProjectID, Vec<PeriodID>> = IndexMap::new();
        for (project, period) in self.operational_period_sets.values().flatten() {
            index.entry(project.clone()).or_default().push(*period);
        }
        for periods in index.values_mut() {
            periods.sort_unstable();
            periods.dedup();
        }

        OperationalIndex(index)
    }

    /// Register an upward reserve variable for a project in a timepoint
    pub fn add_headroom(&mut self, project: &ProjectID, timepoint: TimepointID, provision: Variable) {
        self.headroom
            .entry((project.clone(), timepoint))
            .or_default()
            .push(provision);
    }

    /// Register a downward reserve variable for a project in a timepoint
    pub fn add_footroom(&mut self, project: &ProjectID, timepoint: TimepointID, provision: Variable) {
        self.footroom
            .entry((project.clone(), timepoint))
            .or_default()
            .push(provision);
    }

    /// The total upward reserves provided by a project in a timepoint
    pub fn headroom(&self, project: &ProjectID, timepoint: TimepointID) -> LinearExpr {
        sum_provisions(self.headroom.get(&(project.clone(), timepoint)))
    }

    /// The total downward reserves provided by a project in a timepoint
    pub fn footroom(&self, project: &ProjectID, timepoint: TimepointID) -> LinearExpr {
        sum_provisions(self.footroom.get(&(project.clone(), timepoint)))
    }

    /// Add a term to the load balance of a zone in a timepoint (positive for injections)
    pub fn add_load_balance_term(&mut self, zone: &ZoneID, timepoint: TimepointID, term: &LinearExpr) {
        *self
            .load_balance
            .entry((zone.clone(), timepoint))
            .or_default() += term;
    }

    /// The injections into a zone in a timepoint
    pub fn load_balance_terms(&self, zone: &ZoneID, timepoint: TimepointID) -> LinearExpr {
        self.load_balance
            .get(&(zone.clone(), timepoint))
            .cloned()
            .unwrap_or_default()
    }

    /// Register the power output of a project in a timepoint
    pub fn set_project_power(&mut self, project: &ProjectID, timepoint: TimepointID, power: LinearExpr) {
        self.project_power
            .insert((project.clone(), timepoint), power);
    }

    /// The power output of a project in a timepoint, if registered
    pub fn project_power(&self, project: &ProjectID, timepoint: TimepointID) -> Option<&LinearExpr> {
        self.project_power.get(&(project.clone(), timepoint))
    }

    /// Add to a component of the objective function
    pub fn add_cost(&mut self, component: CostComponent, cost: &LinearExpr) {
        *self.costs.entry(component).or_default() += cost;
    }

    /// Iterate over the registered components of the objective function
    pub fn iter_costs(&self) -> impl Iterator<Item = (CostComponent, &LinearExpr)> {
        self.costs.iter().map(|(component, cost)| (*component, cost))
    }

    /// The total of all registered costs
    pub fn total_cost(&self) -> LinearExpr {
        self.costs.values().cloned().sum()
    }

    /// Add to the capacity counting towards the reserve margin in a zone and period
    pub fn add_prm_contribution(&mut self, zone: &ZoneID, period: PeriodID, contribution: &LinearExpr) {
        *self
            .prm_contributions
            .entry((zone.clone(), period))
            .or_default() += contribution;
    }

    /// The capacity counting towards the reserve margin in a zone and period
    pub fn prm_contribution(&self, zone: &ZoneID, period: PeriodID) -> LinearExpr {
        self.prm_contributions
            .get(&(zone.clone(), period))
            .cloned()
            .unwrap_or_default()
    }

    /// Add to the quantity counted by a policy in a policy zone and period
    pub fn add_policy_contribution(
        &mut self,
        policy: PolicyType,
        zone: &PolicyZoneID,
        period: PeriodID,
        contribution: &LinearExpr,
    ) {
        *self
            .policy_contributions
            .entry((policy, zone.clone(), period))
            .or_default() += contribution;
    }

    /// The quantity counted by a policy in a policy zone and period
    pub fn policy_contribution(
        &self,
        policy: PolicyType,
        zone: &PolicyZoneID,
        period: PeriodID,
    ) -> LinearExpr {
        self.policy_contributions
            .get(&(policy, zone.clone(), period))
            .cloned()
            .unwrap_or_default()
    }
}

fn sum_provisions(provisions: Option<&Vec<Variable>>) -> LinearExpr {
    provisions
        .into_iter()
        .flatten()
        .map(|&provision| LinearExpr::from(provision))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Problem;
    use itertools::{Itertools, assert_equal};

    #[test]
    fn test_operational_index_is_union() {
        let mut components = DynamicComponents::new();
        components.register_operational_periods(
            CapacityType::GenNewLin,
            [("a".into(), 2040), ("a".into(), 2030), ("a".into(), 2040)],
        );
        components.register_operational_periods(CapacityType::GenSpec, [("b".into(), 2030)]);

        let index = components.operational_index();
        assert_eq!(index.periods(&"a".into()), &[2030, 2040]);
        assert_eq!(index.periods(&"b".into()), &[2030]);
        assert!(index.periods(&"c".into()).is_empty());
        assert!(index.is_operational(&"b".into(), 2030));
        assert!(!index.is_operational(&"b".into(), 2040));
        assert_eq!(index.iter().count(), 3);
    }

    #[test]
    fn test_headroom_and_footroom() {
        let mut problem = Problem::new();
        let up1 = problem.add_nonnegative("up1");
        let up2 = problem.add_nonnegative("up2");
        let down = problem.add_nonnegative("down");

        let project: ProjectID = "gas".into();
        let mut components = DynamicComponents::new();
        components.add_headroom(&project, 1, up1);
        components.add_headroom(&project, 1, up2);
        components.add_footroom(&project, 1, down);

        assert_equal(
            components.headroom(&project, 1).iter_terms(),
            [(up1, 1.0), (up2, 1.0)],
        );
        assert_equal(components.footroom(&project, 1).iter_terms(), [(down, 1.0)]);
        assert!(components.headroom(&project, 2).is_constant());
    }

    #[test]
    fn test_costs_accumulate() {
        let mut problem = Problem::new();
        let x = problem.add_nonnegative("x");

        let mut components = DynamicComponents::new();
        components.add_cost(CostComponent::VariableOm, &(x * 2.0));
        components.add_cost(CostComponent::VariableOm, &(x * 3.0));
        components.add_cost(CostComponent::Capacity, &LinearExpr::constant(10.0));

        assert_eq!(
            components.iter_costs().map(|(c, _)| c).collect_vec(),
            vec![CostComponent::VariableOm, CostComponent::Capacity]
        );
        let total = components.total_cost();
        assert_equal(total.iter_terms(), [(x, 5.0)]);
        assert_eq!(total.constant_value(), 10.0);
        assert_eq!(CostComponent::VariableOm.to_string(), "variable_om");
    }
}
