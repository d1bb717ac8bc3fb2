//! Policy targets: carbon caps and renewable portfolio standards (RPS).
//!
//! Projects are assigned to policy zones for each policy type. Each policy type determines how a
//! project's output counts towards its zone's total, which is then compared with the target for
//! each period. Violations are allowed but penalised.
use crate::composition::BuildContext;
use crate::id::define_id_type;
use crate::plugin::{PluginSet, TypeTag};
use crate::problem::{LinearExpr, Solution, Variable};
use crate::project::{Project, ProjectID};
use crate::registry::CostComponent;
use crate::temporal::PeriodID;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use serde_string_enum::DeserializeLabeledStringEnum;

define_id_type! {PolicyZoneID}

/// A type of policy
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    DeserializeLabeledStringEnum,
    strum::Display,
    strum::EnumIter,
)]
pub enum PolicyType {
    /// Emissions must not exceed the target (tonnes per year)
    #[string = "carbon_cap"]
    #[strum(serialize = "carbon_cap")]
    CarbonCap,
    /// Qualifying generation must be at least the target (MWh per year)
    #[string = "rps"]
    #[strum(serialize = "rps")]
    Rps,
}

/// Whether a policy target is an upper or lower limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSense {
    /// The total must not exceed the target
    AtMost,
    /// The total must be at least the target
    AtLeast,
}

/// The assignment of a project to a policy zone
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyMembership {
    /// The project
    pub project: ProjectID,
    /// The policy type
    pub policy_type: PolicyType,
    /// The policy zone the project belongs to
    pub policy_zone: PolicyZoneID,
}

/// Input data for policies
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyData {
    /// Which projects belong to which policy zones
    pub memberships: Vec<PolicyMembership>,
    /// Annual target for each policy type, policy zone and period
    pub targets: IndexMap<(PolicyType, PolicyZoneID, PeriodID), f64>,
}

impl PolicyData {
    /// The policy types with targets or members
    pub fn policy_types(&self) -> impl Iterator<Item = PolicyType> + '_ {
        self.memberships
            .iter()
            .map(|membership| membership.policy_type)
            .chain(self.targets.keys().map(|(policy_type, _, _)| *policy_type))
    }
}

/// The interface implemented by every policy type
pub trait PolicyFormulation {
    /// How much one MWh of a project's output counts towards the policy
    fn contribution_per_mwh(&self, project: &Project) -> f64;

    /// Whether the target is an upper or lower limit
    fn target_sense(&self) -> TargetSense;
}

impl TypeTag for PolicyType {
    type Plugin = dyn PolicyFormulation;
    const KIND: &'static str = "policy type";

    fn load_plugin(self) -> Box<dyn PolicyFormulation> {
        match self {
            Self::CarbonCap => Box::new(CarbonCap),
            Self::Rps => Box::new(RenewablePortfolioStandard),
        }
    }
}

/// Emissions are limited to the target
#[derive(Debug, Default)]
pub struct CarbonCap;

impl PolicyFormulation for CarbonCap {
    fn contribution_per_mwh(&self, project: &Project) -> f64 {
        project.carbon_intensity
    }

    fn target_sense(&self) -> TargetSense {
        TargetSense::AtMost
    }
}

/// All output of member projects counts towards the target
#[derive(Debug, Default)]
pub struct RenewablePortfolioStandard;

impl PolicyFormulation for RenewablePortfolioStandard {
    fn contribution_per_mwh(&self, _project: &Project) -> f64 {
        1.0
    }

    fn target_sense(&self) -> TargetSense {
        TargetSense::AtLeast
    }
}

/// Register the annual contribution of each member project to its policy zone's total.
///
/// Must be called after project power has been registered.
pub fn add_policy_contributions(
    ctx: &mut BuildContext,
    policy_types: &PluginSet<PolicyType>,
) -> Result<()> {
    let (model, temporal) = (ctx.model, ctx.temporal);
    for membership in &model.policy_data.memberships {
        let project = model.projects.get(&membership.project).with_context(|| {
            format!("Unknown project {} in policy zones", membership.project)
        })?;
        let per_mwh = policy_types
            .get(membership.policy_type)?
            .contribution_per_mwh(project);

        for timepoint in temporal.iter_timepoints() {
            let Some(power) = ctx.components.project_power(&project.id, timepoint.id) else {
                continue;
            };
            let contribution =
                power.scaled(per_mwh * temporal.annual_hours(timepoint.id).value());
            ctx.components.add_policy_contribution(
                membership.policy_type,
                &membership.policy_zone,
                timepoint.period,
                &contribution,
            );
        }
    }

    Ok(())
}

/// The outcome of a policy target in the solution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyResult {
    /// The policy type
    pub policy_type: String,
    /// The policy zone
    pub policy_zone: PolicyZoneID,
    /// The period
    pub period: PeriodID,
    /// The annual target
    pub target: f64,
    /// The annual total achieved
    pub achieved: f64,
    /// The amount by which the target was missed
    pub violation: f64,
}

struct PolicyBalance {
    policy_type: PolicyType,
    policy_zone: PolicyZoneID,
    period: PeriodID,
    target: f64,
    achieved: LinearExpr,
    violation: Variable,
}

/// Policy target constraints for each policy type, zone and period
#[derive(Default)]
pub struct PolicyTargets(Vec<PolicyBalance>);

impl PolicyTargets {
    /// Results for every target
    pub fn results(&self, solution: &Solution) -> Vec<PolicyResult> {
        self.0
            .iter()
            .map(|balance| PolicyResult {
                policy_type: balance.policy_type.to_string(),
                policy_zone: balance.policy_zone.clone(),
                period: balance.period,
                target: balance.target,
                achieved: solution.evaluate(&balance.achieved),
                violation: solution.value(balance.violation),
            })
            .collect()
    }
}

/// Add a constraint for each policy target in the periods being built
pub fn add_policy_targets(
    ctx: &mut BuildContext,
    policy_types: &PluginSet<PolicyType>,
) -> Result<PolicyTargets> {
    let (model, temporal) = (ctx.model, ctx.temporal);
    let penalty = model.parameters.policy_violation_penalty;
    let mut targets = PolicyTargets::default();
    for ((policy_type, policy_zone, period), target) in &model.policy_data.targets {
        let period = *period;
        if !temporal.contains_period(period) {
            continue;
        }

        let achieved = ctx
            .components
            .policy_contribution(*policy_type, policy_zone, period);
        let violation = ctx
            .problem
            .add_nonnegative(format!("{policy_type}_violation[{policy_zone},{period}]"));
        let name = format!("{policy_type}_target[{policy_zone},{period}]");
        match policy_types.get(*policy_type)?.target_sense() {
            TargetSense::AtMost => {
                ctx.problem
                    .add_le(name, achieved.clone() - violation, (*target).into())
            }
            TargetSense::AtLeast => {
                ctx.problem
                    .add_ge(name, achieved.clone() + violation, (*target).into())
            }
        }

        ctx.components.add_cost(
            CostComponent::PolicyViolation,
            &(violation * (penalty * temporal.period_weight(period).value())).into(),
        );
        targets.0.push(PolicyBalance {
            policy_type: *policy_type,
            policy_zone: policy_zone.clone(),
            period,
            target: *target,
            achieved,
            violation,
        });
    }

    Ok(targets)
}
