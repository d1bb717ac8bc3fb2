//! Projects: the generators and storage facilities in a model.
use crate::id::{define_id_getter, define_id_type};
use crate::units::{Dimensionless, Hours, MoneyPerEnergy, MoneyPerPower};
use crate::zone::ZoneID;
use indexmap::IndexMap;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::rc::Rc;

define_id_type! {ProjectID}

/// A map of [`Project`]s, keyed by project ID
pub type ProjectMap = IndexMap<ProjectID, Rc<Project>>;

/// How a project's capacity is determined
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
pub enum CapacityType {
    /// New generation capacity built in continuous amounts
    #[string = "gen_new_lin"]
    #[strum(serialize = "gen_new_lin")]
    GenNewLin,
    /// New generation capacity built in blocks of a fixed size
    #[string = "gen_new_bin"]
    #[strum(serialize = "gen_new_bin")]
    GenNewBin,
    /// Pre-specified generation capacity
    #[string = "gen_spec"]
    #[strum(serialize = "gen_spec")]
    GenSpec,
    /// New storage power and energy capacity built in continuous amounts
    #[string = "stor_new_lin"]
    #[strum(serialize = "stor_new_lin")]
    StorNewLin,
    /// Pre-specified storage power and energy capacity
    #[string = "stor_spec"]
    #[strum(serialize = "stor_spec")]
    StorSpec,
}

/// How a project is operated
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
pub enum OperationalType {
    /// Dispatchable generation with linearised unit commitment
    #[string = "gen_commit_cap"]
    #[strum(serialize = "gen_commit_cap")]
    GenCommitCap,
    /// Dispatchable generation between zero and available capacity
    #[string = "gen_simple"]
    #[strum(serialize = "gen_simple")]
    GenSimple,
    /// Generation always at available capacity
    #[string = "gen_must_run"]
    #[strum(serialize = "gen_must_run")]
    GenMustRun,
    /// Variable generation limited by an exogenous capacity factor
    #[string = "gen_var"]
    #[strum(serialize = "gen_var")]
    GenVar,
    /// Energy storage
    #[string = "stor"]
    #[strum(serialize = "stor")]
    Stor,
}

/// How a project's availability is determined
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    DeserializeLabeledStringEnum,
    strum::Display,
    strum::EnumIter,
)]
pub enum AvailabilityType {
    /// Availability derates are given as input data
    #[default]
    #[string = "exogenous"]
    #[strum(serialize = "exogenous")]
    Exogenous,
}

/// How a project contributes to the planning reserve margin
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
pub enum PrmType {
    /// A fixed fraction of capacity counts towards the requirement
    #[string = "fully_deliverable"]
    #[strum(serialize = "fully_deliverable")]
    FullyDeliverable,
    /// As [`PrmType::FullyDeliverable`], but further limited by energy capacity
    #[string = "energy_limited"]
    #[strum(serialize = "energy_limited")]
    EnergyLimited,
}

/// Optional operating characteristics of a project.
///
/// Which of these are used depends on the project's operational type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatingCharacteristics {
    /// Minimum stable level as a fraction of committed capacity
    pub min_stable_level: Option<Dimensionless>,
    /// Fraction of started-up capacity that can ramp up per hour
    pub startup_plus_ramp_up_rate: Option<Dimensionless>,
    /// Fraction of shut-down capacity that can ramp down per hour
    pub shutdown_plus_ramp_down_rate: Option<Dimensionless>,
    /// Fraction of committed capacity that can ramp up per hour
    pub ramp_up_when_on_rate: Option<Dimensionless>,
    /// Fraction of committed capacity that can ramp down per hour
    pub ramp_down_when_on_rate: Option<Dimensionless>,
    /// Minimum time capacity must stay on after starting up
    pub min_up_time: Option<Hours>,
    /// Minimum time capacity must stay off after shutting down
    pub min_down_time: Option<Hours>,
    /// Cost per MW of capacity started up
    pub startup_cost: Option<MoneyPerPower>,
    /// Cost per MW of capacity shut down
    pub shutdown_cost: Option<MoneyPerPower>,
    /// Storage charging efficiency
    pub charging_efficiency: Option<Dimensionless>,
    /// Storage discharging efficiency
    pub discharging_efficiency: Option<Dimensionless>,
}

impl OperatingCharacteristics {
    /// The names of the characteristics which have been given a value
    pub fn specified_attributes(&self) -> Vec<&'static str> {
        [
            ("min_stable_level_fraction", self.min_stable_level.is_some()),
            (
                "startup_plus_ramp_up_rate",
                self.startup_plus_ramp_up_rate.is_some(),
            ),
            (
                "shutdown_plus_ramp_down_rate",
                self.shutdown_plus_ramp_down_rate.is_some(),
            ),
            ("ramp_up_when_on_rate", self.ramp_up_when_on_rate.is_some()),
            (
                "ramp_down_when_on_rate",
                self.ramp_down_when_on_rate.is_some(),
            ),
            ("min_up_time_hours", self.min_up_time.is_some()),
            ("min_down_time_hours", self.min_down_time.is_some()),
            ("startup_cost_per_mw", self.startup_cost.is_some()),
            ("shutdown_cost_per_mw", self.shutdown_cost.is_some()),
            ("charging_efficiency", self.charging_efficiency.is_some()),
            ("discharging_efficiency", self.discharging_efficiency.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, specified)| specified.then_some(name))
        .collect()
    }
}

/// A generation or storage project
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    /// Unique identifier for the project
    pub id: ProjectID,
    /// The load zone the project is located in
    pub zone: ZoneID,
    /// How the project's capacity is determined
    pub capacity_type: CapacityType,
    /// How the project is operated
    pub operational_type: OperationalType,
    /// How the project's availability is determined
    pub availability_type: AvailabilityType,
    /// How the project contributes to the planning reserve margin, if at all
    pub prm_type: Option<PrmType>,
    /// Variable operation and maintenance cost
    pub variable_om_cost: MoneyPerEnergy,
    /// Carbon emissions in tonnes per MWh generated
    pub carbon_intensity: f64,
    /// Effective load-carrying capability as a fraction of capacity
    pub elcc_fraction: Option<Dimensionless>,
    /// Storage duration needed for full capacity to count towards the reserve margin
    pub min_duration_for_full_capacity: Option<Hours>,
    /// Operating characteristics
    pub operating: OperatingCharacteristics,
}
define_id_getter! {Project, ProjectID}
