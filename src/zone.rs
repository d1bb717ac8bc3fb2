//! Load zones, where supply and demand for electricity must balance.
use crate::id::{define_id_getter, define_id_type};
use crate::temporal::TimepointID;
use crate::units::{MoneyPerEnergy, Power};
use indexmap::IndexMap;
use std::collections::HashMap;

define_id_type! {ZoneID}

/// A map of [`Zone`]s, keyed by zone ID
pub type ZoneMap = IndexMap<ZoneID, Zone>;

/// Load in each zone and timepoint
pub type LoadMap = HashMap<(ZoneID, TimepointID), Power>;

/// A load zone
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    /// Unique identifier for the zone
    pub id: ZoneID,
    /// Penalty for unserved energy, overriding the model-wide value
    pub unserved_energy_penalty: Option<MoneyPerEnergy>,
    /// Penalty for overgeneration, overriding the model-wide value
    pub overgeneration_penalty: Option<MoneyPerEnergy>,
}
define_id_getter! {Zone, ZoneID}
