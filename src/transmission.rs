//! Transmission lines between load zones and the formulations used to operate them.
use crate::composition::BuildContext;
use crate::id::{define_id_getter, define_id_type};
use crate::plugin::TypeTag;
use crate::problem::{LinearExpr, Variable};
use crate::temporal::{PeriodID, TimepointID};
use crate::units::{Dimensionless, Power};
use crate::zone::ZoneID;
use anyhow::Result;
use indexmap::IndexMap;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::collections::HashMap;
use std::rc::Rc;

pub mod cycles;
pub mod dcopf;
pub mod simple;

define_id_type! {TransmissionLineID}

/// A map of [`TransmissionLine`]s, keyed by line ID
pub type TransmissionLineMap = IndexMap<TransmissionLineID, Rc<TransmissionLine>>;

/// How power flow on a transmission line is modelled
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
pub enum TxOperationalType {
    /// Flow is limited only by line capacity (transport model)
    #[string = "tx_simple"]
    #[strum(serialize = "tx_simple")]
    TxSimple,
    /// Flows obey Kirchhoff's voltage law (DC optimal power flow)
    #[string = "tx_dcopf"]
    #[strum(serialize = "tx_dcopf")]
    TxDcopf,
}

/// A transmission line connecting two load zones.
///
/// Positive flow goes from `zone_from` to `zone_to`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransmissionLine {
    /// Unique identifier for the line
    pub id: TransmissionLineID,
    /// The zone at the sending end
    pub zone_from: ZoneID,
    /// The zone at the receiving end
    pub zone_to: ZoneID,
    /// How flow on the line is modelled
    pub operational_type: TxOperationalType,
    /// Reactance in ohms (required for DC power flow)
    pub reactance: Option<f64>,
}
define_id_getter! {TransmissionLine, TransmissionLineID}

/// Flow limits for a line in a period
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransmissionCapacity {
    /// Minimum flow (negative values allow flow in the reverse direction)
    pub min: Power,
    /// Maximum flow
    pub max: Power,
}

/// Input data for transmission lines beyond their basic definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransmissionData {
    /// Flow limits for each line in each period it is operational
    pub capacity: HashMap<(TransmissionLineID, PeriodID), TransmissionCapacity>,
    /// Availability derates for lines
    pub availability: HashMap<(TransmissionLineID, TimepointID), Dimensionless>,
}

impl TransmissionData {
    /// The availability derate for a line in a timepoint (1 if not specified)
    pub fn availability_derate(
        &self,
        line: &TransmissionLineID,
        timepoint: TimepointID,
    ) -> Dimensionless {
        self.availability
            .get(&(line.clone(), timepoint))
            .copied()
            .unwrap_or(Dimensionless(1.0))
    }
}

/// The interface implemented by every transmission operational type
pub trait TransmissionFormulation {
    /// Add the variables and constraints for the given lines
    fn add_model_components(
        &mut self,
        ctx: &mut BuildContext,
        lines: &[&TransmissionLine],
    ) -> Result<()>;

    /// The net flow from `zone_from` to `zone_to` on a line in a timepoint
    fn flow(&self, line: &TransmissionLineID, timepoint: TimepointID) -> LinearExpr;

    /// Iterate over the (line, timepoint) pairs for which there are flow variables
    fn iter_flows(&self) -> Box<dyn Iterator<Item = (&TransmissionLineID, TimepointID)> + '_>;

    /// The Kirchhoff voltage law cycles used by the formulation, if any
    fn cycles(&self) -> &[cycles::Cycle] {
        &[]
    }
}

impl TypeTag for TxOperationalType {
    type Plugin = dyn TransmissionFormulation;
    const KIND: &'static str = "transmission operational type";

    fn load_plugin(self) -> Box<dyn TransmissionFormulation> {
        match self {
            Self::TxSimple => Box::<simple::SimpleTransmission>::default(),
            Self::TxDcopf => Box::<dcopf::DcOptimalPowerFlow>::default(),
        }
    }
}

/// Flow variables for a set of transmission lines, shared by the transmission formulations
#[derive(Debug, Default)]
pub struct FlowVariables(IndexMap<(TransmissionLineID, TimepointID), Variable>);

impl FlowVariables {
    /// Add a flow variable for every line in every timepoint of the periods in which the line is
    /// operational, and register the flows with the load balance.
    ///
    /// Flow is bounded by the line's derated minimum and maximum capacity.
    pub fn add(ctx: &mut BuildContext, lines: &[&TransmissionLine]) -> Self {
        let (model, temporal) = (ctx.model, ctx.temporal);
        let mut vars = IndexMap::new();
        for line in lines {
            for period in temporal.iter_period_ids() {
                let Some(capacity) = model
                    .transmission_data
                    .capacity
                    .get(&(line.id.clone(), period))
                else {
                    continue;
                };

                for timepoint in temporal.iter_timepoints_in_period(period) {
                    let derate = model
                        .transmission_data
                        .availability_derate(&line.id, timepoint);
                    let min = (capacity.min * derate).value();
                    let max = (capacity.max * derate).value();
                    let var = ctx
                        .problem
                        .add_variable(format!("flow[{},{timepoint}]", line.id), min..=max);

                    ctx.components
                        .add_load_balance_term(&line.zone_from, timepoint, &(var * -1.0));
                    ctx.components
                        .add_load_balance_term(&line.zone_to, timepoint, &var.into());
                    vars.insert((line.id.clone(), timepoint), var);
                }
            }
        }

        Self(vars)
    }

    /// The flow on a line in a timepoint (zero if the line is not operational)
    pub fn flow(&self, line: &TransmissionLineID, timepoint: TimepointID) -> LinearExpr {
        self.0
            .get(&(line.clone(), timepoint))
            .map_or_else(LinearExpr::zero, |&var| var.into())
    }

    /// Iterate over the (line, timepoint) pairs with flow variables
    pub fn iter_keys(&self) -> impl Iterator<Item = (&TransmissionLineID, TimepointID)> {
        self.0.keys().map(|(line, tp)| (line, *tp))
    }
}
