//! The temporal hierarchy: periods, horizons and timepoints.
//!
//! Investment decisions are indexed by period and operational decisions by timepoint. Every
//! timepoint belongs to exactly one horizon, which in turn belongs to exactly one period.
//! Horizons determine how timepoints are linked to one another: in a circular horizon the first
//! timepoint follows on from the last, whereas in a linear horizon the first timepoint has no
//! predecessor.
use crate::units::{Dimensionless, Hours};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::collections::HashMap;

/// The ID of a period (typically a year)
pub type PeriodID = u32;

/// The ID of a horizon
pub type HorizonID = u32;

/// The ID of a timepoint
pub type TimepointID = u32;

/// An investment period
#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    /// Period ID
    pub id: PeriodID,
    /// Discount factor applied to costs incurred in this period
    pub discount_factor: Dimensionless,
    /// The number of years this period represents
    pub years_represented: Dimensionless,
}

/// How the first timepoint of a horizon is linked to the rest of the horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, DeserializeLabeledStringEnum, strum::Display)]
pub enum BoundaryPolicy {
    /// The first timepoint follows on from the last
    #[string = "circular"]
    #[strum(serialize = "circular")]
    Circular,
    /// The first timepoint has no predecessor
    #[string = "linear"]
    #[strum(serialize = "linear")]
    Linear,
}

/// A horizon: a sequence of timepoints within a single period
#[derive(Debug, Clone, PartialEq)]
pub struct Horizon {
    /// Horizon ID
    pub id: HorizonID,
    /// The period the horizon belongs to
    pub period: PeriodID,
    /// How the horizon's boundary is treated
    pub boundary: BoundaryPolicy,
    /// How many times the horizon occurs per year of its period
    pub weight: Dimensionless,
    /// The horizon's timepoints, in ascending order
    pub timepoints: Vec<TimepointID>,
}

/// A timepoint: the smallest unit of operational time
#[derive(Debug, Clone, PartialEq)]
pub struct Timepoint {
    /// Timepoint ID
    pub id: TimepointID,
    /// The horizon the timepoint belongs to
    pub horizon: HorizonID,
    /// The period the timepoint belongs to (that of its horizon)
    pub period: PeriodID,
    /// Duration of the timepoint
    pub duration: Hours,
    /// The subproblem this timepoint is solved in
    pub subproblem: u32,
    /// The stage this timepoint is solved in
    pub stage: u32,
}

/// The set of timepoints to be summed over for a minimum up or down time constraint
#[derive(Debug, Clone, PartialEq)]
pub enum LookbackWindow {
    /// The required number of hours was covered
    Complete(Vec<TimepointID>),
    /// The start of a linear horizon was reached before the required hours were covered
    Truncated(Vec<TimepointID>),
}

impl LookbackWindow {
    /// The timepoints in the window, starting with the timepoint the window was built for
    pub fn timepoints(&self) -> &[TimepointID] {
        match self {
            Self::Complete(tps) | Self::Truncated(tps) => tps,
        }
    }

    /// Whether the window covers the required number of hours
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    /// The timepoints over which a min up/down time constraint should be generated, if any.
    ///
    /// Truncated windows give no constraint, nor do windows containing only the starting
    /// timepoint, as the constraint would then be redundant.
    pub fn constraint_timepoints(&self) -> Option<&[TimepointID]> {
        match self {
            Self::Complete(tps) if tps.len() > 1 => Some(tps),
            _ => None,
        }
    }
}

/// The full temporal structure of a model (or of a single subproblem and stage)
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalHierarchy {
    periods: IndexMap<PeriodID, Period>,
    horizons: IndexMap<HorizonID, Horizon>,
    timepoints: IndexMap<TimepointID, Timepoint>,
    /// Previous timepoint for every timepoint which has one
    previous: HashMap<TimepointID, TimepointID>,
}

impl TemporalHierarchy {
    /// Create a new [`TemporalHierarchy`].
    ///
    /// The timepoints of each horizon are derived from the timepoints' parent horizons and are
    /// ordered by ID. Periods are ordered by ID.
    ///
    /// # Arguments
    ///
    /// * `periods` - The model's periods
    /// * `horizons` - The model's horizons (their `timepoints` fields are ignored)
    /// * `timepoints` - The model's timepoints
    pub fn new(
        periods: impl IntoIterator<Item = Period>,
        horizons: impl IntoIterator<Item = Horizon>,
        timepoints: impl IntoIterator<Item = Timepoint>,
    ) -> Result<Self> {
        let mut periods: IndexMap<_, _> = periods.into_iter().map(|p| (p.id, p)).collect();
        periods.sort_keys();

        let mut horizons: IndexMap<_, _> = horizons
            .into_iter()
            .map(|mut h| {
                h.timepoints.clear();
                (h.id, h)
            })
            .collect();
        for horizon in horizons.values() {
            ensure!(
                periods.contains_key(&horizon.period),
                "Horizon {} refers to unknown period {}",
                horizon.id,
                horizon.period
            );
        }

        let mut timepoints: IndexMap<_, _> = timepoints.into_iter().map(|t| (t.id, t)).collect();
        timepoints.sort_keys();
        for timepoint in timepoints.values_mut() {
            let horizon = horizons.get_mut(&timepoint.horizon).with_context(|| {
                format!(
                    "Timepoint {} refers to unknown horizon {}",
                    timepoint.id, timepoint.horizon
                )
            })?;
            timepoint.period = horizon.period;
            horizon.timepoints.push(timepoint.id);
        }

        for horizon in horizons.values() {
            ensure!(
                !horizon.timepoints.is_empty(),
                "Horizon {} has no timepoints",
                horizon.id
            );

            let (first, rest) = (horizon.timepoints[0], &horizon.timepoints[1..]);
            let key = |id: TimepointID| {
                let tp: &Timepoint = &timepoints[&id];
                (tp.subproblem, tp.stage)
            };
            ensure!(
                rest.iter().all(|&id| key(id) == key(first)),
                "All timepoints in horizon {} must belong to the same subproblem and stage",
                horizon.id
            );
        }

        let previous = derive_previous_timepoints(horizons.values());

        Ok(Self {
            periods,
            horizons,
            timepoints,
            previous,
        })
    }

    /// Iterate over periods in ascending order
    pub fn iter_periods(&self) -> impl Iterator<Item = &Period> {
        self.periods.values()
    }

    /// Iterate over period IDs in ascending order
    pub fn iter_period_ids(&self) -> impl Iterator<Item = PeriodID> + '_ {
        self.periods.keys().copied()
    }

    /// Whether the hierarchy contains the given period
    pub fn contains_period(&self, period: PeriodID) -> bool {
        self.periods.contains_key(&period)
    }

    /// Get a period by ID
    pub fn period(&self, period: PeriodID) -> Option<&Period> {
        self.periods.get(&period)
    }

    /// Iterate over horizons
    pub fn iter_horizons(&self) -> impl Iterator<Item = &Horizon> {
        self.horizons.values()
    }

    /// Iterate over all timepoints in ascending order
    pub fn iter_timepoints(&self) -> impl Iterator<Item = &Timepoint> {
        self.timepoints.values()
    }

    /// Iterate over the IDs of the timepoints in the given period
    pub fn iter_timepoints_in_period(
        &self,
        period: PeriodID,
    ) -> impl Iterator<Item = TimepointID> + '_ {
        self.timepoints
            .values()
            .filter(move |tp| tp.period == period)
            .map(|tp| tp.id)
    }

    /// Whether the hierarchy contains the given timepoint
    pub fn contains_timepoint(&self, timepoint: TimepointID) -> bool {
        self.timepoints.contains_key(&timepoint)
    }

    /// Get a timepoint by ID
    pub fn timepoint(&self, timepoint: TimepointID) -> Option<&Timepoint> {
        self.timepoints.get(&timepoint)
    }

    fn get_timepoint(&self, timepoint: TimepointID) -> &Timepoint {
        self.timepoints
            .get(&timepoint)
            .unwrap_or_else(|| panic!("Timepoint {timepoint} is not part of this hierarchy"))
    }

    /// The duration of a timepoint.
    ///
    /// # Panics
    ///
    /// If the timepoint is not part of the hierarchy.
    pub fn duration(&self, timepoint: TimepointID) -> Hours {
        self.get_timepoint(timepoint).duration
    }

    /// The period a timepoint belongs to.
    ///
    /// # Panics
    ///
    /// If the timepoint is not part of the hierarchy.
    pub fn period_of(&self, timepoint: TimepointID) -> PeriodID {
        self.get_timepoint(timepoint).period
    }

    /// The horizon a timepoint belongs to.
    ///
    /// # Panics
    ///
    /// If the timepoint is not part of the hierarchy.
    pub fn horizon_of(&self, timepoint: TimepointID) -> &Horizon {
        &self.horizons[&self.get_timepoint(timepoint).horizon]
    }

    /// The timepoint preceding `timepoint` in its horizon.
    ///
    /// Wraps round to the last timepoint in circular horizons and is `None` for the first
    /// timepoint of a linear horizon.
    pub fn previous(&self, timepoint: TimepointID) -> Option<TimepointID> {
        self.previous.get(&timepoint).copied()
    }

    /// The timepoints which must be considered for a minimum up or down time of `min_hours`.
    ///
    /// The window always contains `timepoint` itself. Moving backwards through the horizon, a
    /// previous timepoint is included if the total duration of the timepoints between it and
    /// `timepoint` (including itself but excluding `timepoint`) is less than `min_hours`. In a
    /// circular horizon, the walk stops once it arrives back at `timepoint`.
    ///
    /// If the start of a linear horizon is reached before `min_hours` is covered, the window is
    /// [`LookbackWindow::Truncated`], unless `timepoint` is itself the first timepoint of the
    /// horizon and alone lasts at least `min_hours`.
    pub fn lookback_window(&self, timepoint: TimepointID, min_hours: Hours) -> LookbackWindow {
        let mut window = vec![timepoint];
        let mut hours_before = Hours(0.0);
        let mut current = timepoint;

        loop {
            let Some(prev) = self.previous(current) else {
                // Reached the start of a linear horizon
                if window.len() == 1 && self.duration(timepoint) >= min_hours {
                    return LookbackWindow::Complete(window);
                }
                return LookbackWindow::Truncated(window);
            };

            if prev == timepoint {
                // Wrapped round the whole of a circular horizon
                return LookbackWindow::Complete(window);
            }

            hours_before += self.duration(prev);
            if hours_before >= min_hours {
                return LookbackWindow::Complete(window);
            }

            window.push(prev);
            current = prev;
        }
    }

    /// The weight applied to a period's annual costs in the objective function
    pub fn period_weight(&self, period: PeriodID) -> Dimensionless {
        let period = &self.periods[&period];
        period.discount_factor * period.years_represented
    }

    /// The number of hours per year that a timepoint represents.
    ///
    /// Multiplying a power by this gives the annual energy represented by the timepoint.
    pub fn annual_hours(&self, timepoint: TimepointID) -> Hours {
        let tp = self.get_timepoint(timepoint);
        tp.duration * self.horizons[&tp.horizon].weight
    }

    /// The objective-function weight for per-MWh costs incurred in a timepoint
    pub fn objective_hours(&self, timepoint: TimepointID) -> Hours {
        self.annual_hours(timepoint) * self.period_weight(self.period_of(timepoint))
    }

    /// The objective-function weight for costs incurred once per event (e.g. startups) in a
    /// timepoint
    pub fn objective_event_weight(&self, timepoint: TimepointID) -> Dimensionless {
        let tp = self.get_timepoint(timepoint);
        self.horizons[&tp.horizon].weight * self.period_weight(tp.period)
    }

    /// The distinct (subproblem, stage) pairs in the hierarchy, in ascending order
    pub fn subproblem_stages(&self) -> Vec<(u32, u32)> {
        self.timepoints
            .values()
            .map(|tp| (tp.subproblem, tp.stage))
            .unique()
            .sorted()
            .collect()
    }

    /// The part of the hierarchy belonging to a single subproblem and stage.
    ///
    /// Only the horizons and periods with timepoints in the subproblem and stage are kept.
    pub fn for_subproblem_stage(&self, subproblem: u32, stage: u32) -> Result<Self> {
        let timepoints = self
            .timepoints
            .values()
            .filter(|tp| tp.subproblem == subproblem && tp.stage == stage)
            .cloned()
            .collect_vec();
        ensure!(
            !timepoints.is_empty(),
            "No timepoints found for subproblem {subproblem}, stage {stage}"
        );

        let horizons = timepoints
            .iter()
            .map(|tp| tp.horizon)
            .unique()
            .map(|id| self.horizons[&id].clone())
            .collect_vec();
        let periods = horizons
            .iter()
            .map(|h| h.period)
            .unique()
            .map(|id| self.periods[&id].clone())
            .collect_vec();

        Self::new(periods, horizons, timepoints)
    }
}

/// Work out the previous timepoint for every timepoint in the given horizons
fn derive_previous_timepoints<'a>(
    horizons: impl Iterator<Item = &'a Horizon>,
) -> HashMap<TimepointID, TimepointID> {
    let mut previous = HashMap::new();
    for horizon in horizons {
        for (&prev, &tp) in horizon.timepoints.iter().tuple_windows() {
            previous.insert(tp, prev);
        }

        if horizon.boundary == BoundaryPolicy::Circular {
            let first = horizon.timepoints[0];
            let last = *horizon.timepoints.last().unwrap_or(&first);
            previous.insert(first, last);
        }
    }

    previous
}
