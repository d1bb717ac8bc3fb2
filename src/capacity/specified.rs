//! Pre-specified capacity (`gen_spec` and `stor_spec`).
//!
//! A project is operational in exactly those periods for which capacity has been specified.
//! Capacity is a constant, so no variables are added.
use super::{CapacityFormulation, SpecifiedCapacity};
use crate::composition::BuildContext;
use crate::model::Model;
use crate::problem::LinearExpr;
use crate::project::{CapacityType, Project, ProjectID};
use crate::temporal::PeriodID;
use crate::validation::ValidationReport;
use anyhow::Result;
use std::collections::HashMap;

/// Formulation for pre-specified capacity
#[derive(Debug)]
pub struct SpecifiedCapacityFormulation {
    storage: bool,
    capacity: HashMap<(ProjectID, PeriodID), SpecifiedCapacity>,
}

impl SpecifiedCapacityFormulation {
    /// Create a new formulation, for storage projects if `storage` is true
    pub fn new(storage: bool) -> Self {
        Self {
            storage,
            capacity: HashMap::new(),
        }
    }

    fn get(&self, project: &ProjectID, period: PeriodID) -> Option<&SpecifiedCapacity> {
        self.capacity.get(&(project.clone(), period))
    }
}

impl CapacityFormulation for SpecifiedCapacityFormulation {
    fn validate_inputs(&self, model: &Model, projects: &[&Project], report: &mut ValidationReport) {
        for project in projects {
            let specified = model
                .temporal
                .iter_period_ids()
                .filter_map(|period| {
                    model
                        .capacity_data
                        .specified
                        .get(&(project.id.clone(), period))
                        .map(|spec| (period, spec))
                })
                .collect::<Vec<_>>();
            if specified.is_empty() {
                report.warn(&project.id, "No capacity specified for any period");
            }

            if self.storage {
                for (period, spec) in specified {
                    if spec.energy_capacity.is_none() {
                        report.warn(
                            &project.id,
                            format!("No energy capacity specified for period {period}; assuming zero"),
                        );
                    }
                }
            }
        }
    }

    fn add_model_components(&mut self, ctx: &mut BuildContext, projects: &[&Project]) -> Result<()> {
        let (model, temporal) = (ctx.model, ctx.temporal);
        let capacity_type = if self.storage {
            CapacityType::StorSpec
        } else {
            CapacityType::GenSpec
        };

        for project in projects {
            let mut operational_periods = Vec::new();
            for period in temporal.iter_period_ids() {
                let key = (project.id.clone(), period);
                if let Some(spec) = model.capacity_data.specified.get(&key) {
                    self.capacity.insert(key.clone(), spec.clone());
                    operational_periods.push(key);
                }
            }
            ctx.components
                .register_operational_periods(capacity_type, operational_periods);
        }

        Ok(())
    }

    fn capacity(&self, project: &ProjectID, period: PeriodID) -> LinearExpr {
        self.get(project, period)
            .map_or_else(LinearExpr::zero, |spec| spec.capacity.value().into())
    }

    fn provides_energy_capacity(&self) -> bool {
        self.storage
    }

    fn energy_capacity(&self, project: &ProjectID, period: PeriodID) -> Option<LinearExpr> {
        self.storage.then(|| {
            self.get(project, period)
                .and_then(|spec| spec.energy_capacity)
                .map_or_else(LinearExpr::zero, |energy| energy.value().into())
        })
    }

    fn capacity_cost(&self, project: &ProjectID, period: PeriodID) -> LinearExpr {
        self.get(project, period)
            .and_then(|spec| {
                spec.fixed_cost
                    .map(|cost| (cost.value() * spec.capacity.value()).into())
            })
            .unwrap_or_default()
    }
}
