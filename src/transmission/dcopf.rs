//! DC optimal power flow: flows obey Kirchhoff's voltage law as well as line capacities.
//!
//! For every cycle in the network, the sum of `flow * reactance` around the cycle must be zero.
//! Cycles are recomputed for each period, as the set of operational lines may differ.
use super::cycles::{Cycle, find_cycles};
use super::{FlowVariables, TransmissionFormulation, TransmissionLine, TransmissionLineID};
use crate::composition::BuildContext;
use crate::problem::LinearExpr;
use crate::temporal::TimepointID;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;

/// Formulation for lines of type `tx_dcopf`
#[derive(Debug, Default)]
pub struct DcOptimalPowerFlow {
    flows: FlowVariables,
    cycles: Vec<Cycle>,
}

impl TransmissionFormulation for DcOptimalPowerFlow {
    fn add_model_components(
        &mut self,
        ctx: &mut BuildContext,
        lines: &[&TransmissionLine],
    ) -> Result<()> {
        let (model, temporal) = (ctx.model, ctx.temporal);
        self.flows = FlowVariables::add(ctx, lines);

        for period in temporal.iter_period_ids() {
            let operational = lines
                .iter()
                .filter(|line| {
                    model
                        .transmission_data
                        .capacity
                        .contains_key(&(line.id.clone(), period))
                })
                .copied()
                .collect_vec();
            let line_map: IndexMap<_, _> = operational
                .iter()
                .map(|line| (line.id.clone(), *line))
                .collect();

            let cycles = find_cycles(period, &operational)?;
            debug!(
                "Found {} cycles in transmission network for period {period}",
                cycles.len()
            );
            if cycles.is_empty() && !operational.is_empty() {
                ctx.report.warn(
                    operational.iter().map(|line| &line.id).join(";"),
                    format!(
                        "DC power flow has no effect in period {period} as the lines form no loops"
                    ),
                );
            }

            for cycle in &cycles {
                let terms: Vec<_> = cycle
                    .incidences(&line_map)
                    .map(|result| -> Result<_> {
                        let (line, sign) = result?;
                        let reactance = line.reactance.with_context(|| {
                            format!("No reactance given for transmission line {}", line.id)
                        })?;
                        Ok((&line.id, sign * reactance))
                    })
                    .collect::<Result<_>>()?;

                for timepoint in temporal.iter_timepoints_in_period(period) {
                    let mut kvl = LinearExpr::zero();
                    for (line, coefficient) in &terms {
                        kvl.add_scaled(&self.flows.flow(line, timepoint), *coefficient);
                    }
                    ctx.problem.add_eq(
                        format!("kirchhoff_voltage_law[{period},{},{timepoint}]", cycle.id),
                        kvl,
                        LinearExpr::zero(),
                    );
                }
            }

            self.cycles.extend(cycles);
        }

        Ok(())
    }

    fn flow(&self, line: &TransmissionLineID, timepoint: TimepointID) -> LinearExpr {
        self.flows.flow(line, timepoint)
    }

    fn iter_flows(&self) -> Box<dyn Iterator<Item = (&TransmissionLineID, TimepointID)> + '_> {
        Box::new(self.flows.iter_keys())
    }

    fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, model};
    use crate::model::Model;
    use crate::transmission::{TransmissionCapacity, TxOperationalType};
    use crate::units::Power;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn line(id: &str, from: &str, to: &str, reactance: Option<f64>) -> TransmissionLine {
        TransmissionLine {
            id: id.into(),
            zone_from: from.into(),
            zone_to: to.into(),
            operational_type: TxOperationalType::TxDcopf,
            reactance,
        }
    }

    fn ring() -> Vec<TransmissionLine> {
        vec![
            line("ab", "A", "B", Some(0.1)),
            line("bc", "B", "C", Some(0.2)),
            line("ca", "C", "A", Some(0.3)),
        ]
    }

    /// Make every line operational in 2020 and 2030 only
    fn add_capacity(model: &mut Model, lines: &[TransmissionLine]) {
        for line in lines {
            for period in [2020, 2030] {
                model.transmission_data.capacity.insert(
                    (line.id.clone(), period),
                    TransmissionCapacity {
                        min: Power(-1000.0),
                        max: Power(1000.0),
                    },
                );
            }
        }
    }

    #[rstest]
    fn test_flows_split_by_reactance(mut model: Model) {
        let lines = ring();
        add_capacity(&mut model, &lines);
        let mut ctx = BuildContext::new(&model, &model.temporal);
        let mut formulation = DcOptimalPowerFlow::default();
        formulation
            .add_model_components(&mut ctx, &lines.iter().collect_vec())
            .unwrap();

        // One cycle in each period in which the lines are operational
        assert_eq!(
            formulation.cycles().iter().map(|c| c.period).collect_vec(),
            [2020, 2030]
        );

        // Move 100 MW from A to B in the first timepoint
        for (zone, injection) in [("A", -100.0), ("B", 100.0), ("C", 0.0)] {
            let terms = ctx.components.load_balance_terms(&zone.into(), 1);
            ctx.problem
                .add_eq(format!("balance[{zone}]"), terms, injection.into());
        }
        let solution = ctx.problem.solve().unwrap();

        let flow = |id: &str| solution.evaluate(&formulation.flow(&id.into(), 1));
        let drop = 0.1 * flow("ab") + 0.2 * flow("bc") + 0.3 * flow("ca");
        assert_approx_eq!(f64, drop, 0.0, epsilon = 1e-6);
        assert_approx_eq!(f64, flow("ab"), 100.0 * 0.5 / 0.6, epsilon = 1e-6);

        // Lines are not operational in 2040
        assert!(formulation.flow(&"ab".into(), 5).iter_terms().next().is_none());
    }

    #[rstest]
    fn test_missing_reactance(mut model: Model) {
        let mut lines = ring();
        lines[1].reactance = None;
        add_capacity(&mut model, &lines);
        let mut ctx = BuildContext::new(&model, &model.temporal);
        assert_error!(
            DcOptimalPowerFlow::default().add_model_components(&mut ctx, &lines.iter().collect_vec()),
            "No reactance given for transmission line bc"
        );
    }

    #[rstest]
    fn test_no_loops_is_advisory(mut model: Model) {
        // Lines in series, plus a line closing the loop from 2030 onwards
        let lines = ring();
        add_capacity(&mut model, &lines[..2]);
        model.transmission_data.capacity.insert(
            (lines[2].id.clone(), 2030),
            TransmissionCapacity {
                min: Power(-1000.0),
                max: Power(1000.0),
            },
        );
        let mut ctx = BuildContext::new(&model, &model.temporal);
        DcOptimalPowerFlow::default()
            .add_model_components(&mut ctx, &lines.iter().collect_vec())
            .unwrap();

        assert!(ctx.report.contains("ab;bc", "no effect in period 2020"));
        assert_eq!(ctx.report.len(), 1);
    }
}
