//! Transport-model transmission: flow is limited only by line capacity.
use super::{FlowVariables, TransmissionFormulation, TransmissionLine, TransmissionLineID};
use crate::composition::BuildContext;
use crate::problem::LinearExpr;
use crate::temporal::TimepointID;
use anyhow::Result;

/// Formulation for lines of type `tx_simple`
#[derive(Debug, Default)]
pub struct SimpleTransmission {
    flows: FlowVariables,
}

impl TransmissionFormulation for SimpleTransmission {
    fn add_model_components(
        &mut self,
        ctx: &mut BuildContext,
        lines: &[&TransmissionLine],
    ) -> Result<()> {
        self.flows = FlowVariables::add(ctx, lines);
        Ok(())
    }

    fn flow(&self, line: &TransmissionLineID, timepoint: TimepointID) -> LinearExpr {
        self.flows.flow(line, timepoint)
    }

    fn iter_flows(&self) -> Box<dyn Iterator<Item = (&TransmissionLineID, TimepointID)> + '_> {
        Box::new(self.flows.iter_keys())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use crate::model::Model;
    use crate::transmission::{TransmissionCapacity, TxOperationalType};
    use crate::units::{Dimensionless, Power};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_flow_limited_by_derated_capacity(mut model: Model) {
        let line = TransmissionLine {
            id: "ab".into(),
            zone_from: "A".into(),
            zone_to: "B".into(),
            operational_type: TxOperationalType::TxSimple,
            reactance: None,
        };
        model.transmission_data.capacity.insert(
            (line.id.clone(), 2020),
            TransmissionCapacity {
                min: Power(-50.0),
                max: Power(100.0),
            },
        );
        model
            .transmission_data
            .availability
            .insert((line.id.clone(), 1), Dimensionless(0.5));

        let mut ctx = BuildContext::new(&model, &model.temporal);
        let mut formulation = SimpleTransmission::default();
        formulation.add_model_components(&mut ctx, &[&line]).unwrap();
        assert_eq!(
            formulation.iter_flows().map(|(_, tp)| tp).collect::<Vec<_>>(),
            [1, 2]
        );

        // Push as much power as possible into B in both timepoints
        let mut objective = ctx.components.load_balance_terms(&"B".into(), 1);
        objective += ctx.components.load_balance_terms(&"B".into(), 2);
        ctx.problem.set_objective(objective.scaled(-1.0));
        let solution = ctx.problem.solve().unwrap();

        let flow = |tp| solution.evaluate(&formulation.flow(&line.id, tp));
        assert_approx_eq!(f64, flow(1), 50.0, epsilon = 1e-6);
        assert_approx_eq!(f64, flow(2), 100.0, epsilon = 1e-6);
        assert_approx_eq!(
            f64,
            solution.evaluate(&ctx.components.load_balance_terms(&"A".into(), 2)),
            -100.0,
            epsilon = 1e-6
        );
    }
}
