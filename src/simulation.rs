//! Functionality for running a model, one subproblem and stage at a time.
//!
//! Each subproblem and stage is composed and solved independently, with its own registry, in
//! ascending order of subproblem and then stage.
use crate::composition::compose;
use crate::model::Model;
use crate::output::DataWriter;
use crate::validation::ValidationReport;
use anyhow::{Context, Result};
use log::info;
use std::path::Path;

/// Run the model and write the results to `output_path`.
///
/// # Arguments:
///
/// * `model` - The model to run
/// * `output_path` - The folder to which output files will be written
/// * `debug_model` - Whether to write additional information to CSV files
pub fn run(model: &Model, output_path: &Path, debug_model: bool) -> Result<()> {
    let mut writer = DataWriter::create(output_path, debug_model)?;
    for (subproblem, stage) in model.temporal.subproblem_stages() {
        info!("Subproblem {subproblem}, stage {stage}");
        let temporal = model.temporal.for_subproblem_stage(subproblem, stage)?;
        let composed = compose(model, &temporal).with_context(|| {
            format!("Failed to build problem for subproblem {subproblem}, stage {stage}")
        })?;
        writer.write_validation(subproblem, stage, composed.report())?;
        writer.write_debug_info(subproblem, stage, composed.cycles())?;

        let solution = composed.solve().with_context(|| {
            format!("Failed to solve problem for subproblem {subproblem}, stage {stage}")
        })?;
        let results = composed.results(&solution)?;
        info!("Objective value: {}", results.objective);
        writer.write_results(subproblem, stage, &results)?;
    }

    writer.flush()
}

/// Compose the problem for every subproblem and stage without solving it.
///
/// # Returns
///
/// The advisory issues found for each subproblem and stage.
pub fn validate(model: &Model) -> Result<Vec<((u32, u32), ValidationReport)>> {
    model
        .temporal
        .subproblem_stages()
        .into_iter()
        .map(|(subproblem, stage)| {
            let temporal = model.temporal.for_subproblem_stage(subproblem, stage)?;
            let composed = compose(model, &temporal).with_context(|| {
                format!("Failed to build problem for subproblem {subproblem}, stage {stage}")
            })?;
            Ok(((subproblem, stage), composed.report().clone()))
        })
        .collect()
}
