//! The module responsible for writing output data to disk.
use crate::composition::results::ModelResults;
use crate::temporal::PeriodID;
use crate::transmission::TransmissionLineID;
use crate::transmission::cycles::Cycle;
use crate::validation::ValidationReport;
use crate::zone::ZoneID;
use anyhow::{Context, Result, ensure};
use serde::Serialize;
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "gridplan_results";

/// The output file name for project capacities
const CAPACITY_FILE_NAME: &str = "capacity.csv";

/// The output file name for new builds
const NEW_BUILDS_FILE_NAME: &str = "new_builds.csv";

/// The output file name for project dispatch
const DISPATCH_FILE_NAME: &str = "dispatch.csv";

/// The output file name for transmission flows
const FLOWS_FILE_NAME: &str = "transmission_flows.csv";

/// The output file name for the load balance
const LOAD_BALANCE_FILE_NAME: &str = "load_balance.csv";

/// The output file name for reserve requirements
const RESERVES_FILE_NAME: &str = "reserves.csv";

/// The output file name for planning reserve margin requirements
const PRM_FILE_NAME: &str = "prm.csv";

/// The output file name for policy targets
const POLICY_FILE_NAME: &str = "policy.csv";

/// The output file name for cost components
const COSTS_FILE_NAME: &str = "costs.csv";

/// The output file name for advisory validation issues
const VALIDATION_FILE_NAME: &str = "validation.csv";

/// The output file name for DC power flow cycles
const CYCLES_FILE_NAME: &str = "debug_cycles.csv";

/// Get the model name from the specified directory path
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model, optionally overwriting existing data.
///
/// # Returns
///
/// True if an existing non-empty folder was overwritten.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let mut overwrite = false;
    if output_dir.is_dir() {
        if fs::read_dir(output_dir)?.next().is_none() {
            // Already exists and is empty
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Please delete the folder or pass the \
            --overwrite command-line option."
        );
        fs::remove_dir_all(output_dir)?;
        overwrite = true;
    }

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// The subproblem and stage a row belongs to. Written at the start of every row.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
struct StageRow {
    subproblem: u32,
    stage: u32,
}

/// Represents a row in the debug cycles CSV file
#[derive(Serialize, Debug, PartialEq)]
struct CycleRow {
    period: PeriodID,
    cycle: usize,
    hop: usize,
    transmission_line: TransmissionLineID,
    zone_from: ZoneID,
    zone_to: ZoneID,
}

/// For writing extra debug information about the model
struct DebugDataWriter {
    cycles_writer: csv::Writer<File>,
}

impl DebugDataWriter {
    /// Open CSV files to write debug info to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    fn create(output_path: &Path) -> Result<Self> {
        Ok(Self {
            cycles_writer: csv::Writer::from_path(output_path.join(CYCLES_FILE_NAME))?,
        })
    }

    /// Write the hops of every cycle to file
    fn write_cycles<'a, I>(&mut self, stage: StageRow, cycles: I) -> Result<()>
    where
        I: Iterator<Item = &'a Cycle>,
    {
        for cycle in cycles {
            for (hop_index, hop) in cycle.hops.iter().enumerate() {
                let row = CycleRow {
                    period: cycle.period,
                    cycle: cycle.id,
                    hop: hop_index,
                    transmission_line: hop.line.clone(),
                    zone_from: hop.from.clone(),
                    zone_to: hop.to.clone(),
                };
                self.cycles_writer.serialize((stage, row))?;
            }
        }

        Ok(())
    }

    /// Flush the underlying streams
    fn flush(&mut self) -> Result<()> {
        self.cycles_writer.flush()?;

        Ok(())
    }
}

/// An object for writing results to CSV files
pub struct DataWriter {
    capacity_writer: csv::Writer<File>,
    new_builds_writer: csv::Writer<File>,
    dispatch_writer: csv::Writer<File>,
    flows_writer: csv::Writer<File>,
    load_balance_writer: csv::Writer<File>,
    reserves_writer: csv::Writer<File>,
    prm_writer: csv::Writer<File>,
    policy_writer: csv::Writer<File>,
    costs_writer: csv::Writer<File>,
    validation_writer: csv::Writer<File>,
    debug_writer: Option<DebugDataWriter>,
}

/// Write every item to a CSV file, preceded by the subproblem and stage
fn write_rows<'a, T, I>(writer: &mut csv::Writer<File>, stage: StageRow, rows: I) -> Result<()>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    for row in rows {
        writer.serialize((stage, row))?;
    }

    Ok(())
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(output_path: &Path, save_debug_info: bool) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        let debug_writer = if save_debug_info {
            // Create debug CSV files
            Some(DebugDataWriter::create(output_path)?)
        } else {
            None
        };

        Ok(Self {
            capacity_writer: new_writer(CAPACITY_FILE_NAME)?,
            new_builds_writer: new_writer(NEW_BUILDS_FILE_NAME)?,
            dispatch_writer: new_writer(DISPATCH_FILE_NAME)?,
            flows_writer: new_writer(FLOWS_FILE_NAME)?,
            load_balance_writer: new_writer(LOAD_BALANCE_FILE_NAME)?,
            reserves_writer: new_writer(RESERVES_FILE_NAME)?,
            prm_writer: new_writer(PRM_FILE_NAME)?,
            policy_writer: new_writer(POLICY_FILE_NAME)?,
            costs_writer: new_writer(COSTS_FILE_NAME)?,
            validation_writer: new_writer(VALIDATION_FILE_NAME)?,
            debug_writer,
        })
    }

    /// Write the results for a subproblem and stage
    pub fn write_results(&mut self, subproblem: u32, stage: u32, results: &ModelResults) -> Result<()> {
        let stage = StageRow { subproblem, stage };
        write_rows(&mut self.capacity_writer, stage, &results.capacity)?;
        write_rows(&mut self.new_builds_writer, stage, &results.new_builds)?;
        for (key, dispatch) in &results.dispatch {
            self.dispatch_writer.serialize((stage, key, dispatch))?;
        }
        write_rows(&mut self.flows_writer, stage, &results.flows)?;
        write_rows(&mut self.load_balance_writer, stage, &results.load_balance)?;
        write_rows(&mut self.reserves_writer, stage, &results.reserves)?;
        write_rows(&mut self.prm_writer, stage, &results.prm)?;
        write_rows(&mut self.policy_writer, stage, &results.policy)?;
        write_rows(&mut self.costs_writer, stage, &results.costs)?;

        Ok(())
    }

    /// Write the advisory issues found while building a subproblem and stage
    pub fn write_validation(
        &mut self,
        subproblem: u32,
        stage: u32,
        report: &ValidationReport,
    ) -> Result<()> {
        write_rows(
            &mut self.validation_writer,
            StageRow { subproblem, stage },
            report.iter(),
        )
    }

    /// Write debug information to CSV files
    pub fn write_debug_info<'a, I>(&mut self, subproblem: u32, stage: u32, cycles: I) -> Result<()>
    where
        I: Iterator<Item = &'a Cycle>,
    {
        if let Some(wtr) = &mut self.debug_writer {
            wtr.write_cycles(StageRow { subproblem, stage }, cycles)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        for writer in [
            &mut self.capacity_writer,
            &mut self.new_builds_writer,
            &mut self.dispatch_writer,
            &mut self.flows_writer,
            &mut self.load_balance_writer,
            &mut self.reserves_writer,
            &mut self.prm_writer,
            &mut self.policy_writer,
            &mut self.costs_writer,
            &mut self.validation_writer,
        ] {
            writer.flush()?;
        }
        if let Some(wtr) = &mut self.debug_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::results::{CostResult, LoadBalanceResult, ProjectTimepoint};
    use crate::operations::DispatchResult;
    use crate::transmission::cycles::CycleHop;
    use itertools::Itertools;
    use tempfile::tempdir;

    /// Read a CSV file as a header row followed by data rows
    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|record| record.unwrap().iter().map(ToString::to_string).collect())
            .collect()
    }

    #[test]
    fn test_write_results() {
        let results = ModelResults {
            load_balance: vec![LoadBalanceResult {
                zone: "north".into(),
                timepoint: 3,
                load_mw: 50.0,
                injections_mw: 45.0,
                unserved_energy_mw: 5.0,
                overgeneration_mw: 0.0,
            }],
            dispatch: vec![(
                ProjectTimepoint {
                    project: "battery".into(),
                    timepoint: 3,
                },
                DispatchResult {
                    power_mw: -10.0,
                    charge_mw: Some(10.0),
                    ..DispatchResult::default()
                },
            )],
            costs: vec![CostResult {
                component: "variable_om".into(),
                cost: 12.5,
            }],
            ..ModelResults::default()
        };

        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path(), false).unwrap();
            writer.write_results(1, 2, &results).unwrap();
            writer.flush().unwrap();
        }

        let rows = read_rows(&dir.path().join(LOAD_BALANCE_FILE_NAME));
        assert_eq!(
            rows[0],
            [
                "subproblem",
                "stage",
                "zone",
                "timepoint",
                "load_mw",
                "injections_mw",
                "unserved_energy_mw",
                "overgeneration_mw"
            ]
        );
        assert_eq!(rows[1], ["1", "2", "north", "3", "50.0", "45.0", "5.0", "0.0"]);

        let rows = read_rows(&dir.path().join(DISPATCH_FILE_NAME));
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][..5], ["subproblem", "stage", "project", "timepoint", "power_mw"]);
        assert_eq!(&rows[1][..5], ["1", "2", "battery", "3", "-10.0"]);
        assert_eq!(rows[1].iter().filter(|field| field.is_empty()).count(), 6);

        // Files with no results only contain a header, if anything
        assert!(read_rows(&dir.path().join(FLOWS_FILE_NAME)).len() <= 1);
        assert!(!dir.path().join(CYCLES_FILE_NAME).exists());
    }

    #[test]
    fn test_write_validation() {
        let mut report = ValidationReport::new();
        report.warn("gas", "min_up_time_hours is not used by operational type gen_simple");

        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path(), false).unwrap();
            writer.write_validation(1, 1, &report).unwrap();
            writer.flush().unwrap();
        }

        let rows = read_rows(&dir.path().join(VALIDATION_FILE_NAME));
        assert_eq!(rows[0], ["subproblem", "stage", "entity", "message"]);
        assert_eq!(
            rows[1],
            [
                "1",
                "1",
                "gas",
                "min_up_time_hours is not used by operational type gen_simple"
            ]
        );
    }

    #[test]
    fn test_write_debug_cycles() {
        let hop = |line: &str, from: &str, to: &str| CycleHop {
            line: line.into(),
            from: from.into(),
            to: to.into(),
        };
        let cycle = Cycle {
            period: 2030,
            id: 0,
            hops: vec![hop("ab", "a", "b"), hop("ba", "b", "a")],
        };

        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path(), true).unwrap();
            writer
                .write_debug_info(1, 1, std::iter::once(&cycle))
                .unwrap();
            writer.flush().unwrap();
        }

        let rows = read_rows(&dir.path().join(CYCLES_FILE_NAME));
        assert_eq!(
            rows.iter().skip(1).map(|row| row[5].as_str()).collect_vec(),
            ["ab", "ba"]
        );
    }

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results");

        // New directory
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());

        // Existing empty directory
        assert!(!create_output_directory(&output_dir, false).unwrap());

        // Existing non-empty directory
        fs::write(output_dir.join("capacity.csv"), "").unwrap();
        assert!(create_output_directory(&output_dir, false).is_err());
        assert!(create_output_directory(&output_dir, true).unwrap());
        assert!(fs::read_dir(&output_dir).unwrap().next().is_none());
    }
}
