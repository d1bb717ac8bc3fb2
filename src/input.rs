//! Common routines for handling input data.
use crate::model::{Model, ModelParameters};
use anyhow::{Context, Result, bail, ensure};
use itertools::Itertools;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

mod capacity;
use capacity::read_capacity_data;
mod policy;
use policy::read_policy_data;
mod profiles;
use profiles::{read_availability_derates, read_capacity_factors};
mod project;
use project::read_projects;
mod reliability;
use reliability::read_prm_requirements;
mod reserves;
use reserves::read_reserve_data;
mod temporal;
use temporal::read_temporal_hierarchy;
mod transmission;
use transmission::{read_transmission_data, read_transmission_lines};
mod zone;
use zone::{read_load, read_zones};

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    if vec.is_empty() {
        bail!("CSV file {} cannot be empty", file_path.display());
    }
    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file.
///
/// The file may be missing or empty, in which case no rows are returned.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    if !file_path.exists() {
        return Ok(Vec::new().into_iter());
    }

    let vec = read_csv_internal(file_path)?;
    Ok(vec.into_iter())
}

fn read_csv_internal<'a, T: DeserializeOwned + 'a>(file_path: &'a Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Read an f64, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D>(deserialiser: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Deserialize::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value is not between 0 and 1"))?;
    }

    Ok(value)
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Check that a value is finite and strictly positive
fn check_positive(value: f64, name: &str) -> Result<()> {
    ensure!(
        value.is_finite() && value > 0.0,
        "{name} must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that a value is finite and non-negative
fn check_nonnegative(value: f64, name: &str) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} must be a finite number greater than or equal to zero"
    );

    Ok(())
}

/// Read a model from the specified directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The static model data ([`Model`]) or an error.
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
    let model_dir = model_dir.as_ref();
    let parameters = ModelParameters::from_path(model_dir)?;
    let temporal = read_temporal_hierarchy(model_dir)?;
    let zones = read_zones(model_dir)?;
    let load = read_load(model_dir, &zones, &temporal)?;
    let projects = read_projects(model_dir, &zones)?;
    let capacity_data = read_capacity_data(model_dir, &projects, &temporal)?;
    let availability_derates = read_availability_derates(model_dir, &projects, &temporal)?;
    let capacity_factors = read_capacity_factors(model_dir, &projects, &temporal)?;
    let transmission_lines = read_transmission_lines(model_dir, &zones)?;
    let transmission_data = read_transmission_data(model_dir, &transmission_lines, &temporal)?;
    let reserve_data = read_reserve_data(model_dir, &zones, &projects, &temporal)?;
    let prm_requirements = read_prm_requirements(model_dir, &zones, &temporal)?;
    let policy_data = read_policy_data(model_dir, &projects, &temporal)?;

    Ok(Model {
        model_path: model_dir.to_path_buf(),
        parameters,
        temporal,
        zones,
        load,
        projects,
        capacity_data,
        availability_derates,
        capacity_factors,
        transmission_lines,
        transmission_data,
        reserve_data,
        prm_requirements,
        policy_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Record {
        id: String,
        value: u32,
        #[serde(default)]
        note: Option<String>,
    }

    /// Create an example CSV file in dir_path
    fn create_csv_file(dir_path: &Path, contents: &str) -> PathBuf {
        let file_path = dir_path.join("test.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
        file_path
    }

    #[test]
    fn test_read_csv() {
        let dir = tempdir().unwrap();
        let file_path = create_csv_file(dir.path(), "id,value,note\nhello,1,\n world , 2 ,x");
        let records: Vec<Record> = read_csv(&file_path).unwrap().collect();
        assert_eq!(
            records,
            &[
                Record {
                    id: "hello".to_string(),
                    value: 1,
                    note: None,
                },
                Record {
                    id: "world".to_string(),
                    value: 2,
                    note: Some("x".to_string()),
                }
            ]
        );

        // Optional columns may be omitted altogether
        let file_path = create_csv_file(dir.path(), "id,value\nhello,1");
        let records: Vec<Record> = read_csv(&file_path).unwrap().collect();
        assert_eq!(records[0].note, None);

        // Empty file
        let file_path = create_csv_file(dir.path(), "id,value");
        assert!(read_csv::<Record>(&file_path).is_err());
        assert!(read_csv_optional::<Record>(&file_path).unwrap().next().is_none());
    }

    #[test]
    fn test_read_csv_optional_missing_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("missing.csv");
        assert!(read_csv_optional::<Record>(&file_path).unwrap().next().is_none());
        assert!(read_csv::<Record>(&file_path).is_err());
    }

    #[test]
    fn test_read_toml() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Record {
            value: u32,
        }

        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "value = 1").unwrap();
        }
        assert_eq!(read_toml::<Record>(&file_path).unwrap(), Record { value: 1 });

        // Missing file
        assert!(read_toml::<Record>(&dir.path().join("missing.toml")).is_err());
    }

    #[rstest]
    #[case(1.0, true)]
    #[case(0.0, false)]
    #[case(-1.0, false)]
    #[case(f64::INFINITY, false)]
    #[case(f64::NAN, false)]
    fn test_check_positive(#[case] value: f64, #[case] valid: bool) {
        let result = check_positive(value, "weight");
        if valid {
            assert!(result.is_ok());
        } else {
            assert_error!(result, "weight must be a finite number greater than zero");
        }
    }

    #[test]
    fn test_deserialise_proportion() {
        #[derive(Debug, Deserialize)]
        struct Record {
            #[serde(deserialize_with = "deserialise_proportion")]
            value: f64,
        }

        let dir = tempdir().unwrap();
        let file_path = create_csv_file(dir.path(), "value\n0.5");
        let records: Vec<Record> = read_csv(&file_path).unwrap().collect();
        assert_eq!(records[0].value, 0.5);

        let file_path = create_csv_file(dir.path(), "value\n1.5");
        assert!(read_csv::<Record>(&file_path).is_err());
    }
}
