//! The model: all input data needed to build optimisation problems.
use crate::capacity::CapacityData;
use crate::input::load_model;
use crate::policy::PolicyData;
use crate::project::{ProjectID, ProjectMap};
use crate::reserves::ReserveData;
use crate::temporal::{PeriodID, TemporalHierarchy, TimepointID};
use crate::transmission::{TransmissionData, TransmissionLineMap};
use crate::units::{Dimensionless, Power};
use crate::zone::{LoadMap, ZoneID, ZoneMap};
use anyhow::Result;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub mod parameters;
pub use parameters::ModelParameters;

/// Model definition
#[derive(Debug)]
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// Periods, horizons and timepoints
    pub temporal: TemporalHierarchy,
    /// Load zones
    pub zones: ZoneMap,
    /// Load in each zone and timepoint
    pub load: LoadMap,
    /// Generation and storage projects
    pub projects: ProjectMap,
    /// Data used by the capacity types
    pub capacity_data: CapacityData,
    /// Availability derates used by the exogenous availability type
    pub availability_derates: HashMap<(ProjectID, TimepointID), Dimensionless>,
    /// Capacity factors for variable generation
    pub capacity_factors: HashMap<(ProjectID, TimepointID), Dimensionless>,
    /// Transmission lines
    pub transmission_lines: TransmissionLineMap,
    /// Flow limits and availability for transmission lines
    pub transmission_data: TransmissionData,
    /// Operating reserve requirements and eligibility
    pub reserve_data: ReserveData,
    /// Planning reserve margin requirement for each zone and period
    pub prm_requirements: IndexMap<(ZoneID, PeriodID), Power>,
    /// Policy zones and targets
    pub policy_data: PolicyData,
}

impl Model {
    /// Read a model from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
        load_model(model_dir)
    }
}
