//! Building and solving optimisation models of electric power systems.
//!
//! A model is read from a directory of CSV files, composed into a mixed-integer linear problem by
//! the formulations chosen for each project and transmission line, and solved one subproblem and
//! stage at a time.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod availability;
pub mod capacity;
pub mod cli;
pub mod composition;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod operations;
pub mod output;
pub mod plugin;
pub mod policy;
pub mod problem;
pub mod project;
pub mod registry;
pub mod reliability;
pub mod reserves;
pub mod settings;
pub mod simulation;
pub mod temporal;
pub mod transmission;
pub mod units;
pub mod validation;
pub mod zone;

#[cfg(test)]
mod fixture;

/// Get the folder in which the program settings file is stored
pub fn get_gridplan_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_default();
    path.push("gridplan");
    path
}
