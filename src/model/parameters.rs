//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::input::{input_err_msg, read_toml};
use crate::units::{MoneyPerEnergy, MoneyPerPowerYear};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_unit_param_default!(default_unserved_energy_penalty, MoneyPerEnergy, 99999.0);
define_unit_param_default!(default_overgeneration_penalty, MoneyPerEnergy, 99999.0);
define_unit_param_default!(default_reserve_shortage_penalty, MoneyPerEnergy, 99999.0);
define_unit_param_default!(default_prm_shortfall_penalty, MoneyPerPowerYear, 99999.0);
define_param_default!(default_policy_violation_penalty, f64, 99999.0);

/// Represents the contents of the entire model file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// Penalty per MWh of load not served, unless overridden for a zone
    #[serde(default = "default_unserved_energy_penalty")]
    pub unserved_energy_penalty: MoneyPerEnergy,
    /// Penalty per MWh of generation in excess of load, unless overridden for a zone
    #[serde(default = "default_overgeneration_penalty")]
    pub overgeneration_penalty: MoneyPerEnergy,
    /// Penalty per MWh of unmet reserve requirement
    #[serde(default = "default_reserve_shortage_penalty")]
    pub reserve_shortage_penalty: MoneyPerEnergy,
    /// Penalty per MW-yr of unmet planning reserve margin
    #[serde(default = "default_prm_shortfall_penalty")]
    pub prm_shortfall_penalty: MoneyPerPowerYear,
    /// Penalty per unit (tonne or MWh) by which a policy target is missed
    #[serde(default = "default_policy_violation_penalty")]
    pub policy_violation_penalty: f64,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            unserved_energy_penalty: default_unserved_energy_penalty(),
            overgeneration_penalty: default_overgeneration_penalty(),
            reserve_shortage_penalty: default_reserve_shortage_penalty(),
            prm_shortfall_penalty: default_prm_shortfall_penalty(),
            policy_violation_penalty: default_policy_violation_penalty(),
        }
    }
}

/// Check that a penalty is finite and non-negative
fn check_penalty(name: &str, value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} must be a finite number greater than or equal to zero"
    );

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_penalty(
            "unserved_energy_penalty",
            self.unserved_energy_penalty.value(),
        )?;
        check_penalty("overgeneration_penalty", self.overgeneration_penalty.value())?;
        check_penalty(
            "reserve_shortage_penalty",
            self.reserve_shortage_penalty.value(),
        )?;
        check_penalty("prm_shortfall_penalty", self.prm_shortfall_penalty.value())?;
        check_penalty("policy_violation_penalty", self.policy_violation_penalty)?;

        Ok(())
    }
}
