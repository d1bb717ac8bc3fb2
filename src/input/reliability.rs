//! Code for reading planning reserve margin requirements from a CSV file.
use super::*;
use crate::id::IDCollection;
use crate::temporal::{PeriodID, TemporalHierarchy};
use crate::units::Power;
use crate::zone::{ZoneID, ZoneMap};
use indexmap::IndexMap;
use serde::Deserialize;

const PRM_REQUIREMENTS_FILE_NAME: &str = "prm_requirements.csv";

#[derive(Deserialize, PartialEq, Debug)]
struct PrmRequirementRaw {
    zone: String,
    period: PeriodID,
    requirement_mw: f64,
}

/// Read the planning reserve margin requirement for each zone and period.
///
/// The file is optional.
pub fn read_prm_requirements(
    model_dir: &Path,
    zones: &ZoneMap,
    temporal: &TemporalHierarchy,
) -> Result<IndexMap<(ZoneID, PeriodID), Power>> {
    let file_path = model_dir.join(PRM_REQUIREMENTS_FILE_NAME);
    read_prm_requirements_from_iter(read_csv_optional(&file_path)?, zones, temporal)
        .with_context(|| input_err_msg(&file_path))
}

fn read_prm_requirements_from_iter<I>(
    iter: I,
    zones: &ZoneMap,
    temporal: &TemporalHierarchy,
) -> Result<IndexMap<(ZoneID, PeriodID), Power>>
where
    I: Iterator<Item = PrmRequirementRaw>,
{
    let mut requirements = IndexMap::new();
    for raw in iter {
        let zone = zones.get_id_by_str(&raw.zone)?;
        ensure!(
            temporal.contains_period(raw.period),
            "Unknown period {} in PRM requirement for zone {zone}",
            raw.period
        );
        check_nonnegative(raw.requirement_mw, "requirement_mw")?;
        ensure!(
            requirements
                .insert((zone.clone(), raw.period), Power(raw.requirement_mw))
                .is_none(),
            "Duplicate PRM requirement for zone {zone} in period {}",
            raw.period
        );
    }

    Ok(requirements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, model};
    use crate::model::Model;
    use rstest::rstest;

    fn raw(period: PeriodID, requirement_mw: f64) -> PrmRequirementRaw {
        PrmRequirementRaw {
            zone: "z1".to_string(),
            period,
            requirement_mw,
        }
    }

    #[rstest]
    fn test_read_prm_requirements(model: Model) {
        let requirements = read_prm_requirements_from_iter(
            [raw(2020, 100.0), raw(2030, 120.0)].into_iter(),
            &model.zones,
            &model.temporal,
        )
        .unwrap();
        assert_eq!(requirements[&("z1".into(), 2030)], Power(120.0));
    }

    #[rstest]
    fn test_read_prm_requirements_invalid(model: Model) {
        assert_error!(
            read_prm_requirements_from_iter(
                [raw(2025, 100.0)].into_iter(),
                &model.zones,
                &model.temporal
            ),
            "Unknown period 2025 in PRM requirement for zone z1"
        );
        assert_error!(
            read_prm_requirements_from_iter(
                [raw(2020, -1.0)].into_iter(),
                &model.zones,
                &model.temporal
            ),
            "requirement_mw must be a finite number greater than or equal to zero"
        );
    }
}
