//! Code for reading load zones and load from CSV files.
use super::*;
use crate::id::IDCollection;
use crate::temporal::{TemporalHierarchy, TimepointID};
use crate::units::{MoneyPerEnergy, Power};
use crate::zone::{LoadMap, Zone, ZoneMap};
use serde::Deserialize;

const ZONES_FILE_NAME: &str = "zones.csv";
const LOAD_FILE_NAME: &str = "load.csv";

#[derive(Deserialize, PartialEq, Debug)]
struct ZoneRaw {
    zone: String,
    #[serde(default)]
    unserved_energy_penalty: Option<f64>,
    #[serde(default)]
    overgeneration_penalty: Option<f64>,
}

#[derive(Deserialize, PartialEq, Debug)]
struct LoadRaw {
    zone: String,
    timepoint: TimepointID,
    load_mw: f64,
}

/// Read load zones from the model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_zones(model_dir: &Path) -> Result<ZoneMap> {
    let file_path = model_dir.join(ZONES_FILE_NAME);
    read_zones_from_iter(read_csv(&file_path)?).with_context(|| input_err_msg(&file_path))
}

fn read_zones_from_iter<I>(iter: I) -> Result<ZoneMap>
where
    I: Iterator<Item = ZoneRaw>,
{
    let mut zones = ZoneMap::new();
    for raw in iter {
        let penalty = |value: Option<f64>, name| -> Result<_> {
            value
                .map(|value| {
                    check_nonnegative(value, name)?;
                    Ok(MoneyPerEnergy(value))
                })
                .transpose()
        };
        let zone = Zone {
            id: raw.zone.as_str().into(),
            unserved_energy_penalty: penalty(raw.unserved_energy_penalty, "unserved_energy_penalty")?,
            overgeneration_penalty: penalty(raw.overgeneration_penalty, "overgeneration_penalty")?,
        };
        ensure!(
            zones.insert(zone.id.clone(), zone).is_none(),
            "Duplicate zone ID {}",
            raw.zone
        );
    }

    Ok(zones)
}

/// Read load for each zone and timepoint.
///
/// Every zone must have a load value for every timepoint.
pub fn read_load(model_dir: &Path, zones: &ZoneMap, temporal: &TemporalHierarchy) -> Result<LoadMap> {
    let file_path = model_dir.join(LOAD_FILE_NAME);
    read_load_from_iter(read_csv(&file_path)?, zones, temporal)
        .with_context(|| input_err_msg(&file_path))
}

fn read_load_from_iter<I>(iter: I, zones: &ZoneMap, temporal: &TemporalHierarchy) -> Result<LoadMap>
where
    I: Iterator<Item = LoadRaw>,
{
    let mut load = LoadMap::new();
    for raw in iter {
        let zone = zones.get_id_by_str(&raw.zone)?;
        ensure!(
            temporal.contains_timepoint(raw.timepoint),
            "Unknown timepoint {} in load for zone {zone}",
            raw.timepoint
        );
        ensure!(
            raw.load_mw.is_finite(),
            "Load for zone {zone} in timepoint {} must be finite",
            raw.timepoint
        );
        ensure!(
            load.insert((zone.clone(), raw.timepoint), Power(raw.load_mw))
                .is_none(),
            "Duplicate load for zone {zone} in timepoint {}",
            raw.timepoint
        );
    }

    for zone in zones.keys() {
        for timepoint in temporal.iter_timepoints() {
            ensure!(
                load.contains_key(&(zone.clone(), timepoint.id)),
                "Missing load for zone {zone} in timepoint {}",
                timepoint.id
            );
        }
    }

    Ok(load)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, temporal_hierarchy};
    use crate::temporal::BoundaryPolicy;
    use crate::zone::ZoneID;

    fn zone_raw(zone: &str) -> ZoneRaw {
        ZoneRaw {
            zone: zone.to_string(),
            unserved_energy_penalty: None,
            overgeneration_penalty: Some(100.0),
        }
    }

    fn load_raw(zone: &str, timepoint: TimepointID) -> LoadRaw {
        LoadRaw {
            zone: zone.to_string(),
            timepoint,
            load_mw: 10.0,
        }
    }

    #[test]
    fn test_read_zones() {
        let zones = read_zones_from_iter([zone_raw("north"), zone_raw("south")].into_iter()).unwrap();
        assert_eq!(zones.len(), 2);
        assert_eq!(
            zones[&ZoneID::from("north")].overgeneration_penalty,
            Some(MoneyPerEnergy(100.0))
        );

        assert_error!(
            read_zones_from_iter([zone_raw("north"), zone_raw("north")].into_iter()),
            "Duplicate zone ID north"
        );
    }

    #[test]
    fn test_read_load() {
        let zones = read_zones_from_iter([zone_raw("north")].into_iter()).unwrap();
        let temporal = temporal_hierarchy(BoundaryPolicy::Circular, &[1.0, 1.0]);

        let load = read_load_from_iter(
            [load_raw("north", 1), load_raw("north", 2)].into_iter(),
            &zones,
            &temporal,
        )
        .unwrap();
        assert_eq!(load.len(), 2);

        assert_error!(
            read_load_from_iter([load_raw("north", 1)].into_iter(), &zones, &temporal),
            "Missing load for zone north in timepoint 2"
        );
        assert_error!(
            read_load_from_iter([load_raw("south", 1)].into_iter(), &zones, &temporal),
            "Unknown ID south found"
        );
        assert_error!(
            read_load_from_iter([load_raw("north", 3)].into_iter(), &zones, &temporal),
            "Unknown timepoint 3 in load for zone north"
        );
    }
}
