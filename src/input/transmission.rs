//! Code for reading transmission lines and their capacities from CSV files.
use super::*;
use crate::id::IDCollection;
use crate::temporal::{PeriodID, TemporalHierarchy, TimepointID};
use crate::transmission::{
    TransmissionCapacity, TransmissionData, TransmissionLine, TransmissionLineMap,
    TxOperationalType,
};
use crate::units::{Dimensionless, Power};
use crate::zone::ZoneMap;
use serde::Deserialize;
use std::rc::Rc;

const LINES_FILE_NAME: &str = "transmission_lines.csv";
const CAPACITY_FILE_NAME: &str = "transmission_capacity.csv";
const AVAILABILITY_FILE_NAME: &str = "transmission_availability.csv";

#[derive(Deserialize, PartialEq, Debug)]
struct TransmissionLineRaw {
    transmission_line: String,
    zone_from: String,
    zone_to: String,
    tx_operational_type: TxOperationalType,
    #[serde(default)]
    reactance_ohms: Option<f64>,
}

#[derive(Deserialize, PartialEq, Debug)]
struct TransmissionCapacityRaw {
    transmission_line: String,
    period: PeriodID,
    min_mw: f64,
    max_mw: f64,
}

#[derive(Deserialize, PartialEq, Debug)]
struct TransmissionAvailabilityRaw {
    transmission_line: String,
    timepoint: TimepointID,
    #[serde(deserialize_with = "deserialise_proportion")]
    availability_derate: f64,
}

/// Read transmission lines from the model directory.
///
/// The file is optional: a model without it has no transmission.
pub fn read_transmission_lines(model_dir: &Path, zones: &ZoneMap) -> Result<TransmissionLineMap> {
    let file_path = model_dir.join(LINES_FILE_NAME);
    read_lines_from_iter(read_csv_optional(&file_path)?, zones)
        .with_context(|| input_err_msg(&file_path))
}

fn read_lines_from_iter<I>(iter: I, zones: &ZoneMap) -> Result<TransmissionLineMap>
where
    I: Iterator<Item = TransmissionLineRaw>,
{
    let mut lines = TransmissionLineMap::new();
    for raw in iter {
        let id = raw.transmission_line.as_str();
        let zone_from = zones.get_id_by_str(&raw.zone_from)?;
        let zone_to = zones.get_id_by_str(&raw.zone_to)?;
        ensure!(
            zone_from != zone_to,
            "Transmission line {id} connects zone {zone_from} to itself"
        );
        if raw.tx_operational_type == TxOperationalType::TxDcopf {
            ensure!(
                raw.reactance_ohms
                    .is_some_and(|reactance| reactance.is_finite() && reactance > 0.0),
                "Transmission line {id} uses DC power flow and must have a positive reactance"
            );
        }

        let line = TransmissionLine {
            id: id.into(),
            zone_from,
            zone_to,
            operational_type: raw.tx_operational_type,
            reactance: raw.reactance_ohms,
        };
        ensure!(
            lines.insert(line.id.clone(), Rc::new(line)).is_none(),
            "Duplicate transmission line ID {id}"
        );
    }

    Ok(lines)
}

/// Read flow limits and availability derates for transmission lines.
///
/// Both files are optional. A line is only operational in the periods for which it has a flow
/// limit.
pub fn read_transmission_data(
    model_dir: &Path,
    lines: &TransmissionLineMap,
    temporal: &TemporalHierarchy,
) -> Result<TransmissionData> {
    let mut data = TransmissionData::default();

    let file_path = model_dir.join(CAPACITY_FILE_NAME);
    read_capacity_from_iter(read_csv_optional(&file_path)?, lines, temporal, &mut data)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(AVAILABILITY_FILE_NAME);
    read_availability_from_iter(read_csv_optional(&file_path)?, lines, temporal, &mut data)
        .with_context(|| input_err_msg(&file_path))?;

    Ok(data)
}

fn read_capacity_from_iter<I>(
    iter: I,
    lines: &TransmissionLineMap,
    temporal: &TemporalHierarchy,
    data: &mut TransmissionData,
) -> Result<()>
where
    I: Iterator<Item = TransmissionCapacityRaw>,
{
    for raw in iter {
        let line = lines.get_id_by_str(&raw.transmission_line)?;
        ensure!(
            temporal.contains_period(raw.period),
            "Unknown period {} for transmission line {line}",
            raw.period
        );
        ensure!(
            raw.min_mw.is_finite() && raw.max_mw.is_finite(),
            "Flow limits for transmission line {line} must be finite"
        );
        ensure!(
            raw.min_mw <= raw.max_mw,
            "Minimum flow for transmission line {line} in period {} is greater than maximum",
            raw.period
        );

        let capacity = TransmissionCapacity {
            min: Power(raw.min_mw),
            max: Power(raw.max_mw),
        };
        ensure!(
            data.capacity
                .insert((line.clone(), raw.period), capacity)
                .is_none(),
            "Duplicate capacity for transmission line {line} in period {}",
            raw.period
        );
    }

    Ok(())
}

fn read_availability_from_iter<I>(
    iter: I,
    lines: &TransmissionLineMap,
    temporal: &TemporalHierarchy,
    data: &mut TransmissionData,
) -> Result<()>
where
    I: Iterator<Item = TransmissionAvailabilityRaw>,
{
    for raw in iter {
        let line = lines.get_id_by_str(&raw.transmission_line)?;
        ensure!(
            temporal.contains_timepoint(raw.timepoint),
            "Unknown timepoint {} for transmission line {line}",
            raw.timepoint
        );
        ensure!(
            data.availability
                .insert(
                    (line.clone(), raw.timepoint),
                    Dimensionless(raw.availability_derate)
                )
                .is_none(),
            "Duplicate availability for transmission line {line} in timepoint {}",
            raw.timepoint
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, model};
    use crate::model::Model;
    use crate::zone::Zone;
    use rstest::{fixture, rstest};

    #[fixture]
    fn zones() -> ZoneMap {
        ["a", "b"]
            .into_iter()
            .map(|id| {
                let zone = Zone {
                    id: id.into(),
                    unserved_energy_penalty: None,
                    overgeneration_penalty: None,
                };
                (zone.id.clone(), zone)
            })
            .collect()
    }

    fn line_raw(
        id: &str,
        zone_to: &str,
        tx_operational_type: TxOperationalType,
        reactance_ohms: Option<f64>,
    ) -> TransmissionLineRaw {
        TransmissionLineRaw {
            transmission_line: id.to_string(),
            zone_from: "a".to_string(),
            zone_to: zone_to.to_string(),
            tx_operational_type,
            reactance_ohms,
        }
    }

    #[rstest]
    fn test_read_lines(zones: ZoneMap) {
        let lines = read_lines_from_iter(
            [
                line_raw("ab1", "b", TxOperationalType::TxSimple, None),
                line_raw("ab2", "b", TxOperationalType::TxDcopf, Some(0.1)),
            ]
            .into_iter(),
            &zones,
        )
        .unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[&crate::transmission::TransmissionLineID::from("ab2")].reactance, Some(0.1));
    }

    #[rstest]
    #[case(line_raw("aa", "a", TxOperationalType::TxSimple, None), "Transmission line aa connects zone a to itself")]
    #[case(line_raw("ab", "b", TxOperationalType::TxDcopf, None), "Transmission line ab uses DC power flow and must have a positive reactance")]
    #[case(line_raw("ab", "b", TxOperationalType::TxDcopf, Some(0.0)), "Transmission line ab uses DC power flow and must have a positive reactance")]
    #[case(line_raw("ac", "c", TxOperationalType::TxSimple, None), "Unknown ID c found")]
    fn test_read_lines_invalid(
        zones: ZoneMap,
        #[case] raw: TransmissionLineRaw,
        #[case] message: &str,
    ) {
        assert_error!(read_lines_from_iter([raw].into_iter(), &zones), message);
    }

    #[rstest]
    fn test_read_capacity(zones: ZoneMap, model: Model) {
        let lines = read_lines_from_iter(
            [line_raw("ab", "b", TxOperationalType::TxSimple, None)].into_iter(),
            &zones,
        )
        .unwrap();
        let raw = |min_mw, max_mw| TransmissionCapacityRaw {
            transmission_line: "ab".to_string(),
            period: 2020,
            min_mw,
            max_mw,
        };

        let mut data = TransmissionData::default();
        read_capacity_from_iter([raw(-50.0, 100.0)].into_iter(), &lines, &model.temporal, &mut data)
            .unwrap();
        assert_eq!(data.capacity[&("ab".into(), 2020)].min, Power(-50.0));

        let mut data = TransmissionData::default();
        assert_error!(
            read_capacity_from_iter([raw(100.0, 50.0)].into_iter(), &lines, &model.temporal, &mut data),
            "Minimum flow for transmission line ab in period 2020 is greater than maximum"
        );
    }
}
