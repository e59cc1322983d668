//! CSV ingestion of scenario runs.
//!
//! One file per scenario, one row per building and interval:
//!
//! ```text
//! building,timestamp,demand_kw,indoor_temp_c,pv_kw,battery_soc,battery_kw,heat_pump_kw,carbon_intensity,tariff
//! B1,2024-01-01T00:00:00+01:00,12.5,21.0,0.0,0.5,0.0,2.1,0.21,0.30
//! ```
//!
//! Columns after `indoor_temp_c` may be omitted and default to zero. Row
//! order within a building is preserved so ordering problems surface during
//! alignment.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::Deserialize;
use thiserror::Error;

use crate::eval::types::{Reading, Sample, ScenarioRun, StrategyLabel};

/// Accepted naive timestamp layouts, read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: unrecognized timestamp `{value}`")]
    Timestamp { row: usize, value: String },

    #[error("no rows in input")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct Record {
    building: String,
    timestamp: String,
    demand_kw: f64,
    indoor_temp_c: f64,
    #[serde(default)]
    pv_kw: f64,
    #[serde(default)]
    battery_soc: f64,
    #[serde(default)]
    battery_kw: f64,
    #[serde(default)]
    heat_pump_kw: f64,
    #[serde(default)]
    carbon_intensity: f64,
    #[serde(default)]
    tariff: f64,
}

/// Parses an RFC 3339 timestamp, or a naive one taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts);
    }
    NAIVE_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(value, fmt)
            .ok()
            .map(|naive| naive.and_utc().fixed_offset())
    })
}

/// Reads a scenario from a CSV file.
///
/// # Errors
///
/// Returns an `IngestError` when the file cannot be read, a row does not
/// parse, or the file has no data rows.
pub fn read_scenario(
    path: &Path,
    name: &str,
    strategy: StrategyLabel,
) -> Result<ScenarioRun, IngestError> {
    let file = File::open(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_scenario_csv(io::BufReader::new(file), name, strategy)
}

/// Reads a scenario from any CSV source.
///
/// # Errors
///
/// See [`read_scenario`].
pub fn read_scenario_csv(
    reader: impl Read,
    name: &str,
    strategy: StrategyLabel,
) -> Result<ScenarioRun, IngestError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut buildings: BTreeMap<String, Vec<Sample>> = BTreeMap::new();

    for (i, row) in rdr.deserialize::<Record>().enumerate() {
        let record = row?;
        // header is row 1
        let timestamp = parse_timestamp(&record.timestamp).ok_or_else(|| IngestError::Timestamp {
            row: i + 2,
            value: record.timestamp.clone(),
        })?;
        let reading = Reading {
            demand_kw: record.demand_kw,
            indoor_temp_c: record.indoor_temp_c,
            pv_kw: record.pv_kw,
            battery_soc: record.battery_soc,
            battery_kw: record.battery_kw,
            heat_pump_kw: record.heat_pump_kw,
            carbon_intensity: record.carbon_intensity,
            tariff: record.tariff,
        };
        buildings
            .entry(record.building)
            .or_default()
            .push(Sample::new(timestamp, reading));
    }

    if buildings.is_empty() {
        return Err(IngestError::Empty);
    }
    Ok(ScenarioRun::new(name, strategy, buildings))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
building,timestamp,demand_kw,indoor_temp_c,pv_kw,battery_soc,battery_kw,heat_pump_kw,carbon_intensity,tariff
B1,2024-01-01T00:00:00+01:00,12.5,21.0,0.0,0.5,0.0,2.1,0.21,0.30
B2,2024-01-01T00:00:00+01:00,8.0,20.5,0.0,0.5,1.0,1.5,0.21,0.30
B1,2024-01-01T01:00:00+01:00,11.0,21.2,0.0,0.5,0.0,2.0,0.20,0.30
";

    #[test]
    fn rows_are_grouped_by_building() {
        let run = read_scenario_csv(CSV.as_bytes(), "base", StrategyLabel::Baseline).unwrap();
        assert_eq!(run.buildings().len(), 2);
        assert_eq!(run.buildings()["B1"].len(), 2);
        assert_eq!(run.buildings()["B2"][0].reading.battery_kw, 1.0);
        assert_eq!(run.buildings()["B1"][1].reading.tariff, 0.30);
    }

    #[test]
    fn optional_columns_default_to_zero() {
        let csv = "building,timestamp,demand_kw,indoor_temp_c\nA,2024-01-01 00:00,3.0,21.0\n";
        let run = read_scenario_csv(csv.as_bytes(), "base", StrategyLabel::Baseline).unwrap();
        let r = run.buildings()["A"][0].reading;
        assert_eq!(r.demand_kw, 3.0);
        assert_eq!(r.tariff, 0.0);
    }

    #[test]
    fn naive_timestamps_are_utc() {
        let ts = parse_timestamp("2024-03-01 12:15:00").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 0);
        assert_eq!(ts.to_rfc3339(), "2024-03-01T12:15:00+00:00");
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn bad_timestamp_reports_row() {
        let csv = "building,timestamp,demand_kw,indoor_temp_c\nA,2024-01-01 00:00,3.0,21.0\nA,noon,3.0,21.0\n";
        let err = read_scenario_csv(csv.as_bytes(), "base", StrategyLabel::Baseline).unwrap_err();
        assert!(matches!(err, IngestError::Timestamp { row: 3, .. }));
    }

    #[test]
    fn header_only_is_empty() {
        let csv = "building,timestamp,demand_kw,indoor_temp_c\n";
        let err = read_scenario_csv(csv.as_bytes(), "base", StrategyLabel::Baseline).unwrap_err();
        assert!(matches!(err, IngestError::Empty));
    }
}
