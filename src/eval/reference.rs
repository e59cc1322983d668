//! Daily flat reference targets derived from the baseline portfolio.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use super::align::AlignedScenario;
use super::types::{DAY_LENGTH_HOURS, Resolution};

/// Flat reference for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyReference {
    pub date: NaiveDate,
    /// Baseline portfolio energy over the day (kWh). Source of truth.
    pub total_energy_kwh: f64,
    /// Constant reference power (kW) applied to every interval of the day.
    pub reference_power_kw: f64,
    /// Reference energy per interval (kWh).
    pub reference_energy_per_interval_kwh: f64,
}

impl DailyReference {
    /// Builds the reference from a day's total baseline energy.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use portfolio_eval::eval::reference::DailyReference;
    /// use portfolio_eval::eval::types::Resolution;
    ///
    /// let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    /// let r = DailyReference::from_total(date, 2400.0, Resolution::FifteenMinutes);
    /// assert_eq!(r.reference_power_kw, 100.0);
    /// assert_eq!(r.reference_energy_per_interval_kwh, 25.0);
    /// ```
    pub fn from_total(date: NaiveDate, total_energy_kwh: f64, resolution: Resolution) -> Self {
        let reference_power_kw = total_energy_kwh / DAY_LENGTH_HOURS;
        Self {
            date,
            total_energy_kwh,
            reference_power_kw,
            reference_energy_per_interval_kwh: reference_power_kw * resolution.hours(),
        }
    }
}

/// Reference targets for every complete baseline day. Read-only once built.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceProfile {
    resolution: Resolution,
    days: BTreeMap<NaiveDate, DailyReference>,
}

impl ReferenceProfile {
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailyReference> {
        self.days.get(&date)
    }

    pub fn days(&self) -> impl Iterator<Item = &DailyReference> {
        self.days.values()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Flat per-interval target (kW) for one day, as long as a full day.
    pub fn target_kw(&self, date: NaiveDate) -> Option<Vec<f64>> {
        let day = self.days.get(&date)?;
        Some(vec![
            day.reference_power_kw;
            self.resolution.intervals_per_day()
        ])
    }
}

/// Computes one flat reference per complete day of the baseline.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceProfileGenerator;

impl ReferenceProfileGenerator {
    /// Generates the reference profile from the aligned baseline.
    ///
    /// Partial and incomplete days are skipped; each day's value depends only
    /// on that day's baseline intervals.
    pub fn generate(baseline: &AlignedScenario) -> ReferenceProfile {
        let resolution = baseline.resolution();
        let hours = resolution.hours();

        let days: BTreeMap<_, _> = baseline
            .valid_days()
            .filter_map(|window| {
                let demand = baseline.portfolio_day(window.date)?;
                let total_energy_kwh = demand.iter().map(|kw| kw * hours).sum::<f64>();
                Some((
                    window.date,
                    DailyReference::from_total(window.date, total_energy_kwh, resolution),
                ))
            })
            .collect();

        debug!(
            scenario = baseline.name(),
            days = days.len(),
            "generated reference profile"
        );
        ReferenceProfile { resolution, days }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use chrono::{DateTime, TimeDelta};

    use super::*;
    use crate::eval::align::TimeSeriesAligner;
    use crate::eval::types::{Reading, Sample, ScenarioRun};

    fn aligned(minutes: i64, demand: impl Fn(usize) -> f64, n: usize) -> AlignedScenario {
        let start = DateTime::parse_from_rfc3339("2024-01-01T00:00:00+00:00").unwrap();
        let samples: Vec<Sample> = (0..n)
            .map(|i| {
                Sample::new(
                    start + TimeDelta::minutes(minutes * i as i64),
                    Reading {
                        demand_kw: demand(i),
                        ..Reading::default()
                    },
                )
            })
            .collect();
        let run = ScenarioRun::baseline("base", [("A".to_string(), samples)].into());
        let resolution = Resolution::from_minutes(minutes).unwrap();
        TimeSeriesAligner::new(resolution, 4).align(&run).unwrap()
    }

    #[test]
    fn flat_reference_preserves_daily_energy() {
        let base = aligned(15, |i| 50.0 + (i % 96) as f64, 96 * 2);
        let profile = ReferenceProfileGenerator::generate(&base);
        assert_eq!(profile.len(), 2);
        for day in profile.days() {
            assert_relative_eq!(
                day.reference_power_kw * DAY_LENGTH_HOURS,
                day.total_energy_kwh,
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn worked_example_at_fifteen_minutes() {
        let base = aligned(15, |_| 100.0, 96);
        let profile = ReferenceProfileGenerator::generate(&base);
        let day = profile.days().next().unwrap();
        assert_relative_eq!(day.total_energy_kwh, 2400.0);
        assert_relative_eq!(day.reference_power_kw, 100.0);
        assert_relative_eq!(day.reference_energy_per_interval_kwh, 25.0);
    }

    #[test]
    fn target_matches_day_length() {
        let base = aligned(60, |i| i as f64, 24);
        let profile = ReferenceProfileGenerator::generate(&base);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let target = profile.target_kw(date).unwrap();
        assert_eq!(target.len(), 24);
        assert_relative_eq!(target[0], 11.5);
    }

    #[test]
    fn partial_day_gets_no_reference() {
        // 1.5 days: the second day is partial
        let base = aligned(60, |_| 10.0, 36);
        let profile = ReferenceProfileGenerator::generate(&base);
        assert_eq!(profile.len(), 1);
        assert!(profile
            .get(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .is_none());
    }

    #[test]
    fn day_reference_ignores_neighbouring_days() {
        let short = aligned(60, |i| if i < 24 { 5.0 } else { 50.0 }, 48);
        let long = aligned(60, |i| if i < 24 { 5.0 } else { 500.0 }, 72);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(
            ReferenceProfileGenerator::generate(&short).get(date),
            ReferenceProfileGenerator::generate(&long).get(date)
        );
    }
}
