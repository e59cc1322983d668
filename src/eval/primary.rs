//! Tracking accuracy against the reference and thermal comfort exceedance.

use chrono::NaiveDate;

use super::align::AlignedScenario;
use super::error::UndefinedMetric;
use super::reference::ReferenceProfile;
use super::stats::mean;
use super::types::{
    ComfortBand, MetricKind, MetricResult, MetricSet, MetricValue, Period, Resolution, Scope,
    Season,
};

/// Daily tracking accuracy of a portfolio against its flat reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingError {
    /// Normalized mean bias error (%).
    pub nmbe: MetricValue,
    /// Coefficient of variation of the RMSE (%).
    pub cv_rmse: MetricValue,
}

impl TrackingError {
    /// Computes NMBE and CV-RMSE for one day.
    ///
    /// # Arguments
    ///
    /// * `actual` - Portfolio demand per interval (kW)
    /// * `reference` - Reference power per interval (kW), same length
    ///
    /// # Returns
    ///
    /// Both metrics undefined when the reference mean is zero or the day is
    /// empty.
    pub fn compute(actual: &[f64], reference: &[f64]) -> Self {
        let n = actual.len().min(reference.len());
        let ref_mean = mean(&reference[..n]).unwrap_or(0.0);

        let mut bias = 0.0;
        let mut sq_sum = 0.0;
        for (a, r) in actual.iter().zip(reference) {
            let err = a - r;
            bias += err;
            sq_sum += err * err;
        }
        let count = n.max(1) as f64;

        Self {
            nmbe: MetricValue::ratio(
                bias / count,
                ref_mean,
                100.0,
                UndefinedMetric::ZeroReference,
            ),
            cv_rmse: MetricValue::ratio(
                (sq_sum / count).sqrt(),
                ref_mean,
                100.0,
                UndefinedMetric::ZeroReference,
            ),
        }
    }
}

/// Count of intervals outside the comfort band.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ComfortExceedance {
    pub flagged: usize,
    pub total: usize,
}

impl ComfortExceedance {
    pub fn from_temperatures(
        band: &ComfortBand,
        temperatures: impl IntoIterator<Item = f64>,
    ) -> Self {
        temperatures
            .into_iter()
            .fold(Self::default(), |mut acc, t| {
                acc.total += 1;
                if !band.contains(t) {
                    acc.flagged += 1;
                }
                acc
            })
    }

    pub fn add(&mut self, other: Self) {
        self.flagged += other.flagged;
        self.total += other.total;
    }

    /// Exceedance duration in hours.
    pub fn hours(&self, resolution: Resolution) -> f64 {
        self.flagged as f64 * resolution.hours()
    }

    /// Share of flagged intervals (%); zero when nothing was observed.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.flagged as f64 / self.total as f64
        }
    }
}

/// Computes NMBE, CV-RMSE and comfort exceedance for one aligned scenario.
///
/// The comfort band is fixed by the configured season for the whole period.
#[derive(Debug, Clone, Copy)]
pub struct PrimaryMetricsCalculator {
    band: ComfortBand,
    resolution: Resolution,
}

impl PrimaryMetricsCalculator {
    pub fn new(season: Season, resolution: Resolution) -> Self {
        Self {
            band: season.comfort_band(),
            resolution,
        }
    }

    /// Evaluates the given days of a scenario.
    ///
    /// Days without a reference value get no tracking metrics; comfort is
    /// still reported for them.
    ///
    /// # Arguments
    ///
    /// * `scenario` - Aligned scenario under test
    /// * `reference` - Reference profile derived from the baseline
    /// * `days` - Complete days to evaluate, in calendar order
    pub fn evaluate(
        &self,
        scenario: &AlignedScenario,
        reference: &ReferenceProfile,
        days: &[NaiveDate],
    ) -> MetricSet {
        let name = scenario.name();
        let mut set = MetricSet::default();
        let building_ids: Vec<&str> = scenario.building_ids().collect();
        let mut building_totals = vec![ComfortExceedance::default(); building_ids.len()];
        let mut portfolio_total = ComfortExceedance::default();

        for &date in days {
            let period = Period::Day(date);

            if let (Some(actual), Some(target)) =
                (scenario.portfolio_day(date), reference.target_kw(date))
            {
                let tracking = TrackingError::compute(&actual, &target);
                set.daily.push(MetricResult::new(
                    MetricKind::Nmbe,
                    Scope::Portfolio,
                    name,
                    period,
                    tracking.nmbe,
                ));
                set.daily.push(MetricResult::new(
                    MetricKind::CvRmse,
                    Scope::Portfolio,
                    name,
                    period,
                    tracking.cv_rmse,
                ));
            }

            let mut portfolio_day = ComfortExceedance::default();
            for (building, total) in building_ids.iter().zip(building_totals.iter_mut()) {
                let Some(readings) = scenario.building_day(building, date) else {
                    continue;
                };
                let day = ComfortExceedance::from_temperatures(
                    &self.band,
                    readings.iter().map(|r| r.indoor_temp_c),
                );
                total.add(day);
                portfolio_day.add(day);
                self.push_exceedance(
                    &mut set.daily,
                    Scope::Building(building.to_string()),
                    name,
                    period,
                    day,
                );
            }
            portfolio_total.add(portfolio_day);
            self.push_exceedance(&mut set.daily, Scope::Portfolio, name, period, portfolio_day);
        }

        for (building, total) in building_ids.iter().zip(building_totals) {
            self.push_exceedance(
                &mut set.totals,
                Scope::Building(building.to_string()),
                name,
                Period::Total,
                total,
            );
        }
        self.push_exceedance(
            &mut set.totals,
            Scope::Portfolio,
            name,
            Period::Total,
            portfolio_total,
        );
        set
    }

    fn push_exceedance(
        &self,
        out: &mut Vec<MetricResult>,
        scope: Scope,
        scenario: &str,
        period: Period,
        exceedance: ComfortExceedance,
    ) {
        out.push(MetricResult::new(
            MetricKind::ExceedanceHours,
            scope.clone(),
            scenario,
            period,
            exceedance.hours(self.resolution),
        ));
        out.push(MetricResult::new(
            MetricKind::ExceedancePercent,
            scope,
            scenario,
            period,
            exceedance.percent(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use approx::assert_relative_eq;
    use chrono::{DateTime, TimeDelta};

    use super::*;
    use crate::eval::align::TimeSeriesAligner;
    use crate::eval::reference::ReferenceProfileGenerator;
    use crate::eval::types::{Reading, Sample, ScenarioRun};

    fn hourly_run(name: &str, buildings: &[(&str, &dyn Fn(usize) -> Reading)]) -> AlignedScenario {
        let start = DateTime::parse_from_rfc3339("2024-01-01T00:00:00+00:00").unwrap();
        let map: BTreeMap<String, Vec<Sample>> = buildings
            .iter()
            .map(|(id, f)| {
                let samples: Vec<Sample> = (0..24)
                    .map(|i| Sample::new(start + TimeDelta::hours(i as i64), f(i)))
                    .collect();
                (id.to_string(), samples)
            })
            .collect();
        TimeSeriesAligner::new(Resolution::Hourly, 4)
            .align(&ScenarioRun::baseline(name, map))
            .unwrap()
    }

    fn demand(kw: f64, temp: f64) -> Reading {
        Reading {
            demand_kw: kw,
            indoor_temp_c: temp,
            ..Reading::default()
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn value(set: &MetricSet, metric: MetricKind, scope: &Scope) -> MetricValue {
        set.daily
            .iter()
            .find(|r| r.metric == metric && &r.scope == scope)
            .unwrap()
            .value
    }

    #[test]
    fn perfect_tracking_scores_zero() {
        let t = TrackingError::compute(&[5.0, 5.0, 5.0], &[5.0, 5.0, 5.0]);
        assert_eq!(t.nmbe.value(), Some(0.0));
        assert_eq!(t.cv_rmse.value(), Some(0.0));
    }

    #[test]
    fn bias_and_rmse_are_normalized() {
        let t = TrackingError::compute(&[12.0, 8.0, 12.0, 8.0], &[10.0; 4]);
        assert_relative_eq!(t.nmbe.value().unwrap(), 0.0);
        assert_relative_eq!(t.cv_rmse.value().unwrap(), 20.0);

        let t = TrackingError::compute(&[11.0; 4], &[10.0; 4]);
        assert_relative_eq!(t.nmbe.value().unwrap(), 10.0);
    }

    #[test]
    fn zero_reference_is_undefined() {
        let t = TrackingError::compute(&[1.0, -1.0], &[0.0, 0.0]);
        assert_eq!(t.nmbe.undefined_reason(), Some(UndefinedMetric::ZeroReference));
        assert_eq!(t.cv_rmse.undefined_reason(), Some(UndefinedMetric::ZeroReference));
    }

    #[test]
    fn baseline_against_own_reference_has_no_bias() {
        let base = hourly_run("base", &[("A", &|i: usize| demand(10.0 + (i % 3) as f64, 21.0))]);
        let reference = ReferenceProfileGenerator::generate(&base);
        let calc = PrimaryMetricsCalculator::new(Season::Heating, Resolution::Hourly);
        let set = calc.evaluate(&base, &reference, &[day()]);
        assert_relative_eq!(
            value(&set, MetricKind::Nmbe, &Scope::Portfolio).value().unwrap(),
            0.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn exceedance_counts_flagged_intervals() {
        // A: 6 cold hours, B: always in band
        let base = hourly_run(
            "base",
            &[
                ("A", &|i: usize| demand(1.0, if i < 6 { 18.0 } else { 21.0 })),
                ("B", &|_: usize| demand(1.0, 22.0)),
            ],
        );
        let reference = ReferenceProfileGenerator::generate(&base);
        let calc = PrimaryMetricsCalculator::new(Season::Heating, Resolution::Hourly);
        let set = calc.evaluate(&base, &reference, &[day()]);

        let a = Scope::Building("A".into());
        assert_eq!(value(&set, MetricKind::ExceedanceHours, &a).value(), Some(6.0));
        assert_eq!(value(&set, MetricKind::ExceedancePercent, &a).value(), Some(25.0));
        assert_eq!(
            value(&set, MetricKind::ExceedancePercent, &Scope::Portfolio).value(),
            Some(12.5)
        );

        let total = set
            .totals
            .iter()
            .find(|r| r.metric == MetricKind::ExceedanceHours && r.scope == Scope::Portfolio)
            .unwrap();
        assert_eq!(total.value.value(), Some(6.0));
    }

    #[test]
    fn season_selects_band() {
        let warm = hourly_run("base", &[("A", &|_: usize| demand(1.0, 25.0))]);
        let reference = ReferenceProfileGenerator::generate(&warm);
        let heating = PrimaryMetricsCalculator::new(Season::Heating, Resolution::Hourly)
            .evaluate(&warm, &reference, &[day()]);
        let cooling = PrimaryMetricsCalculator::new(Season::Cooling, Resolution::Hourly)
            .evaluate(&warm, &reference, &[day()]);
        let a = Scope::Building("A".into());
        assert_eq!(value(&heating, MetricKind::ExceedanceHours, &a).value(), Some(24.0));
        assert_eq!(value(&cooling, MetricKind::ExceedanceHours, &a).value(), Some(0.0));
    }

    #[test]
    fn exceedance_hours_scale_with_resolution() {
        let e = ComfortExceedance { flagged: 8, total: 96 };
        assert_relative_eq!(e.hours(Resolution::FifteenMinutes), 2.0);
        assert_relative_eq!(e.percent(), 100.0 * 8.0 / 96.0);
    }
}
