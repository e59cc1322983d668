//! Energy, cost, emissions and load-shape metrics of a single scenario.
//!
//! Everything here is computed per day and never carries state across a day
//! boundary. Metrics that need a baseline counterpart live in
//! [`compare`](super::compare).

use chrono::{DateTime, FixedOffset, NaiveDate};

use super::align::AlignedScenario;
use super::error::UndefinedMetric;
use super::types::{MetricKind, MetricResult, MetricSet, MetricValue, Period, Reading, Scope};

/// Shape statistics of one day of demand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadShape {
    pub peak_kw: f64,
    /// Interval index of the first occurrence of the peak.
    pub peak_index: usize,
    pub min_kw: f64,
    pub mean_kw: f64,
    /// Sum of absolute interval-to-interval changes (kW).
    pub ramping_kw: f64,
}

impl LoadShape {
    /// Returns `None` for an empty series.
    pub fn from_demand(demand: &[f64]) -> Option<Self> {
        let first = *demand.first()?;
        let mut shape = Self {
            peak_kw: first,
            peak_index: 0,
            min_kw: first,
            mean_kw: demand.iter().sum::<f64>() / demand.len() as f64,
            ramping_kw: ramping(demand),
        };
        for (i, &kw) in demand.iter().enumerate().skip(1) {
            if kw > shape.peak_kw {
                shape.peak_kw = kw;
                shape.peak_index = i;
            }
            shape.min_kw = shape.min_kw.min(kw);
        }
        Some(shape)
    }

    /// `peak / min`; undefined when the minimum is not positive.
    pub fn peak_to_valley(&self) -> MetricValue {
        if self.min_kw <= 0.0 {
            MetricValue::Undefined(UndefinedMetric::NonPositiveMinimum)
        } else {
            MetricValue::Defined(self.peak_kw / self.min_kw)
        }
    }

    /// `mean / peak`; undefined when the peak is not positive.
    pub fn load_factor(&self) -> MetricValue {
        if self.peak_kw <= 0.0 {
            MetricValue::Undefined(UndefinedMetric::NonPositivePeak)
        } else {
            MetricValue::Defined(self.mean_kw / self.peak_kw)
        }
    }
}

/// Sum of `|demand[i] - demand[i-1]|` over consecutive intervals.
///
/// # Examples
///
/// ```
/// use portfolio_eval::eval::secondary::ramping;
///
/// let alternating: Vec<f64> = (0..24).map(|i| if i % 2 == 0 { 100.0 } else { 120.0 }).collect();
/// assert_eq!(ramping(&alternating), 460.0);
/// ```
pub fn ramping(demand: &[f64]) -> f64 {
    demand.windows(2).map(|w| (w[1] - w[0]).abs()).sum()
}

/// Energy, cost and emissions accumulated over a set of intervals.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyTotals {
    pub energy_kwh: f64,
    pub cost: f64,
    pub emissions_kg: f64,
}

impl EnergyTotals {
    pub fn from_readings(readings: &[Reading], interval_hours: f64) -> Self {
        readings.iter().fold(Self::default(), |acc, r| Self {
            energy_kwh: acc.energy_kwh + r.energy_kwh(interval_hours),
            cost: acc.cost + r.cost(interval_hours),
            emissions_kg: acc.emissions_kg + r.emissions_kg(interval_hours),
        })
    }

    pub fn add(&mut self, other: Self) {
        self.energy_kwh += other.energy_kwh;
        self.cost += other.cost;
        self.emissions_kg += other.emissions_kg;
    }

    fn results(&self, scope: &Scope, scenario: &str, period: Period) -> [MetricResult; 3] {
        [
            MetricResult::new(
                MetricKind::EnergyKwh,
                scope.clone(),
                scenario,
                period,
                self.energy_kwh,
            ),
            MetricResult::new(MetricKind::Cost, scope.clone(), scenario, period, self.cost),
            MetricResult::new(
                MetricKind::EmissionsKg,
                scope.clone(),
                scenario,
                period,
                self.emissions_kg,
            ),
        ]
    }
}

/// Peak demand with the start of the interval it occurred in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakDemand {
    pub kw: f64,
    pub at: DateTime<FixedOffset>,
}

/// Per-scenario secondary metrics that need no baseline.
#[derive(Debug, Default, Clone, Copy)]
pub struct SecondaryMetricsCalculator;

impl SecondaryMetricsCalculator {
    /// Evaluates the given complete days of a scenario at building and
    /// portfolio scope, plus period totals and the period peak.
    pub fn evaluate(scenario: &AlignedScenario, days: &[NaiveDate]) -> MetricSet {
        let name = scenario.name();
        let hours = scenario.resolution().hours();
        let building_ids: Vec<&str> = scenario.building_ids().collect();

        let mut set = MetricSet::default();
        let mut building_totals = vec![EnergyTotals::default(); building_ids.len()];
        let mut portfolio_total = EnergyTotals::default();
        let mut period_peak: Option<PeakDemand> = None;

        for &date in days {
            let Some(window) = scenario.day(date) else {
                continue;
            };
            let stamps = scenario.day_timestamps(window);
            let period = Period::Day(date);

            let mut portfolio_day = EnergyTotals::default();
            for (building, total) in building_ids.iter().zip(building_totals.iter_mut()) {
                let Some(readings) = scenario.building_day(building, date) else {
                    continue;
                };
                let scope = Scope::Building(building.to_string());
                let energy = EnergyTotals::from_readings(&readings, hours);
                total.add(energy);
                portfolio_day.add(energy);
                set.daily.extend(energy.results(&scope, name, period));

                let demand: Vec<f64> = readings.iter().map(|r| r.demand_kw).collect();
                if let Some(shape) = LoadShape::from_demand(&demand) {
                    set.daily.extend(shape_results(&shape, stamps, &scope, name, period));
                }
            }
            portfolio_total.add(portfolio_day);
            set.daily
                .extend(portfolio_day.results(&Scope::Portfolio, name, period));

            let Some(demand) = scenario.portfolio_day(date) else {
                continue;
            };
            if let Some(shape) = LoadShape::from_demand(&demand) {
                set.daily
                    .extend(shape_results(&shape, stamps, &Scope::Portfolio, name, period));
                let at = stamps[shape.peak_index];
                if period_peak.is_none_or(|p| shape.peak_kw > p.kw) {
                    period_peak = Some(PeakDemand { kw: shape.peak_kw, at });
                }
            }
        }

        for (building, total) in building_ids.iter().zip(building_totals) {
            let scope = Scope::Building(building.to_string());
            set.totals.extend(total.results(&scope, name, Period::Total));
        }
        set.totals
            .extend(portfolio_total.results(&Scope::Portfolio, name, Period::Total));
        if let Some(peak) = period_peak {
            set.totals.push(
                MetricResult::new(
                    MetricKind::PeakDemandKw,
                    Scope::Portfolio,
                    name,
                    Period::Total,
                    peak.kw,
                )
                .at(peak.at),
            );
        }
        set
    }
}

fn shape_results(
    shape: &LoadShape,
    stamps: &[DateTime<FixedOffset>],
    scope: &Scope,
    scenario: &str,
    period: Period,
) -> Vec<MetricResult> {
    let mut peak = MetricResult::new(
        MetricKind::DailyPeakKw,
        scope.clone(),
        scenario,
        period,
        shape.peak_kw,
    );
    if let Some(&at) = stamps.get(shape.peak_index) {
        peak = peak.at(at);
    }
    vec![
        peak,
        MetricResult::new(
            MetricKind::PeakToValley,
            scope.clone(),
            scenario,
            period,
            shape.peak_to_valley(),
        ),
        MetricResult::new(
            MetricKind::LoadFactor,
            scope.clone(),
            scenario,
            period,
            shape.load_factor(),
        ),
        MetricResult::new(
            MetricKind::RampingKw,
            scope.clone(),
            scenario,
            period,
            shape.ramping_kw,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use approx::assert_relative_eq;
    use chrono::TimeDelta;

    use super::*;
    use crate::eval::align::TimeSeriesAligner;
    use crate::eval::types::{Resolution, Sample, ScenarioRun};

    #[test]
    fn constant_day_is_flat() {
        let shape = LoadShape::from_demand(&[100.0; 24]).unwrap();
        assert_eq!(shape.ramping_kw, 0.0);
        assert_eq!(shape.peak_to_valley().value(), Some(1.0));
        assert_eq!(shape.load_factor().value(), Some(1.0));
    }

    #[test]
    fn alternating_day_ramps() {
        let demand: Vec<f64> = (0..24)
            .map(|i| if i % 2 == 0 { 100.0 } else { 120.0 })
            .collect();
        let shape = LoadShape::from_demand(&demand).unwrap();
        assert_relative_eq!(shape.ramping_kw, 460.0);
        assert_eq!(shape.peak_index, 1);
        assert_relative_eq!(shape.peak_to_valley().value().unwrap(), 1.2);
        assert_relative_eq!(shape.load_factor().value().unwrap(), 110.0 / 120.0);
    }

    #[test]
    fn non_positive_extremes_are_undefined() {
        let shape = LoadShape::from_demand(&[-2.0, 0.0, 3.0]).unwrap();
        assert_eq!(
            shape.peak_to_valley().undefined_reason(),
            Some(UndefinedMetric::NonPositiveMinimum)
        );
        let export_only = LoadShape::from_demand(&[-2.0, -1.0]).unwrap();
        assert_eq!(
            export_only.load_factor().undefined_reason(),
            Some(UndefinedMetric::NonPositivePeak)
        );
        assert!(LoadShape::from_demand(&[]).is_none());
    }

    #[test]
    fn energy_totals_weight_by_interval() {
        let r = Reading {
            demand_kw: 4.0,
            tariff: 0.5,
            carbon_intensity: 0.2,
            ..Reading::default()
        };
        let totals = EnergyTotals::from_readings(&[r; 4], 0.25);
        assert_relative_eq!(totals.energy_kwh, 4.0);
        assert_relative_eq!(totals.cost, 2.0);
        assert_relative_eq!(totals.emissions_kg, 0.8);
    }

    #[test]
    fn period_peak_carries_timestamp() {
        let start = DateTime::parse_from_rfc3339("2024-01-01T00:00:00+00:00").unwrap();
        let samples: Vec<Sample> = (0..48)
            .map(|i| {
                let kw = if i == 30 { 50.0 } else { 10.0 };
                Sample::new(
                    start + TimeDelta::hours(i),
                    Reading {
                        demand_kw: kw,
                        ..Reading::default()
                    },
                )
            })
            .collect();
        let buildings: BTreeMap<String, Vec<Sample>> = [("A".to_string(), samples)].into();
        let aligned = TimeSeriesAligner::new(Resolution::Hourly, 4)
            .align(&ScenarioRun::baseline("base", buildings))
            .unwrap();
        let days: Vec<NaiveDate> = aligned.valid_days().map(|d| d.date).collect();
        let set = SecondaryMetricsCalculator::evaluate(&aligned, &days);

        let peak = set
            .totals
            .iter()
            .find(|r| r.metric == MetricKind::PeakDemandKw)
            .unwrap();
        assert_eq!(peak.value.value(), Some(50.0));
        assert_eq!(peak.timestamp, Some(start + TimeDelta::hours(30)));

        let daily_peaks = set
            .daily
            .iter()
            .filter(|r| r.metric == MetricKind::DailyPeakKw && r.scope == Scope::Portfolio)
            .count();
        assert_eq!(daily_peaks, 2);

        let energy = set
            .totals
            .iter()
            .find(|r| r.metric == MetricKind::EnergyKwh && r.scope == Scope::Portfolio)
            .unwrap();
        assert_eq!(energy.value.value(), Some(47.0 * 10.0 + 50.0));
    }
}
