//! Paired baseline-vs-flexible comparisons on common valid days.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use super::align::AlignedScenario;
use super::error::{DataError, UndefinedMetric};
use super::secondary::{EnergyTotals, LoadShape};
use super::stats::{coefficient_of_variation, gini};
use super::types::{MetricKind, MetricResult, MetricSet, MetricValue, Period, Reading, Scope};

/// Why a day was left out of a baseline/flexible comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Complete in the flexible run only.
    MissingFromBaseline,
    /// Complete in the baseline only.
    MissingFromFlexible,
}

/// A day evaluated on one side of a comparison but not the other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedDay {
    /// Flexible scenario of the comparison.
    pub scenario: String,
    pub date: NaiveDate,
    pub reason: ExclusionReason,
}

/// Days both runs can be compared on, plus the days that had to be dropped.
#[derive(Debug, Clone, Default)]
pub struct PairedDays {
    pub days: Vec<NaiveDate>,
    pub excluded: Vec<ExcludedDay>,
}

/// `(baseline - flexible) / baseline × 100`; positive when the flexible run
/// uses less.
pub fn percent_change(baseline: f64, flexible: f64) -> MetricValue {
    MetricValue::ratio(
        baseline - flexible,
        baseline,
        100.0,
        UndefinedMetric::ZeroBaseline,
    )
}

/// Flexibility activation of one building over a day (kWh): absolute
/// deviation of battery and heat-pump power from the baseline.
pub fn flexibility_activation_kwh(
    baseline: &[Reading],
    flexible: &[Reading],
    interval_hours: f64,
) -> f64 {
    baseline
        .iter()
        .zip(flexible)
        .map(|(b, f)| {
            ((f.battery_kw - b.battery_kw).abs() + (f.heat_pump_kw - b.heat_pump_kw).abs())
                * interval_hours
        })
        .sum()
}

/// Compares one flexible run against the baseline.
///
/// Both runs are borrowed read-only; neither references the other.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScenarioComparator;

impl ScenarioComparator {
    /// Intersects the complete days of both runs that pass `include`.
    ///
    /// # Errors
    ///
    /// Returns `DataError::BuildingMismatch` when the building sets differ and
    /// `DataError::NoCommonDays` when the intersection is empty.
    pub fn pair(
        baseline: &AlignedScenario,
        flexible: &AlignedScenario,
        include: impl Fn(NaiveDate) -> bool,
    ) -> Result<PairedDays, DataError> {
        let base_ids: BTreeSet<&str> = baseline.building_ids().collect();
        let flex_ids: BTreeSet<&str> = flexible.building_ids().collect();
        if base_ids != flex_ids {
            return Err(DataError::BuildingMismatch {
                baseline: baseline.name().to_string(),
                flexible: flexible.name().to_string(),
                buildings: base_ids
                    .symmetric_difference(&flex_ids)
                    .map(|id| id.to_string())
                    .collect(),
            });
        }

        let valid = |s: &AlignedScenario| -> BTreeSet<NaiveDate> {
            s.valid_days().map(|d| d.date).filter(|d| include(*d)).collect()
        };
        let base_days = valid(baseline);
        let flex_days = valid(flexible);

        let mut paired = PairedDays {
            days: base_days.intersection(&flex_days).copied().collect(),
            excluded: Vec::new(),
        };
        let one_sided = base_days
            .difference(&flex_days)
            .map(|d| (*d, ExclusionReason::MissingFromFlexible))
            .chain(
                flex_days
                    .difference(&base_days)
                    .map(|d| (*d, ExclusionReason::MissingFromBaseline)),
            );
        for (date, reason) in one_sided {
            warn!(
                baseline = baseline.name(),
                scenario = flexible.name(),
                %date,
                ?reason,
                "day excluded from comparison"
            );
            paired.excluded.push(ExcludedDay {
                scenario: flexible.name().to_string(),
                date,
                reason,
            });
        }
        paired.excluded.sort_by_key(|e| e.date);

        if paired.days.is_empty() {
            return Err(DataError::NoCommonDays {
                baseline: baseline.name().to_string(),
                flexible: flexible.name().to_string(),
            });
        }
        Ok(paired)
    }

    /// Computes the paired metrics on the given common days.
    ///
    /// Results are attributed to the flexible scenario.
    pub fn compare(
        baseline: &AlignedScenario,
        flexible: &AlignedScenario,
        days: &[NaiveDate],
    ) -> MetricSet {
        let name = flexible.name();
        let hours = flexible.resolution().hours();
        let building_ids: Vec<&str> = baseline.building_ids().collect();

        let mut set = MetricSet::default();
        let mut base_totals = vec![EnergyTotals::default(); building_ids.len()];
        let mut flex_totals = vec![EnergyTotals::default(); building_ids.len()];
        let mut base_peak: Option<f64> = None;
        let mut flex_peak: Option<f64> = None;

        for &date in days {
            let period = Period::Day(date);
            let mut base_day = EnergyTotals::default();
            let mut flex_day = EnergyTotals::default();
            let mut activations = Vec::with_capacity(building_ids.len());

            for (i, building) in building_ids.iter().enumerate() {
                let (Some(b), Some(f)) = (
                    baseline.building_day(building, date),
                    flexible.building_day(building, date),
                ) else {
                    continue;
                };
                let scope = Scope::Building(building.to_string());
                let b_energy = EnergyTotals::from_readings(&b, hours);
                let f_energy = EnergyTotals::from_readings(&f, hours);
                base_totals[i].add(b_energy);
                flex_totals[i].add(f_energy);
                base_day.add(b_energy);
                flex_day.add(f_energy);
                set.daily
                    .extend(change_results(&b_energy, &f_energy, &scope, name, period));

                let activation = flexibility_activation_kwh(&b, &f, hours);
                activations.push(activation);
                set.daily.push(MetricResult::new(
                    MetricKind::FlexibilityActivationKwh,
                    scope,
                    name,
                    period,
                    activation,
                ));
            }
            set.daily.extend(change_results(
                &base_day,
                &flex_day,
                &Scope::Portfolio,
                name,
                period,
            ));
            set.daily.extend(fairness_results(&activations, name, period));

            let peaks = (
                baseline
                    .portfolio_day(date)
                    .and_then(|d| LoadShape::from_demand(&d)),
                flexible
                    .portfolio_day(date)
                    .and_then(|d| LoadShape::from_demand(&d)),
            );
            if let (Some(b), Some(f)) = peaks {
                base_peak = Some(base_peak.map_or(b.peak_kw, |p| p.max(b.peak_kw)));
                flex_peak = Some(flex_peak.map_or(f.peak_kw, |p| p.max(f.peak_kw)));
                set.daily.push(MetricResult::new(
                    MetricKind::PeakReductionPercent,
                    Scope::Portfolio,
                    name,
                    period,
                    percent_change(b.peak_kw, f.peak_kw),
                ));
            }
        }

        let mut base_portfolio = EnergyTotals::default();
        let mut flex_portfolio = EnergyTotals::default();
        for (i, building) in building_ids.iter().enumerate() {
            base_portfolio.add(base_totals[i]);
            flex_portfolio.add(flex_totals[i]);
            set.totals.extend(change_results(
                &base_totals[i],
                &flex_totals[i],
                &Scope::Building(building.to_string()),
                name,
                Period::Total,
            ));
        }
        set.totals.extend(change_results(
            &base_portfolio,
            &flex_portfolio,
            &Scope::Portfolio,
            name,
            Period::Total,
        ));
        if let (Some(b), Some(f)) = (base_peak, flex_peak) {
            set.totals.push(MetricResult::new(
                MetricKind::PeakReductionPercent,
                Scope::Portfolio,
                name,
                Period::Total,
                percent_change(b, f),
            ));
        }
        set
    }
}

fn change_results(
    baseline: &EnergyTotals,
    flexible: &EnergyTotals,
    scope: &Scope,
    scenario: &str,
    period: Period,
) -> [MetricResult; 2] {
    [
        MetricResult::new(
            MetricKind::CostChangePercent,
            scope.clone(),
            scenario,
            period,
            percent_change(baseline.cost, flexible.cost),
        ),
        MetricResult::new(
            MetricKind::SiteEnergyChangePercent,
            scope.clone(),
            scenario,
            period,
            percent_change(baseline.energy_kwh, flexible.energy_kwh),
        ),
    ]
}

fn fairness_results(activations: &[f64], scenario: &str, period: Period) -> [MetricResult; 2] {
    let dispersion = |f: fn(&[f64]) -> Option<f64>| {
        f(activations).map_or(
            MetricValue::Undefined(UndefinedMetric::ZeroActivation),
            MetricValue::Defined,
        )
    };
    [
        MetricResult::new(
            MetricKind::FairnessCv,
            Scope::Portfolio,
            scenario,
            period,
            dispersion(coefficient_of_variation),
        ),
        MetricResult::new(
            MetricKind::FairnessGini,
            Scope::Portfolio,
            scenario,
            period,
            dispersion(gini),
        ),
    ]
}
