//! Report assembly: monthly distribution summaries over the per-day table.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use super::align::{AlignedScenario, DayStatus, GapReport};
use super::compare::ExcludedDay;
use super::stats::DistributionSummary;
use super::types::{MetricKind, MetricResult, MetricSet, Month, Period, Resolution, Scope, Season};

/// Distribution of one metric for one scope, scenario and month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub metric: MetricKind,
    pub scope: Scope,
    pub scenario: String,
    pub month: Month,
    #[serde(flatten)]
    pub summary: DistributionSummary,
}

/// A day kept for traceability but left out of per-day metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedDay {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub status: DayStatus,
}

/// Input-quality findings for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQuality {
    pub scenario: String,
    pub flagged_days: Vec<FlaggedDay>,
    pub gaps: Vec<GapReport>,
}

impl DataQuality {
    pub fn of(scenario: &AlignedScenario) -> Self {
        Self {
            scenario: scenario.name().to_string(),
            flagged_days: scenario
                .days()
                .iter()
                .filter(|d| !d.is_complete())
                .map(|d| FlaggedDay {
                    date: d.date,
                    status: d.status,
                })
                .collect(),
            gaps: scenario.gaps().to_vec(),
        }
    }
}

/// A flexible scenario that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioFailure {
    pub scenario: String,
    pub error: String,
}

/// Immutable result of one evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub resolution: Resolution,
    pub season: Season,
    pub baseline: String,
    /// Flexible scenarios that were evaluated successfully.
    pub scenarios: Vec<String>,
    /// Per-day values, ordered by scenario, date, metric and scope.
    pub daily: Vec<MetricResult>,
    /// Whole-period values.
    pub totals: Vec<MetricResult>,
    pub summaries: Vec<SummaryRow>,
    pub excluded_days: Vec<ExcludedDay>,
    pub data_quality: Vec<DataQuality>,
    pub failures: Vec<ScenarioFailure>,
}

impl MetricsReport {
    /// Monthly summaries of a metric for one scope and scenario.
    pub fn summary<'a>(
        &'a self,
        metric: MetricKind,
        scope: &'a Scope,
        scenario: &'a str,
    ) -> impl Iterator<Item = &'a SummaryRow> {
        self.summaries
            .iter()
            .filter(move |r| r.metric == metric && &r.scope == scope && r.scenario == scenario)
    }

    /// Day-level values of a metric as a time series.
    pub fn daily_values<'a>(
        &'a self,
        metric: MetricKind,
        scope: &'a Scope,
        scenario: &'a str,
    ) -> impl Iterator<Item = &'a MetricResult> {
        self.daily
            .iter()
            .filter(move |r| r.metric == metric && &r.scope == scope && r.scenario == scenario)
    }

    /// Period value of a metric.
    pub fn total(
        &self,
        metric: MetricKind,
        scope: &Scope,
        scenario: &str,
    ) -> Option<&MetricResult> {
        self.totals
            .iter()
            .find(|r| r.metric == metric && &r.scope == scope && r.scenario == scenario)
    }

    /// Baseline followed by every successfully evaluated flexible scenario.
    pub fn all_scenarios(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.baseline.as_str()).chain(self.scenarios.iter().map(String::as_str))
    }
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Metrics Report ---")?;
        writeln!(f, "Resolution:            {}", self.resolution)?;
        writeln!(f, "Season:                {}", self.season)?;
        writeln!(f, "Baseline:              {}", self.baseline)?;

        let portfolio = Scope::Portfolio;
        for scenario in self.all_scenarios() {
            writeln!(f)?;
            writeln!(f, "[{scenario}]")?;
            let line = |metric: MetricKind| {
                self.total(metric, &portfolio, scenario)
                    .map(|r| match r.value.value() {
                        Some(v) => format!("{v:.2}"),
                        None => "n/a".to_string(),
                    })
            };
            for metric in [
                MetricKind::EnergyKwh,
                MetricKind::Cost,
                MetricKind::EmissionsKg,
                MetricKind::ExceedanceHours,
                MetricKind::CostChangePercent,
                MetricKind::SiteEnergyChangePercent,
                MetricKind::PeakReductionPercent,
            ] {
                if let Some(v) = line(metric) {
                    writeln!(f, "{:<23}{v}", format!("{metric}:"))?;
                }
            }
            if let Some(peak) = self.total(MetricKind::PeakDemandKw, &portfolio, scenario) {
                let at = peak
                    .timestamp
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default();
                let kw = peak.value.value().unwrap_or(f64::NAN);
                writeln!(f, "{:<23}{kw:.2} at {at}", "peak_demand_kw:")?;
            }
            for metric in [MetricKind::Nmbe, MetricKind::CvRmse] {
                for row in self.summary(metric, &portfolio, scenario) {
                    let median = row
                        .summary
                        .median
                        .map_or_else(|| "n/a".to_string(), |m| format!("{m:.2}"));
                    writeln!(
                        f,
                        "{:<23}median {median} over {} day(s)",
                        format!("{metric} {}:", row.month),
                        row.summary.count
                    )?;
                }
            }
        }

        writeln!(f)?;
        writeln!(f, "Excluded days:         {}", self.excluded_days.len())?;
        let flagged: usize = self.data_quality.iter().map(|q| q.flagged_days.len()).sum();
        writeln!(f, "Flagged days:          {flagged}")?;
        write!(f, "Failed scenarios:      {}", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  {}: {}", failure.scenario, failure.error)?;
        }
        Ok(())
    }
}

/// Collects per-scenario results and builds the final report.
///
/// Summaries are only computed in [`finish`](Self::finish), once every
/// per-day value is in.
#[derive(Debug)]
pub struct ReportAssembler {
    resolution: Resolution,
    season: Season,
    baseline: String,
    scenarios: Vec<String>,
    metrics: MetricSet,
    excluded_days: Vec<ExcludedDay>,
    data_quality: Vec<DataQuality>,
    failures: Vec<ScenarioFailure>,
}

impl ReportAssembler {
    pub fn new(resolution: Resolution, season: Season, baseline: &str) -> Self {
        Self {
            resolution,
            season,
            baseline: baseline.to_string(),
            scenarios: Vec::new(),
            metrics: MetricSet::default(),
            excluded_days: Vec::new(),
            data_quality: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn push_scenario(&mut self, name: &str) {
        self.scenarios.push(name.to_string());
    }

    pub fn push_metrics(&mut self, metrics: MetricSet) {
        self.metrics.extend(metrics);
    }

    pub fn push_excluded(&mut self, days: Vec<ExcludedDay>) {
        self.excluded_days.extend(days);
    }

    pub fn push_data_quality(&mut self, scenario: &AlignedScenario) {
        self.data_quality.push(DataQuality::of(scenario));
    }

    pub fn push_failure(&mut self, scenario: &str, error: impl fmt::Display) {
        self.failures.push(ScenarioFailure {
            scenario: scenario.to_string(),
            error: error.to_string(),
        });
    }

    /// Sorts the day table and builds monthly summaries from it.
    pub fn finish(self) -> MetricsReport {
        let mut daily = self.metrics.daily;
        let order = scenario_order(&self.baseline, &self.scenarios);
        let rank = |name: &str| order.get(name).copied().unwrap_or(usize::MAX);
        daily.sort_by(|a, b| {
            rank(&a.scenario)
                .cmp(&rank(&b.scenario))
                .then(a.period.cmp(&b.period))
                .then(a.metric.cmp(&b.metric))
                .then(a.scope.cmp(&b.scope))
        });

        let summaries = summarize(&daily);
        MetricsReport {
            resolution: self.resolution,
            season: self.season,
            baseline: self.baseline,
            scenarios: self.scenarios,
            daily,
            totals: self.metrics.totals,
            summaries,
            excluded_days: self.excluded_days,
            data_quality: self.data_quality,
            failures: self.failures,
        }
    }
}

fn scenario_order<'a>(baseline: &'a str, scenarios: &'a [String]) -> BTreeMap<&'a str, usize> {
    std::iter::once(baseline)
        .chain(scenarios.iter().map(String::as_str))
        .enumerate()
        .map(|(i, name)| (name, i))
        .collect()
}

/// Groups day values by metric, scope, scenario and month.
pub fn summarize(daily: &[MetricResult]) -> Vec<SummaryRow> {
    let mut groups: BTreeMap<(MetricKind, &Scope, &str, Month), Vec<Option<f64>>> = BTreeMap::new();
    for result in daily {
        let Period::Day(date) = result.period else {
            continue;
        };
        groups
            .entry((result.metric, &result.scope, result.scenario.as_str(), Month::of(date)))
            .or_default()
            .push(result.value.value());
    }

    groups
        .into_iter()
        .map(|((metric, scope, scenario, month), values)| SummaryRow {
            metric,
            scope: scope.clone(),
            scenario: scenario.to_string(),
            month,
            summary: DistributionSummary::from_values(values),
        })
        .collect()
}
