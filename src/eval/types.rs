//! Core evaluation types: resolution, comfort season, samples, scenario runs
//! and the tagged metric result.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize, Serializer};

use super::error::UndefinedMetric;

/// Length of a complete calendar day in hours.
pub const DAY_LENGTH_HOURS: f64 = 24.0;

/// Fixed interval resolution shared by every series in an evaluation.
///
/// # Examples
///
/// ```
/// use portfolio_eval::eval::types::Resolution;
///
/// let res = Resolution::from_minutes(15).unwrap();
/// assert_eq!(res.intervals_per_day(), 96);
/// assert_eq!(res.hours(), 0.25);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// 15-minute intervals (96 per day).
    FifteenMinutes,
    /// 60-minute intervals (24 per day).
    Hourly,
}

impl Resolution {
    /// Maps a whole number of minutes onto a supported resolution.
    pub const fn from_minutes(minutes: i64) -> Option<Self> {
        match minutes {
            15 => Some(Self::FifteenMinutes),
            60 => Some(Self::Hourly),
            _ => None,
        }
    }

    /// Interval length in minutes.
    pub const fn minutes(self) -> i64 {
        match self {
            Self::FifteenMinutes => 15,
            Self::Hourly => 60,
        }
    }

    /// Interval length in hours.
    pub fn hours(self) -> f64 {
        self.minutes() as f64 / 60.0
    }

    /// Number of intervals in a complete calendar day.
    pub const fn intervals_per_day(self) -> usize {
        (24 * 60 / self.minutes()) as usize
    }

    /// Interval length as a time delta.
    pub fn delta(self) -> TimeDelta {
        TimeDelta::minutes(self.minutes())
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min", self.minutes())
    }
}

/// Test-month season selecting the indoor comfort band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    #[default]
    Heating,
    Cooling,
}

impl Season {
    /// Comfort band that applies for the whole test period.
    pub const fn comfort_band(self) -> ComfortBand {
        match self {
            Self::Heating => ComfortBand {
                lower_c: 20.0,
                upper_c: 24.0,
            },
            Self::Cooling => ComfortBand {
                lower_c: 22.0,
                upper_c: 26.0,
            },
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heating => f.write_str("heating"),
            Self::Cooling => f.write_str("cooling"),
        }
    }
}

/// Inclusive indoor dry-bulb temperature band (°C).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComfortBand {
    pub lower_c: f64,
    pub upper_c: f64,
}

impl ComfortBand {
    /// Returns `true` when the temperature lies inside the band (bounds included).
    pub fn contains(&self, temperature_c: f64) -> bool {
        (self.lower_c..=self.upper_c).contains(&temperature_c)
    }
}

/// Per-interval values of one building, without the timestamp.
///
/// Power-like fields are interval averages in kW; the per-interval energy is
/// the power times the interval length.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Reading {
    /// Net electrical demand (kW; positive = import).
    pub demand_kw: f64,
    /// Indoor dry-bulb temperature (°C).
    pub indoor_temp_c: f64,
    /// PV generation (kW, positive magnitude).
    pub pv_kw: f64,
    /// Battery state of charge (0.0 to 1.0).
    pub battery_soc: f64,
    /// Battery power (kW; positive = charge).
    pub battery_kw: f64,
    /// Heat-pump electrical power (kW).
    pub heat_pump_kw: f64,
    /// Grid carbon intensity (kg CO2e/kWh).
    pub carbon_intensity: f64,
    /// Tariff rate (currency/kWh).
    pub tariff: f64,
}

impl Reading {
    /// Linear interpolation towards `other`; `fraction` 0.0 yields `self`.
    pub fn lerp(&self, other: &Self, fraction: f64) -> Self {
        let mix = |a: f64, b: f64| a + (b - a) * fraction;
        Self {
            demand_kw: mix(self.demand_kw, other.demand_kw),
            indoor_temp_c: mix(self.indoor_temp_c, other.indoor_temp_c),
            pv_kw: mix(self.pv_kw, other.pv_kw),
            battery_soc: mix(self.battery_soc, other.battery_soc),
            battery_kw: mix(self.battery_kw, other.battery_kw),
            heat_pump_kw: mix(self.heat_pump_kw, other.heat_pump_kw),
            carbon_intensity: mix(self.carbon_intensity, other.carbon_intensity),
            tariff: mix(self.tariff, other.tariff),
        }
    }

    /// Averages consecutive sub-intervals into one coarser interval.
    ///
    /// Rates and temperatures are averaged, which preserves interval energy;
    /// state of charge is a state and takes the last sub-interval value.
    /// Returns `None` for an empty slice.
    pub fn mean_of(parts: &[Self]) -> Option<Self> {
        let last = parts.last()?;
        let n = parts.len() as f64;
        let avg = |f: fn(&Self) -> f64| parts.iter().map(f).sum::<f64>() / n;
        Some(Self {
            demand_kw: avg(|r| r.demand_kw),
            indoor_temp_c: avg(|r| r.indoor_temp_c),
            pv_kw: avg(|r| r.pv_kw),
            battery_soc: last.battery_soc,
            battery_kw: avg(|r| r.battery_kw),
            heat_pump_kw: avg(|r| r.heat_pump_kw),
            carbon_intensity: avg(|r| r.carbon_intensity),
            tariff: avg(|r| r.tariff),
        })
    }

    /// Demand energy over one interval (kWh).
    pub fn energy_kwh(&self, interval_hours: f64) -> f64 {
        self.demand_kw * interval_hours
    }

    /// Energy cost over one interval.
    pub fn cost(&self, interval_hours: f64) -> f64 {
        self.energy_kwh(interval_hours) * self.tariff
    }

    /// Emissions over one interval (kg CO2e).
    pub fn emissions_kg(&self, interval_hours: f64) -> f64 {
        self.energy_kwh(interval_hours) * self.carbon_intensity
    }

    /// Name of the first non-finite field, if any.
    pub fn non_finite_field(&self) -> Option<&'static str> {
        [
            ("demand_kw", self.demand_kw),
            ("indoor_temp_c", self.indoor_temp_c),
            ("pv_kw", self.pv_kw),
            ("battery_soc", self.battery_soc),
            ("battery_kw", self.battery_kw),
            ("heat_pump_kw", self.heat_pump_kw),
            ("carbon_intensity", self.carbon_intensity),
            ("tariff", self.tariff),
        ]
        .into_iter()
        .find_map(|(name, value)| (!value.is_finite()).then_some(name))
    }
}

/// One timestamped record of a building series. The timestamp marks the
/// start of the interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: DateTime<FixedOffset>,
    pub reading: Reading,
}

impl Sample {
    pub fn new(timestamp: DateTime<FixedOffset>, reading: Reading) -> Self {
        Self { timestamp, reading }
    }
}

/// Control strategy a scenario run was produced with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyLabel {
    Baseline,
    Flexible(String),
}

impl fmt::Display for StrategyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Baseline => f.write_str("baseline"),
            Self::Flexible(name) => write!(f, "flexible:{name}"),
        }
    }
}

/// A named bundle of per-building raw series sharing one control strategy.
///
/// Immutable after construction; every calculator borrows it read-only.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    name: String,
    strategy: StrategyLabel,
    buildings: BTreeMap<String, Vec<Sample>>,
}

impl ScenarioRun {
    pub fn new(
        name: impl Into<String>,
        strategy: StrategyLabel,
        buildings: BTreeMap<String, Vec<Sample>>,
    ) -> Self {
        Self {
            name: name.into(),
            strategy,
            buildings,
        }
    }

    /// Creates a baseline run.
    pub fn baseline(name: impl Into<String>, buildings: BTreeMap<String, Vec<Sample>>) -> Self {
        Self::new(name, StrategyLabel::Baseline, buildings)
    }

    /// Creates a flexible run labelled with its control strategy.
    pub fn flexible(
        name: impl Into<String>,
        strategy: impl Into<String>,
        buildings: BTreeMap<String, Vec<Sample>>,
    ) -> Self {
        Self::new(name, StrategyLabel::Flexible(strategy.into()), buildings)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> &StrategyLabel {
        &self.strategy
    }

    pub fn is_baseline(&self) -> bool {
        self.strategy == StrategyLabel::Baseline
    }

    pub fn buildings(&self) -> &BTreeMap<String, Vec<Sample>> {
        &self.buildings
    }
}

/// Metric catalogue. Serialized with snake_case names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Nmbe,
    CvRmse,
    ExceedanceHours,
    ExceedancePercent,
    EnergyKwh,
    Cost,
    EmissionsKg,
    DailyPeakKw,
    PeakDemandKw,
    PeakToValley,
    LoadFactor,
    RampingKw,
    CostChangePercent,
    SiteEnergyChangePercent,
    PeakReductionPercent,
    FlexibilityActivationKwh,
    FairnessCv,
    FairnessGini,
}

impl MetricKind {
    pub const ALL: &[Self] = &[
        Self::Nmbe,
        Self::CvRmse,
        Self::ExceedanceHours,
        Self::ExceedancePercent,
        Self::EnergyKwh,
        Self::Cost,
        Self::EmissionsKg,
        Self::DailyPeakKw,
        Self::PeakDemandKw,
        Self::PeakToValley,
        Self::LoadFactor,
        Self::RampingKw,
        Self::CostChangePercent,
        Self::SiteEnergyChangePercent,
        Self::PeakReductionPercent,
        Self::FlexibilityActivationKwh,
        Self::FairnessCv,
        Self::FairnessGini,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Nmbe => "nmbe",
            Self::CvRmse => "cv_rmse",
            Self::ExceedanceHours => "exceedance_hours",
            Self::ExceedancePercent => "exceedance_percent",
            Self::EnergyKwh => "energy_kwh",
            Self::Cost => "cost",
            Self::EmissionsKg => "emissions_kg",
            Self::DailyPeakKw => "daily_peak_kw",
            Self::PeakDemandKw => "peak_demand_kw",
            Self::PeakToValley => "peak_to_valley",
            Self::LoadFactor => "load_factor",
            Self::RampingKw => "ramping_kw",
            Self::CostChangePercent => "cost_change_percent",
            Self::SiteEnergyChangePercent => "site_energy_change_percent",
            Self::PeakReductionPercent => "peak_reduction_percent",
            Self::FlexibilityActivationKwh => "flexibility_activation_kwh",
            Self::FairnessCv => "fairness_cv",
            Self::FairnessGini => "fairness_gini",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown metric \"{s}\""))
    }
}

/// Level a metric value was computed at.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Portfolio,
    Building(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Portfolio => f.write_str("portfolio"),
            Self::Building(id) => write!(f, "building:{id}"),
        }
    }
}

/// Calendar month used to group daily values into distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Time span a metric value covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Day(NaiveDate),
    /// The whole evaluated period of the scenario.
    Total,
}

impl Period {
    pub fn date(self) -> Option<NaiveDate> {
        match self {
            Self::Day(date) => Some(date),
            Self::Total => None,
        }
    }
}

/// A metric value, or the reason it is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "value")]
pub enum MetricValue {
    Defined(f64),
    Undefined(UndefinedMetric),
}

impl MetricValue {
    /// `numerator / denominator × scale`, undefined when the denominator is zero.
    pub fn ratio(numerator: f64, denominator: f64, scale: f64, reason: UndefinedMetric) -> Self {
        if denominator == 0.0 {
            Self::Undefined(reason)
        } else {
            Self::Defined(numerator / denominator * scale)
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Self::Defined(v) => Some(v),
            Self::Undefined(_) => None,
        }
    }

    pub fn undefined_reason(self) -> Option<UndefinedMetric> {
        match self {
            Self::Defined(_) => None,
            Self::Undefined(reason) => Some(reason),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::Defined(value)
    }
}

/// One computed metric value. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResult {
    pub metric: MetricKind,
    pub scope: Scope,
    pub scenario: String,
    pub period: Period,
    pub value: MetricValue,
    /// Instant of the extremum for peak metrics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<FixedOffset>>,
}

impl MetricResult {
    pub fn new(
        metric: MetricKind,
        scope: Scope,
        scenario: &str,
        period: Period,
        value: impl Into<MetricValue>,
    ) -> Self {
        Self {
            metric,
            scope,
            scenario: scenario.to_string(),
            period,
            value: value.into(),
            timestamp: None,
        }
    }

    #[must_use]
    pub fn at(mut self, timestamp: DateTime<FixedOffset>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Day-level and period-level results produced by one calculator pass.
#[derive(Debug, Clone, Default)]
pub struct MetricSet {
    pub daily: Vec<MetricResult>,
    pub totals: Vec<MetricResult>,
}

impl MetricSet {
    pub fn extend(&mut self, other: Self) {
        self.daily.extend(other.daily);
        self.totals.extend(other.totals);
    }
}
