//! Calendar alignment of raw building series.
//!
//! Each building series is checked for monotonic, regular spacing, its short
//! gaps are interpolated at the native resolution, finer series are averaged
//! down to the configured resolution, and all buildings are trimmed to their
//! common calendar. Days are then classified as complete, partial or
//! incomplete.

use std::collections::BTreeMap;
use std::ops::Range;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::error::DataError;
use super::types::{Reading, Resolution, Sample, ScenarioRun, StrategyLabel};

/// One run of missing intervals found in a building series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapReport {
    pub building: String,
    /// Start of the first missing interval.
    pub start: DateTime<FixedOffset>,
    /// Missing intervals at the building's native resolution.
    pub missing_intervals: usize,
    /// Whether the gap was filled by linear interpolation.
    pub interpolated: bool,
}

/// Classification of one calendar day of an aligned scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum DayStatus {
    /// Full set of intervals with data for every building.
    Complete,
    /// Fewer or more intervals than a full day (data edge, daylight saving).
    Partial { intervals: usize },
    /// Full set of intervals, but some building values are unrecoverable.
    Incomplete { missing: usize },
}

/// Interval index range of one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub range: Range<usize>,
    pub status: DayStatus,
}

impl DayWindow {
    pub fn is_complete(&self) -> bool {
        self.status == DayStatus::Complete
    }
}

/// A scenario whose buildings share one fixed-resolution calendar.
#[derive(Debug, Clone)]
pub struct AlignedScenario {
    name: String,
    strategy: StrategyLabel,
    resolution: Resolution,
    timestamps: Vec<DateTime<FixedOffset>>,
    buildings: BTreeMap<String, Vec<Option<Reading>>>,
    days: Vec<DayWindow>,
    gaps: Vec<GapReport>,
}

impl AlignedScenario {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> &StrategyLabel {
        &self.strategy
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn timestamps(&self) -> &[DateTime<FixedOffset>] {
        &self.timestamps
    }

    pub fn building_ids(&self) -> impl Iterator<Item = &str> {
        self.buildings.keys().map(String::as_str)
    }

    pub fn days(&self) -> &[DayWindow] {
        &self.days
    }

    pub fn gaps(&self) -> &[GapReport] {
        &self.gaps
    }

    /// Complete days, in calendar order.
    pub fn valid_days(&self) -> impl Iterator<Item = &DayWindow> {
        self.days.iter().filter(|d| d.is_complete())
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayWindow> {
        self.days.iter().find(|d| d.date == date)
    }

    /// Readings of one building over a complete day.
    ///
    /// Returns `None` for an unknown building or a day that is not complete.
    pub fn building_day(&self, building: &str, date: NaiveDate) -> Option<Vec<Reading>> {
        let window = self.day(date).filter(|d| d.is_complete())?;
        let values = self.buildings.get(building)?;
        values[window.range.clone()].iter().copied().collect()
    }

    /// Portfolio aggregate demand (kW) over a complete day.
    pub fn portfolio_day(&self, date: NaiveDate) -> Option<Vec<f64>> {
        let window = self.day(date).filter(|d| d.is_complete())?;
        window
            .range
            .clone()
            .map(|i| self.portfolio_at(i))
            .collect()
    }

    /// Portfolio aggregate demand (kW) for every interval of the calendar;
    /// `None` where any building value is unrecoverable.
    pub fn portfolio_aggregate(&self) -> Vec<Option<f64>> {
        (0..self.timestamps.len())
            .map(|i| self.portfolio_at(i))
            .collect()
    }

    fn portfolio_at(&self, index: usize) -> Option<f64> {
        self.buildings
            .values()
            .map(|values| values[index].map(|r| r.demand_kw))
            .sum()
    }

    pub fn day_timestamps(&self, window: &DayWindow) -> &[DateTime<FixedOffset>] {
        &self.timestamps[window.range.clone()]
    }
}

/// Normalizes the raw series of a scenario onto a common calendar.
#[derive(Debug, Clone, Copy)]
pub struct TimeSeriesAligner {
    resolution: Resolution,
    max_gap_intervals: usize,
}

/// A single building's series after gap filling and resampling.
struct BuildingGrid {
    timestamps: Vec<DateTime<FixedOffset>>,
    values: Vec<Option<Reading>>,
}

impl TimeSeriesAligner {
    pub fn new(resolution: Resolution, max_gap_intervals: usize) -> Self {
        Self {
            resolution,
            max_gap_intervals,
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn max_gap_intervals(&self) -> usize {
        self.max_gap_intervals
    }

    /// Aligns all buildings of a scenario.
    ///
    /// The caller's run is borrowed read-only; the aligned copy is returned.
    ///
    /// # Errors
    ///
    /// Returns a `DataError` for non-monotonic, irregular, too coarse or
    /// non-finite series and for buildings whose calendars do not overlap.
    pub fn align(&self, run: &ScenarioRun) -> Result<AlignedScenario, DataError> {
        if run.buildings().is_empty() {
            return Err(DataError::EmptyScenario);
        }

        let mut gaps = Vec::new();
        let mut grids = BTreeMap::new();
        for (building, samples) in run.buildings() {
            let grid = self.align_building(building, samples, &mut gaps)?;
            grids.insert(building.clone(), grid);
        }

        let (start, end) = common_window(&grids, self.resolution)?;
        let len = usize::try_from((end - start).num_minutes() / self.resolution.minutes())
            .unwrap_or(0)
            + 1;

        let mut timestamps = Vec::new();
        let mut calendar_owner: Option<String> = None;
        let mut buildings = BTreeMap::new();
        for (building, grid) in grids {
            let Some(offset) = grid.timestamps.iter().position(|ts| *ts == start) else {
                return Err(DataError::MisalignedCalendars {
                    first: building.clone(),
                    second: building,
                });
            };
            if offset > 0 || grid.values.len() > offset + len {
                warn!(
                    scenario = run.name(),
                    building = %building,
                    dropped = grid.values.len() - len,
                    "trimming building series to the common calendar"
                );
            }
            let window = &grid.timestamps[offset..offset + len];
            // local days depend on the offset, so every building must agree on it
            if let Some(owner) = &calendar_owner {
                if !same_offsets(window, &timestamps) {
                    return Err(DataError::MisalignedCalendars {
                        first: owner.clone(),
                        second: building,
                    });
                }
            } else {
                timestamps = window.to_vec();
                calendar_owner = Some(building.clone());
            }
            buildings.insert(building, grid.values[offset..offset + len].to_vec());
        }

        let days = classify_days(&timestamps, &buildings, self.resolution);
        for day in days.iter().filter(|d| !d.is_complete()) {
            match day.status {
                DayStatus::Incomplete { missing } => warn!(
                    scenario = run.name(),
                    date = %day.date,
                    missing,
                    "day flagged incomplete"
                ),
                _ => debug!(scenario = run.name(), date = %day.date, "partial day excluded"),
            }
        }
        info!(
            scenario = run.name(),
            buildings = buildings.len(),
            intervals = timestamps.len(),
            complete_days = days.iter().filter(|d| d.is_complete()).count(),
            resolution = %self.resolution,
            "aligned scenario"
        );

        Ok(AlignedScenario {
            name: run.name().to_string(),
            strategy: run.strategy().clone(),
            resolution: self.resolution,
            timestamps,
            buildings,
            days,
            gaps,
        })
    }

    fn align_building(
        &self,
        building: &str,
        samples: &[Sample],
        gaps: &mut Vec<GapReport>,
    ) -> Result<BuildingGrid, DataError> {
        if let Some((field, at)) = samples
            .iter()
            .find_map(|s| s.reading.non_finite_field().map(|f| (f, s.timestamp)))
        {
            return Err(DataError::NonFinite {
                building: building.to_string(),
                field,
                at,
            });
        }

        let native = infer_resolution(building, samples)?;
        if native.minutes() > self.resolution.minutes() {
            return Err(DataError::CoarserThanConfigured {
                building: building.to_string(),
                found: native.minutes(),
                configured: self.resolution.minutes(),
            });
        }

        let grid = self.fill_gaps(building, samples, native, gaps);
        if native == self.resolution {
            Ok(grid)
        } else {
            debug!(building, from = %native, to = %self.resolution, "downsampling");
            Ok(downsample(grid, native, self.resolution))
        }
    }

    /// Expands the samples onto a contiguous native grid, interpolating gaps
    /// up to the configured length.
    fn fill_gaps(
        &self,
        building: &str,
        samples: &[Sample],
        native: Resolution,
        gaps: &mut Vec<GapReport>,
    ) -> BuildingGrid {
        let step = native.delta();
        let mut timestamps = Vec::with_capacity(samples.len());
        let mut values = Vec::with_capacity(samples.len());

        for (i, sample) in samples.iter().enumerate() {
            if let Some(prev) = i.checked_sub(1).map(|j| &samples[j]) {
                let steps = (sample.timestamp - prev.timestamp).num_minutes() / native.minutes();
                let missing = usize::try_from(steps - 1).unwrap_or(0);
                if missing > 0 {
                    let interpolated = missing <= self.max_gap_intervals;
                    gaps.push(GapReport {
                        building: building.to_string(),
                        start: prev.timestamp + step,
                        missing_intervals: missing,
                        interpolated,
                    });
                    for k in 1..=missing {
                        timestamps.push(prev.timestamp + step * k as i32);
                        values.push(interpolated.then(|| {
                            prev.reading
                                .lerp(&sample.reading, k as f64 / (missing + 1) as f64)
                        }));
                    }
                }
            }
            timestamps.push(sample.timestamp);
            values.push(Some(sample.reading));
        }

        BuildingGrid { timestamps, values }
    }
}

/// Infers the nominal resolution as the smallest timestamp delta.
///
/// # Errors
///
/// Every delta must be positive and a whole multiple of the nominal
/// resolution, which must itself be 15 or 60 minutes.
fn infer_resolution(building: &str, samples: &[Sample]) -> Result<Resolution, DataError> {
    if samples.len() < 2 {
        return Err(DataError::TooFewSamples {
            building: building.to_string(),
            count: samples.len(),
        });
    }

    let mut smallest = i64::MAX;
    for pair in samples.windows(2) {
        let seconds = (pair[1].timestamp - pair[0].timestamp).num_seconds();
        if seconds <= 0 {
            return Err(DataError::NonMonotonic {
                building: building.to_string(),
                at: pair[1].timestamp,
            });
        }
        smallest = smallest.min(seconds);
    }

    let resolution = if smallest % 60 == 0 {
        Resolution::from_minutes(smallest / 60).ok_or_else(|| DataError::UnsupportedResolution {
            building: building.to_string(),
            minutes: smallest / 60,
        })?
    } else {
        return Err(DataError::IrregularSpacing {
            building: building.to_string(),
            at: samples[1].timestamp,
            seconds: smallest,
        });
    };

    let step = resolution.minutes() * 60;
    if let Some(pair) = samples
        .windows(2)
        .find(|pair| (pair[1].timestamp - pair[0].timestamp).num_seconds() % step != 0)
    {
        return Err(DataError::IrregularSpacing {
            building: building.to_string(),
            at: pair[1].timestamp,
            seconds: (pair[1].timestamp - pair[0].timestamp).num_seconds(),
        });
    }

    Ok(resolution)
}

/// Averages a contiguous fine grid into coarser buckets aligned on multiples
/// of the target interval in local wall-clock time, so no bucket straddles
/// local midnight. Edge buckets with fewer sub-intervals are dropped; a bucket
/// with any unrecoverable sub-interval is unrecoverable.
fn downsample(grid: BuildingGrid, native: Resolution, target: Resolution) -> BuildingGrid {
    let factor = (target.minutes() / native.minutes()) as usize;
    let bucket_seconds = target.minutes() * 60;
    let bucket_of = |ts: &DateTime<FixedOffset>| local_seconds(ts).div_euclid(bucket_seconds);

    let mut timestamps = Vec::new();
    let mut values = Vec::new();
    let mut i = 0;
    while i < grid.timestamps.len() {
        let key = bucket_of(&grid.timestamps[i]);
        let mut j = i;
        while j < grid.timestamps.len() && bucket_of(&grid.timestamps[j]) == key {
            j += 1;
        }

        if j - i == factor {
            let first = grid.timestamps[i];
            let parts: Option<Vec<Reading>> = grid.values[i..j].iter().copied().collect();
            let into_bucket = local_seconds(&first) - key * bucket_seconds;
            timestamps.push(first - TimeDelta::seconds(into_bucket));
            values.push(parts.as_deref().and_then(Reading::mean_of));
        }
        i = j;
    }

    BuildingGrid { timestamps, values }
}

fn same_offsets(a: &[DateTime<FixedOffset>], b: &[DateTime<FixedOffset>]) -> bool {
    a.iter().zip(b).all(|(x, y)| x.offset() == y.offset())
}

/// Seconds since the epoch of the wall-clock reading of `ts`.
fn local_seconds(ts: &DateTime<FixedOffset>) -> i64 {
    ts.naive_local().and_utc().timestamp()
}

/// Finds the overlap of all building grids.
fn common_window(
    grids: &BTreeMap<String, BuildingGrid>,
    resolution: Resolution,
) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), DataError> {
    let bounds = grids.iter().filter_map(|(building, grid)| {
        Some((
            building,
            *grid.timestamps.first()?,
            *grid.timestamps.last()?,
        ))
    });

    let mut latest_start: Option<(&String, DateTime<FixedOffset>)> = None;
    let mut earliest_end: Option<(&String, DateTime<FixedOffset>)> = None;
    for (building, start, end) in bounds {
        if let Some((first, reference)) = latest_start {
            if (start - reference).num_seconds() % (resolution.minutes() * 60) != 0 {
                return Err(DataError::MisalignedCalendars {
                    first: first.clone(),
                    second: building.clone(),
                });
            }
        }
        if latest_start.is_none_or(|(_, s)| start > s) {
            latest_start = Some((building, start));
        }
        if earliest_end.is_none_or(|(_, e)| end < e) {
            earliest_end = Some((building, end));
        }
    }

    match (latest_start, earliest_end) {
        (Some((first, start)), Some((second, end))) if start > end => {
            Err(DataError::DisjointCalendars {
                first: first.clone(),
                second: second.clone(),
            })
        }
        (Some((_, start)), Some((_, end))) => Ok((start, end)),
        _ => Err(DataError::EmptyScenario),
    }
}

/// Groups the calendar into local days and classifies each one.
fn classify_days(
    timestamps: &[DateTime<FixedOffset>],
    buildings: &BTreeMap<String, Vec<Option<Reading>>>,
    resolution: Resolution,
) -> Vec<DayWindow> {
    let mut days = Vec::new();
    let mut start = 0;
    while start < timestamps.len() {
        let date = timestamps[start].date_naive();
        let mut end = start;
        while end < timestamps.len() && timestamps[end].date_naive() == date {
            end += 1;
        }

        let intervals = end - start;
        let status = if intervals == resolution.intervals_per_day() {
            let missing = buildings
                .values()
                .map(|values| values[start..end].iter().filter(|v| v.is_none()).count())
                .sum::<usize>();
            if missing == 0 {
                DayStatus::Complete
            } else {
                DayStatus::Incomplete { missing }
            }
        } else {
            DayStatus::Partial { intervals }
        };

        days.push(DayWindow {
            date,
            range: start..end,
            status,
        });
        start = end;
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(&format!("2024-01-{day:02}T{hour:02}:{minute:02}:00+00:00"))
            .unwrap()
    }

    fn series(start: DateTime<FixedOffset>, minutes: i64, n: usize, kw: f64) -> Vec<Sample> {
        (0..n)
            .map(|i| {
                Sample::new(
                    start + TimeDelta::minutes(minutes * i as i64),
                    Reading {
                        demand_kw: kw,
                        indoor_temp_c: 21.0,
                        ..Reading::default()
                    },
                )
            })
            .collect()
    }

    fn run(buildings: Vec<(&str, Vec<Sample>)>) -> ScenarioRun {
        ScenarioRun::baseline(
            "base",
            buildings
                .into_iter()
                .map(|(id, s)| (id.to_string(), s))
                .collect(),
        )
    }

    #[test]
    fn hourly_full_days_are_complete() {
        let aligner = TimeSeriesAligner::new(Resolution::Hourly, 4);
        let aligned = aligner
            .align(&run(vec![("A", series(ts(1, 0, 0), 60, 48, 1.0))]))
            .unwrap();
        assert_eq!(aligned.days().len(), 2);
        assert_eq!(aligned.valid_days().count(), 2);
    }

    #[test]
    fn partial_edge_day_is_excluded() {
        let aligner = TimeSeriesAligner::new(Resolution::Hourly, 4);
        let aligned = aligner
            .align(&run(vec![("A", series(ts(1, 6, 0), 60, 42, 1.0))]))
            .unwrap();
        assert_eq!(aligned.days()[0].status, DayStatus::Partial { intervals: 18 });
        assert!(aligned.days()[1].is_complete());
    }

    #[test]
    fn short_gap_is_interpolated() {
        let mut samples = series(ts(1, 0, 0), 60, 24, 10.0);
        samples[5].reading.demand_kw = 20.0;
        samples.drain(2..5); // hours 2,3,4 missing
        let aligner = TimeSeriesAligner::new(Resolution::Hourly, 4);
        let aligned = aligner.align(&run(vec![("A", samples)])).unwrap();

        assert_eq!(aligned.valid_days().count(), 1);
        let day = aligned.portfolio_day(aligned.days()[0].date).unwrap();
        assert_eq!(day.len(), 24);
        assert!((day[2] - 12.5).abs() < 1e-9);
        assert!((day[4] - 17.5).abs() < 1e-9);
        assert_eq!(aligned.gaps().len(), 1);
        assert!(aligned.gaps()[0].interpolated);
        assert_eq!(aligned.gaps()[0].missing_intervals, 3);
    }

    #[test]
    fn long_gap_flags_day_incomplete() {
        let mut samples = series(ts(1, 0, 0), 60, 48, 10.0);
        samples.drain(30..36); // six hours missing on day 2
        let aligner = TimeSeriesAligner::new(Resolution::Hourly, 4);
        let aligned = aligner.align(&run(vec![("A", samples)])).unwrap();

        assert!(aligned.days()[0].is_complete());
        assert_eq!(aligned.days()[1].status, DayStatus::Incomplete { missing: 6 });
        assert!(!aligned.gaps()[0].interpolated);
        assert!(aligned.portfolio_day(aligned.days()[1].date).is_none());
        // retained for traceability
        assert_eq!(aligned.timestamps().len(), 48);
    }

    #[test]
    fn fifteen_minute_series_downsampled_to_hourly() {
        let mut fine = series(ts(1, 0, 0), 15, 96, 0.0);
        for (i, s) in fine.iter_mut().enumerate() {
            s.reading.demand_kw = (i % 4) as f64; // 0,1,2,3 per hour
        }
        let hourly = series(ts(1, 0, 0), 60, 24, 5.0);
        let aligner = TimeSeriesAligner::new(Resolution::Hourly, 4);
        let aligned = aligner
            .align(&run(vec![("fine", fine), ("hourly", hourly)]))
            .unwrap();

        let date = aligned.days()[0].date;
        let fine_day = aligned.building_day("fine", date).unwrap();
        assert_eq!(fine_day.len(), 24);
        assert!(fine_day.iter().all(|r| (r.demand_kw - 1.5).abs() < 1e-12));
    }

    #[test]
    fn coarser_than_configured_is_rejected() {
        let aligner = TimeSeriesAligner::new(Resolution::FifteenMinutes, 4);
        let err = aligner
            .align(&run(vec![("A", series(ts(1, 0, 0), 60, 24, 1.0))]))
            .unwrap_err();
        assert!(matches!(err, DataError::CoarserThanConfigured { .. }));
    }

    #[test]
    fn non_monotonic_timestamps_are_rejected() {
        let mut samples = series(ts(1, 0, 0), 60, 24, 1.0);
        samples.swap(3, 4);
        let aligner = TimeSeriesAligner::new(Resolution::Hourly, 4);
        let err = aligner.align(&run(vec![("A", samples)])).unwrap_err();
        assert!(matches!(err, DataError::NonMonotonic { .. }));
    }

    #[test]
    fn irregular_spacing_is_rejected() {
        let mut samples = series(ts(1, 0, 0), 60, 24, 1.0);
        samples[10].timestamp += TimeDelta::minutes(20);
        let aligner = TimeSeriesAligner::new(Resolution::Hourly, 4);
        let err = aligner.align(&run(vec![("A", samples)])).unwrap_err();
        assert!(matches!(
            err,
            DataError::IrregularSpacing { .. } | DataError::UnsupportedResolution { .. }
        ));
    }

    #[test]
    fn single_sample_cannot_infer_resolution() {
        let aligner = TimeSeriesAligner::new(Resolution::Hourly, 4);
        let err = aligner
            .align(&run(vec![("A", series(ts(1, 0, 0), 60, 1, 1.0))]))
            .unwrap_err();
        assert!(matches!(err, DataError::TooFewSamples { count: 1, .. }));
    }

    #[test]
    fn disjoint_calendars_are_rejected() {
        let aligner = TimeSeriesAligner::new(Resolution::Hourly, 4);
        let err = aligner
            .align(&run(vec![
                ("A", series(ts(1, 0, 0), 60, 24, 1.0)),
                ("B", series(ts(3, 0, 0), 60, 24, 1.0)),
            ]))
            .unwrap_err();
        assert!(matches!(err, DataError::DisjointCalendars { .. }));
    }

    #[test]
    fn overlapping_calendars_are_trimmed() {
        let aligner = TimeSeriesAligner::new(Resolution::Hourly, 4);
        let aligned = aligner
            .align(&run(vec![
                ("A", series(ts(1, 0, 0), 60, 72, 1.0)),
                ("B", series(ts(2, 0, 0), 60, 24, 2.0)),
            ]))
            .unwrap();
        assert_eq!(aligned.timestamps().len(), 24);
        assert_eq!(aligned.portfolio_day(aligned.days()[0].date).unwrap()[0], 3.0);
    }

    #[test]
    fn daylight_saving_day_is_partial() {
        // 23 local hours: offset changes from +01:00 to +02:00 mid-day
        let mut samples = Vec::new();
        let mut t = DateTime::parse_from_rfc3339("2024-03-31T00:00:00+01:00").unwrap();
        let summer = FixedOffset::east_opt(2 * 3600).unwrap();
        for i in 0..47 {
            let stamp = if i >= 2 { t.with_timezone(&summer) } else { t };
            samples.push(Sample::new(stamp, Reading::default()));
            t += TimeDelta::hours(1);
        }
        let aligner = TimeSeriesAligner::new(Resolution::Hourly, 4);
        let aligned = aligner.align(&run(vec![("A", samples)])).unwrap();
        assert_eq!(aligned.days()[0].status, DayStatus::Partial { intervals: 23 });
        assert!(aligned.days()[1].is_complete());
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut samples = series(ts(1, 0, 0), 60, 24, 1.0);
        samples[7].reading.demand_kw = f64::NAN;
        let aligner = TimeSeriesAligner::new(Resolution::Hourly, 4);
        let err = aligner.align(&run(vec![("A", samples)])).unwrap_err();
        assert!(matches!(err, DataError::NonFinite { field: "demand_kw", .. }));
    }

    #[test]
    fn caller_data_is_not_mutated() {
        let mut samples = series(ts(1, 0, 0), 60, 24, 1.0);
        samples.remove(3);
        let scenario = run(vec![("A", samples.clone())]);
        let aligner = TimeSeriesAligner::new(Resolution::Hourly, 4);
        aligner.align(&scenario).unwrap();
        assert_eq!(scenario.buildings()["A"], samples);
    }

    #[test]
    fn half_hour_offset_days_stay_whole_when_downsampled() {
        let start = DateTime::parse_from_rfc3339("2024-01-01T00:00:00+05:30").unwrap();
        let mut fine = series(start, 15, 192, 10.0);
        for s in &mut fine[96..] {
            s.reading.demand_kw = 100.0;
        }
        let aligner = TimeSeriesAligner::new(Resolution::Hourly, 4);
        let aligned = aligner.align(&run(vec![("A", fine)])).unwrap();

        assert_eq!(aligned.valid_days().count(), 2);
        assert_eq!(aligned.timestamps()[0], start);
        let first = aligned.portfolio_day(aligned.days()[0].date).unwrap();
        assert!((first.iter().sum::<f64>() - 240.0).abs() < 1e-9);
        let second = aligned.portfolio_day(aligned.days()[1].date).unwrap();
        assert!(second.iter().all(|kw| (kw - 100.0).abs() < 1e-9));
    }

    #[test]
    fn mixed_offsets_between_buildings_are_rejected() {
        let utc = ts(1, 0, 0);
        let plus_one = FixedOffset::east_opt(3600).unwrap();
        let shifted = |samples: Vec<Sample>| -> Vec<Sample> {
            samples
                .into_iter()
                .map(|s| Sample::new(s.timestamp.with_timezone(&plus_one), s.reading))
                .collect()
        };

        let aligner = TimeSeriesAligner::new(Resolution::Hourly, 4);
        for (a, b) in [
            (series(utc, 60, 48, 1.0), shifted(series(utc, 60, 48, 1.0))),
            (shifted(series(utc, 60, 48, 1.0)), series(utc, 60, 48, 1.0)),
        ] {
            let err = aligner.align(&run(vec![("A", a), ("B", b)])).unwrap_err();
            assert_eq!(
                err,
                DataError::MisalignedCalendars {
                    first: "A".into(),
                    second: "B".into(),
                }
            );
        }
    }
}
