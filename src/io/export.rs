//! CSV and JSON export of evaluation results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, FixedOffset};

use crate::eval::align::AlignedScenario;
use crate::eval::reference::ReferenceProfile;
use crate::eval::report::MetricsReport;
use crate::eval::types::{MetricResult, MetricValue, Period};

/// Column header of the per-day metric table.
const DAILY_HEADER: &str = "scenario,date,metric,scope,value,status,timestamp";

/// Column header of the monthly summary table.
const SUMMARY_HEADER: &str = "scenario,metric,scope,month,count,missing,mean,median,q1,q3,min,max";

/// Column header of the aligned portfolio series.
const PORTFOLIO_HEADER: &str = "timestamp,scenario,portfolio_kw,reference_kw";

/// One interval of a scenario's aggregate demand next to the reference.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioRow {
    pub timestamp: DateTime<FixedOffset>,
    pub scenario: String,
    /// `None` where a building value is unrecoverable.
    pub portfolio_kw: Option<f64>,
    /// `None` on days without a reference.
    pub reference_kw: Option<f64>,
}

/// Pairs every interval of an aligned scenario with the reference power of
/// its day. Rows are spaced exactly one interval apart.
pub fn portfolio_rows(
    scenario: &AlignedScenario,
    reference: &ReferenceProfile,
) -> Vec<PortfolioRow> {
    scenario
        .timestamps()
        .iter()
        .zip(scenario.portfolio_aggregate())
        .map(|(ts, portfolio_kw)| PortfolioRow {
            timestamp: *ts,
            scenario: scenario.name().to_string(),
            portfolio_kw,
            reference_kw: reference
                .get(ts.date_naive())
                .map(|day| day.reference_power_kw),
        })
        .collect()
}

/// Writes the per-day metric table as CSV.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_daily_csv(report: &MetricsReport, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(DAILY_HEADER.split(','))?;
    for r in &report.daily {
        wtr.write_record(result_record(r))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the monthly distribution summaries as CSV. Undefined statistics
/// are written as empty cells.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_summary_csv(report: &MetricsReport, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(SUMMARY_HEADER.split(','))?;
    for row in &report.summaries {
        let s = &row.summary;
        wtr.write_record([
            row.scenario.clone(),
            row.metric.to_string(),
            row.scope.to_string(),
            row.month.to_string(),
            s.count.to_string(),
            s.missing.to_string(),
            fmt_opt(s.mean),
            fmt_opt(s.median),
            fmt_opt(s.q1),
            fmt_opt(s.q3),
            fmt_opt(s.min),
            fmt_opt(s.max),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes aligned portfolio rows as CSV.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_portfolio_csv(rows: &[PortfolioRow], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(PORTFOLIO_HEADER.split(','))?;
    for r in rows {
        wtr.write_record([
            r.timestamp.to_rfc3339(),
            r.scenario.clone(),
            fmt_opt(r.portfolio_kw),
            fmt_opt(r.reference_kw),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the full report as pretty-printed JSON.
///
/// # Errors
///
/// Returns an `io::Error` if serialization or writing fails.
pub fn write_report_json(report: &MetricsReport, writer: impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

/// Creates `path` and hands a buffered writer to `write`.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_to(
    path: &Path,
    write: impl FnOnce(io::BufWriter<File>) -> io::Result<()>,
) -> io::Result<()> {
    let file = File::create(path)?;
    write(io::BufWriter::new(file))
}

fn result_record(r: &MetricResult) -> [String; 7] {
    let date = match r.period {
        Period::Day(date) => date.to_string(),
        Period::Total => "total".to_string(),
    };
    let (value, status) = match r.value {
        MetricValue::Defined(v) => (format!("{v:.6}"), "defined".to_string()),
        MetricValue::Undefined(reason) => (String::new(), reason.name().to_string()),
    };
    [
        r.scenario.clone(),
        date,
        r.metric.to_string(),
        r.scope.to_string(),
        value,
        status,
        r.timestamp.map(|t| t.to_rfc3339()).unwrap_or_default(),
    ]
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.6}")).unwrap_or_default()
}
