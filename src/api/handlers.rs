//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;

use super::AppState;
use super::types::{DailyQuery, ErrorResponse, Filter, SummaryQuery};
use crate::eval::report::{MetricsReport, SummaryRow};
use crate::eval::types::{MetricResult, Period};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(error: String) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error }))
}

/// Returns the complete report.
///
/// `GET /report` → 200 + `MetricsReport` JSON
pub async fn get_report(State(state): State<Arc<AppState>>) -> Json<MetricsReport> {
    Json(state.report.clone())
}

/// Returns monthly summaries matching the query.
///
/// `GET /summaries?metric=nmbe&scenario=flex` → 200 + `Vec<SummaryRow>` JSON
/// `GET /summaries?metric=bogus` → 400 + `ErrorResponse`
pub async fn get_summaries(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<Vec<SummaryRow>>, ApiError> {
    let filter = Filter::parse(query.metric.as_deref(), query.scenario, query.scope)
        .map_err(bad_request)?;

    let rows: Vec<SummaryRow> = state
        .report
        .summaries
        .iter()
        .filter(|r| filter.matches(r.metric, &r.scope, &r.scenario))
        .cloned()
        .collect();

    Ok(Json(rows))
}

/// Returns per-day values matching the query, optionally limited to a date
/// range.
///
/// `GET /daily?from=2024-01-02&to=2024-01-05` → inclusive range
/// `GET /daily?from=2024-01-05&to=2024-01-02` → 400 + `ErrorResponse`
pub async fn get_daily(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DailyQuery>,
) -> Result<Json<Vec<MetricResult>>, ApiError> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(bad_request(format!(
                "`from` ({from}) must be <= `to` ({to})"
            )));
        }
    }
    let filter = Filter::parse(query.metric.as_deref(), query.scenario, query.scope)
        .map_err(bad_request)?;

    let in_range = |period: Period| {
        period.date().is_some_and(|d| {
            query.from.is_none_or(|from| d >= from) && query.to.is_none_or(|to| d <= to)
        })
    };
    let rows: Vec<MetricResult> = state
        .report
        .daily
        .iter()
        .filter(|r| filter.matches_result(r) && in_range(r.period))
        .cloned()
        .collect();

    Ok(Json(rows))
}
