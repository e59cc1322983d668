//! API query and error types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::eval::types::{MetricKind, MetricResult, Scope};

/// Filters shared by the summary and day endpoints. Absent fields match
/// everything.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    /// Metric name, e.g. `nmbe`.
    pub metric: Option<String>,
    /// Scenario name.
    pub scenario: Option<String>,
    /// `portfolio` or `building:<id>`.
    pub scope: Option<String>,
}

/// Day-table filters with an optional inclusive date range.
#[derive(Debug, Default, Deserialize)]
pub struct DailyQuery {
    pub metric: Option<String>,
    pub scenario: Option<String>,
    pub scope: Option<String>,
    /// First date (inclusive).
    pub from: Option<NaiveDate>,
    /// Last date (inclusive).
    pub to: Option<NaiveDate>,
}

/// Error response body for 400-class errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

/// Parsed form of the shared filters.
#[derive(Debug, Default)]
pub(crate) struct Filter {
    metric: Option<MetricKind>,
    scenario: Option<String>,
    scope: Option<String>,
}

impl Filter {
    /// Parses the textual filters.
    ///
    /// # Errors
    ///
    /// Returns a message naming an unknown metric or a malformed scope.
    pub(crate) fn parse(
        metric: Option<&str>,
        scenario: Option<String>,
        scope: Option<String>,
    ) -> Result<Self, String> {
        if let Some(s) = scope.as_deref() {
            let building = s.strip_prefix("building:").is_some_and(|id| !id.is_empty());
            if s != "portfolio" && !building {
                return Err(format!(
                    "unknown scope \"{s}\", expected portfolio or building:<id>"
                ));
            }
        }
        Ok(Self {
            metric: metric.map(str::parse).transpose()?,
            scenario,
            scope,
        })
    }

    pub(crate) fn matches(&self, metric: MetricKind, scope: &Scope, scenario: &str) -> bool {
        self.metric.is_none_or(|m| m == metric)
            && self.scenario.as_deref().is_none_or(|s| s == scenario)
            && self
                .scope
                .as_deref()
                .is_none_or(|s| s == scope.to_string())
    }

    pub(crate) fn matches_result(&self, r: &MetricResult) -> bool {
        self.matches(r.metric, &r.scope, &r.scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_matches_everything() {
        let f = Filter::default();
        assert!(f.matches(MetricKind::Cost, &Scope::Portfolio, "any"));
    }

    #[test]
    fn scope_filter_uses_display_form() {
        let f = Filter::parse(None, None, Some("building:B01".into())).unwrap();
        assert!(f.matches(MetricKind::Cost, &Scope::Building("B01".into()), "x"));
        assert!(!f.matches(MetricKind::Cost, &Scope::Portfolio, "x"));
    }

    #[test]
    fn unknown_metric_is_rejected() {
        let err = Filter::parse(Some("watts"), None, None).unwrap_err();
        assert!(err.contains("watts"));
    }

    #[test]
    fn malformed_scope_is_rejected() {
        assert!(Filter::parse(None, None, Some("feeder".into())).is_err());
        assert!(Filter::parse(None, None, Some("building:".into())).is_err());
        assert!(Filter::parse(None, None, Some("portfolio".into())).is_ok());
    }
}
