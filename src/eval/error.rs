//! Error taxonomy: fatal data errors, soft undefined-metric markers, and the
//! evaluation-level error carrying scenario context.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;

/// Malformed or misaligned input. Always surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("scenario contains no buildings")]
    EmptyScenario,

    #[error("building `{building}` has {count} sample(s); at least two are needed to infer a resolution")]
    TooFewSamples { building: String, count: usize },

    #[error("building `{building}`: timestamp {at} does not advance past its predecessor")]
    NonMonotonic {
        building: String,
        at: DateTime<FixedOffset>,
    },

    #[error("building `{building}`: irregular spacing of {seconds} s before {at}")]
    IrregularSpacing {
        building: String,
        at: DateTime<FixedOffset>,
        seconds: i64,
    },

    #[error("building `{building}`: inferred resolution of {minutes} min is not supported (expected 15 or 60)")]
    UnsupportedResolution { building: String, minutes: i64 },

    #[error("building `{building}`: native resolution of {found} min is coarser than the configured {configured} min")]
    CoarserThanConfigured {
        building: String,
        found: i64,
        configured: i64,
    },

    #[error("building `{building}`: non-finite {field} at {at}")]
    NonFinite {
        building: String,
        field: &'static str,
        at: DateTime<FixedOffset>,
    },

    #[error("buildings `{first}` and `{second}` have non-overlapping calendars")]
    DisjointCalendars { first: String, second: String },

    #[error("buildings `{first}` and `{second}` have offset grids or different UTC offsets")]
    MisalignedCalendars { first: String, second: String },

    #[error("building sets of `{baseline}` and `{flexible}` differ: {buildings:?}")]
    BuildingMismatch {
        baseline: String,
        flexible: String,
        buildings: Vec<String>,
    },

    #[error("scenarios `{baseline}` and `{flexible}` share no valid days")]
    NoCommonDays { baseline: String, flexible: String },

    #[error("scenario is labelled `{label}` but was supplied as {expected}")]
    WrongStrategy {
        label: String,
        expected: &'static str,
    },

    #[error("scenario name is used more than once")]
    DuplicateScenario,
}

/// A metric formula hit a zero denominator or non-positive minimum.
///
/// Recorded per day and metric instead of aborting, so monthly
/// distributions are still built from the remaining valid days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedMetric {
    #[error("reference mean is zero")]
    ZeroReference,
    #[error("baseline value is zero")]
    ZeroBaseline,
    #[error("daily minimum demand is not positive")]
    NonPositiveMinimum,
    #[error("daily peak demand is not positive")]
    NonPositivePeak,
    #[error("mean flexibility activation is zero")]
    ZeroActivation,
}

impl UndefinedMetric {
    pub const fn name(self) -> &'static str {
        match self {
            Self::ZeroReference => "zero_reference",
            Self::ZeroBaseline => "zero_baseline",
            Self::NonPositiveMinimum => "non_positive_minimum",
            Self::NonPositivePeak => "non_positive_peak",
            Self::ZeroActivation => "zero_activation",
        }
    }
}

/// Fatal evaluation failure.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("data error in scenario `{scenario}`: {source}")]
    Data {
        scenario: String,
        #[source]
        source: DataError,
    },

    #[error("invalid configuration: {}", join_config_errors(.0))]
    Config(Vec<ConfigError>),
}

impl EvalError {
    pub fn data(scenario: &str, source: DataError) -> Self {
        Self::Data {
            scenario: scenario.to_string(),
            source,
        }
    }
}

impl From<ConfigError> for EvalError {
    fn from(err: ConfigError) -> Self {
        Self::Config(vec![err])
    }
}

fn join_config_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_error_names_scenario_and_building() {
        let err = EvalError::data(
            "flex-a",
            DataError::TooFewSamples {
                building: "B7".into(),
                count: 1,
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("flex-a"));
        assert!(msg.contains("B7"));
    }

    #[test]
    fn config_errors_are_joined() {
        let err = EvalError::Config(vec![
            ConfigError::new("evaluation.resolution_minutes", "must be 15 or 60"),
            ConfigError::new("evaluation.evaluation_period", "start must be <= end"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("resolution_minutes"));
        assert!(msg.contains("evaluation_period"));
    }
}
