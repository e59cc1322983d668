//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, TimeDelta};
use portfolio_eval::config::{EvaluationConfig, SyntheticConfig};
use portfolio_eval::eval::engine::Evaluator;
use portfolio_eval::eval::types::{Reading, Resolution, Sample, ScenarioRun, Season};
use portfolio_eval::synthetic::SyntheticPortfolio;

/// Small synthetic portfolio (3 buildings, 4 days, seed 42).
pub fn default_synthetic() -> SyntheticConfig {
    SyntheticConfig {
        buildings: 3,
        days: 4,
        ..SyntheticConfig::default()
    }
}

/// Hourly heating-season evaluation without a test period.
pub fn hourly_config() -> EvaluationConfig {
    EvaluationConfig {
        resolution_minutes: 60,
        ..EvaluationConfig::default()
    }
}

pub fn hourly_evaluator() -> Evaluator {
    Evaluator::new(hourly_config()).expect("hourly config is valid")
}

/// Seeded portfolio generated at hourly resolution.
pub fn default_portfolio() -> SyntheticPortfolio {
    SyntheticPortfolio::generate(&default_synthetic(), Season::Heating, Resolution::Hourly)
}

/// UTC midnight, 1 January 2024.
pub fn start() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2024-01-01T00:00:00+00:00").expect("valid timestamp")
}

/// Hourly samples whose demand is produced by `demand(hour_index)`.
pub fn hourly_samples(hours: usize, demand: impl Fn(usize) -> f64) -> Vec<Sample> {
    (0..hours)
        .map(|i| {
            Sample::new(
                start() + TimeDelta::hours(i as i64),
                Reading {
                    demand_kw: demand(i),
                    indoor_temp_c: 21.0,
                    heat_pump_kw: 1.0,
                    carbon_intensity: 0.2,
                    tariff: 0.3,
                    ..Reading::default()
                },
            )
        })
        .collect()
}

/// Two buildings with a constant hourly demand each.
pub fn flat_buildings(hours: usize, a_kw: f64, b_kw: f64) -> BTreeMap<String, Vec<Sample>> {
    BTreeMap::from([
        ("A".to_string(), hourly_samples(hours, |_| a_kw)),
        ("B".to_string(), hourly_samples(hours, |_| b_kw)),
    ])
}
