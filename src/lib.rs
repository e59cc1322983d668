//! Portfolio reference-tracking and multi-metric evaluation.
//!
//! Scores a baseline building portfolio and any number of flexible control
//! scenarios against a flat daily reference, with per-building and portfolio
//! metrics, paired scenario comparison and monthly distribution summaries.

pub mod config;
/// Alignment, reference, metric calculators and report assembly.
pub mod eval;
pub mod io;
pub mod synthetic;

#[cfg(feature = "api")]
pub mod api;
