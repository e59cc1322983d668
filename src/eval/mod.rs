//! Portfolio reference-tracking and multi-metric evaluation engine.
//!
//! [`Evaluator`] is the entry point: it aligns each [`ScenarioRun`], derives
//! the flat daily [`ReferenceProfile`](reference::ReferenceProfile) from the
//! baseline, computes primary, secondary and paired metrics, and assembles a
//! [`MetricsReport`].

pub mod align;
pub mod compare;
pub mod engine;
pub mod error;
pub mod primary;
pub mod reference;
pub mod report;
pub mod secondary;
pub mod stats;
pub mod types;

pub use align::{AlignedScenario, TimeSeriesAligner};
pub use compare::ScenarioComparator;
pub use engine::Evaluator;
pub use error::{DataError, EvalError, UndefinedMetric};
pub use primary::PrimaryMetricsCalculator;
pub use reference::ReferenceProfileGenerator;
pub use report::{MetricsReport, ReportAssembler};
pub use secondary::SecondaryMetricsCalculator;
pub use types::{
    MetricKind, MetricResult, MetricValue, Period, Reading, Resolution, Sample, ScenarioRun,
    Scope, Season, StrategyLabel,
};
