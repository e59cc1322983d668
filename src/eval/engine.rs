//! Evaluation pipeline: align, reference, metrics, comparison, report.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::align::{AlignedScenario, TimeSeriesAligner};
use super::compare::{ExcludedDay, ScenarioComparator};
use super::error::{DataError, EvalError};
use super::primary::PrimaryMetricsCalculator;
use super::reference::{ReferenceProfile, ReferenceProfileGenerator};
use super::report::{MetricsReport, ReportAssembler};
use super::secondary::SecondaryMetricsCalculator;
use super::types::{MetricSet, Resolution, ScenarioRun};
use crate::config::EvaluationConfig;

/// Runs a full evaluation of one baseline and any number of flexible runs.
///
/// The reference profile is built from the baseline before any scenario
/// metric is computed, and the report is assembled only after every
/// scenario has finished.
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: EvaluationConfig,
    aligner: TimeSeriesAligner,
    primary: PrimaryMetricsCalculator,
}

/// Output of one successfully evaluated flexible run.
struct FlexibleOutcome {
    aligned: AlignedScenario,
    metrics: MetricSet,
    excluded: Vec<ExcludedDay>,
}

impl Evaluator {
    /// Creates an evaluator from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::Config` listing every invalid option.
    pub fn new(config: EvaluationConfig) -> Result<Self, EvalError> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(EvalError::Config(errors));
        }
        let resolution = config.resolution()?;
        Ok(Self {
            aligner: TimeSeriesAligner::new(resolution, config.max_interpolation_gap_intervals),
            primary: PrimaryMetricsCalculator::new(config.season, resolution),
            config,
        })
    }

    pub fn resolution(&self) -> Resolution {
        self.aligner.resolution()
    }

    pub fn aligner(&self) -> &TimeSeriesAligner {
        &self.aligner
    }

    /// Evaluates every scenario and assembles the report.
    ///
    /// # Errors
    ///
    /// Any failure of the baseline aborts the evaluation. A flexible run
    /// that fails is recorded in `MetricsReport::failures` instead.
    pub fn evaluate(
        &self,
        baseline: &ScenarioRun,
        flexible: &[ScenarioRun],
    ) -> Result<MetricsReport, EvalError> {
        if !baseline.is_baseline() {
            return Err(EvalError::data(
                baseline.name(),
                DataError::WrongStrategy {
                    label: baseline.strategy().to_string(),
                    expected: "baseline",
                },
            ));
        }
        let mut names = BTreeSet::from([baseline.name()]);
        if let Some(dup) = flexible.iter().find(|run| !names.insert(run.name())) {
            return Err(EvalError::data(dup.name(), DataError::DuplicateScenario));
        }

        let aligned_base = self
            .aligner
            .align(baseline)
            .map_err(|e| EvalError::data(baseline.name(), e))?;
        let reference = ReferenceProfileGenerator::generate(&aligned_base);

        let base_days: Vec<NaiveDate> = aligned_base
            .valid_days()
            .map(|d| d.date)
            .filter(|d| {
                let inside = self.config.includes(*d);
                if !inside {
                    debug!(date = %d, "outside evaluation period");
                }
                inside && reference.get(*d).is_some()
            })
            .collect();

        let mut assembler =
            ReportAssembler::new(self.resolution(), self.config.season, baseline.name());
        assembler.push_data_quality(&aligned_base);
        assembler.push_metrics(self.primary.evaluate(&aligned_base, &reference, &base_days));
        assembler.push_metrics(SecondaryMetricsCalculator::evaluate(&aligned_base, &base_days));
        info!(
            scenario = baseline.name(),
            days = base_days.len(),
            "evaluated baseline"
        );

        for run in flexible {
            match self.evaluate_flexible(&aligned_base, &reference, run) {
                Ok(outcome) => {
                    info!(
                        scenario = run.name(),
                        strategy = %run.strategy(),
                        excluded = outcome.excluded.len(),
                        "evaluated flexible scenario"
                    );
                    assembler.push_scenario(run.name());
                    assembler.push_data_quality(&outcome.aligned);
                    assembler.push_metrics(outcome.metrics);
                    assembler.push_excluded(outcome.excluded);
                }
                Err(err) => {
                    warn!(scenario = run.name(), error = %err, "scenario failed");
                    assembler.push_failure(run.name(), &err);
                }
            }
        }

        let report = assembler.finish();
        info!(
            scenarios = report.scenarios.len(),
            failures = report.failures.len(),
            day_values = report.daily.len(),
            summaries = report.summaries.len(),
            "evaluation complete"
        );
        Ok(report)
    }

    fn evaluate_flexible(
        &self,
        baseline: &AlignedScenario,
        reference: &ReferenceProfile,
        run: &ScenarioRun,
    ) -> Result<FlexibleOutcome, DataError> {
        if run.is_baseline() {
            return Err(DataError::WrongStrategy {
                label: run.strategy().to_string(),
                expected: "flexible",
            });
        }
        let aligned = self.aligner.align(run)?;
        let paired = ScenarioComparator::pair(baseline, &aligned, |d| self.config.includes(d))?;

        let mut metrics = self.primary.evaluate(&aligned, reference, &paired.days);
        metrics.extend(SecondaryMetricsCalculator::evaluate(&aligned, &paired.days));
        metrics.extend(ScenarioComparator::compare(baseline, &aligned, &paired.days));

        Ok(FlexibleOutcome {
            aligned,
            metrics,
            excluded: paired.excluded,
        })
    }
}
