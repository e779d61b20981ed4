//! Precision of term-level change detection
//!
//! A term-level change is confirmed when at least one configuration
//! activating all of the term's features was itself reported changed (once
//! ignoring direction, once requiring the direction to match). Unconfirmed
//! changes are attributed to one of four confound categories rather than
//! discarded.

use crate::case_study::CaseStudy;
use crate::changeset::ChangeSet;
use crate::config::Thresholds;
use crate::crossval::{active_set, WorkloadTally};
use crate::feature_model::ROOT;
use crate::influence::InfluenceModelTable;
use crate::measurements::MeasurementTable;
use crate::term::Term;
use std::collections::BTreeMap;

/// Precision results with confound attribution
#[derive(Debug, Clone, Default)]
pub struct PrecisionReport {
    pub total_changes: usize,
    pub confirmed: usize,
    pub confirmed_with_direction: usize,
    /// The raw measurements of an affected configuration also swung beyond
    /// the noise threshold, without the configuration being reported.
    pub metric_change: usize,
    /// The set of affected configurations differs in size between the two
    /// releases.
    pub configuration_space_change: usize,
    /// The influence model's fit error exceeds the quality threshold.
    pub high_model_error: usize,
    /// Mean performance below the floor considered too fast to measure.
    pub low_performance: usize,
    pub per_workload: BTreeMap<String, WorkloadTally>,
}

impl PrecisionReport {
    pub fn precision(&self) -> f64 {
        ratio(self.confirmed, self.total_changes)
    }

    pub fn precision_with_direction(&self) -> f64 {
        ratio(self.confirmed_with_direction, self.total_changes)
    }

    pub fn metric_change_share(&self) -> f64 {
        ratio(self.metric_change, self.total_changes)
    }

    pub fn configuration_space_change_share(&self) -> f64 {
        ratio(self.configuration_space_change, self.total_changes)
    }

    pub fn high_model_error_share(&self) -> f64 {
        ratio(self.high_model_error, self.total_changes)
    }

    pub fn low_performance_share(&self) -> f64 {
        ratio(self.low_performance, self.total_changes)
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

/// Validate every term-level change against the configuration-level set.
pub fn analyze_precision(
    case_study: &CaseStudy,
    term_changes: &ChangeSet,
    config_changes: &ChangeSet,
    models: &InfluenceModelTable,
    thresholds: &Thresholds,
) -> PrecisionReport {
    let mut report = PrecisionReport::default();

    for entry in &term_changes.entries {
        let pair = &entry.releases;
        for workload_changes in &entry.workloads {
            let workload = workload_changes.workload.as_str();

            let mean_earlier =
                case_study
                    .configurations
                    .mean_performance(workload, &pair.from, case_study.timeout);
            let mean_later =
                case_study
                    .configurations
                    .mean_performance(workload, &pair.to, case_study.timeout);
            let dev_earlier = case_study.deviations.mean_performance(workload, &pair.from, None);
            let dev_later = case_study.deviations.mean_performance(workload, &pair.to, None);
            let noise = 2.0
                * f64::max(
                    mean_earlier.unwrap_or(0.0) * dev_earlier.unwrap_or(0.0),
                    mean_later.unwrap_or(0.0) * dev_later.unwrap_or(0.0),
                );

            let confirmed_records = config_changes.changes(pair, workload);
            for change in &workload_changes.changes {
                report.total_changes += 1;
                report
                    .per_workload
                    .entry(workload.to_string())
                    .or_default()
                    .total += 1;

                let term = Term::parse(&change.unit);
                let features: Vec<&str> = term
                    .features()
                    .iter()
                    .map(String::as_str)
                    .filter(|f| *f != ROOT)
                    .collect();

                let covers = |unit: &str| {
                    let active = active_set(unit);
                    features.iter().all(|f| active.contains(f))
                };

                if confirmed_records
                    .iter()
                    .any(|c| covers(&c.unit) && c.direction == change.direction)
                {
                    report.confirmed_with_direction += 1;
                }
                if confirmed_records.iter().any(|c| covers(&c.unit)) {
                    report.confirmed += 1;
                    report
                        .per_workload
                        .entry(workload.to_string())
                        .or_default()
                        .confirmed += 1;
                    continue;
                }

                // Attribution of the unconfirmed change
                let (raw_change, space_differs) = raw_measurement_swing(
                    &case_study.configurations,
                    workload,
                    pair.from.as_str(),
                    pair.to.as_str(),
                    &features,
                    noise,
                );
                if raw_change {
                    report.metric_change += 1;
                } else if space_differs {
                    report.configuration_space_change += 1;
                } else if model_error(models, workload, pair.from.as_str(), pair.to.as_str())
                    > thresholds.model_error
                {
                    report.high_model_error += 1;
                } else if mean_of(mean_earlier, mean_later) < thresholds.low_performance {
                    report.low_performance += 1;
                }
            }
        }
    }

    report
}

/// Scan the configurations a term affects for raw per-configuration swings.
///
/// Returns (swing found, configuration space differs in size). Configurations
/// are paired positionally between the two releases, which assumes the
/// measurement file lists them in a stable order.
fn raw_measurement_swing(
    configurations: &MeasurementTable,
    workload: &str,
    from: &str,
    to: &str,
    features: &[&str],
    noise: f64,
) -> (bool, bool) {
    let affected = |revision: &str| -> Vec<f64> {
        configurations
            .rows_for(workload, revision)
            .filter(|row| {
                features.iter().all(|feature| {
                    configurations
                        .columns
                        .iter()
                        .position(|c| c.as_str() == *feature)
                        .map(|i| row.values[i] == "1")
                        .unwrap_or(false)
                })
            })
            .map(|row| row.performance)
            .collect()
    };

    let earlier = affected(from);
    let later = affected(to);
    if earlier.len() != later.len() {
        return (false, true);
    }
    let found = earlier
        .iter()
        .zip(later.iter())
        .any(|(e, l)| (e - l).abs() > noise);
    (found, false)
}

fn model_error(models: &InfluenceModelTable, workload: &str, from: &str, to: &str) -> f64 {
    f64::max(
        models.error_for(workload, from).unwrap_or(0.0),
        models.error_for(workload, to).unwrap_or(0.0),
    )
}

fn mean_of(earlier: Option<f64>, later: Option<f64>) -> f64 {
    match (earlier, later) {
        (Some(e), Some(l)) => (e + l) / 2.0,
        (Some(v), None) | (None, Some(v)) => v,
        (None, None) => f64::INFINITY,
    }
}
