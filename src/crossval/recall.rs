//! Recall of term-level change detection
//!
//! For every configuration-level change, the most specific influence-model
//! term active in that configuration (the one shared by the fewest other
//! configurations) should show up in the term-level change set. Candidates
//! tied at the same specificity all count; the change is confirmed when any
//! of them does. Unconfirmed changes are attributed to coefficient swings
//! hidden under the configuration's own noise threshold, or to unreliable
//! models.

use crate::case_study::CaseStudy;
use crate::changeset::{ChangeSet, ReleasePair};
use crate::config::Thresholds;
use crate::crossval::{active_set, WorkloadTally};
use crate::feature_model::ROOT;
use crate::influence::{CoefficientMatrix, InfluenceModelTable};
use crate::multicollinearity::build_merge_plan;
use crate::term::Term;
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};

/// Recall results with confound attribution
#[derive(Debug, Clone, Default)]
pub struct RecallReport {
    pub total_changes: usize,
    pub confirmed: usize,
    pub confirmed_with_direction: usize,
    /// A candidate term's resolved coefficient swung beyond the
    /// configuration's own deviation threshold without being reported.
    pub coefficient_swing: usize,
    /// The influence model's fit error exceeds the quality threshold.
    pub high_model_error: usize,
    pub per_workload: BTreeMap<String, WorkloadTally>,
}

impl RecallReport {
    pub fn recall(&self) -> f64 {
        ratio(self.confirmed, self.total_changes)
    }

    pub fn recall_with_direction(&self) -> f64 {
        ratio(self.confirmed_with_direction, self.total_changes)
    }

    pub fn coefficient_swing_share(&self) -> f64 {
        ratio(self.coefficient_swing, self.total_changes)
    }

    pub fn high_model_error_share(&self) -> f64 {
        ratio(self.high_model_error, self.total_changes)
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

/// Validate every configuration-level change against the term-level set.
pub fn analyze_recall(
    case_study: &CaseStudy,
    term_changes: &ChangeSet,
    config_changes: &ChangeSet,
    models: &InfluenceModelTable,
    thresholds: &Thresholds,
) -> Result<RecallReport> {
    let revisions = case_study.revisions();
    let plan = build_merge_plan(&case_study.feature_model, &models.terms)?;

    // Resolved coefficient matrices per workload, for swing attribution
    let mut resolved: HashMap<String, CoefficientMatrix> = HashMap::new();
    for workload in &case_study.workloads {
        let raw = models
            .matrix(workload, &revisions)
            .with_context(|| format!("Cannot cross-validate workload {workload}"))?;
        resolved.insert(workload.clone(), plan.resolve(&raw));
    }
    let revision_index: HashMap<&str, usize> = revisions
        .iter()
        .enumerate()
        .map(|(i, r)| (r.as_str(), i))
        .collect();

    let mut report = RecallReport::default();
    for entry in &config_changes.entries {
        let pair = &entry.releases;
        for workload_changes in &entry.workloads {
            let workload = workload_changes.workload.as_str();
            let matrix = &resolved[workload];

            // Specificity ranking base: how many configurations of the first
            // release share each term present in its model
            let candidates = affected_configuration_counts(case_study, matrix, workload, pair);

            for change in &workload_changes.changes {
                report.total_changes += 1;
                report
                    .per_workload
                    .entry(workload.to_string())
                    .or_default()
                    .total += 1;

                let active = active_set(&change.unit);
                let mut covered: Vec<(&Term, usize)> = candidates
                    .iter()
                    .filter(|(term, _)| {
                        term.features()
                            .iter()
                            .all(|f| f == ROOT || active.contains(&f.as_str()))
                    })
                    .map(|&(term, count)| (term, count))
                    .collect();
                covered.sort_by_key(|(_, count)| *count);

                let Some(&(_, min_count)) = covered.first() else {
                    continue;
                };
                let most_specific: Vec<&Term> = covered
                    .iter()
                    .take_while(|(_, count)| *count == min_count)
                    .map(|(term, _)| *term)
                    .collect();

                let confirmed = most_specific.iter().any(|term| {
                    term_changes.contains(pair, workload, &term.to_string())
                });
                if confirmed {
                    report.confirmed += 1;
                    report
                        .per_workload
                        .entry(workload.to_string())
                        .or_default()
                        .confirmed += 1;
                }
                if most_specific.iter().any(|term| {
                    term_changes
                        .find(pair, workload, &term.to_string())
                        .is_some_and(|record| record.direction == change.direction)
                }) {
                    report.confirmed_with_direction += 1;
                }
                if confirmed {
                    continue;
                }

                // Attribution over every covering candidate
                let threshold = configuration_noise(case_study, &active, workload, pair);
                let swing = covered.iter().any(|&(term, _)| {
                    coefficient_delta(matrix, &revision_index, term, pair)
                        .map(|delta| delta.abs() > threshold)
                        .unwrap_or(false)
                });
                if swing {
                    report.coefficient_swing += 1;
                } else if model_error(models, workload, pair) > thresholds.model_error {
                    report.high_model_error += 1;
                }
            }
        }
    }
    Ok(report)
}

/// Count, per term of the first release's model, how many configurations of
/// that release activate all of the term's features.
fn affected_configuration_counts<'a>(
    case_study: &CaseStudy,
    matrix: &'a CoefficientMatrix,
    workload: &str,
    pair: &ReleasePair,
) -> Vec<(&'a Term, usize)> {
    let Some(first_row) = matrix.revisions.iter().position(|r| *r == pair.from) else {
        return Vec::new();
    };
    let table = &case_study.configurations;
    matrix
        .terms
        .iter()
        .enumerate()
        .filter(|(index, _)| matrix.value(first_row, *index).is_finite())
        .map(|(_, term)| {
            let count = table
                .rows_for(workload, &pair.from)
                .filter(|row| {
                    term.features().iter().all(|feature| {
                        feature == ROOT
                            || table
                                .columns
                                .iter()
                                .position(|c| c == feature)
                                .map(|i| row.values[i] == "1")
                                .unwrap_or(false)
                    })
                })
                .count();
            (term, count)
        })
        .collect()
}

/// Noise threshold of one specific configuration across the release pair,
/// scaled into the coefficient unit (seconds).
fn configuration_noise(
    case_study: &CaseStudy,
    active: &[&str],
    workload: &str,
    pair: &ReleasePair,
) -> f64 {
    let scale = |revision: &str| -> f64 {
        let perf = find_configuration(&case_study.configurations, active, workload, revision);
        let dev = find_configuration(&case_study.deviations, active, workload, revision);
        match (perf, dev) {
            (Some(p), Some(d)) => p * d,
            _ => 0.0,
        }
    };
    2.0 * f64::max(scale(&pair.from), scale(&pair.to)) / case_study.division_factor
}

/// Performance value of the exact configuration whose active options equal
/// `active`, if it was measured.
fn find_configuration(
    table: &crate::measurements::MeasurementTable,
    active: &[&str],
    workload: &str,
    revision: &str,
) -> Option<f64> {
    table
        .rows_for(workload, revision)
        .find(|row| {
            table.columns.iter().zip(row.values.iter()).all(|(name, value)| {
                let should_be_active = name == ROOT || active.contains(&name.as_str());
                match value.as_str() {
                    "1" => should_be_active,
                    "0" => !should_be_active,
                    // Numeric columns do not take part in the identity
                    _ => true,
                }
            })
        })
        .map(|row| row.performance)
}

fn coefficient_delta(
    matrix: &CoefficientMatrix,
    revision_index: &HashMap<&str, usize>,
    term: &Term,
    pair: &ReleasePair,
) -> Option<f64> {
    let from = *revision_index.get(pair.from.as_str())?;
    let to = *revision_index.get(pair.to.as_str())?;
    let column = matrix.terms.iter().position(|t| t == term)?;
    let delta = matrix.value(from, column) - matrix.value(to, column);
    delta.is_finite().then_some(delta)
}

fn model_error(models: &InfluenceModelTable, workload: &str, pair: &ReleasePair) -> f64 {
    f64::max(
        models.error_for(workload, &pair.from).unwrap_or(0.0),
        models.error_for(workload, &pair.to).unwrap_or(0.0),
    )
}
