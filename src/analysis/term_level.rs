//! Term-level change analysis over influence models
//!
//! Compares the coefficient of every influence-model term between
//! consecutive releases. The noise threshold comes from the workload-level
//! measurement distribution (scaled into seconds, the unit of the
//! coefficients), so a term counts as changed only when its influence moved
//! by more than the measurement setup can explain.

use crate::case_study::CaseStudy;
use crate::change::{self, NoiseThreshold};
use crate::changeset::{ChangeCounters, ChangeRecord, ChangeSet, ReleasePair};
use crate::influence::InfluenceModelTable;
use crate::multicollinearity::{build_merge_plan, column_renaming};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use tracing::warn;

/// Fit error of one learned model
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRate {
    pub workload: String,
    pub revision: String,
    pub error: f64,
}

/// Accumulated term-level results for one case study
#[derive(Debug, Clone, Default)]
pub struct TermLevelAnalysis {
    pub changes: ChangeSet,
    /// Percentage of changed terms per release pair, averaged over
    /// workloads.
    pub counters: ChangeCounters,
    pub error_rates: Vec<ErrorRate>,
    /// Absorbed-column renaming for reports: suitable parent → annotated name.
    pub renaming: BTreeMap<String, String>,
}

/// Run the term-level analysis over every workload of a case study.
///
/// Fatal when a (workload, revision) model is missing or empty, or when a
/// workload has no measurements to derive the noise threshold from.
pub fn analyze_terms(
    case_study: &CaseStudy,
    models: &InfluenceModelTable,
) -> Result<TermLevelAnalysis> {
    let revisions = case_study.revisions();
    let plan = build_merge_plan(&case_study.feature_model, &models.terms)?;
    let mut analysis = TermLevelAnalysis {
        renaming: column_renaming(&case_study.feature_model)?,
        ..TermLevelAnalysis::default()
    };

    for workload in &case_study.workloads {
        let raw = models.matrix(workload, &revisions).with_context(|| {
            format!(
                "Cannot run term-level analysis for {} workload {}",
                case_study.name, workload
            )
        })?;
        let resolved = plan.resolve(&raw);

        for revision in &revisions {
            if let Some(error) = models.error_for(workload, revision) {
                analysis.error_rates.push(ErrorRate {
                    workload: workload.clone(),
                    revision: revision.clone(),
                    error,
                });
            }
        }

        for y in 1..revisions.len() {
            let pair = ReleasePair::new(&revisions[y - 1], &revisions[y]);
            let earlier_obs = case_study
                .workload_observation(workload, &revisions[y - 1])
                .with_context(|| {
                    format!("No measurements for {} in {}", workload, revisions[y - 1])
                })?;
            let later_obs = case_study
                .workload_observation(workload, &revisions[y])
                .with_context(|| {
                    format!("No measurements for {} in {}", workload, revisions[y])
                })?;

            // Coefficients are in seconds; the measured means may not be
            let threshold = NoiseThreshold::from_observations(&earlier_obs, &later_obs)
                .scaled(case_study.division_factor);
            let baseline =
                (earlier_obs.mean + later_obs.mean) / 2.0 / case_study.division_factor;

            let mut changed = 0usize;
            for (index, term) in resolved.terms.iter().enumerate() {
                let earlier = resolved.value(y - 1, index);
                let later = resolved.value(y, index);
                if earlier.is_finite() && earlier != 0.0 && later == 0.0 {
                    warn!(
                        workload = workload.as_str(),
                        term = %term,
                        "influence vanished between {} and {}",
                        revisions[y - 1],
                        revisions[y]
                    );
                }
                let Some(detected) = change::detect(earlier, later, threshold) else {
                    continue;
                };
                changed += 1;
                let magnitude =
                    change::percentage(detected.difference, baseline).unwrap_or(0.0);
                analysis.changes.insert(
                    &pair,
                    workload,
                    ChangeRecord {
                        unit: term.to_string(),
                        direction: detected.direction,
                        magnitude,
                    },
                );
            }

            let present = resolved.terms_present(y - 1).max(1);
            analysis
                .counters
                .record(&pair, changed as f64 / present as f64 * 100.0);
        }
    }

    analysis
        .counters
        .divide_all(case_study.workloads.len() as f64);
    Ok(analysis)
}
