//! Configuration-level change analysis
//!
//! Treats every configuration identity as a unit: per workload and
//! consecutive release pair, the configuration's mean performance in both
//! releases is compared under the shared noise-threshold rule. A missing
//! observation (the configuration was not measured in a release) and a zero
//! observation are distinct states; changes are only assessed when both
//! releases observed the configuration.

use crate::case_study::CaseStudy;
use crate::change::{self, Observation};
use crate::changeset::{ChangeCounters, ChangeRecord, ChangeSet, ReleasePair};
use crate::measurements::{sample_mean, MeasurementTable};
use std::collections::HashMap;

/// Workloads that detected one particular configuration change
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedBy {
    pub releases: ReleasePair,
    pub unit: String,
    pub workloads: Vec<String>,
}

/// Accumulated configuration-level results for one case study
#[derive(Debug, Clone, Default)]
pub struct ConfigurationLevelAnalysis {
    pub changes: ChangeSet,
    /// Raw change counts per release pair, across workloads.
    pub counters: ChangeCounters,
    /// Per configuration change, the workloads that detected it.
    pub detected_by: Vec<DetectedBy>,
}

impl ConfigurationLevelAnalysis {
    fn record_detection(&mut self, pair: &ReleasePair, unit: &str, workload: &str) {
        match self
            .detected_by
            .iter_mut()
            .find(|d| d.releases == *pair && d.unit == unit)
        {
            Some(entry) => {
                if !entry.workloads.iter().any(|w| w == workload) {
                    entry.workloads.push(workload.to_string());
                }
            }
            None => self.detected_by.push(DetectedBy {
                releases: pair.clone(),
                unit: unit.to_string(),
                workloads: vec![workload.to_string()],
            }),
        }
    }
}

/// Per-configuration observations across all revisions of one workload
struct ConfigurationSeries {
    identity: String,
    /// One observation per revision; `None` when the configuration was not
    /// measured there.
    observations: Vec<Option<Observation>>,
    /// Mean performance over the revisions that observed the configuration;
    /// the baseline for percentage magnitudes.
    overall_mean: Option<f64>,
}

/// Run the configuration-level analysis over every workload of a case study.
pub fn analyze_configurations(case_study: &CaseStudy) -> ConfigurationLevelAnalysis {
    let revisions = case_study.revisions();
    let mut analysis = ConfigurationLevelAnalysis::default();
    for workload in &case_study.workloads {
        analyze_workload(case_study, workload, &revisions, &mut analysis);
    }
    analysis
}

fn analyze_workload(
    case_study: &CaseStudy,
    workload: &str,
    revisions: &[String],
    analysis: &mut ConfigurationLevelAnalysis,
) {
    let series = collect_series(
        &case_study.configurations,
        &case_study.deviations,
        workload,
        revisions,
    );

    for y in 1..revisions.len() {
        let pair = ReleasePair::new(&revisions[y - 1], &revisions[y]);
        for configuration in &series {
            let (Some(earlier), Some(later)) = (
                &configuration.observations[y - 1],
                &configuration.observations[y],
            ) else {
                // Missing is not zero: nothing to compare here
                continue;
            };
            let Some(detected) = change::detect_observations(earlier, later) else {
                continue;
            };
            let magnitude = configuration
                .overall_mean
                .and_then(|mean| change::percentage(detected.difference, mean))
                .unwrap_or(0.0);
            let inserted = analysis.changes.insert(
                &pair,
                workload,
                ChangeRecord {
                    unit: configuration.identity.clone(),
                    direction: detected.direction,
                    magnitude,
                },
            );
            if inserted {
                analysis.counters.record(&pair, 1.0);
            }
            analysis.record_detection(&pair, &configuration.identity, workload);
        }
    }
}

/// Group one workload's rows into per-configuration series.
///
/// Configurations keep first-seen order; a configuration measured more than
/// once per revision contributes its sample mean.
fn collect_series(
    configurations: &MeasurementTable,
    deviations: &MeasurementTable,
    workload: &str,
    revisions: &[String],
) -> Vec<ConfigurationSeries> {
    let revision_index: HashMap<&str, usize> = revisions
        .iter()
        .enumerate()
        .map(|(i, r)| (r.as_str(), i))
        .collect();

    let mut order: Vec<Vec<String>> = Vec::new();
    let mut samples: HashMap<Vec<String>, Vec<Vec<f64>>> = HashMap::new();
    for row in configurations.workload_rows(workload) {
        let Some(&index) = revision_index.get(row.revision.as_str()) else {
            continue;
        };
        let per_revision = samples.entry(row.values.clone()).or_insert_with(|| {
            order.push(row.values.clone());
            vec![Vec::new(); revisions.len()]
        });
        per_revision[index].push(row.performance);
    }

    let mut deviation_samples: HashMap<Vec<String>, Vec<Vec<f64>>> = HashMap::new();
    for row in deviations.workload_rows(workload) {
        let Some(&index) = revision_index.get(row.revision.as_str()) else {
            continue;
        };
        deviation_samples
            .entry(row.values.clone())
            .or_insert_with(|| vec![Vec::new(); revisions.len()])[index]
            .push(row.performance);
    }

    order
        .into_iter()
        .map(|values| {
            let perf = &samples[&values];
            let devs = deviation_samples.get(&values);
            let observations: Vec<Option<Observation>> = (0..revisions.len())
                .map(|index| {
                    let mean = sample_mean(&perf[index])?;
                    let deviation =
                        devs.and_then(|d| sample_mean(&d[index])).unwrap_or(0.0);
                    Some(Observation::new(mean, deviation))
                })
                .collect();
            let present: Vec<f64> = observations
                .iter()
                .flatten()
                .map(|obs| obs.mean)
                .collect();
            let identity = identity_of(configurations, &values);
            ConfigurationSeries {
                identity,
                observations,
                overall_mean: sample_mean(&present),
            }
        })
        .collect()
}

/// Machine-readable configuration identity: active options except root.
fn identity_of(table: &MeasurementTable, values: &[String]) -> String {
    table
        .columns
        .iter()
        .zip(values.iter())
        .filter(|(name, value)| value.as_str() == "1" && name.as_str() != "root")
        .map(|(name, _)| name.as_str())
        .collect::<Vec<&str>>()
        .join(" ")
}
