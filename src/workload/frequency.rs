//! Workload detection frequency
//!
//! For every configuration-level change, counts how many workloads detected
//! it. The histogram answers how sensitive the analysis is to workload
//! selection: a change detected by a single workload out of fifty is easy to
//! miss, one detected by all of them is not.

use crate::analysis::ConfigurationLevelAnalysis;

/// Histogram of detection counts plus the average detection probability
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyReport {
    /// `histogram[n]` = number of changes detected by exactly `n` workloads.
    pub histogram: Vec<usize>,
    /// Highest number of workloads that detected a single change.
    pub max_workloads: usize,
    /// Mean of (detecting workloads / max detecting workloads) over all
    /// changes, in percent.
    pub average_probability: f64,
}

/// Build the frequency report; `None` when no changes were detected.
pub fn analyze_frequency(analysis: &ConfigurationLevelAnalysis) -> Option<FrequencyReport> {
    if analysis.detected_by.is_empty() {
        return None;
    }
    let max_workloads = analysis
        .detected_by
        .iter()
        .map(|d| d.workloads.len())
        .max()?;

    let mut histogram = vec![0usize; max_workloads + 1];
    let mut average = 0.0;
    for detection in &analysis.detected_by {
        let count = detection.workloads.len();
        histogram[count] += 1;
        average += count as f64 / max_workloads as f64;
    }
    average /= analysis.detected_by.len() as f64;

    Some(FrequencyReport {
        histogram,
        max_workloads,
        average_probability: average * 100.0,
    })
}
