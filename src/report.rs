//! Markdown summaries of the analysis results
//!
//! Plain string assembly in the same spirit as the CSV export: small,
//! dependency-free, and deterministic. These tables are the human-facing
//! counterpart of the JSON change-set artifacts.

use crate::analysis::{ErrorRate, TermLevelAnalysis};
use crate::change::Direction;
use crate::changeset::{ChangeCounters, ChangeSet};
use std::collections::BTreeMap;

/// `identified_changes.md`: one row per changed term and release pair, with
/// the detecting workloads annotated by direction and magnitude. Absorbed
/// multicollinearity columns are renamed (`parent ( * dropped)`) so the
/// reader sees which dropped feature the influence actually belongs to.
pub fn identified_changes(term_level: &TermLevelAnalysis) -> String {
    // term -> release pair string -> (workload, direction, magnitude)
    let mut grouped: BTreeMap<String, BTreeMap<String, Vec<(String, Direction, f64)>>> =
        BTreeMap::new();
    for entry in &term_level.changes.entries {
        let releases = entry.releases.to_string();
        for workload_changes in &entry.workloads {
            for change in &workload_changes.changes {
                let term = term_level
                    .renaming
                    .get(&change.unit)
                    .cloned()
                    .unwrap_or_else(|| change.unit.clone());
                grouped
                    .entry(term)
                    .or_default()
                    .entry(releases.clone())
                    .or_default()
                    .push((
                        workload_changes.workload.clone(),
                        change.direction,
                        change.magnitude,
                    ));
            }
        }
    }

    let mut output = String::from("| Term | Releases | Workloads |\n| :---: | :---: | :---: |\n");
    for (term, releases) in &grouped {
        for (release, detections) in releases {
            output.push_str(&format!("| {term} | {release} | "));
            for (workload, direction, magnitude) in detections {
                let arrow = match direction {
                    Direction::Improved => '↑',
                    Direction::Regressed => '↓',
                };
                output.push_str(&format!("{workload}({magnitude:.2}%{arrow}) "));
            }
            output.push_str("|\n");
        }
    }
    output
}

/// `config_changes.md`: changed configurations grouped by release pair and
/// workload.
pub fn config_changes(changes: &ChangeSet) -> String {
    let mut output = String::new();
    for entry in &changes.entries {
        output.push_str(&format!("\n# {}\n\n", entry.releases));
        for workload_changes in &entry.workloads {
            output.push_str(&format!("## {}\n", workload_changes.workload));
            for change in &workload_changes.changes {
                let options = change.unit.replace(' ', ", ");
                output.push_str(&format!("* {{{options}}} ({:.2}%)\n", change.magnitude));
            }
        }
    }
    output
}

/// Error-rate table of the learned influence models.
pub fn error_rates(case_study: &str, rates: &[ErrorRate]) -> String {
    let mut output =
        String::from("| Case Study | Workload | Release | Error Rate |\n| :---: | :---: | :---: | :---: |\n");
    for (index, rate) in rates.iter().enumerate() {
        let label = if index == 0 { case_study } else { "" };
        output.push_str(&format!(
            "| {label} | {} | {} | {:.2}% |\n",
            rate.workload, rate.revision, rate.error
        ));
    }
    output
}

/// Per-release-pair change frequency table; replaces the bar plots of the
/// measurement campaign with a plain table.
pub fn change_frequency(counters: &ChangeCounters, value_header: &str) -> String {
    let mut rows: Vec<(String, f64)> = counters
        .iter()
        .map(|(pair, value)| (pair.to_string(), value))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    let mut output = format!("| Releases | {value_header} |\n| :---: | :---: |\n");
    for (release, value) in rows {
        output.push_str(&format!("| {release} | {value:.2} |\n"));
    }
    output
}
