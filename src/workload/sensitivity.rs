//! Workload sensitivity matrix
//!
//! Lays the configuration-level change directions out as a matrix of
//! workloads × (release pair, configuration) cells: +1 improved, -1
//! regressed, 0 no change. The CSV export feeds external clustering; the
//! coverage query checks how many of all detected change signals a reference
//! subset of workloads would have caught on its own.

use crate::analysis::ConfigurationLevelAnalysis;
use crate::change::Direction;
use crate::changeset::ReleasePair;
use std::collections::BTreeSet;

/// Sign matrix of detected change directions
#[derive(Debug, Clone, PartialEq)]
pub struct SensitivityMatrix {
    pub workloads: Vec<String>,
    /// Column identities: every (release pair, configuration) that changed
    /// under at least one workload, in deterministic order.
    pub columns: Vec<(ReleasePair, String)>,
    /// `values[workload][column]`: +1 improved, -1 regressed, 0 unchanged.
    pub values: Vec<Vec<i8>>,
}

impl SensitivityMatrix {
    /// Semicolon-delimited export, one row per workload.
    pub fn to_csv(&self) -> String {
        let mut output = String::from("workload");
        for (pair, unit) in &self.columns {
            output.push(';');
            output.push_str(&format!("{pair}: {unit}"));
        }
        output.push('\n');
        for (row, workload) in self.values.iter().zip(self.workloads.iter()) {
            output.push_str(workload);
            for value in row {
                output.push(';');
                output.push_str(&value.to_string());
            }
            output.push('\n');
        }
        output
    }

    /// Distinct change signals found by the reference workloads versus all
    /// workloads; `None` when nothing changed anywhere.
    pub fn coverage(&self, reference: &[String]) -> Option<(usize, usize)> {
        let reference_rows: Vec<usize> = self
            .workloads
            .iter()
            .enumerate()
            .filter(|(_, w)| reference.contains(w))
            .map(|(i, _)| i)
            .collect();

        let mut all_signals = 0usize;
        let mut found_signals = 0usize;
        for column in 0..self.columns.len() {
            let distinct = |rows: &mut dyn Iterator<Item = usize>| -> BTreeSet<i8> {
                rows.map(|row| self.values[row][column])
                    .filter(|v| *v != 0)
                    .collect()
            };
            all_signals += distinct(&mut (0..self.workloads.len())).len();
            found_signals += distinct(&mut reference_rows.iter().copied()).len();
        }
        if all_signals == 0 {
            return None;
        }
        Some((found_signals, all_signals))
    }
}

/// Build the matrix from the configuration-level change set.
pub fn build_sensitivity_matrix(
    analysis: &ConfigurationLevelAnalysis,
    workloads: &[String],
) -> SensitivityMatrix {
    let mut columns: Vec<(ReleasePair, String)> = Vec::new();
    for entry in &analysis.changes.entries {
        for workload_changes in &entry.workloads {
            for change in &workload_changes.changes {
                let column = (entry.releases.clone(), change.unit.clone());
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
        }
    }

    let values: Vec<Vec<i8>> = workloads
        .iter()
        .map(|workload| {
            columns
                .iter()
                .map(|(pair, unit)| {
                    match analysis.changes.find(pair, workload, unit) {
                        Some(record) => match record.direction {
                            Direction::Improved => 1,
                            Direction::Regressed => -1,
                        },
                        None => 0,
                    }
                })
                .collect()
        })
        .collect();

    SensitivityMatrix {
        workloads: workloads.to_vec(),
        columns,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changeset::{ChangeRecord, ChangeSet};

    fn analysis() -> ConfigurationLevelAnalysis {
        let mut changes = ChangeSet::new();
        let pair = ReleasePair::new("r1", "r2");
        changes.insert(
            &pair,
            "w1",
            ChangeRecord {
                unit: "a b".to_string(),
                direction: Direction::Regressed,
                magnitude: -40.0,
            },
        );
        changes.insert(
            &pair,
            "w2",
            ChangeRecord {
                unit: "a b".to_string(),
                direction: Direction::Regressed,
                magnitude: -35.0,
            },
        );
        changes.insert(
            &pair,
            "w2",
            ChangeRecord {
                unit: "a c".to_string(),
                direction: Direction::Improved,
                magnitude: 20.0,
            },
        );
        ConfigurationLevelAnalysis {
            changes,
            ..ConfigurationLevelAnalysis::default()
        }
    }

    fn workloads() -> Vec<String> {
        vec!["w1".to_string(), "w2".to_string()]
    }

    #[test]
    fn test_matrix_layout() {
        let matrix = build_sensitivity_matrix(&analysis(), &workloads());
        assert_eq!(matrix.columns.len(), 2);
        assert_eq!(matrix.values, vec![vec![-1, 0], vec![-1, 1]]);
    }

    #[test]
    fn test_csv_export() {
        let matrix = build_sensitivity_matrix(&analysis(), &workloads());
        let csv = matrix.to_csv();
        assert!(csv.starts_with("workload;r1 - r2: a b;r1 - r2: a c\n"));
        assert!(csv.contains("w1;-1;0\n"));
        assert!(csv.contains("w2;-1;1\n"));
    }

    #[test]
    fn test_coverage_of_reference_subset() {
        let matrix = build_sensitivity_matrix(&analysis(), &workloads());
        // w1 alone catches the regression signal but misses the improvement
        let (found, all) = matrix.coverage(&["w1".to_string()]).unwrap();
        assert_eq!(all, 2);
        assert_eq!(found, 1);
        // Both workloads together catch everything
        let (found, all) = matrix.coverage(&workloads()).unwrap();
        assert_eq!(found, all);
    }

    #[test]
    fn test_coverage_without_changes() {
        let matrix =
            build_sensitivity_matrix(&ConfigurationLevelAnalysis::default(), &workloads());
        assert!(matrix.coverage(&workloads()).is_none());
    }
}
