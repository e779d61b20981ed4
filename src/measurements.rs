//! Delimited measurement and deviation tables
//!
//! Measurement files are semicolon-delimited text with one column per
//! feature, one indicator column per workload, a `revision` column, and a
//! `performance` column. The workload indicators are collapsed into a single
//! `workload` category during parsing. Deviation files share the shape, with
//! `performance` holding a relative measurement deviation instead of a value.

use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use trueno::Vector;

pub const WORKLOAD_COLUMN: &str = "workload";
pub const REVISION_COLUMN: &str = "revision";
pub const PERFORMANCE_COLUMN: &str = "performance";

/// Legacy aggregate column dropped during workload collapsing.
const WORKLOADS_COLUMN: &str = "workloads";

/// Errors for measurement-table parsing
#[derive(Error, Debug)]
pub enum TableError {
    #[error("measurement table is empty")]
    Empty,

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("row {row} has {actual} fields, expected {expected}")]
    RowWidth {
        row: usize,
        actual: usize,
        expected: usize,
    },

    #[error("row {row}: invalid numeric value '{value}' in column {column}")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row} activates no configured workload")]
    UnknownWorkload { row: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for measurement-table operations
pub type Result<T> = std::result::Result<T, TableError>;

/// One measured configuration for a single workload and revision
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRow {
    /// Option values aligned with `MeasurementTable::columns`.
    pub values: Vec<String>,
    pub workload: String,
    pub revision: String,
    pub performance: f64,
}

/// A parsed measurement (or deviation) table
#[derive(Debug, Clone)]
pub struct MeasurementTable {
    /// Feature columns in file order; workload indicators already removed.
    pub columns: Vec<String>,
    pub rows: Vec<MeasurementRow>,
}

impl MeasurementTable {
    /// Parse semicolon-delimited text, collapsing the given workload
    /// indicator columns into the single `workload` category.
    pub fn parse(text: &str, workloads: &[String]) -> Result<Self> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());
        let header_line = lines.next().ok_or(TableError::Empty)?;
        let header: Vec<&str> = header_line.split(';').map(str::trim).collect();

        let workload_set: HashSet<&str> = workloads.iter().map(String::as_str).collect();
        let mut feature_positions: Vec<usize> = Vec::new();
        let mut workload_positions: Vec<(usize, &str)> = Vec::new();
        let mut revision_position = None;
        let mut performance_position = None;

        for (index, name) in header.iter().enumerate() {
            if *name == REVISION_COLUMN {
                revision_position = Some(index);
            } else if *name == PERFORMANCE_COLUMN {
                performance_position = Some(index);
            } else if *name == WORKLOADS_COLUMN {
                // dropped: superseded by the collapsed workload category
            } else if workload_set.contains(name) {
                workload_positions.push((index, name));
            } else {
                feature_positions.push(index);
            }
        }

        let revision_position = revision_position
            .ok_or_else(|| TableError::MissingColumn(REVISION_COLUMN.to_string()))?;
        let performance_position = performance_position
            .ok_or_else(|| TableError::MissingColumn(PERFORMANCE_COLUMN.to_string()))?;

        let columns: Vec<String> = feature_positions
            .iter()
            .map(|&i| header[i].to_string())
            .collect();

        let mut rows = Vec::new();
        for (offset, line) in lines.enumerate() {
            let row_number = offset + 2;
            let fields: Vec<&str> = line.split(';').map(str::trim).collect();
            if fields.len() != header.len() {
                return Err(TableError::RowWidth {
                    row: row_number,
                    actual: fields.len(),
                    expected: header.len(),
                });
            }

            let workload = workload_positions
                .iter()
                .find(|(i, _)| fields[*i] == "1")
                .map(|(_, name)| (*name).to_string())
                .ok_or(TableError::UnknownWorkload { row: row_number })?;

            let raw_performance = fields[performance_position];
            let performance =
                raw_performance
                    .parse::<f64>()
                    .map_err(|_| TableError::InvalidNumber {
                        row: row_number,
                        column: PERFORMANCE_COLUMN.to_string(),
                        value: raw_performance.to_string(),
                    })?;

            rows.push(MeasurementRow {
                values: feature_positions
                    .iter()
                    .map(|&i| fields[i].to_string())
                    .collect(),
                workload,
                revision: fields[revision_position].to_string(),
                performance,
            });
        }

        Ok(MeasurementTable { columns, rows })
    }

    pub fn from_path(path: &Path, workloads: &[String]) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, workloads)
    }

    /// Revisions in first-seen order; downstream analyses rely on this order
    /// matching the release timeline of the input.
    pub fn revisions(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut revisions = Vec::new();
        for row in &self.rows {
            if seen.insert(row.revision.as_str()) {
                revisions.push(row.revision.clone());
            }
        }
        revisions
    }

    pub fn rows_for<'a>(
        &'a self,
        workload: &'a str,
        revision: &'a str,
    ) -> impl Iterator<Item = &'a MeasurementRow> {
        self.rows
            .iter()
            .filter(move |row| row.workload == workload && row.revision == revision)
    }

    pub fn workload_rows<'a>(&'a self, workload: &'a str) -> impl Iterator<Item = &'a MeasurementRow> {
        self.rows.iter().filter(move |row| row.workload == workload)
    }

    /// Mean performance over all configurations of a workload and revision,
    /// excluding rows that hit the timeout sentinel.
    pub fn mean_performance(
        &self,
        workload: &str,
        revision: &str,
        timeout: Option<f64>,
    ) -> Option<f64> {
        let samples: Vec<f64> = self
            .rows_for(workload, revision)
            .map(|row| row.performance)
            .filter(|value| timeout.map_or(true, |t| *value != t))
            .collect();
        sample_mean(&samples)
    }

    /// Active binary options of a row (value `"1"`), excluding `root`.
    pub fn active_options<'a>(&'a self, row: &'a MeasurementRow) -> Vec<&'a str> {
        self.columns
            .iter()
            .zip(row.values.iter())
            .filter(|(name, value)| value.as_str() == "1" && name.as_str() != "root")
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Space-joined active options: the machine-readable configuration
    /// identity used in change records.
    pub fn configuration_identity(&self, row: &MeasurementRow) -> String {
        self.active_options(row).join(" ")
    }
}

/// Mean of a sample vector via trueno; `None` for empty input.
pub fn sample_mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let floats: Vec<f32> = samples.iter().map(|v| *v as f32).collect();
    Vector::from_slice(&floats).mean().ok().map(f64::from)
}

/// Standard deviation of a sample vector via trueno; `None` for empty input.
pub fn sample_stddev(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let floats: Vec<f32> = samples.iter().map(|v| *v as f32).collect();
    Vector::from_slice(&floats).stddev().ok().map(f64::from)
}
