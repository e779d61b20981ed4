//! Performance-influence model tables
//!
//! A learned influence model approximates performance as the sum of the
//! coefficients of all active terms. The table holds one row per
//! (workload, revision) with one column per term plus the model's fit error,
//! exactly as the external learning tool exports it. The column set is shared
//! by all rows; a cell left empty means the learner pruned that term for the
//! row, which is represented as NaN and never confused with a zero
//! coefficient.

use crate::term::Term;
use std::path::Path;
use thiserror::Error;

use crate::measurements::{REVISION_COLUMN, WORKLOAD_COLUMN};

const ERROR_COLUMN: &str = "error";

/// Errors for influence-model parsing and lookup
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("influence-model table is empty")]
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

    #[error("no influence model for workload {workload}, revision {revision}")]
    MissingModel { workload: String, revision: String },

    #[error("influence model for workload {workload}, revision {revision} is empty")]
    EmptyModel { workload: String, revision: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for influence-model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// One learned model: coefficients aligned with the table's term columns
#[derive(Debug, Clone)]
pub struct InfluenceModelRow {
    pub workload: String,
    pub revision: String,
    /// NaN marks a term the learner pruned for this row.
    pub coefficients: Vec<f64>,
    /// Relative fit error of the model, in percent.
    pub error: f64,
}

/// All learned models of one case study, sharing a single column set
#[derive(Debug, Clone)]
pub struct InfluenceModelTable {
    pub terms: Vec<Term>,
    pub rows: Vec<InfluenceModelRow>,
}

impl InfluenceModelTable {
    /// Parse the semicolon-delimited model table:
    /// `workload;revision;<term...>;error`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());
        let header_line = lines.next().ok_or(ModelError::Empty)?;
        let header: Vec<&str> = header_line.split(';').map(str::trim).collect();

        if header.first() != Some(&WORKLOAD_COLUMN) {
            return Err(ModelError::MissingColumn(WORKLOAD_COLUMN.to_string()));
        }
        if header.get(1) != Some(&REVISION_COLUMN) {
            return Err(ModelError::MissingColumn(REVISION_COLUMN.to_string()));
        }
        if header.last() != Some(&ERROR_COLUMN) {
            return Err(ModelError::MissingColumn(ERROR_COLUMN.to_string()));
        }
        if header.len() < 4 {
            return Err(ModelError::Empty);
        }

        let terms: Vec<Term> = header[2..header.len() - 1]
            .iter()
            .map(|column| Term::parse(column))
            .collect();

        let mut rows = Vec::new();
        for (offset, line) in lines.enumerate() {
            let row_number = offset + 2;
            let fields: Vec<&str> = line.split(';').map(str::trim).collect();
            if fields.len() != header.len() {
                return Err(ModelError::RowWidth {
                    row: row_number,
                    actual: fields.len(),
                    expected: header.len(),
                });
            }

            let parse_cell = |column: &str, value: &str| -> Result<f64> {
                value.parse::<f64>().map_err(|_| ModelError::InvalidNumber {
                    row: row_number,
                    column: column.to_string(),
                    value: value.to_string(),
                })
            };

            let mut coefficients = Vec::with_capacity(terms.len());
            for (index, value) in fields[2..fields.len() - 1].iter().enumerate() {
                if value.is_empty() {
                    coefficients.push(f64::NAN);
                } else {
                    coefficients.push(parse_cell(header[index + 2], value)?);
                }
            }

            rows.push(InfluenceModelRow {
                workload: fields[0].to_string(),
                revision: fields[1].to_string(),
                coefficients,
                error: parse_cell(ERROR_COLUMN, fields[fields.len() - 1])?,
            });
        }

        Ok(InfluenceModelTable { terms, rows })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn row(&self, workload: &str, revision: &str) -> Option<&InfluenceModelRow> {
        self.rows
            .iter()
            .find(|row| row.workload == workload && row.revision == revision)
    }

    pub fn error_for(&self, workload: &str, revision: &str) -> Option<f64> {
        self.row(workload, revision).map(|row| row.error)
    }

    /// Assemble the revision-major coefficient matrix for one workload.
    ///
    /// Term-level analysis cannot compare anything when a model is missing or
    /// entirely empty for a (workload, revision), so both are fatal here.
    pub fn matrix(&self, workload: &str, revisions: &[String]) -> Result<CoefficientMatrix> {
        let mut values = Vec::with_capacity(revisions.len());
        for revision in revisions {
            let row = self
                .row(workload, revision)
                .ok_or_else(|| ModelError::MissingModel {
                    workload: workload.to_string(),
                    revision: revision.clone(),
                })?;
            if row.coefficients.iter().all(|c| !c.is_finite()) {
                return Err(ModelError::EmptyModel {
                    workload: workload.to_string(),
                    revision: revision.clone(),
                });
            }
            values.push(row.coefficients.clone());
        }
        Ok(CoefficientMatrix {
            terms: self.terms.clone(),
            revisions: revisions.to_vec(),
            values,
        })
    }
}

/// Revision-major coefficient matrix for one workload
///
/// `values[r][t]` is the coefficient of term `t` in revision `r`; NaN marks a
/// pruned term. Column positions are shared across all revisions.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientMatrix {
    pub terms: Vec<Term>,
    pub revisions: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CoefficientMatrix {
    pub fn value(&self, revision_index: usize, term_index: usize) -> f64 {
        self.values[revision_index][term_index]
    }

    /// Number of terms the learner kept (finite coefficient) in a revision.
    pub fn terms_present(&self, revision_index: usize) -> usize {
        self.values[revision_index]
            .iter()
            .filter(|value| value.is_finite())
            .count()
    }

    /// Column index of the singleton term naming `feature`, if present.
    pub fn singleton_column(&self, feature: &str) -> Option<usize> {
        self.terms
            .iter()
            .position(|term| term.is_singleton() && term.features()[0] == feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODELS: &str = "\
workload;revision;base;lzo;base * lzo;error
enwik9;r1;10.0;2.0;0.5;3.2
enwik9;r2;10.5;;0.5;4.0
davis;r1;20.0;3.0;1.0;2.1
davis;r2;20.0;3.1;1.0;2.4
";

    #[test]
    fn test_parse_header_terms() {
        let table = InfluenceModelTable::parse(MODELS).unwrap();
        assert_eq!(table.terms.len(), 3);
        assert_eq!(table.terms[2], Term::parse("base * lzo"));
        assert_eq!(table.rows.len(), 4);
    }

    #[test]
    fn test_empty_cell_is_nan_not_zero() {
        let table = InfluenceModelTable::parse(MODELS).unwrap();
        let row = table.row("enwik9", "r2").unwrap();
        assert!(row.coefficients[1].is_nan());
        assert!((row.coefficients[0] - 10.5).abs() < 1e-9);
    }

    #[test]
    fn test_error_column() {
        let table = InfluenceModelTable::parse(MODELS).unwrap();
        assert!((table.error_for("davis", "r2").unwrap() - 2.4).abs() < 1e-9);
        assert!(table.error_for("davis", "r9").is_none());
    }

    #[test]
    fn test_matrix_orders_rows_by_given_revisions() {
        let table = InfluenceModelTable::parse(MODELS).unwrap();
        let matrix = table
            .matrix("enwik9", &["r1".to_string(), "r2".to_string()])
            .unwrap();
        assert_eq!(matrix.values.len(), 2);
        assert!((matrix.value(0, 0) - 10.0).abs() < 1e-9);
        assert!((matrix.value(1, 0) - 10.5).abs() < 1e-9);
        assert_eq!(matrix.terms_present(0), 3);
        assert_eq!(matrix.terms_present(1), 2);
    }

    #[test]
    fn test_matrix_missing_model_is_fatal() {
        let table = InfluenceModelTable::parse(MODELS).unwrap();
        let err = table
            .matrix("enwik9", &["r1".to_string(), "r3".to_string()])
            .unwrap_err();
        assert!(matches!(err, ModelError::MissingModel { revision, .. } if revision == "r3"));
    }

    #[test]
    fn test_matrix_empty_model_is_fatal() {
        let text = "\
workload;revision;base;lzo;error
enwik9;r1;;;5.0
";
        let table = InfluenceModelTable::parse(text).unwrap();
        let err = table.matrix("enwik9", &["r1".to_string()]).unwrap_err();
        assert!(matches!(err, ModelError::EmptyModel { .. }));
    }

    #[test]
    fn test_singleton_column_lookup() {
        let table = InfluenceModelTable::parse(MODELS).unwrap();
        let matrix = table.matrix("davis", &["r1".to_string()]).unwrap();
        assert_eq!(matrix.singleton_column("lzo"), Some(1));
        assert_eq!(matrix.singleton_column("base * lzo"), None);
        assert_eq!(matrix.singleton_column("ghost"), None);
    }

    #[test]
    fn test_header_layout_is_enforced() {
        assert!(matches!(
            InfluenceModelTable::parse("revision;workload;base;error\n").unwrap_err(),
            ModelError::MissingColumn(column) if column == WORKLOAD_COLUMN
        ));
        assert!(matches!(
            InfluenceModelTable::parse("workload;revision;base\n").unwrap_err(),
            ModelError::MissingColumn(column) if column == ERROR_COLUMN
        ));
    }

    #[test]
    fn test_invalid_coefficient_value() {
        let text = "workload;revision;base;error\nenwik9;r1;abc;1.0\n";
        assert!(matches!(
            InfluenceModelTable::parse(text).unwrap_err(),
            ModelError::InvalidNumber { column, .. } if column == "base"
        ));
    }}
