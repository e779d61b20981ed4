//! Case-study loading
//!
//! A case study bundles everything known about one configurable system: its
//! feature model, the per-configuration measurements across releases and
//! workloads, and the matching relative-deviation table. All three are read
//! once from the case-study directory and immutable afterwards.

use crate::change::Observation;
use crate::config::CaseStudyConfig;
use crate::feature_model::FeatureModel;
use crate::measurements::MeasurementTable;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const FEATURE_MODEL_FILE: &str = "FeatureModel.json";
pub const MEASUREMENTS_FILE: &str = "measurements.csv";
pub const DEVIATIONS_FILE: &str = "deviations.csv";
pub const MODELS_DIR: &str = "models";
pub const MODELS_FILE: &str = "models.csv";

/// One loaded case study
#[derive(Debug, Clone)]
pub struct CaseStudy {
    pub name: String,
    pub feature_model: FeatureModel,
    pub configurations: MeasurementTable,
    pub deviations: MeasurementTable,
    pub workloads: Vec<String>,
    /// Factor that converts recorded performance into seconds.
    pub division_factor: f64,
    /// Sentinel performance value marking timed-out runs.
    pub timeout: Option<f64>,
}

impl CaseStudy {
    /// Load a case study from its directory.
    ///
    /// Expects `FeatureModel.json`, `measurements.csv`, and `deviations.csv`;
    /// any parse failure aborts the case study.
    pub fn load(directory: &Path, config: &CaseStudyConfig) -> Result<Self> {
        let feature_model_path = directory.join(FEATURE_MODEL_FILE);
        let text = std::fs::read_to_string(&feature_model_path).with_context(|| {
            format!("Failed to read feature model: {}", feature_model_path.display())
        })?;
        let feature_model = FeatureModel::from_json(&text)
            .with_context(|| format!("Malformed feature model for {}", config.name))?;

        let configurations =
            MeasurementTable::from_path(&directory.join(MEASUREMENTS_FILE), &config.workloads)
                .with_context(|| format!("Failed to load measurements for {}", config.name))?;
        let deviations =
            MeasurementTable::from_path(&directory.join(DEVIATIONS_FILE), &config.workloads)
                .with_context(|| format!("Failed to load deviations for {}", config.name))?;

        Ok(CaseStudy {
            name: config.name.clone(),
            feature_model,
            configurations,
            deviations,
            workloads: config.workloads.clone(),
            division_factor: config.division_factor(),
            timeout: config.timeout,
        })
    }

    /// Path of the learned influence-model table for this case study.
    pub fn models_path(directory: &Path) -> PathBuf {
        directory.join(MODELS_DIR).join(MODELS_FILE)
    }

    /// Revisions in measurement order; this is the release timeline.
    pub fn revisions(&self) -> Vec<String> {
        self.configurations.revisions()
    }

    /// Workload-level observation: mean performance over all configurations
    /// (timeouts excluded) with the mean relative deviation.
    pub fn workload_observation(&self, workload: &str, revision: &str) -> Option<Observation> {
        let mean = self
            .configurations
            .mean_performance(workload, revision, self.timeout)?;
        let deviation = self.deviations.mean_performance(workload, revision, None)?;
        Some(Observation::new(mean, deviation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaseStudyConfig;
    use std::fs;
    use tempfile::TempDir;

    fn write_case_study(dir: &Path) {
        fs::write(
            dir.join(FEATURE_MODEL_FILE),
            r#"{
                "binaryOptions": [
                    {"name": "root", "optional": false, "parent": "root",
                     "excludedOptions": [], "impliedOptions": []},
                    {"name": "lzo", "optional": true, "parent": "root",
                     "excludedOptions": [], "impliedOptions": []}
                ],
                "numericOptions": []
            }"#,
        )
        .unwrap();
        fs::write(
            dir.join(MEASUREMENTS_FILE),
            "root;lzo;enwik9;revision;performance\n\
             1;0;1;r1;10.0\n\
             1;1;1;r1;14.0\n\
             1;0;1;r2;11.0\n\
             1;1;1;r2;13.0\n",
        )
        .unwrap();
        fs::write(
            dir.join(DEVIATIONS_FILE),
            "root;lzo;enwik9;revision;performance\n\
             1;0;1;r1;0.05\n\
             1;1;1;r1;0.05\n\
             1;0;1;r2;0.04\n\
             1;1;1;r2;0.06\n",
        )
        .unwrap();
    }

    fn config() -> CaseStudyConfig {
        CaseStudyConfig {
            name: "demo".to_string(),
            workloads: vec!["enwik9".to_string()],
            milliseconds: false,
            timeout: None,
            reference_workloads: Vec::new(),
        }
    }

    #[test]
    fn test_load_case_study() {
        let dir = TempDir::new().unwrap();
        write_case_study(dir.path());
        let case_study = CaseStudy::load(dir.path(), &config()).unwrap();
        assert_eq!(case_study.name, "demo");
        assert_eq!(case_study.revisions(), vec!["r1", "r2"]);
        assert_eq!(case_study.division_factor, 1.0);
        assert!(case_study.feature_model.contains("lzo"));
    }

    #[test]
    fn test_workload_observation() {
        let dir = TempDir::new().unwrap();
        write_case_study(dir.path());
        let case_study = CaseStudy::load(dir.path(), &config()).unwrap();
        let obs = case_study.workload_observation("enwik9", "r1").unwrap();
        assert!((obs.mean - 12.0).abs() < 1e-3);
        assert!((obs.deviation - 0.05).abs() < 1e-3);
        assert!(case_study.workload_observation("enwik9", "r9").is_none());
    }

    #[test]
    fn test_missing_feature_model_is_fatal() {
        let dir = TempDir::new().unwrap();
        assert!(CaseStudy::load(dir.path(), &config()).is_err());
    }

    #[test]
    fn test_malformed_feature_model_is_fatal() {
        let dir = TempDir::new().unwrap();
        write_case_study(dir.path());
        fs::write(
            dir.path().join(FEATURE_MODEL_FILE),
            r#"{"binaryOptions": [
                {"name": "a", "optional": false, "parent": "missing",
                 "excludedOptions": [], "impliedOptions": []}
            ]}"#,
        )
        .unwrap();
        assert!(CaseStudy::load(dir.path(), &config()).is_err());
    }
}
