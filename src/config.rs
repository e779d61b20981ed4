//! Analysis configuration loaded from TOML
//!
//! Everything that was environment-specific in the measurement campaign
//! lives here: the workload list of every case study, whether its
//! measurements are recorded in milliseconds, the timeout sentinel, the
//! cross-validation thresholds, and the external learner command. Keeping
//! these in configuration makes a run reproducible without recompilation.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Top-level analysis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(rename = "case_study")]
    pub case_studies: Vec<CaseStudyConfig>,

    #[serde(default)]
    pub thresholds: Thresholds,

    #[serde(default)]
    pub learner: Option<LearnerConfig>,
}

/// Per-case-study settings
#[derive(Debug, Clone, Deserialize)]
pub struct CaseStudyConfig {
    pub name: String,

    /// Workload indicator columns of the measurement files.
    pub workloads: Vec<String>,

    /// True when performance is recorded in milliseconds; influence-model
    /// coefficients are always in seconds.
    #[serde(default)]
    pub milliseconds: bool,

    /// Sentinel performance value marking timed-out runs, excluded from
    /// workload means.
    #[serde(default)]
    pub timeout: Option<f64>,

    /// Reference workload subset for the sensitivity coverage report.
    #[serde(default)]
    pub reference_workloads: Vec<String>,
}

impl CaseStudyConfig {
    /// Factor that converts recorded performance into seconds.
    pub fn division_factor(&self) -> f64 {
        if self.milliseconds {
            1000.0
        } else {
            1.0
        }
    }
}

/// Purpose-built cross-validation thresholds
///
/// These are heuristics calibrated against the measurement setup, not
/// statistical parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Influence models with a fit error above this percentage are treated
    /// as unreliable when attributing unconfirmed changes.
    pub model_error: f64,

    /// Mean performance below this floor (seconds) is considered too fast to
    /// measure reliably.
    pub low_performance: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            model_error: 10.0,
            low_performance: 0.1,
        }
    }
}

/// External model-learning tool invocation
#[derive(Debug, Clone, Deserialize)]
pub struct LearnerConfig {
    /// Command executed per learning script; the script path is appended.
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,
}

impl AnalysisConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: AnalysisConfig =
            toml::from_str(text).context("Failed to parse analysis configuration")?;
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration: {}", path.display()))?;
        Self::from_toml(&text)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.case_studies.is_empty() {
            return Err("configuration defines no case studies".to_string());
        }
        for case_study in &self.case_studies {
            if case_study.workloads.is_empty() {
                return Err(format!(
                    "case study {} defines no workloads",
                    case_study.name
                ));
            }
            for reference in &case_study.reference_workloads {
                if !case_study.workloads.contains(reference) {
                    return Err(format!(
                        "case study {}: reference workload {} is not a workload",
                        case_study.name, reference
                    ));
                }
            }
            let duplicates = self
                .case_studies
                .iter()
                .filter(|c| c.name == case_study.name)
                .count();
            if duplicates > 1 {
                return Err(format!("duplicate case study: {}", case_study.name));
            }
        }
        if self.thresholds.model_error <= 0.0 {
            return Err(format!(
                "model_error threshold must be positive, got {}",
                self.thresholds.model_error
            ));
        }
        if self.thresholds.low_performance < 0.0 {
            return Err(format!(
                "low_performance floor must be non-negative, got {}",
                self.thresholds.low_performance
            ));
        }
        Ok(())
    }

    pub fn case_study(&self, name: &str) -> Option<&CaseStudyConfig> {
        self.case_studies.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[[case_study]]
name = "tar"
workloads = ["enwik9", "davis"]
milliseconds = true
timeout = 1800.0
reference_workloads = ["enwik9"]

[[case_study]]
name = "z3"
workloads = ["LRA"]

[thresholds]
model_error = 12.5
low_performance = 0.05

[learner]
command = "mono"
args = ["/opt/splc/CommandLine.exe"]
"#;

    #[test]
    fn test_parse_full_config() {
        let config = AnalysisConfig::from_toml(CONFIG).unwrap();
        assert_eq!(config.case_studies.len(), 2);
        let tar = config.case_study("tar").unwrap();
        assert_eq!(tar.workloads.len(), 2);
        assert_eq!(tar.division_factor(), 1000.0);
        assert_eq!(tar.timeout, Some(1800.0));
        assert_eq!(config.thresholds.model_error, 12.5);
        assert_eq!(config.learner.as_ref().unwrap().command, "mono");
    }

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::from_toml(
            "[[case_study]]\nname = \"z3\"\nworkloads = [\"LRA\"]\n",
        )
        .unwrap();
        let z3 = config.case_study("z3").unwrap();
        assert_eq!(z3.division_factor(), 1.0);
        assert_eq!(z3.timeout, None);
        assert_eq!(config.thresholds.model_error, 10.0);
        assert_eq!(config.thresholds.low_performance, 0.1);
        assert!(config.learner.is_none());
    }

    #[test]
    fn test_empty_workloads_rejected() {
        let result =
            AnalysisConfig::from_toml("[[case_study]]\nname = \"z3\"\nworkloads = []\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_case_study_rejected() {
        let text = "\
[[case_study]]
name = \"z3\"
workloads = [\"LRA\"]

[[case_study]]
name = \"z3\"
workloads = [\"QF_FP\"]
";
        assert!(AnalysisConfig::from_toml(text).is_err());
    }

    #[test]
    fn test_unknown_reference_workload_rejected() {
        let text = "\
[[case_study]]
name = \"z3\"
workloads = [\"LRA\"]
reference_workloads = [\"QF_FP\"]
";
        assert!(AnalysisConfig::from_toml(text).is_err());
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let text = "\
[[case_study]]
name = \"z3\"
workloads = [\"LRA\"]

[thresholds]
model_error = 0.0
";
        assert!(AnalysisConfig::from_toml(text).is_err());
    }
}
