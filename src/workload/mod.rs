//! Workload-oriented follow-up analyses
//!
//! Both consume the configuration-level results: frequency asks how many
//! workloads detect each change (how lucky does workload selection have to
//! be), sensitivity lays the detected change directions out per workload for
//! clustering.

mod frequency;
mod sensitivity;

pub use frequency::{analyze_frequency, FrequencyReport};
pub use sensitivity::{build_sensitivity_matrix, SensitivityMatrix};
