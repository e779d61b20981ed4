//! Release-over-release change analysis at two granularities
//!
//! Configuration-level analysis compares raw per-configuration measurements;
//! term-level analysis compares influence-model coefficients after
//! multicollinearity resolution. Both apply the same noise-threshold decision
//! rule and accumulate into per-case-study change sets, which downstream
//! cross-validation reads.

mod configuration_level;
mod term_level;

pub use configuration_level::{analyze_configurations, ConfigurationLevelAnalysis, DetectedBy};
pub use term_level::{analyze_terms, ErrorRate, TermLevelAnalysis};
