//! Cambiar - Release-over-release performance change analysis for
//! configurable software systems
//!
//! Combines a hierarchical feature model, per-configuration performance
//! measurements across releases and workloads, and learned
//! performance-influence models to detect statistically meaningful
//! performance changes between consecutive releases - per configuration and
//! per influence-model term - and cross-validates the two granularities
//! against each other.

pub mod analysis;
pub mod case_study;
pub mod change;
pub mod changeset;
pub mod cli;
pub mod config;
pub mod crossval;
pub mod feature_model;
pub mod influence;
pub mod learner;
pub mod measurements;
pub mod multicollinearity;
pub mod report;
pub mod term;
pub mod workload;
