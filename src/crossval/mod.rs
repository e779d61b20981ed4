//! Cross-validation between term-level and configuration-level change sets
//!
//! The two analysis levels watch the same systems through different lenses,
//! so each can validate the other: precision asks how many term-level
//! changes are backed by at least one changed configuration, recall asks how
//! many configuration-level changes surface as a change of their most
//! specific term. Changes that fail to confirm are attributed to a confound
//! category instead of being silently dropped.

mod precision;
mod recall;

pub use precision::{analyze_precision, PrecisionReport};
pub use recall::{analyze_recall, RecallReport};

/// Per-workload confirmed/total tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkloadTally {
    pub confirmed: usize,
    pub total: usize,
}

impl WorkloadTally {
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.confirmed as f64 / self.total as f64 * 100.0
    }
}

/// Active options of a machine-readable configuration identity.
fn active_set(unit: &str) -> Vec<&str> {
    unit.split(' ').filter(|o| !o.is_empty()).collect()
}

#[cfg(test)]
mod tests;
