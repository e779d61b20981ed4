//! Accumulated change records and their JSON artifact form
//!
//! Change sets are produced independently at configuration level and term
//! level and cross-referenced later, so they have to round-trip through JSON
//! without losing the insertion order that makes reports deterministic. The
//! containers are plain vectors keyed by position, not string-keyed maps.

use crate::change::Direction;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A pair of consecutive releases, ordered from earlier to later
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReleasePair {
    pub from: String,
    pub to: String,
}

impl ReleasePair {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        ReleasePair {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl fmt::Display for ReleasePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.from, self.to)
    }
}

/// One detected change, attributed to a configuration or a term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Canonical term string, or space-joined active options for a
    /// configuration identity.
    pub unit: String,
    pub direction: Direction,
    /// Signed percentage; positive means the later release is faster.
    pub magnitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadChanges {
    pub workload: String,
    pub changes: Vec<ChangeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleasePairChanges {
    pub releases: ReleasePair,
    pub workloads: Vec<WorkloadChanges>,
}

/// Change records grouped by release pair and workload, insertion-ordered
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub entries: Vec<ReleasePairChanges>,
}

impl ChangeSet {
    pub fn new() -> Self {
        ChangeSet::default()
    }

    /// Insert a record; re-insertion of the same unit for the same
    /// (release pair, workload) is a no-op. Returns whether it was added.
    pub fn insert(&mut self, pair: &ReleasePair, workload: &str, record: ChangeRecord) -> bool {
        let entry = match self.entries.iter_mut().find(|e| e.releases == *pair) {
            Some(entry) => entry,
            None => {
                self.entries.push(ReleasePairChanges {
                    releases: pair.clone(),
                    workloads: Vec::new(),
                });
                self.entries.last_mut().unwrap()
            }
        };
        let slot = match entry.workloads.iter_mut().find(|w| w.workload == workload) {
            Some(slot) => slot,
            None => {
                entry.workloads.push(WorkloadChanges {
                    workload: workload.to_string(),
                    changes: Vec::new(),
                });
                entry.workloads.last_mut().unwrap()
            }
        };
        if slot.changes.iter().any(|c| c.unit == record.unit) {
            return false;
        }
        slot.changes.push(record);
        true
    }

    pub fn release_pairs(&self) -> impl Iterator<Item = &ReleasePair> {
        self.entries.iter().map(|e| &e.releases)
    }

    pub fn workloads<'a>(
        &'a self,
        pair: &'a ReleasePair,
    ) -> impl Iterator<Item = &'a WorkloadChanges> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.releases == *pair)
            .flat_map(|e| e.workloads.iter())
    }

    pub fn changes(&self, pair: &ReleasePair, workload: &str) -> &[ChangeRecord] {
        self.entries
            .iter()
            .find(|e| e.releases == *pair)
            .and_then(|e| e.workloads.iter().find(|w| w.workload == workload))
            .map(|w| w.changes.as_slice())
            .unwrap_or(&[])
    }

    pub fn find(&self, pair: &ReleasePair, workload: &str, unit: &str) -> Option<&ChangeRecord> {
        self.changes(pair, workload).iter().find(|c| c.unit == unit)
    }

    pub fn contains(&self, pair: &ReleasePair, workload: &str, unit: &str) -> bool {
        self.find(pair, workload, unit).is_some()
    }

    pub fn total_changes(&self) -> usize {
        self.entries
            .iter()
            .flat_map(|e| e.workloads.iter())
            .map(|w| w.changes.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_changes() == 0
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        use anyhow::Context;
        let text = self.to_json()?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write change set: {}", path.display()))
    }

    pub fn read_json(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read change set: {}", path.display()))?;
        Ok(Self::from_json(&text)?)
    }
}

/// Running per-release-pair tallies, resettable per case study
///
/// Kept separate from the change sets: the sets are the artifact, the
/// counters feed summary frequency reporting and must never leak across case
/// studies.
#[derive(Debug, Clone, Default)]
pub struct ChangeCounters {
    counts: Vec<(ReleasePair, f64)>,
}

impl ChangeCounters {
    pub fn new() -> Self {
        ChangeCounters::default()
    }

    pub fn record(&mut self, pair: &ReleasePair, amount: f64) {
        match self.counts.iter_mut().find(|(p, _)| p == pair) {
            Some((_, count)) => *count += amount,
            None => self.counts.push((pair.clone(), amount)),
        }
    }

    pub fn get(&self, pair: &ReleasePair) -> f64 {
        self.counts
            .iter()
            .find(|(p, _)| p == pair)
            .map(|(_, c)| *c)
            .unwrap_or(0.0)
    }

    /// Normalize all tallies, e.g. to average percentages over workloads.
    pub fn divide_all(&mut self, divisor: f64) {
        for (_, count) in &mut self.counts {
            *count /= divisor;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ReleasePair, f64)> {
        self.counts.iter().map(|(p, c)| (p, *c))
    }

    pub fn reset(&mut self) {
        self.counts.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(unit: &str, direction: Direction, magnitude: f64) -> ChangeRecord {
        ChangeRecord {
            unit: unit.to_string(),
            direction,
            magnitude,
        }
    }

    #[test]
    fn test_release_pair_display() {
        let pair = ReleasePair::new("4_2", "4_3");
        assert_eq!(pair.to_string(), "4_2 - 4_3");
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut set = ChangeSet::new();
        let pair = ReleasePair::new("r1", "r2");
        assert!(set.insert(&pair, "enwik9", record("lzo", Direction::Regressed, -12.5)));
        assert!(set.contains(&pair, "enwik9", "lzo"));
        assert!(!set.contains(&pair, "davis", "lzo"));
        assert_eq!(set.total_changes(), 1);
    }

    #[test]
    fn test_reinsertion_is_idempotent() {
        let mut set = ChangeSet::new();
        let pair = ReleasePair::new("r1", "r2");
        assert!(set.insert(&pair, "enwik9", record("lzo", Direction::Regressed, -12.5)));
        assert!(!set.insert(&pair, "enwik9", record("lzo", Direction::Regressed, -12.5)));
        assert_eq!(set.total_changes(), 1);
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let mut set = ChangeSet::new();
        let first = ReleasePair::new("r1", "r2");
        let second = ReleasePair::new("r2", "r3");
        set.insert(&second, "w", record("b", Direction::Improved, 3.0));
        set.insert(&first, "w", record("a", Direction::Improved, 2.0));
        let pairs: Vec<&ReleasePair> = set.release_pairs().collect();
        assert_eq!(pairs, vec![&second, &first]);
    }

    #[test]
    fn test_json_round_trip_keeps_order() {
        let mut set = ChangeSet::new();
        let pair = ReleasePair::new("r1", "r2");
        set.insert(&pair, "w2", record("z", Direction::Improved, 5.0));
        set.insert(&pair, "w1", record("a", Direction::Regressed, -9.0));
        let json = set.to_json().unwrap();
        let back = ChangeSet::from_json(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_counters_record_and_reset() {
        let mut counters = ChangeCounters::new();
        let pair = ReleasePair::new("r1", "r2");
        counters.record(&pair, 1.0);
        counters.record(&pair, 2.0);
        assert!((counters.get(&pair) - 3.0).abs() < 1e-9);
        counters.divide_all(3.0);
        assert!((counters.get(&pair) - 1.0).abs() < 1e-9);
        counters.reset();
        assert!(counters.is_empty());
    }
}
