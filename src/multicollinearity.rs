//! Multicollinearity resolution for learned influence models
//!
//! A linear fit over a constrained configuration space cannot keep every
//! feature column: one member of every alternative group and every optional
//! feature is dropped to keep the design matrix non-singular, and the
//! dropped feature's influence is absorbed by the nearest retained mandatory
//! ancestor. Before coefficients can be compared across releases, that
//! absorbed influence has to be redistributed back onto the surviving
//! correlated terms. The merge plan computed here records the
//! redistribution as column additions over the model matrix.

use crate::feature_model::{FeatureModel, Result as FmResult, ROOT};
use crate::influence::CoefficientMatrix;
use crate::term::Term;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// A feature the learner dropped, with the ancestor that absorbed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedFeature {
    pub name: String,
    pub suitable_parent: String,
}

/// Identify the features a linear fit drops for multicollinearity.
///
/// Of every alternative group, the first member (document order) whose
/// siblings are not already marked is dropped; every optional feature is
/// dropped. Each dropped feature is mapped to its suitable parent.
pub fn identify_dropped(model: &FeatureModel) -> FmResult<Vec<DroppedFeature>> {
    let mut dropped_names: Vec<String> = Vec::new();
    for name in model.names() {
        let feature = model.get(name)?;
        if !feature.alternatives.is_empty() {
            let sibling_dropped = feature
                .alternatives
                .iter()
                .any(|alt| dropped_names.iter().any(|d| d == alt));
            if !sibling_dropped {
                dropped_names.push(name.to_string());
            }
        } else if feature.is_binary() && !feature.is_mandatory() {
            dropped_names.push(name.to_string());
        }
    }

    let mut dropped = Vec::with_capacity(dropped_names.len());
    for name in dropped_names {
        let suitable_parent = find_suitable_parent(model, &name)?;
        dropped.push(DroppedFeature {
            name,
            suitable_parent,
        });
    }
    Ok(dropped)
}

/// Walk up from a dropped feature to the ancestor that absorbed its
/// influence in the fit: climb while the parent is mandatory, outside any
/// alternative group, and not itself a direct child of root. The feature
/// where the walk stops is the suitable parent; root itself is never
/// returned.
pub fn find_suitable_parent(model: &FeatureModel, feature: &str) -> FmResult<String> {
    let mut parent = model.get(feature)?.parent.clone();
    loop {
        let candidate = model.get(&parent)?;
        if candidate.parent == ROOT
            || !candidate.is_mandatory()
            || !candidate.alternatives.is_empty()
        {
            return Ok(parent);
        }
        parent = candidate.parent.clone();
    }
}

/// Substitution map for term expansion: dropped feature → retained
/// representative (its suitable parent) plus its exclusion set.
pub fn substitutions(model: &FeatureModel) -> FmResult<BTreeMap<String, Vec<String>>> {
    let mut map = BTreeMap::new();
    for dropped in identify_dropped(model)? {
        let feature = model.get(&dropped.name)?;
        let mut replacements = vec![dropped.suitable_parent.clone()];
        replacements.extend(feature.exclusions.iter().cloned());
        map.insert(dropped.name, replacements);
    }
    Ok(map)
}

/// Report-facing renaming of absorbed columns: the suitable parent's column
/// actually carries the dropped feature's influence as well.
pub fn column_renaming(model: &FeatureModel) -> FmResult<BTreeMap<String, String>> {
    let mut renaming = BTreeMap::new();
    for dropped in identify_dropped(model)? {
        renaming.insert(
            dropped.suitable_parent.clone(),
            format!("{} ( * {})", dropped.suitable_parent, dropped.name),
        );
    }
    Ok(renaming)
}

/// Add the source column's value into every target column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseMerge {
    pub source: usize,
    pub targets: Vec<usize>,
}

/// Add every source column's value into the target column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionMerge {
    pub target: usize,
    pub sources: Vec<usize>,
}

/// Column-merge plan redistributing absorbed influences
///
/// Built once per model column set; applying it is a pure function from the
/// raw matrix to the resolved matrix, so repeated application to the same
/// raw input always yields the same result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergePlan {
    pub base_merges: Vec<BaseMerge>,
    pub interaction_merges: Vec<InteractionMerge>,
}

impl MergePlan {
    pub fn is_empty(&self) -> bool {
        self.base_merges.is_empty() && self.interaction_merges.is_empty()
    }

    /// Apply the plan row by row.
    ///
    /// Base merges run first: the suitable parent's value is added onto each
    /// alternative sibling (or onto the optional feature's own column), and
    /// onto the compound terms attached during plan construction. Interaction
    /// merges then add the already-resolved single-feature influences of each
    /// constituent into its compound terms. Non-finite sources (terms pruned
    /// in this row) contribute nothing, and targets pruned in this row stay
    /// absent.
    pub fn resolve(&self, matrix: &CoefficientMatrix) -> CoefficientMatrix {
        let mut resolved = matrix.clone();
        for row in &mut resolved.values {
            for merge in &self.base_merges {
                let value = row[merge.source];
                if !value.is_finite() {
                    continue;
                }
                for &target in &merge.targets {
                    if row[target].is_finite() {
                        row[target] += value;
                    }
                }
            }
            for merge in &self.interaction_merges {
                if !row[merge.target].is_finite() {
                    continue;
                }
                for &source in &merge.sources {
                    if row[source].is_finite() {
                        row[merge.target] += row[source];
                    }
                }
            }
        }
        resolved
    }
}

/// Compute the merge plan for a model's column set.
///
/// The feature tree is traversed breadth-first from root's children so that
/// parents are resolved before the children that depend on them; suitable
/// parents that were themselves dropped are resolved transitively. A dropped
/// feature whose resolved suitable parent has no column in this model is
/// skipped: sparse models legitimately prune irrelevant terms.
pub fn build_merge_plan(model: &FeatureModel, columns: &[Term]) -> FmResult<MergePlan> {
    let mut dropped: HashMap<String, String> = identify_dropped(model)?
        .into_iter()
        .map(|d| (d.name, d.suitable_parent))
        .collect();

    let singleton_column = |name: &str| -> Option<usize> {
        columns
            .iter()
            .position(|term| term.is_singleton() && term.features()[0] == name)
    };

    let mut base_merges: Vec<BaseMerge> = Vec::new();
    let mut queue: VecDeque<String> = model.get(ROOT)?.children.iter().cloned().collect();
    while let Some(name) = queue.pop_front() {
        let feature = model.get(&name)?;
        queue.extend(feature.children.iter().cloned());

        let Some(parent) = dropped.get(&name).cloned() else {
            continue;
        };

        // Resolve transitively if the suitable parent was itself dropped
        let mut replacement = parent;
        while let Some(next) = dropped.get(&replacement) {
            if next == ROOT {
                break;
            }
            replacement = next.clone();
        }
        dropped.insert(name.clone(), replacement.clone());

        let Some(source) = singleton_column(&replacement) else {
            continue;
        };

        if !feature.alternatives.is_empty() {
            let targets: Vec<usize> = feature
                .alternatives
                .iter()
                .filter_map(|alt| singleton_column(alt))
                .collect();
            if !targets.is_empty() {
                base_merges.push(BaseMerge { source, targets });
            }
        } else if !feature.is_mandatory() {
            if let Some(own) = singleton_column(&name) {
                base_merges.push(BaseMerge {
                    source,
                    targets: vec![own],
                });
            }
        }
    }

    // Compound terms receive their base term's redistributed value and the
    // resolved influence of every constituent feature.
    let mut interaction_merges: Vec<InteractionMerge> = Vec::new();
    for (column_index, term) in columns.iter().enumerate() {
        if term.arity() < 2 {
            continue;
        }

        if let Some(first_index) = singleton_column(&term.features()[0]) {
            for merge in &mut base_merges {
                if merge.targets.contains(&first_index) {
                    merge.targets.push(column_index);
                    break;
                }
            }
        }

        let sources: Vec<usize> = term
            .features()
            .iter()
            .filter_map(|feature| singleton_column(feature))
            .collect();
        if !sources.is_empty() {
            interaction_merges.push(InteractionMerge {
                target: column_index,
                sources,
            });
        }
    }

    Ok(MergePlan {
        base_merges,
        interaction_merges,
    })
}
