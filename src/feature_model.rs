//! Feature-model parsing and classification
//!
//! A feature model describes which configurations of a software system are
//! legal: a rooted tree of binary and numeric options plus cross-tree
//! exclusion/implication constraints. The tree is built in two passes (all
//! features created, then parent/child/alternative links resolved), because
//! alternative-group classification needs bidirectionally consistent links.
//! Features are kept in an arena indexed by name with children stored as name
//! lists, so the structure stays serializable and cycle-free.

use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Name of the synthetic root feature every model must contain.
pub const ROOT: &str = "root";

/// Errors for feature-model construction and lookup
///
/// A malformed feature model is fatal for the whole case study; none of these
/// are recoverable.
#[derive(Error, Debug)]
pub enum FeatureModelError {
    #[error("Feature {0} not in feature list")]
    UnknownFeature(String),

    #[error("Duplicate feature definition: {0}")]
    DuplicateFeature(String),

    #[error("Feature model does not define a '{ROOT}' feature")]
    MissingRoot,

    #[error("Failed to parse feature-model document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for feature-model operations
pub type Result<T> = std::result::Result<T, FeatureModelError>;

/// One configuration option of the feature model
#[derive(Debug, Clone)]
pub struct Feature {
    pub name: String,
    /// Name of the parent feature; `"root"` for top-level features.
    pub parent: String,
    /// Child feature names in document order; filled in the second pass.
    pub children: Vec<String>,
    /// `None` for numeric features, which carry no mandatoriness attribute.
    pub mandatory: Option<bool>,
    /// Features mutually exclusive with this one.
    pub exclusions: BTreeSet<String>,
    /// Features forced on whenever this one is selected.
    pub implied: BTreeSet<String>,
    /// Siblings in the same alternative group; empty unless the parent is one.
    pub alternatives: BTreeSet<String>,
    /// True iff this feature is present in every legal configuration.
    pub strictly_mandatory: bool,
}

impl Feature {
    pub fn is_binary(&self) -> bool {
        self.mandatory.is_some()
    }

    /// Numeric features report `false`: they have no mandatoriness attribute.
    pub fn is_mandatory(&self) -> bool {
        self.mandatory == Some(true)
    }
}

/// Declarative feature-model document (JSON)
///
/// Mirrors the external input format: a `binaryOptions` list and a
/// `numericOptions` list, each entry naming its parent and cross-tree
/// constraints.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureModelDoc {
    #[serde(rename = "binaryOptions", default)]
    pub binary_options: Vec<BinaryOptionDoc>,
    #[serde(rename = "numericOptions", default)]
    pub numeric_options: Vec<NumericOptionDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinaryOptionDoc {
    pub name: String,
    pub optional: bool,
    pub parent: String,
    #[serde(rename = "excludedOptions", default)]
    pub excluded_options: Vec<String>,
    #[serde(rename = "impliedOptions", default)]
    pub implied_options: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NumericOptionDoc {
    pub name: String,
    pub parent: String,
    #[serde(rename = "excludedOptions", default)]
    pub excluded_options: Vec<String>,
    #[serde(rename = "impliedOptions", default)]
    pub implied_options: Vec<String>,
}

/// Arena of features indexed by name
///
/// Immutable after construction. Iteration order (`names()`) is the document
/// order of the input, which downstream passes rely on for determinism.
#[derive(Debug, Clone)]
pub struct FeatureModel {
    features: HashMap<String, Feature>,
    order: Vec<String>,
}

impl FeatureModel {
    /// Parse a JSON feature-model document and build the classified model.
    pub fn from_json(text: &str) -> Result<Self> {
        let doc: FeatureModelDoc = serde_json::from_str(text)?;
        Self::from_doc(&doc)
    }

    /// Build the model from an already-parsed document.
    ///
    /// Runs the full two-pass construction: create all features, resolve
    /// children, classify alternative groups, derive strict mandatoriness.
    pub fn from_doc(doc: &FeatureModelDoc) -> Result<Self> {
        let mut model = FeatureModel {
            features: HashMap::new(),
            order: Vec::new(),
        };

        // Pass 1: create every feature without links
        for option in &doc.binary_options {
            model.push_feature(Feature {
                name: option.name.clone(),
                parent: option.parent.clone(),
                children: Vec::new(),
                mandatory: Some(!option.optional),
                exclusions: option.excluded_options.iter().cloned().collect(),
                implied: option.implied_options.iter().cloned().collect(),
                alternatives: BTreeSet::new(),
                strictly_mandatory: false,
            })?;
        }
        for option in &doc.numeric_options {
            model.push_feature(Feature {
                name: option.name.clone(),
                parent: option.parent.clone(),
                children: Vec::new(),
                mandatory: None,
                exclusions: option.excluded_options.iter().cloned().collect(),
                implied: option.implied_options.iter().cloned().collect(),
                alternatives: BTreeSet::new(),
                strictly_mandatory: false,
            })?;
        }

        if !model.features.contains_key(ROOT) {
            return Err(FeatureModelError::MissingRoot);
        }

        // Pass 2: resolve parent/child links in document order
        let names = model.order.clone();
        for name in &names {
            if name == ROOT {
                continue;
            }
            let parent = model.features[name].parent.clone();
            let parent_feature = model
                .features
                .get_mut(&parent)
                .ok_or_else(|| FeatureModelError::UnknownFeature(parent.clone()))?;
            parent_feature.children.push(name.clone());
        }

        model.classify_alternative_groups()?;

        for name in &names {
            let strict = model.compute_strict_mandatoriness(name)?;
            if let Some(feature) = model.features.get_mut(name) {
                feature.strictly_mandatory = strict;
            }
        }

        Ok(model)
    }

    fn push_feature(&mut self, feature: Feature) -> Result<()> {
        if self.features.contains_key(&feature.name) {
            return Err(FeatureModelError::DuplicateFeature(feature.name));
        }
        self.order.push(feature.name.clone());
        self.features.insert(feature.name.clone(), feature);
        Ok(())
    }

    /// Look up a feature; unknown names are a fatal model error.
    pub fn get(&self, name: &str) -> Result<&Feature> {
        self.features
            .get(name)
            .ok_or_else(|| FeatureModelError::UnknownFeature(name.to_string()))
    }

    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    /// Feature names in document order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Decide whether `name` parents an alternative group: at least two
    /// children, every child mandatory, and each pair of distinct children
    /// mutually exclusive.
    pub fn is_alternative_group(&self, name: &str) -> Result<bool> {
        let feature = self.get(name)?;
        if feature.children.len() <= 1 {
            return Ok(false);
        }
        for child in &feature.children {
            let child_feature = self.get(child)?;
            if !child_feature.is_mandatory() {
                return Ok(false);
            }
            for other in &feature.children {
                if other == child {
                    continue;
                }
                if !child_feature.exclusions.contains(other) {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Mark every detected alternative group by assigning each member its
    /// sibling set.
    fn classify_alternative_groups(&mut self) -> Result<()> {
        let names = self.order.clone();
        for name in &names {
            if !self.is_alternative_group(name)? {
                continue;
            }
            let children = self.features[name].children.clone();
            for child in &children {
                let siblings: BTreeSet<String> =
                    children.iter().filter(|c| *c != child).cloned().collect();
                if let Some(feature) = self.features.get_mut(child) {
                    feature.alternatives = siblings;
                }
            }
        }
        Ok(())
    }

    /// A feature is strictly mandatory iff it and every ancestor up to root
    /// is mandatory, has no alternatives, and has no exclusions. Numeric
    /// features are always strictly mandatory.
    fn compute_strict_mandatoriness(&self, name: &str) -> Result<bool> {
        if name == ROOT {
            return Ok(true);
        }
        let feature = self.get(name)?;
        if !feature.is_binary() {
            return Ok(true);
        }
        if !feature.is_mandatory() {
            return Ok(false);
        }
        if !feature.alternatives.is_empty() || !feature.exclusions.is_empty() {
            return Ok(false);
        }
        let mut parent = self.get(&feature.parent)?;
        while parent.name != ROOT {
            if !parent.is_mandatory() || !parent.exclusions.is_empty() {
                return Ok(false);
            }
            parent = self.get(&parent.parent)?;
        }
        Ok(true)
    }
}
