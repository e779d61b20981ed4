//! Canonical terms of performance-influence models
//!
//! A term is a sorted, deduplicated set of feature names representing one
//! summand (feature or interaction) of a learned influence model. Equality
//! and hashing are defined on the canonical sorted form, so `"b * a"` and
//! `"a * b"` denote the same term. Column positions derived from term
//! ordering must be identical across the releases being compared.

use crate::feature_model::{FeatureModel, Result as FmResult};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Separator used in the canonical string form.
const SEPARATOR: &str = " * ";

/// A sorted, deduplicated interaction of one or more features
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Term {
    features: Vec<String>,
}

impl Term {
    /// Build a term from any collection of feature names; sorts and dedupes.
    pub fn new<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut features: Vec<String> = features.into_iter().map(Into::into).collect();
        features.sort();
        features.dedup();
        Term { features }
    }

    /// Parse a `*`-joined term string, tolerating surrounding whitespace.
    pub fn parse(text: &str) -> Self {
        Term::new(
            text.split('*')
                .map(str::trim)
                .filter(|part| !part.is_empty()),
        )
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Number of interacting features.
    pub fn arity(&self) -> usize {
        self.features.len()
    }

    pub fn is_singleton(&self) -> bool {
        self.features.len() == 1
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// A term covers a configuration iff each of its features is active there.
    pub fn covered_by<'a, I>(&self, active_options: I) -> bool
    where
        I: IntoIterator<Item = &'a str> + Clone,
    {
        self.features
            .iter()
            .all(|f| active_options.clone().into_iter().any(|o| o == f))
    }

    /// Fan a term out across replacement sets.
    ///
    /// `substitutions` maps a removed feature to the set of features that
    /// stand in for it (its retained representative plus its exclusion set).
    /// The result is the cartesian product over all features of the term,
    /// each combination re-canonicalized. Substitution preserves coverage:
    /// a configuration activating one replacement per removed feature is
    /// covered by exactly one expanded term.
    pub fn expand(&self, substitutions: &BTreeMap<String, Vec<String>>) -> Vec<Term> {
        let mut combinations: Vec<Vec<String>> = vec![Vec::new()];
        for feature in &self.features {
            let replacements: Vec<&str> = match substitutions.get(feature) {
                Some(set) => set.iter().map(String::as_str).collect(),
                None => vec![feature.as_str()],
            };
            let mut next = Vec::with_capacity(combinations.len() * replacements.len());
            for replacement in &replacements {
                for combination in &combinations {
                    let mut extended = combination.clone();
                    extended.push((*replacement).to_string());
                    next.push(extended);
                }
            }
            combinations = next;
        }
        combinations.into_iter().map(Term::new).collect()
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.features.join(SEPARATOR))
    }
}

impl Serialize for Term {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Term {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let term = Term::parse(&text);
        if term.arity() == 0 {
            return Err(D::Error::custom("term must name at least one feature"));
        }
        Ok(term)
    }
}

/// Order terms for stable column layout across releases.
///
/// Strictly-mandatory singleton terms come first (they play the role of the
/// model's intercept), the rest follow by ascending interaction arity; ties
/// keep input order. Unknown feature names are a fatal model error.
pub fn order_terms(terms: &[Term], model: &FeatureModel) -> FmResult<Vec<Term>> {
    let mut keyed: Vec<(i64, Term)> = Vec::with_capacity(terms.len());
    for term in terms {
        let base = if term.is_singleton() && model.get(&term.features()[0])?.strictly_mandatory {
            i64::MIN
        } else {
            term.arity() as i64
        };
        keyed.push((base, term.clone()));
    }
    keyed.sort_by_key(|(key, _)| *key);
    Ok(keyed.into_iter().map(|(_, term)| term).collect())
}
