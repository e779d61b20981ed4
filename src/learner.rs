//! External model-learning tool integration
//!
//! Influence models are learned by an external tool driven through script
//! files; the tool logs the final model as a `;`-separated line. This module
//! extracts that line, fans the model text out into canonical terms (with
//! multicollinearity substitution applied), and runs the tool itself. A
//! failing invocation is fatal for the case study's model-building step.

use crate::config::LearnerConfig;
use crate::feature_model::FeatureModel;
use crate::multicollinearity;
use crate::term::Term;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

/// Final model text and fit error extracted from a learner log.
#[derive(Debug, Clone, PartialEq)]
pub struct LearnedModel {
    pub model: String,
    pub error: f64,
}

/// Extract the last model line (`…;<model>;<error>;…`) from a learner log.
///
/// The learner logs one line per refinement round; the last one wins.
pub fn extract_model(log_text: &str) -> Option<LearnedModel> {
    let mut result = None;
    for line in log_text.lines() {
        if !line.contains(';') {
            continue;
        }
        let elements: Vec<&str> = line.split(';').collect();
        if elements.len() < 3 {
            continue;
        }
        if let Ok(error) = elements[2].trim().parse::<f64>() {
            result = Some(LearnedModel {
                model: elements[1].trim().to_string(),
                error,
            });
        }
    }
    result
}

/// Fan a learned model out into canonical terms.
///
/// The model text is a sum of products, each summand starting with its
/// coefficient (`c * A * B + c * C`). Coefficients are discarded here; the
/// purpose is the combined term vocabulary across revisions. Features the fit
/// dropped for multicollinearity are replaced by their suitable parent fanned
/// out across their exclusion set, so the expanded vocabulary only names
/// retained columns. Order of first appearance is preserved for the later
/// column layout.
pub fn expand_model_terms(model_text: &str, feature_model: &FeatureModel) -> Result<Vec<Term>> {
    let substitutions = multicollinearity::substitutions(feature_model)?;
    let mut terms: Vec<Term> = Vec::new();
    for summand in model_text.split('+') {
        let mut parts = summand.split('*').map(str::trim);
        // First element is the coefficient
        let _ = parts.next();
        let features: Vec<&str> = parts.filter(|p| !p.is_empty()).collect();
        if features.is_empty() {
            continue;
        }
        for feature in &features {
            // Unknown features make the whole model unusable
            feature_model.get(feature)?;
        }
        let term = Term::new(features);
        for expanded in term.expand(&substitutions) {
            if !terms.contains(&expanded) {
                terms.push(expanded);
            }
        }
    }
    Ok(terms)
}

/// Combine the vocabularies of several learned models (one per revision)
/// into the ordered column list shared by a workload's whole release range.
///
/// Strictly-mandatory singletons lead, the rest follow by ascending arity,
/// so column positions stay semantically stable across the revisions being
/// compared.
pub fn combined_vocabulary(
    model_texts: &[&str],
    feature_model: &FeatureModel,
) -> Result<Vec<Term>> {
    let mut terms: Vec<Term> = Vec::new();
    for model_text in model_texts {
        for term in expand_model_terms(model_text, feature_model)? {
            if !terms.contains(&term) {
                terms.push(term);
            }
        }
    }
    Ok(crate::term::order_terms(&terms, feature_model)?)
}

/// Write one term per line, the layout the learner's truemodel mode expects.
pub fn write_model_file(terms: &[Term], path: &Path) -> Result<()> {
    let mut text = String::new();
    for term in terms {
        text.push_str(&term.to_string());
        text.push('\n');
    }
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write model file: {}", path.display()))
}

/// Run the external learning tool on one script.
///
/// Non-zero exit status is surfaced as a fatal error carrying the tool's
/// stderr.
pub fn run_learner(config: &LearnerConfig, script: &Path) -> Result<String> {
    let output = Command::new(&config.command)
        .args(&config.args)
        .arg(script)
        .output()
        .with_context(|| format!("Failed to launch learner: {}", config.command))?;

    if !output.status.success() {
        anyhow::bail!(
            "Learner failed with {} on {}: {}",
            output.status,
            script.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_model::{BinaryOptionDoc, FeatureModelDoc, ROOT};

    fn binary(name: &str, optional: bool, parent: &str, excluded: &[&str]) -> BinaryOptionDoc {
        BinaryOptionDoc {
            name: name.to_string(),
            optional,
            parent: parent.to_string(),
            excluded_options: excluded.iter().map(|s| s.to_string()).collect(),
            implied_options: Vec::new(),
        }
    }

    fn model() -> FeatureModel {
        FeatureModel::from_doc(&FeatureModelDoc {
            binary_options: vec![
                binary(ROOT, false, ROOT, &[]),
                binary("base", false, ROOT, &[]),
                binary("b", false, "base", &["c"]),
                binary("c", false, "base", &["b"]),
            ],
            numeric_options: Vec::new(),
        })
        .unwrap()
    }

    #[test]
    fn test_extract_model_takes_last_line() {
        let log = "\
round 1
1;12.5 * base;20.0;extra
2;12.5 * base + 1.5 * c;4.25;extra
done
";
        let learned = extract_model(log).unwrap();
        assert_eq!(learned.model, "12.5 * base + 1.5 * c");
        assert!((learned.error - 4.25).abs() < 1e-9);
    }

    #[test]
    fn test_extract_model_ignores_non_numeric_lines() {
        assert!(extract_model("no separator here\njust;text;lines\n").is_none());
        assert!(extract_model("").is_none());
    }

    #[test]
    fn test_expand_model_terms_substitutes_dropped_feature() {
        // b is dropped (first of the alternative group); a summand naming b
        // fans out across base and c
        let terms = expand_model_terms("3.0 * base + 1.0 * b", &model()).unwrap();
        assert_eq!(
            terms,
            vec![Term::parse("base"), Term::parse("c")]
        );
    }

    #[test]
    fn test_expand_model_terms_keeps_interactions() {
        let terms = expand_model_terms("3.0 * base + 0.5 * c * base", &model()).unwrap();
        assert_eq!(terms, vec![Term::parse("base"), Term::parse("base * c")]);
    }

    #[test]
    fn test_expand_model_terms_unknown_feature_is_fatal() {
        assert!(expand_model_terms("1.0 * ghost", &model()).is_err());
    }

    #[test]
    fn test_combined_vocabulary_orders_across_revisions() {
        let vocabulary = combined_vocabulary(
            &[
                "1.0 * c + 0.5 * c * base",
                "2.0 * base + 1.0 * c",
            ],
            &model(),
        )
        .unwrap();
        // base is the strictly-mandatory singleton and leads; the interaction
        // sorts after the remaining singleton
        assert_eq!(
            vocabulary,
            vec![Term::parse("base"), Term::parse("c"), Term::parse("base * c")]
        );
    }

    #[test]
    fn test_write_model_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("model_base.txt");
        write_model_file(&[Term::parse("base"), Term::parse("base * c")], &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "base\nbase * c\n");
    }

    #[test]
    fn test_run_learner_surfaces_failure() {
        let config = LearnerConfig {
            command: "false".to_string(),
            args: Vec::new(),
        };
        let result = run_learner(&config, Path::new("script.a"));
        assert!(result.is_err());
    }

    #[test]
    fn test_run_learner_captures_stdout() {
        let config = LearnerConfig {
            command: "echo".to_string(),
            args: vec!["learned".to_string()],
        };
        let output = run_learner(&config, Path::new("script.a")).unwrap();
        assert!(output.contains("learned"));
    }
}
