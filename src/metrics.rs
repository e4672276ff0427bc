//! Output contracts of the external static-analysis collaborators.
//!
//! Structural and semantic metrics are produced by separate tooling
//! (syntax-tree walkers, linters, type checkers) and consumed here
//! read-only. Both bundles deserialize leniently: absent fields take their
//! zero defaults so a partial bundle never fails the pipeline.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Static shape/size measurements of a code sample.
///
/// Ratios and percentages are within sane bounds, or carry a negative
/// sentinel when the producing tool was unavailable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuralMetrics {
    pub avg_cyclomatic_complexity: f64,
    pub max_cyclomatic_complexity: f64,
    /// Comment lines as a percentage of non-empty lines
    pub comment_density_percent: f64,
    pub avg_function_size_lines: f64,
    /// Duplicate imports over total imports, 0..1
    pub import_redundancy_ratio: f64,
}

impl StructuralMetrics {
    /// Parse a structural bundle from the analyzer's JSON document.
    pub fn from_json(document: &str) -> Result<Self> {
        Ok(serde_json::from_str(document)?)
    }
}

/// Static correctness/style measurements of a code sample.
///
/// Error counts of -1 are a sentinel meaning the analysis tool itself
/// failed to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticMetrics {
    pub syntax_valid: bool,
    pub lint_error_count: i64,
    pub lint_error_breakdown: BTreeMap<String, i64>,
    pub typecheck_error_count: i64,
    pub typecheck_error_breakdown: BTreeMap<String, i64>,
    /// Composite quality score reported by the semantic analyzer, 0..100
    pub semantic_quality_score: f64,
}

impl SemanticMetrics {
    /// Parse a semantic bundle from the analyzer's JSON document.
    pub fn from_json(document: &str) -> Result<Self> {
        Ok(serde_json::from_str(document)?)
    }
}

impl Default for SemanticMetrics {
    fn default() -> Self {
        Self {
            // A bundle that says nothing about syntax must not trip the
            // hard gate, so validity defaults to true.
            syntax_valid: true,
            lint_error_count: 0,
            lint_error_breakdown: BTreeMap::new(),
            typecheck_error_count: 0,
            typecheck_error_breakdown: BTreeMap::new(),
            semantic_quality_score: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_metrics_deserialize_partial_bundle() {
        let json = r#"{"avg_cyclomatic_complexity": 3.5, "comment_density_percent": 10.0}"#;
        let metrics = StructuralMetrics::from_json(json).unwrap();

        assert!((metrics.avg_cyclomatic_complexity - 3.5).abs() < 1e-12);
        assert!((metrics.comment_density_percent - 10.0).abs() < 1e-12);
        assert_eq!(metrics.import_redundancy_ratio, 0.0);
        assert_eq!(metrics.avg_function_size_lines, 0.0);
    }

    #[test]
    fn semantic_metrics_tolerate_sentinel_counts() {
        let json = r#"{
            "syntax_valid": true,
            "lint_error_count": -1,
            "typecheck_error_count": -1,
            "semantic_quality_score": 80.0
        }"#;
        let metrics = SemanticMetrics::from_json(json).unwrap();

        assert_eq!(metrics.lint_error_count, -1);
        assert_eq!(metrics.typecheck_error_count, -1);
        assert!(metrics.lint_error_breakdown.is_empty());
    }

    #[test]
    fn semantic_default_does_not_trip_syntax_gate() {
        assert!(SemanticMetrics::default().syntax_valid);
    }

    #[test]
    fn malformed_bundle_is_a_json_error() {
        let err = SemanticMetrics::from_json("{not json").unwrap_err();
        assert_eq!(err.kind_name(), "JsonError");

        let err = StructuralMetrics::from_json(r#"{"avg_cyclomatic_complexity": "high"}"#)
            .unwrap_err();
        assert_eq!(err.kind_name(), "JsonError");
    }
}
