//! Credibility aggregation.
//!
//! Deterministically maps the four signal bundles onto one score in
//! [0, 100]. Pure computation: no state, no IO, idempotent, and total over
//! any combination of finite inputs. Out-of-range numerics are clamped,
//! never rejected; absent bundles fall back to all-zero defaults.

use crate::metrics::{SemanticMetrics, StructuralMetrics};
use crate::sandbox::ExecutionResult;
use serde::{Deserialize, Serialize};
use std::fmt;

const DEFAULT_CONFIDENCE_WEIGHT: f64 = 0.10;
const DEFAULT_STRUCTURE_WEIGHT: f64 = 0.15;
const DEFAULT_SEMANTIC_WEIGHT: f64 = 0.40;
const DEFAULT_EXECUTION_WEIGHT: f64 = 0.35;

/// Per-factor aggregation weights.
///
/// Callers may supply any non-negative weights; [`WeightConfig::normalized`]
/// rescales them to sum to 1 before use, so only the ratios matter. Each
/// field defaults independently, so a JSON config may name any subset of
/// the four factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    pub confidence: f64,
    pub structure: f64,
    pub semantic: f64,
    pub execution: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE_WEIGHT,
            structure: DEFAULT_STRUCTURE_WEIGHT,
            semantic: DEFAULT_SEMANTIC_WEIGHT,
            execution: DEFAULT_EXECUTION_WEIGHT,
        }
    }
}

impl WeightConfig {
    /// Copy of the weights rescaled to sum to exactly 1.
    ///
    /// A zero sum is treated as 1, leaving the weights untouched rather
    /// than dividing by zero. The receiver is never mutated.
    pub fn normalized(&self) -> Self {
        let sum = self.confidence + self.structure + self.semantic + self.execution;
        let total = if sum == 0.0 { 1.0 } else { sum };
        Self {
            confidence: self.confidence / total,
            structure: self.structure / total,
            semantic: self.semantic / total,
            execution: self.execution / total,
        }
    }
}

/// How a failed execution feeds the execution subscore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionGate {
    /// Failed execution contributes exactly zero
    Strict,
    /// Failed execution keeps small partial credit for speed, for runs
    /// where the failure is likely environmental
    Relaxed,
}

/// Coarse quality tier over a 0-100 credibility score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredibilityTier {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

impl CredibilityTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            CredibilityTier::Excellent
        } else if score >= 70.0 {
            CredibilityTier::Good
        } else if score >= 50.0 {
            CredibilityTier::Acceptable
        } else {
            CredibilityTier::Poor
        }
    }
}

impl fmt::Display for CredibilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredibilityTier::Excellent => write!(f, "Excellent"),
            CredibilityTier::Good => write!(f, "Good"),
            CredibilityTier::Acceptable => write!(f, "Acceptable"),
            CredibilityTier::Poor => write!(f, "Poor"),
        }
    }
}

/// Compute the credibility score in [0, 100] for one evaluated sample.
///
/// Absent bundles default to all-zero signals; an absent semantic bundle
/// does not trip the syntax gate. A returned 0.0 conflates invalid syntax
/// with a strict-gated execution failure; callers needing to distinguish
/// the two must inspect `semantic.syntax_valid` and `execution.success`
/// directly.
#[allow(clippy::too_many_arguments)]
pub fn credibility_score(
    structure: Option<&StructuralMetrics>,
    semantic: Option<&SemanticMetrics>,
    execution: Option<&ExecutionResult>,
    avg_token_prob: f64,
    perplexity: f64,
    weights: Option<&WeightConfig>,
    timeout_seconds: f64,
    gate: ExecutionGate,
) -> f64 {
    let weights = weights.copied().unwrap_or_default().normalized();

    // Hard gate: invalid syntax zeroes the score before anything else.
    if let Some(semantic) = semantic {
        if !semantic.syntax_valid {
            tracing::debug!("syntax invalid, credibility gated to 0");
            return 0.0;
        }
    }

    let confidence = confidence_subscore(avg_token_prob, perplexity);
    let structure_sub = structure_subscore(structure.cloned().unwrap_or_default());
    let semantic_sub = semantic_subscore(semantic.cloned().unwrap_or_default());
    let execution_sub = execution_subscore(execution, timeout_seconds, gate);

    let raw = weights.confidence * confidence
        + weights.structure * structure_sub
        + weights.semantic * semantic_sub
        + weights.execution * execution_sub;

    tracing::debug!(
        confidence,
        structure = structure_sub,
        semantic = semantic_sub,
        execution = execution_sub,
        "credibility subscores"
    );

    round3(raw.clamp(0.0, 1.0) * 100.0)
}

/// Confidence subscore from the model's own certainty, in [0, 1].
///
/// Perplexity maps linearly from 1.0 at 10 down to 0.0 at 50.
pub fn confidence_subscore(avg_token_prob: f64, perplexity: f64) -> f64 {
    let avg_prob = avg_token_prob.clamp(0.0, 1.0);
    let perplexity_norm = if perplexity <= 10.0 {
        1.0
    } else {
        1.0 - ((perplexity - 10.0) / 40.0).clamp(0.0, 1.0)
    };
    (0.6 * avg_prob + 0.4 * perplexity_norm).clamp(0.0, 1.0)
}

/// Structure subscore, in [0, 1]. Each sub-signal maps to [0, 1] where 1.0
/// is ideal; comment density is best around 12.5%.
pub fn structure_subscore(metrics: StructuralMetrics) -> f64 {
    let complexity = 1.0 - (metrics.avg_cyclomatic_complexity / 10.0).min(1.0);
    let comments = 1.0 - ((metrics.comment_density_percent - 12.5).abs() / 12.5).min(1.0);
    let imports = 1.0 - metrics.import_redundancy_ratio.min(1.0);
    let function_size = 1.0 - (metrics.avg_function_size_lines / 30.0).min(1.0);

    (0.40 * complexity + 0.25 * comments + 0.20 * imports + 0.15 * function_size).clamp(0.0, 1.0)
}

/// Semantic subscore, in [0, 1].
///
/// Sentinel error counts of -1 ("tool failed") are deliberately NOT
/// special-cased: `1 - min(-1/50, 1)` exceeds 1 and is clamped, quietly
/// crediting the sample as if the tool had found nothing. Preserved
/// observed behavior; see DESIGN.md.
pub fn semantic_subscore(metrics: SemanticMetrics) -> f64 {
    let base = (metrics.semantic_quality_score / 100.0).clamp(0.0, 1.0);
    let lint = 1.0 - (metrics.lint_error_count as f64 / 50.0).min(1.0);
    let typecheck = 1.0 - (metrics.typecheck_error_count as f64 / 10.0).min(1.0);

    (0.60 * base + 0.25 * lint + 0.15 * typecheck).clamp(0.0, 1.0)
}

/// Execution subscore, in [0, 1]. Success is rewarded with a 0.3 floor plus
/// up to 0.7 for speed; failure scores per the configured gate.
pub fn execution_subscore(
    execution: Option<&ExecutionResult>,
    timeout_seconds: f64,
    gate: ExecutionGate,
) -> f64 {
    let (success, elapsed) = match execution {
        Some(result) => (result.success, result.elapsed_seconds),
        // Absent bundle: treated as a failed run that used the full budget
        None => (false, timeout_seconds),
    };

    let time_norm = 1.0 - (elapsed / timeout_seconds).min(1.0);
    let subscore = if success {
        0.7 * time_norm + 0.3
    } else {
        match gate {
            ExecutionGate::Strict => 0.0,
            ExecutionGate::Relaxed => 0.1 * time_norm,
        }
    };
    subscore.clamp(0.0, 1.0)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
