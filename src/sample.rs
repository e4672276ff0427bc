//! Code samples and model-confidence statistics.
//!
//! A [`CodeSample`] pairs raw generated source text with the optional
//! per-token log-probability sequence reported by the generating model.
//! [`ConfidenceStats`] reduces that sequence to the two numbers the
//! credibility aggregator consumes: average token probability and
//! perplexity.

use serde::{Deserialize, Serialize};

/// One generated token and the log-probability the model assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenLogprob {
    pub token: String,
    pub logprob: f64,
}

/// A machine-generated code sample. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSample {
    /// Raw source text as emitted by the model
    pub source: String,
    /// Ordered token/log-probability pairs, when the provider exposes them
    #[serde(default)]
    pub logprobs: Option<Vec<TokenLogprob>>,
}

impl CodeSample {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            logprobs: None,
        }
    }

    pub fn with_logprobs(source: impl Into<String>, logprobs: Vec<TokenLogprob>) -> Self {
        Self {
            source: source.into(),
            logprobs: Some(logprobs),
        }
    }

    /// Derive confidence statistics from the logprob sequence.
    ///
    /// Without logprobs the token count falls back to a whitespace split of
    /// the source and the model is treated as fully uncertain.
    pub fn confidence_stats(&self) -> ConfidenceStats {
        ConfidenceStats::from_sample(self)
    }
}

/// Aggregate token-confidence statistics for one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceStats {
    pub token_count: usize,
    pub total_logprob: f64,
    pub avg_logprob: f64,
    /// exp(avg_logprob), in [0, 1]
    pub avg_prob: f64,
    /// exp(-avg_logprob), >= 1 for any real model output
    pub perplexity: f64,
}

impl ConfidenceStats {
    fn from_sample(sample: &CodeSample) -> Self {
        match &sample.logprobs {
            Some(logprobs) if !logprobs.is_empty() => {
                // Raw sum: a -inf logprob (providers report it for masked
                // tokens) drives avg_prob to 0 and perplexity to infinity,
                // marking the sample as fully uncertain.
                let total_logprob: f64 = logprobs.iter().map(|t| t.logprob).sum();
                let token_count = logprobs.len();
                let avg_logprob = total_logprob / token_count as f64;
                Self::from_avg(token_count, total_logprob, avg_logprob)
            }
            _ => {
                let token_count = sample.source.split_whitespace().count();
                Self::from_avg(token_count, 0.0, 0.0)
            }
        }
    }

    fn from_avg(token_count: usize, total_logprob: f64, avg_logprob: f64) -> Self {
        let (avg_prob, perplexity) = if avg_logprob.is_finite() {
            (avg_logprob.exp(), (-avg_logprob).exp())
        } else {
            (0.0, f64::INFINITY)
        };
        Self {
            token_count,
            total_logprob,
            avg_logprob,
            avg_prob,
            perplexity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lp(token: &str, logprob: f64) -> TokenLogprob {
        TokenLogprob {
            token: token.to_string(),
            logprob,
        }
    }

    #[test]
    fn stats_from_uniform_logprobs() {
        let sample = CodeSample::with_logprobs(
            "print(1)",
            vec![lp("print", -0.5), lp("(", -0.5), lp("1", -0.5), lp(")", -0.5)],
        );
        let stats = sample.confidence_stats();

        assert_eq!(stats.token_count, 4);
        assert!((stats.total_logprob - (-2.0)).abs() < 1e-12);
        assert!((stats.avg_logprob - (-0.5)).abs() < 1e-12);
        assert!((stats.avg_prob - (-0.5f64).exp()).abs() < 1e-12);
        assert!((stats.perplexity - (0.5f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn perfect_confidence_yields_unit_prob_and_perplexity() {
        let sample = CodeSample::with_logprobs("x = 1", vec![lp("x", 0.0), lp("= 1", 0.0)]);
        let stats = sample.confidence_stats();

        assert!((stats.avg_prob - 1.0).abs() < 1e-12);
        assert!((stats.perplexity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn masked_token_marks_the_sample_fully_uncertain() {
        let sample = CodeSample::with_logprobs(
            "y",
            vec![lp("y", f64::NEG_INFINITY), lp("\n", -1.0)],
        );
        let stats = sample.confidence_stats();

        assert_eq!(stats.token_count, 2);
        assert_eq!(stats.total_logprob, f64::NEG_INFINITY);
        assert_eq!(stats.avg_prob, 0.0);
        assert_eq!(stats.perplexity, f64::INFINITY);
    }

    #[test]
    fn missing_logprobs_fall_back_to_whitespace_tokens() {
        let sample = CodeSample::new("def f():\n    return 1");
        let stats = sample.confidence_stats();

        assert_eq!(stats.token_count, 4);
        assert!((stats.avg_prob - 1.0).abs() < 1e-12);
        assert!((stats.perplexity - 1.0).abs() < 1e-12);
    }
}
