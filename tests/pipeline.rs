//! Full pipeline: sample -> sandbox -> aggregation.

#![cfg(unix)]

use credeval::sandbox::{ExecutionSandbox, ProcessExecutor, ResourceLimits};
use credeval::{
    credibility_score, CodeSample, CredibilityTier, ExecutionGate, SemanticMetrics,
    StructuralMetrics, TokenLogprob, DEFAULT_TIMEOUT,
};

fn sh_sandbox() -> ExecutionSandbox {
    ExecutionSandbox::new(Box::new(ProcessExecutor::new("/bin/sh", Vec::new()))).with_limits(
        ResourceLimits {
            memory_bytes: 64 * 1024 * 1024,
            cpu_time_secs: 5,
            max_processes: 16,
        },
    )
}

#[test]
fn confident_clean_sample_scores_high() {
    let sample = CodeSample::with_logprobs(
        "echo ok",
        vec![
            TokenLogprob {
                token: "echo".to_string(),
                logprob: -0.01,
            },
            TokenLogprob {
                token: " ok".to_string(),
                logprob: -0.02,
            },
        ],
    );
    let stats = sample.confidence_stats();

    let execution = sh_sandbox().run(&sample.source, DEFAULT_TIMEOUT);
    assert!(execution.success);

    let structure = StructuralMetrics {
        avg_cyclomatic_complexity: 1.0,
        comment_density_percent: 12.5,
        ..StructuralMetrics::default()
    };
    let semantic = SemanticMetrics {
        syntax_valid: true,
        semantic_quality_score: 100.0,
        ..SemanticMetrics::default()
    };

    let score = credibility_score(
        Some(&structure),
        Some(&semantic),
        Some(&execution),
        stats.avg_prob,
        stats.perplexity,
        None,
        DEFAULT_TIMEOUT.as_secs_f64(),
        ExecutionGate::Strict,
    );

    assert!(score > 80.0, "expected a high score, got {}", score);
    assert!(score <= 100.0);
    assert_ne!(CredibilityTier::from_score(score), CredibilityTier::Poor);
}

#[test]
fn failing_sample_is_gated_under_strict_scoring() {
    let sample = CodeSample::new("exit 1");
    let stats = sample.confidence_stats();

    let execution = sh_sandbox().run(&sample.source, DEFAULT_TIMEOUT);
    assert!(!execution.success);

    let semantic = SemanticMetrics {
        syntax_valid: true,
        semantic_quality_score: 90.0,
        ..SemanticMetrics::default()
    };

    let strict = credibility_score(
        None,
        Some(&semantic),
        Some(&execution),
        stats.avg_prob,
        stats.perplexity,
        None,
        DEFAULT_TIMEOUT.as_secs_f64(),
        ExecutionGate::Strict,
    );
    let relaxed = credibility_score(
        None,
        Some(&semantic),
        Some(&execution),
        stats.avg_prob,
        stats.perplexity,
        None,
        DEFAULT_TIMEOUT.as_secs_f64(),
        ExecutionGate::Relaxed,
    );

    // The relaxed gate grants partial execution credit on top of the
    // non-execution factors
    assert!(relaxed >= strict);
    assert!((0.0..=100.0).contains(&strict));
}

#[test]
fn invalid_syntax_zeroes_the_pipeline_output() {
    let semantic = SemanticMetrics {
        syntax_valid: false,
        ..SemanticMetrics::default()
    };
    let execution = sh_sandbox().run("echo fine", DEFAULT_TIMEOUT);
    assert!(execution.success);

    let score = credibility_score(
        None,
        Some(&semantic),
        Some(&execution),
        1.0,
        1.0,
        None,
        DEFAULT_TIMEOUT.as_secs_f64(),
        ExecutionGate::Strict,
    );
    assert_eq!(score, 0.0);
}
