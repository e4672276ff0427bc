//! Isolated, resource- and time-bounded execution of untrusted code.
//!
//! [`ExecutionSandbox::run`] stages one code sample as a read-only
//! artifact, executes it in a disposable isolated context, and classifies
//! the outcome into an [`ExecutionResult`]. Code-level failures and
//! timeouts are returned as values, never as errors, so the call site can
//! feed every outcome straight into the credibility aggregator. Every exit
//! path tears down the context and the staged artifact.

pub mod classify;
pub mod executor;

pub use classify::{classify_failure, FailureClassifier};
pub use executor::{IsolatedContext, IsolatedExecutor, ProcessExecutor, WaitOutcome};

use crate::error::{CredevalError, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

/// Default wall-clock budget for one execution.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Fixed per-sandbox resource ceilings. Not tunable per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Address-space ceiling in bytes
    pub memory_bytes: u64,
    /// CPU-time ceiling in seconds (wall time is bounded separately)
    pub cpu_time_secs: u64,
    /// Maximum processes/threads the context may hold
    pub max_processes: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory_bytes: 100 * 1024 * 1024,
            cpu_time_secs: 10,
            max_processes: 64,
        }
    }
}

/// Outcome of one sandboxed execution. Created once per run, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub elapsed_seconds: f64,
    /// Empty on success; `"TimeoutError"` on timeout; otherwise the
    /// classified kind of the failure
    pub exception_kind: String,
    pub exception_message: String,
    /// Combined stdout/stderr, trimmed
    pub captured_output: String,
}

/// Runs one code sample in isolation and classifies its outcome.
pub struct ExecutionSandbox {
    executor: Box<dyn IsolatedExecutor>,
    limits: ResourceLimits,
    classifier: FailureClassifier,
}

impl Default for ExecutionSandbox {
    fn default() -> Self {
        Self::new(Box::new(ProcessExecutor::default()))
    }
}

impl ExecutionSandbox {
    pub fn new(executor: Box<dyn IsolatedExecutor>) -> Self {
        Self {
            executor,
            limits: ResourceLimits::default(),
            classifier: classify_failure,
        }
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Swap the failure classifier, e.g. for a non-Python runtime.
    pub fn with_classifier(mut self, classifier: FailureClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Execute `code` in a fresh isolated context, blocking up to `timeout`.
    ///
    /// Never returns an error: code-level failures, timeouts, and
    /// infrastructure failures all come back as a populated
    /// [`ExecutionResult`] with `success = false`.
    pub fn run(&self, code: &str, timeout: Duration) -> ExecutionResult {
        let start = Instant::now();

        let artifact = match stage_artifact(code) {
            Ok(artifact) => artifact,
            Err(e) => return infrastructure_failure(e, start),
        };

        let mut context = match self.executor.create(artifact.path(), &self.limits) {
            Ok(context) => context,
            Err(e) => return infrastructure_failure(e, start),
        };

        let result = self.observe(context.as_mut(), timeout, start);

        // Cleanup runs on every exit path above; failures are logged by
        // the context itself. The staged artifact is removed when
        // `artifact` drops.
        context.remove();

        result
    }

    fn observe(
        &self,
        context: &mut dyn IsolatedContext,
        timeout: Duration,
        start: Instant,
    ) -> ExecutionResult {
        match context.wait(timeout) {
            Ok(WaitOutcome::Exited(code)) => {
                let elapsed_seconds = round3(start.elapsed().as_secs_f64());
                let captured_output = context.output();
                if code == 0 {
                    tracing::debug!(elapsed_seconds, "sandboxed execution succeeded");
                    ExecutionResult {
                        success: true,
                        elapsed_seconds,
                        captured_output,
                        ..ExecutionResult::default()
                    }
                } else {
                    let (exception_kind, exception_message) = (self.classifier)(&captured_output);
                    tracing::debug!(code, kind = %exception_kind, "sandboxed execution failed");
                    ExecutionResult {
                        success: false,
                        elapsed_seconds,
                        exception_kind,
                        exception_message,
                        captured_output,
                    }
                }
            }
            Ok(WaitOutcome::TimedOut) => {
                context.kill();
                let limit = timeout.as_secs_f64();
                tracing::debug!(limit, "sandboxed execution timed out");
                ExecutionResult {
                    success: false,
                    elapsed_seconds: round3(limit),
                    exception_kind: "TimeoutError".to_string(),
                    exception_message: format!("execution exceeded {}s limit", limit),
                    captured_output: String::new(),
                }
            }
            Err(e) => infrastructure_failure(e, start),
        }
    }
}

fn stage_artifact(code: &str) -> Result<NamedTempFile> {
    use std::io::Write;

    let mut artifact = tempfile::Builder::new()
        .prefix("credeval-sample-")
        .suffix(".py")
        .tempfile()?;
    artifact.write_all(code.as_bytes())?;
    artifact.flush()?;

    // The context only ever reads the artifact
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o444);
        if let Err(e) = std::fs::set_permissions(artifact.path(), perms) {
            tracing::warn!(error = %e, "failed to mark staged artifact read-only");
        }
    }

    Ok(artifact)
}

/// The isolation runtime itself failed, as opposed to the executed code.
fn infrastructure_failure(error: CredevalError, start: Instant) -> ExecutionResult {
    tracing::warn!(error = %error, "sandbox infrastructure failure");
    ExecutionResult {
        success: false,
        elapsed_seconds: round3(start.elapsed().as_secs_f64()),
        exception_kind: error.kind_name().to_string(),
        exception_message: error.to_string(),
        captured_output: String::new(),
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
