//! Best-effort classification of failed executions.
//!
//! Parses the combined output of a non-zero exit for a conventional
//! traceback trailer. The heuristic depends on the runtime convention of
//! the executed language (it targets the Python `Traceback` format) and is
//! deliberately pluggable: a sandbox can swap in a classifier for another
//! runtime without touching the execution path.

/// A failure classifier maps raw combined output to
/// `(exception_kind, exception_message)`.
pub type FailureClassifier = fn(&str) -> (String, String);

/// Default classifier for Python-style tracebacks.
///
/// With a `Traceback` marker present, the last non-empty line is split on
/// its first colon into kind and message. Without a usable trailer the
/// whole output becomes the message: `UnknownError` when the last line is
/// at least colon-delimited, `RuntimeError` otherwise.
pub fn classify_failure(output: &str) -> (String, String) {
    let last_line = output
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(str::trim)
        .unwrap_or("");

    if output.contains("Traceback") {
        if let Some((kind, message)) = last_line.split_once(':') {
            return (kind.trim().to_string(), message.trim().to_string());
        }
        return ("RuntimeError".to_string(), output.to_string());
    }

    if last_line.contains(':') {
        ("UnknownError".to_string(), output.to_string())
    } else {
        ("RuntimeError".to_string(), output.to_string())
    }
}
