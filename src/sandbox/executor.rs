//! Isolation backends.
//!
//! The sandbox talks to its isolation runtime through the capability pair
//! [`IsolatedExecutor`] / [`IsolatedContext`]: create a resource-capped
//! context around one read-only artifact, wait on it with a deadline,
//! force-kill it, fetch its combined output, remove it. Any container
//! engine, VM, or subprocess jail that can express those five operations
//! is substitutable.
//!
//! The default backend is [`ProcessExecutor`], a subprocess jail: a fresh
//! session with rlimit ceilings, a cleared environment, and a best-effort
//! network-namespace unshare.

use crate::error::{CredevalError, Result};
use crate::sandbox::ResourceLimits;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;
use wait_timeout::ChildExt;

/// Outcome of waiting on an isolated context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The context exited on its own with this status code
    Exited(i32),
    /// The deadline elapsed first; the context is still running
    TimedOut,
}

/// One live isolated execution context.
pub trait IsolatedContext: Send {
    /// Block until the context exits or `timeout` elapses.
    fn wait(&mut self, timeout: Duration) -> Result<WaitOutcome>;

    /// Force-terminate the context. Best-effort; never fails.
    fn kill(&mut self);

    /// Combined stdout/stderr captured so far.
    fn output(&mut self) -> String;

    /// Tear the context down. Best-effort; failures are logged inside.
    fn remove(&mut self);
}

/// Factory for isolated execution contexts.
pub trait IsolatedExecutor: Send + Sync {
    /// Create and start a context executing `artifact` under `limits`.
    fn create(&self, artifact: &Path, limits: &ResourceLimits) -> Result<Box<dyn IsolatedContext>>;
}

/// Subprocess-jail backend: runs an interpreter on the staged artifact in a
/// new session with rlimit ceilings applied before exec.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    program: String,
    args: Vec<String>,
}

impl ProcessExecutor {
    /// Backend running `program` with `args` followed by the artifact path.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new("python3", Vec::new())
    }
}

impl IsolatedExecutor for ProcessExecutor {
    fn create(&self, artifact: &Path, limits: &ResourceLimits) -> Result<Box<dyn IsolatedContext>> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(artifact)
            .env_clear()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        apply_isolation(&mut command, limits);

        let mut child = command
            .spawn()
            .map_err(|e| CredevalError::sandbox(format!("failed to start {}: {}", self.program, e)))?;

        // Drain pipes from dedicated threads so a chatty child can never
        // deadlock against a full pipe buffer while we wait on it.
        let stdout_thread = child.stdout.take().map(spawn_reader);
        let stderr_thread = child.stderr.take().map(spawn_reader);

        Ok(Box::new(ProcessContext {
            child,
            stdout_thread,
            stderr_thread,
            collected: None,
        }))
    }
}

#[cfg(unix)]
fn apply_isolation(command: &mut Command, limits: &ResourceLimits) {
    use std::os::unix::process::CommandExt;

    let limits = *limits;
    // SAFETY: the hook runs between fork and exec and only makes
    // async-signal-safe syscalls (setsid, setrlimit, unshare).
    unsafe {
        command.pre_exec(move || pre_exec_isolation(&limits));
    }
}

#[cfg(unix)]
fn pre_exec_isolation(limits: &ResourceLimits) -> std::io::Result<()> {
    unsafe {
        libc::setsid();
    }

    set_rlimit(libc::RLIMIT_AS, limits.memory_bytes, limits.memory_bytes);
    set_rlimit(
        libc::RLIMIT_CPU,
        limits.cpu_time_secs,
        limits.cpu_time_secs + 1,
    );
    set_rlimit(libc::RLIMIT_NPROC, limits.max_processes, limits.max_processes);
    set_rlimit(libc::RLIMIT_CORE, 0, 0);

    // Network isolation needs CAP_SYS_ADMIN; without it the jail stays
    // best-effort, matching the isolation contract.
    #[cfg(target_os = "linux")]
    unsafe {
        libc::unshare(libc::CLONE_NEWNET);
    }

    Ok(())
}

#[cfg(unix)]
fn set_rlimit(resource: libc::__rlimit_resource_t, soft: u64, hard: u64) {
    let limit = libc::rlimit {
        rlim_cur: soft as libc::rlim_t,
        rlim_max: hard as libc::rlim_t,
    };
    // Ceilings are applied permissively; a denied rlimit must not abort
    // the exec since the wall-clock timeout still bounds the run.
    unsafe {
        libc::setrlimit(resource, &limit);
    }
}

#[cfg(not(unix))]
fn apply_isolation(_command: &mut Command, _limits: &ResourceLimits) {}

fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = [0u8; 1024];
        let mut output = Vec::new();
        while let Ok(n) = reader.read(&mut buf) {
            if n == 0 {
                break;
            }
            output.extend_from_slice(&buf[..n]);
        }
        output
    })
}

struct ProcessContext {
    child: Child,
    stdout_thread: Option<JoinHandle<Vec<u8>>>,
    stderr_thread: Option<JoinHandle<Vec<u8>>>,
    collected: Option<String>,
}

impl IsolatedContext for ProcessContext {
    fn wait(&mut self, timeout: Duration) -> Result<WaitOutcome> {
        match self.child.wait_timeout(timeout) {
            Ok(Some(status)) => Ok(WaitOutcome::Exited(exit_code(status))),
            Ok(None) => Ok(WaitOutcome::TimedOut),
            Err(e) => Err(CredevalError::sandbox(format!(
                "failed to wait for child: {}",
                e
            ))),
        }
    }

    fn kill(&mut self) {
        // The child was made a session/group leader before exec, so signal
        // the whole group: anything it backgrounded must die with it, and
        // the reader threads unblock once no survivor holds the pipes open.
        #[cfg(unix)]
        unsafe {
            libc::kill(-(self.child.id() as i32), libc::SIGKILL);
        }
        if let Err(e) = self.child.kill() {
            tracing::warn!(error = %e, "failed to kill sandboxed process");
        }
        // Reap so the pid is not left as a zombie
        let _ = self.child.wait();
    }

    fn output(&mut self) -> String {
        if let Some(collected) = &self.collected {
            return collected.clone();
        }
        let mut bytes = Vec::new();
        for thread in [self.stdout_thread.take(), self.stderr_thread.take()]
            .into_iter()
            .flatten()
        {
            if let Ok(chunk) = thread.join() {
                bytes.extend_from_slice(&chunk);
            }
        }
        let combined = String::from_utf8_lossy(&bytes).trim().to_string();
        self.collected = Some(combined.clone());
        combined
    }

    fn remove(&mut self) {
        // Subprocess contexts have no persistent state beyond the child
        // itself; anything still running is killed, then reaped.
        match self.child.try_wait() {
            Ok(Some(_)) => {}
            Ok(None) => self.kill(),
            Err(e) => tracing::warn!(error = %e, "failed to reap sandboxed process"),
        }
    }
}

fn exit_code(status: std::process::ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    status.code().unwrap_or(-1)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Instant;

    fn staged(script: &str) -> tempfile::NamedTempFile {
        let mut artifact = tempfile::NamedTempFile::new().unwrap();
        artifact.write_all(script.as_bytes()).unwrap();
        artifact.flush().unwrap();
        artifact
    }

    fn sh_context(artifact: &tempfile::NamedTempFile) -> Box<dyn IsolatedContext> {
        // Roomy process cap: these scripts fork, and RLIMIT_NPROC counts
        // every process of the invoking uid.
        let limits = ResourceLimits {
            max_processes: 4096,
            ..ResourceLimits::default()
        };
        ProcessExecutor::new("/bin/sh", Vec::new())
            .create(artifact.path(), &limits)
            .unwrap()
    }

    #[test]
    fn remove_kills_a_child_that_is_still_running() {
        let artifact = staged("/bin/sleep 30\n");
        let mut context = sh_context(&artifact);

        let start = Instant::now();
        context.remove();

        // Killed and reaped: a follow-up wait returns the SIGKILL status
        // immediately instead of sitting out the sleep.
        let outcome = context.wait(Duration::from_secs(2)).unwrap();
        assert_eq!(outcome, WaitOutcome::Exited(128 + libc::SIGKILL));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn remove_after_clean_exit_is_a_no_op() {
        let artifact = staged("exit 0\n");
        let mut context = sh_context(&artifact);

        let outcome = context.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome, WaitOutcome::Exited(0));
        context.remove();
    }
}
