//! Trial execution: one external program run per call.
//!
//! The runner waits for the child by polling so that a bounded timeout can
//! be enforced, and drains stdout/stderr on helper threads so a chatty
//! child never blocks on a full pipe.

use std::fmt;
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{HarnessError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Minimum wait for the pipes to close once the child has exited.
const OUTPUT_GRACE: Duration = Duration::from_millis(100);

/// A fully resolved program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Environment overrides applied to the child only.
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{key}={value} ")?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Executes invocations and hands back their raw stdout.
pub trait TrialRunner {
    /// Run once and return stdout exactly as the program wrote it.
    fn run(&mut self, invocation: &Invocation) -> Result<String>;
}

/// Runs invocations as real child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    /// `None` waits forever.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl TrialRunner for ProcessRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<String> {
        let program = invocation.program.as_str();
        let mut cmd = Command::new(program);
        cmd.args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        log::debug!("spawning: {}", invocation);
        let start = Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| HarnessError::execution(program, format!("failed to start: {e}")))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(HarnessError::execution(
                        program,
                        format!("failed to reap process: {e}"),
                    ));
                }
            }
            if let Some(limit) = self.timeout {
                if start.elapsed() > limit {
                    log::debug!("{} exceeded {:?}, killing", program, limit);
                    if let Err(e) = child.kill() {
                        log::debug!("failed to kill {}: {}", program, e);
                    }
                    match child.wait() {
                        Ok(status) => log::debug!("reaped {}: {}", program, status),
                        Err(e) => log::debug!("reap of {} failed: {}", program, e),
                    }
                    // Reader threads are left detached: grandchildren of a
                    // launcher may still hold the pipes open.
                    return Err(HarnessError::execution(
                        program,
                        format!("timed out after {limit:?}"),
                    ));
                }
            }
            thread::sleep(POLL_INTERVAL);
        };
        let elapsed = start.elapsed();

        // A grandchild that inherited the pipes can keep them open past the exit.
        let remaining = self.timeout.map(|limit| {
            (start + limit)
                .saturating_duration_since(Instant::now())
                .max(OUTPUT_GRACE)
        });
        let stdout = join_output(program, &stdout, remaining)?;
        let stderr = join_output(program, &stderr, Some(OUTPUT_GRACE)).unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            let reason = match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
                Some(last) => format!("{status}, last line of stderr: {}", last.trim()),
                None => status.to_string(),
            };
            return Err(HarnessError::execution(program, reason));
        }

        log::debug!("{} finished in {:.3}s", program, elapsed.as_secs_f64());

        String::from_utf8(stdout)
            .map_err(|e| HarnessError::execution(program, format!("stdout is not UTF-8: {e}")))
    }
}

type Output = std::io::Result<Vec<u8>>;

/// Read a pipe to the end on a helper thread; the result arrives on the channel.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Output> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = match pipe {
            Some(mut pipe) => pipe.read_to_end(&mut buf).map(|_| buf),
            None => Ok(buf),
        };
        let _ = tx.send(result);
    });
    rx
}

/// Wait for a drained pipe, at most `limit` when one is given.
fn join_output(program: &str, rx: &Receiver<Output>, limit: Option<Duration>) -> Result<Vec<u8>> {
    let received = match limit {
        Some(limit) => rx.recv_timeout(limit),
        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };
    match received {
        Ok(output) => output
            .map_err(|e| HarnessError::execution(program, format!("failed to read output: {e}"))),
        Err(RecvTimeoutError::Timeout) => Err(HarnessError::execution(
            program,
            "output still open after exit, a child process may be holding the pipe",
        )),
        Err(RecvTimeoutError::Disconnected) => Err(HarnessError::execution(
            program,
            "output reader thread panicked",
        )),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Invocation {
        Invocation::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn test_captures_stdout_verbatim() {
        let mut runner = ProcessRunner::new(Some(Duration::from_secs(10)));
        let out = runner
            .run(&sh("printf 'Reading time: 2.5s\\nTotal time: 7.0s\\n'"))
            .unwrap();
        assert_eq!(out, "Reading time: 2.5s\nTotal time: 7.0s\n");
    }

    #[test]
    fn test_nonzero_exit_is_execution_failure() {
        let mut runner = ProcessRunner::default();
        let err = runner
            .run(&sh("echo 'Total time: 1.0'; echo 'boom' >&2; exit 3"))
            .unwrap_err();
        match err {
            HarnessError::ExecutionFailure { program, reason } => {
                assert_eq!(program, "sh");
                assert!(reason.contains("boom"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_program_is_execution_failure() {
        let mut runner = ProcessRunner::default();
        let err = runner
            .run(&Invocation::new("/nonexistent/speedup-harness-program"))
            .unwrap_err();
        assert!(matches!(err, HarnessError::ExecutionFailure { .. }));
    }

    #[test]
    fn test_env_override_is_scoped_to_child() {
        let key = "SPEEDUP_HARNESS_SCOPED_VAR";
        let mut runner = ProcessRunner::default();
        let out = runner
            .run(&sh(&format!("printf '%s' \"${key}\"")).env(key, "6"))
            .unwrap();

        assert_eq!(out, "6");
        assert!(std::env::var(key).is_err());
    }

    #[test]
    fn test_timeout_kills_child() {
        let mut runner = ProcessRunner::new(Some(Duration::from_millis(100)));
        let start = Instant::now();
        let err = runner.run(&Invocation::new("sleep").arg("5")).unwrap_err();

        assert!(start.elapsed() < Duration::from_secs(4));
        match err {
            HarnessError::ExecutionFailure { reason, .. } => {
                assert!(reason.contains("timed out"), "{reason}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_utf8_stdout_is_execution_failure() {
        let mut runner = ProcessRunner::new(Some(Duration::from_secs(10)));
        let err = runner.run(&sh("printf '\\377'")).unwrap_err();
        match err {
            HarnessError::ExecutionFailure { reason, .. } => {
                assert!(reason.contains("not UTF-8"), "{reason}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_killed_by_signal_is_execution_failure() {
        let mut runner = ProcessRunner::new(Some(Duration::from_secs(10)));
        let err = runner
            .run(&sh("echo 'Total time: 1.0'; kill -9 $$"))
            .unwrap_err();
        assert!(matches!(err, HarnessError::ExecutionFailure { .. }), "{err}");
    }

    #[test]
    fn test_pipe_held_by_grandchild_is_bounded() {
        let mut runner = ProcessRunner::new(Some(Duration::from_millis(300)));
        let start = Instant::now();
        let err = runner
            .run(&sh("(sleep 5 &); echo 'Total time: 1.0'"))
            .unwrap_err();

        assert!(start.elapsed() < Duration::from_secs(4));
        match err {
            HarnessError::ExecutionFailure { reason, .. } => {
                assert!(reason.contains("output still open"), "{reason}")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invocation_display() {
        let inv = Invocation::new("./opt")
            .args(["in.fa", "out.fa"])
            .env("OMP_NUM_THREADS", "4");
        assert_eq!(inv.to_string(), "OMP_NUM_THREADS=4 ./opt in.fa out.fa");
    }
}
