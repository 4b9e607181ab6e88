//! Container runtime capability.
//! The pipeline only needs two operations: list running containers by name,
//! and execute a command inside a named container. Both are expressed as a
//! trait so the stages are testable without podman/docker installed.

use std::collections::HashSet;
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use crate::utils::{Result, StackcheckError};

pub trait ContainerRuntime: Sync {
    /// Names of containers currently in the running state. The query must
    /// complete within `timeout`.
    fn running_containers(&self, timeout: Duration) -> Result<HashSet<String>>;

    /// Run `cmd` inside the named container, capturing stdout. The exec
    /// must complete within `timeout`.
    fn exec(&self, container: &str, cmd: &[&str], timeout: Duration) -> Result<String>;

    /// Whether this runtime can exec into containers at all.
    fn supports_exec(&self) -> bool {
        true
    }
}

/// Shells out to the `podman` or `docker` CLI. The verbs used here are
/// identical across both.
pub struct CliRuntime {
    program: String,
}

impl CliRuntime {
    pub fn new(program: &str) -> Self {
        CliRuntime {
            program: program.to_string(),
        }
    }
}

impl ContainerRuntime for CliRuntime {
    fn running_containers(&self, timeout: Duration) -> Result<HashSet<String>> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["ps", "--format", "{{.Names}}"]);
        let out = run_with_timeout(cmd, timeout)
            .map_err(|e| StackcheckError::Runtime(format!("{} ps failed: {}", self.program, e)))?;

        if !out.status.success() {
            return Err(StackcheckError::Runtime(format!(
                "{} ps failed — is the runtime running?",
                self.program
            )));
        }

        Ok(String::from_utf8_lossy(&out.stdout)
            .lines()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect())
    }

    fn exec(&self, container: &str, cmd: &[&str], timeout: Duration) -> Result<String> {
        let mut command = Command::new(&self.program);
        command.arg("exec").arg(container).args(cmd);
        let out = run_with_timeout(command, timeout).map_err(|e| {
            StackcheckError::Runtime(format!("exec in {} failed: {}", container, e))
        })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(StackcheckError::Runtime(format!(
                "exec in {} failed: {}",
                container,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&out.stdout).to_string())
    }
}

/// Runs a command with a hard deadline. The child is killed once the budget
/// is spent, so a hung runtime cannot stall the run past the global ceiling.
fn run_with_timeout(mut cmd: Command, timeout: Duration) -> std::result::Result<Output, String> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| e.to_string())?;
    let deadline = Instant::now() + timeout;

    loop {
        match child.try_wait().map_err(|e| e.to_string())? {
            Some(_) => break,
            None => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(format!("timed out after {:.1}s", timeout.as_secs_f64()));
                }
                std::thread::sleep(Duration::from_millis(20));
            }
        }
    }

    child.wait_with_output().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_with_timeout_returns_output() {
        let mut cmd = Command::new("echo");
        cmd.arg("ok");
        let out = run_with_timeout(cmd, Duration::from_secs(5)).unwrap();
        assert!(out.status.success());
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "ok");
    }

    #[test]
    fn run_with_timeout_kills_hung_command() {
        let mut cmd = Command::new("sleep");
        cmd.arg("30");
        let start = Instant::now();
        let err = run_with_timeout(cmd, Duration::from_millis(100)).unwrap_err();
        assert!(err.contains("timed out"));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn missing_program_is_an_error() {
        let cmd = Command::new("no-such-container-runtime");
        assert!(run_with_timeout(cmd, Duration::from_secs(1)).is_err());
    }
}
