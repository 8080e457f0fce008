//! One-shot subprocess calls with a mandatory timeout.
//!
//! Every side effect in this crate goes through an external program: the
//! walker, the scripting engine, the plugin validator. Nothing is kept
//! between calls; a child that outlives its timeout is killed.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("{program} is not installed or not executable: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} did not finish within {}ms", .after.as_millis())]
    Timeout { program: String, after: Duration },

    #[error("{program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// What a finished child left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the child was ended by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// The last non-empty stderr line, which is where both backends put
    /// their error message.
    pub fn error_line(&self) -> String {
        self.stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("no diagnostic output")
            .to_string()
    }
}

/// Run `program` with `args`, capturing both streams.
#[instrument(skip(args), fields(args = args.len()))]
pub async fn run(program: &str, args: &[String], timeout: Duration) -> Result<ProcessOutput, ProcessError> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|source| ProcessError::Io {
            program: program.to_string(),
            source,
        })?,
        Err(_) => {
            return Err(ProcessError::Timeout {
                program: program.to_string(),
                after: timeout,
            })
        }
    };

    let output = ProcessOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    debug!(code = ?output.code, stdout_len = output.stdout.len(), "process finished");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn captures_streams_and_code() {
        let out = run("sh", &sh("echo out; echo oops >&2; exit 3"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.error_line(), "oops");
        assert!(!out.success());
    }

    #[tokio::test]
    async fn slow_child_times_out() {
        let err = run("sh", &sh("sleep 5"), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let err = run("/nonexistent/stagehand-test-binary", &[], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }
}
