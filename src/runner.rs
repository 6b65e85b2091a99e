/// Shared child-process plumbing for the wallet and POS runners: spawn an
/// external client with piped stdio and relay its output line-by-line with
/// a component prefix.
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;

/// Errors that can occur while driving an external client.
#[derive(Debug)]
pub enum RunnerError {
    /// Failed to spawn the client binary.
    Spawn {
        command: String,
        source: std::io::Error,
    },
    /// Failed to read from or write to the client's stdio.
    Io { source: std::io::Error },
    /// A piped stdio handle was not available after spawn.
    Pipe { stream: &'static str },
    /// The sale was never initiated within the configured handshake wait.
    HandshakeTimeout { waited: Duration },
}

impl std::fmt::Display for RunnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunnerError::Spawn { command, source } => {
                write!(f, "failed to spawn {}: {}", command, source)
            }
            RunnerError::Io { source } => {
                write!(f, "I/O error while relaying client output: {}", source)
            }
            RunnerError::Pipe { stream } => {
                write!(f, "child {} handle missing after spawn", stream)
            }
            RunnerError::HandshakeTimeout { waited } => {
                write!(
                    f,
                    "sale was not initiated within {}s",
                    waited.as_secs_f64()
                )
            }
        }
    }
}

impl std::error::Error for RunnerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunnerError::Spawn { source, .. } => Some(source),
            RunnerError::Io { source } => Some(source),
            RunnerError::Pipe { .. } => None,
            RunnerError::HandshakeTimeout { .. } => None,
        }
    }
}

/// Result of a completed runner pass over one external client.
#[derive(Debug)]
pub struct RunnerReport {
    /// Process exit code (None if killed by signal).
    pub exit_code: Option<i32>,
    /// Stdout lines relayed to our own stdout.
    pub lines_relayed: u64,
    /// Wall-clock duration from spawn to exit.
    pub duration: Duration,
}

/// A spawned client whose output is being relayed.
///
/// Stdout is read by the owning runner so it can watch for its marker;
/// stderr is drained by a background task with the same prefix.
#[derive(Debug)]
pub struct RelayedChild {
    child: Child,
    pub stdin: ChildStdin,
    pub stdout: Lines<BufReader<ChildStdout>>,
    stderr_task: JoinHandle<()>,
}

/// Spawn an external client with fully piped stdio.
///
/// The child is spawned with `kill_on_drop` so an abandoned runner (for
/// example after a handshake timeout) does not leave an orphan behind.
pub fn spawn_relayed(
    label: &'static str,
    command: &str,
    args: &[String],
) -> Result<RelayedChild, RunnerError> {
    tracing::info!(label, command = %command, args = ?args, "spawning client");

    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| RunnerError::Spawn {
            command: command.to_string(),
            source: e,
        })?;

    let stdin = child.stdin.take().ok_or(RunnerError::Pipe { stream: "stdin" })?;
    let stdout = child
        .stdout
        .take()
        .ok_or(RunnerError::Pipe { stream: "stdout" })?;
    let stderr = child
        .stderr
        .take()
        .ok_or(RunnerError::Pipe { stream: "stderr" })?;

    let pid = child.id().unwrap_or(0);
    tracing::info!(label, pid, "client started");

    let stderr_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            println!("{}: {}", label, line);
        }
    });

    Ok(RelayedChild {
        child,
        stdin,
        stdout: BufReader::new(stdout).lines(),
        stderr_task,
    })
}

impl RelayedChild {
    /// Wait for the child to exit after its stdout has drained.
    pub async fn finish(mut self) -> Result<Option<i32>, RunnerError> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| RunnerError::Io { source: e })?;
        // The stderr task ends on pipe EOF, which exit guarantees
        let _ = self.stderr_task.await;
        Ok(status.code())
    }
}

/// Build client arguments, replacing `placeholder` occurrences with `value`.
pub fn build_args(args: &[String], placeholder: &str, value: &str) -> Vec<String> {
    args.iter().map(|arg| arg.replace(placeholder, value)).collect()
}
