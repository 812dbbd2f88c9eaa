use crate::render::backend::{AbortSignal, BackendError};
use std::io::{ErrorKind, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Exit status and captured stderr of a finished tool.
#[derive(Debug)]
pub(crate) struct ToolOutput {
    pub status: ExitStatus,
    pub stderr: String,
}

/// Run an external tool to completion with stdin and stdout detached.
///
/// Stderr is drained on its own thread. The child is killed as soon as `abort` is raised or
/// `limit` elapses.
pub(crate) fn run_tool(
    mut cmd: Command,
    during: &str,
    abort: &AbortSignal,
    limit: Option<Duration>,
) -> Result<ToolOutput, BackendError> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                BackendError::missing(format!("{program} is required, but was not found on PATH"))
            }
            _ => BackendError::failed(format!("failed to spawn {program}: {e}")),
        })?;

    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| BackendError::failed(format!("failed to open {program} stderr")))?;
    let drain = std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    });

    let deadline = limit.map(|t| Instant::now() + t);
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(BackendError::failed(format!(
                    "failed to wait for {program}: {e}"
                )));
            }
        }

        let expired = deadline.is_some_and(|d| Instant::now() >= d);
        if expired || abort.is_raised() {
            let _ = child.kill();
            let _ = child.wait();
            // Grandchildren may still hold stderr open; the drain thread is left to finish alone.
            tracing::warn!(%program, during, expired, "killed external tool");
            return Err(match limit {
                Some(after) if expired => BackendError::Timeout {
                    after,
                    during: during.to_owned(),
                },
                _ => BackendError::failed(format!("{during} aborted")),
            });
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    let stderr = drain.join().unwrap_or_default();
    Ok(ToolOutput { status, stderr })
}
